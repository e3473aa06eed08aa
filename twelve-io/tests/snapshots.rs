use image::{DynamicImage, ImageReader, Rgb};
use twelve_io::Frame;
use twelve_vm::{
    image::{to_bytes, Block},
    isa::{Instruction, SystemOp},
    stack::{MemOp, StackOp},
    Exit, Layout, Region, Vm, Width,
};

#[test]
fn program_draws_frame() {
    let layout = Layout::new(0x100, 0, 4, 0x100).unwrap();
    let vram = layout.base(Region::Vram);

    let mut words = vec![];
    for (i, c) in [0xF00, 0x0F0, 0x00F, 0xFFF].into_iter().enumerate() {
        Instruction::Stack(StackOp::Push(c)).encode(&mut words);
        Instruction::Memory(MemOp::Store(Width::Word, vram + i as u32))
            .encode(&mut words);
    }
    Instruction::System(SystemOp::Halt).encode(&mut words);

    let mut vm = Vm::new(layout);
    vm.load_image(&to_bytes(&[Block { offset: 0x20, words }]))
        .unwrap();
    assert_eq!(vm.run(&mut ()), Ok(Exit::Halted));

    let frame = Frame::capture(vm.memory(), 2);
    assert_eq!(frame.size(), (2, 2));

    let path = std::env::temp_dir()
        .join(format!("twelve-io-snapshot-{}.png", std::process::id()));
    frame.save_png(&path).expect("failed to save PNG");
    let DynamicImage::ImageRgb8(image) = ImageReader::open(&path)
        .expect("failed to open on-disk image")
        .decode()
        .expect("failed to decode on-disk image")
    else {
        panic!("on-disk image is of an invalid type");
    };
    std::fs::remove_file(&path).unwrap();

    assert_eq!(image.dimensions(), (2, 2));
    assert_eq!(image[(0, 0)], Rgb([0xFF, 0, 0]));
    assert_eq!(image[(1, 0)], Rgb([0, 0xFF, 0]));
    assert_eq!(image[(0, 1)], Rgb([0, 0, 0xFF]));
    assert_eq!(image[(1, 1)], Rgb([0xFF, 0xFF, 0xFF]));
}
