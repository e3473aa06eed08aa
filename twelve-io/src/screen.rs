use image::{ImageBuffer, ImageResult, Rgb, RgbImage};
use std::path::Path;
use twelve_vm::{Memory, Region, Word};

/// A snapshot of video memory, decoded to 8-bit RGB
///
/// Each VRAM word is one pixel in RGB444 format (red in bits 8-11), laid out
/// in row-major order.
pub struct Frame {
    width: u32,
    height: u32,
    pixels: Vec<[u8; 3]>,
}

/// Expands a 4-bit channel to 8 bits
fn expand(c: Word) -> u8 {
    (c & 0xF) as u8 * 17
}

impl Frame {
    /// Captures VRAM as a frame `width` pixels wide
    ///
    /// A partial trailing row is ignored.
    pub fn capture(mem: &Memory, width: u32) -> Self {
        let vram = mem.region_words(Region::Vram);
        let height = if width == 0 {
            0
        } else {
            vram.len() as u32 / width
        };
        let pixels = vram[..(width * height) as usize]
            .iter()
            .map(|&w| [expand(w >> 8), expand(w >> 4), expand(w)])
            .collect();
        Self {
            width,
            height,
            pixels,
        }
    }

    /// Returns the frame size as `(width, height)`
    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Returns the color at the given position
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 3]> {
        if x < self.width && y < self.height {
            Some(self.pixels[(y * self.width + x) as usize])
        } else {
            None
        }
    }

    /// Converts the frame into an image buffer
    pub fn to_image(&self) -> RgbImage {
        ImageBuffer::from_fn(self.width, self.height, |x, y| {
            Rgb(self.pixels[(y * self.width + x) as usize])
        })
    }

    /// Writes the frame to a PNG file
    pub fn save_png<P: AsRef<Path>>(&self, path: P) -> ImageResult<()> {
        self.to_image().save(path)
    }
}
