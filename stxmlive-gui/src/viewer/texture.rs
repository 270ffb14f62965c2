//! Texture generation for grid visualization.

use egui::{Color32, ColorImage};
use stxmlive_core::{PixelBuffer, RasterSurface};

/// [`RasterSurface`] backed by an egui [`ColorImage`], ready for upload.
pub struct ColorImageSurface {
    image: ColorImage,
}

impl ColorImageSurface {
    /// Fully transparent surface of `width x height` pixels.
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            image: ColorImage::new([width, height], Color32::TRANSPARENT),
        }
    }

    pub fn into_image(self) -> ColorImage {
        self.image
    }
}

impl RasterSurface for ColorImageSurface {
    fn measure(&self) -> (usize, usize) {
        (self.image.size[0], self.image.size[1])
    }

    fn set_pixel(&mut self, x: usize, y: usize, rgba: [u8; 4]) {
        let [width, height] = self.image.size;
        if x < width && y < height {
            let [r, g, b, a] = rgba;
            self.image.pixels[y * width + x] = Color32::from_rgba_unmultiplied(r, g, b, a);
        }
    }

    fn blit(&mut self, src: &PixelBuffer, dx: usize, dy: usize) {
        for (i, px) in src.as_rgba().chunks_exact(4).enumerate() {
            let (x, y) = (i % src.width(), i / src.width());
            self.set_pixel(dx + x, dy + y, [px[0], px[1], px[2], px[3]]);
        }
    }
}
