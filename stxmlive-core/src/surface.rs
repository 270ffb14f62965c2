//! Minimal raster drawing interface.
//!
//! The engine draws through [`RasterSurface`] so that rendering can be tested
//! headlessly. [`PixelBuffer`] is the in-memory implementation; display
//! backends convert it into their own texture type.

/// A drawable RGBA raster.
pub trait RasterSurface {
    /// Surface size as `(width, height)` in pixels.
    fn measure(&self) -> (usize, usize);

    /// Write one pixel. Writes outside the surface are ignored.
    fn set_pixel(&mut self, x: usize, y: usize, rgba: [u8; 4]);

    /// Copy `src` with its top-left corner at `(dx, dy)`, clipping at the edges.
    fn blit(&mut self, src: &PixelBuffer, dx: usize, dy: usize);
}

/// Owned RGBA8 pixel buffer, rows top to bottom.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    width: usize,
    height: usize,
    pixels: Vec<u8>,
}

impl PixelBuffer {
    /// Create a buffer filled with `fill`.
    #[must_use]
    pub fn new(width: usize, height: usize, fill: [u8; 4]) -> Self {
        let mut pixels = Vec::with_capacity(width * height * 4);
        for _ in 0..width * height {
            pixels.extend_from_slice(&fill);
        }
        Self {
            width,
            height,
            pixels,
        }
    }

    /// Wrap existing RGBA bytes.
    ///
    /// Returns `None` if `pixels.len() != width * height * 4`.
    #[must_use]
    pub fn from_rgba(width: usize, height: usize, pixels: Vec<u8>) -> Option<Self> {
        (pixels.len() == width * height * 4).then_some(Self {
            width,
            height,
            pixels,
        })
    }

    /// Width in pixels.
    #[must_use]
    pub fn width(&self) -> usize {
        self.width
    }

    /// Height in pixels.
    #[must_use]
    pub fn height(&self) -> usize {
        self.height
    }

    /// Raw RGBA bytes.
    #[must_use]
    pub fn as_rgba(&self) -> &[u8] {
        &self.pixels
    }

    /// Mutable raw RGBA bytes.
    pub fn as_rgba_mut(&mut self) -> &mut [u8] {
        &mut self.pixels
    }

    /// Consume the buffer, returning its RGBA bytes.
    #[must_use]
    pub fn into_rgba(self) -> Vec<u8> {
        self.pixels
    }

    /// Pixel at `(x, y)`, or `None` outside the buffer.
    #[must_use]
    pub fn pixel(&self, x: usize, y: usize) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let offset = (y * self.width + x) * 4;
        let mut rgba = [0u8; 4];
        rgba.copy_from_slice(&self.pixels[offset..offset + 4]);
        Some(rgba)
    }

    /// Fill an axis-aligned rectangle, clipped to the buffer.
    pub fn fill_rect(&mut self, x: usize, y: usize, width: usize, height: usize, rgba: [u8; 4]) {
        let x_end = (x + width).min(self.width);
        let y_end = (y + height).min(self.height);
        for row in y..y_end {
            for col in x..x_end {
                self.set_pixel(col, row, rgba);
            }
        }
    }

    /// Nearest-neighbour upscale by an integer factor.
    #[must_use]
    pub fn upscale(&self, factor: usize) -> PixelBuffer {
        let factor = factor.max(1);
        let mut out = PixelBuffer::new(self.width * factor, self.height * factor, [0; 4]);
        for y in 0..out.height {
            for x in 0..out.width {
                if let Some(rgba) = self.pixel(x / factor, y / factor) {
                    out.set_pixel(x, y, rgba);
                }
            }
        }
        out
    }
}

impl RasterSurface for PixelBuffer {
    fn measure(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    fn set_pixel(&mut self, x: usize, y: usize, rgba: [u8; 4]) {
        if x >= self.width || y >= self.height {
            return;
        }
        let offset = (y * self.width + x) * 4;
        self.pixels[offset..offset + 4].copy_from_slice(&rgba);
    }

    fn blit(&mut self, src: &PixelBuffer, dx: usize, dy: usize) {
        if dx >= self.width || dy >= self.height {
            return;
        }
        let copy_w = src.width.min(self.width - dx);
        let copy_h = src.height.min(self.height - dy);
        for row in 0..copy_h {
            let src_start = row * src.width * 4;
            let dst_start = ((dy + row) * self.width + dx) * 4;
            self.pixels[dst_start..dst_start + copy_w * 4]
                .copy_from_slice(&src.pixels[src_start..src_start + copy_w * 4]);
        }
    }
}
