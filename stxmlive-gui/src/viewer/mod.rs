//! Bridges engine rasters to egui textures.

mod texture;

pub use texture::ColorImageSurface;
