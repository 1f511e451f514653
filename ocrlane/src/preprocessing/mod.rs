//! Raster decoding and the two preprocessing stages that run before OCR:
//! geometric normalization and visual enhancement.

mod clahe;
mod enhance;
mod geometry;
mod lab;
mod raster;

pub use enhance::{enhance, EnhancementParams, LAPLACIAN_SHARPEN};
pub use geometry::{normalize, rotate_expanded, zoom, NoRotation, OrientationDetector};
pub use raster::RasterImage;
