//! Orientation correction and centered zoom.

use image::imageops::{self, FilterType};
use image::{Rgb, RgbImage};
use imageproc::geometric_transformations::{warp_into, Interpolation, Projection};

use super::RasterImage;
use crate::error::{PipelineError, Result};

/// Source of the rotation (in degrees, counter-clockwise positive) that an
/// image currently carries. The normalizer undoes it.
pub trait OrientationDetector: Send + Sync {
    fn detect(&self, image: &RasterImage) -> f32;
}

/// Reports every image as upright. The OCR engines wired in today do not
/// expose an orientation signal.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoRotation;

impl OrientationDetector for NoRotation {
    fn detect(&self, _image: &RasterImage) -> f32 {
        0.0
    }
}

/// Undo `rotation_degrees`, then apply a centered zoom of `zoom_factor`.
///
/// With `rotation_degrees == 0.0` and `zoom_factor >= 1.0` the input is
/// returned untouched.
pub fn normalize(
    image: RasterImage,
    zoom_factor: f32,
    rotation_degrees: f32,
) -> Result<RasterImage> {
    let image = if rotation_degrees != 0.0 {
        rotate_expanded(&image, -rotation_degrees)?
    } else {
        image
    };

    zoom(image, zoom_factor)
}

/// Rotate about the center, growing the canvas to the rotated bounding box so
/// no content is clipped. Uncovered pixels are black.
pub fn rotate_expanded(image: &RasterImage, angle_degrees: f32) -> Result<RasterImage> {
    if !angle_degrees.is_finite() {
        return Err(PipelineError::InvalidParameter(format!(
            "rotation angle must be finite, got {angle_degrees}"
        )));
    }

    let (w, h) = image.dimensions();
    let theta = f64::from(angle_degrees).to_radians();
    let (sin, cos) = (theta.sin().abs(), theta.cos().abs());

    // The epsilon keeps right angles from truncating one pixel short.
    let new_w = (f64::from(h) * sin + f64::from(w) * cos + 1e-6) as u32;
    let new_h = (f64::from(w) * sin + f64::from(h) * cos + 1e-6) as u32;
    if new_w == 0 || new_h == 0 {
        return Err(PipelineError::InvalidParameter(format!(
            "rotation by {angle_degrees} degrees collapses a {w}x{h} image"
        )));
    }

    let cx = (w / 2) as f32;
    let cy = (h / 2) as f32;

    // Positive angles turn content counter-clockwise on screen; imageproc's
    // rotation is clockwise in image coordinates.
    let projection = Projection::translate(-cx, -cy)
        .and_then(Projection::rotate(-theta as f32))
        .and_then(Projection::translate(new_w as f32 / 2.0, new_h as f32 / 2.0));

    let mut out = RgbImage::new(new_w, new_h);
    warp_into(
        image.pixels(),
        &projection,
        Interpolation::Bilinear,
        Rgb([0, 0, 0]),
        &mut out,
    );

    RasterImage::new(out)
}

/// Crop a centered `w*f x h*f` window (clipped to the image) and scale it
/// back to `w x h`.
pub fn zoom(image: RasterImage, zoom_factor: f32) -> Result<RasterImage> {
    if !zoom_factor.is_finite() || zoom_factor <= 0.0 {
        return Err(PipelineError::InvalidParameter(format!(
            "zoom factor must be a positive number, got {zoom_factor}"
        )));
    }

    let (w, h) = image.dimensions();
    let (left, right) = centered_span(w, zoom_factor);
    let (top, bottom) = centered_span(h, zoom_factor);

    let crop_w = right - left;
    let crop_h = bottom - top;
    if crop_w == 0 || crop_h == 0 {
        return Err(PipelineError::InvalidParameter(format!(
            "zoom factor {zoom_factor} leaves an empty window on a {w}x{h} image"
        )));
    }

    if crop_w == w && crop_h == h {
        return Ok(image);
    }

    let cropped = imageops::crop_imm(image.pixels(), left, top, crop_w, crop_h).to_image();
    let resized = imageops::resize(&cropped, w, h, FilterType::Triangle);

    RasterImage::new(resized)
}

/// `[start, end)` of a window of `len * factor` centered on `len / 2`,
/// clipped to `[0, len]`.
fn centered_span(len: u32, factor: f32) -> (u32, u32) {
    let center = i64::from(len / 2);
    let span = (len as f32 * factor) as i64;
    let start = center - span / 2;
    let end = start + span;

    (start.max(0) as u32, end.clamp(0, i64::from(len)) as u32)
}
