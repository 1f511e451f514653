use image::{GrayImage, Luma, Rgb, RgbImage};
use imageproc::filter::filter3x3;

use super::{clahe, lab, RasterImage};
use crate::error::{PipelineError, Result};

/// 3x3 Laplacian sharpening kernel: the center pixel minus its 4-neighbour
/// Laplacian.
pub const LAPLACIAN_SHARPEN: [[i32; 3]; 3] = [[0, -1, 0], [-1, 5, -1], [0, -1, 0]];

#[derive(Debug, Clone, PartialEq)]
pub struct EnhancementParams {
    pub zoom_factor: f32,
    pub sharpen_kernel: [[i32; 3]; 3],
    pub clahe_clip_limit: f32,
    /// `(rows, cols)`
    pub clahe_tile_grid: (u32, u32),
}

impl Default for EnhancementParams {
    fn default() -> Self {
        Self {
            zoom_factor: 1.0,
            sharpen_kernel: LAPLACIAN_SHARPEN,
            clahe_clip_limit: 2.0,
            clahe_tile_grid: (8, 8),
        }
    }
}

impl EnhancementParams {
    pub fn validate(&self) -> Result<()> {
        if !self.zoom_factor.is_finite() || self.zoom_factor <= 0.0 {
            return Err(PipelineError::InvalidParameter(format!(
                "zoom factor must be a positive number, got {}",
                self.zoom_factor
            )));
        }
        if !self.clahe_clip_limit.is_finite() {
            return Err(PipelineError::InvalidParameter(format!(
                "CLAHE clip limit must be finite, got {}",
                self.clahe_clip_limit
            )));
        }
        let (rows, cols) = self.clahe_tile_grid;
        if rows == 0 || cols == 0 {
            return Err(PipelineError::InvalidParameter(format!(
                "CLAHE tile grid must be non-empty, got {rows}x{cols}"
            )));
        }
        Ok(())
    }
}

/// Sharpen, then equalize lightness locally in L*a*b* space.
///
/// Chroma is untouched; only the L* plane goes through CLAHE.
pub fn enhance(image: &RasterImage, params: &EnhancementParams) -> Result<RasterImage> {
    params.validate()?;

    let sharpened = sharpen(image.pixels(), &params.sharpen_kernel);
    let lab = lab::to_lab(&sharpened);

    let lightness = GrayImage::from_fn(lab.width(), lab.height(), |x, y| {
        Luma([lab.get_pixel(x, y)[0]])
    });
    let equalized = clahe::equalize(
        &lightness,
        params.clahe_clip_limit,
        params.clahe_tile_grid,
    )?;

    let merged = RgbImage::from_fn(lab.width(), lab.height(), |x, y| {
        let Rgb([_, a, b]) = *lab.get_pixel(x, y);
        Rgb([equalized.get_pixel(x, y)[0], a, b])
    });

    RasterImage::new(lab::from_lab(&merged))
}

/// Correlate with a 3x3 kernel, replicating edge pixels and saturating to
/// `0..=255`.
fn sharpen(img: &RgbImage, kernel: &[[i32; 3]; 3]) -> RgbImage {
    let flat: Vec<i32> = kernel.iter().flatten().copied().collect();
    filter3x3::<Rgb<u8>, i32, u8>(img, &flat)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn checkerboard(w: u32, h: u32) -> RasterImage {
        RasterImage::new(RgbImage::from_fn(w, h, |x, y| {
            if (x / 4 + y / 4) % 2 == 0 {
                Rgb([60, 70, 80])
            } else {
                Rgb([140, 150, 160])
            }
        }))
        .unwrap()
    }

    #[test]
    fn test_default_params() {
        let params = EnhancementParams::default();
        assert_eq!(params.sharpen_kernel, LAPLACIAN_SHARPEN);
        assert_eq!(params.clahe_clip_limit, 2.0);
        assert_eq!(params.clahe_tile_grid, (8, 8));
        assert!(params.validate().is_ok());
    }

    #[test]
    fn test_enhance_preserves_dimensions() {
        for (w, h) in [(1, 1), (7, 3), (64, 48)] {
            let out = enhance(&checkerboard(w, h), &EnhancementParams::default()).unwrap();
            assert_eq!(out.dimensions(), (w, h));
        }
    }

    #[test]
    fn test_sharpen_leaves_uniform_image_unchanged() {
        let img = RgbImage::from_pixel(9, 9, Rgb([10, 200, 90]));
        let out = sharpen(&img, &LAPLACIAN_SHARPEN);
        assert_eq!(out, img);
    }

    #[test]
    fn test_sharpen_boosts_edges() {
        let img = RgbImage::from_fn(6, 1, |x, _| {
            if x < 3 {
                Rgb([100, 100, 100])
            } else {
                Rgb([150, 150, 150])
            }
        });
        let out = sharpen(&img, &LAPLACIAN_SHARPEN);
        assert!(out.get_pixel(2, 0)[0] < 100);
        assert!(out.get_pixel(3, 0)[0] > 150);
    }

    #[test]
    fn test_flat_image_stays_flat() {
        let img = RasterImage::new(RgbImage::from_pixel(32, 32, Rgb([120, 120, 120]))).unwrap();
        let out = enhance(&img, &EnhancementParams::default()).unwrap();
        let first = *out.pixels().get_pixel(0, 0);
        assert!(out.pixels().pixels().all(|p| *p == first));
    }

    #[test]
    fn test_enhance_is_deterministic() {
        let img = checkerboard(40, 24);
        let params = EnhancementParams::default();
        assert_eq!(enhance(&img, &params).unwrap(), enhance(&img, &params).unwrap());
    }

    #[test]
    fn test_invalid_tile_grid_rejected() {
        let params = EnhancementParams {
            clahe_tile_grid: (8, 0),
            ..EnhancementParams::default()
        };
        assert!(matches!(
            enhance(&checkerboard(8, 8), &params),
            Err(PipelineError::InvalidParameter(_))
        ));
    }
}
