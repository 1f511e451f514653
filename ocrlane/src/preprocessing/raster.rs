use std::io::Cursor;

use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ImageFormat, ImageReader, RgbImage};

use crate::error::{PipelineError, Result};

/// A decoded, non-empty, 3-channel 8-bit image.
///
/// Channel order is fixed at decode time and never swapped by any stage, so
/// the bytes that reach the OCR engine and the encoded response share it.
/// Every transform consumes or borrows a `RasterImage` and returns a new one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RasterImage {
    pixels: RgbImage,
}

impl RasterImage {
    pub fn new(pixels: RgbImage) -> Result<Self> {
        if pixels.width() == 0 || pixels.height() == 0 {
            return Err(PipelineError::BadRequest(
                "Failed to process the image: decoded raster is empty".to_string(),
            ));
        }
        Ok(Self { pixels })
    }

    /// Promotes grayscale to three channels and drops alpha.
    pub fn from_dynamic(img: DynamicImage) -> Result<Self> {
        Self::new(img.into_rgb8())
    }

    /// Decode a JPEG/PNG/... container. The format is sniffed from the bytes.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let reader = ImageReader::new(Cursor::new(bytes))
            .with_guessed_format()
            .map_err(|e| PipelineError::BadRequest(format!("Failed to read image: {e}")))?;

        if reader.format().is_none() {
            return Err(PipelineError::BadRequest(
                "Failed to decode image: unrecognized image format".to_string(),
            ));
        }

        let img = reader
            .decode()
            .map_err(|e| PipelineError::BadRequest(format!("Failed to decode image: {e}")))?;

        Self::from_dynamic(img)
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.pixels.dimensions()
    }

    pub fn pixels(&self) -> &RgbImage {
        &self.pixels
    }

    /// Baseline JPEG at a fixed quality; identical input gives identical bytes.
    pub fn encode_jpeg(&self, quality: u8) -> Result<Vec<u8>> {
        let mut output = Vec::new();
        JpegEncoder::new_with_quality(&mut output, quality.clamp(1, 100))
            .encode_image(&self.pixels)
            .map_err(|e| PipelineError::Internal(format!("Failed to encode JPEG: {e}")))?;
        Ok(output)
    }

    pub fn encode_png(&self) -> Result<Vec<u8>> {
        let mut output = Vec::new();
        self.pixels
            .write_to(&mut Cursor::new(&mut output), ImageFormat::Png)
            .map_err(|e| PipelineError::Internal(format!("Failed to encode PNG: {e}")))?;
        Ok(output)
    }
}
