//! Text recognition.
//!
//! [`OcrAdapter`] is the seam the pipeline calls through. [`OcrProvider`] is
//! the configured implementation: a local Tesseract engine (behind the
//! `tesseract` feature) or an OpenAI-compatible vision endpoint selected by
//! the `OCR_MODEL` prefix. When neither can be brought up the provider stays
//! constructible and reports itself unavailable.

mod api;
mod provider;
mod types;

use async_trait::async_trait;

use crate::error::Result;
use crate::preprocessing::RasterImage;

pub use api::OpenAiVisionClient;
pub use provider::OcrProvider;
pub use types::{BoundingRegion, OcrFragment, OcrResult};

#[async_trait]
pub trait OcrAdapter: Send + Sync {
    /// Recognize text in an already-preprocessed raster.
    async fn extract(&self, image: &RasterImage) -> Result<OcrResult>;

    fn backend_name(&self) -> &str;

    fn is_available(&self) -> bool;
}
