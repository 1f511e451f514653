use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::pipeline::ResponseBundle;

/// Successful `POST /process-image` body.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ProcessImageResponse {
    /// OCR fragments joined by single spaces.
    pub extracted_text: String,
    /// Base64-encoded JPEG of the enhanced image.
    pub image: String,
}

impl From<ResponseBundle> for ProcessImageResponse {
    fn from(bundle: ResponseBundle) -> Self {
        Self {
            extracted_text: bundle.extracted_text,
            image: bundle.encoded_image,
        }
    }
}

/// Body of every error response.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    pub error: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub ocr: OcrStatus,
    pub database: DatabaseStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct OcrStatus {
    /// `available` or `unavailable`.
    pub status: String,
    pub backend: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DatabaseStatus {
    /// `ok` or `error`.
    pub status: String,
}
