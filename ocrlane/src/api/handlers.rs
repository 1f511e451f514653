use axum::extract::multipart::MultipartRejection;
use axum::extract::{Multipart, State};
use axum::Json;

use crate::error::{PipelineError, Result};
use crate::source::FetchRequest;

use super::dto::{DatabaseStatus, ErrorBody, HealthResponse, OcrStatus, ProcessImageResponse};
use super::state::AppState;

/// The two optional inputs of `POST /process-image`, as read off the wire.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ProcessImageForm {
    pub image_file: Option<Vec<u8>>,
    pub image_url: Option<String>,
}

impl ProcessImageForm {
    pub async fn from_multipart(mut multipart: Multipart) -> Result<Self> {
        let mut form = Self::default();

        loop {
            let field = match multipart.next_field().await {
                Ok(Some(field)) => field,
                Ok(None) => break,
                Err(e) => {
                    return Err(PipelineError::BadRequest(format!(
                        "Failed to read form data: {}",
                        e.body_text()
                    )))
                }
            };

            match field.name().unwrap_or("") {
                "image_file" => {
                    let bytes = field.bytes().await.map_err(|e| {
                        PipelineError::BadRequest(format!("Failed to read file: {}", e.body_text()))
                    })?;
                    form.image_file = Some(bytes.to_vec());
                }
                "image_url" => {
                    let text = field.text().await.map_err(|e| {
                        PipelineError::BadRequest(format!("Invalid image_url: {}", e.body_text()))
                    })?;
                    form.image_url = Some(text);
                }
                _ => {}
            }
        }

        Ok(form)
    }

    /// Exactly one input must be present. An empty file part and a blank URL
    /// both count as absent.
    pub fn into_fetch_request(self) -> Result<FetchRequest> {
        let bytes = self.image_file.filter(|b| !b.is_empty());
        let url = self
            .image_url
            .map(|u| u.trim().to_string())
            .filter(|u| !u.is_empty());

        match (bytes, url) {
            (Some(bytes), None) => Ok(FetchRequest::Upload { bytes }),
            (None, Some(url)) => Ok(FetchRequest::Url { url }),
            (None, None) => Err(PipelineError::BadRequest(
                "No image data provided.".to_string(),
            )),
            (Some(_), Some(_)) => Err(PipelineError::BadRequest(
                "Provide either image_file or image_url, not both.".to_string(),
            )),
        }
    }
}

/// `POST /process-image`
///
/// Multipart form with either an `image_file` part or an `image_url` field.
#[utoipa::path(
    post,
    path = "/process-image",
    tag = "ocr",
    request_body(content_type = "multipart/form-data", content = String, description = "Either an image_file part or an image_url field"),
    responses(
        (status = 200, description = "Text extracted", body = ProcessImageResponse),
        (status = 400, description = "Missing, ambiguous or unreadable input", body = ErrorBody),
        (status = 500, description = "OCR engine failure", body = ErrorBody),
        (status = 503, description = "OCR backend unavailable", body = ErrorBody),
        (status = 504, description = "Fetch or OCR timed out", body = ErrorBody),
    )
)]
pub async fn process_image(
    State(state): State<AppState>,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> Result<Json<ProcessImageResponse>> {
    // A request that is not multipart at all carries no image either.
    let multipart = multipart.map_err(|rejection| {
        tracing::debug!(%rejection, "Rejected non-multipart request");
        PipelineError::BadRequest("No image data provided.".to_string())
    })?;

    let request = ProcessImageForm::from_multipart(multipart)
        .await?
        .into_fetch_request()?;

    let bundle = state.pipeline.run(request).await?;
    Ok(Json(bundle.into()))
}

/// `GET /health`
#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses(
        (status = 200, description = "Service health status", body = HealthResponse),
    )
)]
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let ocr = OcrStatus {
        status: if state.ocr.is_available() {
            "available"
        } else {
            "unavailable"
        }
        .to_string(),
        backend: state.ocr.backend_name().to_string(),
    };

    let database = match state.sink.ping().await {
        Ok(()) => DatabaseStatus {
            status: "ok".to_string(),
        },
        Err(e) => {
            tracing::warn!(error = %e, "Database health check failed");
            DatabaseStatus {
                status: "error".to_string(),
            }
        }
    };

    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        ocr,
        database,
    })
}
