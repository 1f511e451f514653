use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Why an outbound image fetch did not produce a usable body.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchFailure {
    /// The origin answered with a non-2xx status.
    #[error("Status code: {0}")]
    Status(u16),
    /// DNS, connect, TLS or body-read failure.
    #[error("{0}")]
    Transport(String),
    /// The body exceeded the configured fetch limit.
    #[error("response body exceeds {limit} bytes")]
    TooLarge { limit: u64 },
}

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("{0}")]
    BadRequest(String),

    #[error("Unable to fetch the image. {0}")]
    Fetch(FetchFailure),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Timed out: {0}")]
    Timeout(String),

    #[error("OCR error: {0}")]
    Ocr(String),

    #[error("OCR unavailable: {0}")]
    OcrUnavailable(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl PipelineError {
    pub fn status(&self) -> StatusCode {
        match self {
            PipelineError::BadRequest(_)
            | PipelineError::Fetch(_)
            | PipelineError::InvalidParameter(_)
            | PipelineError::UrlParse(_) => StatusCode::BAD_REQUEST,
            PipelineError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            PipelineError::OcrUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            PipelineError::Persistence(_)
            | PipelineError::Ocr(_)
            | PipelineError::Json(_)
            | PipelineError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<libsql::Error> for PipelineError {
    fn from(e: libsql::Error) -> Self {
        PipelineError::Persistence(e.to_string())
    }
}

impl From<tokio::task::JoinError> for PipelineError {
    fn from(e: tokio::task::JoinError) -> Self {
        PipelineError::Internal(format!("Worker task failed: {e}"))
    }
}

impl IntoResponse for PipelineError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = Json(json!({ "error": self.to_string() }));

        (status, body).into_response()
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_status_message_names_code() {
        let err = PipelineError::Fetch(FetchFailure::Status(404));
        assert_eq!(err.to_string(), "Unable to fetch the image. Status code: 404");
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_fetch_failure_messages() {
        assert_eq!(
            PipelineError::Fetch(FetchFailure::Transport("connection refused".into())).to_string(),
            "Unable to fetch the image. connection refused"
        );
        assert_eq!(
            PipelineError::Fetch(FetchFailure::TooLarge { limit: 1024 }).to_string(),
            "Unable to fetch the image. response body exceeds 1024 bytes"
        );
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            PipelineError::BadRequest("x".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            PipelineError::InvalidParameter("x".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            PipelineError::Timeout("x".into()).status(),
            StatusCode::GATEWAY_TIMEOUT
        );
        assert_eq!(
            PipelineError::OcrUnavailable("x".into()).status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            PipelineError::Ocr("x".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[tokio::test]
    async fn test_into_response_has_error_field_only() {
        let response = PipelineError::BadRequest("No image data provided.".into()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body, json!({ "error": "No image data provided." }));
    }
}
