use axum::Json;
use utoipa::OpenApi;

use super::dto;
use super::handlers;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "ocrlane API",
        description = "Upload or link an image, get back its text and the enhanced image.",
    ),
    paths(handlers::process_image, handlers::health_check),
    components(schemas(
        dto::ProcessImageResponse,
        dto::ErrorBody,
        dto::HealthResponse,
        dto::OcrStatus,
        dto::DatabaseStatus,
    )),
    tags(
        (name = "ocr", description = "Image preprocessing and text extraction"),
        (name = "health", description = "Health check"),
    ),
)]
pub struct ApiDoc;

pub async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
