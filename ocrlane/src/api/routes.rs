use axum::extract::DefaultBodyLimit;
use axum::http::{header, StatusCode};
use axum::middleware;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

use super::dto::ErrorBody;
use super::{frontend, handlers, openapi, AppState};

pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let max_upload_bytes = state.config.server.max_upload_bytes;

    Router::new()
        .route("/", get(frontend::serve_root))
        .route("/process-image", post(handlers::process_image))
        .route("/health", get(handlers::health_check))
        .route("/openapi.json", get(openapi::openapi_json))
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(max_upload_bytes))
        .layer(middleware::map_response(json_payload_too_large))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// The body limit layer answers 413 in plain text; rewrite it to the JSON
/// error shape every other failure uses.
async fn json_payload_too_large(response: Response) -> Response {
    if response.status() != StatusCode::PAYLOAD_TOO_LARGE {
        return response;
    }
    let already_json = response
        .headers()
        .get(header::CONTENT_TYPE)
        .is_some_and(|v| v.as_bytes().starts_with(b"application/json"));
    if already_json {
        return response;
    }

    let body = ErrorBody {
        error: "Request body too large.".to_string(),
    };
    (StatusCode::PAYLOAD_TOO_LARGE, Json(body)).into_response()
}
