//! Image acquisition: either the bytes of an uploaded file or a remote URL
//! fetched over HTTP(S), decoded into a [`RasterImage`].

use std::time::Duration;

use futures::StreamExt;
use reqwest::header::{ACCEPT, CONTENT_LENGTH, USER_AGENT};
use url::Url;

use crate::config::FetchConfig;
use crate::error::{FetchFailure, PipelineError, Result};
use crate::preprocessing::RasterImage;

/// `Accept` header sent on every outbound fetch.
pub const IMAGE_ACCEPT: &str = "image/jpeg, image/png, image/*";

/// Some image hosts refuse requests that do not look like a browser.
pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
AppleWebKit/537.36 (KHTML, like Gecko) Chrome/103.0.5060.114 Safari/537.36";

/// Where the image for one request comes from. Exactly one per request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchRequest {
    Upload { bytes: Vec<u8> },
    Url { url: String },
}

impl FetchRequest {
    /// Short label stored alongside persisted results.
    pub fn kind(&self) -> &'static str {
        match self {
            FetchRequest::Upload { .. } => "upload",
            FetchRequest::Url { .. } => "url",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ImageSource {
    http_client: reqwest::Client,
    max_bytes: u64,
}

impl ImageSource {
    pub fn new(config: &FetchConfig) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| PipelineError::Internal(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            http_client,
            max_bytes: config.max_bytes,
        })
    }

    /// Resolve the request to a decoded raster.
    ///
    /// Decoding runs on the blocking pool.
    pub async fn acquire(&self, request: &FetchRequest) -> Result<RasterImage> {
        let bytes = match request {
            FetchRequest::Upload { bytes } => {
                if bytes.is_empty() {
                    return Err(PipelineError::BadRequest(
                        "No image data provided.".to_string(),
                    ));
                }
                bytes.clone()
            }
            FetchRequest::Url { url } => self.download(url).await?,
        };

        tokio::task::spawn_blocking(move || RasterImage::decode(&bytes)).await?
    }

    /// GET `url_str` with the browser-like header contract and return the body.
    pub async fn download(&self, url_str: &str) -> Result<Vec<u8>> {
        let url = Url::parse(url_str.trim())?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(PipelineError::BadRequest(format!(
                "Unsupported URL scheme '{}': only http and https are allowed",
                url.scheme()
            )));
        }

        let response = self
            .http_client
            .get(url.clone())
            .header(ACCEPT, IMAGE_ACCEPT)
            .header(USER_AGENT, BROWSER_USER_AGENT)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if !status.is_success() {
            tracing::debug!(url = %url, status = status.as_u16(), "Image fetch rejected by origin");
            return Err(PipelineError::Fetch(FetchFailure::Status(status.as_u16())));
        }

        let declared = response
            .headers()
            .get(CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u64>().ok());
        if declared.is_some_and(|len| len > self.max_bytes) {
            return Err(self.too_large());
        }

        let mut body = Vec::with_capacity(declared.unwrap_or(0).min(self.max_bytes) as usize);
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(transport_error)?;
            if (body.len() + chunk.len()) as u64 > self.max_bytes {
                return Err(self.too_large());
            }
            body.extend_from_slice(&chunk);
        }

        let sniffed = infer::get(&body).map(|kind| kind.mime_type());
        tracing::debug!(
            url = %url,
            bytes = body.len(),
            mime = sniffed.unwrap_or("unknown"),
            "Fetched remote image"
        );

        Ok(body)
    }

    fn too_large(&self) -> PipelineError {
        PipelineError::Fetch(FetchFailure::TooLarge {
            limit: self.max_bytes,
        })
    }
}

fn transport_error(e: reqwest::Error) -> PipelineError {
    if e.is_timeout() {
        PipelineError::Timeout(format!("Image fetch timed out: {e}"))
    } else {
        PipelineError::Fetch(FetchFailure::Transport(e.to_string()))
    }
}
