#[cfg(feature = "tesseract")]
use std::sync::Arc;

use async_trait::async_trait;
#[cfg(feature = "tesseract")]
use leptess::LepTess;
#[cfg(feature = "tesseract")]
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::config::{parse_ocr_provider_model, OcrConfig};
use crate::error::{PipelineError, Result};
use crate::preprocessing::RasterImage;

use super::api::OpenAiVisionClient;
use super::{OcrAdapter, OcrResult};

enum OcrBackend {
    #[cfg(feature = "tesseract")]
    Local { tesseract: Arc<Mutex<LepTess>> },
    Api { client: OpenAiVisionClient },
    Unavailable { reason: String },
}

/// The configured OCR engine.
///
/// Construction never fails: a backend that cannot be brought up leaves the
/// provider in an unavailable state, and every `extract` call then reports
/// [`PipelineError::OcrUnavailable`].
pub struct OcrProvider {
    backend: OcrBackend,
    name: String,
}

#[cfg(feature = "tesseract")]
fn create_tesseract(languages: &str) -> std::result::Result<LepTess, String> {
    // Tesseract joins multiple languages with '+'.
    let languages = languages.replace(',', "+");
    LepTess::new(None, &languages).map_err(|e| e.to_string())
}

impl OcrProvider {
    pub fn new(config: &OcrConfig) -> Self {
        let (provider, model) = parse_ocr_provider_model(&config.model);
        let provider = provider.to_lowercase();
        let name = format!("{provider}/{model}");

        let backend = match provider.as_str() {
            "openai" | "openrouter" | "ollama" => {
                match OpenAiVisionClient::new(config, &provider, model) {
                    Ok(client) => {
                        info!(provider = %provider, model = %model, "Vision OCR API backend initialized");
                        OcrBackend::Api { client }
                    }
                    Err(e) => {
                        let reason = format!("{provider} OCR backend unavailable: {e}");
                        warn!("{}", reason);
                        OcrBackend::Unavailable { reason }
                    }
                }
            }
            _ => Self::local_backend(config),
        };

        Self { backend, name }
    }

    #[cfg(feature = "tesseract")]
    fn local_backend(config: &OcrConfig) -> OcrBackend {
        match create_tesseract(&config.languages) {
            Ok(lt) => {
                info!(languages = %config.languages, "Tesseract OCR initialized");
                OcrBackend::Local {
                    tesseract: Arc::new(Mutex::new(lt)),
                }
            }
            Err(e) => {
                let reason = format!("Tesseract not available: {e}");
                warn!("{}", reason);
                OcrBackend::Unavailable { reason }
            }
        }
    }

    #[cfg(not(feature = "tesseract"))]
    fn local_backend(_config: &OcrConfig) -> OcrBackend {
        let reason = "Tesseract support not compiled in: rebuild with `--features tesseract`, \
                      or set OCR_MODEL to an API backend such as openai/gpt-4o"
            .to_string();
        warn!("{}", reason);
        OcrBackend::Unavailable { reason }
    }

    /// Why the provider cannot serve requests, if it cannot.
    pub fn unavailable_reason(&self) -> Option<&str> {
        match &self.backend {
            OcrBackend::Unavailable { reason } => Some(reason),
            _ => None,
        }
    }

    #[cfg(feature = "tesseract")]
    async fn extract_local(
        tesseract: &Arc<Mutex<LepTess>>,
        image: &RasterImage,
    ) -> Result<OcrResult> {
        use super::{BoundingRegion, OcrFragment};

        let image = image.clone();
        let tesseract = Arc::clone(tesseract);

        tokio::task::spawn_blocking(move || {
            let png = image.encode_png()?;
            let mut lt = tesseract.blocking_lock();
            lt.set_image_from_mem(&png)
                .map_err(|e| PipelineError::Ocr(format!("Failed to set image: {e}")))?;

            let Some(boxes) =
                lt.get_component_boxes(leptess::capi::TessPageIteratorLevel_RIL_TEXTLINE, true)
            else {
                return Ok(OcrResult::default());
            };

            let mut fragments = Vec::new();
            for b in &boxes {
                lt.set_rectangle(&b);
                let text = lt
                    .get_utf8_text()
                    .map_err(|e| PipelineError::Ocr(format!("Failed to extract text: {e}")))?;
                let text = text.trim();
                if text.is_empty() {
                    continue;
                }

                let geometry = b.get_geometry();
                fragments.push(OcrFragment {
                    region: Some(BoundingRegion {
                        x: geometry.x,
                        y: geometry.y,
                        width: geometry.w,
                        height: geometry.h,
                    }),
                    text: text.to_string(),
                    confidence: Some(lt.mean_text_conf() as f32 / 100.0),
                });
            }

            Ok(OcrResult::new(fragments))
        })
        .await
        .map_err(|e| PipelineError::Ocr(format!("OCR task panicked: {e}")))?
    }
}

#[async_trait]
impl OcrAdapter for OcrProvider {
    async fn extract(&self, image: &RasterImage) -> Result<OcrResult> {
        match &self.backend {
            #[cfg(feature = "tesseract")]
            OcrBackend::Local { tesseract } => Self::extract_local(tesseract, image).await,
            OcrBackend::Api { client } => {
                let image = image.clone();
                let png = tokio::task::spawn_blocking(move || image.encode_png()).await??;
                let text = client.ocr(&png).await?;
                Ok(OcrResult::from_lines(&text))
            }
            OcrBackend::Unavailable { reason } => {
                Err(PipelineError::OcrUnavailable(reason.clone()))
            }
        }
    }

    fn backend_name(&self) -> &str {
        &self.name
    }

    fn is_available(&self) -> bool {
        !matches!(self.backend, OcrBackend::Unavailable { .. })
    }
}
