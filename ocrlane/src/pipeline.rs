use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use base64::{engine::general_purpose::STANDARD, Engine};

use crate::config::Config;
use crate::db::{ExtractionRecord, ResultSink};
use crate::error::{PipelineError, Result};
use crate::ocr::OcrAdapter;
use crate::preprocessing::{self, EnhancementParams, NoRotation, OrientationDetector};
use crate::source::{FetchRequest, ImageSource};

/// Everything a successful request returns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseBundle {
    pub extracted_text: String,
    /// Base64 (standard alphabet, padded) of the enhanced image as JPEG.
    pub encoded_image: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    Start,
    Acquired,
    Normalized,
    Enhanced,
    Recognized,
    Persisted,
    Done,
    /// Absorbing; reachable from every other stage.
    Failed,
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PipelineStage::Start => "start",
            PipelineStage::Acquired => "acquired",
            PipelineStage::Normalized => "normalized",
            PipelineStage::Enhanced => "enhanced",
            PipelineStage::Recognized => "recognized",
            PipelineStage::Persisted => "persisted",
            PipelineStage::Done => "done",
            PipelineStage::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Runs one image through acquisition, preprocessing, OCR and persistence.
///
/// Holds no per-request state; a single instance serves every request.
pub struct PipelineOrchestrator {
    source: ImageSource,
    ocr: Arc<dyn OcrAdapter>,
    sink: Arc<dyn ResultSink>,
    orientation: Arc<dyn OrientationDetector>,
    params: EnhancementParams,
    jpeg_quality: u8,
    ocr_timeout: Duration,
}

impl PipelineOrchestrator {
    pub fn new(
        source: ImageSource,
        ocr: Arc<dyn OcrAdapter>,
        sink: Arc<dyn ResultSink>,
        config: &Config,
    ) -> Result<Self> {
        let params = config.enhancement.params();
        params.validate()?;

        Ok(Self {
            source,
            ocr,
            sink,
            orientation: Arc::new(NoRotation),
            params,
            jpeg_quality: config.enhancement.jpeg_quality,
            ocr_timeout: Duration::from_secs(config.ocr.timeout_secs),
        })
    }

    pub fn with_orientation(mut self, detector: Arc<dyn OrientationDetector>) -> Self {
        self.orientation = detector;
        self
    }

    pub fn with_ocr_timeout(mut self, timeout: Duration) -> Self {
        self.ocr_timeout = timeout;
        self
    }

    pub fn params(&self) -> &EnhancementParams {
        &self.params
    }

    pub async fn run(&self, request: FetchRequest) -> Result<ResponseBundle> {
        let source_kind = request.kind();
        trace_stage(PipelineStage::Start, source_kind);

        let result = self.execute(&request).await;
        if let Err(e) = &result {
            tracing::warn!(
                stage = %PipelineStage::Failed,
                source = source_kind,
                error = %e,
                "Pipeline failed"
            );
        }
        result
    }

    async fn execute(&self, request: &FetchRequest) -> Result<ResponseBundle> {
        let source_kind = request.kind();

        let raster = self.source.acquire(request).await?;
        tracing::debug!(
            stage = %PipelineStage::Acquired,
            width = raster.width(),
            height = raster.height(),
            "Image acquired"
        );

        let orientation = Arc::clone(&self.orientation);
        let params = self.params.clone();
        let quality = self.jpeg_quality;
        let (enhanced, jpeg) = tokio::task::spawn_blocking(move || {
            let rotation = orientation.detect(&raster);
            let normalized = preprocessing::normalize(raster, params.zoom_factor, rotation)?;
            trace_stage(PipelineStage::Normalized, source_kind);

            let enhanced = preprocessing::enhance(&normalized, &params)?;
            trace_stage(PipelineStage::Enhanced, source_kind);

            let jpeg = enhanced.encode_jpeg(quality)?;
            Ok::<_, PipelineError>((enhanced, jpeg))
        })
        .await??;

        let result = tokio::time::timeout(self.ocr_timeout, self.ocr.extract(&enhanced))
            .await
            .map_err(|_| {
                PipelineError::Timeout(format!(
                    "OCR did not finish within {} seconds",
                    self.ocr_timeout.as_secs()
                ))
            })??;
        let extracted_text = result.joined_text();
        tracing::debug!(
            stage = %PipelineStage::Recognized,
            backend = self.ocr.backend_name(),
            fragments = result.fragments.len(),
            "Text recognized"
        );

        let text_json = serde_json::to_string(&extracted_text)?;
        let record = ExtractionRecord::new(text_json, &jpeg, source_kind);
        match self.sink.persist(&record).await {
            Ok(()) => trace_stage(PipelineStage::Persisted, source_kind),
            Err(e) => {
                tracing::error!(id = %record.id, error = %e, "Failed to persist extracted text");
            }
        }

        let encoded_image = STANDARD.encode(&jpeg);
        trace_stage(PipelineStage::Done, source_kind);

        Ok(ResponseBundle {
            extracted_text,
            encoded_image,
        })
    }
}

fn trace_stage(stage: PipelineStage, source: &str) {
    tracing::debug!(stage = %stage, source, "Pipeline stage reached");
}
