use std::sync::Arc;

use crate::config::Config;
use crate::db::ResultSink;
use crate::error::Result;
use crate::ocr::OcrAdapter;
use crate::pipeline::PipelineOrchestrator;
use crate::source::ImageSource;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub pipeline: Arc<PipelineOrchestrator>,
    /// Same adapter the pipeline uses; kept here for health reporting.
    pub ocr: Arc<dyn OcrAdapter>,
    pub sink: Arc<dyn ResultSink>,
}

impl AppState {
    pub fn new(config: Config, ocr: Arc<dyn OcrAdapter>, sink: Arc<dyn ResultSink>) -> Result<Self> {
        let source = ImageSource::new(&config.fetch)?;
        let pipeline = PipelineOrchestrator::new(source, ocr.clone(), sink.clone(), &config)?;

        Ok(Self::with_pipeline(config, pipeline, ocr, sink))
    }

    pub fn with_pipeline(
        config: Config,
        pipeline: PipelineOrchestrator,
        ocr: Arc<dyn OcrAdapter>,
        sink: Arc<dyn ResultSink>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            pipeline: Arc::new(pipeline),
            ocr,
            sink,
        }
    }
}
