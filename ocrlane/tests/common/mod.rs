#![allow(dead_code)]

use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};

use ocrlane::api::AppState;
use ocrlane::config::Config;
use ocrlane::db::{ExtractionRecord, ResultSink};
use ocrlane::error::{PipelineError, Result};
use ocrlane::ocr::{OcrAdapter, OcrFragment, OcrResult};
use ocrlane::preprocessing::RasterImage;

pub const BOUNDARY: &str = "ocrlane-test-boundary";

/// OCR stand-in that returns the same fragments for every image.
pub struct FixedOcr {
    fragments: Vec<String>,
    calls: AtomicUsize,
    available: bool,
}

impl FixedOcr {
    pub fn new(fragments: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            fragments: fragments.iter().map(|s| s.to_string()).collect(),
            calls: AtomicUsize::new(0),
            available: true,
        })
    }

    pub fn unavailable() -> Arc<Self> {
        Arc::new(Self {
            fragments: Vec::new(),
            calls: AtomicUsize::new(0),
            available: false,
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl OcrAdapter for FixedOcr {
    async fn extract(&self, _image: &RasterImage) -> Result<OcrResult> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.available {
            return Err(PipelineError::OcrUnavailable("test engine offline".to_string()));
        }
        Ok(OcrResult::new(
            self.fragments.iter().map(|t| OcrFragment::from_text(t.as_str())).collect(),
        ))
    }

    fn backend_name(&self) -> &str {
        "test/fixed"
    }

    fn is_available(&self) -> bool {
        self.available
    }
}

/// Sink that keeps records in memory, or fails every write.
#[derive(Default)]
pub struct RecordingSink {
    records: Mutex<Vec<ExtractionRecord>>,
    fail: bool,
}

impl RecordingSink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            fail: true,
            ..Self::default()
        })
    }

    pub fn records(&self) -> Vec<ExtractionRecord> {
        self.records.lock().unwrap().clone()
    }
}

#[async_trait]
impl ResultSink for RecordingSink {
    async fn persist(&self, record: &ExtractionRecord) -> Result<()> {
        if self.fail {
            return Err(PipelineError::Persistence("database is locked".to_string()));
        }
        self.records.lock().unwrap().push(record.clone());
        Ok(())
    }
}

pub fn test_state(ocr: Arc<FixedOcr>, sink: Arc<RecordingSink>) -> AppState {
    let mut config = Config::default();
    config.fetch.timeout_secs = 5;
    config.server.max_upload_bytes = 2 * 1024 * 1024;
    AppState::new(config, ocr, sink).unwrap()
}

/// A small PNG with enough structure for the enhancer to do real work.
pub fn sample_png(w: u32, h: u32) -> Vec<u8> {
    let img = RgbImage::from_fn(w, h, |x, y| {
        if (x / 6 + y / 6) % 2 == 0 {
            Rgb([40, 40, 40])
        } else {
            Rgb([210, 210, 210])
        }
    });
    let mut out = Vec::new();
    DynamicImage::ImageRgb8(img)
        .write_to(&mut Cursor::new(&mut out), ImageFormat::Png)
        .unwrap();
    out
}

pub enum Part<'a> {
    File { name: &'a str, filename: &'a str, bytes: &'a [u8] },
    Text { name: &'a str, value: &'a str },
}

pub fn multipart_body(parts: &[Part<'_>]) -> Vec<u8> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        match part {
            Part::File {
                name,
                filename,
                bytes,
            } => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{name}\"; filename=\"{filename}\"\r\n\
                         Content-Type: application/octet-stream\r\n\r\n"
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(bytes);
            }
            Part::Text { name, value } => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}")
                        .as_bytes(),
                );
            }
        }
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}
