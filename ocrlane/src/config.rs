use serde::Deserialize;
use std::env;

use crate::preprocessing::EnhancementParams;

fn parse_env_or<T: std::str::FromStr>(var: &str, default: T) -> T
where
    T::Err: std::fmt::Display,
{
    match env::var(var) {
        Ok(val) => match val.parse() {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::warn!("Invalid value '{}' for {}: {}. Using default.", val, var, e);
                default
            }
        },
        Err(_) => default,
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub ocr: OcrConfig,
    pub fetch: FetchConfig,
    pub enhancement: EnhancementConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Upper bound on a `/process-image` request body, multipart framing included.
    pub max_upload_bytes: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub auth_token: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OcrConfig {
    pub model: String,
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub languages: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FetchConfig {
    pub timeout_secs: u64,
    pub max_bytes: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EnhancementConfig {
    pub zoom_factor: f32,
    pub clahe_clip_limit: f32,
    pub clahe_tile_rows: u32,
    pub clahe_tile_cols: u32,
    pub jpeg_quality: u8,
}

impl EnhancementConfig {
    pub fn params(&self) -> EnhancementParams {
        EnhancementParams {
            zoom_factor: self.zoom_factor,
            clahe_clip_limit: self.clahe_clip_limit,
            clahe_tile_grid: (self.clahe_tile_rows, self.clahe_tile_cols),
            ..EnhancementParams::default()
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: env::var("OCRLANE_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: parse_env_or("OCRLANE_PORT", 5000),
                max_upload_bytes: parse_env_or("MAX_UPLOAD_BYTES", 20 * 1024 * 1024),
            },
            database: DatabaseConfig {
                url: env::var("DATABASE_URL").unwrap_or_else(|_| "file:ocrlane.db".to_string()),
                auth_token: env::var("DATABASE_AUTH_TOKEN").ok(),
            },
            ocr: OcrConfig {
                model: env::var("OCR_MODEL").unwrap_or_else(|_| "local/tesseract".to_string()),
                api_key: env::var("OCR_API_KEY").ok(),
                base_url: env::var("OCR_BASE_URL").ok(),
                languages: env::var("OCR_LANGUAGES").unwrap_or_else(|_| "eng".to_string()),
                timeout_secs: parse_env_or("OCR_TIMEOUT", 60),
            },
            fetch: FetchConfig {
                timeout_secs: parse_env_or("FETCH_TIMEOUT", 30),
                max_bytes: parse_env_or("FETCH_MAX_BYTES", 20 * 1024 * 1024),
            },
            enhancement: EnhancementConfig {
                zoom_factor: parse_env_or("ZOOM_FACTOR", 1.0),
                clahe_clip_limit: parse_env_or("CLAHE_CLIP_LIMIT", 2.0),
                clahe_tile_rows: parse_env_or("CLAHE_TILE_ROWS", 8),
                clahe_tile_cols: parse_env_or("CLAHE_TILE_COLS", 8),
                jpeg_quality: parse_env_or("JPEG_QUALITY", 95),
            },
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::default()
    }
}

/// Split an OCR model string into (provider, model).
///
/// `"openai/gpt-4o"` yields `("openai", "gpt-4o")`; anything without a known
/// prefix is treated as a local engine.
pub fn parse_ocr_provider_model(model: &str) -> (&str, &str) {
    if let Some((prefix, rest)) = model.split_once('/') {
        let prefix_lower = prefix.to_lowercase();
        if KNOWN_OCR_PROVIDERS.contains(&prefix_lower.as_str()) {
            return (prefix, rest);
        }
    }
    ("local", model)
}

const KNOWN_OCR_PROVIDERS: &[&str] = &["local", "openai", "openrouter", "ollama"];
