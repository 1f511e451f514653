use serde::{Deserialize, Serialize};

/// Axis-aligned pixel rectangle of a recognized fragment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundingRegion {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OcrFragment {
    /// `None` when the engine does not report geometry.
    pub region: Option<BoundingRegion>,
    pub text: String,
    /// `0.0..=1.0`, `None` when the engine does not report confidence.
    pub confidence: Option<f32>,
}

impl OcrFragment {
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            region: None,
            text: text.into(),
            confidence: None,
        }
    }
}

/// Fragments in the engine's reading order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OcrResult {
    pub fragments: Vec<OcrFragment>,
}

impl OcrResult {
    pub fn new(fragments: Vec<OcrFragment>) -> Self {
        Self { fragments }
    }

    /// Build a result from free-form text, one fragment per non-blank line.
    pub fn from_lines(text: &str) -> Self {
        let fragments = text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(OcrFragment::from_text)
            .collect();
        Self { fragments }
    }

    /// Fragment texts joined by a single space, in order. Fragment text is
    /// not trimmed or otherwise altered.
    pub fn joined_text(&self) -> String {
        self.fragments
            .iter()
            .map(|f| f.text.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }
}
