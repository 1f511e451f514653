//! ocrlane: fetch or receive an image, normalize and enhance it, extract its
//! text, persist the result and hand back both the text and the processed
//! image.

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod ocr;
pub mod pipeline;
pub mod preprocessing;
pub mod source;
