//! Gemini API client and types

mod client;
mod types;

pub use client::GeminiClient;
pub use types::*;
