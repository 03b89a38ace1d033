//! Error types for cg-marketing

use thiserror::Error;

/// cg-marketing error type
#[derive(Error, Debug)]
pub enum MarketingError {
    /// Upstream generation failure (API error, retry budget exhausted,
    /// storage failure)
    #[error("Generation failed: {0}")]
    Generation(#[from] cg_core::Error),

    /// The model reply carried no parseable JSON object; the raw text is
    /// kept for diagnostics
    #[error("Generation output was not parseable JSON: {raw}")]
    UnparseableOutput { raw: String },
}

/// Result type alias
pub type Result<T> = std::result::Result<T, MarketingError>;
