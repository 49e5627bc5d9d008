//! Errors raised at the edges of the CSP pipeline.
//!
//! Feature extraction and policy synthesis are total over their inputs and
//! never fail. Errors only come from configuration, the verdict source and I/O.

#[derive(thiserror::Error, Debug)]
pub enum CspError {
    #[error("Invalid policy configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Content too large: {size} bytes exceeds the {limit} byte limit")]
    ContentTooLarge { size: usize, limit: usize },

    #[error("Classifier failure: {0}")]
    Classifier(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration parse error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CspError {
    /// Returns true if the error was caused by the caller's input rather than
    /// the environment.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            CspError::InvalidConfiguration(_) | CspError::ContentTooLarge { .. } | CspError::Json(_)
        )
    }
}

/// Result type for CSP operations
pub type CspResult<T> = Result<T, CspError>;
