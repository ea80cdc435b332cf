use std::io;

/// All error types for the material registry and its tooling.
#[derive(thiserror::Error, Debug)]
pub enum MaterialError {
    #[error("Input error: {0}")]
    Input(String),
    #[error("Output error: {0}")]
    Output(String),
    #[error("Decode error: {0}")]
    Decode(String),
    #[error("Decode error: truncated {what} (need {needed} bytes, {remaining} left)")]
    Truncated {
        what: &'static str,
        needed: usize,
        remaining: usize,
    },
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, MaterialError>;
