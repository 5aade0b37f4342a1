use std::path::PathBuf;

use thiserror::Error;

use crate::document::DocumentError;
use crate::llm_client::LlmError;

/// Application-level error type.
/// Every failure ends the run; nothing here is retried or recovered.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Failed to read CV: {0}")]
    Document(#[from] DocumentError),

    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    #[error("Response for {path} holds no parseable JSON")]
    NoJsonPayload { path: PathBuf },

    #[error("Failed to write extraction result: {0}")]
    Output(#[from] std::io::Error),
}
