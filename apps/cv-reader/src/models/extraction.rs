use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde_json::Value;
use uuid::Uuid;

use crate::llm_client::Usage;

/// Outcome of one extraction call.
///
/// `response` is the model's text exactly as received. `parsed` is a
/// best-effort reading of it and never replaces it.
#[derive(Debug, Clone)]
pub struct ExtractionRecord {
    pub run_id: Uuid,
    pub source: PathBuf,
    pub created_at: DateTime<Utc>,
    pub response: String,
    pub parsed: Option<Value>,
    pub usage: Option<Usage>,
}
