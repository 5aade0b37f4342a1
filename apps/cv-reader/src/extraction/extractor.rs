//! CV extraction — one document in, one model call, one record out.
//!
//! Flow: build_prompt → ChatModel::chat_completion → parse_into_json (best effort).
//! The response text is carried through untouched; parsing only annotates it.

use chrono::Utc;
use serde_json::Value;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::document::CvDocument;
use crate::errors::AppError;
use crate::extraction::prompts::{build_prompt, EXTRACTION_SYSTEM};
use crate::llm_client::ChatModel;
use crate::models::extraction::ExtractionRecord;

/// Sends a CV to the model and returns the unmodified response.
pub async fn extract_cv(llm: &dyn ChatModel, doc: &CvDocument) -> Result<ExtractionRecord, AppError> {
    let run_id = Uuid::new_v4();
    info!("Extracting {} (run {run_id})", doc.path.display());

    let prompt = build_prompt(&doc.text);
    debug!("Using prompt:\n{prompt}");

    let completion = llm.chat_completion(&prompt, EXTRACTION_SYSTEM).await?;

    let parsed = match parse_into_json(&completion.content) {
        Ok(value) => {
            debug!("CV JSON data:\n{value:#}");
            Some(value)
        }
        Err(e) => {
            warn!(
                "Response for {} is not valid JSON ({e}); keeping raw text only",
                doc.path.display()
            );
            None
        }
    };

    Ok(ExtractionRecord {
        run_id,
        source: doc.path.clone(),
        created_at: Utc::now(),
        response: completion.content,
        parsed,
        usage: completion.usage,
    })
}

/// Parses the JSON payload of a model response.
///
/// Accepts a ```` ```JSON ```` or ```` ```json ```` fenced block (text before the
/// fence is ignored), a bare ```` ``` ```` fence, or unfenced JSON.
pub fn parse_into_json(response: &str) -> Result<Value, serde_json::Error> {
    serde_json::from_str(json_payload(response))
}

fn json_payload(response: &str) -> &str {
    let body = ["```JSON", "```json"]
        .iter()
        .find_map(|tag| response.split_once(tag).map(|(_, after)| after))
        .or_else(|| response.trim_start().strip_prefix("```"))
        .unwrap_or(response);

    body.split("```").next().unwrap_or(body).trim()
}
