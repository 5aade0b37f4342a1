use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot extract text from PDF {path}: {message}")]
    Pdf { path: PathBuf, message: String },

    #[error("{path} is not valid UTF-8 text")]
    NotUtf8 { path: PathBuf },

    #[error("{path} contains no extractable text (scanned PDFs need OCR first)")]
    NoText { path: PathBuf },
}

/// A CV as plain text. Structure is left for the model to infer.
#[derive(Debug, Clone)]
pub struct CvDocument {
    pub path: PathBuf,
    pub text: String,
}

/// Reads a CV from disk. PDFs go through `pdf-extract`; anything else is
/// read as UTF-8 text.
pub async fn read_cv(path: &Path) -> Result<CvDocument, DocumentError> {
    let bytes = tokio::fs::read(path).await.map_err(|source| DocumentError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let text = if is_pdf(path) {
        extract_pdf_text(path, bytes).await?
    } else {
        String::from_utf8(bytes).map_err(|_| DocumentError::NotUtf8 {
            path: path.to_path_buf(),
        })?
    };

    if !has_extractable_text(&text) {
        return Err(DocumentError::NoText {
            path: path.to_path_buf(),
        });
    }

    info!("Read {} ({} chars)", path.display(), text.chars().count());
    debug!("Text extracted from {}:\n\n{}", path.display(), text);

    Ok(CvDocument {
        path: path.to_path_buf(),
        text,
    })
}

/// pdf-extract panics on some valid fonts and encodings, so it runs on the
/// blocking pool where a panic comes back as a `JoinError`.
async fn extract_pdf_text(path: &Path, bytes: Vec<u8>) -> Result<String, DocumentError> {
    let pdf_error = |message: String| DocumentError::Pdf {
        path: path.to_path_buf(),
        message,
    };

    tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem(&bytes))
        .await
        .map_err(|e| pdf_error(join_error_message(e)))?
        .map_err(|e| pdf_error(e.to_string()))
}

fn join_error_message(err: tokio::task::JoinError) -> String {
    if !err.is_panic() {
        return err.to_string();
    }
    let payload = err.into_panic();
    let reason = payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown cause".to_string());
    format!("PDF parser panicked: {reason}")
}

fn is_pdf(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"))
}

/// A page of whitespace or layout glyphs is what an image-only PDF yields.
fn has_extractable_text(text: &str) -> bool {
    text.chars().any(|c| c.is_alphanumeric())
}
