use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use clap::ValueEnum;
use tracing::{debug, info};

use crate::errors::AppError;
use crate::models::extraction::ExtractionRecord;

/// What gets printed to the terminal. The log file always gets the raw text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// The model response exactly as received, newline-terminated.
    #[default]
    Raw,
    /// The parsed JSON payload, pretty-printed.
    Json,
}

/// Append-only log of extraction results.
pub struct ResultLog {
    path: PathBuf,
    file: File,
}

impl ResultLog {
    /// Opens `path` for appending, creating it if missing. Never truncates.
    pub fn open(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            path: path.to_path_buf(),
            file,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Writes a header line, then the response byte-for-byte.
    pub fn append(&mut self, record: &ExtractionRecord) -> io::Result<()> {
        let mut entry = format!(
            "=== {} run={} source={} ===\n",
            record.created_at.to_rfc3339(),
            record.run_id,
            record.source.display()
        );
        entry.push_str(&record.response);
        if !record.response.ends_with('\n') {
            entry.push('\n');
        }

        // Single write so a record is never split across appends.
        self.file.write_all(entry.as_bytes())?;
        self.file.flush()
    }
}

/// Appends one record to the log, then prints it.
pub fn emit<W: Write>(
    record: &ExtractionRecord,
    format: OutputFormat,
    out: &mut W,
    log: &mut ResultLog,
) -> Result<(), AppError> {
    log.append(record)?;
    info!("Appended run {} to {}", record.run_id, log.path().display());
    if let Some(usage) = record.usage {
        debug!("Run {} used {} tokens", record.run_id, usage.total_tokens);
    }

    let rendered = match format {
        OutputFormat::Raw => record.response.clone(),
        OutputFormat::Json => {
            let value = record.parsed.as_ref().ok_or_else(|| AppError::NoJsonPayload {
                path: record.source.clone(),
            })?;
            // Value serialization cannot fail.
            serde_json::to_string_pretty(value).unwrap_or_default()
        }
    };

    // Terminate the line for the shell; the response itself is untouched.
    out.write_all(rendered.as_bytes())?;
    if !rendered.ends_with('\n') {
        out.write_all(b"\n")?;
    }
    out.flush()?;

    Ok(())
}
