use std::io::Write;
use std::path::PathBuf;

use clap::Parser;
use tracing::info;

use crate::document::read_cv;
use crate::errors::AppError;
use crate::extraction::extractor::extract_cv;
use crate::llm_client::ChatModel;
use crate::output::{emit, OutputFormat, ResultLog};

#[derive(Debug, Parser)]
#[command(name = "cv-reader")]
#[command(about = "Extract structured candidate data from CVs with Azure OpenAI", long_about = None)]
#[command(version)]
pub struct Cli {
    /// CV files to process (PDF or plain text), in order
    #[arg(required = true, value_name = "FILE")]
    pub files: Vec<PathBuf>,

    /// Append results to this file instead of CV_READER_LOG_FILE
    #[arg(long, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// What to print for each CV
    #[arg(long, value_enum, default_value_t = OutputFormat::Raw)]
    pub format: OutputFormat,
}

/// Processes every file in order, one model call each. Stops at the first
/// failure; results already emitted stay emitted.
pub async fn run<W: Write>(
    cli: &Cli,
    llm: &dyn ChatModel,
    log: &mut ResultLog,
    out: &mut W,
) -> Result<usize, AppError> {
    for path in &cli.files {
        let doc = read_cv(path).await?;
        let record = extract_cv(llm, &doc).await?;
        emit(&record, cli.format, out, log)?;
    }

    info!("Processed {} CV(s)", cli.files.len());
    Ok(cli.files.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use crate::llm_client::{Completion, LlmError};

    /// Echoes the call number so output order can be checked.
    struct CountingModel {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl ChatModel for CountingModel {
        async fn chat_completion(&self, _prompt: &str, _system: &str) -> Result<Completion, LlmError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            Ok(Completion {
                content: format!("{{\"call\": {n}}}"),
                usage: None,
            })
        }
    }

    fn write_cv(dir: &std::path::Path, name: &str, text: &str) -> PathBuf {
        let path = dir.join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        write!(file, "{text}").unwrap();
        path
    }

    #[test]
    fn test_cli_requires_at_least_one_file() {
        assert!(Cli::try_parse_from(["cv-reader"]).is_err());
    }

    #[test]
    fn test_cli_parses_options() {
        let cli = Cli::try_parse_from([
            "cv-reader",
            "--format",
            "json",
            "--log-file",
            "out.log",
            "a.pdf",
            "b.txt",
        ])
        .unwrap();
        assert_eq!(cli.format, OutputFormat::Json);
        assert_eq!(cli.log_file, Some(PathBuf::from("out.log")));
        assert_eq!(cli.files, vec![PathBuf::from("a.pdf"), PathBuf::from("b.txt")]);
    }

    #[tokio::test]
    async fn test_run_calls_model_once_per_document_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let first = write_cv(dir.path(), "first.txt", "Alice Smith\nData Engineer");
        let second = write_cv(dir.path(), "second.md", "# Bob Jones\nSRE");
        let log_path = dir.path().join("results.log");

        let cli = Cli::try_parse_from([
            "cv-reader".into(),
            first.into_os_string(),
            second.into_os_string(),
        ])
        .unwrap();
        let model = CountingModel {
            calls: AtomicUsize::new(0),
        };
        let mut log = ResultLog::open(&log_path).unwrap();
        let mut out = Vec::new();

        let processed = run(&cli, &model, &mut log, &mut out).await.unwrap();

        assert_eq!(processed, 2);
        assert_eq!(model.calls.load(Ordering::SeqCst), 2);
        assert_eq!(String::from_utf8(out).unwrap(), "{\"call\": 1}\n{\"call\": 2}\n");

        let logged = std::fs::read_to_string(&log_path).unwrap();
        assert!(logged.find("first.txt").unwrap() < logged.find("second.md").unwrap());
        assert!(logged.contains("{\"call\": 1}\n"));
        assert!(logged.contains("{\"call\": 2}\n"));
    }

    #[tokio::test]
    async fn test_run_stops_at_unreadable_file_without_calling_model() {
        let dir = tempfile::tempdir().unwrap();
        let log_path = dir.path().join("results.log");
        let missing = dir.path().join("missing.txt");

        let cli = Cli::try_parse_from(["cv-reader".into(), missing.into_os_string()]).unwrap();
        let model = CountingModel {
            calls: AtomicUsize::new(0),
        };
        let mut log = ResultLog::open(&log_path).unwrap();
        let mut out = Vec::new();

        let err = run(&cli, &model, &mut log, &mut out).await.unwrap_err();

        assert!(matches!(err, AppError::Document(_)));
        assert_eq!(model.calls.load(Ordering::SeqCst), 0);
        assert!(out.is_empty());
    }
}
