//! Subcommand implementations and the helpers they share.

pub mod analyze;
pub mod combine;
pub mod config;
pub mod degrade;
pub mod describe;
pub mod embed;
pub mod evaluate;
pub mod models;
pub mod sample;

use std::io::{self, BufWriter};
use std::path::{Path, PathBuf};

use clap::ValueEnum;
use indicatif::{ProgressBar, ProgressStyle};
use mixclip_core::experiment::CsvRecord;
use mixclip_core::output::{OutputFormat as CoreOutputFormat, OutputWriter};
use serde::Serialize;

/// How results are rendered on stdout.
#[derive(Clone, Copy, Debug, Default, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable summary
    #[default]
    Text,
    /// Single JSON document
    Json,
    /// One JSON object per line
    Jsonl,
    /// CSV with header
    Csv,
}

impl OutputFormat {
    fn core(self) -> Option<CoreOutputFormat> {
        match self {
            OutputFormat::Text => None,
            OutputFormat::Json => Some(CoreOutputFormat::Json),
            OutputFormat::Jsonl => Some(CoreOutputFormat::JsonLines),
            OutputFormat::Csv => Some(CoreOutputFormat::Csv),
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Jsonl => write!(f, "jsonl"),
            OutputFormat::Csv => write!(f, "csv"),
        }
    }
}

/// Render a report. `text` is used for the human format.
pub fn emit<T: Serialize>(item: &T, format: OutputFormat, text: impl FnOnce()) -> anyhow::Result<()> {
    match format.core() {
        None => text(),
        Some(core) => {
            let stdout = io::stdout();
            let mut writer = OutputWriter::new(BufWriter::new(stdout.lock()), core, true);
            writer.write(item)?;
            writer.flush()?;
        }
    }
    Ok(())
}

/// Render a table of rows. `text` is used for the human format.
pub fn emit_rows<T: Serialize + CsvRecord>(
    rows: &[T],
    format: OutputFormat,
    text: impl FnOnce(),
) -> anyhow::Result<()> {
    match format.core() {
        None => text(),
        Some(core) => {
            let stdout = io::stdout();
            let mut writer = OutputWriter::new(BufWriter::new(stdout.lock()), core, true);
            writer.write_rows(rows)?;
            writer.flush()?;
        }
    }
    Ok(())
}

/// `explicit` if given, otherwise `name` inside the results directory.
pub fn result_path(explicit: Option<PathBuf>, results_dir: &Path, name: &str) -> PathBuf {
    explicit.unwrap_or_else(|| results_dir.join(name))
}

/// Progress bar for per-file batch stages.
pub fn create_progress_bar(total: u64, message: &str) -> ProgressBar {
    let pb = ProgressBar::new(total);
    let style = ProgressStyle::default_bar()
        .template(
            "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("##-");
    pb.set_style(style);
    pb.set_message(message.to_string());
    pb
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_result_path_prefers_explicit() {
        let dir = Path::new("results");
        assert_eq!(
            result_path(None, dir, "best.csv"),
            PathBuf::from("results/best.csv")
        );
        assert_eq!(
            result_path(Some(PathBuf::from("/tmp/x.csv")), dir, "best.csv"),
            PathBuf::from("/tmp/x.csv")
        );
    }

    #[test]
    fn test_format_mapping() {
        assert!(OutputFormat::Text.core().is_none());
        assert_eq!(OutputFormat::Csv.core(), Some(CoreOutputFormat::Csv));
    }
}
