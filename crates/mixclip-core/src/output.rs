//! Rendering reports and result tables as JSON, JSON Lines or CSV.

use serde::Serialize;
use std::io::{self, Write};

use crate::experiment::CsvRecord;

/// Output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Single JSON object or array
    Json,
    /// One JSON object per line
    JsonLines,
    /// Header row plus one record per row; non-tabular items fall back to JSON
    Csv,
}

impl OutputFormat {
    /// Parse format from string (case-insensitive).
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "json" => Some(Self::Json),
            "jsonl" | "jsonlines" | "ndjson" => Some(Self::JsonLines),
            "csv" => Some(Self::Csv),
            _ => None,
        }
    }
}

/// Serializes items to the chosen format.
pub struct OutputWriter<W: Write> {
    writer: W,
    format: OutputFormat,
    pretty: bool,
    items_written: usize,
}

impl<W: Write> OutputWriter<W> {
    /// `pretty` only affects JSON.
    pub fn new(writer: W, format: OutputFormat, pretty: bool) -> Self {
        Self {
            writer,
            format,
            pretty,
            items_written: 0,
        }
    }

    fn write_json<T: Serialize + ?Sized>(&mut self, item: &T) -> io::Result<()> {
        if self.pretty {
            serde_json::to_writer_pretty(&mut self.writer, item).map_err(io::Error::other)?;
        } else {
            serde_json::to_writer(&mut self.writer, item).map_err(io::Error::other)?;
        }
        writeln!(self.writer)
    }

    /// Write a single report or item.
    pub fn write<T: Serialize>(&mut self, item: &T) -> io::Result<()> {
        match self.format {
            OutputFormat::Json | OutputFormat::Csv => self.write_json(item)?,
            OutputFormat::JsonLines => {
                serde_json::to_writer(&mut self.writer, item).map_err(io::Error::other)?;
                writeln!(self.writer)?;
            }
        }
        self.items_written += 1;
        Ok(())
    }

    /// Write a table of rows: a JSON array, one line per row, or CSV with header.
    pub fn write_rows<T: Serialize + CsvRecord>(&mut self, rows: &[T]) -> io::Result<()> {
        match self.format {
            OutputFormat::Json => {
                self.write_json(rows)?;
                self.items_written += rows.len();
            }
            OutputFormat::JsonLines => {
                for row in rows {
                    self.write(row)?;
                }
            }
            OutputFormat::Csv => {
                let mut csv = csv::Writer::from_writer(&mut self.writer);
                csv.write_record(T::HEADER).map_err(io::Error::other)?;
                for row in rows {
                    csv.write_record(row.record()).map_err(io::Error::other)?;
                }
                csv.flush()?;
                self.items_written += rows.len();
            }
        }
        Ok(())
    }

    pub fn items_written(&self) -> usize {
        self.items_written
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

/// Serialize an item to a JSON string.
pub fn to_json<T: Serialize>(item: &T, pretty: bool) -> Result<String, serde_json::Error> {
    if pretty {
        serde_json::to_string_pretty(item)
    } else {
        serde_json::to_string(item)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::experiment::ResultRow;

    fn rows() -> Vec<ResultRow> {
        vec![
            ResultRow {
                dropout_level: None,
                representation: "HighImg-LowText".to_string(),
                alpha: 0.5,
                accuracy_mean: 0.91234,
                accuracy_std: 0.01,
            },
            ResultRow {
                dropout_level: None,
                representation: "HighImg-LowText".to_string(),
                alpha: 1.0,
                accuracy_mean: 0.9,
                accuracy_std: 0.02,
            },
        ]
    }

    #[derive(Serialize)]
    struct Summary {
        evaluated: usize,
    }

    #[test]
    fn test_write_json_item() {
        let mut buffer = Vec::new();
        let mut writer = OutputWriter::new(&mut buffer, OutputFormat::Json, false);
        writer.write(&Summary { evaluated: 3 }).unwrap();
        assert_eq!(String::from_utf8(buffer).unwrap(), "{\"evaluated\":3}\n");
    }

    #[test]
    fn test_write_rows_jsonl() {
        let mut buffer = Vec::new();
        let mut writer = OutputWriter::new(&mut buffer, OutputFormat::JsonLines, false);
        writer.write_rows(&rows()).unwrap();
        assert_eq!(writer.items_written(), 2);
        let output = String::from_utf8(buffer).unwrap();
        assert_eq!(output.trim().lines().count(), 2);
    }

    #[test]
    fn test_write_rows_json_array() {
        let mut buffer = Vec::new();
        let mut writer = OutputWriter::new(&mut buffer, OutputFormat::Json, false);
        writer.write_rows(&rows()).unwrap();
        let output = String::from_utf8(buffer).unwrap();
        assert!(output.starts_with('['));
        assert!(output.trim().ends_with(']'));
    }

    #[test]
    fn test_write_rows_csv_uses_record_format() {
        let mut buffer = Vec::new();
        let mut writer = OutputWriter::new(&mut buffer, OutputFormat::Csv, false);
        writer.write_rows(&rows()).unwrap();
        let output = String::from_utf8(buffer).unwrap();
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], ResultRow::HEADER.join(","));
        assert!(lines[1].contains("0.50"));
        assert!(lines[1].contains("0.912"));
    }

    #[test]
    fn test_format_parse() {
        assert_eq!(OutputFormat::parse("json"), Some(OutputFormat::Json));
        assert_eq!(OutputFormat::parse("JSONL"), Some(OutputFormat::JsonLines));
        assert_eq!(OutputFormat::parse("csv"), Some(OutputFormat::Csv));
        assert_eq!(OutputFormat::parse("yaml"), None);
    }
}
