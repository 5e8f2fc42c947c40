//! CSV result files: grid results, baselines, and analysis tables.
//!
//! Every table type implements [`CsvRecord`], which fixes its header and
//! how each row is formatted. Grid results are streamed through a
//! [`CsvSink`] so finished rows survive an interrupted run.

use std::fs::File;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::PipelineError;

/// A row type with a fixed CSV header.
pub trait CsvRecord {
    const HEADER: &'static [&'static str];

    /// Field values in header order, already formatted.
    fn record(&self) -> Vec<String>;
}

/// Mean cross-validated accuracy for one condition of the grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultRow {
    /// `dropout_{p}`; absent in single-condition result files
    #[serde(default)]
    pub dropout_level: Option<String>,
    pub representation: String,
    pub alpha: f32,
    pub accuracy_mean: f64,
    pub accuracy_std: f64,
}

impl CsvRecord for ResultRow {
    const HEADER: &'static [&'static str] = &[
        "dropout_level",
        "representation",
        "alpha",
        "accuracy_mean",
        "accuracy_std",
    ];

    fn record(&self) -> Vec<String> {
        vec![
            self.dropout_level.clone().unwrap_or_default(),
            self.representation.clone(),
            format!("{:.2}", self.alpha),
            format!("{:.3}", self.accuracy_mean),
            format!("{:.3}", self.accuracy_std),
        ]
    }
}

/// Accuracy of a single-modality embedding set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BaselineRow {
    pub representation: String,
    pub accuracy_mean: f64,
    pub accuracy_std: f64,
}

impl CsvRecord for BaselineRow {
    const HEADER: &'static [&'static str] = &["representation", "accuracy_mean", "accuracy_std"];

    fn record(&self) -> Vec<String> {
        vec![
            self.representation.clone(),
            format!("{:.3}", self.accuracy_mean),
            format!("{:.3}", self.accuracy_std),
        ]
    }
}

fn csv_err(path: &Path, e: impl std::fmt::Display) -> PipelineError {
    PipelineError::Csv {
        path: path.to_path_buf(),
        message: e.to_string(),
    }
}

fn create_parent(path: &Path) -> Result<(), PipelineError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| PipelineError::io(parent, e))?;
    }
    Ok(())
}

/// Destination for rows as they are produced.
pub trait RowSink<T> {
    fn push(&mut self, row: &T) -> Result<(), PipelineError>;
}

impl<T: Clone> RowSink<T> for Vec<T> {
    fn push(&mut self, row: &T) -> Result<(), PipelineError> {
        Vec::push(self, row.clone());
        Ok(())
    }
}

/// A CSV file written incrementally: header on creation, one flushed row per push.
pub struct CsvSink<T> {
    writer: csv::Writer<File>,
    path: PathBuf,
    rows: usize,
    _row: PhantomData<T>,
}

impl<T: CsvRecord> CsvSink<T> {
    /// Create (or truncate) the file and write the header.
    pub fn create(path: &Path) -> Result<Self, PipelineError> {
        create_parent(path)?;
        let mut writer = csv::Writer::from_path(path).map_err(|e| csv_err(path, e))?;
        writer.write_record(T::HEADER).map_err(|e| csv_err(path, e))?;
        writer.flush().map_err(|e| PipelineError::io(path, e))?;
        Ok(Self {
            writer,
            path: path.to_path_buf(),
            rows: 0,
            _row: PhantomData,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn rows_written(&self) -> usize {
        self.rows
    }
}

impl<T: CsvRecord> RowSink<T> for CsvSink<T> {
    fn push(&mut self, row: &T) -> Result<(), PipelineError> {
        self.writer
            .write_record(row.record())
            .map_err(|e| csv_err(&self.path, e))?;
        self.writer
            .flush()
            .map_err(|e| PipelineError::io(&self.path, e))?;
        self.rows += 1;
        Ok(())
    }
}

/// Write a whole table at once.
pub fn write_records<T: CsvRecord>(path: &Path, rows: &[T]) -> Result<(), PipelineError> {
    let mut sink = CsvSink::<T>::create(path)?;
    for row in rows {
        sink.push(row)?;
    }
    Ok(())
}

/// Read a table by header names.
pub fn read_records<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>, PipelineError> {
    if !path.exists() {
        return Err(PipelineError::FileNotFound(path.to_path_buf()));
    }
    let mut reader = csv::Reader::from_path(path).map_err(|e| csv_err(path, e))?;
    reader
        .deserialize()
        .enumerate()
        .map(|(i, row)| row.map_err(|e| csv_err(path, format!("row {}: {}", i + 1, e))))
        .collect()
}

/// Read a grid results file.
pub fn read_results(path: &Path) -> Result<Vec<ResultRow>, PipelineError> {
    read_records(path)
}

/// Read a baselines file.
pub fn read_baselines(path: &Path) -> Result<Vec<BaselineRow>, PipelineError> {
    read_records(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(dropout: &str, rep: &str, alpha: f32, mean: f64) -> ResultRow {
        ResultRow {
            dropout_level: Some(dropout.to_string()),
            representation: rep.to_string(),
            alpha,
            accuracy_mean: mean,
            accuracy_std: 0.01234,
        }
    }

    #[test]
    fn test_sink_writes_header_before_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("results/grid.csv");
        let sink = CsvSink::<ResultRow>::create(&path).unwrap();
        assert_eq!(sink.rows_written(), 0);
        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(
            text.trim(),
            "dropout_level,representation,alpha,accuracy_mean,accuracy_std"
        );
    }

    #[test]
    fn test_rows_are_formatted_and_flushed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("grid.csv");
        let mut sink = CsvSink::<ResultRow>::create(&path).unwrap();
        sink.push(&row("dropout_25", "LowImg-HighText", 0.25, 0.91666))
            .unwrap();

        // Readable before the sink is dropped
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("dropout_25,LowImg-HighText,0.25,0.917,0.012"));
        assert_eq!(sink.rows_written(), 1);
    }

    #[test]
    fn test_read_results_without_dropout_column() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("single.csv");
        std::fs::write(
            &path,
            "representation,alpha,accuracy_mean,accuracy_std\nHighImg-HighText,0.50,0.950,0.010\n",
        )
        .unwrap();
        let rows = read_results(&path).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].dropout_level, None);
        assert_eq!(rows[0].alpha, 0.5);
    }

    #[test]
    fn test_write_and_read_baselines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("baselines.csv");
        write_records(
            &path,
            &[BaselineRow {
                representation: "image_high_info".to_string(),
                accuracy_mean: 0.98,
                accuracy_std: 0.004,
            }],
        )
        .unwrap();
        let rows = read_baselines(&path).unwrap();
        assert_eq!(rows[0].representation, "image_high_info");
        assert_eq!(rows[0].accuracy_std, 0.004);
    }

    #[test]
    fn test_read_missing_file() {
        assert!(matches!(
            read_results(Path::new("/no/such/results.csv")),
            Err(PipelineError::FileNotFound(_))
        ));
    }

    #[test]
    fn test_vec_sink_collects() {
        let mut rows: Vec<ResultRow> = Vec::new();
        RowSink::push(&mut rows, &row("dropout_50", "LowImg-LowText", 0.0, 0.5)).unwrap();
        assert_eq!(rows.len(), 1);
    }
}
