//! Experiment runners: the alpha grid over combined embeddings and the
//! single-modality baselines.

use serde::Serialize;

use crate::config::Config;
use crate::error::PipelineError;
use crate::evaluate::{evaluate_folder, EvaluateOptions};
use crate::store::VectorStore;

use super::representation::{DropoutLevel, InfoLevel, Pairing};
use super::results::{BaselineRow, ResultRow, RowSink};

/// Which conditions the grid covers and how each is evaluated.
#[derive(Debug, Clone)]
pub struct GridOptions {
    pub dropouts: Vec<DropoutLevel>,
    pub pairings: Vec<Pairing>,
    pub alphas: Vec<f32>,
    pub evaluate: EvaluateOptions,
}

impl GridOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            dropouts: config
                .dropout
                .levels
                .iter()
                .map(|&p| DropoutLevel(p))
                .collect(),
            pairings: config.combine.pairings.clone(),
            alphas: config.combine.alphas.clone(),
            evaluate: EvaluateOptions::from_config(config),
        }
    }

    fn total(&self) -> usize {
        self.dropouts.len() * self.pairings.len() * self.alphas.len()
    }
}

/// Counts from one grid run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct GridSummary {
    pub evaluated: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// Evaluate every combined-embedding folder in the grid.
///
/// Each finished condition is pushed to `sink` immediately. Missing dropout
/// roots or alpha folders are warned about and skipped; a folder that fails
/// to evaluate is logged and counted, and the run moves on.
pub fn run_grid<S>(
    store: &VectorStore,
    options: &GridOptions,
    sink: &mut S,
) -> Result<GridSummary, PipelineError>
where
    S: RowSink<ResultRow> + ?Sized,
{
    let total = options.total();
    let mut summary = GridSummary::default();
    let mut position = 0;

    for &dropout in &options.dropouts {
        let root = store.combined_root(dropout);
        if !root.is_dir() {
            tracing::warn!("Skipping {}: {:?} does not exist", dropout, root);
            let skipped = options.pairings.len() * options.alphas.len();
            summary.skipped += skipped;
            position += skipped;
            continue;
        }
        tracing::info!("Evaluating {}", dropout);

        for &pairing in &options.pairings {
            for &alpha in &options.alphas {
                position += 1;
                let dir = store.combined_dir(dropout, pairing, alpha);
                if !dir.is_dir() {
                    tracing::warn!("  [{}/{}] missing folder {:?}", position, total, dir);
                    summary.skipped += 1;
                    continue;
                }

                match evaluate_folder(&dir, &options.evaluate) {
                    Ok(eval) => {
                        tracing::info!(
                            "  [{}/{}] {} alpha={:.2}: {:.3} ± {:.3}",
                            position,
                            total,
                            pairing.code(),
                            alpha,
                            eval.accuracy_mean,
                            eval.accuracy_std
                        );
                        sink.push(&ResultRow {
                            dropout_level: Some(dropout.dir_name()),
                            representation: pairing.code(),
                            alpha,
                            accuracy_mean: eval.accuracy_mean,
                            accuracy_std: eval.accuracy_std,
                        })?;
                        summary.evaluated += 1;
                    }
                    Err(e) => {
                        tracing::error!("  [{}/{}] {:?}: {}", position, total, dir, e);
                        summary.failed += 1;
                    }
                }
            }
        }
    }

    Ok(summary)
}

/// Names and directories of the single-modality baselines.
pub fn baseline_dirs(
    store: &VectorStore,
    dropout: DropoutLevel,
) -> Vec<(&'static str, std::path::PathBuf)> {
    vec![
        ("image_high_info", store.image_dir(InfoLevel::High, dropout)),
        ("image_low_info", store.image_dir(InfoLevel::Low, dropout)),
        ("text_high_info", store.text_dir(InfoLevel::High)),
        ("text_low_info", store.text_dir(InfoLevel::Low)),
    ]
}

/// Evaluate image-only and text-only embeddings at one dropout level.
///
/// Missing directories are warned about and left out of the result.
pub fn run_baselines(
    store: &VectorStore,
    dropout: DropoutLevel,
    options: &EvaluateOptions,
) -> Result<Vec<BaselineRow>, PipelineError> {
    let mut rows = Vec::new();
    for (name, dir) in baseline_dirs(store, dropout) {
        if !dir.is_dir() {
            tracing::warn!("Skipping baseline {}: {:?} does not exist", name, dir);
            continue;
        }
        let eval = evaluate_folder(&dir, options)?;
        tracing::info!(
            "{}: {:.3} ± {:.3}",
            name,
            eval.accuracy_mean,
            eval.accuracy_std
        );
        rows.push(BaselineRow {
            representation: name.to_string(),
            accuracy_mean: eval.accuracy_mean,
            accuracy_std: eval.accuracy_std,
        });
    }
    Ok(rows)
}
