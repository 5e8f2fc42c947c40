//! Blending image and text embeddings into combined vectors.
//!
//! For each image embedding the text embedding with the same file name is
//! loaded and `alpha * image + (1 - alpha) * text` is written under
//! `combined_embeddings/dropout_{p}/{pairing}/alpha_{a}/`.

use serde::Serialize;
use std::path::PathBuf;

use crate::error::PipelineError;
use crate::math::{blend, l2_normalize_in_place};
use crate::store::{list_vectors, read_vector, write_vector, VectorStore};

use super::representation::{DropoutLevel, Pairing};

/// Number of missing-text file names logged individually before summarizing.
const MISSING_LOG_LIMIT: usize = 3;

/// Why a combination was not attempted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    MissingImageDir,
    MissingTextDir,
    NoImageEmbeddings,
}

/// Outcome of combining one pairing at one mixing weight.
#[derive(Debug, Clone, Serialize)]
pub struct CombineReport {
    pub dropout_level: String,
    pub representation: String,
    pub alpha: f32,
    pub output_dir: PathBuf,
    pub processed: usize,
    pub missing_text: usize,
    pub failed: usize,
    pub skipped: Option<SkipReason>,
}

/// Options controlling combination.
#[derive(Debug, Clone, Default)]
pub struct CombineOptions {
    /// L2-normalize each blended vector before writing it
    pub normalize: bool,
}

/// Combine one pairing at one mixing weight.
///
/// Missing source directories are logged and reported as skipped rather than
/// failing the whole grid. Per-file problems are counted and the run continues.
pub fn combine_pair(
    store: &VectorStore,
    dropout: DropoutLevel,
    pairing: Pairing,
    alpha: f32,
    options: &CombineOptions,
) -> Result<CombineReport, PipelineError> {
    if !(0.0..=1.0).contains(&alpha) {
        return Err(PipelineError::InvalidAlpha(alpha));
    }

    let image_dir = store.image_dir(pairing.image, dropout);
    let text_dir = store.text_dir(pairing.text);
    let output_dir = store.combined_dir(dropout, pairing, alpha);

    let mut report = CombineReport {
        dropout_level: dropout.dir_name(),
        representation: pairing.code(),
        alpha,
        output_dir: output_dir.clone(),
        processed: 0,
        missing_text: 0,
        failed: 0,
        skipped: None,
    };

    if !image_dir.is_dir() {
        tracing::error!("Image embedding path {:?} does not exist", image_dir);
        report.skipped = Some(SkipReason::MissingImageDir);
        return Ok(report);
    }
    if !text_dir.is_dir() {
        tracing::error!("Text embedding path {:?} does not exist", text_dir);
        report.skipped = Some(SkipReason::MissingTextDir);
        return Ok(report);
    }

    let image_files = list_vectors(&image_dir);
    if image_files.is_empty() {
        tracing::warn!("No image embeddings found in {:?}", image_dir);
        report.skipped = Some(SkipReason::NoImageEmbeddings);
        return Ok(report);
    }

    tracing::info!(
        "Combining {} images + {} text (alpha={:.2}): {} image embeddings",
        pairing.image,
        pairing.text,
        alpha,
        image_files.len()
    );
    tracing::debug!("  image source: {:?}", image_dir);
    tracing::debug!("  text source: {:?}", text_dir);
    tracing::debug!("  output: {:?}", output_dir);

    std::fs::create_dir_all(&output_dir).map_err(|e| PipelineError::io(&output_dir, e))?;

    for image_file in &image_files {
        let name = image_file.file_name();
        let text_file = text_dir.join(&name);

        if !text_file.exists() {
            report.missing_text += 1;
            if report.missing_text <= MISSING_LOG_LIMIT {
                tracing::warn!("  Missing text embedding: {}", name);
            }
            continue;
        }

        match combine_file(&image_file.path, &text_file, alpha, options) {
            Ok(combined) => {
                write_vector(&output_dir.join(&name), &combined)?;
                report.processed += 1;
            }
            Err(e) => {
                tracing::error!("  Failed to combine {}: {}", name, e);
                report.failed += 1;
            }
        }
    }

    if report.missing_text > MISSING_LOG_LIMIT {
        tracing::warn!(
            "  ... and {} more missing text embeddings",
            report.missing_text - MISSING_LOG_LIMIT
        );
    }
    tracing::info!("  Saved {} combined embeddings", report.processed);

    Ok(report)
}

fn combine_file(
    image_path: &std::path::Path,
    text_path: &std::path::Path,
    alpha: f32,
    options: &CombineOptions,
) -> Result<Vec<f32>, PipelineError> {
    let image = read_vector(image_path)?;
    let text = read_vector(text_path)?;
    let mut combined = blend(&image, &text, alpha).map_err(|e| match e {
        PipelineError::DimensionMismatch {
            expected, actual, ..
        } => PipelineError::DimensionMismatch {
            path: text_path.to_path_buf(),
            expected,
            actual,
        },
        other => other,
    })?;
    if options.normalize {
        l2_normalize_in_place(&mut combined);
    }
    Ok(combined)
}

/// Combine every pairing at every mixing weight for every dropout level.
pub fn combine_grid(
    store: &VectorStore,
    dropouts: &[DropoutLevel],
    pairings: &[Pairing],
    alphas: &[f32],
    options: &CombineOptions,
) -> Result<Vec<CombineReport>, PipelineError> {
    let mut reports = Vec::with_capacity(dropouts.len() * pairings.len() * alphas.len());
    for &dropout in dropouts {
        tracing::info!("Dropout level: {}", dropout);
        for &pairing in pairings {
            for &alpha in alphas {
                reports.push(combine_pair(store, dropout, pairing, alpha, options)?);
            }
        }
    }
    Ok(reports)
}
