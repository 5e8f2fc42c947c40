//! Summaries over grid results: best mixing weights, rescue effects, and
//! classifier comparisons.
//!
//! All functions are pure over [`ResultRow`] slices. Ties between equal
//! accuracies resolve to the row that appears first.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::error::PipelineError;
use crate::math::round_to;

use super::representation::{representation_label, DropoutLevel, InfoLevel, Pairing};
use super::results::{CsvRecord, ResultRow};

/// Delta beyond which a classifier comparison is marked as a change.
pub const TREND_THRESHOLD: f64 = 0.002;

const ALPHA_EPS: f32 = 1e-6;

fn is_alpha(a: f32, target: f32) -> bool {
    (a - target).abs() < ALPHA_EPS
}

fn is_mixed(a: f32) -> bool {
    a > ALPHA_EPS && a < 1.0 - ALPHA_EPS
}

/// First row with the strictly highest mean accuracy.
fn first_max<'a>(rows: impl IntoIterator<Item = &'a ResultRow>) -> Option<&'a ResultRow> {
    let mut best: Option<&ResultRow> = None;
    for row in rows {
        if best.map_or(true, |b| row.accuracy_mean > b.accuracy_mean) {
            best = Some(row);
        }
    }
    best
}

type GroupKey = (Option<String>, String);

/// Rows grouped by `(dropout_level, representation)`, keys sorted, file order kept.
fn group(rows: &[ResultRow]) -> BTreeMap<GroupKey, Vec<&ResultRow>> {
    let mut groups: BTreeMap<GroupKey, Vec<&ResultRow>> = BTreeMap::new();
    for row in rows {
        groups
            .entry((row.dropout_level.clone(), row.representation.clone()))
            .or_default()
            .push(row);
    }
    groups
}

fn dropout_pct(row: &ResultRow) -> Option<u8> {
    row.dropout_level
        .as_deref()
        .and_then(|d| d.parse::<DropoutLevel>().ok())
        .map(DropoutLevel::percent)
}

// ---------------------------------------------------------------------------
// Best alpha
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BestAlphaRow {
    pub dropout_level: Option<String>,
    pub representation: String,
    pub best_alpha: f32,
    pub best_accuracy_mean: f64,
    pub best_accuracy_std: f64,
}

impl CsvRecord for BestAlphaRow {
    const HEADER: &'static [&'static str] = &[
        "dropout_level",
        "representation",
        "best_alpha",
        "best_accuracy_mean",
        "best_accuracy_std",
    ];

    fn record(&self) -> Vec<String> {
        vec![
            self.dropout_level.clone().unwrap_or_default(),
            self.representation.clone(),
            format!("{:.2}", self.best_alpha),
            format!("{:.3}", self.best_accuracy_mean),
            format!("{:.3}", self.best_accuracy_std),
        ]
    }
}

/// The highest-accuracy mixing weight per `(dropout_level, representation)`.
pub fn best_alpha(rows: &[ResultRow]) -> Vec<BestAlphaRow> {
    group(rows)
        .into_iter()
        .filter_map(|((dropout_level, representation), group)| {
            let best = first_max(group)?;
            Some(BestAlphaRow {
                dropout_level,
                representation,
                best_alpha: best.alpha,
                best_accuracy_mean: round_to(best.accuracy_mean, 3),
                best_accuracy_std: round_to(best.accuracy_std, 3),
            })
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Rescue gains
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RescueGainRow {
    pub dropout_level: Option<String>,
    pub representation: String,
    pub alpha: f32,
    pub accuracy_mean: f64,
    pub acc_image_only: f64,
    pub acc_text_only: f64,
    pub delta_from_image_only: f64,
    pub delta_from_text_only: f64,
}

impl CsvRecord for RescueGainRow {
    const HEADER: &'static [&'static str] = &[
        "dropout_level",
        "representation",
        "alpha",
        "accuracy_mean",
        "acc_image_only",
        "acc_text_only",
        "delta_from_image_only",
        "delta_from_text_only",
    ];

    fn record(&self) -> Vec<String> {
        vec![
            self.dropout_level.clone().unwrap_or_default(),
            self.representation.clone(),
            format!("{:.2}", self.alpha),
            format!("{:.3}", self.accuracy_mean),
            format!("{:.3}", self.acc_image_only),
            format!("{:.3}", self.acc_text_only),
            format!("{:.4}", self.delta_from_image_only),
            format!("{:.4}", self.delta_from_text_only),
        ]
    }
}

/// Gain of each intermediate mixing weight over the same condition's
/// image-only (`alpha = 1`) and text-only (`alpha = 0`) accuracy.
///
/// `dropout_level` and `representations` filter the input when given. Groups
/// missing either endpoint are skipped with a warning.
pub fn rescue_gains(
    rows: &[ResultRow],
    dropout_level: Option<&str>,
    representations: &[String],
) -> Vec<RescueGainRow> {
    let filtered: Vec<ResultRow> = rows
        .iter()
        .filter(|r| dropout_level.map_or(true, |d| r.dropout_level.as_deref() == Some(d)))
        .filter(|r| representations.is_empty() || representations.contains(&r.representation))
        .cloned()
        .collect();

    let mut out = Vec::new();
    for ((dropout, rep), group) in group(&filtered) {
        let image_only = group.iter().find(|r| is_alpha(r.alpha, 1.0));
        let text_only = group.iter().find(|r| is_alpha(r.alpha, 0.0));
        let (Some(image_only), Some(text_only)) = (image_only, text_only) else {
            tracing::warn!(
                "Skipping {} {}: missing alpha=1.00 or alpha=0.00 baseline",
                dropout.as_deref().unwrap_or("-"),
                rep
            );
            continue;
        };

        let mut mixed: Vec<&ResultRow> = group.iter().copied().filter(|r| is_mixed(r.alpha)).collect();
        mixed.sort_by(|a, b| a.alpha.total_cmp(&b.alpha));
        for row in mixed {
            out.push(RescueGainRow {
                dropout_level: dropout.clone(),
                representation: rep.clone(),
                alpha: row.alpha,
                accuracy_mean: row.accuracy_mean,
                acc_image_only: image_only.accuracy_mean,
                acc_text_only: text_only.accuracy_mean,
                delta_from_image_only: row.accuracy_mean - image_only.accuracy_mean,
                delta_from_text_only: row.accuracy_mean - text_only.accuracy_mean,
            });
        }
    }
    out
}

// ---------------------------------------------------------------------------
// Text rescue: adding text to degraded images
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TextRescueRow {
    pub dropout_level: String,
    pub dropout_pct: u8,
    pub representation: String,
    pub best_alpha: f32,
    pub rescue: f64,
    pub image_only_acc: f64,
    pub best_acc: f64,
}

impl CsvRecord for TextRescueRow {
    const HEADER: &'static [&'static str] = &[
        "dropout_level",
        "dropout_pct",
        "representation",
        "best_alpha",
        "rescue",
        "image_only_acc",
        "best_acc",
    ];

    fn record(&self) -> Vec<String> {
        vec![
            self.dropout_level.clone(),
            self.dropout_pct.to_string(),
            self.representation.clone(),
            format!("{:.2}", self.best_alpha),
            format!("{:.4}", self.rescue),
            format!("{:.3}", self.image_only_acc),
            format!("{:.3}", self.best_acc),
        ]
    }
}

fn text_rescue_point<'a>(
    subset: impl Iterator<Item = &'a ResultRow> + Clone,
    dropout_pct: u8,
    representation: &str,
) -> Option<TextRescueRow> {
    let image_only = subset.clone().find(|r| is_alpha(r.alpha, 1.0));
    let Some(image_only) = image_only else {
        tracing::warn!(
            "No image-only row for {} at {}% dropout",
            representation,
            dropout_pct
        );
        return None;
    };
    let best = first_max(subset.filter(|r| is_mixed(r.alpha)))?;
    Some(TextRescueRow {
        dropout_level: DropoutLevel(dropout_pct).dir_name(),
        dropout_pct,
        representation: representation.to_string(),
        best_alpha: best.alpha,
        rescue: best.accuracy_mean - image_only.accuracy_mean,
        image_only_acc: image_only.accuracy_mean,
        best_acc: best.accuracy_mean,
    })
}

/// How much the best mixed-alpha blend improves on image-only accuracy for
/// degraded images paired with detailed or sparse text, at every dropout level.
///
/// Pristine points (`dropout_0`) come from the high-quality image pairings:
/// HighImg-HighText stands in for LowImg-HighText and HighImg-LowText for
/// LowImg-LowText.
pub fn text_rescue_effect(rows: &[ResultRow]) -> Vec<TextRescueRow> {
    let low_high = Pairing::new(InfoLevel::Low, InfoLevel::High).code();
    let low_low = Pairing::new(InfoLevel::Low, InfoLevel::Low).code();
    let high_high = Pairing::new(InfoLevel::High, InfoLevel::High).code();
    let high_low = Pairing::new(InfoLevel::High, InfoLevel::Low).code();

    let mut levels: Vec<u8> = rows.iter().filter_map(dropout_pct).collect();
    levels.sort_unstable();
    levels.dedup();

    let mut out = Vec::new();
    for rep in [&low_high, &low_low] {
        for &pct in &levels {
            let subset = rows
                .iter()
                .filter(move |r| &r.representation == rep && dropout_pct(r) == Some(pct));
            if subset.clone().next().is_none() {
                continue;
            }
            out.extend(text_rescue_point(subset, pct, rep));
        }
    }

    for (pristine, equivalent) in [(&high_high, &low_high), (&high_low, &low_low)] {
        let subset = rows.iter().filter(move |r| &r.representation == pristine);
        if subset.clone().next().is_none() {
            continue;
        }
        out.extend(text_rescue_point(subset, 0, equivalent));
    }
    out
}

// ---------------------------------------------------------------------------
// Image rescue: adding images to sparse text
// ---------------------------------------------------------------------------

/// Image quality of a representation at a dropout level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ImageQuality {
    Pristine,
    Degraded(u8),
}

impl std::fmt::Display for ImageQuality {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ImageQuality::Pristine => write!(f, "Pristine Image"),
            ImageQuality::Degraded(pct) => write!(f, "{pct}% Degraded Image"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImageRescueRow {
    pub image_quality: String,
    pub alpha: f32,
    pub accuracy: f64,
    pub rescue_effect: f64,
}

impl CsvRecord for ImageRescueRow {
    const HEADER: &'static [&'static str] =
        &["image_quality", "alpha", "accuracy", "rescue_effect"];

    fn record(&self) -> Vec<String> {
        vec![
            self.image_quality.clone(),
            format!("{:.2}", self.alpha),
            format!("{:.4}", self.accuracy),
            format!("{:.4}", self.rescue_effect),
        ]
    }
}

/// Gain over the text-only baseline from mixing in images of each quality.
///
/// The baseline is the first LowImg-LowText row at `alpha = 0`; its absence
/// is an error. HighImg representations count as pristine, everything else
/// as degraded at its dropout level. Accuracies at the same quality and
/// mixing weight are averaged.
pub fn image_rescue_effect(rows: &[ResultRow]) -> Result<Vec<ImageRescueRow>, PipelineError> {
    let low_low = Pairing::new(InfoLevel::Low, InfoLevel::Low).code();
    let baseline = rows
        .iter()
        .find(|r| r.representation == low_low && is_alpha(r.alpha, 0.0))
        .ok_or_else(|| {
            PipelineError::Analysis(
                "no text-only baseline found (LowImg-LowText, alpha=0)".to_string(),
            )
        })?
        .accuracy_mean;
    tracing::info!("Using text-only baseline accuracy = {:.3}", baseline);

    // quality -> alpha bits -> accuracies
    let mut groups: BTreeMap<ImageQuality, BTreeMap<u32, (f32, Vec<f64>)>> = BTreeMap::new();
    for row in rows {
        let quality = if row.representation.contains("HighImg") {
            ImageQuality::Pristine
        } else if let Some(pct) = dropout_pct(row) {
            ImageQuality::Degraded(pct)
        } else {
            tracing::warn!(
                "Skipping {} alpha={:.2}: no dropout level",
                row.representation,
                row.alpha
            );
            continue;
        };
        if is_alpha(row.alpha, 0.0) {
            continue;
        }
        // Alphas are non-negative, so IEEE bit order matches numeric order
        groups
            .entry(quality)
            .or_default()
            .entry(row.alpha.to_bits())
            .or_insert_with(|| (row.alpha, Vec::new()))
            .1
            .push(row.accuracy_mean);
    }

    let mut out = Vec::new();
    for (quality, by_alpha) in groups {
        for (_, (alpha, accuracies)) in by_alpha {
            let accuracy = accuracies.iter().sum::<f64>() / accuracies.len() as f64;
            out.push(ImageRescueRow {
                image_quality: quality.to_string(),
                alpha,
                accuracy,
                rescue_effect: accuracy - baseline,
            });
        }
    }
    Ok(out)
}

// ---------------------------------------------------------------------------
// Classifier comparison
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassifierComparisonRow {
    pub representation: String,
    pub alpha: f32,
    pub logreg_acc: f64,
    pub svm_acc: f64,
    pub delta: f64,
}

impl ClassifierComparisonRow {
    /// `↑` when SVM wins by more than the threshold, `↓` when it loses by more.
    pub fn trend(&self) -> &'static str {
        if self.delta > TREND_THRESHOLD {
            "↑"
        } else if self.delta < -TREND_THRESHOLD {
            "↓"
        } else {
            ""
        }
    }
}

impl CsvRecord for ClassifierComparisonRow {
    const HEADER: &'static [&'static str] =
        &["representation", "alpha", "logreg_acc", "svm_acc", "delta"];

    fn record(&self) -> Vec<String> {
        vec![
            self.representation.clone(),
            format!("{:.2}", self.alpha),
            format!("{:.3}", self.logreg_acc),
            format!("{:.3}", self.svm_acc),
            format!("{:.4}", self.delta),
        ]
    }
}

/// Pair logistic-regression and SVM results by representation and alpha.
///
/// Only conditions present in both inputs are compared; the first matching
/// row of each input is used. Representations are reported by their human
/// label, sorted by code, alphas ascending.
pub fn compare_classifiers(
    logreg: &[ResultRow],
    svm: &[ResultRow],
) -> Vec<ClassifierComparisonRow> {
    let mut reps: Vec<&str> = logreg
        .iter()
        .chain(svm)
        .map(|r| r.representation.as_str())
        .collect();
    reps.sort_unstable();
    reps.dedup();

    let mut out = Vec::new();
    for rep in reps {
        let mut alphas: Vec<f32> = logreg
            .iter()
            .chain(svm)
            .filter(|r| r.representation == rep)
            .map(|r| r.alpha)
            .collect();
        alphas.sort_by(f32::total_cmp);
        alphas.dedup_by(|a, b| is_alpha(*a, *b));

        for alpha in alphas {
            let find = |rows: &[ResultRow]| {
                rows.iter()
                    .find(|r| r.representation == rep && is_alpha(r.alpha, alpha))
                    .map(|r| r.accuracy_mean)
            };
            let (Some(logreg_acc), Some(svm_acc)) = (find(logreg), find(svm)) else {
                continue;
            };
            out.push(ClassifierComparisonRow {
                representation: representation_label(rep),
                alpha,
                logreg_acc,
                svm_acc,
                delta: svm_acc - logreg_acc,
            });
        }
    }
    out
}

// ---------------------------------------------------------------------------
// Mixed vs. single modality
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MixedVsSingleRow {
    pub dropout_level: Option<String>,
    pub representation: String,
    pub best_alpha: f32,
    pub best_mixed: f64,
    pub image_only: f64,
    pub text_only: f64,
    pub mixed_wins: bool,
}

impl CsvRecord for MixedVsSingleRow {
    const HEADER: &'static [&'static str] = &[
        "dropout_level",
        "representation",
        "best_alpha",
        "best_mixed",
        "image_only",
        "text_only",
        "mixed_wins",
    ];

    fn record(&self) -> Vec<String> {
        vec![
            self.dropout_level.clone().unwrap_or_default(),
            self.representation.clone(),
            format!("{:.2}", self.best_alpha),
            format!("{:.3}", self.best_mixed),
            format!("{:.3}", self.image_only),
            format!("{:.3}", self.text_only),
            self.mixed_wins.to_string(),
        ]
    }
}

/// Whether the best intermediate mixing weight beats both single modalities.
pub fn mixed_vs_single(rows: &[ResultRow]) -> Vec<MixedVsSingleRow> {
    group(rows)
        .into_iter()
        .filter_map(|((dropout_level, representation), group)| {
            let image_only = group.iter().find(|r| is_alpha(r.alpha, 1.0))?.accuracy_mean;
            let text_only = group.iter().find(|r| is_alpha(r.alpha, 0.0))?.accuracy_mean;
            let best = first_max(group.iter().copied().filter(|r| is_mixed(r.alpha)))?;
            Some(MixedVsSingleRow {
                dropout_level,
                representation,
                best_alpha: best.alpha,
                best_mixed: best.accuracy_mean,
                image_only,
                text_only,
                mixed_wins: best.accuracy_mean > image_only && best.accuracy_mean > text_only,
            })
        })
        .collect()
}
