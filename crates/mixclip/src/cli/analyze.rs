//! The `mixclip analyze` command: summaries over result CSVs and store audits.

use std::path::{Path, PathBuf};

use clap::{Args, Subcommand};
use mixclip_core::describe::{token_report, CLIP_TOKEN_LIMIT};
use mixclip_core::embedding::{load_tokenizer, ClipPaths};
use mixclip_core::experiment::analysis::{
    best_alpha, compare_classifiers, image_rescue_effect, mixed_vs_single, rescue_gains,
    text_rescue_effect,
};
use mixclip_core::experiment::results::{read_results, write_records};
use mixclip_core::experiment::{check_counts, CsvRecord, ResultRow};
use mixclip_core::{Config, DropoutLevel, InfoLevel, VectorStore};
use serde::Serialize;

use super::{emit, emit_rows, result_path, OutputFormat};

const GRID_RESULTS: &str = "combined_results.csv";
const SVM_GRID_RESULTS: &str = "combined_results_svm.csv";

#[derive(Args, Debug)]
pub struct AnalyzeArgs {
    #[command(subcommand)]
    pub command: AnalyzeCommand,

    /// Where the summary CSV is written (defaults to a file in `results/`)
    #[arg(short, long, global = true)]
    output: Option<PathBuf>,

    #[arg(short, long, global = true, value_enum, default_value = "text")]
    format: OutputFormat,
}

#[derive(Subcommand, Debug)]
pub enum AnalyzeCommand {
    /// Best mixing weight per dropout level and representation
    BestAlpha {
        /// Grid results CSV (defaults to `results/combined_results.csv`)
        results: Option<PathBuf>,
    },

    /// Gain of each mixed alpha over the image-only and text-only endpoints
    Rescue {
        results: Option<PathBuf>,

        /// Restrict to one dropout level
        #[arg(short, long)]
        dropout: Option<DropoutLevel>,

        /// Restrict to these representation codes (repeatable)
        #[arg(short, long = "representation")]
        representations: Vec<String>,
    },

    /// How much text recovers degraded-image accuracy, per dropout level
    TextRescue { results: Option<PathBuf> },

    /// Gain of adding image information over the low-info text baseline
    ImageRescue { results: Option<PathBuf> },

    /// SVM accuracy against logistic regression, per representation and alpha
    Compare {
        #[arg(long)]
        logreg: Option<PathBuf>,

        #[arg(long)]
        svm: Option<PathBuf>,
    },

    /// Whether a mixed alpha beats both single-modality endpoints
    MixedVsSingle { results: Option<PathBuf> },

    /// Token lengths of description files against the CLIP context window
    Tokens {
        /// Descriptions to audit (defaults to the high-info description dir)
        #[arg(long)]
        dir: Option<PathBuf>,

        #[arg(long, default_value_t = CLIP_TOKEN_LIMIT)]
        limit: usize,

        /// Histogram bucket width
        #[arg(long, default_value_t = 10)]
        bins: usize,
    },

    /// Count embeddings in the single-modality store directories
    Inventory {
        /// Dropout level whose low-info images are counted
        #[arg(short, long, default_value = "dropout_50")]
        dropout: DropoutLevel,

        /// Expected count per directory (defaults to `[dataset] expected_samples`)
        #[arg(long)]
        expected: Option<usize>,
    },
}

fn load(results: Option<PathBuf>, config: &Config, default: &str) -> anyhow::Result<Vec<ResultRow>> {
    let path = results.unwrap_or_else(|| config.results_dir().join(default));
    let rows = read_results(&path)?;
    if rows.is_empty() {
        anyhow::bail!("No result rows in {}", path.display());
    }
    tracing::debug!("Read {} rows from {:?}", rows.len(), path);
    Ok(rows)
}

/// Write the summary CSV, then render it on stdout.
fn save<T: Serialize + CsvRecord>(
    rows: &[T],
    path: &Path,
    format: OutputFormat,
    text: impl FnOnce(),
) -> anyhow::Result<()> {
    write_records(path, rows)?;
    tracing::info!("Wrote {} rows to {:?}", rows.len(), path);
    emit_rows(rows, format, text)
}

fn dropout_cell(level: &Option<String>) -> &str {
    level.as_deref().unwrap_or("-")
}

pub fn execute(args: AnalyzeArgs, config: &Config) -> anyhow::Result<()> {
    let results_dir = config.results_dir();
    let format = args.format;
    let output = args.output;

    match args.command {
        AnalyzeCommand::BestAlpha { results } => {
            let rows = best_alpha(&load(results, config, GRID_RESULTS)?);
            let path = result_path(output, &results_dir, "best_alpha.csv");
            save(&rows, &path, format, || {
                for row in &rows {
                    println!(
                        "{:<12} {:<18} alpha {:.2}  {:.3} ± {:.3}",
                        dropout_cell(&row.dropout_level),
                        row.representation,
                        row.best_alpha,
                        row.best_accuracy_mean,
                        row.best_accuracy_std
                    );
                }
            })?;
        }

        AnalyzeCommand::Rescue {
            results,
            dropout,
            representations,
        } => {
            let all = load(results, config, GRID_RESULTS)?;
            let dropout = dropout.map(|d| d.dir_name());
            let rows = rescue_gains(&all, dropout.as_deref(), &representations);
            let path = result_path(output, &results_dir, "rescue_gains.csv");
            save(&rows, &path, format, || {
                for row in &rows {
                    println!(
                        "{:<12} {:<18} alpha {:.2}  {:.3}  vs image {:+.3}  vs text {:+.3}",
                        dropout_cell(&row.dropout_level),
                        row.representation,
                        row.alpha,
                        row.accuracy_mean,
                        row.delta_from_image_only,
                        row.delta_from_text_only
                    );
                }
            })?;
        }

        AnalyzeCommand::TextRescue { results } => {
            let rows = text_rescue_effect(&load(results, config, GRID_RESULTS)?);
            let path = result_path(output, &results_dir, "text_rescue_effect.csv");
            save(&rows, &path, format, || {
                for row in &rows {
                    println!(
                        "{:>3}%  {:<18} best alpha {:.2}  rescue {:+.3}",
                        row.dropout_pct, row.representation, row.best_alpha, row.rescue
                    );
                }
            })?;
        }

        AnalyzeCommand::ImageRescue { results } => {
            let rows = image_rescue_effect(&load(results, config, GRID_RESULTS)?)?;
            let path = result_path(output, &results_dir, "image_rescue_effect.csv");
            save(&rows, &path, format, || {
                for row in &rows {
                    println!(
                        "{:<22} alpha {:.2}  {:.3}  rescue {:+.3}",
                        row.image_quality, row.alpha, row.accuracy, row.rescue_effect
                    );
                }
            })?;
        }

        AnalyzeCommand::Compare { logreg, svm } => {
            let logreg = load(logreg, config, GRID_RESULTS)?;
            let svm = load(svm, config, SVM_GRID_RESULTS)?;
            let rows = compare_classifiers(&logreg, &svm);
            let path = result_path(output, &results_dir, "classifier_comparison.csv");
            save(&rows, &path, format, || {
                for row in &rows {
                    println!(
                        "{:<34} alpha {:.2}  logreg {:.3}  svm {:.3}  {:+.3} {}",
                        row.representation,
                        row.alpha,
                        row.logreg_acc,
                        row.svm_acc,
                        row.delta,
                        row.trend()
                    );
                }
            })?;
        }

        AnalyzeCommand::MixedVsSingle { results } => {
            let rows = mixed_vs_single(&load(results, config, GRID_RESULTS)?);
            let path = result_path(output, &results_dir, "mixed_vs_single.csv");
            save(&rows, &path, format, || {
                for row in &rows {
                    println!(
                        "{:<12} {:<18} mixed {:.3} (alpha {:.2})  image {:.3}  text {:.3}  {}",
                        dropout_cell(&row.dropout_level),
                        row.representation,
                        row.best_mixed,
                        row.best_alpha,
                        row.image_only,
                        row.text_only,
                        if row.mixed_wins { "mixed wins" } else { "" }
                    );
                }
            })?;
        }

        AnalyzeCommand::Tokens { dir, limit, bins } => {
            let dir = dir.unwrap_or_else(|| {
                config
                    .data_path(&config.layout.descriptions_dir)
                    .join(InfoLevel::High.dir_name())
            });
            let paths = ClipPaths::new(&config.clip_model_dir());
            let tokenizer = load_tokenizer(&paths.tokenizer)?;
            let report = token_report(&dir, &tokenizer, limit)?;

            emit(&report, format, || {
                println!(
                    "{} files: min {}  max {}  mean {:.1} tokens",
                    report.counts.len(),
                    report.min,
                    report.max,
                    report.mean
                );
                for (start, n) in report.histogram(bins) {
                    println!("  {:>4}-{:<4} {}", start, start + bins.max(1) - 1, n);
                }
                if report.over_limit.is_empty() {
                    println!("No descriptions exceed {} tokens", report.limit);
                } else {
                    println!("Over {} tokens:", report.limit);
                    for count in &report.over_limit {
                        println!("  {:<30} {}", count.file, count.tokens);
                    }
                }
            })?;
        }

        AnalyzeCommand::Inventory { dropout, expected } => {
            let store = VectorStore::from_config(config);
            let expected = expected.unwrap_or(config.dataset.expected_samples);
            let checks = check_counts(&store, &VectorStore::inventory_subdirs(dropout), expected);

            emit(&checks, format, || {
                for check in &checks {
                    let status = match (check.exists, check.ok()) {
                        (false, _) => "missing",
                        (true, true) => "ok",
                        (true, false) => "MISMATCH",
                    };
                    println!(
                        "{:<45} {:>6} / {:<6} {}",
                        check.subdir, check.count, check.expected, status
                    );
                }
            })?;

            if checks.iter().any(|c| !c.ok()) {
                anyhow::bail!("Embedding counts do not match the expected {}", expected);
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(rep: &str, alpha: f32, acc: f64) -> ResultRow {
        ResultRow {
            dropout_level: Some("dropout_50".to_string()),
            representation: rep.to_string(),
            alpha,
            accuracy_mean: acc,
            accuracy_std: 0.01,
        }
    }

    #[test]
    fn test_best_alpha_csv_round_trip_through_files() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.general.data_dir = dir.path().to_path_buf();

        let input = config.results_dir().join(GRID_RESULTS);
        write_records(
            &input,
            &[
                row("LowImg-HighText", 0.0, 0.80),
                row("LowImg-HighText", 0.5, 0.90),
                row("LowImg-HighText", 1.0, 0.70),
            ],
        )
        .unwrap();

        let args = AnalyzeArgs {
            command: AnalyzeCommand::BestAlpha { results: None },
            output: None,
            format: OutputFormat::Json,
        };
        execute(args, &config).unwrap();

        let written = std::fs::read_to_string(config.results_dir().join("best_alpha.csv")).unwrap();
        let lines: Vec<&str> = written.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[1].contains("LowImg-HighText"));
        assert!(lines[1].contains("0.50"));
    }

    #[test]
    fn test_missing_results_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.general.data_dir = dir.path().to_path_buf();
        assert!(load(None, &config, GRID_RESULTS).is_err());
    }
}
