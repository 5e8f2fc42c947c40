//! The `mixclip evaluate` command: cross-validated accuracy of embedding folders.

use std::path::PathBuf;

use clap::{Args, Subcommand, ValueEnum};
use mixclip_core::config::ClassifierKind;
use mixclip_core::evaluate::ClassifierSpec;
use mixclip_core::experiment::results::write_records;
use mixclip_core::experiment::{run_baselines, run_grid, CsvSink, GridOptions, ResultRow};
use mixclip_core::{evaluate_folder, Config, DropoutLevel, EvaluateOptions, VectorStore};

use super::{emit, emit_rows, result_path, OutputFormat};

#[derive(Args, Debug)]
pub struct EvaluateArgs {
    #[command(subcommand)]
    pub command: EvaluateCommand,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum ClassifierArg {
    /// Logistic regression
    Logreg,
    /// RBF-kernel SVM
    Svm,
}

impl From<ClassifierArg> for ClassifierKind {
    fn from(arg: ClassifierArg) -> Self {
        match arg {
            ClassifierArg::Logreg => ClassifierKind::LogisticRegression,
            ClassifierArg::Svm => ClassifierKind::Svm,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum EvaluateCommand {
    /// Cross-validate one folder of `.npy` embeddings
    Folder {
        dir: PathBuf,

        /// Classifier (defaults to `[evaluation] classifier`)
        #[arg(short, long, value_enum)]
        classifier: Option<ClassifierArg>,

        /// Number of stratified folds
        #[arg(long)]
        folds: Option<usize>,

        #[arg(long)]
        seed: Option<u64>,

        /// Print the out-of-fold confusion matrix and classification report
        #[arg(long)]
        debug: bool,

        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Evaluate every combined-embedding folder of the alpha grid
    Grid {
        /// Dropout level, repeatable (defaults to `[dropout] levels`)
        #[arg(short, long = "dropout")]
        dropouts: Vec<DropoutLevel>,

        #[arg(short, long, value_enum)]
        classifier: Option<ClassifierArg>,

        /// Results CSV (defaults to `results/combined_results[_svm].csv`)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Evaluate the image-only and text-only embeddings
    Baselines {
        #[arg(short, long, default_value = "dropout_50")]
        dropout: DropoutLevel,

        #[arg(short, long, value_enum)]
        classifier: Option<ClassifierArg>,

        /// Results CSV (defaults to `results/baseline_{dropout}.csv`)
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },
}

fn evaluate_options(config: &Config, classifier: Option<ClassifierArg>) -> EvaluateOptions {
    let mut options = EvaluateOptions::from_config(config);
    if let Some(arg) = classifier {
        options.classifier = ClassifierSpec::for_kind(arg.into(), &config.evaluation);
    }
    options
}

fn grid_file_name(kind: ClassifierKind) -> &'static str {
    match kind {
        ClassifierKind::LogisticRegression => "combined_results.csv",
        ClassifierKind::Svm => "combined_results_svm.csv",
    }
}

pub fn execute(args: EvaluateArgs, config: &Config) -> anyhow::Result<()> {
    match args.command {
        EvaluateCommand::Folder {
            dir,
            classifier,
            folds,
            seed,
            debug,
            format,
        } => {
            let mut options = evaluate_options(config, classifier);
            if let Some(folds) = folds {
                options.folds = folds;
            }
            if let Some(seed) = seed {
                options.seed = seed;
            }
            options.debug = debug;

            let eval = evaluate_folder(&dir, &options)?;
            emit(&eval, format, || {
                println!(
                    "{}: {:.3} ± {:.3} ({} samples, {} dims, {})",
                    dir.display(),
                    eval.accuracy_mean,
                    eval.accuracy_std,
                    eval.n_samples,
                    eval.dimension,
                    options.classifier.kind()
                );
                let scores: Vec<String> =
                    eval.fold_scores.iter().map(|s| format!("{s:.3}")).collect();
                println!("  folds: [{}]", scores.join(", "));
                if let Some(diag) = &eval.diagnostics {
                    println!("\nConfusion matrix:");
                    for row in &diag.confusion_matrix {
                        let cells: Vec<String> = row.iter().map(|c| format!("{c:>6}")).collect();
                        println!("{}", cells.join(""));
                    }
                    println!("\n{}", diag.report);
                }
            })?;
        }

        EvaluateCommand::Grid {
            dropouts,
            classifier,
            output,
        } => {
            let mut options = GridOptions::from_config(config);
            options.evaluate = evaluate_options(config, classifier);
            if !dropouts.is_empty() {
                options.dropouts = dropouts;
            }

            let path = result_path(
                output,
                &config.results_dir(),
                grid_file_name(options.evaluate.classifier.kind()),
            );
            let store = VectorStore::from_config(config);
            let mut sink = CsvSink::<ResultRow>::create(&path)?;
            let summary = run_grid(&store, &options, &mut sink)?;

            println!(
                "{} evaluated, {} skipped, {} failed -> {}",
                summary.evaluated,
                summary.skipped,
                summary.failed,
                sink.path().display()
            );
        }

        EvaluateCommand::Baselines {
            dropout,
            classifier,
            output,
            format,
        } => {
            let options = evaluate_options(config, classifier);
            let store = VectorStore::from_config(config);
            let rows = run_baselines(&store, dropout, &options)?;

            let path = result_path(
                output,
                &config.results_dir(),
                &format!("baseline_{}.csv", dropout.dir_name()),
            );
            write_records(&path, &rows)?;
            tracing::info!("Baselines written to {:?}", path);

            emit_rows(&rows, format, || {
                for row in &rows {
                    println!(
                        "{:<18} {:.3} ± {:.3}",
                        row.representation, row.accuracy_mean, row.accuracy_std
                    );
                }
            })?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classifier_override() {
        let config = Config::default();
        let options = evaluate_options(&config, Some(ClassifierArg::Svm));
        assert_eq!(options.classifier.kind(), ClassifierKind::Svm);
        assert_eq!(
            evaluate_options(&config, None).classifier.kind(),
            config.evaluation.classifier
        );
    }

    #[test]
    fn test_grid_file_names() {
        assert_eq!(grid_file_name(ClassifierKind::LogisticRegression), "combined_results.csv");
        assert_eq!(grid_file_name(ClassifierKind::Svm), "combined_results_svm.csv");
    }
}
