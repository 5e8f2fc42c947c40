//! The `mixclip degrade` command: pixel-dropout copies of the sample set.

use std::path::PathBuf;

use clap::Args;
use mixclip_core::degrade::{apply_pixel_dropout_dir, dropout_inputs, DegradeReport};
use mixclip_core::{Config, DropoutLevel, InfoLevel};

use super::{create_progress_bar, emit, OutputFormat};

#[derive(Args, Debug)]
pub struct DegradeArgs {
    /// Pristine photos (defaults to the high-info photo dir)
    #[arg(long)]
    input: Option<PathBuf>,

    /// Parent of the `dropout_{p}` output dirs (defaults to the low-info photo dir)
    #[arg(long)]
    output_root: Option<PathBuf>,

    /// Dropout level in percent, repeatable (defaults to `[dropout] levels`)
    #[arg(short, long = "level")]
    levels: Vec<DropoutLevel>,

    /// Seed for reproducible masks
    #[arg(long)]
    seed: Option<u64>,

    /// Output format for the report
    #[arg(short, long, value_enum, default_value = "text")]
    format: OutputFormat,
}

pub fn execute(args: DegradeArgs, config: &Config) -> anyhow::Result<()> {
    let photos = config.data_path(&config.layout.photos_dir);
    let input = args
        .input
        .unwrap_or_else(|| photos.join(InfoLevel::High.dir_name()));
    let output_root = args
        .output_root
        .unwrap_or_else(|| photos.join(InfoLevel::Low.dir_name()));
    let levels = if args.levels.is_empty() {
        config.dropout.levels.iter().map(|&p| DropoutLevel(p)).collect()
    } else {
        args.levels
    };
    let seed = args.seed.or(config.dropout.seed);

    let total = dropout_inputs(&input).len() as u64;
    let mut reports: Vec<DegradeReport> = Vec::with_capacity(levels.len());

    for level in levels {
        let output = output_root.join(level.dir_name());
        let pb = create_progress_bar(total, &level.dir_name());
        let report = apply_pixel_dropout_dir(&input, &output, level.probability(), seed, || {
            pb.inc(1)
        })?;
        pb.finish_and_clear();
        reports.push(report);
    }

    emit(&reports, args.format, || {
        for report in &reports {
            println!(
                "{:>4.0}%  {:>6} processed  {:>4} failed  -> {}",
                report.probability * 100.0,
                report.processed,
                report.failed,
                report.output_dir.display()
            );
        }
    })
}
