//! The `mixclip combine` command: blended embeddings over the alpha grid.

use clap::Args;
use mixclip_core::experiment::{combine_grid, CombineOptions};
use mixclip_core::{Config, DropoutLevel, Pairing, VectorStore};

use super::{emit, OutputFormat};

#[derive(Args, Debug)]
pub struct CombineArgs {
    /// Dropout level, repeatable (defaults to `[dropout] levels`)
    #[arg(short, long = "dropout")]
    dropouts: Vec<DropoutLevel>,

    /// Image weight in [0, 1], repeatable (defaults to `[combine] alphas`)
    #[arg(short, long = "alpha")]
    alphas: Vec<f32>,

    /// Pairing code such as `LowImg-HighText`, repeatable
    #[arg(short, long = "pairing", value_parser = parse_pairing)]
    pairings: Vec<Pairing>,

    /// L2-normalize blended vectors
    #[arg(long)]
    normalize: bool,

    #[arg(short, long, value_enum, default_value = "text")]
    format: OutputFormat,
}

fn parse_pairing(s: &str) -> Result<Pairing, String> {
    Pairing::parse(s).ok_or_else(|| format!("unknown pairing: {s}"))
}

pub fn execute(args: CombineArgs, config: &Config) -> anyhow::Result<()> {
    let dropouts: Vec<DropoutLevel> = if args.dropouts.is_empty() {
        config.dropout.levels.iter().map(|&p| DropoutLevel(p)).collect()
    } else {
        args.dropouts
    };
    let alphas = if args.alphas.is_empty() {
        config.combine.alphas.clone()
    } else {
        args.alphas
    };
    let pairings = if args.pairings.is_empty() {
        config.combine.pairings.clone()
    } else {
        args.pairings
    };
    let options = CombineOptions {
        normalize: args.normalize,
    };

    let store = VectorStore::from_config(config);
    let reports = combine_grid(&store, &dropouts, &pairings, &alphas, &options)?;

    emit(&reports, args.format, || {
        for report in &reports {
            match &report.skipped {
                Some(reason) => println!(
                    "{:<12} {:<18} {:.2}  skipped ({:?})",
                    report.dropout_level, report.representation, report.alpha, reason
                ),
                None => println!(
                    "{:<12} {:<18} {:.2}  {:>6} written  {:>4} missing text  {:>3} failed",
                    report.dropout_level,
                    report.representation,
                    report.alpha,
                    report.processed,
                    report.missing_text,
                    report.failed
                ),
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_pairing_accepts_codes_and_folders() {
        assert!(parse_pairing("LowImg-HighText").is_ok());
        assert!(parse_pairing("high_info_img__low_info_text").is_ok());
        assert!(parse_pairing("MidImg-HighText").is_err());
    }
}
