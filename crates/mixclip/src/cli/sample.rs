//! The `mixclip sample` command: balanced sample sets from the photo pool.

use std::path::PathBuf;

use clap::{Args, Subcommand};
use mixclip_core::sampling::{add_one, construct_sample_set};
use mixclip_core::{Config, InfoLevel};

use super::{emit, OutputFormat};

#[derive(Args, Debug)]
pub struct SampleArgs {
    #[command(subcommand)]
    pub command: SampleCommand,
}

#[derive(Subcommand, Debug)]
pub enum SampleCommand {
    /// Copy a uniform random sample of each class into the sample set
    Build {
        /// Pool of source photos (defaults to the layout's unfiltered dir)
        #[arg(long)]
        source: Option<PathBuf>,

        /// Destination directory (defaults to the high-info photo dir)
        #[arg(long)]
        target: Option<PathBuf>,

        /// Photos per class
        #[arg(long)]
        per_class: Option<usize>,

        /// Seed for reproducible sampling
        #[arg(long)]
        seed: Option<u64>,

        /// Output format for the report
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Copy one more photo of a class that is not yet in the sample set
    Add {
        /// Class prefix, e.g. `cat`
        #[arg(long)]
        class: String,

        #[arg(long)]
        source: Option<PathBuf>,

        #[arg(long)]
        target: Option<PathBuf>,

        #[arg(long)]
        seed: Option<u64>,
    },
}

fn default_source(config: &Config) -> PathBuf {
    config.data_path(&config.layout.unfiltered_dir)
}

fn default_target(config: &Config) -> PathBuf {
    config
        .data_path(&config.layout.photos_dir)
        .join(InfoLevel::High.dir_name())
}

pub fn execute(args: SampleArgs, config: &Config) -> anyhow::Result<()> {
    match args.command {
        SampleCommand::Build {
            source,
            target,
            per_class,
            seed,
            format,
        } => {
            let source = source.unwrap_or_else(|| default_source(config));
            let target = target.unwrap_or_else(|| default_target(config));
            let per_class = per_class.unwrap_or(config.sampling.per_class);
            let seed = seed.or(config.sampling.seed);

            let report = construct_sample_set(
                &source,
                &target,
                &config.dataset.classes,
                per_class,
                seed,
            )?;

            emit(&report, format, || {
                for (class, n) in &report.per_class {
                    println!("{:>8}  {}", n, class);
                }
                println!("Copied {} photos to {}", report.copied, report.target.display());
            })?;
        }

        SampleCommand::Add {
            class,
            source,
            target,
            seed,
        } => {
            let source = source.unwrap_or_else(|| default_source(config));
            let target = target.unwrap_or_else(|| default_target(config));
            let name = add_one(&source, &target, &class, seed)?;
            println!("Added {} to {}", name, target.display());
        }
    }

    Ok(())
}
