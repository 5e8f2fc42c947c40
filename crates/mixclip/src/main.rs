//! mixclip CLI - blend CLIP image and text embeddings and measure how
//! classifiers respond.
//!
//! # Usage
//!
//! ```bash
//! # Build the sample set and its degraded copies
//! mixclip sample build --per-class 500
//! mixclip degrade
//!
//! # Describe, embed, blend
//! mixclip describe
//! mixclip embed all
//! mixclip combine
//!
//! # Evaluate every condition and summarize
//! mixclip evaluate grid
//! mixclip analyze best-alpha results/combined_results.csv
//! ```

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod cli;
mod logging;

/// mixclip - blend CLIP embeddings and evaluate classifiers on every blend.
#[derive(Parser, Debug)]
#[command(name = "mixclip")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose (debug) logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output logs in JSON format
    #[arg(long, global = true)]
    json_logs: bool,

    /// Config file to use instead of the default location
    #[arg(long, global = true, env = "MIXCLIP_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Draw balanced photo samples from the unfiltered pool
    Sample(cli::sample::SampleArgs),

    /// Produce pixel-dropout copies of the sample set
    Degrade(cli::degrade::DegradeArgs),

    /// Generate high-info and low-info descriptions with a vision LLM
    Describe(cli::describe::DescribeArgs),

    /// Encode photos and descriptions with CLIP
    Embed(cli::embed::EmbedArgs),

    /// Blend image and text embeddings over the alpha grid
    Combine(cli::combine::CombineArgs),

    /// Cross-validate classifiers on embedding folders
    Evaluate(cli::evaluate::EvaluateArgs),

    /// Summarize result CSVs
    Analyze(cli::analyze::AnalyzeArgs),

    /// Manage the CLIP model files (download, list, etc.)
    Models(cli::models::ModelsArgs),

    /// View and manage configuration
    Config(cli::config::ConfigArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Logging isn't initialized yet, so config warnings go through eprintln.
    let config = match mixclip_core::Config::load_or_default(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!(
                "Warning: Failed to load config: {e}\n  \
                 Using default configuration. Check your config file with `mixclip config path`."
            );
            mixclip_core::Config::default()
        }
    };
    logging::init_from_config(&config, cli.verbose, cli.json_logs);

    tracing::debug!("mixclip v{}", mixclip_core::VERSION);

    match cli.command {
        Commands::Sample(args) => cli::sample::execute(args, &config),
        Commands::Degrade(args) => cli::degrade::execute(args, &config),
        Commands::Describe(args) => cli::describe::execute(args, &config).await,
        Commands::Embed(args) => cli::embed::execute(args, &config),
        Commands::Combine(args) => cli::combine::execute(args, &config),
        Commands::Evaluate(args) => cli::evaluate::execute(args, &config),
        Commands::Analyze(args) => cli::analyze::execute(args, &config),
        Commands::Models(args) => cli::models::execute(args, &config).await,
        Commands::Config(args) => cli::config::execute(args, &config, cli.config.as_deref()),
    }
}
