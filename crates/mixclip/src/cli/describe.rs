//! The `mixclip describe` command: high-info and low-info descriptions per photo.

use std::path::PathBuf;

use clap::Args;
use mixclip_core::describe::{DescribeOptions, Describer};
use mixclip_core::llm::{LlmProvider, LlmProviderFactory};
use mixclip_core::{Config, InfoLevel};

use super::{create_progress_bar, emit, OutputFormat};

#[derive(Args, Debug)]
pub struct DescribeArgs {
    /// Photos to describe (defaults to the high-info photo dir)
    #[arg(long)]
    photos: Option<PathBuf>,

    /// Where high-info descriptions go
    #[arg(long)]
    high_out: Option<PathBuf>,

    /// Where low-info descriptions go
    #[arg(long)]
    low_out: Option<PathBuf>,

    /// LLM provider: openai, anthropic or ollama
    #[arg(long)]
    provider: Option<String>,

    /// Model override for the chosen provider
    #[arg(long)]
    model: Option<String>,

    /// Only describe these file names (repeatable), e.g. `dog.1287.jpg`
    #[arg(long)]
    only: Vec<String>,

    /// Skip photos that already have both descriptions
    #[arg(long)]
    skip_existing: bool,

    /// Output format for the report
    #[arg(short, long, value_enum, default_value = "text")]
    format: OutputFormat,
}

pub async fn execute(args: DescribeArgs, config: &Config) -> anyhow::Result<()> {
    let photos = args.photos.unwrap_or_else(|| {
        config
            .data_path(&config.layout.photos_dir)
            .join(InfoLevel::High.dir_name())
    });
    let descriptions = config.data_path(&config.layout.descriptions_dir);
    let high_out = args
        .high_out
        .unwrap_or_else(|| descriptions.join(InfoLevel::High.dir_name()));
    let low_out = args
        .low_out
        .unwrap_or_else(|| descriptions.join(InfoLevel::Low.dir_name()));

    let provider_name = args
        .provider
        .unwrap_or_else(|| config.describe.provider.clone());
    let provider = LlmProviderFactory::create(&provider_name, &config.llm, args.model.as_deref())?;
    if !provider.is_available().await {
        tracing::warn!(
            "Provider {} does not look reachable; requests may fail",
            provider.name()
        );
    }

    let describer = Describer::new(provider, &config.describe);
    let options = DescribeOptions {
        only: args.only,
        skip_existing: args.skip_existing,
    };

    let (selected, _) = describer.select(&photos, &high_out, &low_out, &options);
    let pb = create_progress_bar(selected.len() as u64, describer.provider_name());
    let report = describer
        .describe_directory(&photos, &high_out, &low_out, &options, || pb.inc(1))
        .await?;
    pb.finish_and_clear();

    emit(&report, args.format, || {
        println!(
            "Described {} of {} photos ({} skipped)",
            report.described, report.total, report.skipped
        );
        if !report.malformed.is_empty() {
            println!("Malformed responses ({}):", report.malformed.len());
            for name in &report.malformed {
                println!("  {name}");
            }
        }
        if !report.failed.is_empty() {
            println!("Failed requests ({}):", report.failed.len());
            for name in &report.failed {
                println!("  {name}");
            }
        }
    })
}
