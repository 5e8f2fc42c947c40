//! The `mixclip embed` command: CLIP embeddings for photos and descriptions.

use std::path::{Path, PathBuf};

use clap::{Args, Subcommand};
use mixclip_core::discovery::FileDiscovery;
use mixclip_core::embedding::{
    ClipPaths, EmbedReport, ImageEmbedder, TextEmbedder, VectorizeOptions, Vectorizer,
};
use mixclip_core::{Config, DropoutLevel, InfoLevel, VectorStore};

use super::{create_progress_bar, emit, OutputFormat};

#[derive(Args, Debug)]
pub struct EmbedArgs {
    #[command(subcommand)]
    pub command: EmbedCommand,
}

#[derive(Subcommand, Debug)]
pub enum EmbedCommand {
    /// Embed every photo in a directory
    Images {
        input: PathBuf,
        output: PathBuf,

        /// Keep existing `.npy` files
        #[arg(long)]
        skip_existing: bool,
    },

    /// Embed every `.txt` description in a directory
    Texts {
        input: PathBuf,
        output: PathBuf,

        #[arg(long)]
        skip_existing: bool,
    },

    /// Embed the whole sample set into the vector store
    All {
        /// Dropout levels to embed (defaults to `[dropout] levels`)
        #[arg(short, long = "dropout")]
        dropouts: Vec<DropoutLevel>,

        #[arg(long)]
        skip_existing: bool,

        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },
}

fn options(config: &Config, skip_existing: bool) -> VectorizeOptions {
    VectorizeOptions {
        skip_existing,
        ..VectorizeOptions::from_config(&config.embedding)
    }
}

fn clip_paths(config: &Config) -> anyhow::Result<ClipPaths> {
    let paths = ClipPaths::new(&config.clip_model_dir());
    let missing = paths.missing();
    if !missing.is_empty() {
        anyhow::bail!(
            "Missing model files: {:?}\nRun `mixclip models download` first.",
            missing
        );
    }
    Ok(paths)
}

fn embed_images(
    vectorizer: &Vectorizer,
    encoder: &dyn ImageEmbedder,
    input: &Path,
    output: &Path,
) -> anyhow::Result<EmbedReport> {
    let total = FileDiscovery::images().discover(input).len() as u64;
    let pb = create_progress_bar(total, "images");
    let report = vectorizer.embed_images(encoder, input, output, || pb.inc(1))?;
    pb.finish_and_clear();
    Ok(report)
}

fn embed_texts(
    vectorizer: &Vectorizer,
    encoder: &dyn TextEmbedder,
    input: &Path,
    output: &Path,
) -> anyhow::Result<EmbedReport> {
    let total = FileDiscovery::texts().discover(input).len() as u64;
    let pb = create_progress_bar(total, "texts");
    let report = vectorizer.embed_texts(encoder, input, output, || pb.inc(1))?;
    pb.finish_and_clear();
    Ok(report)
}

fn print_report(report: &EmbedReport) {
    println!(
        "{:>6} embedded  {:>5} skipped  {:>4} failed  dim {}  -> {}",
        report.embedded,
        report.skipped,
        report.failed,
        report
            .dimension
            .map(|d| d.to_string())
            .unwrap_or_else(|| "-".to_string()),
        report.output_dir.display()
    );
}

pub fn execute(args: EmbedArgs, config: &Config) -> anyhow::Result<()> {
    match args.command {
        EmbedCommand::Images {
            input,
            output,
            skip_existing,
        } => {
            let encoder = clip_paths(config)?.load_image_encoder(&config.embedding)?;
            let vectorizer = Vectorizer::new(options(config, skip_existing));
            let report = embed_images(&vectorizer, &encoder, &input, &output)?;
            print_report(&report);
        }

        EmbedCommand::Texts {
            input,
            output,
            skip_existing,
        } => {
            let encoder = clip_paths(config)?.load_text_encoder(&config.embedding)?;
            let vectorizer = Vectorizer::new(options(config, skip_existing));
            let report = embed_texts(&vectorizer, &encoder, &input, &output)?;
            print_report(&report);
        }

        EmbedCommand::All {
            dropouts,
            skip_existing,
            format,
        } => {
            let dropouts: Vec<DropoutLevel> = if dropouts.is_empty() {
                config.dropout.levels.iter().map(|&p| DropoutLevel(p)).collect()
            } else {
                dropouts
            };
            let store = VectorStore::from_config(config);
            let photos = config.data_path(&config.layout.photos_dir);
            let descriptions = config.data_path(&config.layout.descriptions_dir);
            let vectorizer = Vectorizer::new(options(config, skip_existing));
            let paths = clip_paths(config)?;
            let mut reports = Vec::new();

            let image_encoder = paths.load_image_encoder(&config.embedding)?;
            reports.push(embed_images(
                &vectorizer,
                &image_encoder,
                &photos.join(InfoLevel::High.dir_name()),
                &store.image_dir(InfoLevel::High, DropoutLevel::PRISTINE),
            )?);
            for &dropout in &dropouts {
                let input = photos
                    .join(InfoLevel::Low.dir_name())
                    .join(dropout.dir_name());
                if !input.is_dir() {
                    tracing::warn!("Skipping {}: {:?} does not exist", dropout, input);
                    continue;
                }
                reports.push(embed_images(
                    &vectorizer,
                    &image_encoder,
                    &input,
                    &store.image_dir(InfoLevel::Low, dropout),
                )?);
            }
            drop(image_encoder);

            let text_encoder = paths.load_text_encoder(&config.embedding)?;
            for level in InfoLevel::ALL {
                reports.push(embed_texts(
                    &vectorizer,
                    &text_encoder,
                    &descriptions.join(level.dir_name()),
                    &store.text_dir(level),
                )?);
            }

            emit(&reports, format, || reports.iter().for_each(print_report))?;
        }
    }

    Ok(())
}
