//! CLIP embedding generation.
//!
//! Photos and descriptions are encoded by the two CLIP ViT-B/32 towers running
//! locally on ONNX Runtime, and each embedding is written as `{stem}.npy`.
//!
//! # Usage
//!
//! ```rust,ignore
//! use mixclip_core::embedding::{ClipImageEncoder, ClipPaths, Vectorizer, VectorizeOptions};
//!
//! let paths = ClipPaths::new(&config.clip_model_dir());
//! let encoder = ClipImageEncoder::load(&paths.vision, config.embedding.image_size)?;
//! let report = Vectorizer::new(VectorizeOptions::default())
//!     .embed_images(&encoder, &photos, &out, || {})?;
//! ```

pub mod clip;
pub(crate) mod preprocess;

use std::path::{Path, PathBuf};

use image::DynamicImage;
use serde::Serialize;

use crate::config::EmbeddingConfig;
use crate::discovery::{DiscoveredFile, FileDiscovery};
use crate::error::PipelineError;
use crate::math::l2_normalize_in_place;
use crate::store::write_vector;

pub use clip::{load_tokenizer, ClipImageEncoder, ClipTextEncoder};

/// Hugging Face repository the ONNX export is fetched from.
pub const CLIP_REPO: &str = "Xenova/clip-vit-base-patch32";

pub const VISION_MODEL_FILENAME: &str = "vision_model.onnx";
pub const TEXT_MODEL_FILENAME: &str = "text_model.onnx";
pub const TOKENIZER_FILENAME: &str = "tokenizer.json";

/// One file of the model bundle: where it lives in the repo and on disk.
#[derive(Debug, Clone, Copy)]
pub struct ModelFile {
    pub remote: &'static str,
    pub local: &'static str,
    /// Rough download size for display
    pub approx_size: &'static str,
}

pub const CLIP_FILES: &[ModelFile] = &[
    ModelFile {
        remote: "onnx/vision_model.onnx",
        local: VISION_MODEL_FILENAME,
        approx_size: "~350MB",
    },
    ModelFile {
        remote: "onnx/text_model.onnx",
        local: TEXT_MODEL_FILENAME,
        approx_size: "~250MB",
    },
    ModelFile {
        remote: "tokenizer.json",
        local: TOKENIZER_FILENAME,
        approx_size: "~2MB",
    },
];

/// Download URL for a file of `repo`.
pub fn hf_url(repo: &str, file: &str) -> String {
    format!("https://huggingface.co/{repo}/resolve/main/{file}")
}

/// Locations of the model bundle inside one model directory.
#[derive(Debug, Clone)]
pub struct ClipPaths {
    pub dir: PathBuf,
    pub vision: PathBuf,
    pub text: PathBuf,
    pub tokenizer: PathBuf,
}

impl ClipPaths {
    pub fn new(model_dir: &Path) -> Self {
        Self {
            dir: model_dir.to_path_buf(),
            vision: model_dir.join(VISION_MODEL_FILENAME),
            text: model_dir.join(TEXT_MODEL_FILENAME),
            tokenizer: model_dir.join(TOKENIZER_FILENAME),
        }
    }

    /// Files of the bundle not yet on disk.
    pub fn missing(&self) -> Vec<PathBuf> {
        [&self.vision, &self.text, &self.tokenizer]
            .into_iter()
            .filter(|p| !p.exists())
            .cloned()
            .collect()
    }

    pub fn load_image_encoder(&self, config: &EmbeddingConfig) -> Result<ClipImageEncoder, PipelineError> {
        tracing::info!("Loading CLIP vision model from {:?}", self.vision);
        ClipImageEncoder::load(&self.vision, config.image_size)
    }

    pub fn load_text_encoder(&self, config: &EmbeddingConfig) -> Result<ClipTextEncoder, PipelineError> {
        tracing::info!("Loading CLIP text model from {:?}", self.text);
        ClipTextEncoder::load(&self.text, &self.tokenizer, config.max_tokens)
    }
}

/// Anything that turns a decoded image into an embedding.
pub trait ImageEmbedder {
    fn embed_image(&self, image: &DynamicImage, path: &Path) -> Result<Vec<f32>, PipelineError>;
}

/// Anything that turns a description into an embedding.
pub trait TextEmbedder {
    fn embed_text(&self, text: &str, path: &Path) -> Result<Vec<f32>, PipelineError>;
}

impl ImageEmbedder for ClipImageEncoder {
    fn embed_image(&self, image: &DynamicImage, path: &Path) -> Result<Vec<f32>, PipelineError> {
        self.embed(image, path)
    }
}

impl TextEmbedder for ClipTextEncoder {
    fn embed_text(&self, text: &str, path: &Path) -> Result<Vec<f32>, PipelineError> {
        self.embed(text, path)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct VectorizeOptions {
    /// L2-normalize before writing
    pub normalize: bool,
    /// Leave existing `{stem}.npy` files alone
    pub skip_existing: bool,
}

impl VectorizeOptions {
    pub fn from_config(config: &EmbeddingConfig) -> Self {
        Self {
            normalize: config.normalize,
            skip_existing: false,
        }
    }
}

/// Counts from embedding one directory.
#[derive(Debug, Clone, Serialize)]
pub struct EmbedReport {
    pub output_dir: PathBuf,
    pub embedded: usize,
    pub skipped: usize,
    pub failed: usize,
    /// Length of the written vectors, once one has been written
    pub dimension: Option<usize>,
}

/// Writes one `.npy` per input file.
pub struct Vectorizer {
    options: VectorizeOptions,
}

impl Vectorizer {
    pub fn new(options: VectorizeOptions) -> Self {
        Self { options }
    }

    /// Embed every `.jpg/.jpeg/.png` in `input` into `output/{stem}.npy`.
    pub fn embed_images(
        &self,
        encoder: &dyn ImageEmbedder,
        input: &Path,
        output: &Path,
        on_file: impl FnMut(),
    ) -> Result<EmbedReport, PipelineError> {
        let files = FileDiscovery::images().discover(input);
        self.embed_files(input, output, &files, on_file, |path| {
            let image = image::open(path).map_err(|e| PipelineError::Image {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;
            encoder.embed_image(&image, path)
        })
    }

    /// Embed every `.txt` in `input` (trimmed) into `output/{stem}.npy`.
    pub fn embed_texts(
        &self,
        encoder: &dyn TextEmbedder,
        input: &Path,
        output: &Path,
        on_file: impl FnMut(),
    ) -> Result<EmbedReport, PipelineError> {
        let files = FileDiscovery::texts().discover(input);
        self.embed_files(input, output, &files, on_file, |path| {
            let text = std::fs::read_to_string(path).map_err(|e| PipelineError::io(path, e))?;
            encoder.embed_text(text.trim(), path)
        })
    }

    fn embed_files(
        &self,
        input: &Path,
        output: &Path,
        files: &[DiscoveredFile],
        mut on_file: impl FnMut(),
        embed: impl Fn(&Path) -> Result<Vec<f32>, PipelineError>,
    ) -> Result<EmbedReport, PipelineError> {
        if !input.is_dir() {
            return Err(PipelineError::FileNotFound(input.to_path_buf()));
        }
        std::fs::create_dir_all(output).map_err(|e| PipelineError::io(output, e))?;
        tracing::info!("Embedding {} files from {:?} -> {:?}", files.len(), input, output);

        let mut report = EmbedReport {
            output_dir: output.to_path_buf(),
            embedded: 0,
            skipped: 0,
            failed: 0,
            dimension: None,
        };

        for file in files {
            let target = output.join(format!("{}.npy", file.stem()));
            if self.options.skip_existing && target.exists() {
                report.skipped += 1;
                on_file();
                continue;
            }

            let result = embed(&file.path).and_then(|mut vector| {
                if self.options.normalize {
                    l2_normalize_in_place(&mut vector);
                }
                write_vector(&target, &vector)?;
                Ok(vector.len())
            });

            match result {
                Ok(dim) => {
                    report.embedded += 1;
                    report.dimension.get_or_insert(dim);
                }
                Err(e) => {
                    tracing::error!("Failed to embed {:?}: {}", file.path, e);
                    report.failed += 1;
                }
            }
            on_file();
        }

        Ok(report)
    }
}
