//! Embedding store: `.npy` vector files laid out one directory per condition.
//!
//! ```text
//! vector_store/
//!   image_embeddings/high_info/
//!   image_embeddings/low_info/dropout_{p}/
//!   text_embeddings/{high,low}_info/
//!   combined_embeddings/dropout_{p}/{img}_img__{text}_text/alpha_{a}/
//! ```

pub mod npy;

use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::discovery::{DiscoveredFile, FileDiscovery};
use crate::experiment::representation::{alpha_dir_name, DropoutLevel, InfoLevel, Pairing};

pub use npy::{read_vector, write_vector};

const IMAGE_EMBEDDINGS: &str = "image_embeddings";
const TEXT_EMBEDDINGS: &str = "text_embeddings";
const COMBINED_EMBEDDINGS: &str = "combined_embeddings";

/// Resolves directories inside the embedding store.
#[derive(Debug, Clone)]
pub struct VectorStore {
    root: PathBuf,
}

impl VectorStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.vector_store_dir())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Image embeddings for an info level.
    ///
    /// High-info images are pristine and ignore `dropout`; low-info images
    /// live under the dropout level's subdirectory.
    pub fn image_dir(&self, level: InfoLevel, dropout: DropoutLevel) -> PathBuf {
        let base = self.root.join(IMAGE_EMBEDDINGS).join(level.dir_name());
        match level {
            InfoLevel::High => base,
            InfoLevel::Low => base.join(dropout.dir_name()),
        }
    }

    /// Text embeddings for an info level.
    pub fn text_dir(&self, level: InfoLevel) -> PathBuf {
        self.root.join(TEXT_EMBEDDINGS).join(level.dir_name())
    }

    /// Root of all combined embeddings for one dropout level.
    pub fn combined_root(&self, dropout: DropoutLevel) -> PathBuf {
        self.root.join(COMBINED_EMBEDDINGS).join(dropout.dir_name())
    }

    /// Combined embeddings for one pairing and mixing weight.
    pub fn combined_dir(&self, dropout: DropoutLevel, pairing: Pairing, alpha: f32) -> PathBuf {
        self.combined_root(dropout)
            .join(pairing.folder_name())
            .join(alpha_dir_name(alpha))
    }

    /// Resolve a path relative to the store root.
    pub fn subdir(&self, relative: &str) -> PathBuf {
        self.root.join(relative)
    }

    /// The single-modality directories counted by inventory checks.
    pub fn inventory_subdirs(dropout: DropoutLevel) -> Vec<String> {
        vec![
            format!("{IMAGE_EMBEDDINGS}/high_info"),
            format!("{IMAGE_EMBEDDINGS}/low_info/{}", dropout.dir_name()),
            format!("{TEXT_EMBEDDINGS}/high_info"),
            format!("{TEXT_EMBEDDINGS}/low_info"),
        ]
    }
}

/// `.npy` files in a directory, sorted by name.
pub fn list_vectors(dir: &Path) -> Vec<DiscoveredFile> {
    FileDiscovery::vectors().discover(dir)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_dir_respects_dropout_only_for_low_info() {
        let store = VectorStore::new("/vs");
        assert_eq!(
            store.image_dir(InfoLevel::High, DropoutLevel(25)),
            PathBuf::from("/vs/image_embeddings/high_info")
        );
        assert_eq!(
            store.image_dir(InfoLevel::Low, DropoutLevel(25)),
            PathBuf::from("/vs/image_embeddings/low_info/dropout_25")
        );
    }

    #[test]
    fn test_combined_dir_layout() {
        let store = VectorStore::new("/vs");
        let pairing = Pairing::new(InfoLevel::Low, InfoLevel::High);
        assert_eq!(
            store.combined_dir(DropoutLevel(90), pairing, 0.75),
            PathBuf::from(
                "/vs/combined_embeddings/dropout_90/low_info_img__high_info_text/alpha_0.75"
            )
        );
    }

    #[test]
    fn test_inventory_subdirs() {
        let dirs = VectorStore::inventory_subdirs(DropoutLevel(50));
        assert_eq!(dirs[1], "image_embeddings/low_info/dropout_50");
        assert_eq!(dirs.len(), 4);
    }
}
