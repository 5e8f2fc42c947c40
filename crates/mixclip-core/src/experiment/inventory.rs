//! Embedding count checks for the vector store.

use serde::Serialize;

use crate::store::{list_vectors, VectorStore};

/// `.npy` count of one store subdirectory against the expected count.
#[derive(Debug, Clone, Serialize)]
pub struct CountCheck {
    pub subdir: String,
    pub count: usize,
    pub expected: usize,
    pub exists: bool,
}

impl CountCheck {
    pub fn ok(&self) -> bool {
        self.count == self.expected
    }
}

/// Count embeddings in each subdirectory. A missing directory counts as zero.
pub fn check_counts(store: &VectorStore, subdirs: &[String], expected: usize) -> Vec<CountCheck> {
    subdirs
        .iter()
        .map(|subdir| {
            let dir = store.subdir(subdir);
            let exists = dir.is_dir();
            let count = if exists { list_vectors(&dir).len() } else { 0 };
            let check = CountCheck {
                subdir: subdir.clone(),
                count,
                expected,
                exists,
            };
            if check.ok() {
                tracing::info!("'{}' has {} embeddings", subdir, count);
            } else if !exists {
                tracing::warn!("'{}' does not exist (expected {})", subdir, expected);
            } else {
                tracing::warn!(
                    "'{}' has {} embeddings (expected {})",
                    subdir,
                    count,
                    expected
                );
            }
            check
        })
        .collect()
}
