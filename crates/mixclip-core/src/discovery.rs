//! File discovery for finding images, descriptions, and embeddings in directories.

use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Image extensions accepted by the embedding stage.
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png"];

/// Extension of generated descriptions.
pub const TEXT_EXTENSIONS: &[&str] = &["txt"];

/// Extension of stored embedding vectors.
pub const VECTOR_EXTENSIONS: &[&str] = &["npy"];

/// Discovers files with a given set of extensions.
///
/// Each stage of the pipeline reads a flat directory, so discovery is
/// non-recursive unless `recursive` is set.
pub struct FileDiscovery {
    extensions: Vec<String>,
    recursive: bool,
}

/// Information about a discovered file.
#[derive(Debug, Clone)]
pub struct DiscoveredFile {
    /// Full path to the file
    pub path: PathBuf,
    /// File size in bytes
    pub size: u64,
}

impl DiscoveredFile {
    /// File name without its final extension (`cat.12.jpg` -> `cat.12`).
    pub fn stem(&self) -> String {
        self.path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// Full file name.
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

impl FileDiscovery {
    /// Create a discovery instance for the given extensions (case-insensitive).
    pub fn new(extensions: &[&str]) -> Self {
        Self {
            extensions: extensions.iter().map(|e| e.to_lowercase()).collect(),
            recursive: false,
        }
    }

    /// Descend into subdirectories as well.
    pub fn recursive(mut self, recursive: bool) -> Self {
        self.recursive = recursive;
        self
    }

    pub fn images() -> Self {
        Self::new(IMAGE_EXTENSIONS)
    }

    pub fn texts() -> Self {
        Self::new(TEXT_EXTENSIONS)
    }

    pub fn vectors() -> Self {
        Self::new(VECTOR_EXTENSIONS)
    }

    /// Discover all supported files at a path.
    ///
    /// If path is a file, returns it if supported. If path is a directory,
    /// returns its supported files sorted by path. A missing path yields an
    /// empty list.
    pub fn discover(&self, path: &Path) -> Vec<DiscoveredFile> {
        if path.is_file() {
            if self.is_supported(path) {
                if let Ok(meta) = std::fs::metadata(path) {
                    return vec![DiscoveredFile {
                        path: path.to_path_buf(),
                        size: meta.len(),
                    }];
                }
            }
            return vec![];
        }

        let mut walker = WalkDir::new(path).follow_links(true).min_depth(1);
        if !self.recursive {
            walker = walker.max_depth(1);
        }

        let mut files = Vec::new();
        for entry in walker.into_iter().filter_map(|e| e.ok()) {
            let entry_path = entry.path();
            if entry_path.is_file() && self.is_supported(entry_path) {
                if let Ok(meta) = entry.metadata() {
                    files.push(DiscoveredFile {
                        path: entry_path.to_path_buf(),
                        size: meta.len(),
                    });
                }
            }
        }

        // Sort by path for deterministic ordering
        files.sort_by(|a, b| a.path.cmp(&b.path));
        files
    }

    /// Check if a file has a supported extension.
    fn is_supported(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| {
                let ext_lower = ext.to_lowercase();
                self.extensions.iter().any(|e| *e == ext_lower)
            })
            .unwrap_or(false)
    }

    /// Get total size of all discovered files.
    pub fn total_size(files: &[DiscoveredFile]) -> u64 {
        files.iter().map(|f| f.size).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_supported() {
        let discovery = FileDiscovery::images();
        assert!(discovery.is_supported(Path::new("cat.1.jpg")));
        assert!(discovery.is_supported(Path::new("cat.1.JPG")));
        assert!(discovery.is_supported(Path::new("dog.2.jpeg")));
        assert!(discovery.is_supported(Path::new("dog.2.png")));
        assert!(!discovery.is_supported(Path::new("dog.2.txt")));
        assert!(!discovery.is_supported(Path::new("noext")));
    }

    #[test]
    fn test_discover_flat_and_sorted() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("dog.2.npy"), b"x").unwrap();
        std::fs::write(dir.path().join("cat.1.npy"), b"xy").unwrap();
        std::fs::write(dir.path().join("notes.txt"), b"-").unwrap();
        std::fs::create_dir(dir.path().join("nested")).unwrap();
        std::fs::write(dir.path().join("nested/cat.9.npy"), b"x").unwrap();

        let files = FileDiscovery::vectors().discover(dir.path());
        let names: Vec<String> = files.iter().map(|f| f.file_name()).collect();
        assert_eq!(names, vec!["cat.1.npy", "dog.2.npy"]);
        assert_eq!(FileDiscovery::total_size(&files), 3);
        assert_eq!(files[0].stem(), "cat.1");

        let all = FileDiscovery::vectors()
            .recursive(true)
            .discover(dir.path());
        assert_eq!(all.len(), 3);
    }

    #[test]
    fn test_discover_missing_dir_is_empty() {
        let files = FileDiscovery::texts().discover(Path::new("/definitely/not/here"));
        assert!(files.is_empty());
    }
}
