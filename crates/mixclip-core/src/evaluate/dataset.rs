//! Labelled embedding datasets loaded from a directory of `.npy` files.

use std::path::Path;

use ndarray::{Array2, Axis};

use crate::error::PipelineError;
use crate::store::{list_vectors, read_vector};

/// A feature matrix with one row per embedding and a class label per row.
#[derive(Debug, Clone)]
pub struct Dataset {
    /// `n_samples × dimension` features
    pub features: Array2<f64>,
    /// Class index per row
    pub labels: Vec<usize>,
    /// Source file name per row
    pub names: Vec<String>,
    /// Class names, indexed by label
    pub classes: Vec<String>,
}

/// Label for a file name: the index of the first class whose name appears in it.
pub fn label_for(file_name: &str, classes: &[String]) -> Option<usize> {
    classes.iter().position(|c| file_name.contains(c.as_str()))
}

impl Dataset {
    /// Load every `.npy` in `dir` (sorted by name) as a labelled sample.
    ///
    /// Files matching no class are skipped with a warning. All vectors must
    /// share one dimension. An empty result is an error.
    pub fn load(dir: &Path, classes: &[String]) -> Result<Self, PipelineError> {
        if !dir.is_dir() {
            return Err(PipelineError::FileNotFound(dir.to_path_buf()));
        }

        let files = list_vectors(dir);
        let mut rows: Vec<Vec<f32>> = Vec::with_capacity(files.len());
        let mut labels = Vec::with_capacity(files.len());
        let mut names = Vec::with_capacity(files.len());
        let mut dimension: Option<usize> = None;

        for file in &files {
            let name = file.file_name();
            let Some(label) = label_for(&name, classes) else {
                tracing::warn!("Skipping {}: file name matches no class {:?}", name, classes);
                continue;
            };

            let vector = read_vector(&file.path)?;
            match dimension {
                None => dimension = Some(vector.len()),
                Some(d) if d != vector.len() => {
                    return Err(PipelineError::DimensionMismatch {
                        path: file.path.clone(),
                        expected: d,
                        actual: vector.len(),
                    });
                }
                Some(_) => {}
            }

            rows.push(vector);
            labels.push(label);
            names.push(name);
        }

        let dimension = match dimension {
            Some(d) if d > 0 => d,
            _ => {
                return Err(PipelineError::Dataset {
                    path: dir.to_path_buf(),
                    message: "no labelled embeddings found".to_string(),
                })
            }
        };

        let flat: Vec<f64> = rows.iter().flatten().map(|&v| f64::from(v)).collect();
        let features = Array2::from_shape_vec((rows.len(), dimension), flat).map_err(|e| {
            PipelineError::Dataset {
                path: dir.to_path_buf(),
                message: e.to_string(),
            }
        })?;

        Ok(Self {
            features,
            labels,
            names,
            classes: classes.to_vec(),
        })
    }

    /// Build a dataset from in-memory parts.
    pub fn from_parts(features: Array2<f64>, labels: Vec<usize>, classes: Vec<String>) -> Self {
        let names = (0..labels.len()).map(|i| format!("sample_{i}")).collect();
        Self {
            features,
            labels,
            names,
            classes,
        }
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn dimension(&self) -> usize {
        self.features.ncols()
    }

    pub fn n_classes(&self) -> usize {
        self.classes.len()
    }

    /// Number of samples per class, indexed by label.
    pub fn label_counts(&self) -> Vec<usize> {
        let mut counts = vec![0; self.classes.len()];
        for &l in &self.labels {
            counts[l] += 1;
        }
        counts
    }

    /// Rows and labels at the given indices.
    pub fn select(&self, indices: &[usize]) -> (Array2<f64>, Vec<usize>) {
        let x = self.features.select(Axis(0), indices);
        let y = indices.iter().map(|&i| self.labels[i]).collect();
        (x, y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::write_vector;

    fn classes() -> Vec<String> {
        vec!["cat".to_string(), "dog".to_string()]
    }

    #[test]
    fn test_label_for() {
        assert_eq!(label_for("cat.12.npy", &classes()), Some(0));
        assert_eq!(label_for("dog.3.npy", &classes()), Some(1));
        assert_eq!(label_for("bird.3.npy", &classes()), None);
    }

    #[test]
    fn test_load_builds_matrix_in_name_order() {
        let dir = tempfile::tempdir().unwrap();
        write_vector(&dir.path().join("dog.1.npy"), &[3.0, 4.0]).unwrap();
        write_vector(&dir.path().join("cat.1.npy"), &[1.0, 2.0]).unwrap();
        write_vector(&dir.path().join("fox.1.npy"), &[9.0, 9.0]).unwrap();

        let ds = Dataset::load(dir.path(), &classes()).unwrap();
        assert_eq!(ds.len(), 2);
        assert_eq!(ds.dimension(), 2);
        assert_eq!(ds.labels, vec![0, 1]);
        assert_eq!(ds.names, vec!["cat.1.npy", "dog.1.npy"]);
        assert_eq!(ds.features[[1, 1]], 4.0);
        assert_eq!(ds.label_counts(), vec![1, 1]);
    }

    #[test]
    fn test_load_rejects_mixed_dimensions() {
        let dir = tempfile::tempdir().unwrap();
        write_vector(&dir.path().join("cat.1.npy"), &[1.0, 2.0]).unwrap();
        write_vector(&dir.path().join("dog.1.npy"), &[1.0, 2.0, 3.0]).unwrap();
        assert!(matches!(
            Dataset::load(dir.path(), &classes()),
            Err(PipelineError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn test_load_empty_dir_is_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            Dataset::load(dir.path(), &classes()),
            Err(PipelineError::Dataset { .. })
        ));
    }

    #[test]
    fn test_select() {
        let ds = Dataset::from_parts(
            Array2::from_shape_vec((3, 1), vec![0.0, 1.0, 2.0]).unwrap(),
            vec![0, 1, 0],
            classes(),
        );
        let (x, y) = ds.select(&[2, 0]);
        assert_eq!(x[[0, 0]], 2.0);
        assert_eq!(y, vec![0, 0]);
    }
}
