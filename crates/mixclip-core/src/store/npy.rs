//! Reading and writing single embedding vectors as `.npy` files.

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use ndarray::{Array1, ArrayView1};
use ndarray_npy::{ReadNpyError, ReadNpyExt, WriteNpyExt};

use crate::error::PipelineError;

/// Read a 1-D vector from a `.npy` file.
///
/// `float32` files are read directly; `float64` files are narrowed to `f32`.
pub fn read_vector(path: &Path) -> Result<Vec<f32>, PipelineError> {
    match read_as::<f32>(path) {
        Ok(v) => Ok(v.to_vec()),
        Err(ReadNpyError::WrongDescriptor(_)) => {
            let v = read_as::<f64>(path).map_err(|e| vector_err(path, e))?;
            Ok(v.iter().map(|&x| x as f32).collect())
        }
        Err(ReadNpyError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(PipelineError::FileNotFound(path.to_path_buf()))
        }
        Err(e) => Err(vector_err(path, e)),
    }
}

/// Write a 1-D `float32` vector to a `.npy` file, replacing any existing file.
pub fn write_vector(path: &Path, data: &[f32]) -> Result<(), PipelineError> {
    let file = File::create(path).map_err(|e| PipelineError::io(path, e))?;
    ArrayView1::from(data)
        .write_npy(BufWriter::new(file))
        .map_err(|e| PipelineError::Vector {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
}

fn read_as<T: ndarray_npy::ReadableElement>(path: &Path) -> Result<Array1<T>, ReadNpyError> {
    let file = File::open(path)?;
    Array1::<T>::read_npy(file)
}

fn vector_err(path: &Path, e: ReadNpyError) -> PipelineError {
    PipelineError::Vector {
        path: path.to_path_buf(),
        message: e.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_then_read_f32() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cat.1.npy");
        write_vector(&path, &[0.5, -1.25, 3.0]).unwrap();
        assert_eq!(read_vector(&path).unwrap(), vec![0.5, -1.25, 3.0]);
    }

    #[test]
    fn test_read_f64_is_narrowed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dog.1.npy");
        let file = File::create(&path).unwrap();
        Array1::from(vec![1.5f64, 2.0]).write_npy(file).unwrap();
        assert_eq!(read_vector(&path).unwrap(), vec![1.5f32, 2.0]);
    }

    #[test]
    fn test_read_missing_file() {
        let err = read_vector(Path::new("/no/such/vector.npy")).unwrap_err();
        assert!(matches!(err, PipelineError::FileNotFound(_)));
    }

    #[test]
    fn test_read_garbage_is_vector_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.npy");
        std::fs::write(&path, b"not numpy at all").unwrap();
        assert!(matches!(
            read_vector(&path),
            Err(PipelineError::Vector { .. })
        ));
    }
}
