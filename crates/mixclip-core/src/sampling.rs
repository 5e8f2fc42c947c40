//! Drawing balanced photo samples from an unfiltered pool.
//!
//! Pool files are named `{class}.{id}.{ext}`; a file belongs to a class when
//! its name starts with `{class}.`.

use std::path::{Path, PathBuf};

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::Serialize;

use crate::error::PipelineError;

/// Files copied into the sample set, per class.
#[derive(Debug, Clone, Serialize)]
pub struct SampleReport {
    pub target: PathBuf,
    pub per_class: Vec<(String, usize)>,
    pub copied: usize,
}

/// Seeded RNG, or an entropy-seeded one when no seed is given.
pub fn make_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(s) => StdRng::seed_from_u64(s),
        None => StdRng::from_entropy(),
    }
}

/// File names in `dir` starting with `{class}.`, sorted.
pub fn class_files(dir: &Path, class: &str) -> Result<Vec<String>, PipelineError> {
    let prefix = format!("{class}.");
    let entries = std::fs::read_dir(dir).map_err(|e| PipelineError::io(dir, e))?;
    let mut names: Vec<String> = entries
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().map(|t| t.is_file()).unwrap_or(false))
        .filter_map(|entry| entry.file_name().into_string().ok())
        .filter(|name| name.starts_with(&prefix))
        .collect();
    names.sort();
    Ok(names)
}

fn copy_into(source: &Path, target: &Path, name: &str) -> Result<(), PipelineError> {
    let from = source.join(name);
    std::fs::copy(&from, target.join(name)).map_err(|e| PipelineError::io(&from, e))?;
    Ok(())
}

/// Copy a uniform random sample of `per_class` files per class into `target`.
///
/// Every class is checked for enough candidates before anything is copied.
pub fn construct_sample_set(
    source: &Path,
    target: &Path,
    classes: &[String],
    per_class: usize,
    seed: Option<u64>,
) -> Result<SampleReport, PipelineError> {
    if !source.is_dir() {
        return Err(PipelineError::FileNotFound(source.to_path_buf()));
    }

    let mut rng = make_rng(seed);
    let mut selections = Vec::with_capacity(classes.len());
    for class in classes {
        let candidates = class_files(source, class)?;
        if candidates.len() < per_class {
            return Err(PipelineError::Sampling(format!(
                "class '{}' has {} candidates in {:?}, need {}",
                class,
                candidates.len(),
                source,
                per_class
            )));
        }
        let chosen: Vec<String> = candidates
            .choose_multiple(&mut rng, per_class)
            .cloned()
            .collect();
        selections.push((class.clone(), chosen));
    }

    std::fs::create_dir_all(target).map_err(|e| PipelineError::io(target, e))?;

    let mut copied = 0;
    let mut per_class_counts = Vec::with_capacity(selections.len());
    for (class, names) in &selections {
        for name in names {
            copy_into(source, target, name)?;
            copied += 1;
        }
        tracing::info!("Copied {} {} images", names.len(), class);
        per_class_counts.push((class.clone(), names.len()));
    }

    Ok(SampleReport {
        target: target.to_path_buf(),
        per_class: per_class_counts,
        copied,
    })
}

/// Copy one randomly chosen `{class}.*` file not already present in `target`.
///
/// Returns the copied file name.
pub fn add_one(
    source: &Path,
    target: &Path,
    class: &str,
    seed: Option<u64>,
) -> Result<String, PipelineError> {
    if !source.is_dir() {
        return Err(PipelineError::FileNotFound(source.to_path_buf()));
    }
    std::fs::create_dir_all(target).map_err(|e| PipelineError::io(target, e))?;

    let available: Vec<String> = class_files(source, class)?
        .into_iter()
        .filter(|name| !target.join(name).exists())
        .collect();

    let mut rng = make_rng(seed);
    let chosen = available.choose(&mut rng).cloned().ok_or_else(|| {
        PipelineError::Sampling(format!(
            "no '{class}' images left in {source:?} that are not already in {target:?}"
        ))
    })?;

    copy_into(source, target, &chosen)?;
    tracing::info!("Added new {} image: {}", class, chosen);
    Ok(chosen)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pool(dir: &Path, cats: usize, dogs: usize) {
        for i in 0..cats {
            std::fs::write(dir.join(format!("cat.{i}.jpg")), b"c").unwrap();
        }
        for i in 0..dogs {
            std::fs::write(dir.join(format!("dog.{i}.jpg")), b"d").unwrap();
        }
        std::fs::write(dir.join("catalog.txt"), b"not a photo").unwrap();
    }

    fn classes() -> Vec<String> {
        vec!["cat".to_string(), "dog".to_string()]
    }

    fn listing(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn test_class_files_uses_dot_prefix() {
        let src = tempfile::tempdir().unwrap();
        pool(src.path(), 2, 1);
        assert_eq!(
            class_files(src.path(), "cat").unwrap(),
            vec!["cat.0.jpg", "cat.1.jpg"]
        );
    }

    #[test]
    fn test_construct_sample_set_balanced() {
        let src = tempfile::tempdir().unwrap();
        let dst = tempfile::tempdir().unwrap();
        pool(src.path(), 10, 8);
        let target = dst.path().join("high_info");

        let report = construct_sample_set(src.path(), &target, &classes(), 5, Some(42)).unwrap();
        assert_eq!(report.copied, 10);

        let names = listing(&target);
        assert_eq!(names.iter().filter(|n| n.starts_with("cat.")).count(), 5);
        assert_eq!(names.iter().filter(|n| n.starts_with("dog.")).count(), 5);
    }

    #[test]
    fn test_construct_sample_set_same_seed_same_sample() {
        let src = tempfile::tempdir().unwrap();
        let dst = tempfile::tempdir().unwrap();
        pool(src.path(), 20, 20);

        let a = dst.path().join("a");
        let b = dst.path().join("b");
        construct_sample_set(src.path(), &a, &classes(), 4, Some(7)).unwrap();
        construct_sample_set(src.path(), &b, &classes(), 4, Some(7)).unwrap();
        assert_eq!(listing(&a), listing(&b));
    }

    #[test]
    fn test_construct_sample_set_too_few_copies_nothing() {
        let src = tempfile::tempdir().unwrap();
        let dst = tempfile::tempdir().unwrap();
        pool(src.path(), 10, 2);
        let target = dst.path().join("out");

        let err = construct_sample_set(src.path(), &target, &classes(), 5, Some(1)).unwrap_err();
        assert!(matches!(err, PipelineError::Sampling(_)));
        assert!(!target.exists());
    }

    #[test]
    fn test_add_one_skips_existing() {
        let src = tempfile::tempdir().unwrap();
        let dst = tempfile::tempdir().unwrap();
        pool(src.path(), 0, 2);
        std::fs::write(dst.path().join("dog.0.jpg"), b"d").unwrap();

        let added = add_one(src.path(), dst.path(), "dog", Some(3)).unwrap();
        assert_eq!(added, "dog.1.jpg");

        let err = add_one(src.path(), dst.path(), "dog", Some(3)).unwrap_err();
        assert!(matches!(err, PipelineError::Sampling(_)));
    }
}
