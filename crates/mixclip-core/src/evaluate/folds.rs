//! Stratified k-fold splitting.

use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::error::PipelineError;

/// One train/test split. Both index lists are sorted.
#[derive(Debug, Clone)]
pub struct Fold {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

/// Stratified k-fold: each fold keeps the dataset's class proportions.
#[derive(Debug, Clone)]
pub struct StratifiedKFold {
    n_splits: usize,
    shuffle: bool,
    seed: u64,
}

impl StratifiedKFold {
    /// Shuffled stratified folds with a fixed seed.
    pub fn new(n_splits: usize, seed: u64) -> Self {
        Self {
            n_splits,
            shuffle: true,
            seed,
        }
    }

    /// Keep the original sample order within each class.
    pub fn without_shuffle(mut self) -> Self {
        self.shuffle = false;
        self
    }

    pub fn n_splits(&self) -> usize {
        self.n_splits
    }

    /// Split sample indices into folds.
    ///
    /// Members of each class are shuffled (when enabled) and dealt round-robin
    /// over the folds; the dealing offset carries across classes so fold sizes
    /// differ by at most one.
    pub fn split(&self, labels: &[usize]) -> Result<Vec<Fold>, PipelineError> {
        let n = labels.len();
        if self.n_splits < 2 {
            return Err(PipelineError::Evaluation(format!(
                "need at least 2 folds, got {}",
                self.n_splits
            )));
        }
        if self.n_splits > n {
            return Err(PipelineError::Evaluation(format!(
                "cannot split {} samples into {} folds",
                n, self.n_splits
            )));
        }

        let n_classes = labels.iter().max().map_or(0, |&m| m + 1);
        let mut by_class: Vec<Vec<usize>> = vec![Vec::new(); n_classes];
        for (i, &label) in labels.iter().enumerate() {
            by_class[label].push(i);
        }

        if let Some(min) = by_class.iter().map(Vec::len).filter(|&c| c > 0).min() {
            if min < self.n_splits {
                tracing::warn!(
                    "The least populated class has only {} members, fewer than {} folds",
                    min,
                    self.n_splits
                );
            }
        }

        let mut rng = rand::rngs::StdRng::seed_from_u64(self.seed);
        let mut tests: Vec<Vec<usize>> = vec![Vec::new(); self.n_splits];
        let mut offset = 0;
        for members in by_class.iter_mut() {
            if self.shuffle {
                members.shuffle(&mut rng);
            }
            for (j, &idx) in members.iter().enumerate() {
                tests[(offset + j) % self.n_splits].push(idx);
            }
            offset += members.len();
        }

        let folds = tests
            .into_iter()
            .map(|mut test| {
                test.sort_unstable();
                let mut in_test = vec![false; n];
                for &i in &test {
                    in_test[i] = true;
                }
                let train = (0..n).filter(|&i| !in_test[i]).collect();
                Fold { train, test }
            })
            .collect();

        Ok(folds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn balanced_labels(per_class: usize) -> Vec<usize> {
        (0..per_class * 2).map(|i| i % 2).collect()
    }

    #[test]
    fn test_folds_partition_indices_exactly_once() {
        let labels = balanced_labels(23);
        let folds = StratifiedKFold::new(5, 42).split(&labels).unwrap();
        assert_eq!(folds.len(), 5);

        let mut seen = vec![0usize; labels.len()];
        for fold in &folds {
            assert_eq!(fold.train.len() + fold.test.len(), labels.len());
            for &i in &fold.test {
                seen[i] += 1;
            }
        }
        assert!(seen.iter().all(|&c| c == 1));
    }

    #[test]
    fn test_folds_preserve_class_balance() {
        let mut labels = vec![0; 30];
        labels.extend(vec![1; 70]);
        let folds = StratifiedKFold::new(5, 7).split(&labels).unwrap();
        for fold in &folds {
            let ones = fold.test.iter().filter(|&&i| labels[i] == 1).count();
            let zeros = fold.test.len() - ones;
            assert_eq!(zeros, 6);
            assert_eq!(ones, 14);
        }
    }

    #[test]
    fn test_fold_sizes_differ_by_at_most_one() {
        let mut labels = vec![0; 11];
        labels.extend(vec![1; 13]);
        let folds = StratifiedKFold::new(5, 1).split(&labels).unwrap();
        let sizes: Vec<usize> = folds.iter().map(|f| f.test.len()).collect();
        let max = *sizes.iter().max().unwrap();
        let min = *sizes.iter().min().unwrap();
        assert!(max - min <= 1, "sizes: {sizes:?}");
    }

    #[test]
    fn test_same_seed_same_folds() {
        let labels = balanced_labels(50);
        let a = StratifiedKFold::new(5, 42).split(&labels).unwrap();
        let b = StratifiedKFold::new(5, 42).split(&labels).unwrap();
        let c = StratifiedKFold::new(5, 43).split(&labels).unwrap();
        assert_eq!(a[0].test, b[0].test);
        assert!(a.iter().zip(&c).any(|(x, y)| x.test != y.test));
    }

    #[test]
    fn test_without_shuffle_is_ordered() {
        let labels = vec![0, 0, 0, 1, 1, 1];
        let folds = StratifiedKFold::new(3, 0)
            .without_shuffle()
            .split(&labels)
            .unwrap();
        assert_eq!(folds[0].test, vec![0, 3]);
        assert_eq!(folds[1].test, vec![1, 4]);
        assert_eq!(folds[2].test, vec![2, 5]);
    }

    #[test]
    fn test_invalid_fold_counts() {
        assert!(StratifiedKFold::new(1, 0).split(&[0, 1]).is_err());
        assert!(StratifiedKFold::new(5, 0).split(&[0, 1, 0]).is_err());
    }
}
