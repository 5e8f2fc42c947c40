//! Token-length audit of description files against the CLIP context window.

use std::path::Path;

use serde::Serialize;
use tokenizers::Tokenizer;

use crate::discovery::FileDiscovery;
use crate::error::PipelineError;

/// CLIP's text context length, special tokens included.
pub const CLIP_TOKEN_LIMIT: usize = 77;

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct TokenCount {
    pub file: String,
    pub tokens: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct TokenReport {
    pub limit: usize,
    pub counts: Vec<TokenCount>,
    pub over_limit: Vec<TokenCount>,
    pub min: usize,
    pub max: usize,
    pub mean: f64,
}

impl TokenReport {
    fn from_counts(counts: Vec<TokenCount>, limit: usize) -> Self {
        let over_limit = counts
            .iter()
            .filter(|c| c.tokens > limit)
            .cloned()
            .collect();
        let min = counts.iter().map(|c| c.tokens).min().unwrap_or(0);
        let max = counts.iter().map(|c| c.tokens).max().unwrap_or(0);
        let mean = if counts.is_empty() {
            0.0
        } else {
            counts.iter().map(|c| c.tokens as f64).sum::<f64>() / counts.len() as f64
        };
        Self {
            limit,
            counts,
            over_limit,
            min,
            max,
            mean,
        }
    }

    /// Files per `bin_width`-wide token bucket, as `(bucket_start, files)`.
    pub fn histogram(&self, bin_width: usize) -> Vec<(usize, usize)> {
        let width = bin_width.max(1);
        let mut bins: Vec<(usize, usize)> = Vec::new();
        for count in &self.counts {
            let start = count.tokens / width * width;
            match bins.iter_mut().find(|(s, _)| *s == start) {
                Some((_, n)) => *n += 1,
                None => bins.push((start, 1)),
            }
        }
        bins.sort_unstable();
        bins
    }
}

/// Count tokens (special tokens included) for every `.txt` in `dir`.
pub fn token_report(
    dir: &Path,
    tokenizer: &Tokenizer,
    limit: usize,
) -> Result<TokenReport, PipelineError> {
    if !dir.is_dir() {
        return Err(PipelineError::FileNotFound(dir.to_path_buf()));
    }

    let mut counts = Vec::new();
    for file in FileDiscovery::texts().discover(dir) {
        let text = std::fs::read_to_string(&file.path).map_err(|e| PipelineError::io(&file.path, e))?;
        let encoding = tokenizer
            .encode(text.trim(), true)
            .map_err(|e| PipelineError::Model {
                message: format!("Tokenization failed for {:?}: {e}", file.path),
            })?;
        counts.push(TokenCount {
            file: file.file_name(),
            tokens: encoding.get_ids().len(),
        });
    }

    let report = TokenReport::from_counts(counts, limit);
    if report.over_limit.is_empty() {
        tracing::info!("No descriptions exceed {} tokens", limit);
    } else {
        tracing::warn!(
            "{} of {} descriptions exceed {} tokens",
            report.over_limit.len(),
            report.counts.len(),
            limit
        );
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn word_tokenizer() -> Tokenizer {
        let json = r#"{
            "version": "1.0",
            "truncation": null,
            "padding": null,
            "added_tokens": [],
            "normalizer": null,
            "pre_tokenizer": {"type": "Whitespace"},
            "post_processor": null,
            "decoder": null,
            "model": {
                "type": "WordLevel",
                "vocab": {"[UNK]": 0, "small": 1, "grey": 2, "animal": 3},
                "unk_token": "[UNK]"
            }
        }"#;
        Tokenizer::from_str(json).unwrap()
    }

    #[test]
    fn test_counts_and_over_limit() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.txt"), "small grey animal\n").unwrap();
        std::fs::write(dir.path().join("b.txt"), "small animal").unwrap();
        std::fs::write(dir.path().join("c.md"), "ignored ignored ignored ignored").unwrap();

        let report = token_report(dir.path(), &word_tokenizer(), 2).unwrap();
        assert_eq!(
            report.counts,
            vec![
                TokenCount {
                    file: "a.txt".to_string(),
                    tokens: 3
                },
                TokenCount {
                    file: "b.txt".to_string(),
                    tokens: 2
                },
            ]
        );
        assert_eq!(report.over_limit.len(), 1);
        assert_eq!(report.over_limit[0].file, "a.txt");
        assert_eq!((report.min, report.max), (2, 3));
        assert!((report.mean - 2.5).abs() < 1e-12);
    }

    #[test]
    fn test_histogram_buckets() {
        let counts = [3usize, 12, 14, 25]
            .iter()
            .enumerate()
            .map(|(i, &tokens)| TokenCount {
                file: format!("{i}.txt"),
                tokens,
            })
            .collect();
        let report = TokenReport::from_counts(counts, CLIP_TOKEN_LIMIT);
        assert_eq!(report.histogram(10), vec![(0, 1), (10, 2), (20, 1)]);
    }

    #[test]
    fn test_empty_dir() {
        let dir = tempfile::tempdir().unwrap();
        let report = token_report(dir.path(), &word_tokenizer(), CLIP_TOKEN_LIMIT).unwrap();
        assert!(report.counts.is_empty());
        assert_eq!(report.mean, 0.0);
    }
}
