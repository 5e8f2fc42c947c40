//! Driving a provider over a directory of photos.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::Serialize;

use super::{parse_descriptions, DescriptionPair, INSTRUCTIONS};
use crate::config::DescribeConfig;
use crate::discovery::{DiscoveredFile, FileDiscovery};
use crate::error::PipelineError;
use crate::llm::retry::{generate_with_retry, RetryPolicy};
use crate::llm::{ImageInput, LlmProvider, LlmRequest};

/// Which photos of a directory to describe.
#[derive(Debug, Clone, Default)]
pub struct DescribeOptions {
    /// Restrict to these file names (e.g. `dog.1287.jpg`). Empty means all.
    pub only: Vec<String>,
    /// Skip photos whose two description files already exist.
    pub skip_existing: bool,
}

/// Outcome of describing one directory.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DescribeReport {
    pub total: usize,
    pub described: usize,
    pub skipped: usize,
    /// File names whose response did not match the expected format
    pub malformed: Vec<String>,
    /// File names whose request failed after retries
    pub failed: Vec<String>,
}

enum Outcome {
    Described,
    Malformed,
}

/// Sends each photo with [`INSTRUCTIONS`] and writes the parsed pair.
pub struct Describer {
    provider: Box<dyn LlmProvider>,
    retry: RetryPolicy,
    max_tokens: u32,
    temperature: f32,
    progress_every: usize,
}

impl Describer {
    pub fn new(provider: Box<dyn LlmProvider>, config: &DescribeConfig) -> Self {
        Self {
            provider,
            retry: RetryPolicy {
                attempts: config.retry_attempts,
                base_delay_ms: config.retry_delay_ms,
                timeout_ms: config.timeout_ms,
            },
            max_tokens: config.max_tokens,
            temperature: config.temperature,
            progress_every: config.progress_every.max(1),
        }
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// Photos in `photo_dir` that `options` selects, in name order.
    pub fn select(
        &self,
        photo_dir: &Path,
        high_out: &Path,
        low_out: &Path,
        options: &DescribeOptions,
    ) -> (Vec<DiscoveredFile>, usize) {
        let mut files = FileDiscovery::new(&["jpg"]).discover(photo_dir);

        if !options.only.is_empty() {
            let wanted: HashSet<&str> = options.only.iter().map(String::as_str).collect();
            let present: HashSet<String> = files.iter().map(|f| f.file_name()).collect();
            for name in &options.only {
                if !present.contains(name) {
                    tracing::warn!("{} is not a .jpg in {:?}", name, photo_dir);
                }
            }
            files.retain(|f| wanted.contains(f.file_name().as_str()));
        }

        let before = files.len();
        if options.skip_existing {
            files.retain(|f| {
                let txt = format!("{}.txt", f.stem());
                !(high_out.join(&txt).exists() && low_out.join(&txt).exists())
            });
        }
        let skipped = before - files.len();
        (files, skipped)
    }

    /// Describe every selected `.jpg` in `photo_dir`.
    ///
    /// A well-formed response produces `{stem}.txt` in both `high_out` and
    /// `low_out`. Malformed responses and failed requests are logged and
    /// listed in the report; the run continues. `on_file` fires once per
    /// attempted photo.
    pub async fn describe_directory(
        &self,
        photo_dir: &Path,
        high_out: &Path,
        low_out: &Path,
        options: &DescribeOptions,
        mut on_file: impl FnMut(),
    ) -> Result<DescribeReport, PipelineError> {
        if !photo_dir.is_dir() {
            return Err(PipelineError::FileNotFound(photo_dir.to_path_buf()));
        }
        for dir in [high_out, low_out] {
            tokio::fs::create_dir_all(dir)
                .await
                .map_err(|e| PipelineError::io(dir, e))?;
        }

        let (files, skipped) = self.select(photo_dir, high_out, low_out, options);
        let mut report = DescribeReport {
            total: files.len() + skipped,
            skipped,
            ..Default::default()
        };
        tracing::info!(
            "Describing {} images with {} ({} skipped)",
            files.len(),
            self.provider.name(),
            skipped
        );

        for (idx, file) in files.iter().enumerate() {
            match self.describe_one(&file.path, high_out, low_out).await {
                Ok(Outcome::Described) => report.described += 1,
                Ok(Outcome::Malformed) => report.malformed.push(file.file_name()),
                Err(e) => {
                    tracing::error!("Failed to describe {:?}: {}", file.path, e);
                    report.failed.push(file.file_name());
                }
            }
            on_file();

            if (idx + 1) % self.progress_every == 0 {
                tracing::info!("Processed {} images so far...", idx + 1);
            }
        }

        tracing::info!(
            "Described {} of {} images ({} malformed, {} failed)",
            report.described,
            files.len(),
            report.malformed.len(),
            report.failed.len()
        );
        Ok(report)
    }

    async fn describe_one(
        &self,
        path: &Path,
        high_out: &Path,
        low_out: &Path,
    ) -> Result<Outcome, PipelineError> {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| PipelineError::io(path, e))?;
        let request = LlmRequest::new(ImageInput::from_bytes(&bytes, "jpeg"), INSTRUCTIONS)
            .with_max_tokens(self.max_tokens)
            .with_temperature(self.temperature);

        let response =
            generate_with_retry(self.provider.as_ref(), &request, &self.retry, path).await?;

        let Some(pair) = parse_descriptions(&response.text) else {
            let err = PipelineError::MalformedResponse {
                path: path.to_path_buf(),
                response: response.text,
            };
            tracing::warn!("{}", err);
            return Ok(Outcome::Malformed);
        };

        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        write_pair(&pair, &stem, high_out, low_out).await?;
        tracing::debug!(
            "Descriptions saved for {:?} ({} ms)",
            path,
            response.latency_ms
        );
        Ok(Outcome::Described)
    }
}

async fn write_pair(
    pair: &DescriptionPair,
    stem: &str,
    high_out: &Path,
    low_out: &Path,
) -> Result<(), PipelineError> {
    let file = format!("{stem}.txt");
    let targets: [(PathBuf, &str); 2] = [
        (high_out.join(&file), &pair.high_info),
        (low_out.join(&file), &pair.low_info),
    ];
    for (path, text) in targets {
        tokio::fs::write(&path, text)
            .await
            .map_err(|e| PipelineError::io(&path, e))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::LlmResponse;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    /// Answers each call with the next canned response, cycling.
    struct Scripted {
        responses: Vec<Result<String, u16>>,
        calls: AtomicU32,
    }

    impl Scripted {
        fn new(responses: Vec<Result<String, u16>>) -> Self {
            Self {
                responses,
                calls: AtomicU32::new(0),
            }
        }
    }

    #[async_trait]
    impl LlmProvider for Scripted {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn is_available(&self) -> bool {
            true
        }

        async fn generate(&self, _request: &LlmRequest) -> Result<LlmResponse, PipelineError> {
            let idx = self.calls.fetch_add(1, Ordering::SeqCst) as usize;
            match &self.responses[idx % self.responses.len()] {
                Ok(text) => Ok(LlmResponse {
                    text: text.clone(),
                    model: "scripted".to_string(),
                    tokens_used: None,
                    latency_ms: 1,
                }),
                Err(code) => Err(PipelineError::Llm {
                    message: format!("HTTP {code}"),
                    status_code: Some(*code),
                }),
            }
        }

        fn timeout(&self) -> Duration {
            Duration::from_secs(1)
        }
    }

    fn config() -> DescribeConfig {
        DescribeConfig {
            retry_attempts: 0,
            retry_delay_ms: 1,
            ..Default::default()
        }
    }

    fn photos(dir: &Path, names: &[&str]) {
        for name in names {
            std::fs::write(dir.join(name), [0xFF, 0xD8, 0xFF]).unwrap();
        }
    }

    fn good() -> Result<String, u16> {
        Ok(r#"high_info="Long, detailed." low_info="Short.""#.to_string())
    }

    #[tokio::test]
    async fn test_writes_both_descriptions() {
        let photos_dir = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        photos(photos_dir.path(), &["cat.1.jpg", "dog.2.JPG", "notes.png"]);
        let (high, low) = (out.path().join("high"), out.path().join("low"));

        let describer = Describer::new(Box::new(Scripted::new(vec![good()])), &config());
        let mut calls = 0;
        let report = describer
            .describe_directory(
                photos_dir.path(),
                &high,
                &low,
                &DescribeOptions::default(),
                || calls += 1,
            )
            .await
            .unwrap();

        assert_eq!(report.described, 2);
        assert_eq!(calls, 2);
        assert_eq!(
            std::fs::read_to_string(high.join("cat.1.txt")).unwrap(),
            "Long, detailed."
        );
        assert_eq!(
            std::fs::read_to_string(low.join("dog.2.txt")).unwrap(),
            "Short."
        );
    }

    #[tokio::test]
    async fn test_malformed_and_failed_are_reported() {
        let photos_dir = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        photos(photos_dir.path(), &["a.jpg", "b.jpg", "c.jpg"]);
        let (high, low) = (out.path().join("high"), out.path().join("low"));

        let provider = Scripted::new(vec![good(), Ok("Sorry, I can't.".to_string()), Err(401)]);
        let describer = Describer::new(Box::new(provider), &config());
        let report = describer
            .describe_directory(
                photos_dir.path(),
                &high,
                &low,
                &DescribeOptions::default(),
                || {},
            )
            .await
            .unwrap();

        assert_eq!(report.described, 1);
        assert_eq!(report.malformed, vec!["b.jpg"]);
        assert_eq!(report.failed, vec!["c.jpg"]);
        assert!(!high.join("b.txt").exists());
    }

    #[tokio::test]
    async fn test_only_and_skip_existing() {
        let photos_dir = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        photos(photos_dir.path(), &["a.jpg", "b.jpg", "c.jpg"]);
        let (high, low) = (out.path().join("high"), out.path().join("low"));
        std::fs::create_dir_all(&high).unwrap();
        std::fs::create_dir_all(&low).unwrap();
        std::fs::write(high.join("a.txt"), "x").unwrap();
        std::fs::write(low.join("a.txt"), "x").unwrap();

        let describer = Describer::new(Box::new(Scripted::new(vec![good()])), &config());
        let options = DescribeOptions {
            only: vec!["a.jpg".to_string(), "b.jpg".to_string()],
            skip_existing: true,
        };
        let report = describer
            .describe_directory(photos_dir.path(), &high, &low, &options, || {})
            .await
            .unwrap();

        assert_eq!(report.total, 2);
        assert_eq!(report.skipped, 1);
        assert_eq!(report.described, 1);
        assert!(high.join("b.txt").exists());
        assert!(!high.join("c.txt").exists());
        assert_eq!(std::fs::read_to_string(high.join("a.txt")).unwrap(), "x");
    }

    #[tokio::test]
    async fn test_missing_photo_dir() {
        let out = tempfile::tempdir().unwrap();
        let describer = Describer::new(Box::new(Scripted::new(vec![good()])), &config());
        let err = describer
            .describe_directory(
                &out.path().join("nope"),
                out.path(),
                out.path(),
                &DescribeOptions::default(),
                || {},
            )
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::FileNotFound(_)));
    }
}
