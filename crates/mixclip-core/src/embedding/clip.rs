//! CLIP vision and text towers on ONNX Runtime.
//!
//! Both towers are exported separately (`vision_model.onnx`,
//! `text_model.onnx`) and return projection-space embeddings
//! (`image_embeds`, `text_embeds`) that live in one shared space.

use std::path::Path;
use std::sync::Mutex;

use image::DynamicImage;
use ort::session::Session;
use ort::value::Value;
use tokenizers::Tokenizer;

use super::preprocess::preprocess;
use crate::error::PipelineError;

/// A float output tensor copied out of an inference result.
#[derive(Debug, Clone)]
pub(crate) struct OutputTensor {
    pub name: String,
    pub shape: Vec<i64>,
    pub data: Vec<f32>,
}

/// The first row of `preferred`, or of the first 2-D output when it is absent.
pub(crate) fn pick_embedding(outputs: &[OutputTensor], preferred: &str) -> Option<Vec<f32>> {
    let tensor = outputs
        .iter()
        .find(|t| t.name == preferred)
        .or_else(|| outputs.iter().find(|t| t.shape.len() == 2))?;
    match tensor.shape.len() {
        1 => Some(tensor.data.clone()),
        2 => {
            let dim = usize::try_from(tensor.shape[1]).ok()?;
            tensor.data.get(..dim).map(|row| row.to_vec())
        }
        _ => None,
    }
}

fn load_session(model_path: &Path) -> Result<Session, PipelineError> {
    if !model_path.exists() {
        return Err(PipelineError::Model {
            message: format!(
                "Model not found at {:?}. Run `mixclip models download` first.",
                model_path
            ),
        });
    }

    let session = Session::builder()
        .map_err(|e| PipelineError::Model {
            message: format!("Failed to create ONNX session builder: {e}"),
        })?
        .commit_from_file(model_path)
        .map_err(|e| PipelineError::Model {
            message: format!("Failed to load ONNX model {:?}: {e}", model_path),
        })?;

    tracing::debug!(
        "Loaded {:?} (inputs: {:?}, outputs: {:?})",
        model_path,
        session.inputs().iter().map(|i| i.name()).collect::<Vec<_>>(),
        session.outputs().iter().map(|o| o.name()).collect::<Vec<_>>()
    );
    Ok(session)
}

fn tensor_value(shape: Vec<i64>, data: Vec<i64>, path: &Path) -> Result<Value, PipelineError> {
    Value::from_array((shape, data))
        .map(Into::into)
        .map_err(|e| PipelineError::Embedding {
            path: path.to_path_buf(),
            message: format!("Failed to create input tensor: {e}"),
        })
}

/// Run a session and copy every float output out.
fn run_session(
    session: &Mutex<Session>,
    inputs: Vec<(String, Value)>,
    path: &Path,
) -> Result<Vec<OutputTensor>, PipelineError> {
    let mut session = session.lock().map_err(|e| PipelineError::Model {
        message: format!("Session lock poisoned: {e}"),
    })?;

    let outputs = session.run(inputs).map_err(|e| PipelineError::Embedding {
        path: path.to_path_buf(),
        message: format!("ONNX inference failed: {e}"),
    })?;

    let mut tensors = Vec::new();
    for (name, value) in outputs.iter() {
        if let Ok((shape, data)) = value.try_extract_tensor::<f32>() {
            tensors.push(OutputTensor {
                name: name.to_string(),
                shape: shape.iter().copied().collect(),
                data: data.to_vec(),
            });
        }
    }
    Ok(tensors)
}

/// CLIP vision tower.
///
/// Holds the session behind a `Mutex` because `Session::run` needs `&mut self`.
pub struct ClipImageEncoder {
    session: Mutex<Session>,
    input_name: String,
    image_size: u32,
}

impl ClipImageEncoder {
    pub fn load(model_path: &Path, image_size: u32) -> Result<Self, PipelineError> {
        let session = load_session(model_path)?;
        let input_name = session
            .inputs()
            .first()
            .map(|i| i.name().to_string())
            .unwrap_or_else(|| "pixel_values".to_string());
        Ok(Self {
            session: Mutex::new(session),
            input_name,
            image_size,
        })
    }

    pub fn image_size(&self) -> u32 {
        self.image_size
    }

    /// Embed one image (unnormalized `image_embeds`).
    pub fn embed(&self, image: &DynamicImage, path: &Path) -> Result<Vec<f32>, PipelineError> {
        let tensor = preprocess(image, self.image_size);
        let shape: Vec<i64> = tensor.shape().iter().map(|&d| d as i64).collect();
        let data: Vec<f32> = tensor.iter().copied().collect();

        let input: Value = Value::from_array((shape, data))
            .map(Into::into)
            .map_err(|e| PipelineError::Embedding {
                path: path.to_path_buf(),
                message: format!("Failed to create input tensor: {e}"),
            })?;

        let outputs = run_session(&self.session, vec![(self.input_name.clone(), input)], path)?;
        pick_embedding(&outputs, "image_embeds").ok_or_else(|| PipelineError::Embedding {
            path: path.to_path_buf(),
            message: "Vision model produced no image_embeds or 2-D output".to_string(),
        })
    }
}

/// Cut token ids to `max_tokens`, keeping the final (end-of-text) token.
///
/// Returns the ids and whether anything was dropped.
pub(crate) fn truncate_ids(ids: &[u32], max_tokens: usize) -> (Vec<i64>, bool) {
    if ids.len() <= max_tokens || max_tokens == 0 {
        return (ids.iter().map(|&id| id as i64).collect(), false);
    }
    let mut kept: Vec<i64> = ids[..max_tokens - 1].iter().map(|&id| id as i64).collect();
    if let Some(&last) = ids.last() {
        kept.push(last as i64);
    }
    (kept, true)
}

/// Load a `tokenizer.json` bundle.
pub fn load_tokenizer(path: &Path) -> Result<Tokenizer, PipelineError> {
    if !path.exists() {
        return Err(PipelineError::Model {
            message: format!(
                "Tokenizer not found at {:?}. Run `mixclip models download` first.",
                path
            ),
        });
    }
    Tokenizer::from_file(path).map_err(|e| PipelineError::Model {
        message: format!("Failed to load tokenizer: {e}"),
    })
}

/// CLIP text tower plus its BPE tokenizer.
pub struct ClipTextEncoder {
    session: Mutex<Session>,
    tokenizer: Tokenizer,
    max_tokens: usize,
    wants_attention_mask: bool,
}

impl ClipTextEncoder {
    pub fn load(
        model_path: &Path,
        tokenizer_path: &Path,
        max_tokens: usize,
    ) -> Result<Self, PipelineError> {
        let session = load_session(model_path)?;
        let tokenizer = load_tokenizer(tokenizer_path)?;
        let wants_attention_mask = session
            .inputs()
            .iter()
            .any(|i| i.name() == "attention_mask");

        Ok(Self {
            session: Mutex::new(session),
            tokenizer,
            max_tokens,
            wants_attention_mask,
        })
    }

    pub fn tokenizer(&self) -> &Tokenizer {
        &self.tokenizer
    }

    /// Embed one description (unnormalized `text_embeds`).
    pub fn embed(&self, text: &str, path: &Path) -> Result<Vec<f32>, PipelineError> {
        let encoding = self
            .tokenizer
            .encode(text, true)
            .map_err(|e| PipelineError::Embedding {
                path: path.to_path_buf(),
                message: format!("Tokenization failed: {e}"),
            })?;

        let (ids, truncated) = truncate_ids(encoding.get_ids(), self.max_tokens);
        if truncated {
            tracing::warn!(
                "{:?}: {} tokens truncated to {}",
                path,
                encoding.get_ids().len(),
                self.max_tokens
            );
        }

        let len = ids.len();
        let shape = vec![1, len as i64];
        let mut inputs = vec![("input_ids".to_string(), tensor_value(shape.clone(), ids, path)?)];
        if self.wants_attention_mask {
            inputs.push((
                "attention_mask".to_string(),
                tensor_value(shape, vec![1i64; len], path)?,
            ));
        }

        let outputs = run_session(&self.session, inputs, path)?;
        pick_embedding(&outputs, "text_embeds").ok_or_else(|| PipelineError::Embedding {
            path: path.to_path_buf(),
            message: "Text model produced no text_embeds or 2-D output".to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tensor(name: &str, shape: &[i64], data: &[f32]) -> OutputTensor {
        OutputTensor {
            name: name.to_string(),
            shape: shape.to_vec(),
            data: data.to_vec(),
        }
    }

    #[test]
    fn test_pick_embedding_prefers_named_output() {
        let outputs = vec![
            tensor("last_hidden_state", &[1, 2], &[9.0, 9.0]),
            tensor("image_embeds", &[1, 3], &[1.0, 2.0, 3.0]),
        ];
        assert_eq!(
            pick_embedding(&outputs, "image_embeds"),
            Some(vec![1.0, 2.0, 3.0])
        );
    }

    #[test]
    fn test_pick_embedding_falls_back_to_first_2d() {
        let outputs = vec![
            tensor("hidden", &[1, 4, 2], &[0.0; 8]),
            tensor("proj", &[1, 2], &[5.0, 6.0]),
        ];
        assert_eq!(pick_embedding(&outputs, "text_embeds"), Some(vec![5.0, 6.0]));
        assert_eq!(pick_embedding(&outputs[..1], "text_embeds"), None);
    }

    #[test]
    fn test_truncate_keeps_end_token() {
        let ids: Vec<u32> = (0..100).collect();
        let (kept, truncated) = truncate_ids(&ids, 77);
        assert!(truncated);
        assert_eq!(kept.len(), 77);
        assert_eq!(kept[0], 0);
        assert_eq!(kept[75], 75);
        assert_eq!(kept[76], 99);
    }

    #[test]
    fn test_truncate_short_input_untouched() {
        let (kept, truncated) = truncate_ids(&[49406, 320, 49407], 77);
        assert!(!truncated);
        assert_eq!(kept, vec![49406, 320, 49407]);
    }
}
