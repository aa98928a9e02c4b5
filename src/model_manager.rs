use candle_core::{Device, Tensor};
use pylate_rs::ColBERT;

use crate::error::{Error, Result};

pub const DEFAULT_MODEL_ID: &str = "lightonai/GTE-ModernColBERT-v1";
pub const MODEL_ENV_VAR: &str = "SEMSEARCH_MODEL";

/// Select the best available compute device.
///
/// Uses CUDA when compiled with the `cuda` feature, Metal when compiled with
/// the `metal` feature, and falls back to CPU otherwise.
fn default_device() -> Device {
    #[cfg(feature = "cuda")]
    {
        if let Ok(device) = Device::new_cuda(0) {
            return device;
        }
    }

    #[cfg(feature = "metal")]
    {
        if let Ok(device) = Device::new_metal(0) {
            return device;
        }
    }

    Device::Cpu
}

/// Manages the ColBERT model lifecycle, supporting lazy loading on first use.
pub struct ModelManager {
    model: Option<ColBERT>,
    model_id: String,
}

impl Default for ModelManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ModelManager {
    /// Creates a new `ModelManager`. The model ID is resolved from:
    /// 1. The `SEMSEARCH_MODEL` environment variable, if set
    /// 2. Otherwise, the default model (`lightonai/GTE-ModernColBERT-v1`)
    ///
    /// The model is not loaded until the first call to `encode_pooled`.
    pub fn new() -> Self {
        let model_id = std::env::var(MODEL_ENV_VAR)
            .unwrap_or_else(|_| DEFAULT_MODEL_ID.to_string());

        Self {
            model: None,
            model_id,
        }
    }

    /// Creates a `ModelManager` with an explicit model ID, bypassing
    /// environment variable resolution.
    pub fn with_model_id(model_id: String) -> Self {
        Self {
            model: None,
            model_id,
        }
    }

    pub fn model_id(&self) -> &str {
        &self.model_id
    }

    pub fn is_loaded(&self) -> bool {
        self.model.is_some()
    }

    /// Ensures the model is loaded, downloading from HuggingFace Hub if needed.
    fn ensure_loaded(&mut self) -> Result<&mut ColBERT> {
        if self.model.is_none() {
            tracing::info!(model = %self.model_id, "loading embedding model");
            let colbert: ColBERT = ColBERT::from(&self.model_id)
                .with_device(default_device())
                .try_into()
                .map_err(|e| Error::Model(format!("{e}")))?;
            self.model = Some(colbert);
        }

        self.model
            .as_mut()
            .ok_or_else(|| Error::Model("model not loaded".to_string()))
    }

    /// Encode texts into one vector each.
    ///
    /// ColBERT yields per-token embeddings of shape `[B, T, D]`; these are
    /// mean-pooled over the token axis into `[B, D]`.
    pub fn encode_pooled(
        &mut self,
        texts: &[String],
        is_query: bool,
    ) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let model = self.ensure_loaded()?;
        let embeddings: Tensor = model
            .encode(texts, is_query)
            .map_err(|e| Error::Model(format!("{e}")))?;

        embeddings
            .mean(1)
            .and_then(|pooled| pooled.to_vec2::<f32>())
            .map_err(|e| Error::Model(format!("tensor computation error: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn custom_model_id() {
        let manager = ModelManager::with_model_id("custom/model".to_string());
        assert_eq!(manager.model_id(), "custom/model");
        assert!(!manager.is_loaded());
    }

    #[test]
    fn empty_batch_does_not_load_model() {
        let mut manager =
            ModelManager::with_model_id(DEFAULT_MODEL_ID.to_string());
        assert!(manager.encode_pooled(&[], false).unwrap().is_empty());
        assert!(!manager.is_loaded());
    }
}
