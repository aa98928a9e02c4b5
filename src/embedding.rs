use std::{
    collections::hash_map::DefaultHasher,
    hash::{Hash, Hasher},
};

use parking_lot::Mutex;

use crate::{
    error::{Error, Result},
    model_manager::ModelManager,
    text_util,
};

/// Default dimensionality of the hashing embedder, matching the
/// sentence-transformer models commonly used for document search.
pub const DEFAULT_HASHING_DIMENSION: usize = 384;

/// Maps text to a fixed-dimension real vector.
///
/// Implementations must be deterministic for a given input and must return
/// vectors of the same length for every call.
pub trait Embedder: Send + Sync {
    /// Embed a single text.
    fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Embed several texts, preserving input order.
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        texts.iter().map(|t| self.embed(t)).collect()
    }

    /// Human-readable description for logs and status output.
    fn describe(&self) -> String;
}

/// Deterministic bag-of-words embedder using signed feature hashing.
///
/// Each unigram adds `±1` and each adjacent bigram `±0.5` to a bucket chosen
/// by hashing the term. Identical texts map to identical vectors and texts
/// sharing vocabulary point in similar directions, which is all exact cosine
/// ranking needs. Requires no model download.
#[derive(Debug, Clone, Copy)]
pub struct HashingEmbedder {
    dimension: usize,
}

impl Default for HashingEmbedder {
    fn default() -> Self {
        Self::new(DEFAULT_HASHING_DIMENSION)
    }
}

impl HashingEmbedder {
    /// A zero dimension is bumped to 1.
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension: dimension.max(1),
        }
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    fn accumulate(&self, vector: &mut [f32], term: &str, weight: f32) {
        let mut hasher = DefaultHasher::new();
        term.hash(&mut hasher);
        let h = hasher.finish();
        let bucket = (h % self.dimension as u64) as usize;
        let sign = if h >> 63 == 0 { 1.0 } else { -1.0 };
        vector[bucket] += sign * weight;
    }
}

impl Embedder for HashingEmbedder {
    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut vector = vec![0.0f32; self.dimension];
        let tokens = text_util::tokenize(text);

        for token in &tokens {
            self.accumulate(&mut vector, token, 1.0);
        }
        for pair in tokens.windows(2) {
            let bigram = format!("{} {}", pair[0], pair[1]);
            self.accumulate(&mut vector, &bigram, 0.5);
        }

        Ok(vector)
    }

    fn describe(&self) -> String {
        format!("hashing (dimension {})", self.dimension)
    }
}

/// Sentence embeddings from a ColBERT model, mean-pooled per text.
///
/// The model is loaded lazily on the first call. Inference is serialized
/// behind a mutex because the underlying model needs exclusive access.
pub struct ModelEmbedder {
    model: Mutex<ModelManager>,
}

impl ModelEmbedder {
    pub fn new(model: ModelManager) -> Self {
        Self {
            model: Mutex::new(model),
        }
    }
}

impl Embedder for ModelEmbedder {
    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.embed_batch(&[text.to_string()])?
            .pop()
            .ok_or_else(|| Error::Model("model returned no embedding".into()))
    }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let vectors = self.model.lock().encode_pooled(texts, false)?;
        if vectors.len() != texts.len() {
            return Err(Error::Model(format!(
                "model returned {} embeddings for {} inputs",
                vectors.len(),
                texts.len()
            )));
        }
        Ok(vectors)
    }

    fn describe(&self) -> String {
        format!("model {}", self.model.lock().model_id())
    }
}

impl std::fmt::Debug for ModelEmbedder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelEmbedder").finish_non_exhaustive()
    }
}
