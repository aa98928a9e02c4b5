use crate::{
    extract::DEFAULT_MAX_PAGES,
    tags::DEFAULT_TAG_COUNT,
    text_util::DEFAULT_PREVIEW_CHARS,
};

/// Default number of results for a search without an explicit `top_k`.
pub const DEFAULT_TOP_K: i64 = 5;

/// What a rebuild does when one document cannot be processed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum FailurePolicy {
    /// Log the failure, leave the document out, and keep going.
    #[default]
    Skip,
    /// Fail the rebuild; the previous generation stays current.
    Abort,
}

/// Which embedding model backs the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum EmbedderKind {
    /// ColBERT model loaded through pylate, mean-pooled to one vector.
    #[default]
    Model,
    /// Deterministic feature hashing; no model download.
    Hashing,
}

/// Knobs for ingestion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Pages read from each document.
    pub max_pages: usize,
    /// Characters kept as the content preview.
    pub preview_chars: usize,
    /// Tags computed per document.
    pub tag_count: usize,
    pub failure_policy: FailurePolicy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_pages: DEFAULT_MAX_PAGES,
            preview_chars: DEFAULT_PREVIEW_CHARS,
            tag_count: DEFAULT_TAG_COUNT,
            failure_policy: FailurePolicy::default(),
        }
    }
}
