use std::{path::Path, sync::Arc};

use serde::Serialize;

use crate::{
    catalog::{Document, Generation},
    config::EngineConfig,
    doc_key::DocumentKey,
    document_store::DocumentStore,
    error::{Error, Result},
    generation_store::GenerationStore,
    ingestion::{self, Collaborators, RebuildSummary},
    search::{self, SearchOutcome, SearchRequest},
    thumbnail::ThumbnailRenderer,
};

/// Response to a successful upload.
#[derive(Debug, Clone, Serialize)]
pub struct UploadOutcome {
    pub message: String,
    /// Tag hints sent with the upload, trimmed.
    pub tags: Vec<String>,
    #[serde(skip)]
    pub filename: String,
    #[serde(skip)]
    pub summary: RebuildSummary,
}

/// The search engine: a document store, its current generation, and the
/// collaborators that turn files into documents.
///
/// All operations are synchronous and safe to call from many threads.
/// Reads work on a snapshot of the current generation; rebuilds run one at a
/// time and publish atomically.
pub struct SearchEngine {
    store: DocumentStore,
    collaborators: Collaborators,
    renderer: Arc<dyn ThumbnailRenderer>,
    config: EngineConfig,
    generations: GenerationStore,
}

impl SearchEngine {
    /// Create an engine with an empty generation. Call
    /// [`SearchEngine::rebuild`] to index the store.
    pub fn new(
        store: DocumentStore,
        collaborators: Collaborators,
        renderer: Arc<dyn ThumbnailRenderer>,
        config: EngineConfig,
    ) -> Self {
        Self {
            store,
            collaborators,
            renderer,
            config,
            generations: GenerationStore::new(),
        }
    }

    pub fn store(&self) -> &DocumentStore {
        &self.store
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn snapshot(&self) -> Arc<Generation> {
        self.generations.snapshot()
    }

    /// Re-scan the store and publish a new generation.
    ///
    /// On failure the current generation stays in place.
    pub fn rebuild(&self) -> Result<RebuildSummary> {
        let _guard = self.generations.lock_rebuild();
        self.rebuild_locked()
    }

    fn rebuild_locked(&self) -> Result<RebuildSummary> {
        let (generation, mut summary) = ingestion::build_generation(
            self.store.root(),
            &self.collaborators,
            &self.config,
        )?;
        let published = self.generations.publish(generation);
        summary.epoch = published.epoch();

        tracing::info!(
            epoch = summary.epoch,
            documents = summary.indexed,
            skipped = summary.skipped,
            "generation published"
        );
        Ok(summary)
    }

    pub fn search(&self, request: &SearchRequest) -> Result<SearchOutcome> {
        let generation = self.snapshot();
        search::execute_search(
            &generation,
            self.collaborators.embedder.as_ref(),
            request,
        )
    }

    pub fn list_documents(&self) -> Vec<Document> {
        self.snapshot().documents().to_vec()
    }

    /// Current id of the document with the given short key.
    pub fn resolve_key(&self, key: &str) -> Result<usize> {
        let parsed = DocumentKey::parse(key)
            .ok_or_else(|| Error::not_found("document key", key))?;
        self.snapshot()
            .position_of(&parsed)
            .ok_or_else(|| Error::not_found("document key", key))
    }

    /// PNG of the first page of document `id`.
    ///
    /// When `key` is given it must name the same document, so a client
    /// holding an id from an older generation gets NotFound rather than
    /// someone else's thumbnail.
    pub fn thumbnail(&self, id: i64, key: Option<&str>) -> Result<Vec<u8>> {
        let generation = self.snapshot();
        let doc = generation.get(id)?;
        if let Some(key) = key {
            let stale = DocumentKey::parse(key)
                .is_none_or(|parsed| !doc.key.matches(&parsed));
            if stale {
                return Err(Error::not_found("document key", key));
            }
        }
        self.renderer
            .render_first_page(Path::new(&doc.metadata.path))
    }

    /// Store an uploaded document and rebuild.
    ///
    /// Rejected uploads leave the store and the current generation
    /// untouched. If the rebuild fails the write is undone, so the store
    /// keeps matching the current generation.
    pub fn upload(
        &self,
        filename: &str,
        bytes: &[u8],
        tag_hints: &str,
    ) -> Result<UploadOutcome> {
        let _guard = self.generations.lock_rebuild();
        let saved = self.store.save_upload(filename, bytes)?;
        tracing::info!(
            file = %saved.name,
            bytes = bytes.len(),
            replaced = saved.replaced_existing(),
            "document uploaded"
        );

        let summary = match self.rebuild_locked() {
            Ok(summary) => summary,
            Err(e) => {
                tracing::warn!(
                    file = %saved.name,
                    error = %e,
                    "rebuild failed, reverting upload"
                );
                if let Err(revert) = self.store.revert(&saved) {
                    tracing::error!(
                        file = %saved.name,
                        error = %revert,
                        "could not revert upload"
                    );
                }
                return Err(e);
            }
        };
        Ok(UploadOutcome {
            message: format!("File {} uploaded successfully", saved.name),
            tags: parse_tag_hints(tag_hints),
            filename: saved.name,
            summary,
        })
    }

    /// Raw bytes of a store-relative file.
    pub fn fetch_raw(&self, relative: &str) -> Result<Vec<u8>> {
        self.store.read(relative)
    }

    /// Replace the tags of document `id` in the current generation.
    ///
    /// Tags are trimmed and empty entries dropped. The next rebuild
    /// recomputes tags and discards the edit.
    pub fn set_tags(&self, id: i64, tags: Vec<String>) -> Result<Vec<String>> {
        let tags = clean_tags(tags);
        let updated = self
            .generations
            .update(|current| current.with_tags(id, tags.clone()))?;
        tracing::debug!(id, epoch = updated.epoch(), "tags updated");
        Ok(tags)
    }
}

impl std::fmt::Debug for SearchEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchEngine")
            .field("store", &self.store)
            .field("config", &self.config)
            .field("generations", &self.generations)
            .finish_non_exhaustive()
    }
}

/// Split comma-separated tag hints.
pub fn parse_tag_hints(hints: &str) -> Vec<String> {
    clean_tags(hints.split(',').map(str::to_string))
}

fn clean_tags(tags: impl IntoIterator<Item = String>) -> Vec<String> {
    tags.into_iter()
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .collect()
}
