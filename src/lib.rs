//! semsearch - semantic search over a directory of PDF documents.
//!
//! Every document in the store is reduced to a text preview, a handful of
//! keyphrase tags and one embedding vector. Queries are embedded with the
//! same model and ranked by exact cosine similarity against the whole
//! corpus. The index lives in memory as an immutable *generation* that is
//! rebuilt from scratch on every change and swapped in atomically.
//!
//! # Quick start
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use semsearch::{Collaborators, DocumentStore, EngineConfig, SearchEngine};
//! use semsearch::embedding::{Embedder, HashingEmbedder};
//! use semsearch::extract::PdfTextExtractor;
//! use semsearch::search::SearchRequest;
//! use semsearch::tags::KeyphraseTagger;
//! use semsearch::thumbnail::PdftoppmRenderer;
//!
//! let store = DocumentStore::resolve(None).unwrap();
//! let embedder: Arc<dyn Embedder> = Arc::new(HashingEmbedder::default());
//! let collaborators = Collaborators {
//!     extractor: Arc::new(PdfTextExtractor::new()),
//!     tagger: Arc::new(KeyphraseTagger::new(Arc::clone(&embedder))),
//!     embedder,
//! };
//! let engine = SearchEngine::new(
//!     store,
//!     collaborators,
//!     Arc::new(PdftoppmRenderer::default()),
//!     EngineConfig::default(),
//! );
//!
//! engine.rebuild().unwrap();
//! let outcome = engine.search(&SearchRequest::new("bond yields", 5)).unwrap();
//! for hit in &outcome.results {
//!     println!("{} (score: {:.3})", hit.metadata.filename, hit.similarity_score);
//! }
//! ```

pub mod catalog;
pub mod config;
pub mod doc_key;
pub mod document_store;
pub mod embedding;
pub mod engine;
pub mod error;
pub mod extract;
pub mod generation_store;
pub mod http;
pub mod ingestion;
pub mod model_manager;
pub mod ranker;
pub mod search;
pub mod tags;
pub mod text_util;
pub mod thumbnail;
pub mod vector_store;
pub mod walker;

pub use catalog::{Document, Generation};
pub use config::EngineConfig;
pub use doc_key::DocumentKey;
pub use document_store::DocumentStore;
pub use engine::SearchEngine;
pub use error::{Error, Result};
pub use generation_store::GenerationStore;
pub use ingestion::Collaborators;
pub use model_manager::ModelManager;
