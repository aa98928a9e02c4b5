use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::{
    catalog::{DocumentMetadata, Generation},
    config::DEFAULT_TOP_K,
    doc_key::DocumentKey,
    embedding::Embedder,
    error::{Error, Result},
    ranker::{self, TagFilter},
};

/// Returned in place of results when nothing has been indexed yet.
pub const EMPTY_INDEX_MESSAGE: &str = "No documents in the index";

/// Parameters of one search.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SearchRequest {
    pub query: String,
    #[serde(default = "default_top_k")]
    pub top_k: i64,
    /// Restrict results to documents carrying any of these tags.
    #[serde(default)]
    pub tags: Option<Vec<String>>,
}

fn default_top_k() -> i64 {
    DEFAULT_TOP_K
}

impl SearchRequest {
    pub fn new(query: impl Into<String>, top_k: i64) -> Self {
        Self {
            query: query.into(),
            top_k,
            tags: None,
        }
    }

    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = Some(tags);
        self
    }
}

/// One ranked document.
#[derive(Debug, Clone, Serialize)]
pub struct SearchHit {
    pub document_id: usize,
    pub key: DocumentKey,
    pub content: String,
    pub metadata: DocumentMetadata,
    pub similarity_score: f32,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SearchOutcome {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub results: Vec<SearchHit>,
}

impl SearchOutcome {
    fn empty_index() -> Self {
        Self {
            message: Some(EMPTY_INDEX_MESSAGE.to_string()),
            results: Vec::new(),
        }
    }
}

/// Rank the documents of one generation against a query.
///
/// The whole search runs against `generation`, so a rebuild published
/// halfway through cannot mix old documents with new vectors. The query is
/// not embedded when nothing could be returned anyway.
pub fn execute_search(
    generation: &Generation,
    embedder: &dyn Embedder,
    request: &SearchRequest,
) -> Result<SearchOutcome> {
    if generation.is_empty() {
        return Ok(SearchOutcome::empty_index());
    }
    if request.top_k <= 0 {
        return Ok(SearchOutcome::default());
    }

    let started = Instant::now();
    let query = embedder.embed(&request.query)?;
    let dimension = generation.vectors().dimension();
    if query.len() != dimension {
        return Err(Error::InvalidVector(format!(
            "query embedding has dimension {}, index has {dimension}",
            query.len()
        )));
    }
    let filter = TagFilter::new(request.tags.iter().flatten());
    let ranked = ranker::rank(&query, generation, request.top_k, &filter);

    tracing::debug!(
        epoch = generation.epoch(),
        candidates = generation.len(),
        returned = ranked.len(),
        elapsed_us = started.elapsed().as_micros() as u64,
        "search finished"
    );

    let documents = generation.documents();
    let results = ranked
        .into_iter()
        .map(|r| {
            let doc = &documents[r.id];
            SearchHit {
                document_id: doc.id,
                key: doc.key,
                content: doc.content.clone(),
                metadata: doc.metadata.clone(),
                similarity_score: r.score,
            }
        })
        .collect();

    Ok(SearchOutcome {
        message: None,
        results,
    })
}

/// Format results for human-readable terminal output.
pub fn format_human(outcome: &SearchOutcome) {
    if let Some(message) = &outcome.message {
        println!("{message}");
        return;
    }
    if outcome.results.is_empty() {
        println!("No results found.");
        return;
    }

    for (rank, hit) in outcome.results.iter().enumerate() {
        println!(
            "{:>3}. [{:.3}] {} #{}",
            rank + 1,
            hit.similarity_score,
            hit.metadata.filename,
            hit.key
        );
        if !hit.metadata.tags.is_empty() {
            println!("     tags: {}", hit.metadata.tags.join(", "));
        }
    }
    println!("\n{} result(s)", outcome.results.len());
}

/// Format results as JSON output.
pub fn format_json(outcome: &SearchOutcome, query: &str) -> Result<()> {
    let value = serde_json::json!({
        "query": query,
        "result_count": outcome.results.len(),
        "message": outcome.message,
        "results": outcome.results,
    });
    println!("{}", serde_json::to_string(&value)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        catalog::tests::doc,
        embedding::HashingEmbedder,
        vector_store::VectorStore,
    };

    fn indexed(texts: &[(&str, &[&str])]) -> Generation {
        let embedder = HashingEmbedder::default();
        let documents = texts
            .iter()
            .enumerate()
            .map(|(i, (_, tags))| doc(i, &format!("{i}.pdf"), tags))
            .collect();
        let vectors = texts
            .iter()
            .map(|(text, _)| embedder.embed(text).unwrap())
            .collect();
        Generation::new(documents, VectorStore::from_rows(vectors).unwrap())
            .unwrap()
    }

    #[test]
    fn empty_generation_reports_message() {
        let outcome = execute_search(
            &Generation::empty(),
            &HashingEmbedder::default(),
            &SearchRequest::new("anything", 5),
        )
        .unwrap();
        assert_eq!(outcome.message.as_deref(), Some(EMPTY_INDEX_MESSAGE));
        assert!(outcome.results.is_empty());
    }

    #[test]
    fn query_dimension_mismatch_is_rejected() {
        let generation = indexed(&[("municipal bond yields", &[])]);
        let err = execute_search(
            &generation,
            &HashingEmbedder::new(8),
            &SearchRequest::new("bond yields", 5),
        )
        .unwrap_err();
        assert!(matches!(err, Error::InvalidVector(_)));
    }

    #[test]
    fn exact_text_ranks_first() {
        let generation = indexed(&[
            ("quarterly earnings grew on strong revenue", &[]),
            ("municipal bond yields fell sharply", &[]),
            ("the central bank raised interest rates", &[]),
        ]);
        let outcome = execute_search(
            &generation,
            &HashingEmbedder::default(),
            &SearchRequest::new("municipal bond yields fell sharply", 3),
        )
        .unwrap();

        assert!(outcome.message.is_none());
        assert_eq!(outcome.results[0].document_id, 1);
        assert!((outcome.results[0].similarity_score - 1.0).abs() < 1e-5);
    }

    #[test]
    fn tag_filter_applies() {
        let generation = indexed(&[
            ("bond yields", &["bonds"]),
            ("bond yields", &["equity"]),
        ]);
        let request =
            SearchRequest::new("bond yields", 5).with_tags(vec!["Equity".into()]);
        let outcome =
            execute_search(&generation, &HashingEmbedder::default(), &request)
                .unwrap();
        assert_eq!(outcome.results.len(), 1);
        assert_eq!(outcome.results[0].document_id, 1);
    }

    #[test]
    fn non_positive_top_k_is_empty_without_message() {
        let generation = indexed(&[("text", &[])]);
        let outcome = execute_search(
            &generation,
            &HashingEmbedder::default(),
            &SearchRequest::new("text", 0),
        )
        .unwrap();
        assert!(outcome.results.is_empty());
        assert!(outcome.message.is_none());
    }

    #[test]
    fn request_defaults() {
        let request: SearchRequest =
            serde_json::from_str(r#"{"query":"bonds"}"#).unwrap();
        assert_eq!(request.top_k, 5);
        assert!(request.tags.is_none());
    }

    #[test]
    fn hit_serializes_wire_fields() {
        let generation = indexed(&[("some text", &["t"])]);
        let outcome = execute_search(
            &generation,
            &HashingEmbedder::default(),
            &SearchRequest::new("some text", 1),
        )
        .unwrap();
        let json = serde_json::to_value(&outcome).unwrap();
        assert!(json.get("message").is_none());
        let hit = &json["results"][0];
        assert_eq!(hit["document_id"], 0);
        assert_eq!(hit["metadata"]["tags"][0], "t");
        assert!(hit["similarity_score"].is_number());
        assert!(hit["content"].is_string());
    }
}
