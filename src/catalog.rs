use std::sync::Arc;

use serde::Serialize;

use crate::{
    doc_key::DocumentKey,
    error::{Error, Result},
    vector_store::VectorStore,
};

/// Per-document metadata exposed to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocumentMetadata {
    pub filename: String,
    /// Absolute path of the source file.
    pub path: String,
    pub tags: Vec<String>,
}

/// One catalog entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Document {
    /// Position within the generation; not stable across rebuilds.
    pub id: usize,
    /// Stable key derived from the store-relative path.
    pub key: DocumentKey,
    /// Content preview (leading characters of the extracted text).
    pub content: String,
    pub metadata: DocumentMetadata,
}

/// One consistent snapshot of the catalog and its aligned vectors.
///
/// `documents[i]` is described by `vectors.row(i)`, and `documents[i].id ==
/// i`. Both halves are fixed at construction; the only way to change a
/// generation is to build a new one.
#[derive(Debug, Clone, Default)]
pub struct Generation {
    epoch: u64,
    documents: Vec<Document>,
    vectors: Arc<VectorStore>,
}

impl Generation {
    /// Pair documents with their vectors, checking alignment.
    pub fn new(documents: Vec<Document>, vectors: VectorStore) -> Result<Self> {
        if documents.len() != vectors.len() {
            return Err(Error::InvalidVector(format!(
                "{} documents but {} vectors",
                documents.len(),
                vectors.len()
            )));
        }
        if let Some(doc) =
            documents.iter().enumerate().find(|(i, d)| d.id != *i)
        {
            return Err(Error::InvalidVector(format!(
                "document at position {} has id {}",
                doc.0, doc.1.id
            )));
        }

        Ok(Self {
            epoch: 0,
            documents,
            vectors: Arc::new(vectors),
        })
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub(crate) fn with_epoch(mut self, epoch: u64) -> Self {
        self.epoch = epoch;
        self
    }

    pub fn documents(&self) -> &[Document] {
        &self.documents
    }

    pub fn vectors(&self) -> &VectorStore {
        &self.vectors
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Look up a document by a client-supplied id. Negative and out-of-range
    /// ids are not found.
    pub fn get(&self, id: i64) -> Result<&Document> {
        usize::try_from(id)
            .ok()
            .and_then(|idx| self.documents.get(idx))
            .ok_or_else(|| Error::not_found("document", id.to_string()))
    }

    /// Current position of the document with `key`, if indexed.
    pub fn position_of(&self, key: &DocumentKey) -> Option<usize> {
        self.documents.iter().position(|d| d.key.matches(key))
    }

    /// A copy of this generation with one document's tags replaced.
    ///
    /// The vector store is shared, not copied, and the epoch is kept: tag
    /// edits belong to the generation they were made in.
    pub fn with_tags(&self, id: i64, tags: Vec<String>) -> Result<Self> {
        let idx = self.get(id)?.id;
        let mut documents = self.documents.clone();
        documents[idx].metadata.tags = tags;
        Ok(Self {
            epoch: self.epoch,
            documents,
            vectors: Arc::clone(&self.vectors),
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn doc(id: usize, name: &str, tags: &[&str]) -> Document {
        Document {
            id,
            key: DocumentKey::new(name),
            content: format!("content of {name}"),
            metadata: DocumentMetadata {
                filename: name.to_string(),
                path: format!("/docs/{name}"),
                tags: tags.iter().map(|t| t.to_string()).collect(),
            },
        }
    }

    fn two_doc_generation() -> Generation {
        Generation::new(
            vec![doc(0, "a.pdf", &["alpha"]), doc(1, "b.pdf", &["beta"])],
            VectorStore::from_rows(vec![vec![1.0, 0.0], vec![0.0, 1.0]])
                .unwrap(),
        )
        .unwrap()
    }

    #[test]
    fn misaligned_lengths_rejected() {
        let err = Generation::new(
            vec![doc(0, "a.pdf", &[])],
            VectorStore::from_rows(vec![vec![1.0], vec![2.0]]).unwrap(),
        )
        .unwrap_err();
        assert!(matches!(err, Error::InvalidVector(_)));
    }

    #[test]
    fn non_positional_ids_rejected() {
        let err = Generation::new(
            vec![doc(1, "a.pdf", &[])],
            VectorStore::from_rows(vec![vec![1.0]]).unwrap(),
        )
        .unwrap_err();
        assert!(matches!(err, Error::InvalidVector(_)));
    }

    #[test]
    fn empty_generation() {
        let generation = Generation::empty();
        assert!(generation.is_empty());
        assert_eq!(generation.vectors().len(), 0);
    }

    #[test]
    fn get_rejects_out_of_range_and_negative() {
        let generation = two_doc_generation();
        assert_eq!(generation.get(1).unwrap().metadata.filename, "b.pdf");
        assert!(matches!(generation.get(2), Err(Error::NotFound { .. })));
        assert!(matches!(generation.get(-1), Err(Error::NotFound { .. })));
    }

    #[test]
    fn with_tags_copies_on_write() {
        let original = two_doc_generation().with_epoch(7);
        let updated = original
            .with_tags(0, vec!["edited".to_string()])
            .unwrap();

        assert_eq!(updated.documents()[0].metadata.tags, vec!["edited"]);
        assert_eq!(original.documents()[0].metadata.tags, vec!["alpha"]);
        assert_eq!(updated.epoch(), 7);
        assert!(std::ptr::eq(original.vectors(), updated.vectors()));
    }

    #[test]
    fn with_tags_unknown_id_is_not_found() {
        let generation = two_doc_generation();
        assert!(matches!(
            generation.with_tags(5, vec![]),
            Err(Error::NotFound { .. })
        ));
    }

    #[test]
    fn position_of_key() {
        let generation = two_doc_generation();
        assert_eq!(generation.position_of(&DocumentKey::new("b.pdf")), Some(1));
        assert_eq!(generation.position_of(&DocumentKey::new("c.pdf")), None);
    }

    #[test]
    fn document_serializes_with_metadata() {
        let json = serde_json::to_value(doc(0, "a.pdf", &["x"])).unwrap();
        assert_eq!(json["id"], 0);
        assert_eq!(json["metadata"]["filename"], "a.pdf");
        assert_eq!(json["metadata"]["tags"][0], "x");
        assert!(json["key"].is_string());
    }
}
