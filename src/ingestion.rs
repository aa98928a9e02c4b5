use std::{sync::Arc, time::Instant};

use rayon::prelude::*;

use crate::{
    catalog::{Document, DocumentMetadata, Generation},
    config::{EngineConfig, FailurePolicy},
    doc_key::DocumentKey,
    embedding::Embedder,
    error::{Error, Result, Stage},
    extract::TextExtractor,
    tags::TagExtractor,
    text_util,
    vector_store::{VectorStore, check_finite},
    walker::{self, DiscoveredFile},
};

/// The collaborators a rebuild calls for every document.
#[derive(Clone)]
pub struct Collaborators {
    pub extractor: Arc<dyn TextExtractor>,
    pub embedder: Arc<dyn Embedder>,
    pub tagger: Arc<dyn TagExtractor>,
}

/// What a rebuild produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RebuildSummary {
    pub epoch: u64,
    pub discovered: usize,
    pub indexed: usize,
    pub skipped: usize,
}

/// A fully processed file, before ids are assigned.
struct Processed {
    key: DocumentKey,
    filename: String,
    path: String,
    content: String,
    tags: Vec<String>,
    vector: Vec<f32>,
}

/// Scan `root` and build a complete generation from its documents.
///
/// Files are processed in parallel; the output keeps walk order. Failures
/// are handled according to `config.failure_policy`. The returned summary's
/// epoch is 0; the generation store assigns the real one on publish.
pub fn build_generation(
    root: &std::path::Path,
    collaborators: &Collaborators,
    config: &EngineConfig,
) -> Result<(Generation, RebuildSummary)> {
    let started = Instant::now();
    let files = walker::discover_files(root)?;
    tracing::info!(
        root = %root.display(),
        files = files.len(),
        "building generation"
    );

    let outcomes: Vec<Result<Processed>> = files
        .par_iter()
        .map(|file| process_file(file, collaborators, config))
        .collect();

    let mut processed = Vec::with_capacity(outcomes.len());
    let mut skipped = 0;
    for (file, outcome) in files.iter().zip(outcomes) {
        match outcome {
            Ok(p) => processed.push(p),
            Err(e) => match config.failure_policy {
                FailurePolicy::Abort => return Err(e),
                FailurePolicy::Skip => {
                    tracing::warn!(
                        path = %file.absolute_path.display(),
                        error = %e,
                        "skipping document"
                    );
                    skipped += 1;
                }
            },
        }
    }

    let mut documents = Vec::with_capacity(processed.len());
    let mut vectors = Vec::with_capacity(processed.len());
    for (id, p) in processed.into_iter().enumerate() {
        documents.push(Document {
            id,
            key: p.key,
            content: p.content,
            metadata: DocumentMetadata {
                filename: p.filename,
                path: p.path,
                tags: p.tags,
            },
        });
        vectors.push(p.vector);
    }

    let indexed = documents.len();
    let generation = Generation::new(documents, VectorStore::from_rows(vectors)?)?;

    tracing::info!(
        indexed,
        skipped,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "generation built"
    );

    Ok((
        generation,
        RebuildSummary {
            epoch: 0,
            discovered: files.len(),
            indexed,
            skipped,
        },
    ))
}

fn process_file(
    file: &DiscoveredFile,
    collaborators: &Collaborators,
    config: &EngineConfig,
) -> Result<Processed> {
    let path = &file.absolute_path;
    tracing::debug!(path = %path.display(), "processing document");

    let text = collaborators
        .extractor
        .extract(path, config.max_pages)
        .map_err(|e| in_stage(e, Stage::Extract, path))?;

    let vector = collaborators
        .embedder
        .embed(&text)
        .map_err(|e| in_stage(e, Stage::Embed, path))?;
    check_finite(&vector)
        .map_err(|msg| Error::collaborator(Stage::Embed, path, msg))?;

    let tags = collaborators
        .tagger
        .extract_with_embedding(&text, &vector, config.tag_count)
        .map_err(|e| in_stage(e, Stage::Tag, path))?;

    Ok(Processed {
        key: DocumentKey::new(&file.relative_str()),
        filename: file.file_name(),
        path: path.to_string_lossy().into_owned(),
        content: text_util::preview(&text, config.preview_chars),
        tags,
        vector,
    })
}

/// Attribute a collaborator error to the stage and file it happened in.
fn in_stage(error: Error, stage: Stage, path: &std::path::Path) -> Error {
    match error {
        e @ Error::Collaborator { .. } => e,
        other => Error::collaborator(stage, path, other),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::path::Path;

    use super::*;
    use crate::{embedding::HashingEmbedder, tags::KeyphraseTagger};

    /// Serves file contents as text, failing for files whose text is
    /// `"FAIL"`.
    pub(crate) struct RawTextExtractor;

    impl TextExtractor for RawTextExtractor {
        fn extract(&self, path: &Path, _max_pages: usize) -> Result<String> {
            let text = std::fs::read_to_string(path)
                .map_err(|e| Error::collaborator(Stage::Extract, path, e))?;
            if text == "FAIL" {
                return Err(Error::collaborator(
                    Stage::Extract,
                    path,
                    "unreadable document",
                ));
            }
            Ok(text)
        }
    }

    struct NanEmbedder;

    impl Embedder for NanEmbedder {
        fn embed(&self, _text: &str) -> Result<Vec<f32>> {
            Ok(vec![f32::NAN, 1.0])
        }

        fn describe(&self) -> String {
            "nan".into()
        }
    }

    pub(crate) fn collaborators() -> Collaborators {
        let embedder: Arc<dyn Embedder> = Arc::new(HashingEmbedder::default());
        Collaborators {
            extractor: Arc::new(RawTextExtractor),
            tagger: Arc::new(KeyphraseTagger::new(Arc::clone(&embedder))),
            embedder,
        }
    }

    fn write_docs(dir: &Path, docs: &[(&str, &str)]) {
        for (name, text) in docs {
            std::fs::write(dir.join(name), text).unwrap();
        }
    }

    #[test]
    fn builds_aligned_generation_in_walk_order() {
        let tmp = tempfile::tempdir().unwrap();
        write_docs(tmp.path(), &[
            ("b.pdf", "Bond market outlook for municipal bonds"),
            ("a.pdf", "Annual report revenue and earnings"),
            ("notes.txt", "ignored"),
        ]);

        let (generation, summary) = build_generation(
            tmp.path(),
            &collaborators(),
            &EngineConfig::default(),
        )
        .unwrap();

        assert_eq!(summary.discovered, 2);
        assert_eq!(summary.indexed, 2);
        assert_eq!(generation.len(), 2);
        assert_eq!(generation.vectors().len(), 2);

        let names: Vec<_> = generation
            .documents()
            .iter()
            .map(|d| (d.id, d.metadata.filename.as_str()))
            .collect();
        assert_eq!(names, vec![(0, "a.pdf"), (1, "b.pdf")]);

        let embedder = HashingEmbedder::default();
        for doc in generation.documents() {
            let text = std::fs::read_to_string(&doc.metadata.path).unwrap();
            let expected = embedder.embed(&text).unwrap();
            assert_eq!(generation.vectors().row(doc.id).unwrap(), &expected[..]);
            assert!(doc.metadata.tags.len() <= 3);
            assert!(!doc.metadata.tags.is_empty());
        }
    }

    #[test]
    fn content_is_truncated_preview() {
        let tmp = tempfile::tempdir().unwrap();
        let long = "word ".repeat(400);
        write_docs(tmp.path(), &[("long.pdf", &long)]);

        let (generation, _) = build_generation(
            tmp.path(),
            &collaborators(),
            &EngineConfig::default(),
        )
        .unwrap();
        assert_eq!(generation.documents()[0].content.chars().count(), 500);
    }

    #[test]
    fn empty_directory_yields_empty_generation() {
        let tmp = tempfile::tempdir().unwrap();
        let (generation, summary) = build_generation(
            tmp.path(),
            &collaborators(),
            &EngineConfig::default(),
        )
        .unwrap();
        assert!(generation.is_empty());
        assert_eq!(summary.indexed, 0);
    }

    #[test]
    fn skip_policy_drops_failing_file_and_keeps_ids_contiguous() {
        let tmp = tempfile::tempdir().unwrap();
        write_docs(tmp.path(), &[
            ("a.pdf", "alpha document"),
            ("b.pdf", "FAIL"),
            ("c.pdf", "gamma document"),
        ]);

        let config = EngineConfig {
            failure_policy: FailurePolicy::Skip,
            ..EngineConfig::default()
        };
        let (generation, summary) =
            build_generation(tmp.path(), &collaborators(), &config).unwrap();

        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.indexed, 2);
        let docs: Vec<_> = generation
            .documents()
            .iter()
            .map(|d| (d.id, d.metadata.filename.clone()))
            .collect();
        assert_eq!(docs, vec![(0, "a.pdf".into()), (1, "c.pdf".into())]);
    }

    #[test]
    fn abort_policy_fails_whole_rebuild() {
        let tmp = tempfile::tempdir().unwrap();
        write_docs(tmp.path(), &[("a.pdf", "alpha"), ("b.pdf", "FAIL")]);

        let config = EngineConfig {
            failure_policy: FailurePolicy::Abort,
            ..EngineConfig::default()
        };
        let err = match build_generation(tmp.path(), &collaborators(), &config) {
            Err(e) => e,
            Ok(_) => panic!("rebuild should fail"),
        };
        match err {
            Error::Collaborator { stage, path, .. } => {
                assert_eq!(stage, Stage::Extract);
                assert!(path.ends_with("b.pdf"));
            }
            other => panic!("expected collaborator failure, got {other:?}"),
        }
    }

    #[test]
    fn non_finite_embedding_is_collaborator_failure() {
        let tmp = tempfile::tempdir().unwrap();
        write_docs(tmp.path(), &[("a.pdf", "alpha")]);

        let mut collab = collaborators();
        collab.embedder = Arc::new(NanEmbedder);
        let config = EngineConfig {
            failure_policy: FailurePolicy::Abort,
            ..EngineConfig::default()
        };
        let err = build_generation(tmp.path(), &collab, &config).err().unwrap();
        assert!(matches!(err, Error::Collaborator { stage: Stage::Embed, .. }));

        let (generation, summary) = build_generation(
            tmp.path(),
            &collab,
            &EngineConfig::default(),
        )
        .unwrap();
        assert!(generation.is_empty());
        assert_eq!(summary.skipped, 1);
    }

    #[test]
    fn keys_are_stable_across_rebuilds() {
        let tmp = tempfile::tempdir().unwrap();
        write_docs(tmp.path(), &[("m.pdf", "middle")]);
        let (first, _) = build_generation(
            tmp.path(),
            &collaborators(),
            &EngineConfig::default(),
        )
        .unwrap();

        write_docs(tmp.path(), &[("a.pdf", "first in order")]);
        let (second, _) = build_generation(
            tmp.path(),
            &collaborators(),
            &EngineConfig::default(),
        )
        .unwrap();

        let key = first.documents()[0].key;
        // The id moved, the key did not.
        assert_eq!(first.documents()[0].id, 0);
        assert_eq!(second.position_of(&key), Some(1));
    }
}
