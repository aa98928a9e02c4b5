use std::cmp::Ordering;

use rayon::prelude::*;

use crate::{
    catalog::Generation,
    vector_store::{dot, normalize_in_place},
};

/// A ranked document with its cosine similarity to the query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RankedDocument {
    pub id: usize,
    pub score: f32,
}

/// Restricts ranking to documents carrying at least one of the given tags.
///
/// Matching ignores ASCII case and surrounding whitespace. An empty filter
/// accepts everything.
#[derive(Debug, Clone, Default)]
pub struct TagFilter {
    tags: Vec<String>,
}

impl TagFilter {
    pub fn new<I, S>(tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            tags: tags
                .into_iter()
                .map(|t| t.as_ref().trim().to_ascii_lowercase())
                .filter(|t| !t.is_empty())
                .collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    pub fn accepts(&self, document_tags: &[String]) -> bool {
        self.tags.is_empty()
            || document_tags.iter().any(|t| {
                let t = t.trim();
                self.tags.iter().any(|f| f.eq_ignore_ascii_case(t))
            })
    }
}

/// Exact cosine ranking of every document in `generation` against `query`.
///
/// Returns at most `top_k` documents ordered by descending score, ties by
/// ascending id. `top_k <= 0` and an empty generation both yield an empty
/// result. Zero-norm vectors on either side score 0.
pub fn rank(
    query: &[f32],
    generation: &Generation,
    top_k: i64,
    filter: &TagFilter,
) -> Vec<RankedDocument> {
    let Ok(top_k) = usize::try_from(top_k) else {
        return Vec::new();
    };
    if top_k == 0 || generation.is_empty() {
        return Vec::new();
    }

    let mut query = query.to_vec();
    normalize_in_place(&mut query);

    let vectors = generation.vectors();
    let mut ranked: Vec<RankedDocument> = generation
        .documents()
        .par_iter()
        .filter(|doc| filter.accepts(&doc.metadata.tags))
        .filter_map(|doc| {
            let row = vectors.normalized_row(doc.id)?;
            let score = if row.len() == query.len() {
                dot(&query, row).clamp(-1.0, 1.0)
            } else {
                0.0
            };
            Some(RankedDocument { id: doc.id, score })
        })
        .collect();

    ranked.sort_by(compare_ranked);
    ranked.truncate(top_k);
    ranked
}

/// Descending score, then ascending id.
fn compare_ranked(a: &RankedDocument, b: &RankedDocument) -> Ordering {
    b.score
        .partial_cmp(&a.score)
        .unwrap_or(Ordering::Equal)
        .then_with(|| a.id.cmp(&b.id))
}
