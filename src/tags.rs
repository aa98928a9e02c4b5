//! Topical tag extraction.
//!
//! Tags are short keyphrases chosen the way KeyBERT chooses them: collect
//! candidate 1–2 word phrases from the document (stop words removed before
//! phrases are formed), embed every candidate with the same model as the
//! document, and keep the candidates closest to the document embedding.

use std::{collections::HashMap, sync::Arc};

use crate::{
    embedding::Embedder,
    error::Result,
    text_util,
    vector_store::cosine_similarity,
};

/// Default number of tags attached to each document.
pub const DEFAULT_TAG_COUNT: usize = 3;

/// Candidate phrases scored per document. The most frequent phrases are
/// kept so large documents do not turn into thousands of embedding calls.
pub const MAX_CANDIDATES: usize = 64;

/// Proposes a small ordered set of topical tags for a text.
pub trait TagExtractor: Send + Sync {
    /// Return at most `count` tags, most relevant first.
    fn extract(&self, text: &str, count: usize) -> Result<Vec<String>>;

    /// Same as [`TagExtractor::extract`], reusing an embedding of `text`
    /// that the caller already computed.
    fn extract_with_embedding(
        &self,
        text: &str,
        _embedding: &[f32],
        count: usize,
    ) -> Result<Vec<String>> {
        self.extract(text, count)
    }
}

/// Embedding-ranked keyphrase extraction over 1–2 word n-grams.
pub struct KeyphraseTagger {
    embedder: Arc<dyn Embedder>,
    max_candidates: usize,
}

impl KeyphraseTagger {
    pub fn new(embedder: Arc<dyn Embedder>) -> Self {
        Self {
            embedder,
            max_candidates: MAX_CANDIDATES,
        }
    }

    pub fn with_max_candidates(mut self, max_candidates: usize) -> Self {
        self.max_candidates = max_candidates.max(1);
        self
    }

    fn rank_candidates(
        &self,
        text: &str,
        embedding: &[f32],
        count: usize,
    ) -> Result<Vec<String>> {
        if count == 0 {
            return Ok(Vec::new());
        }
        let candidates = candidate_phrases(text, self.max_candidates);
        if candidates.is_empty() {
            return Ok(Vec::new());
        }

        let vectors = self.embedder.embed_batch(&candidates)?;
        let mut scored: Vec<(f32, String)> = vectors
            .iter()
            .zip(candidates)
            .map(|(v, phrase)| (cosine_similarity(embedding, v), phrase))
            .collect();

        scored.sort_by(|a, b| {
            b.0.partial_cmp(&a.0)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.1.cmp(&b.1))
        });

        Ok(scored
            .into_iter()
            .take(count)
            .map(|(_, phrase)| phrase)
            .collect())
    }
}

impl TagExtractor for KeyphraseTagger {
    fn extract(&self, text: &str, count: usize) -> Result<Vec<String>> {
        let embedding = self.embedder.embed(text)?;
        self.rank_candidates(text, &embedding, count)
    }

    fn extract_with_embedding(
        &self,
        text: &str,
        embedding: &[f32],
        count: usize,
    ) -> Result<Vec<String>> {
        self.rank_candidates(text, embedding, count)
    }
}

impl std::fmt::Debug for KeyphraseTagger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyphraseTagger")
            .field("max_candidates", &self.max_candidates)
            .finish_non_exhaustive()
    }
}

/// Unique 1–2 word phrases, most frequent first (ties alphabetical), capped
/// at `limit`.
pub fn candidate_phrases(text: &str, limit: usize) -> Vec<String> {
    let words: Vec<String> = text_util::tokenize(text)
        .into_iter()
        .filter(|w| is_candidate_word(w))
        .collect();

    let mut counts: HashMap<String, usize> = HashMap::new();
    for word in &words {
        *counts.entry(word.clone()).or_default() += 1;
    }
    for pair in words.windows(2) {
        if pair[0] != pair[1] {
            *counts.entry(format!("{} {}", pair[0], pair[1])).or_default() += 1;
        }
    }

    let mut phrases: Vec<(String, usize)> = counts.into_iter().collect();
    phrases.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    phrases.into_iter().take(limit).map(|(p, _)| p).collect()
}

fn is_candidate_word(word: &str) -> bool {
    word.chars().count() >= 2
        && !word.chars().all(|c| c.is_numeric() || c == '-')
        && !is_stop_word(word)
}

pub fn is_stop_word(word: &str) -> bool {
    STOP_WORDS.binary_search(&word).is_ok()
}

/// English stop words, sorted for binary search.
pub const STOP_WORDS: &[&str] = &[
    "a", "about", "above", "across", "after", "afterwards", "again", "against",
    "all", "almost", "alone", "along", "already", "also", "although", "always",
    "am", "among", "amongst", "an", "and", "another", "any", "anyhow",
    "anyone", "anything", "anyway", "anywhere", "are", "around", "as", "at",
    "be", "became", "because", "become", "becomes", "been", "before",
    "beforehand", "behind", "being", "below", "beside", "besides", "between",
    "beyond", "both", "but", "by", "can", "cannot", "could", "did", "do",
    "does", "doing", "done", "down", "due", "during", "each", "either", "else",
    "elsewhere", "enough", "etc", "even", "ever", "every", "everyone",
    "everything", "everywhere", "except", "few", "for", "former", "formerly",
    "from", "further", "had", "has", "have", "having", "he", "hence", "her",
    "here", "hereafter", "hereby", "herein", "hers", "herself", "him",
    "himself", "his", "how", "however", "i", "ie", "if", "in", "indeed",
    "into", "is", "it", "it's", "its", "itself", "just", "last", "latter",
    "least", "less", "many", "may", "me", "meanwhile", "might", "more",
    "moreover", "most", "mostly", "much", "must", "my", "myself", "namely",
    "neither", "never", "nevertheless", "next", "no", "nobody", "none",
    "nor", "not", "nothing", "now", "nowhere", "of", "off", "often", "on",
    "once", "one", "only", "onto", "or", "other", "others", "otherwise",
    "our", "ours", "ourselves", "out", "over", "own", "per", "perhaps",
    "please", "rather", "re", "same", "seem", "seemed", "seeming", "seems",
    "several", "she", "should", "since", "so", "some", "somehow", "someone",
    "something", "sometime", "sometimes", "somewhere", "still", "such",
    "than", "that", "the", "their", "theirs", "them", "themselves", "then",
    "thence", "there", "thereafter", "thereby", "therefore", "therein",
    "thereupon", "these", "they", "this", "those", "though", "through",
    "throughout", "thru", "thus", "to", "together", "too", "toward",
    "towards", "under", "until", "up", "upon", "us", "very", "via", "was",
    "we", "well", "were", "what", "whatever", "when", "whence", "whenever",
    "where", "whereafter", "whereas", "whereby", "wherein", "whereupon",
    "wherever", "whether", "which", "while", "whither", "who", "whoever",
    "whole", "whom", "whose", "why", "will", "with", "within", "without",
    "would", "yet", "you", "your", "yours", "yourself", "yourselves",
];
