use std::{
    collections::hash_map::DefaultHasher,
    hash::{Hash, Hasher},
};

use serde::{Serialize, Serializer};

/// A stable document key derived from the path relative to the document
/// store.
///
/// Positional ids change whenever a rebuild sees a different directory
/// listing; the key only changes when the file itself moves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DocumentKey(u64);

impl DocumentKey {
    const HEX_LEN: usize = 12;

    pub fn new(relative_path: &str) -> Self {
        let mut hasher = DefaultHasher::new();
        // Normalize separators so the same tree hashes identically everywhere.
        relative_path.replace('\\', "/").hash(&mut hasher);
        Self(hasher.finish())
    }

    pub fn numeric(&self) -> u64 {
        self.0
    }

    /// Parse the short hex form produced by `Display`.
    pub fn parse(short: &str) -> Option<Self> {
        let short = short.trim().trim_start_matches('#');
        if short.len() != Self::HEX_LEN {
            return None;
        }
        let prefix = u64::from_str_radix(short, 16).ok()?;
        Some(Self(prefix << (64 - Self::HEX_LEN * 4)))
    }

    /// Compare against a parsed short key, ignoring the truncated low bits.
    pub fn matches(&self, other: &DocumentKey) -> bool {
        let shift = 64 - Self::HEX_LEN * 4;
        self.0 >> shift == other.0 >> shift
    }
}

impl std::fmt::Display for DocumentKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let full = format!("{:016x}", self.0);
        f.write_str(&full[..Self::HEX_LEN])
    }
}

impl Serialize for DocumentKey {
    fn serialize<S: Serializer>(
        &self,
        serializer: S,
    ) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
