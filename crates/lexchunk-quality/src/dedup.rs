use indexmap::IndexMap;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::hash::Hasher;
use tracing::{debug, warn};
use twox_hash::XxHash64;

use lexchunk_core::config::DedupConfig;
use lexchunk_core::error::Issue;
use lexchunk_core::types::{Chunk, DocumentInput};

const WINDOW_DIGEST_LEN: usize = 8;

/// Lowercase and collapse whitespace runs to single spaces.
pub fn normalize_text(text: &str) -> String {
    text.to_lowercase().split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Content address of the normalized text (blake3, hex).
pub fn content_hash(text: &str) -> String {
    blake3::hash(normalize_text(text).as_bytes()).to_hex().to_string()
}

/// Concatenated 8-hex-digit digests of consecutive `window_size`-word windows.
pub fn fuzzy_signature(text: &str, window_size: usize) -> String {
    let lower = text.to_lowercase();
    let words: Vec<&str> = lower.split_whitespace().collect();
    words
        .chunks(window_size.max(1))
        .map(|window| {
            let mut hasher = XxHash64::with_seed(0);
            hasher.write(window.join(" ").as_bytes());
            let digest = format!("{:016x}", hasher.finish());
            digest[..WINDOW_DIGEST_LEN].to_string()
        })
        .collect()
}

/// Position-wise share of matching windows, over the longer signature.
fn signature_similarity(a: &str, b: &str) -> f64 {
    let windows_a = a.len() / WINDOW_DIGEST_LEN;
    let windows_b = b.len() / WINDOW_DIGEST_LEN;
    let total = windows_a.max(windows_b);
    if total == 0 {
        return 0.0;
    }
    let matching = a
        .as_bytes()
        .chunks(WINDOW_DIGEST_LEN)
        .zip(b.as_bytes().chunks(WINDOW_DIGEST_LEN))
        .filter(|(x, y)| x == y)
        .count();
    matching as f64 / total as f64
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicateKind {
    Exact,
    Fuzzy,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DuplicateMatch {
    pub kind: DuplicateKind,
    /// Id of the first-seen item this one duplicates.
    pub of: String,
    pub similarity: f64,
}

impl DuplicateMatch {
    pub fn to_issue(&self, item: impl Into<String>) -> Issue {
        Issue::DuplicateDetected { item: item.into(), of: self.of.clone(), similarity: self.similarity }
    }
}

/// Run-scoped signatures. Corpus-relative: never share across unrelated runs.
#[derive(Debug, Clone, Default)]
pub struct DuplicateIndex {
    pub seen_exact_hashes: HashSet<String>,
    /// content hash -> fuzzy signature, in insertion order
    pub fuzzy_signatures: IndexMap<String, String>,
    owners: HashMap<String, String>,
}

impl DuplicateIndex {
    pub fn len(&self) -> usize { self.seen_exact_hashes.len() }

    pub fn is_empty(&self) -> bool { self.seen_exact_hashes.is_empty() }

    pub fn clear(&mut self) {
        self.seen_exact_hashes.clear();
        self.fuzzy_signatures.clear();
        self.owners.clear();
    }
}

/// Items the deduplicator can key and compare.
pub trait Dedupable {
    fn dedup_id(&self) -> &str;
    fn dedup_text(&self) -> &str;
}

impl Dedupable for DocumentInput {
    fn dedup_id(&self) -> &str { &self.metadata.document_id }
    fn dedup_text(&self) -> &str { &self.raw_text }
}

impl Dedupable for Chunk {
    fn dedup_id(&self) -> &str { &self.id }
    fn dedup_text(&self) -> &str { &self.text }
}

#[derive(Debug, Clone)]
pub struct DedupOutcome<T> {
    pub kept: Vec<T>,
    pub duplicates: Vec<(T, DuplicateMatch)>,
}

/// Exact and fuzzy duplicate detection over one batch. Fuzzy comparison is
/// linear in the number of indexed items per check.
#[derive(Debug, Clone)]
pub struct Deduplicator {
    config: DedupConfig,
    index: DuplicateIndex,
}

impl Deduplicator {
    pub fn new(config: DedupConfig) -> Self {
        Self { config, index: DuplicateIndex::default() }
    }

    pub fn config(&self) -> &DedupConfig { &self.config }

    pub fn index(&self) -> &DuplicateIndex { &self.index }

    /// Compare `text` against everything added so far.
    pub fn check(&self, text: &str) -> Option<DuplicateMatch> {
        let hash = content_hash(text);
        if self.index.seen_exact_hashes.contains(&hash) {
            let of = self.index.owners.get(&hash).cloned().unwrap_or_default();
            return Some(DuplicateMatch { kind: DuplicateKind::Exact, of, similarity: 1.0 });
        }
        if self.config.exact_only {
            return None;
        }
        let signature = fuzzy_signature(text, self.config.window_size);
        self.index
            .fuzzy_signatures
            .iter()
            .map(|(h, s)| (h, signature_similarity(&signature, s)))
            .filter(|(_, sim)| *sim >= self.config.similarity_threshold)
            .max_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(h, similarity)| DuplicateMatch {
                kind: DuplicateKind::Fuzzy,
                of: self.index.owners.get(h).cloned().unwrap_or_default(),
                similarity,
            })
    }

    pub fn is_duplicate(&self, text: &str) -> bool {
        self.check(text).is_some()
    }

    /// Index `text` under `id`. Returns its content hash. The first id
    /// registered for a hash stays its owner.
    pub fn add_document(&mut self, id: &str, text: &str) -> String {
        let hash = content_hash(text);
        if self.index.seen_exact_hashes.insert(hash.clone()) {
            self.index.owners.insert(hash.clone(), id.to_string());
            if !self.config.exact_only {
                let signature = fuzzy_signature(text, self.config.window_size);
                self.index.fuzzy_signatures.insert(hash.clone(), signature);
            }
        }
        hash
    }

    /// `check`, then `add_document` when the text is new.
    pub fn check_and_add(&mut self, id: &str, text: &str) -> Option<DuplicateMatch> {
        let found = self.check(text);
        if found.is_none() {
            self.add_document(id, text);
        }
        found
    }

    pub fn reset(&mut self) {
        self.index.clear();
    }

    /// Keep the first occurrence of each item, in order. With dedup
    /// disabled everything is kept.
    pub fn deduplicate<T: Dedupable>(&mut self, items: Vec<T>) -> DedupOutcome<T> {
        let mut kept = Vec::with_capacity(items.len());
        let mut duplicates = Vec::new();
        for item in items {
            if !self.config.enabled {
                kept.push(item);
                continue;
            }
            match self.check_and_add(item.dedup_id(), item.dedup_text()) {
                Some(found) => {
                    warn!(item = item.dedup_id(), of = %found.of, kind = ?found.kind, similarity = found.similarity, "duplicate detected");
                    duplicates.push((item, found));
                }
                None => kept.push(item),
            }
        }
        debug!(kept = kept.len(), duplicates = duplicates.len(), indexed = self.index.len(), "deduplicated batch");
        DedupOutcome { kept, duplicates }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(n: usize, salt: &str) -> String {
        (0..n).map(|i| format!("từ{i}{salt}")).collect::<Vec<_>>().join(" ")
    }

    #[test]
    fn normalization_ignores_case_and_spacing() {
        assert_eq!(normalize_text("  Điều  1.\n\tPHẠM vi "), "điều 1. phạm vi");
        assert_eq!(content_hash("Điều 1.  Phạm vi"), content_hash("điều 1. phạm vi\n"));
        assert_ne!(content_hash("Điều 1"), content_hash("Điều 2"));
    }

    #[test]
    fn signature_has_one_digest_per_window() {
        assert_eq!(fuzzy_signature(&words(250, ""), 100).len(), 24);
        assert_eq!(fuzzy_signature("", 100), "");
        assert_eq!(fuzzy_signature("Một HAI", 100), fuzzy_signature("một hai", 100));
    }

    #[test]
    fn similarity_counts_matching_positions() {
        assert_eq!(signature_similarity("aaaaaaaabbbbbbbb", "aaaaaaaabbbbbbbb"), 1.0);
        assert_eq!(signature_similarity("aaaaaaaabbbbbbbb", "aaaaaaaacccccccc"), 0.5);
        assert_eq!(signature_similarity("aaaaaaaa", "aaaaaaaacccccccc"), 0.5);
        assert_eq!(signature_similarity("", ""), 0.0);
    }

    #[test]
    fn fuzzy_match_above_threshold() {
        let config = DedupConfig { similarity_threshold: 0.9, window_size: 10, ..DedupConfig::default() };
        let mut dedup = Deduplicator::new(config);
        let base = words(200, "");
        dedup.add_document("a", &base);

        // last word replaced: 19 of 20 windows match
        let near = format!("{} khác", words(199, ""));
        let found = dedup.check(&near).expect("fuzzy duplicate");
        assert_eq!(found.kind, DuplicateKind::Fuzzy);
        assert_eq!(found.of, "a");
        assert!((found.similarity - 0.95).abs() < 1e-9);

        assert!(!dedup.is_duplicate(&words(200, "x")));
    }

    #[test]
    fn exact_only_skips_fuzzy_index() {
        let config = DedupConfig { exact_only: true, window_size: 10, ..DedupConfig::default() };
        let mut dedup = Deduplicator::new(config);
        let base = words(200, "");
        dedup.add_document("a", &base);
        assert!(dedup.index().fuzzy_signatures.is_empty());
        assert!(dedup.check(&format!("{} khác", words(199, ""))).is_none());
        assert_eq!(dedup.check(&base).map(|m| m.kind), Some(DuplicateKind::Exact));
    }

    #[test]
    fn reset_forgets_everything() {
        let mut dedup = Deduplicator::new(DedupConfig::default());
        assert!(dedup.check_and_add("a", "Nội dung").is_none());
        assert!(dedup.check_and_add("b", "nội   DUNG").is_some());
        assert_eq!(dedup.index().len(), 1);
        dedup.reset();
        assert!(dedup.index().is_empty());
        assert!(dedup.check_and_add("b", "nội dung").is_none());
    }
}
