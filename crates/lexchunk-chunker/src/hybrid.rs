use std::collections::BTreeSet;

use tracing::{debug, warn};

use lexchunk_core::config::ChunkingConfig;
use lexchunk_core::types::{Chunk, ChunkLevel, DocType, PathEntry, QualityFlag};
use lexchunk_structure::{HierarchyNode, StructureParser};
use lexchunk_tokenize::TokenBudgetChecker;

use crate::boundary::{find_cut, overlap_start};
use crate::flags::quality_flags;
use crate::units::{flatten, Unit};

/// Packs a hierarchy tree into chunks inside the character envelope and the
/// token budget.
///
/// Units are appended greedily in document order. An Article or Clause that
/// would fit a chunk on its own starts a fresh chunk instead of straddling
/// two. A unit that does not fit is cut at a line, sentence or word
/// boundary, and the next chunk is seeded with the tail of the previous one.
/// Points are never cut; an oversized Point becomes its own chunk flagged
/// `exceeds_max_size`.
#[derive(Debug, Clone)]
pub struct HybridChunker {
    config: ChunkingConfig,
    budget: TokenBudgetChecker,
    legal_terms: Vec<String>,
}

impl HybridChunker {
    pub fn new(config: ChunkingConfig, budget: TokenBudgetChecker) -> Self {
        let legal_terms = config.legal_terms.iter().map(|t| t.to_lowercase()).collect();
        Self { config, budget, legal_terms }
    }

    pub fn config(&self) -> &ChunkingConfig { &self.config }

    pub fn budget(&self) -> &TokenBudgetChecker { &self.budget }

    pub fn chunk(&self, tree: &HierarchyNode, doc_id: &str) -> Vec<Chunk> {
        let units = flatten(tree, doc_id);
        let mut packer = Packer::new(self, doc_id, &units);
        for uid in 0..units.len() {
            packer.place(uid);
        }
        packer.flush(None);
        let chunks = packer.chunks;
        debug!(doc_id, units = units.len(), chunks = chunks.len(), "chunked document");
        chunks
    }

    /// Parse then chunk.
    pub fn chunk_text(&self, text: &str, doc_type: DocType, doc_id: &str) -> Vec<Chunk> {
        let tree = StructureParser::new(doc_type).parse(text);
        self.chunk(&tree, doc_id)
    }
}

#[derive(Debug, Clone, Copy)]
struct Member {
    uid: usize,
    /// Only part of the unit is in this chunk.
    partial: bool,
}

struct Packer<'a> {
    chunker: &'a HybridChunker,
    doc_id: &'a str,
    units: &'a [Unit],
    chunks: Vec<Chunk>,
    buf: String,
    buf_chars: usize,
    overlap_bytes: usize,
    overlap_chars: usize,
    members: Vec<Member>,
}

impl<'a> Packer<'a> {
    fn new(chunker: &'a HybridChunker, doc_id: &'a str, units: &'a [Unit]) -> Self {
        Self {
            chunker,
            doc_id,
            units,
            chunks: Vec::new(),
            buf: String::new(),
            buf_chars: 0,
            overlap_bytes: 0,
            overlap_chars: 0,
            members: Vec::new(),
        }
    }

    fn max(&self) -> usize { self.chunker.config.max_chunk_size }

    fn min(&self) -> usize { self.chunker.config.min_chunk_size }

    fn has_fresh(&self) -> bool {
        !self.buf[self.overlap_bytes..].trim().is_empty()
    }

    /// Units are newline-separated; pieces of the same unit are contiguous.
    fn separator(&self, uid: usize) -> &'static str {
        match self.members.last() {
            None => "",
            Some(m) if m.uid == uid => "",
            Some(_) => "\n",
        }
    }

    fn tokens_fit(&self, sep: &str, piece: &str) -> bool {
        let candidate = format!("{}{}{}", self.buf, sep, piece);
        self.chunker.budget.count(&candidate) <= self.chunker.budget.token_limit()
    }

    fn place(&mut self, uid: usize) {
        let units = self.units;
        let unit = &units[uid];
        if let Some(group) = unit.group_chars {
            let max = self.max();
            if self.has_fresh() && group <= max && self.buf_chars + 1 + group > max && self.buf_chars >= self.min() {
                self.flush(None);
            }
        }

        let mut rest: &str = &unit.text;
        let mut started = false;
        loop {
            if self.buf.is_empty() {
                rest = rest.trim_start();
            }
            if rest.is_empty() {
                break;
            }
            let sep = self.separator(uid);
            let used = self.buf_chars + sep.len();
            let room = self.max().saturating_sub(used);
            if rest.chars().count() <= room && self.tokens_fit(sep, rest) {
                self.push(uid, sep, rest, started);
                break;
            }
            if self.has_fresh() && self.buf_chars >= self.min() {
                self.flush(None);
                continue;
            }
            if unit.atomic {
                if !self.buf.is_empty() && rest.chars().count() <= self.max() {
                    // a Point that fits alone opens the next chunk
                    self.flush(None);
                    continue;
                }
                self.push(uid, sep, rest, started);
                self.flush(None);
                break;
            }
            let want = self.min().saturating_sub(used);
            let cut = match self.token_cut(sep, rest, want, room) {
                Some(cut) => cut,
                None if self.has_fresh() => {
                    self.flush(None);
                    continue;
                }
                None if self.overlap_bytes > 0 => {
                    // overlap leaves no token room
                    self.reset(String::new(), None);
                    continue;
                }
                None => find_cut(rest, want, room),
            };
            let (head, tail) = rest.split_at(cut);
            self.push(uid, sep, head, true);
            let continues = !tail.trim().is_empty();
            self.flush(continues.then_some(uid));
            rest = tail;
            started = true;
        }
    }

    /// Character cut, shrunk until the buffer plus head fits the token
    /// budget. `None` when not even one character fits.
    fn token_cut(&self, sep: &str, rest: &str, want: usize, room: usize) -> Option<usize> {
        let mut hi = room.max(1);
        let mut want = want;
        loop {
            let cut = find_cut(rest, want.min(hi), hi);
            if self.tokens_fit(sep, &rest[..cut]) {
                return Some(cut);
            }
            if hi == 1 {
                return None;
            }
            hi = (rest[..cut].chars().count() * 3 / 4).max(1);
            want = 0;
        }
    }

    fn push(&mut self, uid: usize, sep: &str, text: &str, partial: bool) {
        self.buf.push_str(sep);
        self.buf.push_str(text);
        self.buf_chars += sep.len() + text.chars().count();
        match self.members.last_mut() {
            Some(m) if m.uid == uid => m.partial |= partial,
            _ => self.members.push(Member { uid, partial }),
        }
    }

    /// Emit the buffer. With `carry`, seed the next buffer with the tail of
    /// this one because unit `carry` continues in the next chunk.
    fn flush(&mut self, carry: Option<usize>) {
        if !self.has_fresh() {
            self.reset(String::new(), None);
            return;
        }
        let seed = match carry {
            Some(_) => {
                let start = overlap_start(&self.buf, self.chunker.config.overlap_size);
                self.buf[start..].to_string()
            }
            None => String::new(),
        };
        let chunk = self.finish();
        if chunk.has_flag(QualityFlag::ExceedsMaxSize) {
            warn!(chunk_id = %chunk.id, chars = chunk.char_count, max = self.max(), "unsplittable unit exceeds max_chunk_size");
        }
        self.chunks.push(chunk);
        self.reset(seed, carry);
    }

    fn reset(&mut self, seed: String, carry: Option<usize>) {
        self.members.clear();
        if let (Some(uid), false) = (carry, seed.is_empty()) {
            self.members.push(Member { uid, partial: true });
        }
        self.overlap_bytes = seed.len();
        self.overlap_chars = seed.chars().count();
        self.buf_chars = self.overlap_chars;
        self.buf = seed;
    }

    fn finish(&self) -> Chunk {
        let text = self.buf.trim_end().to_string();
        let hierarchy_path = common_path(self.members.iter().map(|m| self.units[m.uid].path.as_slice()));
        let (level, parent_id) = match self.members.as_slice() {
            [only] if only.partial => (ChunkLevel::Paragraph, Some(self.units[only.uid].key.clone())),
            _ => (hierarchy_path.last().map_or(ChunkLevel::Document, |e| e.kind.into()), None),
        };
        let char_count = text.chars().count();
        let token_count = self.chunker.budget.count(&text);
        let mut chunk = Chunk {
            id: format!("{}:{}", self.doc_id, self.chunks.len()),
            text,
            char_count,
            token_count,
            hierarchy_path,
            level,
            parent_id,
            quality_flags: BTreeSet::new(),
            overlap_chars: self.overlap_chars.min(char_count),
        };
        chunk.quality_flags = quality_flags(
            &chunk,
            self.chunker.config.max_chunk_size,
            self.chunker.budget.token_limit(),
            &self.chunker.legal_terms,
        );
        chunk
    }
}

/// Longest shared prefix of the member paths.
fn common_path<'p>(mut paths: impl Iterator<Item = &'p [PathEntry]>) -> Vec<PathEntry> {
    let Some(first) = paths.next() else { return Vec::new() };
    let mut len = first.len();
    for path in paths {
        len = first.iter().zip(path).take(len).take_while(|(a, b)| a == b).count();
    }
    first[..len].to_vec()
}
