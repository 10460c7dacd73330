//! Domain types shared by the structure parser, chunker and record mapper.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

use crate::error::Error;

pub type ChunkId = String;
pub type Meta = BTreeMap<String, String>;

/// Kind of legal instrument. Drives which hierarchy levels are recognised
/// and how long a document stays in force by default.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocType {
    Law,
    Decree,
    Circular,
    Decision,
    BiddingForm,
    #[default]
    Other,
}

impl DocType {
    pub const ALL: [DocType; 6] = [
        DocType::Law,
        DocType::Decree,
        DocType::Circular,
        DocType::Decision,
        DocType::BiddingForm,
        DocType::Other,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            DocType::Law => "law",
            DocType::Decree => "decree",
            DocType::Circular => "circular",
            DocType::Decision => "decision",
            DocType::BiddingForm => "bidding_form",
            DocType::Other => "other",
        }
    }

    /// Vietnamese title used at the head of the human-readable hierarchy.
    pub fn label(self) -> &'static str {
        match self {
            DocType::Law => "LUẬT",
            DocType::Decree => "NGHỊ ĐỊNH",
            DocType::Circular => "THÔNG TƯ",
            DocType::Decision => "QUYẾT ĐỊNH",
            DocType::BiddingForm => "HỒ SƠ MỜI THẦU",
            DocType::Other => "VĂN BẢN",
        }
    }

    /// Hierarchy levels a document of this type may contain, shallowest first.
    pub fn levels(self) -> &'static [HierarchyKind] {
        use HierarchyKind::*;
        match self {
            DocType::Decree | DocType::Decision => &[Chapter, Article, Clause, Point],
            DocType::Circular => &[Chapter, Section, Article, Clause, Point],
            DocType::Law | DocType::BiddingForm | DocType::Other => {
                &[Part, Chapter, Section, Article, Clause, Point]
            }
        }
    }

    pub fn allows(self, kind: HierarchyKind) -> bool {
        kind == HierarchyKind::Document || self.levels().contains(&kind)
    }

    /// Infer the document type from a filename and the opening lines of the
    /// text. Document numbers are the strongest signal, then the title line,
    /// then the filename.
    pub fn guess(name: &str, text: &str) -> DocType {
        let head: Vec<&str> = text.lines().map(str::trim).filter(|l| !l.is_empty()).take(40).collect();
        for line in &head {
            if let Some(doc_type) = Self::from_number_suffix(line) {
                return doc_type;
            }
        }
        for line in &head {
            for doc_type in [DocType::Circular, DocType::Decree, DocType::Decision, DocType::BiddingForm, DocType::Law] {
                if line.starts_with(doc_type.label()) {
                    return doc_type;
                }
            }
        }
        let folded = fold_ascii(name).to_lowercase();
        let tokens: Vec<&str> = folded.split(|c: char| !c.is_ascii_alphanumeric()).filter(|t| !t.is_empty()).collect();
        fn has(tokens: &[&str], needle: &[&str]) -> bool {
            tokens.windows(needle.len()).any(|w| w == needle)
        }
        if has(&tokens, &["thong", "tu"]) || has(&tokens, &["tt"]) {
            DocType::Circular
        } else if has(&tokens, &["nghi", "dinh"]) || has(&tokens, &["nd"]) {
            DocType::Decree
        } else if has(&tokens, &["quyet", "dinh"]) || has(&tokens, &["qd"]) {
            DocType::Decision
        } else if has(&tokens, &["hsmt"]) || has(&tokens, &["mau"]) || has(&tokens, &["ho", "so", "moi", "thau"]) {
            DocType::BiddingForm
        } else if has(&tokens, &["luat"]) || has(&tokens, &["qh"]) {
            DocType::Law
        } else {
            DocType::Other
        }
    }

    fn from_number_suffix(line: &str) -> Option<DocType> {
        let upper = fold_ascii(line).to_uppercase();
        if upper.contains("/TT-") || upper.contains("/TTLT-") {
            Some(DocType::Circular)
        } else if upper.contains("/ND-") {
            Some(DocType::Decree)
        } else if upper.contains("/QD-") {
            Some(DocType::Decision)
        } else if upper.contains("/QH1") {
            Some(DocType::Law)
        } else {
            None
        }
    }
}

impl fmt::Display for DocType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DocType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = fold_ascii(s).to_lowercase().replace(['-', '_'], " ");
        match key.trim() {
            "law" | "luat" => Ok(DocType::Law),
            "decree" | "nghi dinh" | "nd" => Ok(DocType::Decree),
            "circular" | "thong tu" | "tt" => Ok(DocType::Circular),
            "decision" | "quyet dinh" | "qd" => Ok(DocType::Decision),
            "bidding form" | "bidding" | "ho so moi thau" | "hsmt" | "mau" => Ok(DocType::BiddingForm),
            "other" | "generic" | "van ban" => Ok(DocType::Other),
            other => Err(Error::InvalidConfig(format!("unknown document type: {other}"))),
        }
    }
}

/// One level of the legal hierarchy (Phần/Chương/Mục/Điều/Khoản/Điểm).
/// Variant order is depth order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HierarchyKind {
    Document,
    Part,
    Chapter,
    Section,
    Article,
    Clause,
    Point,
}

impl HierarchyKind {
    pub fn depth(self) -> usize {
        self as usize
    }

    pub fn label(self) -> &'static str {
        match self {
            HierarchyKind::Document => "Văn bản",
            HierarchyKind::Part => "Phần",
            HierarchyKind::Chapter => "Chương",
            HierarchyKind::Section => "Mục",
            HierarchyKind::Article => "Điều",
            HierarchyKind::Clause => "Khoản",
            HierarchyKind::Point => "Điểm",
        }
    }

    pub fn slug(self) -> &'static str {
        match self {
            HierarchyKind::Document => "van-ban",
            HierarchyKind::Part => "phan",
            HierarchyKind::Chapter => "chuong",
            HierarchyKind::Section => "muc",
            HierarchyKind::Article => "dieu",
            HierarchyKind::Clause => "khoan",
            HierarchyKind::Point => "diem",
        }
    }
}

/// `(kind, number)` pair on the way from the document root to a node.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PathEntry {
    pub kind: HierarchyKind,
    pub number: String,
}

impl PathEntry {
    pub fn new(kind: HierarchyKind, number: impl Into<String>) -> Self {
        Self { kind, number: number.into() }
    }
}

impl fmt::Display for PathEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind.label(), self.number)
    }
}

/// Granularity a chunk was cut at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChunkLevel {
    Document,
    Part,
    Chapter,
    Section,
    Article,
    Clause,
    Point,
    Paragraph,
}

impl ChunkLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            ChunkLevel::Document => "document",
            ChunkLevel::Part => "part",
            ChunkLevel::Chapter => "chapter",
            ChunkLevel::Section => "section",
            ChunkLevel::Article => "article",
            ChunkLevel::Clause => "clause",
            ChunkLevel::Point => "point",
            ChunkLevel::Paragraph => "paragraph",
        }
    }
}

impl From<HierarchyKind> for ChunkLevel {
    fn from(kind: HierarchyKind) -> Self {
        match kind {
            HierarchyKind::Document => ChunkLevel::Document,
            HierarchyKind::Part => ChunkLevel::Part,
            HierarchyKind::Chapter => ChunkLevel::Chapter,
            HierarchyKind::Section => ChunkLevel::Section,
            HierarchyKind::Article => ChunkLevel::Article,
            HierarchyKind::Clause => ChunkLevel::Clause,
            HierarchyKind::Point => ChunkLevel::Point,
        }
    }
}

/// Advisory annotations attached to chunks and records. None of these
/// block emission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QualityFlag {
    VeryShort,
    VeryLong,
    PotentiallyIncomplete,
    NoHierarchy,
    NoLegalTerms,
    ExceedsMaxSize,
    ExceedsTokenLimit,
    ValidationFailed,
}

impl QualityFlag {
    pub fn as_str(self) -> &'static str {
        match self {
            QualityFlag::VeryShort => "very_short",
            QualityFlag::VeryLong => "very_long",
            QualityFlag::PotentiallyIncomplete => "potentially_incomplete",
            QualityFlag::NoHierarchy => "no_hierarchy",
            QualityFlag::NoLegalTerms => "no_legal_terms",
            QualityFlag::ExceedsMaxSize => "exceeds_max_size",
            QualityFlag::ExceedsTokenLimit => "exceeds_token_limit",
            QualityFlag::ValidationFailed => "validation_failed",
        }
    }
}

impl fmt::Display for QualityFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A retrieval-ready text segment produced by the hybrid chunker.
///
/// - `hierarchy_path`: ancestors from the root to the node that produced the chunk
/// - `parent_id`: key of the node this chunk is a piece of, when that node was
///   split across several chunks
/// - `overlap_chars`: leading characters copied from the previous chunk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub id: ChunkId,
    pub text: String,
    pub char_count: usize,
    pub token_count: usize,
    pub hierarchy_path: Vec<PathEntry>,
    pub level: ChunkLevel,
    pub parent_id: Option<String>,
    pub quality_flags: BTreeSet<QualityFlag>,
    pub overlap_chars: usize,
}

impl Chunk {
    pub fn has_flag(&self, flag: QualityFlag) -> bool {
        self.quality_flags.contains(&flag)
    }

    /// `Chương I > Điều 5 > Khoản 2` (empty for chunks outside any heading).
    pub fn hierarchy_string(&self) -> String {
        self.hierarchy_path.iter().map(ToString::to_string).collect::<Vec<_>>().join(" > ")
    }

    /// Text contributed by this chunk alone, without the overlap prefix.
    pub fn fresh_text(&self) -> &str {
        match self.text.char_indices().nth(self.overlap_chars) {
            Some((idx, _)) => &self.text[idx..],
            None if self.overlap_chars == 0 => &self.text,
            None => "",
        }
    }
}

/// Descriptive metadata that travels with a raw document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceMetadata {
    pub source_file: String,
    pub document_id: String,
    pub document_type: DocType,
    pub document_number: Option<String>,
    pub title: Option<String>,
    pub issuing_agency: Option<String>,
    pub issue_date: Option<NaiveDate>,
    pub url: Option<String>,
    pub extra: Meta,
}

impl SourceMetadata {
    pub fn new(source_file: impl Into<String>, document_type: DocType) -> Self {
        let source_file = source_file.into();
        let stem = source_file
            .rsplit(['/', '\\'])
            .next()
            .map(|name| name.rsplit_once('.').map_or(name, |(stem, _)| stem))
            .unwrap_or_default();
        Self { document_id: slugify(stem), source_file, document_type, ..Self::default() }
    }
}

/// Already-extracted text handed to the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentInput {
    pub raw_text: String,
    pub metadata: SourceMetadata,
}

impl DocumentInput {
    pub fn new(raw_text: impl Into<String>, metadata: SourceMetadata) -> Self {
        Self { raw_text: raw_text.into(), metadata }
    }

    pub fn doc_type(&self) -> DocType {
        self.metadata.document_type
    }
}

/// Strip Vietnamese diacritics: NFD-decompose, drop combining marks, map đ/Đ.
pub fn fold_ascii(s: &str) -> String {
    s.nfd()
        .filter(|c| !is_combining_mark(*c))
        .map(|c| match c {
            'đ' => 'd',
            'Đ' => 'D',
            other => other,
        })
        .collect()
}

/// Lowercase ASCII slug (`Thông tư 15-2023` -> `thong-tu-15-2023`).
pub fn slugify(s: &str) -> String {
    let folded = fold_ascii(s).to_lowercase();
    let mut out = String::with_capacity(folded.len());
    for c in folded.chars() {
        if c.is_ascii_alphanumeric() || c == '_' {
            out.push(c);
        } else if !out.ends_with('-') && !out.is_empty() {
            out.push('-');
        }
    }
    let trimmed = out.trim_end_matches('-');
    if trimmed.is_empty() { "document".to_string() } else { trimmed.to_string() }
}
