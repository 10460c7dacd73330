use chrono::{DateTime, Datelike, Utc};
use once_cell::sync::Lazy;
use regex::Regex;

use lexchunk_core::config::{PipelineConfig, ValidityWindows};
use lexchunk_core::types::{slugify, Chunk, QualityFlag, SourceMetadata};
use lexchunk_quality::content_hash;

use crate::record::{ChunkRecord, ValidityStatus};

static NUMBER_YEAR: Lazy<Regex> = Lazy::new(|| Regex::new(r"/((?:19|20)\d{2})/").expect("number year pattern"));
static TEXT_YEAR: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b((?:19|20)\d{2})\b").expect("text year pattern"));

/// Normalizes a chunk plus its source metadata into a [`ChunkRecord`].
/// Pure apart from the clock read in [`MetadataMapper::map`].
#[derive(Debug, Clone)]
pub struct MetadataMapper {
    validity: ValidityWindows,
    embedding_model: String,
    token_limit: usize,
}

impl MetadataMapper {
    pub fn new(validity: ValidityWindows, embedding_model: impl Into<String>, token_limit: usize) -> Self {
        Self { validity, embedding_model: embedding_model.into(), token_limit: token_limit.max(1) }
    }

    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::new(config.metadata.validity_years.clone(), &config.tokenizer.model_name, config.tokenizer.token_limit)
    }

    pub fn map(&self, chunk: &Chunk, meta: &SourceMetadata, index: usize, total: usize) -> ChunkRecord {
        self.map_at(chunk, meta, index, total, Utc::now())
    }

    /// [`map`](Self::map) with an explicit clock.
    pub fn map_at(&self, chunk: &Chunk, meta: &SourceMetadata, index: usize, total: usize, now: DateTime<Utc>) -> ChunkRecord {
        let issue_year = issue_year(meta);
        let window = self.validity.years(meta.document_type) as i32;
        let (status, valid_until) = match issue_year {
            Some(year) => {
                let last = year + window;
                let status = if last >= now.year() { ValidityStatus::Active } else { ValidityStatus::Expired };
                (status, Some(format!("{last}-12-31")))
            }
            None => (ValidityStatus::Unknown, None),
        };

        ChunkRecord {
            chunk_id: format!("{}:{}", record_stem(meta), index),
            document_id: meta.document_id.clone(),
            source_file: meta.source_file.clone(),
            document_type: meta.document_type,
            document_number: meta.document_number.clone(),
            title: meta.title.clone(),
            issuing_agency: meta.issuing_agency.clone(),
            content: chunk.text.clone(),
            content_hash: content_hash(&chunk.text),
            char_count: chunk.char_count,
            token_count: chunk.token_count,
            token_ratio: chunk.token_count as f64 / self.token_limit as f64,
            chunk_index: index,
            total_chunks: total,
            hierarchy: hierarchy_string(chunk, meta),
            hierarchy_path: chunk.hierarchy_path.clone(),
            level: chunk.level,
            parent_id: chunk.parent_id.clone(),
            issue_year,
            status,
            valid_until,
            quality_flags: chunk.quality_flags.clone(),
            embedding_ready: !chunk.text.trim().is_empty() && !chunk.has_flag(QualityFlag::ExceedsTokenLimit),
            embedding_model: self.embedding_model.clone(),
            created_at: now,
        }
    }
}

/// Issue date, then the year segment of the official number, then any
/// four-digit year in the title.
pub fn issue_year(meta: &SourceMetadata) -> Option<i32> {
    if let Some(date) = meta.issue_date {
        return Some(date.year());
    }
    let from = |re: &Regex, s: &str| -> Option<i32> { re.captures(s).and_then(|c| c[1].parse().ok()) };
    meta.document_number
        .as_deref()
        .and_then(|n| from(&NUMBER_YEAR, n))
        .or_else(|| meta.title.as_deref().and_then(|t| from(&TEXT_YEAR, t)))
}

/// `THÔNG TƯ 15/2023/TT-BTC > Chương I > Điều 5`
fn hierarchy_string(chunk: &Chunk, meta: &SourceMetadata) -> String {
    let mut head = meta.document_type.label().to_string();
    if let Some(number) = meta.document_number.as_deref().filter(|n| !n.is_empty()) {
        head.push(' ');
        head.push_str(number);
    }
    std::iter::once(head).chain(chunk.hierarchy_path.iter().map(ToString::to_string)).collect::<Vec<_>>().join(" > ")
}

/// Slug of the source file stem, or the document id when no file is known.
fn record_stem(meta: &SourceMetadata) -> String {
    let name = meta.source_file.rsplit(['/', '\\']).next().unwrap_or_default();
    let stem = name.rsplit_once('.').map_or(name, |(stem, _)| stem);
    if stem.trim().is_empty() {
        meta.document_id.clone()
    } else {
        slugify(stem)
    }
}
