use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;
use std::io::Write;

use lexchunk_core::error::{Error, Result};
use lexchunk_core::types::{ChunkLevel, DocType, PathEntry, QualityFlag};

/// Keys every persisted record must carry.
pub const REQUIRED_FIELDS: [&str; 25] = [
    "chunk_id",
    "document_id",
    "source_file",
    "document_type",
    "document_number",
    "title",
    "issuing_agency",
    "content",
    "content_hash",
    "char_count",
    "token_count",
    "token_ratio",
    "chunk_index",
    "total_chunks",
    "hierarchy",
    "hierarchy_path",
    "level",
    "parent_id",
    "issue_year",
    "status",
    "valid_until",
    "quality_flags",
    "embedding_ready",
    "embedding_model",
    "created_at",
];

/// Required keys that may not hold an empty string.
const NON_EMPTY_FIELDS: [&str; 9] = [
    "chunk_id",
    "document_id",
    "document_type",
    "content",
    "content_hash",
    "hierarchy",
    "status",
    "embedding_model",
    "created_at",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidityStatus {
    Active,
    Expired,
    Unknown,
}

impl ValidityStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ValidityStatus::Active => "active",
            ValidityStatus::Expired => "expired",
            ValidityStatus::Unknown => "unknown",
        }
    }
}

/// Flat record handed to the embedding and storage side. One per chunk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkRecord {
    pub chunk_id: String,
    pub document_id: String,
    pub source_file: String,
    pub document_type: DocType,
    pub document_number: Option<String>,
    pub title: Option<String>,
    pub issuing_agency: Option<String>,
    pub content: String,
    pub content_hash: String,
    pub char_count: usize,
    pub token_count: usize,
    /// `token_count / token_limit`
    pub token_ratio: f64,
    pub chunk_index: usize,
    pub total_chunks: usize,
    /// `THÔNG TƯ 15/2023/TT-BTC > Chương I > Điều 5`
    pub hierarchy: String,
    pub hierarchy_path: Vec<PathEntry>,
    pub level: ChunkLevel,
    pub parent_id: Option<String>,
    pub issue_year: Option<i32>,
    pub status: ValidityStatus,
    /// `YYYY-12-31` of the last year in force.
    pub valid_until: Option<String>,
    pub quality_flags: BTreeSet<QualityFlag>,
    pub embedding_ready: bool,
    pub embedding_model: String,
    pub created_at: DateTime<Utc>,
}

impl ChunkRecord {
    pub fn has_flag(&self, flag: QualityFlag) -> bool {
        self.quality_flags.contains(&flag)
    }

    /// Serialize and run [`check_required_fields`] on the result.
    pub fn to_checked_value(&self) -> Result<Value> {
        let value = serde_json::to_value(self)?;
        check_required_fields(&value)?;
        Ok(value)
    }
}

/// Report every required key that is absent, and every non-nullable string
/// key that is empty. `null` is accepted for optional fields.
pub fn check_required_fields(value: &Value) -> Result<()> {
    let Some(object) = value.as_object() else {
        return Err(Error::MissingFields(REQUIRED_FIELDS.iter().map(|f| f.to_string()).collect()));
    };
    let mut missing: Vec<String> = REQUIRED_FIELDS
        .iter()
        .filter(|field| !object.contains_key(**field))
        .map(|field| field.to_string())
        .collect();
    for field in NON_EMPTY_FIELDS {
        match object.get(field) {
            Some(Value::String(s)) if s.trim().is_empty() => missing.push(field.to_string()),
            Some(Value::Null) => missing.push(field.to_string()),
            _ => {}
        }
    }
    if missing.is_empty() {
        Ok(())
    } else {
        Err(Error::MissingFields(missing))
    }
}

/// One JSON object per line, UTF-8. Returns the number of lines written.
pub fn write_jsonl<'r, W: Write>(records: impl IntoIterator<Item = &'r ChunkRecord>, mut writer: W) -> Result<usize> {
    let mut written = 0;
    for record in records {
        serde_json::to_writer(&mut writer, record)?;
        writer.write_all(b"\n")?;
        written += 1;
    }
    writer.flush()?;
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn twenty_five_distinct_fields() {
        let unique: BTreeSet<_> = REQUIRED_FIELDS.iter().collect();
        assert_eq!(unique.len(), 25);
        assert!(NON_EMPTY_FIELDS.iter().all(|f| REQUIRED_FIELDS.contains(f)));
    }

    #[test]
    fn missing_and_empty_fields_are_listed() {
        let mut object = serde_json::Map::new();
        for field in REQUIRED_FIELDS {
            object.insert(field.to_string(), json!("x"));
        }
        assert!(check_required_fields(&Value::Object(object.clone())).is_ok());

        object.remove("status");
        object.insert("content".into(), json!("   "));
        object.insert("title".into(), Value::Null);
        match check_required_fields(&Value::Object(object)) {
            Err(Error::MissingFields(fields)) => assert_eq!(fields, vec!["status".to_string(), "content".to_string()]),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn non_object_is_all_missing() {
        match check_required_fields(&json!([1, 2])) {
            Err(Error::MissingFields(fields)) => assert_eq!(fields.len(), 25),
            other => panic!("unexpected {other:?}"),
        }
    }
}
