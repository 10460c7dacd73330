//! lexchunk-pipeline
//!
//! Ties the stages together: structure parsing, hybrid chunking, quality
//! gates, deduplication and the [`MetadataMapper`] that turns chunks into the
//! flat [`ChunkRecord`] contract written out as JSON lines.

pub mod mapper;
pub mod pipeline;
pub mod record;

pub use mapper::{issue_year, MetadataMapper};
pub use pipeline::{BatchOutcome, DocumentOutcome, Pipeline};
pub use record::{check_required_fields, write_jsonl, ChunkRecord, ValidityStatus, REQUIRED_FIELDS};
