//! lexchunk-chunker
//!
//! Hierarchy-aware chunking of parsed legal documents. See [`HybridChunker`].

mod boundary;
pub mod flags;
mod hybrid;
mod units;

pub use flags::{has_legal_terms, is_potentially_incomplete, quality_flags, VERY_LONG_CHARS, VERY_SHORT_CHARS};
pub use hybrid::HybridChunker;
