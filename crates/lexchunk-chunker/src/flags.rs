use std::collections::BTreeSet;

use lexchunk_core::types::{Chunk, QualityFlag};

pub const VERY_SHORT_CHARS: usize = 50;
pub const VERY_LONG_CHARS: usize = 5000;

const ELLIPSES: [&str; 2] = ["...", "…"];
const CLOSERS: [char; 10] = ['.', '!', '?', ':', ';', ')', ']', '"', '”', '»'];

/// Ends in an ellipsis, or in anything other than closing punctuation.
pub fn is_potentially_incomplete(text: &str) -> bool {
    let text = text.trim_end();
    if ELLIPSES.iter().any(|e| text.ends_with(e)) {
        return true;
    }
    !text.chars().next_back().is_some_and(|c| CLOSERS.contains(&c))
}

/// Case-insensitive keyword probe. `terms` must already be lowercase.
pub fn has_legal_terms(text: &str, terms: &[String]) -> bool {
    let lower = text.to_lowercase();
    terms.iter().any(|t| lower.contains(t.as_str()))
}

/// Advisory flags for a finished chunk.
pub fn quality_flags(chunk: &Chunk, max_chunk_size: usize, token_limit: usize, terms: &[String]) -> BTreeSet<QualityFlag> {
    let mut flags = BTreeSet::new();
    if chunk.char_count < VERY_SHORT_CHARS {
        flags.insert(QualityFlag::VeryShort);
    }
    if chunk.char_count > VERY_LONG_CHARS {
        flags.insert(QualityFlag::VeryLong);
    }
    if is_potentially_incomplete(&chunk.text) {
        flags.insert(QualityFlag::PotentiallyIncomplete);
    }
    if chunk.hierarchy_path.is_empty() {
        flags.insert(QualityFlag::NoHierarchy);
    }
    if !terms.is_empty() && !has_legal_terms(&chunk.text, terms) {
        flags.insert(QualityFlag::NoLegalTerms);
    }
    if chunk.char_count > max_chunk_size {
        flags.insert(QualityFlag::ExceedsMaxSize);
    }
    if chunk.token_count > token_limit {
        flags.insert(QualityFlag::ExceedsTokenLimit);
    }
    flags
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn incomplete_endings() {
        assert!(!is_potentially_incomplete("Điều này có hiệu lực."));
        assert!(!is_potentially_incomplete("các trường hợp sau:"));
        assert!(!is_potentially_incomplete("(đã sửa đổi)"));
        assert!(!is_potentially_incomplete("theo mẫu “A”"));
        assert!(is_potentially_incomplete("và các nội dung khác..."));
        assert!(is_potentially_incomplete("còn tiếp…"));
        assert!(is_potentially_incomplete("nhà thầu phải"));
        assert!(is_potentially_incomplete(""));
    }

    #[test]
    fn legal_terms_ignore_case() {
        let terms = vec!["quy định".to_string(), "điều".to_string()];
        assert!(has_legal_terms("THEO QUY ĐỊNH tại", &terms));
        assert!(has_legal_terms("Điều 5", &terms));
        assert!(!has_legal_terms("Bảng giá vật tư", &terms));
    }
}
