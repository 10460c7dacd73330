//! Line classifier for legal headings.
//!
//! Each document type gets an ordered `(kind, pattern)` table; the first
//! pattern that matches a trimmed line wins. Keywords are case-insensitive,
//! numbering classes are not (so `Điều 5 của Luật` stays content).

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use unicode_normalization::{is_nfc, UnicodeNormalization};

use lexchunk_core::types::{DocType, HierarchyKind};

/// A recognised heading line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Heading {
    pub kind: HierarchyKind,
    pub number: String,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineClass {
    Heading(Heading),
    Content,
}

struct Pattern {
    kind: HierarchyKind,
    regex: Regex,
    only_for: Option<DocType>,
}

// Title alternatives: punctuation then anything, or an uppercase word.
const TITLE: &str = r"(?:\s*[.:\-–]\s*(.*)|\s+(\p{Lu}.*))?\s*$";

static PATTERNS: Lazy<Vec<Pattern>> = Lazy::new(|| {
    use HierarchyKind::*;
    let table: [(HierarchyKind, String, Option<DocType>); 9] = [
        (Part, format!(r"^(?i:phần)\s+((?i:thứ)\s+\p{{L}}+|[IVXLCDM]+|\d+)\b{TITLE}"), None),
        (Chapter, format!(r"^(?i:chương)\s+([IVXLCDM]+|\d+)\b{TITLE}"), None),
        (Section, format!(r"^(?i:mục)\s+(\d+|[IVXLCDM]+)\b{TITLE}"), None),
        (Article, format!(r"^(?i:điều)\s+(\d+[a-zđ]?)\b{TITLE}"), None),
        (Article, r"^(?i:quy định|hướng dẫn)\s+(\d+)\s*[.:\-–](?:\s*(.*))?()$".to_string(), Some(DocType::Circular)),
        (Article, format!(r"^(?i:mẫu\s+số)\s+(\d+[A-Za-z]?)\b{TITLE}"), Some(DocType::BiddingForm)),
        (Clause, r"^(?:(?i:khoản)\s+)?(\d{1,3})\s*[.)](?:\s+(.*))?()$".to_string(), None),
        (Point, r"^([a-zđ])\s*\)(?:\s+(.*))?()$".to_string(), None),
        (Point, r"^(?i:điểm)\s+([a-zđ])(?:\s*[.:)]\s*(.*))?()$".to_string(), None),
    ];
    table
        .into_iter()
        .map(|(kind, pattern, only_for)| Pattern {
            kind,
            regex: Regex::new(&pattern).expect("heading patterns are valid"),
            only_for,
        })
        .collect()
});

/// Stateless heading detector bound to one document type.
pub struct StructureDetector {
    doc_type: DocType,
    table: Vec<&'static Pattern>,
}

impl StructureDetector {
    pub fn new(doc_type: DocType) -> Self {
        let table = PATTERNS
            .iter()
            .filter(|p| doc_type.allows(p.kind) && p.only_for.map_or(true, |d| d == doc_type))
            .collect();
        Self { doc_type, table }
    }

    pub fn doc_type(&self) -> DocType { self.doc_type }

    /// Match a line against the table. `None` means plain content.
    pub fn detect(&self, line: &str) -> Option<Heading> {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return None;
        }
        let normalized;
        let line = if is_nfc(trimmed) {
            trimmed
        } else {
            normalized = trimmed.nfc().collect::<String>();
            normalized.as_str()
        };
        self.table.iter().find_map(|p| {
            let caps = p.regex.captures(line)?;
            let title = caps.get(2).or_else(|| caps.get(3)).map_or("", |m| m.as_str()).trim();
            Some(Heading { kind: p.kind, number: caps[1].split_whitespace().collect::<Vec<_>>().join(" "), title: title.to_string() })
        })
    }

    pub fn classify(&self, line: &str) -> LineClass {
        match self.detect(line) {
            Some(h) => LineClass::Heading(h),
            None => LineClass::Content,
        }
    }
}

/// One-shot convenience over [`StructureDetector::detect`].
pub fn detect(line: &str, doc_type: DocType) -> Option<Heading> {
    StructureDetector::new(doc_type).detect(line)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kind_of(line: &str, doc_type: DocType) -> Option<(HierarchyKind, String, String)> {
        detect(line, doc_type).map(|h| (h.kind, h.number, h.title))
    }

    #[test]
    fn recognises_each_level_for_laws() {
        use HierarchyKind::*;
        let t = DocType::Law;
        assert_eq!(kind_of("Phần thứ nhất. Những quy định chung", t), Some((Part, "thứ nhất".into(), "Những quy định chung".into())));
        assert_eq!(kind_of("PHẦN II", t), Some((Part, "II".into(), "".into())));
        assert_eq!(kind_of("Chương I", t), Some((Chapter, "I".into(), "".into())));
        assert_eq!(kind_of("CHƯƠNG II QUY ĐỊNH CHUNG", t), Some((Chapter, "II".into(), "QUY ĐỊNH CHUNG".into())));
        assert_eq!(kind_of("Mục 2. Lựa chọn nhà thầu", t), Some((Section, "2".into(), "Lựa chọn nhà thầu".into())));
        assert_eq!(kind_of("Điều 15. Phạm vi điều chỉnh", t), Some((Article, "15".into(), "Phạm vi điều chỉnh".into())));
        assert_eq!(kind_of("ĐIỀU 3: Giải thích từ ngữ", t), Some((Article, "3".into(), "Giải thích từ ngữ".into())));
        assert_eq!(kind_of("1. Nội dung một.", t), Some((Clause, "1".into(), "Nội dung một.".into())));
        assert_eq!(kind_of("a) Điểm a.", t), Some((Point, "a".into(), "Điểm a.".into())));
        assert_eq!(kind_of("đ) Trường hợp khác", t), Some((Point, "đ".into(), "Trường hợp khác".into())));
    }

    #[test]
    fn prose_is_content() {
        let t = DocType::Law;
        assert_eq!(detect("Điều 5 của Luật này được sửa đổi", t), None);
        assert_eq!(detect("Mục tiêu của chính sách", t), None);
        assert_eq!(detect("Mục lục", t), None);
        assert_eq!(detect("Chương trình mục tiêu quốc gia", t), None);
        assert_eq!(detect("1.2 Số liệu", t), None);
        assert_eq!(detect("2023. Năm tài chính", t), None);
        assert_eq!(detect("   ", t), None);
    }

    #[test]
    fn decree_table_omits_part_and_section() {
        assert_eq!(detect("Phần I", DocType::Decree), None);
        assert_eq!(detect("Mục 1. Quy định chung", DocType::Decree), None);
        assert!(detect("Chương I", DocType::Decree).is_some());
    }

    #[test]
    fn circular_recognises_pseudo_articles() {
        let h = detect("Hướng dẫn 2. Thủ tục hồ sơ", DocType::Circular).expect("pseudo article");
        assert_eq!(h.kind, HierarchyKind::Article);
        assert_eq!(h.number, "2");
        assert_eq!(detect("Hướng dẫn 2. Thủ tục hồ sơ", DocType::Decree), None);
    }

    #[test]
    fn bidding_forms_are_articles() {
        let h = detect("Mẫu số 01 ĐƠN DỰ THẦU", DocType::BiddingForm).expect("form");
        assert_eq!((h.kind, h.number.as_str(), h.title.as_str()), (HierarchyKind::Article, "01", "ĐƠN DỰ THẦU"));
    }

    #[test]
    fn decomposed_input_is_normalised() {
        let nfd: String = "Điều 7. Hiệu lực".nfd().collect();
        assert_eq!(detect(&nfd, DocType::Decree).map(|h| h.number), Some("7".into()));
    }

    #[test]
    fn classify_wraps_detect() {
        let d = StructureDetector::new(DocType::Decision);
        assert_eq!(d.classify("Nội dung thường"), LineClass::Content);
        assert!(matches!(d.classify("Điều 1. Ban hành"), LineClass::Heading(_)));
        assert_eq!(d.doc_type(), DocType::Decision);
    }
}
