use lexchunk_core::config::{DedupConfig, ValidatorConfig};
use lexchunk_core::error::Issue;
use lexchunk_core::types::{DocType, DocumentInput, SourceMetadata};
use lexchunk_quality::{content_hash, DocumentValidator, Deduplicator, DuplicateKind};
use proptest::prelude::*;

const BODY: &str = "Điều 1. Phạm vi điều chỉnh\nNghị định này quy định chi tiết một số điều của Luật Đấu thầu về lựa chọn nhà thầu.";

fn document(file: &str, text: &str) -> DocumentInput {
    DocumentInput::new(text, SourceMetadata::new(file, DocType::Decree))
}

#[test]
fn trailing_whitespace_copy_is_exact_duplicate() {
    let docs = vec![
        document("data/nd-24-2024.txt", BODY),
        document("data/nd-24-2024-copy.txt", &format!("{BODY}  \n\n")),
        document("data/nd-25-2024.txt", "Điều 1. Đối tượng áp dụng\nNghị định này áp dụng với cơ quan nhà nước."),
    ];
    let mut dedup = Deduplicator::new(DedupConfig::default());
    let outcome = dedup.deduplicate(docs);

    assert_eq!(outcome.kept.len(), 2);
    assert_eq!(outcome.duplicates.len(), 1);
    let (dup, found) = &outcome.duplicates[0];
    assert_eq!(dup.metadata.document_id, "nd-24-2024-copy");
    assert_eq!(found.kind, DuplicateKind::Exact);
    assert_eq!(found.of, "nd-24-2024");
    assert_eq!(found.similarity, 1.0);

    match found.to_issue(dup.metadata.document_id.clone()) {
        Issue::DuplicateDetected { item, of, .. } => assert_eq!((item.as_str(), of.as_str()), ("nd-24-2024-copy", "nd-24-2024")),
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn disabled_dedup_keeps_everything() {
    let docs = vec![document("a.txt", BODY), document("b.txt", BODY)];
    let mut dedup = Deduplicator::new(DedupConfig { enabled: false, ..DedupConfig::default() });
    let outcome = dedup.deduplicate(docs);
    assert_eq!(outcome.kept.len(), 2);
    assert!(outcome.duplicates.is_empty());
    assert!(dedup.index().is_empty());
}

#[test]
fn document_and_chunk_thresholds_differ() {
    let docs = DocumentValidator::new(ValidatorConfig::for_documents()).unwrap();
    let chunks = DocumentValidator::new(ValidatorConfig::for_chunks()).unwrap();
    let short = "Điều 9. Hiệu lực thi hành ngay.";

    assert!(chunks.is_valid(short));
    let r = docs.validate(short);
    assert!(!r.is_valid);
    assert_eq!(r.issues[0].kind(), "too_short");
    assert!(docs.is_valid(&BODY.repeat(2)));
}

proptest! {
    #[test]
    fn exact_duplicates_share_a_hash(
        words in prop::collection::vec("[a-zđơư]{1,8}", 1..40),
        pad in "[ \t\n]{0,4}"
    ) {
        let text = words.join(" ");
        let noisy = format!("{pad}{}{pad}", text.to_uppercase());
        let mut dedup = Deduplicator::new(DedupConfig::default());
        dedup.add_document("orig", &text);
        let found = dedup.check(&noisy);
        prop_assert_eq!(found.as_ref().map(|m| m.kind), Some(DuplicateKind::Exact));
        prop_assert_eq!(content_hash(&text), content_hash(&noisy));
    }
}
