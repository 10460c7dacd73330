use std::fs;

use lexchunk_core::config::TokenizerConfig;
use lexchunk_tokenize::{tokenizer_for_model, TokenBudgetChecker};

// Minimal word-level vocabulary; every unknown word maps to [UNK].
const WORD_LEVEL_TOKENIZER: &str = r#"{
  "version": "1.0",
  "truncation": null,
  "padding": null,
  "added_tokens": [],
  "normalizer": null,
  "pre_tokenizer": { "type": "Whitespace" },
  "post_processor": null,
  "decoder": null,
  "model": { "type": "WordLevel", "vocab": { "[UNK]": 0, "điều": 1 }, "unk_token": "[UNK]" }
}"#;

#[test]
fn hf_tokenizer_loaded_from_configured_dir() {
    let tmp = tempfile::TempDir::new().unwrap();
    let model_dir = tmp.path().join("bge-m3");
    fs::create_dir_all(&model_dir).unwrap();
    fs::write(model_dir.join("tokenizer.json"), WORD_LEVEL_TOKENIZER).unwrap();

    let counter = tokenizer_for_model("BAAI/bge-m3", Some(tmp.path()));
    assert_eq!(counter.name(), "hf:BAAI/bge-m3");
    // "Điều", "1", ".", "Phạm", "vi"
    assert_eq!(counter.count_tokens("Điều 1. Phạm vi"), 5);

    // Deterministic for the same input
    assert_eq!(counter.count_tokens("Điều 1. Phạm vi"), counter.count_tokens("Điều 1. Phạm vi"));
}

#[test]
fn checker_from_config_uses_heuristic_for_api_models() {
    let config = TokenizerConfig { model_name: "text-embedding-3-large".into(), token_limit: 10, tokenizer_dir: None };
    let checker = TokenBudgetChecker::from_config(&config);
    assert_eq!(checker.counter_name(), "heuristic:0.50");
    let budget = checker.check("một hai ba bốn năm sáu");
    assert_eq!(budget.token_count, 12);
    assert!(!budget.within_limit);
    assert!((budget.ratio - 1.2).abs() < 1e-9);
}
