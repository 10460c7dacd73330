//! lexchunk-tokenize
//!
//! Token counting keyed by embedding-model name, and the token budget checker
//! the chunker uses to keep chunks inside the model's input window.
//!
//! Known HuggingFace models load their `tokenizer.json` from (in order) the
//! configured `tokenizer_dir`, `LEXCHUNK_MODEL_DIR/<model>`, `models/<model>`
//! and `../models/<model>`. Anything that cannot be resolved falls back to the
//! heuristic counter with a warning.

pub mod budget;
pub mod heuristic;
pub mod hf;

pub use budget::{TokenBudget, TokenBudgetChecker};
pub use heuristic::HeuristicTokenizer;
pub use hf::HfTokenCounter;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

use lexchunk_core::config::{expand_path, TokenizerConfig};
use lexchunk_core::error::{Error, Result};
use lexchunk_core::traits::TokenCounter;

/// How a model's tokens are counted.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TokenizerKind {
    HuggingFace,
    Heuristic { words_per_token: f64 },
}

/// Registry lookup by model name. Organisation prefixes (`BAAI/`) are ignored.
pub fn lookup(model_name: &str) -> Option<TokenizerKind> {
    let short = short_name(model_name);
    if short == "bge-m3"
        || short.starts_with("multilingual-e5")
        || short == "vietnamese-bi-encoder"
        || short.starts_with("sup-simcse-vietnamese")
    {
        Some(TokenizerKind::HuggingFace)
    } else if short.starts_with("text-embedding-") {
        // cl100k-style vocabularies split Vietnamese syllables roughly in two.
        Some(TokenizerKind::Heuristic { words_per_token: 0.5 })
    } else {
        None
    }
}

fn short_name(model_name: &str) -> String {
    model_name.trim().rsplit('/').next().unwrap_or_default().to_lowercase()
}

/// Build the counter for `model_name`. Never fails: unknown models and
/// missing tokenizer files degrade to [`HeuristicTokenizer`] with a warning.
pub fn tokenizer_for_model(model_name: &str, tokenizer_dir: Option<&Path>) -> Arc<dyn TokenCounter> {
    match lookup(model_name) {
        Some(TokenizerKind::HuggingFace) => {
            let loaded = resolve_tokenizer_file(&short_name(model_name), tokenizer_dir)
                .and_then(|path| HfTokenCounter::from_file(&path, model_name));
            match loaded {
                Ok(counter) => {
                    info!(model = model_name, tokenizer = counter.name(), "loaded model tokenizer");
                    Arc::new(counter)
                }
                Err(e) => {
                    warn!(model = model_name, error = %e, "tokenizer unavailable, falling back to heuristic");
                    Arc::new(HeuristicTokenizer::default())
                }
            }
        }
        Some(TokenizerKind::Heuristic { words_per_token }) => Arc::new(HeuristicTokenizer::new(words_per_token)),
        None => {
            warn!(model = model_name, "unrecognized embedding model, falling back to heuristic tokenizer");
            Arc::new(HeuristicTokenizer::default())
        }
    }
}

pub fn tokenizer_from_config(config: &TokenizerConfig) -> Arc<dyn TokenCounter> {
    let dir = config.tokenizer_dir.as_deref().map(expand_path);
    tokenizer_for_model(&config.model_name, dir.as_deref())
}

fn resolve_tokenizer_file(model: &str, explicit_dir: Option<&Path>) -> Result<PathBuf> {
    let mut candidates = Vec::new();
    if let Some(dir) = explicit_dir {
        candidates.push(dir.to_path_buf());
        candidates.push(dir.join(model));
    }
    if let Ok(dir) = std::env::var("LEXCHUNK_MODEL_DIR") {
        candidates.push(expand_path(dir).join(model));
    }
    candidates.push(Path::new("models").join(model));
    candidates.push(Path::new("../models").join(model));
    for dir in candidates {
        let file = dir.join("tokenizer.json");
        if file.is_file() {
            return Ok(file);
        }
    }
    Err(Error::Tokenizer(format!("Could not locate tokenizer.json for {}", model)))
}
