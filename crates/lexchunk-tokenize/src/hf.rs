use std::path::Path;
use tokenizers::Tokenizer;
use tracing::warn;

use lexchunk_core::error::{Error, Result};
use lexchunk_core::traits::TokenCounter;

use crate::heuristic::HeuristicTokenizer;

/// Token counter backed by a HuggingFace `tokenizer.json`.
pub struct HfTokenCounter {
    tokenizer: Tokenizer,
    name: String,
    fallback: HeuristicTokenizer,
}

impl HfTokenCounter {
    pub fn from_file(path: &Path, model_name: &str) -> Result<Self> {
        let mut tokenizer = Tokenizer::from_file(path)
            .map_err(|e| Error::Tokenizer(format!("Failed to load tokenizer from {}: {}", path.display(), e)))?;
        // Count the full text; the model-side truncation must not hide overflow.
        tokenizer
            .with_truncation(None)
            .map_err(|e| Error::Tokenizer(format!("Failed to disable truncation: {}", e)))?;
        tokenizer.with_padding(None);
        Ok(Self { tokenizer, name: format!("hf:{}", model_name), fallback: HeuristicTokenizer::default() })
    }
}

impl TokenCounter for HfTokenCounter {
    fn name(&self) -> &str { &self.name }

    fn count_tokens(&self, text: &str) -> usize {
        match self.tokenizer.encode(text, true) {
            Ok(enc) => enc.len(),
            Err(e) => {
                warn!(tokenizer = %self.name, error = %e, "tokenization failed, using heuristic estimate");
                self.fallback.count_tokens(text)
            }
        }
    }
}
