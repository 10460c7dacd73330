use lexchunk_core::traits::TokenCounter;

/// Word-count based estimate, `ceil(words / words_per_token)`. Used when no
/// model tokenizer is available and for API models without a local vocab.
#[derive(Debug, Clone)]
pub struct HeuristicTokenizer {
    words_per_token: f64,
    name: String,
}

impl HeuristicTokenizer {
    pub fn new(words_per_token: f64) -> Self {
        let words_per_token = if words_per_token.is_finite() && words_per_token > 0.0 { words_per_token } else { 0.75 };
        Self { words_per_token, name: format!("heuristic:{:.2}", words_per_token) }
    }

    pub fn words_per_token(&self) -> f64 { self.words_per_token }
}

impl Default for HeuristicTokenizer {
    fn default() -> Self { Self::new(0.75) }
}

impl TokenCounter for HeuristicTokenizer {
    fn name(&self) -> &str { &self.name }

    fn count_tokens(&self, text: &str) -> usize {
        let word_count = text.split_whitespace().count();
        (word_count as f64 / self.words_per_token).ceil() as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_ratio_is_three_quarter_words_per_token() {
        let t = HeuristicTokenizer::default();
        assert_eq!(t.count_tokens("một hai ba"), 4);
        assert_eq!(t.count_tokens("một"), 2);
        assert_eq!(t.count_tokens(""), 0);
        assert_eq!(t.count_tokens("   \n "), 0);
    }

    #[test]
    fn invalid_ratio_falls_back_to_default() {
        let t = HeuristicTokenizer::new(-2.0);
        assert_eq!(t.words_per_token(), 0.75);
        assert_eq!(HeuristicTokenizer::new(0.5).count_tokens("a b c"), 6);
        assert_eq!(t.name(), "heuristic:0.75");
    }
}
