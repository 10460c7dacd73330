/// Counts model-specific tokens for a span of text.
///
/// Implementations are keyed by embedding-model name (see
/// `lexchunk-tokenize`); the chunker only ever talks to this trait.
pub trait TokenCounter: Send + Sync {
    /// Stable identifier of the tokenizer (e.g. `hf:bge-m3`, `heuristic:1.33`).
    fn name(&self) -> &str;
    /// Number of tokens `text` occupies in the model's input window.
    fn count_tokens(&self, text: &str) -> usize;
}
