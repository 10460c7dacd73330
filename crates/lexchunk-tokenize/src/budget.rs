use serde::Serialize;
use std::fmt;
use std::sync::Arc;

use lexchunk_core::config::TokenizerConfig;
use lexchunk_core::traits::TokenCounter;

use crate::tokenizer_from_config;

/// Outcome of checking a span against the embedding model's input limit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TokenBudget {
    pub token_count: usize,
    pub ratio: f64,
    pub within_limit: bool,
}

/// Compares token estimates against a configured limit. Counting itself is
/// delegated to the pluggable [`TokenCounter`].
#[derive(Clone)]
pub struct TokenBudgetChecker {
    counter: Arc<dyn TokenCounter>,
    token_limit: usize,
}

impl TokenBudgetChecker {
    pub fn new(counter: Arc<dyn TokenCounter>, token_limit: usize) -> Self {
        Self { counter, token_limit: token_limit.max(1) }
    }

    pub fn from_config(config: &TokenizerConfig) -> Self {
        Self::new(tokenizer_from_config(config), config.token_limit)
    }

    pub fn token_limit(&self) -> usize { self.token_limit }

    pub fn counter_name(&self) -> &str { self.counter.name() }

    pub fn count(&self, text: &str) -> usize { self.counter.count_tokens(text) }

    pub fn check(&self, text: &str) -> TokenBudget { self.budget_for(self.count(text)) }

    /// Ratio and threshold for an already-known token count.
    pub fn budget_for(&self, token_count: usize) -> TokenBudget {
        TokenBudget {
            token_count,
            ratio: token_count as f64 / self.token_limit as f64,
            within_limit: token_count <= self.token_limit,
        }
    }
}

impl fmt::Debug for TokenBudgetChecker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenBudgetChecker")
            .field("counter", &self.counter.name())
            .field("token_limit", &self.token_limit)
            .finish()
    }
}
