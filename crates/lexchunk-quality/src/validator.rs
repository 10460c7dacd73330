use regex::Regex;
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use tracing::debug;

use lexchunk_core::config::ValidatorConfig;
use lexchunk_core::error::{Error, Issue, Result};

const DEGENERATE_MIN_LENGTH: usize = 100;
const DEGENERATE_DISTINCT_CHARS: usize = 10;

/// A single failed check.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ValidationIssue {
    TooShort { length: usize, min: usize },
    TooLong { length: usize, max: usize },
    LowMeaningfulRatio { ratio: f64, min: f64 },
    ForbiddenPattern { pattern: String },
    DegenerateContent { distinct_chars: usize },
}

impl ValidationIssue {
    pub fn kind(&self) -> &'static str {
        match self {
            ValidationIssue::TooShort { .. } => "too_short",
            ValidationIssue::TooLong { .. } => "too_long",
            ValidationIssue::LowMeaningfulRatio { .. } => "low_meaningful_ratio",
            ValidationIssue::ForbiddenPattern { .. } => "forbidden_pattern",
            ValidationIssue::DegenerateContent { .. } => "degenerate_content",
        }
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationIssue::TooShort { length, min } => write!(f, "content too short: {length} < {min} chars"),
            ValidationIssue::TooLong { length, max } => write!(f, "content too long: {length} > {max} chars"),
            ValidationIssue::LowMeaningfulRatio { ratio, min } => {
                write!(f, "meaningful character ratio {ratio:.2} below {min:.2}")
            }
            ValidationIssue::ForbiddenPattern { pattern } => write!(f, "forbidden pattern matched: {pattern}"),
            ValidationIssue::DegenerateContent { distinct_chars } => {
                write!(f, "degenerate content: only {distinct_chars} distinct characters")
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationResult {
    pub is_valid: bool,
    pub issues: Vec<ValidationIssue>,
}

impl ValidationResult {
    fn from_issues(issues: Vec<ValidationIssue>) -> Self {
        Self { is_valid: issues.is_empty(), issues }
    }

    pub fn messages(&self) -> Vec<String> {
        self.issues.iter().map(ToString::to_string).collect()
    }

    pub fn to_issue(&self, target: impl Into<String>) -> Issue {
        Issue::ValidationFailure { target: target.into(), issues: self.messages() }
    }
}

/// Valid/invalid partition of a batch plus how often each check failed.
#[derive(Debug, Clone)]
pub struct BatchValidation<T> {
    pub valid: Vec<T>,
    pub invalid: Vec<(T, ValidationResult)>,
    pub issue_counts: BTreeMap<&'static str, usize>,
}

/// Quality gate for documents and chunks. The same type serves both; only
/// the configured thresholds differ.
#[derive(Debug, Clone)]
pub struct DocumentValidator {
    config: ValidatorConfig,
    forbidden: Vec<Regex>,
}

impl DocumentValidator {
    pub fn new(config: ValidatorConfig) -> Result<Self> {
        let forbidden = config
            .forbidden_patterns
            .iter()
            .map(|p| Regex::new(p).map_err(|e| Error::InvalidConfig(format!("forbidden pattern {p:?}: {e}"))))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { config, forbidden })
    }

    pub fn config(&self) -> &ValidatorConfig { &self.config }

    pub fn validate(&self, content: &str) -> ValidationResult {
        let mut issues = Vec::new();
        let length = content.chars().count();

        if length < self.config.min_length {
            issues.push(ValidationIssue::TooShort { length, min: self.config.min_length });
        }
        if length > self.config.max_length {
            issues.push(ValidationIssue::TooLong { length, max: self.config.max_length });
        }
        if length > 0 {
            let ratio = meaningful_ratio(content, length);
            if ratio < self.config.min_meaningful_ratio {
                issues.push(ValidationIssue::LowMeaningfulRatio { ratio, min: self.config.min_meaningful_ratio });
            }
        }
        for re in &self.forbidden {
            if re.is_match(content) {
                issues.push(ValidationIssue::ForbiddenPattern { pattern: re.as_str().to_string() });
            }
        }
        if length > DEGENERATE_MIN_LENGTH {
            let distinct_chars = content.chars().collect::<HashSet<_>>().len();
            if distinct_chars < DEGENERATE_DISTINCT_CHARS {
                issues.push(ValidationIssue::DegenerateContent { distinct_chars });
            }
        }
        ValidationResult::from_issues(issues)
    }

    pub fn is_valid(&self, content: &str) -> bool {
        self.validate(content).is_valid
    }

    pub fn validate_batch<T: AsRef<str>>(&self, items: Vec<T>) -> BatchValidation<T> {
        let mut valid = Vec::new();
        let mut invalid = Vec::new();
        let mut issue_counts = BTreeMap::new();
        for item in items {
            let result = self.validate(item.as_ref());
            if result.is_valid {
                valid.push(item);
            } else {
                for issue in &result.issues {
                    *issue_counts.entry(issue.kind()).or_insert(0) += 1;
                }
                invalid.push((item, result));
            }
        }
        debug!(valid = valid.len(), invalid = invalid.len(), "validated batch");
        BatchValidation { valid, invalid, issue_counts }
    }
}

/// Share of alphanumeric and whitespace characters.
fn meaningful_ratio(content: &str, length: usize) -> f64 {
    let meaningful = content.chars().filter(|c| c.is_alphanumeric() || c.is_whitespace()).count();
    meaningful as f64 / length as f64
}
