//! Configuration loader and typed pipeline settings.
//!
//! Uses Figment to merge built-in defaults + `lexchunk.toml` +
//! `lexchunk.<env>.toml` + `LEXCHUNK_*` env vars (nested keys split on `__`).
//! Provides helpers to expand `~` and `${VAR}` and to resolve relative paths
//! against a known base directory.

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::types::DocType;

pub struct Config {
    figment: Figment,
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        Self::load_from(Path::new("."))
    }

    /// Load configuration files from `dir` instead of the working directory.
    pub fn load_from(dir: &Path) -> anyhow::Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());

        let mut figment = Figment::from(Serialized::defaults(PipelineConfig::default()))
            .merge(Toml::file(dir.join("lexchunk.toml")));
        match env_name.as_str() {
            "dev" | "development" => figment = figment.merge(Toml::file(dir.join("lexchunk.dev.toml"))),
            "prod" | "production" => figment = figment.merge(Toml::file(dir.join("lexchunk.prod.toml"))),
            "test" | "testing" => figment = figment.merge(Toml::file(dir.join("lexchunk.test.toml"))),
            _ => {}
        }
        figment = figment.merge(Env::prefixed("LEXCHUNK_").split("__"));

        let config = Self { figment };
        config.validate_for_env(&env_name)?;
        Ok(config)
    }

    pub fn get<T>(&self, key: &str) -> anyhow::Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        self.figment
            .extract_inner(key)
            .map_err(|e| anyhow::anyhow!("Failed to get '{}': {}", key, e))
    }

    /// Typed settings for the whole pipeline, validated.
    pub fn pipeline(&self) -> anyhow::Result<PipelineConfig> {
        let config: PipelineConfig = self
            .figment
            .extract()
            .map_err(|e| anyhow::anyhow!("Failed to read pipeline config: {}", e))?;
        config.validate()?;
        Ok(config)
    }

    fn validate_for_env(&self, env: &str) -> anyhow::Result<()> {
        let config = self.pipeline()?;
        match env {
            "prod" | "production" => {
                if !config.dedup.enabled {
                    anyhow::bail!("Prod config must keep deduplication enabled");
                }
            }
            _ => {}
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    pub max_chunk_size: usize,
    pub min_chunk_size: usize,
    pub overlap_size: usize,
    /// Keywords whose absence flags a chunk `no_legal_terms`.
    pub legal_terms: Vec<String>,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            max_chunk_size: 2000,
            min_chunk_size: 300,
            overlap_size: 150,
            legal_terms: [
                "quy định", "điều", "khoản", "hướng dẫn", "thông tư", "nghị định", "luật",
                "quyết định", "đấu thầu", "hợp đồng", "trách nhiệm", "thẩm quyền",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenizerConfig {
    pub model_name: String,
    pub token_limit: usize,
    /// Directory holding `tokenizer.json` for HuggingFace models.
    pub tokenizer_dir: Option<String>,
}

impl Default for TokenizerConfig {
    fn default() -> Self {
        Self { model_name: "bge-m3".to_string(), token_limit: 6500, tokenizer_dir: None }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidatorConfig {
    pub min_length: usize,
    pub max_length: usize,
    pub min_meaningful_ratio: f64,
    pub forbidden_patterns: Vec<String>,
}

impl ValidatorConfig {
    /// Gate for whole raw documents.
    pub fn for_documents() -> Self {
        Self { min_length: 100, max_length: 5_000_000, ..Self::default() }
    }

    /// Gate for emitted chunks.
    pub fn for_chunks() -> Self {
        Self { min_length: 10, max_length: 50_000, ..Self::default() }
    }
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            min_length: 100,
            max_length: 5_000_000,
            min_meaningful_ratio: 0.6,
            forbidden_patterns: vec![
                r"(?i)lorem\s+ipsum".to_string(),
                r"(?i)\[\s*(placeholder|todo|insert[^\]]*)\s*\]".to_string(),
                r"(?i)\b(password|passwd|api[_-]?key|secret[_-]?key|access[_-]?token)\s*[:=]\s*\S+".to_string(),
                r"(?i)\btest\s+(document|content|data)\b".to_string(),
            ],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    pub document: ValidatorConfig,
    pub chunk: ValidatorConfig,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self { document: ValidatorConfig::for_documents(), chunk: ValidatorConfig::for_chunks() }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DedupConfig {
    pub enabled: bool,
    pub exact_only: bool,
    pub window_size: usize,
    pub similarity_threshold: f64,
}

impl Default for DedupConfig {
    fn default() -> Self {
        Self { enabled: true, exact_only: false, window_size: 100, similarity_threshold: 0.95 }
    }
}

/// Years a document of each type stays in force after its issue year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidityWindows {
    pub law: u32,
    pub decree: u32,
    pub circular: u32,
    pub decision: u32,
    pub bidding_form: u32,
    pub other: u32,
}

impl ValidityWindows {
    pub fn years(&self, doc_type: DocType) -> u32 {
        match doc_type {
            DocType::Law => self.law,
            DocType::Decree => self.decree,
            DocType::Circular => self.circular,
            DocType::Decision => self.decision,
            DocType::BiddingForm => self.bidding_form,
            DocType::Other => self.other,
        }
    }
}

impl Default for ValidityWindows {
    fn default() -> Self {
        Self { law: 10, decree: 5, circular: 3, decision: 3, bidding_form: 2, other: 5 }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetadataConfig {
    pub validity_years: ValidityWindows,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub chunking: ChunkingConfig,
    pub tokenizer: TokenizerConfig,
    pub validation: ValidationConfig,
    pub dedup: DedupConfig,
    pub metadata: MetadataConfig,
    /// Exclude chunks that fail validation instead of flagging them.
    pub drop_invalid_chunks: bool,
}

impl PipelineConfig {
    pub fn validate(&self) -> Result<()> {
        let c = &self.chunking;
        if c.min_chunk_size == 0 {
            return Err(Error::InvalidConfig("min_chunk_size must be > 0".into()));
        }
        if c.min_chunk_size >= c.max_chunk_size {
            return Err(Error::InvalidConfig(format!(
                "min_chunk_size ({}) must be below max_chunk_size ({})",
                c.min_chunk_size, c.max_chunk_size
            )));
        }
        if c.overlap_size * 2 >= c.max_chunk_size {
            return Err(Error::InvalidConfig(format!(
                "overlap_size ({}) must be under half of max_chunk_size ({})",
                c.overlap_size, c.max_chunk_size
            )));
        }
        if self.tokenizer.token_limit == 0 {
            return Err(Error::InvalidConfig("token_limit must be > 0".into()));
        }
        let d = &self.dedup;
        if d.window_size == 0 {
            return Err(Error::InvalidConfig("dedup.window_size must be > 0".into()));
        }
        if !(d.similarity_threshold > 0.0 && d.similarity_threshold <= 1.0) {
            return Err(Error::InvalidConfig(format!(
                "dedup.similarity_threshold must be in (0, 1], got {}",
                d.similarity_threshold
            )));
        }
        for v in [&self.validation.document, &self.validation.chunk] {
            if v.min_length > v.max_length {
                return Err(Error::InvalidConfig("validation min_length exceeds max_length".into()));
            }
        }
        Ok(())
    }
}

/// Expand a user-provided path string:
/// - Expands leading '~' to the user's home directory
/// - Expands ${VAR} and $VAR environment variables
/// - Returns a PathBuf without attempting to canonicalize
pub fn expand_path<S: AsRef<str>>(input: S) -> PathBuf {
    let s = input.as_ref();
    // Expand env vars first
    let expanded_env = shellexpand::env(s).unwrap_or(std::borrow::Cow::Borrowed(s));
    // Expand ~ at start
    let expanded = shellexpand::tilde(&expanded_env);
    PathBuf::from(expanded.as_ref())
}

/// Resolve a possibly relative path against a given base directory after expansion.
/// If `p` is absolute, it's returned as-is; otherwise `base.join(p)` is returned.
pub fn resolve_with_base<S: AsRef<str>>(base: &Path, p: S) -> PathBuf {
    let p = expand_path(p);
    if p.is_absolute() { p } else { base.join(p) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn defaults_are_valid() {
        let config = PipelineConfig::default();
        config.validate().expect("defaults validate");
        assert_eq!(config.chunking.overlap_size, 150);
        assert_eq!(config.tokenizer.token_limit, 6500);
        assert_eq!(config.metadata.validity_years.years(DocType::Circular), 3);
    }

    #[test]
    fn rejects_inverted_envelope() {
        let mut config = PipelineConfig::default();
        config.chunking.min_chunk_size = 2500;
        assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));

        let mut config = PipelineConfig::default();
        config.chunking.overlap_size = 1000;
        assert!(config.validate().is_err());

        let mut config = PipelineConfig::default();
        config.dedup.similarity_threshold = 1.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn toml_file_overrides_defaults() {
        let tmp = tempfile::TempDir::new().unwrap();
        fs::write(
            tmp.path().join("lexchunk.toml"),
            "[chunking]\nmax_chunk_size = 1800\n\n[tokenizer]\nmodel_name = \"text-embedding-3-small\"\n",
        )
        .unwrap();
        let config = Config::load_from(tmp.path()).expect("load");
        let pipeline = config.pipeline().expect("pipeline");
        assert_eq!(pipeline.chunking.max_chunk_size, 1800);
        assert_eq!(pipeline.chunking.min_chunk_size, 300, "untouched keys keep defaults");
        assert_eq!(pipeline.tokenizer.model_name, "text-embedding-3-small");
        let limit: usize = config.get("tokenizer.token_limit").unwrap();
        assert_eq!(limit, 6500);
    }

    #[test]
    fn invalid_file_values_fail_to_load() {
        let tmp = tempfile::TempDir::new().unwrap();
        fs::write(tmp.path().join("lexchunk.toml"), "[chunking]\nmin_chunk_size = 0\n").unwrap();
        assert!(Config::load_from(tmp.path()).is_err());
    }

    #[test]
    fn resolve_keeps_absolute_paths() {
        let base = Path::new("/srv/data");
        assert_eq!(resolve_with_base(base, "models"), PathBuf::from("/srv/data/models"));
        assert_eq!(resolve_with_base(base, "/opt/models"), PathBuf::from("/opt/models"));
    }
}
