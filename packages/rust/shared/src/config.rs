//! Application configuration for Mriynyk.
//!
//! User config lives at `~/.mriynyk/mriynyk.toml`.
//! CLI flags override config file values, which override defaults.
//! Secrets are never stored in the file: it only names the env vars to read.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{MriynykError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "mriynyk.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".mriynyk";

// ---------------------------------------------------------------------------
// Config structs (matching mriynyk.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Embedding / completion provider settings.
    #[serde(default)]
    pub provider: ProviderConfig,

    /// Corpus store settings.
    #[serde(default)]
    pub corpus: CorpusConfig,

    /// Pipeline behaviour.
    #[serde(default)]
    pub pipeline: PipelineConfig,
}

/// `[provider]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Base URL of the OpenAI-compatible API (without `/embeddings`).
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Env vars checked in order for the API key.
    #[serde(default = "default_api_key_envs")]
    pub api_key_envs: Vec<String>,

    /// Model used for query/explanation embeddings.
    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,

    /// Model used for free-form chat (explanations, disambiguation, solving).
    #[serde(default = "default_chat_model")]
    pub chat_model: String,

    /// Model used for schema-constrained workbook generation.
    #[serde(default = "default_workbook_model")]
    pub workbook_model: String,

    /// Token cap for short free-form answers.
    #[serde(default = "default_explain_max_tokens")]
    pub explain_max_tokens: u32,

    /// Sampling temperature for free-form answers.
    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key_envs: default_api_key_envs(),
            embedding_model: default_embedding_model(),
            chat_model: default_chat_model(),
            workbook_model: default_workbook_model(),
            explain_max_tokens: default_explain_max_tokens(),
            temperature: default_temperature(),
        }
    }
}

fn default_base_url() -> String {
    "https://api.openai.com/v1".into()
}
fn default_api_key_envs() -> Vec<String> {
    vec!["LAPATHON_API_KEY".into(), "OPENAI_API_KEY".into()]
}
fn default_embedding_model() -> String {
    "text-embedding-qwen".into()
}
fn default_chat_model() -> String {
    "lapa".into()
}
fn default_workbook_model() -> String {
    "gpt-5.2".into()
}
fn default_explain_max_tokens() -> u32 {
    100
}
fn default_temperature() -> f32 {
    0.7
}

/// `[corpus]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorpusConfig {
    /// Explicit database path. Takes precedence over the env vars.
    #[serde(default)]
    pub database_path: Option<String>,

    /// Env vars checked in order for the database path.
    #[serde(default = "default_database_path_envs")]
    pub database_path_envs: Vec<String>,

    /// Width of the `embedding` vector column.
    #[serde(default = "default_embedding_dimensions")]
    pub embedding_dimensions: usize,
}

impl Default for CorpusConfig {
    fn default() -> Self {
        Self {
            database_path: None,
            database_path_envs: default_database_path_envs(),
            embedding_dimensions: default_embedding_dimensions(),
        }
    }
}

fn default_database_path_envs() -> Vec<String> {
    vec!["MRIYNYK_DB".into(), "DATABASE_URL".into()]
}
fn default_embedding_dimensions() -> usize {
    1024
}

/// How a free-text query is resolved to a corpus topic.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResolveStrategy {
    /// Explain the query, embed the explanation, take the nearest topic.
    #[default]
    EmbeddingFirst,
    /// List the topics for the filter and let the model pick one.
    EnumerateThenDisambiguate,
}

impl ResolveStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::EmbeddingFirst => "embedding-first",
            Self::EnumerateThenDisambiguate => "enumerate-then-disambiguate",
        }
    }
}

impl std::str::FromStr for ResolveStrategy {
    type Err = MriynykError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "embedding-first" => Ok(Self::EmbeddingFirst),
            "enumerate-then-disambiguate" | "disambiguate" => Ok(Self::EnumerateThenDisambiguate),
            other => Err(MriynykError::config(format!(
                "unknown strategy '{other}': expected 'embedding-first' or 'enumerate-then-disambiguate'"
            ))),
        }
    }
}

/// `[pipeline]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Topic resolution strategy.
    #[serde(default)]
    pub strategy: ResolveStrategy,

    /// Upper bound for each external call, in seconds.
    #[serde(default = "default_stage_timeout")]
    pub stage_timeout_secs: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            strategy: ResolveStrategy::default(),
            stage_timeout_secs: default_stage_timeout(),
        }
    }
}

impl PipelineConfig {
    pub fn stage_timeout(&self) -> Duration {
        Duration::from_secs(self.stage_timeout_secs)
    }
}

fn default_stage_timeout() -> u64 {
    120
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.mriynyk/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| MriynykError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.mriynyk/mriynyk.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| MriynykError::io(path, e))?;

    let config: AppConfig = toml::from_str(&content).map_err(|e| {
        MriynykError::config(format!("failed to parse {}: {e}", path.display()))
    })?;
    validate_config(&config)?;
    Ok(config)
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| MriynykError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| MriynykError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| MriynykError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

/// Reject values that would only fail later, deep inside a request.
pub fn validate_config(config: &AppConfig) -> Result<()> {
    Url::parse(&config.provider.base_url).map_err(|e| {
        MriynykError::config(format!(
            "invalid provider base_url '{}': {e}",
            config.provider.base_url
        ))
    })?;
    if config.corpus.embedding_dimensions == 0 {
        return Err(MriynykError::config("embedding_dimensions must be positive"));
    }
    if config.pipeline.stage_timeout_secs == 0 {
        return Err(MriynykError::config("stage_timeout_secs must be positive"));
    }
    Ok(())
}

/// Resolve the provider API key from the configured env vars (first non-empty wins).
pub fn resolve_api_key(config: &AppConfig) -> Result<String> {
    first_env_value(&config.provider.api_key_envs).ok_or_else(|| {
        MriynykError::config(format!(
            "API key not found. Set one of: {}",
            config.provider.api_key_envs.join(", ")
        ))
    })
}

/// Resolve the corpus database path: explicit override, then config, then env vars.
pub fn resolve_database_path(config: &AppConfig, override_path: Option<&str>) -> Result<PathBuf> {
    if let Some(path) = override_path.filter(|p| !p.is_empty()) {
        return Ok(PathBuf::from(path));
    }
    if let Some(path) = config.corpus.database_path.as_deref().filter(|p| !p.is_empty()) {
        return Ok(PathBuf::from(path));
    }
    first_env_value(&config.corpus.database_path_envs)
        .map(PathBuf::from)
        .ok_or_else(|| {
            MriynykError::config(format!(
                "database path missing. Set corpus.database_path or one of: {}",
                config.corpus.database_path_envs.join(", ")
            ))
        })
}

fn first_env_value(names: &[String]) -> Option<String> {
    names
        .iter()
        .filter_map(|name| std::env::var(name).ok())
        .find(|value| !value.is_empty())
}
