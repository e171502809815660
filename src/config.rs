//! Pipeline configuration.
//!
//! One explicit [`Config`] value is built at process start and handed to the
//! pipeline. Sources, lowest precedence first: built-in defaults, a TOML file,
//! then an environment map. The environment map is read, never written: a
//! `.env` file is merged in without exporting anything to the process.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Environment variable holding the Google AI Studio key.
pub const GOOGLE_API_KEY_VAR: &str = "GOOGLE_API_KEY";

const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const OLLAMA_BASE_URL: &str = "http://localhost:11434";

/// Complete configuration for the CLI, the daemon and the pipeline.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub chunking: ChunkingConfig,
    pub retrieval: RetrievalConfig,
    pub embedding: EmbeddingConfig,
    pub llm: LlmConfig,
    pub prompt: PromptConfig,
    pub recovery: RecoveryConfig,
    pub server: ServerConfig,
    /// Secrets come from the environment only and are never serialized.
    #[serde(skip)]
    pub credentials: Credentials,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Target chunk length in characters.
    pub chunk_size: usize,
    /// Characters shared between neighbouring chunks.
    pub chunk_overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 50,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    pub top_k: usize,
    /// Synthetic query used both for retrieval and as the user instruction.
    pub query: String,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: 20,
            query: "Create a dictionary datatype of important definitions and questions \
                    as a key and answer as value."
                .into(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingBackend {
    #[default]
    Gemini,
    Ollama,
    /// Deterministic local feature hashing; no network.
    Hashing,
}

impl EmbeddingBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Gemini => "gemini",
            Self::Ollama => "ollama",
            Self::Hashing => "hashing",
        }
    }
}

impl fmt::Display for EmbeddingBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EmbeddingBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "gemini" | "google" => Ok(Self::Gemini),
            "ollama" => Ok(Self::Ollama),
            "hashing" | "hash" => Ok(Self::Hashing),
            other => Err(format!(
                "unknown embedding backend \"{other}\"; expected gemini, ollama or hashing"
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub backend: EmbeddingBackend,
    /// Model name; a backend-specific default applies when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    /// Vector width of the hashing backend.
    pub dimension: usize,
    /// Texts per remote embedding request.
    pub batch_size: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            backend: EmbeddingBackend::default(),
            model: None,
            base_url: None,
            dimension: 384,
            batch_size: 100,
        }
    }
}

impl EmbeddingConfig {
    pub fn effective_model(&self) -> &str {
        match (&self.model, self.backend) {
            (Some(model), _) => model,
            (None, EmbeddingBackend::Gemini) => "models/gemini-embedding-001",
            (None, EmbeddingBackend::Ollama) => "nomic-embed-text",
            (None, EmbeddingBackend::Hashing) => "feature-hashing",
        }
    }

    pub fn effective_base_url(&self) -> &str {
        match (&self.base_url, self.backend) {
            (Some(url), _) => url,
            (None, EmbeddingBackend::Ollama) => OLLAMA_BASE_URL,
            (None, _) => GEMINI_BASE_URL,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    #[default]
    Gemini,
    Ollama,
}

impl LlmProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Gemini => "gemini",
            Self::Ollama => "ollama",
        }
    }
}

impl fmt::Display for LlmProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LlmProvider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "gemini" | "google" => Ok(Self::Gemini),
            "ollama" => Ok(Self::Ollama),
            other => Err(format!(
                "unknown LLM provider \"{other}\"; expected gemini or ollama"
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub provider: LlmProvider,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    pub temperature: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: LlmProvider::default(),
            model: None,
            temperature: 0.4,
            base_url: None,
            timeout_secs: 120,
        }
    }
}

impl LlmConfig {
    pub fn effective_model(&self) -> &str {
        match (&self.model, self.provider) {
            (Some(model), _) => model,
            (None, LlmProvider::Gemini) => "gemini-2.5-flash",
            (None, LlmProvider::Ollama) => "llama3.2",
        }
    }

    pub fn effective_base_url(&self) -> &str {
        match (&self.base_url, self.provider) {
            (Some(url), _) => url,
            (None, LlmProvider::Gemini) => GEMINI_BASE_URL,
            (None, LlmProvider::Ollama) => OLLAMA_BASE_URL,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PromptStyle {
    /// Strict JSON-dictionary instructions.
    #[default]
    Detailed,
    /// Short free-form request for a dictionary.
    Concise,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptConfig {
    pub style: PromptStyle,
    /// Replaces the built-in template; must contain `{context}`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template_file: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecoveryConfig {
    /// Fall back to `key: value` line splitting when structured parses fail.
    pub line_heuristic: bool,
}

impl Default for RecoveryConfig {
    fn default() -> Self {
        Self {
            line_heuristic: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
    pub port: u16,
    /// Where uploads live for the duration of a request.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scratch_dir: Option<PathBuf>,
    pub max_upload_mb: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0".into(),
            port: 8000,
            scratch_dir: None,
            max_upload_mb: 50,
        }
    }
}

impl ServerConfig {
    pub fn addr(&self) -> String {
        format!("{}:{}", self.bind, self.port)
    }
}

#[derive(Clone, Default, PartialEq)]
pub struct Credentials {
    pub google_api_key: Option<String>,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field(
                "google_api_key",
                &self.google_api_key.as_ref().map(|_| "<redacted>"),
            )
            .finish()
    }
}

impl Config {
    /// Build the configuration from an optional TOML file and an environment map.
    pub fn load(path: Option<&Path>, env: &HashMap<String, String>) -> ConfigResult<Self> {
        let mut config = match path {
            Some(path) => {
                let content =
                    std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
                        path: path.display().to_string(),
                        source: e,
                    })?;
                Self::from_toml_str(&content, &path.display().to_string())?
            }
            None => Self::default(),
        };
        config.apply_env(env)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a TOML document; `origin` names it in errors.
    pub fn from_toml_str(content: &str, origin: &str) -> ConfigResult<Self> {
        toml::from_str(content).map_err(|e| ConfigError::Parse {
            path: origin.to_string(),
            message: e.to_string(),
        })
    }

    /// Apply credentials and `FLASHCARD_*` overrides.
    pub fn apply_env(&mut self, env: &HashMap<String, String>) -> ConfigResult<()> {
        let get = |key: &str| env.get(key).map(|v| v.trim()).filter(|v| !v.is_empty());

        if let Some(key) = get(GOOGLE_API_KEY_VAR) {
            self.credentials.google_api_key = Some(key.to_string());
        }
        if let Some(v) = get("FLASHCARD_LLM_PROVIDER") {
            self.llm.provider = v.parse().map_err(|message| ConfigError::InvalidValue {
                key: "FLASHCARD_LLM_PROVIDER".into(),
                message,
            })?;
        }
        if let Some(v) = get("FLASHCARD_LLM_MODEL") {
            self.llm.model = Some(v.to_string());
        }
        if let Some(v) = get("FLASHCARD_EMBEDDING_BACKEND") {
            self.embedding.backend = v.parse().map_err(|message| ConfigError::InvalidValue {
                key: "FLASHCARD_EMBEDDING_BACKEND".into(),
                message,
            })?;
        }
        if let Some(v) = get("FLASHCARD_EMBEDDING_MODEL") {
            self.embedding.model = Some(v.to_string());
        }
        if let Some(v) = get("FLASHCARD_OLLAMA_URL") {
            if self.llm.provider == LlmProvider::Ollama {
                self.llm.base_url = Some(v.to_string());
            }
            if self.embedding.backend == EmbeddingBackend::Ollama {
                self.embedding.base_url = Some(v.to_string());
            }
        }
        if let Some(v) = get("FLASHCARD_TOP_K") {
            self.retrieval.top_k = parse_number("FLASHCARD_TOP_K", v)?;
        }
        if let Some(v) = get("FLASHCARD_SERVER_BIND") {
            self.server.bind = v.to_string();
        }
        if let Some(v) = get("FLASHCARD_SERVER_PORT") {
            self.server.port = parse_number("FLASHCARD_SERVER_PORT", v)?;
        }
        Ok(())
    }

    /// Reject combinations the pipeline cannot run with.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.chunking.chunk_size == 0 {
            return Err(invalid("chunking.chunk_size", "must be greater than zero"));
        }
        if self.chunking.chunk_overlap >= self.chunking.chunk_size {
            return Err(invalid(
                "chunking.chunk_overlap",
                &format!(
                    "overlap {} must be smaller than chunk_size {}",
                    self.chunking.chunk_overlap, self.chunking.chunk_size
                ),
            ));
        }
        if self.retrieval.top_k == 0 {
            return Err(invalid("retrieval.top_k", "must be greater than zero"));
        }
        if self.retrieval.query.trim().is_empty() {
            return Err(invalid("retrieval.query", "must not be empty"));
        }
        if !(0.0..=2.0).contains(&self.llm.temperature) {
            return Err(invalid("llm.temperature", "must be between 0.0 and 2.0"));
        }
        if self.embedding.dimension == 0 {
            return Err(invalid("embedding.dimension", "must be greater than zero"));
        }
        if self.embedding.batch_size == 0 {
            return Err(invalid("embedding.batch_size", "must be greater than zero"));
        }
        if self.server.max_upload_mb == 0 {
            return Err(invalid("server.max_upload_mb", "must be greater than zero"));
        }
        Ok(())
    }

    /// Render as TOML; credentials are omitted.
    pub fn to_toml(&self) -> ConfigResult<String> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Parse {
            path: "(effective config)".into(),
            message: e.to_string(),
        })
    }
}

/// Merge a `.env` file (if any) under the real process environment.
///
/// Nothing is exported; the returned map is the only carrier of the values.
pub fn collect_env() -> HashMap<String, String> {
    let mut env = HashMap::new();
    if let Ok(iter) = dotenvy::dotenv_iter() {
        for (key, value) in iter.flatten() {
            env.insert(key, value);
        }
    }
    env.extend(std::env::vars());
    env
}

fn parse_number<T: FromStr>(key: &str, value: &str) -> ConfigResult<T> {
    value.parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        message: format!("\"{value}\" is not a valid number"),
    })
}

fn invalid(key: &str, message: &str) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        message: message.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn defaults_match_reference_pipeline() {
        let config = Config::default();
        assert_eq!(config.chunking.chunk_size, 1000);
        assert_eq!(config.chunking.chunk_overlap, 50);
        assert_eq!(config.retrieval.top_k, 20);
        assert_eq!(config.llm.temperature, 0.4);
        assert_eq!(config.llm.effective_model(), "gemini-2.5-flash");
        assert_eq!(
            config.embedding.effective_model(),
            "models/gemini-embedding-001"
        );
        assert!(config.recovery.line_heuristic);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn toml_sections_override_defaults() {
        let toml = r#"
            [chunking]
            chunk_size = 500

            [llm]
            provider = "ollama"
            temperature = 0.1

            [recovery]
            line_heuristic = false
        "#;
        let config = Config::from_toml_str(toml, "test.toml").unwrap();
        assert_eq!(config.chunking.chunk_size, 500);
        assert_eq!(config.chunking.chunk_overlap, 50);
        assert_eq!(config.llm.provider, LlmProvider::Ollama);
        assert_eq!(config.llm.effective_model(), "llama3.2");
        assert_eq!(config.llm.effective_base_url(), "http://localhost:11434");
        assert!(!config.recovery.line_heuristic);
    }

    #[test]
    fn bad_toml_is_a_parse_error() {
        let err = Config::from_toml_str("[chunking\nchunk_size = ", "broken.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn env_supplies_credentials_and_overrides() {
        let mut config = Config::default();
        config
            .apply_env(&env(&[
                ("GOOGLE_API_KEY", "test-key"),
                ("FLASHCARD_EMBEDDING_BACKEND", "hashing"),
                ("FLASHCARD_TOP_K", "5"),
                ("FLASHCARD_SERVER_PORT", "9000"),
            ]))
            .unwrap();
        assert_eq!(config.credentials.google_api_key.as_deref(), Some("test-key"));
        assert_eq!(config.embedding.backend, EmbeddingBackend::Hashing);
        assert_eq!(config.retrieval.top_k, 5);
        assert_eq!(config.server.port, 9000);
    }

    #[test]
    fn ollama_url_applies_to_ollama_collaborators_only() {
        let mut config = Config::default();
        config
            .apply_env(&env(&[
                ("FLASHCARD_LLM_PROVIDER", "ollama"),
                ("FLASHCARD_OLLAMA_URL", "http://gpu-box:11434"),
            ]))
            .unwrap();
        assert_eq!(config.llm.effective_base_url(), "http://gpu-box:11434");
        assert_eq!(
            config.embedding.effective_base_url(),
            "https://generativelanguage.googleapis.com/v1beta"
        );
    }

    #[test]
    fn invalid_env_values_are_rejected() {
        let mut config = Config::default();
        let err = config
            .apply_env(&env(&[("FLASHCARD_LLM_PROVIDER", "gpt")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));

        let err = config
            .apply_env(&env(&[("FLASHCARD_TOP_K", "many")]))
            .unwrap_err();
        assert!(err.to_string().contains("FLASHCARD_TOP_K"));
    }

    #[test]
    fn overlap_must_be_smaller_than_chunk() {
        let mut config = Config::default();
        config.chunking.chunk_overlap = 1000;
        assert!(config.validate().is_err());
    }

    #[test]
    fn load_reads_file_and_env() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[retrieval]\ntop_k = 7\n").unwrap();
        let config = Config::load(Some(&path), &env(&[("GOOGLE_API_KEY", "k")])).unwrap();
        assert_eq!(config.retrieval.top_k, 7);
        assert!(config.credentials.google_api_key.is_some());
    }

    #[test]
    fn load_missing_file_is_read_error() {
        let err = Config::load(Some(Path::new("/nonexistent/config.toml")), &HashMap::new())
            .unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn toml_output_omits_credentials() {
        let mut config = Config::default();
        config.credentials.google_api_key = Some("secret".into());
        let rendered = config.to_toml().unwrap();
        assert!(!rendered.contains("secret"));
        assert!(rendered.contains("[chunking]"));
        assert!(format!("{:?}", config.credentials).contains("redacted"));
    }
}
