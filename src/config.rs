//! Configuration for the troubleshooting engine binary.

use serde::{Deserialize, Serialize};

/// Top-level application configuration, loadable from JSON/TOML/YAML and
/// overridable by `APP_`-prefixed environment variables (see
/// [`AppConfig::from_env`]).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub llm: LlmConfig,
    pub database: DatabaseConfig,
    pub server: ServerConfig,
    pub router: RouterConfig,
}

/// LLM provider selection and call parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// "anthropic" or "openai"
    pub provider: String,

    /// Read from the environment at startup, never persisted to a config
    /// file on disk.
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,

    pub model: String,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

fn default_max_tokens() -> u32 {
    1024
}

fn default_temperature() -> f32 {
    0.2
}

fn default_timeout() -> u64 {
    60
}

/// SQLite connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
}

/// HTTP server bind address.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub bind_address: String,
}

/// Cold-start router tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouterConfig {
    #[serde(default = "default_confidence_threshold")]
    pub min_confidence: f32,
}

fn default_confidence_threshold() -> f32 {
    0.3
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            llm: LlmConfig {
                provider: "anthropic".to_string(),
                api_key: None,
                model: "claude-3-5-sonnet-20241022".to_string(),
                max_tokens: default_max_tokens(),
                temperature: default_temperature(),
                timeout_secs: default_timeout(),
            },
            database: DatabaseConfig { url: "sqlite://troubleshooting.sqlite?mode=rwc".to_string() },
            server: ServerConfig { bind_address: "0.0.0.0:8080".to_string() },
            router: RouterConfig { min_confidence: default_confidence_threshold() },
        }
    }
}

impl AppConfig {
    /// Loads configuration from a file whose extension selects the format
    /// (`json`, `toml`, `yaml`/`yml`).
    pub fn from_file<P: AsRef<std::path::Path>>(path: P) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(&path)?;
        let config = match path.as_ref().extension().and_then(|s| s.to_str()) {
            Some("json") => serde_json::from_str(&content)?,
            Some("toml") => toml::from_str(&content)?,
            Some("yaml") | Some("yml") => serde_yml::from_str(&content)?,
            _ => return Err(anyhow::anyhow!("unsupported config file format")),
        };
        Ok(config)
    }

    /// Saves configuration to a file whose extension selects the format.
    /// `llm.api_key` is never written out (see its `skip_serializing`).
    pub fn to_file<P: AsRef<std::path::Path>>(&self, path: P) -> anyhow::Result<()> {
        let content = match path.as_ref().extension().and_then(|s| s.to_str()) {
            Some("json") => serde_json::to_string_pretty(self)?,
            Some("toml") => toml::to_string(self)?,
            Some("yaml") | Some("yml") => serde_yml::to_string(self)?,
            _ => return Err(anyhow::anyhow!("unsupported config file format")),
        };
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Layers `APP_`-prefixed environment variables over a base config
    /// (typically [`AppConfig::default`] or a loaded file), using `__` as
    /// the nested-field separator (e.g. `APP_LLM__PROVIDER`,
    /// `APP_DATABASE__URL`). The base is re-serialized as a JSON source so
    /// every field has a value before the environment layer is applied,
    /// partial overrides included.
    pub fn from_env(base: Self) -> anyhow::Result<Self> {
        let base_json = serde_json::to_string(&base)?;
        let figure = config::Config::builder()
            .add_source(config::File::from_str(&base_json, config::FileFormat::Json))
            .add_source(config::Environment::with_prefix("APP").separator("__"))
            .build()?;
        Ok(figure.try_deserialize()?)
    }

    /// Validates cross-field invariants not already enforced by type.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.llm.provider != "anthropic" && self.llm.provider != "openai" {
            return Err(anyhow::anyhow!("unsupported llm provider: {}", self.llm.provider));
        }
        if self.llm.model.is_empty() {
            return Err(anyhow::anyhow!("llm model name cannot be empty"));
        }
        if !(0.0..=2.0).contains(&self.llm.temperature) {
            return Err(anyhow::anyhow!("llm temperature must be between 0.0 and 2.0"));
        }
        if self.database.url.is_empty() {
            return Err(anyhow::anyhow!("database url cannot be empty"));
        }
        if !(0.0..=1.0).contains(&self.router.min_confidence) {
            return Err(anyhow::anyhow!("router min_confidence must be between 0.0 and 1.0"));
        }
        Ok(())
    }
}
