//! Runtime configuration
//!
//! ## Configuration Resolution
//!
//! 1. An explicit path (`--config`), which must exist
//! 2. The user override (`~/.config/sift/config.toml`) if present
//! 3. Embedded defaults (compiled into binary)
//!
//! Environment variables are applied on top of whichever file was loaded.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::dedup::LEGACY_BACKFILL_MARKER;
use crate::error::{Error, Result};

/// Embedded default config (compiled into binary)
const DEFAULT_CONFIG: &str = include_str!("../../../config/sift.toml");

pub const DEFAULT_CLASSIFIER_HOST: &str = "https://api.anthropic.com";
pub const DEFAULT_CLASSIFIER_MODEL: &str = "claude-3-5-haiku-latest";
pub const DEFAULT_SEARCH_ENDPOINT: &str = "https://api.duckduckgo.com/";

/// Which classifier implementation to build
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClassifierBackend {
    #[default]
    Agent,
    Mock,
}

impl std::str::FromStr for ClassifierBackend {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "agent" | "anthropic" => Ok(Self::Agent),
            "mock" => Ok(Self::Mock),
            _ => Err(format!("Unknown classifier backend: {}", s)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    pub backend: ClassifierBackend,
    pub host: String,
    pub model: String,
    pub api_key: Option<String>,
    pub max_tokens: u32,
    /// Bound on each HTTP round trip
    pub request_timeout_secs: u64,
    /// Bound on a whole classification session, tool calls included
    pub session_timeout_secs: u64,
    /// Model turns allowed before the session gives up
    pub max_turns: usize,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            backend: ClassifierBackend::Agent,
            host: DEFAULT_CLASSIFIER_HOST.to_string(),
            model: DEFAULT_CLASSIFIER_MODEL.to_string(),
            api_key: None,
            max_tokens: 4096,
            request_timeout_secs: 60,
            session_timeout_secs: 300,
            max_turns: 8,
        }
    }
}

impl ClassifierConfig {
    pub fn session_timeout(&self) -> Duration {
        Duration::from_secs(self.session_timeout_secs)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchProviderKind {
    #[default]
    DuckDuckGo,
    Disabled,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub provider: SearchProviderKind,
    pub endpoint: String,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            provider: SearchProviderKind::DuckDuckGo,
            endpoint: DEFAULT_SEARCH_ENDPOINT.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    pub backfill_marker: String,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            backfill_marker: LEGACY_BACKFILL_MARKER.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub classifier: ClassifierConfig,
    pub search: SearchConfig,
    pub ledger: LedgerConfig,
}

impl Config {
    /// Load configuration and apply environment overrides
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = load_file(path)?;
        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Parse config from TOML content
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(format!("Invalid config TOML: {}", e)))
    }

    /// Embedded defaults
    pub fn embedded() -> Result<Self> {
        Self::from_toml(DEFAULT_CONFIG)
    }

    /// Apply `SIFT_*` overrides from a variable lookup
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup("SIFT_CLASSIFIER_HOST") {
            self.classifier.host = host;
        }
        if let Some(model) = lookup("SIFT_CLASSIFIER_MODEL") {
            self.classifier.model = model;
        }
        if let Some(key) = lookup("SIFT_CLASSIFIER_API_KEY") {
            self.classifier.api_key = Some(key);
        }
        if let Some(backend) = lookup("SIFT_CLASSIFIER") {
            match backend.parse() {
                Ok(backend) => self.classifier.backend = backend,
                Err(e) => tracing::warn!(error = %e, "Ignoring SIFT_CLASSIFIER"),
            }
        }
    }
}

/// Default user override path
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("sift").join("config.toml"))
}

fn load_file(path: Option<&Path>) -> Result<Config> {
    let content = match path {
        Some(path) => fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read config {}: {}", path.display(), e))
        })?,
        None => match default_config_path() {
            Some(default_path) if default_path.exists() => {
                debug!(path = %default_path.display(), "Loading config override");
                fs::read_to_string(&default_path).map_err(|e| {
                    Error::Config(format!("Failed to read config: {}", e))
                })?
            }
            _ => DEFAULT_CONFIG.to_string(),
        },
    };

    Config::from_toml(&content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn test_embedded_config_matches_defaults() {
        let config = Config::embedded().unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = Config::from_toml(
            r#"
            [classifier]
            model = "local-model"
            max_turns = 3

            [search]
            provider = "disabled"
            "#,
        )
        .unwrap();

        assert_eq!(config.classifier.model, "local-model");
        assert_eq!(config.classifier.max_turns, 3);
        assert_eq!(config.classifier.host, DEFAULT_CLASSIFIER_HOST);
        assert_eq!(config.search.provider, SearchProviderKind::Disabled);
        assert_eq!(config.ledger.backfill_marker, "backfill");
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        let err = Config::from_toml("[classifier\nhost =").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_overrides_applied() {
        let vars: HashMap<&str, &str> = [
            ("SIFT_CLASSIFIER_HOST", "http://mac:11434"),
            ("SIFT_CLASSIFIER_MODEL", "qwen3-coder"),
            ("SIFT_CLASSIFIER_API_KEY", "secret"),
            ("SIFT_CLASSIFIER", "mock"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config.apply_overrides(|k| vars.get(k).map(|v| v.to_string()));

        assert_eq!(config.classifier.host, "http://mac:11434");
        assert_eq!(config.classifier.model, "qwen3-coder");
        assert_eq!(config.classifier.api_key.as_deref(), Some("secret"));
        assert_eq!(config.classifier.backend, ClassifierBackend::Mock);
    }

    #[test]
    fn test_unknown_backend_override_ignored() {
        let mut config = Config::default();
        config.apply_overrides(|k| (k == "SIFT_CLASSIFIER").then(|| "gpt".to_string()));
        assert_eq!(config.classifier.backend, ClassifierBackend::Agent);
    }

    #[test]
    fn test_load_explicit_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[ledger]\nbackfill_marker = \"legacy\"").unwrap();

        let config = load_file(Some(file.path())).unwrap();
        assert_eq!(config.ledger.backfill_marker, "legacy");
    }

    #[test]
    fn test_load_missing_explicit_path_errors() {
        let err = load_file(Some(Path::new("/nonexistent/sift.toml"))).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_session_timeout() {
        let config = ClassifierConfig {
            session_timeout_secs: 12,
            ..Default::default()
        };
        assert_eq!(config.session_timeout(), Duration::from_secs(12));
    }
}
