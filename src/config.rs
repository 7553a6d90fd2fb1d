//! TOML configuration parsing.
//!
//! The config file carries the engine connection settings and the HTTP bind
//! address. After parsing, `OPENSEARCH_*` environment variables override the
//! matching `[engine]` fields so credentials can stay out of the file.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct EngineConfig {
    /// `"opensearch"` or `"memory"`.
    #[serde(default = "default_backend")]
    pub backend: String,
    #[serde(default = "default_url")]
    pub url: String,
    /// Index or alias that every operation targets.
    #[serde(default = "default_index")]
    pub index: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    /// Per-request timeout for every engine call.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Accept self-signed certificates (development clusters only).
    #[serde(default)]
    pub accept_invalid_certs: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            url: default_url(),
            index: default_index(),
            username: None,
            password: None,
            timeout_secs: default_timeout_secs(),
            accept_invalid_certs: false,
        }
    }
}

fn default_backend() -> String {
    "opensearch".to_string()
}
fn default_url() -> String {
    "http://localhost:9200".to_string()
}
fn default_index() -> String {
    "documents".to_string()
}
fn default_timeout_secs() -> u64 {
    10
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:8080".to_string()
}

impl EngineConfig {
    pub fn is_memory(&self) -> bool {
        self.backend == "memory"
    }
}

impl Config {
    /// Apply `OPENSEARCH_NODE`, `OPENSEARCH_USERNAME`, `OPENSEARCH_PASSWORD`
    /// and `OPENSEARCH_INDEX_ALIAS` overrides from `lookup`.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("OPENSEARCH_NODE") {
            self.engine.url = url;
        }
        if let Some(user) = lookup("OPENSEARCH_USERNAME") {
            self.engine.username = Some(user);
        }
        if let Some(pass) = lookup("OPENSEARCH_PASSWORD") {
            self.engine.password = Some(pass);
        }
        if let Some(index) = lookup("OPENSEARCH_INDEX_ALIAS") {
            self.engine.index = index;
        }
    }

    pub fn validate(&self) -> Result<()> {
        match self.engine.backend.as_str() {
            "opensearch" | "memory" => {}
            other => anyhow::bail!(
                "Unknown engine backend: '{}'. Must be opensearch or memory.",
                other
            ),
        }

        if self.engine.index.trim().is_empty() {
            anyhow::bail!("engine.index must not be empty");
        }

        if self.engine.timeout_secs == 0 {
            anyhow::bail!("engine.timeout_secs must be > 0");
        }

        if !self.engine.is_memory() && self.engine.url.trim().is_empty() {
            anyhow::bail!("engine.url must be set for the opensearch backend");
        }

        if self.engine.username.is_some() != self.engine.password.is_some() {
            anyhow::bail!("engine.username and engine.password must be set together");
        }

        Ok(())
    }
}

/// Parse the config file, apply environment overrides and validate.
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let mut config: Config =
        toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    config.apply_env(|key| std::env::var(key).ok());
    config.validate()?;

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let cfg: Config = toml::from_str("").unwrap();
        assert_eq!(cfg.engine.backend, "opensearch");
        assert_eq!(cfg.engine.index, "documents");
        assert_eq!(cfg.engine.timeout_secs, 10);
        assert_eq!(cfg.server.bind, "127.0.0.1:8080");
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
[engine]
backend = "memory"
index = "articles"
timeout_secs = 3

[server]
bind = "0.0.0.0:9000"
"#
        )
        .unwrap();

        let cfg = load_config(file.path()).unwrap();
        assert!(cfg.engine.is_memory());
        assert_eq!(cfg.engine.timeout_secs, 3);
        assert_eq!(cfg.server.bind, "0.0.0.0:9000");
    }

    #[test]
    fn test_missing_file() {
        let err = load_config(Path::new("/nonexistent/docsearch.toml")).unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("OPENSEARCH_NODE", "https://search.internal:9200"),
            ("OPENSEARCH_USERNAME", "svc"),
            ("OPENSEARCH_PASSWORD", "secret"),
            ("OPENSEARCH_INDEX_ALIAS", "docs-live"),
        ]
        .into_iter()
        .collect();

        let mut cfg = Config::default();
        cfg.apply_env(|k| env.get(k).map(|v| v.to_string()));

        assert_eq!(cfg.engine.url, "https://search.internal:9200");
        assert_eq!(cfg.engine.username.as_deref(), Some("svc"));
        assert_eq!(cfg.engine.password.as_deref(), Some("secret"));
        assert_eq!(cfg.engine.index, "docs-live");
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_rejects_unknown_backend() {
        let cfg: Config = toml::from_str("[engine]\nbackend = \"solr\"").unwrap();
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("Unknown engine backend"));
    }

    #[test]
    fn test_rejects_zero_timeout() {
        let cfg: Config = toml::from_str("[engine]\ntimeout_secs = 0").unwrap();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_rejects_half_credentials() {
        let cfg: Config = toml::from_str("[engine]\nusername = \"admin\"").unwrap();
        assert!(cfg.validate().is_err());
    }
}
