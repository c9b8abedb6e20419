//! Configuration file handling for sse-cli

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use sse_client::ClientConfig;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Delay before reconnecting when the server never sent a `retry:` field
const DEFAULT_RETRY_MS: u64 = 3000;

/// Configuration for the CLI tool
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    /// Default output format
    pub output: Option<String>,
    /// Disable colored output
    pub no_color: Option<bool>,
    /// Reconnect after the stream drops
    pub reconnect: Option<bool>,
    /// Reconnection delay used until the server sends `retry:`
    pub retry_ms: Option<u64>,
    /// Give up after this many consecutive failed connections
    pub max_retries: Option<u32>,
    /// Transport options passed to the client
    pub client: ClientConfig,
}

impl Config {
    /// Load configuration from the default config file
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;
        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Get the default config file path
    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Could not determine config directory")?
            .join("sse-cli");

        Ok(config_dir.join("config.toml"))
    }

    /// Merge CLI arguments over config file values
    pub fn merge_with_args(&self, args: &ListenArgs) -> Result<MergedConfig> {
        let mut client = self.client.clone();
        for header in &args.headers {
            let (name, value) = parse_header(header)?;
            client.headers.insert(name, value);
        }
        if let Some(secs) = args.read_timeout {
            client.read_timeout_ms = Some(secs.saturating_mul(1000));
        }
        if args.flush_on_close {
            client.flush_on_close = true;
        }

        Ok(MergedConfig {
            client,
            reconnect: args.reconnect || self.reconnect.unwrap_or(false),
            retry: Duration::from_millis(self.retry_ms.unwrap_or(DEFAULT_RETRY_MS)),
            max_retries: args.max_retries.or(self.max_retries),
        })
    }
}

/// Connection-related CLI arguments that override the config file
#[derive(Debug, Clone, Default)]
pub struct ListenArgs {
    pub headers: Vec<String>,
    pub read_timeout: Option<u64>,
    pub flush_on_close: bool,
    pub reconnect: bool,
    pub max_retries: Option<u32>,
}

/// Fully resolved configuration after merging CLI args
#[derive(Debug, Clone)]
pub struct MergedConfig {
    pub client: ClientConfig,
    pub reconnect: bool,
    pub retry: Duration,
    pub max_retries: Option<u32>,
}

/// Split a `Name: value` header argument
pub fn parse_header(raw: &str) -> Result<(String, String)> {
    let (name, value) = raw
        .split_once(':')
        .with_context(|| format!("Invalid header '{}', expected 'Name: value'", raw))?;
    let name = name.trim();
    if name.is_empty() {
        anyhow::bail!("Invalid header '{}', empty name", raw);
    }
    Ok((name.to_string(), value.trim().to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_header() {
        assert_eq!(
            parse_header("Authorization: Bearer a:b").unwrap(),
            ("Authorization".to_string(), "Bearer a:b".to_string())
        );
        assert!(parse_header("no-colon").is_err());
        assert!(parse_header(": value").is_err());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
output = "json"
reconnect = true
retry_ms = 500

[client]
connect_timeout_ms = 3000
flush_on_close = true

[client.headers]
X-Api-Key = "secret"
"#
        )
        .unwrap();

        let config = Config::load_from(file.path()).unwrap();
        assert_eq!(config.output.as_deref(), Some("json"));
        assert_eq!(config.reconnect, Some(true));
        assert_eq!(config.client.connect_timeout_ms, 3000);
        assert!(config.client.flush_on_close);
        assert_eq!(
            config.client.headers.get("X-Api-Key").map(String::as_str),
            Some("secret")
        );
    }

    #[test]
    fn test_load_from_invalid_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "retry_ms = \"soon\"").unwrap();
        assert!(Config::load_from(file.path()).is_err());
    }

    #[test]
    fn test_merge_args_over_file() {
        let config = Config {
            retry_ms: Some(250),
            max_retries: Some(2),
            client: ClientConfig::new().with_header("X-Api-Key", "from-file"),
            ..Default::default()
        };
        let args = ListenArgs {
            headers: vec!["X-Api-Key: from-args".into(), "X-Other: 1".into()],
            read_timeout: Some(30),
            flush_on_close: true,
            reconnect: true,
            max_retries: None,
        };

        let merged = config.merge_with_args(&args).unwrap();
        assert!(merged.reconnect);
        assert_eq!(merged.retry, Duration::from_millis(250));
        assert_eq!(merged.max_retries, Some(2));
        assert_eq!(merged.client.read_timeout_ms, Some(30_000));
        assert!(merged.client.flush_on_close);
        assert_eq!(merged.client.headers["X-Api-Key"], "from-args");
        assert_eq!(merged.client.headers["X-Other"], "1");
    }

    #[test]
    fn test_merge_defaults() {
        let merged = Config::default()
            .merge_with_args(&ListenArgs::default())
            .unwrap();
        assert!(!merged.reconnect);
        assert_eq!(merged.retry, Duration::from_millis(DEFAULT_RETRY_MS));
        assert_eq!(merged.max_retries, None);
    }
}
