//! Settings file format and defaults

use crate::vehicle::Credentials;
use anyhow::{anyhow, Context, Result};
use relay_shared::defaults;
use serde::{Deserialize, Deserializer};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Extensions tried, in order, for each search directory
const CONFIG_EXTENSIONS: [&str; 3] = ["yaml", "yml", "json"];

/// Bound on remote call attempts and the fixed delay between them
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

/// One immutable snapshot of the relay configuration
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Accepted credentials, kept sorted and de-duplicated
    pub auth_tokens: Vec<String>,
    pub retries: u32,
    pub retry_delay_ms: u64,
    /// Temperatures in request paths are Celsius when true, Fahrenheit otherwise
    pub metric: bool,
    pub bind: String,
    #[serde(deserialize_with = "port_from_any")]
    pub port: u16,
    /// Only read at startup
    #[serde(flatten)]
    pub credentials: Credentials,
    pub simulated_vehicles: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            auth_tokens: Vec::new(),
            retries: defaults::RETRIES,
            retry_delay_ms: defaults::RETRY_DELAY_MS,
            metric: defaults::METRIC,
            bind: defaults::BIND.into(),
            port: defaults::PORT,
            credentials: Credentials::default(),
            simulated_vehicles: defaults::SIMULATED_VEHICLES,
        }
    }
}

impl Settings {
    /// Parse settings from YAML (or JSON) text
    pub fn from_yaml(text: &str) -> Result<Self> {
        // An empty file is a valid, all-default config
        if text.trim().is_empty() {
            return Ok(Self::default().normalized());
        }
        let settings: Settings =
            serde_yaml::from_str(text).map_err(|e| anyhow!("Invalid configuration: {}", e))?;
        Ok(settings.normalized())
    }

    /// Parse settings from strict JSON text
    pub fn from_json(text: &str) -> Result<Self> {
        if text.trim().is_empty() {
            return Ok(Self::default().normalized());
        }
        let settings: Settings =
            serde_json::from_str(text).map_err(|e| anyhow!("Invalid configuration: {}", e))?;
        Ok(settings.normalized())
    }

    /// Read and parse a settings file; `.json` files are parsed as JSON,
    /// anything else as YAML
    pub async fn load(path: &Path) -> Result<Self> {
        let text = read_config_text(path).await?;
        Self::parse(path, &text)
    }

    /// Read and parse a settings file that must not be empty
    ///
    /// Used on reload, where an empty file is usually an editor midway
    /// through a save rather than a request to fall back to defaults.
    pub async fn load_non_empty(path: &Path) -> Result<Self> {
        let text = read_config_text(path).await?;
        if text.trim().is_empty() {
            return Err(anyhow!("Config file {} is empty", path.display()));
        }
        Self::parse(path, &text)
    }

    fn parse(path: &Path, text: &str) -> Result<Self> {
        let parsed = match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Self::from_json(text),
            _ => Self::from_yaml(text),
        };
        parsed.with_context(|| format!("In config file {}", path.display()))
    }

    /// Sort and de-duplicate the token list and drop empty tokens
    pub fn normalized(mut self) -> Self {
        self.auth_tokens.retain(|token| !token.is_empty());
        self.auth_tokens.sort();
        self.auth_tokens.dedup();
        self
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.retries,
            delay: Duration::from_millis(self.retry_delay_ms),
        }
    }

    /// `bind:port`, bracketing IPv6 literals
    pub fn listen_address(&self) -> String {
        if self.bind.contains(':') && !self.bind.starts_with('[') {
            format!("[{}]:{}", self.bind, self.port)
        } else {
            format!("{}:{}", self.bind, self.port)
        }
    }
}

async fn read_config_text(path: &Path) -> Result<String> {
    tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read config file {}", path.display()))
}

/// Accept the port as either `3514` or `"3514"`
fn port_from_any<'de, D>(deserializer: D) -> Result<u16, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum PortValue {
        Number(u16),
        Text(String),
    }

    match PortValue::deserialize(deserializer)? {
        PortValue::Number(port) => Ok(port),
        PortValue::Text(text) => text
            .trim()
            .parse()
            .map_err(|_| serde::de::Error::custom(format!("invalid port: {:?}", text))),
    }
}

/// Directories searched for the config file, in order
pub fn search_dirs() -> Vec<PathBuf> {
    let mut dirs = vec![PathBuf::from(".")];
    if let Some(home) = std::env::var_os("HOME") {
        dirs.push(PathBuf::from(home).join(".config"));
    }
    dirs.push(PathBuf::from("/"));
    dirs
}

/// Resolve the config file: an explicit path wins, otherwise the first
/// `relay.{yaml,yml,json}` found in [`search_dirs`]
pub fn find_config_file(explicit: Option<PathBuf>) -> Result<PathBuf> {
    if let Some(path) = explicit {
        if path.is_file() {
            return Ok(path);
        }
        return Err(anyhow!("Config file not found: {}", path.display()));
    }

    find_in_dirs(&search_dirs()).ok_or_else(|| {
        anyhow!(
            "No {}.{{{}}} found in {:?}",
            defaults::CONFIG_NAME,
            CONFIG_EXTENSIONS.join(","),
            search_dirs()
        )
    })
}

fn find_in_dirs(dirs: &[PathBuf]) -> Option<PathBuf> {
    dirs.iter()
        .flat_map(|dir| {
            CONFIG_EXTENSIONS
                .iter()
                .map(move |ext| dir.join(format!("{}.{}", defaults::CONFIG_NAME, ext)))
        })
        .find(|candidate| candidate.is_file())
}
