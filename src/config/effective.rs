//! Effective configuration with provenance
//!
//! Merges builtin defaults, an optional TOML file, environment overrides
//! and CLI overrides, then exposes a typed [`Settings`] plus a redacted
//! copy of the merged tree for display.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};

use super::defaults::BuiltinDefaults;
use super::merge::merge_layers;
use super::settings::Settings;

/// Environment variable naming an alternate config file
pub const CONFIG_PATH_ENV: &str = "PPA_STEWARD_CONFIG";

/// Environment variables mapped onto config keys
const ENV_KEYS: &[(&str, &str, &str)] = &[
    ("LP_ACCESS_TOKEN", "credentials", "token"),
    ("LP_ACCESS_SECRET", "credentials", "secret"),
    ("LP_SERVICE_ROOT", "archive", "service_root"),
];

/// Keys that contain secrets and should be redacted
const SECRET_KEYS: &[&str] = &["password", "token", "secret", "api_key", "credential"];

/// Origin of a configuration source
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ConfigOrigin {
    Builtin,
    File,
    Env,
    Cli,
}

/// A contributing config source with provenance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigSource {
    pub origin: ConfigOrigin,

    /// File path (file layer only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    /// SHA-256 digest of raw file bytes (file layer only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub digest: Option<String>,

    /// Variables read (env layer only)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub keys: Vec<String>,
}

impl ConfigSource {
    fn bare(origin: ConfigOrigin) -> Self {
        Self {
            origin,
            path: None,
            digest: None,
            keys: Vec::new(),
        }
    }
}

/// Environment overrides, captured once.
#[derive(Debug, Clone, Default)]
pub struct EnvOverrides {
    vars: Vec<(String, String)>,
}

impl EnvOverrides {
    /// Read the recognised variables from the process environment
    pub fn from_env() -> Self {
        let vars = ENV_KEYS
            .iter()
            .filter_map(|(name, _, _)| {
                env::var(name)
                    .ok()
                    .filter(|v| !v.is_empty())
                    .map(|v| (name.to_string(), v))
            })
            .collect();
        Self { vars }
    }

    /// Build from explicit pairs; unrecognised names are ignored
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let vars = pairs
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .filter(|(k, _)| ENV_KEYS.iter().any(|(name, _, _)| name == k))
            .collect();
        Self { vars }
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    fn to_value(&self) -> Value {
        let mut root = serde_json::Map::new();
        for (name, value) in &self.vars {
            if let Some((_, table, key)) = ENV_KEYS.iter().find(|(n, _, _)| n == name) {
                let entry = root
                    .entry(table.to_string())
                    .or_insert_with(|| Value::Object(serde_json::Map::new()));
                if let Value::Object(map) = entry {
                    map.insert(key.to_string(), Value::String(value.clone()));
                }
            }
        }
        Value::Object(root)
    }

    fn names(&self) -> Vec<String> {
        self.vars.iter().map(|(k, _)| k.clone()).collect()
    }
}

/// Default config file: `$HOME/.config/ppa-steward/config.toml`
pub fn default_config_path() -> Option<PathBuf> {
    env::var("HOME")
        .ok()
        .map(|home| PathBuf::from(home).join(".config/ppa-steward/config.toml"))
}

/// Effective configuration with full provenance
#[derive(Debug, Clone, Serialize)]
pub struct EffectiveConfig {
    pub created_at: DateTime<Utc>,

    /// Merged configuration with secrets redacted
    pub config: Value,

    /// Contributing sources in precedence order
    pub sources: Vec<ConfigSource>,

    /// Redacted key paths
    pub redactions: Vec<String>,

    #[serde(skip)]
    settings: Settings,
}

impl EffectiveConfig {
    /// Build effective config from layers.
    ///
    /// A missing file is skipped silently when it is the implicit default;
    /// an explicitly named file must exist.
    pub fn build(
        file: Option<&Path>,
        file_required: bool,
        env: &EnvOverrides,
        cli_overrides: Option<Value>,
    ) -> Result<Self, ConfigError> {
        let mut layers = vec![BuiltinDefaults::default().to_value()];
        let mut sources = vec![ConfigSource::bare(ConfigOrigin::Builtin)];

        if let Some(path) = file {
            if path.exists() {
                let (value, digest) = load_toml_file(path)?;
                layers.push(value);
                sources.push(ConfigSource {
                    path: Some(path.to_string_lossy().to_string()),
                    digest: Some(digest),
                    ..ConfigSource::bare(ConfigOrigin::File)
                });
            } else if file_required {
                return Err(ConfigError::IoError(format!(
                    "config file {} does not exist",
                    path.display()
                )));
            }
        }

        if !env.is_empty() {
            layers.push(env.to_value());
            sources.push(ConfigSource {
                keys: env.names(),
                ..ConfigSource::bare(ConfigOrigin::Env)
            });
        }

        if let Some(cli) = cli_overrides {
            layers.push(cli);
            sources.push(ConfigSource::bare(ConfigOrigin::Cli));
        }

        let mut merged = merge_layers(layers);
        let settings: Settings = serde_json::from_value(merged.clone())
            .map_err(|e| ConfigError::ValidationError(e.to_string()))?;
        validate(&settings)?;

        let redactions = redact_secrets(&mut merged);
        tracing::debug!(sources = sources.len(), "configuration resolved");

        Ok(Self {
            created_at: Utc::now(),
            config: merged,
            sources,
            redactions,
            settings,
        })
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Get a (redacted) config value by dot-separated path
    pub fn get(&self, path: &str) -> Option<&Value> {
        let mut current = &self.config;
        for part in path.split('.') {
            current = current.get(part)?;
        }
        Some(current)
    }

    pub fn get_str(&self, path: &str) -> Option<&str> {
        self.get(path).and_then(|v| v.as_str())
    }

    pub fn get_u64(&self, path: &str) -> Option<u64> {
        self.get(path).and_then(|v| v.as_u64())
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// Load and parse a TOML file, returning the value and digest
fn load_toml_file(path: &Path) -> Result<(Value, String), ConfigError> {
    let bytes = fs::read(path).map_err(|e| ConfigError::IoError(e.to_string()))?;

    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    let digest = hex::encode(hasher.finalize());

    let contents = String::from_utf8(bytes)
        .map_err(|e| ConfigError::ParseError(format!("Invalid UTF-8: {}", e)))?;
    let table: toml::Value = toml::from_str(&contents)
        .map_err(|e| ConfigError::ParseError(format!("TOML parse error: {}", e)))?;

    Ok((toml_to_json(table), digest))
}

fn toml_to_json(toml: toml::Value) -> Value {
    match toml {
        toml::Value::String(s) => Value::String(s),
        toml::Value::Integer(i) => Value::Number(i.into()),
        toml::Value::Float(f) => serde_json::Number::from_f64(f)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        toml::Value::Boolean(b) => Value::Bool(b),
        toml::Value::Datetime(dt) => Value::String(dt.to_string()),
        toml::Value::Array(arr) => Value::Array(arr.into_iter().map(toml_to_json).collect()),
        toml::Value::Table(table) => Value::Object(
            table
                .into_iter()
                .map(|(k, v)| (k, toml_to_json(v)))
                .collect(),
        ),
    }
}

fn redact_secrets(value: &mut Value) -> Vec<String> {
    let mut redactions = Vec::new();
    redact_recursive(value, String::new(), &mut redactions);
    redactions
}

fn redact_recursive(value: &mut Value, path: String, redactions: &mut Vec<String>) {
    if let Value::Object(map) = value {
        for (key, val) in map.iter_mut() {
            let current_path = if path.is_empty() {
                key.clone()
            } else {
                format!("{}.{}", path, key)
            };
            let key_lower = key.to_lowercase();
            let is_secret = SECRET_KEYS.iter().any(|s| key_lower.contains(s));

            if is_secret && !val.is_object() && !val.is_array() && !val.is_null() {
                *val = Value::String("[REDACTED]".to_string());
                redactions.push(current_path);
            } else {
                redact_recursive(val, current_path, redactions);
            }
        }
    }
}

fn validate(settings: &Settings) -> Result<(), ConfigError> {
    let root = &settings.archive.service_root;
    if !(root.starts_with("https://") || root.starts_with("http://")) {
        return Err(ConfigError::ValidationError(format!(
            "archive.service_root must be an http(s) URL, got '{root}'"
        )));
    }
    if settings.archive.consumer.trim().is_empty() {
        return Err(ConfigError::ValidationError(
            "archive.consumer must not be empty".to_string(),
        ));
    }
    if settings.archive.timeout_seconds == 0 || settings.archive.timeout_seconds > 600 {
        return Err(ConfigError::ValidationError(
            "archive.timeout_seconds must be in (0, 600]".to_string(),
        ));
    }
    if settings.upload.command.trim().is_empty() {
        return Err(ConfigError::ValidationError(
            "upload.command must not be empty".to_string(),
        ));
    }
    Ok(())
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),
}
