//! Configuration for lifecycle managers.
//!
//! [`LifecycleOptions`] is read once when a manager is built. It can be
//! constructed directly or loaded from a [`ConfigProvider`] that layers
//! environment variables, in-memory maps and (with the `config` feature)
//! JSON files.

use std::collections::HashMap;
use std::env;

use parking_lot::RwLock;
#[cfg(feature = "config")]
use serde::{Deserialize, Serialize};

use crate::{LifecycleError, LifecycleResult};

/// Configuration key for [`LifecycleOptions::flush_on_close`].
pub const FLUSH_ON_CLOSE_KEY: &str = "lifecycle.flush_on_close";
/// Configuration key for [`LifecycleOptions::enable_logging`].
pub const ENABLE_LOGGING_KEY: &str = "lifecycle.enable_logging";

/// Options consumed by every manager built from them
///
/// # Examples
///
/// ```
/// use scoped_handles::LifecycleOptions;
///
/// let options = LifecycleOptions::default().with_flush_on_close(true);
/// assert!(options.flush_on_close);
/// assert!(options.enable_logging);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "config", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "config", serde(default))]
pub struct LifecycleOptions {
    /// Flush an open primary handle before releasing it on close. Default `false`.
    pub flush_on_close: bool,
    /// Install a [`TracingObserver`](crate::TracingObserver) on every manager. Default `true`.
    pub enable_logging: bool,
}

impl Default for LifecycleOptions {
    fn default() -> Self {
        Self {
            flush_on_close: false,
            enable_logging: true,
        }
    }
}

impl LifecycleOptions {
    pub fn with_flush_on_close(mut self, enabled: bool) -> Self {
        self.flush_on_close = enabled;
        self
    }

    pub fn with_logging(mut self, enabled: bool) -> Self {
        self.enable_logging = enabled;
        self
    }

    /// Load options from a config provider.
    ///
    /// Missing keys keep their defaults; a present key of the wrong type is
    /// an `InvalidConfiguration` error rather than a silent default.
    pub fn load(config: &ConfigProvider) -> LifecycleResult<Self> {
        let defaults = Self::default();
        Ok(Self {
            flush_on_close: config.get_bool_opt(FLUSH_ON_CLOSE_KEY)?.unwrap_or(defaults.flush_on_close),
            enable_logging: config.get_bool_opt(ENABLE_LOGGING_KEY)?.unwrap_or(defaults.enable_logging),
        })
    }
}

/// A configuration value as read from a source
///
/// Only booleans are consumed by [`LifecycleOptions`]; anything else is kept
/// as written so a wrong-typed value can be reported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigValue {
    Boolean(bool),
    Text(String),
}

impl ConfigValue {
    /// Try to convert to boolean
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ConfigValue::Boolean(b) => Some(*b),
            ConfigValue::Text(_) => None,
        }
    }

    /// Parse a raw string the way environment values are parsed.
    ///
    /// `true`/`false`, `1`/`0`, `yes`/`no` and `on`/`off` are booleans in any
    /// letter case; everything else is text.
    ///
    /// ```
    /// use scoped_handles::ConfigValue;
    ///
    /// assert_eq!(ConfigValue::parse("TRUE"), ConfigValue::Boolean(true));
    /// assert_eq!(ConfigValue::parse("0"), ConfigValue::Boolean(false));
    /// assert_eq!(ConfigValue::parse("sometimes"), ConfigValue::Text("sometimes".into()));
    /// ```
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => ConfigValue::Boolean(true),
            "false" | "0" | "no" | "off" => ConfigValue::Boolean(false),
            _ => ConfigValue::Text(raw.to_string()),
        }
    }
}

/// Trait for configuration sources
pub trait ConfigSource: Send + Sync + std::fmt::Debug {
    /// Get a configuration value by key
    fn get(&self, key: &str) -> Option<ConfigValue>;
}

/// Environment variable configuration source
///
/// Key `lifecycle.flush_on_close` with prefix `APP` is read from
/// `APP_LIFECYCLE_FLUSH_ON_CLOSE`.
#[derive(Debug, Default)]
pub struct EnvironmentConfigSource {
    /// Prefix to filter environment variables
    prefix: Option<String>,
}

impl EnvironmentConfigSource {
    pub fn new() -> Self {
        Self { prefix: None }
    }

    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: Some(prefix.into()),
        }
    }

    fn env_key(&self, key: &str) -> String {
        let key = key.replace('.', "_").to_uppercase();
        match &self.prefix {
            Some(prefix) => format!("{}_{}", prefix.to_uppercase(), key),
            None => key,
        }
    }
}

impl ConfigSource for EnvironmentConfigSource {
    fn get(&self, key: &str) -> Option<ConfigValue> {
        env::var(self.env_key(key)).ok().map(|value| ConfigValue::parse(&value))
    }
}

/// In-memory configuration source
///
/// ```
/// use scoped_handles::{ConfigProvider, LifecycleOptions, MapConfigSource};
///
/// let mut config = ConfigProvider::new();
/// config.add_source(Box::new(MapConfigSource::new().with("lifecycle.flush_on_close", true)));
///
/// let options = LifecycleOptions::load(&config).unwrap();
/// assert!(options.flush_on_close);
/// ```
#[derive(Debug, Default)]
pub struct MapConfigSource {
    values: HashMap<String, ConfigValue>,
}

impl MapConfigSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<ConfigValue>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }
}

impl ConfigSource for MapConfigSource {
    fn get(&self, key: &str) -> Option<ConfigValue> {
        self.values.get(key).cloned()
    }
}

impl From<bool> for ConfigValue {
    fn from(value: bool) -> Self {
        ConfigValue::Boolean(value)
    }
}

impl From<&str> for ConfigValue {
    fn from(value: &str) -> Self {
        ConfigValue::parse(value)
    }
}

/// JSON file configuration source
///
/// The file holds a flat object of dotted keys, e.g.
/// `{"lifecycle.flush_on_close": true}`. String values go through
/// [`ConfigValue::parse`], so `"on"` or `"1"` are booleans too. The file is
/// read on first lookup.
#[cfg(feature = "config")]
#[derive(Debug)]
pub struct JsonConfigSource {
    /// File path to JSON configuration
    file_path: std::path::PathBuf,
    /// Cached parsed configuration
    config: RwLock<Option<HashMap<String, ConfigValue>>>,
}

#[cfg(feature = "config")]
impl JsonConfigSource {
    pub fn new(file_path: impl Into<std::path::PathBuf>) -> Self {
        Self {
            file_path: file_path.into(),
            config: RwLock::new(None),
        }
    }

    /// Reload configuration from file
    pub fn reload(&self) -> LifecycleResult<()> {
        let content = std::fs::read_to_string(&self.file_path).map_err(|err| {
            LifecycleError::InvalidConfiguration(format!(
                "cannot read {}: {}",
                self.file_path.display(),
                err
            ))
        })?;

        let raw: HashMap<String, serde_json::Value> = serde_json::from_str(&content).map_err(|err| {
            LifecycleError::InvalidConfiguration(format!(
                "invalid JSON in {}: {}",
                self.file_path.display(),
                err
            ))
        })?;

        let parsed = raw
            .into_iter()
            .map(|(key, value)| {
                let value = match value {
                    serde_json::Value::Bool(b) => ConfigValue::Boolean(b),
                    serde_json::Value::String(text) => ConfigValue::parse(&text),
                    other => ConfigValue::Text(other.to_string()),
                };
                (key, value)
            })
            .collect();

        *self.config.write() = Some(parsed);
        Ok(())
    }
}

#[cfg(feature = "config")]
impl ConfigSource for JsonConfigSource {
    fn get(&self, key: &str) -> Option<ConfigValue> {
        if self.config.read().is_none() {
            if let Err(err) = self.reload() {
                tracing::warn!(error = %err, "json configuration source unavailable");
                return None;
            }
        }

        self.config.read().as_ref()?.get(key).cloned()
    }
}

/// Layered configuration provider
///
/// Sources are consulted in the order they were added; the first one that
/// knows a key wins. Hits are cached until [`invalidate_cache`](Self::invalidate_cache).
#[derive(Debug, Default)]
pub struct ConfigProvider {
    /// Configuration sources in priority order
    sources: Vec<Box<dyn ConfigSource>>,
    /// Cached configuration values
    cache: RwLock<HashMap<String, ConfigValue>>,
}

impl ConfigProvider {
    /// Create a provider with no sources
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a provider backed by environment variables with the given prefix
    pub fn from_env(prefix: impl Into<String>) -> Self {
        let mut provider = Self::new();
        provider.add_source(Box::new(EnvironmentConfigSource::with_prefix(prefix)));
        provider
    }

    /// Add a configuration source (higher priority sources should be added first)
    pub fn add_source(&mut self, source: Box<dyn ConfigSource>) {
        self.sources.push(source);
    }

    /// Get a configuration value, checking sources in priority order
    pub fn get(&self, key: &str) -> Option<ConfigValue> {
        if let Some(value) = self.cache.read().get(key) {
            return Some(value.clone());
        }

        for source in &self.sources {
            if let Some(value) = source.get(key) {
                self.cache.write().insert(key.to_string(), value.clone());
                return Some(value);
            }
        }

        None
    }

    /// Get a boolean value; `None` when absent, an error when present with another type
    pub fn get_bool_opt(&self, key: &str) -> LifecycleResult<Option<bool>> {
        match self.get(key) {
            None => Ok(None),
            Some(value) => value.as_bool().map(Some).ok_or_else(|| {
                LifecycleError::InvalidConfiguration(format!(
                    "{} must be a boolean, got {:?}",
                    key, value
                ))
            }),
        }
    }

    /// Clear the configuration cache (forces reload from sources)
    pub fn invalidate_cache(&self) {
        self.cache.write().clear();
    }
}
