use anyhow::anyhow;
use anyhow::Result;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub catalog: CatalogConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Where the tier document lives: config object namespace/name and data entry.
#[derive(Debug, Clone, Deserialize)]
pub struct CatalogConfig {
    #[serde(default = "default_namespace")]
    pub namespace: String,
    #[serde(default = "default_name")]
    pub name: String,
    #[serde(default = "default_data_key")]
    pub data_key: String,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self { namespace: default_namespace(), name: default_name(), data_key: default_data_key() }
    }
}

/// Backends the operator tool can open. The in-process memory backend is
/// library and test only.
#[derive(Debug, Clone, Copy, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    File,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StorageBackend,
    #[serde(default = "default_storage_path")]
    pub path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self { backend: StorageBackend::default(), path: default_storage_path() }
    }
}

/// Conflict retry budget. Backoff of zero means immediate re-load.
#[derive(Debug, Clone, Deserialize)]
pub struct RetryConfig {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default)]
    pub backoff_base_ms: u64,
    #[serde(default = "default_backoff_max")]
    pub backoff_max_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            backoff_base_ms: 0,
            backoff_max_ms: default_backoff_max(),
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Compact,
    Json,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct LoggingConfig {
    #[serde(default)]
    pub format: LogFormat,
}

fn default_namespace() -> String { "maas-api".into() }
fn default_name() -> String { "tier-to-group-mapping".into() }
fn default_data_key() -> String { "tiers".into() }
fn default_storage_path() -> String { "data/config-objects.json".into() }
fn default_max_attempts() -> u32 { 5 }
fn default_backoff_max() -> u64 { 1000 }

pub fn load_from_file(path: &str) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path)?;
    load_from_str(&content)
}

pub fn load_from_str(content: &str) -> Result<AppConfig> {
    let cfg: AppConfig = toml::from_str(content)?;
    Ok(cfg)
}

impl AppConfig {
    /// Load `config.toml` (or `CONFIG_PATH`); a missing file means defaults.
    pub fn load_and_validate() -> Result<Self> {
        let path = std::env::var("CONFIG_PATH").unwrap_or_else(|_| "config.toml".to_string());
        let mut cfg = if std::path::Path::new(&path).exists() {
            load_from_file(&path)?
        } else {
            AppConfig::default()
        };
        cfg.normalize_and_validate()?;
        Ok(cfg)
    }

    pub fn normalize_and_validate(&mut self) -> Result<()> {
        self.catalog.normalize_from_env();
        self.catalog.validate()?;
        self.storage.validate()?;
        self.retry.validate()?;
        Ok(())
    }
}

impl CatalogConfig {
    pub fn normalize_from_env(&mut self) {
        if let Ok(ns) = std::env::var("TIER_NAMESPACE") {
            if !ns.trim().is_empty() { self.namespace = ns; }
        }
        if let Ok(name) = std::env::var("TIER_CONFIG_NAME") {
            if !name.trim().is_empty() { self.name = name; }
        }
        self.namespace = self.namespace.trim().to_string();
        self.name = self.name.trim().to_string();
        self.data_key = self.data_key.trim().to_string();
    }

    pub fn validate(&self) -> Result<()> {
        if self.namespace.is_empty() {
            return Err(anyhow!(
                "catalog.namespace must not be empty; set it in config.toml or TIER_NAMESPACE"
            ));
        }
        if self.name.is_empty() {
            return Err(anyhow!(
                "catalog.name must not be empty; set it in config.toml or TIER_CONFIG_NAME"
            ));
        }
        if self.data_key.is_empty() {
            return Err(anyhow!("catalog.data_key must not be empty"));
        }
        Ok(())
    }
}

impl StorageConfig {
    pub fn validate(&self) -> Result<()> {
        if self.backend == StorageBackend::File && self.path.trim().is_empty() {
            return Err(anyhow!("storage.path is required for the file backend"));
        }
        Ok(())
    }
}

impl RetryConfig {
    pub fn validate(&self) -> Result<()> {
        if self.max_attempts == 0 {
            return Err(anyhow!("retry.max_attempts must be >= 1"));
        }
        if self.backoff_max_ms < self.backoff_base_ms {
            return Err(anyhow!("retry.backoff_max_ms must be >= backoff_base_ms"));
        }
        Ok(())
    }
}
