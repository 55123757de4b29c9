//! Layered configuration.
//!
//! Sources, later ones winning:
//! - Default values
//! - TOML file at `.docmill/settings.toml` (found by walking up from the current directory)
//! - Environment variables
//!
//! # Environment Variables
//!
//! Environment variables must be prefixed with `DOCMILL_` and use double
//! underscores to separate nested levels:
//! - `DOCMILL_CHUNKING__MAX_CHUNK_SIZE=800` sets `chunking.max_chunk_size`
//! - `DOCMILL_EMBEDDING__PROVIDER=local` sets `embedding.provider`
//! - `DOCMILL_PROCESSING__CONCURRENCY=2` sets `processing.concurrency`
//!
//! The OpenAI key is read from `OPENAI_API_KEY` and never written to disk.

use crate::documents::ChunkConfig;
use crate::embedding::DEFAULT_DIMENSION;
use crate::embedding::local::DEFAULT_LOCAL_MODEL;
use crate::embedding::openai::{DEFAULT_BASE_URL, DEFAULT_MODEL};
use crate::extraction::{DEFAULT_SCHEMAS, ExtractionOptions};
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};

pub const CONFIG_DIR: &str = ".docmill";
pub const CONFIG_FILE: &str = "settings.toml";
pub const ENV_PREFIX: &str = "DOCMILL_";

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Settings {
    /// Version of the configuration schema
    #[serde(default = "default_version")]
    pub version: u32,

    /// Directory containing `.docmill`; relative paths resolve against it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workspace_root: Option<PathBuf>,

    #[serde(default)]
    pub chunking: ChunkConfig,

    #[serde(default)]
    pub extraction: ExtractionSettings,

    #[serde(default)]
    pub schemas: SchemaSettings,

    #[serde(default)]
    pub embedding: EmbeddingSettings,

    #[serde(default)]
    pub storage: StorageSettings,

    #[serde(default)]
    pub processing: ProcessingSettings,

    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct ExtractionSettings {
    #[serde(flatten)]
    pub options: ExtractionOptions,

    /// Schemas applied when a command names none
    #[serde(default = "default_schemas")]
    pub default_schemas: Vec<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct SchemaSettings {
    /// Root of `registry.toml`, `schemas-vocab/`, `schemas-core/` and `schemas-domains/`
    #[serde(default = "default_schema_dir")]
    pub dir: PathBuf,
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingProvider {
    #[default]
    OpenAi,
    Local,
    None,
}

impl fmt::Display for EmbeddingProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            EmbeddingProvider::OpenAi => "openai",
            EmbeddingProvider::Local => "local",
            EmbeddingProvider::None => "none",
        })
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct EmbeddingSettings {
    #[serde(default)]
    pub provider: EmbeddingProvider,

    /// Model for the OpenAI-compatible endpoint
    #[serde(default = "default_openai_model")]
    pub model: String,

    /// fastembed model for the local provider
    #[serde(default = "default_local_model")]
    pub local_model: String,

    /// Required vector length; vectors of any other length are rejected
    #[serde(default = "default_dimension")]
    pub dimension: usize,

    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_max_retries")]
    pub max_retries: usize,

    /// Where local models are cached
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_dir: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct StorageSettings {
    #[serde(default = "default_index_path")]
    pub index_path: PathBuf,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct ProcessingSettings {
    /// Files above this many bytes are rejected
    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64,

    /// Documents processed at once
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    #[serde(default = "default_document_timeout_secs")]
    pub document_timeout_secs: u64,
}

/// Log levels: a default plus per-target overrides (`cli = "debug"`).
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub default: String,

    #[serde(default)]
    pub modules: BTreeMap<String, String>,
}

// Default value functions
fn default_version() -> u32 {
    1
}
fn default_schemas() -> Vec<String> {
    DEFAULT_SCHEMAS.iter().map(|s| s.to_string()).collect()
}
fn default_schema_dir() -> PathBuf {
    PathBuf::from("schemas")
}
fn default_openai_model() -> String {
    DEFAULT_MODEL.to_string()
}
fn default_local_model() -> String {
    DEFAULT_LOCAL_MODEL.to_string()
}
fn default_dimension() -> usize {
    DEFAULT_DIMENSION
}
fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_max_retries() -> usize {
    3
}
fn default_index_path() -> PathBuf {
    PathBuf::from(".docmill/index")
}
fn default_max_file_size() -> u64 {
    50 * 1024 * 1024
}
fn default_concurrency() -> usize {
    num_cpus::get()
}
fn default_document_timeout_secs() -> u64 {
    300
}
fn default_log_level() -> String {
    "warn".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            version: default_version(),
            workspace_root: None,
            chunking: ChunkConfig::default(),
            extraction: ExtractionSettings::default(),
            schemas: SchemaSettings::default(),
            embedding: EmbeddingSettings::default(),
            storage: StorageSettings::default(),
            processing: ProcessingSettings::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for ExtractionSettings {
    fn default() -> Self {
        Self {
            options: ExtractionOptions::default(),
            default_schemas: default_schemas(),
        }
    }
}

impl Default for SchemaSettings {
    fn default() -> Self {
        Self {
            dir: default_schema_dir(),
        }
    }
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            provider: EmbeddingProvider::default(),
            model: default_openai_model(),
            local_model: default_local_model(),
            dimension: default_dimension(),
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
            max_retries: default_max_retries(),
            cache_dir: None,
        }
    }
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            index_path: default_index_path(),
        }
    }
}

impl Default for ProcessingSettings {
    fn default() -> Self {
        Self {
            max_file_size: default_max_file_size(),
            concurrency: default_concurrency(),
            document_timeout_secs: default_document_timeout_secs(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            default: default_log_level(),
            modules: BTreeMap::new(),
        }
    }
}

impl Settings {
    /// Load configuration from all sources
    pub fn load() -> Result<Self, Box<figment::Error>> {
        let config_path = Self::find_workspace_config()
            .unwrap_or_else(|| PathBuf::from(CONFIG_DIR).join(CONFIG_FILE));

        Self::figment(&config_path)
            .extract()
            .map_err(Box::new)
            .map(|mut settings: Settings| {
                if settings.workspace_root.is_none() {
                    settings.workspace_root = Self::workspace_root();
                }
                settings
            })
    }

    /// Load configuration from a specific file, still honoring environment overrides
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, Box<figment::Error>> {
        Self::figment(path.as_ref()).extract().map_err(Box::new)
    }

    fn figment(config_path: &Path) -> Figment {
        Figment::new()
            .merge(Serialized::defaults(Settings::default()))
            .merge(Toml::file(config_path))
            // Double underscore separates nesting levels; single underscores stay in field names
            .merge(Env::prefixed(ENV_PREFIX).map(|key| {
                key.as_str().to_lowercase().replace("__", ".").into()
            }))
    }

    /// Find `.docmill/settings.toml` from the current directory up to root
    fn find_workspace_config() -> Option<PathBuf> {
        Self::workspace_root().map(|root| root.join(CONFIG_DIR).join(CONFIG_FILE))
    }

    /// Get the workspace root directory (where .docmill is located)
    pub fn workspace_root() -> Option<PathBuf> {
        let current = std::env::current_dir().ok()?;

        current
            .ancestors()
            .find(|ancestor| ancestor.join(CONFIG_DIR).is_dir())
            .map(Path::to_path_buf)
    }

    /// Check if configuration is properly initialized
    pub fn check_init() -> Result<(), String> {
        let config_path = Self::find_workspace_config()
            .unwrap_or_else(|| PathBuf::from(CONFIG_DIR).join(CONFIG_FILE));

        if !config_path.exists() {
            return Err("No configuration file found".to_string());
        }

        match std::fs::read_to_string(&config_path) {
            Ok(content) => {
                if let Err(e) = toml::from_str::<Settings>(&content) {
                    return Err(format!(
                        "Configuration file is corrupted: {e}\nRun 'docmill init --force' to regenerate."
                    ));
                }
            }
            Err(e) => {
                return Err(format!("Cannot read configuration file: {e}"));
            }
        }

        Ok(())
    }

    /// Resolve a configured path against the workspace root
    pub fn resolve_path(&self, path: &Path) -> PathBuf {
        match &self.workspace_root {
            Some(root) if path.is_relative() => root.join(path),
            _ => path.to_path_buf(),
        }
    }

    pub fn schema_dir(&self) -> PathBuf {
        self.resolve_path(&self.schemas.dir)
    }

    pub fn index_path(&self) -> PathBuf {
        self.resolve_path(&self.storage.index_path)
    }

    /// Save current configuration to file, replacing it atomically
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), Box<dyn std::error::Error>> {
        let path = path.as_ref();
        let parent = path.parent().ok_or("Invalid path")?;
        std::fs::create_dir_all(parent)?;

        let toml_string = toml::to_string_pretty(self)?;
        let mut file = tempfile::NamedTempFile::new_in(parent)?;
        file.write_all(toml_string.as_bytes())?;
        file.persist(path)?;

        Ok(())
    }

    /// Create a default settings file in the current directory
    pub fn init_config_file(force: bool) -> Result<PathBuf, Box<dyn std::error::Error>> {
        let config_path = PathBuf::from(CONFIG_DIR).join(CONFIG_FILE);

        if !force && config_path.exists() {
            return Err("Configuration file already exists. Use --force to overwrite".into());
        }

        let mut settings = Settings::default();
        if let Ok(current_dir) = std::env::current_dir() {
            settings.workspace_root = Some(current_dir);
        }

        settings.save(&config_path)?;
        Ok(config_path)
    }
}
