use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct MapperConfig {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub ocr: OcrConfig,
    pub llm: LlmConfig,
    pub candidates: CandidatesConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub max_upload_bytes: usize,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct StorageConfig {
    pub data_dir: String,
    pub mappings_file: String,
    pub lists_dir: String,
    pub default_customer: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct OcrConfig {
    pub endpoint: String,
    pub api_key: Option<String>,
    pub pdf_max_pages: usize,
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LlmConfig {
    pub base_url: String,
    pub model: String,
    pub api_key: Option<String>,
    pub temperature: f64,
    pub mode: SuggestMode,
    pub memory_examples: usize,
    pub timeout_secs: u64,
}

/// How unmatched items are sent to the language model.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum SuggestMode {
    /// One completion call for every unmatched item on the invoice.
    #[default]
    Batch,
    /// One call per item; a failed call only affects that item.
    PerItem,
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct CandidatesConfig {
    /// Fallback list used for customers that never uploaded their own.
    pub default_list: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 5000,
            log_level: "info".into(),
            max_upload_bytes: 32 * 1024 * 1024,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_mapper_dir().to_string_lossy().into_owned(),
            mappings_file: "confirmed_mappings.json".into(),
            lists_dir: "lists".into(),
            default_customer: "default".into(),
        }
    }
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://vision.googleapis.com/v1".into(),
            api_key: None,
            pdf_max_pages: 5,
            timeout_secs: 60,
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".into(),
            model: "gpt-4o-mini".into(),
            api_key: None,
            temperature: 0.0,
            mode: SuggestMode::Batch,
            memory_examples: 50,
            timeout_secs: 120,
        }
    }
}

/// Returns `~/.invoice-mapper/`, or `./.invoice-mapper/` when there is no home directory.
pub fn default_mapper_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".invoice-mapper")
}

/// Returns the default config file path: `~/.invoice-mapper/config.toml`
pub fn default_config_path() -> PathBuf {
    default_mapper_dir().join("config.toml")
}

impl MapperConfig {
    /// Load config from TOML file (if it exists) then apply env var overrides.
    pub fn load() -> Result<Self> {
        Self::load_from(default_config_path())
    }

    /// Load from a specific path, then apply env var overrides.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            let contents =
                std::fs::read_to_string(path).context("failed to read config file")?;
            toml::from_str(&contents).context("failed to parse config TOML")?
        } else {
            info!("no config file at {}, using defaults", path.display());
            MapperConfig::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("INVOICE_MAPPER_DATA_DIR") {
            self.storage.data_dir = val;
        }
        if let Ok(val) = std::env::var("INVOICE_MAPPER_CUSTOMER") {
            self.storage.default_customer = val;
        }
        if let Ok(val) = std::env::var("INVOICE_MAPPER_LOG_LEVEL") {
            self.server.log_level = val;
        }
        if let Ok(val) = std::env::var("DEFAULT_MODEL") {
            self.llm.model = val;
        }
        if let Ok(val) = std::env::var("OPENAI_API_KEY") {
            self.llm.api_key = Some(val);
        }
        if let Ok(val) = std::env::var("GOOGLE_VISION_API_KEY") {
            self.ocr.api_key = Some(val);
        }
    }

    pub fn resolved_data_dir(&self) -> PathBuf {
        expand_tilde(&self.storage.data_dir)
    }

    /// Path of the confirmed-mappings JSON file.
    pub fn resolved_mappings_path(&self) -> PathBuf {
        self.resolved_data_dir().join(&self.storage.mappings_file)
    }

    /// Directory holding one candidate list file per customer.
    pub fn resolved_lists_dir(&self) -> PathBuf {
        self.resolved_data_dir().join(&self.storage.lists_dir)
    }
}

pub fn expand_tilde(path: &str) -> PathBuf {
    match (path.strip_prefix("~/"), dirs::home_dir()) {
        (Some(rest), Some(home)) => home.join(rest),
        _ => PathBuf::from(path),
    }
}
