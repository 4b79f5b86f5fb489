use crate::domain::error::{AppError, Result};
use crate::domain::llm_config::{LLMConfig, DEFAULT_GEMINI_BASE_URL, DEFAULT_GEMINI_MODEL};
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const CONFIG_FILE: &str = "sheetlens.toml";
pub const ENV_PREFIX: &str = "SHEETLENS_";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GeminiSettings {
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for GeminiSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_GEMINI_MODEL.to_string(),
            base_url: DEFAULT_GEMINI_BASE_URL.to_string(),
            temperature: 0.7,
            max_tokens: 2048,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub database_path: PathBuf,
    pub schema_path: PathBuf,
    pub uploads_dir: PathBuf,
    pub max_upload_bytes: usize,
    pub log_filter: String,
    pub gemini: GeminiSettings,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
            database_path: PathBuf::from("data/sheetlens.db"),
            schema_path: PathBuf::from("resources/schema.sql"),
            uploads_dir: PathBuf::from("uploads"),
            max_upload_bytes: 50 * 1024 * 1024,
            log_filter: "info,sqlx=warn".to_string(),
            gemini: GeminiSettings::default(),
        }
    }
}

impl AppConfig {
    /// Defaults, then `sheetlens.toml`, then `SHEETLENS_*` variables
    /// (`__` nests, e.g. `SHEETLENS_GEMINI__MODEL`), then the bare
    /// `GEMINI_API_KEY` / `GEMINI_MODEL` variables.
    pub fn figment() -> Figment {
        Figment::from(Serialized::defaults(AppConfig::default()))
            .merge(Toml::file(CONFIG_FILE))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .merge(Env::raw().filter_map(|key| {
                if key.as_str().eq_ignore_ascii_case("GEMINI_API_KEY") {
                    Some("gemini.api_key".into())
                } else if key.as_str().eq_ignore_ascii_case("GEMINI_MODEL") {
                    Some("gemini.model".into())
                } else {
                    None
                }
            }))
    }

    pub fn extract(figment: &Figment) -> Result<Self> {
        figment
            .extract()
            .map_err(|e| AppError::Config(format!("Failed to load configuration: {}", e)))
    }

    /// Load `.env` if present, then resolve the layered configuration.
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::extract(&Self::figment())
    }

    pub fn llm_config(&self) -> LLMConfig {
        LLMConfig {
            base_url: self.gemini.base_url.clone(),
            model: self.gemini.model.clone(),
            api_key: self.gemini.api_key.clone(),
            max_tokens: Some(self.gemini.max_tokens),
            temperature: Some(self.gemini.temperature),
        }
    }
}
