use serde::Deserialize;
use std::env;
use std::sync::OnceLock;
use thiserror::Error;

/// Default HTTP port when neither `PORT` nor `SERVER_PORT` is set.
pub const DEFAULT_PORT: u16 = 5000;
const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";
const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-flash-lite";
const DEFAULT_OLLAMA_URL: &str = "http://127.0.0.1:11434";
const DEFAULT_OLLAMA_MODEL: &str = "llama3.2";
const DEFAULT_TESSERACT_CMD: &str = "tesseract";
const DEFAULT_GENERATION_TIMEOUT_SECS: u64 = 60;
const DEFAULT_OCR_TIMEOUT_SECS: u64 = 120;

/// Errors encountered while loading configuration from environment variables.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Required environment variable was not provided.
    #[error("Missing environment variable: {0}")]
    MissingVariable(String),
    /// Environment variable contained a value that could not be parsed.
    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(String),
}

/// Runtime configuration for the summarization server.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Backend used to turn directives into summaries.
    pub generation_provider: GenerationProvider,
    /// Credential for the Gemini API; required when the provider is Gemini.
    pub gemini_api_key: Option<String>,
    /// Base URL of the Gemini REST API.
    pub gemini_base_url: String,
    /// Base URL of a local Ollama runtime.
    pub ollama_url: String,
    /// Model identifier passed to the generation provider.
    pub generation_model: String,
    /// Upper bound on a single generation call.
    pub generation_timeout_secs: u64,
    /// Executable used for optical character recognition.
    pub tesseract_cmd: String,
    /// Upper bound on a single OCR recognition.
    pub ocr_timeout_secs: u64,
    /// Optional override for the HTTP server port.
    pub server_port: Option<u16>,
}

/// Supported text-generation backends.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GenerationProvider {
    /// Hosted Google Gemini API.
    Gemini,
    /// Local Ollama runtime.
    Ollama,
}

impl Config {
    /// Load configuration from environment variables, performing validation along the way.
    pub fn from_env() -> Result<Self, ConfigError> {
        let generation_provider = match load_env_optional("GENERATION_PROVIDER") {
            Some(value) => value
                .parse()
                .map_err(|()| ConfigError::InvalidValue("GENERATION_PROVIDER".to_string()))?,
            None => GenerationProvider::Gemini,
        };
        let default_model = match generation_provider {
            GenerationProvider::Gemini => DEFAULT_GEMINI_MODEL,
            GenerationProvider::Ollama => DEFAULT_OLLAMA_MODEL,
        };

        Ok(Self {
            generation_provider,
            gemini_api_key: load_env_optional("GEMINI_API_KEY"),
            gemini_base_url: load_env_optional("GEMINI_BASE_URL")
                .unwrap_or_else(|| DEFAULT_GEMINI_BASE_URL.to_string()),
            ollama_url: load_env_optional("OLLAMA_URL")
                .unwrap_or_else(|| DEFAULT_OLLAMA_URL.to_string()),
            generation_model: load_env_optional("GENERATION_MODEL")
                .unwrap_or_else(|| default_model.to_string()),
            generation_timeout_secs: parse_optional("GENERATION_TIMEOUT_SECS")?
                .unwrap_or(DEFAULT_GENERATION_TIMEOUT_SECS),
            tesseract_cmd: load_env_optional("TESSERACT_CMD")
                .unwrap_or_else(|| DEFAULT_TESSERACT_CMD.to_string()),
            ocr_timeout_secs: parse_optional("OCR_TIMEOUT_SECS")?
                .unwrap_or(DEFAULT_OCR_TIMEOUT_SECS),
            server_port: match parse_optional("PORT")? {
                Some(port) => Some(port),
                None => parse_optional("SERVER_PORT")?,
            },
        })
    }

    /// Return the Gemini credential or the error explaining why it is required.
    pub fn require_gemini_api_key(&self) -> Result<&str, ConfigError> {
        self.gemini_api_key
            .as_deref()
            .ok_or_else(|| ConfigError::MissingVariable("GEMINI_API_KEY".to_string()))
    }
}

fn load_env_optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_optional<T: std::str::FromStr>(key: &str) -> Result<Option<T>, ConfigError> {
    load_env_optional(key)
        .map(|value| {
            value
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidValue(key.to_string()))
        })
        .transpose()
}

impl std::str::FromStr for GenerationProvider {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "gemini" => Ok(Self::Gemini),
            "ollama" => Ok(Self::Ollama),
            _ => Err(()),
        }
    }
}

/// Global configuration cache populated during process start.
pub static CONFIG: OnceLock<Config> = OnceLock::new();

/// Retrieve the loaded configuration, panicking if initialization has not occurred.
pub fn get_config() -> &'static Config {
    CONFIG.get().expect("Config not initialized")
}

/// Load configuration from the environment and install it in the global cache.
///
/// Calling this more than once keeps the first configuration.
pub fn init_config() -> Result<(), ConfigError> {
    dotenvy::dotenv().ok();
    let config = Config::from_env()?;
    tracing::debug!(
        provider = ?config.generation_provider,
        model = %config.generation_model,
        gemini_key_present = config.gemini_api_key.is_some(),
        tesseract = %config.tesseract_cmd,
        server_port = ?config.server_port,
        "Loaded configuration"
    );
    if CONFIG.set(config).is_err() {
        tracing::debug!("Configuration already initialized");
    }
    Ok(())
}
