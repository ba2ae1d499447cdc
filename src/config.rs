use crate::proxy::PayloadVariant;
use std::env;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Default upstream API root.
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
/// Default model used for response generation.
pub const DEFAULT_MODEL: &str = "gpt-4.1-mini";
/// Default vector store name used for discovery and creation.
pub const DEFAULT_VECTOR_STORE_NAME: &str = "bullz-vector-store";
const DEFAULT_MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

/// Errors encountered while loading configuration from environment variables.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Required environment variable was not provided.
    #[error("Missing environment variable: {0}")]
    MissingVariable(String),
    /// Environment variable contained a value that could not be parsed.
    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(String),
    /// The `.env` file named on the command line could not be read.
    #[error("Failed to load env file {path}: {reason}")]
    EnvFile {
        /// Path that was requested.
        path: String,
        /// Loader error message.
        reason: String,
    },
}

/// Runtime configuration for the proxy. Built once at startup and shared read-only.
#[derive(Debug, Clone)]
pub struct Config {
    /// Bearer key attached to every upstream call.
    pub openai_api_key: String,
    /// Secret callers must present in `X-Action-Secret`.
    pub action_shared_secret: String,
    /// Root URL of the upstream API, without a trailing slash.
    pub openai_base_url: String,
    /// Model used by the response-generation endpoint.
    pub openai_model: String,
    /// Pre-provisioned vector store id. When absent the store is discovered by name.
    pub vector_store_id: Option<String>,
    /// Vector store name used for discovery and creation.
    pub vector_store_name: String,
    /// Origins allowed by CORS. A single `*` allows any origin.
    pub allowed_origins: Vec<String>,
    /// Ordered fallback list of search payload shapes.
    pub search_variants: Vec<PayloadVariant>,
    /// Timeouts applied to upstream calls.
    pub timeouts: UpstreamTimeouts,
    /// Largest accepted inbound request body, in bytes.
    pub max_upload_bytes: usize,
    /// Optional override for the HTTP server port.
    pub server_port: Option<u16>,
}

/// Per-operation upstream timeouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpstreamTimeouts {
    /// File creation; payloads may be large.
    pub upload: Duration,
    /// Attach, tagging, and vector store management.
    pub attach: Duration,
    /// Response generation.
    pub response: Duration,
}

impl Default for UpstreamTimeouts {
    fn default() -> Self {
        Self {
            upload: Duration::from_secs(300),
            attach: Duration::from_secs(120),
            response: Duration::from_secs(60),
        }
    }
}

impl Config {
    /// Load configuration from process environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup, performing validation along the way.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let require = |key: &str| get(key).ok_or_else(|| ConfigError::MissingVariable(key.into()));
        let timeouts = UpstreamTimeouts::default();

        Ok(Self {
            openai_api_key: require("OPENAI_API_KEY")?,
            action_shared_secret: require("ACTION_SHARED_SECRET")?,
            openai_base_url: get("OPENAI_BASE_URL")
                .map(|value| value.trim().trim_end_matches('/').to_string())
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            openai_model: get("OPENAI_MODEL")
                .or_else(|| get("SEARCH_MODEL"))
                .unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            vector_store_id: get("VECTOR_STORE_ID").map(|value| value.trim().to_string()),
            vector_store_name: get("VECTOR_STORE_NAME")
                .map(|value| value.trim().to_string())
                .unwrap_or_else(|| DEFAULT_VECTOR_STORE_NAME.to_string()),
            allowed_origins: parse_list(get("ALLOWED_ORIGINS").as_deref().unwrap_or("*")),
            search_variants: match get("SEARCH_PAYLOAD_VARIANTS") {
                Some(raw) => parse_variants(&raw)?,
                None => PayloadVariant::DEFAULT_ORDER.to_vec(),
            },
            timeouts: UpstreamTimeouts {
                upload: parse_secs(get("UPLOAD_TIMEOUT_SECS"), "UPLOAD_TIMEOUT_SECS")?
                    .unwrap_or(timeouts.upload),
                attach: parse_secs(get("ATTACH_TIMEOUT_SECS"), "ATTACH_TIMEOUT_SECS")?
                    .unwrap_or(timeouts.attach),
                response: parse_secs(get("RESPONSE_TIMEOUT_SECS"), "RESPONSE_TIMEOUT_SECS")?
                    .unwrap_or(timeouts.response),
            },
            max_upload_bytes: get("MAX_UPLOAD_BYTES")
                .map(|value| {
                    value
                        .trim()
                        .parse()
                        .map_err(|_| ConfigError::InvalidValue("MAX_UPLOAD_BYTES".into()))
                })
                .transpose()?
                .unwrap_or(DEFAULT_MAX_UPLOAD_BYTES),
            server_port: get("SERVER_PORT")
                .map(|value| ("SERVER_PORT", value))
                .or_else(|| get("PORT").map(|value| ("PORT", value)))
                .map(|(key, value)| {
                    value
                        .trim()
                        .parse()
                        .map_err(|_| ConfigError::InvalidValue(key.into()))
                })
                .transpose()?,
        })
    }

    /// Whether CORS should accept any origin.
    pub fn allows_any_origin(&self) -> bool {
        self.allowed_origins.iter().any(|origin| origin == "*")
    }
}

fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_variants(raw: &str) -> Result<Vec<PayloadVariant>, ConfigError> {
    let mut variants = Vec::new();
    for name in parse_list(raw) {
        let variant: PayloadVariant = name
            .parse()
            .map_err(|()| ConfigError::InvalidValue(format!("SEARCH_PAYLOAD_VARIANTS ({name})")))?;
        if !variants.contains(&variant) {
            variants.push(variant);
        }
    }
    if variants.is_empty() {
        return Err(ConfigError::InvalidValue("SEARCH_PAYLOAD_VARIANTS".into()));
    }
    Ok(variants)
}

fn parse_secs(value: Option<String>, key: &str) -> Result<Option<Duration>, ConfigError> {
    value
        .map(|raw| match raw.trim().parse::<u64>() {
            Ok(secs) if secs > 0 => Ok(Duration::from_secs(secs)),
            _ => Err(ConfigError::InvalidValue(key.to_string())),
        })
        .transpose()
}

/// Populate the process environment from a `.env` file.
///
/// An explicit path must exist; the implicit `./.env` lookup is best-effort.
pub fn load_dotenv(path: Option<&Path>) -> Result<(), ConfigError> {
    match path {
        Some(path) => dotenvy::from_path(path)
            .map(|_| ())
            .map_err(|err| ConfigError::EnvFile {
                path: path.display().to_string(),
                reason: err.to_string(),
            }),
        None => {
            dotenvy::dotenv().ok();
            Ok(())
        }
    }
}

/// Load configuration from the environment and log the non-secret parts of it.
pub fn init_config() -> Result<Config, ConfigError> {
    let config = Config::from_env()?;
    tracing::debug!(
        base_url = %config.openai_base_url,
        model = %config.openai_model,
        vector_store_id = ?config.vector_store_id,
        vector_store_name = %config.vector_store_name,
        allowed_origins = ?config.allowed_origins,
        search_variants = ?config.search_variants,
        server_port = ?config.server_port,
        "Loaded configuration"
    );
    Ok(config)
}
