use std::env;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;
use crate::error::{AppError, Result};
use crate::prompt::SchemaVariant;

pub const DEFAULT_PORT: u16 = 5000;
pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

#[derive(Debug, Clone)]
pub struct Config {
    pub server_addr: SocketAddr,
    pub openai_api_key: String,
    pub openai_base_url: String,
    pub model: String,
    pub schema: SchemaVariant,
    pub fetch_timeout: Duration,
    pub completion_timeout: Duration,
    /// Development mode: verbose logging.
    pub debug: bool,
}

impl Config {
    /// Defaults for everything except the credential.
    pub fn new(openai_api_key: impl Into<String>) -> Self {
        Config {
            server_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), DEFAULT_PORT),
            openai_api_key: openai_api_key.into(),
            openai_base_url: DEFAULT_OPENAI_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            schema: SchemaVariant::Extended,
            fetch_timeout: Duration::from_secs(10),
            completion_timeout: Duration::from_secs(60),
            debug: false,
        }
    }

    pub fn load() -> Result<Self> {
        // Load environment variables from .env file if it exists
        dotenv::dotenv().ok();
        Config::from_lookup(|key| env::var(key).ok())
    }

    /// Builds a config from any key/value source.
    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let openai_api_key = get("OPENAI_API_KEY")
            .ok_or_else(|| AppError::Config("OPENAI_API_KEY not set".to_string()))?;
        if openai_api_key.trim().is_empty() {
            return Err(AppError::Config("OPENAI_API_KEY is empty".to_string()));
        }
        let mut config = Config::new(openai_api_key);

        let host = get("HOST").unwrap_or_else(|| "127.0.0.1".to_string());
        let port = match get("PORT") {
            Some(port) => port.parse::<u16>().map_err(|e| AppError::Config(format!("Invalid port: {}", e)))?,
            None => DEFAULT_PORT,
        };
        let ip = IpAddr::from_str(&host).map_err(|e| AppError::Config(format!("Invalid host address: {}", e)))?;
        config.server_addr = SocketAddr::new(ip, port);

        if let Some(base_url) = get("OPENAI_BASE_URL") {
            config.openai_base_url = base_url;
        }
        if let Some(model) = get("OPENAI_MODEL") {
            config.model = model;
        }
        if let Some(schema) = get("ANALYSIS_SCHEMA") {
            config.schema = schema.parse()?;
        }
        if let Some(secs) = parse_secs("FETCH_TIMEOUT_SECS", get("FETCH_TIMEOUT_SECS"))? {
            config.fetch_timeout = secs;
        }
        if let Some(secs) = parse_secs("COMPLETION_TIMEOUT_SECS", get("COMPLETION_TIMEOUT_SECS"))? {
            config.completion_timeout = secs;
        }
        config.debug = get("APP_ENV").is_some_and(|v| is_development(&v));

        Ok(config)
    }
}

fn parse_secs(key: &str, value: Option<String>) -> Result<Option<Duration>> {
    let Some(value) = value else {
        return Ok(None);
    };
    let secs = value
        .parse::<u64>()
        .map_err(|e| AppError::Config(format!("Invalid {}: {}", key, e)))?;
    if secs == 0 {
        return Err(AppError::Config(format!("{} must be at least 1", key)));
    }
    Ok(Some(Duration::from_secs(secs)))
}

fn is_development(mode: &str) -> bool {
    matches!(mode.trim().to_ascii_lowercase().as_str(), "development" | "dev" | "debug")
}
