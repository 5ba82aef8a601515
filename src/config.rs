use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

const DEFAULT_BASE_URL: &str = "https://router.huggingface.co/v1";
const DEFAULT_MODEL: &str = "openai/gpt-oss-20b:groq";
const DEFAULT_PYNGUIN_BIN: &str = "pynguin";

/// Startup configuration, resolved once from the environment and injected
/// into the app state. `.env` files are honored via dotenvy in main.
#[derive(Debug, Clone)]
pub struct Config {
    pub hf_token: String,
    pub hf_base_url: String,
    pub model: String,
    pub pynguin_bin: String,
    pub port: u16,
    pub task_ttl: Duration,
    pub queue_capacity: usize,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("HF_TOKEN is not set; the AI test generation endpoint requires a HuggingFace token")]
    MissingToken,
    #[error("invalid value {value:?} for {var}")]
    InvalidValue { var: &'static str, value: String },
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let hf_token = std::env::var("HF_TOKEN")
            .ok()
            .filter(|token| !token.trim().is_empty())
            .ok_or(ConfigError::MissingToken)?;

        Ok(Config {
            hf_token,
            hf_base_url: env_or("HF_BASE_URL", DEFAULT_BASE_URL),
            model: env_or("HF_MODEL", DEFAULT_MODEL),
            pynguin_bin: env_or("PYNGUIN_BIN", DEFAULT_PYNGUIN_BIN),
            port: parse_var("PORT", 3001)?,
            task_ttl: Duration::from_secs(parse_var("TASK_TTL_SECS", 600)?),
            queue_capacity: parse_var("TASK_QUEUE_CAPACITY", 1024)?,
        })
    }
}

fn env_or(var: &str, default: &str) -> String {
    std::env::var(var).unwrap_or_else(|_| default.to_string())
}

fn parse_var<T: FromStr>(var: &'static str, default: T) -> Result<T, ConfigError> {
    match std::env::var(var) {
        Ok(value) => value
            .parse()
            .map_err(|_| ConfigError::InvalidValue { var, value }),
        Err(_) => Ok(default),
    }
}
