use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::ConfigError;

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8000/api/v1";

#[derive(Debug, Clone)]
pub struct Config {
    pub api_base_url: String,
    pub credentials_path: PathBuf,
    pub request_timeout: Duration,
    pub message_poll_interval: Duration,
    pub simulator_tick: Duration,
    pub connect_attempts: u32,
    pub connect_retry: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            credentials_path: default_credentials_path(),
            request_timeout: Duration::from_secs(10),
            message_poll_interval: Duration::from_secs(15),
            simulator_tick: Duration::from_secs(2),
            connect_attempts: 5,
            connect_retry: Duration::from_secs(5),
        }
    }
}

impl Config {
    /// Reads the process environment. Call `dotenv().ok()` first to pick up a `.env` file.
    pub fn from_env() -> Result<Config, ConfigError> {
        Config::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Config, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Config::default();

        if let Some(url) = lookup("API_BASE_URL") {
            config.api_base_url = url.trim_end_matches('/').to_string();
        }
        if let Some(path) = lookup("CREDENTIALS_PATH") {
            config.credentials_path = PathBuf::from(path);
        }
        if let Some(secs) = number(&lookup, "REQUEST_TIMEOUT_SECS")? {
            config.request_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = number(&lookup, "MESSAGE_POLL_SECS")? {
            config.message_poll_interval = Duration::from_secs(secs);
        }
        if let Some(secs) = number(&lookup, "SIMULATOR_TICK_SECS")? {
            config.simulator_tick = Duration::from_secs(secs);
        }
        if let Some(n) = number(&lookup, "CONNECT_ATTEMPTS")? {
            config.connect_attempts = n as u32;
        }
        if let Some(secs) = number(&lookup, "CONNECT_RETRY_SECS")? {
            config.connect_retry = Duration::from_secs(secs);
        }

        Ok(config)
    }
}

fn number<F>(lookup: &F, name: &'static str) -> Result<Option<u64>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(name) {
        None => Ok(None),
        Some(value) => match value.trim().parse::<u64>() {
            Ok(n) if n > 0 && n <= u32::MAX as u64 => Ok(Some(n)),
            _ => Err(ConfigError::InvalidNumber { name, value }),
        },
    }
}

fn default_credentials_path() -> PathBuf {
    match env::var_os("HOME") {
        Some(home) => PathBuf::from(home).join(".remote-health").join("credentials.json"),
        None => PathBuf::from(".remote-health-credentials.json"),
    }
}
