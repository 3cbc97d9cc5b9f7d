use std::env;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use anyhow::{anyhow, Context, Result};
use tracing::{info, warn};

use crate::services::response_normalizer::ScorePolicy;

pub const DEFAULT_OPENAI_MODEL: &str = "gpt-3.5-turbo";
pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_DATABASE_URL: &str = "sqlite:ats_checker.db?mode=rwc";

#[derive(Clone)]
pub struct Config {
    pub server_host: String,
    pub server_port: u16,
    pub max_file_size_mb: usize,
    pub max_concurrent_requests: usize,
    pub openai_api_key: String,
    pub openai_model: String,
    pub openai_base_url: String,
    pub completion_timeout_seconds: Option<u64>,
    pub completion_max_retries: u32,
    pub score_policy: ScorePolicy,
    pub database_url: String,
}

/// Output format of the tracing subscriber, read before `Config` so that
/// configuration loading itself is logged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

impl FromStr for LogFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pretty" | "text" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            other => Err(anyhow!("LOG_FORMAT must be 'pretty' or 'json', got '{}'", other)),
        }
    }
}

impl LogFormat {
    pub fn from_env() -> Result<Self> {
        match env::var("LOG_FORMAT") {
            Ok(val) => val.parse(),
            Err(_) => Ok(LogFormat::Pretty),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        info!("Loading configuration from environment variables");
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup. `from_env` is the
    /// production entry point; tests pass a map.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let openai_api_key = lookup("OPENAI_API_KEY")
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty())
            .context("Required environment variable 'OPENAI_API_KEY' is not set")?;

        // PORT is what PaaS hosts inject, so it wins over SERVER_PORT
        let server_port = match lookup("PORT") {
            Some(port) => Self::parse_value("PORT", &port, 5000),
            None => Self::parse_var(&lookup, "SERVER_PORT", 5000),
        };

        let score_policy = match lookup("SCORE_POLICY") {
            Some(val) => val
                .parse::<ScorePolicy>()
                .map_err(|e| anyhow!(e))
                .context("Failed to parse SCORE_POLICY")?,
            None => {
                info!("SCORE_POLICY not set, using default: {:?}", ScorePolicy::default());
                ScorePolicy::default()
            }
        };

        let completion_timeout_seconds = lookup("COMPLETION_TIMEOUT_SECONDS")
            .and_then(|val| match val.trim().parse::<u64>() {
                Ok(0) => None,
                Ok(secs) => Some(secs),
                Err(e) => {
                    warn!("Failed to parse COMPLETION_TIMEOUT_SECONDS: {} (completion calls will not time out)", e);
                    None
                }
            });

        let config = Config {
            server_host: lookup("SERVER_HOST").unwrap_or_else(|| {
                info!("SERVER_HOST not set, using default: 0.0.0.0");
                "0.0.0.0".to_string()
            }),
            server_port,
            max_file_size_mb: Self::parse_var(&lookup, "MAX_FILE_SIZE_MB", 10),
            max_concurrent_requests: Self::parse_var(&lookup, "MAX_CONCURRENT_REQUESTS", 100),
            openai_api_key,
            openai_model: lookup("OPENAI_MODEL")
                .filter(|model| !model.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_OPENAI_MODEL.to_string()),
            openai_base_url: lookup("OPENAI_BASE_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or_else(|| DEFAULT_OPENAI_BASE_URL.to_string()),
            completion_timeout_seconds,
            completion_max_retries: Self::parse_var(&lookup, "COMPLETION_MAX_RETRIES", 0),
            score_policy,
            database_url: lookup("DATABASE_URL").unwrap_or_else(|| {
                info!("DATABASE_URL not set, using default: {}", DEFAULT_DATABASE_URL);
                DEFAULT_DATABASE_URL.to_string()
            }),
        };

        config.validate()?;

        info!("Configuration loaded successfully: {:?}", config);
        Ok(config)
    }

    fn parse_var<F, T>(lookup: &F, var_name: &str, default: T) -> T
    where
        F: Fn(&str) -> Option<String>,
        T: FromStr + Copy + fmt::Debug,
        T::Err: fmt::Display,
    {
        match lookup(var_name) {
            Some(val) => Self::parse_value(var_name, &val, default),
            None => {
                info!("{} not set, using default: {:?}", var_name, default);
                default
            }
        }
    }

    fn parse_value<T>(var_name: &str, val: &str, default: T) -> T
    where
        T: FromStr + Copy + fmt::Debug,
        T::Err: fmt::Display,
    {
        match val.trim().parse() {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!("Failed to parse {}: {} (using default: {:?})", var_name, e, default);
                default
            }
        }
    }

    fn validate(&self) -> Result<()> {
        if self.server_port == 0 {
            return Err(anyhow!("SERVER_PORT must be greater than 0"));
        }
        if self.max_file_size_mb == 0 {
            return Err(anyhow!("MAX_FILE_SIZE_MB must be greater than 0"));
        }
        if self.max_concurrent_requests == 0 {
            return Err(anyhow!("MAX_CONCURRENT_REQUESTS must be greater than 0"));
        }
        if !self.openai_base_url.starts_with("http://") && !self.openai_base_url.starts_with("https://") {
            return Err(anyhow!("OPENAI_BASE_URL must be an http(s) URL"));
        }
        Ok(())
    }

    pub fn completion_timeout(&self) -> Option<Duration> {
        self.completion_timeout_seconds.map(Duration::from_secs)
    }
}

// Keeps the API key out of the startup log.
impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("server_host", &self.server_host)
            .field("server_port", &self.server_port)
            .field("max_file_size_mb", &self.max_file_size_mb)
            .field("max_concurrent_requests", &self.max_concurrent_requests)
            .field("openai_api_key", &"<redacted>")
            .field("openai_model", &self.openai_model)
            .field("openai_base_url", &self.openai_base_url)
            .field("completion_timeout_seconds", &self.completion_timeout_seconds)
            .field("completion_max_retries", &self.completion_max_retries)
            .field("score_policy", &self.score_policy)
            .field("database_url", &self.database_url)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults_apply_when_only_api_key_is_set() {
        let config = config_from(&[("OPENAI_API_KEY", "sk-test")]).unwrap();
        assert_eq!(config.server_host, "0.0.0.0");
        assert_eq!(config.server_port, 5000);
        assert_eq!(config.max_file_size_mb, 10);
        assert_eq!(config.openai_model, DEFAULT_OPENAI_MODEL);
        assert_eq!(config.openai_base_url, DEFAULT_OPENAI_BASE_URL);
        assert_eq!(config.completion_timeout_seconds, None);
        assert_eq!(config.completion_max_retries, 0);
        assert_eq!(config.score_policy, ScorePolicy::Reject);
    }

    #[test]
    fn test_missing_api_key_is_an_error() {
        assert!(config_from(&[]).is_err());
        assert!(config_from(&[("OPENAI_API_KEY", "  ")]).is_err());
    }

    #[test]
    fn test_port_env_wins_over_server_port() {
        let config = config_from(&[
            ("OPENAI_API_KEY", "sk-test"),
            ("SERVER_PORT", "8080"),
            ("PORT", "9090"),
        ])
        .unwrap();
        assert_eq!(config.server_port, 9090);
    }

    #[test]
    fn test_unparseable_number_falls_back_to_default() {
        let config = config_from(&[
            ("OPENAI_API_KEY", "sk-test"),
            ("MAX_FILE_SIZE_MB", "lots"),
            ("COMPLETION_TIMEOUT_SECONDS", "soon"),
        ])
        .unwrap();
        assert_eq!(config.max_file_size_mb, 10);
        assert_eq!(config.completion_timeout(), None);
    }

    #[test]
    fn test_zero_limits_are_rejected() {
        assert!(config_from(&[("OPENAI_API_KEY", "sk-test"), ("MAX_FILE_SIZE_MB", "0")]).is_err());
        assert!(config_from(&[("OPENAI_API_KEY", "sk-test"), ("MAX_CONCURRENT_REQUESTS", "0")]).is_err());
    }

    #[test]
    fn test_unknown_score_policy_is_rejected() {
        assert!(config_from(&[("OPENAI_API_KEY", "sk-test"), ("SCORE_POLICY", "round")]).is_err());
    }

    #[test]
    fn test_debug_output_redacts_api_key() {
        let config = config_from(&[("OPENAI_API_KEY", "sk-very-secret")]).unwrap();
        let rendered = format!("{:?}", config);
        assert!(!rendered.contains("sk-very-secret"));
        assert!(rendered.contains("<redacted>"));
    }

    #[test]
    fn test_log_format_parsing() {
        assert_eq!("json".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert_eq!("Pretty".parse::<LogFormat>().unwrap(), LogFormat::Pretty);
        assert!("xml".parse::<LogFormat>().is_err());
    }
}
