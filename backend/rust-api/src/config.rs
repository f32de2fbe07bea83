use serde::Deserialize;
use std::env;

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8081";
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-1.5-flash";
pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_METRICS_AUTH: &str = "admin:changeme";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub bind_addr: String,
    pub gemini_api_key: Option<String>,
    pub gemini_model: String,
    pub gemini_base_url: String,
    pub youtube_api_key: Option<String>,
    pub google_search_api_key: Option<String>,
    pub google_search_engine_id: Option<String>,
    pub bing_search_api_key: Option<String>,
    pub serper_api_key: Option<String>,
    pub provider_timeout_secs: u64,
    pub redis_uri: Option<String>,
    pub metrics_auth: String,
    pub countdown_tick_interval_ms: u64,
}

impl Default for Config {
    /// Offline configuration: no credentials, in-memory deadline store.
    fn default() -> Self {
        Self {
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            gemini_api_key: None,
            gemini_model: DEFAULT_GEMINI_MODEL.to_string(),
            gemini_base_url: DEFAULT_GEMINI_BASE_URL.to_string(),
            youtube_api_key: None,
            google_search_api_key: None,
            google_search_engine_id: None,
            bing_search_api_key: None,
            serper_api_key: None,
            provider_timeout_secs: 10,
            redis_uri: None,
            metrics_auth: DEFAULT_METRICS_AUTH.to_string(),
            countdown_tick_interval_ms: 1000,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        dotenvy::dotenv().ok();

        // Determine environment (defaults to dev)
        let app_env = env::var("APP_ENV").unwrap_or_else(|_| "dev".to_string());

        // config/*.toml, then APP__* overrides
        let settings = config::Config::builder()
            .add_source(config::File::with_name(&format!("config/{}", app_env)).required(false))
            .add_source(config::Environment::with_prefix("APP").separator("__"))
            .build()?;

        let defaults = Config::default();
        let lookup = |key: &str, var: &str| -> Option<String> {
            settings
                .get_string(key)
                .ok()
                .or_else(|| env::var(var).ok())
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let provider_timeout_secs = match lookup("providers.timeout_secs", "PROVIDER_TIMEOUT_SECS")
        {
            Some(raw) => parse_positive(&raw, "PROVIDER_TIMEOUT_SECS")?,
            None => defaults.provider_timeout_secs,
        };

        let countdown_tick_interval_ms =
            match lookup("countdown.tick_interval_ms", "COUNTDOWN_TICK_INTERVAL_MS") {
                Some(raw) => parse_positive(&raw, "COUNTDOWN_TICK_INTERVAL_MS")?,
                None => defaults.countdown_tick_interval_ms,
            };

        let config = Config {
            bind_addr: lookup("server.bind_addr", "BIND_ADDR").unwrap_or(defaults.bind_addr),
            gemini_api_key: lookup("gemini.api_key", "GEMINI_API_KEY"),
            gemini_model: lookup("gemini.model", "GEMINI_MODEL").unwrap_or(defaults.gemini_model),
            gemini_base_url: lookup("gemini.base_url", "GEMINI_BASE_URL")
                .unwrap_or(defaults.gemini_base_url),
            youtube_api_key: lookup("search.youtube_api_key", "YOUTUBE_API_KEY"),
            google_search_api_key: lookup("search.google_api_key", "GOOGLE_SEARCH_API_KEY"),
            google_search_engine_id: lookup("search.google_engine_id", "GOOGLE_SEARCH_ENGINE_ID"),
            bing_search_api_key: lookup("search.bing_api_key", "BING_SEARCH_API_KEY"),
            serper_api_key: lookup("search.serper_api_key", "SERPER_API_KEY"),
            provider_timeout_secs,
            redis_uri: lookup("redis.uri", "REDIS_URI"),
            metrics_auth: lookup("metrics.auth", "METRICS_AUTH").unwrap_or(defaults.metrics_auth),
            countdown_tick_interval_ms,
        };

        if config.gemini_api_key.is_none() {
            tracing::warn!("GEMINI_API_KEY not set, every generation call will use fallbacks");
        }

        Ok(config)
    }
}

fn parse_positive(raw: &str, name: &str) -> Result<u64, config::ConfigError> {
    match raw.parse::<u64>() {
        Ok(value) if value > 0 => Ok(value),
        _ => Err(config::ConfigError::Message(format!(
            "{} must be a positive integer, got '{}'",
            name, raw
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const VARS: &[&str] = &[
        "GEMINI_API_KEY",
        "YOUTUBE_API_KEY",
        "PROVIDER_TIMEOUT_SECS",
        "BIND_ADDR",
        "REDIS_URI",
        "APP__SERVER__BIND_ADDR",
    ];

    fn clear() {
        for var in VARS {
            env::remove_var(var);
        }
    }

    #[test]
    #[serial]
    fn empty_credentials_count_as_missing() {
        clear();
        env::set_var("GEMINI_API_KEY", "   ");
        env::set_var("YOUTUBE_API_KEY", "");

        let config = Config::load().unwrap();
        assert!(config.gemini_api_key.is_none());
        assert!(config.youtube_api_key.is_none());
        clear();
    }

    #[test]
    #[serial]
    fn plain_env_vars_are_read() {
        clear();
        env::set_var("GEMINI_API_KEY", "key-123");
        env::set_var("PROVIDER_TIMEOUT_SECS", "3");
        env::set_var("REDIS_URI", "redis://127.0.0.1:6379/0");

        let config = Config::load().unwrap();
        assert_eq!(config.gemini_api_key.as_deref(), Some("key-123"));
        assert_eq!(config.provider_timeout_secs, 3);
        assert_eq!(config.redis_uri.as_deref(), Some("redis://127.0.0.1:6379/0"));
        clear();
    }

    #[test]
    #[serial]
    fn prefixed_override_wins() {
        clear();
        env::set_var("BIND_ADDR", "127.0.0.1:1");
        env::set_var("APP__SERVER__BIND_ADDR", "127.0.0.1:2");

        let config = Config::load().unwrap();
        assert_eq!(config.bind_addr, "127.0.0.1:2");
        clear();
    }

    #[test]
    #[serial]
    fn invalid_timeout_is_rejected() {
        clear();
        env::set_var("PROVIDER_TIMEOUT_SECS", "zero");
        assert!(Config::load().is_err());
        clear();
    }
}
