// src/config.rs

use std::{env, fmt};

use dotenvy::dotenv;

/// Tunables for the analytics rollup.
/// Built once at startup and handed to every consumer through `AppState`.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalyticsSettings {
    /// How many submissions the "recent" feed shows.
    pub recent_submissions_limit: usize,
    /// How many questions the per-question table covers.
    pub question_analysis_limit: usize,
}

impl Default for AnalyticsSettings {
    fn default() -> Self {
        Self {
            recent_submissions_limit: 5,
            question_analysis_limit: 20,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub rust_log: String,
    pub bind_addr: String,
    pub cors_origins: Vec<String>,
    pub analytics: AnalyticsSettings,
}

#[derive(Debug)]
pub enum ConfigError {
    Missing(&'static str),
    Invalid { key: &'static str, value: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Missing(key) => write!(f, "{} must be set", key),
            ConfigError::Invalid { key, value } => write!(f, "{} has an invalid value: '{}'", key, value),
        }
    }
}

impl std::error::Error for ConfigError {}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv().ok();

        let database_url = required("DATABASE_URL")?;
        let jwt_secret = required("JWT_SECRET")?;

        let rust_log = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
        let bind_addr = env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string());

        let cors_origins = env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:3000".to_string())
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();

        let defaults = AnalyticsSettings::default();
        let analytics = AnalyticsSettings {
            recent_submissions_limit: parse_or("ANALYTICS_RECENT_LIMIT", defaults.recent_submissions_limit)?,
            question_analysis_limit: parse_or("ANALYTICS_QUESTION_LIMIT", defaults.question_analysis_limit)?,
        };

        Ok(Self {
            database_url,
            jwt_secret,
            rust_log,
            bind_addr,
            cors_origins,
            analytics,
        })
    }
}

fn required(key: &'static str) -> Result<String, ConfigError> {
    env::var(key).map_err(|_| ConfigError::Missing(key))
}

fn parse_or(key: &'static str, default: usize) -> Result<usize, ConfigError> {
    match env::var(key) {
        Ok(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { key, value }),
        Err(_) => Ok(default),
    }
}
