// ABOUTME: Planner configuration loaded from environment variables
// ABOUTME: Validates timeouts, retry counts, language tags and export page geometry

use std::env;
use std::num::ParseIntError;
use std::time::Duration;

use thiserror::Error;
use tracing::info;

use crate::constants::*;

pub const DEFAULT_MODEL: &str = "claude-sonnet-4-20250514";
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;
pub const DEFAULT_RETRY_ATTEMPTS: u32 = 3;
pub const DEFAULT_LANGUAGE: &str = "auto";
pub const DEFAULT_PAGE_HEIGHT: usize = 60;
const MIN_PAGE_HEIGHT: usize = 10;

/// Language tags accepted by the language selector
pub const SUPPORTED_LANGUAGES: &[&str] = &["auto", "en", "hi", "kn", "ta", "te", "mr", "bn", "gu"];

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid number for {var}: {source}")]
    InvalidNumber {
        var: &'static str,
        #[source]
        source: ParseIntError,
    },
    #[error("{var} is out of range: {value}")]
    OutOfRange { var: &'static str, value: String },
    #[error("Unsupported language tag: {0}")]
    InvalidLanguage(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlannerConfig {
    pub api_key: Option<String>,
    pub api_url: Option<String>,
    pub model: String,
    pub request_timeout: Duration,
    pub retry_attempts: u32,
    pub language: String,
    pub page_height: usize,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_url: None,
            model: DEFAULT_MODEL.to_string(),
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            retry_attempts: DEFAULT_RETRY_ATTEMPTS,
            language: DEFAULT_LANGUAGE.to_string(),
            page_height: DEFAULT_PAGE_HEIGHT,
        }
    }
}

impl PlannerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a config from an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_key = lookup(ANTHROPIC_API_KEY).filter(|k| !k.trim().is_empty());
        if api_key.is_none() {
            info!("{} not set - backend calls will fail until a key is provided", ANTHROPIC_API_KEY);
        }

        let api_url = lookup(SEEDPLAN_API_URL).filter(|u| !u.trim().is_empty());

        let model = lookup(ANTHROPIC_MODEL).unwrap_or_else(|| DEFAULT_MODEL.to_string());
        if model != DEFAULT_MODEL {
            info!("Using custom model: {}", model);
        }

        let timeout_secs = parse_u64(&lookup, SEEDPLAN_REQUEST_TIMEOUT_SECS, DEFAULT_TIMEOUT_SECS)?;
        if timeout_secs == 0 {
            return Err(ConfigError::OutOfRange {
                var: SEEDPLAN_REQUEST_TIMEOUT_SECS,
                value: timeout_secs.to_string(),
            });
        }

        let retry_attempts = parse_u64(&lookup, SEEDPLAN_RETRY_ATTEMPTS, DEFAULT_RETRY_ATTEMPTS as u64)?;
        let retry_attempts = u32::try_from(retry_attempts).map_err(|_| ConfigError::OutOfRange {
            var: SEEDPLAN_RETRY_ATTEMPTS,
            value: retry_attempts.to_string(),
        })?;

        let language = lookup(SEEDPLAN_LANGUAGE)
            .map(|l| l.trim().to_lowercase())
            .unwrap_or_else(|| DEFAULT_LANGUAGE.to_string());
        if !SUPPORTED_LANGUAGES.contains(&language.as_str()) {
            return Err(ConfigError::InvalidLanguage(language));
        }

        let page_height = parse_u64(&lookup, SEEDPLAN_EXPORT_PAGE_HEIGHT, DEFAULT_PAGE_HEIGHT as u64)? as usize;
        if page_height < MIN_PAGE_HEIGHT {
            return Err(ConfigError::OutOfRange {
                var: SEEDPLAN_EXPORT_PAGE_HEIGHT,
                value: page_height.to_string(),
            });
        }

        Ok(PlannerConfig {
            api_key,
            api_url,
            model,
            request_timeout: Duration::from_secs(timeout_secs),
            retry_attempts,
            language,
            page_height,
        })
    }
}

fn parse_u64<F>(lookup: &F, var: &'static str, default: u64) -> Result<u64, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(var) {
        Some(raw) => raw
            .trim()
            .parse::<u64>()
            .map_err(|source| ConfigError::InvalidNumber { var, source }),
        None => Ok(default),
    }
}
