//! Observer configuration
//!
//! Read once when the observer is built; changing the environment afterwards has no
//! effect on an observer that is already attached.

use crate::error::{HttpSpyError, Result};
use crate::filter::PatternFilter;

/// Enables or disables body lines (`true`/`false`/`1`/`0`)
pub const LOG_BODY_ENV: &str = "HTTP_SPY_LOG_BODY";

/// Comma-separated exclusion regexes; set but empty means "exclude nothing"
pub const IGNORE_ENV: &str = "HTTP_SPY_IGNORE";

/// Settings for [`crate::observer::HttpClientObserver`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObserverConfig {
    pub log_response_body: bool,
    /// `None` selects the built-in telemetry exclusions
    pub ignore_patterns: Option<Vec<String>>,
}

impl Default for ObserverConfig {
    fn default() -> Self {
        Self {
            log_response_body: true,
            ignore_patterns: None,
        }
    }
}

impl ObserverConfig {
    /// Build a configuration from `HTTP_SPY_*` environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Like [`ObserverConfig::from_env`], loading a `.env` file first if one exists
    pub fn from_dotenv() -> Result<Self> {
        dotenv::dotenv().ok();
        Self::from_env()
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let log_response_body = match lookup(LOG_BODY_ENV) {
            Some(value) => parse_bool(&value).ok_or_else(|| {
                HttpSpyError::ConfigError(format!(
                    "{} must be true, false, 1 or 0, got '{}'",
                    LOG_BODY_ENV, value
                ))
            })?,
            None => true,
        };

        let ignore_patterns = lookup(IGNORE_ENV).map(|value| {
            value
                .split(',')
                .map(str::trim)
                .filter(|pattern| !pattern.is_empty())
                .map(str::to_string)
                .collect()
        });

        Ok(Self {
            log_response_body,
            ignore_patterns,
        })
    }

    /// Compile the exclusion list
    pub fn filter(&self) -> Result<PatternFilter> {
        match &self.ignore_patterns {
            Some(patterns) => PatternFilter::from_patterns(patterns),
            None => Ok(PatternFilter::default_set()),
        }
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" => Some(true),
        "false" | "0" => Some(false),
        _ => None,
    }
}
