//! Runtime configuration
//!
//! Values come from the process environment, optionally seeded from a `.env` file.

use crate::error::AdvisorError;
use crate::Result;
use std::env;
use std::str::FromStr;

const DEFAULT_GEMINI_MODEL: &str = "gemini-2.0-flash";
const DEFAULT_TEMPERATURE: f32 = 0.7;
const DEFAULT_MAX_TOKENS: u32 = 4000;
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;
const DEFAULT_EXPENSE_HISTORY_DAYS: u32 = 90;

#[derive(Debug, Clone)]
pub struct AdvisorConfig {
    pub gemini_api_key: String,
    pub gemini_model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub financial_api_base_url: Option<String>,
    pub http_timeout_secs: u64,
    pub expense_history_days: u32,
}

impl Default for AdvisorConfig {
    fn default() -> Self {
        Self {
            gemini_api_key: String::new(),
            gemini_model: DEFAULT_GEMINI_MODEL.to_string(),
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
            financial_api_base_url: None,
            http_timeout_secs: DEFAULT_HTTP_TIMEOUT_SECS,
            expense_history_days: DEFAULT_EXPENSE_HISTORY_DAYS,
        }
    }
}

impl AdvisorConfig {
    /// Load `.env` (if present) and read the environment.
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a config from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let financial_api_base_url = lookup("FINANCIAL_API_BASE_URL")
            .map(|v| v.trim().trim_end_matches('/').to_string())
            .filter(|v| !v.is_empty());

        Ok(Self {
            gemini_api_key: lookup("GEMINI_API_KEY").unwrap_or_default(),
            gemini_model: lookup("GEMINI_MODEL")
                .filter(|v| !v.trim().is_empty())
                .unwrap_or(defaults.gemini_model),
            temperature: parse_or(&lookup, "LLM_TEMPERATURE", defaults.temperature)?,
            max_tokens: parse_or(&lookup, "LLM_MAX_TOKENS", defaults.max_tokens)?,
            financial_api_base_url,
            http_timeout_secs: parse_or(&lookup, "HTTP_TIMEOUT_SECS", defaults.http_timeout_secs)?,
            expense_history_days: parse_or(
                &lookup,
                "EXPENSE_HISTORY_DAYS",
                defaults.expense_history_days,
            )?,
        })
    }

    pub fn has_llm_credentials(&self) -> bool {
        !self.gemini_api_key.trim().is_empty()
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) if !raw.trim().is_empty() => raw.trim().parse::<T>().map_err(|e| {
            AdvisorError::Config(format!("{} has invalid value '{}': {}", key, raw, e))
        }),
        _ => Ok(default),
    }
}
