//! Process configuration
//!
//! All environment lookups happen once, here. Components receive an
//! immutable `AppConfig` by reference instead of reading globals.

use crate::error::AdvisorError;
use std::env;
use tracing::warn;

pub const DEFAULT_PORT: u16 = 5000;

#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Gemini API key. Required; startup fails without it.
    pub gemini_api_key: String,
    /// Alpha Vantage API key. Required; startup fails without it.
    pub alpha_vantage_api_key: String,
    /// Postgres connection string. When absent the service runs with the
    /// in-memory profile store and profiles do not survive restarts.
    pub database_url: Option<String>,
    pub port: u16,
}

impl AppConfig {
    pub fn from_env() -> crate::Result<Self> {
        let gemini_api_key = env::var("GEMINI_API_KEY").unwrap_or_default();
        if gemini_api_key.trim().is_empty() {
            return Err(AdvisorError::ConfigError(
                "GEMINI_API_KEY is not configured".to_string(),
            ));
        }

        let alpha_vantage_api_key = env::var("ALPHA_VANTAGE_API_KEY").unwrap_or_default();
        if alpha_vantage_api_key.trim().is_empty() {
            return Err(AdvisorError::ConfigError(
                "ALPHA_VANTAGE_API_KEY is not configured".to_string(),
            ));
        }

        let database_url = env::var("DATABASE_URL")
            .or_else(|_| env::var("POSTGRES_URL"))
            .ok()
            .filter(|url| !url.trim().is_empty());
        if database_url.is_none() {
            warn!("DATABASE_URL not set, profiles will be stored in memory only");
        }

        let port = env::var("PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(DEFAULT_PORT);

        Ok(Self {
            gemini_api_key,
            alpha_vantage_api_key,
            database_url,
            port,
        })
    }
}
