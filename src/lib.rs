//! Financial Advisor Bot
//!
//! A profile-personalized financial-advice chat backend:
//! - Classifies user intent via the Gemini API (fail-soft)
//! - Enriches stock queries with Alpha Vantage market data (fail-loud)
//! - Generates advice text personalized by the stored investment profile
//! - Persists user profiles in Postgres (in-memory fallback for dev)
//!
//! TURN FLOW:
//! MESSAGE → LOAD PROFILE → CLASSIFY → ENRICH? → GENERATE → ENVELOPE

pub mod advisor;
pub mod api;
pub mod config;
pub mod error;
pub mod gemini;
pub mod intent;
pub mod market;
pub mod models;
pub mod orchestrator;
pub mod store;

pub use error::Result;

// Re-export common types
pub use config::AppConfig;
pub use models::*;
pub use orchestrator::ChatOrchestrator;
