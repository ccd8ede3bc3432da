//! REST API for the advisor service
//!
//! Two JSON endpoints mirror the frontend contract: profile creation
//! and the chat turn, plus a health probe. The chat route is the error
//! boundary: whatever goes wrong inside a turn, the client receives
//! the fixed ERROR envelope and HTTP 200.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::{error, info};
use uuid::Uuid;

use crate::error::AdvisorError;
use crate::models::{parse_horizon, parse_risk, InvestmentGoal, ResponseEnvelope, UserProfile};
use crate::orchestrator::ChatOrchestrator;
use crate::store::ProfileStore;

/// =============================
/// Request Models
/// =============================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateProfileRequest {
    pub monthly_income: f64,
    #[serde(default)]
    pub monthly_savings: f64,
    #[serde(default)]
    pub monthly_investment: f64,
    #[serde(default)]
    pub investment_goals: Vec<InvestmentGoal>,
    pub risk_tolerance: String,
    pub time_horizon: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    pub message: String,
    pub user_id: Option<String>,
}

/// =============================
/// API State
/// =============================

#[derive(Clone)]
pub struct ApiState {
    pub orchestrator: Arc<ChatOrchestrator>,
    pub store: Arc<dyn ProfileStore>,
}

/// =============================
/// Helpers — User Id Parsing
/// =============================

fn stable_uuid_from_string(input: &str) -> Uuid {
    use sha2::{Digest, Sha256};

    let hash = Sha256::digest(input.as_bytes());
    let mut bytes = [0u8; 16];
    bytes.copy_from_slice(&hash[..16]);

    // Set UUID version (4) and variant (RFC4122) bits.
    bytes[6] = (bytes[6] & 0x0f) | 0x40;
    bytes[8] = (bytes[8] & 0x3f) | 0x80;

    Uuid::from_bytes(bytes)
}

/// Client user ids are UUIDs when the profile came from this service,
/// but legacy clients send opaque strings; those map deterministically
/// onto a synthetic UUID so the same caller keeps the same identity.
fn parse_or_stable_uuid(value: Option<&str>, fallback_seed: &str) -> Uuid {
    match value {
        Some(v) if !v.trim().is_empty() => {
            Uuid::parse_str(v).unwrap_or_else(|_| stable_uuid_from_string(v))
        }
        _ => stable_uuid_from_string(fallback_seed),
    }
}

/// =============================
/// Health Endpoint
/// =============================

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

/// =============================
/// Profile Endpoints
/// =============================

async fn create_profile(
    State(state): State<ApiState>,
    Json(req): Json<CreateProfileRequest>,
) -> Result<(StatusCode, Json<UserProfile>), AdvisorError> {
    if req.monthly_income < 0.0 {
        return Err(AdvisorError::InvalidRequest(
            "monthlyIncome must not be negative".to_string(),
        ));
    }

    let profile = UserProfile {
        user_id: Uuid::new_v4(),
        monthly_income: req.monthly_income,
        monthly_savings: req.monthly_savings,
        monthly_investment: req.monthly_investment,
        investment_goals: req.investment_goals,
        risk_tolerance: parse_risk(&req.risk_tolerance),
        time_horizon: parse_horizon(&req.time_horizon),
        investments: vec![],
        created_at: chrono::Utc::now(),
    };

    state.store.upsert(&profile).await?;
    info!("Created profile for user {}", profile.user_id);

    Ok((StatusCode::CREATED, Json(profile)))
}

async fn get_profile(
    State(state): State<ApiState>,
    Path(user_id): Path<String>,
) -> Result<Json<UserProfile>, AdvisorError> {
    let user_id = Uuid::parse_str(&user_id)
        .map_err(|_| AdvisorError::InvalidRequest(format!("invalid user id: {}", user_id)))?;

    let profile = state
        .store
        .get(user_id)
        .await?
        .ok_or_else(|| AdvisorError::NotFound(format!("no profile for user {}", user_id)))?;

    Ok(Json(profile))
}

/// =============================
/// Chat Endpoint
/// =============================

async fn chat_handler(
    State(state): State<ApiState>,
    Json(req): Json<ChatRequest>,
) -> Result<Json<ResponseEnvelope>, AdvisorError> {
    if req.message.trim().is_empty() {
        return Err(AdvisorError::InvalidRequest(
            "message must not be empty".to_string(),
        ));
    }

    let user_id = parse_or_stable_uuid(req.user_id.as_deref(), "anonymous-user");
    info!("Chat turn for user {}", user_id);

    let result = state.orchestrator.handle_turn(&req.message, user_id).await;

    Ok(Json(envelope_or_error(result)))
}

/// The turn is atomic from the client's perspective: success or the one
/// fixed error message, never a raw error payload.
fn envelope_or_error(result: crate::Result<ResponseEnvelope>) -> ResponseEnvelope {
    match result {
        Ok(envelope) => envelope,
        Err(e) => {
            error!("Chat turn failed: {}", e);
            ResponseEnvelope::turn_error()
        }
    }
}

/// =============================
/// Router
/// =============================

pub fn create_router(state: ApiState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/profile", post(create_profile))
        .route("/api/profile/:user_id", get(get_profile))
        .route("/api/chat", post(chat_handler))
        .with_state(state)
        .layer(CorsLayer::permissive())
}

/// =============================
/// Server Startup
/// =============================

pub async fn start_server(
    state: ApiState,
    port: u16,
) -> std::result::Result<(), Box<dyn std::error::Error>> {
    let router = create_router(state);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?;

    info!("API Server listening on http://0.0.0.0:{}", port);
    info!("Local: http://127.0.0.1:{}", port);

    axum::serve(listener, router).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stable_uuid_is_deterministic() {
        let a = stable_uuid_from_string("user-1699999999999");
        let b = stable_uuid_from_string("user-1699999999999");
        let c = stable_uuid_from_string("user-1700000000000");

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.get_version_num(), 4);
    }

    #[test]
    fn test_parse_or_stable_uuid_prefers_real_uuid() {
        let id = Uuid::new_v4();
        assert_eq!(parse_or_stable_uuid(Some(&id.to_string()), "seed"), id);
    }

    #[test]
    fn test_parse_or_stable_uuid_handles_opaque_and_missing_ids() {
        let opaque = parse_or_stable_uuid(Some("user-12345"), "seed");
        assert_eq!(opaque, stable_uuid_from_string("user-12345"));

        let missing = parse_or_stable_uuid(None, "anonymous-user");
        assert_eq!(missing, stable_uuid_from_string("anonymous-user"));

        let blank = parse_or_stable_uuid(Some("   "), "anonymous-user");
        assert_eq!(blank, missing);
    }

    #[test]
    fn test_envelope_or_error_masks_failures() {
        let ok = envelope_or_error(Ok(ResponseEnvelope::Text {
            message: "hi".to_string(),
        }));
        assert_eq!(ok.type_tag(), "TEXT");

        let err = envelope_or_error(Err(AdvisorError::GenerationError(
            "Failed to generate response".to_string(),
        )));
        assert_eq!(err, ResponseEnvelope::turn_error());
    }

    #[test]
    fn test_create_profile_request_wire_names() {
        let body = r#"{
            "monthlyIncome": 85000,
            "monthlySavings": 20000,
            "monthlyInvestment": 10000,
            "investmentGoals": ["Retirement", "Wealth Growth"],
            "riskTolerance": "medium",
            "timeHorizon": "long"
        }"#;

        let req: CreateProfileRequest = serde_json::from_str(body).unwrap();
        assert_eq!(req.monthly_income, 85000.0);
        assert_eq!(req.investment_goals.len(), 2);
        assert_eq!(parse_risk(&req.risk_tolerance), crate::models::RiskTolerance::Medium);
        assert_eq!(parse_horizon(&req.time_horizon), crate::models::TimeHorizon::Long);
    }

    #[test]
    fn test_chat_request_optional_user_id() {
        let req: ChatRequest = serde_json::from_str(r#"{"message": "hello"}"#).unwrap();
        assert!(req.user_id.is_none());

        let req: ChatRequest =
            serde_json::from_str(r#"{"message": "hello", "userId": "user-1"}"#).unwrap();
        assert_eq!(req.user_id.as_deref(), Some("user-1"));
    }
}
