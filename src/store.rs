//! Profile persistence
//!
//! One document per user, full replace-or-create. Postgres in
//! production; an in-memory map when DATABASE_URL is absent and in
//! tests. Per-document read-your-writes is delegated to Postgres; no
//! additional locking here.

use crate::config::AppConfig;
use crate::error::AdvisorError;
use crate::models::{parse_horizon, parse_risk, InvestmentGoal, UserProfile};
use chrono::{DateTime, Utc};
use sqlx::{postgres::PgPoolOptions, PgPool, Row};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{OnceCell, RwLock};
use tracing::{info, warn};
use uuid::Uuid;

/// Trait for profile persistence
#[async_trait::async_trait]
pub trait ProfileStore: Send + Sync {
    async fn upsert(&self, profile: &UserProfile) -> crate::Result<()>;
    async fn get(&self, user_id: Uuid) -> crate::Result<Option<UserProfile>>;
}

/// Pick the backend from configuration: Postgres when DATABASE_URL is
/// set and the pool initializes, in-memory otherwise.
pub fn build_store(config: &AppConfig) -> Arc<dyn ProfileStore> {
    if let Some(url) = &config.database_url {
        match PostgresProfileStore::connect(url) {
            Ok(store) => {
                info!("Profile store backend: postgres");
                return Arc::new(store);
            }
            Err(error) => {
                warn!(
                    "Failed to initialize postgres profile store, falling back to in-memory: {}",
                    error
                );
            }
        }
    }

    info!("Profile store backend: in-memory");
    Arc::new(InMemoryProfileStore::new())
}

//
// ================= In-Memory =================
//

pub struct InMemoryProfileStore {
    profiles: Arc<RwLock<HashMap<Uuid, UserProfile>>>,
}

impl InMemoryProfileStore {
    pub fn new() -> Self {
        Self {
            profiles: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

impl Default for InMemoryProfileStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl ProfileStore for InMemoryProfileStore {
    async fn upsert(&self, profile: &UserProfile) -> crate::Result<()> {
        let mut profiles = self.profiles.write().await;
        profiles.insert(profile.user_id, profile.clone());
        Ok(())
    }

    async fn get(&self, user_id: Uuid) -> crate::Result<Option<UserProfile>> {
        let profiles = self.profiles.read().await;
        Ok(profiles.get(&user_id).cloned())
    }
}

//
// ================= Postgres =================
//

pub struct PostgresProfileStore {
    pool: PgPool,
    schema_ready: OnceCell<()>,
}

impl PostgresProfileStore {
    pub fn connect(database_url: &str) -> crate::Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect_lazy(database_url)
            .map_err(|e| {
                AdvisorError::DatabaseError(format!("Failed to create connection pool: {}", e))
            })?;

        Ok(Self {
            pool,
            schema_ready: OnceCell::new(),
        })
    }

    async fn ensure_schema(&self) -> crate::Result<()> {
        self.schema_ready
            .get_or_try_init(|| async {
                sqlx::query(
                    r#"
                    CREATE TABLE IF NOT EXISTS user_profiles (
                      user_id UUID PRIMARY KEY,
                      monthly_income DOUBLE PRECISION NOT NULL,
                      monthly_savings DOUBLE PRECISION NOT NULL,
                      monthly_investment DOUBLE PRECISION NOT NULL,
                      investment_goals JSONB NOT NULL DEFAULT '[]',
                      risk_tolerance TEXT NOT NULL,
                      time_horizon TEXT NOT NULL,
                      investments JSONB NOT NULL DEFAULT '[]',
                      created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
                    );
                    "#,
                )
                .execute(&self.pool)
                .await?;

                Ok::<(), sqlx::Error>(())
            })
            .await
            .map_err(|e| {
                AdvisorError::DatabaseError(format!(
                    "Failed to initialize profile schema: {}",
                    e
                ))
            })?;

        Ok(())
    }
}

#[async_trait::async_trait]
impl ProfileStore for PostgresProfileStore {
    async fn upsert(&self, profile: &UserProfile) -> crate::Result<()> {
        self.ensure_schema().await?;

        let goals = serde_json::to_value(&profile.investment_goals)?;
        let investments = serde_json::to_value(&profile.investments)?;

        sqlx::query(
            r#"
            INSERT INTO user_profiles
              (user_id, monthly_income, monthly_savings, monthly_investment,
               investment_goals, risk_tolerance, time_horizon, investments, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT (user_id) DO UPDATE SET
              monthly_income = EXCLUDED.monthly_income,
              monthly_savings = EXCLUDED.monthly_savings,
              monthly_investment = EXCLUDED.monthly_investment,
              investment_goals = EXCLUDED.investment_goals,
              risk_tolerance = EXCLUDED.risk_tolerance,
              time_horizon = EXCLUDED.time_horizon,
              investments = EXCLUDED.investments
            "#,
        )
        .bind(profile.user_id)
        .bind(profile.monthly_income)
        .bind(profile.monthly_savings)
        .bind(profile.monthly_investment)
        .bind(goals)
        .bind(profile.risk_tolerance.to_string())
        .bind(profile.time_horizon.to_string())
        .bind(investments)
        .bind(profile.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| AdvisorError::DatabaseError(format!("Failed to save profile: {}", e)))?;

        Ok(())
    }

    async fn get(&self, user_id: Uuid) -> crate::Result<Option<UserProfile>> {
        self.ensure_schema().await?;

        let row = sqlx::query(
            r#"
            SELECT user_id, monthly_income, monthly_savings, monthly_investment,
                   investment_goals, risk_tolerance, time_horizon, investments, created_at
            FROM user_profiles
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AdvisorError::DatabaseError(format!("Failed to load profile: {}", e)))?;

        let Some(row) = row else {
            return Ok(None);
        };

        let risk: String = row.try_get("risk_tolerance").unwrap_or_default();
        let horizon: String = row.try_get("time_horizon").unwrap_or_default();
        let goals: serde_json::Value = row
            .try_get("investment_goals")
            .unwrap_or(serde_json::Value::Null);
        let investments: serde_json::Value =
            row.try_get("investments").unwrap_or(serde_json::Value::Null);
        let created_at: DateTime<Utc> = row.try_get("created_at").unwrap_or_else(|_| Utc::now());

        let goals: Vec<InvestmentGoal> = serde_json::from_value(goals).unwrap_or_default();
        let investments: Vec<String> = serde_json::from_value(investments).unwrap_or_default();

        Ok(Some(UserProfile {
            user_id: row.try_get("user_id").unwrap_or(user_id),
            monthly_income: row.try_get("monthly_income").unwrap_or(0.0),
            monthly_savings: row.try_get("monthly_savings").unwrap_or(0.0),
            monthly_investment: row.try_get("monthly_investment").unwrap_or(0.0),
            investment_goals: goals,
            risk_tolerance: parse_risk(&risk),
            time_horizon: parse_horizon(&horizon),
            investments,
            created_at,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{RiskTolerance, TimeHorizon};

    fn sample_profile(user_id: Uuid) -> UserProfile {
        UserProfile {
            user_id,
            monthly_income: 60000.0,
            monthly_savings: 15000.0,
            monthly_investment: 8000.0,
            investment_goals: vec![InvestmentGoal::HomePurchase],
            risk_tolerance: RiskTolerance::Low,
            time_horizon: TimeHorizon::Short,
            investments: vec![],
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_in_memory_round_trip() {
        let store = InMemoryProfileStore::new();
        let user_id = Uuid::new_v4();
        let profile = sample_profile(user_id);

        store.upsert(&profile).await.unwrap();
        let loaded = store.get(user_id).await.unwrap().unwrap();

        assert_eq!(loaded, profile);
    }

    #[tokio::test]
    async fn test_upsert_replaces_whole_document() {
        let store = InMemoryProfileStore::new();
        let user_id = Uuid::new_v4();

        store.upsert(&sample_profile(user_id)).await.unwrap();

        let mut updated = sample_profile(user_id);
        updated.monthly_income = 90000.0;
        updated.investment_goals = vec![InvestmentGoal::Retirement];
        store.upsert(&updated).await.unwrap();

        let loaded = store.get(user_id).await.unwrap().unwrap();
        assert_eq!(loaded.monthly_income, 90000.0);
        assert_eq!(loaded.investment_goals, vec![InvestmentGoal::Retirement]);
    }

    #[tokio::test]
    async fn test_get_unknown_user_is_none() {
        let store = InMemoryProfileStore::new();
        assert!(store.get(Uuid::new_v4()).await.unwrap().is_none());
    }
}
