//! Core data models for the advisor service

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

//
// ================= Enums =================
//

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RiskTolerance {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TimeHorizon {
    Short,
    Medium,
    Long,
}

/// Investment goals selectable in the profile questionnaire.
/// Wire names match the questionnaire labels.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum InvestmentGoal {
    Retirement,
    #[serde(rename = "Wealth Growth")]
    WealthGrowth,
    Education,
    #[serde(rename = "Home Purchase")]
    HomePurchase,
    #[serde(rename = "Emergency Fund")]
    EmergencyFund,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum IntentCategory {
    Stocks,
    MutualFunds,
    General,
}

/// Lenient parsing for questionnaire values. Unknown strings settle on
/// the middle option rather than rejecting the request.
pub fn parse_risk(r: &str) -> RiskTolerance {
    match r.to_lowercase().as_str() {
        "low" => RiskTolerance::Low,
        "medium" | "moderate" => RiskTolerance::Medium,
        "high" => RiskTolerance::High,
        _ => RiskTolerance::Medium,
    }
}

pub fn parse_horizon(h: &str) -> TimeHorizon {
    match h.to_lowercase().as_str() {
        "short" | "short_term" | "short-term" => TimeHorizon::Short,
        "medium" | "medium_term" | "medium-term" => TimeHorizon::Medium,
        "long" | "long_term" | "long-term" => TimeHorizon::Long,
        _ => TimeHorizon::Medium,
    }
}

//
// ================= User Profile =================
//

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub user_id: Uuid,
    pub monthly_income: f64,
    pub monthly_savings: f64,
    pub monthly_investment: f64,
    pub investment_goals: Vec<InvestmentGoal>,
    pub risk_tolerance: RiskTolerance,
    pub time_horizon: TimeHorizon,
    /// Held positions, empty on creation
    pub investments: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl UserProfile {
    /// Profile used when a chat turn arrives for an unknown user id.
    /// The turn proceeds with unpersonalized defaults instead of failing.
    pub fn default_for(user_id: Uuid) -> Self {
        Self {
            user_id,
            monthly_income: 0.0,
            monthly_savings: 0.0,
            monthly_investment: 0.0,
            investment_goals: vec![],
            risk_tolerance: RiskTolerance::Medium,
            time_horizon: TimeHorizon::Medium,
            investments: vec![],
            created_at: Utc::now(),
        }
    }
}

//
// ================= Intent =================
//

/// Well-known intent type tags. The set is open: the model may emit
/// other tags, which route to the plain-text branch.
pub const INTENT_STOCK_PRICE: &str = "STOCK_PRICE";
pub const INTENT_INVESTMENT_RECOMMENDATION: &str = "INVESTMENT_RECOMMENDATION";
pub const INTENT_GENERAL_QUERY: &str = "GENERAL_QUERY";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IntentResult {
    #[serde(rename = "type")]
    pub intent_type: String,
    #[serde(default)]
    pub details: String,
    pub category: IntentCategory,
}

impl IntentResult {
    /// Fixed fallback returned whenever classification fails for any
    /// reason. Callers can always rely on getting an IntentResult.
    pub fn fallback() -> Self {
        Self {
            intent_type: INTENT_GENERAL_QUERY.to_string(),
            details: "Failed to analyze intent".to_string(),
            category: IntentCategory::General,
        }
    }
}

//
// ================= Market Data =================
//

/// Normalized current-price snapshot (Alpha Vantage GLOBAL_QUOTE)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Quote {
    pub symbol: String,
    pub price: f64,
    pub change: f64,
    pub change_percent: f64,
    pub volume: u64,
    pub previous_close: f64,
    pub latest_trading_day: NaiveDate,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct DailyBar {
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
}

/// Compact daily OHLCV history, keyed by trading day (ascending)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DailySeries {
    pub symbol: String,
    pub bars: BTreeMap<NaiveDate, DailyBar>,
}

/// Static company descriptor (Alpha Vantage OVERVIEW)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CompanyOverview {
    pub symbol: String,
    pub name: String,
    pub description: String,
    pub sector: String,
    pub industry: String,
    pub market_capitalization: Option<u64>,
    pub pe_ratio: Option<f64>,
    pub dividend_yield: Option<f64>,
    pub fifty_two_week_high: Option<f64>,
    pub fifty_two_week_low: Option<f64>,
}

//
// ================= Response Envelope =================
//

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QuotePayload {
    pub price: Quote,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OverviewPayload {
    pub overview: CompanyOverview,
}

/// Typed response returned per chat turn. The `type` tag selects the
/// client rendering branch; `TEXT` is the catch-all plain-text case.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum ResponseEnvelope {
    #[serde(rename = "STOCK_PRICE")]
    StockPrice { message: String, data: QuotePayload },
    #[serde(rename = "INVESTMENT_RECOMMENDATION")]
    InvestmentRecommendation {
        message: String,
        data: OverviewPayload,
    },
    #[serde(rename = "TEXT")]
    Text { message: String },
    #[serde(rename = "ERROR")]
    Error { message: String },
}

impl ResponseEnvelope {
    /// Fixed user-facing message for any failed turn. The underlying
    /// error is logged server-side, never surfaced to the client.
    pub fn turn_error() -> Self {
        Self::Error {
            message: "Sorry, I encountered an error. Please try again.".to_string(),
        }
    }

    pub fn type_tag(&self) -> &'static str {
        match self {
            Self::StockPrice { .. } => "STOCK_PRICE",
            Self::InvestmentRecommendation { .. } => "INVESTMENT_RECOMMENDATION",
            Self::Text { .. } => "TEXT",
            Self::Error { .. } => "ERROR",
        }
    }
}

//
// ================= Display =================
//

impl fmt::Display for RiskTolerance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RiskTolerance::Low => "low",
            RiskTolerance::Medium => "medium",
            RiskTolerance::High => "high",
        };
        write!(f, "{}", s)
    }
}

impl fmt::Display for TimeHorizon {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TimeHorizon::Short => "short",
            TimeHorizon::Medium => "medium",
            TimeHorizon::Long => "long",
        };
        write!(f, "{}", s)
    }
}

impl fmt::Display for InvestmentGoal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            InvestmentGoal::Retirement => "Retirement",
            InvestmentGoal::WealthGrowth => "Wealth Growth",
            InvestmentGoal::Education => "Education",
            InvestmentGoal::HomePurchase => "Home Purchase",
            InvestmentGoal::EmergencyFund => "Emergency Fund",
        };
        write!(f, "{}", s)
    }
}
