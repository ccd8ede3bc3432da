//! Profile-aware response generation
//!
//! Substitutes the stored investment profile into a fixed instructional
//! template and asks Gemini for advice text. Upstream failures are
//! logged with their cause and re-raised as a generic generation error;
//! the user-facing message never carries upstream detail.

use crate::error::AdvisorError;
use crate::gemini::GeminiClient;
use crate::models::UserProfile;
use std::sync::Arc;
use tracing::error;

pub struct ResponseGenerator {
    client: Arc<GeminiClient>,
}

impl ResponseGenerator {
    pub fn new(client: Arc<GeminiClient>) -> Self {
        Self { client }
    }

    pub async fn generate(&self, message: &str, profile: &UserProfile) -> crate::Result<String> {
        let prompt = build_advice_prompt(message, profile);

        self.client.generate(&prompt).await.map_err(|e| {
            error!("Error generating response: {}", e);
            AdvisorError::GenerationError("Failed to generate response".to_string())
        })
    }
}

fn build_advice_prompt(message: &str, profile: &UserProfile) -> String {
    let goals = if profile.investment_goals.is_empty() {
        "Not specified".to_string()
    } else {
        profile
            .investment_goals
            .iter()
            .map(|g| g.to_string())
            .collect::<Vec<_>>()
            .join(", ")
    };

    format!(
        r#"You are a financial AI assistant helping a user with their investments and financial queries.

User Profile:
- Monthly Income: ₹{income}
- Risk Tolerance: {risk}
- Investment Goals: {goals}
- Time Horizon: {horizon}

User Query: "{message}"

Provide a helpful, personalized response based on their profile. If they ask about:
1. Stocks: Include current market insights
2. Investment advice: Consider their risk tolerance and time horizon
3. Financial planning: Factor in their monthly income
4. General queries: Provide educational and informative responses

Keep responses clear, practical, and tailored to their profile."#,
        income = profile.monthly_income,
        risk = profile.risk_tolerance,
        goals = goals,
        horizon = profile.time_horizon,
        message = message,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{InvestmentGoal, RiskTolerance, TimeHorizon};
    use uuid::Uuid;

    fn sample_profile() -> UserProfile {
        let mut profile = UserProfile::default_for(Uuid::new_v4());
        profile.monthly_income = 85000.0;
        profile.risk_tolerance = RiskTolerance::High;
        profile.time_horizon = TimeHorizon::Long;
        profile.investment_goals = vec![InvestmentGoal::Retirement, InvestmentGoal::Education];
        profile
    }

    #[test]
    fn test_prompt_substitutes_profile_fields() {
        let prompt = build_advice_prompt("How should I plan for retirement?", &sample_profile());

        assert!(prompt.contains("₹85000"));
        assert!(prompt.contains("Risk Tolerance: high"));
        assert!(prompt.contains("Retirement, Education"));
        assert!(prompt.contains("Time Horizon: long"));
        assert!(prompt.contains("\"How should I plan for retirement?\""));
    }

    #[test]
    fn test_prompt_without_goals_says_not_specified() {
        let profile = UserProfile::default_for(Uuid::new_v4());
        let prompt = build_advice_prompt("hello", &profile);

        assert!(prompt.contains("Investment Goals: Not specified"));
    }
}
