//! Intent classification
//!
//! Asks Gemini for a structured judgment of a user message: an intent
//! type tag, a short detail string, and a coarse category. Classification
//! never fails: any upstream error or malformed reply degrades to the
//! fixed GENERAL_QUERY fallback so the chat turn always proceeds.

use crate::gemini::GeminiClient;
use crate::models::IntentResult;
use std::sync::Arc;
use tracing::warn;

pub struct IntentClassifier {
    client: Arc<GeminiClient>,
}

impl IntentClassifier {
    pub fn new(client: Arc<GeminiClient>) -> Self {
        Self { client }
    }

    /// Classify a user message. Infallible by contract: the fallback
    /// result stands in for every failure mode.
    pub async fn classify(&self, message: &str) -> IntentResult {
        let prompt = build_intent_prompt(message);

        match self.client.generate(&prompt).await {
            Ok(reply) => intent_from_reply(&reply),
            Err(e) => {
                warn!("Intent analysis failed: {}", e);
                IntentResult::fallback()
            }
        }
    }
}

fn build_intent_prompt(message: &str) -> String {
    format!(
        r#"Analyze this financial query: "{}"
Return JSON with:
{{
    "type": "INTENT_TYPE",
    "details": "brief description",
    "category": "stocks|mutual_funds|general"
}}

INTENT_TYPE is typically one of STOCK_PRICE, INVESTMENT_RECOMMENDATION,
GENERAL_QUERY. Return ONLY the JSON object, no explanation text."#,
        message
    )
}

/// Parse the model reply into an IntentResult, stripping any markdown
/// code fences first. Malformed replies map to the fixed fallback.
fn intent_from_reply(reply: &str) -> IntentResult {
    let cleaned = reply
        .trim()
        .trim_start_matches("```json")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim();

    match serde_json::from_str::<IntentResult>(cleaned) {
        Ok(intent) => intent,
        Err(e) => {
            warn!("Unparseable intent reply, using fallback: {}", e);
            IntentResult::fallback()
        }
    }
}

/// Words that look like tickers but almost never are.
const TICKER_STOP_WORDS: &[&str] = &[
    "A", "AI", "AM", "AN", "AND", "ARE", "BE", "BUY", "CAN", "DO", "ETF", "FOR", "HOW", "I", "IF",
    "IN", "IPO", "IS", "IT", "ME", "MY", "OF", "OK", "ON", "OR", "PE", "SELL", "SHOULD", "THE",
    "TO", "USD", "VS", "WHAT", "WHY", "YES",
];

/// Scan a message for something that looks like a ticker symbol: an
/// all-uppercase alphabetic token of 1-5 characters, punctuation
/// trimmed, not on the stop list. First match wins.
pub fn extract_ticker(message: &str) -> Option<String> {
    message.split_whitespace().find_map(|word| {
        let cleaned = word.trim_matches(|c: char| !c.is_ascii_alphabetic());
        let looks_like_ticker = (1..=5).contains(&cleaned.len())
            && cleaned.chars().all(|c| c.is_ascii_uppercase())
            && !TICKER_STOP_WORDS.contains(&cleaned);

        looks_like_ticker.then(|| cleaned.to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{IntentCategory, INTENT_GENERAL_QUERY};

    #[test]
    fn test_parse_clean_json_reply() {
        let reply = r#"{"type": "STOCK_PRICE", "details": "price check for AAPL", "category": "stocks"}"#;
        let intent = intent_from_reply(reply);

        assert_eq!(intent.intent_type, "STOCK_PRICE");
        assert_eq!(intent.category, IntentCategory::Stocks);
    }

    #[test]
    fn test_parse_fenced_json_reply() {
        let reply = "```json\n{\"type\": \"GENERAL_QUERY\", \"details\": \"greeting\", \"category\": \"general\"}\n```";
        let intent = intent_from_reply(reply);

        assert_eq!(intent.intent_type, "GENERAL_QUERY");
        assert_eq!(intent.details, "greeting");
    }

    #[test]
    fn test_open_intent_type_is_accepted() {
        let reply = r#"{"type": "TAX_QUESTION", "details": "capital gains", "category": "general"}"#;
        let intent = intent_from_reply(reply);

        assert_eq!(intent.intent_type, "TAX_QUESTION");
    }

    #[test]
    fn test_malformed_replies_all_map_to_fallback() {
        let malformed = [
            "",
            "I think this is about stocks.",
            "{\"type\": \"STOCK_PRICE\"}",
            "{\"type\": \"STOCK_PRICE\", \"category\": \"bonds\"}",
            "[1, 2, 3]",
            "```json\nnot json\n```",
            "{\"category\": \"stocks\"}",
        ];

        for reply in malformed {
            let intent = intent_from_reply(reply);
            assert_eq!(intent, IntentResult::fallback(), "reply: {:?}", reply);
            assert_eq!(intent.intent_type, INTENT_GENERAL_QUERY);
        }
    }

    #[test]
    fn test_missing_details_defaults_empty() {
        let reply = r#"{"type": "STOCK_PRICE", "category": "stocks", "details": ""}"#;
        let intent = intent_from_reply(reply);
        assert_eq!(intent.details, "");
    }

    #[test]
    fn test_extract_ticker_finds_symbol() {
        assert_eq!(
            extract_ticker("What's the price of AAPL?"),
            Some("AAPL".to_string())
        );
        assert_eq!(extract_ticker("Is MSFT a buy?"), Some("MSFT".to_string()));
        assert_eq!(
            extract_ticker("compare GOOGL with the index"),
            Some("GOOGL".to_string())
        );
    }

    #[test]
    fn test_extract_ticker_ignores_plain_text() {
        assert_eq!(extract_ticker("How should I plan for retirement?"), None);
        assert_eq!(extract_ticker("what is a mutual fund"), None);
        assert_eq!(extract_ticker(""), None);
    }

    #[test]
    fn test_extract_ticker_skips_stop_words() {
        assert_eq!(extract_ticker("SHOULD I BUY AN ETF OR TSLA?"), Some("TSLA".to_string()));
    }
}
