//! Chat turn orchestration
//!
//! Stateless across turns: load profile → classify intent → optionally
//! enrich with market data → generate advice → compose the typed
//! envelope. Classification is fail-soft; enrichment and generation are
//! fail-loud and bubble up to the HTTP boundary, which converts any
//! failure into the fixed ERROR envelope.

use crate::advisor::ResponseGenerator;
use crate::gemini::GeminiClient;
use crate::intent::{extract_ticker, IntentClassifier};
use crate::market::MarketDataClient;
use crate::models::{
    CompanyOverview, IntentCategory, IntentResult, OverviewPayload, Quote, QuotePayload,
    ResponseEnvelope, UserProfile, INTENT_STOCK_PRICE,
};
use crate::store::ProfileStore;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

pub struct ChatOrchestrator {
    classifier: IntentClassifier,
    generator: ResponseGenerator,
    market: MarketDataClient,
    store: Arc<dyn ProfileStore>,
}

impl ChatOrchestrator {
    pub fn new(
        gemini: Arc<GeminiClient>,
        market: MarketDataClient,
        store: Arc<dyn ProfileStore>,
    ) -> Self {
        Self {
            classifier: IntentClassifier::new(gemini.clone()),
            generator: ResponseGenerator::new(gemini),
            market,
            store,
        }
    }

    /// Run one chat turn. Upstream calls are sequential: classify, then
    /// the optional market lookup, then generation.
    pub async fn handle_turn(
        &self,
        message: &str,
        user_id: Uuid,
    ) -> crate::Result<ResponseEnvelope> {
        let profile = match self.store.get(user_id).await? {
            Some(profile) => profile,
            None => {
                info!("No profile for user {}, using defaults", user_id);
                UserProfile::default_for(user_id)
            }
        };

        let intent = self.classifier.classify(message).await;
        info!(
            "Intent: {} ({:?}): {}",
            intent.intent_type, intent.category, intent.details
        );

        let plan = plan_enrichment(&intent, message);
        debug!("Enrichment plan: {:?}", plan);

        let enrichment = match plan {
            EnrichmentPlan::Quote(ticker) => {
                Enrichment::Quote(self.market.get_quote(&ticker).await?)
            }
            EnrichmentPlan::Overview(ticker) => {
                Enrichment::Overview(self.market.get_overview(&ticker).await?)
            }
            EnrichmentPlan::Skip => Enrichment::None,
        };

        let text = self.generator.generate(message, &profile).await?;

        Ok(compose_envelope(text, enrichment))
    }
}

/// What market data, if any, a turn should be enriched with.
#[derive(Debug, Clone, PartialEq, Eq)]
enum EnrichmentPlan {
    Quote(String),
    Overview(String),
    Skip,
}

enum Enrichment {
    Quote(Quote),
    Overview(CompanyOverview),
    None,
}

/// Only stocks-category intents with a recognizable ticker get market
/// data: a price intent takes a quote, anything else the company
/// overview.
fn plan_enrichment(intent: &IntentResult, message: &str) -> EnrichmentPlan {
    if intent.category != IntentCategory::Stocks {
        return EnrichmentPlan::Skip;
    }

    let Some(ticker) = extract_ticker(message) else {
        return EnrichmentPlan::Skip;
    };

    if intent.intent_type == INTENT_STOCK_PRICE {
        EnrichmentPlan::Quote(ticker)
    } else {
        EnrichmentPlan::Overview(ticker)
    }
}

fn compose_envelope(message: String, enrichment: Enrichment) -> ResponseEnvelope {
    match enrichment {
        Enrichment::Quote(price) => ResponseEnvelope::StockPrice {
            message,
            data: QuotePayload { price },
        },
        Enrichment::Overview(overview) => ResponseEnvelope::InvestmentRecommendation {
            message,
            data: OverviewPayload { overview },
        },
        Enrichment::None => ResponseEnvelope::Text { message },
    }
}
