use financial_advisor_bot::{
    api::{start_server, ApiState},
    config::AppConfig,
    gemini::GeminiClient,
    market::MarketDataClient,
    orchestrator::ChatOrchestrator,
    store::build_store,
};
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    // Load environment variables
    dotenv::dotenv().ok();

    // Fatal without GEMINI_API_KEY / ALPHA_VANTAGE_API_KEY
    let config = AppConfig::from_env()?;

    info!("🚀 Financial Advisor Bot - API Server");
    info!("📍 Port: {}", config.port);

    // Create components
    let gemini = Arc::new(GeminiClient::new(config.gemini_api_key.clone()));
    let market = MarketDataClient::new(config.alpha_vantage_api_key.clone());
    let store = build_store(&config);

    let orchestrator = Arc::new(ChatOrchestrator::new(gemini, market, store.clone()));

    info!("✅ Advisor initialized");
    info!("📡 Starting API server...");

    start_server(
        ApiState {
            orchestrator,
            store,
        },
        config.port,
    )
    .await?;

    Ok(())
}
