//! Alpha Vantage market data client
//!
//! Three read-only lookups against the single /query endpoint: current
//! quote, compact daily history, company overview. Every upstream
//! failure (network, non-2xx, rate-limit note, malformed body) is
//! logged and returned as an error. No retries, no substitute values.

use crate::error::AdvisorError;
use crate::models::{CompanyOverview, DailyBar, DailySeries, Quote};
use chrono::NaiveDate;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{error, info};

const ALPHA_VANTAGE_BASE_URL: &str = "https://www.alphavantage.co/query";

pub struct MarketDataClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl MarketDataClient {
    pub fn new(api_key: String) -> Self {
        let client = Client::builder()
            .pool_idle_timeout(Duration::from_secs(60))
            .pool_max_idle_per_host(8)
            .timeout(Duration::from_secs(30))
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            api_key,
            base_url: ALPHA_VANTAGE_BASE_URL.to_string(),
        }
    }

    /// Current price/volume/change snapshot for a ticker.
    pub async fn get_quote(&self, symbol: &str) -> crate::Result<Quote> {
        let body = self.fetch("GLOBAL_QUOTE", symbol, &[]).await?;
        quote_from_body(&body).map_err(log_and_return)
    }

    /// Compact (~100 point) daily OHLCV series for a ticker.
    pub async fn get_daily_series(&self, symbol: &str) -> crate::Result<DailySeries> {
        let body = self
            .fetch("TIME_SERIES_DAILY", symbol, &[("outputsize", "compact")])
            .await?;
        series_from_body(symbol, &body).map_err(log_and_return)
    }

    /// Static company descriptor fields for a ticker.
    pub async fn get_overview(&self, symbol: &str) -> crate::Result<CompanyOverview> {
        let body = self.fetch("OVERVIEW", symbol, &[]).await?;
        overview_from_body(&body).map_err(log_and_return)
    }

    async fn fetch(
        &self,
        function: &str,
        symbol: &str,
        extra: &[(&str, &str)],
    ) -> crate::Result<Value> {
        if symbol.trim().is_empty() {
            return Err(AdvisorError::InvalidRequest(
                "symbol must be a non-empty ticker string".to_string(),
            ));
        }

        info!("Alpha Vantage {} lookup for {}", function, symbol);

        let mut params = vec![
            ("function", function),
            ("symbol", symbol),
            ("apikey", self.api_key.as_str()),
        ];
        params.extend_from_slice(extra);

        let response = self
            .client
            .get(&self.base_url)
            .query(&params)
            .send()
            .await
            .map_err(|e| {
                error!("Alpha Vantage request failed for {}: {}", symbol, e);
                AdvisorError::HttpError(e)
            })?;

        if !response.status().is_success() {
            let status = response.status();
            error!("Alpha Vantage returned {} for {}", status, symbol);
            return Err(AdvisorError::MarketDataError(format!(
                "Alpha Vantage returned {} for {}",
                status, symbol
            )));
        }

        let body: Value = response.json().await.map_err(|e| {
            error!("Alpha Vantage sent a non-JSON body for {}: {}", symbol, e);
            AdvisorError::HttpError(e)
        })?;

        check_in_band_errors(&body).map_err(log_and_return)?;

        Ok(body)
    }
}

fn log_and_return(e: AdvisorError) -> AdvisorError {
    error!("Market data lookup failed: {}", e);
    e
}

/// Alpha Vantage reports throttling and bad requests in-band with HTTP
/// 200: {"Note": "...5 calls per minute..."} or {"Error Message": "..."}.
fn check_in_band_errors(body: &Value) -> crate::Result<()> {
    if let Some(note) = body.get("Note").and_then(Value::as_str) {
        return Err(AdvisorError::MarketDataError(format!(
            "Alpha Vantage rate limited: {}",
            note
        )));
    }
    if let Some(msg) = body.get("Error Message").and_then(Value::as_str) {
        return Err(AdvisorError::MarketDataError(format!(
            "Alpha Vantage error: {}",
            msg
        )));
    }
    Ok(())
}

//
// ================= Raw payload shapes =================
//

#[derive(Debug, Deserialize)]
struct AvGlobalQuote {
    #[serde(rename = "01. symbol")]
    symbol: String,
    #[serde(rename = "05. price")]
    price: String,
    #[serde(rename = "06. volume")]
    volume: String,
    #[serde(rename = "07. latest trading day")]
    latest_trading_day: String,
    #[serde(rename = "08. previous close")]
    previous_close: String,
    #[serde(rename = "09. change")]
    change: String,
    #[serde(rename = "10. change percent")]
    change_percent: String,
}

#[derive(Debug, Deserialize)]
struct AvDailyBar {
    #[serde(rename = "1. open")]
    open: String,
    #[serde(rename = "2. high")]
    high: String,
    #[serde(rename = "3. low")]
    low: String,
    #[serde(rename = "4. close")]
    close: String,
    #[serde(rename = "5. volume")]
    volume: String,
}

#[derive(Debug, Deserialize)]
struct AvOverview {
    #[serde(rename = "Symbol")]
    symbol: String,
    #[serde(rename = "Name")]
    name: String,
    #[serde(rename = "Description", default)]
    description: String,
    #[serde(rename = "Sector", default)]
    sector: String,
    #[serde(rename = "Industry", default)]
    industry: String,
    #[serde(rename = "MarketCapitalization", default)]
    market_capitalization: String,
    #[serde(rename = "PERatio", default)]
    pe_ratio: String,
    #[serde(rename = "DividendYield", default)]
    dividend_yield: String,
    #[serde(rename = "52WeekHigh", default)]
    fifty_two_week_high: String,
    #[serde(rename = "52WeekLow", default)]
    fifty_two_week_low: String,
}

//
// ================= Normalization =================
//

fn parse_f64(field: &str, value: &str) -> crate::Result<f64> {
    value.trim().parse::<f64>().map_err(|_| {
        AdvisorError::MarketDataError(format!("malformed {} value: {:?}", field, value))
    })
}

fn parse_u64(field: &str, value: &str) -> crate::Result<u64> {
    value.trim().parse::<u64>().map_err(|_| {
        AdvisorError::MarketDataError(format!("malformed {} value: {:?}", field, value))
    })
}

fn parse_date(field: &str, value: &str) -> crate::Result<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").map_err(|_| {
        AdvisorError::MarketDataError(format!("malformed {} value: {:?}", field, value))
    })
}

/// Numeric overview fields arrive as strings and may be "None" or "-"
/// for companies without the datum. Those become None, not errors.
fn parse_optional_f64(value: &str) -> Option<f64> {
    value.trim().parse::<f64>().ok()
}

fn parse_optional_u64(value: &str) -> Option<u64> {
    value.trim().parse::<u64>().ok()
}

fn quote_from_body(body: &Value) -> crate::Result<Quote> {
    let raw = body
        .get("Global Quote")
        .cloned()
        .ok_or_else(|| AdvisorError::MarketDataError("missing Global Quote payload".to_string()))?;

    let raw: AvGlobalQuote = serde_json::from_value(raw)
        .map_err(|e| AdvisorError::MarketDataError(format!("malformed quote payload: {}", e)))?;

    Ok(Quote {
        price: parse_f64("price", &raw.price)?,
        change: parse_f64("change", &raw.change)?,
        change_percent: parse_f64("change percent", raw.change_percent.trim_end_matches('%'))?,
        volume: parse_u64("volume", &raw.volume)?,
        previous_close: parse_f64("previous close", &raw.previous_close)?,
        latest_trading_day: parse_date("latest trading day", &raw.latest_trading_day)?,
        symbol: raw.symbol,
    })
}

fn series_from_body(symbol: &str, body: &Value) -> crate::Result<DailySeries> {
    let raw = body
        .get("Time Series (Daily)")
        .cloned()
        .ok_or_else(|| AdvisorError::MarketDataError("missing time series payload".to_string()))?;

    let raw: BTreeMap<String, AvDailyBar> = serde_json::from_value(raw)
        .map_err(|e| AdvisorError::MarketDataError(format!("malformed time series: {}", e)))?;

    let mut bars = BTreeMap::new();
    for (date_str, bar) in raw {
        let date = parse_date("series date", &date_str)?;
        bars.insert(
            date,
            DailyBar {
                open: parse_f64("open", &bar.open)?,
                high: parse_f64("high", &bar.high)?,
                low: parse_f64("low", &bar.low)?,
                close: parse_f64("close", &bar.close)?,
                volume: parse_u64("volume", &bar.volume)?,
            },
        );
    }

    Ok(DailySeries {
        symbol: symbol.to_string(),
        bars,
    })
}

fn overview_from_body(body: &Value) -> crate::Result<CompanyOverview> {
    // Unknown symbols come back as an empty object, which fails the
    // required Symbol/Name fields below.
    let raw: AvOverview = serde_json::from_value(body.clone())
        .map_err(|e| AdvisorError::MarketDataError(format!("malformed overview payload: {}", e)))?;

    Ok(CompanyOverview {
        symbol: raw.symbol,
        name: raw.name,
        description: raw.description,
        sector: raw.sector,
        industry: raw.industry,
        market_capitalization: parse_optional_u64(&raw.market_capitalization),
        pe_ratio: parse_optional_f64(&raw.pe_ratio),
        dividend_yield: parse_optional_f64(&raw.dividend_yield),
        fifty_two_week_high: parse_optional_f64(&raw.fifty_two_week_high),
        fifty_two_week_low: parse_optional_f64(&raw.fifty_two_week_low),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_quote_body() -> Value {
        json!({
            "Global Quote": {
                "01. symbol": "AAPL",
                "02. open": "149.00",
                "03. high": "151.00",
                "04. low": "148.50",
                "05. price": "150.50",
                "06. volume": "54321000",
                "07. latest trading day": "2024-01-15",
                "08. previous close": "148.00",
                "09. change": "2.5000",
                "10. change percent": "1.6892%"
            }
        })
    }

    #[test]
    fn test_quote_normalization() {
        let quote = quote_from_body(&sample_quote_body()).unwrap();

        assert_eq!(quote.symbol, "AAPL");
        assert_eq!(quote.price, 150.50);
        assert_eq!(quote.change, 2.5);
        assert_eq!(quote.change_percent, 1.6892);
        assert_eq!(quote.volume, 54_321_000);
        assert_eq!(quote.previous_close, 148.0);
        assert_eq!(
            quote.latest_trading_day,
            NaiveDate::from_ymd_opt(2024, 1, 15).unwrap()
        );
    }

    #[test]
    fn test_quote_missing_payload_is_error() {
        let err = quote_from_body(&json!({})).unwrap_err();
        assert!(err.to_string().contains("Global Quote"));
    }

    #[test]
    fn test_quote_empty_payload_is_error() {
        // Unknown symbols return {"Global Quote": {}}
        let err = quote_from_body(&json!({"Global Quote": {}})).unwrap_err();
        assert!(err.to_string().contains("malformed quote payload"));
    }

    #[test]
    fn test_quote_unparseable_number_is_error() {
        let mut body = sample_quote_body();
        body["Global Quote"]["05. price"] = json!("not-a-number");
        let err = quote_from_body(&body).unwrap_err();
        assert!(err.to_string().contains("price"));
    }

    #[test]
    fn test_rate_limit_note_is_error() {
        let body = json!({
            "Note": "Thank you for using Alpha Vantage! Our standard API call frequency is 5 calls per minute."
        });
        let err = check_in_band_errors(&body).unwrap_err();
        assert!(err.to_string().contains("rate limited"));
    }

    #[test]
    fn test_error_message_is_error() {
        let body = json!({"Error Message": "Invalid API call."});
        let err = check_in_band_errors(&body).unwrap_err();
        assert!(err.to_string().contains("Invalid API call"));
    }

    #[test]
    fn test_daily_series_parses_sorted() {
        let body = json!({
            "Meta Data": {"2. Symbol": "IBM"},
            "Time Series (Daily)": {
                "2024-01-16": {
                    "1. open": "160.00", "2. high": "162.00",
                    "3. low": "159.00", "4. close": "161.50", "5. volume": "4100000"
                },
                "2024-01-15": {
                    "1. open": "158.00", "2. high": "160.50",
                    "3. low": "157.50", "4. close": "160.00", "5. volume": "3900000"
                }
            }
        });

        let series = series_from_body("IBM", &body).unwrap();
        assert_eq!(series.symbol, "IBM");
        assert_eq!(series.bars.len(), 2);

        // BTreeMap keys iterate in ascending date order
        let dates: Vec<_> = series.bars.keys().collect();
        assert!(dates[0] < dates[1]);
        let first = series.bars.values().next().unwrap();
        assert_eq!(first.close, 160.00);
    }

    #[test]
    fn test_daily_series_missing_payload_is_error() {
        let err = series_from_body("IBM", &json!({})).unwrap_err();
        assert!(err.to_string().contains("time series"));
    }

    #[test]
    fn test_overview_normalization() {
        let body = json!({
            "Symbol": "AAPL",
            "Name": "Apple Inc",
            "Description": "Apple Inc. designs, manufactures and markets smartphones.",
            "Sector": "TECHNOLOGY",
            "Industry": "ELECTRONIC COMPUTERS",
            "MarketCapitalization": "2800000000000",
            "PERatio": "29.5",
            "DividendYield": "0.0055",
            "52WeekHigh": "199.62",
            "52WeekLow": "124.17"
        });

        let overview = overview_from_body(&body).unwrap();
        assert_eq!(overview.symbol, "AAPL");
        assert_eq!(overview.name, "Apple Inc");
        assert_eq!(overview.market_capitalization, Some(2_800_000_000_000));
        assert_eq!(overview.pe_ratio, Some(29.5));
    }

    #[test]
    fn test_overview_none_fields_become_none() {
        let body = json!({
            "Symbol": "NEWCO",
            "Name": "NewCo Holdings",
            "PERatio": "None",
            "DividendYield": "-"
        });

        let overview = overview_from_body(&body).unwrap();
        assert_eq!(overview.pe_ratio, None);
        assert_eq!(overview.dividend_yield, None);
        assert_eq!(overview.sector, "");
    }

    #[test]
    fn test_overview_empty_body_is_error() {
        let err = overview_from_body(&json!({})).unwrap_err();
        assert!(err.to_string().contains("malformed overview payload"));
    }
}
