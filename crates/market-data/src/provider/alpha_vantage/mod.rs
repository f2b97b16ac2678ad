//! Alpha Vantage market data provider implementation.
//!
//! This module provides market data from the Alpha Vantage API:
//! - Quotes via the GLOBAL_QUOTE function
//! - Fundamentals via the OVERVIEW function
//!
//! Alpha Vantage returns every numeric value as a string and signals
//! quota exhaustion through "Note"/"Information" sentinels in an
//! otherwise successful response. Free tier is limited to 5 API calls
//! per minute.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::errors::MarketDataError;
use crate::models::PartialRecord;
use crate::provider::{MarketDataProvider, RateLimit};

const BASE_URL: &str = "https://www.alphavantage.co/query";
const PROVIDER_ID: &str = "ALPHA_VANTAGE";

// ============================================================================
// Response structures for the Alpha Vantage API
// ============================================================================

/// GLOBAL_QUOTE response wrapper
#[derive(Debug, Deserialize)]
struct GlobalQuoteResponse {
    #[serde(rename = "Global Quote")]
    global_quote: Option<GlobalQuote>,
    #[serde(rename = "Error Message")]
    error_message: Option<String>,
    #[serde(rename = "Note")]
    note: Option<String>,
    #[serde(rename = "Information")]
    information: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GlobalQuote {
    #[serde(rename = "05. price")]
    price: Option<String>,
    #[serde(rename = "06. volume")]
    volume: Option<String>,
    #[serde(rename = "08. previous close")]
    previous_close: Option<String>,
    #[serde(rename = "09. change")]
    change: Option<String>,
    #[serde(rename = "10. change percent")]
    change_percent: Option<String>,
}

/// OVERVIEW response. A not-found symbol yields an empty object.
#[derive(Debug, Deserialize)]
struct OverviewResponse {
    #[serde(rename = "Name")]
    name: Option<String>,
    #[serde(rename = "Exchange")]
    exchange: Option<String>,
    #[serde(rename = "Currency")]
    currency: Option<String>,
    #[serde(rename = "Country")]
    country: Option<String>,
    #[serde(rename = "Sector")]
    sector: Option<String>,
    #[serde(rename = "Industry")]
    industry: Option<String>,
    #[serde(rename = "MarketCapitalization")]
    market_capitalization: Option<String>,
    #[serde(rename = "PERatio")]
    pe_ratio: Option<String>,
    #[serde(rename = "ForwardPE")]
    forward_pe: Option<String>,
    #[serde(rename = "EPS")]
    eps: Option<String>,
    #[serde(rename = "DividendYield")]
    dividend_yield: Option<String>,
    #[serde(rename = "DividendPerShare")]
    dividend_per_share: Option<String>,
    #[serde(rename = "Beta")]
    beta: Option<String>,
    #[serde(rename = "52WeekHigh")]
    week_52_high: Option<String>,
    #[serde(rename = "52WeekLow")]
    week_52_low: Option<String>,
    #[serde(rename = "Note")]
    note: Option<String>,
    #[serde(rename = "Information")]
    information: Option<String>,
}

/// Parse an Alpha Vantage numeric string. The API uses "None", "-" and
/// empty strings as null markers, and suffixes percent values with '%'.
fn parse_number(value: &Option<String>) -> Option<f64> {
    let raw = value.as_deref()?.trim();
    if raw.is_empty() || raw == "None" || raw == "-" {
        return None;
    }
    raw.trim_end_matches('%').parse().ok()
}

// ============================================================================
// AlphaVantageProvider
// ============================================================================

/// Alpha Vantage market data provider. Requires an API key.
pub struct AlphaVantageProvider {
    client: Client,
    api_key: String,
}

impl AlphaVantageProvider {
    /// Create a new Alpha Vantage provider with the given API key.
    pub fn new(api_key: String) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_else(|_| Client::new());

        Self { client, api_key }
    }

    /// Make a request to the Alpha Vantage API.
    async fn get_text(&self, params: &[(&str, &str)]) -> Result<String, MarketDataError> {
        let mut all_params: Vec<(&str, &str)> = params.to_vec();
        all_params.push(("apikey", &self.api_key));

        let url = reqwest::Url::parse_with_params(BASE_URL, &all_params).map_err(|e| {
            MarketDataError::ProviderError {
                provider: PROVIDER_ID.to_string(),
                message: format!("Failed to build URL: {}", e),
            }
        })?;

        debug!(
            "Alpha Vantage request: {}",
            url.as_str().replace(&self.api_key, "***")
        );

        let response = self.client.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                MarketDataError::Timeout {
                    provider: PROVIDER_ID.to_string(),
                }
            } else {
                MarketDataError::ProviderError {
                    provider: PROVIDER_ID.to_string(),
                    message: e.to_string(),
                }
            }
        })?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(MarketDataError::RateLimited {
                provider: PROVIDER_ID.to_string(),
            });
        }

        if !status.is_success() {
            return Err(MarketDataError::ProviderError {
                provider: PROVIDER_ID.to_string(),
                message: format!("HTTP {}", status),
            });
        }

        response
            .text()
            .await
            .map_err(|e| MarketDataError::ProviderError {
                provider: PROVIDER_ID.to_string(),
                message: e.to_string(),
            })
    }

    /// Check for API-level error sentinels in an otherwise 200 response.
    fn check_api_error(
        error_message: &Option<String>,
        note: &Option<String>,
        information: &Option<String>,
    ) -> Result<(), MarketDataError> {
        if let Some(msg) = error_message {
            return Err(MarketDataError::ProviderError {
                provider: PROVIDER_ID.to_string(),
                message: msg.clone(),
            });
        }
        // "Note" and "Information" signal the per-minute / per-day quota
        if note.is_some() || information.is_some() {
            return Err(MarketDataError::RateLimited {
                provider: PROVIDER_ID.to_string(),
            });
        }
        Ok(())
    }

    /// Adapter for the GLOBAL_QUOTE function.
    async fn fetch_quote(&self, symbol: &str) -> Result<PartialRecord, MarketDataError> {
        let params = [("function", "GLOBAL_QUOTE"), ("symbol", symbol)];
        let text = self.get_text(&params).await?;

        let response: GlobalQuoteResponse =
            serde_json::from_str(&text).map_err(|e| MarketDataError::ProviderError {
                provider: PROVIDER_ID.to_string(),
                message: format!("Failed to parse GLOBAL_QUOTE response: {}", e),
            })?;

        Self::check_api_error(&response.error_message, &response.note, &response.information)?;

        let quote = response
            .global_quote
            .ok_or_else(|| MarketDataError::SymbolNotFound(symbol.to_string()))?;

        let price = parse_number(&quote.price)
            .filter(|p| *p > 0.0)
            .ok_or_else(|| MarketDataError::SymbolNotFound(symbol.to_string()))?;

        Ok(PartialRecord {
            price: Some(price),
            previous_close: parse_number(&quote.previous_close),
            change: parse_number(&quote.change),
            change_percent: parse_number(&quote.change_percent),
            volume: parse_number(&quote.volume),
            ..Default::default()
        })
    }

    /// Adapter for the OVERVIEW function.
    async fn fetch_overview(&self, symbol: &str) -> Result<PartialRecord, MarketDataError> {
        let params = [("function", "OVERVIEW"), ("symbol", symbol)];
        let text = self.get_text(&params).await?;

        let response: OverviewResponse =
            serde_json::from_str(&text).map_err(|e| MarketDataError::ProviderError {
                provider: PROVIDER_ID.to_string(),
                message: format!("Failed to parse OVERVIEW response: {}", e),
            })?;

        Self::check_api_error(&None, &response.note, &response.information)?;

        // Not-found symbols come back as an empty object
        if response.name.is_none() {
            return Err(MarketDataError::SymbolNotFound(symbol.to_string()));
        }

        Ok(PartialRecord {
            name: response.name,
            exchange: response.exchange,
            currency: response.currency,
            country: response.country,
            sector: response.sector,
            industry: response.industry,
            market_cap: parse_number(&response.market_capitalization),
            pe_ratio: parse_number(&response.pe_ratio),
            forward_pe: parse_number(&response.forward_pe),
            eps: parse_number(&response.eps),
            // DividendYield is a ratio, the record carries percent
            dividend_yield: parse_number(&response.dividend_yield).map(|y| y * 100.0),
            dividend_rate: parse_number(&response.dividend_per_share),
            beta: parse_number(&response.beta),
            week_52_high: parse_number(&response.week_52_high),
            week_52_low: parse_number(&response.week_52_low),
            ..Default::default()
        })
    }
}

#[async_trait]
impl MarketDataProvider for AlphaVantageProvider {
    fn id(&self) -> &'static str {
        PROVIDER_ID
    }

    fn label(&self) -> &'static str {
        "Alpha Vantage"
    }

    fn rate_limit(&self) -> RateLimit {
        RateLimit {
            requests_per_minute: 5, // Free tier limit
            min_delay: Duration::from_secs(12),
        }
    }

    async fn fetch(&self, symbol: &str) -> Vec<PartialRecord> {
        let (quote, overview) = tokio::join!(self.fetch_quote(symbol), self.fetch_overview(symbol));

        let mut records = Vec::with_capacity(2);
        match quote {
            Ok(record) => records.push(record),
            Err(e) => warn!("Alpha Vantage quote adapter failed for {}: {}", symbol, e),
        }
        match overview {
            Ok(record) => records.push(record),
            Err(e) => debug!("Alpha Vantage overview adapter failed for {}: {}", symbol, e),
        }
        records
    }
}
