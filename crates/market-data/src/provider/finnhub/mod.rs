//! Finnhub market data provider implementation.
//!
//! This module provides market data from the Finnhub API:
//! - Quotes via the /quote endpoint
//! - Company profiles via the /stock/profile2 endpoint
//! - Fundamentals via the /stock/metric endpoint
//!
//! Finnhub free tier is limited to 60 API calls per minute.
//! API documentation: https://finnhub.io/docs/api

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::errors::MarketDataError;
use crate::models::PartialRecord;
use crate::provider::{MarketDataProvider, RateLimit};

const BASE_URL: &str = "https://finnhub.io/api/v1";
const PROVIDER_ID: &str = "FINNHUB";

// ============================================================================
// API Response Structures
// ============================================================================

/// Response from the /quote endpoint
#[derive(Debug, Deserialize)]
struct QuoteResponse {
    /// Current price
    c: Option<f64>,
    /// Change
    d: Option<f64>,
    /// Percent change
    dp: Option<f64>,
    /// Open price of the day
    o: Option<f64>,
    /// Previous close
    pc: Option<f64>,
    // Note: h (high), l (low), t (timestamp) exist but are not used
}

/// Response from the /stock/profile2 endpoint
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProfileResponse {
    name: Option<String>,
    ticker: Option<String>,
    exchange: Option<String>,
    finnhub_industry: Option<String>,
    country: Option<String>,
    /// Market capitalization, in millions
    market_capitalization: Option<f64>,
    currency: Option<String>,
}

/// Response from the /stock/metric endpoint.
///
/// The metric map carries well over a hundred keys of mixed types, so the
/// interesting ones are pulled out of a loosely typed map.
#[derive(Debug, Deserialize)]
struct MetricResponse {
    metric: Option<HashMap<String, serde_json::Value>>,
}

impl MetricResponse {
    fn number(&self, key: &str) -> Option<f64> {
        self.metric.as_ref()?.get(key)?.as_f64()
    }
}

/// Error response from Finnhub
#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: Option<String>,
}

// ============================================================================
// FinnhubProvider
// ============================================================================

/// Finnhub market data provider. Requires an API key.
pub struct FinnhubProvider {
    client: Client,
    api_key: String,
}

impl FinnhubProvider {
    /// Create a new Finnhub provider with the given API key.
    pub fn new(api_key: String) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_else(|_| Client::new());

        Self { client, api_key }
    }

    /// Make a GET request to the Finnhub API.
    async fn get_text(
        &self,
        endpoint: &str,
        params: &[(&str, &str)],
    ) -> Result<String, MarketDataError> {
        let url = format!("{}{}", BASE_URL, endpoint);

        let mut request = self.client.get(&url);

        // API key as header rather than query param
        request = request.header("X-Finnhub-Token", &self.api_key);

        for (key, value) in params {
            request = request.query(&[(key, value)]);
        }

        debug!("Finnhub request: {} with {} params", endpoint, params.len());

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                MarketDataError::Timeout {
                    provider: PROVIDER_ID.to_string(),
                }
            } else {
                MarketDataError::ProviderError {
                    provider: PROVIDER_ID.to_string(),
                    message: format!("Request failed: {}", e),
                }
            }
        })?;

        let status = response.status();

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS
            || status == reqwest::StatusCode::FORBIDDEN
        {
            return Err(MarketDataError::RateLimited {
                provider: PROVIDER_ID.to_string(),
            });
        }

        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(MarketDataError::ProviderError {
                provider: PROVIDER_ID.to_string(),
                message: "Invalid or missing API key".to_string(),
            });
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();

            if let Ok(error_resp) = serde_json::from_str::<ErrorResponse>(&body) {
                if let Some(error_msg) = error_resp.error {
                    return Err(MarketDataError::ProviderError {
                        provider: PROVIDER_ID.to_string(),
                        message: error_msg,
                    });
                }
            }

            return Err(MarketDataError::ProviderError {
                provider: PROVIDER_ID.to_string(),
                message: format!("HTTP {} - {}", status, body),
            });
        }

        response
            .text()
            .await
            .map_err(|e| MarketDataError::ProviderError {
                provider: PROVIDER_ID.to_string(),
                message: format!("Failed to read response: {}", e),
            })
    }

    /// Adapter for the /quote endpoint.
    async fn fetch_quote(&self, symbol: &str) -> Result<PartialRecord, MarketDataError> {
        let params = [("symbol", symbol)];
        let text = self.get_text("/quote", &params).await?;

        let response: QuoteResponse =
            serde_json::from_str(&text).map_err(|e| MarketDataError::ProviderError {
                provider: PROVIDER_ID.to_string(),
                message: format!("Failed to parse quote response: {}", e),
            })?;

        let close = response.c.ok_or_else(|| {
            MarketDataError::SymbolNotFound(format!("No quote data for symbol: {}", symbol))
        })?;

        // Finnhub returns 0 for unknown symbols instead of an error
        if close == 0.0 && response.o.unwrap_or(0.0) == 0.0 {
            return Err(MarketDataError::SymbolNotFound(format!(
                "Symbol not found or no trading data: {}",
                symbol
            )));
        }

        Ok(PartialRecord {
            price: Some(close),
            previous_close: response.pc,
            change: response.d,
            change_percent: response.dp,
            ..Default::default()
        })
    }

    /// Adapter for the /stock/profile2 endpoint.
    async fn fetch_profile(&self, symbol: &str) -> Result<PartialRecord, MarketDataError> {
        let params = [("symbol", symbol)];
        let text = self.get_text("/stock/profile2", &params).await?;

        // Empty response means symbol not found
        if text.trim() == "{}" {
            return Err(MarketDataError::SymbolNotFound(format!(
                "No profile data for symbol: {}",
                symbol
            )));
        }

        let response: ProfileResponse =
            serde_json::from_str(&text).map_err(|e| MarketDataError::ProviderError {
                provider: PROVIDER_ID.to_string(),
                message: format!("Failed to parse profile response: {}", e),
            })?;

        if response.name.is_none() && response.ticker.is_none() {
            return Err(MarketDataError::SymbolNotFound(format!(
                "No profile data for symbol: {}",
                symbol
            )));
        }

        Ok(PartialRecord {
            name: response.name,
            exchange: response.exchange,
            country: response.country,
            sector: response.finnhub_industry.clone(),
            industry: response.finnhub_industry,
            currency: response.currency,
            // Finnhub reports market cap in millions
            market_cap: response.market_capitalization.map(|mc| mc * 1_000_000.0),
            ..Default::default()
        })
    }

    /// Adapter for the /stock/metric endpoint.
    async fn fetch_metrics(&self, symbol: &str) -> Result<PartialRecord, MarketDataError> {
        let params = [("symbol", symbol), ("metric", "all")];
        let text = self.get_text("/stock/metric", &params).await?;

        let response: MetricResponse =
            serde_json::from_str(&text).map_err(|e| MarketDataError::ProviderError {
                provider: PROVIDER_ID.to_string(),
                message: format!("Failed to parse metric response: {}", e),
            })?;

        let record = PartialRecord {
            pe_ratio: response.number("peTTM"),
            eps: response.number("epsTTM"),
            beta: response.number("beta"),
            dividend_yield: response.number("dividendYieldIndicatedAnnual"),
            week_52_high: response.number("52WeekHigh"),
            week_52_low: response.number("52WeekLow"),
            // Reported in millions of shares
            avg_volume: response
                .number("10DayAverageTradingVolume")
                .map(|v| v * 1_000_000.0),
            ..Default::default()
        };

        if record.is_empty() {
            return Err(MarketDataError::SymbolNotFound(format!(
                "No metric data for symbol: {}",
                symbol
            )));
        }

        Ok(record)
    }
}

#[async_trait]
impl MarketDataProvider for FinnhubProvider {
    fn id(&self) -> &'static str {
        PROVIDER_ID
    }

    fn label(&self) -> &'static str {
        "Finnhub"
    }

    fn rate_limit(&self) -> RateLimit {
        RateLimit {
            requests_per_minute: 60, // Free tier limit
            min_delay: Duration::from_millis(100),
        }
    }

    async fn fetch(&self, symbol: &str) -> Vec<PartialRecord> {
        let (quote, profile, metrics) = tokio::join!(
            self.fetch_quote(symbol),
            self.fetch_profile(symbol),
            self.fetch_metrics(symbol)
        );

        let mut records = Vec::with_capacity(3);
        for (adapter, result) in [
            ("quote", quote),
            ("profile", profile),
            ("metric", metrics),
        ] {
            match result {
                Ok(record) => records.push(record),
                Err(e) => warn!("Finnhub {} adapter failed for {}: {}", adapter, symbol, e),
            }
        }
        records
    }
}
