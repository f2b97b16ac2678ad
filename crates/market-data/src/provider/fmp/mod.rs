//! Financial Modeling Prep market data provider implementation.
//!
//! This module provides market data from the FMP API:
//! - Quotes via the /api/v3/quote endpoint
//! - Company profiles via the /api/v3/profile endpoint
//!
//! FMP is the only configured source that reports an ISIN, which makes it
//! the usual origin of the derived WKN for German instruments.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::errors::MarketDataError;
use crate::models::PartialRecord;
use crate::provider::{MarketDataProvider, RateLimit};

const BASE_URL: &str = "https://financialmodelingprep.com/api/v3";
const PROVIDER_ID: &str = "FMP";

// ============================================================================
// API Response Structures
// ============================================================================

/// Element of the /quote response array
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QuoteItem {
    name: Option<String>,
    price: Option<f64>,
    change: Option<f64>,
    changes_percentage: Option<f64>,
    previous_close: Option<f64>,
    market_cap: Option<f64>,
    pe: Option<f64>,
    eps: Option<f64>,
    year_high: Option<f64>,
    year_low: Option<f64>,
    volume: Option<f64>,
    avg_volume: Option<f64>,
    exchange: Option<String>,
}

/// Element of the /profile response array
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProfileItem {
    company_name: Option<String>,
    currency: Option<String>,
    isin: Option<String>,
    exchange_short_name: Option<String>,
    industry: Option<String>,
    sector: Option<String>,
    country: Option<String>,
    mkt_cap: Option<f64>,
    beta: Option<f64>,
    last_div: Option<f64>,
    vol_avg: Option<f64>,
}

/// Error body returned with non-success statuses
#[derive(Debug, Deserialize)]
struct ErrorResponse {
    #[serde(rename = "Error Message")]
    error_message: Option<String>,
}

// ============================================================================
// FmpProvider
// ============================================================================

/// Financial Modeling Prep market data provider. Requires an API key.
pub struct FmpProvider {
    client: Client,
    api_key: String,
}

impl FmpProvider {
    /// Create a new FMP provider with the given API key.
    pub fn new(api_key: String) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_else(|_| Client::new());

        Self { client, api_key }
    }

    /// Make a GET request to the FMP API.
    async fn get_text(&self, endpoint: &str, symbol: &str) -> Result<String, MarketDataError> {
        let url = format!(
            "{}{}/{}?apikey={}",
            BASE_URL,
            endpoint,
            urlencoding::encode(symbol),
            self.api_key
        );

        debug!("FMP request: {} for {}", endpoint, symbol);

        let response = self.client.get(&url).send().await.map_err(|e| {
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
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(MarketDataError::RateLimited {
                provider: PROVIDER_ID.to_string(),
            });
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();

            if let Ok(error_resp) = serde_json::from_str::<ErrorResponse>(&body) {
                if let Some(error_msg) = error_resp.error_message {
                    return Err(MarketDataError::ProviderError {
                        provider: PROVIDER_ID.to_string(),
                        message: error_msg,
                    });
                }
            }

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
                message: format!("Failed to read response: {}", e),
            })
    }

    /// Adapter for the /quote endpoint.
    async fn fetch_quote(&self, symbol: &str) -> Result<PartialRecord, MarketDataError> {
        let text = self.get_text("/quote", symbol).await?;

        let items: Vec<QuoteItem> =
            serde_json::from_str(&text).map_err(|e| MarketDataError::ProviderError {
                provider: PROVIDER_ID.to_string(),
                message: format!("Failed to parse quote response: {}", e),
            })?;

        let item = items
            .into_iter()
            .next()
            .ok_or_else(|| MarketDataError::SymbolNotFound(symbol.to_string()))?;

        let price = item
            .price
            .filter(|p| *p > 0.0)
            .ok_or_else(|| MarketDataError::SymbolNotFound(symbol.to_string()))?;

        Ok(PartialRecord {
            price: Some(price),
            previous_close: item.previous_close,
            change: item.change,
            change_percent: item.changes_percentage,
            market_cap: item.market_cap,
            pe_ratio: item.pe,
            eps: item.eps,
            week_52_high: item.year_high,
            week_52_low: item.year_low,
            volume: item.volume,
            avg_volume: item.avg_volume,
            name: item.name,
            exchange: item.exchange,
            ..Default::default()
        })
    }

    /// Adapter for the /profile endpoint.
    async fn fetch_profile(&self, symbol: &str) -> Result<PartialRecord, MarketDataError> {
        let text = self.get_text("/profile", symbol).await?;

        let items: Vec<ProfileItem> =
            serde_json::from_str(&text).map_err(|e| MarketDataError::ProviderError {
                provider: PROVIDER_ID.to_string(),
                message: format!("Failed to parse profile response: {}", e),
            })?;

        let item = items
            .into_iter()
            .next()
            .ok_or_else(|| MarketDataError::SymbolNotFound(symbol.to_string()))?;

        Ok(PartialRecord {
            name: item.company_name,
            currency: item.currency,
            isin: item.isin,
            exchange: item.exchange_short_name,
            industry: item.industry,
            sector: item.sector,
            country: item.country,
            market_cap: item.mkt_cap,
            beta: item.beta,
            dividend_rate: item.last_div,
            avg_volume: item.vol_avg,
            ..Default::default()
        })
    }
}

#[async_trait]
impl MarketDataProvider for FmpProvider {
    fn id(&self) -> &'static str {
        PROVIDER_ID
    }

    fn label(&self) -> &'static str {
        "Financial Modeling Prep"
    }

    fn rate_limit(&self) -> RateLimit {
        RateLimit {
            requests_per_minute: 10, // Free tier budget is 250 calls per day
            min_delay: Duration::from_millis(500),
        }
    }

    async fn fetch(&self, symbol: &str) -> Vec<PartialRecord> {
        let (quote, profile) = tokio::join!(self.fetch_quote(symbol), self.fetch_profile(symbol));

        let mut records = Vec::with_capacity(2);
        match quote {
            Ok(record) => records.push(record),
            Err(e) => warn!("FMP quote adapter failed for {}: {}", symbol, e),
        }
        match profile {
            Ok(record) => records.push(record),
            Err(e) => debug!("FMP profile adapter failed for {}: {}", symbol, e),
        }
        records
    }
}
