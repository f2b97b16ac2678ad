//! Yahoo Finance market data provider implementation.
//!
//! This module provides market data from the public Yahoo Finance API:
//! - Quotes via the v7 /finance/quote endpoint (primary price source)
//! - Profiles and fundamentals via the v10 quoteSummary endpoint
//!
//! Yahoo requires no API key and is always configured; its two endpoints
//! form the first and second positions of the merge precedence order.

mod models;

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, warn};

use crate::errors::MarketDataError;
use crate::models::PartialRecord;
use crate::provider::{MarketDataProvider, RateLimit};

use models::{YahooQuoteResponse, YahooQuoteSummaryResponse};

const QUOTE_URL: &str = "https://query1.finance.yahoo.com/v7/finance/quote";
const SUMMARY_URL: &str = "https://query1.finance.yahoo.com/v10/finance/quoteSummary";
const SUMMARY_MODULES: &str = "summaryProfile,summaryDetail,defaultKeyStatistics";
const PROVIDER_ID: &str = "YAHOO";

/// Yahoo Finance market data provider.
pub struct YahooProvider {
    client: Client,
}

impl YahooProvider {
    pub fn new() -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_else(|_| Client::new());

        Self { client }
    }

    async fn get_text(&self, url: &str) -> Result<String, MarketDataError> {
        let response = self
            .client
            .get(url)
            .header("User-Agent", "Mozilla/5.0 (compatible; kursblick)")
            .send()
            .await
            .map_err(|e| {
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

    /// Adapter for the v7 quote endpoint.
    async fn fetch_quote(&self, symbol: &str) -> Result<PartialRecord, MarketDataError> {
        let url = format!("{}?symbols={}", QUOTE_URL, urlencoding::encode(symbol));
        let text = self.get_text(&url).await?;

        let response: YahooQuoteResponse =
            serde_json::from_str(&text).map_err(|e| MarketDataError::ProviderError {
                provider: PROVIDER_ID.to_string(),
                message: format!("Failed to parse quote response: {}", e),
            })?;

        let quote = response
            .quote_response
            .and_then(|qr| qr.result.into_iter().next())
            .ok_or_else(|| MarketDataError::SymbolNotFound(symbol.to_string()))?;

        let price = quote
            .regular_market_price
            .filter(|p| *p > 0.0)
            .ok_or_else(|| MarketDataError::SymbolNotFound(symbol.to_string()))?;

        debug!("Yahoo quote for {}: {}", symbol, price);

        Ok(PartialRecord {
            price: Some(price),
            previous_close: quote.regular_market_previous_close,
            change: quote.regular_market_change,
            change_percent: quote.regular_market_change_percent,
            market_cap: quote.market_cap,
            pe_ratio: quote.trailing_pe,
            forward_pe: quote.forward_pe,
            eps: quote.eps_trailing_twelve_months,
            // trailingAnnualDividendYield is a ratio, the record carries percent
            dividend_yield: quote.trailing_annual_dividend_yield.map(|y| y * 100.0),
            dividend_rate: quote.trailing_annual_dividend_rate,
            week_52_high: quote.fifty_two_week_high,
            week_52_low: quote.fifty_two_week_low,
            volume: quote.regular_market_volume,
            avg_volume: quote.average_daily_volume_3_month,
            name: quote.long_name.or(quote.short_name),
            exchange: quote.full_exchange_name.or(quote.exchange),
            currency: quote.currency,
            ..Default::default()
        })
    }

    /// Adapter for the v10 quoteSummary endpoint (same-origin fallback).
    async fn fetch_summary(&self, symbol: &str) -> Result<PartialRecord, MarketDataError> {
        let url = format!(
            "{}/{}?modules={}",
            SUMMARY_URL,
            urlencoding::encode(symbol),
            SUMMARY_MODULES
        );
        let text = self.get_text(&url).await?;

        let response: YahooQuoteSummaryResponse =
            serde_json::from_str(&text).map_err(|e| MarketDataError::ProviderError {
                provider: PROVIDER_ID.to_string(),
                message: format!("Failed to parse quoteSummary response: {}", e),
            })?;

        let result = response
            .quote_summary
            .and_then(|qs| qs.result)
            .and_then(|results| results.into_iter().next())
            .ok_or_else(|| MarketDataError::SymbolNotFound(symbol.to_string()))?;

        let mut record = PartialRecord::new();

        if let Some(profile) = result.summary_profile {
            record.sector = profile.sector;
            record.industry = profile.industry;
            record.country = profile.country;
        }

        if let Some(detail) = result.summary_detail {
            record.market_cap = detail.market_cap.and_then(|d| d.raw);
            record.pe_ratio = detail.trailing_pe.and_then(|d| d.raw);
            record.forward_pe = detail.forward_pe.and_then(|d| d.raw);
            record.dividend_yield = detail
                .dividend_yield
                .and_then(|d| d.raw)
                .map(|y| y * 100.0);
            record.dividend_rate = detail.dividend_rate.and_then(|d| d.raw);
            record.beta = detail.beta.and_then(|d| d.raw);
            record.week_52_high = detail.fifty_two_week_high.and_then(|d| d.raw);
            record.week_52_low = detail.fifty_two_week_low.and_then(|d| d.raw);
            record.volume = detail.volume.and_then(|d| d.raw);
            record.avg_volume = detail.average_volume.and_then(|d| d.raw);
            record.previous_close = detail.previous_close.and_then(|d| d.raw);
        }

        if let Some(stats) = result.default_key_statistics {
            if record.forward_pe.is_none() {
                record.forward_pe = stats.forward_pe.and_then(|d| d.raw);
            }
            if record.eps.is_none() {
                record.eps = stats.trailing_eps.and_then(|d| d.raw);
            }
            if record.beta.is_none() {
                record.beta = stats.beta.and_then(|d| d.raw);
            }
        }

        if record.is_empty() {
            return Err(MarketDataError::SymbolNotFound(symbol.to_string()));
        }

        Ok(record)
    }
}

impl Default for YahooProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MarketDataProvider for YahooProvider {
    fn id(&self) -> &'static str {
        PROVIDER_ID
    }

    fn label(&self) -> &'static str {
        "Yahoo Finance"
    }

    fn rate_limit(&self) -> RateLimit {
        RateLimit {
            requests_per_minute: 120,
            min_delay: Duration::from_millis(50),
        }
    }

    async fn fetch(&self, symbol: &str) -> Vec<PartialRecord> {
        let (quote, summary) = tokio::join!(self.fetch_quote(symbol), self.fetch_summary(symbol));

        let mut records = Vec::with_capacity(2);
        match quote {
            Ok(record) => records.push(record),
            Err(e) => warn!("Yahoo quote adapter failed for {}: {}", symbol, e),
        }
        match summary {
            Ok(record) => records.push(record),
            Err(e) => debug!("Yahoo summary adapter failed for {}: {}", symbol, e),
        }
        records
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_id_and_label() {
        let provider = YahooProvider::new();
        assert_eq!(provider.id(), "YAHOO");
        assert_eq!(provider.label(), "Yahoo Finance");
    }

    #[test]
    fn test_quote_response_parsing() {
        let json = r#"{
            "quoteResponse": {
                "result": [{
                    "symbol": "AAPL",
                    "longName": "Apple Inc.",
                    "shortName": "Apple",
                    "fullExchangeName": "NasdaqGS",
                    "currency": "USD",
                    "regularMarketPrice": 189.87,
                    "regularMarketChange": 1.52,
                    "regularMarketChangePercent": 0.81,
                    "regularMarketPreviousClose": 188.35,
                    "regularMarketVolume": 48087700,
                    "averageDailyVolume3Month": 58499120,
                    "marketCap": 2952000000000,
                    "trailingPE": 29.51,
                    "forwardPE": 26.11,
                    "epsTrailingTwelveMonths": 6.43,
                    "trailingAnnualDividendYield": 0.005,
                    "trailingAnnualDividendRate": 0.96,
                    "fiftyTwoWeekHigh": 199.62,
                    "fiftyTwoWeekLow": 124.17
                }],
                "error": null
            }
        }"#;

        let response: YahooQuoteResponse = serde_json::from_str(json).unwrap();
        let quote = response
            .quote_response
            .unwrap()
            .result
            .into_iter()
            .next()
            .unwrap();
        assert_eq!(quote.regular_market_price, Some(189.87));
        assert_eq!(quote.long_name.as_deref(), Some("Apple Inc."));
        assert_eq!(quote.market_cap, Some(2952000000000.0));
    }

    #[test]
    fn test_quote_summary_parsing() {
        let json = r#"{
            "quoteSummary": {
                "result": [{
                    "summaryProfile": {
                        "sector": "Technology",
                        "industry": "Consumer Electronics",
                        "country": "United States"
                    },
                    "summaryDetail": {
                        "marketCap": {"raw": 2952000000000, "fmt": "2.95T"},
                        "trailingPE": {"raw": 29.51, "fmt": "29.51"},
                        "dividendYield": {"raw": 0.005, "fmt": "0.50%"},
                        "beta": {"raw": 1.29, "fmt": "1.29"},
                        "fiftyTwoWeekHigh": {"raw": 199.62, "fmt": "199.62"},
                        "fiftyTwoWeekLow": {"raw": 124.17, "fmt": "124.17"}
                    },
                    "defaultKeyStatistics": {
                        "trailingEps": {"raw": 6.43, "fmt": "6.43"},
                        "forwardPE": {"raw": 26.11, "fmt": "26.11"}
                    }
                }],
                "error": null
            }
        }"#;

        let response: YahooQuoteSummaryResponse = serde_json::from_str(json).unwrap();
        let result = response
            .quote_summary
            .unwrap()
            .result
            .unwrap()
            .into_iter()
            .next()
            .unwrap();
        let profile = result.summary_profile.unwrap();
        assert_eq!(profile.sector.as_deref(), Some("Technology"));
        let detail = result.summary_detail.unwrap();
        assert_eq!(detail.beta.and_then(|d| d.raw), Some(1.29));
    }

    #[test]
    fn test_empty_objects_parse_as_absent() {
        // Yahoo returns {} for detail fields with no data
        let json = r#"{
            "quoteSummary": {
                "result": [{
                    "summaryDetail": {
                        "marketCap": {},
                        "trailingPE": {"raw": null}
                    }
                }],
                "error": null
            }
        }"#;

        let response: YahooQuoteSummaryResponse = serde_json::from_str(json).unwrap();
        let result = response
            .quote_summary
            .unwrap()
            .result
            .unwrap()
            .into_iter()
            .next()
            .unwrap();
        let detail = result.summary_detail.unwrap();
        assert_eq!(detail.market_cap.and_then(|d| d.raw), None);
        assert_eq!(detail.trailing_pe.and_then(|d| d.raw), None);
    }
}
