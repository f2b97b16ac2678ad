//! Yahoo Finance API response models.
//!
//! The v7 quote endpoint returns flat raw numbers; the v10 quoteSummary
//! endpoint wraps every value in a `{"raw": ..., "fmt": ...}` object, or
//! an empty object when no data is available.

use serde::Deserialize;

/// Response wrapper for the v7 /finance/quote endpoint
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct YahooQuoteResponse {
    pub quote_response: Option<YahooQuoteResult>,
}

#[derive(Debug, Deserialize)]
pub struct YahooQuoteResult {
    #[serde(default)]
    pub result: Vec<YahooQuote>,
    // Note: error field exists but failures are handled via empty results
}

/// A single v7 quote
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct YahooQuote {
    pub long_name: Option<String>,
    pub short_name: Option<String>,
    pub full_exchange_name: Option<String>,
    pub exchange: Option<String>,
    pub currency: Option<String>,
    pub regular_market_price: Option<f64>,
    pub regular_market_change: Option<f64>,
    pub regular_market_change_percent: Option<f64>,
    pub regular_market_previous_close: Option<f64>,
    pub regular_market_volume: Option<f64>,
    #[serde(rename = "averageDailyVolume3Month")]
    pub average_daily_volume_3_month: Option<f64>,
    pub market_cap: Option<f64>,
    #[serde(rename = "trailingPE")]
    pub trailing_pe: Option<f64>,
    #[serde(rename = "forwardPE")]
    pub forward_pe: Option<f64>,
    pub eps_trailing_twelve_months: Option<f64>,
    pub trailing_annual_dividend_yield: Option<f64>,
    pub trailing_annual_dividend_rate: Option<f64>,
    pub fifty_two_week_high: Option<f64>,
    pub fifty_two_week_low: Option<f64>,
}

/// Main response wrapper for the quoteSummary API
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct YahooQuoteSummaryResponse {
    pub quote_summary: Option<YahooQuoteSummary>,
}

/// Quote summary container
#[derive(Debug, Deserialize)]
pub struct YahooQuoteSummary {
    pub result: Option<Vec<YahooQuoteSummaryResult>>,
}

/// Individual result from the quoteSummary API
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct YahooQuoteSummaryResult {
    pub summary_profile: Option<YahooSummaryProfile>,
    pub summary_detail: Option<YahooSummaryDetail>,
    pub default_key_statistics: Option<YahooKeyStatistics>,
}

/// Value wrapper with raw and formatted representations
#[derive(Debug, Deserialize, Clone)]
pub struct YahooPriceDetail {
    pub raw: Option<f64>,
    // Note: fmt field exists but only raw values are used
}

/// Company profile data
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct YahooSummaryProfile {
    pub sector: Option<String>,
    pub industry: Option<String>,
    pub country: Option<String>,
}

/// Financial metrics from the summaryDetail module
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct YahooSummaryDetail {
    pub market_cap: Option<YahooPriceDetail>,
    #[serde(rename = "trailingPE")]
    pub trailing_pe: Option<YahooPriceDetail>,
    #[serde(rename = "forwardPE")]
    pub forward_pe: Option<YahooPriceDetail>,
    pub dividend_yield: Option<YahooPriceDetail>,
    pub dividend_rate: Option<YahooPriceDetail>,
    pub beta: Option<YahooPriceDetail>,
    pub fifty_two_week_high: Option<YahooPriceDetail>,
    pub fifty_two_week_low: Option<YahooPriceDetail>,
    pub volume: Option<YahooPriceDetail>,
    pub average_volume: Option<YahooPriceDetail>,
    pub previous_close: Option<YahooPriceDetail>,
}

/// Metrics from the defaultKeyStatistics module
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct YahooKeyStatistics {
    pub trailing_eps: Option<YahooPriceDetail>,
    #[serde(rename = "forwardPE")]
    pub forward_pe: Option<YahooPriceDetail>,
    pub beta: Option<YahooPriceDetail>,
}
