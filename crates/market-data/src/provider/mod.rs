//! Market data provider trait definitions.
//!
//! Each provider wraps one external data source and exposes one adapter
//! per endpoint (quote, profile, metrics). Adapters are pure async
//! functions from a symbol to a sparse [`PartialRecord`]: any network
//! error, bad status, or malformed payload degrades to "no data" inside
//! the provider and is never surfaced to the orchestrator.

pub mod alpha_vantage;
pub mod finnhub;
pub mod fmp;
pub mod yahoo;

use std::time::Duration;

use async_trait::async_trait;

use crate::models::PartialRecord;

/// Rate limiting characteristics of a provider, for documentation and
/// logging. Call volume is bounded by the result cache, not by an active
/// limiter.
#[derive(Clone, Debug)]
pub struct RateLimit {
    /// Maximum requests allowed per minute.
    pub requests_per_minute: u32,

    /// Minimum delay between requests.
    pub min_delay: Duration,
}

impl Default for RateLimit {
    fn default() -> Self {
        Self {
            requests_per_minute: 60,
            min_delay: Duration::from_millis(100),
        }
    }
}

/// Trait for market data providers.
///
/// Implement this trait to add support for a new data source. The
/// aggregation service calls every configured provider concurrently and
/// merges the returned partial records in declaration order; within one
/// provider, the order of the returned vector is the adapter precedence
/// (primary endpoint first).
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// Unique identifier, a constant like "YAHOO" or "FINNHUB".
    fn id(&self) -> &'static str;

    /// Human-readable label recorded in a merged record's provenance list.
    fn label(&self) -> &'static str;

    /// Rate limiting characteristics of the upstream source.
    fn rate_limit(&self) -> RateLimit {
        RateLimit::default()
    }

    /// Fetch all partial records this provider can produce for a symbol.
    ///
    /// Never fails: endpoint adapters that error contribute nothing, and
    /// a provider where every adapter failed returns an empty vector.
    async fn fetch(&self, symbol: &str) -> Vec<PartialRecord>;
}
