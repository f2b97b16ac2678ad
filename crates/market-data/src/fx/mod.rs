//! USD to EUR exchange rate with a single-value TTL cache.
//!
//! The rate read never fails: on a fetch error the last known cached value
//! is returned, and if none exists yet, a hardcoded fallback. The cache
//! timestamp is only updated on a successful fetch, so a failing rate
//! source keeps being retried on every stale read.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::cache::{CacheEntry, Clock, SystemClock};
use crate::errors::MarketDataError;

const RATE_URL: &str = "https://api.frankfurter.app/latest?from=USD&to=EUR";

/// Rate used when no fetch ever succeeded.
pub const FALLBACK_USD_EUR: f64 = 0.92;

/// How long a fetched rate stays fresh.
pub const RATE_TTL: Duration = Duration::from_secs(300);

/// Something that can produce a usable USD to EUR rate.
///
/// Implementations must always return a positive rate and never fail.
#[async_trait]
pub trait RateSource: Send + Sync {
    async fn rate(&self) -> f64;
}

#[derive(Debug, Deserialize)]
struct RateResponse {
    rates: HashMap<String, f64>,
}

/// TTL-cached USD to EUR rate backed by the Frankfurter API.
pub struct UsdEurRateCache {
    client: Client,
    clock: Arc<dyn Clock>,
    endpoint: String,
    slot: Mutex<Option<CacheEntry<f64>>>,
}

impl UsdEurRateCache {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self::with_endpoint(clock, RATE_URL)
    }

    /// Use a non-default rate endpoint.
    pub fn with_endpoint(clock: Arc<dyn Clock>, endpoint: impl Into<String>) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            client,
            clock,
            endpoint: endpoint.into(),
            slot: Mutex::new(None),
        }
    }

    /// Preload the cache with a known rate, as if it had just been fetched.
    pub fn seed(&self, rate: f64) {
        let mut slot = self.slot.lock().unwrap_or_else(|e| e.into_inner());
        *slot = Some(CacheEntry::new(rate, self.clock.now()));
    }

    fn cached(&self) -> Option<CacheEntry<f64>> {
        self.slot
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    async fn fetch_rate(&self) -> Result<f64, MarketDataError> {
        let response = self.client.get(&self.endpoint).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(MarketDataError::ProviderError {
                provider: "FRANKFURTER".to_string(),
                message: format!("HTTP {}", status),
            });
        }

        let parsed: RateResponse =
            response
                .json()
                .await
                .map_err(|e| MarketDataError::ProviderError {
                    provider: "FRANKFURTER".to_string(),
                    message: format!("Failed to parse rate response: {}", e),
                })?;

        parsed
            .rates
            .get("EUR")
            .copied()
            .filter(|rate| *rate > 0.0)
            .ok_or_else(|| MarketDataError::ProviderError {
                provider: "FRANKFURTER".to_string(),
                message: "No EUR rate in response".to_string(),
            })
    }
}

impl Default for UsdEurRateCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RateSource for UsdEurRateCache {
    /// Return the USD to EUR rate, always.
    async fn rate(&self) -> f64 {
        let cached = self.cached();

        if let Some(entry) = &cached {
            if entry.is_fresh(self.clock.now(), RATE_TTL) {
                return entry.value;
            }
        }

        match self.fetch_rate().await {
            Ok(rate) => {
                debug!("Fetched USD/EUR rate: {}", rate);
                self.seed(rate);
                rate
            }
            Err(e) => {
                warn!("USD/EUR rate fetch failed: {}", e);
                // Last known value wins over the hardcoded fallback; the
                // timestamp stays untouched so the next read retries.
                cached.map(|entry| entry.value).unwrap_or(FALLBACK_USD_EUR)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::ManualClock;

    #[test]
    fn test_rate_response_parsing() {
        let json = r#"{"amount": 1.0, "base": "USD", "date": "2024-05-03", "rates": {"EUR": 0.9312}}"#;
        let parsed: RateResponse = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.rates.get("EUR"), Some(&0.9312));
    }

    // Points at a closed local port so fetches fail fast and predictably.
    fn unreachable_cache(clock: Arc<ManualClock>) -> UsdEurRateCache {
        UsdEurRateCache::with_endpoint(clock, "http://127.0.0.1:9/latest")
    }

    #[tokio::test]
    async fn test_seeded_rate_served_while_fresh() {
        let clock = Arc::new(ManualClock::new());
        let cache = unreachable_cache(clock.clone());
        cache.seed(0.95);

        assert_eq!(cache.rate().await, 0.95);

        clock.advance(Duration::from_secs(299));
        assert_eq!(cache.rate().await, 0.95);
    }

    #[tokio::test]
    async fn test_stale_rate_survives_failed_fetch() {
        let clock = Arc::new(ManualClock::new());
        let cache = unreachable_cache(clock.clone());
        cache.seed(0.95);

        // Past the TTL the fetch is retried; when the rate source is down
        // the last known value must still come back.
        clock.advance(Duration::from_secs(301));
        assert_eq!(cache.rate().await, 0.95);
    }

    #[tokio::test]
    async fn test_fallback_when_nothing_cached() {
        let clock = Arc::new(ManualClock::new());
        let cache = unreachable_cache(clock);
        assert_eq!(cache.rate().await, FALLBACK_USD_EUR);
    }

    #[test]
    fn test_fallback_constant() {
        assert!(FALLBACK_USD_EUR > 0.0);
        assert_eq!(FALLBACK_USD_EUR, 0.92);
    }
}
