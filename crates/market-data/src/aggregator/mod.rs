//! Aggregation orchestrator.
//!
//! Fans out to the exchange-rate cache and every configured provider
//! concurrently, fans back in, merges the partial records in fixed
//! precedence order, enriches the result with classification and
//! derivative terms, and caches it per symbol. Partial provider failure
//! is invisible to the caller except through a shorter provenance list;
//! the only caller-visible failure is a symbol with no resolvable price.
//!
//! Overlapping calls for the same symbol are coalesced: they await one
//! shared aggregation future instead of each triggering its own fan-out.

mod merge;

use std::collections::HashMap;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Utc;
use futures::future::{join_all, Future, FutureExt, Shared};
use tracing::{debug, info, warn};

use crate::cache::TtlCache;
use crate::classify::classify;
use crate::derivative::extract;
use crate::errors::MarketDataError;
use crate::fx::{RateSource, UsdEurRateCache};
use crate::models::{derive_wkn, CompanyInfo, PartialRecord, ProviderCredentialSet};
use crate::provider::alpha_vantage::AlphaVantageProvider;
use crate::provider::finnhub::FinnhubProvider;
use crate::provider::fmp::FmpProvider;
use crate::provider::yahoo::YahooProvider;
use crate::provider::MarketDataProvider;

/// How long a merged record stays fresh.
pub const RECORD_TTL: Duration = Duration::from_secs(120);

type AggregationFuture = Shared<Pin<Box<dyn Future<Output = Option<Arc<CompanyInfo>>> + Send>>>;

/// Multi-provider aggregation service.
///
/// Created once per process; providers without a configured credential
/// are not constructed at all, so they are never called and never
/// counted as failures.
pub struct AggregationService {
    providers: Vec<Arc<dyn MarketDataProvider>>,
    rate_source: Arc<dyn RateSource>,
    cache: TtlCache<String, Arc<CompanyInfo>>,
    inflight: Mutex<HashMap<String, AggregationFuture>>,
}

impl AggregationService {
    /// Build the service from the configured credentials.
    ///
    /// Provider declaration order is the merge precedence order: Yahoo
    /// (quote endpoint first, quoteSummary as same-origin fallback), then
    /// Finnhub, Alpha Vantage and FMP.
    pub fn new(credentials: &ProviderCredentialSet) -> Arc<Self> {
        let mut providers: Vec<Arc<dyn MarketDataProvider>> = vec![Arc::new(YahooProvider::new())];

        if let Some(key) = &credentials.finnhub {
            providers.push(Arc::new(FinnhubProvider::new(key.clone())));
        }
        if let Some(key) = &credentials.alpha_vantage {
            providers.push(Arc::new(AlphaVantageProvider::new(key.clone())));
        }
        if let Some(key) = &credentials.fmp {
            providers.push(Arc::new(FmpProvider::new(key.clone())));
        }

        Self::with_parts(
            providers,
            Arc::new(UsdEurRateCache::new()),
            TtlCache::new(RECORD_TTL),
        )
    }

    /// Build the service from explicit parts. Used by tests to inject
    /// mock providers, a fixed rate source and a cache on a manual clock.
    pub fn with_parts(
        providers: Vec<Arc<dyn MarketDataProvider>>,
        rate_source: Arc<dyn RateSource>,
        cache: TtlCache<String, Arc<CompanyInfo>>,
    ) -> Arc<Self> {
        Arc::new(Self {
            providers,
            rate_source,
            cache,
            inflight: Mutex::new(HashMap::new()),
        })
    }

    /// Identifiers of the configured providers, in precedence order.
    pub fn provider_ids(&self) -> Vec<&'static str> {
        self.providers.iter().map(|p| p.id()).collect()
    }

    /// Fetch the merged record for a symbol.
    ///
    /// Returns the cached record on a fresh hit. On a miss, joins any
    /// in-flight aggregation for the same symbol, or starts one. The only
    /// error is [`MarketDataError::NoPriceResolved`]; a record with many
    /// absent optional fields is a success.
    pub async fn company_info(
        self: &Arc<Self>,
        symbol: &str,
    ) -> Result<Arc<CompanyInfo>, MarketDataError> {
        let key = symbol.to_string();

        if let Some(hit) = self.cache.get(&key) {
            debug!("Cache hit for {}", key);
            return Ok(hit);
        }

        let fut = {
            let mut inflight = self.inflight.lock().unwrap_or_else(|e| e.into_inner());
            if let Some(existing) = inflight.get(&key) {
                debug!("Joining in-flight aggregation for {}", key);
                existing.clone()
            } else {
                let service = Arc::clone(self);
                let sym = key.clone();
                let fut: AggregationFuture = async move {
                    let result = service.run_aggregation(&sym).await;
                    let mut inflight =
                        service.inflight.lock().unwrap_or_else(|e| e.into_inner());
                    inflight.remove(&sym);
                    result
                }
                .boxed()
                .shared();
                inflight.insert(key.clone(), fut.clone());
                fut
            }
        };

        fut.await
            .ok_or(MarketDataError::NoPriceResolved { symbol: key })
    }

    /// One full fan-out, merge and cache cycle for a symbol.
    async fn run_aggregation(&self, symbol: &str) -> Option<Arc<CompanyInfo>> {
        debug!(
            "Aggregating {} across {} providers",
            symbol,
            self.providers.len()
        );

        let provider_futs = self.providers.iter().map(|provider| {
            let provider = Arc::clone(provider);
            let symbol = symbol.to_string();
            async move { (provider.label(), provider.fetch(&symbol).await) }
        });

        // Rate fetch and all configured adapters run concurrently; total
        // latency is bounded by the slowest settled call.
        let (rate, outcomes) = tokio::join!(self.rate_source.rate(), join_all(provider_futs));

        let mut merged = PartialRecord::new();
        let mut sources: Vec<String> = Vec::new();
        for (label, partials) in outcomes {
            if partials.is_empty() {
                continue;
            }
            sources.push(label.to_string());
            for partial in partials {
                merge::merge_into(&mut merged, partial);
            }
        }

        let Some(price) = merged.price else {
            warn!("No price resolved for {} from any source", symbol);
            return None;
        };

        let record = Arc::new(assemble(symbol, merged, price, rate, sources));
        self.cache.insert(symbol.to_string(), Arc::clone(&record));
        info!(
            "Aggregated {} from [{}]",
            symbol,
            record.sources.join(", ")
        );
        Some(record)
    }
}

/// Assemble the canonical record from the merged fields.
fn assemble(
    symbol: &str,
    merged: PartialRecord,
    price: f64,
    rate: f64,
    sources: Vec<String>,
) -> CompanyInfo {
    // Day change falls back to the previous close when the provider did
    // not report it directly.
    let change = merged
        .change
        .or_else(|| merged.previous_close.map(|pc| price - pc));
    let change_percent = merged.change_percent.or_else(|| {
        merged
            .previous_close
            .filter(|pc| *pc != 0.0)
            .map(|pc| (price - pc) / pc * 100.0)
    });

    let category = classify(symbol, merged.name.as_deref());
    let derivative = extract(merged.name.as_deref());
    let wkn = merged.isin.as_deref().and_then(derive_wkn);

    CompanyInfo {
        symbol: symbol.to_string(),
        isin: merged.isin,
        wkn,
        name: merged.name,
        exchange: merged.exchange,
        country: merged.country,
        sector: merged.sector,
        industry: merged.industry,
        category,
        derivative,
        currency: merged.currency,
        price,
        price_eur: price * rate,
        change,
        change_percent,
        market_cap: merged.market_cap,
        market_cap_eur: merged.market_cap.map(|mc| mc * rate),
        pe_ratio: merged.pe_ratio,
        forward_pe: merged.forward_pe,
        eps: merged.eps,
        dividend_yield: merged.dividend_yield,
        dividend_rate: merged.dividend_rate,
        beta: merged.beta,
        week_52_high: merged.week_52_high,
        week_52_low: merged.week_52_low,
        volume: merged.volume,
        avg_volume: merged.avg_volume,
        sources,
        fetched_at: Utc::now(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use crate::cache::ManualClock;
    use crate::models::InstrumentCategory;

    struct FixedRate(f64);

    #[async_trait]
    impl RateSource for FixedRate {
        async fn rate(&self) -> f64 {
            self.0
        }
    }

    struct StaticProvider {
        id: &'static str,
        label: &'static str,
        partials: Vec<PartialRecord>,
        calls: AtomicUsize,
        delay: Option<Duration>,
    }

    impl StaticProvider {
        fn new(id: &'static str, label: &'static str, partials: Vec<PartialRecord>) -> Arc<Self> {
            Arc::new(Self {
                id,
                label,
                partials,
                calls: AtomicUsize::new(0),
                delay: None,
            })
        }

        fn with_delay(
            id: &'static str,
            label: &'static str,
            partials: Vec<PartialRecord>,
            delay: Duration,
        ) -> Arc<Self> {
            Arc::new(Self {
                id,
                label,
                partials,
                calls: AtomicUsize::new(0),
                delay: Some(delay),
            })
        }

        fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl MarketDataProvider for StaticProvider {
        fn id(&self) -> &'static str {
            self.id
        }

        fn label(&self) -> &'static str {
            self.label
        }

        async fn fetch(&self, _symbol: &str) -> Vec<PartialRecord> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            self.partials.clone()
        }
    }

    fn service_with(
        providers: Vec<Arc<dyn MarketDataProvider>>,
        rate: f64,
    ) -> Arc<AggregationService> {
        AggregationService::with_parts(
            providers,
            Arc::new(FixedRate(rate)),
            TtlCache::new(RECORD_TTL),
        )
    }

    #[tokio::test]
    async fn test_eur_price_uses_rate_at_merge_time() {
        let provider = StaticProvider::new(
            "P1",
            "Mock One",
            vec![PartialRecord {
                price: Some(100.0),
                market_cap: Some(1_000_000.0),
                ..Default::default()
            }],
        );
        let service = service_with(vec![provider], 0.9);

        let record = service.company_info("TEST").await.unwrap();
        assert_eq!(record.price, 100.0);
        assert!((record.price_eur - 90.0).abs() < 1e-9);
        assert!((record.market_cap_eur.unwrap() - 900_000.0).abs() < 1e-6);
    }

    #[tokio::test]
    async fn test_provenance_reflects_contributing_sources_only() {
        let contributing = StaticProvider::new(
            "P1",
            "Mock One",
            vec![PartialRecord::with_price(50.0)],
        );
        let failing = StaticProvider::new("P2", "Mock Two", vec![]);
        let service = service_with(vec![contributing, failing], 0.92);

        let record = service.company_info("TEST").await.unwrap();
        assert_eq!(record.sources, vec!["Mock One".to_string()]);
    }

    #[tokio::test]
    async fn test_field_precedence_is_declaration_order_not_completion_order() {
        // The first-declared provider is slower but must still win.
        let slow_primary = StaticProvider::with_delay(
            "P1",
            "Mock One",
            vec![PartialRecord {
                price: Some(100.0),
                pe_ratio: Some(10.0),
                ..Default::default()
            }],
            Duration::from_millis(20),
        );
        let fast_secondary = StaticProvider::new(
            "P2",
            "Mock Two",
            vec![PartialRecord {
                price: Some(101.0),
                pe_ratio: Some(20.0),
                ..Default::default()
            }],
        );
        let service = service_with(vec![slow_primary, fast_secondary], 0.92);

        let record = service.company_info("TEST").await.unwrap();
        assert_eq!(record.price, 100.0);
        assert_eq!(record.pe_ratio, Some(10.0));
    }

    #[tokio::test]
    async fn test_longer_name_wins_across_sources() {
        let short_name = StaticProvider::new(
            "P1",
            "Mock One",
            vec![PartialRecord {
                price: Some(100.0),
                name: Some("BASF".to_string()),
                ..Default::default()
            }],
        );
        let long_name = StaticProvider::new(
            "P2",
            "Mock Two",
            vec![PartialRecord {
                name: Some("BASF SE".to_string()),
                ..Default::default()
            }],
        );
        let service = service_with(vec![short_name, long_name], 0.92);

        let record = service.company_info("TEST").await.unwrap();
        assert_eq!(record.name.as_deref(), Some("BASF SE"));
    }

    #[tokio::test]
    async fn test_no_price_is_an_explicit_failure_and_not_cached() {
        let no_price = StaticProvider::new(
            "P1",
            "Mock One",
            vec![PartialRecord {
                name: Some("Nameless Corp".to_string()),
                ..Default::default()
            }],
        );
        let service = service_with(vec![no_price.clone()], 0.92);

        let result = service.company_info("TEST").await;
        assert!(matches!(
            result,
            Err(MarketDataError::NoPriceResolved { .. })
        ));

        // Failures are not cached: the next call fans out again
        let _ = service.company_info("TEST").await;
        assert_eq!(no_price.call_count(), 2);
    }

    #[tokio::test]
    async fn test_cache_serves_identical_record_within_ttl() {
        let clock = Arc::new(ManualClock::new());
        let provider = StaticProvider::new(
            "P1",
            "Mock One",
            vec![PartialRecord::with_price(42.0)],
        );
        let service = AggregationService::with_parts(
            vec![provider.clone()],
            Arc::new(FixedRate(0.92)),
            TtlCache::with_clock(RECORD_TTL, clock.clone()),
        );

        let first = service.company_info("TEST").await.unwrap();
        clock.advance(Duration::from_secs(119));
        let second = service.company_info("TEST").await.unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(provider.call_count(), 1);

        // Past the TTL a fresh fan-out happens
        clock.advance(Duration::from_secs(2));
        let third = service.company_info("TEST").await.unwrap();
        assert!(!Arc::ptr_eq(&first, &third));
        assert_eq!(provider.call_count(), 2);
    }

    #[tokio::test]
    async fn test_concurrent_same_symbol_calls_are_coalesced() {
        let provider = StaticProvider::with_delay(
            "P1",
            "Mock One",
            vec![PartialRecord::with_price(42.0)],
            Duration::from_millis(20),
        );
        let service = service_with(vec![provider.clone()], 0.92);

        let (a, b) = tokio::join!(service.company_info("TEST"), service.company_info("TEST"));
        let (a, b) = (a.unwrap(), b.unwrap());

        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(provider.call_count(), 1);
    }

    #[tokio::test]
    async fn test_day_change_falls_back_to_previous_close() {
        let provider = StaticProvider::new(
            "P1",
            "Mock One",
            vec![PartialRecord {
                price: Some(110.0),
                previous_close: Some(100.0),
                ..Default::default()
            }],
        );
        let service = service_with(vec![provider], 0.92);

        let record = service.company_info("TEST").await.unwrap();
        assert!((record.change.unwrap() - 10.0).abs() < 1e-9);
        assert!((record.change_percent.unwrap() - 10.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_wkn_derived_from_german_isin() {
        let provider = StaticProvider::new(
            "P1",
            "Mock One",
            vec![PartialRecord {
                price: Some(49.2),
                isin: Some("DE000BASF111".to_string()),
                ..Default::default()
            }],
        );
        let service = service_with(vec![provider], 0.92);

        let record = service.company_info("BAS.DE").await.unwrap();
        assert_eq!(record.wkn.as_deref(), Some("000BAS"));
    }

    #[tokio::test]
    async fn test_classification_and_extraction_enrich_record() {
        let provider = StaticProvider::new(
            "P1",
            "Mock One",
            vec![PartialRecord {
                price: Some(4.2),
                name: Some("Turbo Bull NVIDIA KO 100.00 open end".to_string()),
                ..Default::default()
            }],
        );
        let service = service_with(vec![provider], 0.92);

        let record = service.company_info("TB1XYZ").await.unwrap();
        assert_eq!(record.category, InstrumentCategory::Warrant);
        assert_eq!(
            record.derivative.product_type.as_deref(),
            Some("Turbo/Knock-Out")
        );
        assert_eq!(record.derivative.knockout_level, Some(100.0));
        assert_eq!(record.derivative.expiration_date.as_deref(), Some("Open End"));
    }

    #[test]
    fn test_service_construction_respects_credentials() {
        let none = AggregationService::new(&ProviderCredentialSet::none());
        assert_eq!(none.provider_ids(), vec!["YAHOO"]);

        let all = AggregationService::new(&ProviderCredentialSet {
            finnhub: Some("a".to_string()),
            alpha_vantage: Some("b".to_string()),
            fmp: Some("c".to_string()),
        });
        assert_eq!(
            all.provider_ids(),
            vec!["YAHOO", "FINNHUB", "ALPHA_VANTAGE", "FMP"]
        );
    }
}
