//! Kursblick Market Data Crate
//!
//! Multi-provider financial data aggregation for the Kursblick application.
//!
//! # Overview
//!
//! Given an instrument symbol, this crate queries several independent,
//! rate-limited quote and fundamentals providers in parallel, reconciles
//! their partial answers into one canonical [`CompanyInfo`] record,
//! classifies the instrument, extracts embedded derivative terms from
//! free-text product names, and caches results to bound external call
//! volume.
//!
//! # Architecture
//!
//! ```text
//! +------------------+     +------------------------+
//! |     Caller       | --> |  AggregationService    |  (fan-out / fan-in)
//! +------------------+     +------------------------+
//!                            |        |         |
//!                            v        v         v
//!                      +--------+ +--------+ +--------+
//!                      | Yahoo  | | Finnhub| |  ...   |  (one PartialRecord
//!                      +--------+ +--------+ +--------+   per endpoint)
//!                            \        |         /
//!                             v       v        v
//!                          +------------------------+
//!                          |  precedence merge      |
//!                          |  + classify + extract  |
//!                          +------------------------+
//!                                     |
//!                                     v
//!                          +------------------------+
//!                          |      CompanyInfo       |  (cached 2 min)
//!                          +------------------------+
//! ```
//!
//! # Core Types
//!
//! - [`CompanyInfo`] - Canonical merged record for one symbol
//! - [`PartialRecord`] - Sparse record produced by one adapter call
//! - [`DerivativeInfo`] - Terms recovered from a free-text product name
//! - [`InstrumentCategory`] - Classification result
//! - [`ProviderCredentialSet`] - Optional API keys per provider
//!
//! A provider without a configured credential is never constructed, never
//! called, and never counted as a failure. The only caller-visible failure
//! is [`MarketDataError::NoPriceResolved`]: no configured source could
//! produce a price for the symbol.

pub mod aggregator;
pub mod cache;
pub mod classify;
pub mod derivative;
pub mod display;
pub mod errors;
pub mod fx;
pub mod models;
pub mod provider;

// Re-export the public surface
pub use aggregator::AggregationService;
pub use cache::{CacheEntry, Clock, ManualClock, SystemClock, TtlCache};
pub use classify::classify;
pub use derivative::extract;
pub use errors::MarketDataError;
pub use fx::{RateSource, UsdEurRateCache, FALLBACK_USD_EUR};
pub use models::{
    derive_wkn, CompanyInfo, DerivativeInfo, InstrumentCategory, PartialRecord,
    ProviderCredentialSet,
};
pub use provider::alpha_vantage::AlphaVantageProvider;
pub use provider::finnhub::FinnhubProvider;
pub use provider::fmp::FmpProvider;
pub use provider::yahoo::YahooProvider;
pub use provider::{MarketDataProvider, RateLimit};
