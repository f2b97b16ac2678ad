//! Error types for the market data crate.
//!
//! Provider-local failures (network errors, bad statuses, malformed or
//! error-sentinel payloads) are recovered inside the adapters and never
//! cross the adapter boundary: the orchestrator sees them only as an
//! absent [`PartialRecord`](crate::models::PartialRecord). The single
//! caller-visible failure is [`MarketDataError::NoPriceResolved`].

use thiserror::Error;

/// Errors that can occur during market data operations.
#[derive(Error, Debug)]
pub enum MarketDataError {
    /// The requested symbol was not found by the provider, or the provider
    /// returned a placeholder response for it.
    #[error("Symbol not found: {0}")]
    SymbolNotFound(String),

    /// The provider rate limited the request (HTTP 429 or quota sentinel).
    #[error("Rate limited: {provider}")]
    RateLimited {
        /// The provider that rate limited the request
        provider: String,
    },

    /// The request to the provider timed out.
    #[error("Timeout: {provider}")]
    Timeout {
        /// The provider that timed out
        provider: String,
    },

    /// A provider-specific error occurred: bad status, malformed payload,
    /// or an explicit error message in the response body.
    #[error("Provider error: {provider} - {message}")]
    ProviderError {
        /// The provider that returned the error
        provider: String,
        /// The error message from the provider
        message: String,
    },

    /// No configured source could resolve a price for the symbol.
    ///
    /// This is the only error surfaced to callers of the aggregation
    /// service; every other variant is swallowed at the adapter boundary.
    #[error("No price resolved for symbol: {symbol}")]
    NoPriceResolved {
        /// The symbol that could not be resolved
        symbol: String,
    },

    /// A network error occurred while communicating with a provider.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
}
