use serde::{Deserialize, Serialize};

/// Sparse record produced by exactly one adapter call.
///
/// Every field is independently optional; an adapter fills in whatever its
/// endpoint provides and leaves the rest unset. Numeric fields are always
/// expressed in the canonical absolute-unit convention (market cap as an
/// absolute figure, yields as percent), normalized inside the adapter.
/// Immutable once returned.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PartialRecord {
    /// Last traded / current price in the origin currency
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,

    /// Previous session close
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_close: Option<f64>,

    /// Absolute day change
    #[serde(skip_serializing_if = "Option::is_none")]
    pub change: Option<f64>,

    /// Day change in percent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub change_percent: Option<f64>,

    /// Market capitalization, absolute
    #[serde(skip_serializing_if = "Option::is_none")]
    pub market_cap: Option<f64>,

    /// Trailing price-to-earnings ratio
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pe_ratio: Option<f64>,

    /// Forward price-to-earnings ratio
    #[serde(skip_serializing_if = "Option::is_none")]
    pub forward_pe: Option<f64>,

    /// Earnings per share (trailing twelve months)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub eps: Option<f64>,

    /// Dividend yield in percent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dividend_yield: Option<f64>,

    /// Dividend per share, annualized
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dividend_rate: Option<f64>,

    /// Beta versus the broad market
    #[serde(skip_serializing_if = "Option::is_none")]
    pub beta: Option<f64>,

    /// 52-week high price
    #[serde(skip_serializing_if = "Option::is_none")]
    pub week_52_high: Option<f64>,

    /// 52-week low price
    #[serde(skip_serializing_if = "Option::is_none")]
    pub week_52_low: Option<f64>,

    /// Day volume
    #[serde(skip_serializing_if = "Option::is_none")]
    pub volume: Option<f64>,

    /// Average daily volume
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avg_volume: Option<f64>,

    /// Instrument / company name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Exchange name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exchange: Option<String>,

    /// Quote currency (ISO 4217)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,

    /// International Securities Identification Number
    #[serde(skip_serializing_if = "Option::is_none")]
    pub isin: Option<String>,

    /// Business sector
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sector: Option<String>,

    /// Industry within the sector
    #[serde(skip_serializing_if = "Option::is_none")]
    pub industry: Option<String>,

    /// Country of domicile
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
}

impl PartialRecord {
    /// Create a new empty partial record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a record carrying only a price.
    pub fn with_price(price: f64) -> Self {
        Self {
            price: Some(price),
            ..Default::default()
        }
    }

    /// True if no field is set at all.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}
