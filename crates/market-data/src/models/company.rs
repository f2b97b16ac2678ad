use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::derivative::DerivativeInfo;

/// Instrument classification assigned by the pattern-matching classifier.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum InstrumentCategory {
    Stock,
    Etf,
    Warrant,
    Certificate,
    Bond,
    Future,
    Option,
    Cfd,
    #[default]
    Unknown,
}

/// The canonical, fully resolved record for one symbol at one point in time.
///
/// Produced by the aggregation service from the partial records of all
/// contributing providers. A record is only ever created with a resolved
/// price; `price_eur` equals `price * rate` with the USD to EUR rate in
/// effect at merge time. Records are discarded once stale, never updated
/// in place.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CompanyInfo {
    /// Requested symbol
    pub symbol: String,

    /// International Securities Identification Number
    #[serde(skip_serializing_if = "Option::is_none")]
    pub isin: Option<String>,

    /// German WKN, derived from a DE-prefixed 12-character ISIN
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wkn: Option<String>,

    /// Instrument / company name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Exchange name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exchange: Option<String>,

    /// Country of domicile
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,

    /// Business sector
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sector: Option<String>,

    /// Industry within the sector
    #[serde(skip_serializing_if = "Option::is_none")]
    pub industry: Option<String>,

    /// Instrument classification
    pub category: InstrumentCategory,

    /// Derivative terms recovered from the product name
    pub derivative: DerivativeInfo,

    /// Quote currency of `price` (ISO 4217)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,

    /// Price in the origin currency (required)
    pub price: f64,

    /// Price converted to EUR at merge time
    pub price_eur: f64,

    /// Absolute day change
    #[serde(skip_serializing_if = "Option::is_none")]
    pub change: Option<f64>,

    /// Day change in percent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub change_percent: Option<f64>,

    /// Market capitalization, absolute, origin currency
    #[serde(skip_serializing_if = "Option::is_none")]
    pub market_cap: Option<f64>,

    /// Market capitalization converted to EUR at merge time
    #[serde(skip_serializing_if = "Option::is_none")]
    pub market_cap_eur: Option<f64>,

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

    /// Human-readable labels of the sources that contributed at least one
    /// successfully fetched partial result, in merge precedence order.
    pub sources: Vec<String>,

    /// Capture time of this record
    pub fetched_at: DateTime<Utc>,
}

/// Derive the German WKN from an ISIN.
///
/// Only DE-prefixed ISINs of exactly 12 characters carry a derivable WKN;
/// the WKN is the 6-character substring at positions 2..8. ISINs are ASCII
/// alphanumeric, so anything with non-ASCII bytes is rejected rather than
/// sliced.
pub fn derive_wkn(isin: &str) -> Option<String> {
    if isin.len() == 12 && isin.is_ascii() && isin.starts_with("DE") {
        Some(isin[2..8].to_string())
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derive_wkn_german_isin() {
        assert_eq!(derive_wkn("DE000BASF111"), Some("000BAS".to_string()));
        assert_eq!(derive_wkn("DE0007164600"), Some("000716".to_string()));
    }

    #[test]
    fn test_derive_wkn_non_german_isin() {
        assert_eq!(derive_wkn("US0378331005"), None);
    }

    #[test]
    fn test_derive_wkn_non_ascii_input() {
        // 12 bytes but not 12 ASCII characters; must not slice mid-char
        assert_eq!(derive_wkn("DEAAAAA€AA"), None);
        assert_eq!(derive_wkn("DE€€€AAA"), None);
    }

    #[test]
    fn test_derive_wkn_wrong_length() {
        assert_eq!(derive_wkn("DE000BASF11"), None);
        assert_eq!(derive_wkn("DE000BASF1112"), None);
        assert_eq!(derive_wkn(""), None);
    }

    #[test]
    fn test_category_default_is_unknown() {
        assert_eq!(InstrumentCategory::default(), InstrumentCategory::Unknown);
    }

    #[test]
    fn test_category_serialization() {
        let json = serde_json::to_string(&InstrumentCategory::Etf).unwrap();
        assert_eq!(json, "\"etf\"");
    }
}
