use serde::{Deserialize, Serialize};

/// Derivative terms recovered from a free-text product name.
///
/// All fields are independently optional: absence means the term was not
/// detectable from the name, not that it is inapplicable. A name can in
/// principle carry both long and short vocabulary, in which case both
/// flags are set; this is accepted input ambiguity, not an error.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DerivativeInfo {
    /// Leverage multiplier (e.g. 5 for "FAKTOR 5X")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub leverage: Option<f64>,

    /// Knock-out / barrier level
    #[serde(skip_serializing_if = "Option::is_none")]
    pub knockout_level: Option<f64>,

    /// Strike / basis price
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strike_price: Option<f64>,

    /// Long / bull / call vocabulary present
    pub is_long: bool,

    /// Short / bear / put / inverse vocabulary present
    pub is_short: bool,

    /// Underlying ticker recovered from the name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub underlying_symbol: Option<String>,

    /// Expiry descriptor: a date, a month/year, or the literal "Open End"
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expiration_date: Option<String>,

    /// Product-type label (e.g. "Turbo/Knock-Out")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product_type: Option<String>,

    /// Estimated overnight financing fee in percent per year
    #[serde(skip_serializing_if = "Option::is_none")]
    pub financing_fee_percent: Option<f64>,

    /// Estimated typical spread in percent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spread_percent: Option<f64>,
}

impl DerivativeInfo {
    /// Create an empty derivative info (nothing detected).
    pub fn new() -> Self {
        Self::default()
    }

    /// True if no term was detected at all.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_empty() {
        let info = DerivativeInfo::new();
        assert!(info.is_empty());
        assert!(!info.is_long);
        assert!(!info.is_short);
    }

    #[test]
    fn test_serialization_skips_absent_fields() {
        let info = DerivativeInfo {
            leverage: Some(5.0),
            is_long: true,
            ..Default::default()
        };
        let json = serde_json::to_string(&info).unwrap();
        assert!(json.contains("leverage"));
        assert!(json.contains("is_long"));
        assert!(!json.contains("knockout_level"));
    }
}
