//! Instrument classification via keyword vocabularies.
//!
//! Case-insensitive substring matching against fixed vocabularies in a
//! fixed priority order; the first vocabulary that matches wins. The
//! order is a design decision, not incidental: the leveraged-product
//! vocabulary overlaps the certificate vocabulary ("Faktor" appears in
//! both), so warrant/turbo detection must run before certificate
//! detection or factor certificates get misclassified.

use lazy_static::lazy_static;
use regex::Regex;

use crate::models::InstrumentCategory;

const ETF_KEYWORDS: &[&str] = &[
    "ETF",
    "ISHARES",
    "XTRACKERS",
    "LYXOR",
    "VANGUARD",
    "AMUNDI",
    "WISDOMTREE",
    "INVESCO",
    "SPDR",
    "UCITS",
    "INDEX FUND",
];

const WARRANT_KEYWORDS: &[&str] = &[
    "TURBO",
    "KNOCK-OUT",
    "KNOCKOUT",
    "KNOCK OUT",
    "OPTIONSSCHEIN",
    "WARRANT",
    "MINI FUTURE",
    "MINI-FUTURE",
    "FAKTOR",
    "HEBEL",
    "LEVERAGE",
];

const CERTIFICATE_KEYWORDS: &[&str] = &[
    "ZERTIFIKAT",
    "CERTIFICATE",
    "BONUS",
    "DISCOUNT",
    "EXPRESS",
    "KAPITALSCHUTZ",
    "AKTIENANLEIHE",
];

const BOND_KEYWORDS: &[&str] = &[
    "ANLEIHE",
    "BOND",
    "NOTES",
    "PFANDBRIEF",
    "SCHULDVERSCHREIBUNG",
    "TREASURY",
];

const OPTION_KEYWORDS: &[&str] = &["CALL", "PUT", "OPTION"];

const CFD_KEYWORDS: &[&str] = &["CFD", "CONTRACT FOR DIFFERENCE"];

lazy_static! {
    /// Futures contract codes like "FDAX", "ESZ4" or "CLF25": root, month
    /// letter, one or two digit year.
    static ref FUTURES_CODE: Regex =
        Regex::new(r"^[A-Z]{1,3}[FGHJKMNQUVXZ]\d{1,2}$").unwrap();
}

fn matches_any(haystack: &str, keywords: &[&str]) -> bool {
    keywords.iter().any(|keyword| haystack.contains(keyword))
}

/// Classify an instrument from its symbol and optional name.
///
/// Deterministic and side-effect free; defaults to
/// [`InstrumentCategory::Stock`] when nothing matches.
pub fn classify(symbol: &str, name: Option<&str>) -> InstrumentCategory {
    let symbol_upper = symbol.to_uppercase();
    let text = match name {
        Some(name) => format!("{} {}", symbol_upper, name.to_uppercase()),
        None => symbol_upper.clone(),
    };

    if matches_any(&text, ETF_KEYWORDS) {
        return InstrumentCategory::Etf;
    }
    // Must precede certificates: "Faktor" lives in both vocabularies
    if matches_any(&text, WARRANT_KEYWORDS) {
        return InstrumentCategory::Warrant;
    }
    if matches_any(&text, CERTIFICATE_KEYWORDS) {
        return InstrumentCategory::Certificate;
    }
    if matches_any(&text, BOND_KEYWORDS) {
        return InstrumentCategory::Bond;
    }
    if FUTURES_CODE.is_match(&symbol_upper) {
        return InstrumentCategory::Future;
    }
    if matches_any(&text, OPTION_KEYWORDS) {
        return InstrumentCategory::Option;
    }
    if matches_any(&text, CFD_KEYWORDS) {
        return InstrumentCategory::Cfd;
    }

    InstrumentCategory::Stock
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_stock_defaults() {
        assert_eq!(classify("BAS.DE", Some("BASF SE")), InstrumentCategory::Stock);
        assert_eq!(classify("AAPL", None), InstrumentCategory::Stock);
    }

    #[test]
    fn test_etf_by_name() {
        assert_eq!(
            classify("EUNL.DE", Some("iShares Core MSCI World UCITS ETF")),
            InstrumentCategory::Etf
        );
        assert_eq!(
            classify("DBXD.DE", Some("Xtrackers DAX")),
            InstrumentCategory::Etf
        );
    }

    #[test]
    fn test_turbo_is_warrant() {
        assert_eq!(
            classify("TT1ABC", Some("Turbo Bull NVIDIA KO 100")),
            InstrumentCategory::Warrant
        );
        assert_eq!(
            classify("OS123", Some("Optionsschein Call DAX 18000")),
            InstrumentCategory::Warrant
        );
    }

    #[test]
    fn test_faktor_checked_before_certificate() {
        // "Faktor 5X Zertifikat" carries both vocabularies; the leveraged
        // vocabulary must win.
        assert_eq!(
            classify("FA5XYZ", Some("Faktor 5X Long Zertifikat auf Tesla")),
            InstrumentCategory::Warrant
        );
    }

    #[test]
    fn test_certificate() {
        assert_eq!(
            classify("BN9XYZ", Some("Bonus Zertifikat auf Allianz")),
            InstrumentCategory::Certificate
        );
    }

    #[test]
    fn test_bond() {
        assert_eq!(
            classify("A1ABC", Some("Bundesrepublik Deutschland Anleihe 2,5% 2033")),
            InstrumentCategory::Bond
        );
    }

    #[test]
    fn test_futures_code_on_symbol() {
        assert_eq!(classify("ESZ4", None), InstrumentCategory::Future);
        assert_eq!(classify("CLF25", None), InstrumentCategory::Future);
        assert_eq!(classify("BMW", None), InstrumentCategory::Stock);
    }

    #[test]
    fn test_option_keywords() {
        assert_eq!(
            classify("XY1", Some("Call on Siemens")),
            InstrumentCategory::Option
        );
    }

    #[test]
    fn test_classification_is_idempotent() {
        let first = classify("FA5XYZ", Some("Faktor 5X Long Zertifikat auf Tesla"));
        let second = classify("FA5XYZ", Some("Faktor 5X Long Zertifikat auf Tesla"));
        assert_eq!(first, second);
    }
}
