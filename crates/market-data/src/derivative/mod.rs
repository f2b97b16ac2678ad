//! Derivative term extraction from free-text product names.
//!
//! Issuers encode leverage, knock-out barriers, strikes, underlyings and
//! expiries into product names ("TURBO BULL NVIDIA KO 100.00 OPEN END").
//! Extraction is purely syntactic and best effort: each field has its own
//! ordered rule table, the first matching pattern wins, and a field with
//! no match simply stays unset. Contradictory signals (a name carrying
//! both long and short vocabulary) are accepted as-is; both flags are set
//! and pattern-list order is preserved rather than resolved.

use lazy_static::lazy_static;
use regex::Regex;

use crate::models::DerivativeInfo;

/// Decision-table row mapping detected vocabulary to a product-type label
/// and cost estimates. The spread column is only filled for rows where
/// the product implies it directly; the rest fall through to
/// [`SPREAD_DEFAULTS`].
struct ProductRule {
    keywords: &'static [&'static str],
    product_type: &'static str,
    financing_fee_percent: f64,
    spread_percent: Option<f64>,
}

/// Ordered: first matching row wins.
const PRODUCT_RULES: &[ProductRule] = &[
    ProductRule {
        keywords: &["TURBO", "KNOCK-OUT", "KNOCKOUT", "KNOCK OUT", " KO "],
        product_type: "Turbo/Knock-Out",
        financing_fee_percent: 2.5,
        spread_percent: None,
    },
    ProductRule {
        keywords: &["MINI FUTURE", "MINI-FUTURE"],
        product_type: "Mini Future",
        financing_fee_percent: 3.0,
        spread_percent: None,
    },
    ProductRule {
        keywords: &["FAKTOR", "FACTOR"],
        product_type: "Faktor-Zertifikat",
        financing_fee_percent: 0.7,
        spread_percent: None,
    },
    ProductRule {
        keywords: &["OPTIONSSCHEIN", "WARRANT"],
        product_type: "Optionsschein",
        financing_fee_percent: 0.0,
        spread_percent: None,
    },
    ProductRule {
        keywords: &["CFD"],
        product_type: "CFD",
        financing_fee_percent: 3.5,
        spread_percent: Some(0.1),
    },
    ProductRule {
        keywords: &["LEVERAGED", "2X ETF", "3X ETF", "HEBEL-ETF"],
        product_type: "Hebel-ETF",
        financing_fee_percent: 0.95,
        spread_percent: None,
    },
];

/// Fallback spread estimates keyed by product type, applied only when the
/// matched rule did not set one.
const SPREAD_DEFAULTS: &[(&str, f64)] = &[
    ("Turbo/Knock-Out", 0.5),
    ("Mini Future", 0.4),
    ("Faktor-Zertifikat", 0.3),
    ("Optionsschein", 1.0),
    ("CFD", 0.1),
    ("Hebel-ETF", 0.15),
];

lazy_static! {
    /// Leverage patterns in priority order; the first match wins and
    /// later patterns are not tried.
    static ref LEVERAGE_PATTERNS: Vec<Regex> = vec![
        Regex::new(r"(\d+)\s*X\b").unwrap(),
        Regex::new(r"FAKTOR\s*(\d+)").unwrap(),
        Regex::new(r"LEVERAGE\s*(\d+)").unwrap(),
        Regex::new(r"(\d+)\s*FACH").unwrap(),
        Regex::new(r"HEBEL\s*:?\s*(\d+)").unwrap(),
    ];

    static ref LONG_PATTERN: Regex = Regex::new(r"\b(LONG|BULL|CALL)\b").unwrap();
    static ref SHORT_PATTERN: Regex = Regex::new(r"\b(SHORT|BEAR|PUT|INVERSE)\b").unwrap();

    /// Knock-out / barrier level: thousands-grouped German form first so
    /// "18.500,0" is captured whole, then plain decimals with comma or dot.
    static ref KNOCKOUT_PATTERN: Regex = Regex::new(
        r"(?:KNOCK[\s-]?OUT|KO|BARRIERE?)\s*:?\s*(\d{1,3}(?:\.\d{3})+(?:,\d+)?|\d+(?:[.,]\d+)?)"
    )
    .unwrap();

    /// Strike / basis price, same number forms as the knock-out level.
    static ref STRIKE_PATTERN: Regex = Regex::new(
        r"(?:STRIKE|BASISPREIS|BASIS)\s*:?\s*(\d{1,3}(?:\.\d{3})+(?:,\d+)?|\d+(?:[.,]\d+)?)"
    )
    .unwrap();

    /// German thousands grouping: dot-separated triplets, optional comma
    /// decimals.
    static ref GROUPED_NUMBER: Regex =
        Regex::new(r"^\d{1,3}(?:\.\d{3})+(?:,\d+)?$").unwrap();

    /// Underlying ticker patterns in priority order, anchored on "AUF",
    /// "ON" or a direction keyword followed by a 2-5 letter token.
    static ref UNDERLYING_PATTERNS: Vec<Regex> = vec![
        Regex::new(r"\bAUF\s+([A-Z]{2,5})\b").unwrap(),
        Regex::new(r"\bON\s+([A-Z]{2,5})\b").unwrap(),
        Regex::new(r"\b(?:LONG|SHORT|BULL|BEAR|CALL|PUT)\s+([A-Z]{2,5})\b").unwrap(),
    ];

    static ref OPEN_END_PATTERN: Regex = Regex::new(r"OPEN[\s-]?END|ENDLOS").unwrap();

    /// Day/month/year before month/year: the more specific form first.
    static ref DATE_PATTERNS: Vec<Regex> = vec![
        Regex::new(r"\b(\d{1,2})[./](\d{1,2})[./](\d{2,4})\b").unwrap(),
        Regex::new(r"\b(\d{1,2})[./](\d{4})\b").unwrap(),
    ];
}

/// Parse a decimal number with either comma or dot separator. A
/// thousands-grouped German form like "18.500,0" drops the grouping dots
/// before the comma becomes the decimal point.
fn parse_decimal(raw: &str) -> Option<f64> {
    if GROUPED_NUMBER.is_match(raw) {
        return raw.replace('.', "").replace(',', ".").parse().ok();
    }
    raw.replace(',', ".").parse().ok()
}

fn extract_leverage(text: &str) -> Option<f64> {
    for pattern in LEVERAGE_PATTERNS.iter() {
        if let Some(caps) = pattern.captures(text) {
            return caps.get(1)?.as_str().parse().ok();
        }
    }
    None
}

fn extract_level(text: &str, pattern: &Regex) -> Option<f64> {
    pattern
        .captures(text)
        .and_then(|caps| caps.get(1))
        .and_then(|m| parse_decimal(m.as_str()))
}

fn extract_underlying(text: &str) -> Option<String> {
    for pattern in UNDERLYING_PATTERNS.iter() {
        if let Some(caps) = pattern.captures(text) {
            return caps.get(1).map(|m| m.as_str().to_string());
        }
    }
    None
}

fn extract_expiration(text: &str) -> Option<String> {
    // "Open end" vocabulary short-circuits the date patterns
    if OPEN_END_PATTERN.is_match(text) {
        return Some("Open End".to_string());
    }
    for pattern in DATE_PATTERNS.iter() {
        if let Some(m) = pattern.find(text) {
            return Some(m.as_str().to_string());
        }
    }
    None
}

fn apply_product_rules(text: &str, info: &mut DerivativeInfo) {
    for rule in PRODUCT_RULES {
        if rule.keywords.iter().any(|keyword| text.contains(keyword)) {
            info.product_type = Some(rule.product_type.to_string());
            info.financing_fee_percent = Some(rule.financing_fee_percent);
            info.spread_percent = rule.spread_percent;
            break;
        }
    }

    if info.spread_percent.is_none() {
        if let Some(product_type) = &info.product_type {
            info.spread_percent = SPREAD_DEFAULTS
                .iter()
                .find(|(label, _)| label == product_type)
                .map(|(_, spread)| *spread);
        }
    }
}

/// Extract derivative terms from a product name.
///
/// Returns an empty [`DerivativeInfo`] when the name is absent or carries
/// no recognizable vocabulary. Deterministic and side-effect free.
pub fn extract(name: Option<&str>) -> DerivativeInfo {
    let mut info = DerivativeInfo::new();
    let Some(name) = name else {
        return info;
    };
    let text = name.to_uppercase();

    info.leverage = extract_leverage(&text);
    // Long and short are checked independently; a name matching both
    // sets both flags.
    info.is_long = LONG_PATTERN.is_match(&text);
    info.is_short = SHORT_PATTERN.is_match(&text);
    info.knockout_level = extract_level(&text, &KNOCKOUT_PATTERN);
    info.strike_price = extract_level(&text, &STRIKE_PATTERN);
    info.underlying_symbol = extract_underlying(&text);
    info.expiration_date = extract_expiration(&text);
    apply_product_rules(&text, &mut info);

    info
}
