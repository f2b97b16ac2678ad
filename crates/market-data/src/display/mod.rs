//! Presentation helpers for merged records.
//!
//! Pure formatting only, German locale conventions: dot as thousands
//! separator, comma as decimal separator, unit suffix after the number.
//! Nothing in here touches the network or the cache.

/// Format a number with German separators and a fixed number of decimals.
fn format_de(value: f64, decimals: usize) -> String {
    let formatted = format!("{:.*}", decimals, value);
    let (int_part, frac_part) = match formatted.split_once('.') {
        Some((int_part, frac_part)) => (int_part, Some(frac_part)),
        None => (formatted.as_str(), None),
    };

    let negative = int_part.starts_with('-');
    let digits = int_part.trim_start_matches('-');

    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(ch);
    }

    let mut out = String::new();
    if negative {
        out.push('-');
    }
    out.push_str(&grouped);
    if let Some(frac) = frac_part {
        out.push(',');
        out.push_str(frac);
    }
    out
}

/// EUR amount with two decimals: `1.234,56 €`.
pub fn format_eur(value: f64) -> String {
    format!("{} €", format_de(value, 2))
}

/// Signed percent with two decimals: `+1,25 %`, `-0,80 %`.
pub fn format_signed_percent(value: f64) -> String {
    let sign = if value >= 0.0 { "+" } else { "" };
    format!("{}{} %", sign, format_de(value, 2))
}

/// Market capitalization scaled to millions, billions or trillions:
/// `43,90 Mrd. €`. Values below one million fall back to a plain EUR
/// amount.
pub fn format_market_cap(value: f64) -> String {
    let magnitude = value.abs();
    if magnitude >= 1e12 {
        format!("{} Bio. €", format_de(value / 1e12, 2))
    } else if magnitude >= 1e9 {
        format!("{} Mrd. €", format_de(value / 1e9, 2))
    } else if magnitude >= 1e6 {
        format!("{} Mio. €", format_de(value / 1e6, 2))
    } else {
        format_eur(value)
    }
}

/// Optional ratio (P/E, beta) with two decimals, `n/a` when absent.
pub fn format_ratio(value: Option<f64>) -> String {
    match value {
        Some(value) => format_de(value, 2),
        None => "n/a".to_string(),
    }
}
