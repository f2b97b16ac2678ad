//! Field-level merge of partial records.
//!
//! Records are merged in a fixed precedence order: the first non-null
//! value for a field wins and later sources cannot override it. Two named
//! exceptions, `name` and `exchange`, use a "strictly longer string wins"
//! rule evaluated in arrival order, because secondary sources often carry
//! the fuller legal name ("BASF SE" vs "BASF").

use crate::models::PartialRecord;

fn fill<T>(dst: &mut Option<T>, src: Option<T>) {
    if dst.is_none() {
        *dst = src;
    }
}

fn prefer_longer(dst: &mut Option<String>, src: Option<String>) {
    let Some(candidate) = src else {
        return;
    };
    if candidate.is_empty() {
        return;
    }
    match dst {
        // Strictly longer: equal length keeps the earlier arrival
        Some(current) if candidate.len() <= current.len() => {}
        _ => *dst = Some(candidate),
    }
}

/// Merge `src` into `dst`, with `dst` taking precedence everywhere except
/// the longer-string-wins fields.
pub fn merge_into(dst: &mut PartialRecord, src: PartialRecord) {
    prefer_longer(&mut dst.name, src.name);
    prefer_longer(&mut dst.exchange, src.exchange);

    fill(&mut dst.price, src.price);
    fill(&mut dst.previous_close, src.previous_close);
    fill(&mut dst.change, src.change);
    fill(&mut dst.change_percent, src.change_percent);
    fill(&mut dst.market_cap, src.market_cap);
    fill(&mut dst.pe_ratio, src.pe_ratio);
    fill(&mut dst.forward_pe, src.forward_pe);
    fill(&mut dst.eps, src.eps);
    fill(&mut dst.dividend_yield, src.dividend_yield);
    fill(&mut dst.dividend_rate, src.dividend_rate);
    fill(&mut dst.beta, src.beta);
    fill(&mut dst.week_52_high, src.week_52_high);
    fill(&mut dst.week_52_low, src.week_52_low);
    fill(&mut dst.volume, src.volume);
    fill(&mut dst.avg_volume, src.avg_volume);
    fill(&mut dst.currency, src.currency);
    fill(&mut dst.isin, src.isin);
    fill(&mut dst.sector, src.sector);
    fill(&mut dst.industry, src.industry);
    fill(&mut dst.country, src.country);
}
