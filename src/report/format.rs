//! Value formatting and text reports.
//!
//! Formatting is a pure function of `(raw value, stat name)`; the report
//! builders only arrange already-formatted values.

use crate::domain::{NOT_AVAILABLE, PipelineResult, SeriesOrder, TimeSeries};

/// Display unit of a statistic, derived from its name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitCategory {
    Currency,
    Percentage,
    Count,
}

impl UnitCategory {
    /// Classify by substring, in priority order: currency, then percentage.
    pub fn classify(stat: &str) -> Self {
        if stat.contains("price") || stat.contains("sqft") || stat.contains("lot") {
            UnitCategory::Currency
        } else if stat.contains("percent") {
            UnitCategory::Percentage
        } else {
            UnitCategory::Count
        }
    }
}

/// Format a raw provider value for display.
///
/// - currency: `$1,234,567`
/// - percentage: `3.1%`
/// - count: `1,234`
///
/// Missing or non-finite values format as `N/A`.
pub fn format_value(raw: Option<f64>, stat: &str) -> String {
    let Some(v) = raw.filter(|v| v.is_finite()) else {
        return NOT_AVAILABLE.to_string();
    };
    match UnitCategory::classify(stat) {
        UnitCategory::Currency => {
            let digits = group_thousands(v.abs());
            if is_negative(v, &digits) {
                format!("-${digits}")
            } else {
                format!("${digits}")
            }
        }
        UnitCategory::Percentage => format!("{v:.1}%"),
        UnitCategory::Count => {
            let digits = group_thousands(v.abs());
            if is_negative(v, &digits) {
                format!("-{digits}")
            } else {
                digits
            }
        }
    }
}

// A value that rounds to zero prints without a sign.
fn is_negative(v: f64, digits: &str) -> bool {
    v < 0.0 && digits.bytes().any(|b| matches!(b, b'1'..=b'9'))
}

/// Round a non-negative value to an integer and insert `,` every three digits.
fn group_thousands(v: f64) -> String {
    let plain = format!("{v:.0}");
    let len = plain.len();
    let mut out = String::with_capacity(len + len / 3);
    for (i, ch) in plain.chars().enumerate() {
        if i > 0 && (len - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// Format the lookup summary block.
pub fn format_result_summary(result: &PipelineResult) -> String {
    let mut out = String::new();
    let req = &result.request;

    out.push_str("=== altos - market statistic lookup ===\n");
    let (city, state, zip) = match &result.address {
        Some(addr) => (addr.city(), addr.state(), addr.postal_code()),
        None => (req.city.as_str(), req.state.as_str(), req.zip.as_str()),
    };
    out.push_str(&format!("Address: {city}, {state} {zip}\n"));
    out.push_str(&format!(
        "Stat: {} ({:?})\n",
        req.stat,
        UnitCategory::classify(&req.stat)
    ));

    if let Some(err) = &result.error {
        out.push_str(&format!("Error: {err}\n"));
    }
    if result.address.is_none() {
        return out;
    }

    out.push_str(&format!(
        "Location: {}\n",
        result.location_hash.as_deref().unwrap_or(NOT_AVAILABLE)
    ));
    out.push_str(&format!(
        "Report URL: {}\n",
        result.location_url.as_deref().unwrap_or(NOT_AVAILABLE)
    ));
    out.push_str(&format!("Latest: {}\n", result.latest_value));
    match result.coordinates {
        Some(c) => out.push_str(&format!("Coordinates: {:.5}, {:.5}\n", c.lat, c.lon)),
        None => out.push_str(&format!("Coordinates: {NOT_AVAILABLE}\n")),
    }

    out
}

/// Format the history as a two-column table.
pub fn format_history_table(series: &TimeSeries, stat: &str) -> String {
    let mut out = String::new();

    match series.order {
        SeriesOrder::Chronological => {
            out.push_str(&format!("History ({} points):\n", series.len()));
        }
        SeriesOrder::Insertion => {
            out.push_str(&format!(
                "History ({} points, provider order: dates could not be parsed):\n",
                series.len()
            ));
        }
    }
    if series.is_empty() {
        out.push_str("  (no data)\n");
        return out;
    }

    out.push_str(&format!("{:<12} {:>14}\n", "date", "value"));
    out.push_str(&format!("{:-<12} {:-<14}\n", "", ""));
    for p in &series.points {
        out.push_str(&format!(
            "{:<12} {:>14}\n",
            truncate(&p.label, 12),
            format_value(p.value, stat)
        ));
    }

    out
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out = String::new();
    for (i, ch) in s.chars().enumerate() {
        if i + 1 >= max {
            break;
        }
        out.push(ch);
    }
    out.push('.');
    out
}
