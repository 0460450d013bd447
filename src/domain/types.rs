//! Shared domain types.
//!
//! Everything here is constructed fresh per lookup and dropped with the result.
//! The output-facing types are serializable so a front-end can ship them as JSON.

use chrono::NaiveDate;
use serde::Serialize;

use super::address::Address;

/// Provider bucketing granularity (weekly).
pub const WINDOW_SIZE: &str = "7D";
/// Provider percentile selector.
pub const QUARTILE: u32 = 0;
/// Provider result type.
pub const RESULT_TYPE_ID: u32 = 100;
/// `limit` used for latest-value queries.
pub const LATEST_LIMIT: u32 = 1;
/// Upper bound on the history window (weeks).
pub const MAX_HISTORY_LIMIT: u32 = 160;

/// Display sentinel for a missing value.
pub const NOT_AVAILABLE: &str = "N/A";

/// The four strings handed in by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LookupRequest {
    pub city: String,
    pub state: String,
    pub zip: String,
    pub stat: String,
}

/// Opaque location identifier issued by the reports endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LocationHandle {
    pub hash: String,
    pub canonical_url: Option<String>,
}

/// Parameters of a single data-endpoint query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatisticQuery {
    pub location_hash: String,
    pub stat_name: String,
    pub limit: u32,
}

impl StatisticQuery {
    pub fn latest(location_hash: &str, stat_name: &str) -> Self {
        Self {
            location_hash: location_hash.to_string(),
            stat_name: stat_name.to_string(),
            limit: LATEST_LIMIT,
        }
    }

    pub fn history(location_hash: &str, stat_name: &str, limit: u32) -> Self {
        Self {
            location_hash: location_hash.to_string(),
            stat_name: stat_name.to_string(),
            limit: limit.clamp(1, MAX_HISTORY_LIMIT),
        }
    }

    /// Query-string pairs, excluding the provider key.
    pub fn params(&self) -> Vec<(&'static str, String)> {
        vec![
            ("hash", self.location_hash.clone()),
            ("stat", self.stat_name.clone()),
            ("resTypeId", RESULT_TYPE_ID.to_string()),
            ("quartile", QUARTILE.to_string()),
            ("window_size", WINDOW_SIZE.to_string()),
            ("remove_null", "true".to_string()),
            ("limit", self.limit.to_string()),
        ]
    }
}

/// One `date -> value` entry of the provider's `data` object.
#[derive(Debug, Clone, PartialEq)]
pub struct RawEntry {
    pub key: String,
    /// `None` when the provider sent something other than a finite number.
    pub value: Option<f64>,
}

/// The provider's `data` object, in document order.
pub type RawSeries = Vec<RawEntry>;

/// How a normalized series is ordered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SeriesOrder {
    /// Sorted ascending by parsed date.
    Chronological,
    /// Provider order, kept because at least one key was not a date.
    Insertion,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimeSeriesPoint {
    /// The key exactly as the provider sent it.
    pub label: String,
    /// Parsed date; always present for chronological series.
    pub date: Option<NaiveDate>,
    pub value: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimeSeries {
    pub order: SeriesOrder,
    pub points: Vec<TimeSeriesPoint>,
}

impl TimeSeries {
    pub fn empty() -> Self {
        Self {
            order: SeriesOrder::Chronological,
            points: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lon: f64,
}

/// Everything a front-end needs to render one lookup.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PipelineResult {
    pub request: LookupRequest,
    /// Present only when the state code validated.
    pub address: Option<Address>,
    pub location_hash: Option<String>,
    pub location_url: Option<String>,
    pub latest_value: String,
    pub history: Option<TimeSeries>,
    pub coordinates: Option<Coordinates>,
    pub error: Option<String>,
}

impl PipelineResult {
    /// A result with nothing resolved yet.
    pub fn blank(request: &LookupRequest) -> Self {
        Self {
            request: request.clone(),
            address: None,
            location_hash: None,
            location_url: None,
            latest_value: NOT_AVAILABLE.to_string(),
            history: None,
            coordinates: None,
            error: None,
        }
    }
}
