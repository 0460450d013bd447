//! Altos API integration: location reports and statistic data.
//!
//! Every failure here degrades rather than propagates. The location lookup only
//! surfaces transport-level errors (so the caller can say "no data"); the
//! statistic fetchers never fail and return `"N/A"` or an empty series instead.

use std::sync::Arc;

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::data::transport::{CancelToken, HttpTransport};
use crate::domain::{
    Address, LocationHandle, NOT_AVAILABLE, ProviderConfig, RawEntry, RawSeries, StatisticQuery,
};
use crate::error::FetchError;
use crate::report::format_value;
use crate::series::parse_date_key;

pub struct AltosClient {
    transport: Arc<dyn HttpTransport>,
    reports_url: String,
    data_url: String,
    api_key: String,
}

impl AltosClient {
    pub fn new(transport: Arc<dyn HttpTransport>, config: &ProviderConfig) -> Self {
        Self {
            transport,
            reports_url: config.reports_url.clone(),
            data_url: config.data_url.clone(),
            api_key: config.api_key.clone(),
        }
    }

    /// Resolve an address to the provider's location handle.
    ///
    /// A non-success status or an unusable body yields `Ok(None)`.
    pub fn resolve(
        &self,
        address: &Address,
        cancel: &CancelToken,
    ) -> Result<Option<LocationHandle>, FetchError> {
        let query = [
            ("city", address.city().to_string()),
            ("state", address.state().to_string()),
            ("zip", address.postal_code().to_string()),
            ("pai", self.api_key.clone()),
        ];
        tracing::info!(
            stage = "resolve",
            city = address.city(),
            state = address.state(),
            "location lookup"
        );

        let resp = self.transport.get(&self.reports_url, &query, cancel)?;
        if !resp.is_success() {
            tracing::warn!(stage = "resolve", status = resp.status, "location lookup failed");
            return Ok(None);
        }

        match parse_location(&resp.body) {
            Ok(handle) => {
                tracing::info!(stage = "resolve", hash = handle.hash.as_str(), "location resolved");
                Ok(Some(handle))
            }
            Err(err) => {
                tracing::warn!(stage = "resolve", error = %err, "unusable location response");
                Ok(None)
            }
        }
    }

    /// Latest formatted value of `stat`, or `"N/A"`.
    pub fn fetch_latest(
        &self,
        handle: Option<&LocationHandle>,
        stat: &str,
        cancel: &CancelToken,
    ) -> String {
        let Some(handle) = handle else {
            return NOT_AVAILABLE.to_string();
        };
        let query = StatisticQuery::latest(&handle.hash, stat);
        match self.fetch_entries(&query, cancel) {
            Ok(entries) => {
                let raw = pick_latest(&entries).and_then(|entry| entry.value);
                format_value(raw, stat)
            }
            Err(err) => {
                tracing::warn!(stage = "latest", stat, error = %err, "latest value unavailable");
                NOT_AVAILABLE.to_string()
            }
        }
    }

    /// Up to `limit` raw history entries of `stat`, in provider order.
    pub fn fetch_history(
        &self,
        handle: Option<&LocationHandle>,
        stat: &str,
        limit: u32,
        cancel: &CancelToken,
    ) -> RawSeries {
        let Some(handle) = handle else {
            return RawSeries::new();
        };
        let query = StatisticQuery::history(&handle.hash, stat, limit);
        match self.fetch_entries(&query, cancel) {
            Ok(series) => {
                let missing = series.iter().filter(|e| e.value.is_none()).count();
                tracing::info!(
                    stage = "history",
                    stat,
                    entries = series.len(),
                    missing,
                    "history fetched"
                );
                series
            }
            Err(err) => {
                tracing::warn!(stage = "history", stat, error = %err, "history unavailable");
                RawSeries::new()
            }
        }
    }

    fn fetch_entries(
        &self,
        query: &StatisticQuery,
        cancel: &CancelToken,
    ) -> Result<RawSeries, FetchError> {
        let mut params = query.params();
        params.push(("pai", self.api_key.clone()));
        tracing::debug!(
            stage = "data",
            stat = query.stat_name.as_str(),
            limit = query.limit,
            "data request"
        );

        let resp = self.transport.get(&self.data_url, &params, cancel)?;
        if !resp.is_success() {
            return Err(FetchError::Status(resp.status));
        }
        parse_data(&resp.body)
    }
}

#[derive(Debug, Deserialize)]
struct ReportResponse {
    #[serde(default)]
    id: Option<Value>,
    #[serde(default)]
    url: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct DataResponse {
    #[serde(default)]
    data: Option<Map<String, Value>>,
}

fn parse_location(body: &str) -> Result<LocationHandle, FetchError> {
    let report: ReportResponse = serde_json::from_str(body)
        .map_err(|e| FetchError::Malformed(format!("location body: {e}")))?;

    let hash = report
        .id
        .as_ref()
        .and_then(scalar_to_string)
        .ok_or_else(|| FetchError::Malformed("location body has no usable 'id'".to_string()))?;
    let canonical_url = report.url.as_ref().and_then(scalar_to_string);

    Ok(LocationHandle { hash, canonical_url })
}

fn scalar_to_string(value: &Value) -> Option<String> {
    let s = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    if s.is_empty() { None } else { Some(s) }
}

/// Decode `{ "data": { "<date>": <number>, ... } }`, keeping document order.
///
/// Values that are not finite numbers are kept as `None`. A missing or null
/// `data` field is an empty result.
fn parse_data(body: &str) -> Result<RawSeries, FetchError> {
    let resp: DataResponse =
        serde_json::from_str(body).map_err(|e| FetchError::Malformed(format!("data body: {e}")))?;
    let entries = resp
        .data
        .unwrap_or_default()
        .into_iter()
        .map(|(key, value)| RawEntry {
            key,
            value: value.as_f64().filter(|v| v.is_finite()),
        })
        .collect();
    Ok(entries)
}

/// Choose the entry representing the latest value.
///
/// The provider should send exactly one entry for `limit=1`. When it sends more,
/// the entry with the greatest parseable date wins; if no key parses, the first
/// entry in document order is used.
fn pick_latest(entries: &[RawEntry]) -> Option<&RawEntry> {
    if entries.len() > 1 {
        tracing::warn!(stage = "latest", entries = entries.len(), "expected a single latest entry");
        let newest = entries
            .iter()
            .filter_map(|entry| parse_date_key(&entry.key).ok().map(|d| (d, entry)))
            .max_by_key(|(d, _)| *d)
            .map(|(_, entry)| entry);
        if newest.is_some() {
            return newest;
        }
    }
    entries.first()
}
