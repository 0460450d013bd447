//! Shared lookup pipeline used by every front-end.
//!
//! Keeping this in one place avoids duplicating the core workflow:
//! validate -> resolve location -> latest value -> history -> normalize
//!
//! Geocoding has no data dependency on the statistic chain, so the two run as a
//! `rayon::join` pair and are merged into one `PipelineResult`. Neither side's
//! failure affects the other.

use std::sync::Arc;

use crate::data::{
    AltosClient, CancelToken, Geocoder, HttpTransport, NominatimGeocoder, ReqwestTransport,
    Retrying,
};
use crate::domain::{
    Address, LocationHandle, LookupRequest, NOT_AVAILABLE, PipelineResult, ProviderConfig,
    TimeSeries, clamp_history_limit,
};
use crate::error::AppError;
use crate::series::normalize;

const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// Which parts of the pipeline to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupMode {
    /// Latest value, history and coordinates.
    Full,
    /// Latest value only; no history, no geocoding.
    LatestOnly,
}

pub struct Pipeline {
    altos: AltosClient,
    geocoder: Arc<dyn Geocoder>,
    history_limit: u32,
}

/// Output of the statistic chain, before merging with coordinates.
struct StatOutcome {
    handle: Option<LocationHandle>,
    latest: String,
    history: Option<TimeSeries>,
    error: Option<String>,
}

impl Pipeline {
    pub fn new(altos: AltosClient, geocoder: Arc<dyn Geocoder>, history_limit: u32) -> Self {
        Self {
            altos,
            geocoder,
            history_limit: clamp_history_limit(history_limit),
        }
    }

    /// Build the production pipeline: retrying `reqwest` transport for the data
    /// provider, a separate single-attempt transport for the geocoder.
    pub fn from_config(config: &ProviderConfig) -> Result<Self, AppError> {
        let altos_http = ReqwestTransport::new(config.timeout, USER_AGENT)
            .map_err(|e| AppError::new(2, e.to_string()))?;
        let altos_http: Arc<dyn HttpTransport> =
            Arc::new(Retrying::new(altos_http, config.retry));

        let geo_http = ReqwestTransport::new(config.geocoder.timeout, &config.geocoder.user_agent)
            .map_err(|e| AppError::new(2, e.to_string()))?;
        let geocoder = NominatimGeocoder::new(Arc::new(geo_http), &config.geocoder);

        Ok(Self::new(
            AltosClient::new(altos_http, config),
            Arc::new(geocoder),
            config.history_limit,
        ))
    }

    /// Run a full lookup. Never fails; problems are reported inside the result.
    pub fn run(&self, request: &LookupRequest) -> PipelineResult {
        self.run_with_cancel(request, LookupMode::Full, &CancelToken::new())
    }

    pub fn run_with_cancel(
        &self,
        request: &LookupRequest,
        mode: LookupMode,
        cancel: &CancelToken,
    ) -> PipelineResult {
        let mut result = PipelineResult::blank(request);

        let address =
            match Address::new(request.city.as_str(), &request.state, request.zip.as_str()) {
                Ok(address) => address,
                Err(err) => {
                    tracing::info!(
                        stage = "validate",
                        state = request.state.as_str(),
                        "rejected state code"
                    );
                    result.error = Some(err.message().to_string());
                    return result;
                }
            };
        tracing::info!(
            stage = "validate",
            state = address.state(),
            stat = request.stat.as_str(),
            "lookup accepted"
        );

        let (stats, coordinates) = match mode {
            LookupMode::Full => rayon::join(
                || self.fetch_statistics(&address, &request.stat, mode, cancel),
                || self.geocoder.geocode(&address, cancel),
            ),
            LookupMode::LatestOnly => {
                (self.fetch_statistics(&address, &request.stat, mode, cancel), None)
            }
        };

        result.address = Some(address);
        result.location_hash = stats.handle.as_ref().map(|h| h.hash.clone());
        result.location_url = stats.handle.and_then(|h| h.canonical_url);
        result.latest_value = stats.latest;
        result.history = stats.history;
        result.coordinates = coordinates;
        result.error = stats.error;

        tracing::info!(
            stage = "done",
            latest = result.latest_value.as_str(),
            history = result.history.as_ref().map(|h| h.len()).unwrap_or(0),
            geocoded = result.coordinates.is_some(),
            "lookup finished"
        );
        result
    }

    fn fetch_statistics(
        &self,
        address: &Address,
        stat: &str,
        mode: LookupMode,
        cancel: &CancelToken,
    ) -> StatOutcome {
        let mut outcome = StatOutcome {
            handle: None,
            latest: NOT_AVAILABLE.to_string(),
            history: None,
            error: None,
        };

        match self.altos.resolve(address, cancel) {
            Ok(handle) => outcome.handle = handle,
            Err(err) => {
                tracing::warn!(stage = "resolve", error = %err, "location lookup unavailable");
                outcome.error = Some(format!("No data: location lookup failed ({err})."));
                return outcome;
            }
        }
        if outcome.handle.is_none() {
            return outcome;
        }

        outcome.latest = self.altos.fetch_latest(outcome.handle.as_ref(), stat, cancel);

        if let Err(err) = cancel.check() {
            tracing::info!(stage = "history", "request cancelled");
            outcome.error = Some(format!("No data: {err}."));
            return outcome;
        }
        if mode == LookupMode::Full {
            let raw = self
                .altos
                .fetch_history(outcome.handle.as_ref(), stat, self.history_limit, cancel);
            outcome.history = Some(normalize(&raw));
        }

        outcome
    }
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, Instant};

    use super::*;
    use crate::data::transport::fake::{FakeTransport, ok};
    use crate::domain::{Coordinates, SeriesOrder};
    use crate::error::FetchError;

    const REPORTS: &str = "http://altos.test/reports";
    const DATA: &str = "http://altos.test/data";

    struct FixedGeocoder {
        coords: Option<Coordinates>,
        delay: Duration,
    }

    impl Geocoder for FixedGeocoder {
        fn geocode(&self, _address: &Address, _cancel: &CancelToken) -> Option<Coordinates> {
            std::thread::sleep(self.delay);
            self.coords
        }
    }

    fn config() -> ProviderConfig {
        let mut config = ProviderConfig::with_api_key("k");
        config.reports_url = REPORTS.to_string();
        config.data_url = DATA.to_string();
        config
    }

    fn pipeline(fake: &Arc<FakeTransport>, geocoder: FixedGeocoder) -> Pipeline {
        Pipeline::new(AltosClient::new(fake.clone(), &config()), Arc::new(geocoder), 160)
    }

    fn boise() -> FixedGeocoder {
        FixedGeocoder {
            coords: Some(Coordinates { lat: 43.6, lon: -116.2 }),
            delay: Duration::ZERO,
        }
    }

    fn request(state: &str) -> LookupRequest {
        LookupRequest {
            city: "Boise".to_string(),
            state: state.to_string(),
            zip: "83702".to_string(),
            stat: "price_median".to_string(),
        }
    }

    fn happy_transport() -> Arc<FakeTransport> {
        let history = r#"{"data":{"2024-01-08":500000,"2024-01-01":495000,"2024-01-15":505000}}"#;
        Arc::new(
            FakeTransport::new()
                .json(REPORTS, r#"{"id":"hash-1","url":"https://altos.re/r/hash-1"}"#)
                .route(
                    DATA,
                    vec![ok(200, r#"{"data":{"2024-06-03":512000}}"#), ok(200, history)],
                ),
        )
    }

    #[test]
    fn full_lookup_populates_every_field() {
        let fake = happy_transport();
        let result = pipeline(&fake, boise()).run(&request("id"));

        assert_eq!(result.error, None);
        assert_eq!(result.address.as_ref().map(|a| a.state()), Some("ID"));
        assert_eq!(result.location_hash.as_deref(), Some("hash-1"));
        assert_eq!(result.location_url.as_deref(), Some("https://altos.re/r/hash-1"));
        assert_eq!(result.latest_value, "$512,000");
        assert_eq!(result.coordinates, Some(Coordinates { lat: 43.6, lon: -116.2 }));

        let history = result.history.unwrap();
        assert_eq!(history.order, SeriesOrder::Chronological);
        let labels: Vec<&str> = history.points.iter().map(|p| p.label.as_str()).collect();
        assert_eq!(labels, vec!["2024-01-01", "2024-01-08", "2024-01-15"]);

        let calls = fake.calls();
        assert_eq!(calls.len(), 3);
        assert_eq!(calls[1].param("limit"), Some("1"));
        assert_eq!(calls[2].param("limit"), Some("160"));
    }

    #[test]
    fn invalid_state_short_circuits_without_network() {
        let fake = happy_transport();
        let result = pipeline(&fake, boise()).run(&request("ZZ"));

        assert_eq!(
            result.error.as_deref(),
            Some("Invalid state code. Please enter a valid two-letter state code.")
        );
        assert!(result.address.is_none());
        assert_eq!(result.latest_value, "N/A");
        assert!(result.history.is_none());
        assert!(result.coordinates.is_none());
        assert_eq!(fake.call_count(), 0);
    }

    #[test]
    fn unresolved_location_skips_statistics() {
        let fake = Arc::new(FakeTransport::new().route(REPORTS, vec![ok(500, "")]));
        let result = pipeline(&fake, boise()).run(&request("ID"));

        assert!(result.location_hash.is_none());
        assert_eq!(result.latest_value, "N/A");
        assert!(result.history.is_none());
        assert_eq!(result.error, None);
        assert!(result.coordinates.is_some());
        assert_eq!(fake.call_count(), 1);
    }

    #[test]
    fn transport_failure_reports_no_data() {
        let fake = Arc::new(
            FakeTransport::new().route(
                REPORTS,
                vec![Err(FetchError::Transport("connection refused".to_string()))],
            ),
        );
        let result = pipeline(&fake, boise()).run(&request("ID"));

        assert_eq!(result.latest_value, "N/A");
        assert!(result.error.as_deref().unwrap_or("").starts_with("No data:"));
        assert!(result.coordinates.is_some());
    }

    #[test]
    fn slow_failing_geocoder_does_not_spoil_statistics() {
        let fake = happy_transport();
        let geocoder = FixedGeocoder {
            coords: None,
            delay: Duration::from_millis(150),
        };
        let started = Instant::now();
        let result = pipeline(&fake, geocoder).run(&request("ID"));

        assert!(started.elapsed() < Duration::from_secs(5));
        assert!(result.coordinates.is_none());
        assert_eq!(result.latest_value, "$512,000");
        assert_eq!(result.history.map(|h| h.len()), Some(3));
        assert_eq!(result.error, None);
    }

    #[test]
    fn latest_only_mode_skips_history_and_geocoding() {
        let fake = happy_transport();
        let result = pipeline(&fake, boise()).run_with_cancel(
            &request("ID"),
            LookupMode::LatestOnly,
            &CancelToken::new(),
        );

        assert_eq!(result.latest_value, "$512,000");
        assert!(result.history.is_none());
        assert!(result.coordinates.is_none());
        assert_eq!(fake.call_count(), 2);
    }

    #[test]
    fn cancelled_request_degrades_without_calls() {
        let fake = happy_transport();
        let cancel = CancelToken::new();
        cancel.cancel();
        let result =
            pipeline(&fake, boise()).run_with_cancel(&request("ID"), LookupMode::Full, &cancel);

        assert_eq!(result.latest_value, "N/A");
        assert!(result.history.is_none());
        assert!(result.error.is_some());
        assert_eq!(fake.call_count(), 0);
    }

    #[test]
    fn unparseable_history_dates_keep_provider_order() {
        let fake = Arc::new(
            FakeTransport::new().json(REPORTS, r#"{"id":"h"}"#).route(
                DATA,
                vec![
                    ok(200, r#"{"data":{"2024-06-03":10}}"#),
                    ok(200, r#"{"data":{"2024-01-05":10,"not-a-date":5}}"#),
                ],
            ),
        );
        let result = pipeline(&fake, boise()).run(&request("ID"));

        let history = result.history.unwrap();
        assert_eq!(history.order, SeriesOrder::Insertion);
        let labels: Vec<&str> = history.points.iter().map(|p| p.label.as_str()).collect();
        assert_eq!(labels, vec!["2024-01-05", "not-a-date"]);
        assert_eq!(result.location_url, None);
    }

    #[test]
    fn null_valued_non_date_key_still_keeps_provider_order() {
        let fake = Arc::new(
            FakeTransport::new().json(REPORTS, r#"{"id":"h"}"#).route(
                DATA,
                vec![
                    ok(200, r#"{"data":{"2024-06-03":10}}"#),
                    ok(200, r#"{"data":{"2024-01-05":10,"totals":null,"2024-01-01":5}}"#),
                ],
            ),
        );
        let result = pipeline(&fake, boise()).run(&request("ID"));

        let history = result.history.unwrap();
        assert_eq!(history.order, SeriesOrder::Insertion);
        let labels: Vec<&str> = history.points.iter().map(|p| p.label.as_str()).collect();
        assert_eq!(labels, vec!["2024-01-05", "totals", "2024-01-01"]);
        let values: Vec<Option<f64>> = history.points.iter().map(|p| p.value).collect();
        assert_eq!(values, vec![Some(10.0), None, Some(5.0)]);
    }
}
