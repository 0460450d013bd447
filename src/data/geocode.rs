//! Address geocoding for map display.
//!
//! The geocoder is an independent collaborator: any failure is logged and
//! reported as "no coordinates", never as an error.

use std::sync::Arc;

use serde::Deserialize;
use serde_json::Value;

use crate::data::transport::{CancelToken, HttpTransport};
use crate::domain::{Address, Coordinates, GeocoderConfig};
use crate::error::FetchError;

pub trait Geocoder: Send + Sync {
    fn geocode(&self, address: &Address, cancel: &CancelToken) -> Option<Coordinates>;
}

/// Nominatim-compatible search API (`?q=...&format=json&limit=1`).
pub struct NominatimGeocoder {
    transport: Arc<dyn HttpTransport>,
    url: String,
}

impl NominatimGeocoder {
    /// The transport should carry the geocoder's own timeout and User-Agent.
    pub fn new(transport: Arc<dyn HttpTransport>, config: &GeocoderConfig) -> Self {
        Self {
            transport,
            url: config.url.clone(),
        }
    }

    fn lookup(
        &self,
        address: &Address,
        cancel: &CancelToken,
    ) -> Result<Option<Coordinates>, FetchError> {
        let query = [
            ("q", address.one_line()),
            ("format", "json".to_string()),
            ("limit", "1".to_string()),
        ];
        let resp = self.transport.get(&self.url, &query, cancel)?;
        if !resp.is_success() {
            return Err(FetchError::Status(resp.status));
        }
        parse_places(&resp.body)
    }
}

impl Geocoder for NominatimGeocoder {
    fn geocode(&self, address: &Address, cancel: &CancelToken) -> Option<Coordinates> {
        match self.lookup(address, cancel) {
            Ok(Some(coords)) => {
                tracing::info!(
                    stage = "geocode",
                    lat = coords.lat,
                    lon = coords.lon,
                    "address geocoded"
                );
                Some(coords)
            }
            Ok(None) => {
                tracing::info!(
                    stage = "geocode",
                    address = address.one_line().as_str(),
                    "no geocoding match"
                );
                None
            }
            Err(err) => {
                tracing::warn!(stage = "geocode", error = %err, "geocoding failed");
                None
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct Place {
    lat: Value,
    lon: Value,
}

fn parse_places(body: &str) -> Result<Option<Coordinates>, FetchError> {
    let places: Vec<Place> = serde_json::from_str(body)
        .map_err(|e| FetchError::Malformed(format!("geocoder body: {e}")))?;
    let Some(place) = places.first() else {
        return Ok(None);
    };

    let lat = coordinate(&place.lat).filter(|v| (-90.0..=90.0).contains(v));
    let lon = coordinate(&place.lon).filter(|v| (-180.0..=180.0).contains(v));
    match (lat, lon) {
        (Some(lat), Some(lon)) => Ok(Some(Coordinates { lat, lon })),
        _ => Err(FetchError::Malformed("geocoder returned unusable coordinates".to_string())),
    }
}

// Nominatim sends coordinates as strings; accept plain numbers too.
fn coordinate(value: &Value) -> Option<f64> {
    let v = match value {
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        Value::Number(n) => n.as_f64()?,
        _ => return None,
    };
    v.is_finite().then_some(v)
}
