//! Remote data providers.
//!
//! - `transport`: blocking HTTP seam, retry decorator, cancellation
//! - `altos`: location reports + statistic data
//! - `geocode`: address -> coordinates

pub mod altos;
pub mod geocode;
pub mod transport;

pub use altos::AltosClient;
pub use geocode::{Geocoder, NominatimGeocoder};
pub use transport::{CancelToken, HttpResponse, HttpTransport, ReqwestTransport, Retrying};
