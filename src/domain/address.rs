//! Address input and state-code validation.
//!
//! Only the state is validated. City and postal code pass through unchecked.

use serde::Serialize;

use crate::error::ValidationError;

/// The fixed set of accepted two-letter US state codes.
pub const US_STATES: [&str; 50] = [
    "AL", "AK", "AZ", "AR", "CA", "CO", "CT", "DE", "FL", "GA",
    "HI", "ID", "IL", "IN", "IA", "KS", "KY", "LA", "ME", "MD",
    "MA", "MI", "MN", "MS", "MO", "MT", "NE", "NV", "NH", "NJ",
    "NM", "NY", "NC", "ND", "OH", "OK", "OR", "PA", "RI", "SC",
    "SD", "TN", "TX", "UT", "VT", "VA", "WA", "WV", "WI", "WY",
];

pub const INVALID_STATE_MESSAGE: &str =
    "Invalid state code. Please enter a valid two-letter state code.";

/// Normalize and validate a state code.
///
/// Returns the upper-cased code on success. Surrounding whitespace is not
/// stripped, so `" ca "` is rejected.
pub fn validate_state(state: &str) -> Result<String, ValidationError> {
    let code = state.to_ascii_uppercase();
    if US_STATES.contains(&code.as_str()) {
        Ok(code)
    } else {
        Err(ValidationError::new(INVALID_STATE_MESSAGE))
    }
}

/// A validated postal address. Construct with [`Address::new`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Address {
    city: String,
    state: String,
    postal_code: String,
}

impl Address {
    pub fn new(
        city: impl Into<String>,
        state: &str,
        postal_code: impl Into<String>,
    ) -> Result<Self, ValidationError> {
        let state = validate_state(state)?;
        Ok(Self {
            city: city.into(),
            state,
            postal_code: postal_code.into(),
        })
    }

    pub fn city(&self) -> &str {
        &self.city
    }

    pub fn state(&self) -> &str {
        &self.state
    }

    pub fn postal_code(&self) -> &str {
        &self.postal_code
    }

    /// Single-line form handed to the geocoder: `"<city>, <state> <zip>"`.
    pub fn one_line(&self) -> String {
        format!("{}, {} {}", self.city, self.state, self.postal_code)
    }
}
