use reqwest::StatusCode;
use thiserror::Error;

/// Why a lookup did not produce a [`LocationRecord`](crate::LocationRecord).
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("'{0}' is not a valid IPv4 or IPv6 address")]
    InvalidIp(String),

    #[error("failed to reach the geolocation API")]
    Transport(#[source] reqwest::Error),

    #[error("geolocation request failed with status {status}: {body}")]
    Status { status: StatusCode, body: String },

    #[error("failed to parse geolocation JSON")]
    Decode(#[source] serde_json::Error),
}

/// A decoded record that could not be placed on the map.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum UpdateError {
    #[error("invalid {field} value '{value}'")]
    InvalidCoordinate { field: &'static str, value: String },
}

/// Any reason a query ended without updating the map.
#[derive(Debug, Error)]
pub enum QueryError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Update(#[from] UpdateError),
}
