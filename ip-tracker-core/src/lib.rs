//! Core library for the `ip-tracker` CLI.
//!
//! This crate defines:
//! - Configuration & API key handling
//! - The geolocation client (ipgeolocation.io)
//! - The view state behind the tracker screen and the controller driving it
//!
//! It is used by `ip-tracker-cli`, but can also back other front-ends.

pub mod config;
pub mod error;
pub mod model;
pub mod provider;
pub mod state;
pub mod tracker;

pub use config::Config;
pub use error::{FetchError, QueryError, UpdateError};
pub use model::{Coordinate, LocationRecord, MapFocus, Marker, Span, TimeZoneInfo};
pub use provider::{
    LocationProvider, fetch_location, ipgeolocation::IpGeolocationProvider, parse_ip,
    provider_from_config,
};
pub use state::{Applied, QueryStatus, QueryTicket, ViewState};
pub use tracker::Tracker;
