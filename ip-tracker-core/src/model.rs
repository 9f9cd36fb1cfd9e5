use chrono::FixedOffset;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Center used before any lookup has succeeded.
pub const FALLBACK_CENTER: Coordinate = Coordinate { lat: 51.505, lng: -0.09 };

/// Span shown before any lookup has succeeded.
pub const WIDE_SPAN: Span = Span { lat_delta: 0.5, lng_delta: 0.5 };

/// Span used once a result is on the map.
pub const FOCUSED_SPAN: Span = Span { lat_delta: 0.02, lng_delta: 0.02 };

/// Geolocation result as returned by the API.
///
/// The default (empty) record means "no query yet".
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LocationRecord {
    pub ip: String,
    pub time_zone: TimeZoneInfo,
    pub country_name: String,
    pub city: String,
    pub zipcode: String,
    pub isp: String,
    /// Degrees, transmitted as a string.
    pub latitude: String,
    /// Degrees, transmitted as a string.
    pub longitude: String,
}

impl LocationRecord {
    pub fn is_empty(&self) -> bool {
        self.ip.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct TimeZoneInfo {
    /// Hours from UTC, possibly fractional.
    pub offset: f64,
}

impl TimeZoneInfo {
    /// The offset as a chrono timezone, if it is within +/- 24h.
    pub fn fixed_offset(&self) -> Option<FixedOffset> {
        if !self.offset.is_finite() {
            return None;
        }
        let secs = (self.offset * 3600.0).round();
        FixedOffset::east_opt(secs as i32)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lng: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Span {
    pub lat_delta: f64,
    pub lng_delta: f64,
}

/// Visible map center and zoom extent.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MapFocus {
    pub center: Coordinate,
    pub span: Span,
}

impl MapFocus {
    pub fn focused_on(center: Coordinate) -> Self {
        Self { center, span: FOCUSED_SPAN }
    }
}

impl Default for MapFocus {
    fn default() -> Self {
        Self { center: FALLBACK_CENTER, span: WIDE_SPAN }
    }
}

/// Point annotation for the most recently looked-up address.
#[derive(Debug, Clone, PartialEq)]
pub struct Marker {
    pub id: Uuid,
    pub coordinate: Coordinate,
}

impl Marker {
    pub fn new(coordinate: Coordinate) -> Self {
        Self { id: Uuid::new_v4(), coordinate }
    }
}
