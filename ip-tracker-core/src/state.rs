//! State behind the single tracker screen.
//!
//! The record, map focus and marker list only ever change together, inside
//! [`ViewState::on_query_success`]. Every query carries a [`QueryTicket`];
//! completions for anything but the latest ticket are dropped.

use std::fmt::Display;

use tracing::{info, warn};

use crate::{
    UpdateError,
    model::{Coordinate, LocationRecord, MapFocus, Marker},
};

/// Sequence number handed out when a query starts. Issued tickets start at 1.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct QueryTicket(u64);

impl QueryTicket {
    pub fn seq(&self) -> u64 {
        self.0
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum QueryStatus {
    #[default]
    Idle,
    Requesting {
        seq: u64,
    },
    Failed {
        seq: u64,
        message: String,
    },
}

/// What happened to a completion handed to the state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    Updated,
    /// A newer query was issued after this one; nothing changed.
    Stale,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ViewState {
    pub input: String,
    pub record: LocationRecord,
    pub focus: MapFocus,
    pub markers: Vec<Marker>,
    pub status: QueryStatus,
    latest_seq: u64,
}

impl ViewState {
    pub fn set_input(&mut self, text: impl Into<String>) {
        self.input = text.into();
    }

    pub fn begin_query(&mut self) -> QueryTicket {
        self.latest_seq += 1;
        self.status = QueryStatus::Requesting { seq: self.latest_seq };
        QueryTicket(self.latest_seq)
    }

    pub fn is_current(&self, ticket: QueryTicket) -> bool {
        ticket.0 == self.latest_seq
    }

    pub fn is_requesting(&self) -> bool {
        matches!(self.status, QueryStatus::Requesting { .. })
    }

    /// Drop out of `Requesting` when the pending query is abandoned.
    ///
    /// Returns whether the status changed. A `Failed` status stays visible.
    pub fn cancel_query(&mut self) -> bool {
        match self.status {
            QueryStatus::Requesting { seq } => {
                info!(seq, "pending query cancelled");
                self.status = QueryStatus::Idle;
                true
            }
            _ => false,
        }
    }

    pub fn error_message(&self) -> Option<&str> {
        match &self.status {
            QueryStatus::Failed { message, .. } => Some(message),
            _ => None,
        }
    }

    /// Put a decoded record on the map.
    ///
    /// If either coordinate does not parse, the status turns `Failed` and the
    /// record, focus and markers stay as they were.
    pub fn on_query_success(
        &mut self,
        ticket: QueryTicket,
        record: LocationRecord,
    ) -> Result<Applied, UpdateError> {
        if !self.is_current(ticket) {
            info!(seq = ticket.0, latest = self.latest_seq, "discarding stale result");
            return Ok(Applied::Stale);
        }

        let coordinate = match coordinate_of(&record) {
            Ok(c) => c,
            Err(err) => {
                warn!(seq = ticket.0, ip = %record.ip, error = %err, "cannot place result on map");
                self.status = QueryStatus::Failed { seq: ticket.0, message: err.to_string() };
                return Err(err);
            }
        };

        info!(seq = ticket.0, ip = %record.ip, lat = coordinate.lat, lng = coordinate.lng, "location updated");

        self.markers = vec![Marker::new(coordinate)];
        self.focus = MapFocus::focused_on(coordinate);
        self.record = record;
        self.status = QueryStatus::Idle;

        Ok(Applied::Updated)
    }

    /// Record a failed lookup. The previous result stays on screen.
    pub fn on_query_failure(&mut self, ticket: QueryTicket, error: &dyn Display) -> Applied {
        if !self.is_current(ticket) {
            info!(seq = ticket.0, latest = self.latest_seq, "discarding stale failure");
            return Applied::Stale;
        }

        warn!(seq = ticket.0, %error, "location query failed");
        self.status = QueryStatus::Failed { seq: ticket.0, message: error.to_string() };
        Applied::Updated
    }

    /// Lines for the details panel; empty until a record is present.
    pub fn details_lines(&self) -> Vec<String> {
        let r = &self.record;
        if r.is_empty() {
            return Vec::new();
        }

        vec![
            format!("IP Address: {}", r.ip),
            format!("Timezone: {}", r.time_zone.offset),
            format!("Location: {}, {}", r.city, r.country_name),
            format!("ISP: {}", r.isp),
        ]
    }
}

/// Parse the record's string coordinates into degrees.
pub fn coordinate_of(record: &LocationRecord) -> Result<Coordinate, UpdateError> {
    let lat = parse_degrees("latitude", &record.latitude, 90.0)?;
    let lng = parse_degrees("longitude", &record.longitude, 180.0)?;
    Ok(Coordinate { lat, lng })
}

fn parse_degrees(field: &'static str, value: &str, limit: f64) -> Result<f64, UpdateError> {
    value
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite() && v.abs() <= limit)
        .ok_or_else(|| UpdateError::InvalidCoordinate { field, value: value.to_owned() })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        FetchError,
        model::{FOCUSED_SPAN, TimeZoneInfo},
        provider::ipgeolocation::decode_record,
    };

    const GOOGLE_DNS: &str = r#"{"ip":"8.8.8.8","time_zone":{"offset":-8},"country_name":"United States","city":"Mountain View","zipcode":"94043","isp":"Google LLC","latitude":"37.4056","longitude":"-122.0775"}"#;

    fn record(lat: &str, lng: &str) -> LocationRecord {
        LocationRecord {
            ip: "203.0.113.7".into(),
            time_zone: TimeZoneInfo { offset: 5.5 },
            country_name: "India".into(),
            city: "Mumbai".into(),
            zipcode: "400001".into(),
            isp: "Example ISP".into(),
            latitude: lat.into(),
            longitude: lng.into(),
        }
    }

    #[test]
    fn starts_with_wide_fallback_focus_and_no_marker() {
        let state = ViewState::default();
        assert_eq!(state.focus, MapFocus::default());
        assert!(state.markers.is_empty());
        assert!(state.details_lines().is_empty());
        assert_eq!(state.status, QueryStatus::Idle);
    }

    #[test]
    fn google_dns_scenario() {
        let mut state = ViewState::default();
        state.set_input("8.8.8.8");

        let ticket = state.begin_query();
        assert!(state.is_requesting());

        let rec = decode_record(GOOGLE_DNS).unwrap();
        assert_eq!(state.on_query_success(ticket, rec), Ok(Applied::Updated));

        assert_eq!(state.markers.len(), 1);
        let expected = Coordinate { lat: 37.4056, lng: -122.0775 };
        assert_eq!(state.markers[0].coordinate, expected);
        assert_eq!(state.focus.center, expected);
        assert_eq!(state.focus.span, FOCUSED_SPAN);
        assert_eq!(state.status, QueryStatus::Idle);

        assert_eq!(
            state.details_lines(),
            vec![
                "IP Address: 8.8.8.8",
                "Timezone: -8",
                "Location: Mountain View, United States",
                "ISP: Google LLC",
            ]
        );
    }

    #[test]
    fn fractional_offset_is_printed_as_is() {
        let mut state = ViewState::default();
        let ticket = state.begin_query();
        state.on_query_success(ticket, record("19.07", "72.88")).unwrap();
        assert_eq!(state.details_lines()[1], "Timezone: 5.5");
    }

    #[test]
    fn new_result_replaces_the_marker() {
        let mut state = ViewState::default();

        let first = state.begin_query();
        state.on_query_success(first, record("10", "20")).unwrap();
        let first_id = state.markers[0].id;

        let second = state.begin_query();
        state.on_query_success(second, record("-10", "-20")).unwrap();

        assert_eq!(state.markers.len(), 1);
        assert_ne!(state.markers[0].id, first_id);
        assert_eq!(state.markers[0].coordinate, Coordinate { lat: -10.0, lng: -20.0 });
    }

    #[test]
    fn non_numeric_coordinates_leave_state_untouched() {
        let mut state = ViewState::default();
        let ticket = state.begin_query();
        state.on_query_success(ticket, record("10", "20")).unwrap();
        let before = state.clone();

        let ticket = state.begin_query();
        let err = state.on_query_success(ticket, record("north", "20")).unwrap_err();

        assert_eq!(
            err,
            UpdateError::InvalidCoordinate { field: "latitude", value: "north".into() }
        );
        assert_eq!(state.record, before.record);
        assert_eq!(state.focus, before.focus);
        assert_eq!(state.markers, before.markers);
        assert_eq!(state.error_message(), Some("invalid latitude value 'north'"));
    }

    #[test]
    fn out_of_range_longitude_is_rejected() {
        let mut state = ViewState::default();
        let ticket = state.begin_query();
        let err = state.on_query_success(ticket, record("10", "181")).unwrap_err();
        assert!(matches!(err, UpdateError::InvalidCoordinate { field: "longitude", .. }));
        assert!(state.markers.is_empty());
        assert!(state.record.is_empty());
    }

    #[test]
    fn malformed_json_keeps_defaults_and_reports_error() {
        let mut state = ViewState::default();
        let ticket = state.begin_query();

        let err = decode_record("<html>rate limited</html>").unwrap_err();
        assert_eq!(state.on_query_failure(ticket, &err), Applied::Updated);

        assert!(state.record.is_empty());
        assert_eq!(state.focus, MapFocus::default());
        assert!(state.markers.is_empty());
        assert_eq!(state.error_message(), Some("failed to parse geolocation JSON"));
    }

    #[test]
    fn missing_field_keeps_previous_result() {
        let mut state = ViewState::default();
        let ticket = state.begin_query();
        state.on_query_success(ticket, record("1", "2")).unwrap();
        let before = state.clone();

        let ticket = state.begin_query();
        let err = decode_record(r#"{"ip":"8.8.8.8"}"#).unwrap_err();
        state.on_query_failure(ticket, &err);

        assert_eq!(state.record, before.record);
        assert_eq!(state.focus, before.focus);
        assert_eq!(state.markers, before.markers);
        assert!(state.error_message().is_some());
    }

    #[test]
    fn stale_success_is_discarded() {
        let mut state = ViewState::default();
        let older = state.begin_query();
        let newer = state.begin_query();

        state.on_query_success(newer, record("1", "2")).unwrap();
        let after_newer = state.clone();

        assert_eq!(state.on_query_success(older, record("3", "4")), Ok(Applied::Stale));
        assert_eq!(state, after_newer);
    }

    #[test]
    fn stale_failure_does_not_mark_newer_query_failed() {
        let mut state = ViewState::default();
        let older = state.begin_query();
        let newer = state.begin_query();

        let err = FetchError::InvalidIp("x".into());
        assert_eq!(state.on_query_failure(older, &err), Applied::Stale);
        assert_eq!(state.status, QueryStatus::Requesting { seq: newer.seq() });
    }

    #[test]
    fn cancel_returns_requesting_to_idle() {
        let mut state = ViewState::default();
        state.begin_query();

        assert!(state.cancel_query());
        assert!(!state.is_requesting());
        assert_eq!(state.status, QueryStatus::Idle);
        assert!(state.record.is_empty());
    }

    #[test]
    fn cancel_keeps_failure_visible() {
        let mut state = ViewState::default();
        let ticket = state.begin_query();
        state.on_query_failure(ticket, &"timed out");

        assert!(!state.cancel_query());
        assert_eq!(state.error_message(), Some("timed out"));
    }

    #[test]
    fn coordinates_tolerate_surrounding_whitespace() {
        let c = coordinate_of(&record(" 12.5 ", "-0.25\n")).unwrap();
        assert_eq!(c, Coordinate { lat: 12.5, lng: -0.25 });
    }
}
