use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use crate::{FetchError, model::LocationRecord, provider::parse_ip};

use super::LocationProvider;

pub const DEFAULT_ENDPOINT: &str = "https://api.ipgeolocation.io/ipgeo";

/// Client for the ipgeolocation.io `ipgeo` endpoint.
#[derive(Clone)]
pub struct IpGeolocationProvider {
    api_key: String,
    endpoint: String,
    http: Client,
}

impl IpGeolocationProvider {
    pub fn new(api_key: String) -> Self {
        Self::with_endpoint(api_key, DEFAULT_ENDPOINT.to_owned())
    }

    pub fn with_endpoint(api_key: String, endpoint: String) -> Self {
        Self { api_key, endpoint, http: Client::new() }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

// Keeps the API key out of logs.
impl std::fmt::Debug for IpGeolocationProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IpGeolocationProvider")
            .field("endpoint", &self.endpoint)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl LocationProvider for IpGeolocationProvider {
    async fn fetch_location(&self, ip: &str) -> Result<LocationRecord, FetchError> {
        let ip = parse_ip(ip)?.to_string();

        debug!(endpoint = %self.endpoint, %ip, "requesting geolocation");

        let res = self
            .http
            .get(&self.endpoint)
            .query(&[("apiKey", self.api_key.as_str()), ("ip", ip.as_str())])
            .send()
            .await
            .map_err(FetchError::Transport)?;

        let status = res.status();
        let body = res.text().await.map_err(FetchError::Transport)?;

        debug!(%status, bytes = body.len(), "geolocation response received");

        if !status.is_success() {
            return Err(FetchError::Status { status, body: truncate_body(&body) });
        }

        decode_record(&body)
    }
}

/// Decode an `ipgeo` response body. Every consumed field is required.
pub fn decode_record(body: &str) -> Result<LocationRecord, FetchError> {
    serde_json::from_str(body).map_err(FetchError::Decode)
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    if body.len() <= MAX {
        return body.to_string();
    }
    let mut end = MAX;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &body[..end])
}
