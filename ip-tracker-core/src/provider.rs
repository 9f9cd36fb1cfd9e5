use crate::{Config, FetchError, LocationRecord, provider::ipgeolocation::IpGeolocationProvider};
use async_trait::async_trait;
use std::{fmt::Debug, net::IpAddr};

pub mod ipgeolocation;

#[async_trait]
pub trait LocationProvider: Send + Sync + Debug {
    async fn fetch_location(&self, ip: &str) -> Result<LocationRecord, FetchError>;
}

/// Look up `ip` against the default ipgeolocation.io endpoint.
pub async fn fetch_location(ip: &str, api_key: &str) -> Result<LocationRecord, FetchError> {
    IpGeolocationProvider::new(api_key.to_owned()).fetch_location(ip).await
}

/// Accepts IPv4 and IPv6 literals, ignoring surrounding whitespace.
pub fn parse_ip(input: &str) -> Result<IpAddr, FetchError> {
    let trimmed = input.trim();
    trimmed
        .parse::<IpAddr>()
        .map_err(|_| FetchError::InvalidIp(trimmed.to_owned()))
}

/// Construct the provider described by `config`.
pub fn provider_from_config(config: &Config) -> anyhow::Result<Box<dyn LocationProvider>> {
    let api_key = config.resolve_api_key()?;

    let provider = match config.endpoint.as_deref() {
        Some(endpoint) => IpGeolocationProvider::with_endpoint(api_key, endpoint.to_owned()),
        None => IpGeolocationProvider::new(api_key),
    };

    Ok(Box::new(provider))
}
