use std::sync::Arc;

use anyhow::{Context, anyhow};
use chrono::Utc;
use clap::{Parser, Subcommand};
use inquire::{InquireError, Password, PasswordDisplayMode, Text};
use ip_tracker_core::{Config, LocationProvider, Tracker, ViewState, provider_from_config};
use tracing::{debug, info, warn};

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "ip-tracker", version, about = "Look up where an IP address is")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Store the ipgeolocation.io API key.
    Configure {
        /// Custom API endpoint, e.g. a self-hosted proxy.
        #[arg(long)]
        endpoint: Option<String>,
    },

    /// Show the location of a single IP address.
    Lookup {
        /// IPv4 or IPv6 address.
        ip: String,

        /// Print the raw record as JSON instead of the details panel.
        #[arg(long)]
        json: bool,
    },

    /// Prompt for addresses until interrupted.
    Interactive,
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        match self.command {
            Command::Configure { endpoint } => configure(endpoint),
            Command::Lookup { ip, json } => lookup(ip, json).await,
            Command::Interactive => interactive().await,
        }
    }
}

fn configure(endpoint: Option<String>) -> anyhow::Result<()> {
    let mut config = Config::load()?;

    let api_key = Password::new("ipgeolocation.io API key:")
        .with_display_mode(PasswordDisplayMode::Masked)
        .without_confirmation()
        .prompt()
        .context("Failed to read API key")?;

    if api_key.trim().is_empty() {
        return Err(anyhow!("API key must not be empty"));
    }

    config.set_api_key(api_key.trim().to_owned());
    if endpoint.is_some() {
        config.endpoint = endpoint;
    }
    config.save()?;
    info!(endpoint = ?config.endpoint, "configuration saved");

    println!("Saved configuration to {}", Config::config_file_path()?.display());
    Ok(())
}

fn tracker_from_config() -> anyhow::Result<Tracker> {
    let config = Config::load()?;
    debug!(
        configured = config.is_configured(),
        endpoint = ?config.endpoint,
        "configuration loaded"
    );
    let provider: Arc<dyn LocationProvider> = Arc::from(provider_from_config(&config)?);
    Ok(Tracker::new(provider))
}

async fn lookup(ip: String, json: bool) -> anyhow::Result<()> {
    let mut tracker = tracker_from_config()?;

    tracker.set_input(ip);
    tracker.search_and_wait().await?;

    let state = tracker.snapshot();
    if json {
        println!("{}", serde_json::to_string_pretty(&state.record)?);
    } else {
        render(&state);
    }

    Ok(())
}

async fn interactive() -> anyhow::Result<()> {
    let mut tracker = tracker_from_config()?;
    let mut rx = tracker.subscribe();

    loop {
        let input = match Text::new("Enter IP address").prompt() {
            Ok(input) => input,
            Err(InquireError::OperationCanceled | InquireError::OperationInterrupted) => break,
            Err(err) => return Err(err).context("Failed to read input"),
        };
        if input.trim().is_empty() {
            continue;
        }

        tracker.set_input(input);
        tracker.search();

        let state = rx.wait_for(|s| !s.is_requesting()).await?.clone();
        report(&state);
        println!();
    }

    tracker.dismiss();
    Ok(())
}

/// Log a failed lookup, then render whatever is on screen.
fn report(state: &ViewState) {
    if let Some(message) = state.error_message() {
        warn!(%message, "lookup failed");
    }
    render(state);
}

fn render(state: &ViewState) {
    if let Some(message) = state.error_message() {
        eprintln!("Error: {message}");
    }

    let lines = state.details_lines();
    if lines.is_empty() {
        return;
    }
    for line in lines {
        println!("{line}");
    }

    if let Some(tz) = state.record.time_zone.fixed_offset() {
        let local = Utc::now().with_timezone(&tz);
        println!("Local time: {}", local.format("%Y-%m-%d %H:%M %:z"));
    }
    if !state.record.zipcode.is_empty() {
        println!("Postal code: {}", state.record.zipcode);
    }

    let focus = state.focus;
    println!(
        "Map: centered on {:.4}, {:.4} (span {}° x {}°)",
        focus.center.lat, focus.center.lng, focus.span.lat_delta, focus.span.lng_delta
    );
    for marker in &state.markers {
        println!(
            "Marker {}: {:.4}, {:.4}",
            marker.id, marker.coordinate.lat, marker.coordinate.lng
        );
    }
}
