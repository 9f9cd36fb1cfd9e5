//! Controller for the tracker screen.
//!
//! A [`Tracker`] owns the view state and every fetch it started. Fetches run
//! on the tokio runtime inside a [`JoinSet`]; dropping the tracker (or calling
//! [`Tracker::dismiss`]) aborts whatever is still in flight.

use std::sync::Arc;

use tokio::{sync::watch, task::JoinSet};
use tracing::{debug, warn};

use crate::{
    FetchError, LocationRecord, QueryError,
    provider::{LocationProvider, parse_ip},
    state::{Applied, QueryTicket, ViewState},
};

pub struct Tracker {
    provider: Arc<dyn LocationProvider>,
    state: Arc<watch::Sender<ViewState>>,
    tasks: JoinSet<()>,
}

impl Tracker {
    pub fn new(provider: Arc<dyn LocationProvider>) -> Self {
        let (state, _) = watch::channel(ViewState::default());
        Self { provider, state: Arc::new(state), tasks: JoinSet::new() }
    }

    /// Receiver that sees every complete state transition.
    pub fn subscribe(&self) -> watch::Receiver<ViewState> {
        self.state.subscribe()
    }

    pub fn snapshot(&self) -> ViewState {
        self.state.borrow().clone()
    }

    pub fn set_input(&self, text: impl Into<String>) {
        let text = text.into();
        self.state.send_modify(|s| s.set_input(text));
    }

    /// Start a lookup for the current input in the background.
    pub fn search(&mut self) -> QueryTicket {
        self.reap();

        let (ticket, input) = self.begin();

        let provider = Arc::clone(&self.provider);
        let state = Arc::clone(&self.state);
        self.tasks.spawn(async move {
            let result = lookup(provider.as_ref(), &input).await;
            // Surfaced through the view state.
            let _ = apply(&state, ticket, result);
        });

        ticket
    }

    /// Run a lookup for the current input and wait for it to land.
    pub async fn search_and_wait(&mut self) -> Result<Applied, QueryError> {
        self.reap();

        let (ticket, input) = self.begin();

        let result = lookup(self.provider.as_ref(), &input).await;
        apply(&self.state, ticket, result)
    }

    fn begin(&self) -> (QueryTicket, String) {
        let mut ticket = QueryTicket::default();
        let mut input = String::new();
        self.state.send_modify(|s| {
            ticket = s.begin_query();
            input = s.input.clone();
        });
        debug!(seq = ticket.seq(), %input, "search issued");
        (ticket, input)
    }

    /// Number of fetches that have not been reaped yet.
    pub fn in_flight(&self) -> usize {
        self.tasks.len()
    }

    /// Wait until every background fetch has finished.
    pub async fn wait_idle(&mut self) {
        while let Some(res) = self.tasks.join_next().await {
            log_join(res);
        }
    }

    /// Abort all in-flight fetches; their results are never applied and a
    /// pending query goes back to idle.
    pub fn dismiss(&mut self) {
        if !self.tasks.is_empty() {
            debug!(count = self.tasks.len(), "aborting in-flight lookups");
        }
        self.tasks.abort_all();
        self.reap();
        self.state.send_if_modified(ViewState::cancel_query);
    }

    fn reap(&mut self) {
        while let Some(res) = self.tasks.try_join_next() {
            log_join(res);
        }
    }
}

impl Drop for Tracker {
    fn drop(&mut self) {
        self.tasks.abort_all();
    }
}

async fn lookup(provider: &dyn LocationProvider, input: &str) -> Result<LocationRecord, FetchError> {
    let ip = parse_ip(input)?;
    provider.fetch_location(&ip.to_string()).await
}

fn apply(
    state: &watch::Sender<ViewState>,
    ticket: QueryTicket,
    result: Result<LocationRecord, FetchError>,
) -> Result<Applied, QueryError> {
    match result {
        Ok(record) => {
            let mut outcome = Ok(Applied::Stale);
            state.send_if_modified(|s| {
                outcome = s.on_query_success(ticket, record);
                outcome != Ok(Applied::Stale)
            });
            Ok(outcome?)
        }
        Err(err) => {
            let mut applied = Applied::Stale;
            state.send_if_modified(|s| {
                applied = s.on_query_failure(ticket, &err);
                applied == Applied::Updated
            });
            match applied {
                Applied::Stale => Ok(Applied::Stale),
                Applied::Updated => Err(err.into()),
            }
        }
    }
}

fn log_join(res: Result<(), tokio::task::JoinError>) {
    match res {
        Err(err) if err.is_panic() => warn!(error = %err, "lookup task panicked"),
        _ => {}
    }
}
