//! In-memory fetcher.
//!
//! Serves a site held in memory and records every request, which makes it the
//! fetcher of choice for embedding bundled sites and for tests.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use super::{FetchError, Fetcher};

#[derive(Debug, Clone)]
enum Entry {
    Body(Vec<u8>),
    Status(u16),
}

#[derive(Debug, Default)]
struct State {
    entries: HashMap<String, Entry>,
    requests: HashMap<String, usize>,
}

/// Fetcher backed by a map from location to body.
#[derive(Debug, Default)]
pub struct MemoryFetcher {
    state: Mutex<State>,
    latency: Option<Duration>,
}

impl MemoryFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every response, so that callers actually suspend.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Serve `body` at `location`.
    pub fn insert(&self, location: impl Into<String>, body: impl Into<Vec<u8>>) {
        let mut state = self.state.lock().expect("fetcher lock poisoned");
        state
            .entries
            .insert(location.into(), Entry::Body(body.into()));
    }

    /// Answer requests for `location` with a non-success status.
    pub fn fail(&self, location: impl Into<String>, status: u16) {
        let mut state = self.state.lock().expect("fetcher lock poisoned");
        state.entries.insert(location.into(), Entry::Status(status));
    }

    /// Stop serving `location`.
    pub fn remove(&self, location: &str) {
        let mut state = self.state.lock().expect("fetcher lock poisoned");
        state.entries.remove(location);
    }

    /// Number of requests made for `location`, successful or not.
    pub fn requests(&self, location: &str) -> usize {
        let state = self.state.lock().expect("fetcher lock poisoned");
        state.requests.get(location).copied().unwrap_or(0)
    }

    pub fn total_requests(&self) -> usize {
        let state = self.state.lock().expect("fetcher lock poisoned");
        state.requests.values().sum()
    }
}

#[async_trait]
impl Fetcher for MemoryFetcher {
    async fn fetch(&self, location: &str) -> Result<Vec<u8>, FetchError> {
        let entry = {
            let mut state = self.state.lock().expect("fetcher lock poisoned");
            *state.requests.entry(location.to_string()).or_default() += 1;
            state.entries.get(location).cloned()
        };

        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        match entry {
            Some(Entry::Body(body)) => Ok(body),
            Some(Entry::Status(404)) | None => Err(FetchError::NotFound(location.to_string())),
            Some(Entry::Status(status)) => Err(FetchError::Status {
                status,
                location: location.to_string(),
            }),
        }
    }
}
