//! In-memory fetcher for unit tests

use crate::crawler::fetcher::{FetchOptions, Fetcher};
use crate::HarvestError;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// Answers from a fixed URL → body table and counts every call
///
/// Unknown URLs fail with a 404 network error. With a latency set, every call
/// sleeps on the tokio clock and the peak number of concurrent calls is recorded.
#[derive(Default)]
pub struct ScriptedFetcher {
    responses: HashMap<String, Vec<u8>>,
    calls: Mutex<Vec<String>>,
    latency: Duration,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

impl ScriptedFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(mut self, url: &str, body: &[u8]) -> Self {
        self.responses.insert(url.to_string(), body.to_vec());
        self
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Highest number of fetches that were running at the same time
    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    /// Total number of fetches
    pub fn calls(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// Number of fetches of one URL
    pub fn calls_for(&self, url: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|u| u.as_str() == url)
            .count()
    }
}

#[async_trait]
impl Fetcher for ScriptedFetcher {
    async fn fetch(&self, url: &str, _options: &FetchOptions) -> Result<Vec<u8>, HarvestError> {
        self.calls.lock().unwrap().push(url.to_string());

        let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(running, Ordering::SeqCst);
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        self.responses
            .get(url)
            .cloned()
            .ok_or_else(|| HarvestError::Network {
                url: url.to_string(),
                status: Some(404),
                message: "HTTP 404 Not Found".to_string(),
            })
    }
}
