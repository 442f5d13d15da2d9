//! Mock database client for testing.
//!
//! Returns a canned result set and records every call. Clones share the same
//! counters, so a test can keep a handle while the adapter owns another.

use super::{DatabaseClient, PlaceholderStyle, ResultSet};
use crate::binder::BoundQuery;
use crate::error::{CatalogError, Result};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Debug, Default)]
struct CallLog {
    count: AtomicUsize,
    last_query: Mutex<Option<BoundQuery>>,
}

/// A mock database client that returns predefined results.
#[derive(Debug, Clone)]
pub struct MockDatabaseClient {
    style: PlaceholderStyle,
    result: ResultSet,
    latency: Option<Duration>,
    error: Option<String>,
    /// Number of leading calls that fail before `result` is returned.
    failures_before_success: usize,
    log: Arc<CallLog>,
}

impl MockDatabaseClient {
    /// Creates a mock returning an empty result set.
    pub fn new() -> Self {
        Self {
            style: PlaceholderStyle::Dollar,
            result: ResultSet::new(),
            latency: None,
            error: None,
            failures_before_success: 0,
            log: Arc::new(CallLog::default()),
        }
    }

    /// Returns `result` from every successful call.
    pub fn with_result(mut self, result: ResultSet) -> Self {
        self.result = result;
        self
    }

    /// Uses the given marker style.
    pub fn with_style(mut self, style: PlaceholderStyle) -> Self {
        self.style = style;
        self
    }

    /// Sleeps before answering each call.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Fails every call with a backend query error carrying `message`.
    pub fn with_error(mut self, message: impl Into<String>) -> Self {
        self.error = Some(message.into());
        self.failures_before_success = usize::MAX;
        self
    }

    /// Fails the first `failures` calls with `message`, then succeeds.
    pub fn failing_first(mut self, failures: usize, message: impl Into<String>) -> Self {
        self.error = Some(message.into());
        self.failures_before_success = failures;
        self
    }

    /// Number of `execute_query` calls so far, across all clones.
    pub fn call_count(&self) -> usize {
        self.log.count.load(Ordering::SeqCst)
    }

    /// The most recent query received, if any.
    pub fn last_query(&self) -> Option<BoundQuery> {
        self.log
            .last_query
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }
}

impl Default for MockDatabaseClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DatabaseClient for MockDatabaseClient {
    fn placeholder_style(&self) -> PlaceholderStyle {
        self.style
    }

    async fn execute_query(&self, query: &BoundQuery) -> Result<ResultSet> {
        let call = self.log.count.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut last) = self.log.last_query.lock() {
            *last = Some(query.clone());
        }

        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        match &self.error {
            Some(message) if call < self.failures_before_success => {
                Err(CatalogError::query(message.clone()))
            }
            _ => Ok(self.result.clone()),
        }
    }

    async fn close(&self) -> Result<()> {
        Ok(())
    }
}
