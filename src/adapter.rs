//! Execution adapter.
//!
//! Sends a [`BoundQuery`] to the backend it owns, enforces the caller's
//! deadline, and normalizes the rows into a [`ResultSet`].

use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::binder::BoundQuery;
use crate::db::{DatabaseClient, PlaceholderStyle, ResultSet};
use crate::error::{CatalogError, Result};

/// Default cap on materialized rows.
pub const DEFAULT_MAX_ROWS: usize = 10_000;

/// Executes bound queries against one backend client.
pub struct ExecutionAdapter {
    client: Box<dyn DatabaseClient>,
    max_rows: usize,
}

impl ExecutionAdapter {
    /// Wraps a client with the default row cap.
    pub fn new(client: Box<dyn DatabaseClient>) -> Self {
        Self {
            client,
            max_rows: DEFAULT_MAX_ROWS,
        }
    }

    /// Sets the maximum number of rows kept from a result.
    pub fn with_max_rows(mut self, max_rows: usize) -> Self {
        self.max_rows = max_rows;
        self
    }

    /// Marker style of the underlying backend.
    pub fn placeholder_style(&self) -> PlaceholderStyle {
        self.client.placeholder_style()
    }

    /// Runs `query`, giving up after `timeout`.
    ///
    /// On timeout the backend future is dropped, which abandons the
    /// in-flight call, and [`CatalogError::BackendTimeout`] is returned.
    pub async fn execute(&self, query: &BoundQuery, timeout: Duration) -> Result<ResultSet> {
        let start = Instant::now();
        debug!(slots = query.values.len(), "Submitting query: {}", query.text);

        let result = tokio::time::timeout(timeout, self.client.execute_query(query))
            .await
            .map_err(|_| {
                warn!("Query abandoned after {:?}", timeout);
                CatalogError::BackendTimeout(timeout)
            })??;

        let result = result.truncate(self.max_rows);
        if let Some(warning) = result.truncation_warning() {
            warn!("{warning}");
        }

        debug!(
            rows = result.row_count(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Query finished"
        );
        Ok(result)
    }

    /// Closes the underlying client.
    pub async fn close(&self) -> Result<()> {
        self.client.close().await
    }
}
