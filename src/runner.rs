//! Catalog runner: the single entry point for executing a named query.
//!
//! Each run is a straight pipeline (lookup, bind, execute) and the first
//! failing stage ends it. Nothing is retried unless the caller passes an
//! explicit [`RetryPolicy`].

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::adapter::ExecutionAdapter;
use crate::binder::{ParameterBinder, ParameterBinding};
use crate::catalog::TemplateStore;
use crate::db::ResultSet;
use crate::error::Result;

/// Opt-in retry settings for backend failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first. Always at least 1.
    pub max_attempts: u32,
    /// Delay before the second attempt; doubles after each failure.
    pub base_delay: Duration,
}

impl RetryPolicy {
    /// Creates a policy. `max_attempts` below 1 is raised to 1.
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
        }
    }

    /// Delay to wait after the given failed attempt (1-based).
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.base_delay.saturating_mul(factor)
    }
}

/// Runs catalog templates against one backend.
pub struct CatalogRunner {
    store: Arc<TemplateStore>,
    binder: ParameterBinder,
    adapter: ExecutionAdapter,
}

impl CatalogRunner {
    /// Creates a runner. The binder follows the adapter's marker style.
    pub fn new(store: Arc<TemplateStore>, adapter: ExecutionAdapter) -> Self {
        let binder = ParameterBinder::new(adapter.placeholder_style());
        Self {
            store,
            binder,
            adapter,
        }
    }

    /// The shared template store.
    pub fn store(&self) -> &TemplateStore {
        &self.store
    }

    /// Looks up `template_name`, binds `values`, and executes within `timeout`.
    pub async fn run(
        &self,
        template_name: &str,
        values: &ParameterBinding,
        timeout: Duration,
    ) -> Result<ResultSet> {
        let start = Instant::now();

        let template = self.store.get(template_name)?;
        debug!(template = template_name, "Template found");

        let bound = self.binder.bind(template, values)?;
        let result = self.adapter.execute(&bound, timeout).await?;

        info!(
            template = template_name,
            rows = result.row_count(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Catalog query completed"
        );
        Ok(result)
    }

    /// Like [`run`](Self::run), retrying backend failures per `policy`.
    ///
    /// Lookup and binding errors are returned at once; they cannot succeed
    /// on a later attempt.
    pub async fn run_with_retry(
        &self,
        template_name: &str,
        values: &ParameterBinding,
        timeout: Duration,
        policy: &RetryPolicy,
    ) -> Result<ResultSet> {
        let mut attempt = 1;
        loop {
            match self.run(template_name, values, timeout).await {
                Ok(result) => return Ok(result),
                Err(e) if e.is_backend() && attempt < policy.max_attempts => {
                    let delay = policy.delay_after(attempt);
                    warn!(
                        "Attempt {} of {} for '{}' failed: {}; retrying in {:?}",
                        attempt, policy.max_attempts, template_name, e, delay
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Closes the backend connection.
    pub async fn close(&self) -> Result<()> {
        self.adapter.close().await
    }
}
