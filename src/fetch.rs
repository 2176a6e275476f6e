//! Bounded-concurrency fan-out of series queries.
//!
//! Each query runs on the blocking thread pool via
//! [`tokio::task::spawn_blocking`], at most `max_concurrency` at a time. The
//! results are stitched back together by submission index and then stably
//! sorted into aggregator order, so the output never depends on which fetch
//! finished first.

use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::config::{DEFAULT_FETCH_RETRIES, DEFAULT_MAX_CONCURRENT_FETCHES};
use crate::error::{ErrorClass, ReportError, Result};
use crate::models::{sort_rows, RawRow};
use crate::store::{RowSource, SeriesQuery};

/// Runs series queries against a [`RowSource`] concurrently.
#[derive(Clone)]
pub struct FetchOrchestrator {
    source: Arc<dyn RowSource>,
    max_concurrency: usize,
    retries: u32,
}

impl FetchOrchestrator {
    pub fn new(source: Arc<dyn RowSource>) -> Self {
        Self {
            source,
            max_concurrency: DEFAULT_MAX_CONCURRENT_FETCHES,
            retries: DEFAULT_FETCH_RETRIES,
        }
    }

    /// Upper bound on fetches in flight. Values below 1 are treated as 1.
    pub fn max_concurrency(mut self, n: usize) -> Self {
        self.max_concurrency = n.max(1);
        self
    }

    /// Extra attempts for a query whose store call fails. Validation errors
    /// are never retried.
    pub fn retries(mut self, n: u32) -> Self {
        self.retries = n;
        self
    }

    pub fn source(&self) -> &Arc<dyn RowSource> {
        &self.source
    }

    /// Run a single store call on the blocking thread pool.
    ///
    /// Returns [`ReportError::Cancelled`] without calling `f` when `cancel`
    /// has already fired, or as soon as it fires while `f` is running.
    pub async fn run<T, F>(&self, f: F, cancel: &CancellationToken) -> Result<T>
    where
        F: FnOnce(&dyn RowSource) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        if cancel.is_cancelled() {
            return Err(ReportError::Cancelled);
        }
        let source = Arc::clone(&self.source);
        let task = tokio::task::spawn_blocking(move || f(source.as_ref()));
        tokio::select! {
            _ = cancel.cancelled() => Err(ReportError::Cancelled),
            joined = task => joined
                .map_err(|e| ReportError::Task(format!("store task join error: {e}")))?,
        }
    }

    /// Fetch every query and return all rows sorted for aggregation.
    ///
    /// Queries grouped by entity are split into one fetch per entity id
    /// first. The first failing fetch aborts the rest. When `cancel` fires,
    /// outstanding fetches are abandoned, queued ones never start, and the
    /// call returns [`ReportError::Cancelled`].
    pub async fn fetch_all(
        &self,
        queries: Vec<SeriesQuery>,
        cancel: &CancellationToken,
    ) -> Result<Vec<RawRow>> {
        if cancel.is_cancelled() {
            return Err(ReportError::Cancelled);
        }

        let queries: Vec<SeriesQuery> = queries
            .iter()
            .flat_map(SeriesQuery::split_per_entity)
            .collect();
        let total = queries.len();
        debug!(
            fetches = total,
            max_concurrency = self.max_concurrency,
            "dispatching fetches"
        );

        let semaphore = Arc::new(Semaphore::new(self.max_concurrency));
        let mut tasks = JoinSet::new();
        for (index, query) in queries.into_iter().enumerate() {
            let source = Arc::clone(&self.source);
            let semaphore = Arc::clone(&semaphore);
            let cancel = cancel.clone();
            let retries = self.retries;

            tasks.spawn(async move {
                let permit = tokio::select! {
                    _ = cancel.cancelled() => None,
                    permit = semaphore.acquire_owned() => permit.ok(),
                };
                let Some(_permit) = permit else {
                    return (index, Err(ReportError::Cancelled));
                };
                (index, fetch_one(source, query, retries, &cancel).await)
            });
        }

        let mut slots: Vec<Option<Vec<RawRow>>> = vec![None; total];
        loop {
            let joined = tokio::select! {
                _ = cancel.cancelled() => {
                    tasks.abort_all();
                    debug!("fetches cancelled");
                    return Err(ReportError::Cancelled);
                }
                joined = tasks.join_next() => joined,
            };
            let Some(joined) = joined else { break };

            let (index, result) =
                joined.map_err(|e| ReportError::Task(format!("fetch task join error: {e}")))?;
            match result {
                Ok(rows) => slots[index] = Some(rows),
                Err(e) => {
                    tasks.abort_all();
                    return Err(e);
                }
            }
        }

        let mut rows: Vec<RawRow> = slots.into_iter().flatten().flatten().collect();
        sort_rows(&mut rows);
        debug!(fetches = total, rows = rows.len(), "fetches merged");
        Ok(rows)
    }
}

async fn fetch_one(
    source: Arc<dyn RowSource>,
    query: SeriesQuery,
    retries: u32,
    cancel: &CancellationToken,
) -> Result<Vec<RawRow>> {
    let query = Arc::new(query);
    let mut attempt = 0;
    loop {
        if cancel.is_cancelled() {
            return Err(ReportError::Cancelled);
        }

        let (source, task_query) = (Arc::clone(&source), Arc::clone(&query));
        let result = tokio::task::spawn_blocking(move || source.fetch_rows(&task_query))
            .await
            .map_err(|e| ReportError::Task(format!("fetch task join error: {e}")))?;

        match result {
            Err(e) if e.class() == ErrorClass::Upstream && attempt < retries => {
                attempt += 1;
                warn!(
                    dataset = query.dataset.name(),
                    attempt,
                    error = %e,
                    "fetch failed, retrying"
                );
            }
            other => return other,
        }
    }
}
