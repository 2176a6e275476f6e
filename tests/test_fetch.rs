//! Fetch orchestration tests: bounded concurrency, ordering, cancellation
//! and retries, against in-memory row sources.

mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use common::{period, row};
use statdb_reports::{
    CancellationToken, DataBounds, Dataset, EntityId, EntityKind, EntityLabel, FetchOrchestrator,
    Grouping, PeriodRange, RawRow, ReportError, Result, RowSource, SeriesQuery,
};

/// Answers each single-product query with two rows after a delay that is
/// longest for the lowest id, so completion order is the reverse of
/// submission order.
#[derive(Default)]
struct SlowSource {
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    calls: AtomicUsize,
}

impl SlowSource {
    fn product_id(query: &SeriesQuery) -> EntityId {
        query
            .filters
            .iter()
            .find(|(kind, _)| *kind == EntityKind::Product)
            .and_then(|(_, ids)| ids.first().copied())
            .unwrap_or(0)
    }
}

impl RowSource for SlowSource {
    fn fetch_rows(&self, query: &SeriesQuery) -> Result<Vec<RawRow>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        let id = Self::product_id(query);
        thread::sleep(Duration::from_millis(10 * (6 - id.min(5)) as u64));
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        let name = format!("product-{id}");
        Ok(vec![
            row(&name, 2022, 1, Some(id as f64)),
            row(&name, 2022, 2, Some(id as f64 * 2.0)),
        ])
    }

    fn min_max_period(&self, _dataset: Dataset) -> Result<DataBounds> {
        Ok(DataBounds {
            min: period(2022, 1),
            max: period(2022, 4),
        })
    }

    fn entity_ids(&self, _kind: EntityKind) -> Result<Vec<EntityId>> {
        Ok(vec![1, 2, 3, 4, 5])
    }

    fn entity_labels(&self, _kind: EntityKind, ids: &[EntityId]) -> Result<Vec<EntityLabel>> {
        Ok(ids
            .iter()
            .map(|id| EntityLabel {
                id: *id,
                name: format!("product-{id}"),
                location: None,
            })
            .collect())
    }
}

/// Fails the first `failures` calls with the given error kind, then succeeds.
struct FlakySource {
    failures: usize,
    upstream: bool,
    calls: AtomicUsize,
}

impl RowSource for FlakySource {
    fn fetch_rows(&self, _query: &SeriesQuery) -> Result<Vec<RawRow>> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if call < self.failures {
            return Err(if self.upstream {
                ReportError::Io(std::io::Error::new(std::io::ErrorKind::Other, "store down"))
            } else {
                ReportError::InvalidArgument("bad query".to_string())
            });
        }
        Ok(vec![row("ok", 2022, 1, Some(1.0))])
    }

    fn min_max_period(&self, _dataset: Dataset) -> Result<DataBounds> {
        Err(ReportError::NotFound("unused".to_string()))
    }

    fn entity_ids(&self, _kind: EntityKind) -> Result<Vec<EntityId>> {
        Ok(Vec::new())
    }

    fn entity_labels(&self, _kind: EntityKind, _ids: &[EntityId]) -> Result<Vec<EntityLabel>> {
        Ok(Vec::new())
    }
}

fn per_product_query(ids: Vec<EntityId>) -> SeriesQuery {
    SeriesQuery::new(
        Dataset::Production,
        Grouping::ByEntity(EntityKind::Product),
        PeriodRange::new(period(2022, 1), period(2022, 4)).unwrap(),
    )
    .filter(EntityKind::Product, ids)
}

// ---------------------------------------------------------------------------
// Fan-out
// ---------------------------------------------------------------------------

#[tokio::test]
async fn fetch_all_respects_concurrency_limit() {
    let source = Arc::new(SlowSource::default());
    let fetcher = FetchOrchestrator::new(source.clone()).max_concurrency(2);

    let rows = fetcher
        .fetch_all(vec![per_product_query(vec![1, 2, 3, 4, 5])], &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(source.calls.load(Ordering::SeqCst), 5);
    assert!(source.max_in_flight.load(Ordering::SeqCst) <= 2);
    assert_eq!(rows.len(), 10);
}

#[tokio::test]
async fn fetch_all_output_is_sorted_regardless_of_completion_order() {
    let source = Arc::new(SlowSource::default());
    let fetcher = FetchOrchestrator::new(source).max_concurrency(5);

    let rows = fetcher
        .fetch_all(vec![per_product_query(vec![5, 3, 1, 4, 2])], &CancellationToken::new())
        .await
        .unwrap();

    let names: Vec<&str> = rows.iter().map(|r| r.entity_name.as_str()).collect();
    assert_eq!(
        names,
        vec![
            "product-1", "product-1", "product-2", "product-2", "product-3", "product-3",
            "product-4", "product-4", "product-5", "product-5",
        ]
    );
    assert!(statdb_reports::ensure_sorted(&rows).is_ok());
}

#[tokio::test]
async fn duplicate_ids_are_fetched_once() {
    let source = Arc::new(SlowSource::default());
    let fetcher = FetchOrchestrator::new(source.clone());

    let rows = fetcher
        .fetch_all(vec![per_product_query(vec![2, 2, 2])], &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(source.calls.load(Ordering::SeqCst), 1);
    assert_eq!(rows.len(), 2);
}

#[tokio::test]
async fn store_calls_run_on_the_blocking_pool() {
    let fetcher = FetchOrchestrator::new(Arc::new(SlowSource::default()));
    let ids = fetcher
        .run(
            |source| source.entity_ids(EntityKind::Product),
            &CancellationToken::new(),
        )
        .await
        .unwrap();
    assert_eq!(ids, vec![1, 2, 3, 4, 5]);
}

// ---------------------------------------------------------------------------
// Cancellation
// ---------------------------------------------------------------------------

#[tokio::test]
async fn cancelled_before_start_runs_nothing() {
    let source = Arc::new(SlowSource::default());
    let fetcher = FetchOrchestrator::new(source.clone());
    let cancel = CancellationToken::new();
    cancel.cancel();

    let result = fetcher.fetch_all(vec![per_product_query(vec![1, 2])], &cancel).await;
    assert!(matches!(result, Err(ReportError::Cancelled)));
    assert_eq!(source.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn cancelled_lookup_never_reaches_the_store() {
    let fetcher = FetchOrchestrator::new(Arc::new(SlowSource::default()));
    let cancel = CancellationToken::new();
    cancel.cancel();

    let calls = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&calls);
    let result = fetcher
        .run(
            move |source| {
                seen.fetch_add(1, Ordering::SeqCst);
                source.entity_ids(EntityKind::Company)
            },
            &cancel,
        )
        .await;
    assert!(matches!(result, Err(ReportError::Cancelled)));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn slow_lookup_stops_waiting_once_cancelled() {
    let fetcher = FetchOrchestrator::new(Arc::new(SlowSource::default()));
    let cancel = CancellationToken::new();

    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(10)).await;
        trigger.cancel();
    });

    let started = std::time::Instant::now();
    let result = fetcher
        .run(
            |source| {
                thread::sleep(Duration::from_millis(300));
                source.entity_ids(EntityKind::Product)
            },
            &cancel,
        )
        .await;
    assert!(matches!(result, Err(ReportError::Cancelled)));
    assert!(started.elapsed() < Duration::from_millis(300));
}

#[tokio::test]
async fn cancellation_mid_flight_returns_cancelled_and_skips_queued_work() {
    let source = Arc::new(SlowSource::default());
    let fetcher = FetchOrchestrator::new(source.clone()).max_concurrency(1);
    let cancel = CancellationToken::new();

    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(15)).await;
        trigger.cancel();
    });

    let result = fetcher
        .fetch_all(vec![per_product_query(vec![1, 2, 3, 4, 5])], &cancel)
        .await;
    assert!(matches!(result, Err(ReportError::Cancelled)));
    assert!(source.calls.load(Ordering::SeqCst) < 5);
}

// ---------------------------------------------------------------------------
// Errors and retries
// ---------------------------------------------------------------------------

#[tokio::test]
async fn upstream_failures_are_retried_when_configured() {
    let source = Arc::new(FlakySource {
        failures: 2,
        upstream: true,
        calls: AtomicUsize::new(0),
    });
    let fetcher = FetchOrchestrator::new(source.clone()).retries(2);

    let rows = fetcher
        .fetch_all(vec![per_product_query(vec![1])], &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(source.calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn upstream_failure_without_retries_propagates() {
    let source = Arc::new(FlakySource {
        failures: 1,
        upstream: true,
        calls: AtomicUsize::new(0),
    });
    let fetcher = FetchOrchestrator::new(source.clone());

    let result = fetcher
        .fetch_all(vec![per_product_query(vec![1])], &CancellationToken::new())
        .await;
    assert!(matches!(result, Err(ReportError::Io(_))));
    assert_eq!(source.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn validation_failures_are_never_retried() {
    let source = Arc::new(FlakySource {
        failures: 1,
        upstream: false,
        calls: AtomicUsize::new(0),
    });
    let fetcher = FetchOrchestrator::new(source.clone()).retries(3);

    let result = fetcher
        .fetch_all(vec![per_product_query(vec![1])], &CancellationToken::new())
        .await;
    assert!(matches!(result, Err(ReportError::InvalidArgument(_))));
    assert_eq!(source.calls.load(Ordering::SeqCst), 1);
}
