//! Period-range report aggregation over quarterly statistics.
//!
//! Raw per-entity time series are fetched from an in-process DuckDB store
//! for an arbitrary year/quarter range, folded in one ordered pass into
//! entity breakdowns with yearly and aggregate totals, and shaped into
//! chart-ready JSON payloads.
//!
//! # Quick start
//!
//! ```no_run
//! use statdb_reports::{
//!     CancellationToken, CompanyProductionParams, EntitySelection, RandomColors, StatDb,
//! };
//!
//! # async fn example() -> statdb_reports::Result<()> {
//! let db = StatDb::builder()
//!     .database("statdb.duckdb")
//!     .max_concurrent_fetches(8)
//!     .build()?;
//!
//! let params = CompanyProductionParams {
//!     company: 2,
//!     products: EntitySelection::All,
//!     ..Default::default()
//! };
//! let chart = db
//!     .reports()
//!     .company_production(&params, &mut RandomColors::new(), &CancellationToken::new())
//!     .await?;
//! println!("{}", serde_json::to_string(&chart)?);
//! # Ok(())
//! # }
//! ```

pub mod aggregate;
pub mod config;
pub mod connection;
pub mod error;
pub mod fetch;
pub mod models;
pub mod period;
pub mod presentation;
pub mod reports;
pub mod selection;
pub mod sql_builder;
pub mod store;

pub use aggregate::{aggregate, aggregate_totals, ensure_sorted, period_totals, Aggregation};
pub use config::{Dataset, EntityKind};
pub use connection::Connection;
pub use error::{ErrorClass, ReportError, Result};
pub use fetch::FetchOrchestrator;
pub use models::{
    Amount, AmountKind, ChartPayload, CompanySeries, CountryQuarterly, EntityBreakdown,
    NamedSeries, PayloadBody, PeriodTotals, ProductCountryBreakdown, ProductSeries,
    QuarterlyPoint, RawRow, Rgb, SeriesPoint, YearlyTotals,
};
pub use period::{
    period_options, DataBounds, Period, PeriodOption, PeriodPredicate, PeriodPredicateCase,
    PeriodRange, Quarter, RangeRequest,
};
pub use presentation::{
    chart_height, chart_width, nested_breakdowns, present, ChartShape, ColorSource, Palette,
    RandomColors,
};
pub use reports::{
    CatalogQuery, CompanyFinancials, CompanyProductionParams, FinancialBreakdown,
    FinancialBreakdownParams, FinancialSummaryParams, FinancialTotals, OlefinsParams,
    OlefinsProduct, OlefinsReport, OlefinsSummary, PickOption, PolishChemicalParams,
    PolishChemicalReport, PolishProduct, ProductByCompanyParams, ProductTrendParams,
    ReportQuery, RussiaCompanySales, RussiaDomesticParams, RussiaDomesticReport,
    RussiaProductSales, TradeCountry, TradeParams, TradeProduct, TradeProductBreakdown,
    TradeReport, TradeSummary,
};
pub use selection::{EntityId, EntitySelection};
pub use sql_builder::{SqlBuilder, SqlParam};
pub use store::{CompanyDescription, EntityLabel, Grouping, RowSource, SeriesQuery, StatStore};
pub use tokio_util::sync::CancellationToken;

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::info;

use crate::config::{DEFAULT_FETCH_RETRIES, DEFAULT_MAX_CONCURRENT_FETCHES};

// ---------------------------------------------------------------------------
// StatDbBuilder
// ---------------------------------------------------------------------------

/// Builder for configuring and constructing a [`StatDb`] instance.
pub struct StatDbBuilder {
    database: Option<PathBuf>,
    max_concurrent_fetches: usize,
    fetch_retries: u32,
}

impl Default for StatDbBuilder {
    fn default() -> Self {
        Self {
            database: None,
            max_concurrent_fetches: DEFAULT_MAX_CONCURRENT_FETCHES,
            fetch_retries: DEFAULT_FETCH_RETRIES,
        }
    }
}

impl StatDbBuilder {
    /// Use a DuckDB database file. Without one, an empty in-memory database
    /// is opened.
    pub fn database<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.database = Some(path.as_ref().to_path_buf());
        self
    }

    /// Upper bound on series fetches in flight per report. Defaults to 4.
    pub fn max_concurrent_fetches(mut self, n: usize) -> Self {
        self.max_concurrent_fetches = n;
        self
    }

    /// Extra attempts for a fetch that fails in the store. Defaults to 0.
    pub fn fetch_retries(mut self, n: u32) -> Self {
        self.fetch_retries = n;
        self
    }

    pub fn build(self) -> Result<StatDb> {
        let conn = match &self.database {
            Some(path) => Connection::open(path)?,
            None => Connection::open_in_memory()?,
        };
        let store: Arc<dyn RowSource> = Arc::new(StatStore::new(conn.try_clone()?));
        let fetcher = FetchOrchestrator::new(store)
            .max_concurrency(self.max_concurrent_fetches)
            .retries(self.fetch_retries);
        info!(
            database = ?self.database,
            max_concurrent_fetches = self.max_concurrent_fetches,
            fetch_retries = self.fetch_retries,
            "statdb opened"
        );
        Ok(StatDb {
            conn,
            fetcher,
            database: self.database,
        })
    }
}

// ---------------------------------------------------------------------------
// StatDb
// ---------------------------------------------------------------------------

/// The main entry point: a DuckDB-backed statistics database with report and
/// catalog interfaces as lightweight borrowing wrappers.
pub struct StatDb {
    conn: Connection,
    fetcher: FetchOrchestrator,
    database: Option<PathBuf>,
}

impl StatDb {
    pub fn builder() -> StatDbBuilder {
        StatDbBuilder::default()
    }

    /// Access the report interface.
    pub fn reports(&self) -> ReportQuery<'_> {
        ReportQuery::new(&self.fetcher)
    }

    /// Access the pick-list interface.
    pub fn catalog(&self) -> CatalogQuery<'_> {
        CatalogQuery::new(self.fetcher.source().as_ref())
    }

    /// The fetch orchestrator shared by all reports.
    pub fn fetcher(&self) -> &FetchOrchestrator {
        &self.fetcher
    }

    /// Load a newline-delimited JSON file into a table, replacing any table of
    /// the same name.
    pub fn load_ndjson(&self, table: &str, path: &str) -> Result<()> {
        self.conn.register_table_from_ndjson(table, path)
    }

    /// Execute a raw SQL query with `?` placeholders.
    pub fn sql(
        &self,
        query: &str,
        params: &[SqlParam],
    ) -> Result<Vec<HashMap<String, serde_json::Value>>> {
        self.conn.execute(query, params)
    }

    /// Return a reference to the underlying [`Connection`] for advanced usage.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}

impl fmt::Display for StatDb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let database = self
            .database
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| ":memory:".to_string());
        write!(f, "StatDb(database={})", database)
    }
}
