//! Report flavors built on the fetch, aggregate and present pipeline.
//!
//! Every report resolves its entity selection and period range, fans the
//! series queries out through the [`FetchOrchestrator`], folds the rows with
//! [`aggregate`] and shapes the result. Store and engine failures are logged
//! and wrapped in [`ReportError::ReportFailed`]; validation errors and
//! cancellation reach the caller unchanged.

mod catalog;
mod charts;
mod financial;
mod olefins;
mod polish;
mod russia;
mod trade;

pub use catalog::{CatalogQuery, PickOption};
pub use charts::{CompanyProductionParams, ProductByCompanyParams, ProductTrendParams};
pub use financial::{
    CompanyFinancials, FinancialBreakdown, FinancialBreakdownParams, FinancialSummaryParams,
    FinancialTotals,
};
pub use olefins::{OlefinsParams, OlefinsProduct, OlefinsReport, OlefinsSummary};
pub use polish::{PolishChemicalParams, PolishChemicalReport, PolishProduct};
pub use russia::{
    RussiaCompanySales, RussiaDomesticParams, RussiaDomesticReport, RussiaProductSales,
};
pub use trade::{
    TradeCountry, TradeParams, TradeProduct, TradeProductBreakdown, TradeReport, TradeSummary,
};

use std::collections::HashSet;

use tokio_util::sync::CancellationToken;
use tracing::error;

use crate::aggregate::{aggregate, Aggregation};
use crate::config::{Dataset, EntityKind};
use crate::error::{ErrorClass, ReportError, Result};
use crate::fetch::FetchOrchestrator;
use crate::models::AmountKind;
use crate::period::{PeriodRange, RangeRequest};
use crate::selection::{EntityId, EntitySelection};
use crate::store::{EntityLabel, SeriesQuery};

/// Report interface bound to a fetch orchestrator.
pub struct ReportQuery<'a> {
    fetcher: &'a FetchOrchestrator,
}

impl<'a> ReportQuery<'a> {
    pub fn new(fetcher: &'a FetchOrchestrator) -> Self {
        Self { fetcher }
    }

    async fn selected(
        &self,
        kind: EntityKind,
        selection: &EntitySelection,
        authorized: Option<&HashSet<EntityId>>,
        cancel: &CancellationToken,
    ) -> Result<Vec<EntityId>> {
        let universe = if selection.is_all() {
            self.fetcher
                .run(move |source| source.entity_ids(kind), cancel)
                .await?
        } else {
            Vec::new()
        };
        selection.resolve(&universe, authorized)
    }

    async fn range(
        &self,
        dataset: Dataset,
        requested: &RangeRequest,
        cancel: &CancellationToken,
    ) -> Result<PeriodRange> {
        let bounds = self
            .fetcher
            .run(move |source| source.min_max_period(dataset), cancel)
            .await?;
        PeriodRange::resolve(requested, &bounds)
    }

    async fn label(
        &self,
        kind: EntityKind,
        id: EntityId,
        cancel: &CancellationToken,
    ) -> Result<EntityLabel> {
        self.labels(kind, vec![id], cancel)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| ReportError::NotFound(format!("{} {}", kind.name(), id)))
    }

    /// Labels for `ids`, ordered by name. Unknown ids are skipped.
    async fn labels(
        &self,
        kind: EntityKind,
        ids: Vec<EntityId>,
        cancel: &CancellationToken,
    ) -> Result<Vec<EntityLabel>> {
        self.fetcher
            .run(move |source| source.entity_labels(kind, &ids), cancel)
            .await
    }

    async fn aggregated(
        &self,
        queries: Vec<SeriesQuery>,
        kind: AmountKind,
        cancel: &CancellationToken,
    ) -> Result<Aggregation> {
        let rows = self.fetcher.fetch_all(queries, cancel).await?;
        aggregate(&rows, kind)
    }
}

/// Wrap store and engine failures with the report name; pass the rest through.
fn report_failure(report: &'static str, e: ReportError) -> ReportError {
    match e.class() {
        ErrorClass::Upstream | ErrorClass::Internal => {
            error!(report, error = %e, "report generation failed");
            ReportError::ReportFailed {
                report,
                source: Box::new(e),
            }
        }
        ErrorClass::Validation | ErrorClass::Cancelled => e,
    }
}
