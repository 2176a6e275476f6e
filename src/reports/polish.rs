//! Polish chemical production report.

use std::collections::HashSet;

use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument};

use super::{report_failure, ReportQuery};
use crate::aggregate::period_totals;
use crate::config::{Dataset, EntityKind};
use crate::error::Result;
use crate::models::{
    serialize_period_totals, serialize_totals, AmountKind, EntityBreakdown, PeriodTotals,
    SeriesPoint, YearlyTotals,
};
use crate::period::RangeRequest;
use crate::selection::{EntityId, EntitySelection};
use crate::store::{Grouping, SeriesQuery};

const TITLE: &str = "Polish Chemical Production Report";

#[derive(Debug, Clone, Default)]
pub struct PolishChemicalParams {
    pub products: EntitySelection,
    pub authorized_products: Option<HashSet<EntityId>>,
    pub range: RangeRequest,
}

/// One product's quarterly production, points labelled `"YYYY/Qn"`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PolishProduct {
    pub product_name: String,
    pub data: Vec<SeriesPoint>,
    #[serde(serialize_with = "serialize_totals")]
    pub yearly_totals: YearlyTotals,
}

impl From<EntityBreakdown> for PolishProduct {
    fn from(breakdown: EntityBreakdown) -> Self {
        Self {
            product_name: breakdown.name,
            data: breakdown
                .points
                .into_iter()
                .map(SeriesPoint::with_full_label)
                .collect(),
            yearly_totals: breakdown.yearly_totals,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PolishChemicalReport {
    pub title: String,
    pub from_period: String,
    pub to_period: String,
    pub products: Vec<PolishProduct>,
    /// Sum over all products per period.
    #[serde(serialize_with = "serialize_period_totals")]
    pub totals: PeriodTotals,
}

impl<'a> ReportQuery<'a> {
    /// Quarterly production per selected product, with per-period totals.
    #[instrument(skip_all)]
    pub async fn polish_chemical(
        &self,
        params: &PolishChemicalParams,
        cancel: &CancellationToken,
    ) -> Result<PolishChemicalReport> {
        self.build_polish_chemical(params, cancel)
            .await
            .map_err(|e| report_failure("polish_chemical", e))
    }

    async fn build_polish_chemical(
        &self,
        params: &PolishChemicalParams,
        cancel: &CancellationToken,
    ) -> Result<PolishChemicalReport> {
        let products = self
            .selected(
                EntityKind::Product,
                &params.products,
                params.authorized_products.as_ref(),
                cancel,
            )
            .await?;
        let range = self
            .range(Dataset::PolishChemical, &params.range, cancel)
            .await?;

        let query = SeriesQuery::new(
            Dataset::PolishChemical,
            Grouping::ByEntity(EntityKind::Product),
            range,
        )
        .filter(EntityKind::Product, products);
        let aggregation = self.aggregated(vec![query], AmountKind::Exact, cancel).await?;
        let totals = period_totals(&aggregation.breakdowns, AmountKind::Exact);

        info!(
            products = aggregation.breakdowns.len(),
            period = %range.describe(),
            "polish chemical report generated"
        );
        Ok(PolishChemicalReport {
            title: TITLE.to_string(),
            from_period: range.from().heading(),
            to_period: range.to().heading(),
            products: aggregation
                .breakdowns
                .into_iter()
                .map(PolishProduct::from)
                .collect(),
            totals,
        })
    }
}
