//! Olefins and polyolefins production report.

use std::collections::HashSet;

use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument};

use super::{report_failure, ReportQuery};
use crate::config::{Dataset, EntityKind};
use crate::error::Result;
use crate::models::{
    quarterly_points, serialize_totals, AmountKind, EntityBreakdown, ProductCountryBreakdown,
    QuarterlyPoint, YearlyTotals,
};
use crate::period::RangeRequest;
use crate::presentation::nested_breakdowns;
use crate::selection::{EntityId, EntitySelection};
use crate::store::{Grouping, SeriesQuery};

const TITLE: &str = "Central European Olefins & Polyolefin Production Report";

#[derive(Debug, Clone, Default)]
pub struct OlefinsParams {
    pub products: EntitySelection,
    pub authorized_products: Option<HashSet<EntityId>>,
    pub range: RangeRequest,
    /// Also break each product down by country.
    pub include_countries: bool,
}

/// Quarterly production of one product across all countries.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OlefinsProduct {
    pub product_name: String,
    pub quarterly_data: Vec<QuarterlyPoint>,
    #[serde(serialize_with = "serialize_totals")]
    pub yearly_totals: YearlyTotals,
}

impl From<EntityBreakdown> for OlefinsProduct {
    fn from(breakdown: EntityBreakdown) -> Self {
        Self {
            quarterly_data: quarterly_points(&breakdown.points),
            product_name: breakdown.name,
            yearly_totals: breakdown.yearly_totals,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OlefinsSummary {
    pub products: Vec<OlefinsProduct>,
    #[serde(serialize_with = "serialize_totals")]
    pub aggregate_tonnage: YearlyTotals,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OlefinsReport {
    pub title: String,
    pub period: String,
    pub summary: OlefinsSummary,
    /// Product to country breakdown, when requested. Only positive amounts
    /// are included.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country_breakdowns: Option<Vec<ProductCountryBreakdown>>,
}

impl<'a> ReportQuery<'a> {
    #[instrument(skip_all, fields(include_countries = params.include_countries))]
    pub async fn olefins_polyolefins(
        &self,
        params: &OlefinsParams,
        cancel: &CancellationToken,
    ) -> Result<OlefinsReport> {
        self.build_olefins(params, cancel)
            .await
            .map_err(|e| report_failure("olefins_polyolefins", e))
    }

    async fn build_olefins(
        &self,
        params: &OlefinsParams,
        cancel: &CancellationToken,
    ) -> Result<OlefinsReport> {
        let products = self
            .selected(
                EntityKind::Product,
                &params.products,
                params.authorized_products.as_ref(),
                cancel,
            )
            .await?;
        let range = self
            .range(Dataset::OlefinsPolyolefins, &params.range, cancel)
            .await?;

        let by_product = SeriesQuery::new(
            Dataset::OlefinsPolyolefins,
            Grouping::ByEntity(EntityKind::Product),
            range,
        )
        .filter(EntityKind::Product, products);

        let summary = self
            .aggregated(vec![by_product.clone()], AmountKind::Hundredths, cancel)
            .await?;

        let country_breakdowns = if params.include_countries {
            let by_country = by_product
                .with_sub_entity(EntityKind::Country)
                .positive_only();
            let nested = self
                .aggregated(vec![by_country], AmountKind::Hundredths, cancel)
                .await?;
            Some(nested_breakdowns(&nested.breakdowns))
        } else {
            None
        };

        info!(
            products = summary.breakdowns.len(),
            period = %range.describe(),
            "olefins report generated"
        );
        Ok(OlefinsReport {
            title: TITLE.to_string(),
            period: range.describe(),
            summary: OlefinsSummary {
                products: summary
                    .breakdowns
                    .into_iter()
                    .map(OlefinsProduct::from)
                    .collect(),
                aggregate_tonnage: summary.aggregate_totals,
            },
            country_breakdowns,
        })
    }
}
