//! Polish chemical export and import reports. Both datasets are yearly.

use std::collections::{BTreeMap, HashSet};

use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument};

use super::{report_failure, ReportQuery};
use crate::config::{Dataset, EntityKind};
use crate::error::Result;
use crate::models::{serialize_totals, Amount, AmountKind, EntityBreakdown, YearlyTotals};
use crate::period::RangeRequest;
use crate::selection::{EntityId, EntitySelection};
use crate::store::{Grouping, SeriesQuery};

#[derive(Debug, Clone, Default)]
pub struct TradeParams {
    pub products: EntitySelection,
    pub authorized_products: Option<HashSet<EntityId>>,
    pub from_year: Option<i32>,
    pub to_year: Option<i32>,
    /// Also break each product down by partner country.
    pub include_countries: bool,
}

/// One product's yearly amounts, `"n/s"` where nothing significant was traded.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TradeProduct {
    pub product_name: String,
    pub yearly_data: BTreeMap<i32, Amount>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TradeSummary {
    pub products: Vec<TradeProduct>,
    #[serde(serialize_with = "serialize_totals")]
    pub aggregate_tonnage: YearlyTotals,
}

/// One partner country under a product.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TradeCountry {
    pub country: String,
    /// Lowercased name with whitespace runs replaced by `-`.
    pub country_id: String,
    pub yearly_data: BTreeMap<i32, Amount>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TradeProductBreakdown {
    pub product_name: String,
    /// Yearly sums over the listed countries.
    #[serde(serialize_with = "serialize_totals")]
    pub yearly_data: YearlyTotals,
    pub country_breakdowns: Vec<TradeCountry>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TradeReport {
    pub title: String,
    pub from_period: String,
    pub to_period: String,
    pub summary: TradeSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country_breakdowns: Option<Vec<TradeProductBreakdown>>,
}

#[derive(Debug, Clone, Copy)]
enum TradeFlow {
    Exports,
    Imports,
}

impl TradeFlow {
    fn dataset(self) -> Dataset {
        match self {
            TradeFlow::Exports => Dataset::PolishChemicalExports,
            TradeFlow::Imports => Dataset::PolishChemicalImports,
        }
    }

    fn title(self) -> &'static str {
        match self {
            TradeFlow::Exports => "Polish Chemical Export Report",
            TradeFlow::Imports => "Polish Chemical Import Report",
        }
    }

    fn report(self) -> &'static str {
        match self {
            TradeFlow::Exports => "polish_chemical_exports",
            TradeFlow::Imports => "polish_chemical_imports",
        }
    }

    /// Export summaries keep source precision; import summaries are rounded.
    fn summary_kind(self) -> AmountKind {
        match self {
            TradeFlow::Exports => AmountKind::Exact,
            TradeFlow::Imports => AmountKind::Hundredths,
        }
    }
}

impl<'a> ReportQuery<'a> {
    /// Yearly exports per product, optionally by destination country.
    #[instrument(skip_all, fields(include_countries = params.include_countries))]
    pub async fn polish_chemical_exports(
        &self,
        params: &TradeParams,
        cancel: &CancellationToken,
    ) -> Result<TradeReport> {
        self.trade(TradeFlow::Exports, params, cancel).await
    }

    /// Yearly imports per product, optionally by origin country.
    #[instrument(skip_all, fields(include_countries = params.include_countries))]
    pub async fn polish_chemical_imports(
        &self,
        params: &TradeParams,
        cancel: &CancellationToken,
    ) -> Result<TradeReport> {
        self.trade(TradeFlow::Imports, params, cancel).await
    }

    async fn trade(
        &self,
        flow: TradeFlow,
        params: &TradeParams,
        cancel: &CancellationToken,
    ) -> Result<TradeReport> {
        self.build_trade(flow, params, cancel)
            .await
            .map_err(|e| report_failure(flow.report(), e))
    }

    async fn build_trade(
        &self,
        flow: TradeFlow,
        params: &TradeParams,
        cancel: &CancellationToken,
    ) -> Result<TradeReport> {
        let products = self
            .selected(
                EntityKind::Product,
                &params.products,
                params.authorized_products.as_ref(),
                cancel,
            )
            .await?;
        let requested = RangeRequest::years(params.from_year, params.to_year);
        let range = self.range(flow.dataset(), &requested, cancel).await?;

        let by_product = SeriesQuery::new(
            flow.dataset(),
            Grouping::ByEntity(EntityKind::Product),
            range,
        )
        .filter(EntityKind::Product, products);

        let summary = self
            .aggregated(vec![by_product.clone()], flow.summary_kind(), cancel)
            .await?;

        let country_breakdowns = if params.include_countries {
            let by_country = by_product
                .with_sub_entity(EntityKind::Country)
                .positive_only();
            let nested = self
                .aggregated(vec![by_country], AmountKind::Hundredths, cancel)
                .await?;
            Some(
                nested
                    .breakdowns
                    .into_iter()
                    .map(product_breakdown)
                    .collect(),
            )
        } else {
            None
        };

        info!(
            products = summary.breakdowns.len(),
            from = range.from().year,
            to = range.to().year,
            "{} report generated",
            flow.report()
        );
        Ok(TradeReport {
            title: flow.title().to_string(),
            from_period: range.from().year.to_string(),
            to_period: range.to().year.to_string(),
            summary: TradeSummary {
                products: summary
                    .breakdowns
                    .into_iter()
                    .map(|product| TradeProduct {
                        yearly_data: yearly_data(&product),
                        product_name: product.name,
                    })
                    .collect(),
                aggregate_tonnage: summary.aggregate_totals,
            },
            country_breakdowns,
        })
    }
}

fn yearly_data(breakdown: &EntityBreakdown) -> BTreeMap<i32, Amount> {
    breakdown
        .points
        .iter()
        .map(|point| (point.period.year, point.amount))
        .collect()
}

fn product_breakdown(product: EntityBreakdown) -> TradeProductBreakdown {
    TradeProductBreakdown {
        country_breakdowns: product
            .children
            .iter()
            .map(|country| TradeCountry {
                country: country.name.clone(),
                country_id: country_slug(&country.name),
                yearly_data: yearly_data(country),
            })
            .collect(),
        product_name: product.name,
        yearly_data: product.yearly_totals,
    }
}

fn country_slug(name: &str) -> String {
    name.split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join("-")
}
