//! Russian domestic sales report.

use std::collections::HashSet;

use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument};

use super::{report_failure, ReportQuery};
use crate::config::{Dataset, EntityKind};
use crate::error::Result;
use crate::models::{Amount, AmountKind, EntityBreakdown, PeriodTotals, SeriesPoint};
use crate::period::RangeRequest;
use crate::selection::{EntityId, EntitySelection};
use crate::store::{CompanyDescription, EntityLabel, Grouping, SeriesQuery};

const TITLE: &str = "Russian Petrochemical Domestic Sales Report";

#[derive(Debug, Clone, Default)]
pub struct RussiaDomesticParams {
    pub products: EntitySelection,
    pub authorized_products: Option<HashSet<EntityId>>,
    pub range: RangeRequest,
}

/// One company's quarterly sales of a product, with its plant details.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RussiaCompanySales {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub technology: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feedstock: Option<String>,
    pub data: Vec<SeriesPoint>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RussiaProductSales {
    pub product_name: String,
    pub companies: Vec<RussiaCompanySales>,
    /// Sum over all companies per period, in period order.
    pub total_sales: Vec<SeriesPoint>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RussiaDomesticReport {
    pub title: String,
    pub from_period: String,
    pub to_period: String,
    pub products: Vec<RussiaProductSales>,
}

impl<'a> ReportQuery<'a> {
    /// Quarterly domestic sales per selected product and company. Every
    /// selected product is listed, with no companies when it has no sales.
    /// Amounts are always numeric: missing sales count as 0.
    #[instrument(skip_all)]
    pub async fn russia_domestic(
        &self,
        params: &RussiaDomesticParams,
        cancel: &CancellationToken,
    ) -> Result<RussiaDomesticReport> {
        self.build_russia_domestic(params, cancel)
            .await
            .map_err(|e| report_failure("russia_domestic", e))
    }

    async fn build_russia_domestic(
        &self,
        params: &RussiaDomesticParams,
        cancel: &CancellationToken,
    ) -> Result<RussiaDomesticReport> {
        let products = self
            .selected(
                EntityKind::Product,
                &params.products,
                params.authorized_products.as_ref(),
                cancel,
            )
            .await?;
        let range = self
            .range(Dataset::RussiaDomesticSales, &params.range, cancel)
            .await?;
        let labels = self
            .labels(EntityKind::Product, products.clone(), cancel)
            .await?;

        let query = SeriesQuery::new(
            Dataset::RussiaDomesticSales,
            Grouping::ByEntity(EntityKind::Product),
            range,
        )
        .with_sub_entity(EntityKind::Company)
        .filter(EntityKind::Product, products);
        let aggregation = self.aggregated(vec![query], AmountKind::Exact, cancel).await?;

        let mut sales = Vec::with_capacity(labels.len());
        for label in labels {
            let product = label.id;
            let descriptions = self
                .fetcher
                .run(move |source| source.company_descriptions(product), cancel)
                .await?;
            let breakdown = aggregation
                .breakdowns
                .iter()
                .find(|b| b.id == Some(label.id));
            sales.push(product_sales(&label, breakdown, &descriptions));
        }

        info!(
            products = sales.len(),
            period = %range.describe(),
            "russia domestic report generated"
        );
        Ok(RussiaDomesticReport {
            title: TITLE.to_string(),
            from_period: range.from().heading(),
            to_period: range.to().heading(),
            products: sales,
        })
    }
}

fn product_sales(
    label: &EntityLabel,
    breakdown: Option<&EntityBreakdown>,
    descriptions: &[CompanyDescription],
) -> RussiaProductSales {
    let companies = breakdown.map_or(&[][..], |b| b.children.as_slice());

    let mut totals = PeriodTotals::new();
    for point in companies.iter().flat_map(|c| &c.points) {
        *totals.entry(point.period).or_insert(0.0) += point.amount.value().unwrap_or(0.0);
    }

    RussiaProductSales {
        product_name: label.name.clone(),
        companies: companies
            .iter()
            .map(|company| {
                let description = descriptions
                    .iter()
                    .find(|d| Some(d.company_id) == company.id);
                RussiaCompanySales {
                    name: company.name.clone(),
                    location: company.location.clone(),
                    start_date: description.and_then(|d| d.start_date.clone()),
                    technology: description.and_then(|d| d.technology.clone()),
                    feedstock: description.and_then(|d| d.feedstock.clone()),
                    data: company.points.iter().map(sales_point).collect(),
                }
            })
            .collect(),
        total_sales: totals
            .into_iter()
            .map(|(period, total)| SeriesPoint::new(period, Amount::Value(total)).with_full_label())
            .collect(),
    }
}

/// Full `"YYYY/Qn"` label; not-significant amounts become 0.
fn sales_point(point: &SeriesPoint) -> SeriesPoint {
    let amount = Amount::Value(point.amount.value().unwrap_or(0.0));
    SeriesPoint::new(point.period, amount).with_full_label()
}
