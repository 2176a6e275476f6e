//! Company turnover and operating-profit reports.

use std::collections::HashSet;

use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument};

use super::{report_failure, ReportQuery};
use crate::aggregate::{aggregate_totals, Aggregation};
use crate::config::{Dataset, EntityKind};
use crate::error::Result;
use crate::models::{
    quarterly_points, serialize_totals, AmountKind, ChartPayload, EntityBreakdown, QuarterlyPoint,
    Rgb, YearlyTotals,
};
use crate::period::RangeRequest;
use crate::presentation::{present, ChartShape, Palette};
use crate::selection::{EntityId, EntitySelection};
use crate::store::{EntityLabel, Grouping, SeriesQuery};

const SUMMARY_TITLE: &str = "Summary Turnover in $ million";
const BREAKDOWN_TITLE: &str = "Financial Performance Report";
const TURNOVER: &str = "TURNOVER";
const OPERATING_PROFIT: &str = "OPERATING PROFIT";

#[derive(Debug, Clone, Default)]
pub struct FinancialSummaryParams {
    pub companies: EntitySelection,
    pub authorized_companies: Option<HashSet<EntityId>>,
    pub range: RangeRequest,
}

#[derive(Debug, Clone, Default)]
pub struct FinancialBreakdownParams {
    pub companies: EntitySelection,
    pub authorized_companies: Option<HashSet<EntityId>>,
    pub range: RangeRequest,
}

/// Yearly turnover and operating-profit sums.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FinancialTotals {
    #[serde(serialize_with = "serialize_totals")]
    pub turnover: YearlyTotals,
    #[serde(serialize_with = "serialize_totals")]
    pub operating_profit: YearlyTotals,
}

/// One company's quarterly financials.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompanyFinancials {
    pub company_id: EntityId,
    pub company_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    pub quarterly_turnover: Vec<QuarterlyPoint>,
    pub quarterly_operating_profit: Vec<QuarterlyPoint>,
    pub yearly_totals: FinancialTotals,
}

impl CompanyFinancials {
    fn empty(breakdown: &EntityBreakdown) -> Self {
        Self {
            company_id: breakdown.id.unwrap_or_default(),
            company_name: breakdown.name.clone(),
            location: breakdown.location.clone(),
            quarterly_turnover: Vec::new(),
            quarterly_operating_profit: Vec::new(),
            yearly_totals: FinancialTotals::default(),
        }
    }
}

/// Per-company financial breakdown with totals across all companies.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FinancialBreakdown {
    pub title: String,
    pub period: String,
    pub company_breakdowns: Vec<CompanyFinancials>,
    pub aggregate_totals: FinancialTotals,
}

impl<'a> ReportQuery<'a> {
    /// Turnover and operating profit summed over the selected companies, as
    /// two series colored blue and red. Titled with the selected companies'
    /// `"Name[Location]"` labels unless every company is selected.
    #[instrument(skip_all)]
    pub async fn financial_summary(
        &self,
        params: &FinancialSummaryParams,
        cancel: &CancellationToken,
    ) -> Result<ChartPayload> {
        self.build_financial_summary(params, cancel)
            .await
            .map_err(|e| report_failure("financial_summary", e))
    }

    /// Quarterly turnover and operating profit per company.
    #[instrument(skip_all)]
    pub async fn financial_breakdown(
        &self,
        params: &FinancialBreakdownParams,
        cancel: &CancellationToken,
    ) -> Result<FinancialBreakdown> {
        self.build_financial_breakdown(params, cancel)
            .await
            .map_err(|e| report_failure("financial_breakdown", e))
    }

    async fn build_financial_summary(
        &self,
        params: &FinancialSummaryParams,
        cancel: &CancellationToken,
    ) -> Result<ChartPayload> {
        let companies = self
            .selected(
                EntityKind::Company,
                &params.companies,
                params.authorized_companies.as_ref(),
                cancel,
            )
            .await?;
        let range = self.range(Dataset::Turnover, &params.range, cancel).await?;

        let title = if params.companies.is_all() {
            SUMMARY_TITLE.to_string()
        } else {
            self.labels(EntityKind::Company, companies.clone(), cancel)
                .await?
                .iter()
                .map(EntityLabel::label)
                .collect::<Vec<_>>()
                .join(" / ")
        };

        let combined = |dataset: Dataset, label: &str| {
            SeriesQuery::new(
                dataset,
                Grouping::Combined {
                    label: label.to_string(),
                },
                range,
            )
            .filter(EntityKind::Company, companies.clone())
        };
        let (turnover, profit) = tokio::try_join!(
            self.aggregated(
                vec![combined(Dataset::Turnover, TURNOVER)],
                AmountKind::Hundredths,
                cancel
            ),
            self.aggregated(
                vec![combined(Dataset::OperatingProfit, OPERATING_PROFIT)],
                AmountKind::Hundredths,
                cancel
            ),
        )?;

        // Both series are always emitted so the fixed colors stay attached
        // to the right dataset.
        let series = [
            single_breakdown(turnover, TURNOVER),
            single_breakdown(profit, OPERATING_PROFIT),
        ];
        let mut colors = Palette::new(vec![Rgb::BLUE, Rgb::RED]);

        info!(
            companies = companies.len(),
            period = %range.describe(),
            "financial summary report generated"
        );
        Ok(present(&series, ChartShape::SingleSeries, &mut colors).titled(title))
    }

    async fn build_financial_breakdown(
        &self,
        params: &FinancialBreakdownParams,
        cancel: &CancellationToken,
    ) -> Result<FinancialBreakdown> {
        let companies = self
            .selected(
                EntityKind::Company,
                &params.companies,
                params.authorized_companies.as_ref(),
                cancel,
            )
            .await?;
        let range = self.range(Dataset::Turnover, &params.range, cancel).await?;

        let per_company = |dataset: Dataset| {
            SeriesQuery::new(dataset, Grouping::ByEntity(EntityKind::Company), range)
                .filter(EntityKind::Company, companies.clone())
        };
        let (turnover, profit) = tokio::try_join!(
            self.aggregated(
                vec![per_company(Dataset::Turnover)],
                AmountKind::Hundredths,
                cancel
            ),
            self.aggregated(
                vec![per_company(Dataset::OperatingProfit)],
                AmountKind::Hundredths,
                cancel
            ),
        )?;

        let aggregate = FinancialTotals {
            turnover: aggregate_totals(&turnover.breakdowns, AmountKind::Hundredths),
            operating_profit: aggregate_totals(&profit.breakdowns, AmountKind::Hundredths),
        };

        let mut merged: Vec<CompanyFinancials> = Vec::new();
        for breakdown in turnover.breakdowns {
            let mut company = CompanyFinancials::empty(&breakdown);
            company.quarterly_turnover = quarterly_points(&breakdown.points);
            company.yearly_totals.turnover = breakdown.yearly_totals;
            merged.push(company);
        }
        for breakdown in profit.breakdowns {
            let id = breakdown.id.unwrap_or_default();
            let position = merged.iter().position(|c| c.company_id == id);
            let company = match position {
                Some(i) => &mut merged[i],
                None => {
                    merged.push(CompanyFinancials::empty(&breakdown));
                    let last = merged.len() - 1;
                    &mut merged[last]
                }
            };
            company.quarterly_operating_profit = quarterly_points(&breakdown.points);
            company.yearly_totals.operating_profit = breakdown.yearly_totals;
        }
        merged.sort_by(|a, b| {
            (&a.company_name, a.company_id).cmp(&(&b.company_name, b.company_id))
        });

        info!(
            companies = merged.len(),
            period = %range.describe(),
            "financial breakdown report generated"
        );
        Ok(FinancialBreakdown {
            title: BREAKDOWN_TITLE.to_string(),
            period: range.describe(),
            company_breakdowns: merged,
            aggregate_totals: aggregate,
        })
    }
}

fn single_breakdown(aggregation: Aggregation, label: &str) -> EntityBreakdown {
    aggregation
        .breakdowns
        .into_iter()
        .next()
        .unwrap_or_else(|| EntityBreakdown::new(label))
}
