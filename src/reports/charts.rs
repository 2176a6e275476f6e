//! Production chart reports.

use std::collections::HashSet;

use tokio_util::sync::CancellationToken;
use tracing::{info, instrument};

use super::{report_failure, ReportQuery};
use crate::config::{Dataset, EntityKind};
use crate::error::Result;
use crate::models::{AmountKind, ChartPayload, EntityBreakdown};
use crate::period::RangeRequest;
use crate::presentation::{present, ChartShape, ColorSource};
use crate::selection::{EntityId, EntitySelection};
use crate::store::{Grouping, SeriesQuery};

const X_AXIS: &str = "Quarter";
const Y_AXIS: &str = "Kilo Tons";

/// One company's production, one series per product.
#[derive(Debug, Clone, Default)]
pub struct CompanyProductionParams {
    pub company: EntityId,
    pub products: EntitySelection,
    /// Products the caller may see. `None` means no restriction.
    pub authorized_products: Option<HashSet<EntityId>>,
    pub range: RangeRequest,
}

/// One product's production summed over the selected companies.
#[derive(Debug, Clone, Default)]
pub struct ProductTrendParams {
    pub product: EntityId,
    pub companies: EntitySelection,
    pub authorized_companies: Option<HashSet<EntityId>>,
    pub range: RangeRequest,
}

/// One product's production, one stacked series per company.
#[derive(Debug, Clone, Default)]
pub struct ProductByCompanyParams {
    pub product: EntityId,
    pub companies: EntitySelection,
    pub authorized_companies: Option<HashSet<EntityId>>,
    pub range: RangeRequest,
}

impl<'a> ReportQuery<'a> {
    /// Per-product production series for one company, titled
    /// `"Name[Location]"`.
    #[instrument(skip_all, fields(company = params.company))]
    pub async fn company_production(
        &self,
        params: &CompanyProductionParams,
        colors: &mut dyn ColorSource,
        cancel: &CancellationToken,
    ) -> Result<ChartPayload> {
        self.build_company_production(params, colors, cancel)
            .await
            .map_err(|e| report_failure("company_production", e))
    }

    /// A single series under `chartData`: one product summed across the
    /// selected companies. The series is present, empty, when nothing matches.
    #[instrument(skip_all, fields(product = params.product))]
    pub async fn product_trend(
        &self,
        params: &ProductTrendParams,
        colors: &mut dyn ColorSource,
        cancel: &CancellationToken,
    ) -> Result<ChartPayload> {
        self.build_product_trend(params, colors, cancel)
            .await
            .map_err(|e| report_failure("product_trend", e))
    }

    /// Stacked per-company series for one product.
    #[instrument(skip_all, fields(product = params.product))]
    pub async fn product_by_company(
        &self,
        params: &ProductByCompanyParams,
        colors: &mut dyn ColorSource,
        cancel: &CancellationToken,
    ) -> Result<ChartPayload> {
        self.build_product_by_company(params, colors, cancel)
            .await
            .map_err(|e| report_failure("product_by_company", e))
    }

    async fn build_company_production(
        &self,
        params: &CompanyProductionParams,
        colors: &mut dyn ColorSource,
        cancel: &CancellationToken,
    ) -> Result<ChartPayload> {
        let company = self.label(EntityKind::Company, params.company, cancel).await?;
        let products = self
            .selected(
                EntityKind::Product,
                &params.products,
                params.authorized_products.as_ref(),
                cancel,
            )
            .await?;
        let range = self.range(Dataset::Production, &params.range, cancel).await?;

        let query = SeriesQuery::new(
            Dataset::Production,
            Grouping::ByEntity(EntityKind::Product),
            range,
        )
        .filter(EntityKind::Company, vec![params.company])
        .filter(EntityKind::Product, products);
        let aggregation = self.aggregated(vec![query], AmountKind::Whole, cancel).await?;

        info!(
            products = aggregation.breakdowns.len(),
            period = %range.describe(),
            "company production report generated"
        );
        Ok(
            present(&aggregation.breakdowns, ChartShape::PerEntitySeries, colors)
                .titled(company.label())
                .with_axes(X_AXIS, Y_AXIS),
        )
    }

    async fn build_product_trend(
        &self,
        params: &ProductTrendParams,
        colors: &mut dyn ColorSource,
        cancel: &CancellationToken,
    ) -> Result<ChartPayload> {
        let product = self.label(EntityKind::Product, params.product, cancel).await?;
        let companies = self
            .selected(
                EntityKind::Company,
                &params.companies,
                params.authorized_companies.as_ref(),
                cancel,
            )
            .await?;
        let range = self.range(Dataset::Production, &params.range, cancel).await?;

        let query = SeriesQuery::new(
            Dataset::Production,
            Grouping::Combined {
                label: product.name.clone(),
            },
            range,
        )
        .filter(EntityKind::Product, vec![params.product])
        .filter(EntityKind::Company, companies);
        let mut breakdowns = self
            .aggregated(vec![query], AmountKind::Whole, cancel)
            .await?
            .breakdowns;
        if breakdowns.is_empty() {
            breakdowns.push(EntityBreakdown::new(&product.name));
        }

        info!(period = %range.describe(), "product trend report generated");
        Ok(
            present(&breakdowns, ChartShape::SingleEntity, colors)
                .titled(product.label())
                .with_axes(X_AXIS, Y_AXIS),
        )
    }

    async fn build_product_by_company(
        &self,
        params: &ProductByCompanyParams,
        colors: &mut dyn ColorSource,
        cancel: &CancellationToken,
    ) -> Result<ChartPayload> {
        let product = self.label(EntityKind::Product, params.product, cancel).await?;
        let companies = self
            .selected(
                EntityKind::Company,
                &params.companies,
                params.authorized_companies.as_ref(),
                cancel,
            )
            .await?;
        let range = self.range(Dataset::Production, &params.range, cancel).await?;

        let query = SeriesQuery::new(
            Dataset::Production,
            Grouping::ByEntity(EntityKind::Company),
            range,
        )
        .filter(EntityKind::Product, vec![params.product])
        .filter(EntityKind::Company, companies);
        let aggregation = self.aggregated(vec![query], AmountKind::Whole, cancel).await?;

        info!(
            companies = aggregation.breakdowns.len(),
            period = %range.describe(),
            "product by company report generated"
        );
        Ok(
            present(&aggregation.breakdowns, ChartShape::StackedMultiSeries, colors)
                .titled(product.label())
                .with_axes(X_AXIS, Y_AXIS),
        )
    }
}
