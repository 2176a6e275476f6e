//! Row sources: the seam between the engine and the tabular store.
//!
//! [`RowSource`] is everything the engine needs from storage. [`StatStore`]
//! implements it over DuckDB using the table catalog in
//! [`config`](crate::config).

use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::{Dataset, EntityKind, COMPANY_DESCRIPTIONS};
use crate::connection::Connection;
use crate::error::{ReportError, Result};
use crate::models::RawRow;
use crate::period::{DataBounds, Period, PeriodRange};
use crate::selection::EntityId;
use crate::sql_builder::{SqlBuilder, SqlParam};

// ---------------------------------------------------------------------------
// SeriesQuery
// ---------------------------------------------------------------------------

/// How fetched rows are attributed to entities.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Grouping {
    /// One row set per entity of this kind.
    ByEntity(EntityKind),
    /// Everything summed into one synthetic entity with this name.
    Combined { label: String },
}

/// One fetch against a quarterly dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesQuery {
    pub dataset: Dataset,
    pub grouping: Grouping,
    /// Second breakdown level, e.g. countries under products.
    pub sub_entity: Option<EntityKind>,
    /// Restrict rows to these ids per entity kind.
    pub filters: Vec<(EntityKind, Vec<EntityId>)>,
    /// Drop fact rows whose amount is not strictly positive.
    pub positive_only: bool,
    pub range: PeriodRange,
}

impl SeriesQuery {
    pub fn new(dataset: Dataset, grouping: Grouping, range: PeriodRange) -> Self {
        Self {
            dataset,
            grouping,
            sub_entity: None,
            filters: Vec::new(),
            positive_only: false,
            range,
        }
    }

    pub fn with_sub_entity(mut self, kind: EntityKind) -> Self {
        self.sub_entity = Some(kind);
        self
    }

    pub fn filter(mut self, kind: EntityKind, ids: Vec<EntityId>) -> Self {
        self.filters.push((kind, ids));
        self
    }

    pub fn positive_only(mut self) -> Self {
        self.positive_only = true;
        self
    }

    /// Split into one query per grouped entity id.
    ///
    /// Only queries grouped by an entity kind that is also filtered by that
    /// kind can be split. Repeated ids are fetched once. Anything else comes
    /// back unchanged as a single query.
    pub fn split_per_entity(&self) -> Vec<SeriesQuery> {
        let kind = match self.grouping {
            Grouping::ByEntity(kind) => kind,
            Grouping::Combined { .. } => return vec![self.clone()],
        };
        let Some(position) = self.filters.iter().position(|(k, _)| *k == kind) else {
            return vec![self.clone()];
        };

        let mut seen = Vec::new();
        for id in &self.filters[position].1 {
            if !seen.contains(id) {
                seen.push(*id);
            }
        }
        if seen.len() <= 1 {
            return vec![self.clone()];
        }

        seen.into_iter()
            .map(|id| {
                let mut query = self.clone();
                query.filters[position].1 = vec![id];
                query
            })
            .collect()
    }
}

/// An entity id with its display name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityLabel {
    pub id: EntityId,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

impl EntityLabel {
    /// `"Name[Location]"` when a location is known, else the bare name.
    pub fn label(&self) -> String {
        match &self.location {
            Some(location) => format!("{}[{}]", self.name, location),
            None => self.name.clone(),
        }
    }
}

/// Plant details for one company producing one product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompanyDescription {
    pub company_id: EntityId,
    pub start_date: Option<String>,
    pub technology: Option<String>,
    pub feedstock: Option<String>,
}

// ---------------------------------------------------------------------------
// RowSource
// ---------------------------------------------------------------------------

/// Read access to quarterly time series and the entity catalog.
///
/// Implementations must be safe to call from several blocking tasks at once.
pub trait RowSource: Send + Sync {
    /// Rows for one query, in [`RawRow::sort_key`] order.
    fn fetch_rows(&self, query: &SeriesQuery) -> Result<Vec<RawRow>>;

    /// Earliest and latest period present in a dataset.
    fn min_max_period(&self, dataset: Dataset) -> Result<DataBounds>;

    /// Every id of an entity kind, ordered by name.
    fn entity_ids(&self, kind: EntityKind) -> Result<Vec<EntityId>>;

    /// Names for the given ids, ordered by name. Unknown ids are skipped.
    fn entity_labels(&self, kind: EntityKind, ids: &[EntityId]) -> Result<Vec<EntityLabel>>;

    /// Plant details recorded for `product`. Sources without them return none.
    fn company_descriptions(&self, product: EntityId) -> Result<Vec<CompanyDescription>> {
        let _ = product;
        Ok(Vec::new())
    }
}

// ---------------------------------------------------------------------------
// StatStore
// ---------------------------------------------------------------------------

/// DuckDB-backed [`RowSource`].
///
/// Holds one connection and hands each call its own clone, so concurrent
/// fetches never share a handle.
pub struct StatStore {
    conn: Mutex<Connection>,
}

#[derive(Deserialize)]
struct StoreRow {
    entity_id: EntityId,
    entity_name: Option<String>,
    entity_location: Option<String>,
    sub_entity_id: Option<EntityId>,
    sub_entity_name: Option<String>,
    sub_entity_location: Option<String>,
    period_year: i32,
    period_quarter: i64,
    amount: Option<f64>,
}

#[derive(Deserialize)]
struct PeriodRow {
    period_year: i32,
    period_quarter: i64,
}

impl StatStore {
    pub fn new(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }

    /// A fresh handle onto the store's database.
    pub fn connection(&self) -> Result<Connection> {
        let conn = self
            .conn
            .lock()
            .map_err(|_| ReportError::Task("store connection lock poisoned".to_string()))?;
        conn.try_clone()
    }

    fn build_series_sql(query: &SeriesQuery) -> Result<(String, Vec<SqlParam>)> {
        let fact = query.dataset.table();
        let missing = |kind: EntityKind| {
            ReportError::InvalidArgument(format!(
                "dataset {} has no {} column",
                query.dataset.name(),
                kind.name()
            ))
        };

        let year = format!("t.{}", fact.year_col);
        let quarter = fact.quarter_col.map(|col| format!("t.{}", col));
        let mut select = Vec::new();
        let mut group = Vec::new();
        let mut joins = Vec::new();

        match &query.grouping {
            Grouping::ByEntity(kind) => {
                let entity = kind.table();
                let fk = fact.entity_col(*kind).ok_or_else(|| missing(*kind))?;
                joins.push(format!(
                    "JOIN {} e ON t.{} = e.{}",
                    entity.table, fk, entity.id_col
                ));
                select.push(format!("CAST(e.{} AS BIGINT) AS entity_id", entity.id_col));
                select.push(format!("e.{} AS entity_name", entity.name_col));
                group.push(format!("e.{}", entity.id_col));
                group.push(format!("e.{}", entity.name_col));
                match entity.location_col {
                    Some(col) => {
                        select.push(format!("e.{} AS entity_location", col));
                        group.push(format!("e.{}", col));
                    }
                    None => select.push("CAST(NULL AS VARCHAR) AS entity_location".to_string()),
                }
            }
            Grouping::Combined { .. } => {
                select.push("CAST(0 AS BIGINT) AS entity_id".to_string());
                select.push("CAST(NULL AS VARCHAR) AS entity_name".to_string());
                select.push("CAST(NULL AS VARCHAR) AS entity_location".to_string());
            }
        }

        match query.sub_entity {
            Some(kind) => {
                let sub = kind.table();
                let fk = fact.entity_col(kind).ok_or_else(|| missing(kind))?;
                joins.push(format!("JOIN {} s ON t.{} = s.{}", sub.table, fk, sub.id_col));
                select.push(format!("CAST(s.{} AS BIGINT) AS sub_entity_id", sub.id_col));
                select.push(format!("s.{} AS sub_entity_name", sub.name_col));
                group.push(format!("s.{}", sub.id_col));
                group.push(format!("s.{}", sub.name_col));
                match sub.location_col {
                    Some(col) => {
                        select.push(format!("s.{} AS sub_entity_location", col));
                        group.push(format!("s.{}", col));
                    }
                    None => {
                        select.push("CAST(NULL AS VARCHAR) AS sub_entity_location".to_string())
                    }
                }
            }
            None => {
                select.push("CAST(NULL AS BIGINT) AS sub_entity_id".to_string());
                select.push("CAST(NULL AS VARCHAR) AS sub_entity_name".to_string());
                select.push("CAST(NULL AS VARCHAR) AS sub_entity_location".to_string());
            }
        }

        select.push(format!("CAST({} AS INTEGER) AS period_year", year));
        select.push(format!(
            "CAST({} AS INTEGER) AS period_quarter",
            quarter.as_deref().unwrap_or("1")
        ));
        select.push(format!("CAST(SUM(t.{}) AS DOUBLE) AS amount", fact.amount_col));
        group.push(year.clone());
        group.extend(quarter.clone());

        let mut builder = SqlBuilder::new(&format!("{} t", fact.table));
        builder.select(&select);
        for join in &joins {
            builder.join(join);
        }
        for (kind, ids) in &query.filters {
            let fk = fact.entity_col(*kind).ok_or_else(|| missing(*kind))?;
            builder.where_in(&format!("t.{}", fk), ids.iter().copied());
        }
        match &quarter {
            Some(quarter) => {
                builder.where_period(&query.range.predicate(), &year, quarter);
            }
            // Yearly tables: whole years between the range's boundary years.
            None => {
                builder.where_clause(
                    &format!("{y} >= ? AND {y} <= ?", y = year),
                    vec![
                        SqlParam::from(query.range.from().year),
                        SqlParam::from(query.range.to().year),
                    ],
                );
            }
        }
        if query.positive_only {
            builder.where_clause(&format!("t.{} > 0", fact.amount_col), Vec::new());
        }
        builder.group_by(&group).order_by(&[
            "entity_name",
            "entity_id",
            "sub_entity_name NULLS FIRST",
            "sub_entity_id NULLS FIRST",
            "period_year",
            "period_quarter",
        ]);
        Ok(builder.build())
    }

    fn boundary_period(
        conn: &Connection,
        dataset: Dataset,
        direction: &str,
    ) -> Result<Option<Period>> {
        let fact = dataset.table();
        let (sql, params) = SqlBuilder::new(fact.table)
            .select(&[
                format!("CAST({} AS INTEGER) AS period_year", fact.year_col),
                format!(
                    "CAST({} AS INTEGER) AS period_quarter",
                    fact.quarter_col.unwrap_or("1")
                ),
            ])
            .order_by(&[
                format!("period_year {}", direction),
                format!("period_quarter {}", direction),
            ])
            .limit(1)
            .build();
        let rows: Vec<PeriodRow> = conn.execute_into(&sql, &params)?;
        rows.into_iter()
            .next()
            .map(|row| Period::from_parts(row.period_year, row.period_quarter))
            .transpose()
    }
}

impl RowSource for StatStore {
    fn fetch_rows(&self, query: &SeriesQuery) -> Result<Vec<RawRow>> {
        let (sql, params) = Self::build_series_sql(query)?;
        let conn = self.connection()?;
        let rows: Vec<StoreRow> = conn.execute_into(&sql, &params)?;

        let combined_label = match &query.grouping {
            Grouping::Combined { label } => Some(label.as_str()),
            Grouping::ByEntity(_) => None,
        };

        let rows = rows
            .into_iter()
            .map(|row| {
                Ok(RawRow {
                    entity_id: row.entity_id,
                    entity_name: combined_label
                        .map(str::to_string)
                        .or(row.entity_name)
                        .unwrap_or_default(),
                    entity_location: row.entity_location,
                    sub_entity_id: row.sub_entity_id,
                    sub_entity_name: row.sub_entity_name,
                    sub_entity_location: row.sub_entity_location,
                    period: Period::from_parts(row.period_year, row.period_quarter)?,
                    amount: row.amount,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        debug!(
            dataset = query.dataset.name(),
            rows = rows.len(),
            "fetched series rows"
        );
        Ok(rows)
    }

    fn min_max_period(&self, dataset: Dataset) -> Result<DataBounds> {
        let conn = self.connection()?;
        let min = Self::boundary_period(&conn, dataset, "ASC")?;
        let max = Self::boundary_period(&conn, dataset, "DESC")?;
        match (min, max) {
            (Some(min), Some(max)) => Ok(DataBounds { min, max }),
            _ => Err(ReportError::NotFound(format!(
                "no {} data available",
                dataset.name()
            ))),
        }
    }

    fn entity_ids(&self, kind: EntityKind) -> Result<Vec<EntityId>> {
        let table = kind.table();
        let (sql, params) = SqlBuilder::new(table.table)
            .select(&[format!("CAST({} AS BIGINT) AS id", table.id_col)])
            .order_by(&[table.name_col, table.id_col])
            .build();
        let rows: Vec<IdRow> = self.connection()?.execute_into(&sql, &params)?;
        Ok(rows.into_iter().map(|row| row.id).collect())
    }

    fn entity_labels(&self, kind: EntityKind, ids: &[EntityId]) -> Result<Vec<EntityLabel>> {
        let table = kind.table();
        let location = match table.location_col {
            Some(col) => format!("{} AS location", col),
            None => "CAST(NULL AS VARCHAR) AS location".to_string(),
        };
        let (sql, params) = SqlBuilder::new(table.table)
            .select(&[
                format!("CAST({} AS BIGINT) AS id", table.id_col),
                format!("{} AS name", table.name_col),
                location,
            ])
            .where_in(table.id_col, ids.iter().copied())
            .order_by(&[table.name_col, table.id_col])
            .build();
        self.connection()?.execute_into(&sql, &params)
    }

    fn company_descriptions(&self, product: EntityId) -> Result<Vec<CompanyDescription>> {
        let table = COMPANY_DESCRIPTIONS;
        let (sql, params) = SqlBuilder::new(table.table)
            .select(&[
                format!("CAST({} AS BIGINT) AS company_id", table.company_col),
                format!("CAST({} AS VARCHAR) AS start_date", table.start_date_col),
                format!("CAST({} AS VARCHAR) AS technology", table.technology_col),
                format!("CAST({} AS VARCHAR) AS feedstock", table.feedstock_col),
            ])
            .where_in(table.product_col, [product])
            .order_by(&[table.company_col])
            .build();
        self.connection()?.execute_into(&sql, &params)
    }
}

#[derive(Deserialize)]
struct IdRow {
    id: EntityId,
}
