//! SQL builder with parameterized query construction.
//!
//! Every request value goes through DuckDB's parameter binding (`?`
//! placeholders), never through string interpolation. Identifiers passed to
//! the builder come from the static catalog in [`config`](crate::config).
//!
//! # Example
//!
//! ```rust
//! use statdb_reports::{Period, PeriodRange, Quarter, SqlBuilder};
//!
//! let range = PeriodRange::new(
//!     Period::new(2021, Quarter::Q2),
//!     Period::new(2023, Quarter::Q3),
//! ).unwrap();
//! let (sql, params) = SqlBuilder::new("production")
//!     .where_in("pro_id", [14_i64, 15])
//!     .where_period(&range.predicate(), "period_year", "period_quarter")
//!     .order_by(&["period_year", "period_quarter"])
//!     .build();
//! assert!(sql.contains("OR (period_year > ? AND period_year < ?)"));
//! assert_eq!(params.len(), 8);
//! ```

use duckdb::types::ToSqlOutput;
use duckdb::ToSql;

use crate::period::{PeriodPredicate, PeriodPredicateCase};

// ---------------------------------------------------------------------------
// SqlParam
// ---------------------------------------------------------------------------

/// A bound query parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlParam {
    Int(i64),
}

impl ToSql for SqlParam {
    fn to_sql(&self) -> duckdb::Result<ToSqlOutput<'_>> {
        match self {
            SqlParam::Int(v) => v.to_sql(),
        }
    }
}

impl From<i64> for SqlParam {
    fn from(v: i64) -> Self {
        SqlParam::Int(v)
    }
}

impl From<i32> for SqlParam {
    fn from(v: i32) -> Self {
        SqlParam::Int(v as i64)
    }
}

impl From<u8> for SqlParam {
    fn from(v: u8) -> Self {
        SqlParam::Int(v as i64)
    }
}

// ---------------------------------------------------------------------------
// SqlBuilder
// ---------------------------------------------------------------------------

/// Builds parameterized SQL queries. Methods return `&mut Self` for chaining.
pub struct SqlBuilder {
    select_cols: Vec<String>,
    from_table: String,
    joins: Vec<String>,
    where_clauses: Vec<String>,
    params: Vec<SqlParam>,
    group_by_cols: Vec<String>,
    order_by_cols: Vec<String>,
    limit_val: Option<usize>,
}

impl SqlBuilder {
    /// Create a builder targeting the given table, optionally with an alias
    /// (`"production t"`).
    pub fn new(table: &str) -> Self {
        Self {
            select_cols: vec!["*".to_string()],
            from_table: table.to_string(),
            joins: Vec::new(),
            where_clauses: Vec::new(),
            params: Vec::new(),
            group_by_cols: Vec::new(),
            order_by_cols: Vec::new(),
            limit_val: None,
        }
    }

    /// Set the columns to select (replaces the default `*`).
    pub fn select<S: AsRef<str>>(&mut self, cols: &[S]) -> &mut Self {
        self.select_cols = cols.iter().map(|c| c.as_ref().to_string()).collect();
        self
    }

    /// Add a JOIN clause, e.g. `"JOIN products e ON t.pro_id = e.pr_id"`.
    pub fn join(&mut self, clause: &str) -> &mut Self {
        self.joins.push(clause.to_string());
        self
    }

    /// Add a WHERE condition with one `?` per parameter, appended in order.
    pub fn where_clause(&mut self, condition: &str, params: Vec<SqlParam>) -> &mut Self {
        self.where_clauses.push(condition.to_string());
        self.params.extend(params);
        self
    }

    /// Add an IN condition with parameterized values.
    ///
    /// An empty value list produces `FALSE`.
    pub fn where_in<I, P>(&mut self, column: &str, values: I) -> &mut Self
    where
        I: IntoIterator<Item = P>,
        P: Into<SqlParam>,
    {
        let values: Vec<SqlParam> = values.into_iter().map(Into::into).collect();
        if values.is_empty() {
            self.where_clauses.push("FALSE".to_string());
            return self;
        }
        let placeholders = vec!["?"; values.len()].join(", ");
        self.where_clauses
            .push(format!("{} IN ({})", column, placeholders));
        self.params.extend(values);
        self
    }

    /// Add the period-range condition for the given year and quarter columns.
    ///
    /// Renders one of three shapes depending on [`PeriodPredicateCase`]:
    ///
    /// - single year: `(y = ? AND q >= ? AND q <= ?)`
    /// - adjacent years: `((y = ? AND q >= ?) OR (y = ? AND q <= ?))`
    /// - wider ranges: the adjacent form plus `OR (y > ? AND y < ?)`
    ///
    /// Quarters are bound as integers 1-4 so the comparison follows quarter
    /// order rather than text order.
    pub fn where_period(
        &mut self,
        predicate: &PeriodPredicate,
        year_col: &str,
        quarter_col: &str,
    ) -> &mut Self {
        let (from, to) = (predicate.from, predicate.to);
        match predicate.case {
            PeriodPredicateCase::SingleYear => {
                self.where_clauses.push(format!(
                    "({y} = ? AND {q} >= ? AND {q} <= ?)",
                    y = year_col,
                    q = quarter_col
                ));
                self.params.extend([
                    SqlParam::from(from.year),
                    SqlParam::from(from.quarter.number()),
                    SqlParam::from(to.quarter.number()),
                ]);
            }
            PeriodPredicateCase::AdjacentYears | PeriodPredicateCase::MultiYearGap => {
                let mut clause = format!(
                    "(({y} = ? AND {q} >= ?) OR ({y} = ? AND {q} <= ?)",
                    y = year_col,
                    q = quarter_col
                );
                self.params.extend([
                    SqlParam::from(from.year),
                    SqlParam::from(from.quarter.number()),
                    SqlParam::from(to.year),
                    SqlParam::from(to.quarter.number()),
                ]);
                if predicate.case == PeriodPredicateCase::MultiYearGap {
                    clause.push_str(&format!(" OR ({y} > ? AND {y} < ?)", y = year_col));
                    self.params.extend([SqlParam::from(from.year), SqlParam::from(to.year)]);
                }
                clause.push(')');
                self.where_clauses.push(clause);
            }
        }
        self
    }

    /// Add GROUP BY columns.
    pub fn group_by<S: AsRef<str>>(&mut self, cols: &[S]) -> &mut Self {
        self.group_by_cols
            .extend(cols.iter().map(|c| c.as_ref().to_string()));
        self
    }

    /// Add ORDER BY clauses (e.g. `"entity_name"`, `"year DESC"`).
    pub fn order_by<S: AsRef<str>>(&mut self, clauses: &[S]) -> &mut Self {
        self.order_by_cols
            .extend(clauses.iter().map(|c| c.as_ref().to_string()));
        self
    }

    /// Set the LIMIT.
    pub fn limit(&mut self, n: usize) -> &mut Self {
        self.limit_val = Some(n);
        self
    }

    /// Build the final SQL string and parameter list.
    pub fn build(&self) -> (String, Vec<SqlParam>) {
        let mut parts = vec![
            format!("SELECT {}", self.select_cols.join(", ")),
            format!("FROM {}", self.from_table),
        ];

        for j in &self.joins {
            parts.push(j.clone());
        }

        if !self.where_clauses.is_empty() {
            parts.push(format!("WHERE {}", self.where_clauses.join(" AND ")));
        }

        if !self.group_by_cols.is_empty() {
            parts.push(format!("GROUP BY {}", self.group_by_cols.join(", ")));
        }

        if !self.order_by_cols.is_empty() {
            parts.push(format!("ORDER BY {}", self.order_by_cols.join(", ")));
        }

        if let Some(n) = self.limit_val {
            parts.push(format!("LIMIT {}", n));
        }

        (parts.join("\n"), self.params.clone())
    }
}
