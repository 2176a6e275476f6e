use std::collections::BTreeMap;

use serde::{Serialize, Serializer};

use crate::config::NOT_SIGNIFICANT;
use crate::period::Period;
use crate::selection::EntityId;

// ---------------------------------------------------------------------------
// RawRow: one store row, before aggregation
// ---------------------------------------------------------------------------

/// A raw time-series row as returned by a [`RowSource`](crate::store::RowSource).
///
/// Rows handed to the aggregator must be sorted by
/// `(entity_name, entity_id, sub_entity_name, sub_entity_id, period)`; see
/// [`RawRow::sort_key`].
#[derive(Debug, Clone, PartialEq)]
pub struct RawRow {
    pub entity_id: EntityId,
    pub entity_name: String,
    pub entity_location: Option<String>,
    pub sub_entity_id: Option<EntityId>,
    pub sub_entity_name: Option<String>,
    pub sub_entity_location: Option<String>,
    pub period: Period,
    pub amount: Option<f64>,
}

impl RawRow {
    /// A top-level row with no sub-entity.
    pub fn new(
        entity_id: EntityId,
        entity_name: &str,
        period: Period,
        amount: Option<f64>,
    ) -> Self {
        Self {
            entity_id,
            entity_name: entity_name.to_string(),
            entity_location: None,
            sub_entity_id: None,
            sub_entity_name: None,
            sub_entity_location: None,
            period,
            amount,
        }
    }

    pub fn with_location(mut self, location: &str) -> Self {
        self.entity_location = Some(location.to_string());
        self
    }

    pub fn with_sub_entity(mut self, id: EntityId, name: &str) -> Self {
        self.sub_entity_id = Some(id);
        self.sub_entity_name = Some(name.to_string());
        self
    }

    /// The ordering the aggregator requires. Rows without a sub-entity sort
    /// before rows with one. Ids break ties between same-named entities.
    pub fn sort_key(&self) -> (&str, EntityId, Option<&str>, Option<EntityId>, Period) {
        (
            self.entity_name.as_str(),
            self.entity_id,
            self.sub_entity_name.as_deref(),
            self.sub_entity_id,
            self.period,
        )
    }
}

/// Stable sort into aggregator order.
pub fn sort_rows(rows: &mut [RawRow]) {
    rows.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
}

// ---------------------------------------------------------------------------
// Amount
// ---------------------------------------------------------------------------

/// How numeric amounts are scaled for output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AmountKind {
    /// Tonnage-like figures: whole numbers, fractional part dropped.
    #[default]
    Whole,
    /// Monetary-like figures: rounded to two fractional digits.
    Hundredths,
    /// Passed through unchanged.
    Exact,
}

impl AmountKind {
    pub fn scale(self, value: f64) -> f64 {
        match self {
            AmountKind::Whole => value.trunc(),
            AmountKind::Hundredths => round_hundredths(value),
            AmountKind::Exact => value,
        }
    }
}

pub(crate) fn round_hundredths(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// A point value: a number, or the "not significant" marker.
///
/// Serialized as a JSON number or the string `"n/s"`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Amount {
    Value(f64),
    NotSignificant,
}

impl Amount {
    /// Map a source amount to its output form.
    ///
    /// Absent and zero amounts become [`Amount::NotSignificant`]; every other
    /// value, negative ones included, stays numeric.
    pub fn from_source(raw: Option<f64>, kind: AmountKind) -> Self {
        match raw {
            Some(v) if v != 0.0 && !v.is_nan() => Amount::Value(kind.scale(v)),
            _ => Amount::NotSignificant,
        }
    }

    pub fn value(&self) -> Option<f64> {
        match self {
            Amount::Value(v) => Some(*v),
            Amount::NotSignificant => None,
        }
    }

    pub fn is_significant(&self) -> bool {
        matches!(self, Amount::Value(_))
    }
}

impl Serialize for Amount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Amount::Value(v) => serialize_number(*v, serializer),
            Amount::NotSignificant => serializer.serialize_str(NOT_SIGNIFICANT),
        }
    }
}

/// Whole values are written as JSON integers, everything else as floats.
fn serialize_number<S: Serializer>(v: f64, serializer: S) -> Result<S::Ok, S::Error> {
    if v.fract() == 0.0 && v.abs() < 9.0e15 {
        serializer.serialize_i64(v as i64)
    } else {
        serializer.serialize_f64(v)
    }
}

// ---------------------------------------------------------------------------
// SeriesPoint
// ---------------------------------------------------------------------------

/// One point of a chart series.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesPoint {
    #[serde(rename = "period")]
    pub label: String,
    #[serde(skip)]
    pub period: Period,
    pub amount: Amount,
}

impl SeriesPoint {
    pub fn new(period: Period, amount: Amount) -> Self {
        Self {
            label: period.chart_label(),
            period,
            amount,
        }
    }

    /// Relabel with the full `"YYYY/Qn"` form.
    pub fn with_full_label(mut self) -> Self {
        self.label = self.period.to_string();
        self
    }
}

/// A point split into year and quarter, as `{"year", "quarter", "amount"}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuarterlyPoint {
    pub year: i32,
    pub quarter: String,
    pub amount: Amount,
}

impl From<&SeriesPoint> for QuarterlyPoint {
    fn from(point: &SeriesPoint) -> Self {
        Self {
            year: point.period.year,
            quarter: point.period.quarter.to_string(),
            amount: point.amount,
        }
    }
}

pub fn quarterly_points(points: &[SeriesPoint]) -> Vec<QuarterlyPoint> {
    points.iter().map(QuarterlyPoint::from).collect()
}

// ---------------------------------------------------------------------------
// EntityBreakdown
// ---------------------------------------------------------------------------

/// Yearly sums keyed by year.
pub type YearlyTotals = BTreeMap<i32, f64>;

/// Sums keyed by period.
pub type PeriodTotals = BTreeMap<Period, f64>;

/// Time series for one entity, with optional sub-entity children.
///
/// When an entity has children its own `points` stay empty; the points live
/// on the children and only the totals roll up.
///
/// Reports never serialize this directly. Each one maps it into the view its
/// front end expects.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityBreakdown {
    pub name: String,
    pub id: Option<EntityId>,
    pub location: Option<String>,
    pub points: Vec<SeriesPoint>,
    pub yearly_totals: YearlyTotals,
    pub children: Vec<EntityBreakdown>,
}

impl EntityBreakdown {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            id: None,
            location: None,
            points: Vec::new(),
            yearly_totals: BTreeMap::new(),
            children: Vec::new(),
        }
    }

    /// Number of points on the longest leaf series under this breakdown.
    pub fn max_leaf_points(&self) -> usize {
        if self.children.is_empty() {
            self.points.len()
        } else {
            self.children
                .iter()
                .map(EntityBreakdown::max_leaf_points)
                .max()
                .unwrap_or(0)
        }
    }
}

/// Writes totals as `{"2021": 123, ...}`, whole values as integers.
pub fn serialize_totals<S: Serializer>(
    totals: &YearlyTotals,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    use serde::ser::SerializeMap;

    let mut map = serializer.serialize_map(Some(totals.len()))?;
    for (year, total) in totals {
        map.serialize_entry(&year.to_string(), &Amount::Value(*total))?;
    }
    map.end()
}

/// Writes totals as `{"2021/Q1": 123, ...}`.
pub fn serialize_period_totals<S: Serializer>(
    totals: &PeriodTotals,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    use serde::ser::SerializeMap;

    let mut map = serializer.serialize_map(Some(totals.len()))?;
    for (period, total) in totals {
        map.serialize_entry(&period.to_string(), &Amount::Value(*total))?;
    }
    map.end()
}
