//! Single-pass aggregation of sorted rows into entity breakdowns.
//!
//! Rows must already be ordered by `(entity_name, entity_id, sub_entity_name,
//! sub_entity_id, period)`. The fold walks them once, opening a new breakdown
//! whenever the entity (or sub-entity) changes, so its cost is linear in the
//! row count and the
//! only state carried between rows is the currently open entity and
//! sub-entity. That state is a local value of each call; nothing is shared
//! between concurrent reports.

use std::collections::BTreeMap;

use tracing::debug;

use crate::error::{ReportError, Result};
use crate::models::series::round_hundredths;
use crate::models::{
    Amount, AmountKind, EntityBreakdown, PeriodTotals, RawRow, SeriesPoint, YearlyTotals,
};

/// Output of [`aggregate`].
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Aggregation {
    /// One breakdown per distinct entity, in input order.
    pub breakdowns: Vec<EntityBreakdown>,
    /// Per-year sum of every numeric point across all entities.
    pub aggregate_totals: YearlyTotals,
}

/// Check the aggregator's ordering precondition in one linear scan.
pub fn ensure_sorted(rows: &[RawRow]) -> Result<()> {
    match rows
        .windows(2)
        .position(|pair| pair[0].sort_key() > pair[1].sort_key())
    {
        Some(i) => Err(ReportError::UnsortedInput { index: i + 1 }),
        None => Ok(()),
    }
}

/// Fold sorted rows into breakdowns.
///
/// - A point is [`Amount::NotSignificant`] iff the source amount is absent or
///   zero; other values are scaled per `kind`.
/// - Numeric points add into the leaf's yearly totals, the parent entity's
///   totals and the aggregate totals.
/// - Entities without rows never appear; entities whose rows are all
///   not-significant appear with empty totals.
///
/// Fails only with [`ReportError::UnsortedInput`].
pub fn aggregate(rows: &[RawRow], kind: AmountKind) -> Result<Aggregation> {
    ensure_sorted(rows)?;
    let aggregation = rows.iter().fold(Fold::new(kind), Fold::push).finish();
    debug!(
        rows = rows.len(),
        entities = aggregation.breakdowns.len(),
        "aggregated rows"
    );
    Ok(aggregation)
}

/// Sum per-entity yearly totals across breakdowns.
///
/// For breakdowns produced by [`aggregate`] this equals
/// [`Aggregation::aggregate_totals`].
pub fn aggregate_totals(breakdowns: &[EntityBreakdown], kind: AmountKind) -> YearlyTotals {
    let mut totals = YearlyTotals::new();
    for breakdown in breakdowns {
        for (year, value) in &breakdown.yearly_totals {
            add_total(&mut totals, *year, *value, kind);
        }
    }
    totals
}

/// Sum every numeric leaf point across breakdowns, per period.
pub fn period_totals(breakdowns: &[EntityBreakdown], kind: AmountKind) -> PeriodTotals {
    fn walk(breakdown: &EntityBreakdown, kind: AmountKind, totals: &mut PeriodTotals) {
        for point in &breakdown.points {
            if let Some(value) = point.amount.value() {
                add_total(totals, point.period, value, kind);
            }
        }
        for child in &breakdown.children {
            walk(child, kind, totals);
        }
    }

    let mut totals = PeriodTotals::new();
    for breakdown in breakdowns {
        walk(breakdown, kind, &mut totals);
    }
    totals
}

fn add_total<K: Ord>(totals: &mut BTreeMap<K, f64>, key: K, value: f64, kind: AmountKind) {
    let total = totals.entry(key).or_insert(0.0);
    *total = match kind {
        AmountKind::Hundredths => round_hundredths(*total + value),
        AmountKind::Whole | AmountKind::Exact => *total + value,
    };
}

// ---------------------------------------------------------------------------
// Fold state
// ---------------------------------------------------------------------------

struct Fold {
    kind: AmountKind,
    done: Vec<EntityBreakdown>,
    open: Option<OpenEntity>,
    totals: YearlyTotals,
}

impl Fold {
    fn new(kind: AmountKind) -> Self {
        Self {
            kind,
            done: Vec::new(),
            open: None,
            totals: YearlyTotals::new(),
        }
    }

    fn push(mut self, row: &RawRow) -> Self {
        let mut open = match self.open.take() {
            Some(open) if open.holds(row) => open,
            previous => {
                if let Some(previous) = previous {
                    self.done.push(previous.close());
                }
                OpenEntity::start(row)
            }
        };

        let amount = Amount::from_source(row.amount, self.kind);
        open.push(row, amount, self.kind);
        if let Some(value) = amount.value() {
            add_total(&mut self.totals, row.period.year, value, self.kind);
        }

        self.open = Some(open);
        self
    }

    fn finish(mut self) -> Aggregation {
        if let Some(open) = self.open.take() {
            self.done.push(open.close());
        }
        Aggregation {
            breakdowns: self.done,
            aggregate_totals: self.totals,
        }
    }
}

struct OpenEntity {
    entity: EntityBreakdown,
    sub: Option<EntityBreakdown>,
}

impl OpenEntity {
    fn start(row: &RawRow) -> Self {
        let mut entity = EntityBreakdown::new(&row.entity_name);
        entity.id = Some(row.entity_id);
        entity.location = row.entity_location.clone();
        Self { entity, sub: None }
    }

    fn holds(&self, row: &RawRow) -> bool {
        self.entity.id == Some(row.entity_id) && self.entity.name == row.entity_name
    }

    fn push(&mut self, row: &RawRow, amount: Amount, kind: AmountKind) {
        let point = SeriesPoint::new(row.period, amount);
        let year = row.period.year;

        match row.sub_entity_name.as_deref() {
            None => {
                self.close_sub();
                self.entity.points.push(point);
            }
            Some(name) => {
                let same_sub = self
                    .sub
                    .as_ref()
                    .is_some_and(|sub| sub.name == name && sub.id == row.sub_entity_id);
                if !same_sub {
                    self.close_sub();
                    let mut sub = EntityBreakdown::new(name);
                    sub.id = row.sub_entity_id;
                    sub.location = row.sub_entity_location.clone();
                    self.sub = Some(sub);
                }
                if let Some(sub) = self.sub.as_mut() {
                    sub.points.push(point);
                    if let Some(value) = amount.value() {
                        add_total(&mut sub.yearly_totals, year, value, kind);
                    }
                }
            }
        }

        if let Some(value) = amount.value() {
            add_total(&mut self.entity.yearly_totals, year, value, kind);
        }
    }

    fn close_sub(&mut self) {
        if let Some(sub) = self.sub.take() {
            self.entity.children.push(sub);
        }
    }

    fn close(mut self) -> EntityBreakdown {
        self.close_sub();
        self.entity
    }
}
