//! Year/quarter periods, closed period ranges, and the range predicate.
//!
//! A [`PeriodRange`] is resolved from optional request bounds against the
//! min/max period present in a data set. The range then derives a
//! [`PeriodPredicate`] in one of three shapes, depending on how many years
//! the range spans. The same predicate is rendered into SQL by
//! [`SqlBuilder::where_period`](crate::SqlBuilder::where_period) and can be
//! evaluated in memory with [`PeriodPredicate::matches`].

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::config::{MAX_YEAR, MIN_YEAR};
use crate::error::{ReportError, Result};

// ---------------------------------------------------------------------------
// Quarter
// ---------------------------------------------------------------------------

/// A calendar quarter. Ordered `Q1 < Q2 < Q3 < Q4`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Quarter {
    Q1 = 1,
    Q2 = 2,
    Q3 = 3,
    Q4 = 4,
}

impl Quarter {
    pub const ALL: [Quarter; 4] = [Quarter::Q1, Quarter::Q2, Quarter::Q3, Quarter::Q4];

    /// Build a quarter from its number (1-4).
    pub fn from_number(n: i64) -> Result<Self> {
        match n {
            1 => Ok(Quarter::Q1),
            2 => Ok(Quarter::Q2),
            3 => Ok(Quarter::Q3),
            4 => Ok(Quarter::Q4),
            other => Err(ReportError::InvalidArgument(format!(
                "quarter must be between 1 and 4, got {}",
                other
            ))),
        }
    }

    pub fn number(self) -> u8 {
        self as u8
    }
}

impl fmt::Display for Quarter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Q{}", self.number())
    }
}

impl Serialize for Quarter {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_u8(self.number())
    }
}

impl<'de> Deserialize<'de> for Quarter {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let n = i64::deserialize(deserializer)?;
        Quarter::from_number(n).map_err(serde::de::Error::custom)
    }
}

// ---------------------------------------------------------------------------
// Period
// ---------------------------------------------------------------------------

/// A `(year, quarter)` pair. Totally ordered by year, then quarter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Period {
    pub year: i32,
    pub quarter: Quarter,
}

impl Period {
    pub fn new(year: i32, quarter: Quarter) -> Self {
        Self { year, quarter }
    }

    /// Build a period from raw numbers, validating the quarter.
    pub fn from_parts(year: i32, quarter: i64) -> Result<Self> {
        Ok(Self::new(year, Quarter::from_number(quarter)?))
    }

    /// Chart axis label: `"2023/Q1"` for first quarters, bare `"Q2"` otherwise.
    ///
    /// Only Q1 carries the year. Chart renderers consuming this output have
    /// always received the asymmetric form, so it is kept as-is.
    pub fn chart_label(&self) -> String {
        if self.quarter == Quarter::Q1 {
            format!("{}/{}", self.year, self.quarter)
        } else {
            self.quarter.to_string()
        }
    }

    /// Report header form: `"Q3 2021"`.
    pub fn heading(&self) -> String {
        format!("{} {}", self.quarter, self.year)
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.year, self.quarter)
    }
}

/// Parses the period picker form: `"2021/3"` or `"2021/Q3"`.
impl FromStr for Period {
    type Err = ReportError;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || ReportError::InvalidArgument(format!("invalid period '{}'", s));
        let (year, quarter) = s.trim().split_once('/').ok_or_else(invalid)?;
        let quarter = quarter.trim_start_matches(['Q', 'q']);
        let year: i32 = year.parse().map_err(|_| invalid())?;
        let quarter: i64 = quarter.parse().map_err(|_| invalid())?;
        Period::from_parts(year, quarter)
    }
}

// ---------------------------------------------------------------------------
// RangeRequest / DataBounds
// ---------------------------------------------------------------------------

/// Optional range bounds as they arrive on a report request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RangeRequest {
    pub from_year: Option<i32>,
    pub from_quarter: Option<i64>,
    pub to_year: Option<i32>,
    pub to_quarter: Option<i64>,
}

impl RangeRequest {
    pub fn new(from: Period, to: Period) -> Self {
        Self {
            from_year: Some(from.year),
            from_quarter: Some(from.quarter as i64),
            to_year: Some(to.year),
            to_quarter: Some(to.quarter as i64),
        }
    }

    /// Whole-year bounds, for datasets without quarters.
    pub fn years(from_year: Option<i32>, to_year: Option<i32>) -> Self {
        Self {
            from_year,
            to_year,
            ..Self::default()
        }
    }
}

/// The earliest and latest period present in a data set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataBounds {
    pub min: Period,
    pub max: Period,
}

// ---------------------------------------------------------------------------
// PeriodRange
// ---------------------------------------------------------------------------

/// A closed `[from, to]` interval of periods. Always `from <= to`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PeriodRange {
    from: Period,
    to: Period,
}

impl PeriodRange {
    /// Build a range from two periods, rejecting reversed bounds.
    pub fn new(from: Period, to: Period) -> Result<Self> {
        if from > to {
            return Err(ReportError::InvalidRange { from, to });
        }
        Ok(Self { from, to })
    }

    /// Resolve request bounds against the data set bounds.
    ///
    /// Missing years fall back to the data set's min/max year; missing
    /// quarters fall back to Q1 (from) and Q4 (to). Years outside
    /// `MIN_YEAR..=MAX_YEAR` are rejected.
    pub fn resolve(requested: &RangeRequest, bounds: &DataBounds) -> Result<Self> {
        let from_year = checked_year(requested.from_year.unwrap_or(bounds.min.year))?;
        let to_year = checked_year(requested.to_year.unwrap_or(bounds.max.year))?;
        let from = Period::from_parts(from_year, requested.from_quarter.unwrap_or(1))?;
        let to = Period::from_parts(to_year, requested.to_quarter.unwrap_or(4))?;
        Self::new(from, to)
    }

    pub fn from(&self) -> Period {
        self.from
    }

    pub fn to(&self) -> Period {
        self.to
    }

    pub fn case(&self) -> PeriodPredicateCase {
        match i64::from(self.to.year) - i64::from(self.from.year) {
            0 => PeriodPredicateCase::SingleYear,
            1 => PeriodPredicateCase::AdjacentYears,
            _ => PeriodPredicateCase::MultiYearGap,
        }
    }

    pub fn predicate(&self) -> PeriodPredicate {
        PeriodPredicate {
            case: self.case(),
            from: self.from,
            to: self.to,
        }
    }

    /// Human-readable span used in report headers: `"Q1 2021 to Q4 2023"`.
    pub fn describe(&self) -> String {
        format!("{} to {}", self.from.heading(), self.to.heading())
    }
}

fn checked_year(year: i32) -> Result<i32> {
    if (MIN_YEAR..=MAX_YEAR).contains(&year) {
        Ok(year)
    } else {
        Err(ReportError::InvalidArgument(format!(
            "year must be between {} and {}, got {}",
            MIN_YEAR, MAX_YEAR, year
        )))
    }
}

// ---------------------------------------------------------------------------
// PeriodPredicate
// ---------------------------------------------------------------------------

/// Which of the three structurally different range conditions applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeriodPredicateCase {
    /// `to.year == from.year`: one year, quarter bounded on both ends.
    SingleYear,
    /// `to.year - from.year == 1`: two boundary years, no interior.
    AdjacentYears,
    /// `to.year - from.year > 1`: two boundary years plus whole interior years.
    MultiYearGap,
}

/// A period filter derived from a [`PeriodRange`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeriodPredicate {
    pub case: PeriodPredicateCase,
    pub from: Period,
    pub to: Period,
}

impl PeriodPredicate {
    /// Evaluate the predicate branch-by-branch, exactly as the SQL renders it.
    pub fn matches(&self, p: Period) -> bool {
        let (from, to) = (self.from, self.to);
        let lower_edge = p.year == from.year && p.quarter >= from.quarter;
        let upper_edge = p.year == to.year && p.quarter <= to.quarter;
        match self.case {
            PeriodPredicateCase::SingleYear => {
                p.year == from.year && p.quarter >= from.quarter && p.quarter <= to.quarter
            }
            PeriodPredicateCase::AdjacentYears => lower_edge || upper_edge,
            PeriodPredicateCase::MultiYearGap => {
                lower_edge || upper_edge || (p.year > from.year && p.year < to.year)
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Period picker
// ---------------------------------------------------------------------------

/// One entry of the period picker offered to report forms.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodOption {
    pub value: String,
    pub text: String,
}

/// The period picker list: `-All-` followed by every `"YYYY/q"` from
/// `first_year` Q1 through `last_year` Q4.
pub fn period_options(first_year: i32, last_year: i32) -> Vec<PeriodOption> {
    let mut options = vec![PeriodOption {
        value: "0".to_string(),
        text: "-All-".to_string(),
    }];
    for year in first_year..=last_year {
        for quarter in Quarter::ALL {
            let period = format!("{}/{}", year, quarter.number());
            options.push(PeriodOption {
                value: period.clone(),
                text: period,
            });
        }
    }
    options
}
