//! Period, range resolution and predicate tests.

mod common;

use common::period;
use proptest::prelude::*;
use statdb_reports::{
    period_options, DataBounds, Period, PeriodPredicateCase, PeriodRange, Quarter, RangeRequest,
    ReportError,
};

fn bounds() -> DataBounds {
    DataBounds {
        min: period(2019, 3),
        max: period(2024, 2),
    }
}

// ---------------------------------------------------------------------------
// Quarter / Period
// ---------------------------------------------------------------------------

#[test]
fn quarter_from_number_rejects_out_of_range() {
    assert_eq!(Quarter::from_number(3).unwrap(), Quarter::Q3);
    assert!(matches!(Quarter::from_number(0), Err(ReportError::InvalidArgument(_))));
    assert!(matches!(Quarter::from_number(5), Err(ReportError::InvalidArgument(_))));
}

#[test]
fn periods_order_by_year_then_quarter() {
    assert!(period(2021, 4) < period(2022, 1));
    assert!(period(2022, 1) < period(2022, 2));
    assert_eq!(period(2022, 3), Period::new(2022, Quarter::Q3));
}

#[test]
fn chart_label_carries_year_only_on_first_quarter() {
    assert_eq!(period(2023, 1).chart_label(), "2023/Q1");
    assert_eq!(period(2023, 2).chart_label(), "Q2");
    assert_eq!(period(2023, 4).chart_label(), "Q4");
}

#[test]
fn period_parses_picker_values() {
    assert_eq!("2021/3".parse::<Period>().unwrap(), period(2021, 3));
    assert_eq!("2021/Q4".parse::<Period>().unwrap(), period(2021, 4));
    assert!("2021".parse::<Period>().is_err());
    assert!("2021/7".parse::<Period>().is_err());
}

// ---------------------------------------------------------------------------
// PeriodRange::resolve
// ---------------------------------------------------------------------------

#[test]
fn resolve_defaults_missing_bounds_to_data_years() {
    let range = PeriodRange::resolve(&RangeRequest::default(), &bounds()).unwrap();
    // Years come from the data; quarters default to Q1 and Q4.
    assert_eq!(range.from(), period(2019, 1));
    assert_eq!(range.to(), period(2024, 4));
}

#[test]
fn resolve_keeps_requested_bounds() {
    let requested = RangeRequest {
        from_year: Some(2021),
        from_quarter: Some(2),
        to_year: None,
        to_quarter: Some(3),
    };
    let range = PeriodRange::resolve(&requested, &bounds()).unwrap();
    assert_eq!(range.from(), period(2021, 2));
    assert_eq!(range.to(), period(2024, 3));
}

#[test]
fn resolve_rejects_reversed_range() {
    let requested = RangeRequest::new(period(2023, 1), period(2022, 4));
    let err = PeriodRange::resolve(&requested, &bounds()).unwrap_err();
    assert!(matches!(err, ReportError::InvalidRange { .. }));
    assert!(err.is_validation());
}

#[test]
fn resolve_rejects_invalid_quarter() {
    let requested = RangeRequest {
        from_quarter: Some(9),
        ..Default::default()
    };
    assert!(matches!(
        PeriodRange::resolve(&requested, &bounds()),
        Err(ReportError::InvalidArgument(_))
    ));
}

#[test]
fn resolve_rejects_years_outside_the_window() {
    for year in [i32::MIN, -1, 1899, 2201, i32::MAX] {
        let requested = RangeRequest {
            from_year: Some(year),
            ..Default::default()
        };
        let err = PeriodRange::resolve(&requested, &bounds()).unwrap_err();
        assert!(matches!(err, ReportError::InvalidArgument(_)), "{year}");

        let requested = RangeRequest {
            to_year: Some(year),
            ..Default::default()
        };
        let err = PeriodRange::resolve(&requested, &bounds()).unwrap_err();
        assert!(matches!(err, ReportError::InvalidArgument(_)), "{year}");
    }

    let edges = RangeRequest::years(Some(1900), Some(2200));
    let range = PeriodRange::resolve(&edges, &bounds()).unwrap();
    assert_eq!(range.from(), period(1900, 1));
    assert_eq!(range.to(), period(2200, 4));
}

#[test]
fn widest_range_classifies_without_overflow() {
    let range = PeriodRange::new(
        Period::new(i32::MIN, Quarter::Q1),
        Period::new(i32::MAX, Quarter::Q4),
    )
    .unwrap();
    assert_eq!(range.case(), PeriodPredicateCase::MultiYearGap);
}

#[test]
fn range_request_deserializes_camel_case() {
    let requested: RangeRequest =
        serde_json::from_str(r#"{"fromYear": 2021, "toYear": 2022, "toQuarter": 2}"#).unwrap();
    assert_eq!(requested.from_year, Some(2021));
    assert_eq!(requested.from_quarter, None);
    assert_eq!(requested.to_quarter, Some(2));
}

// ---------------------------------------------------------------------------
// Predicate cases
// ---------------------------------------------------------------------------

#[test]
fn single_year_range_bounds_quarters_on_both_ends() {
    let range = PeriodRange::new(period(2022, 2), period(2022, 3)).unwrap();
    let pred = range.predicate();
    assert_eq!(pred.case, PeriodPredicateCase::SingleYear);
    assert!(!pred.matches(period(2022, 1)));
    assert!(pred.matches(period(2022, 2)));
    assert!(pred.matches(period(2022, 3)));
    assert!(!pred.matches(period(2022, 4)));
    assert!(!pred.matches(period(2021, 3)));
}

#[test]
fn adjacent_years_cover_only_boundary_quarters() {
    let range = PeriodRange::new(period(2021, 3), period(2022, 2)).unwrap();
    let pred = range.predicate();
    assert_eq!(pred.case, PeriodPredicateCase::AdjacentYears);
    assert!(!pred.matches(period(2021, 2)));
    assert!(pred.matches(period(2021, 4)));
    assert!(pred.matches(period(2022, 1)));
    assert!(!pred.matches(period(2022, 3)));
}

#[test]
fn multi_year_range_includes_interior_years_unconditionally() {
    let range = PeriodRange::new(period(2021, 2), period(2023, 3)).unwrap();
    let pred = range.predicate();
    assert_eq!(pred.case, PeriodPredicateCase::MultiYearGap);
    for quarter in 1..=4 {
        assert!(pred.matches(period(2022, quarter)));
    }
    assert!(!pred.matches(period(2021, 1)));
    assert!(pred.matches(period(2021, 2)));
    assert!(pred.matches(period(2023, 3)));
    assert!(!pred.matches(period(2023, 4)));
}

#[test]
fn describe_uses_quarter_headings() {
    let range = PeriodRange::new(period(2021, 4), period(2022, 2)).unwrap();
    assert_eq!(range.describe(), "Q4 2021 to Q2 2022");
    assert_eq!(range.from().heading(), "Q4 2021");
    assert_eq!(range.to().to_string(), "2022/Q2");
}

// ---------------------------------------------------------------------------
// Period picker
// ---------------------------------------------------------------------------

#[test]
fn period_options_start_with_all_entry() {
    let options = period_options(2022, 2023);
    assert_eq!(options.len(), 1 + 8);
    assert_eq!(options[0].value, "0");
    assert_eq!(options[0].text, "-All-");
    assert_eq!(options[1].value, "2022/1");
    assert_eq!(options[8].text, "2023/4");
}

// ---------------------------------------------------------------------------
// Properties
// ---------------------------------------------------------------------------

fn any_period() -> impl Strategy<Value = Period> {
    (2015i32..2030, 1i64..=4).prop_map(|(y, q)| Period::from_parts(y, q).unwrap())
}

proptest! {
    #[test]
    fn predicate_matches_exactly_the_closed_range(
        a in any_period(),
        b in any_period(),
        p in any_period(),
    ) {
        let (from, to) = if a <= b { (a, b) } else { (b, a) };
        let range = PeriodRange::new(from, to).unwrap();
        prop_assert_eq!(range.predicate().matches(p), from <= p && p <= to);
    }
}
