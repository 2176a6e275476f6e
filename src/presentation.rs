//! Turns aggregated breakdowns into chart-ready payloads.
//!
//! [`present`] is pure apart from the injected [`ColorSource`]: the same
//! breakdowns, shape and color sequence always give the same payload.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::{
    MIN_CHART_WIDTH, MIN_STACKED_HEIGHT, POINT_WIDTH, SERIES_ROW_HEIGHT, STACKED_HEIGHT_PADDING,
};
use crate::models::{
    ChartPayload, CompanySeries, EntityBreakdown, NamedSeries, PayloadBody,
    ProductCountryBreakdown, ProductSeries, Rgb,
};

/// The layout a report asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChartShape {
    /// Named series under `series`.
    SingleSeries,
    /// The first breakdown alone under `chartData`, or `null` without one.
    SingleEntity,
    /// One series per product under `products`.
    PerEntitySeries,
    /// One series per company under `companies`, stacked, with a computed height.
    StackedMultiSeries,
    /// Product to country tree under `countryBreakdowns`.
    NestedBreakdown,
}

// ---------------------------------------------------------------------------
// Colors
// ---------------------------------------------------------------------------

/// Supplies one color per emitted series.
pub trait ColorSource: Send {
    fn next_color(&mut self) -> Rgb;
}

/// Random pastel-ish colors: red in `[100, 255)`, green in `[100, 200)`,
/// blue in `[100, 155)`.
pub struct RandomColors {
    rng: StdRng,
}

impl RandomColors {
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// A reproducible color sequence.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Default for RandomColors {
    fn default() -> Self {
        Self::new()
    }
}

impl ColorSource for RandomColors {
    fn next_color(&mut self) -> Rgb {
        Rgb(
            self.rng.gen_range(100..255),
            self.rng.gen_range(100..200),
            self.rng.gen_range(100..155),
        )
    }
}

/// Cycles through a fixed list of colors.
#[derive(Debug, Clone)]
pub struct Palette {
    colors: Vec<Rgb>,
    next: usize,
}

impl Palette {
    /// An empty list falls back to the default palette.
    pub fn new(colors: Vec<Rgb>) -> Self {
        if colors.is_empty() {
            return Self::default();
        }
        Self { colors, next: 0 }
    }
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            colors: vec![
                Rgb(54, 162, 235),
                Rgb(255, 99, 132),
                Rgb(255, 159, 64),
                Rgb(75, 192, 192),
                Rgb(153, 102, 255),
                Rgb(201, 203, 207),
            ],
            next: 0,
        }
    }
}

impl ColorSource for Palette {
    fn next_color(&mut self) -> Rgb {
        let color = self.colors[self.next % self.colors.len()];
        self.next += 1;
        color
    }
}

// ---------------------------------------------------------------------------
// Sizing
// ---------------------------------------------------------------------------

/// `max(800, max_points * 40)`.
pub fn chart_width(max_points: usize) -> u32 {
    let wanted = u32::try_from(max_points)
        .unwrap_or(u32::MAX)
        .saturating_mul(POINT_WIDTH);
    wanted.max(MIN_CHART_WIDTH)
}

/// `max(450, series_count * 30 + 60)`, for stacked charts.
pub fn chart_height(series_count: usize) -> u32 {
    let wanted = u32::try_from(series_count)
        .unwrap_or(u32::MAX)
        .saturating_mul(SERIES_ROW_HEIGHT)
        .saturating_add(STACKED_HEIGHT_PADDING);
    wanted.max(MIN_STACKED_HEIGHT)
}

// ---------------------------------------------------------------------------
// present
// ---------------------------------------------------------------------------

/// Build the payload for `breakdowns` in the requested shape.
///
/// Flat shapes take one series per breakdown from its own points and draw one
/// color per series, in order. The title is left empty for the caller to set.
pub fn present(
    breakdowns: &[EntityBreakdown],
    shape: ChartShape,
    colors: &mut dyn ColorSource,
) -> ChartPayload {
    let max_points = breakdowns
        .iter()
        .map(EntityBreakdown::max_leaf_points)
        .max()
        .unwrap_or(0);

    let body = match shape {
        ChartShape::SingleSeries => PayloadBody::Series(
            breakdowns
                .iter()
                .map(|b| NamedSeries {
                    name: b.name.clone(),
                    data: b.points.clone(),
                    color: colors.next_color(),
                })
                .collect(),
        ),
        ChartShape::SingleEntity => {
            PayloadBody::ChartData(breakdowns.first().map(|b| product_series(b, colors)))
        }
        ChartShape::PerEntitySeries => PayloadBody::Products(
            breakdowns
                .iter()
                .map(|b| product_series(b, colors))
                .collect(),
        ),
        ChartShape::StackedMultiSeries => PayloadBody::Companies(
            breakdowns
                .iter()
                .map(|b| CompanySeries {
                    company_name: b.name.clone(),
                    company_location: b.location.clone(),
                    data: b.points.clone(),
                    color: colors.next_color(),
                })
                .collect(),
        ),
        ChartShape::NestedBreakdown => {
            PayloadBody::CountryBreakdowns(nested_breakdowns(breakdowns))
        }
    };

    let height = match shape {
        ChartShape::StackedMultiSeries => Some(chart_height(body.len())),
        _ => None,
    };

    ChartPayload {
        title: String::new(),
        x_axis_title: None,
        y_axis_title: None,
        chart_width: chart_width(max_points),
        chart_height: height,
        body,
    }
}

/// Product to country view of two-level breakdowns.
pub fn nested_breakdowns(breakdowns: &[EntityBreakdown]) -> Vec<ProductCountryBreakdown> {
    breakdowns.iter().map(ProductCountryBreakdown::from).collect()
}

fn product_series(breakdown: &EntityBreakdown, colors: &mut dyn ColorSource) -> ProductSeries {
    ProductSeries {
        product_name: breakdown.name.clone(),
        data: breakdown.points.clone(),
        color: colors.next_color(),
    }
}
