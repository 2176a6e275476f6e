use std::fmt;

use serde::{Serialize, Serializer};

use crate::models::series::{
    quarterly_points, serialize_totals, EntityBreakdown, QuarterlyPoint, SeriesPoint,
    YearlyTotals,
};
use crate::selection::EntityId;

// ---------------------------------------------------------------------------
// Rgb
// ---------------------------------------------------------------------------

/// A series color. Serialized in CSS form, `"rgb(r,g,b)"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    pub const BLUE: Rgb = Rgb(0, 0, 255);
    pub const RED: Rgb = Rgb(255, 0, 0);
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rgb({},{},{})", self.0, self.1, self.2)
    }
}

impl Serialize for Rgb {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

// ---------------------------------------------------------------------------
// Series views
// ---------------------------------------------------------------------------

/// A series keyed by a plain `name`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NamedSeries {
    pub name: String,
    pub data: Vec<SeriesPoint>,
    pub color: Rgb,
}

/// A series for one product, keyed by `productName`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductSeries {
    pub product_name: String,
    pub data: Vec<SeriesPoint>,
    pub color: Rgb,
}

/// A series for one company, keyed by `companyName` and `companyLocation`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompanySeries {
    pub company_name: String,
    pub company_location: Option<String>,
    pub data: Vec<SeriesPoint>,
    pub color: Rgb,
}

/// Quarterly data for one country under a product.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CountryQuarterly {
    pub country_id: Option<EntityId>,
    pub country_name: String,
    pub quarterly_data: Vec<QuarterlyPoint>,
    #[serde(serialize_with = "serialize_totals")]
    pub yearly_totals: YearlyTotals,
}

/// One product with its per-country breakdown.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductCountryBreakdown {
    pub product_id: Option<EntityId>,
    pub product_name: String,
    pub quarterly_data: Vec<QuarterlyPoint>,
    #[serde(serialize_with = "serialize_totals")]
    pub yearly_totals: YearlyTotals,
    pub country_breakdowns: Vec<CountryQuarterly>,
}

impl From<&EntityBreakdown> for ProductCountryBreakdown {
    fn from(product: &EntityBreakdown) -> Self {
        Self {
            product_id: product.id,
            product_name: product.name.clone(),
            quarterly_data: quarterly_points(&product.points),
            yearly_totals: product.yearly_totals.clone(),
            country_breakdowns: product
                .children
                .iter()
                .map(|country| CountryQuarterly {
                    country_id: country.id,
                    country_name: country.name.clone(),
                    quarterly_data: quarterly_points(&country.points),
                    yearly_totals: country.yearly_totals.clone(),
                })
                .collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// ChartPayload
// ---------------------------------------------------------------------------

/// The shape-specific body of a chart payload.
///
/// Flattened into the payload, so exactly one of `series`, `chartData`,
/// `products`, `companies` or `countryBreakdowns` appears in the JSON.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum PayloadBody {
    Series(Vec<NamedSeries>),
    ChartData(Option<ProductSeries>),
    Products(Vec<ProductSeries>),
    Companies(Vec<CompanySeries>),
    CountryBreakdowns(Vec<ProductCountryBreakdown>),
}

impl PayloadBody {
    pub fn len(&self) -> usize {
        match self {
            PayloadBody::Series(s) => s.len(),
            PayloadBody::ChartData(s) => usize::from(s.is_some()),
            PayloadBody::Products(s) => s.len(),
            PayloadBody::Companies(s) => s.len(),
            PayloadBody::CountryBreakdowns(b) => b.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A chart-ready report payload.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartPayload {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x_axis_title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub y_axis_title: Option<String>,
    pub chart_width: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chart_height: Option<u32>,
    #[serde(flatten)]
    pub body: PayloadBody,
}

impl ChartPayload {
    pub fn titled(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_axes(mut self, x: impl Into<String>, y: impl Into<String>) -> Self {
        self.x_axis_title = Some(x.into());
        self.y_axis_title = Some(y.into());
        self
    }
}
