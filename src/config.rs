//! Engine defaults and the static table catalog of the DuckDB store.
//!
//! Table and column identifiers used in generated SQL come only from here;
//! request values are always bound as parameters.

pub const MIN_CHART_WIDTH: u32 = 800;
pub const POINT_WIDTH: u32 = 40;
pub const MIN_STACKED_HEIGHT: u32 = 450;
pub const SERIES_ROW_HEIGHT: u32 = 30;
pub const STACKED_HEIGHT_PADDING: u32 = 60;

pub const DEFAULT_MAX_CONCURRENT_FETCHES: usize = 4;
pub const DEFAULT_FETCH_RETRIES: u32 = 0;

/// First year offered by the period picker.
pub const FIRST_PICKER_YEAR: i32 = 2015;

/// Requested years outside this window are rejected.
pub const MIN_YEAR: i32 = 1900;
pub const MAX_YEAR: i32 = 2200;

pub const NOT_SIGNIFICANT: &str = "n/s";

// ---------------------------------------------------------------------------
// Entities
// ---------------------------------------------------------------------------

/// The kinds of entity a report can break data down by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Product,
    Company,
    Country,
}

/// Catalog table holding the names of one entity kind.
#[derive(Debug, Clone, Copy)]
pub struct EntityTable {
    pub table: &'static str,
    pub id_col: &'static str,
    pub name_col: &'static str,
    pub location_col: Option<&'static str>,
}

impl EntityKind {
    pub fn table(self) -> EntityTable {
        match self {
            EntityKind::Product => EntityTable {
                table: "products",
                id_col: "pr_id",
                name_col: "pr_name",
                location_col: None,
            },
            EntityKind::Company => EntityTable {
                table: "companies",
                id_col: "comp_id",
                name_col: "comp_name",
                location_col: Some("comp_location"),
            },
            EntityKind::Country => EntityTable {
                table: "countries",
                id_col: "cu_id",
                name_col: "cu_name",
                location_col: None,
            },
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            EntityKind::Product => "product",
            EntityKind::Company => "company",
            EntityKind::Country => "country",
        }
    }
}

/// Per-product plant details for companies, joined into sales reports.
#[derive(Debug, Clone, Copy)]
pub struct CompanyDescriptionTable {
    pub table: &'static str,
    pub company_col: &'static str,
    pub product_col: &'static str,
    pub start_date_col: &'static str,
    pub technology_col: &'static str,
    pub feedstock_col: &'static str,
}

pub const COMPANY_DESCRIPTIONS: CompanyDescriptionTable = CompanyDescriptionTable {
    table: "company_descriptions",
    company_col: "comp_id",
    product_col: "pr_id",
    start_date_col: "start_date",
    technology_col: "comp_tech",
    feedstock_col: "comp_feed_stock",
};

// ---------------------------------------------------------------------------
// Datasets
// ---------------------------------------------------------------------------

/// A fact table, quarterly unless noted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dataset {
    /// Production tonnage per product, company and quarter.
    Production,
    /// Company turnover per quarter.
    Turnover,
    /// Company operating (gross) profit per quarter.
    OperatingProfit,
    /// Olefins and polyolefins production per product, country and quarter.
    OlefinsPolyolefins,
    /// Polish chemical production per product and quarter.
    PolishChemical,
    /// Polish chemical exports per product, destination country and year.
    PolishChemicalExports,
    /// Polish chemical imports per product, origin country and year.
    PolishChemicalImports,
    /// Russian domestic sales per product, company and quarter.
    RussiaDomesticSales,
}

#[derive(Debug, Clone, Copy)]
pub struct FactTable {
    pub table: &'static str,
    pub year_col: &'static str,
    /// `None` for yearly tables.
    pub quarter_col: Option<&'static str>,
    pub amount_col: &'static str,
    product_col: Option<&'static str>,
    company_col: Option<&'static str>,
    country_col: Option<&'static str>,
}

impl FactTable {
    /// The foreign-key column for an entity kind, if this table has one.
    pub fn entity_col(&self, kind: EntityKind) -> Option<&'static str> {
        match kind {
            EntityKind::Product => self.product_col,
            EntityKind::Company => self.company_col,
            EntityKind::Country => self.country_col,
        }
    }
}

impl Dataset {
    pub fn table(self) -> FactTable {
        match self {
            Dataset::Production => FactTable {
                table: "production",
                year_col: "period_year",
                quarter_col: Some("period_quarter"),
                amount_col: "period_amount",
                product_col: Some("pro_id"),
                company_col: Some("comp_id"),
                country_col: None,
            },
            Dataset::Turnover => FactTable {
                table: "turnover_finance",
                year_col: "tf_year",
                quarter_col: Some("tf_quarter"),
                amount_col: "tf_amount",
                product_col: None,
                company_col: Some("comp_id"),
                country_col: None,
            },
            Dataset::OperatingProfit => FactTable {
                table: "gross_finance",
                year_col: "gf_year",
                quarter_col: Some("gf_quarter"),
                amount_col: "gf_amount",
                product_col: None,
                company_col: Some("comp_id"),
                country_col: None,
            },
            Dataset::OlefinsPolyolefins => FactTable {
                table: "olefins_polyolefins",
                year_col: "op_year",
                quarter_col: Some("op_quarter"),
                amount_col: "op_amount",
                product_col: Some("pro_id"),
                company_col: None,
                country_col: Some("cun_id"),
            },
            Dataset::PolishChemical => FactTable {
                table: "polish_chemical",
                year_col: "pc_year",
                quarter_col: Some("pc_quarter"),
                amount_col: "pc_amount",
                product_col: Some("pro_id"),
                company_col: None,
                country_col: None,
            },
            Dataset::PolishChemicalExports => FactTable {
                table: "polish_chemical_exports",
                year_col: "pc_year",
                quarter_col: None,
                amount_col: "pc_amount",
                product_col: Some("pro_id"),
                company_col: None,
                country_col: Some("cun_id"),
            },
            Dataset::PolishChemicalImports => FactTable {
                table: "polish_chemical_imports",
                year_col: "pc_year",
                quarter_col: None,
                amount_col: "pc_amount",
                product_col: Some("pro_id"),
                company_col: None,
                country_col: Some("cun_id"),
            },
            Dataset::RussiaDomesticSales => FactTable {
                table: "russia_domestic_sales",
                year_col: "re_year",
                quarter_col: Some("re_quarter"),
                amount_col: "re_amount",
                product_col: Some("pro_id"),
                company_col: Some("comp_id"),
                country_col: None,
            },
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Dataset::Production => "production",
            Dataset::Turnover => "turnover",
            Dataset::OperatingProfit => "operating_profit",
            Dataset::OlefinsPolyolefins => "olefins_polyolefins",
            Dataset::PolishChemical => "polish_chemical",
            Dataset::PolishChemicalExports => "polish_chemical_exports",
            Dataset::PolishChemicalImports => "polish_chemical_imports",
            Dataset::RussiaDomesticSales => "russia_domestic_sales",
        }
    }
}
