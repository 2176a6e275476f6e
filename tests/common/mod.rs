//! Shared test fixtures for the statdb-reports integration tests.
//!
//! Provides `setup_sample_db()` which opens an in-memory DuckDB database
//! populated with small catalog and fact tables via NDJSON temp files, plus
//! helpers for building raw rows by hand.

#![allow(dead_code)]

use statdb_reports::{Connection, Period, Quarter, RawRow, StatDb};
use std::io::Write;
use tempfile::NamedTempFile;

/// An in-memory `StatDb` with the sample tables loaded.
///
/// Sample data, in short:
/// - products: Ethylene(1), Polyethylene(2), Propylene(3), Benzene(4)
/// - companies: Orlen[Plock](1), Azoty[Tarnow](2), Basell[Wesseling](3)
/// - countries: Poland(1), Czechia(2), Slovakia(3), United Kingdom(4)
/// - production from 2021/Q1 to 2022/Q2, turnover from 2021/Q1 to 2022/Q1,
///   olefins from 2022/Q1 to 2023/Q1, polish chemical from 2021/Q1 to
///   2022/Q1, exports and imports in 2021 and 2022 (yearly), russian sales in
///   2022
pub fn setup_sample_db() -> StatDb {
    let db = StatDb::builder().max_concurrent_fetches(2).build().unwrap();
    let conn = db.connection();

    // -- catalog tables -------------------------------------------------------
    register_products(conn);
    register_companies(conn);
    register_countries(conn);

    // -- fact tables ----------------------------------------------------------
    register_production(conn);
    register_finance(conn);
    register_olefins(conn);
    register_polish_chemical(conn);
    register_trade(conn);
    register_russia(conn);

    db
}

fn register_products(conn: &Connection) {
    let rows = vec![
        serde_json::json!({"pr_id": 1, "pr_name": "Ethylene"}),
        serde_json::json!({"pr_id": 2, "pr_name": "Polyethylene"}),
        serde_json::json!({"pr_id": 3, "pr_name": "Propylene"}),
        serde_json::json!({"pr_id": 4, "pr_name": "Benzene"}),
    ];
    write_ndjson_and_register(conn, "products", &rows);
}

fn register_companies(conn: &Connection) {
    let rows = vec![
        serde_json::json!({"comp_id": 1, "comp_name": "Orlen", "comp_location": "Plock"}),
        serde_json::json!({"comp_id": 2, "comp_name": "Azoty", "comp_location": "Tarnow"}),
        serde_json::json!({
            "comp_id": 3,
            "comp_name": "Basell",
            "comp_location": "Wesseling"
        }),
    ];
    write_ndjson_and_register(conn, "companies", &rows);
}

fn register_countries(conn: &Connection) {
    let rows = vec![
        serde_json::json!({"cu_id": 1, "cu_name": "Poland"}),
        serde_json::json!({"cu_id": 2, "cu_name": "Czechia"}),
        serde_json::json!({"cu_id": 3, "cu_name": "Slovakia"}),
        serde_json::json!({"cu_id": 4, "cu_name": "United Kingdom"}),
    ];
    write_ndjson_and_register(conn, "countries", &rows);
}

fn production(
    pro_id: i64,
    comp_id: i64,
    year: i32,
    quarter: u8,
    amount: Option<f64>,
) -> serde_json::Value {
    serde_json::json!({
        "pro_id": pro_id,
        "comp_id": comp_id,
        "period_year": year,
        "period_quarter": quarter,
        "period_amount": amount
    })
}

fn register_production(conn: &Connection) {
    let rows = vec![
        // Orlen / Ethylene
        production(1, 1, 2021, 1, Some(100.0)),
        production(1, 1, 2021, 2, Some(110.0)),
        production(1, 1, 2021, 3, Some(0.0)),
        production(1, 1, 2021, 4, Some(130.0)),
        production(1, 1, 2022, 1, Some(140.5)),
        production(1, 1, 2022, 2, None),
        // Orlen / Propylene
        production(3, 1, 2021, 2, Some(50.0)),
        production(3, 1, 2022, 1, Some(60.0)),
        // Azoty / Ethylene
        production(1, 2, 2021, 1, Some(20.0)),
        production(1, 2, 2021, 2, Some(30.0)),
        // Azoty / Polyethylene
        production(2, 2, 2021, 1, Some(7.0)),
        // Basell / Ethylene
        production(1, 3, 2021, 1, Some(5.0)),
    ];
    write_ndjson_and_register(conn, "production", &rows);
}

fn register_finance(conn: &Connection) {
    let turnover = vec![
        serde_json::json!({"comp_id": 1, "tf_year": 2021, "tf_quarter": 1, "tf_amount": 10.5}),
        serde_json::json!({"comp_id": 1, "tf_year": 2021, "tf_quarter": 2, "tf_amount": 20.25}),
        serde_json::json!({"comp_id": 1, "tf_year": 2022, "tf_quarter": 1, "tf_amount": 5.125}),
        serde_json::json!({"comp_id": 2, "tf_year": 2021, "tf_quarter": 1, "tf_amount": 1.5}),
        serde_json::json!({"comp_id": 2, "tf_year": 2021, "tf_quarter": 2, "tf_amount": 0.0}),
    ];
    write_ndjson_and_register(conn, "turnover_finance", &turnover);

    let gross = vec![
        serde_json::json!({"comp_id": 1, "gf_year": 2021, "gf_quarter": 1, "gf_amount": 2.5}),
        serde_json::json!({"comp_id": 2, "gf_year": 2021, "gf_quarter": 1, "gf_amount": -1.25}),
        serde_json::json!({"comp_id": 3, "gf_year": 2021, "gf_quarter": 2, "gf_amount": 3.5}),
    ];
    write_ndjson_and_register(conn, "gross_finance", &gross);
}

fn olefins(pro_id: i64, cun_id: i64, year: i32, quarter: u8, amount: f64) -> serde_json::Value {
    serde_json::json!({
        "pro_id": pro_id,
        "cun_id": cun_id,
        "op_year": year,
        "op_quarter": quarter,
        "op_amount": amount
    })
}

fn register_olefins(conn: &Connection) {
    let rows = vec![
        olefins(1, 1, 2022, 1, 10.456),
        olefins(1, 1, 2022, 2, 0.0),
        olefins(1, 2, 2022, 1, 5.0),
        olefins(2, 1, 2022, 1, 3.5),
        olefins(2, 1, 2023, 1, 4.0),
    ];
    write_ndjson_and_register(conn, "olefins_polyolefins", &rows);
}

fn register_polish_chemical(conn: &Connection) {
    let row = |pro_id: i64, year: i32, quarter: u8, amount: f64| {
        serde_json::json!({
            "pro_id": pro_id,
            "pc_year": year,
            "pc_quarter": quarter,
            "pc_amount": amount
        })
    };
    let rows = vec![
        // Ethylene
        row(1, 2021, 1, 12.5),
        row(1, 2021, 2, 0.0),
        row(1, 2022, 1, 20.25),
        // Propylene
        row(3, 2021, 1, 7.5),
        row(3, 2021, 2, 3.0),
    ];
    write_ndjson_and_register(conn, "polish_chemical", &rows);
}

fn register_trade(conn: &Connection) {
    let row = |pro_id: i64, cun_id: i64, year: i32, amount: f64| {
        serde_json::json!({
            "pro_id": pro_id,
            "cun_id": cun_id,
            "pc_year": year,
            "pc_amount": amount
        })
    };
    let exports = vec![
        // Ethylene to Poland, Czechia and the United Kingdom
        row(1, 1, 2021, 100.5),
        row(1, 2, 2021, 50.0),
        row(1, 4, 2022, 30.0),
        row(1, 2, 2022, 0.0),
        // Polyethylene, nothing significant
        row(2, 1, 2021, 0.0),
    ];
    write_ndjson_and_register(conn, "polish_chemical_exports", &exports);

    let imports = vec![
        row(1, 1, 2021, 10.456),
        row(1, 3, 2021, 5.0),
        row(3, 1, 2022, 2.0),
    ];
    write_ndjson_and_register(conn, "polish_chemical_imports", &imports);
}

fn register_russia(conn: &Connection) {
    let row = |pro_id: i64, comp_id: i64, quarter: u8, amount: Option<f64>| {
        serde_json::json!({
            "pro_id": pro_id,
            "comp_id": comp_id,
            "re_year": 2022,
            "re_quarter": quarter,
            "re_amount": amount
        })
    };
    let sales = vec![
        row(1, 1, 1, Some(40.0)),
        row(1, 1, 2, None),
        row(1, 2, 1, Some(10.5)),
        row(3, 2, 2, Some(0.0)),
    ];
    write_ndjson_and_register(conn, "russia_domestic_sales", &sales);

    let descriptions = vec![serde_json::json!({
        "comp_id": 1,
        "pr_id": 1,
        "start_date": "2019-05-01",
        "comp_tech": "Steam cracking",
        "comp_feed_stock": "Naphtha"
    })];
    write_ndjson_and_register(conn, "company_descriptions", &descriptions);
}

pub fn write_ndjson_and_register(
    conn: &Connection,
    table_name: &str,
    rows: &[serde_json::Value],
) {
    let mut file = NamedTempFile::new().unwrap();
    for row in rows {
        writeln!(file, "{}", serde_json::to_string(row).unwrap()).unwrap();
    }
    file.flush().unwrap();

    let path = file.path().to_str().unwrap();
    conn.register_table_from_ndjson(table_name, path).unwrap();
    // DuckDB has copied the rows into a table by now, so the temp file can go.
}

// ---------------------------------------------------------------------------
// Hand-built rows
// ---------------------------------------------------------------------------

pub fn period(year: i32, quarter: u8) -> Period {
    Period::from_parts(year, quarter as i64).unwrap()
}

pub fn row(entity: &str, year: i32, quarter: u8, amount: Option<f64>) -> RawRow {
    RawRow::new(entity_id(entity), entity, period(year, quarter), amount)
}

pub fn sub_row(
    entity: &str,
    sub: &str,
    year: i32,
    quarter: u8,
    amount: Option<f64>,
) -> RawRow {
    row(entity, year, quarter, amount).with_sub_entity(entity_id(sub), sub)
}

/// Stable fake id derived from the name.
fn entity_id(name: &str) -> i64 {
    name.bytes().map(i64::from).sum()
}

pub fn q1(year: i32) -> Period {
    Period::new(year, Quarter::Q1)
}
