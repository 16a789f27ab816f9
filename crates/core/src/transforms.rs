//! Derived columns, the product join and revenue aggregations

use std::borrow::Cow;
use std::collections::BTreeMap;

use serde::Serialize;
use tracing::debug;

use crate::error::{EtlError, EtlResult};
use crate::readers::coerce_datetime;
use crate::table::{Row, Table, Value};

/// Product name given to orders without a matching product
pub const UNKNOWN_PRODUCT: &str = "unknown_product";

/// Category given to orders without a matching product
pub const UNKNOWN_CATEGORY: &str = "unknown_category";

/// Columns the product table must provide for the join
pub const PRODUCT_JOIN_COLUMNS: &[&str] = &["product_id", "product_name", "category", "price"];

const UNIT_PRICE_ALIASES: &[&str] = &["unitprice", "unit_price", "price"];

/// Round half away from zero to two decimals
pub fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

/// Rename the first column matching one of `aliases` (lowercased) to `target`
fn normalize_column(table: &mut Table, target: &str, aliases: &[&str]) {
    if table.has_column(target) {
        return;
    }
    let found = table
        .columns()
        .iter()
        .find(|c| aliases.contains(&c.to_lowercase().as_str()))
        .cloned();
    if let Some(from) = found {
        table.rename_column(&from, target);
    }
}

fn coerce_qty(value: &Value) -> i64 {
    value
        .as_i64()
        .or_else(|| Value::Float(value.as_f64()?.trunc()).as_i64())
        .unwrap_or(0)
}

/// Add `order_total = round(qty * unit_price, 2)`
///
/// Column names are normalised first (`Qty` to `qty`; `UnitPrice`,
/// `unit_price` or `price` to `unit_price`). Values that do not coerce count
/// as zero, so no row is ever dropped.
pub fn add_order_total(mut table: Table) -> Table {
    normalize_column(&mut table, "qty", &["qty"]);
    normalize_column(&mut table, "unit_price", UNIT_PRICE_ALIASES);
    for column in ["qty", "unit_price", "order_total"] {
        table.ensure_column(column);
    }

    for row in table.rows_mut() {
        let qty = coerce_qty(row.value("qty"));
        let unit_price = row.value("unit_price").as_f64().unwrap_or(0.0);
        row.set("qty", qty);
        row.set("unit_price", unit_price);
        row.set("order_total", round2(qty as f64 * unit_price));
    }
    table
}

/// Left-join orders with product metadata on `product_id`
///
/// Both keys are coerced to integers; keys that do not coerce never match.
/// Matched rows gain `product_name`, `category` and `product_price`;
/// unmatched rows get the unknown placeholders and a null price.
///
/// # Errors
///
/// [`EtlError::MissingColumn`] if either side lacks a join column, and
/// [`EtlError::JoinCardinality`] if one key maps to several products.
pub fn enrich_with_products(orders: Table, products: &Table) -> EtlResult<Table> {
    if !orders.has_column("product_id") {
        return Err(EtlError::missing_column("product_id", "orders for product join"));
    }
    for column in PRODUCT_JOIN_COLUMNS {
        if !products.has_column(column) {
            return Err(EtlError::missing_column(*column, "products for product join"));
        }
    }

    let mut by_key: BTreeMap<i64, Vec<&Row>> = BTreeMap::new();
    for product in products.rows() {
        if let Some(key) = product.value("product_id").as_i64() {
            by_key.entry(key).or_default().push(product);
        }
    }
    if let Some((key, rows)) = by_key.iter().find(|(_, rows)| rows.len() > 1) {
        return Err(EtlError::JoinCardinality {
            product_id: *key,
            count: rows.len(),
        });
    }

    let mut enriched = orders;
    for column in ["product_name", "category", "product_price"] {
        enriched.ensure_column(column);
    }

    let mut unmatched = 0usize;
    for row in enriched.rows_mut() {
        let key = row.value("product_id").as_i64();
        row.set("product_id", key);

        let product = key.and_then(|k| by_key.get(&k)).and_then(|rows| rows.first());
        let (name, category, price) = match product {
            Some(p) => (
                p.value("product_name").clone(),
                p.value("category").clone(),
                Value::from(p.value("price").as_f64()),
            ),
            None => {
                unmatched += 1;
                (Value::Null, Value::Null, Value::Null)
            }
        };

        row.set("product_name", fill_null(name, UNKNOWN_PRODUCT));
        row.set("category", fill_null(category, UNKNOWN_CATEGORY));
        row.set("product_price", price);
    }

    debug!(rows = enriched.len(), unmatched, "Joined orders with products");
    Ok(enriched)
}

fn fill_null(value: Value, fallback: &str) -> Value {
    if value.is_null() {
        Value::from(fallback)
    } else {
        value
    }
}

/// Format `date_col` as `YYYY-MM-DD` into `out_col`
///
/// Non-date values go through the permissive parser; anything it cannot read
/// becomes null.
pub fn add_order_date_iso(mut table: Table, date_col: &str, out_col: &str) -> EtlResult<Table> {
    if !table.has_column(date_col) {
        return Err(EtlError::missing_column(date_col, "ISO date column"));
    }
    table.ensure_column(out_col);

    for row in table.rows_mut() {
        let iso = coerce_datetime(row.value(date_col)).map(|dt| dt.format("%Y-%m-%d").to_string());
        row.set(out_col, iso);
    }
    Ok(table)
}

/// Revenue and units for one day and category
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryRevenue {
    pub order_date_iso: Option<String>,
    pub category: Option<String>,
    pub total_revenue: f64,
    pub total_units: i64,
}

/// Revenue and units for one product
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductRevenue {
    pub product_id: Option<i64>,
    pub product_name: Option<String>,
    pub category: Option<String>,
    pub total_revenue: f64,
    pub total_units: i64,
}

#[derive(Default)]
struct Totals {
    revenue: f64,
    units: i64,
}

impl Totals {
    fn add(&mut self, row: &Row) {
        self.revenue += row.value("order_total").as_f64().unwrap_or(0.0);
        self.units += coerce_qty(row.value("qty"));
    }
}

/// Borrow the table, deriving `order_total` / `order_date_iso` only if absent
fn with_derived(table: &Table, need_date_iso: bool) -> EtlResult<Cow<'_, Table>> {
    let mut table = Cow::Borrowed(table);
    if !table.has_column("order_total") {
        table = Cow::Owned(add_order_total(table.into_owned()));
    }
    if need_date_iso && !table.has_column("order_date_iso") {
        table = Cow::Owned(add_order_date_iso(
            table.into_owned(),
            "order_date",
            "order_date_iso",
        )?);
    }
    Ok(table)
}

/// Revenue and units per `(order_date_iso, category)`, sorted by key
///
/// Null keys form their own group.
pub fn compute_daily_category_revenue(table: &Table) -> EtlResult<Vec<CategoryRevenue>> {
    if !table.has_column("category") {
        return Err(EtlError::missing_column("category", "daily category revenue"));
    }
    let table = with_derived(table, true)?;

    let mut groups: BTreeMap<(Option<String>, Option<String>), Totals> = BTreeMap::new();
    for row in table.rows() {
        let key = (
            row.value("order_date_iso").to_text(),
            row.value("category").to_text(),
        );
        groups.entry(key).or_default().add(row);
    }

    Ok(groups
        .into_iter()
        .map(|((order_date_iso, category), totals)| CategoryRevenue {
            order_date_iso,
            category,
            total_revenue: round2(totals.revenue),
            total_units: totals.units,
        })
        .collect())
}

/// The `n` products with the highest revenue
///
/// Ties keep the order of their `(product_id, product_name, category)` key.
pub fn top_n_products_by_revenue(table: &Table, n: usize) -> EtlResult<Vec<ProductRevenue>> {
    for column in ["product_id", "product_name", "category"] {
        if !table.has_column(column) {
            return Err(EtlError::missing_column(column, "top products by revenue"));
        }
    }
    let table = with_derived(table, false)?;

    let mut groups: BTreeMap<(Option<i64>, Option<String>, Option<String>), Totals> =
        BTreeMap::new();
    for row in table.rows() {
        let key = (
            row.value("product_id").as_i64(),
            row.value("product_name").to_text(),
            row.value("category").to_text(),
        );
        groups.entry(key).or_default().add(row);
    }

    let mut products: Vec<ProductRevenue> = groups
        .into_iter()
        .map(|((product_id, product_name, category), totals)| ProductRevenue {
            product_id,
            product_name,
            category,
            total_revenue: round2(totals.revenue),
            total_units: totals.units,
        })
        .collect();

    products.sort_by(|a, b| b.total_revenue.total_cmp(&a.total_revenue));
    products.truncate(n);
    Ok(products)
}
