//! Record schemas as enumerable field descriptors

use std::fmt;

use serde::Serialize;

/// The type a field's value must coerce to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    Integer,
    Float,
    Text,
    DateTime,
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FieldKind::Integer => "integer",
            FieldKind::Float => "float",
            FieldKind::Text => "string",
            FieldKind::DateTime => "datetime",
        };
        write!(f, "{name}")
    }
}

/// Constraints on one named field
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: FieldKind,
    pub required: bool,
    /// Inclusive lower bound for numeric kinds
    pub min: Option<f64>,
    /// Inclusive upper bound for numeric kinds
    pub max: Option<f64>,
    /// Documented fallback for optional fields; never written into rows
    pub default: Option<&'static str>,
}

impl FieldSpec {
    /// A required field with no bounds
    pub fn new(name: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            kind,
            required: true,
            min: None,
            max: None,
            default: None,
        }
    }

    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    pub fn with_min(mut self, min: f64) -> Self {
        self.min = Some(min);
        self
    }

    pub fn with_max(mut self, max: f64) -> Self {
        self.max = Some(max);
        self
    }

    pub fn with_default(mut self, default: &'static str) -> Self {
        self.default = Some(default);
        self
    }
}

/// A named, ordered list of field constraints
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecordSchema {
    pub name: &'static str,
    pub fields: Vec<FieldSpec>,
}

impl RecordSchema {
    pub fn new(name: &'static str, fields: Vec<FieldSpec>) -> Self {
        Self { name, fields }
    }

    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Names of the fields a row must carry
    pub fn required_fields(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.fields.iter().filter(|f| f.required).map(|f| f.name)
    }
}

pub fn order_schema() -> RecordSchema {
    RecordSchema::new(
        "OrderSchema",
        vec![
            FieldSpec::new("order_id", FieldKind::Integer),
            FieldSpec::new("order_date", FieldKind::DateTime),
            FieldSpec::new("product_id", FieldKind::Integer),
            FieldSpec::new("qty", FieldKind::Integer).with_min(0.0),
            FieldSpec::new("unit_price", FieldKind::Float).with_min(0.0),
            FieldSpec::new("user_id", FieldKind::Integer).optional(),
            FieldSpec::new("order_status", FieldKind::Text)
                .optional()
                .with_default("completed"),
        ],
    )
}

pub fn product_schema() -> RecordSchema {
    RecordSchema::new(
        "ProductSchema",
        vec![
            FieldSpec::new("product_id", FieldKind::Integer),
            FieldSpec::new("product_name", FieldKind::Text),
            FieldSpec::new("category", FieldKind::Text)
                .optional()
                .with_default("unknown"),
            FieldSpec::new("price", FieldKind::Float).with_min(0.0),
        ],
    )
}

pub fn inventory_schema() -> RecordSchema {
    RecordSchema::new(
        "InventorySchema",
        vec![
            FieldSpec::new("product_id", FieldKind::Integer),
            FieldSpec::new("warehouse_id", FieldKind::Text),
            FieldSpec::new("stock_on_hand", FieldKind::Integer).with_min(0.0),
            FieldSpec::new("last_restock_date", FieldKind::DateTime),
        ],
    )
}
