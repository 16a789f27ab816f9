//! Record validation
//!
//! Schemas are plain descriptors ([`RecordSchema`] / [`FieldSpec`]) checked
//! by one engine. Validation never rejects a table, only rows.

pub mod engine;
pub mod schema;

pub use engine::{FieldViolation, RowViolations, validate_table};
pub use schema::{
    FieldKind, FieldSpec, RecordSchema, inventory_schema, order_schema, product_schema,
};
