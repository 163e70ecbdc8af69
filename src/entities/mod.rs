//! sea-orm entities for the supply-chain schema.
//!
//! Columns are snake_case; every model serializes with camelCase field names.

pub mod inventory;
pub mod order;
pub mod order_item;
pub mod processing_batch;
pub mod product;
pub mod quality_metric;
pub mod raw_material;
pub mod sale;
pub mod shipment;
pub mod user;
pub mod warehouse;
