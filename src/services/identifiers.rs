//! Human-readable identifiers that live next to the integer primary keys.

use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter};
use tracing::warn;
use uuid::Uuid;

use crate::errors::{DbResultExt, ServiceError};

pub const ORDER_PREFIX: &str = "ORD-";
pub const SHIPMENT_PREFIX: &str = "SHP-";
pub const RAW_MATERIAL_PREFIX: &str = "RM";
pub const BATCH_PREFIX: &str = "PB";

/// Attempts before giving up on a colliding random identifier
pub const MAX_IDENTIFIER_ATTEMPTS: usize = 5;

/// `prefix` followed by 12 upper-case hex digits of a v4 UUID.
pub fn random_display_id(prefix: &str) -> String {
    let hex = Uuid::new_v4().simple().to_string();
    format!("{prefix}{}", hex[..12].to_uppercase())
}

/// `RM-1003` style codes derived from the database id.
pub fn sequence_code(prefix: &str, id: i32) -> String {
    format!("{prefix}-{}", 1000 + id)
}

/// Picks a random identifier not yet present in `column`. Run inside the
/// inserting transaction; the unique index on the column backs it up.
pub async fn allocate_display_id<E, C>(
    conn: &C,
    column: E::Column,
    prefix: &str,
) -> Result<String, ServiceError>
where
    E: EntityTrait,
    C: ConnectionTrait,
{
    for attempt in 1..=MAX_IDENTIFIER_ATTEMPTS {
        let candidate = random_display_id(prefix);
        let taken = E::find()
            .filter(column.eq(candidate.as_str()))
            .one(conn)
            .await
            .or_db_error("allocate_display_id")?
            .is_some();
        if !taken {
            return Ok(candidate);
        }
        warn!(attempt, %candidate, "Identifier collision, regenerating");
    }

    Err(ServiceError::Conflict(format!(
        "Could not allocate a unique {prefix} identifier"
    )))
}
