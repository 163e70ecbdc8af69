use chrono::NaiveDate;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub const PENDING_TRANSPORTER: &str = "Pending Assignment";

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
    ToSchema,
    strum::Display,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
pub enum ShipmentStatus {
    #[sea_orm(string_value = "Scheduled")]
    Scheduled,
    #[sea_orm(string_value = "In Transit")]
    #[serde(rename = "In Transit")]
    #[strum(serialize = "In Transit")]
    InTransit,
    #[sea_orm(string_value = "Delivered")]
    Delivered,
}

impl ShipmentStatus {
    /// Accepted moves: Scheduled -> In Transit, In Transit -> Delivered,
    /// Scheduled -> Delivered.
    pub fn can_transition_to(self, next: ShipmentStatus) -> bool {
        matches!(
            (self, next),
            (ShipmentStatus::Scheduled, ShipmentStatus::InTransit)
                | (ShipmentStatus::InTransit, ShipmentStatus::Delivered)
                | (ShipmentStatus::Scheduled, ShipmentStatus::Delivered)
        )
    }
}

/// The `shipments` table.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize, ToSchema)]
#[sea_orm(table_name = "shipments")]
#[serde(rename_all = "camelCase")]
#[schema(as = Shipment)]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub shipment_number: String,
    #[serde(rename = "from")]
    pub origin: String,
    #[serde(rename = "to")]
    pub destination: String,
    pub quantity: i32,
    pub transporter: String,
    pub dispatch_date: NaiveDate,
    pub delivery_date: Option<NaiveDate>,
    pub status: ShipmentStatus,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::Iterable;

    #[test]
    fn transition_table_is_exact() {
        let allowed: Vec<(ShipmentStatus, ShipmentStatus)> = ShipmentStatus::iter()
            .flat_map(|from| ShipmentStatus::iter().map(move |to| (from, to)))
            .filter(|(from, to)| from.can_transition_to(*to))
            .collect();

        assert_eq!(
            allowed,
            vec![
                (ShipmentStatus::Scheduled, ShipmentStatus::InTransit),
                (ShipmentStatus::Scheduled, ShipmentStatus::Delivered),
                (ShipmentStatus::InTransit, ShipmentStatus::Delivered),
            ]
        );
    }

    #[test]
    fn status_uses_display_names_on_the_wire() {
        assert_eq!(
            serde_json::to_string(&ShipmentStatus::InTransit).unwrap(),
            "\"In Transit\""
        );
        assert_eq!(ShipmentStatus::InTransit.to_string(), "In Transit");
    }
}
