use chrono::NaiveDate;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
    ToSchema,
    strum::Display,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
pub enum RawMaterialStatus {
    #[sea_orm(string_value = "Available")]
    Available,
    #[sea_orm(string_value = "In Processing")]
    #[serde(rename = "In Processing")]
    #[strum(serialize = "In Processing")]
    InProcessing,
}

/// The `raw_materials` table: a received lot of raw produce, e.g. `RM-1003`.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize, ToSchema)]
#[sea_orm(table_name = "raw_materials")]
#[serde(rename_all = "camelCase")]
#[schema(as = RawMaterial)]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub batch_code: String,
    pub supplier: String,
    pub quantity: i32,
    pub quality: String,
    pub received_date: NaiveDate,
    pub status: RawMaterialStatus,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::processing_batch::Entity")]
    ProcessingBatches,
}

impl Related<super::processing_batch::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ProcessingBatches.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
