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
pub enum BatchStatus {
    #[sea_orm(string_value = "In Progress")]
    #[serde(rename = "In Progress")]
    #[strum(serialize = "In Progress")]
    InProgress,
    #[sea_orm(string_value = "Completed")]
    Completed,
    #[sea_orm(string_value = "Canceled")]
    Canceled,
}

impl BatchStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, BatchStatus::Completed | BatchStatus::Canceled)
    }
}

/// The `processing_batches` table: raw material being turned into `product`.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize, ToSchema)]
#[sea_orm(table_name = "processing_batches")]
#[serde(rename_all = "camelCase")]
#[schema(as = ProcessingBatch)]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    /// `PB-<1000 + id>`, assigned inside the inserting transaction
    #[sea_orm(unique)]
    pub batch_code: String,
    /// Finished product name; matched against `products.name` on completion
    pub product: String,
    pub raw_material_id: i32,
    /// Code of the source raw material, e.g. `RM-1003`
    pub raw_material: String,
    pub quantity: i32,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub status: BatchStatus,
    pub progress: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::raw_material::Entity",
        from = "Column::RawMaterialId",
        to = "super::raw_material::Column::Id"
    )]
    RawMaterial,
}

impl Related<super::raw_material::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::RawMaterial.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
