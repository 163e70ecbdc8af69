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
    Hash,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
    ToSchema,
    strum::Display,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
pub enum Grade {
    #[sea_orm(string_value = "Grade A")]
    #[serde(rename = "Grade A")]
    #[strum(serialize = "Grade A")]
    A,
    #[sea_orm(string_value = "Grade B")]
    #[serde(rename = "Grade B")]
    #[strum(serialize = "Grade B")]
    B,
    #[sea_orm(string_value = "Grade C")]
    #[serde(rename = "Grade C")]
    #[strum(serialize = "Grade C")]
    C,
}

/// The `quality_metrics` table (reporting only).
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize, ToSchema)]
#[sea_orm(table_name = "quality_metrics")]
#[serde(rename_all = "camelCase")]
#[schema(as = QualityMetric)]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub product_id: Option<i32>,
    pub grade: Grade,
    pub percentage: f64,
    pub date: NaiveDate,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::product::Entity",
        from = "Column::ProductId",
        to = "super::product::Column::Id"
    )]
    Product,
}

impl Related<super::product::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Product.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
