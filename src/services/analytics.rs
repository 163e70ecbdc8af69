use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    sea_query::Expr, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};
use utoipa::{IntoParams, ToSchema};

use crate::{
    entities::{
        inventory::{self, Entity as InventoryEntity},
        order::{self, Entity as OrderEntity, OrderStatus},
        processing_batch::{self, BatchStatus, Entity as BatchEntity},
        product::Entity as ProductEntity,
        quality_metric::{self, Entity as QualityEntity, Grade},
        sale::{self, month_index, Entity as SaleEntity},
        shipment::{self, Entity as ShipmentEntity, ShipmentStatus},
        user::Entity as UserEntity,
        warehouse::{self, Entity as WarehouseEntity},
    },
    errors::{DbResultExt, ServiceError},
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MonthlySales {
    pub month: String,
    #[schema(value_type = f64)]
    pub amount: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct QualityShare {
    pub grade: Grade,
    /// Mean percentage across the day's measurements for the grade
    pub percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InventoryLevel {
    /// `YYYY-MM`
    pub month: String,
    pub quantity: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ShipmentStatusCount {
    pub status: ShipmentStatus,
    pub count: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrderStatusCount {
    pub status: OrderStatus,
    pub count: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSummary {
    pub total_users: u64,
    pub total_products: u64,
    pub total_orders: u64,
    pub total_shipments: u64,
    pub total_inventory_units: i64,
    pub active_batches: u64,
    pub generated_at: DateTime<Utc>,
}

/// Stored `used` next to what the inventory rows add up to
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct WarehouseUtilization {
    pub warehouse_id: i32,
    pub name: String,
    pub capacity: i32,
    pub used: i32,
    pub inventory_quantity: i64,
    /// `inventory_quantity - used`
    pub drift: i64,
    /// `used / capacity` as a percentage; 0 for zero capacity
    pub utilization_percent: f64,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SalesQuery {
    /// Defaults to the current year
    pub year: Option<i32>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct QualityQuery {
    /// Defaults to today
    pub date: Option<NaiveDate>,
}

/// Read-only reporting queries behind the dashboards
#[derive(Clone)]
pub struct AnalyticsService {
    db: Arc<DatabaseConnection>,
}

impl AnalyticsService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Monthly sales for a year, Jan..Dec, months without sales omitted
    #[instrument(skip(self))]
    pub async fn sales_by_year(&self, year: i32) -> Result<Vec<MonthlySales>, ServiceError> {
        let rows = SaleEntity::find()
            .filter(sale::Column::Year.eq(year))
            .all(&*self.db)
            .await
            .or_db_error("sales_by_year")?;

        Ok(monthly_totals(rows.iter().map(|s| (s.month.as_str(), s.amount))))
    }

    #[instrument(skip(self))]
    pub async fn quality_distribution(
        &self,
        date: Option<NaiveDate>,
    ) -> Result<Vec<QualityShare>, ServiceError> {
        let date = date.unwrap_or_else(|| Utc::now().date_naive());
        let rows = QualityEntity::find()
            .filter(quality_metric::Column::Date.eq(date))
            .all(&*self.db)
            .await
            .or_db_error("quality_distribution")?;

        let mut by_grade: BTreeMap<u8, (Grade, f64, u32)> = BTreeMap::new();
        for row in rows {
            let key = match row.grade {
                Grade::A => 0,
                Grade::B => 1,
                Grade::C => 2,
            };
            let entry = by_grade.entry(key).or_insert((row.grade, 0.0, 0));
            entry.1 += row.percentage;
            entry.2 += 1;
        }

        Ok(by_grade
            .into_values()
            .map(|(grade, sum, n)| QualityShare {
                grade,
                percentage: sum / f64::from(n),
            })
            .collect())
    }

    /// Total inventory quantity per month of entry date, oldest first
    #[instrument(skip(self))]
    pub async fn inventory_levels(&self) -> Result<Vec<InventoryLevel>, ServiceError> {
        let rows = InventoryEntity::find()
            .order_by_asc(inventory::Column::Date)
            .all(&*self.db)
            .await
            .or_db_error("inventory_levels")?;

        Ok(inventory_by_month(rows.iter().map(|r| (r.date, r.quantity))))
    }

    /// Shipment count per status; every status is present
    #[instrument(skip(self))]
    pub async fn transport_status(
        &self,
    ) -> Result<Vec<ShipmentStatusCount>, ServiceError> {
        let counts: HashMap<ShipmentStatus, i64> = ShipmentEntity::find()
            .select_only()
            .column(shipment::Column::Status)
            .column_as(Expr::col(shipment::Column::Id).count(), "count")
            .group_by(shipment::Column::Status)
            .into_tuple::<(ShipmentStatus, i64)>()
            .all(&*self.db)
            .await
            .or_db_error("transport_status")?
            .into_iter()
            .collect();

        Ok([
            ShipmentStatus::Scheduled,
            ShipmentStatus::InTransit,
            ShipmentStatus::Delivered,
        ]
        .into_iter()
        .map(|status| ShipmentStatusCount {
            status,
            count: counts.get(&status).copied().unwrap_or(0),
        })
        .collect())
    }

    /// Order count per status; every status is present
    #[instrument(skip(self))]
    pub async fn order_status(&self) -> Result<Vec<OrderStatusCount>, ServiceError> {
        let counts: HashMap<OrderStatus, i64> = OrderEntity::find()
            .select_only()
            .column(order::Column::Status)
            .column_as(Expr::col(order::Column::Id).count(), "count")
            .group_by(order::Column::Status)
            .into_tuple::<(OrderStatus, i64)>()
            .all(&*self.db)
            .await
            .or_db_error("order_status")?
            .into_iter()
            .collect();

        Ok([
            OrderStatus::Pending,
            OrderStatus::Processing,
            OrderStatus::Shipped,
            OrderStatus::Delivered,
        ]
        .into_iter()
        .map(|status| OrderStatusCount {
            status,
            count: counts.get(&status).copied().unwrap_or(0),
        })
        .collect())
    }

    #[instrument(skip(self))]
    pub async fn dashboard_summary(&self) -> Result<DashboardSummary, ServiceError> {
        let db = &*self.db;

        let total_users = UserEntity::find().count(db).await.or_db_error("dashboard")?;
        let total_products = ProductEntity::find().count(db).await.or_db_error("dashboard")?;
        let total_orders = OrderEntity::find().count(db).await.or_db_error("dashboard")?;
        let total_shipments = ShipmentEntity::find()
            .count(db)
            .await
            .or_db_error("dashboard")?;
        let active_batches = BatchEntity::find()
            .filter(processing_batch::Column::Status.eq(BatchStatus::InProgress))
            .count(db)
            .await
            .or_db_error("dashboard")?;
        let total_inventory_units = InventoryEntity::find()
            .select_only()
            .column_as(Expr::col(inventory::Column::Quantity).sum(), "total")
            .into_tuple::<Option<i64>>()
            .one(db)
            .await
            .or_db_error("dashboard")?
            .flatten()
            .unwrap_or(0);

        debug!(total_orders, total_shipments, "Dashboard summary computed");
        Ok(DashboardSummary {
            total_users,
            total_products,
            total_orders,
            total_shipments,
            total_inventory_units,
            active_batches,
            generated_at: Utc::now(),
        })
    }

    /// Per warehouse, the stored `used` counter against summed inventory.
    /// The two are maintained independently, so drift is reported, not fixed.
    #[instrument(skip(self))]
    pub async fn warehouse_utilization(&self) -> Result<Vec<WarehouseUtilization>, ServiceError> {
        let db = &*self.db;
        let warehouses = WarehouseEntity::find()
            .order_by_asc(warehouse::Column::Id)
            .all(db)
            .await
            .or_db_error("warehouse_utilization")?;

        let sums: HashMap<i32, i64> = InventoryEntity::find()
            .select_only()
            .column(inventory::Column::WarehouseId)
            .column_as(Expr::col(inventory::Column::Quantity).sum(), "total")
            .group_by(inventory::Column::WarehouseId)
            .into_tuple::<(i32, Option<i64>)>()
            .all(db)
            .await
            .or_db_error("warehouse_utilization")?
            .into_iter()
            .map(|(id, total)| (id, total.unwrap_or(0)))
            .collect();

        Ok(warehouses
            .into_iter()
            .map(|w| {
                let inventory_quantity = sums.get(&w.id).copied().unwrap_or(0);
                utilization(w, inventory_quantity)
            })
            .collect())
    }
}

fn monthly_totals<'a, I>(rows: I) -> Vec<MonthlySales>
where
    I: IntoIterator<Item = (&'a str, Decimal)>,
{
    let mut totals: BTreeMap<(usize, String), Decimal> = BTreeMap::new();
    for (month, amount) in rows {
        // Unknown month labels sort after December.
        let key = (month_index(month).unwrap_or(usize::MAX), month.to_string());
        *totals.entry(key).or_insert(Decimal::ZERO) += amount;
    }
    totals
        .into_iter()
        .map(|((_, month), amount)| MonthlySales { month, amount })
        .collect()
}

fn inventory_by_month<I>(rows: I) -> Vec<InventoryLevel>
where
    I: IntoIterator<Item = (NaiveDate, i32)>,
{
    let mut totals: BTreeMap<String, i64> = BTreeMap::new();
    for (date, quantity) in rows {
        *totals.entry(date.format("%Y-%m").to_string()).or_insert(0) += i64::from(quantity);
    }
    totals
        .into_iter()
        .map(|(month, quantity)| InventoryLevel { month, quantity })
        .collect()
}

fn utilization(w: warehouse::Model, inventory_quantity: i64) -> WarehouseUtilization {
    let utilization_percent = if w.capacity > 0 {
        f64::from(w.used) / f64::from(w.capacity) * 100.0
    } else {
        0.0
    };
    WarehouseUtilization {
        warehouse_id: w.id,
        drift: inventory_quantity - i64::from(w.used),
        name: w.name,
        capacity: w.capacity,
        used: w.used,
        inventory_quantity,
        utilization_percent,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn months_are_calendar_ordered_and_summed() {
        let rows = vec![
            ("Mar", dec!(300)),
            ("Jan", dec!(100)),
            ("Mar", dec!(50)),
            ("Feb", dec!(200)),
        ];
        let totals = monthly_totals(rows);
        let months: Vec<&str> = totals.iter().map(|m| m.month.as_str()).collect();
        assert_eq!(months, ["Jan", "Feb", "Mar"]);
        assert_eq!(totals[2].amount, dec!(350));
    }

    #[test]
    fn inventory_months_are_chronological_across_years() {
        let d = |y, m, day| NaiveDate::from_ymd_opt(y, m, day).unwrap();
        let levels = inventory_by_month(vec![
            (d(2025, 1, 5), 10),
            (d(2024, 12, 31), 5),
            (d(2025, 1, 20), 7),
        ]);
        assert_eq!(
            levels,
            vec![
                InventoryLevel {
                    month: "2024-12".into(),
                    quantity: 5
                },
                InventoryLevel {
                    month: "2025-01".into(),
                    quantity: 17
                },
            ]
        );
    }

    #[test]
    fn drift_compares_inventory_with_stored_used() {
        let w = warehouse::Model {
            id: 1,
            name: "Warehouse A".into(),
            location: "North".into(),
            capacity: 1000,
            used: 800,
        };
        let u = utilization(w, 650);
        assert_eq!(u.drift, -150);
        assert!((u.utilization_percent - 80.0).abs() < f64::EPSILON);
    }
}
