use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240101_000001_create_users_table::Migration),
            Box::new(m20240101_000002_create_catalog_tables::Migration),
            Box::new(m20240101_000003_create_order_tables::Migration),
            Box::new(m20240101_000004_create_shipments_table::Migration),
            Box::new(m20240101_000005_create_reporting_tables::Migration),
            Box::new(m20240101_000006_create_processing_tables::Migration),
        ]
    }
}

fn id_column<T: IntoIden>(col: T) -> ColumnDef {
    ColumnDef::new(col)
        .integer()
        .not_null()
        .auto_increment()
        .primary_key()
        .to_owned()
}

mod m20240101_000001_create_users_table {
    use super::id_column;
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000001_create_users_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Users::Table)
                        .if_not_exists()
                        .col(id_column(Users::Id))
                        .col(ColumnDef::new(Users::Name).string().not_null())
                        .col(ColumnDef::new(Users::Email).string().not_null())
                        .col(ColumnDef::new(Users::PasswordHash).string().not_null())
                        .col(ColumnDef::new(Users::Role).string_len(32).not_null())
                        .col(
                            ColumnDef::new(Users::Status)
                                .string_len(32)
                                .not_null()
                                .default("Active"),
                        )
                        .col(
                            ColumnDef::new(Users::LastActive)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(Users::DateJoined)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_users_email")
                        .table(Users::Table)
                        .col(Users::Email)
                        .unique()
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Users::Table).to_owned())
                .await
        }
    }

    #[derive(Iden)]
    enum Users {
        Table,
        Id,
        Name,
        Email,
        PasswordHash,
        Role,
        Status,
        LastActive,
        DateJoined,
    }
}

mod m20240101_000002_create_catalog_tables {
    use super::id_column;
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000002_create_catalog_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Products::Table)
                        .if_not_exists()
                        .col(id_column(Products::Id))
                        .col(ColumnDef::new(Products::Name).string().not_null())
                        .col(ColumnDef::new(Products::Description).text().null())
                        .col(ColumnDef::new(Products::Category).string().null())
                        .col(ColumnDef::new(Products::Price).decimal_len(12, 2).not_null())
                        .col(
                            ColumnDef::new(Products::Stock)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_products_name")
                        .table(Products::Table)
                        .col(Products::Name)
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Warehouses::Table)
                        .if_not_exists()
                        .col(id_column(Warehouses::Id))
                        .col(ColumnDef::new(Warehouses::Name).string().not_null())
                        .col(ColumnDef::new(Warehouses::Location).string().not_null())
                        .col(ColumnDef::new(Warehouses::Capacity).integer().not_null())
                        .col(
                            ColumnDef::new(Warehouses::Used)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Inventory::Table)
                        .if_not_exists()
                        .col(id_column(Inventory::Id))
                        .col(ColumnDef::new(Inventory::ProductId).integer().not_null())
                        .col(ColumnDef::new(Inventory::WarehouseId).integer().not_null())
                        .col(ColumnDef::new(Inventory::Quantity).integer().not_null())
                        .col(ColumnDef::new(Inventory::Date).date().not_null())
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_inventory_product_id")
                                .from(Inventory::Table, Inventory::ProductId)
                                .to(Products::Table, Products::Id)
                                .on_delete(ForeignKeyAction::Restrict),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_inventory_warehouse_id")
                                .from(Inventory::Table, Inventory::WarehouseId)
                                .to(Warehouses::Table, Warehouses::Id)
                                .on_delete(ForeignKeyAction::Restrict),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_inventory_product_warehouse")
                        .table(Inventory::Table)
                        .col(Inventory::ProductId)
                        .col(Inventory::WarehouseId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Inventory::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Warehouses::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Products::Table).to_owned())
                .await
        }
    }

    #[derive(Iden)]
    pub(super) enum Products {
        Table,
        Id,
        Name,
        Description,
        Category,
        Price,
        Stock,
    }

    #[derive(Iden)]
    enum Warehouses {
        Table,
        Id,
        Name,
        Location,
        Capacity,
        Used,
    }

    #[derive(Iden)]
    enum Inventory {
        Table,
        Id,
        ProductId,
        WarehouseId,
        Quantity,
        Date,
    }
}

mod m20240101_000003_create_order_tables {
    use super::id_column;
    use super::m20240101_000002_create_catalog_tables::Products;
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000003_create_order_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Orders::Table)
                        .if_not_exists()
                        .col(id_column(Orders::Id))
                        .col(ColumnDef::new(Orders::OrderNumber).string_len(32).not_null())
                        .col(ColumnDef::new(Orders::Customer).string().not_null())
                        .col(
                            ColumnDef::new(Orders::TotalAmount)
                                .decimal_len(14, 2)
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(Orders::OrderDate)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(ColumnDef::new(Orders::DeliveryDate).date().null())
                        .col(ColumnDef::new(Orders::Status).string_len(32).not_null())
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_orders_order_number")
                        .table(Orders::Table)
                        .col(Orders::OrderNumber)
                        .unique()
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_orders_status")
                        .table(Orders::Table)
                        .col(Orders::Status)
                        .to_owned(),
                )
                .await?;

            // Items are removed explicitly by the order service before the
            // order row, so the foreign key restricts rather than cascades.
            manager
                .create_table(
                    Table::create()
                        .table(OrderItems::Table)
                        .if_not_exists()
                        .col(id_column(OrderItems::Id))
                        .col(ColumnDef::new(OrderItems::OrderId).integer().not_null())
                        .col(ColumnDef::new(OrderItems::ProductId).integer().not_null())
                        .col(ColumnDef::new(OrderItems::Quantity).integer().not_null())
                        .col(
                            ColumnDef::new(OrderItems::UnitPrice)
                                .decimal_len(12, 2)
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_order_items_order_id")
                                .from(OrderItems::Table, OrderItems::OrderId)
                                .to(Orders::Table, Orders::Id)
                                .on_delete(ForeignKeyAction::Restrict),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_order_items_product_id")
                                .from(OrderItems::Table, OrderItems::ProductId)
                                .to(Products::Table, Products::Id)
                                .on_delete(ForeignKeyAction::Restrict),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_order_items_order_id")
                        .table(OrderItems::Table)
                        .col(OrderItems::OrderId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(OrderItems::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Orders::Table).to_owned())
                .await
        }
    }

    #[derive(Iden)]
    enum Orders {
        Table,
        Id,
        OrderNumber,
        Customer,
        TotalAmount,
        OrderDate,
        DeliveryDate,
        Status,
    }

    #[derive(Iden)]
    enum OrderItems {
        Table,
        Id,
        OrderId,
        ProductId,
        Quantity,
        UnitPrice,
    }
}

mod m20240101_000004_create_shipments_table {
    use super::id_column;
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000004_create_shipments_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Shipments::Table)
                        .if_not_exists()
                        .col(id_column(Shipments::Id))
                        .col(
                            ColumnDef::new(Shipments::ShipmentNumber)
                                .string_len(32)
                                .not_null(),
                        )
                        .col(ColumnDef::new(Shipments::Origin).string().not_null())
                        .col(ColumnDef::new(Shipments::Destination).string().not_null())
                        .col(ColumnDef::new(Shipments::Quantity).integer().not_null())
                        .col(ColumnDef::new(Shipments::Transporter).string().not_null())
                        .col(ColumnDef::new(Shipments::DispatchDate).date().not_null())
                        .col(ColumnDef::new(Shipments::DeliveryDate).date().null())
                        .col(ColumnDef::new(Shipments::Status).string_len(32).not_null())
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_shipments_shipment_number")
                        .table(Shipments::Table)
                        .col(Shipments::ShipmentNumber)
                        .unique()
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_shipments_status")
                        .table(Shipments::Table)
                        .col(Shipments::Status)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Shipments::Table).to_owned())
                .await
        }
    }

    #[derive(Iden)]
    enum Shipments {
        Table,
        Id,
        ShipmentNumber,
        Origin,
        Destination,
        Quantity,
        Transporter,
        DispatchDate,
        DeliveryDate,
        Status,
    }
}

mod m20240101_000005_create_reporting_tables {
    use super::id_column;
    use super::m20240101_000002_create_catalog_tables::Products;
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000005_create_reporting_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Sales::Table)
                        .if_not_exists()
                        .col(id_column(Sales::Id))
                        .col(ColumnDef::new(Sales::Month).string_len(3).not_null())
                        .col(ColumnDef::new(Sales::Year).integer().not_null())
                        .col(ColumnDef::new(Sales::Amount).decimal_len(14, 2).not_null())
                        .col(ColumnDef::new(Sales::ProductId).integer().null())
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_sales_product_id")
                                .from(Sales::Table, Sales::ProductId)
                                .to(Products::Table, Products::Id)
                                .on_delete(ForeignKeyAction::SetNull),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_sales_year")
                        .table(Sales::Table)
                        .col(Sales::Year)
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(QualityMetrics::Table)
                        .if_not_exists()
                        .col(id_column(QualityMetrics::Id))
                        .col(ColumnDef::new(QualityMetrics::ProductId).integer().null())
                        .col(ColumnDef::new(QualityMetrics::Grade).string_len(16).not_null())
                        .col(ColumnDef::new(QualityMetrics::Percentage).double().not_null())
                        .col(ColumnDef::new(QualityMetrics::Date).date().not_null())
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_quality_metrics_product_id")
                                .from(QualityMetrics::Table, QualityMetrics::ProductId)
                                .to(Products::Table, Products::Id)
                                .on_delete(ForeignKeyAction::SetNull),
                        )
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(QualityMetrics::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Sales::Table).to_owned())
                .await
        }
    }

    #[derive(Iden)]
    enum Sales {
        Table,
        Id,
        Month,
        Year,
        Amount,
        ProductId,
    }

    #[derive(Iden)]
    enum QualityMetrics {
        Table,
        Id,
        ProductId,
        Grade,
        Percentage,
        Date,
    }
}

mod m20240101_000006_create_processing_tables {
    use super::id_column;
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000006_create_processing_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(RawMaterials::Table)
                        .if_not_exists()
                        .col(id_column(RawMaterials::Id))
                        .col(
                            ColumnDef::new(RawMaterials::BatchCode)
                                .string_len(64)
                                .not_null(),
                        )
                        .col(ColumnDef::new(RawMaterials::Supplier).string().not_null())
                        .col(ColumnDef::new(RawMaterials::Quantity).integer().not_null())
                        .col(ColumnDef::new(RawMaterials::Quality).string().not_null())
                        .col(ColumnDef::new(RawMaterials::ReceivedDate).date().not_null())
                        .col(ColumnDef::new(RawMaterials::Status).string_len(32).not_null())
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_raw_materials_batch_code")
                        .table(RawMaterials::Table)
                        .col(RawMaterials::BatchCode)
                        .unique()
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(ProcessingBatches::Table)
                        .if_not_exists()
                        .col(id_column(ProcessingBatches::Id))
                        .col(
                            ColumnDef::new(ProcessingBatches::BatchCode)
                                .string_len(64)
                                .not_null(),
                        )
                        .col(ColumnDef::new(ProcessingBatches::Product).string().not_null())
                        .col(
                            ColumnDef::new(ProcessingBatches::RawMaterialId)
                                .integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ProcessingBatches::RawMaterial)
                                .string_len(64)
                                .not_null(),
                        )
                        .col(ColumnDef::new(ProcessingBatches::Quantity).integer().not_null())
                        .col(ColumnDef::new(ProcessingBatches::StartDate).date().not_null())
                        .col(ColumnDef::new(ProcessingBatches::EndDate).date().null())
                        .col(
                            ColumnDef::new(ProcessingBatches::Status)
                                .string_len(32)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ProcessingBatches::Progress)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_processing_batches_raw_material_id")
                                .from(ProcessingBatches::Table, ProcessingBatches::RawMaterialId)
                                .to(RawMaterials::Table, RawMaterials::Id)
                                .on_delete(ForeignKeyAction::Restrict),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_processing_batches_batch_code")
                        .table(ProcessingBatches::Table)
                        .col(ProcessingBatches::BatchCode)
                        .unique()
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(ProcessingBatches::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(RawMaterials::Table).to_owned())
                .await
        }
    }

    #[derive(Iden)]
    enum RawMaterials {
        Table,
        Id,
        BatchCode,
        Supplier,
        Quantity,
        Quality,
        ReceivedDate,
        Status,
    }

    #[derive(Iden)]
    enum ProcessingBatches {
        Table,
        Id,
        BatchCode,
        Product,
        RawMaterialId,
        RawMaterial,
        Quantity,
        StartDate,
        EndDate,
        Status,
        Progress,
    }
}
