//! Seed data script - populates the database with the cassava demo data set
//!
//! Run with: cargo run --bin seed-data [-- --reset]
//!
//! This creates:
//! - 6 users (one demo account per role plus two staff members)
//! - 4 cassava products and 4 warehouses
//! - 5 orders with items and 5 shipments
//! - inventory, monthly sales for the current year and today's quality metrics
//! - raw materials and processing batches

use anyhow::{Context, Result};
use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, Utc};
use clap::Parser;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sea_orm::{
    ActiveModelTrait, ConnectionTrait, DatabaseTransaction, EntityTrait, Set, TransactionTrait,
};
use std::collections::HashMap;
use tracing::info;

use agrichain_api::{
    auth::hash_password,
    config, db,
    entities::{
        inventory, order,
        order::OrderStatus,
        order_item,
        processing_batch::{self, BatchStatus},
        product,
        quality_metric::{self, Grade},
        raw_material::{self, RawMaterialStatus},
        sale::{self, MONTHS},
        shipment::{self, ShipmentStatus},
        user::{self, UserRole, UserStatus},
        warehouse,
    },
};

#[derive(Debug, Parser)]
#[command(name = "seed-data", about = "Load the cassava supply-chain demo data")]
struct Cli {
    /// Delete existing rows before inserting
    #[arg(long)]
    reset: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let cfg = config::load_config().context("failed to load configuration")?;
    config::init_tracing(&cfg.log_level, cfg.log_json);

    info!("=== AgriChain Seed Data ===");
    let pool = db::establish_connection_from_app_config(&cfg)
        .await
        .context("failed to connect to the database")?;
    db::run_migrations(&pool).await?;

    let txn = pool.begin().await?;

    if cli.reset {
        reset(&txn).await?;
    }

    info!("Creating users...");
    let users = create_users(&txn).await?;
    info!("  Created {} users", users);

    info!("Creating products and warehouses...");
    let products = create_products(&txn).await?;
    let warehouses = create_warehouses(&txn).await?;
    info!(
        "  Created {} products, {} warehouses",
        products.len(),
        warehouses.len()
    );

    info!("Creating orders...");
    let orders = create_orders(&txn, &products).await?;
    info!("  Created {} orders with items", orders);

    info!("Creating shipments...");
    let shipments = create_shipments(&txn).await?;
    info!("  Created {} shipments", shipments);

    info!("Creating inventory, sales and quality metrics...");
    create_inventory(&txn, &products, &warehouses).await?;
    create_sales(&txn).await?;
    create_quality_metrics(&txn, &products).await?;

    info!("Creating raw materials and processing batches...");
    let batches = create_processing(&txn).await?;
    info!("  Created {} processing batches", batches);

    txn.commit().await?;

    info!("=== Seed Data Complete ===");
    info!("Log in with admin@cassava.com / admin123 and explore http://localhost:8080/swagger-ui");
    Ok(())
}

/// Children before parents so foreign keys never block the delete.
async fn reset(txn: &DatabaseTransaction) -> Result<()> {
    for table in [
        "order_items",
        "inventory",
        "sales",
        "quality_metrics",
        "processing_batches",
        "raw_materials",
        "shipments",
        "orders",
        "products",
        "warehouses",
        "users",
    ] {
        txn.execute_unprepared(&format!("DELETE FROM {table}"))
            .await
            .with_context(|| format!("failed to clear {table}"))?;
        info!("Cleared table: {}", table);
    }
    Ok(())
}

fn date(value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").with_context(|| format!("bad date {value}"))
}

fn timestamp(value: &str) -> Result<DateTime<Utc>> {
    if let Ok(parsed) = NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M") {
        return Ok(parsed.and_utc());
    }
    Ok(date(value)?.and_hms_opt(0, 0, 0).unwrap_or_default().and_utc())
}

async fn create_users(txn: &DatabaseTransaction) -> Result<usize> {
    let now = Utc::now();
    let seeds = [
        ("Admin User", "admin@cassava.com", "admin123", UserRole::Admin, UserStatus::Active, None, "2023-01-15"),
        ("Farmer User", "farmer@cassava.com", "farmer123", UserRole::Farmer, UserStatus::Active, None, "2023-02-20"),
        ("Processor User", "processor@cassava.com", "processor123", UserRole::Processor, UserStatus::Active, None, "2023-03-10"),
        ("Transporter User", "transporter@cassava.com", "transporter123", UserRole::Transporter, UserStatus::Active, None, "2023-04-05"),
        ("Sarah Williams", "sarah.williams@cassava.com", "password123", UserRole::Farmer, UserStatus::Inactive, Some("2023-10-25 14:30"), "2023-05-12"),
        ("David Miller", "david.miller@cassava.com", "password123", UserRole::Processor, UserStatus::Active, Some("2023-11-04 10:15"), "2023-06-22"),
    ];

    for (name, email, password, role, status, last_active, joined) in seeds {
        let last_active = match last_active {
            Some(value) => timestamp(value)?,
            None => now,
        };
        user::ActiveModel {
            name: Set(name.to_string()),
            email: Set(email.to_string()),
            password_hash: Set(hash_password(password)?),
            role: Set(role),
            status: Set(status),
            last_active: Set(Some(last_active)),
            date_joined: Set(timestamp(joined)?),
            ..Default::default()
        }
        .insert(txn)
        .await?;
    }
    Ok(seeds.len())
}

async fn create_products(txn: &DatabaseTransaction) -> Result<HashMap<&'static str, i32>> {
    let seeds = [
        ("Cassava Flour", "High quality cassava flour", "Flour", dec!(5.00), 1200),
        ("Cassava Starch", "Refined cassava starch", "Starch", dec!(6.50), 800),
        ("Cassava Chips", "Dried cassava chips", "Chips", dec!(3.50), 1500),
        ("Fresh Cassava", "Fresh cassava roots", "Raw", dec!(2.00), 3000),
    ];

    let mut ids = HashMap::new();
    for (name, description, category, price, stock) in seeds {
        let created = product::ActiveModel {
            name: Set(name.to_string()),
            description: Set(Some(description.to_string())),
            category: Set(Some(category.to_string())),
            price: Set(price),
            stock: Set(stock),
            ..Default::default()
        }
        .insert(txn)
        .await?;
        ids.insert(name, created.id);
    }
    Ok(ids)
}

async fn create_warehouses(txn: &DatabaseTransaction) -> Result<HashMap<&'static str, i32>> {
    let seeds = [
        ("Warehouse A", "Location A", 10000, 6500),
        ("Warehouse B", "Location B", 8000, 7200),
        ("Warehouse C", "Location C", 12000, 5800),
        ("Warehouse D", "Location D", 15000, 9000),
    ];

    let mut ids = HashMap::new();
    for (name, location, capacity, used) in seeds {
        let created = warehouse::ActiveModel {
            name: Set(name.to_string()),
            location: Set(location.to_string()),
            capacity: Set(capacity),
            used: Set(used),
            ..Default::default()
        }
        .insert(txn)
        .await?;
        ids.insert(name, created.id);
    }
    Ok(ids)
}

fn product_id(products: &HashMap<&'static str, i32>, name: &str) -> Result<i32> {
    products
        .get(name)
        .copied()
        .with_context(|| format!("seed product {name} missing"))
}

async fn create_orders(
    txn: &DatabaseTransaction,
    products: &HashMap<&'static str, i32>,
) -> Result<usize> {
    // (number, customer, ordered, delivery, status, product, quantity, unit price)
    let seeds = [
        ("ORD-1001", "Customer A", "2023-11-10", "2023-11-17", OrderStatus::Processing, "Cassava Flour", 1000, dec!(5.00)),
        ("ORD-1002", "Customer B", "2023-11-08", "2023-11-15", OrderStatus::Shipped, "Cassava Starch", 500, dec!(7.00)),
        ("ORD-1003", "Customer C", "2023-11-05", "2023-11-12", OrderStatus::Delivered, "Cassava Chips", 2000, dec!(3.50)),
        ("ORD-1004", "Customer D", "2023-11-09", "2023-11-16", OrderStatus::Processing, "Fresh Cassava", 1250, dec!(2.00)),
        ("ORD-1005", "Customer E", "2023-11-03", "2023-11-10", OrderStatus::Pending, "Cassava Flour", 800, dec!(5.00)),
    ];

    for (number, customer, ordered, delivery, status, product, quantity, unit_price) in seeds {
        let created = order::ActiveModel {
            order_number: Set(number.to_string()),
            customer: Set(customer.to_string()),
            total_amount: Set(unit_price * Decimal::from(quantity)),
            order_date: Set(timestamp(ordered)?),
            delivery_date: Set(Some(date(delivery)?)),
            status: Set(status),
            ..Default::default()
        }
        .insert(txn)
        .await?;

        order_item::ActiveModel {
            order_id: Set(created.id),
            product_id: Set(product_id(products, product)?),
            quantity: Set(quantity),
            unit_price: Set(unit_price),
            ..Default::default()
        }
        .insert(txn)
        .await?;
    }
    Ok(seeds.len())
}

async fn create_shipments(txn: &DatabaseTransaction) -> Result<usize> {
    let seeds = [
        ("SHP-1001", "Farm A", "Processor B", 1500, "Transporter X", "2023-11-05", "2023-11-07", ShipmentStatus::InTransit),
        ("SHP-1002", "Farm C", "Processor A", 2000, "Transporter Y", "2023-11-06", "2023-11-08", ShipmentStatus::Scheduled),
        ("SHP-1003", "Farm B", "Processor C", 1200, "Transporter Z", "2023-11-04", "2023-11-06", ShipmentStatus::Delivered),
        ("SHP-1004", "Farm D", "Processor B", 800, "Transporter X", "2023-11-03", "2023-11-05", ShipmentStatus::Delivered),
        ("SHP-1005", "Farm A", "Processor C", 1000, "Transporter Y", "2023-11-07", "2023-11-09", ShipmentStatus::Scheduled),
    ];

    for (number, from, to, quantity, transporter, dispatched, delivery, status) in seeds {
        shipment::ActiveModel {
            shipment_number: Set(number.to_string()),
            origin: Set(from.to_string()),
            destination: Set(to.to_string()),
            quantity: Set(quantity),
            transporter: Set(transporter.to_string()),
            dispatch_date: Set(date(dispatched)?),
            delivery_date: Set(Some(date(delivery)?)),
            status: Set(status),
            ..Default::default()
        }
        .insert(txn)
        .await?;
    }
    Ok(seeds.len())
}

async fn create_inventory(
    txn: &DatabaseTransaction,
    products: &HashMap<&'static str, i32>,
    warehouses: &HashMap<&'static str, i32>,
) -> Result<()> {
    let today = Utc::now().date_naive();
    let seeds = [
        ("Cassava Flour", "Warehouse A", 2500),
        ("Cassava Starch", "Warehouse B", 1800),
        ("Cassava Chips", "Warehouse C", 3200),
        ("Fresh Cassava", "Warehouse D", 5000),
    ];

    for (product, warehouse_name, quantity) in seeds {
        let warehouse_id = warehouses
            .get(warehouse_name)
            .copied()
            .with_context(|| format!("seed warehouse {warehouse_name} missing"))?;
        inventory::ActiveModel {
            product_id: Set(product_id(products, product)?),
            warehouse_id: Set(warehouse_id),
            quantity: Set(quantity),
            date: Set(today),
            ..Default::default()
        }
        .insert(txn)
        .await?;
    }
    Ok(())
}

async fn create_sales(txn: &DatabaseTransaction) -> Result<()> {
    let year = Utc::now().year();
    let amounts = [
        12000, 19000, 24000, 18000, 28000, 32000, 27000, 35000, 30000, 25000, 22000, 28000,
    ];

    let rows = MONTHS.iter().zip(amounts).map(|(month, amount)| sale::ActiveModel {
        month: Set(month.to_string()),
        year: Set(year),
        amount: Set(Decimal::from(amount)),
        product_id: Set(None),
        ..Default::default()
    });
    sale::Entity::insert_many(rows).exec(txn).await?;
    Ok(())
}

async fn create_quality_metrics(
    txn: &DatabaseTransaction,
    products: &HashMap<&'static str, i32>,
) -> Result<()> {
    let today = Utc::now().date_naive();
    let flour = product_id(products, "Cassava Flour")?;

    let rows = [(Grade::A, 65.0), (Grade::B, 25.0), (Grade::C, 10.0)]
        .into_iter()
        .map(|(grade, percentage)| quality_metric::ActiveModel {
            product_id: Set(Some(flour)),
            grade: Set(grade),
            percentage: Set(percentage),
            date: Set(today),
            ..Default::default()
        });
    quality_metric::Entity::insert_many(rows).exec(txn).await?;
    Ok(())
}

async fn create_processing(txn: &DatabaseTransaction) -> Result<usize> {
    // RM-1001..RM-1005 first so their ids line up with their codes; the last
    // three are the consumed materials behind the completed batches.
    let materials = [
        ("RM-1001", "Farm A", 1500, "Grade A", "2023-10-28", RawMaterialStatus::Available),
        ("RM-1002", "Farm B", 2000, "Grade B", "2023-10-30", RawMaterialStatus::Available),
        ("RM-1003", "Farm C", 1200, "Grade A", "2023-11-02", RawMaterialStatus::InProcessing),
        ("RM-1004", "Farm D", 800, "Grade A", "2023-11-03", RawMaterialStatus::Available),
        ("RM-1005", "Farm A", 1000, "Grade B", "2023-11-04", RawMaterialStatus::Available),
        ("RM-0998", "Farm B", 800, "Grade A", "2023-10-27", RawMaterialStatus::InProcessing),
        ("RM-0999", "Farm C", 500, "Grade B", "2023-10-26", RawMaterialStatus::InProcessing),
        ("RM-1000", "Farm D", 1000, "Grade A", "2023-10-25", RawMaterialStatus::InProcessing),
    ];

    let mut material_ids = HashMap::new();
    for (code, supplier, quantity, quality, received, status) in materials {
        let created = raw_material::ActiveModel {
            batch_code: Set(code.to_string()),
            supplier: Set(supplier.to_string()),
            quantity: Set(quantity),
            quality: Set(quality.to_string()),
            received_date: Set(date(received)?),
            status: Set(status),
            ..Default::default()
        }
        .insert(txn)
        .await?;
        material_ids.insert(code, created.id);
    }

    let batches = [
        ("PB-1001", "Cassava Flour", "RM-1003", 1200, "2023-11-01", "2023-11-03", BatchStatus::InProgress, 65),
        ("PB-1002", "Cassava Starch", "RM-0998", 800, "2023-10-30", "2023-11-02", BatchStatus::Completed, 100),
        ("PB-1003", "Cassava Chips", "RM-0999", 500, "2023-10-29", "2023-10-31", BatchStatus::Completed, 100),
        ("PB-1004", "Cassava Flour", "RM-1000", 1000, "2023-10-28", "2023-10-30", BatchStatus::Completed, 100),
    ];

    for (code, product, material, quantity, started, ended, status, progress) in batches {
        let raw_material_id = material_ids
            .get(material)
            .copied()
            .with_context(|| format!("seed raw material {material} missing"))?;
        processing_batch::ActiveModel {
            batch_code: Set(code.to_string()),
            product: Set(product.to_string()),
            raw_material_id: Set(raw_material_id),
            raw_material: Set(material.to_string()),
            quantity: Set(quantity),
            start_date: Set(date(started)?),
            end_date: Set(Some(date(ended)?)),
            status: Set(status),
            progress: Set(progress),
            ..Default::default()
        }
        .insert(txn)
        .await?;
    }
    Ok(batches.len())
}
