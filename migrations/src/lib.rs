pub use sea_orm_migration::prelude::*;

mod m20240201_000001_create_catalog_tables;
mod m20240201_000002_create_cart_items_table;
mod m20240201_000003_create_coupons_table;
mod m20240201_000004_create_orders_table;
mod m20240201_000005_create_order_items_table;
mod m20240201_000006_create_order_status_history_table;
mod m20240201_000007_create_product_reviews_table;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240201_000001_create_catalog_tables::Migration),
            Box::new(m20240201_000002_create_cart_items_table::Migration),
            Box::new(m20240201_000003_create_coupons_table::Migration),
            Box::new(m20240201_000004_create_orders_table::Migration),
            Box::new(m20240201_000005_create_order_items_table::Migration),
            Box::new(m20240201_000006_create_order_status_history_table::Migration),
            Box::new(m20240201_000007_create_product_reviews_table::Migration),
        ]
    }
}
