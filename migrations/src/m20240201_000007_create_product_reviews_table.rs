use sea_orm_migration::prelude::*;

use crate::m20240201_000001_create_catalog_tables::Products;
use crate::m20240201_000005_create_order_items_table::OrderItems;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ProductReviews::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ProductReviews::Id)
                            .uuid()
                            .primary_key()
                            .not_null(),
                    )
                    .col(ColumnDef::new(ProductReviews::UserId).uuid().not_null())
                    .col(ColumnDef::new(ProductReviews::ProductId).uuid().not_null())
                    .col(ColumnDef::new(ProductReviews::OrderItemId).uuid().null())
                    .col(ColumnDef::new(ProductReviews::Rating).integer().not_null())
                    .col(ColumnDef::new(ProductReviews::Comment).text().null())
                    .col(
                        ColumnDef::new(ProductReviews::CreatedAt)
                            .timestamp()
                            .not_null(),
                    )
                    .col(ColumnDef::new(ProductReviews::UpdatedAt).timestamp().null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_product_reviews_product")
                            .from(ProductReviews::Table, ProductReviews::ProductId)
                            .to(Products::Table, Products::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_product_reviews_order_item")
                            .from(ProductReviews::Table, ProductReviews::OrderItemId)
                            .to(OrderItems::Table, OrderItems::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("uq_product_reviews_user_product_item")
                    .table(ProductReviews::Table)
                    .col(ProductReviews::UserId)
                    .col(ProductReviews::ProductId)
                    .col(ProductReviews::OrderItemId)
                    .unique()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ProductReviews::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum ProductReviews {
    Table,
    Id,
    UserId,
    ProductId,
    OrderItemId,
    Rating,
    Comment,
    CreatedAt,
    UpdatedAt,
}
