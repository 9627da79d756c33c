use sea_orm_migration::prelude::*;

use crate::m20240201_000003_create_coupons_table::Coupons;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Orders::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Orders::Id).uuid().primary_key().not_null())
                    .col(
                        ColumnDef::new(Orders::OrderNumber)
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .col(
                        ColumnDef::new(Orders::Status)
                            .string_len(20)
                            .not_null()
                            .default("placed"),
                    )
                    .col(ColumnDef::new(Orders::UserId).uuid().not_null())
                    .col(
                        ColumnDef::new(Orders::TotalPrice)
                            .decimal_len(19, 4)
                            .not_null()
                            .default(0.0),
                    )
                    .col(
                        ColumnDef::new(Orders::TaxTotal)
                            .decimal_len(19, 4)
                            .not_null()
                            .default(0.0),
                    )
                    .col(
                        ColumnDef::new(Orders::IsDeleted)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Orders::PaymentMethod)
                            .string_len(20)
                            .not_null()
                            .default("online"),
                    )
                    .col(ColumnDef::new(Orders::GatewayOrderId).string().null())
                    .col(ColumnDef::new(Orders::GatewayPaymentId).string().null())
                    .col(
                        ColumnDef::new(Orders::IsPaid)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(Orders::ShippingOrderId).string().null())
                    .col(ColumnDef::new(Orders::ShipmentId).string().null())
                    .col(ColumnDef::new(Orders::TrackingCode).string().null())
                    .col(
                        ColumnDef::new(Orders::CodCharge)
                            .decimal_len(19, 4)
                            .not_null()
                            .default(0.0),
                    )
                    .col(ColumnDef::new(Orders::Name).string().null())
                    .col(ColumnDef::new(Orders::Email).string().null())
                    .col(ColumnDef::new(Orders::PhoneNumber).string().null())
                    .col(ColumnDef::new(Orders::State).string().null())
                    .col(ColumnDef::new(Orders::City).string().null())
                    .col(ColumnDef::new(Orders::Address).string().null())
                    .col(ColumnDef::new(Orders::Pincode).string().null())
                    .col(ColumnDef::new(Orders::Landmark).string().null())
                    .col(ColumnDef::new(Orders::CouponId).uuid().null())
                    .col(
                        ColumnDef::new(Orders::DiscountAmount)
                            .decimal_len(19, 4)
                            .not_null()
                            .default(0.0),
                    )
                    .col(
                        ColumnDef::new(Orders::FinalPrice)
                            .decimal_len(19, 4)
                            .not_null()
                            .default(0.0),
                    )
                    .col(ColumnDef::new(Orders::CreatedAt).timestamp().not_null())
                    .col(ColumnDef::new(Orders::UpdatedAt).timestamp().null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_orders_coupon")
                            .from(Orders::Table, Orders::CouponId)
                            .to(Coupons::Table, Coupons::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_orders_user")
                    .table(Orders::Table)
                    .col(Orders::UserId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_orders_gateway_order")
                    .table(Orders::Table)
                    .col(Orders::GatewayOrderId)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Orders::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum Orders {
    Table,
    Id,
    OrderNumber,
    Status,
    UserId,
    TotalPrice,
    TaxTotal,
    IsDeleted,
    PaymentMethod,
    GatewayOrderId,
    GatewayPaymentId,
    IsPaid,
    ShippingOrderId,
    ShipmentId,
    TrackingCode,
    CodCharge,
    Name,
    Email,
    PhoneNumber,
    State,
    City,
    Address,
    Pincode,
    Landmark,
    CouponId,
    DiscountAmount,
    FinalPrice,
    CreatedAt,
    UpdatedAt,
}
