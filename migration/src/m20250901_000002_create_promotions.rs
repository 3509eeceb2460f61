use sea_orm_migration::prelude::*;

use crate::m20250901_000001_create_brands::Brands;

/// 促销码表
/// - code: 大写唯一，唯一索引是防止并发生成重复码的最终保障
/// - usage_limit: NULL 或 0 表示不限次数
/// - times_used: 由订单系统维护 (下单 +1，取消/退款 -1)
#[derive(DeriveIden)]
enum Promotions {
    Table,
    Id,
    BrandId,
    Code,
    Description,
    DiscountPercent,
    ValidFrom,
    ValidUntil,
    IsActive,
    UsageLimit,
    TimesUsed,
    CreatedBy,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Promotions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Promotions::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Promotions::BrandId).uuid().not_null())
                    .col(ColumnDef::new(Promotions::Code).string_len(32).not_null())
                    .col(
                        ColumnDef::new(Promotions::Description)
                            .text()
                            .not_null()
                            .default(""),
                    )
                    .col(
                        ColumnDef::new(Promotions::DiscountPercent)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Promotions::ValidFrom)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Promotions::ValidUntil)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Promotions::IsActive)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(ColumnDef::new(Promotions::UsageLimit).integer().null())
                    .col(
                        ColumnDef::new(Promotions::TimesUsed)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(Promotions::CreatedBy).string().null())
                    .col(
                        ColumnDef::new(Promotions::CreatedAt)
                            .timestamp_with_time_zone()
                            .default(Expr::cust("NOW()"))
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Promotions::UpdatedAt)
                            .timestamp_with_time_zone()
                            .default(Expr::cust("NOW()"))
                            .null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_promotions_brand")
                            .from(Promotions::Table, Promotions::BrandId)
                            .to(Brands::Table, Brands::Id)
                            .on_delete(ForeignKeyAction::Restrict)
                            .on_update(ForeignKeyAction::NoAction),
                    )
                    .check(Expr::col(Promotions::ValidUntil).gt(Expr::col(Promotions::ValidFrom)))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("uq_promotions_code")
                    .table(Promotions::Table)
                    .col(Promotions::Code)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_promotions_brand_id")
                    .table(Promotions::Table)
                    .col(Promotions::BrandId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_promotions_valid_until")
                    .table(Promotions::Table)
                    .col(Promotions::ValidUntil)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Promotions::Table).to_owned())
            .await?;
        Ok(())
    }
}
