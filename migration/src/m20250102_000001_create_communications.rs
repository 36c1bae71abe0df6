// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use sea_orm_migration::prelude::*;

/// 通知投递记录表迁移
#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Communications::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Communications::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Communications::Recipient).string().not_null())
                    .col(ColumnDef::new(Communications::Subject).string().not_null())
                    .col(ColumnDef::new(Communications::EventType).string().not_null())
                    .col(
                        ColumnDef::new(Communications::Status)
                            .string()
                            .not_null()
                            .default("queued"),
                    )
                    .col(ColumnDef::new(Communications::Payload).json().not_null())
                    .col(ColumnDef::new(Communications::UserId).uuid().null())
                    .col(ColumnDef::new(Communications::TaskId).uuid().null())
                    .col(ColumnDef::new(Communications::ProjectId).uuid().null())
                    .col(ColumnDef::new(Communications::TriggeredById).uuid().null())
                    .col(
                        ColumnDef::new(Communications::SentAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_communications_sent_at")
                    .table(Communications::Table)
                    .col(Communications::SentAt)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Communications::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Communications {
    Table,
    Id,
    Recipient,
    Subject,
    EventType,
    Status,
    Payload,
    UserId,
    TaskId,
    ProjectId,
    TriggeredById,
    SentAt,
}
