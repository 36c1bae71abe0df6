// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use sea_orm_migration::prelude::*;

use super::m20250101_000001_create_accounts::{Clients, Users};

/// 项目、积分流水、任务与循环规则表迁移
#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // 1. Create projects table (Depends on Clients)
        manager
            .create_table(
                Table::create()
                    .table(Projects::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Projects::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Projects::ClientId).uuid().not_null())
                    .col(ColumnDef::new(Projects::Name).string().not_null())
                    .col(ColumnDef::new(Projects::Description).text().null())
                    .col(
                        ColumnDef::new(Projects::TimeTrackingEnabled)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(Projects::InitialCredit)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Projects::RemainingCredit)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Projects::AlertArmed)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(Projects::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Projects::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_projects_client")
                            .from(Projects::Table, Projects::ClientId)
                            .to(Clients::Table, Clients::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_projects_client")
                    .table(Projects::Table)
                    .col(Projects::ClientId)
                    .to_owned(),
            )
            .await?;

        // 2. Create recurrence_series table
        // template_task_id carries no FK: tasks reference the series instead,
        // the template binding is maintained by the recurrence repository.
        manager
            .create_table(
                Table::create()
                    .table(RecurrenceSeries::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(RecurrenceSeries::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(RecurrenceSeries::Frequency).string().not_null())
                    .col(
                        ColumnDef::new(RecurrenceSeries::Interval)
                            .integer()
                            .not_null()
                            .default(1),
                    )
                    .col(ColumnDef::new(RecurrenceSeries::StartDate).date().not_null())
                    .col(ColumnDef::new(RecurrenceSeries::EndDate).date().null())
                    .col(ColumnDef::new(RecurrenceSeries::Count).integer().null())
                    .col(ColumnDef::new(RecurrenceSeries::Byweekday).string().null())
                    .col(
                        ColumnDef::new(RecurrenceSeries::BusinessDaysOnly)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(RecurrenceSeries::MonthlyUseLastDay)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(RecurrenceSeries::MonthlyDay).integer().null())
                    .col(
                        ColumnDef::new(RecurrenceSeries::TemplateTaskId)
                            .uuid()
                            .not_null()
                            .unique_key(),
                    )
                    .col(
                        ColumnDef::new(RecurrenceSeries::LastMaterializedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(RecurrenceSeries::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(RecurrenceSeries::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        // 3. Create tasks table (Depends on Projects, Users, RecurrenceSeries)
        manager
            .create_table(
                Table::create()
                    .table(Tasks::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Tasks::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Tasks::ProjectId).uuid().not_null())
                    .col(ColumnDef::new(Tasks::UserId).uuid().null())
                    .col(ColumnDef::new(Tasks::Title).string().not_null())
                    .col(ColumnDef::new(Tasks::Description).text().null())
                    .col(
                        ColumnDef::new(Tasks::Status)
                            .string()
                            .not_null()
                            .default("to_do"),
                    )
                    .col(
                        ColumnDef::new(Tasks::Priority)
                            .string()
                            .not_null()
                            .default("normal"),
                    )
                    .col(ColumnDef::new(Tasks::EstimatedMinutes).integer().null())
                    .col(ColumnDef::new(Tasks::ActualMinutes).integer().null())
                    .col(
                        ColumnDef::new(Tasks::Position)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Tasks::IsArchived)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(Tasks::ArchivedAt).timestamp_with_time_zone().null())
                    .col(ColumnDef::new(Tasks::CompletedAt).timestamp_with_time_zone().null())
                    .col(ColumnDef::new(Tasks::ScheduledFor).date().null())
                    .col(ColumnDef::new(Tasks::RecurrenceSeriesId).uuid().null())
                    .col(
                        ColumnDef::new(Tasks::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Tasks::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_tasks_project")
                            .from(Tasks::Table, Tasks::ProjectId)
                            .to(Projects::Table, Projects::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_tasks_user")
                            .from(Tasks::Table, Tasks::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_tasks_recurrence_series")
                            .from(Tasks::Table, Tasks::RecurrenceSeriesId)
                            .to(RecurrenceSeries::Table, RecurrenceSeries::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        // Indexes for tasks
        manager
            .create_index(
                Index::create()
                    .name("uq_tasks_recurrence_series_scheduled_for")
                    .table(Tasks::Table)
                    .col(Tasks::RecurrenceSeriesId)
                    .col(Tasks::ScheduledFor)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_tasks_scheduled_for")
                    .table(Tasks::Table)
                    .col(Tasks::ScheduledFor)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_tasks_project_status")
                    .table(Tasks::Table)
                    .col(Tasks::ProjectId)
                    .col(Tasks::Status)
                    .to_owned(),
            )
            .await?;

        // 4. Create checklist_items table (Depends on Tasks)
        manager
            .create_table(
                Table::create()
                    .table(ChecklistItems::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ChecklistItems::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(ChecklistItems::TaskId).uuid().not_null())
                    .col(ColumnDef::new(ChecklistItems::Content).string().not_null())
                    .col(
                        ColumnDef::new(ChecklistItems::IsChecked)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(ChecklistItems::Position)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(ChecklistItems::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_checklist_items_task")
                            .from(ChecklistItems::Table, ChecklistItems::TaskId)
                            .to(Tasks::Table, Tasks::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // 5. Create time_entries table (Depends on Tasks, Users)
        manager
            .create_table(
                Table::create()
                    .table(TimeEntries::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(TimeEntries::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(TimeEntries::TaskId).uuid().not_null())
                    .col(ColumnDef::new(TimeEntries::UserId).uuid().not_null())
                    .col(ColumnDef::new(TimeEntries::Minutes).integer().not_null())
                    .col(ColumnDef::new(TimeEntries::Description).text().null())
                    .col(
                        ColumnDef::new(TimeEntries::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_time_entries_task")
                            .from(TimeEntries::Table, TimeEntries::TaskId)
                            .to(Tasks::Table, Tasks::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_time_entries_user")
                            .from(TimeEntries::Table, TimeEntries::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_time_entries_task")
                    .table(TimeEntries::Table)
                    .col(TimeEntries::TaskId)
                    .to_owned(),
            )
            .await?;

        // 6. Create credit_logs table (Depends on Projects, Tasks)
        manager
            .create_table(
                Table::create()
                    .table(CreditLogs::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(CreditLogs::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(CreditLogs::ProjectId).uuid().not_null())
                    .col(ColumnDef::new(CreditLogs::TaskId).uuid().null())
                    .col(ColumnDef::new(CreditLogs::Seq).big_integer().not_null())
                    .col(ColumnDef::new(CreditLogs::Kind).string().not_null())
                    .col(ColumnDef::new(CreditLogs::Amount).big_integer().not_null())
                    .col(ColumnDef::new(CreditLogs::Note).string().null())
                    .col(
                        ColumnDef::new(CreditLogs::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_credit_logs_project")
                            .from(CreditLogs::Table, CreditLogs::ProjectId)
                            .to(Projects::Table, Projects::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_credit_logs_task")
                            .from(CreditLogs::Table, CreditLogs::TaskId)
                            .to(Tasks::Table, Tasks::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("uq_credit_logs_project_seq")
                    .table(CreditLogs::Table)
                    .col(CreditLogs::ProjectId)
                    .col(CreditLogs::Seq)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(CreditLogs::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(TimeEntries::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(ChecklistItems::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Tasks::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(RecurrenceSeries::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Projects::Table).to_owned())
            .await?;

        Ok(())
    }
}

#[derive(DeriveIden)]
pub enum Projects {
    Table,
    Id,
    ClientId,
    Name,
    Description,
    TimeTrackingEnabled,
    InitialCredit,
    RemainingCredit,
    AlertArmed,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum RecurrenceSeries {
    Table,
    Id,
    Frequency,
    Interval,
    StartDate,
    EndDate,
    Count,
    Byweekday,
    BusinessDaysOnly,
    MonthlyUseLastDay,
    MonthlyDay,
    TemplateTaskId,
    LastMaterializedAt,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
pub enum Tasks {
    Table,
    Id,
    ProjectId,
    UserId,
    Title,
    Description,
    Status,
    Priority,
    EstimatedMinutes,
    ActualMinutes,
    Position,
    IsArchived,
    ArchivedAt,
    CompletedAt,
    ScheduledFor,
    RecurrenceSeriesId,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum ChecklistItems {
    Table,
    Id,
    TaskId,
    Content,
    IsChecked,
    Position,
    CreatedAt,
}

#[derive(DeriveIden)]
enum TimeEntries {
    Table,
    Id,
    TaskId,
    UserId,
    Minutes,
    Description,
    CreatedAt,
}

#[derive(DeriveIden)]
enum CreditLogs {
    Table,
    Id,
    ProjectId,
    TaskId,
    Seq,
    Kind,
    Amount,
    Note,
    CreatedAt,
}
