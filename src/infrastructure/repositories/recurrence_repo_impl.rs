// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::recurrence::{
    format_weekdays, parse_weekdays, Frequency, RecurrenceRule, RecurrenceSeries,
};
use crate::domain::models::task::{ChecklistItem, Task, TaskStatus};
use crate::domain::repositories::recurrence_repository::{
    InsertedOccurrences, RecurrenceRepository,
};
use crate::infrastructure::database::entities::{
    checklist_item as checklist_entity, recurrence_series as series_entity, task as task_entity,
    time_entry as time_entry_entity,
};
use crate::infrastructure::repositories::task_repo_impl::{append_checklist_item, purge_tasks};
use crate::utils::errors::{CoreError, CoreResult};
use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use sea_orm::{
    sea_query::{Expr, OnConflict, Query},
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DatabaseConnection, EntityTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

/// 循环系列仓库实现
#[derive(Clone)]
pub struct RecurrenceRepositoryImpl {
    db: Arc<DatabaseConnection>,
}

impl RecurrenceRepositoryImpl {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }
}

impl From<series_entity::Model> for RecurrenceSeries {
    fn from(model: series_entity::Model) -> Self {
        let rule = RecurrenceRule {
            frequency: model.frequency.parse().unwrap_or(Frequency::Daily),
            interval: model.interval.max(1) as u32,
            start_date: model.start_date,
            end_date: model.end_date,
            count: model.count.filter(|c| *c > 0).map(|c| c as u32),
            byweekday: model
                .byweekday
                .as_deref()
                .map(parse_weekdays)
                .unwrap_or_default(),
            business_days_only: model.business_days_only,
            monthly_use_last_day: model.monthly_use_last_day,
            monthly_day: model.monthly_day.filter(|d| *d > 0).map(|d| d as u32),
        };
        Self {
            id: model.id,
            rule,
            template_task_id: model.template_task_id,
            last_materialized_at: model.last_materialized_at,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

fn apply_rule(active: &mut series_entity::ActiveModel, rule: &RecurrenceRule) {
    active.frequency = Set(rule.frequency.to_string());
    active.interval = Set(rule.interval as i32);
    active.start_date = Set(rule.start_date);
    active.end_date = Set(rule.end_date);
    active.count = Set(rule.count.map(|c| c as i32));
    active.byweekday = Set(format_weekdays(&rule.byweekday));
    active.business_days_only = Set(rule.business_days_only);
    active.monthly_use_last_day = Set(rule.monthly_use_last_day);
    active.monthly_day = Set(rule.monthly_day.map(|d| d as i32));
}

/// 可安全取消的未来实例
///
/// 计划日期晚于今天、仍为待办、未归档、没有时间记录，且不是 `keep`
fn cancellable(series_id: Uuid, today: NaiveDate, keep: Uuid) -> Condition {
    Condition::all()
        .add(task_entity::Column::RecurrenceSeriesId.eq(series_id))
        .add(task_entity::Column::ScheduledFor.gt(today))
        .add(task_entity::Column::Status.eq(TaskStatus::ToDo.to_string()))
        .add(task_entity::Column::IsArchived.eq(false))
        .add(task_entity::Column::Id.ne(keep))
        .add(
            task_entity::Column::Id.not_in_subquery(
                Query::select()
                    .column(time_entry_entity::Column::TaskId)
                    .from(time_entry_entity::Entity)
                    .to_owned(),
            ),
        )
}

async fn find_series<C: ConnectionTrait>(
    conn: &C,
    series_id: Uuid,
) -> CoreResult<series_entity::Model> {
    series_entity::Entity::find_by_id(series_id)
        .one(conn)
        .await
        .map_err(|e| CoreError::store("find_series", e))?
        .ok_or_else(|| CoreError::not_found("recurrence_series", series_id))
}

async fn cancel_in<C: ConnectionTrait>(
    conn: &C,
    series_id: Uuid,
    today: NaiveDate,
    keep: Uuid,
) -> CoreResult<u64> {
    let ids: Vec<Uuid> = task_entity::Entity::find()
        .select_only()
        .column(task_entity::Column::Id)
        .filter(cancellable(series_id, today, keep))
        .into_tuple()
        .all(conn)
        .await
        .map_err(|e| CoreError::store("find_cancellable", e))?;

    purge_tasks(conn, &ids).await
}

#[async_trait]
impl RecurrenceRepository for RecurrenceRepositoryImpl {
    async fn find_by_id(&self, id: Uuid) -> CoreResult<Option<RecurrenceSeries>> {
        let model = series_entity::Entity::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| CoreError::store("find_series", e))?;
        Ok(model.map(Into::into))
    }

    async fn find_by_template(
        &self,
        template_task_id: Uuid,
    ) -> CoreResult<Option<RecurrenceSeries>> {
        let model = series_entity::Entity::find()
            .filter(series_entity::Column::TemplateTaskId.eq(template_task_id))
            .one(self.db.as_ref())
            .await
            .map_err(|e| CoreError::store("find_series_by_template", e))?;
        Ok(model.map(Into::into))
    }

    async fn list_all(&self) -> CoreResult<Vec<RecurrenceSeries>> {
        let models = series_entity::Entity::find()
            .order_by_asc(series_entity::Column::CreatedAt)
            .all(self.db.as_ref())
            .await
            .map_err(|e| CoreError::store("list_series", e))?;
        Ok(models.into_iter().map(Into::into).collect())
    }

    async fn create_for_template(
        &self,
        template: &Task,
        rule: &RecurrenceRule,
    ) -> CoreResult<RecurrenceSeries> {
        let txn = self.db.begin().await?;
        let now = Utc::now();

        let mut active = series_entity::ActiveModel {
            id: Set(Uuid::new_v4()),
            template_task_id: Set(template.id),
            last_materialized_at: Set(None),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
            ..Default::default()
        };
        apply_rule(&mut active, rule);
        let series = active
            .insert(&txn)
            .await
            .map_err(|e| CoreError::store("create_series", e))?;

        let template_model = task_entity::Entity::find_by_id(template.id)
            .one(&txn)
            .await
            .map_err(|e| CoreError::store("find_template", e))?
            .ok_or_else(|| CoreError::not_found("task", template.id))?;
        let mut template_active: task_entity::ActiveModel = template_model.into();
        template_active.recurrence_series_id = Set(Some(series.id));
        template_active.scheduled_for = Set(Some(rule.start_date));
        template_active.updated_at = Set(now.into());
        template_active
            .update(&txn)
            .await
            .map_err(|e| CoreError::store("bind_template", e))?;

        txn.commit().await?;
        info!(series_id = %series.id, template_task_id = %template.id, "recurrence series created");
        Ok(series.into())
    }

    async fn replace_rule(
        &self,
        series_id: Uuid,
        rule: &RecurrenceRule,
        today: NaiveDate,
    ) -> CoreResult<u64> {
        let txn = self.db.begin().await?;
        let model = find_series(&txn, series_id).await?;
        let template_task_id = model.template_task_id;

        let mut active: series_entity::ActiveModel = model.into();
        apply_rule(&mut active, rule);
        active.last_materialized_at = Set(None);
        active.updated_at = Set(Utc::now().into());
        active
            .update(&txn)
            .await
            .map_err(|e| CoreError::store("replace_rule", e))?;

        let cancelled = cancel_in(&txn, series_id, today, template_task_id).await?;
        txn.commit().await?;
        Ok(cancelled)
    }

    async fn mark_materialized(
        &self,
        series_id: Uuid,
        normalized: Option<&RecurrenceRule>,
        at: DateTime<FixedOffset>,
    ) -> CoreResult<()> {
        let model = find_series(self.db.as_ref(), series_id).await?;
        let mut active: series_entity::ActiveModel = model.into();
        if let Some(rule) = normalized {
            apply_rule(&mut active, rule);
        }
        active.last_materialized_at = Set(Some(at));
        active.updated_at = Set(at);
        active
            .update(self.db.as_ref())
            .await
            .map_err(|e| CoreError::store("mark_materialized", e))?;
        Ok(())
    }

    async fn existing_dates(
        &self,
        series_id: Uuid,
        from: NaiveDate,
        to: NaiveDate,
    ) -> CoreResult<BTreeSet<NaiveDate>> {
        let dates: Vec<Option<NaiveDate>> = task_entity::Entity::find()
            .select_only()
            .column(task_entity::Column::ScheduledFor)
            .filter(task_entity::Column::RecurrenceSeriesId.eq(series_id))
            .filter(task_entity::Column::ScheduledFor.between(from, to))
            .into_tuple()
            .all(self.db.as_ref())
            .await
            .map_err(|e| CoreError::store("existing_dates", e))?;
        Ok(dates.into_iter().flatten().collect())
    }

    async fn insert_occurrences(
        &self,
        series: &RecurrenceSeries,
        template: &Task,
        checklist: &[ChecklistItem],
        dates: &[NaiveDate],
    ) -> CoreResult<InsertedOccurrences> {
        let mut report = InsertedOccurrences::default();
        if dates.is_empty() {
            return Ok(report);
        }

        let txn = self.db.begin().await?;
        for date in dates {
            let id = Uuid::new_v4();
            let now = Utc::now();
            let occurrence = task_entity::ActiveModel {
                id: Set(id),
                project_id: Set(template.project_id),
                user_id: Set(template.user_id),
                title: Set(template.title.clone()),
                description: Set(template.description.clone()),
                status: Set(TaskStatus::ToDo.to_string()),
                priority: Set(template.priority.to_string()),
                estimated_minutes: Set(template.estimated_minutes),
                actual_minutes: Set(None),
                position: Set(template.position),
                is_archived: Set(false),
                archived_at: Set(None),
                completed_at: Set(None),
                scheduled_for: Set(Some(*date)),
                recurrence_series_id: Set(Some(series.id)),
                created_at: Set(now.into()),
                updated_at: Set(now.into()),
            };

            let inserted = task_entity::Entity::insert(occurrence)
                .on_conflict(
                    OnConflict::columns([
                        task_entity::Column::RecurrenceSeriesId,
                        task_entity::Column::ScheduledFor,
                    ])
                    .do_nothing()
                    .to_owned(),
                )
                .exec_without_returning(&txn)
                .await
                .map_err(|e| CoreError::store("insert_occurrence", e))?;

            if inserted == 0 {
                debug!(series_id = %series.id, %date, "occurrence already present");
                report.conflicted.push(*date);
                continue;
            }

            for item in checklist {
                append_checklist_item(&txn, id, &item.content, item.position).await?;
            }
            report.created.push(*date);
        }
        txn.commit().await?;

        Ok(report)
    }

    async fn cancel_future(
        &self,
        series_id: Uuid,
        today: NaiveDate,
        keep: Uuid,
    ) -> CoreResult<u64> {
        let txn = self.db.begin().await?;
        let cancelled = cancel_in(&txn, series_id, today, keep).await?;
        txn.commit().await?;
        Ok(cancelled)
    }

    async fn delete_series(
        &self,
        series_id: Uuid,
        today: NaiveDate,
        keep: Uuid,
    ) -> CoreResult<u64> {
        let txn = self.db.begin().await?;
        find_series(&txn, series_id).await?;

        let cancelled = cancel_in(&txn, series_id, today, keep).await?;

        // 只清除仍在未来的计划日期，已发生的保留
        task_entity::Entity::update_many()
            .col_expr(
                task_entity::Column::ScheduledFor,
                Expr::value(Option::<NaiveDate>::None),
            )
            .filter(task_entity::Column::RecurrenceSeriesId.eq(series_id))
            .filter(task_entity::Column::ScheduledFor.gt(today))
            .exec(&txn)
            .await
            .map_err(|e| CoreError::store("clear_future_dates", e))?;

        task_entity::Entity::update_many()
            .col_expr(
                task_entity::Column::RecurrenceSeriesId,
                Expr::value(Option::<Uuid>::None),
            )
            .filter(task_entity::Column::RecurrenceSeriesId.eq(series_id))
            .exec(&txn)
            .await
            .map_err(|e| CoreError::store("detach_occurrences", e))?;

        series_entity::Entity::delete_by_id(series_id)
            .exec(&txn)
            .await
            .map_err(|e| CoreError::store("delete_series", e))?;

        txn.commit().await?;
        Ok(cancelled)
    }

    async fn sync_checklist_forward(
        &self,
        series_id: Uuid,
        template_task_id: Uuid,
        today: NaiveDate,
    ) -> CoreResult<u64> {
        let txn = self.db.begin().await?;

        let template_items = checklist_entity::Entity::find()
            .filter(checklist_entity::Column::TaskId.eq(template_task_id))
            .order_by_asc(checklist_entity::Column::Position)
            .all(&txn)
            .await
            .map_err(|e| CoreError::store("template_checklist", e))?;

        let targets: Vec<Uuid> = task_entity::Entity::find()
            .select_only()
            .column(task_entity::Column::Id)
            .filter(cancellable(series_id, today, template_task_id))
            .into_tuple()
            .all(&txn)
            .await
            .map_err(|e| CoreError::store("sync_targets", e))?;

        let mut appended = 0u64;
        for task_id in targets {
            let existing = checklist_entity::Entity::find()
                .filter(checklist_entity::Column::TaskId.eq(task_id))
                .all(&txn)
                .await
                .map_err(|e| CoreError::store("target_checklist", e))?;
            let mut contents: HashSet<String> =
                existing.iter().map(|i| i.content.clone()).collect();
            let mut next_position = existing.iter().map(|i| i.position + 1).max().unwrap_or(0);

            for item in &template_items {
                if contents.contains(&item.content) {
                    continue;
                }
                append_checklist_item(&txn, task_id, &item.content, next_position).await?;
                contents.insert(item.content.clone());
                next_position += 1;
                appended += 1;
            }
        }

        txn.commit().await?;
        Ok(appended)
    }

    async fn occurrences(&self, series_id: Uuid) -> CoreResult<Vec<Task>> {
        let models = task_entity::Entity::find()
            .filter(task_entity::Column::RecurrenceSeriesId.eq(series_id))
            .order_by_asc(task_entity::Column::ScheduledFor)
            .all(self.db.as_ref())
            .await
            .map_err(|e| CoreError::store("occurrences", e))?;
        Ok(models.into_iter().map(Into::into).collect())
    }
}

#[cfg(test)]
#[path = "recurrence_repo_impl_test.rs"]
mod tests;
