// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::credits::{
    evaluate_alert, AlertTransition, AppliedMovement, CreditLogEntry, CreditLogKind,
    CreditMovement, MovementDirection, MovementOutcome, NewTimeEntry, TimeLogOutcome,
};
use crate::domain::models::notification::{ProjectRef, TaskRef};
use crate::domain::models::project::{NewProject, Project};
use crate::domain::models::task::TimeEntry;
use crate::domain::repositories::project_repository::ProjectRepository;
use crate::infrastructure::database::entities::{
    credit_log as credit_log_entity, project as project_entity, task as task_entity,
    time_entry as time_entry_entity,
};
use crate::utils::errors::{CoreError, CoreResult};
use async_trait::async_trait;
use chrono::{DateTime, FixedOffset};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DatabaseTransaction,
    DbBackend, EntityTrait, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

/// 项目仓库实现
///
/// 基于SeaORM实现的账本数据访问层。每个写操作先锁定项目行，
/// 再写流水、更新余额和布防标记，最后一起提交。
#[derive(Clone)]
pub struct ProjectRepositoryImpl {
    db: Arc<DatabaseConnection>,
}

impl ProjectRepositoryImpl {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }
}

impl From<project_entity::Model> for Project {
    fn from(model: project_entity::Model) -> Self {
        Self {
            id: model.id,
            client_id: model.client_id,
            name: model.name,
            description: model.description,
            time_tracking_enabled: model.time_tracking_enabled,
            initial_credit: model.initial_credit,
            remaining_credit: model.remaining_credit,
            alert_armed: model.alert_armed,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

impl From<credit_log_entity::Model> for CreditLogEntry {
    fn from(model: credit_log_entity::Model) -> Self {
        let fallback = if model.amount >= 0 {
            CreditLogKind::Credit
        } else {
            CreditLogKind::Debit
        };
        Self {
            id: model.id,
            project_id: model.project_id,
            task_id: model.task_id,
            seq: model.seq,
            kind: model.kind.parse().unwrap_or(fallback),
            amount: model.amount,
            note: model.note,
            created_at: model.created_at,
        }
    }
}

impl From<time_entry_entity::Model> for TimeEntry {
    fn from(model: time_entry_entity::Model) -> Self {
        Self {
            id: model.id,
            task_id: model.task_id,
            user_id: model.user_id,
            minutes: model.minutes,
            description: model.description,
            created_at: model.created_at,
        }
    }
}

/// 在事务内锁定项目行
///
/// SQLite 没有行级锁，写事务本身已经串行
async fn lock_project<C: ConnectionTrait>(
    conn: &C,
    project_id: Uuid,
) -> CoreResult<project_entity::Model> {
    let mut query = project_entity::Entity::find_by_id(project_id);
    if conn.get_database_backend() != DbBackend::Sqlite {
        query = query.lock_exclusive();
    }
    query
        .one(conn)
        .await
        .map_err(|e| CoreError::store("lock_project", e))?
        .ok_or_else(|| CoreError::not_found("project", project_id))
}

async fn next_seq<C: ConnectionTrait>(conn: &C, project_id: Uuid) -> CoreResult<i64> {
    let max_seq = credit_log_entity::Entity::find()
        .select_only()
        .column_as(credit_log_entity::Column::Seq.max(), "max_seq")
        .filter(credit_log_entity::Column::ProjectId.eq(project_id))
        .into_tuple::<Option<i64>>()
        .one(conn)
        .await
        .map_err(|e| CoreError::store("next_seq", e))?
        .flatten();
    Ok(max_seq.unwrap_or(0) + 1)
}

async fn insert_log<C: ConnectionTrait>(
    conn: &C,
    project_id: Uuid,
    task_id: Option<Uuid>,
    kind: CreditLogKind,
    amount: i64,
    note: Option<String>,
    now: DateTime<FixedOffset>,
) -> CoreResult<credit_log_entity::Model> {
    let seq = next_seq(conn, project_id).await?;
    credit_log_entity::ActiveModel {
        id: Set(Uuid::new_v4()),
        project_id: Set(project_id),
        task_id: Set(task_id),
        seq: Set(seq),
        kind: Set(kind.to_string()),
        amount: Set(amount),
        note: Set(note),
        created_at: Set(now),
    }
    .insert(conn)
    .await
    .map_err(|e| CoreError::store("insert_credit_log", e))
}

fn project_ref(project: &project_entity::Model) -> ProjectRef {
    ProjectRef {
        id: project.id,
        name: project.name.clone(),
        client_id: project.client_id,
    }
}

/// 一条已锁定项目上的流水
struct LockedMovement {
    kind: CreditLogKind,
    amount: i64,
    task_id: Option<Uuid>,
    note: Option<String>,
}

/// 对已锁定的项目应用一条流水
async fn apply_locked(
    txn: &DatabaseTransaction,
    project: project_entity::Model,
    movement: LockedMovement,
    threshold: i64,
    now: DateTime<FixedOffset>,
) -> CoreResult<MovementOutcome> {
    let LockedMovement {
        kind,
        amount,
        task_id,
        note,
    } = movement;
    if !project.time_tracking_enabled {
        debug!(project_id = %project.id, "time tracking disabled, ledger untouched");
        return Ok(MovementOutcome::TrackingDisabled);
    }
    if amount == 0 {
        return Err(CoreError::InvalidInput(
            "ledger movement must be non-zero".to_string(),
        ));
    }

    let balance_before = project.remaining_credit;
    let balance_after = balance_before
        .checked_add(amount)
        .ok_or_else(|| CoreError::InvalidInput("credit balance overflow".to_string()))?;
    let direction = MovementDirection::of_amount(amount);
    let alert = evaluate_alert(project.alert_armed, balance_after, threshold, direction);

    let entry = insert_log(txn, project.id, task_id, kind, amount, note, now).await?;

    let snapshot = project_ref(&project);
    let project_id = project.id;
    let initial_credit = project.initial_credit;
    let mut active: project_entity::ActiveModel = project.into();
    active.remaining_credit = Set(balance_after);
    if kind == CreditLogKind::OpeningAdjustment {
        active.initial_credit = Set(initial_credit + amount);
    }
    match alert {
        AlertTransition::Fired => active.alert_armed = Set(false),
        AlertTransition::Rearmed => active.alert_armed = Set(true),
        AlertTransition::Unchanged => {}
    }
    active.updated_at = Set(now);
    active
        .update(txn)
        .await
        .map_err(|e| CoreError::store("update_balance", e))?;

    debug!(
        project_id = %project_id,
        kind = %kind,
        amount,
        balance = balance_after,
        "ledger movement applied"
    );

    Ok(MovementOutcome::Applied(AppliedMovement {
        project: snapshot,
        entry: entry.into(),
        balance_before,
        balance_after,
        alert,
    }))
}

#[async_trait]
impl ProjectRepository for ProjectRepositoryImpl {
    async fn create(
        &self,
        project: &NewProject,
        threshold: i64,
        now: DateTime<FixedOffset>,
    ) -> CoreResult<Project> {
        let txn = self.db.begin().await?;
        let seed = if project.time_tracking_enabled {
            project.initial_credit
        } else {
            0
        };

        let model = project_entity::ActiveModel {
            id: Set(Uuid::new_v4()),
            client_id: Set(project.client_id),
            name: Set(project.name.clone()),
            description: Set(project.description.clone()),
            time_tracking_enabled: Set(project.time_tracking_enabled),
            initial_credit: Set(seed),
            remaining_credit: Set(seed),
            alert_armed: Set(project.time_tracking_enabled && seed >= threshold),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&txn)
        .await
        .map_err(|e| CoreError::store("create_project", e))?;

        if seed > 0 {
            insert_log(
                &txn,
                model.id,
                None,
                CreditLogKind::Opening,
                seed,
                Some("Initial credit".to_string()),
                now,
            )
            .await?;
        }

        txn.commit().await?;
        info!(project_id = %model.id, initial_credit = seed, "project created");
        Ok(model.into())
    }

    async fn find_by_id(&self, id: Uuid) -> CoreResult<Option<Project>> {
        let model = project_entity::Entity::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| CoreError::store("find_project", e))?;
        Ok(model.map(Into::into))
    }

    async fn apply_movement(
        &self,
        movement: &CreditMovement,
        threshold: i64,
        now: DateTime<FixedOffset>,
    ) -> CoreResult<MovementOutcome> {
        if !movement.kind.is_movement() {
            return Err(CoreError::InvalidInput(format!(
                "{} rows are written by project setup only",
                movement.kind
            )));
        }

        let txn = self.db.begin().await?;
        let project = lock_project(&txn, movement.project_id).await?;
        let outcome = apply_locked(
            &txn,
            project,
            LockedMovement {
                kind: movement.kind,
                amount: movement.amount,
                task_id: movement.task_id,
                note: movement.note.clone(),
            },
            threshold,
            now,
        )
        .await?;
        txn.commit().await?;
        Ok(outcome)
    }

    async fn record_time(
        &self,
        entry: &NewTimeEntry,
        threshold: i64,
        now: DateTime<FixedOffset>,
    ) -> CoreResult<TimeLogOutcome> {
        let minutes = i32::try_from(entry.minutes)
            .map_err(|_| CoreError::InvalidInput(format!("{} minutes", entry.minutes)))?;
        if minutes <= 0 {
            return Err(CoreError::InvalidInput(
                "time entry must be positive".to_string(),
            ));
        }

        let txn = self.db.begin().await?;
        let task = task_entity::Entity::find_by_id(entry.task_id)
            .one(&txn)
            .await
            .map_err(|e| CoreError::store("find_task", e))?
            .ok_or_else(|| CoreError::not_found("task", entry.task_id))?;
        let project = lock_project(&txn, task.project_id).await?;

        let time_entry = time_entry_entity::ActiveModel {
            id: Set(Uuid::new_v4()),
            task_id: Set(task.id),
            user_id: Set(entry.user_id),
            minutes: Set(minutes),
            description: Set(entry.description.clone()),
            created_at: Set(now),
        }
        .insert(&txn)
        .await
        .map_err(|e| CoreError::store("insert_time_entry", e))?;

        let actual_minutes = task.actual_minutes.unwrap_or(0).saturating_add(minutes);
        let task_id = task.id;
        let task_ref = TaskRef {
            id: task.id,
            title: task.title.clone(),
            project_id: project.id,
            project_name: project.name.clone(),
            client_id: project.client_id,
            assignee_id: task.user_id,
        };
        let note = entry
            .description
            .clone()
            .unwrap_or_else(|| format!("Time logged on {}", task.title));
        let mut active_task: task_entity::ActiveModel = task.into();
        active_task.actual_minutes = Set(Some(actual_minutes));
        active_task.updated_at = Set(now);
        active_task
            .update(&txn)
            .await
            .map_err(|e| CoreError::store("update_actual_minutes", e))?;

        let ledger = apply_locked(
            &txn,
            project,
            LockedMovement {
                kind: CreditLogKind::Debit,
                amount: -entry.minutes,
                task_id: Some(task_id),
                note: Some(note),
            },
            threshold,
            now,
        )
        .await?;

        txn.commit().await?;
        Ok(TimeLogOutcome {
            entry: time_entry.into(),
            task: task_ref,
            actual_minutes,
            ledger,
        })
    }

    async fn adjust_initial_credit(
        &self,
        project_id: Uuid,
        new_initial: i64,
        threshold: i64,
        now: DateTime<FixedOffset>,
    ) -> CoreResult<MovementOutcome> {
        let txn = self.db.begin().await?;
        let project = lock_project(&txn, project_id).await?;
        if !project.time_tracking_enabled {
            return Ok(MovementOutcome::TrackingDisabled);
        }

        let delta = new_initial - project.initial_credit;
        if delta == 0 {
            return Ok(MovementOutcome::NoChange);
        }

        let outcome = apply_locked(
            &txn,
            project,
            LockedMovement {
                kind: CreditLogKind::OpeningAdjustment,
                amount: delta,
                task_id: None,
                note: Some("Initial credit adjusted".to_string()),
            },
            threshold,
            now,
        )
        .await?;
        txn.commit().await?;
        Ok(outcome)
    }

    async fn set_time_tracking(
        &self,
        project_id: Uuid,
        enabled: bool,
        now: DateTime<FixedOffset>,
    ) -> CoreResult<Project> {
        let txn = self.db.begin().await?;
        let project = lock_project(&txn, project_id).await?;
        if project.time_tracking_enabled == enabled {
            txn.commit().await?;
            return Ok(project.into());
        }

        let mut active: project_entity::ActiveModel = project.into();
        active.time_tracking_enabled = Set(enabled);
        if !enabled {
            let purged = credit_log_entity::Entity::delete_many()
                .filter(credit_log_entity::Column::ProjectId.eq(project_id))
                .exec(&txn)
                .await
                .map_err(|e| CoreError::store("purge_credit_logs", e))?;
            active.initial_credit = Set(0);
            active.remaining_credit = Set(0);
            active.alert_armed = Set(false);
            info!(%project_id, purged = purged.rows_affected, "time tracking disabled");
        } else {
            info!(%project_id, "time tracking enabled");
        }
        active.updated_at = Set(now);
        let updated = active
            .update(&txn)
            .await
            .map_err(|e| CoreError::store("set_time_tracking", e))?;

        txn.commit().await?;
        Ok(updated.into())
    }

    async fn history(&self, project_id: Uuid) -> CoreResult<Vec<CreditLogEntry>> {
        let rows = credit_log_entity::Entity::find()
            .filter(credit_log_entity::Column::ProjectId.eq(project_id))
            .order_by_desc(credit_log_entity::Column::Seq)
            .all(self.db.as_ref())
            .await
            .map_err(|e| CoreError::store("credit_history", e))?;
        Ok(rows.into_iter().map(Into::into).collect())
    }
}

#[cfg(test)]
#[path = "project_repo_impl_test.rs"]
mod tests;
