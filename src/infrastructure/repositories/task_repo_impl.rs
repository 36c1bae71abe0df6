// Copyright 2025 Kirky.X
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use crate::domain::models::notification::TaskRef;
use crate::domain::models::task::{ChecklistItem, NewTask, Task, TaskStatus, TimeEntry};
use crate::domain::repositories::task_repository::TaskRepository;
use crate::infrastructure::database::entities::{
    checklist_item as checklist_entity, credit_log as credit_log_entity,
    project as project_entity, task as task_entity, time_entry as time_entry_entity,
};
use crate::utils::errors::{CoreError, CoreResult};
use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, Utc};
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection,
    EntityTrait, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

/// 任务仓库实现
///
/// 基于SeaORM实现的任务数据访问层
#[derive(Clone)]
pub struct TaskRepositoryImpl {
    /// 数据库连接
    db: Arc<DatabaseConnection>,
}

impl TaskRepositoryImpl {
    /// 创建新的任务仓库实例
    ///
    /// # 参数
    ///
    /// * `db` - 数据库连接
    ///
    /// # 返回值
    ///
    /// 返回新的任务仓库实例
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }
}

impl From<task_entity::Model> for Task {
    fn from(model: task_entity::Model) -> Self {
        Self {
            id: model.id,
            project_id: model.project_id,
            user_id: model.user_id,
            title: model.title,
            description: model.description,
            status: model.status.parse().unwrap_or_default(),
            priority: model.priority.parse().unwrap_or_default(),
            estimated_minutes: model.estimated_minutes,
            actual_minutes: model.actual_minutes,
            position: model.position,
            is_archived: model.is_archived,
            archived_at: model.archived_at,
            completed_at: model.completed_at,
            scheduled_for: model.scheduled_for,
            recurrence_series_id: model.recurrence_series_id,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

impl From<checklist_entity::Model> for ChecklistItem {
    fn from(model: checklist_entity::Model) -> Self {
        Self {
            id: model.id,
            task_id: model.task_id,
            content: model.content,
            is_checked: model.is_checked,
            position: model.position,
        }
    }
}

/// 追加一个检查项到任务末尾
pub(crate) async fn append_checklist_item<C: ConnectionTrait>(
    conn: &C,
    task_id: Uuid,
    content: &str,
    position: i32,
) -> CoreResult<checklist_entity::Model> {
    checklist_entity::ActiveModel {
        id: Set(Uuid::new_v4()),
        task_id: Set(task_id),
        content: Set(content.to_string()),
        is_checked: Set(false),
        position: Set(position),
        created_at: Set(Utc::now().into()),
    }
    .insert(conn)
    .await
    .map_err(|e| CoreError::store("insert_checklist_item", e))
}

/// 删除任务及其子记录，积分流水保留
pub(crate) async fn purge_tasks<C: ConnectionTrait>(conn: &C, ids: &[Uuid]) -> CoreResult<u64> {
    if ids.is_empty() {
        return Ok(0);
    }

    credit_log_entity::Entity::update_many()
        .col_expr(credit_log_entity::Column::TaskId, Expr::value(Option::<Uuid>::None))
        .filter(credit_log_entity::Column::TaskId.is_in(ids.to_vec()))
        .exec(conn)
        .await
        .map_err(|e| CoreError::store("detach_credit_logs", e))?;

    checklist_entity::Entity::delete_many()
        .filter(checklist_entity::Column::TaskId.is_in(ids.to_vec()))
        .exec(conn)
        .await
        .map_err(|e| CoreError::store("delete_checklist_items", e))?;

    time_entry_entity::Entity::delete_many()
        .filter(time_entry_entity::Column::TaskId.is_in(ids.to_vec()))
        .exec(conn)
        .await
        .map_err(|e| CoreError::store("delete_time_entries", e))?;

    let result = task_entity::Entity::delete_many()
        .filter(task_entity::Column::Id.is_in(ids.to_vec()))
        .exec(conn)
        .await
        .map_err(|e| CoreError::store("delete_tasks", e))?;

    Ok(result.rows_affected)
}

#[async_trait]
impl TaskRepository for TaskRepositoryImpl {
    async fn create(&self, task: &NewTask) -> CoreResult<Task> {
        let txn = self.db.begin().await?;
        let now = Utc::now();

        let model = task_entity::ActiveModel {
            id: Set(Uuid::new_v4()),
            project_id: Set(task.project_id),
            user_id: Set(task.user_id),
            title: Set(task.title.clone()),
            description: Set(task.description.clone()),
            status: Set(TaskStatus::ToDo.to_string()),
            priority: Set(task.priority.to_string()),
            estimated_minutes: Set(task.estimated_minutes),
            actual_minutes: Set(None),
            position: Set(task.position),
            is_archived: Set(false),
            archived_at: Set(None),
            completed_at: Set(None),
            scheduled_for: Set(None),
            recurrence_series_id: Set(None),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        }
        .insert(&txn)
        .await
        .map_err(|e| CoreError::store("create_task", e))?;

        for (position, content) in task.checklist.iter().enumerate() {
            append_checklist_item(&txn, model.id, content, position as i32).await?;
        }

        txn.commit().await?;
        Ok(model.into())
    }

    async fn find_by_id(&self, id: Uuid) -> CoreResult<Option<Task>> {
        let model = task_entity::Entity::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| CoreError::store("find_task", e))?;
        Ok(model.map(Into::into))
    }

    async fn find_ref(&self, id: Uuid) -> CoreResult<Option<TaskRef>> {
        let Some(task) = task_entity::Entity::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| CoreError::store("find_task", e))?
        else {
            return Ok(None);
        };
        let project = project_entity::Entity::find_by_id(task.project_id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| CoreError::store("find_project", e))?
            .ok_or_else(|| CoreError::not_found("project", task.project_id))?;

        Ok(Some(TaskRef {
            id: task.id,
            title: task.title,
            project_id: project.id,
            project_name: project.name,
            client_id: project.client_id,
            assignee_id: task.user_id,
        }))
    }

    async fn update_status(
        &self,
        id: Uuid,
        status: TaskStatus,
        completed_at: Option<DateTime<FixedOffset>>,
    ) -> CoreResult<Task> {
        let model = task_entity::Entity::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| CoreError::store("find_task", e))?
            .ok_or_else(|| CoreError::not_found("task", id))?;

        let was_archived = model.is_archived;
        let mut active: task_entity::ActiveModel = model.into();
        active.status = Set(status.to_string());
        active.completed_at = Set(completed_at);
        // 归档只针对已完成任务，重新打开即取消归档
        if status != TaskStatus::Done && was_archived {
            active.is_archived = Set(false);
            active.archived_at = Set(None);
            info!(task_id = %id, "archived task reopened");
        }
        active.updated_at = Set(Utc::now().into());
        let updated = active
            .update(self.db.as_ref())
            .await
            .map_err(|e| CoreError::store("update_task_status", e))?;
        Ok(updated.into())
    }

    async fn delete(&self, id: Uuid) -> CoreResult<()> {
        let txn = self.db.begin().await?;
        let deleted = purge_tasks(&txn, &[id]).await?;
        if deleted == 0 {
            return Err(CoreError::not_found("task", id));
        }
        txn.commit().await?;
        info!(task_id = %id, "task deleted");
        Ok(())
    }

    async fn archive_completed_before(
        &self,
        cutoff: DateTime<FixedOffset>,
        now: DateTime<FixedOffset>,
    ) -> CoreResult<u64> {
        let result = task_entity::Entity::update_many()
            .col_expr(task_entity::Column::IsArchived, Expr::value(true))
            .col_expr(task_entity::Column::ArchivedAt, Expr::value(now))
            .col_expr(task_entity::Column::UpdatedAt, Expr::value(now))
            .filter(task_entity::Column::Status.eq(TaskStatus::Done.to_string()))
            .filter(task_entity::Column::IsArchived.eq(false))
            .filter(task_entity::Column::CompletedAt.is_not_null())
            .filter(task_entity::Column::CompletedAt.lt(cutoff))
            .exec(self.db.as_ref())
            .await
            .map_err(|e| CoreError::store("archive_tasks", e))?;
        Ok(result.rows_affected)
    }

    async fn todo_for_user(&self, user_id: Uuid) -> CoreResult<Vec<Task>> {
        let models = task_entity::Entity::find()
            .filter(task_entity::Column::UserId.eq(user_id))
            .filter(task_entity::Column::Status.eq(TaskStatus::ToDo.to_string()))
            .filter(task_entity::Column::IsArchived.eq(false))
            .order_by_asc(task_entity::Column::Position)
            .all(self.db.as_ref())
            .await
            .map_err(|e| CoreError::store("todo_for_user", e))?;
        Ok(models.into_iter().map(Into::into).collect())
    }

    async fn list_by_project(&self, project_id: Uuid) -> CoreResult<Vec<Task>> {
        let models = task_entity::Entity::find()
            .filter(task_entity::Column::ProjectId.eq(project_id))
            .filter(task_entity::Column::IsArchived.eq(false))
            .order_by_asc(task_entity::Column::Position)
            .order_by_asc(task_entity::Column::CreatedAt)
            .all(self.db.as_ref())
            .await
            .map_err(|e| CoreError::store("list_tasks", e))?;
        Ok(models.into_iter().map(Into::into).collect())
    }

    async fn checklist(&self, task_id: Uuid) -> CoreResult<Vec<ChecklistItem>> {
        let models = checklist_entity::Entity::find()
            .filter(checklist_entity::Column::TaskId.eq(task_id))
            .order_by_asc(checklist_entity::Column::Position)
            .all(self.db.as_ref())
            .await
            .map_err(|e| CoreError::store("checklist", e))?;
        Ok(models.into_iter().map(Into::into).collect())
    }

    async fn add_checklist_item(&self, task_id: Uuid, content: &str) -> CoreResult<ChecklistItem> {
        let max_position = checklist_entity::Entity::find()
            .select_only()
            .column_as(checklist_entity::Column::Position.max(), "max_position")
            .filter(checklist_entity::Column::TaskId.eq(task_id))
            .into_tuple::<Option<i32>>()
            .one(self.db.as_ref())
            .await
            .map_err(|e| CoreError::store("checklist_position", e))?
            .flatten();
        let position = max_position.map(|p| p + 1).unwrap_or(0);

        let model = append_checklist_item(self.db.as_ref(), task_id, content, position).await?;
        Ok(model.into())
    }

    async fn set_checklist_item_checked(&self, item_id: Uuid, checked: bool) -> CoreResult<()> {
        let model = checklist_entity::Entity::find_by_id(item_id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| CoreError::store("find_checklist_item", e))?
            .ok_or_else(|| CoreError::not_found("checklist_item", item_id))?;

        let mut active: checklist_entity::ActiveModel = model.into();
        active.is_checked = Set(checked);
        active
            .update(self.db.as_ref())
            .await
            .map_err(|e| CoreError::store("check_checklist_item", e))?;
        Ok(())
    }

    async fn time_entries(&self, task_id: Uuid) -> CoreResult<Vec<TimeEntry>> {
        let models = time_entry_entity::Entity::find()
            .filter(time_entry_entity::Column::TaskId.eq(task_id))
            .order_by_asc(time_entry_entity::Column::CreatedAt)
            .all(self.db.as_ref())
            .await
            .map_err(|e| CoreError::store("time_entries", e))?;
        Ok(models.into_iter().map(Into::into).collect())
    }
}

#[cfg(test)]
#[path = "task_repo_impl_test.rs"]
mod tests;
