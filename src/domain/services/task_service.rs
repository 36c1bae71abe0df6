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

use crate::domain::models::notification::{DomainEvent, NotificationRequest, TaskRef};
use crate::domain::models::task::{
    select_kanban_todo, ChecklistItem, KanbanCard, NewTask, Task, TaskStatus,
};
use crate::domain::repositories::task_repository::TaskRepository;
use crate::domain::services::notification_bus::EventPublisher;
use crate::domain::services::recurrence_materializer::RecurrenceMaterializer;
use crate::utils::clock::Clock;
use crate::utils::errors::{CoreError, CoreResult};
use chrono::Duration;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

/// 任务服务
///
/// 负责任务状态流转、看板视图和评论通知，循环相关的操作委托给物化器
pub struct TaskService {
    tasks: Arc<dyn TaskRepository>,
    materializer: Arc<RecurrenceMaterializer>,
    publisher: Arc<dyn EventPublisher>,
    clock: Arc<dyn Clock>,
    archive_after_days: u32,
}

impl TaskService {
    pub fn new(
        tasks: Arc<dyn TaskRepository>,
        materializer: Arc<RecurrenceMaterializer>,
        publisher: Arc<dyn EventPublisher>,
        clock: Arc<dyn Clock>,
        archive_after_days: u32,
    ) -> Self {
        Self {
            tasks,
            materializer,
            publisher,
            clock,
            archive_after_days,
        }
    }

    /// 创建任务并发布 `task_created`
    pub async fn create_task(
        &self,
        task: NewTask,
        actor_id: Uuid,
        notify_all: bool,
    ) -> CoreResult<Task> {
        if task.title.trim().is_empty() {
            return Err(CoreError::InvalidInput("task title is required".to_string()));
        }
        let created = self.tasks.create(&task).await?;
        info!(task_id = %created.id, project_id = %created.project_id, "task created");

        let task_ref = self.task_ref(created.id).await?;
        self.publish(DomainEvent::TaskCreated { task: task_ref }, actor_id, notify_all, Vec::new())
            .await;
        Ok(created)
    }

    /// 修改状态
    ///
    /// 进入 done 时记录完成时间，离开 done 时清除完成时间并取消归档。状态未变时不发通知。
    pub async fn change_status(
        &self,
        task_id: Uuid,
        new: TaskStatus,
        actor_id: Uuid,
        notify_all: bool,
    ) -> CoreResult<Task> {
        let task = self.find(task_id).await?;
        let old = task.status;
        if old == new {
            return Ok(task);
        }

        let completed_at = match new {
            TaskStatus::Done => Some(self.clock.now().into()),
            _ => None,
        };
        let updated = self.tasks.update_status(task_id, new, completed_at).await?;
        info!(%task_id, old = %old, new = %new, "task status changed");

        let task_ref = self.task_ref(task_id).await?;
        self.publish(
            DomainEvent::TaskStatusChanged {
                task: task_ref,
                old,
                new,
            },
            actor_id,
            notify_all,
            Vec::new(),
        )
        .await;
        Ok(updated)
    }

    /// 删除任务
    ///
    /// 如果任务是某个系列的模板，先删除系列，未来实例随之取消
    pub async fn delete_task(&self, task_id: Uuid) -> CoreResult<()> {
        self.find(task_id).await?;
        if let Some(series) = self.materializer.series_for_template(task_id).await? {
            self.materializer.delete_series(series.id).await?;
        }
        self.tasks.delete(task_id).await?;
        info!(%task_id, "task deleted");
        Ok(())
    }

    /// 归档完成超过 `archive_after_days` 天的任务
    pub async fn archive_sweep(&self) -> CoreResult<u64> {
        let now = self.clock.now();
        let cutoff = now - Duration::days(i64::from(self.archive_after_days));
        let archived = self
            .tasks
            .archive_completed_before(cutoff.into(), now.into())
            .await?;
        metrics::counter!("tasks_archived_total").increment(archived);
        if archived > 0 {
            info!(archived, cutoff = %cutoff, "completed tasks archived");
        }
        Ok(archived)
    }

    /// 用户看板的待办列
    pub async fn kanban_todo(&self, user_id: Uuid) -> CoreResult<Vec<KanbanCard>> {
        let candidates = self.tasks.todo_for_user(user_id).await?;
        Ok(select_kanban_todo(candidates, self.clock.today()))
    }

    /// 项目的常规任务列表，隐藏计划在未来的任务
    pub async fn visible_tasks(&self, project_id: Uuid) -> CoreResult<Vec<Task>> {
        let today = self.clock.today();
        Ok(self
            .tasks
            .list_by_project(project_id)
            .await?
            .into_iter()
            .filter(|t| t.is_visible(today))
            .collect())
    }

    /// 追加检查项；模板上的新检查项同步到未开始的未来实例
    pub async fn add_checklist_item(
        &self,
        task_id: Uuid,
        content: &str,
    ) -> CoreResult<ChecklistItem> {
        let content = content.trim();
        if content.is_empty() {
            return Err(CoreError::InvalidInput(
                "checklist item cannot be empty".to_string(),
            ));
        }
        self.find(task_id).await?;
        let item = self.tasks.add_checklist_item(task_id, content).await?;
        if let Some(series) = self.materializer.series_for_template(task_id).await? {
            self.materializer.sync_checklist_forward(series.id).await?;
        }
        Ok(item)
    }

    /// 评论通知
    ///
    /// 评论内容由调用方保存，这里只负责发布事件
    pub async fn comment_added(
        &self,
        task_id: Uuid,
        actor_id: Uuid,
        excerpt: &str,
        mentioned: Vec<Uuid>,
        notify_all: bool,
    ) -> CoreResult<()> {
        let task_ref = self.task_ref(task_id).await?;
        self.publish(
            DomainEvent::TaskCommentAdded {
                task: task_ref,
                excerpt: excerpt.to_string(),
            },
            actor_id,
            notify_all,
            mentioned,
        )
        .await;
        Ok(())
    }

    /// 回复通知，被回复评论的作者总是候选人
    pub async fn comment_replied(
        &self,
        task_id: Uuid,
        actor_id: Uuid,
        parent_author_id: Uuid,
        excerpt: &str,
        mentioned: Vec<Uuid>,
        notify_all: bool,
    ) -> CoreResult<()> {
        let task_ref = self.task_ref(task_id).await?;
        self.publish(
            DomainEvent::TaskCommentReplied {
                task: task_ref,
                parent_author_id,
                excerpt: excerpt.to_string(),
            },
            actor_id,
            notify_all,
            mentioned,
        )
        .await;
        Ok(())
    }

    async fn find(&self, task_id: Uuid) -> CoreResult<Task> {
        self.tasks
            .find_by_id(task_id)
            .await?
            .ok_or_else(|| CoreError::not_found("task", task_id))
    }

    async fn task_ref(&self, task_id: Uuid) -> CoreResult<TaskRef> {
        self.tasks
            .find_ref(task_id)
            .await?
            .ok_or_else(|| CoreError::not_found("task", task_id))
    }

    async fn publish(
        &self,
        event: DomainEvent,
        actor_id: Uuid,
        notify_all: bool,
        mentioned: Vec<Uuid>,
    ) {
        let mut request = NotificationRequest::new(event, Some(actor_id)).mentioning(mentioned);
        request.notify_all = notify_all;
        self.publisher.publish(request).await;
    }
}

#[cfg(test)]
#[path = "task_service_test.rs"]
mod tests;
