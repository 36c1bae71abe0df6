// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset};
use uuid::Uuid;

use crate::domain::models::notification::TaskRef;
use crate::domain::models::task::{ChecklistItem, NewTask, Task, TaskStatus, TimeEntry};
use crate::utils::errors::CoreResult;

/// 任务仓库特质
///
/// 定义任务、检查项和时间记录的数据访问接口
#[async_trait]
pub trait TaskRepository: Send + Sync {
    /// 创建任务及其检查项
    async fn create(&self, task: &NewTask) -> CoreResult<Task>;
    /// 根据ID查找任务
    async fn find_by_id(&self, id: Uuid) -> CoreResult<Option<Task>>;
    /// 查找任务并附带项目信息，用于构造事件
    async fn find_ref(&self, id: Uuid) -> CoreResult<Option<TaskRef>>;
    /// 更新状态和完成时间
    async fn update_status(
        &self,
        id: Uuid,
        status: TaskStatus,
        completed_at: Option<DateTime<FixedOffset>>,
    ) -> CoreResult<Task>;
    /// 删除任务，引用它的积分流水保留并置空 task_id
    async fn delete(&self, id: Uuid) -> CoreResult<()>;
    /// 归档在 cutoff 之前完成的任务
    async fn archive_completed_before(
        &self,
        cutoff: DateTime<FixedOffset>,
        now: DateTime<FixedOffset>,
    ) -> CoreResult<u64>;
    /// 用户名下未归档的待办任务
    async fn todo_for_user(&self, user_id: Uuid) -> CoreResult<Vec<Task>>;
    /// 项目下未归档的任务
    async fn list_by_project(&self, project_id: Uuid) -> CoreResult<Vec<Task>>;
    /// 按位置排序的检查项
    async fn checklist(&self, task_id: Uuid) -> CoreResult<Vec<ChecklistItem>>;
    /// 在末尾追加检查项
    async fn add_checklist_item(&self, task_id: Uuid, content: &str) -> CoreResult<ChecklistItem>;
    async fn set_checklist_item_checked(&self, item_id: Uuid, checked: bool) -> CoreResult<()>;
    async fn time_entries(&self, task_id: Uuid) -> CoreResult<Vec<TimeEntry>>;
}
