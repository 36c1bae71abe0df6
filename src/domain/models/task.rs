// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use chrono::{DateTime, FixedOffset, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// 任务实体
///
/// 普通任务的 `scheduled_for` 为空；循环任务的每个实例都绑定到
/// 一个系列，并带有计划日期。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    /// 任务唯一标识符
    pub id: Uuid,
    /// 所属项目
    pub project_id: Uuid,
    /// 负责人
    pub user_id: Option<Uuid>,
    pub title: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    /// 预估时长（分钟）
    pub estimated_minutes: Option<i32>,
    /// 已登记时长（分钟），等于所有时间记录之和
    pub actual_minutes: Option<i32>,
    /// 看板内排序
    pub position: i32,
    pub is_archived: bool,
    pub archived_at: Option<DateTime<FixedOffset>>,
    /// 状态为完成时必须有值
    pub completed_at: Option<DateTime<FixedOffset>>,
    /// 计划日期，晚于今天的任务不出现在常规列表中
    pub scheduled_for: Option<NaiveDate>,
    pub recurrence_series_id: Option<Uuid>,
    pub created_at: DateTime<FixedOffset>,
    pub updated_at: DateTime<FixedOffset>,
}

impl Task {
    /// 计划日期是否在今天之后
    pub fn is_future(&self, today: NaiveDate) -> bool {
        self.scheduled_for.map(|d| d > today).unwrap_or(false)
    }

    /// 是否出现在常规任务列表中
    pub fn is_visible(&self, today: NaiveDate) -> bool {
        !self.is_future(today)
    }
}

/// 任务状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    #[default]
    ToDo,
    InProgress,
    Done,
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskStatus::ToDo => write!(f, "to_do"),
            TaskStatus::InProgress => write!(f, "in_progress"),
            TaskStatus::Done => write!(f, "done"),
        }
    }
}

impl FromStr for TaskStatus {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "to_do" => Ok(TaskStatus::ToDo),
            "in_progress" => Ok(TaskStatus::InProgress),
            "done" => Ok(TaskStatus::Done),
            _ => Err(()),
        }
    }
}

/// 任务优先级
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TaskPriority {
    Low,
    #[default]
    Normal,
    High,
    Urgent,
}

impl fmt::Display for TaskPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskPriority::Low => write!(f, "low"),
            TaskPriority::Normal => write!(f, "normal"),
            TaskPriority::High => write!(f, "high"),
            TaskPriority::Urgent => write!(f, "urgent"),
        }
    }
}

impl FromStr for TaskPriority {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low" => Ok(TaskPriority::Low),
            "normal" => Ok(TaskPriority::Normal),
            "high" => Ok(TaskPriority::High),
            "urgent" => Ok(TaskPriority::Urgent),
            _ => Err(()),
        }
    }
}

/// 创建任务的请求
#[derive(Debug, Clone, Default)]
pub struct NewTask {
    pub project_id: Uuid,
    pub user_id: Option<Uuid>,
    pub title: String,
    pub description: Option<String>,
    pub priority: TaskPriority,
    pub estimated_minutes: Option<i32>,
    pub position: i32,
    /// 随任务一起创建的检查项内容
    pub checklist: Vec<String>,
}

/// 检查项
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChecklistItem {
    pub id: Uuid,
    pub task_id: Uuid,
    pub content: String,
    pub is_checked: bool,
    pub position: i32,
}

/// 时间记录，创建后不可修改
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeEntry {
    pub id: Uuid,
    pub task_id: Uuid,
    pub user_id: Uuid,
    pub minutes: i32,
    pub description: Option<String>,
    pub created_at: DateTime<FixedOffset>,
}

/// 看板"待办"列中的一张卡片
#[derive(Debug, Clone, Serialize)]
pub struct KanbanCard {
    pub task: Task,
    /// 该系列最早的未来实例
    pub upcoming: bool,
}

/// 从候选待办任务中挑出看板"待办"列
///
/// 今天及以前的任务全部保留；未来的循环实例每个系列只保留最早的一个，
/// 标记为 upcoming。没有系列的未来任务不显示。
pub fn select_kanban_todo(candidates: Vec<Task>, today: NaiveDate) -> Vec<KanbanCard> {
    let mut current = Vec::new();
    let mut earliest: HashMap<Uuid, Task> = HashMap::new();

    for task in candidates {
        if task.status != TaskStatus::ToDo || task.is_archived {
            continue;
        }
        if !task.is_future(today) {
            current.push(KanbanCard {
                task,
                upcoming: false,
            });
            continue;
        }
        let Some(series_id) = task.recurrence_series_id else {
            continue;
        };
        match earliest.get(&series_id) {
            Some(existing) if existing.scheduled_for <= task.scheduled_for => {}
            _ => {
                earliest.insert(series_id, task);
            }
        }
    }

    current.sort_by_key(|c| (c.task.position, c.task.created_at));

    let mut upcoming: Vec<Task> = earliest.into_values().collect();
    upcoming.sort_by_key(|t| (t.scheduled_for, t.id));

    current
        .into_iter()
        .chain(upcoming.into_iter().map(|task| KanbanCard {
            task,
            upcoming: true,
        }))
        .collect()
}

#[cfg(test)]
#[path = "task_test.rs"]
mod tests;
