// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use super::task::TaskStatus;

/// 事件类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    TaskCreated,
    TaskStatusChanged,
    TaskCommentAdded,
    TaskCommentReplied,
    TaskTimeLogged,
    ProjectCreditLow,
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EventKind::TaskCreated => "task_created",
            EventKind::TaskStatusChanged => "task_status_changed",
            EventKind::TaskCommentAdded => "task_comment_added",
            EventKind::TaskCommentReplied => "task_comment_replied",
            EventKind::TaskTimeLogged => "task_time_logged",
            EventKind::ProjectCreditLow => "project_credit_low",
        };
        write!(f, "{}", name)
    }
}

/// 事件引用的任务快照
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TaskRef {
    pub id: Uuid,
    pub title: String,
    pub project_id: Uuid,
    pub project_name: String,
    pub client_id: Uuid,
    /// 负责人
    pub assignee_id: Option<Uuid>,
}

/// 事件引用的项目快照
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProjectRef {
    pub id: Uuid,
    pub name: String,
    pub client_id: Uuid,
}

/// 领域事件
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DomainEvent {
    TaskCreated {
        task: TaskRef,
    },
    TaskStatusChanged {
        task: TaskRef,
        old: TaskStatus,
        new: TaskStatus,
    },
    TaskCommentAdded {
        task: TaskRef,
        excerpt: String,
    },
    TaskCommentReplied {
        task: TaskRef,
        parent_author_id: Uuid,
        excerpt: String,
    },
    TaskTimeLogged {
        task: TaskRef,
        entry_id: Uuid,
        minutes: i64,
    },
    ProjectCreditLow {
        project: ProjectRef,
        remaining_minutes: i64,
        threshold_minutes: i64,
    },
}

impl DomainEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            DomainEvent::TaskCreated { .. } => EventKind::TaskCreated,
            DomainEvent::TaskStatusChanged { .. } => EventKind::TaskStatusChanged,
            DomainEvent::TaskCommentAdded { .. } => EventKind::TaskCommentAdded,
            DomainEvent::TaskCommentReplied { .. } => EventKind::TaskCommentReplied,
            DomainEvent::TaskTimeLogged { .. } => EventKind::TaskTimeLogged,
            DomainEvent::ProjectCreditLow { .. } => EventKind::ProjectCreditLow,
        }
    }

    pub fn task(&self) -> Option<&TaskRef> {
        match self {
            DomainEvent::TaskCreated { task }
            | DomainEvent::TaskStatusChanged { task, .. }
            | DomainEvent::TaskCommentAdded { task, .. }
            | DomainEvent::TaskCommentReplied { task, .. }
            | DomainEvent::TaskTimeLogged { task, .. } => Some(task),
            DomainEvent::ProjectCreditLow { .. } => None,
        }
    }

    pub fn project_id(&self) -> Uuid {
        match self {
            DomainEvent::ProjectCreditLow { project, .. } => project.id,
            other => other.task().map(|t| t.project_id).unwrap_or_default(),
        }
    }

    pub fn client_id(&self) -> Uuid {
        match self {
            DomainEvent::ProjectCreditLow { project, .. } => project.client_id,
            other => other.task().map(|t| t.client_id).unwrap_or_default(),
        }
    }

    /// 不带前缀的邮件主题
    pub fn subject(&self) -> String {
        match self {
            DomainEvent::TaskCreated { task } => format!("New task: {}", task.title),
            DomainEvent::TaskStatusChanged { task, .. } => {
                format!("Task status changed: {}", task.title)
            }
            DomainEvent::TaskCommentAdded { task, .. } => {
                format!("New comment on: {}", task.title)
            }
            DomainEvent::TaskCommentReplied { task, .. } => {
                format!("New reply on: {}", task.title)
            }
            DomainEvent::TaskTimeLogged { task, .. } => format!("Time logged on: {}", task.title),
            DomainEvent::ProjectCreditLow { project, .. } => {
                format!("ALERT: low credit for project {}", project.name)
            }
        }
    }
}

/// 发布到通知总线的请求
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationRequest {
    pub event: DomainEvent,
    /// 触发事件的用户，不会收到自己的通知
    pub actor_id: Option<Uuid>,
    /// 通知负责人以及（生产环境下）客户用户
    pub notify_all: bool,
    /// 评论中提及的用户
    pub mentioned: Vec<Uuid>,
}

impl NotificationRequest {
    pub fn new(event: DomainEvent, actor_id: Option<Uuid>) -> Self {
        Self {
            event,
            actor_id,
            notify_all: false,
            mentioned: Vec::new(),
        }
    }

    pub fn notify_all(mut self) -> Self {
        self.notify_all = true;
        self
    }

    pub fn mentioning(mut self, users: Vec<Uuid>) -> Self {
        self.mentioned = users;
        self
    }
}

/// 收件人
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Recipient {
    pub user_id: Uuid,
    pub name: String,
    pub email: String,
}

/// 关联 ID，投递端用它们写通信记录
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct CorrelationIds {
    /// 同一事件产生的所有意图共享该 ID
    pub event_id: Uuid,
    pub project_id: Uuid,
    pub task_id: Option<Uuid>,
    pub triggered_by_id: Option<Uuid>,
}

/// 通知意图，交给投递端处理
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NotificationIntent {
    pub recipient: Recipient,
    pub event: EventKind,
    pub subject: String,
    pub payload: serde_json::Value,
    pub correlation: CorrelationIds,
}
