// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::notification::EventKind;

/// 用户
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
}

/// 用户角色
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    #[default]
    Technician,
    Client,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Admin => write!(f, "admin"),
            Role::Technician => write!(f, "technician"),
            Role::Client => write!(f, "client"),
        }
    }
}

impl FromStr for Role {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Role::Admin),
            "technician" => Ok(Role::Technician),
            "client" => Ok(Role::Client),
            _ => Err(()),
        }
    }
}

/// 用户的通知偏好
///
/// 没有偏好记录的用户使用全部开启的默认值
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationPreferences {
    /// 总开关
    pub email_notifications_enabled: bool,
    pub task_created: bool,
    pub task_status_change: bool,
    pub task_comment_added: bool,
    pub task_time_logged: bool,
    pub project_credit_low: bool,
}

impl Default for NotificationPreferences {
    fn default() -> Self {
        Self {
            email_notifications_enabled: true,
            task_created: true,
            task_status_change: true,
            task_comment_added: true,
            task_time_logged: true,
            project_credit_low: true,
        }
    }
}

impl NotificationPreferences {
    /// 该用户是否接收此类事件
    pub fn allows(&self, kind: EventKind) -> bool {
        if !self.email_notifications_enabled {
            return false;
        }
        match kind {
            EventKind::TaskCreated => self.task_created,
            EventKind::TaskStatusChanged => self.task_status_change,
            // 回复沿用评论开关
            EventKind::TaskCommentAdded | EventKind::TaskCommentReplied => {
                self.task_comment_added
            }
            EventKind::TaskTimeLogged => self.task_time_logged,
            EventKind::ProjectCreditLow => self.project_credit_low,
        }
    }
}
