// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

//! 单元测试共用的数据库夹具

use crate::domain::models::notification::{EventKind, NotificationRequest};
use crate::domain::services::notification_bus::EventPublisher;
use crate::infrastructure::database::entities::{
    client, notification_preference, project, task, user, user_client,
};
use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use migration::{Migrator, MigratorTrait};
use parking_lot::Mutex;
use sea_orm::{ActiveModelTrait, Database, DatabaseConnection, Set};
use std::sync::Arc;
use uuid::Uuid;

/// 仓库调用使用的时间戳
pub fn now() -> DateTime<FixedOffset> {
    Utc::now().into()
}

pub async fn setup_db() -> Arc<DatabaseConnection> {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    Migrator::up(&db, None).await.unwrap();
    Arc::new(db)
}

pub async fn insert_client(db: &DatabaseConnection, name: &str) -> Uuid {
    let id = Uuid::new_v4();
    client::ActiveModel {
        id: Set(id),
        name: Set(name.to_string()),
        created_at: Set(Utc::now().into()),
    }
    .insert(db)
    .await
    .unwrap();
    id
}

pub async fn insert_user(db: &DatabaseConnection, name: &str, role: &str) -> Uuid {
    let id = Uuid::new_v4();
    user::ActiveModel {
        id: Set(id),
        name: Set(name.to_string()),
        email: Set(format!("{}@example.com", name.to_lowercase())),
        role: Set(role.to_string()),
        created_at: Set(Utc::now().into()),
    }
    .insert(db)
    .await
    .unwrap();
    id
}

pub async fn grant_client_access(db: &DatabaseConnection, user_id: Uuid, client_id: Uuid) {
    user_client::ActiveModel {
        user_id: Set(user_id),
        client_id: Set(client_id),
    }
    .insert(db)
    .await
    .unwrap();
}

pub async fn insert_preferences(
    db: &DatabaseConnection,
    user_id: Uuid,
    enabled: bool,
    credit_low: bool,
) {
    notification_preference::ActiveModel {
        id: Set(Uuid::new_v4()),
        user_id: Set(user_id),
        email_notifications_enabled: Set(enabled),
        task_created: Set(true),
        task_status_change: Set(true),
        task_comment_added: Set(true),
        task_time_logged: Set(true),
        project_credit_low: Set(credit_low),
    }
    .insert(db)
    .await
    .unwrap();
}

/// 直接写入项目行，不产生初始流水
pub async fn insert_project(
    db: &DatabaseConnection,
    client_id: Uuid,
    initial: i64,
    armed: bool,
    tracking: bool,
) -> Uuid {
    let id = Uuid::new_v4();
    let now = Utc::now();
    project::ActiveModel {
        id: Set(id),
        client_id: Set(client_id),
        name: Set("Maintenance".to_string()),
        description: Set(None),
        time_tracking_enabled: Set(tracking),
        initial_credit: Set(initial),
        remaining_credit: Set(initial),
        alert_armed: Set(armed),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    }
    .insert(db)
    .await
    .unwrap();
    id
}

pub async fn insert_task(
    db: &DatabaseConnection,
    project_id: Uuid,
    user_id: Option<Uuid>,
    scheduled_for: Option<NaiveDate>,
) -> Uuid {
    let id = Uuid::new_v4();
    let now = Utc::now();
    task::ActiveModel {
        id: Set(id),
        project_id: Set(project_id),
        user_id: Set(user_id),
        title: Set("Check backups".to_string()),
        description: Set(Some("Verify last night's run".to_string())),
        status: Set("to_do".to_string()),
        priority: Set("high".to_string()),
        estimated_minutes: Set(Some(30)),
        actual_minutes: Set(None),
        position: Set(0),
        is_archived: Set(false),
        archived_at: Set(None),
        completed_at: Set(None),
        scheduled_for: Set(scheduled_for),
        recurrence_series_id: Set(None),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    }
    .insert(db)
    .await
    .unwrap();
    id
}

/// 记录所有发布请求的事件发布者
#[derive(Default)]
pub struct RecordingPublisher {
    pub requests: Mutex<Vec<NotificationRequest>>,
}

impl RecordingPublisher {
    pub fn kinds(&self) -> Vec<EventKind> {
        self.requests.lock().iter().map(|r| r.event.kind()).collect()
    }

    pub fn count(&self, kind: EventKind) -> usize {
        self.kinds().into_iter().filter(|k| *k == kind).count()
    }
}

#[async_trait]
impl EventPublisher for RecordingPublisher {
    async fn publish(&self, request: NotificationRequest) {
        self.requests.lock().push(request);
    }
}
