// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::notification::NotificationIntent;
use crate::domain::repositories::communication_repository::CommunicationRepository;
use crate::infrastructure::database::entities::communication as communication_entity;
use crate::utils::errors::{CoreError, CoreResult};
use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    Set,
};
use std::sync::Arc;
use uuid::Uuid;

/// 通信记录仓库实现
#[derive(Clone)]
pub struct CommunicationRepositoryImpl {
    db: Arc<DatabaseConnection>,
}

impl CommunicationRepositoryImpl {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl CommunicationRepository for CommunicationRepositoryImpl {
    async fn record(&self, intent: &NotificationIntent, status: &str) -> CoreResult<Uuid> {
        let model = communication_entity::ActiveModel {
            id: Set(Uuid::new_v4()),
            recipient: Set(intent.recipient.email.clone()),
            subject: Set(intent.subject.clone()),
            event_type: Set(intent.event.to_string()),
            status: Set(status.to_string()),
            payload: Set(intent.payload.clone()),
            user_id: Set(Some(intent.recipient.user_id)),
            task_id: Set(intent.correlation.task_id),
            project_id: Set(Some(intent.correlation.project_id)),
            triggered_by_id: Set(intent.correlation.triggered_by_id),
            sent_at: Set(Utc::now().into()),
        }
        .insert(self.db.as_ref())
        .await
        .map_err(|e| CoreError::store("record_communication", e))?;
        Ok(model.id)
    }

    async fn count_for_project(&self, project_id: Uuid) -> CoreResult<u64> {
        communication_entity::Entity::find()
            .filter(communication_entity::Column::ProjectId.eq(project_id))
            .count(self.db.as_ref())
            .await
            .map_err(|e| CoreError::store("count_communications", e))
    }
}
