// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::user::{NotificationPreferences, Role, User};
use crate::domain::repositories::user_directory::UserDirectory;
use crate::infrastructure::database::entities::{
    notification_preference as preference_entity, user as user_entity,
    user_client as user_client_entity,
};
use crate::utils::errors::{CoreError, CoreResult};
use async_trait::async_trait;
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
};
use std::sync::Arc;
use uuid::Uuid;

/// 基于数据库的用户目录
#[derive(Clone)]
pub struct UserDirectoryImpl {
    db: Arc<DatabaseConnection>,
}

impl UserDirectoryImpl {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }
}

impl From<user_entity::Model> for User {
    fn from(model: user_entity::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            email: model.email,
            role: model.role.parse().unwrap_or_default(),
        }
    }
}

impl From<preference_entity::Model> for NotificationPreferences {
    fn from(model: preference_entity::Model) -> Self {
        Self {
            email_notifications_enabled: model.email_notifications_enabled,
            task_created: model.task_created,
            task_status_change: model.task_status_change,
            task_comment_added: model.task_comment_added,
            task_time_logged: model.task_time_logged,
            project_credit_low: model.project_credit_low,
        }
    }
}

#[async_trait]
impl UserDirectory for UserDirectoryImpl {
    async fn user(&self, id: Uuid) -> CoreResult<Option<User>> {
        let model = user_entity::Entity::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| CoreError::store("find_user", e))?;
        Ok(model.map(Into::into))
    }

    async fn users_by_role(&self, role: Role) -> CoreResult<Vec<User>> {
        let models = user_entity::Entity::find()
            .filter(user_entity::Column::Role.eq(role.to_string()))
            .order_by_asc(user_entity::Column::Email)
            .all(self.db.as_ref())
            .await
            .map_err(|e| CoreError::store("users_by_role", e))?;
        Ok(models.into_iter().map(Into::into).collect())
    }

    async fn client_access(&self, user_id: Uuid, client_id: Uuid) -> CoreResult<bool> {
        let count = user_client_entity::Entity::find()
            .filter(user_client_entity::Column::UserId.eq(user_id))
            .filter(user_client_entity::Column::ClientId.eq(client_id))
            .count(self.db.as_ref())
            .await
            .map_err(|e| CoreError::store("client_access", e))?;
        Ok(count > 0)
    }

    async fn preferences(&self, user_id: Uuid) -> CoreResult<NotificationPreferences> {
        let model = preference_entity::Entity::find()
            .filter(preference_entity::Column::UserId.eq(user_id))
            .one(self.db.as_ref())
            .await
            .map_err(|e| CoreError::store("notification_preferences", e))?;
        Ok(model.map(Into::into).unwrap_or_default())
    }
}
