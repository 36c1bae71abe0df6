// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::models::user::{NotificationPreferences, Role, User};
use crate::utils::errors::CoreResult;

/// 用户目录
///
/// 通知总线只通过它读取用户、角色、客户访问权限和通知偏好
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn user(&self, id: Uuid) -> CoreResult<Option<User>>;
    async fn users_by_role(&self, role: Role) -> CoreResult<Vec<User>>;
    async fn client_access(&self, user_id: Uuid, client_id: Uuid) -> CoreResult<bool>;
    /// 没有偏好记录时返回全部开启的默认值
    async fn preferences(&self, user_id: Uuid) -> CoreResult<NotificationPreferences>;
}
