// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::models::notification::NotificationIntent;
use crate::utils::errors::CoreResult;

/// 通信记录
#[async_trait]
pub trait CommunicationRepository: Send + Sync {
    /// 保存一条已投递的通知，返回记录ID
    async fn record(&self, intent: &NotificationIntent, status: &str) -> CoreResult<Uuid>;
    /// 某个项目的通知数量
    async fn count_for_project(&self, project_id: Uuid) -> CoreResult<u64>;
}
