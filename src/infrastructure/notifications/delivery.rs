// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::notification::NotificationIntent;
use crate::domain::repositories::communication_repository::CommunicationRepository;
use crate::utils::errors::CoreResult;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

/// 投递后端
///
/// 由通知工作器逐条调用，失败只记录日志，不重试
#[async_trait]
pub trait DeliveryBackend: Send + Sync {
    async fn deliver(&self, intent: &NotificationIntent) -> CoreResult<()>;
}

/// 只写日志的后端
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingDelivery;

#[async_trait]
impl DeliveryBackend for LoggingDelivery {
    async fn deliver(&self, intent: &NotificationIntent) -> CoreResult<()> {
        info!(
            recipient = %intent.recipient.email,
            event = %intent.event,
            event_id = %intent.correlation.event_id,
            project_id = %intent.correlation.project_id,
            subject = %intent.subject,
            "notification delivered"
        );
        Ok(())
    }
}

/// 把每条意图写入通信记录表
pub struct RecordingDelivery {
    communications: Arc<dyn CommunicationRepository>,
}

impl RecordingDelivery {
    pub fn new(communications: Arc<dyn CommunicationRepository>) -> Self {
        Self { communications }
    }
}

#[async_trait]
impl DeliveryBackend for RecordingDelivery {
    async fn deliver(&self, intent: &NotificationIntent) -> CoreResult<()> {
        let id = self.communications.record(intent, "sent").await?;
        info!(
            communication_id = %id,
            recipient = %intent.recipient.email,
            event = %intent.event,
            "notification recorded"
        );
        Ok(())
    }
}
