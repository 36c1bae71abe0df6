// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::notification::NotificationIntent;
use crate::infrastructure::notifications::DeliveryBackend;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// 通知投递工作器
///
/// 单个后台任务按入队顺序投递，所有发送端关闭后退出
pub struct NotificationWorker {
    receiver: mpsc::Receiver<NotificationIntent>,
    backend: Arc<dyn DeliveryBackend>,
}

impl NotificationWorker {
    pub fn new(receiver: mpsc::Receiver<NotificationIntent>, backend: Arc<dyn DeliveryBackend>) -> Self {
        Self { receiver, backend }
    }

    /// 运行到通道关闭，返回成功投递的数量
    pub async fn run(mut self) -> usize {
        info!("Notification worker started");
        let mut delivered = 0;

        while let Some(intent) = self.receiver.recv().await {
            match self.backend.deliver(&intent).await {
                Ok(()) => delivered += 1,
                Err(e) => warn!(
                    recipient = %intent.recipient.email,
                    event = %intent.event,
                    event_id = %intent.correlation.event_id,
                    "Failed to deliver notification: {}",
                    e
                ),
            }
        }

        info!(delivered, "Notification worker stopped");
        delivered
    }

    /// 启动后台运行
    pub fn start(self) -> JoinHandle<usize> {
        tokio::spawn(self.run())
    }
}

#[cfg(test)]
#[path = "notification_worker_test.rs"]
mod tests;
