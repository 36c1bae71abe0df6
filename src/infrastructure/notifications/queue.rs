// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::notification::NotificationIntent;
use crate::domain::services::notification_bus::NotificationSink;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::warn;

/// 基于有界通道的投递端
///
/// 队列满或接收端已关闭时丢弃意图并计数，调用方永远不会被阻塞
#[derive(Clone)]
pub struct QueuedNotificationSink {
    sender: mpsc::Sender<NotificationIntent>,
}

impl QueuedNotificationSink {
    /// 创建投递端和对应的接收端
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<NotificationIntent>) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        (Self { sender }, receiver)
    }

    /// 队列中剩余的空位
    pub fn remaining_capacity(&self) -> usize {
        self.sender.capacity()
    }
}

impl NotificationSink for QueuedNotificationSink {
    fn submit(&self, intent: NotificationIntent) {
        let reason = match self.sender.try_send(intent) {
            Ok(()) => return,
            Err(TrySendError::Full(intent)) => {
                warn!(
                    recipient = %intent.recipient.email,
                    event = %intent.event,
                    "notification queue full, intent dropped"
                );
                "full"
            }
            Err(TrySendError::Closed(intent)) => {
                warn!(
                    recipient = %intent.recipient.email,
                    event = %intent.event,
                    "notification worker stopped, intent dropped"
                );
                "closed"
            }
        };
        metrics::counter!("notification_intents_dropped_total", "reason" => reason).increment(1);
    }
}
