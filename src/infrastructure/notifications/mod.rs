// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 通知投递模块
///
/// 有界队列投递端和投递后端。总线只负责把意图放进队列，
/// 真正的投递由后台工作器完成。
pub mod delivery;
pub mod queue;

pub use delivery::{DeliveryBackend, LoggingDelivery, RecordingDelivery};
pub use queue::QueuedNotificationSink;
