// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 领域服务模块
///
/// - 积分账本（credit_ledger）：项目额度的充值、扣减、审计与低额度告警
/// - 循环物化器（recurrence_materializer）：把循环规则展开为具体任务
/// - 通知总线（notification_bus）：把领域事件解析为确定收件人的通知意图
/// - 任务服务（task_service）：状态流转、归档与看板视图
pub mod credit_ledger;
pub mod notification_bus;
pub mod recurrence_materializer;
pub mod task_service;

