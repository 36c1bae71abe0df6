// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 基础设施层模块
///
/// 领域层接口的技术实现：
/// - 数据库（database）：连接池和 sea-orm 实体
/// - 指标（metrics）：Prometheus 导出器
/// - 通知（notifications）：有界队列投递端和投递后端
/// - 仓库实现（repositories）：领域仓库接口的 sea-orm 实现
pub mod database;
pub mod metrics;
pub mod notifications;
pub mod repositories;
