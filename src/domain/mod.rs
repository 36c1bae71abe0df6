// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 领域层模块
///
/// - 领域模型（models）：项目、积分流水、任务、循环规则、用户与通知
/// - 仓库接口（repositories）：数据持久化抽象接口
/// - 服务（services）：账本、物化器、通知总线和任务服务
///
/// 领域层不依赖任何具体的存储或投递实现。
pub mod models;
pub mod repositories;
pub mod services;
