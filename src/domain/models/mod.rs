// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 领域模型模块
///
/// 该模块定义了系统的核心业务实体，包括：
/// - 项目（project）：持有按分钟计的积分余额
/// - 积分流水（credits）：只追加的账本记录与告警阈值规则
/// - 任务（task）：任务、检查项、时间记录以及看板选择
/// - 循环规则（recurrence）：规则校验与日期枚举
/// - 用户（user）：角色与通知偏好
/// - 通知（notification）：领域事件与通知意图
pub mod credits;
pub mod notification;
pub mod project;
pub mod recurrence;
pub mod task;
pub mod user;
