// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 数据库实体模块
///
/// 使用SeaORM框架进行对象关系映射，每个文件对应一张表。
/// 枚举类字段（状态、优先级、角色、流水类型）以字符串存储，
/// 在仓库层转换为领域类型。
pub mod checklist_item;
pub mod client;
pub mod communication;
pub mod credit_log;
pub mod notification_preference;
pub mod project;
pub mod recurrence_series;
pub mod task;
pub mod time_entry;
pub mod user;
pub mod user_client;
