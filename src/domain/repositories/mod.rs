// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 仓库接口模块
///
/// 该模块定义了领域层的仓库接口，遵循依赖倒置原则。
/// 具体实现由基础设施层基于 SeaORM 提供。
///
/// 包含的仓库接口：
/// - 项目仓库（project_repository）：项目、积分流水与工时登记
/// - 任务仓库（task_repository）：任务、检查项和时间记录
/// - 循环仓库（recurrence_repository）：循环系列与实例的物化
/// - 用户目录（user_directory）：用户、角色、访问权限与通知偏好
/// - 通信仓库（communication_repository）：已投递通知的记录
pub mod communication_repository;
pub mod project_repository;
pub mod recurrence_repository;
pub mod task_repository;
pub mod user_directory;
