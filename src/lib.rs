// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 配置模块
///
/// 处理应用程序的配置设置和环境变量
pub mod config;

/// 领域模块
///
/// 包含核心业务实体、服务和仓库接口
pub mod domain;

/// 基础设施模块
///
/// 提供数据库、通知投递和指标导出
pub mod infrastructure;

/// 工具模块
///
/// 错误类型、日志初始化、时钟和时长换算
pub mod utils;

/// 工作器模块
///
/// 归档、循环物化和通知投递的后台任务
pub mod workers;

pub mod app;
