// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 工作器模块
///
/// 周期性的归档与循环物化扫描，以及通知投递
pub mod archive_worker;
pub mod manager;
pub mod materialization_worker;
pub mod notification_worker;

pub use manager::WorkerManager;
