// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 仓库实现模块
///
/// 提供领域仓库接口基于 SeaORM 的具体实现。
/// 需要原子性的操作在实现内部开启事务，事务内只使用事务句柄。
pub mod communication_repo_impl;
pub mod project_repo_impl;
pub mod recurrence_repo_impl;
pub mod task_repo_impl;
pub mod user_directory_impl;

#[cfg(test)]
pub(crate) mod fixtures;
