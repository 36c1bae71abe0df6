// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use sea_orm::{DbErr, SqlErr};
use thiserror::Error;
use uuid::Uuid;

/// 核心错误类型
///
/// 账本、循环物化器和通知总线共享的错误类型。
/// 追踪关闭（TrackingDisabled）不是错误，而是正常的空操作结果。
#[derive(Error, Debug)]
pub enum CoreError {
    /// 按ID查找的实体不存在
    #[error("{entity} not found: {id}")]
    NoSuchEntity { entity: &'static str, id: Uuid },

    /// 读取路径审计发现余额与流水之和不一致
    #[error("ledger invariant violated for project {project_id}: stored {stored}, replayed {expected}")]
    InvariantViolated {
        project_id: Uuid,
        stored: i64,
        expected: i64,
    },

    /// 唯一约束冲突
    #[error("conflict: {0}")]
    Conflict(String),

    /// 调用方传入的参数无效
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// 存储层 I/O 失败，调用方决定是否重试
    #[error("store failure during {operation}: {source}")]
    Transient {
        operation: &'static str,
        #[source]
        source: DbErr,
    },
}

impl CoreError {
    pub fn not_found(entity: &'static str, id: Uuid) -> Self {
        CoreError::NoSuchEntity { entity, id }
    }

    /// 包装存储错误，附带操作名称
    pub fn store(operation: &'static str, err: DbErr) -> Self {
        match err.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(detail)) => {
                CoreError::Conflict(format!("{}: {}", operation, detail))
            }
            _ => CoreError::Transient {
                operation,
                source: err,
            },
        }
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, CoreError::Conflict(_))
    }
}

impl From<DbErr> for CoreError {
    fn from(err: DbErr) -> Self {
        CoreError::store("database", err)
    }
}

pub type CoreResult<T> = Result<T, CoreError>;
