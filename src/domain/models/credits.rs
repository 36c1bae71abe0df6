// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::notification::{ProjectRef, TaskRef};
use super::task::TimeEntry;

/// 积分流水记录
///
/// 只追加、不可修改。金额以分钟为单位，正数为充值，负数为扣减。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreditLogEntry {
    pub id: Uuid,
    pub project_id: Uuid,
    /// 关联任务，任务删除后置空，流水保留
    pub task_id: Option<Uuid>,
    /// 项目内单调递增的序号，反映提交顺序
    pub seq: i64,
    pub kind: CreditLogKind,
    pub amount: i64,
    pub note: Option<String>,
    pub created_at: DateTime<FixedOffset>,
}

/// 流水类型
///
/// `Opening` 和 `OpeningAdjustment` 记录的是初始额度本身，
/// 已体现在项目的 `initial_credit` 中，不计入余额不变式的求和。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CreditLogKind {
    Opening,
    OpeningAdjustment,
    Credit,
    Debit,
}

impl CreditLogKind {
    /// 是否计入 `remaining == initial + Σ amount`
    pub fn is_movement(&self) -> bool {
        matches!(self, CreditLogKind::Credit | CreditLogKind::Debit)
    }
}

impl fmt::Display for CreditLogKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CreditLogKind::Opening => write!(f, "opening"),
            CreditLogKind::OpeningAdjustment => write!(f, "opening_adjustment"),
            CreditLogKind::Credit => write!(f, "credit"),
            CreditLogKind::Debit => write!(f, "debit"),
        }
    }
}

impl FromStr for CreditLogKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "opening" => Ok(CreditLogKind::Opening),
            "opening_adjustment" => Ok(CreditLogKind::OpeningAdjustment),
            "credit" => Ok(CreditLogKind::Credit),
            "debit" => Ok(CreditLogKind::Debit),
            _ => Err(()),
        }
    }
}

/// 新的时间记录，随扣减一起在同一事务中写入
#[derive(Debug, Clone)]
pub struct NewTimeEntry {
    pub task_id: Uuid,
    pub user_id: Uuid,
    pub minutes: i64,
    pub description: Option<String>,
}

/// 一次账本变动请求
#[derive(Debug, Clone)]
pub struct CreditMovement {
    pub project_id: Uuid,
    pub kind: CreditLogKind,
    /// 有符号分钟数，非零
    pub amount: i64,
    pub task_id: Option<Uuid>,
    pub note: Option<String>,
}

impl CreditMovement {
    pub fn credit(project_id: Uuid, minutes: i64, note: Option<String>) -> Self {
        Self {
            project_id,
            kind: CreditLogKind::Credit,
            amount: minutes,
            task_id: None,
            note,
        }
    }

    pub fn debit(
        project_id: Uuid,
        minutes: i64,
        task_id: Option<Uuid>,
        note: Option<String>,
    ) -> Self {
        Self {
            project_id,
            kind: CreditLogKind::Debit,
            amount: -minutes,
            task_id,
            note,
        }
    }
}

/// 变动方向，决定阈值规则是"重新布防"还是"触发"
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MovementDirection {
    Up,
    Down,
}

impl MovementDirection {
    /// 非负金额视为充值方向
    pub fn of_amount(amount: i64) -> Self {
        if amount >= 0 {
            MovementDirection::Up
        } else {
            MovementDirection::Down
        }
    }

    /// 指标标签
    pub fn as_str(&self) -> &'static str {
        match self {
            MovementDirection::Up => "credit",
            MovementDirection::Down => "debit",
        }
    }
}

impl fmt::Display for MovementDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// 低积分告警的状态转换
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertTransition {
    Unchanged,
    /// 余额回到阈值之上，重新布防，不发通知
    Rearmed,
    /// 余额向下穿越阈值，解除布防并发出一次告警
    Fired,
}

/// 计算一次变动后的告警状态
///
/// 只有扣减会触发告警（严格小于阈值），只有充值会重新布防（大于等于阈值）。
/// 只要项目以 `armed == balance >= threshold` 开始，该关系在任意操作序列后保持。
pub fn evaluate_alert(
    armed: bool,
    balance_after: i64,
    threshold: i64,
    direction: MovementDirection,
) -> AlertTransition {
    match direction {
        MovementDirection::Down if armed && balance_after < threshold => AlertTransition::Fired,
        MovementDirection::Up if !armed && balance_after >= threshold => {
            AlertTransition::Rearmed
        }
        _ => AlertTransition::Unchanged,
    }
}

/// 已提交的账本变动
///
/// `project` 是事务内读取的快照，提交后的告警发布不再回查数据库
#[derive(Debug, Clone)]
pub struct AppliedMovement {
    pub project: ProjectRef,
    pub entry: CreditLogEntry,
    pub balance_before: i64,
    pub balance_after: i64,
    pub alert: AlertTransition,
}

/// 账本操作结果
///
/// 项目关闭工时追踪时操作为空操作，而不是错误
#[derive(Debug, Clone)]
pub enum MovementOutcome {
    Applied(AppliedMovement),
    TrackingDisabled,
    /// 调整后的初始额度与当前相同
    NoChange,
}

impl MovementOutcome {
    pub fn applied(&self) -> Option<&AppliedMovement> {
        match self {
            MovementOutcome::Applied(applied) => Some(applied),
            MovementOutcome::TrackingDisabled | MovementOutcome::NoChange => None,
        }
    }

    pub fn alert_fired(&self) -> bool {
        self.applied()
            .map(|a| a.alert == AlertTransition::Fired)
            .unwrap_or(false)
    }
}

/// 登记工时的结果
///
/// 时间记录总会写入；账本部分在追踪关闭时为 `TrackingDisabled`
#[derive(Debug, Clone)]
pub struct TimeLogOutcome {
    pub entry: TimeEntry,
    /// 事务内读取的任务快照，用于 `task_time_logged` 事件
    pub task: TaskRef,
    pub actual_minutes: i32,
    pub ledger: MovementOutcome,
}

/// 从流水重放得到的余额
pub fn replay_balance(initial_credit: i64, entries: &[CreditLogEntry]) -> i64 {
    initial_credit
        + entries
            .iter()
            .filter(|e| e.kind.is_movement())
            .map(|e| e.amount)
            .sum::<i64>()
}

#[cfg(test)]
#[path = "credits_test.rs"]
mod tests;
