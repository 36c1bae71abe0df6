// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 项目实体
///
/// 项目持有一个按分钟计的积分余额。`remaining_credit` 是流水的
/// 反规范化缓存，可以为负数。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub id: Uuid,
    /// 所属客户，客户用户通过 ACL 获得访问权限
    pub client_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    /// 关闭时账本操作为空操作
    pub time_tracking_enabled: bool,
    /// 初始额度（分钟）
    pub initial_credit: i64,
    /// 剩余额度（分钟）
    pub remaining_credit: i64,
    /// 低积分告警是否已布防
    pub alert_armed: bool,
    pub created_at: DateTime<FixedOffset>,
    pub updated_at: DateTime<FixedOffset>,
}

impl Project {
    /// 余额是否严格低于阈值
    pub fn is_low(&self, threshold: i64) -> bool {
        self.time_tracking_enabled && self.remaining_credit < threshold
    }
}

/// 创建项目的请求
#[derive(Debug, Clone)]
pub struct NewProject {
    pub client_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub time_tracking_enabled: bool,
    /// 初始额度（分钟），追踪关闭时忽略
    pub initial_credit: i64,
}

/// 项目额度概览
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CreditSummary {
    pub initial_credit: i64,
    pub remaining_credit: i64,
    /// 初始额度加上所有充值
    pub total_allocated: i64,
    /// 剩余占初始额度的百分比，初始为 0 时为 0
    pub percent_remaining: f64,
}
