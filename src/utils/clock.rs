// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use chrono::{DateTime, NaiveDate, Utc};
use parking_lot::RwLock;

/// 时钟抽象
///
/// 账本与循环物化器通过注入的时钟获取当前日期，便于测试
pub trait Clock: Send + Sync {
    /// 当前 UTC 时刻
    fn now(&self) -> DateTime<Utc>;

    /// 当前日历日期（UTC）
    fn today(&self) -> NaiveDate {
        self.now().date_naive()
    }
}

/// 系统时钟
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// 固定时钟，时间只在显式调用 `set`/`advance_days` 时改变
#[derive(Debug)]
pub struct FixedClock {
    now: RwLock<DateTime<Utc>>,
}

impl FixedClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: RwLock::new(now),
        }
    }

    /// 以某天的 UTC 正午作为当前时刻
    pub fn at_date(date: NaiveDate) -> Self {
        let noon = date
            .and_hms_opt(12, 0, 0)
            .map(|dt| dt.and_utc())
            .unwrap_or_else(Utc::now);
        Self::new(noon)
    }

    pub fn set(&self, now: DateTime<Utc>) {
        *self.now.write() = now;
    }

    pub fn advance_days(&self, days: i64) {
        let mut now = self.now.write();
        *now += chrono::Duration::days(days);
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.read()
    }
}
