// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use chrono::{DateTime, Datelike, Days, FixedOffset, Months, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;
use validator::{Validate, ValidationError};

/// 循环频率
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    Daily,
    Weekly,
    Monthly,
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Frequency::Daily => write!(f, "daily"),
            Frequency::Weekly => write!(f, "weekly"),
            Frequency::Monthly => write!(f, "monthly"),
        }
    }
}

impl FromStr for Frequency {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "daily" => Ok(Frequency::Daily),
            "weekly" => Ok(Frequency::Weekly),
            "monthly" => Ok(Frequency::Monthly),
            _ => Err(()),
        }
    }
}

/// 循环规则
///
/// 星期用 0（周一）到 6（周日）表示。`end_date` 与 `count` 是互相独立的
/// 终止条件，先到者生效。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[validate(schema(function = "validate_rule"))]
pub struct RecurrenceRule {
    pub frequency: Frequency,
    #[validate(range(min = 1, max = 365))]
    pub interval: u32,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    #[validate(range(min = 1))]
    pub count: Option<u32>,
    /// 仅对每周规则有效，为空时取 `start_date` 的星期
    pub byweekday: Vec<u8>,
    /// 仅对每日规则有效
    pub business_days_only: bool,
    pub monthly_use_last_day: bool,
    #[validate(range(min = 1, max = 31))]
    pub monthly_day: Option<u32>,
}

fn validate_rule(rule: &RecurrenceRule) -> Result<(), ValidationError> {
    if rule.byweekday.iter().any(|d| *d > 6) {
        return Err(ValidationError::new("byweekday_out_of_range"));
    }
    if let Some(end) = rule.end_date {
        if end < rule.start_date {
            return Err(ValidationError::new("end_before_start"));
        }
    }
    Ok(())
}

impl RecurrenceRule {
    /// 最简单的规则：从某天开始，每 `interval` 个周期一次
    pub fn new(frequency: Frequency, interval: u32, start_date: NaiveDate) -> Self {
        Self {
            frequency,
            interval,
            start_date,
            end_date: None,
            count: None,
            byweekday: Vec::new(),
            business_days_only: false,
            monthly_use_last_day: false,
            monthly_day: None,
        }
    }

    /// 首次物化前的月末归一化
    ///
    /// 每月规则的开始日期恰好是月末、且没有显式指定日期时，
    /// 打开 `monthly_use_last_day`。返回是否修改了规则。
    pub fn normalize_month_end(&mut self) -> bool {
        if self.frequency != Frequency::Monthly || self.monthly_use_last_day {
            return false;
        }
        let explicit_day = self
            .monthly_day
            .map(|d| d != self.start_date.day())
            .unwrap_or(false);
        if explicit_day || !is_last_day_of_month(self.start_date) {
            return false;
        }
        self.monthly_use_last_day = true;
        true
    }

    /// 枚举从 `start_date` 到 `until`（含）的所有日期，升序
    ///
    /// `count` 从开始日期起计数，早于今天的日期同样占用名额。
    pub fn occurrences(&self, until: NaiveDate) -> Vec<NaiveDate> {
        let until = match self.end_date {
            Some(end) if end < until => end,
            _ => until,
        };
        if until < self.start_date {
            return Vec::new();
        }
        let limit = self.count.map(|c| c as usize).unwrap_or(usize::MAX);
        let interval = self.interval.max(1);

        let mut dates = Vec::new();
        match self.frequency {
            Frequency::Daily => self.daily(until, interval, limit, &mut dates),
            Frequency::Weekly => self.weekly(until, interval, limit, &mut dates),
            Frequency::Monthly => self.monthly(until, interval, limit, &mut dates),
        }
        dates
    }

    fn daily(&self, until: NaiveDate, interval: u32, limit: usize, out: &mut Vec<NaiveDate>) {
        let mut current = Some(self.start_date);
        while let Some(date) = current {
            if date > until || out.len() >= limit {
                break;
            }
            if !(self.business_days_only && is_weekend(date)) {
                out.push(date);
            }
            current = date.checked_add_days(Days::new(interval as u64));
        }
    }

    fn weekly(&self, until: NaiveDate, interval: u32, limit: usize, out: &mut Vec<NaiveDate>) {
        let weekdays: BTreeSet<u8> = if self.byweekday.is_empty() {
            BTreeSet::from([self.start_date.weekday().num_days_from_monday() as u8])
        } else {
            self.byweekday.iter().copied().filter(|d| *d <= 6).collect()
        };

        let offset = self.start_date.weekday().num_days_from_monday() as u64;
        let mut week_start = self.start_date.checked_sub_days(Days::new(offset));

        while let Some(monday) = week_start {
            if monday > until {
                break;
            }
            for day in &weekdays {
                let Some(date) = monday.checked_add_days(Days::new(*day as u64)) else {
                    return;
                };
                if date < self.start_date {
                    continue;
                }
                if date > until || out.len() >= limit {
                    return;
                }
                out.push(date);
            }
            week_start = monday.checked_add_days(Days::new(7 * interval as u64));
        }
    }

    fn monthly(&self, until: NaiveDate, interval: u32, limit: usize, out: &mut Vec<NaiveDate>) {
        let target_day = self.monthly_day.unwrap_or_else(|| self.start_date.day());
        let Some(first_month) = self.start_date.with_day(1) else {
            return;
        };

        let mut step = 0u32;
        loop {
            let Some(month) = first_month.checked_add_months(Months::new(step * interval)) else {
                return;
            };
            if month > until {
                return;
            }
            let last = last_day_of_month(month);
            let day = if self.monthly_use_last_day {
                last
            } else {
                target_day.min(last)
            };
            if let Some(date) = month.with_day(day) {
                if date > until || out.len() >= limit {
                    return;
                }
                if date >= self.start_date {
                    out.push(date);
                }
            }
            step += 1;
        }
    }
}

/// 循环系列
///
/// 绑定到一个模板任务，每个模板最多一个系列
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecurrenceSeries {
    pub id: Uuid,
    pub rule: RecurrenceRule,
    pub template_task_id: Uuid,
    /// 首次物化后写入，用于判断月末归一化是否已经执行
    pub last_materialized_at: Option<DateTime<FixedOffset>>,
    pub created_at: DateTime<FixedOffset>,
    pub updated_at: DateTime<FixedOffset>,
}

/// 一次物化的结果
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MaterializeReport {
    /// 新建的实例日期
    pub created: Vec<NaiveDate>,
    /// 已存在而跳过的日期数量
    pub skipped_existing: usize,
    /// 因并发写入而被唯一约束拦下的日期数量
    pub lost_races: usize,
}

/// 一次规则改写的结果
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RewriteReport {
    pub cancelled: u64,
    pub materialized: MaterializeReport,
}

/// 把 `"0,2"` 解析为星期列表，忽略无法解析的片段
pub fn parse_weekdays(raw: &str) -> Vec<u8> {
    let set: BTreeSet<u8> = raw
        .split(',')
        .filter_map(|p| p.trim().parse::<u8>().ok())
        .filter(|d| *d <= 6)
        .collect();
    set.into_iter().collect()
}

pub fn format_weekdays(days: &[u8]) -> Option<String> {
    if days.is_empty() {
        return None;
    }
    let set: BTreeSet<u8> = days.iter().copied().collect();
    Some(
        set.iter()
            .map(|d| d.to_string())
            .collect::<Vec<_>>()
            .join(","),
    )
}

pub fn is_weekend(date: NaiveDate) -> bool {
    date.weekday().num_days_from_monday() >= 5
}

pub fn last_day_of_month(date: NaiveDate) -> u32 {
    let first = date.with_day(1).unwrap_or(date);
    first
        .checked_add_months(Months::new(1))
        .and_then(|next| next.pred_opt())
        .map(|last| last.day())
        .unwrap_or(31)
}

pub fn is_last_day_of_month(date: NaiveDate) -> bool {
    date.day() == last_day_of_month(date)
}

#[cfg(test)]
#[path = "recurrence_test.rs"]
mod tests;
