// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, NaiveDate};
use std::collections::BTreeSet;
use uuid::Uuid;

use crate::domain::models::recurrence::{RecurrenceRule, RecurrenceSeries};
use crate::domain::models::task::{ChecklistItem, Task};
use crate::utils::errors::CoreResult;

/// 一次批量插入的结果
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InsertedOccurrences {
    pub created: Vec<NaiveDate>,
    /// 唯一约束拦下的日期
    pub conflicted: Vec<NaiveDate>,
}

/// 循环系列仓库特质
///
/// 实例是否"可安全取消"的判断统一在实现中完成：计划日期晚于今天、
/// 状态为待办、未归档、没有时间记录，且不是模板本身。
#[async_trait]
pub trait RecurrenceRepository: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> CoreResult<Option<RecurrenceSeries>>;
    async fn find_by_template(&self, template_task_id: Uuid)
        -> CoreResult<Option<RecurrenceSeries>>;
    async fn list_all(&self) -> CoreResult<Vec<RecurrenceSeries>>;

    /// 创建系列并把模板绑定到开始日期
    async fn create_for_template(
        &self,
        template: &Task,
        rule: &RecurrenceRule,
    ) -> CoreResult<RecurrenceSeries>;

    /// 写入新规则并清除物化标记，同时取消可安全取消的未来实例
    async fn replace_rule(
        &self,
        series_id: Uuid,
        rule: &RecurrenceRule,
        today: NaiveDate,
    ) -> CoreResult<u64>;

    /// 记录物化时间，必要时一并保存归一化后的规则
    async fn mark_materialized(
        &self,
        series_id: Uuid,
        normalized: Option<&RecurrenceRule>,
        at: DateTime<FixedOffset>,
    ) -> CoreResult<()>;

    /// 窗口内已占用的日期
    async fn existing_dates(
        &self,
        series_id: Uuid,
        from: NaiveDate,
        to: NaiveDate,
    ) -> CoreResult<BTreeSet<NaiveDate>>;

    /// 在一个事务内克隆模板，已被占用的日期静默跳过
    async fn insert_occurrences(
        &self,
        series: &RecurrenceSeries,
        template: &Task,
        checklist: &[ChecklistItem],
        dates: &[NaiveDate],
    ) -> CoreResult<InsertedOccurrences>;

    /// 删除可安全取消的未来实例
    async fn cancel_future(&self, series_id: Uuid, today: NaiveDate, keep: Uuid)
        -> CoreResult<u64>;

    /// 取消未来实例、解除其余实例的绑定并删除系列
    async fn delete_series(&self, series_id: Uuid, today: NaiveDate, keep: Uuid)
        -> CoreResult<u64>;

    /// 把模板上缺失的检查项追加到可安全取消的未来实例
    async fn sync_checklist_forward(
        &self,
        series_id: Uuid,
        template_task_id: Uuid,
        today: NaiveDate,
    ) -> CoreResult<u64>;

    /// 系列下的所有实例，按计划日期排序
    async fn occurrences(&self, series_id: Uuid) -> CoreResult<Vec<Task>>;
}
