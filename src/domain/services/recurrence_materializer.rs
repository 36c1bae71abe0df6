// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::recurrence::{
    MaterializeReport, RecurrenceRule, RecurrenceSeries, RewriteReport,
};
use crate::domain::repositories::recurrence_repository::RecurrenceRepository;
use crate::domain::repositories::task_repository::TaskRepository;
use crate::utils::clock::Clock;
use crate::utils::errors::{CoreError, CoreResult};
use chrono::{Days, NaiveDate};
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;
use validator::Validate;

/// 循环任务物化器
///
/// 把系列规则展开为滚动窗口内的具体任务实例。展开是幂等的：
/// `(series_id, scheduled_for)` 唯一约束保证重复或并发调用不会产生重复实例。
pub struct RecurrenceMaterializer {
    series: Arc<dyn RecurrenceRepository>,
    tasks: Arc<dyn TaskRepository>,
    clock: Arc<dyn Clock>,
    horizon_days: u32,
}

impl RecurrenceMaterializer {
    pub fn new(
        series: Arc<dyn RecurrenceRepository>,
        tasks: Arc<dyn TaskRepository>,
        clock: Arc<dyn Clock>,
        horizon_days: u32,
    ) -> Self {
        Self {
            series,
            tasks,
            clock,
            horizon_days,
        }
    }

    /// 把任务设为循环模板并立即物化
    ///
    /// 模板本身占用开始日期
    pub async fn attach_recurrence(
        &self,
        template_task_id: Uuid,
        rule: RecurrenceRule,
    ) -> CoreResult<(RecurrenceSeries, MaterializeReport)> {
        validate(&rule)?;
        let template = self
            .tasks
            .find_by_id(template_task_id)
            .await?
            .ok_or_else(|| CoreError::not_found("task", template_task_id))?;
        if template.recurrence_series_id.is_some() {
            return Err(CoreError::Conflict(format!(
                "task {} already belongs to a series",
                template_task_id
            )));
        }

        let series = self.series.create_for_template(&template, &rule).await?;
        info!(
            series_id = %series.id,
            task_id = %template_task_id,
            frequency = %rule.frequency,
            "recurrence attached"
        );

        let report = self.materialize(series.id).await?;
        let series = self.find_series(series.id).await?;
        Ok((series, report))
    }

    /// 物化到 `today + horizon_days`
    pub async fn materialize(&self, series_id: Uuid) -> CoreResult<MaterializeReport> {
        let series = self.find_series(series_id).await?;
        let template = self
            .tasks
            .find_by_id(series.template_task_id)
            .await?
            .ok_or_else(|| CoreError::not_found("task", series.template_task_id))?;

        let mut rule = series.rule.clone();
        let normalized = series.last_materialized_at.is_none() && rule.normalize_month_end();
        if normalized {
            debug!(%series_id, "monthly rule pinned to last day of month");
        }

        let today = self.clock.today();
        let horizon_end = self.horizon_end(today)?;
        let existing = self
            .series
            .existing_dates(series_id, today, horizon_end)
            .await?;

        let mut report = MaterializeReport::default();
        let mut pending: Vec<NaiveDate> = Vec::new();
        for date in rule.occurrences(horizon_end) {
            if date < today {
                continue;
            }
            if existing.contains(&date) {
                report.skipped_existing += 1;
            } else {
                pending.push(date);
            }
        }

        if !pending.is_empty() {
            let checklist = self.tasks.checklist(template.id).await?;
            let inserted = self
                .series
                .insert_occurrences(&series, &template, &checklist, &pending)
                .await?;
            if !inserted.conflicted.is_empty() {
                debug!(
                    %series_id,
                    lost = inserted.conflicted.len(),
                    "dates taken by a concurrent materialization"
                );
            }
            report.lost_races = inserted.conflicted.len();
            report.created = inserted.created;
        }

        self.series
            .mark_materialized(
                series_id,
                normalized.then_some(&rule),
                self.clock.now().into(),
            )
            .await?;

        metrics::counter!("recurrence_occurrences_created_total")
            .increment(report.created.len() as u64);
        info!(
            %series_id,
            created = report.created.len(),
            skipped = report.skipped_existing,
            horizon_end = %horizon_end,
            "series materialized"
        );
        Ok(report)
    }

    /// 替换规则，取消可安全取消的未来实例后重新物化
    ///
    /// 两个步骤各自提交，中途失败由下一次物化补齐
    pub async fn rewrite(
        &self,
        series_id: Uuid,
        rule: RecurrenceRule,
    ) -> CoreResult<RewriteReport> {
        validate(&rule)?;
        let today = self.clock.today();
        let cancelled = self.series.replace_rule(series_id, &rule, today).await?;
        metrics::counter!("recurrence_occurrences_cancelled_total").increment(cancelled);
        info!(%series_id, cancelled, "recurrence rule replaced");

        let materialized = self.materialize(series_id).await?;
        Ok(RewriteReport {
            cancelled,
            materialized,
        })
    }

    /// 删除未开始的未来实例，模板始终保留
    pub async fn cancel_future(&self, series_id: Uuid) -> CoreResult<u64> {
        let series = self.find_series(series_id).await?;
        let cancelled = self
            .series
            .cancel_future(series_id, self.clock.today(), series.template_task_id)
            .await?;
        metrics::counter!("recurrence_occurrences_cancelled_total").increment(cancelled);
        info!(%series_id, cancelled, "future occurrences cancelled");
        Ok(cancelled)
    }

    /// 删除系列，模板和已执行的实例保留为普通任务
    pub async fn delete_series(&self, series_id: Uuid) -> CoreResult<u64> {
        let series = self.find_series(series_id).await?;
        let cancelled = self
            .series
            .delete_series(series_id, self.clock.today(), series.template_task_id)
            .await?;
        metrics::counter!("recurrence_occurrences_cancelled_total").increment(cancelled);
        info!(%series_id, cancelled, "recurrence series deleted");
        Ok(cancelled)
    }

    /// 把模板新增的检查项追加到未开始的未来实例
    pub async fn sync_checklist_forward(&self, series_id: Uuid) -> CoreResult<u64> {
        let series = self.find_series(series_id).await?;
        let appended = self
            .series
            .sync_checklist_forward(series_id, series.template_task_id, self.clock.today())
            .await?;
        debug!(%series_id, appended, "checklist synced forward");
        Ok(appended)
    }

    pub async fn series_for_template(
        &self,
        template_task_id: Uuid,
    ) -> CoreResult<Option<RecurrenceSeries>> {
        self.series.find_by_template(template_task_id).await
    }

    /// 物化所有系列，单个系列失败不影响其他系列
    ///
    /// 返回新建的实例总数
    pub async fn materialize_all(&self) -> CoreResult<usize> {
        let all = self.series.list_all().await?;
        let mut created = 0;
        for series in all {
            match self.materialize(series.id).await {
                Ok(report) => created += report.created.len(),
                Err(e) => warn!(series_id = %series.id, "materialization failed: {}", e),
            }
        }
        Ok(created)
    }

    fn horizon_end(&self, today: NaiveDate) -> CoreResult<NaiveDate> {
        today
            .checked_add_days(Days::new(u64::from(self.horizon_days)))
            .ok_or_else(|| {
                CoreError::InvalidInput(format!("horizon of {} days overflows", self.horizon_days))
            })
    }

    async fn find_series(&self, series_id: Uuid) -> CoreResult<RecurrenceSeries> {
        self.series
            .find_by_id(series_id)
            .await?
            .ok_or_else(|| CoreError::not_found("recurrence series", series_id))
    }
}

fn validate(rule: &RecurrenceRule) -> CoreResult<()> {
    rule.validate()
        .map_err(|e| CoreError::InvalidInput(e.to_string()))
}

#[cfg(test)]
#[path = "recurrence_materializer_test.rs"]
mod tests;
