// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::credits::{
    replay_balance, AppliedMovement, CreditLogEntry, CreditLogKind, CreditMovement,
    MovementDirection, MovementOutcome, NewTimeEntry, TimeLogOutcome,
};
use crate::domain::models::notification::{DomainEvent, NotificationRequest};
use crate::domain::models::project::{CreditSummary, NewProject, Project};
use crate::domain::repositories::project_repository::ProjectRepository;
use crate::domain::services::notification_bus::EventPublisher;
use crate::utils::clock::Clock;
use crate::utils::duration::{format_minutes, hours_to_minutes};
use crate::utils::errors::{CoreError, CoreResult};
use chrono::{DateTime, FixedOffset};
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

/// 项目积分账本
///
/// 维护按分钟计的项目余额，余额等于初始额度加上所有充值和扣减流水。
/// 扣减使余额向下穿越阈值时发出一次低积分告警，充值回到阈值以上时重新布防。
///
/// 告警只在事务提交之后发布，因此不会出现"扣减回滚但告警已发出"的情况。
/// 发布所需的项目和任务快照在事务内读取，提交之后不再有可失败的查询。
pub struct CreditLedger {
    projects: Arc<dyn ProjectRepository>,
    publisher: Arc<dyn EventPublisher>,
    clock: Arc<dyn Clock>,
    threshold: i64,
}

impl CreditLedger {
    /// 创建账本服务
    ///
    /// # 参数
    ///
    /// * `threshold` - 低积分阈值（分钟），余额严格小于该值视为不足
    pub fn new(
        projects: Arc<dyn ProjectRepository>,
        publisher: Arc<dyn EventPublisher>,
        clock: Arc<dyn Clock>,
        threshold: i64,
    ) -> Self {
        Self {
            projects,
            publisher,
            clock,
            threshold,
        }
    }

    pub fn threshold(&self) -> i64 {
        self.threshold
    }

    /// 创建项目，追踪开启时写入初始额度流水
    pub async fn create_project(
        &self,
        client_id: Uuid,
        name: &str,
        description: Option<String>,
        time_tracking_enabled: bool,
        initial_hours: f64,
    ) -> CoreResult<Project> {
        let initial_credit = hours_to_minutes(initial_hours)?;
        if initial_credit < 0 {
            return Err(CoreError::InvalidInput(
                "initial credit cannot be negative".to_string(),
            ));
        }
        if name.trim().is_empty() {
            return Err(CoreError::InvalidInput("project name is required".to_string()));
        }

        self.projects
            .create(
                &NewProject {
                    client_id,
                    name: name.trim().to_string(),
                    description,
                    time_tracking_enabled,
                    initial_credit,
                },
                self.threshold,
                self.now(),
            )
            .await
    }

    /// 充值
    ///
    /// 追踪关闭时返回 `TrackingDisabled`，不写流水
    pub async fn credit(
        &self,
        project_id: Uuid,
        hours: f64,
        note: Option<String>,
    ) -> CoreResult<MovementOutcome> {
        let minutes = positive_minutes(hours)?;
        let note = note.or_else(|| Some(format!("Added {} of credit", format_minutes(minutes))));
        let outcome = self
            .projects
            .apply_movement(
                &CreditMovement::credit(project_id, minutes, note),
                self.threshold,
                self.now(),
            )
            .await?;
        self.after_commit(&outcome).await;
        Ok(outcome)
    }

    /// 扣减
    ///
    /// 扣减从不因余额不足而被拒绝，余额可以为负
    pub async fn debit(
        &self,
        project_id: Uuid,
        hours: f64,
        task_id: Option<Uuid>,
        note: Option<String>,
    ) -> CoreResult<MovementOutcome> {
        let minutes = positive_minutes(hours)?;
        let note = note.or_else(|| Some(format!("Deducted {} of credit", format_minutes(minutes))));
        let outcome = self
            .projects
            .apply_movement(
                &CreditMovement::debit(project_id, minutes, task_id, note),
                self.threshold,
                self.now(),
            )
            .await?;
        self.after_commit(&outcome).await;
        Ok(outcome)
    }

    /// 在任务上登记工时并扣减项目额度
    ///
    /// 时间记录、实际时长和扣减流水在同一事务中写入；提交后只发布事件，不再返回错误
    pub async fn log_time(
        &self,
        task_id: Uuid,
        user_id: Uuid,
        hours: f64,
        description: Option<String>,
        notify_all: bool,
    ) -> CoreResult<TimeLogOutcome> {
        let minutes = positive_minutes(hours)?;
        let outcome = self
            .projects
            .record_time(
                &NewTimeEntry {
                    task_id,
                    user_id,
                    minutes,
                    description,
                },
                self.threshold,
                self.now(),
            )
            .await?;

        info!(
            %task_id,
            %user_id,
            minutes,
            actual_minutes = outcome.actual_minutes,
            "time logged"
        );

        let mut request = NotificationRequest::new(
            DomainEvent::TaskTimeLogged {
                task: outcome.task.clone(),
                entry_id: outcome.entry.id,
                minutes,
            },
            Some(user_id),
        );
        request.notify_all = notify_all;
        self.publisher.publish(request).await;
        self.after_commit(&outcome.ledger).await;

        Ok(outcome)
    }

    /// 修改初始额度，剩余额度随之移动相同的差值
    pub async fn adjust_initial_credit(
        &self,
        project_id: Uuid,
        new_hours: f64,
    ) -> CoreResult<MovementOutcome> {
        let new_initial = hours_to_minutes(new_hours)?;
        if new_initial < 0 {
            return Err(CoreError::InvalidInput(
                "initial credit cannot be negative".to_string(),
            ));
        }
        let outcome = self
            .projects
            .adjust_initial_credit(project_id, new_initial, self.threshold, self.now())
            .await?;
        self.after_commit(&outcome).await;
        Ok(outcome)
    }

    /// 开关工时追踪
    ///
    /// 关闭会清空流水和两个额度字段；重新开启不回填
    pub async fn set_time_tracking(&self, project_id: Uuid, enabled: bool) -> CoreResult<Project> {
        self.projects
            .set_time_tracking(project_id, enabled, self.now())
            .await
    }

    /// 当前余额（分钟）
    pub async fn balance(&self, project_id: Uuid) -> CoreResult<i64> {
        Ok(self.project(project_id).await?.remaining_credit)
    }

    /// 流水，最新的在前
    pub async fn history(&self, project_id: Uuid) -> CoreResult<Vec<CreditLogEntry>> {
        self.project(project_id).await?;
        self.projects.history(project_id).await
    }

    /// 用流水重放校验缓存余额，不一致时返回 `InvariantViolated`，不做修复
    pub async fn audit(&self, project_id: Uuid) -> CoreResult<i64> {
        let project = self.project(project_id).await?;
        let history = self.projects.history(project_id).await?;
        let expected = replay_balance(project.initial_credit, &history);

        let stray_rows = !project.time_tracking_enabled && !history.is_empty();
        if expected != project.remaining_credit || stray_rows {
            error!(
                %project_id,
                stored = project.remaining_credit,
                expected,
                rows = history.len(),
                "credit ledger invariant violated"
            );
            return Err(CoreError::InvariantViolated {
                project_id,
                stored: project.remaining_credit,
                expected,
            });
        }
        Ok(expected)
    }

    /// 初始额度加上所有充值
    pub async fn total_allocated(&self, project_id: Uuid) -> CoreResult<i64> {
        let project = self.project(project_id).await?;
        let history = self.projects.history(project_id).await?;
        Ok(allocated(&project, &history))
    }

    /// 剩余额度占初始额度的百分比，初始额度为 0 时为 0
    pub async fn credit_percent(&self, project_id: Uuid) -> CoreResult<f64> {
        let project = self.project(project_id).await?;
        Ok(percent(&project))
    }

    pub async fn summary(&self, project_id: Uuid) -> CoreResult<CreditSummary> {
        let project = self.project(project_id).await?;
        let history = self.projects.history(project_id).await?;
        Ok(CreditSummary {
            initial_credit: project.initial_credit,
            remaining_credit: project.remaining_credit,
            total_allocated: allocated(&project, &history),
            percent_remaining: percent(&project),
        })
    }

    fn now(&self) -> DateTime<FixedOffset> {
        self.clock.now().into()
    }

    async fn project(&self, project_id: Uuid) -> CoreResult<Project> {
        self.projects
            .find_by_id(project_id)
            .await?
            .ok_or_else(|| CoreError::not_found("project", project_id))
    }

    /// 提交后的副作用：计数并在向下穿越时发布告警
    async fn after_commit(&self, outcome: &MovementOutcome) {
        let Some(applied) = outcome.applied() else {
            return;
        };
        let direction = MovementDirection::of_amount(applied.entry.amount);
        metrics::counter!("ledger_movements_total", "direction" => direction.as_str())
            .increment(1);

        if !outcome.alert_fired() {
            return;
        }
        metrics::counter!("ledger_low_credit_alerts_total").increment(1);
        self.publish_low_credit(applied).await;
    }

    async fn publish_low_credit(&self, applied: &AppliedMovement) {
        warn!(
            project_id = %applied.project.id,
            balance = applied.balance_after,
            threshold = self.threshold,
            "project credit below threshold"
        );

        let event = DomainEvent::ProjectCreditLow {
            project: applied.project.clone(),
            remaining_minutes: applied.balance_after,
            threshold_minutes: self.threshold,
        };
        self.publisher
            .publish(NotificationRequest::new(event, None))
            .await;
    }
}

fn positive_minutes(hours: f64) -> CoreResult<i64> {
    let minutes = hours_to_minutes(hours)?;
    if minutes <= 0 {
        return Err(CoreError::InvalidInput(format!(
            "{} hours rounds to no time",
            hours
        )));
    }
    Ok(minutes)
}

fn allocated(project: &Project, history: &[CreditLogEntry]) -> i64 {
    project.initial_credit
        + history
            .iter()
            .filter(|e| e.kind == CreditLogKind::Credit && e.amount > 0)
            .map(|e| e.amount)
            .sum::<i64>()
}

fn percent(project: &Project) -> f64 {
    if project.initial_credit == 0 {
        return 0.0;
    }
    project.remaining_credit as f64 / project.initial_credit as f64 * 100.0
}

#[cfg(test)]
#[path = "credit_ledger_test.rs"]
mod tests;
