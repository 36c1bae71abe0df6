// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset};
use uuid::Uuid;

use crate::domain::models::credits::{
    CreditLogEntry, CreditMovement, MovementOutcome, NewTimeEntry, TimeLogOutcome,
};
use crate::domain::models::project::{NewProject, Project};
use crate::utils::errors::CoreResult;

/// Ledger store for projects and their credit log.
///
/// Every mutating method runs in a single transaction that locks the
/// project row first, so writers on one project serialize and the log
/// order matches commit order. Timestamps come from the caller's clock.
#[async_trait]
pub trait ProjectRepository: Send + Sync {
    /// Insert a project, writing an opening row when a seed credit is given
    async fn create(
        &self,
        project: &NewProject,
        threshold: i64,
        now: DateTime<FixedOffset>,
    ) -> CoreResult<Project>;

    async fn find_by_id(&self, id: Uuid) -> CoreResult<Option<Project>>;

    /// Append a credit or debit row and move the cached balance
    async fn apply_movement(
        &self,
        movement: &CreditMovement,
        threshold: i64,
        now: DateTime<FixedOffset>,
    ) -> CoreResult<MovementOutcome>;

    /// Insert a time entry, bump the task's actual minutes and debit the ledger
    async fn record_time(
        &self,
        entry: &NewTimeEntry,
        threshold: i64,
        now: DateTime<FixedOffset>,
    ) -> CoreResult<TimeLogOutcome>;

    /// Change the seeded credit and move the balance by the same delta
    async fn adjust_initial_credit(
        &self,
        project_id: Uuid,
        new_initial: i64,
        threshold: i64,
        now: DateTime<FixedOffset>,
    ) -> CoreResult<MovementOutcome>;

    /// Toggle tracking; disabling purges the log and zeroes both credits
    async fn set_time_tracking(
        &self,
        project_id: Uuid,
        enabled: bool,
        now: DateTime<FixedOffset>,
    ) -> CoreResult<Project>;

    /// Log rows, newest first
    async fn history(&self, project_id: Uuid) -> CoreResult<Vec<CreditLogEntry>>;
}
