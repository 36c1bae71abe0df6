// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::config::settings::Settings;
use crate::domain::services::credit_ledger::CreditLedger;
use crate::domain::services::notification_bus::{NotificationBus, NotificationSink};
use crate::domain::services::recurrence_materializer::RecurrenceMaterializer;
use crate::domain::services::task_service::TaskService;
use crate::infrastructure::repositories::project_repo_impl::ProjectRepositoryImpl;
use crate::infrastructure::repositories::recurrence_repo_impl::RecurrenceRepositoryImpl;
use crate::infrastructure::repositories::task_repo_impl::TaskRepositoryImpl;
use crate::infrastructure::repositories::user_directory_impl::UserDirectoryImpl;
use crate::utils::clock::Clock;
use sea_orm::DatabaseConnection;
use std::sync::Arc;

/// 组装好的服务集合
///
/// 存储、时钟、用户目录和通知投递端是仅有的外部依赖，全部显式注入
#[derive(Clone)]
pub struct ChronoTrak {
    pub ledger: Arc<CreditLedger>,
    pub materializer: Arc<RecurrenceMaterializer>,
    pub tasks: Arc<TaskService>,
    pub bus: Arc<NotificationBus>,
}

impl ChronoTrak {
    pub fn build(
        settings: &Settings,
        db: Arc<DatabaseConnection>,
        clock: Arc<dyn Clock>,
        sink: Arc<dyn NotificationSink>,
    ) -> Self {
        let projects = Arc::new(ProjectRepositoryImpl::new(db.clone()));
        let task_repo = Arc::new(TaskRepositoryImpl::new(db.clone()));
        let series_repo = Arc::new(RecurrenceRepositoryImpl::new(db.clone()));
        let directory = Arc::new(UserDirectoryImpl::new(db));

        let bus = Arc::new(NotificationBus::new(
            directory,
            sink,
            settings.environment,
            settings.notifications.subject_prefix.clone(),
        ));
        let ledger = Arc::new(CreditLedger::new(
            projects,
            bus.clone(),
            clock.clone(),
            settings.ledger.credit_threshold_minutes,
        ));
        let materializer = Arc::new(RecurrenceMaterializer::new(
            series_repo,
            task_repo.clone(),
            clock.clone(),
            settings.recurrence.horizon_days,
        ));
        let tasks = Arc::new(TaskService::new(
            task_repo,
            materializer.clone(),
            bus.clone(),
            clock,
            settings.archive.after_days,
        ));

        Self {
            ledger,
            materializer,
            tasks,
            bus,
        }
    }
}
