// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::config::settings::{AppEnvironment, ArchiveSettings};
use crate::domain::services::task_service::TaskService;
use crate::utils::errors::CoreResult;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

/// 已完成任务归档工作器
///
/// 定期归档完成超过配置天数的任务
pub struct ArchiveWorker {
    tasks: Arc<TaskService>,
    interval: Duration,
    enabled: bool,
}

impl ArchiveWorker {
    pub fn new(tasks: Arc<TaskService>, settings: &ArchiveSettings, env: AppEnvironment) -> Self {
        Self {
            tasks,
            interval: Duration::from_secs(settings.sweep_interval_secs.max(1)),
            enabled: !settings.production_only || env.is_production(),
        }
    }

    /// 执行一次归档，未启用时返回 0
    pub async fn run_once(&self) -> CoreResult<u64> {
        if !self.enabled {
            debug!("archive sweep skipped outside production");
            return Ok(0);
        }
        self.tasks.archive_sweep().await
    }

    /// 运行工作器
    pub async fn run(&self) {
        info!(enabled = self.enabled, "Task archive worker started");

        let mut interval = tokio::time::interval(self.interval);

        loop {
            interval.tick().await;

            if let Err(e) = self.run_once().await {
                error!("Failed to archive completed tasks: {}", e);
            }
        }
    }

    /// 启动后台运行
    pub fn start(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            self.run().await;
        })
    }
}

#[cfg(test)]
#[path = "archive_worker_test.rs"]
mod tests;
