// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::config::settings::Settings;
use crate::domain::services::recurrence_materializer::RecurrenceMaterializer;
use crate::domain::services::task_service::TaskService;
use crate::workers::archive_worker::ArchiveWorker;
use crate::workers::materialization_worker::MaterializationWorker;
use futures::future::join_all;
use std::sync::Arc;
use tokio::signal;
use tokio::task::JoinHandle;
use tracing::{error, info};

/// 工作管理器
///
/// 持有周期性工作器的句柄，收到关闭信号时统一终止
#[derive(Default)]
pub struct WorkerManager {
    handles: Vec<JoinHandle<()>>,
}

impl WorkerManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// 启动归档和物化两个周期性工作器
    pub fn start_sweeps(
        &mut self,
        settings: &Settings,
        tasks: Arc<TaskService>,
        materializer: Arc<RecurrenceMaterializer>,
    ) {
        let archive = ArchiveWorker::new(tasks, &settings.archive, settings.environment);
        self.handles.push(archive.start());

        let materialization = MaterializationWorker::new(materializer, &settings.recurrence);
        self.handles.push(materialization.start());

        info!(workers = self.handles.len(), "Background workers started");
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// 等待关闭信号并终止所有工作器
    pub async fn wait_for_shutdown(&mut self) {
        match signal::ctrl_c().await {
            Ok(()) => info!("Shutdown signal received"),
            Err(err) => error!("Unable to listen for shutdown signal: {}", err),
        }
        self.shutdown().await;
    }

    /// 中止所有工作器并等待它们退出
    pub async fn shutdown(&mut self) {
        info!("Shutting down workers...");
        let handles: Vec<_> = self.handles.drain(..).collect();
        for handle in &handles {
            handle.abort();
        }
        let panicked = join_all(handles)
            .await
            .into_iter()
            .filter(|r| matches!(r, Err(e) if e.is_panic()))
            .count();
        if panicked > 0 {
            error!(panicked, "Workers panicked before shutdown");
        }
        info!("Workers shut down successfully");
    }
}
