// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::config::settings::RecurrenceSettings;
use crate::domain::services::recurrence_materializer::RecurrenceMaterializer;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{error, info};

/// 循环物化工作器
///
/// 定期把所有系列推进到新的窗口末端，同时补齐改写规则后中断的物化
pub struct MaterializationWorker {
    materializer: Arc<RecurrenceMaterializer>,
    interval: Duration,
}

impl MaterializationWorker {
    pub fn new(materializer: Arc<RecurrenceMaterializer>, settings: &RecurrenceSettings) -> Self {
        Self {
            materializer,
            interval: Duration::from_secs(settings.sweep_interval_secs.max(1)),
        }
    }

    /// 运行工作器
    pub async fn run(&self) {
        info!("Recurrence materialization worker started");

        let mut interval = tokio::time::interval(self.interval);

        loop {
            interval.tick().await;

            match self.materializer.materialize_all().await {
                Ok(created) => {
                    if created > 0 {
                        info!("Materialized {} recurring task instances", created);
                    }
                }
                Err(e) => {
                    error!("Failed to list recurrence series: {}", e);
                }
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
