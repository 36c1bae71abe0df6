// Copyright 2025 Kirky.X
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use chronotrak::app::ChronoTrak;
use chronotrak::config::settings::Settings;
use chronotrak::infrastructure::database::connection;
use chronotrak::infrastructure::metrics::init_metrics;
use chronotrak::infrastructure::notifications::{QueuedNotificationSink, RecordingDelivery};
use chronotrak::infrastructure::repositories::communication_repo_impl::CommunicationRepositoryImpl;
use chronotrak::utils::clock::SystemClock;
use chronotrak::utils::telemetry;
use chronotrak::workers::notification_worker::NotificationWorker;
use chronotrak::workers::WorkerManager;
use std::sync::Arc;
use tracing::info;

/// 主函数
///
/// 配置、日志、数据库与迁移、工作器，按顺序初始化
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Load configuration
    let settings = Settings::new()?;

    // 2. Initialize logging and metrics
    telemetry::init_telemetry(&settings.logging);
    info!(environment = %settings.environment, "Starting chronotrak...");
    init_metrics(&settings.metrics)?;

    // 3. Connect to database and run migrations
    let db = Arc::new(connection::connect_and_migrate(&settings.database).await?);
    info!("Database connection established");

    // 4. Notification delivery
    let (sink, receiver) = QueuedNotificationSink::channel(settings.notifications.queue_capacity);
    let delivery = Arc::new(RecordingDelivery::new(Arc::new(
        CommunicationRepositoryImpl::new(db.clone()),
    )));
    let notifications = NotificationWorker::new(receiver, delivery).start();

    // 5. Services
    let app = ChronoTrak::build(&settings, db, Arc::new(SystemClock), Arc::new(sink));

    // 6. Background sweeps
    let mut workers = WorkerManager::new();
    workers.start_sweeps(&settings, app.tasks.clone(), app.materializer.clone());

    workers.wait_for_shutdown().await;
    // 服务释放后发送端全部关闭，工作器排空队列后退出
    drop(app);
    let delivered = notifications.await?;
    info!(delivered, "chronotrak stopped");
    Ok(())
}
