// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::config::settings::MetricsSettings;
use anyhow::Context;
use metrics::describe_counter;
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use tracing::{info, warn};

/// 初始化指标系统
///
/// 未启用时不安装导出器，`metrics` 宏在没有 recorder 时为空操作
pub fn init_metrics(settings: &MetricsSettings) -> anyhow::Result<()> {
    if !settings.enabled {
        info!("Metrics exporter disabled");
        return Ok(());
    }

    let addr: SocketAddr = settings
        .listen_addr
        .parse()
        .with_context(|| format!("invalid metrics address {}", settings.listen_addr))?;

    // Port already taken is not fatal for the service itself
    if let Err(e) = PrometheusBuilder::new().with_http_listener(addr).install() {
        warn!("Failed to install Prometheus recorder: {}", e);
        return Ok(());
    }

    describe_metrics();
    info!("Metrics exporter listening on {}", addr);
    Ok(())
}

fn describe_metrics() {
    describe_counter!(
        "ledger_movements_total",
        "Credit log rows appended, labelled by direction"
    );
    describe_counter!(
        "ledger_low_credit_alerts_total",
        "Low-credit threshold down-crossings"
    );
    describe_counter!(
        "recurrence_occurrences_created_total",
        "Recurring task instances materialized"
    );
    describe_counter!(
        "recurrence_occurrences_cancelled_total",
        "Future recurring task instances cancelled"
    );
    describe_counter!(
        "notification_intents_total",
        "Recipient-resolved notification intents submitted"
    );
    describe_counter!(
        "notification_intents_dropped_total",
        "Intents discarded because the delivery queue was full"
    );
    describe_counter!("tasks_archived_total", "Completed tasks archived by the sweep");
}
