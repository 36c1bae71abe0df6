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

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::fmt;

/// 运行环境
///
/// 非生产环境下所有通知都会被重定向给管理员
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AppEnvironment {
    #[default]
    Development,
    Testing,
    Production,
}

impl AppEnvironment {
    pub fn is_production(&self) -> bool {
        matches!(self, AppEnvironment::Production)
    }
}

impl fmt::Display for AppEnvironment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppEnvironment::Development => write!(f, "development"),
            AppEnvironment::Testing => write!(f, "testing"),
            AppEnvironment::Production => write!(f, "production"),
        }
    }
}

/// 应用程序配置设置
///
/// 包含数据库、积分账本、循环任务、归档、通知和指标等所有配置项
#[derive(Debug, Deserialize)]
pub struct Settings {
    /// 运行环境
    pub environment: AppEnvironment,
    /// 数据库配置
    pub database: DatabaseSettings,
    /// 积分账本配置
    pub ledger: LedgerSettings,
    /// 循环任务配置
    pub recurrence: RecurrenceSettings,
    /// 自动归档配置
    pub archive: ArchiveSettings,
    /// 通知配置
    pub notifications: NotificationSettings,
    /// 指标导出配置
    pub metrics: MetricsSettings,
    /// 日志配置
    pub logging: LoggingSettings,
}

/// 数据库配置设置
#[derive(Debug, Deserialize)]
pub struct DatabaseSettings {
    /// 数据库连接URL
    pub url: String,
    /// 最大连接数
    pub max_connections: Option<u32>,
    /// 最小连接数
    pub min_connections: Option<u32>,
    /// 连接超时时间（秒）
    pub connect_timeout: Option<u64>,
    /// 空闲连接超时时间（秒）
    pub idle_timeout: Option<u64>,
}

/// 积分账本配置设置
#[derive(Debug, Deserialize)]
pub struct LedgerSettings {
    /// 低积分告警阈值（分钟），余额严格小于该值视为不足
    pub credit_threshold_minutes: i64,
}

/// 循环任务配置设置
#[derive(Debug, Deserialize)]
pub struct RecurrenceSettings {
    /// 物化窗口（天）
    pub horizon_days: u32,
    /// 后台物化扫描间隔（秒）
    pub sweep_interval_secs: u64,
}

/// 自动归档配置设置
#[derive(Debug, Deserialize)]
pub struct ArchiveSettings {
    /// 任务完成多少天后归档
    pub after_days: u32,
    /// 归档扫描间隔（秒）
    pub sweep_interval_secs: u64,
    /// 是否仅在生产环境运行
    pub production_only: bool,
}

/// 通知配置设置
#[derive(Debug, Deserialize)]
pub struct NotificationSettings {
    /// 投递队列容量，超出后新的通知会被丢弃
    pub queue_capacity: usize,
    /// 邮件主题前缀
    pub subject_prefix: String,
}

/// 指标导出配置设置
#[derive(Debug, Deserialize)]
pub struct MetricsSettings {
    /// 是否启用 Prometheus 导出
    pub enabled: bool,
    /// 监听地址
    pub listen_addr: String,
}

/// 日志配置设置
#[derive(Debug, Deserialize)]
pub struct LoggingSettings {
    /// 默认过滤器，`RUST_LOG` 存在时被覆盖
    pub filter: String,
    /// 是否输出 JSON 格式日志
    pub json: bool,
}

impl Settings {
    /// 创建新的配置实例
    ///
    /// 从配置文件和环境变量加载配置，支持默认值
    ///
    /// # Returns
    ///
    /// * `Ok(Settings)` - 成功加载的配置
    /// * `Err(ConfigError)` - 配置加载失败
    pub fn new() -> Result<Self, ConfigError> {
        let env = std::env::var("APP_ENVIRONMENT").unwrap_or_else(|_| "default".to_string());
        let builder = Self::with_defaults(Config::builder())?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", env)).required(false))
            .add_source(Environment::with_prefix("CHRONOTRAK").separator("__"));

        builder.build()?.try_deserialize()
    }

    /// 仅使用默认值构建配置，用于测试
    pub fn for_testing(database_url: &str) -> Result<Self, ConfigError> {
        Self::with_defaults(Config::builder())?
            .set_override("environment", "testing")?
            .set_override("database.url", database_url)?
            .build()?
            .try_deserialize()
    }

    fn with_defaults(
        builder: config::ConfigBuilder<config::builder::DefaultState>,
    ) -> Result<config::ConfigBuilder<config::builder::DefaultState>, ConfigError> {
        builder
            .set_default("environment", "development")?
            // Default DB pool settings
            .set_default("database.max_connections", 10)?
            .set_default("database.min_connections", 1)?
            .set_default("database.connect_timeout", 10)?
            .set_default("database.idle_timeout", 300)?
            // Default ledger settings
            .set_default("ledger.credit_threshold_minutes", 120)?
            // Default recurrence settings
            .set_default("recurrence.horizon_days", 180)?
            .set_default("recurrence.sweep_interval_secs", 3600)?
            // Default archive settings
            .set_default("archive.after_days", 14)?
            .set_default("archive.sweep_interval_secs", 3600)?
            .set_default("archive.production_only", true)?
            // Default notification settings
            .set_default("notifications.queue_capacity", 100)?
            .set_default("notifications.subject_prefix", "[ChronoTrak]")?
            // Default metrics settings
            .set_default("metrics.enabled", false)?
            .set_default("metrics.listen_addr", "0.0.0.0:9000")?
            // Default logging settings
            .set_default("logging.filter", "info,chronotrak=debug")?
            .set_default("logging.json", false)
    }
}

#[cfg(test)]
#[path = "settings_test.rs"]
mod tests;
