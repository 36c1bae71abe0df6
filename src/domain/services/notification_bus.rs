// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::config::settings::AppEnvironment;
use crate::domain::models::notification::{
    CorrelationIds, DomainEvent, NotificationIntent, NotificationRequest, Recipient,
};
use crate::domain::models::user::{Role, User};
use crate::domain::repositories::user_directory::UserDirectory;
use crate::utils::errors::CoreResult;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// 通知投递端
///
/// `submit` 不阻塞、不确认，投递失败由实现自行处理
pub trait NotificationSink: Send + Sync {
    fn submit(&self, intent: NotificationIntent);
}

/// 领域事件发布者
///
/// 账本和任务服务只依赖这个接口
#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(&self, request: NotificationRequest);
}

/// 通知意图总线
///
/// 把领域事件转换为确定了收件人的通知意图。收件人规则：
///
/// 1. 回复事件包含被回复评论的作者
/// 2. `notify_all` 时包含任务负责人
/// 3. 生产环境且 `notify_all` 时包含有该客户访问权限的客户用户
/// 4. 包含被提及的用户
/// 5. 移除触发者本人
/// 6. 按每个人的通知偏好过滤
/// 7. 非生产环境把最终名单替换为全部管理员，并在主题中标注环境
///
/// 低积分告警的候选人是全部管理员，加上生产环境下的客户用户，然后同样执行 5 到 7。
pub struct NotificationBus {
    directory: Arc<dyn UserDirectory>,
    sink: Arc<dyn NotificationSink>,
    environment: AppEnvironment,
    subject_prefix: String,
}

impl NotificationBus {
    pub fn new(
        directory: Arc<dyn UserDirectory>,
        sink: Arc<dyn NotificationSink>,
        environment: AppEnvironment,
        subject_prefix: impl Into<String>,
    ) -> Self {
        Self {
            directory,
            sink,
            environment,
            subject_prefix: subject_prefix.into(),
        }
    }

    /// 计算收件人并生成意图，不做投递
    pub async fn resolve(&self, request: &NotificationRequest) -> CoreResult<Vec<NotificationIntent>> {
        let event = &request.event;
        let kind = event.kind();

        let mut candidates: Vec<Uuid> = Vec::new();
        let mut push = |id: Uuid| {
            if !candidates.contains(&id) {
                candidates.push(id);
            }
        };

        match event {
            DomainEvent::ProjectCreditLow { .. } => {
                for admin in self.directory.users_by_role(Role::Admin).await? {
                    push(admin.id);
                }
                if self.environment.is_production() {
                    for user in self.client_users_for(event.client_id()).await? {
                        push(user.id);
                    }
                }
            }
            _ => {
                if let DomainEvent::TaskCommentReplied {
                    parent_author_id, ..
                } = event
                {
                    push(*parent_author_id);
                }
                if request.notify_all {
                    if let Some(assignee) = event.task().and_then(|t| t.assignee_id) {
                        push(assignee);
                    }
                    if self.environment.is_production() {
                        for user in self.client_users_for(event.client_id()).await? {
                            push(user.id);
                        }
                    }
                }
            }
        }
        for mentioned in &request.mentioned {
            push(*mentioned);
        }

        // 按邮箱去重并排序，保证同一输入得到同一输出
        let mut recipients: BTreeMap<String, User> = BTreeMap::new();
        for id in candidates {
            if Some(id) == request.actor_id {
                continue;
            }
            let Some(user) = self.directory.user(id).await? else {
                debug!(user_id = %id, "notification candidate no longer exists");
                continue;
            };
            if user.email.is_empty() {
                continue;
            }
            if !self.directory.preferences(id).await?.allows(kind) {
                continue;
            }
            recipients.insert(user.email.clone(), user);
        }

        if recipients.is_empty() {
            info!(event = %kind, project_id = %event.project_id(), "no recipients for notification");
            return Ok(Vec::new());
        }

        let mut subject = format!("{} {}", self.subject_prefix, event.subject());
        if !self.environment.is_production() {
            let admins: BTreeMap<String, User> = self
                .directory
                .users_by_role(Role::Admin)
                .await?
                .into_iter()
                .filter(|u| !u.email.is_empty())
                .map(|u| (u.email.clone(), u))
                .collect();
            if !admins.is_empty() {
                let original: Vec<&str> = recipients.keys().map(String::as_str).collect();
                subject = format!(
                    "[{}] {} (for {})",
                    self.environment.to_string().to_uppercase(),
                    subject,
                    original.join(", ")
                );
                info!(
                    event = %kind,
                    redirected = original.len(),
                    admins = admins.len(),
                    "notification redirected to administrators"
                );
                recipients = admins;
            }
        }

        let correlation = CorrelationIds {
            event_id: Uuid::new_v4(),
            project_id: event.project_id(),
            task_id: event.task().map(|t| t.id),
            triggered_by_id: request.actor_id,
        };
        let payload = serde_json::to_value(event).unwrap_or_default();

        Ok(recipients
            .into_values()
            .map(|user| NotificationIntent {
                recipient: Recipient {
                    user_id: user.id,
                    name: user.name,
                    email: user.email,
                },
                event: kind,
                subject: subject.clone(),
                payload: payload.clone(),
                correlation,
            })
            .collect())
    }

    /// 解析并提交到投递端，返回提交的意图数量
    pub async fn dispatch(&self, request: NotificationRequest) -> CoreResult<usize> {
        let intents = self.resolve(&request).await?;
        let count = intents.len();
        for intent in intents {
            metrics::counter!("notification_intents_total", "event" => intent.event.to_string())
                .increment(1);
            self.sink.submit(intent);
        }
        Ok(count)
    }

    async fn client_users_for(&self, client_id: Uuid) -> CoreResult<Vec<User>> {
        let mut users = Vec::new();
        for user in self.directory.users_by_role(Role::Client).await? {
            if self.directory.client_access(user.id, client_id).await? {
                users.push(user);
            }
        }
        Ok(users)
    }
}

#[async_trait]
impl EventPublisher for NotificationBus {
    async fn publish(&self, request: NotificationRequest) {
        let kind = request.event.kind();
        if let Err(e) = self.dispatch(request).await {
            warn!(event = %kind, "failed to resolve notification recipients: {}", e);
        }
    }
}

#[cfg(test)]
#[path = "notification_bus_test.rs"]
mod tests;
