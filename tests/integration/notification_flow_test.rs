// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::helpers::{create_test_app, create_test_app_with, date};
use chronotrak::app::ChronoTrak;
use chronotrak::config::settings::{AppEnvironment, Settings};
use chronotrak::domain::models::task::TaskStatus;
use chronotrak::domain::repositories::communication_repository::CommunicationRepository;
use chronotrak::infrastructure::database::entities::notification_preference;
use chronotrak::infrastructure::notifications::{QueuedNotificationSink, RecordingDelivery};
use chronotrak::infrastructure::repositories::communication_repo_impl::CommunicationRepositoryImpl;
use chronotrak::utils::clock::FixedClock;
use chronotrak::workers::notification_worker::NotificationWorker;
use sea_orm::{ActiveModelTrait, Set};
use std::sync::Arc;
use uuid::Uuid;

#[tokio::test]
async fn test_status_change_broadcast_in_production() {
    let t = create_test_app(date(2025, 1, 6)).await;
    let project = t.project(10.0).await;
    let task = t.task(project.id, "Renew certificate").await;

    t.app
        .tasks
        .change_status(task.id, TaskStatus::Done, t.admin_id, true)
        .await
        .unwrap();

    assert_eq!(
        t.emails(),
        vec!["carol@example.com".to_string(), "tom@example.com".to_string()]
    );
}

#[tokio::test]
async fn test_reply_reaches_parent_author_and_mentions_only() {
    let t = create_test_app(date(2025, 1, 6)).await;
    let project = t.project(10.0).await;
    let task = t.task(project.id, "Renew certificate").await;

    t.app
        .tasks
        .comment_replied(
            task.id,
            t.tech_id,
            t.customer_id,
            "Renewed, please verify",
            vec![t.admin_id, t.tech_id],
            false,
        )
        .await
        .unwrap();

    let intents = t.sink.take();
    assert_eq!(intents.len(), 2);
    assert_eq!(intents[0].recipient.email, "alice@example.com");
    assert_eq!(intents[1].recipient.email, "carol@example.com");
    assert_eq!(intents[0].subject, "[ChronoTrak] New reply on: Renew certificate");
    assert_eq!(intents[0].correlation.task_id, Some(task.id));
    assert_eq!(intents[0].correlation.triggered_by_id, Some(t.tech_id));
}

#[tokio::test]
async fn test_stored_preferences_are_honoured() {
    let t = create_test_app(date(2025, 1, 6)).await;
    notification_preference::ActiveModel {
        id: Set(Uuid::new_v4()),
        user_id: Set(t.customer_id),
        email_notifications_enabled: Set(true),
        task_created: Set(true),
        task_status_change: Set(true),
        task_comment_added: Set(false),
        task_time_logged: Set(true),
        project_credit_low: Set(true),
    }
    .insert(t.db.as_ref())
    .await
    .unwrap();
    let project = t.project(10.0).await;
    let task = t.task(project.id, "Renew certificate").await;

    t.app
        .tasks
        .comment_added(task.id, t.admin_id, "status?", Vec::new(), true)
        .await
        .unwrap();

    assert_eq!(t.emails(), vec!["tom@example.com".to_string()]);
}

#[tokio::test]
async fn test_testing_environment_redirects_to_admins() {
    let t = create_test_app_with(date(2025, 1, 6), AppEnvironment::Testing, 30).await;
    let project = t.project(10.0).await;
    let task = t.task(project.id, "Renew certificate").await;

    t.app
        .tasks
        .change_status(task.id, TaskStatus::InProgress, t.admin_id, true)
        .await
        .unwrap();

    let intents = t.sink.take();
    assert_eq!(intents.len(), 1);
    assert_eq!(intents[0].recipient.user_id, t.admin_id);
    assert_eq!(
        intents[0].subject,
        "[TESTING] [ChronoTrak] Task status changed: Renew certificate (for tom@example.com)"
    );
}

#[tokio::test]
async fn test_queued_delivery_records_communications() {
    let t = create_test_app(date(2025, 1, 6)).await;
    let settings = Settings::for_testing("sqlite::memory:").unwrap();
    let (sink, receiver) = QueuedNotificationSink::channel(16);
    let communications = Arc::new(CommunicationRepositoryImpl::new(t.db.clone()));
    let worker = NotificationWorker::new(
        receiver,
        Arc::new(RecordingDelivery::new(communications.clone())),
    )
    .start();

    let app = ChronoTrak::build(
        &settings,
        t.db.clone(),
        Arc::new(FixedClock::at_date(date(2025, 1, 6))),
        Arc::new(sink),
    );
    let project = app
        .ledger
        .create_project(t.client_id, "Hosting", None, true, 2.5)
        .await
        .unwrap();
    app.ledger.debit(project.id, 1.0, None, None).await.unwrap();
    drop(app);

    // testing 环境下告警被改投给唯一的管理员
    assert_eq!(worker.await.unwrap(), 1);
    assert_eq!(communications.count_for_project(project.id).await.unwrap(), 1);
}
