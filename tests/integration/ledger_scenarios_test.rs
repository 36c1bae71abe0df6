// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::helpers::{create_test_app, create_test_app_with, date, insert_user};
use chronotrak::config::settings::AppEnvironment;
use chronotrak::domain::models::credits::{CreditLogKind, MovementOutcome};
use chronotrak::domain::models::project::Project;
use chronotrak::infrastructure::database::entities::project as project_entity;
use sea_orm::{ActiveModelTrait, EntityTrait, Set};

#[tokio::test]
async fn test_happy_ledger() {
    let t = create_test_app(date(2025, 1, 6)).await;
    let project = t.project(10.0).await;

    t.app.ledger.debit(project.id, 1.0, None, None).await.unwrap();
    assert_eq!(t.app.ledger.balance(project.id).await.unwrap(), 540);
    let movements: Vec<_> = t
        .app
        .ledger
        .history(project.id)
        .await
        .unwrap()
        .into_iter()
        .filter(|e| e.kind.is_movement())
        .collect();
    assert_eq!(movements.len(), 1);
    assert_eq!(movements[0].amount, -60);

    t.app.ledger.debit(project.id, 0.5, None, None).await.unwrap();
    assert_eq!(t.app.ledger.balance(project.id).await.unwrap(), 510);

    t.app.ledger.credit(project.id, 2.0, None).await.unwrap();
    assert_eq!(t.app.ledger.balance(project.id).await.unwrap(), 630);

    let history = t.app.ledger.history(project.id).await.unwrap();
    let movement_sum: i64 = history
        .iter()
        .filter(|e| e.kind.is_movement())
        .map(|e| e.amount)
        .sum();
    assert_eq!(history.iter().filter(|e| e.kind.is_movement()).count(), 3);
    assert_eq!(movement_sum, 30);
    assert_eq!(t.app.ledger.audit(project.id).await.unwrap(), 630);
    assert!(t.emails().is_empty());
}

/// 直接构造一个已布防、初始额度 180 分钟的项目
async fn armed_project(t: &crate::helpers::TestApp) -> Project {
    let project = t.project(3.0).await;
    assert!(project.alert_armed);
    assert_eq!(project.remaining_credit, 180);
    project
}

#[tokio::test]
async fn test_threshold_crossing_notifies_once() {
    let t = create_test_app(date(2025, 1, 6)).await;
    let project = armed_project(&t).await;

    t.app.ledger.debit(project.id, 2.0, None, None).await.unwrap();
    assert_eq!(t.app.ledger.balance(project.id).await.unwrap(), 60);
    assert_eq!(
        t.emails(),
        vec!["alice@example.com".to_string(), "carol@example.com".to_string()]
    );

    t.app.ledger.debit(project.id, 0.5, None, None).await.unwrap();
    assert_eq!(t.app.ledger.balance(project.id).await.unwrap(), 30);
    assert!(t.emails().is_empty());

    let rearm = t.app.ledger.credit(project.id, 3.0, None).await.unwrap();
    assert_eq!(rearm.applied().unwrap().balance_after, 210);
    assert!(t.emails().is_empty());

    t.app.ledger.debit(project.id, 2.0, None, None).await.unwrap();
    assert_eq!(t.app.ledger.balance(project.id).await.unwrap(), 90);
    assert_eq!(t.emails().len(), 2);

    let stored = project_entity::Entity::find_by_id(project.id)
        .one(t.db.as_ref())
        .await
        .unwrap()
        .unwrap();
    assert!(!stored.alert_armed);
}

#[tokio::test]
async fn test_low_credit_redirected_outside_production() {
    let t = create_test_app_with(date(2025, 1, 6), AppEnvironment::Development, 30).await;
    insert_user(&t.db, "Dave", "admin").await;
    let project = armed_project(&t).await;

    t.app.ledger.debit(project.id, 2.5, None, None).await.unwrap();

    let intents = t.sink.take();
    let recipients: Vec<_> = intents.iter().map(|i| i.recipient.email.as_str()).collect();
    assert_eq!(recipients, vec!["alice@example.com", "dave@example.com"]);
    assert!(intents[0]
        .subject
        .starts_with("[DEVELOPMENT] [ChronoTrak] ALERT: low credit for project Maintenance"));
    assert!(intents[0].subject.contains("alice@example.com"));
    assert!(!intents[0].subject.contains("carol@example.com"));
}

#[tokio::test]
async fn test_time_logging_flows_through_ledger() {
    let t = create_test_app(date(2025, 1, 6)).await;
    let project = armed_project(&t).await;
    let task = t.task(project.id, "Patch servers").await;

    let outcome = t
        .app
        .ledger
        .log_time(task.id, t.tech_id, 1.25, None, true)
        .await
        .unwrap();

    assert_eq!(outcome.actual_minutes, 75);
    assert_eq!(t.app.ledger.balance(project.id).await.unwrap(), 105);
    let intents = t.sink.take();
    let subjects: Vec<_> = intents.iter().map(|i| i.subject.as_str()).collect();
    assert!(subjects.contains(&"[ChronoTrak] Time logged on: Patch servers"));
    assert!(subjects.contains(&"[ChronoTrak] ALERT: low credit for project Maintenance"));
    // 登记工时的技术员本人不会收到工时通知
    assert!(intents.iter().all(|i| i.recipient.user_id != t.tech_id));

    let history = t.app.ledger.history(project.id).await.unwrap();
    assert_eq!(history[0].kind, CreditLogKind::Debit);
    assert_eq!(history[0].task_id, Some(task.id));

    t.app.tasks.delete_task(task.id).await.unwrap();
    let history = t.app.ledger.history(project.id).await.unwrap();
    assert_eq!(history[0].task_id, None);
    assert_eq!(t.app.ledger.audit(project.id).await.unwrap(), 105);
}

#[tokio::test]
async fn test_tracking_off_project_ignores_movements() {
    let t = create_test_app(date(2025, 1, 6)).await;
    let project = t
        .app
        .ledger
        .create_project(t.client_id, "Retainer", None, false, 5.0)
        .await
        .unwrap();
    assert_eq!(project.initial_credit, 0);

    let outcome = t.app.ledger.debit(project.id, 1.0, None, None).await.unwrap();

    assert!(matches!(outcome, MovementOutcome::TrackingDisabled));
    assert!(t.app.ledger.history(project.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_audit_reports_drift_without_repair() {
    let t = create_test_app(date(2025, 1, 6)).await;
    let project = t.project(2.0).await;

    let model = project_entity::Entity::find_by_id(project.id)
        .one(t.db.as_ref())
        .await
        .unwrap()
        .unwrap();
    let mut active: project_entity::ActiveModel = model.into();
    active.remaining_credit = Set(1);
    active.update(t.db.as_ref()).await.unwrap();

    assert!(t.app.ledger.audit(project.id).await.is_err());
    assert_eq!(t.app.ledger.balance(project.id).await.unwrap(), 1);
}
