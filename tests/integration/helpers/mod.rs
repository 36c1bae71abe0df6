// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use chrono::{NaiveDate, Utc};
use chronotrak::app::ChronoTrak;
use chronotrak::config::settings::{AppEnvironment, Settings};
use chronotrak::domain::models::notification::NotificationIntent;
use chronotrak::domain::models::project::Project;
use chronotrak::domain::models::task::{NewTask, Task};
use chronotrak::domain::services::notification_bus::NotificationSink;
use chronotrak::infrastructure::database::connection;
use chronotrak::infrastructure::database::entities::{client, user, user_client};
use chronotrak::utils::clock::FixedClock;
use parking_lot::Mutex;
use sea_orm::{ActiveModelTrait, DatabaseConnection, Set};
use std::sync::Arc;
use uuid::Uuid;

/// 收集所有意图的投递端
#[derive(Default)]
pub struct CollectingSink {
    pub intents: Mutex<Vec<NotificationIntent>>,
}

impl CollectingSink {
    pub fn take(&self) -> Vec<NotificationIntent> {
        std::mem::take(&mut *self.intents.lock())
    }
}

impl NotificationSink for CollectingSink {
    fn submit(&self, intent: NotificationIntent) {
        self.intents.lock().push(intent);
    }
}

#[allow(dead_code)]
pub struct TestApp {
    pub app: ChronoTrak,
    pub db: Arc<DatabaseConnection>,
    pub clock: Arc<FixedClock>,
    pub sink: Arc<CollectingSink>,
    pub client_id: Uuid,
    pub admin_id: Uuid,
    pub tech_id: Uuid,
    pub customer_id: Uuid,
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub async fn create_test_app(today: NaiveDate) -> TestApp {
    create_test_app_with(today, AppEnvironment::Production, 180).await
}

pub async fn create_test_app_with(
    today: NaiveDate,
    environment: AppEnvironment,
    horizon_days: u32,
) -> TestApp {
    let mut settings = Settings::for_testing("sqlite::memory:").unwrap();
    settings.environment = environment;
    settings.recurrence.horizon_days = horizon_days;

    let db = Arc::new(
        connection::connect_and_migrate(&settings.database)
            .await
            .unwrap(),
    );
    let clock = Arc::new(FixedClock::at_date(today));
    let sink = Arc::new(CollectingSink::default());
    let app = ChronoTrak::build(&settings, db.clone(), clock.clone(), sink.clone());

    let client_id = insert_client(&db, "Acme").await;
    let admin_id = insert_user(&db, "Alice", "admin").await;
    let tech_id = insert_user(&db, "Tom", "technician").await;
    let customer_id = insert_user(&db, "Carol", "client").await;
    user_client::ActiveModel {
        user_id: Set(customer_id),
        client_id: Set(client_id),
    }
    .insert(db.as_ref())
    .await
    .unwrap();

    TestApp {
        app,
        db,
        clock,
        sink,
        client_id,
        admin_id,
        tech_id,
        customer_id,
    }
}

pub async fn insert_client(db: &DatabaseConnection, name: &str) -> Uuid {
    let id = Uuid::new_v4();
    client::ActiveModel {
        id: Set(id),
        name: Set(name.to_string()),
        created_at: Set(Utc::now().into()),
    }
    .insert(db)
    .await
    .unwrap();
    id
}

pub async fn insert_user(db: &DatabaseConnection, name: &str, role: &str) -> Uuid {
    let id = Uuid::new_v4();
    user::ActiveModel {
        id: Set(id),
        name: Set(name.to_string()),
        email: Set(format!("{}@example.com", name.to_lowercase())),
        role: Set(role.to_string()),
        created_at: Set(Utc::now().into()),
    }
    .insert(db)
    .await
    .unwrap();
    id
}

impl TestApp {
    pub async fn project(&self, initial_hours: f64) -> Project {
        self.app
            .ledger
            .create_project(self.client_id, "Maintenance", None, true, initial_hours)
            .await
            .unwrap()
    }

    pub async fn task(&self, project_id: Uuid, title: &str) -> Task {
        self.app
            .tasks
            .create_task(
                NewTask {
                    project_id,
                    user_id: Some(self.tech_id),
                    title: title.to_string(),
                    checklist: vec!["Check logs".to_string()],
                    ..Default::default()
                },
                self.tech_id,
                false,
            )
            .await
            .unwrap()
    }

    pub fn emails(&self) -> Vec<String> {
        self.sink
            .take()
            .into_iter()
            .map(|i| i.recipient.email)
            .collect()
    }
}
