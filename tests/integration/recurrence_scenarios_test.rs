// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::helpers::{create_test_app_with, date, TestApp};
use chrono::NaiveDate;
use chronotrak::config::settings::AppEnvironment;
use chronotrak::domain::models::recurrence::{Frequency, RecurrenceRule};
use chronotrak::domain::models::task::TaskStatus;
use chronotrak::infrastructure::database::entities::{
    checklist_item as checklist_entity, task as task_entity,
};
use proptest::prelude::*;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set};
use std::collections::HashSet;
use uuid::Uuid;

async fn scheduled(t: &TestApp, series_id: Uuid) -> Vec<NaiveDate> {
    task_entity::Entity::find()
        .filter(task_entity::Column::RecurrenceSeriesId.eq(series_id))
        .order_by_asc(task_entity::Column::ScheduledFor)
        .all(t.db.as_ref())
        .await
        .unwrap()
        .into_iter()
        .filter_map(|m| m.scheduled_for)
        .collect()
}

async fn app(today: NaiveDate, horizon_days: u32) -> (TestApp, Uuid) {
    let t = create_test_app_with(today, AppEnvironment::Production, horizon_days).await;
    let project = t.project(100.0).await;
    let template = t.task(project.id, "Check backups").await;
    (t, template.id)
}

#[tokio::test]
async fn test_daily_weekdays_only() {
    let start = date(2025, 1, 6);
    let (t, template_id) = app(start, 10).await;
    let mut rule = RecurrenceRule::new(Frequency::Daily, 1, start);
    rule.business_days_only = true;

    let (series, _) = t
        .app
        .materializer
        .attach_recurrence(template_id, rule)
        .await
        .unwrap();

    let expected: Vec<NaiveDate> = [6, 7, 8, 9, 10, 13, 14, 15, 16]
        .into_iter()
        .map(|d| date(2025, 1, d))
        .collect();
    assert_eq!(scheduled(&t, series.id).await, expected);
}

#[tokio::test]
async fn test_weekly_with_byweekday_and_count() {
    let start = date(2025, 1, 6);
    let (t, template_id) = app(start, 180).await;
    let mut rule = RecurrenceRule::new(Frequency::Weekly, 2, start);
    rule.byweekday = vec![0, 2];
    rule.count = Some(5);

    let (series, report) = t
        .app
        .materializer
        .attach_recurrence(template_id, rule)
        .await
        .unwrap();

    assert_eq!(report.created.len(), 4);
    assert_eq!(
        scheduled(&t, series.id).await,
        vec![
            date(2025, 1, 6),
            date(2025, 1, 8),
            date(2025, 1, 20),
            date(2025, 1, 22),
            date(2025, 2, 3),
        ]
    );
}

#[tokio::test]
async fn test_monthly_end_of_month() {
    let start = date(2025, 1, 31);
    let (t, template_id) = app(start, 125).await;

    let (series, _) = t
        .app
        .materializer
        .attach_recurrence(template_id, RecurrenceRule::new(Frequency::Monthly, 1, start))
        .await
        .unwrap();

    assert!(series.rule.monthly_use_last_day);
    assert_eq!(
        scheduled(&t, series.id).await,
        vec![
            date(2025, 1, 31),
            date(2025, 2, 28),
            date(2025, 3, 31),
            date(2025, 4, 30),
            date(2025, 5, 31),
        ]
    );
}

#[tokio::test]
async fn test_rule_edit_cancels_only_safe_future() {
    let start = date(2025, 1, 6);
    let (t, template_id) = app(start, 10).await;
    let (series, report) = t
        .app
        .materializer
        .attach_recurrence(template_id, RecurrenceRule::new(Frequency::Daily, 1, start))
        .await
        .unwrap();
    assert_eq!(report.created.len(), 10);

    let instances = task_entity::Entity::find()
        .filter(task_entity::Column::RecurrenceSeriesId.eq(series.id))
        .filter(task_entity::Column::Id.ne(template_id))
        .order_by_asc(task_entity::Column::ScheduledFor)
        .all(t.db.as_ref())
        .await
        .unwrap();
    let third = &instances[2];
    t.app
        .ledger
        .log_time(third.id, t.tech_id, 0.5, None, false)
        .await
        .unwrap();

    let rewrite = t
        .app
        .materializer
        .rewrite(series.id, RecurrenceRule::new(Frequency::Weekly, 1, start))
        .await
        .unwrap();

    assert_eq!(rewrite.cancelled, 9);
    assert_eq!(rewrite.materialized.created, vec![date(2025, 1, 13)]);
    assert_eq!(
        scheduled(&t, series.id).await,
        vec![date(2025, 1, 6), date(2025, 1, 9), date(2025, 1, 13)]
    );
}

#[tokio::test]
async fn test_in_progress_occurrence_survives_rewrite() {
    let start = date(2025, 1, 6);
    let (t, template_id) = app(start, 3).await;
    let (series, _) = t
        .app
        .materializer
        .attach_recurrence(template_id, RecurrenceRule::new(Frequency::Daily, 1, start))
        .await
        .unwrap();
    let started = task_entity::Entity::find()
        .filter(task_entity::Column::RecurrenceSeriesId.eq(series.id))
        .filter(task_entity::Column::ScheduledFor.eq(date(2025, 1, 8)))
        .one(t.db.as_ref())
        .await
        .unwrap()
        .unwrap();
    t.app
        .tasks
        .change_status(started.id, TaskStatus::InProgress, t.tech_id, false)
        .await
        .unwrap();

    let mut rule = RecurrenceRule::new(Frequency::Daily, 2, start);
    rule.end_date = Some(date(2025, 1, 6));
    let rewrite = t.app.materializer.rewrite(series.id, rule).await.unwrap();

    assert_eq!(rewrite.cancelled, 2);
    assert!(rewrite.materialized.created.is_empty());
    assert_eq!(
        scheduled(&t, series.id).await,
        vec![date(2025, 1, 6), date(2025, 1, 8)]
    );
}

#[tokio::test]
async fn test_sweep_extends_horizon_over_time() {
    let start = date(2025, 1, 6);
    let (t, template_id) = app(start, 7).await;
    let (series, _) = t
        .app
        .materializer
        .attach_recurrence(template_id, RecurrenceRule::new(Frequency::Weekly, 1, start))
        .await
        .unwrap();
    assert_eq!(scheduled(&t, series.id).await.len(), 2);

    t.clock.advance_days(14);
    let created = t.app.materializer.materialize_all().await.unwrap();

    assert_eq!(created, 2);
    assert_eq!(
        scheduled(&t, series.id).await,
        vec![
            date(2025, 1, 6),
            date(2025, 1, 13),
            date(2025, 1, 20),
            date(2025, 1, 27),
        ]
    );
}

fn rule_strategy() -> impl Strategy<Value = (RecurrenceRule, i64)> {
    (
        prop_oneof![
            Just(Frequency::Daily),
            Just(Frequency::Weekly),
            Just(Frequency::Monthly)
        ],
        1u32..4,
        0u64..90,
        any::<bool>(),
        prop::option::of(1u32..12),
        prop::collection::btree_set(0u8..7, 0..3),
        0i64..40,
    )
        .prop_map(|(frequency, interval, offset, business, count, days, lag)| {
            let start = date(2025, 1, 1) + chrono::Days::new(offset);
            let mut rule = RecurrenceRule::new(frequency, interval, start);
            rule.business_days_only = business && frequency == Frequency::Daily;
            rule.count = count;
            if frequency == Frequency::Weekly {
                rule.byweekday = days.into_iter().collect();
            }
            (rule, lag)
        })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(12))]

    #[test]
    fn prop_materialize_matches_rule_and_is_idempotent((rule, lag) in rule_strategy()) {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        runtime.block_on(async {
            let today = rule.start_date + chrono::Days::new(lag as u64);
            let horizon_days = 60;
            let (t, template_id) = app(today, horizon_days).await;
            let (series, _) = t
                .app
                .materializer
                .attach_recurrence(template_id, rule.clone())
                .await
                .unwrap();
            let once = scheduled(&t, series.id).await;

            t.app.materializer.materialize(series.id).await.unwrap();
            let twice = scheduled(&t, series.id).await;
            assert_eq!(once, twice);

            let mut normalized = rule.clone();
            normalized.normalize_month_end();
            let horizon_end = today + chrono::Days::new(u64::from(horizon_days));
            let mut expected: Vec<NaiveDate> = normalized
                .occurrences(horizon_end)
                .into_iter()
                .filter(|d| *d >= today)
                .collect();
            if !expected.contains(&rule.start_date) {
                expected.push(rule.start_date);
            }
            expected.sort();
            assert_eq!(twice, expected);

            // 除模板外没有早于今天的实例
            assert!(twice
                .iter()
                .filter(|d| **d < today)
                .all(|d| *d == rule.start_date));
        });
    }
}

async fn checklist_of(t: &TestApp, task_id: Uuid) -> Vec<checklist_entity::Model> {
    checklist_entity::Entity::find()
        .filter(checklist_entity::Column::TaskId.eq(task_id))
        .order_by_asc(checklist_entity::Column::Position)
        .all(t.db.as_ref())
        .await
        .unwrap()
}

const CHECKLIST_WORDS: [&str; 5] = ["Check logs", "Rotate keys", "Call vendor", "Backup", "Patch"];

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn prop_checklist_sync_only_appends(
        own in proptest::collection::vec((0usize..5, any::<bool>()), 0..6),
        added in proptest::collection::vec(0usize..5, 1..6),
    ) {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        runtime.block_on(async {
            let today = date(2025, 1, 6);
            let (t, template_id) = app(today, 5).await;
            let (series, _) = t
                .app
                .materializer
                .attach_recurrence(template_id, RecurrenceRule::new(Frequency::Daily, 1, today))
                .await
                .unwrap();
            let instance = task_entity::Entity::find()
                .filter(task_entity::Column::RecurrenceSeriesId.eq(series.id))
                .filter(task_entity::Column::ScheduledFor.eq(date(2025, 1, 8)))
                .one(t.db.as_ref())
                .await
                .unwrap()
                .unwrap();

            for (word, checked) in &own {
                let item = t
                    .app
                    .tasks
                    .add_checklist_item(instance.id, CHECKLIST_WORDS[*word])
                    .await
                    .unwrap();
                if *checked {
                    let model = checklist_entity::Entity::find_by_id(item.id)
                        .one(t.db.as_ref())
                        .await
                        .unwrap()
                        .unwrap();
                    let mut active: checklist_entity::ActiveModel = model.into();
                    active.is_checked = Set(true);
                    active.update(t.db.as_ref()).await.unwrap();
                }
            }
            let before = checklist_of(&t, instance.id).await;

            for word in &added {
                t.app
                    .tasks
                    .add_checklist_item(template_id, CHECKLIST_WORDS[*word])
                    .await
                    .unwrap();
            }
            let after = checklist_of(&t, instance.id).await;

            for item in &before {
                let kept = after.iter().find(|i| i.id == item.id).unwrap();
                assert_eq!(kept.content, item.content);
                assert_eq!(kept.is_checked, item.is_checked);
                assert_eq!(kept.position, item.position);
            }

            let template_items = checklist_of(&t, template_id).await;
            let before_words: HashSet<&str> = before.iter().map(|i| i.content.as_str()).collect();
            let template_words: HashSet<&str> =
                template_items.iter().map(|i| i.content.as_str()).collect();
            let missing = template_words.difference(&before_words).count();
            assert_eq!(after.len(), before.len() + missing);
            assert!(after[before.len()..].iter().all(|i| !i.is_checked));
        });
    }
}
