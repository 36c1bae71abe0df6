use super::*;
use crate::domain::models::notification::EventKind;
use crate::domain::models::recurrence::{Frequency, RecurrenceRule};
use crate::domain::models::task::TaskPriority;
use crate::infrastructure::repositories::fixtures::{
    insert_client, insert_project, insert_user, setup_db, RecordingPublisher,
};
use crate::infrastructure::repositories::recurrence_repo_impl::RecurrenceRepositoryImpl;
use crate::infrastructure::repositories::task_repo_impl::TaskRepositoryImpl;
use crate::utils::clock::FixedClock;
use chrono::NaiveDate;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

struct Fixture {
    service: TaskService,
    materializer: Arc<RecurrenceMaterializer>,
    tasks: Arc<TaskRepositoryImpl>,
    publisher: Arc<RecordingPublisher>,
    clock: Arc<FixedClock>,
    project_id: Uuid,
    user_id: Uuid,
}

async fn fixture() -> Fixture {
    let db = setup_db().await;
    let client_id = insert_client(&db, "Acme").await;
    let user_id = insert_user(&db, "Tom", "technician").await;
    let project_id = insert_project(&db, client_id, 600, true, true).await;

    let tasks = Arc::new(TaskRepositoryImpl::new(db.clone()));
    let clock = Arc::new(FixedClock::at_date(date(2025, 1, 6)));
    let publisher = Arc::new(RecordingPublisher::default());
    let materializer = Arc::new(RecurrenceMaterializer::new(
        Arc::new(RecurrenceRepositoryImpl::new(db.clone())),
        tasks.clone(),
        clock.clone(),
        14,
    ));
    let service = TaskService::new(
        tasks.clone(),
        materializer.clone(),
        publisher.clone(),
        clock.clone(),
        14,
    );

    Fixture {
        service,
        materializer,
        tasks,
        publisher,
        clock,
        project_id,
        user_id,
    }
}

fn new_task(f: &Fixture, title: &str) -> NewTask {
    NewTask {
        project_id: f.project_id,
        user_id: Some(f.user_id),
        title: title.to_string(),
        priority: TaskPriority::High,
        checklist: vec!["Open ticket".to_string()],
        ..Default::default()
    }
}

#[tokio::test]
async fn test_create_task_publishes_event() {
    let f = fixture().await;

    let task = f
        .service
        .create_task(new_task(&f, "Renew certificate"), f.user_id, true)
        .await
        .unwrap();

    assert_eq!(task.status, TaskStatus::ToDo);
    assert_eq!(f.tasks.checklist(task.id).await.unwrap().len(), 1);
    assert_eq!(f.publisher.kinds(), vec![EventKind::TaskCreated]);
    assert!(f.publisher.requests.lock()[0].notify_all);

    let blank = f
        .service
        .create_task(new_task(&f, "  "), f.user_id, false)
        .await
        .unwrap_err();
    assert!(matches!(blank, CoreError::InvalidInput(_)));
}

#[tokio::test]
async fn test_completed_at_follows_done_status() {
    let f = fixture().await;
    let task = f
        .service
        .create_task(new_task(&f, "Renew certificate"), f.user_id, false)
        .await
        .unwrap();

    let done = f
        .service
        .change_status(task.id, TaskStatus::Done, f.user_id, false)
        .await
        .unwrap();
    assert!(done.completed_at.is_some());

    let reopened = f
        .service
        .change_status(task.id, TaskStatus::InProgress, f.user_id, false)
        .await
        .unwrap();
    assert!(reopened.completed_at.is_none());

    f.service
        .change_status(task.id, TaskStatus::InProgress, f.user_id, false)
        .await
        .unwrap();
    assert_eq!(f.publisher.count(EventKind::TaskStatusChanged), 2);

    let requests = f.publisher.requests.lock();
    match &requests[1].event {
        DomainEvent::TaskStatusChanged { old, new, .. } => {
            assert_eq!(*old, TaskStatus::ToDo);
            assert_eq!(*new, TaskStatus::Done);
        }
        other => panic!("unexpected event {:?}", other),
    }
}

#[tokio::test]
async fn test_archive_sweep_uses_cutoff() {
    let f = fixture().await;
    let old = f
        .service
        .create_task(new_task(&f, "Old"), f.user_id, false)
        .await
        .unwrap();
    f.service
        .change_status(old.id, TaskStatus::Done, f.user_id, false)
        .await
        .unwrap();

    f.clock.advance_days(10);
    let recent = f
        .service
        .create_task(new_task(&f, "Recent"), f.user_id, false)
        .await
        .unwrap();
    f.service
        .change_status(recent.id, TaskStatus::Done, f.user_id, false)
        .await
        .unwrap();

    f.clock.advance_days(5);
    assert_eq!(f.service.archive_sweep().await.unwrap(), 1);
    assert_eq!(f.service.archive_sweep().await.unwrap(), 0);

    let archived = f.tasks.find_by_id(old.id).await.unwrap().unwrap();
    assert!(archived.is_archived);
    assert!(archived.archived_at.is_some());
    assert!(!f.tasks.find_by_id(recent.id).await.unwrap().unwrap().is_archived);
}

#[tokio::test]
async fn test_reopening_archived_task_unarchives_it() {
    let f = fixture().await;
    let task = f
        .service
        .create_task(new_task(&f, "Renew certificate"), f.user_id, false)
        .await
        .unwrap();
    f.service
        .change_status(task.id, TaskStatus::Done, f.user_id, false)
        .await
        .unwrap();
    f.clock.advance_days(20);
    assert_eq!(f.service.archive_sweep().await.unwrap(), 1);

    let reopened = f
        .service
        .change_status(task.id, TaskStatus::ToDo, f.user_id, false)
        .await
        .unwrap();

    assert_eq!(reopened.status, TaskStatus::ToDo);
    assert!(!reopened.is_archived);
    assert!(reopened.archived_at.is_none());
    assert!(reopened.completed_at.is_none());

    let done_again = f
        .service
        .change_status(task.id, TaskStatus::Done, f.user_id, false)
        .await
        .unwrap();
    assert!(!done_again.is_archived);
    assert_eq!(f.service.archive_sweep().await.unwrap(), 0);
}

#[tokio::test]
async fn test_kanban_shows_one_upcoming_per_series() {
    let f = fixture().await;
    let template = f
        .service
        .create_task(new_task(&f, "Weekly review"), f.user_id, false)
        .await
        .unwrap();
    f.service
        .create_task(new_task(&f, "One-off"), f.user_id, false)
        .await
        .unwrap();
    f.materializer
        .attach_recurrence(
            template.id,
            RecurrenceRule::new(Frequency::Daily, 1, date(2025, 1, 6)),
        )
        .await
        .unwrap();

    let cards = f.service.kanban_todo(f.user_id).await.unwrap();

    assert_eq!(cards.len(), 3);
    let upcoming: Vec<_> = cards.iter().filter(|c| c.upcoming).collect();
    assert_eq!(upcoming.len(), 1);
    assert_eq!(upcoming[0].task.scheduled_for, Some(date(2025, 1, 7)));

    let visible = f.service.visible_tasks(f.project_id).await.unwrap();
    assert_eq!(visible.len(), 2);
}

#[tokio::test]
async fn test_deleting_template_removes_series() {
    let f = fixture().await;
    let template = f
        .service
        .create_task(new_task(&f, "Weekly review"), f.user_id, false)
        .await
        .unwrap();
    let (series, _) = f
        .materializer
        .attach_recurrence(
            template.id,
            RecurrenceRule::new(Frequency::Weekly, 1, date(2025, 1, 6)),
        )
        .await
        .unwrap();

    f.service.delete_task(template.id).await.unwrap();

    assert!(f.tasks.find_by_id(template.id).await.unwrap().is_none());
    assert!(f.materializer.materialize(series.id).await.is_err());
    assert!(f.service.visible_tasks(f.project_id).await.unwrap().is_empty());
    assert!(f.service.kanban_todo(f.user_id).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_template_checklist_flows_to_future_instances() {
    let f = fixture().await;
    let template = f
        .service
        .create_task(new_task(&f, "Weekly review"), f.user_id, false)
        .await
        .unwrap();
    let (series, _) = f
        .materializer
        .attach_recurrence(
            template.id,
            RecurrenceRule::new(Frequency::Weekly, 1, date(2025, 1, 6)),
        )
        .await
        .unwrap();

    f.service
        .add_checklist_item(template.id, "Update dashboard")
        .await
        .unwrap();

    let next = f
        .tasks
        .list_by_project(f.project_id)
        .await
        .unwrap()
        .into_iter()
        .find(|t| t.recurrence_series_id == Some(series.id) && t.id != template.id)
        .unwrap();
    let contents: Vec<String> = f
        .tasks
        .checklist(next.id)
        .await
        .unwrap()
        .into_iter()
        .map(|i| i.content)
        .collect();
    assert_eq!(contents, vec!["Open ticket", "Update dashboard"]);
}

#[tokio::test]
async fn test_comment_events_carry_mentions() {
    let f = fixture().await;
    let task = f
        .service
        .create_task(new_task(&f, "Renew certificate"), f.user_id, false)
        .await
        .unwrap();
    let mentioned = Uuid::new_v4();
    let author = Uuid::new_v4();

    f.service
        .comment_added(task.id, f.user_id, "see logs", vec![mentioned], false)
        .await
        .unwrap();
    f.service
        .comment_replied(task.id, f.user_id, author, "thanks", Vec::new(), true)
        .await
        .unwrap();

    let requests = f.publisher.requests.lock();
    assert_eq!(requests[1].mentioned, vec![mentioned]);
    assert!(!requests[1].notify_all);
    assert_eq!(requests[2].event.kind(), EventKind::TaskCommentReplied);
    assert!(requests[2].notify_all);

    let missing = Uuid::new_v4();
    drop(requests);
    assert!(matches!(
        f.service
            .comment_added(missing, f.user_id, "x", Vec::new(), false)
            .await
            .unwrap_err(),
        CoreError::NoSuchEntity { .. }
    ));
}
