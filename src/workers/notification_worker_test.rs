use super::*;
use crate::domain::models::notification::{CorrelationIds, EventKind, Recipient};
use crate::domain::repositories::communication_repository::CommunicationRepository;
use crate::domain::services::notification_bus::NotificationSink;
use crate::infrastructure::notifications::{QueuedNotificationSink, RecordingDelivery};
use crate::infrastructure::repositories::communication_repo_impl::CommunicationRepositoryImpl;
use crate::infrastructure::repositories::fixtures::setup_db;
use crate::utils::errors::{CoreError, CoreResult};
use async_trait::async_trait;
use uuid::Uuid;

fn intent(project_id: Uuid, email: &str) -> NotificationIntent {
    NotificationIntent {
        recipient: Recipient {
            user_id: Uuid::new_v4(),
            name: "Alice".to_string(),
            email: email.to_string(),
        },
        event: EventKind::ProjectCreditLow,
        subject: "[ChronoTrak] ALERT: low credit for project Maintenance".to_string(),
        payload: serde_json::json!({ "type": "project_credit_low" }),
        correlation: CorrelationIds {
            event_id: Uuid::new_v4(),
            project_id,
            task_id: None,
            triggered_by_id: None,
        },
    }
}

struct FailingDelivery;

#[async_trait]
impl DeliveryBackend for FailingDelivery {
    async fn deliver(&self, _intent: &NotificationIntent) -> CoreResult<()> {
        Err(CoreError::InvalidInput("mailbox unavailable".to_string()))
    }
}

#[tokio::test]
async fn test_drains_queue_into_communication_log() {
    let db = setup_db().await;
    let communications = Arc::new(CommunicationRepositoryImpl::new(db));
    let project_id = Uuid::new_v4();

    let (sink, receiver) = QueuedNotificationSink::channel(8);
    let worker = NotificationWorker::new(
        receiver,
        Arc::new(RecordingDelivery::new(communications.clone())),
    );
    let handle = worker.start();

    sink.submit(intent(project_id, "alice@example.com"));
    sink.submit(intent(project_id, "dave@example.com"));
    drop(sink);

    assert_eq!(handle.await.unwrap(), 2);
    assert_eq!(communications.count_for_project(project_id).await.unwrap(), 2);
}

#[tokio::test]
async fn test_failed_delivery_does_not_stop_worker() {
    let (sink, receiver) = QueuedNotificationSink::channel(4);
    let worker = NotificationWorker::new(receiver, Arc::new(FailingDelivery));

    sink.submit(intent(Uuid::new_v4(), "alice@example.com"));
    sink.submit(intent(Uuid::new_v4(), "dave@example.com"));
    drop(sink);

    assert_eq!(worker.run().await, 0);
}
