//! Notification job handler.

use super::{parse_payload, repo_error};
use crate::types::NotificationPayload;
use leadrail_domain::{NotificationRecord, NotificationRepository};
use leadrail_queue::{Job, QueueResult};

pub async fn handle_create_notification(
    repo: &dyn NotificationRepository,
    job: &Job,
) -> QueueResult<()> {
    let payload: NotificationPayload = parse_payload(job)?;

    let record = NotificationRecord::new(
        payload.organization_id,
        payload.title,
        payload.body,
        payload.link,
    );

    repo.insert(record).await.map_err(repo_error)
}
