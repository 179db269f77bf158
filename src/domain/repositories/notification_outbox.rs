use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mockall::automock;
use uuid::Uuid;

use crate::domain::{
    entities::notification_jobs::NotificationJobEntity,
    value_objects::notifications::OrderNotification,
};

#[async_trait]
#[automock]
pub trait NotificationOutboxRepository {
    async fn enqueue(&self, notification: OrderNotification) -> Result<Uuid>;

    async fn lock_next_due(&self) -> Result<Option<NotificationJobEntity>>;

    async fn mark_delivered(&self, job_id: Uuid) -> Result<()>;

    /// `retry_at` of `None` parks the job as dead.
    async fn mark_failed(
        &self,
        job_id: Uuid,
        error: &str,
        retry_at: Option<DateTime<Utc>>,
    ) -> Result<()>;
}
