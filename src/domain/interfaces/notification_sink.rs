use anyhow::Result;
use async_trait::async_trait;
use mockall::automock;

use crate::domain::value_objects::notifications::OrderNotification;

/// Downstream channel that delivers order messages to customers.
#[async_trait]
#[automock]
pub trait NotificationSink {
    async fn push(&self, notification: &OrderNotification) -> Result<()>;

    fn sink_name(&self) -> &'static str;
}
