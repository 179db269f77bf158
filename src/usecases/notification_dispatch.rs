//! Background delivery of queued order notifications.
//!
//! Delivery is at-least-once: a job is marked done only after the sink accepts
//! it. Failures back off exponentially with jitter and are parked as dead once
//! the attempt budget is spent. Nothing here can affect an order's status.

use std::{sync::Arc, time::Duration as StdDuration};

use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use tokio::sync::watch;
use tracing::{error, info, warn};

use crate::domain::{
    entities::notification_jobs::NotificationJobEntity,
    interfaces::notification_sink::NotificationSink,
    repositories::notification_outbox::NotificationOutboxRepository,
    value_objects::notifications::OrderNotification,
};

const BASE_BACKOFF_SECS: i64 = 5;
const BACKOFF_FACTOR: i64 = 5;
const MAX_BACKOFF_SECS: i64 = 60 * 60;

#[derive(Debug, Clone)]
pub struct DispatchSettings {
    pub max_attempts: i32,
    pub poll_interval: StdDuration,
    pub send_timeout: StdDuration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    Idle,
    Delivered,
    Retrying,
    Dead,
}

pub struct NotificationDispatcher<N, S>
where
    N: NotificationOutboxRepository + Send + Sync + 'static,
    S: NotificationSink + Send + Sync + 'static,
{
    outbox_repo: Arc<N>,
    sink: Arc<S>,
    settings: DispatchSettings,
}

impl<N, S> NotificationDispatcher<N, S>
where
    N: NotificationOutboxRepository + Send + Sync + 'static,
    S: NotificationSink + Send + Sync + 'static,
{
    pub fn new(outbox_repo: Arc<N>, sink: Arc<S>, settings: DispatchSettings) -> Self {
        Self {
            outbox_repo,
            sink,
            settings,
        }
    }

    pub async fn run(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) {
        info!(sink = self.sink.sink_name(), "notification_dispatch: worker started");

        loop {
            if *shutdown.borrow() {
                break;
            }

            match self.dispatch_next().await {
                // Drain the backlog before sleeping.
                Ok(outcome) if outcome != DispatchOutcome::Idle => continue,
                Ok(_) => {}
                Err(err) => {
                    error!(error = ?err, "notification_dispatch: failed to process outbox");
                }
            }

            tokio::select! {
                _ = tokio::time::sleep(self.settings.poll_interval) => {}
                changed = shutdown.changed() => {
                    // Sender dropped.
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }

        info!("notification_dispatch: worker stopped");
    }

    pub async fn dispatch_next(&self) -> Result<DispatchOutcome> {
        let Some(job) = self.outbox_repo.lock_next_due().await? else {
            return Ok(DispatchOutcome::Idle);
        };

        let notification = match serde_json::from_value::<OrderNotification>(job.payload.clone()) {
            Ok(notification) => notification,
            Err(err) => {
                warn!(job_id = %job.id, error = %err, "notification_dispatch: undecodable payload");
                self.outbox_repo
                    .mark_failed(job.id, "payload could not be decoded", None)
                    .await?;
                return Ok(DispatchOutcome::Dead);
            }
        };

        let delivery = tokio::time::timeout(
            self.settings.send_timeout,
            self.sink.push(&notification),
        )
        .await;

        let failure = match delivery {
            Ok(Ok(())) => {
                self.outbox_repo.mark_delivered(job.id).await?;
                info!(
                    job_id = %job.id,
                    order_id = %job.order_id,
                    event = %job.event,
                    "notification_dispatch: delivered"
                );
                return Ok(DispatchOutcome::Delivered);
            }
            Ok(Err(err)) => err.to_string(),
            Err(_) => format!("{} push timed out", self.sink.sink_name()),
        };

        self.record_failure(&job, &failure).await
    }

    async fn record_failure(
        &self,
        job: &NotificationJobEntity,
        failure: &str,
    ) -> Result<DispatchOutcome> {
        let attempts = job.attempts + 1;
        let retry_at = next_retry_at(attempts, self.settings.max_attempts, Utc::now());

        self.outbox_repo.mark_failed(job.id, failure, retry_at).await?;

        match retry_at {
            Some(at) => {
                warn!(
                    job_id = %job.id,
                    attempts,
                    retry_at = %at,
                    error = %failure,
                    "notification_dispatch: delivery failed; will retry"
                );
                Ok(DispatchOutcome::Retrying)
            }
            None => {
                error!(
                    job_id = %job.id,
                    attempts,
                    error = %failure,
                    "notification_dispatch: delivery failed; giving up"
                );
                Ok(DispatchOutcome::Dead)
            }
        }
    }
}

/// `None` once `attempts` reaches `max_attempts`. Otherwise 5s, 25s, 125s, ...
/// capped at an hour, plus up to 20% jitter.
pub fn next_retry_at(attempts: i32, max_attempts: i32, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    if attempts >= max_attempts {
        return None;
    }

    let exponent = u32::try_from(attempts.saturating_sub(1)).unwrap_or(0);
    let backoff = BACKOFF_FACTOR
        .checked_pow(exponent)
        .and_then(|factor| factor.checked_mul(BASE_BACKOFF_SECS))
        .unwrap_or(MAX_BACKOFF_SECS)
        .min(MAX_BACKOFF_SECS);
    let jitter = rand::thread_rng().gen_range(0..=backoff / 5);

    Some(now + Duration::seconds(backoff + jitter))
}
