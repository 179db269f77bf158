use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use diesel::prelude::*;
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    domain::{
        entities::notification_jobs::{InsertNotificationJobEntity, NotificationJobEntity},
        repositories::notification_outbox::NotificationOutboxRepository,
        value_objects::notifications::OrderNotification,
    },
    infra::db::postgres::{postgres_connection::PgPoolSquad, schema::notification_jobs},
};

const QUEUED: &str = "queued";
const RUNNING: &str = "running";
const DONE: &str = "done";
const DEAD: &str = "dead";

/// Jobs left `running` longer than this belong to a worker that died mid-send.
const LEASE_MINUTES: i64 = 10;

pub struct NotificationOutboxPostgres {
    db_pool: Arc<PgPoolSquad>,
}

impl NotificationOutboxPostgres {
    pub fn new(db_pool: Arc<PgPoolSquad>) -> Self {
        Self { db_pool }
    }
}

#[async_trait]
impl NotificationOutboxRepository for NotificationOutboxPostgres {
    async fn enqueue(&self, notification: OrderNotification) -> Result<Uuid> {
        let mut conn = Arc::clone(&self.db_pool).get()?;
        let now = Utc::now();

        let insert_entity = InsertNotificationJobEntity {
            tenant_id: notification.tenant_id,
            order_id: notification.order_id,
            event: notification.event_name(),
            payload: serde_json::to_value(&notification)?,
            status: QUEUED.to_string(),
            attempts: 0,
            run_at: now,
            created_at: now,
        };

        let job_id = diesel::insert_into(notification_jobs::table)
            .values(&insert_entity)
            .returning(notification_jobs::id)
            .get_result::<Uuid>(&mut conn)?;

        Ok(job_id)
    }

    async fn lock_next_due(&self) -> Result<Option<NotificationJobEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;
        let worker_id = Uuid::new_v4().to_string();
        let now = Utc::now();
        let stale_before = now - Duration::minutes(LEASE_MINUTES);

        let job = conn.transaction::<Option<NotificationJobEntity>, diesel::result::Error, _>(
            |conn| {
                let candidate = notification_jobs::table
                    .select(NotificationJobEntity::as_select())
                    .filter(
                        notification_jobs::status
                            .eq(QUEUED)
                            .and(notification_jobs::run_at.le(now))
                            .or(notification_jobs::status
                                .eq(RUNNING)
                                .and(notification_jobs::locked_at.lt(stale_before))),
                    )
                    .order(notification_jobs::run_at.asc())
                    .for_update()
                    .skip_locked()
                    .first::<NotificationJobEntity>(conn)
                    .optional()?;

                let Some(job) = candidate else {
                    return Ok(None);
                };

                let locked = diesel::update(notification_jobs::table.find(job.id))
                    .set((
                        notification_jobs::status.eq(RUNNING),
                        notification_jobs::locked_at.eq(Some(now)),
                        notification_jobs::locked_by.eq(Some(worker_id)),
                    ))
                    .returning(NotificationJobEntity::as_select())
                    .get_result::<NotificationJobEntity>(conn)?;

                Ok(Some(locked))
            },
        )?;

        Ok(job)
    }

    async fn mark_delivered(&self, job_id: Uuid) -> Result<()> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        diesel::update(notification_jobs::table.find(job_id))
            .set((
                notification_jobs::status.eq(DONE),
                notification_jobs::attempts.eq(notification_jobs::attempts + 1),
                notification_jobs::locked_at.eq::<Option<DateTime<Utc>>>(None),
                notification_jobs::locked_by.eq::<Option<String>>(None),
            ))
            .execute(&mut conn)?;

        Ok(())
    }

    async fn mark_failed(
        &self,
        job_id: Uuid,
        error: &str,
        retry_at: Option<DateTime<Utc>>,
    ) -> Result<()> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let (status, run_at) = match retry_at {
            Some(at) => (QUEUED, at),
            None => (DEAD, Utc::now()),
        };

        diesel::update(notification_jobs::table.find(job_id))
            .set((
                notification_jobs::status.eq(status),
                notification_jobs::attempts.eq(notification_jobs::attempts + 1),
                notification_jobs::error.eq(Some(error)),
                notification_jobs::run_at.eq(run_at),
                notification_jobs::locked_at.eq::<Option<DateTime<Utc>>>(None),
                notification_jobs::locked_by.eq::<Option<String>>(None),
            ))
            .execute(&mut conn)?;

        Ok(())
    }
}
