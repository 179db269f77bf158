//! The only diesel code allowed to read or write across tenants.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use std::sync::Arc;
use tokio::task;
use uuid::Uuid;

use crate::{
    domain::{
        entities::tenants::TenantEntity,
        repositories::trusted_operations::{
            BillingReconciliationRepository, CallbackTenantLookup,
        },
        value_objects::{
            enums::subscription_statuses::SubscriptionStatus, plans::FREE_PLAN_ID,
        },
    },
    infra::db::postgres::{
        postgres_connection::PgPoolSquad,
        schema::{payment_credentials, tenants},
    },
};

pub struct TrustedOperationsPostgres {
    db_pool: Arc<PgPoolSquad>,
}

impl TrustedOperationsPostgres {
    pub fn new(db_pool: Arc<PgPoolSquad>) -> Self {
        Self { db_pool }
    }
}

#[async_trait]
impl CallbackTenantLookup for TrustedOperationsPostgres {
    async fn find_tenant_by_merchant(&self, merchant_id: &str) -> Result<Option<Uuid>> {
        let db_pool = Arc::clone(&self.db_pool);
        let merchant_id = merchant_id.to_string();

        Ok(task::spawn_blocking(move || -> Result<Option<Uuid>> {
            let mut conn = db_pool.get()?;

            let tenant_id = payment_credentials::table
                .filter(payment_credentials::merchant_id.eq(merchant_id))
                .select(payment_credentials::tenant_id)
                .first::<Uuid>(&mut conn)
                .optional()?;

            Ok(tenant_id)
        })
        .await??)
    }
}

#[async_trait]
impl BillingReconciliationRepository for TrustedOperationsPostgres {
    async fn list_expired_subscriptions(&self, now: DateTime<Utc>) -> Result<Vec<TenantEntity>> {
        // Diesel is synchronous; keep the batch scan off the async workers.
        let db_pool = Arc::clone(&self.db_pool);

        Ok(task::spawn_blocking(move || -> Result<Vec<TenantEntity>> {
            let mut conn = db_pool.get()?;

            let results = tenants::table
                .filter(tenants::next_billing_at.lt(now))
                .filter(tenants::plan_id.ne(FREE_PLAN_ID))
                .filter(tenants::subscription_status.eq(SubscriptionStatus::Active.as_str()))
                .order(tenants::next_billing_at.asc())
                .select(TenantEntity::as_select())
                .load::<TenantEntity>(&mut conn)?;

            Ok(results)
        })
        .await??)
    }

    async fn downgrade_to_free(
        &self,
        tenant_id: Uuid,
        expected_next_billing_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<bool> {
        let db_pool = Arc::clone(&self.db_pool);

        Ok(task::spawn_blocking(move || -> Result<bool> {
            let mut conn = db_pool.get()?;

            let updated = diesel::update(tenants::table)
                .filter(tenants::id.eq(tenant_id))
                .filter(tenants::plan_id.ne(FREE_PLAN_ID))
                .filter(tenants::next_billing_at.eq(expected_next_billing_at))
                .set((
                    tenants::plan_id.eq(FREE_PLAN_ID),
                    tenants::next_billing_at.eq::<Option<DateTime<Utc>>>(None),
                    tenants::subscription_status.eq(SubscriptionStatus::Active.as_str()),
                    tenants::updated_at.eq(now),
                ))
                .execute(&mut conn)?;

            Ok(updated == 1)
        })
        .await??)
    }
}
