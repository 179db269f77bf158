use anyhow::Result;
use async_trait::async_trait;
use diesel::{RunQueryDsl, insert_into, prelude::*};
use std::sync::Arc;
use tokio::task;
use uuid::Uuid;

use crate::{
    domain::{
        entities::billing_transactions::{
            BillingTransactionEntity, InsertBillingTransactionEntity,
        },
        repositories::billing_transactions::BillingTransactionRepository,
    },
    infra::db::postgres::{postgres_connection::PgPoolSquad, schema::billing_transactions},
};

pub struct BillingTransactionPostgres {
    db_pool: Arc<PgPoolSquad>,
}

impl BillingTransactionPostgres {
    pub fn new(db_pool: Arc<PgPoolSquad>) -> Self {
        Self { db_pool }
    }
}

#[async_trait]
impl BillingTransactionRepository for BillingTransactionPostgres {
    async fn append(&self, transaction: InsertBillingTransactionEntity) -> Result<bool> {
        let db_pool = Arc::clone(&self.db_pool);

        Ok(task::spawn_blocking(move || -> Result<bool> {
            let mut conn = db_pool.get()?;

            // (provider, provider_transaction_id) is unique; a replay inserts nothing.
            let inserted = insert_into(billing_transactions::table)
                .values(&transaction)
                .on_conflict_do_nothing()
                .execute(&mut conn)?;

            Ok(inserted == 1)
        })
        .await??)
    }

    async fn list_for_tenant(
        &self,
        tenant_id: Uuid,
        limit: i64,
    ) -> Result<Vec<BillingTransactionEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let results = billing_transactions::table
            .filter(billing_transactions::tenant_id.eq(tenant_id))
            .order(billing_transactions::occurred_at.desc())
            .limit(limit)
            .select(BillingTransactionEntity::as_select())
            .load::<BillingTransactionEntity>(&mut conn)?;

        Ok(results)
    }
}
