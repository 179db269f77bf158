use anyhow::Result;
use async_trait::async_trait;
use diesel::prelude::*;
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    domain::{
        entities::payment_credentials::PaymentCredentialEntity,
        repositories::payment_credentials::PaymentCredentialRepository,
    },
    infra::db::postgres::{postgres_connection::PgPoolSquad, schema::payment_credentials},
};

/// Reads credentials on demand. Nothing is cached between calls.
pub struct PaymentCredentialPostgres {
    db_pool: Arc<PgPoolSquad>,
}

impl PaymentCredentialPostgres {
    pub fn new(db_pool: Arc<PgPoolSquad>) -> Self {
        Self { db_pool }
    }
}

#[async_trait]
impl PaymentCredentialRepository for PaymentCredentialPostgres {
    async fn find_for_tenant(&self, tenant_id: Uuid) -> Result<Option<PaymentCredentialEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let credential = payment_credentials::table
            .filter(payment_credentials::tenant_id.eq(tenant_id))
            .select(PaymentCredentialEntity::as_select())
            .first::<PaymentCredentialEntity>(&mut conn)
            .optional()?;

        Ok(credential)
    }
}
