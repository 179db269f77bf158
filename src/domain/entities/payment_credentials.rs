use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::infra::db::postgres::schema::payment_credentials;

/// Gateway credentials configured by a tenant admin. Never serialized; `Debug` redacts the keys.
#[derive(Clone, Selectable, Queryable)]
#[diesel(table_name = payment_credentials)]
pub struct PaymentCredentialEntity {
    pub tenant_id: Uuid,
    pub provider: String,
    pub merchant_id: String,
    pub hash_key: String,
    pub hash_iv: String,
    pub updated_at: DateTime<Utc>,
}

impl std::fmt::Debug for PaymentCredentialEntity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PaymentCredentialEntity")
            .field("tenant_id", &self.tenant_id)
            .field("provider", &self.provider)
            .field("merchant_id", &self.merchant_id)
            .field("hash_key", &"[REDACTED]")
            .field("hash_iv", &"[REDACTED]")
            .field("updated_at", &self.updated_at)
            .finish()
    }
}
