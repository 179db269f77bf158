//! Privileged store operations that cross tenant boundaries.
//!
//! Only the payment callback tenant lookup and the reconciliation downgrade live here.
//! Everything else goes through tenant-scoped repositories.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mockall::automock;
use uuid::Uuid;

use crate::domain::entities::tenants::TenantEntity;

#[async_trait]
#[automock]
pub trait CallbackTenantLookup {
    /// The tenant whose gateway credentials carry `merchant_id`. Merchant ids are
    /// unique, so this is the only tenant a callback can act on.
    async fn find_tenant_by_merchant(&self, merchant_id: &str) -> Result<Option<Uuid>>;
}

#[async_trait]
#[automock]
pub trait BillingReconciliationRepository {
    /// Active, non-free tenants whose `next_billing_at` is before `now`.
    async fn list_expired_subscriptions(&self, now: DateTime<Utc>) -> Result<Vec<TenantEntity>>;

    /// Moves the tenant to the free plan only if `next_billing_at` still equals
    /// `expected_next_billing_at`. Returns false when another writer got there first.
    async fn downgrade_to_free(
        &self,
        tenant_id: Uuid,
        expected_next_billing_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<bool>;
}
