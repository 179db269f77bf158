use anyhow::Result;
use async_trait::async_trait;
use mockall::automock;
use uuid::Uuid;

use crate::domain::entities::billing_transactions::{
    BillingTransactionEntity, InsertBillingTransactionEntity,
};

/// Append-only billing ledger.
#[async_trait]
#[automock]
pub trait BillingTransactionRepository {
    /// Returns false when a row with the same provider transaction id already exists.
    async fn append(&self, transaction: InsertBillingTransactionEntity) -> Result<bool>;

    async fn list_for_tenant(
        &self,
        tenant_id: Uuid,
        limit: i64,
    ) -> Result<Vec<BillingTransactionEntity>>;
}
