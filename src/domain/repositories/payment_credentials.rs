use anyhow::Result;
use async_trait::async_trait;
use mockall::automock;
use uuid::Uuid;

use crate::domain::entities::payment_credentials::PaymentCredentialEntity;

#[async_trait]
#[automock]
pub trait PaymentCredentialRepository {
    async fn find_for_tenant(&self, tenant_id: Uuid) -> Result<Option<PaymentCredentialEntity>>;
}
