use anyhow::Result;
use async_trait::async_trait;
use mockall::automock;
use uuid::Uuid;

use crate::domain::{
    entities::tenants::TenantEntity, value_objects::enums::tenant_roles::TenantRole,
};

#[async_trait]
#[automock]
pub trait TenantRepository {
    async fn find_by_slug(&self, slug: &str) -> Result<Option<TenantEntity>>;

    async fn find_by_order_id(&self, order_id: Uuid) -> Result<Option<TenantEntity>>;

    /// First tenant where the user is an owner or admin, falling back to one the user manages.
    async fn find_for_user(&self, user_id: Uuid) -> Result<Option<TenantEntity>>;

    async fn find_member_role(&self, tenant_id: Uuid, user_id: Uuid)
    -> Result<Option<TenantRole>>;
}
