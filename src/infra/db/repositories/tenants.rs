use anyhow::Result;
use async_trait::async_trait;
use diesel::prelude::*;
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    domain::{
        entities::tenants::TenantEntity, repositories::tenants::TenantRepository,
        value_objects::enums::tenant_roles::TenantRole,
    },
    infra::db::postgres::{
        postgres_connection::PgPoolSquad,
        schema::{orders, tenant_members, tenants},
    },
};

pub struct TenantPostgres {
    db_pool: Arc<PgPoolSquad>,
}

impl TenantPostgres {
    pub fn new(db_pool: Arc<PgPoolSquad>) -> Self {
        Self { db_pool }
    }
}

#[async_trait]
impl TenantRepository for TenantPostgres {
    async fn find_by_slug(&self, slug: &str) -> Result<Option<TenantEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let tenant = tenants::table
            .filter(tenants::slug.eq(slug))
            .select(TenantEntity::as_select())
            .first::<TenantEntity>(&mut conn)
            .optional()?;

        Ok(tenant)
    }

    async fn find_by_order_id(&self, order_id: Uuid) -> Result<Option<TenantEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let tenant = tenants::table
            .inner_join(orders::table)
            .filter(orders::id.eq(order_id))
            .select(TenantEntity::as_select())
            .first::<TenantEntity>(&mut conn)
            .optional()?;

        Ok(tenant)
    }

    async fn find_for_user(&self, user_id: Uuid) -> Result<Option<TenantEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let by_role = tenants::table
            .inner_join(tenant_members::table)
            .filter(tenant_members::user_id.eq(user_id))
            .filter(tenant_members::role.eq_any(TenantRole::administering_role_names()))
            .order(tenant_members::created_at.asc())
            .select(TenantEntity::as_select())
            .first::<TenantEntity>(&mut conn)
            .optional()?;

        if by_role.is_some() {
            return Ok(by_role);
        }

        let managed = tenants::table
            .filter(tenants::managed_by.eq(user_id))
            .order(tenants::created_at.asc())
            .select(TenantEntity::as_select())
            .first::<TenantEntity>(&mut conn)
            .optional()?;

        Ok(managed)
    }

    async fn find_member_role(
        &self,
        tenant_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<TenantRole>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let role = tenant_members::table
            .filter(tenant_members::tenant_id.eq(tenant_id))
            .filter(tenant_members::user_id.eq(user_id))
            .select(tenant_members::role)
            .first::<String>(&mut conn)
            .optional()?;

        Ok(role.as_deref().and_then(TenantRole::from_str))
    }
}
