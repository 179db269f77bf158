//! Decides whether a principal may act on a tenant.
//!
//! Grants come from an ordered list of named strategies evaluated until one
//! says yes. A failing strategy is logged and treated as "no grant".

use std::sync::Arc;

use anyhow::Result as AnyResult;
use async_trait::async_trait;
use tracing::{debug, error, warn};

use crate::{
    domain::{
        entities::tenants::TenantEntity,
        repositories::tenants::TenantRepository,
        value_objects::{principal::Principal, tenant_context::TenantContext},
    },
    usecases::errors::{UseCaseError, UseCaseResult},
};

#[async_trait]
pub trait AuthorizationStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    async fn grants(&self, principal: &Principal, tenant: &TenantEntity) -> AnyResult<bool>;
}

/// Owner or admin membership on this exact tenant.
pub struct RoleGrantStrategy<T>
where
    T: TenantRepository + Send + Sync + 'static,
{
    tenant_repo: Arc<T>,
}

impl<T> RoleGrantStrategy<T>
where
    T: TenantRepository + Send + Sync + 'static,
{
    pub fn new(tenant_repo: Arc<T>) -> Self {
        Self { tenant_repo }
    }
}

#[async_trait]
impl<T> AuthorizationStrategy for RoleGrantStrategy<T>
where
    T: TenantRepository + Send + Sync + 'static,
{
    fn name(&self) -> &'static str {
        "role_grant"
    }

    async fn grants(&self, principal: &Principal, tenant: &TenantEntity) -> AnyResult<bool> {
        let role = self
            .tenant_repo
            .find_member_role(tenant.id, principal.user_id)
            .await?;

        Ok(role.is_some_and(|role| role.can_administer()))
    }
}

/// Platform operators may act on headquarters tenants.
pub struct HeadquartersStrategy;

#[async_trait]
impl AuthorizationStrategy for HeadquartersStrategy {
    fn name(&self) -> &'static str {
        "headquarters"
    }

    async fn grants(&self, principal: &Principal, tenant: &TenantEntity) -> AnyResult<bool> {
        Ok(tenant.is_hq && principal.is_platform_operator)
    }
}

/// Tenants created before role grants existed record their manager directly.
pub struct LegacyManagerStrategy;

#[async_trait]
impl AuthorizationStrategy for LegacyManagerStrategy {
    fn name(&self) -> &'static str {
        "legacy_manager"
    }

    async fn grants(&self, principal: &Principal, tenant: &TenantEntity) -> AnyResult<bool> {
        Ok(tenant.managed_by == Some(principal.user_id))
    }
}

pub struct TenantAccessGuard<T>
where
    T: TenantRepository + Send + Sync + 'static,
{
    tenant_repo: Arc<T>,
    strategies: Vec<Box<dyn AuthorizationStrategy>>,
}

impl<T> TenantAccessGuard<T>
where
    T: TenantRepository + Send + Sync + 'static,
{
    /// Evaluation order: `role_grant`, `headquarters`, `legacy_manager`.
    pub fn new(tenant_repo: Arc<T>) -> Self {
        let strategies: Vec<Box<dyn AuthorizationStrategy>> = vec![
            Box::new(RoleGrantStrategy::new(Arc::clone(&tenant_repo))),
            Box::new(HeadquartersStrategy),
            Box::new(LegacyManagerStrategy),
        ];

        Self::with_strategies(tenant_repo, strategies)
    }

    pub fn with_strategies(
        tenant_repo: Arc<T>,
        strategies: Vec<Box<dyn AuthorizationStrategy>>,
    ) -> Self {
        Self {
            tenant_repo,
            strategies,
        }
    }

    pub fn strategy_names(&self) -> Vec<&'static str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    pub async fn resolve(&self, context: TenantContext<'_>) -> UseCaseResult<Option<TenantEntity>> {
        let tenant = match context {
            TenantContext::Slug(slug) => self.tenant_repo.find_by_slug(slug).await,
            TenantContext::Order(order_id) => self.tenant_repo.find_by_order_id(order_id).await,
            TenantContext::User(user_id) => self.tenant_repo.find_for_user(user_id).await,
        }
        .map_err(|err| {
            error!(?context, db_error = ?err, "tenant_access: failed to resolve tenant");
            UseCaseError::Persistence(err)
        })?;

        Ok(tenant)
    }

    pub async fn authorize(&self, principal: Option<&Principal>, tenant: &TenantEntity) -> bool {
        let Some(principal) = principal else {
            return false;
        };

        for strategy in &self.strategies {
            match strategy.grants(principal, tenant).await {
                Ok(true) => {
                    debug!(
                        strategy = strategy.name(),
                        user_id = %principal.user_id,
                        tenant_id = %tenant.id,
                        "tenant_access: granted"
                    );
                    return true;
                }
                Ok(false) => {}
                Err(err) => {
                    warn!(
                        strategy = strategy.name(),
                        user_id = %principal.user_id,
                        tenant_id = %tenant.id,
                        error = ?err,
                        "tenant_access: strategy failed; treating as no grant"
                    );
                }
            }
        }

        false
    }

    pub async fn resolve_and_authorize(
        &self,
        principal: Option<&Principal>,
        context: TenantContext<'_>,
    ) -> UseCaseResult<TenantEntity> {
        let Some(principal) = principal else {
            return Err(UseCaseError::Authentication);
        };

        let tenant = self
            .resolve(context)
            .await?
            .ok_or(UseCaseError::NotFound("tenant"))?;

        if !self.authorize(Some(principal), &tenant).await {
            warn!(
                user_id = %principal.user_id,
                tenant_id = %tenant.id,
                "tenant_access: denied"
            );
            return Err(UseCaseError::Authorization);
        }

        Ok(tenant)
    }
}
