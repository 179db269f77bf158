use std::sync::Arc;

use tracing::error;
use uuid::Uuid;

use crate::{
    domain::{
        entities::billing_transactions::BillingTransactionEntity,
        repositories::{
            billing_transactions::BillingTransactionRepository,
            notification_outbox::NotificationOutboxRepository, orders::OrderRepository,
            tenants::TenantRepository,
        },
        value_objects::{
            orders::{OrderDto, UpdateOrderStatusModel},
            principal::Principal,
            tenant_context::TenantContext,
            tenants::TenantSummaryDto,
        },
    },
    usecases::{
        errors::{UseCaseError, UseCaseResult},
        order_ledger::OrderLedger,
        tenant_access::TenantAccessGuard,
    },
};

const DEFAULT_TRANSACTION_LIMIT: i64 = 50;
const MAX_TRANSACTION_LIMIT: i64 = 200;

/// Operator-facing operations. Every call passes the access guard first.
pub struct TenantAdminUseCase<T, O, B, N>
where
    T: TenantRepository + Send + Sync + 'static,
    O: OrderRepository + Send + Sync + 'static,
    B: BillingTransactionRepository + Send + Sync + 'static,
    N: NotificationOutboxRepository + Send + Sync + 'static,
{
    guard: Arc<TenantAccessGuard<T>>,
    ledger: Arc<OrderLedger<O, B, N>>,
    transaction_repo: Arc<B>,
}

impl<T, O, B, N> TenantAdminUseCase<T, O, B, N>
where
    T: TenantRepository + Send + Sync + 'static,
    O: OrderRepository + Send + Sync + 'static,
    B: BillingTransactionRepository + Send + Sync + 'static,
    N: NotificationOutboxRepository + Send + Sync + 'static,
{
    pub fn new(
        guard: Arc<TenantAccessGuard<T>>,
        ledger: Arc<OrderLedger<O, B, N>>,
        transaction_repo: Arc<B>,
    ) -> Self {
        Self {
            guard,
            ledger,
            transaction_repo,
        }
    }

    /// The tenant the caller administers, if any.
    pub async fn current_tenant(
        &self,
        principal: Option<&Principal>,
    ) -> UseCaseResult<TenantSummaryDto> {
        let principal = principal.ok_or(UseCaseError::Authentication)?;

        let tenant = self
            .guard
            .resolve_and_authorize(Some(principal), TenantContext::User(principal.user_id))
            .await?;

        Ok(TenantSummaryDto::from(tenant))
    }

    pub async fn update_order_status(
        &self,
        principal: Option<&Principal>,
        slug: &str,
        order_id: Uuid,
        model: UpdateOrderStatusModel,
    ) -> UseCaseResult<OrderDto> {
        let tenant = self
            .guard
            .resolve_and_authorize(principal, TenantContext::Slug(slug))
            .await?;
        let actor = principal.ok_or(UseCaseError::Authentication)?;

        self.transition(tenant.id, order_id, model, actor).await
    }

    /// Same as `update_order_status`, for callers that only hold the order id.
    /// The tenant is derived from the order itself.
    pub async fn update_order_status_by_id(
        &self,
        principal: Option<&Principal>,
        order_id: Uuid,
        model: UpdateOrderStatusModel,
    ) -> UseCaseResult<OrderDto> {
        let tenant = self
            .guard
            .resolve_and_authorize(principal, TenantContext::Order(order_id))
            .await?;
        let actor = principal.ok_or(UseCaseError::Authentication)?;

        self.transition(tenant.id, order_id, model, actor).await
    }

    async fn transition(
        &self,
        tenant_id: Uuid,
        order_id: Uuid,
        model: UpdateOrderStatusModel,
        actor: &Principal,
    ) -> UseCaseResult<OrderDto> {
        let order = self
            .ledger
            .update_status(tenant_id, order_id, model.status, actor)
            .await?;

        Ok(OrderDto::from(order))
    }

    pub async fn list_billing_transactions(
        &self,
        principal: Option<&Principal>,
        slug: &str,
        limit: Option<i64>,
    ) -> UseCaseResult<Vec<BillingTransactionEntity>> {
        let tenant = self
            .guard
            .resolve_and_authorize(principal, TenantContext::Slug(slug))
            .await?;

        let limit = limit
            .unwrap_or(DEFAULT_TRANSACTION_LIMIT)
            .clamp(1, MAX_TRANSACTION_LIMIT);

        let transactions = self
            .transaction_repo
            .list_for_tenant(tenant.id, limit)
            .await
            .map_err(|err| {
                error!(
                    tenant_id = %tenant.id,
                    db_error = ?err,
                    "tenant_admin: failed to list billing transactions"
                );
                UseCaseError::Persistence(err)
            })?;

        Ok(transactions)
    }
}
