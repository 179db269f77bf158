use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mockall::automock;
use uuid::Uuid;

use crate::domain::{
    entities::orders::OrderEntity,
    value_objects::{enums::order_statuses::OrderStatus, orders::PaidOrderUpdate},
};

/// Tenant-scoped order access. Every query and write filters on `tenant_id`.
#[async_trait]
#[automock]
pub trait OrderRepository {
    async fn find_by_order_number(
        &self,
        tenant_id: Uuid,
        order_number: &str,
    ) -> Result<Option<OrderEntity>>;

    async fn find_by_id(&self, tenant_id: Uuid, order_id: Uuid) -> Result<Option<OrderEntity>>;

    /// Conditional on the order still being pending with no `paid_at`.
    /// Returns false when nothing was written.
    async fn mark_paid(
        &self,
        tenant_id: Uuid,
        order_id: Uuid,
        update: PaidOrderUpdate,
    ) -> Result<bool>;

    /// Stores a failed-payment payload while the order is still unpaid.
    async fn record_payment_failure(
        &self,
        tenant_id: Uuid,
        order_id: Uuid,
        payment_info: serde_json::Value,
    ) -> Result<bool>;

    /// Compare-and-swap on the current status; stamps the target's timestamp if still unset.
    async fn transition_status(
        &self,
        tenant_id: Uuid,
        order_id: Uuid,
        from: OrderStatus,
        to: OrderStatus,
        at: DateTime<Utc>,
    ) -> Result<bool>;
}
