//! In-memory stores for scenarios where mocks would hide the compare-and-swap behaviour.

use std::{
    collections::{HashMap, HashSet},
    sync::Mutex,
};

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::{
    entities::{
        billing_transactions::{BillingTransactionEntity, InsertBillingTransactionEntity},
        notification_jobs::NotificationJobEntity,
        orders::OrderEntity,
        payment_credentials::PaymentCredentialEntity,
        tenants::TenantEntity,
    },
    repositories::{
        billing_transactions::BillingTransactionRepository,
        notification_outbox::NotificationOutboxRepository,
        orders::OrderRepository,
        trusted_operations::BillingReconciliationRepository,
    },
    value_objects::{
        enums::{
            order_statuses::{OrderStatus, OrderTimestamp},
            payment_statuses::PaymentStatus,
            subscription_statuses::SubscriptionStatus,
        },
        notifications::OrderNotification,
        orders::PaidOrderUpdate,
        plans::FREE_PLAN_ID,
    },
};

pub fn sample_tenant(slug: &str) -> TenantEntity {
    let now = Utc::now();
    TenantEntity {
        id: Uuid::new_v4(),
        slug: slug.to_string(),
        name: format!("{slug} shop"),
        plan_id: "pro".to_string(),
        subscription_status: SubscriptionStatus::Active.as_str().to_string(),
        next_billing_at: Some(now + chrono::Duration::days(30)),
        managed_by: None,
        is_hq: false,
        created_at: now,
        updated_at: now,
    }
}

pub fn sample_order(tenant_id: Uuid, order_number: &str) -> OrderEntity {
    let now = Utc::now();
    OrderEntity {
        id: Uuid::new_v4(),
        tenant_id,
        order_number: order_number.to_string(),
        status: OrderStatus::Pending.as_str().to_string(),
        payment_status: PaymentStatus::Unpaid.as_str().to_string(),
        total_amount: 1280,
        customer_line_user_id: None,
        payment_info: None,
        paid_at: None,
        shipped_at: None,
        completed_at: None,
        cancelled_at: None,
        created_at: now,
        updated_at: now,
    }
}

pub fn sample_credentials(tenant_id: Uuid) -> PaymentCredentialEntity {
    PaymentCredentialEntity {
        tenant_id,
        provider: "ecpay".to_string(),
        merchant_id: "TESTMERCHANT".to_string(),
        hash_key: "test-hash-key-000".to_string(),
        hash_iv: "test-hash-iv-0000".to_string(),
        updated_at: Utc::now(),
    }
}

#[derive(Default)]
pub struct InMemoryOrders {
    orders: Mutex<Vec<OrderEntity>>,
}

impl InMemoryOrders {
    pub fn with(orders: Vec<OrderEntity>) -> Self {
        Self {
            orders: Mutex::new(orders),
        }
    }

    pub fn get(&self, order_id: Uuid) -> Option<OrderEntity> {
        self.orders
            .lock()
            .unwrap()
            .iter()
            .find(|o| o.id == order_id)
            .cloned()
    }

    fn update<F>(&self, tenant_id: Uuid, order_id: Uuid, apply: F) -> bool
    where
        F: FnOnce(&mut OrderEntity) -> bool,
    {
        let mut orders = self.orders.lock().unwrap();
        match orders
            .iter_mut()
            .find(|o| o.id == order_id && o.tenant_id == tenant_id)
        {
            Some(order) => apply(order),
            None => false,
        }
    }
}

#[async_trait]
impl OrderRepository for InMemoryOrders {
    async fn find_by_order_number(
        &self,
        tenant_id: Uuid,
        order_number: &str,
    ) -> Result<Option<OrderEntity>> {
        Ok(self
            .orders
            .lock()
            .unwrap()
            .iter()
            .find(|o| o.tenant_id == tenant_id && o.order_number == order_number)
            .cloned())
    }

    async fn find_by_id(&self, tenant_id: Uuid, order_id: Uuid) -> Result<Option<OrderEntity>> {
        Ok(self
            .orders
            .lock()
            .unwrap()
            .iter()
            .find(|o| o.tenant_id == tenant_id && o.id == order_id)
            .cloned())
    }

    async fn mark_paid(
        &self,
        tenant_id: Uuid,
        order_id: Uuid,
        update: PaidOrderUpdate,
    ) -> Result<bool> {
        Ok(self.update(tenant_id, order_id, |order| {
            if order.status != OrderStatus::Pending.as_str() || order.paid_at.is_some() {
                return false;
            }
            order.status = OrderStatus::Paid.as_str().to_string();
            order.payment_status = PaymentStatus::Paid.as_str().to_string();
            order.paid_at = Some(update.paid_at);
            order.payment_info = Some(update.payment_info);
            order.updated_at = update.paid_at;
            true
        }))
    }

    async fn record_payment_failure(
        &self,
        tenant_id: Uuid,
        order_id: Uuid,
        payment_info: serde_json::Value,
    ) -> Result<bool> {
        Ok(self.update(tenant_id, order_id, |order| {
            if order.status != OrderStatus::Pending.as_str() || order.paid_at.is_some() {
                return false;
            }
            order.payment_status = PaymentStatus::Failed.as_str().to_string();
            order.payment_info = Some(payment_info);
            true
        }))
    }

    async fn transition_status(
        &self,
        tenant_id: Uuid,
        order_id: Uuid,
        from: OrderStatus,
        to: OrderStatus,
        at: DateTime<Utc>,
    ) -> Result<bool> {
        Ok(self.update(tenant_id, order_id, |order| {
            if order.status != from.as_str() {
                return false;
            }
            let slot = match to.stamped_timestamp() {
                Some(OrderTimestamp::PaidAt) => Some(&mut order.paid_at),
                Some(OrderTimestamp::ShippedAt) => Some(&mut order.shipped_at),
                Some(OrderTimestamp::CompletedAt) => Some(&mut order.completed_at),
                Some(OrderTimestamp::CancelledAt) => Some(&mut order.cancelled_at),
                None => None,
            };
            if let Some(slot) = slot {
                if slot.is_some() {
                    return false;
                }
                *slot = Some(at);
            }
            if to == OrderStatus::Paid {
                order.payment_status = PaymentStatus::Paid.as_str().to_string();
            }
            order.status = to.as_str().to_string();
            order.updated_at = at;
            true
        }))
    }
}

/// Mirrors the unique (provider, provider_transaction_id) index.
#[derive(Default)]
pub struct InMemoryTransactions {
    rows: Mutex<Vec<BillingTransactionEntity>>,
    fail_appends: bool,
}

impl InMemoryTransactions {
    pub fn failing() -> Self {
        Self {
            rows: Mutex::new(Vec::new()),
            fail_appends: true,
        }
    }

    pub fn rows(&self) -> Vec<BillingTransactionEntity> {
        self.rows.lock().unwrap().clone()
    }
}

#[async_trait]
impl BillingTransactionRepository for InMemoryTransactions {
    async fn append(&self, transaction: InsertBillingTransactionEntity) -> Result<bool> {
        if self.fail_appends {
            return Err(anyhow!("billing_transactions unavailable"));
        }

        let mut rows = self.rows.lock().unwrap();
        let duplicate = transaction.provider_transaction_id.is_some()
            && rows.iter().any(|row| {
                row.provider == transaction.provider
                    && row.provider_transaction_id == transaction.provider_transaction_id
            });
        if duplicate {
            return Ok(false);
        }

        rows.push(BillingTransactionEntity {
            id: Uuid::new_v4(),
            tenant_id: transaction.tenant_id,
            transaction_type: transaction.transaction_type,
            amount: transaction.amount,
            fee: transaction.fee,
            provider: transaction.provider,
            provider_transaction_id: transaction.provider_transaction_id,
            description: transaction.description,
            occurred_at: transaction.occurred_at,
        });
        Ok(true)
    }

    async fn list_for_tenant(
        &self,
        tenant_id: Uuid,
        limit: i64,
    ) -> Result<Vec<BillingTransactionEntity>> {
        let mut rows: Vec<_> = self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|row| row.tenant_id == tenant_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.occurred_at.cmp(&a.occurred_at));
        rows.truncate(usize::try_from(limit).unwrap_or(0));
        Ok(rows)
    }
}

#[derive(Default)]
pub struct InMemoryOutbox {
    enqueued: Mutex<Vec<OrderNotification>>,
    fail_enqueue: bool,
}

impl InMemoryOutbox {
    pub fn failing() -> Self {
        Self {
            enqueued: Mutex::new(Vec::new()),
            fail_enqueue: true,
        }
    }

    pub fn enqueued(&self) -> Vec<OrderNotification> {
        self.enqueued.lock().unwrap().clone()
    }
}

#[async_trait]
impl NotificationOutboxRepository for InMemoryOutbox {
    async fn enqueue(&self, notification: OrderNotification) -> Result<Uuid> {
        if self.fail_enqueue {
            return Err(anyhow!("notification_jobs unavailable"));
        }
        self.enqueued.lock().unwrap().push(notification);
        Ok(Uuid::new_v4())
    }

    async fn lock_next_due(&self) -> Result<Option<NotificationJobEntity>> {
        Ok(None)
    }

    async fn mark_delivered(&self, _job_id: Uuid) -> Result<()> {
        Ok(())
    }

    async fn mark_failed(
        &self,
        _job_id: Uuid,
        _error: &str,
        _retry_at: Option<DateTime<Utc>>,
    ) -> Result<()> {
        Ok(())
    }
}

/// Tenant table for reconciliation runs. Tenants listed in `failing` error on downgrade.
#[derive(Default)]
pub struct InMemorySubscriptions {
    tenants: Mutex<HashMap<Uuid, TenantEntity>>,
    failing: HashSet<Uuid>,
}

impl InMemorySubscriptions {
    pub fn with(tenants: Vec<TenantEntity>, failing: HashSet<Uuid>) -> Self {
        Self {
            tenants: Mutex::new(tenants.into_iter().map(|t| (t.id, t)).collect()),
            failing,
        }
    }

    pub fn get(&self, tenant_id: Uuid) -> Option<TenantEntity> {
        self.tenants.lock().unwrap().get(&tenant_id).cloned()
    }
}

#[async_trait]
impl BillingReconciliationRepository for InMemorySubscriptions {
    async fn list_expired_subscriptions(&self, now: DateTime<Utc>) -> Result<Vec<TenantEntity>> {
        let mut expired: Vec<_> = self
            .tenants
            .lock()
            .unwrap()
            .values()
            .filter(|t| {
                t.plan_id != FREE_PLAN_ID
                    && t.subscription_status == SubscriptionStatus::Active.as_str()
                    && t.next_billing_at.is_some_and(|at| at < now)
            })
            .cloned()
            .collect();
        expired.sort_by_key(|t| t.next_billing_at);
        Ok(expired)
    }

    async fn downgrade_to_free(
        &self,
        tenant_id: Uuid,
        expected_next_billing_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<bool> {
        if self.failing.contains(&tenant_id) {
            return Err(anyhow!("statement timeout"));
        }

        let mut tenants = self.tenants.lock().unwrap();
        let Some(tenant) = tenants.get_mut(&tenant_id) else {
            return Ok(false);
        };
        if tenant.plan_id == FREE_PLAN_ID
            || tenant.next_billing_at != Some(expected_next_billing_at)
        {
            return Ok(false);
        }

        tenant.plan_id = FREE_PLAN_ID.to_string();
        tenant.next_billing_at = None;
        tenant.subscription_status = SubscriptionStatus::Active.as_str().to_string();
        tenant.updated_at = now;
        Ok(true)
    }
}
