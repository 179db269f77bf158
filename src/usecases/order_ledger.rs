use std::sync::Arc;

use anyhow::anyhow;
use chrono::Utc;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::{
    domain::{
        entities::{billing_transactions::InsertBillingTransactionEntity, orders::OrderEntity},
        repositories::{
            billing_transactions::BillingTransactionRepository,
            notification_outbox::NotificationOutboxRepository, orders::OrderRepository,
        },
        value_objects::{
            enums::{
                billing_transaction_types::BillingTransactionType, order_statuses::OrderStatus,
            },
            notifications::OrderNotification,
            orders::PaidOrderUpdate,
            principal::Principal,
        },
    },
    payments::ecpay::{PROVIDER_NAME, VerifiedCallback},
    usecases::errors::{UseCaseError, UseCaseResult},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackOutcome {
    /// This delivery moved the order to paid.
    Applied,
    /// The order was already paid; nothing changed.
    AlreadyApplied,
    /// The gateway reported a failed payment and it was recorded.
    PaymentFailed,
    /// A failure report arrived for an order that is no longer awaiting payment.
    Ignored,
}

pub struct OrderLedger<O, B, N>
where
    O: OrderRepository + Send + Sync + 'static,
    B: BillingTransactionRepository + Send + Sync + 'static,
    N: NotificationOutboxRepository + Send + Sync + 'static,
{
    order_repo: Arc<O>,
    transaction_repo: Arc<B>,
    outbox_repo: Arc<N>,
}

impl<O, B, N> OrderLedger<O, B, N>
where
    O: OrderRepository + Send + Sync + 'static,
    B: BillingTransactionRepository + Send + Sync + 'static,
    N: NotificationOutboxRepository + Send + Sync + 'static,
{
    pub fn new(order_repo: Arc<O>, transaction_repo: Arc<B>, outbox_repo: Arc<N>) -> Self {
        Self {
            order_repo,
            transaction_repo,
            outbox_repo,
        }
    }

    /// Applies an authenticated gateway callback. Safe to call any number of times
    /// with the same payload.
    pub async fn apply_callback(
        &self,
        tenant_id: Uuid,
        lookup_key: &str,
        callback: &VerifiedCallback,
    ) -> UseCaseResult<CallbackOutcome> {
        let order = self
            .find_order(tenant_id, lookup_key)
            .await?
            .ok_or(UseCaseError::NotFound("order"))?;

        if callback.is_success() {
            self.apply_payment(order, callback).await
        } else {
            self.apply_payment_failure(order, callback).await
        }
    }

    async fn find_order(
        &self,
        tenant_id: Uuid,
        lookup_key: &str,
    ) -> UseCaseResult<Option<OrderEntity>> {
        if let Some(order) = self
            .order_repo
            .find_by_order_number(tenant_id, lookup_key)
            .await?
        {
            return Ok(Some(order));
        }

        match Uuid::parse_str(lookup_key) {
            Ok(order_id) => Ok(self.order_repo.find_by_id(tenant_id, order_id).await?),
            Err(_) => Ok(None),
        }
    }

    async fn apply_payment(
        &self,
        order: OrderEntity,
        callback: &VerifiedCallback,
    ) -> UseCaseResult<CallbackOutcome> {
        let status = order.order_status();
        if status == OrderStatus::Cancelled {
            warn!(
                order_id = %order.id,
                tenant_id = %order.tenant_id,
                "order_ledger: paid callback for cancelled order"
            );
            return Err(UseCaseError::InvalidTransition {
                from: status,
                to: OrderStatus::Paid,
            });
        }

        let now = Utc::now();
        let applied = if status == OrderStatus::Pending && order.paid_at.is_none() {
            self.order_repo
                .mark_paid(
                    order.tenant_id,
                    order.id,
                    PaidOrderUpdate {
                        paid_at: now,
                        payment_info: callback.to_audit_json(),
                    },
                )
                .await
                .map_err(|err| {
                    error!(
                        order_id = %order.id,
                        db_error = ?err,
                        "order_ledger: failed to mark order paid"
                    );
                    UseCaseError::Persistence(err)
                })?
        } else {
            false
        };

        if applied {
            // Must precede the append: a retry after a failed append takes the replay path.
            self.enqueue_notification(&order, OrderStatus::Paid).await;
        } else {
            // Either a replay or a concurrent delivery won the race. Re-read to tell
            // which, and to catch a cancellation that slipped in between.
            let current = self
                .order_repo
                .find_by_id(order.tenant_id, order.id)
                .await?
                .ok_or(UseCaseError::NotFound("order"))?;
            let current_status = current.order_status();

            if current_status == OrderStatus::Cancelled {
                return Err(UseCaseError::InvalidTransition {
                    from: current_status,
                    to: OrderStatus::Paid,
                });
            }
            if !current_status.is_paid_or_later() {
                return Err(UseCaseError::Persistence(anyhow!(
                    "order {} is {} but could not be marked paid",
                    current.id,
                    current_status
                )));
            }
        }

        self.append_payment_transaction(&order, callback, now).await?;

        if applied {
            info!(
                order_id = %order.id,
                tenant_id = %order.tenant_id,
                order_number = %order.order_number,
                "order_ledger: order paid"
            );
            Ok(CallbackOutcome::Applied)
        } else {
            info!(
                order_id = %order.id,
                order_number = %order.order_number,
                "order_ledger: payment already applied; replay acknowledged"
            );
            Ok(CallbackOutcome::AlreadyApplied)
        }
    }

    async fn append_payment_transaction(
        &self,
        order: &OrderEntity,
        callback: &VerifiedCallback,
        occurred_at: chrono::DateTime<Utc>,
    ) -> UseCaseResult<()> {
        // Keyed on the gateway trade number so replays collapse onto one row.
        let provider_transaction_id = callback
            .trade_no()
            .map(str::to_string)
            .unwrap_or_else(|| format!("order:{}", order.id));

        let inserted = self
            .transaction_repo
            .append(InsertBillingTransactionEntity {
                tenant_id: order.tenant_id,
                transaction_type: BillingTransactionType::Payment.as_str().to_string(),
                amount: callback.trade_amount().unwrap_or(order.total_amount),
                fee: callback.charge_fee(),
                provider: PROVIDER_NAME.to_string(),
                provider_transaction_id: Some(provider_transaction_id),
                description: format!("Payment for order {}", order.order_number),
                occurred_at,
            })
            .await
            .map_err(|err| {
                error!(
                    order_id = %order.id,
                    db_error = ?err,
                    "order_ledger: failed to append payment transaction"
                );
                UseCaseError::Persistence(err)
            })?;

        if !inserted {
            info!(order_id = %order.id, "order_ledger: payment transaction already logged");
        }

        Ok(())
    }

    async fn apply_payment_failure(
        &self,
        order: OrderEntity,
        callback: &VerifiedCallback,
    ) -> UseCaseResult<CallbackOutcome> {
        if order.order_status() != OrderStatus::Pending || order.paid_at.is_some() {
            return Ok(CallbackOutcome::Ignored);
        }

        let recorded = self
            .order_repo
            .record_payment_failure(order.tenant_id, order.id, callback.to_audit_json())
            .await?;

        if recorded {
            warn!(
                order_id = %order.id,
                rtn_msg = callback.rtn_msg().unwrap_or_default(),
                "order_ledger: gateway reported payment failure"
            );
            Ok(CallbackOutcome::PaymentFailed)
        } else {
            Ok(CallbackOutcome::Ignored)
        }
    }

    /// Moves an order along the transition table on behalf of an operator.
    pub async fn update_status(
        &self,
        tenant_id: Uuid,
        order_id: Uuid,
        new_status: OrderStatus,
        actor: &Principal,
    ) -> UseCaseResult<OrderEntity> {
        let order = self
            .order_repo
            .find_by_id(tenant_id, order_id)
            .await?
            .ok_or(UseCaseError::NotFound("order"))?;

        let current = order.order_status();
        if !current.can_transition_to(new_status) {
            return Err(UseCaseError::InvalidTransition {
                from: current,
                to: new_status,
            });
        }

        let changed = self
            .order_repo
            .transition_status(tenant_id, order_id, current, new_status, Utc::now())
            .await
            .map_err(|err| {
                error!(
                    %order_id,
                    db_error = ?err,
                    "order_ledger: failed to update order status"
                );
                UseCaseError::Persistence(err)
            })?;

        let updated = self
            .order_repo
            .find_by_id(tenant_id, order_id)
            .await?
            .ok_or(UseCaseError::NotFound("order"))?;

        if !changed {
            // Someone else moved the order between our read and our write.
            return Err(UseCaseError::InvalidTransition {
                from: updated.order_status(),
                to: new_status,
            });
        }

        info!(
            %order_id,
            %tenant_id,
            actor = %actor.user_id,
            from = %current,
            to = %new_status,
            "order_ledger: status updated"
        );
        self.enqueue_notification(&updated, new_status).await;

        Ok(updated)
    }

    async fn enqueue_notification(&self, order: &OrderEntity, status: OrderStatus) {
        let Some(recipient) = order
            .customer_line_user_id
            .as_deref()
            .filter(|r| !r.is_empty())
        else {
            return;
        };

        let notification = OrderNotification {
            tenant_id: order.tenant_id,
            order_id: order.id,
            order_number: order.order_number.clone(),
            status,
            recipient: recipient.to_string(),
        };

        if let Err(err) = self.outbox_repo.enqueue(notification).await {
            warn!(
                order_id = %order.id,
                error = ?err,
                "order_ledger: failed to enqueue notification"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        domain::{
            repositories::{
                billing_transactions::MockBillingTransactionRepository,
                notification_outbox::MockNotificationOutboxRepository,
                orders::MockOrderRepository,
            },
            value_objects::enums::payment_statuses::PaymentStatus,
        },
        usecases::test_support::{InMemoryOrders, InMemoryOutbox, InMemoryTransactions, sample_order},
    };
    use std::collections::BTreeMap;

    fn success_callback(order_number: &str, trade_no: &str) -> VerifiedCallback {
        VerifiedCallback::for_tests(BTreeMap::from([
            ("MerchantTradeNo".to_string(), order_number.to_string()),
            ("RtnCode".to_string(), "1".to_string()),
            ("RtnMsg".to_string(), "Succeeded".to_string()),
            ("TradeNo".to_string(), trade_no.to_string()),
            ("TradeAmt".to_string(), "1280".to_string()),
            ("PaymentTypeChargeFee".to_string(), "25".to_string()),
        ]))
    }

    fn failure_callback(order_number: &str) -> VerifiedCallback {
        VerifiedCallback::for_tests(BTreeMap::from([
            ("MerchantTradeNo".to_string(), order_number.to_string()),
            ("RtnCode".to_string(), "10100058".to_string()),
            ("RtnMsg".to_string(), "Card declined".to_string()),
        ]))
    }

    type Ledger = OrderLedger<InMemoryOrders, InMemoryTransactions, InMemoryOutbox>;

    fn ledger_with(order: OrderEntity) -> (Ledger, Arc<InMemoryOrders>, Arc<InMemoryTransactions>, Arc<InMemoryOutbox>) {
        let orders = Arc::new(InMemoryOrders::with(vec![order]));
        let transactions = Arc::new(InMemoryTransactions::default());
        let outbox = Arc::new(InMemoryOutbox::default());
        let ledger = OrderLedger::new(
            Arc::clone(&orders),
            Arc::clone(&transactions),
            Arc::clone(&outbox),
        );
        (ledger, orders, transactions, outbox)
    }

    #[tokio::test]
    async fn duplicate_success_callback_pays_once_and_logs_once() {
        let tenant_id = Uuid::new_v4();
        let mut order = sample_order(tenant_id, "OMO20250101001");
        order.customer_line_user_id = Some("Ucustomer".to_string());
        let order_id = order.id;
        let (ledger, orders, transactions, outbox) = ledger_with(order);
        let callback = success_callback("OMO20250101001", "2501011230001");

        let first = ledger
            .apply_callback(tenant_id, "OMO20250101001", &callback)
            .await
            .unwrap();
        let paid_at = orders.get(order_id).unwrap().paid_at;

        let second = ledger
            .apply_callback(tenant_id, "OMO20250101001", &callback)
            .await
            .unwrap();

        assert_eq!(first, CallbackOutcome::Applied);
        assert_eq!(second, CallbackOutcome::AlreadyApplied);

        let stored = orders.get(order_id).unwrap();
        assert!(paid_at.is_some());
        assert_eq!(stored.paid_at, paid_at);
        assert_eq!(stored.status, "paid");
        assert_eq!(stored.payment_status, PaymentStatus::Paid.as_str());

        let rows = transactions.rows();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].provider_transaction_id.as_deref(), Some("2501011230001"));
        assert_eq!(rows[0].fee, 25);

        assert_eq!(outbox.enqueued().len(), 1);
    }

    #[tokio::test]
    async fn lookup_falls_back_to_order_id() {
        let tenant_id = Uuid::new_v4();
        let order = sample_order(tenant_id, "OMO20250101002");
        let order_id = order.id;
        let (ledger, orders, _, _) = ledger_with(order);

        let outcome = ledger
            .apply_callback(tenant_id, &order_id.to_string(), &success_callback("x", "T1"))
            .await
            .unwrap();

        assert_eq!(outcome, CallbackOutcome::Applied);
        assert!(orders.get(order_id).unwrap().paid_at.is_some());
    }

    #[tokio::test]
    async fn other_tenants_orders_are_invisible() {
        let order = sample_order(Uuid::new_v4(), "OMO20250101003");
        let (ledger, _, _, _) = ledger_with(order);

        let result = ledger
            .apply_callback(Uuid::new_v4(), "OMO20250101003", &success_callback("x", "T2"))
            .await;

        assert!(matches!(result, Err(UseCaseError::NotFound("order"))));
    }

    #[tokio::test]
    async fn paid_callback_for_cancelled_order_is_rejected_without_writes() {
        let tenant_id = Uuid::new_v4();
        let mut order = sample_order(tenant_id, "OMO20250101004");
        order.status = OrderStatus::Cancelled.as_str().to_string();
        let before = order.clone();
        let (ledger, orders, transactions, _) = ledger_with(order);

        let result = ledger
            .apply_callback(tenant_id, "OMO20250101004", &success_callback("x", "T3"))
            .await;

        assert!(matches!(
            result,
            Err(UseCaseError::InvalidTransition {
                from: OrderStatus::Cancelled,
                to: OrderStatus::Paid
            })
        ));
        assert_eq!(orders.get(before.id), Some(before));
        assert!(transactions.rows().is_empty());
    }

    #[tokio::test]
    async fn failed_payment_is_recorded_only_while_unpaid() {
        let tenant_id = Uuid::new_v4();
        let order = sample_order(tenant_id, "OMO20250101005");
        let order_id = order.id;
        let (ledger, orders, transactions, _) = ledger_with(order);

        let outcome = ledger
            .apply_callback(tenant_id, "OMO20250101005", &failure_callback("OMO20250101005"))
            .await
            .unwrap();
        assert_eq!(outcome, CallbackOutcome::PaymentFailed);
        let stored = orders.get(order_id).unwrap();
        assert_eq!(stored.payment_status, "failed");
        assert_eq!(stored.status, "pending");
        assert!(transactions.rows().is_empty());

        ledger
            .apply_callback(tenant_id, "OMO20250101005", &success_callback("x", "T4"))
            .await
            .unwrap();
        let late_failure = ledger
            .apply_callback(tenant_id, "OMO20250101005", &failure_callback("OMO20250101005"))
            .await
            .unwrap();

        assert_eq!(late_failure, CallbackOutcome::Ignored);
        assert_eq!(orders.get(order_id).unwrap().payment_status, "paid");
    }

    #[tokio::test]
    async fn completed_order_cannot_go_back_to_pending() {
        let tenant_id = Uuid::new_v4();
        let mut order = sample_order(tenant_id, "OMO20250101006");
        order.status = OrderStatus::Completed.as_str().to_string();
        order.completed_at = Some(Utc::now());
        let before = order.clone();

        let mut order_repo = MockOrderRepository::new();
        let found = before.clone();
        order_repo.expect_find_by_id().returning(move |_, _| {
            let order = found.clone();
            Box::pin(async move { Ok(Some(order)) })
        });
        order_repo.expect_transition_status().never();
        let mut outbox = MockNotificationOutboxRepository::new();
        outbox.expect_enqueue().never();

        let ledger = OrderLedger::new(
            Arc::new(order_repo),
            Arc::new(MockBillingTransactionRepository::new()),
            Arc::new(outbox),
        );

        let result = ledger
            .update_status(
                tenant_id,
                before.id,
                OrderStatus::Pending,
                &Principal::new(Uuid::new_v4()),
            )
            .await;

        assert!(matches!(
            result,
            Err(UseCaseError::InvalidTransition {
                from: OrderStatus::Completed,
                to: OrderStatus::Pending
            })
        ));
    }

    #[tokio::test]
    async fn shipping_stamps_shipped_at_once_and_notifies() {
        let tenant_id = Uuid::new_v4();
        let mut order = sample_order(tenant_id, "OMO20250101007");
        order.status = OrderStatus::Processing.as_str().to_string();
        order.customer_line_user_id = Some("Ucustomer".to_string());
        let order_id = order.id;
        let (ledger, orders, _, outbox) = ledger_with(order);
        let actor = Principal::new(Uuid::new_v4());

        let updated = ledger
            .update_status(tenant_id, order_id, OrderStatus::Shipped, &actor)
            .await
            .unwrap();
        assert_eq!(updated.status, "shipped");
        let shipped_at = updated.shipped_at;
        assert!(shipped_at.is_some());

        let again = ledger
            .update_status(tenant_id, order_id, OrderStatus::Shipped, &actor)
            .await;
        assert!(matches!(again, Err(UseCaseError::InvalidTransition { .. })));
        assert_eq!(orders.get(order_id).unwrap().shipped_at, shipped_at);

        let enqueued = outbox.enqueued();
        assert_eq!(enqueued.len(), 1);
        assert_eq!(enqueued[0].status, OrderStatus::Shipped);
        assert_eq!(enqueued[0].recipient, "Ucustomer");
    }

    #[tokio::test]
    async fn outbox_failure_does_not_fail_the_transition() {
        let tenant_id = Uuid::new_v4();
        let mut order = sample_order(tenant_id, "OMO20250101008");
        order.customer_line_user_id = Some("Ucustomer".to_string());
        let order_id = order.id;
        let orders = Arc::new(InMemoryOrders::with(vec![order]));
        let ledger = OrderLedger::new(
            Arc::clone(&orders),
            Arc::new(InMemoryTransactions::default()),
            Arc::new(InMemoryOutbox::failing()),
        );

        let updated = ledger
            .update_status(
                tenant_id,
                order_id,
                OrderStatus::Cancelled,
                &Principal::new(Uuid::new_v4()),
            )
            .await
            .unwrap();

        assert_eq!(updated.status, "cancelled");
        assert!(updated.cancelled_at.is_some());
    }

    #[tokio::test]
    async fn ledger_failure_after_payment_is_retryable_and_converges() {
        let tenant_id = Uuid::new_v4();
        let mut order = sample_order(tenant_id, "OMO20250101009");
        order.customer_line_user_id = Some("Ucustomer9".to_string());
        let order_id = order.id;
        let orders = Arc::new(InMemoryOrders::with(vec![order]));
        let outbox = Arc::new(InMemoryOutbox::default());
        let callback = success_callback("OMO20250101009", "T9");

        let broken = OrderLedger::new(
            Arc::clone(&orders),
            Arc::new(InMemoryTransactions::failing()),
            Arc::clone(&outbox),
        );
        let first = broken
            .apply_callback(tenant_id, "OMO20250101009", &callback)
            .await;
        assert!(matches!(first, Err(UseCaseError::Persistence(_))));

        let transactions = Arc::new(InMemoryTransactions::default());
        let healthy = OrderLedger::new(
            Arc::clone(&orders),
            Arc::clone(&transactions),
            Arc::clone(&outbox),
        );
        let retry = healthy
            .apply_callback(tenant_id, "OMO20250101009", &callback)
            .await
            .unwrap();

        assert_eq!(retry, CallbackOutcome::AlreadyApplied);
        assert!(orders.get(order_id).unwrap().paid_at.is_some());
        assert_eq!(transactions.rows().len(), 1);

        let paid: Vec<_> = outbox
            .enqueued()
            .into_iter()
            .filter(|n| n.status == OrderStatus::Paid)
            .collect();
        assert_eq!(paid.len(), 1);
        assert_eq!(paid[0].recipient, "Ucustomer9");
    }
}
