//! Scheduled downgrade of lapsed subscriptions.
//!
//! Each tenant is handled on its own: a failure is recorded in the summary and
//! the run moves on. Downgrades are compare-and-swap on `next_billing_at`, and
//! the ledger key is derived from that value, so overlapping or repeated runs
//! converge on one plan change and one `plan_downgrade` row per lapse.

use std::sync::Arc;

use anyhow::Result as AnyResult;
use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tracing::{error, info, warn};

use crate::domain::{
    entities::{billing_transactions::InsertBillingTransactionEntity, tenants::TenantEntity},
    repositories::{
        billing_transactions::BillingTransactionRepository,
        trusted_operations::BillingReconciliationRepository,
    },
    value_objects::{
        enums::billing_transaction_types::BillingTransactionType,
        reconciliation::ReconciliationSummary,
    },
};

const SYSTEM_PROVIDER: &str = "system";

enum TenantOutcome {
    Downgraded,
    LostRace,
}

pub struct BillingReconciler<R, B>
where
    R: BillingReconciliationRepository + Send + Sync + 'static,
    B: BillingTransactionRepository + Send + Sync + 'static,
{
    reconciliation_repo: Arc<R>,
    transaction_repo: Arc<B>,
}

impl<R, B> BillingReconciler<R, B>
where
    R: BillingReconciliationRepository + Send + Sync + 'static,
    B: BillingTransactionRepository + Send + Sync + 'static,
{
    pub fn new(reconciliation_repo: Arc<R>, transaction_repo: Arc<B>) -> Self {
        Self {
            reconciliation_repo,
            transaction_repo,
        }
    }

    pub async fn run(&self, shutdown: &watch::Receiver<bool>) -> ReconciliationSummary {
        self.run_at(Utc::now(), shutdown).await
    }

    pub async fn run_at(
        &self,
        now: DateTime<Utc>,
        shutdown: &watch::Receiver<bool>,
    ) -> ReconciliationSummary {
        let mut summary = ReconciliationSummary::default();

        let expired = match self.reconciliation_repo.list_expired_subscriptions(now).await {
            Ok(expired) => expired,
            Err(err) => {
                error!(db_error = ?err, "billing_reconciler: failed to list expired subscriptions");
                summary.scan_failed = true;
                summary
                    .errors
                    .push("failed to list expired subscriptions".to_string());
                return summary;
            }
        };

        info!(candidates = expired.len(), "billing_reconciler: run started");

        for tenant in expired {
            if *shutdown.borrow() {
                warn!(
                    scanned = summary.scanned,
                    "billing_reconciler: shutdown requested; stopping early"
                );
                summary.interrupted = true;
                break;
            }

            summary.scanned += 1;
            match self.reconcile_tenant(&tenant, now).await {
                Ok(TenantOutcome::Downgraded) => summary.downgraded += 1,
                Ok(TenantOutcome::LostRace) => summary.skipped += 1,
                Err(err) => {
                    error!(
                        tenant_id = %tenant.id,
                        slug = %tenant.slug,
                        error = ?err,
                        "billing_reconciler: tenant failed"
                    );
                    summary
                        .errors
                        .push(format!("tenant {} ({}): {}", tenant.slug, tenant.id, err));
                }
            }
        }

        info!(
            scanned = summary.scanned,
            downgraded = summary.downgraded,
            skipped = summary.skipped,
            failed = summary.errors.len(),
            interrupted = summary.interrupted,
            "billing_reconciler: run finished"
        );

        summary
    }

    async fn reconcile_tenant(
        &self,
        tenant: &TenantEntity,
        now: DateTime<Utc>,
    ) -> AnyResult<TenantOutcome> {
        let Some(expected_next_billing_at) = tenant.next_billing_at else {
            return Ok(TenantOutcome::LostRace);
        };

        let downgraded = self
            .reconciliation_repo
            .downgrade_to_free(tenant.id, expected_next_billing_at, now)
            .await?;
        if !downgraded {
            info!(tenant_id = %tenant.id, "billing_reconciler: already handled elsewhere");
            return Ok(TenantOutcome::LostRace);
        }

        self.transaction_repo
            .append(InsertBillingTransactionEntity {
                tenant_id: tenant.id,
                transaction_type: BillingTransactionType::PlanDowngrade.as_str().to_string(),
                amount: 0,
                fee: 0,
                provider: SYSTEM_PROVIDER.to_string(),
                provider_transaction_id: Some(downgrade_key(tenant, expected_next_billing_at)),
                description: format!(
                    "Plan {} lapsed at {}; moved to free",
                    tenant.plan_id,
                    expected_next_billing_at.to_rfc3339()
                ),
                occurred_at: now,
            })
            .await?;

        info!(
            tenant_id = %tenant.id,
            slug = %tenant.slug,
            previous_plan = %tenant.plan_id,
            "billing_reconciler: downgraded to free"
        );

        Ok(TenantOutcome::Downgraded)
    }
}

pub(crate) fn downgrade_key(tenant: &TenantEntity, next_billing_at: DateTime<Utc>) -> String {
    format!(
        "{}:{}:{}",
        BillingTransactionType::PlanDowngrade.as_str(),
        tenant.id,
        next_billing_at.timestamp()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        domain::{
            repositories::{
                billing_transactions::MockBillingTransactionRepository,
                trusted_operations::MockBillingReconciliationRepository,
            },
            value_objects::plans::FREE_PLAN_ID,
        },
        usecases::test_support::{InMemorySubscriptions, InMemoryTransactions, sample_tenant},
    };
    use anyhow::anyhow;
    use chrono::Duration;
    use std::collections::HashSet;

    fn expired_tenant(slug: &str, days_ago: i64) -> TenantEntity {
        let mut tenant = sample_tenant(slug);
        tenant.next_billing_at = Some(Utc::now() - Duration::days(days_ago));
        tenant
    }

    fn idle_shutdown() -> watch::Receiver<bool> {
        // The last value stays readable after the sender is dropped.
        let (_tx, rx) = watch::channel(false);
        rx
    }

    #[tokio::test]
    async fn back_to_back_runs_downgrade_once() {
        let tenant = expired_tenant("lapsed", 2);
        let tenant_id = tenant.id;
        let store = Arc::new(InMemorySubscriptions::with(vec![tenant], HashSet::new()));
        let ledger = Arc::new(InMemoryTransactions::default());
        let reconciler = BillingReconciler::new(Arc::clone(&store), Arc::clone(&ledger));
        let shutdown = idle_shutdown();

        let first = reconciler.run(&shutdown).await;
        let second = reconciler.run(&shutdown).await;

        assert_eq!(first.downgraded, 1);
        assert_eq!(second.scanned, 0);
        assert_eq!(second.downgraded, 0);

        let stored = store.get(tenant_id).unwrap();
        assert_eq!(stored.plan_id, FREE_PLAN_ID);
        assert!(stored.next_billing_at.is_none());

        let rows = ledger.rows();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].transaction_type, "plan_downgrade");
        assert_eq!(rows[0].amount, 0);
        assert_eq!(rows[0].provider, "system");
    }

    #[tokio::test]
    async fn one_failing_tenant_does_not_stop_the_others() {
        let first = expired_tenant("first", 3);
        let second = expired_tenant("second", 2);
        let third = expired_tenant("third", 1);
        let (first_id, second_id, third_id) = (first.id, second.id, third.id);
        let store = Arc::new(InMemorySubscriptions::with(
            vec![first, second, third],
            HashSet::from([second_id]),
        ));
        let ledger = Arc::new(InMemoryTransactions::default());
        let reconciler = BillingReconciler::new(Arc::clone(&store), Arc::clone(&ledger));

        let summary = reconciler.run(&idle_shutdown()).await;

        assert_eq!(summary.scanned, 3);
        assert_eq!(summary.downgraded, 2);
        assert_eq!(summary.errors.len(), 1);
        assert!(summary.errors[0].contains("second"));
        assert!(summary.errors[0].contains(&second_id.to_string()));
        assert!(summary.is_success());

        assert_eq!(store.get(first_id).unwrap().plan_id, FREE_PLAN_ID);
        assert_eq!(store.get(second_id).unwrap().plan_id, "pro");
        assert_eq!(store.get(third_id).unwrap().plan_id, FREE_PLAN_ID);
        assert_eq!(ledger.rows().len(), 2);
    }

    #[tokio::test]
    async fn lost_compare_and_swap_is_skipped_without_ledger_write() {
        let tenant = expired_tenant("raced", 1);
        let listed = tenant.clone();

        let mut repo = MockBillingReconciliationRepository::new();
        repo.expect_list_expired_subscriptions().returning(move |_| {
            let tenants = vec![listed.clone()];
            Box::pin(async move { Ok(tenants) })
        });
        repo.expect_downgrade_to_free()
            .returning(|_, _, _| Box::pin(async { Ok(false) }));
        let mut ledger = MockBillingTransactionRepository::new();
        ledger.expect_append().never();

        let reconciler = BillingReconciler::new(Arc::new(repo), Arc::new(ledger));
        let summary = reconciler.run(&idle_shutdown()).await;

        assert_eq!(summary.scanned, 1);
        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.downgraded, 0);
        assert!(summary.errors.is_empty());
    }

    #[tokio::test]
    async fn listing_failure_is_reported_not_raised() {
        let mut repo = MockBillingReconciliationRepository::new();
        repo.expect_list_expired_subscriptions()
            .returning(|_| Box::pin(async { Err(anyhow!("connection refused")) }));

        let reconciler =
            BillingReconciler::new(Arc::new(repo), Arc::new(MockBillingTransactionRepository::new()));
        let summary = reconciler.run(&idle_shutdown()).await;

        assert!(!summary.is_success());
        assert_eq!(summary.scanned, 0);
        assert_eq!(summary.errors, vec!["failed to list expired subscriptions".to_string()]);
    }

    #[tokio::test]
    async fn shutdown_stops_before_the_next_tenant() {
        let store = Arc::new(InMemorySubscriptions::with(
            vec![expired_tenant("a", 2), expired_tenant("b", 1)],
            HashSet::new(),
        ));
        let reconciler =
            BillingReconciler::new(Arc::clone(&store), Arc::new(InMemoryTransactions::default()));
        let (tx, rx) = watch::channel(false);
        tx.send(true).unwrap();

        let summary = reconciler.run(&rx).await;

        assert!(summary.interrupted);
        assert!(!summary.is_success());
        assert_eq!(summary.scanned, 0);
    }

    #[test]
    fn downgrade_key_is_stable_for_the_same_lapse() {
        let tenant = expired_tenant("stable", 1);
        let at = tenant.next_billing_at.unwrap();

        assert_eq!(downgrade_key(&tenant, at), downgrade_key(&tenant, at));
        assert_eq!(
            downgrade_key(&tenant, at),
            format!("plan_downgrade:{}:{}", tenant.id, at.timestamp())
        );
    }
}
