use std::{collections::BTreeMap, sync::Arc};

use tracing::{error, info, warn};

use crate::{
    domain::repositories::{
        billing_transactions::BillingTransactionRepository,
        notification_outbox::NotificationOutboxRepository, orders::OrderRepository,
        payment_credentials::PaymentCredentialRepository,
        trusted_operations::CallbackTenantLookup,
    },
    payments::ecpay,
    usecases::{
        errors::{UseCaseError, UseCaseResult},
        order_ledger::{CallbackOutcome, OrderLedger},
    },
};

/// Entry point for asynchronous gateway callbacks. Authenticates the payload
/// against the owning tenant's keys before anything touches the ledger.
pub struct PaymentCallbackUseCase<L, C, O, B, N>
where
    L: CallbackTenantLookup + Send + Sync + 'static,
    C: PaymentCredentialRepository + Send + Sync + 'static,
    O: OrderRepository + Send + Sync + 'static,
    B: BillingTransactionRepository + Send + Sync + 'static,
    N: NotificationOutboxRepository + Send + Sync + 'static,
{
    callback_lookup: Arc<L>,
    credential_repo: Arc<C>,
    ledger: Arc<OrderLedger<O, B, N>>,
}

impl<L, C, O, B, N> PaymentCallbackUseCase<L, C, O, B, N>
where
    L: CallbackTenantLookup + Send + Sync + 'static,
    C: PaymentCredentialRepository + Send + Sync + 'static,
    O: OrderRepository + Send + Sync + 'static,
    B: BillingTransactionRepository + Send + Sync + 'static,
    N: NotificationOutboxRepository + Send + Sync + 'static,
{
    pub fn new(
        callback_lookup: Arc<L>,
        credential_repo: Arc<C>,
        ledger: Arc<OrderLedger<O, B, N>>,
    ) -> Self {
        Self {
            callback_lookup,
            credential_repo,
            ledger,
        }
    }

    pub async fn handle_ecpay_callback(
        &self,
        fields: BTreeMap<String, String>,
    ) -> UseCaseResult<CallbackOutcome> {
        let merchant_id = required_field(&fields, "MerchantID")?;
        let merchant_trade_no = required_field(&fields, "MerchantTradeNo")?;

        let tenant_id = self
            .callback_lookup
            .find_tenant_by_merchant(&merchant_id)
            .await
            .map_err(|err| {
                error!(db_error = ?err, "payment_callback: merchant lookup failed");
                UseCaseError::Persistence(err)
            })?
            .ok_or_else(|| {
                warn!(%merchant_id, "payment_callback: unknown merchant");
                UseCaseError::NotFound("payment credentials")
            })?;

        let credentials = self
            .credential_repo
            .find_for_tenant(tenant_id)
            .await?
            .filter(|c| c.merchant_id == merchant_id)
            .ok_or(UseCaseError::NotFound("payment credentials"))?;

        // Nothing about the order is looked up until the payload is authentic.
        let Some(verified) = ecpay::verify_and_wrap(fields, &credentials) else {
            warn!(
                %tenant_id,
                %merchant_trade_no,
                "payment_callback: CheckMacValue mismatch"
            );
            return Err(UseCaseError::Signature);
        };

        let outcome = self
            .ledger
            .apply_callback(tenant_id, &merchant_trade_no, &verified)
            .await?;

        info!(
            %tenant_id,
            %merchant_trade_no,
            ?outcome,
            "payment_callback: processed"
        );

        Ok(outcome)
    }
}

fn required_field(fields: &BTreeMap<String, String>, name: &'static str) -> UseCaseResult<String> {
    fields
        .get(name)
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .ok_or_else(|| UseCaseError::Validation(format!("{name} is required")))
}
