//! Gateway callback endpoint. ECPay reads the plain-text body: `1|OK` stops
//! redelivery, anything else is retried on its schedule.

use std::{collections::BTreeMap, sync::Arc};

use axum::{
    Router,
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
};
use tracing::{error, warn};
use url::form_urlencoded;

use crate::{
    domain::repositories::{
        billing_transactions::BillingTransactionRepository,
        notification_outbox::NotificationOutboxRepository, orders::OrderRepository,
        payment_credentials::PaymentCredentialRepository,
        trusted_operations::CallbackTenantLookup,
    },
    infra::db::{
        postgres::postgres_connection::PgPoolSquad,
        repositories::{
            billing_transactions::BillingTransactionPostgres,
            notification_outbox::NotificationOutboxPostgres, orders::OrderPostgres,
            payment_credentials::PaymentCredentialPostgres,
        },
        trusted_operations::TrustedOperationsPostgres,
    },
    usecases::{
        errors::UseCaseError, order_ledger::OrderLedger, payment_callback::PaymentCallbackUseCase,
    },
};

pub fn routes(db_pool: Arc<PgPoolSquad>) -> Router {
    let ledger = OrderLedger::new(
        Arc::new(OrderPostgres::new(Arc::clone(&db_pool))),
        Arc::new(BillingTransactionPostgres::new(Arc::clone(&db_pool))),
        Arc::new(NotificationOutboxPostgres::new(Arc::clone(&db_pool))),
    );
    let usecase = PaymentCallbackUseCase::new(
        Arc::new(TrustedOperationsPostgres::new(Arc::clone(&db_pool))),
        Arc::new(PaymentCredentialPostgres::new(Arc::clone(&db_pool))),
        Arc::new(ledger),
    );

    router(Arc::new(usecase))
}

pub fn router<L, C, O, B, N>(usecase: Arc<PaymentCallbackUseCase<L, C, O, B, N>>) -> Router
where
    L: CallbackTenantLookup + Send + Sync + 'static,
    C: PaymentCredentialRepository + Send + Sync + 'static,
    O: OrderRepository + Send + Sync + 'static,
    B: BillingTransactionRepository + Send + Sync + 'static,
    N: NotificationOutboxRepository + Send + Sync + 'static,
{
    Router::new()
        .route("/ecpay/callback", post(ecpay_callback))
        .with_state(usecase)
}

pub async fn ecpay_callback<L, C, O, B, N>(
    State(usecase): State<Arc<PaymentCallbackUseCase<L, C, O, B, N>>>,
    body: Bytes,
) -> Response
where
    L: CallbackTenantLookup + Send + Sync + 'static,
    C: PaymentCredentialRepository + Send + Sync + 'static,
    O: OrderRepository + Send + Sync + 'static,
    B: BillingTransactionRepository + Send + Sync + 'static,
    N: NotificationOutboxRepository + Send + Sync + 'static,
{
    let fields: BTreeMap<String, String> = form_urlencoded::parse(&body).into_owned().collect();

    match usecase.handle_ecpay_callback(fields).await {
        Ok(_) => (StatusCode::OK, "1|OK").into_response(),
        Err(err) => gateway_failure(err).into_response(),
    }
}

fn gateway_failure(err: UseCaseError) -> (StatusCode, &'static str) {
    match err {
        UseCaseError::Signature => (StatusCode::BAD_REQUEST, "0|CheckMacValue Error"),
        UseCaseError::Validation(_) => (StatusCode::BAD_REQUEST, "0|Invalid Payload"),
        UseCaseError::NotFound(_) => (StatusCode::BAD_REQUEST, "0|Order Not Found"),
        UseCaseError::Authentication | UseCaseError::Authorization => {
            (StatusCode::BAD_REQUEST, "0|Unauthorized")
        }
        // Acknowledged so the gateway stops redelivering.
        UseCaseError::InvalidTransition { from, to } => {
            warn!(%from, %to, "payment_callback: rejected state change");
            (StatusCode::OK, "0|Invalid Order Status")
        }
        UseCaseError::Persistence(err) => {
            error!(error = ?err, "payment_callback: internal failure; gateway will retry");
            (StatusCode::INTERNAL_SERVER_ERROR, "0|Internal Error")
        }
    }
}
