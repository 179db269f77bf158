use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Query, State},
    http::{HeaderMap, StatusCode, header::AUTHORIZATION},
    response::{IntoResponse, Response},
    routing::get,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use subtle::ConstantTimeEq;
use tokio::sync::watch;
use tracing::{info, warn};

use crate::{
    domain::{
        repositories::{
            billing_transactions::BillingTransactionRepository,
            trusted_operations::BillingReconciliationRepository,
        },
        value_objects::reconciliation::ReconciliationSummary,
    },
    infra::db::{
        postgres::postgres_connection::PgPoolSquad,
        repositories::billing_transactions::BillingTransactionPostgres,
        trusted_operations::TrustedOperationsPostgres,
    },
    usecases::billing_reconciler::BillingReconciler,
};

pub struct CronState<R, B>
where
    R: BillingReconciliationRepository + Send + Sync + 'static,
    B: BillingTransactionRepository + Send + Sync + 'static,
{
    pub reconciler: BillingReconciler<R, B>,
    pub cron_secret: Option<String>,
    pub shutdown: watch::Receiver<bool>,
}

#[derive(Debug, Deserialize)]
pub struct CronQuery {
    pub secret: Option<String>,
}

#[derive(Debug, Serialize)]
struct ReconciliationResponse {
    success: bool,
    #[serde(flatten)]
    summary: ReconciliationSummary,
}

pub fn routes(
    db_pool: Arc<PgPoolSquad>,
    cron_secret: Option<String>,
    shutdown: watch::Receiver<bool>,
) -> Router {
    let reconciler = BillingReconciler::new(
        Arc::new(TrustedOperationsPostgres::new(Arc::clone(&db_pool))),
        Arc::new(BillingTransactionPostgres::new(Arc::clone(&db_pool))),
    );

    router(Arc::new(CronState {
        reconciler,
        cron_secret,
        shutdown,
    }))
}

pub fn router<R, B>(state: Arc<CronState<R, B>>) -> Router
where
    R: BillingReconciliationRepository + Send + Sync + 'static,
    B: BillingTransactionRepository + Send + Sync + 'static,
{
    Router::new()
        .route("/billing-reconciliation", get(run_billing_reconciliation))
        .with_state(state)
}

pub async fn run_billing_reconciliation<R, B>(
    State(state): State<Arc<CronState<R, B>>>,
    headers: HeaderMap,
    Query(query): Query<CronQuery>,
) -> Response
where
    R: BillingReconciliationRepository + Send + Sync + 'static,
    B: BillingTransactionRepository + Send + Sync + 'static,
{
    let Some(expected) = state.cron_secret.as_deref() else {
        warn!("billing_reconciliation: CRON_SECRET not configured; refusing to run");
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "success": false, "error": "reconciliation is not configured" })),
        )
            .into_response();
    };

    let supplied = bearer_secret(&headers).or(query.secret.as_deref());
    if !supplied.is_some_and(|s| secrets_match(s, expected)) {
        warn!("billing_reconciliation: rejected request with missing or wrong secret");
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "success": false, "error": "unauthorized" })),
        )
            .into_response();
    }

    info!("billing_reconciliation: triggered");
    let summary = state.reconciler.run(&state.shutdown).await;
    let success = summary.is_success();
    let status = if success {
        StatusCode::OK
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    };

    (status, Json(ReconciliationResponse { success, summary })).into_response()
}

fn bearer_secret(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
}

fn secrets_match(supplied: &str, expected: &str) -> bool {
    supplied.as_bytes().ct_eq(expected.as_bytes()).into()
}
