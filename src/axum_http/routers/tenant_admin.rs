use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, patch},
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    auth::AuthUser,
    domain::{
        repositories::{
            billing_transactions::BillingTransactionRepository,
            notification_outbox::NotificationOutboxRepository, orders::OrderRepository,
            tenants::TenantRepository,
        },
        value_objects::orders::UpdateOrderStatusModel,
    },
    infra::db::{
        postgres::postgres_connection::PgPoolSquad,
        repositories::{
            billing_transactions::BillingTransactionPostgres,
            notification_outbox::NotificationOutboxPostgres, orders::OrderPostgres,
            tenants::TenantPostgres,
        },
    },
    usecases::{
        order_ledger::OrderLedger, tenant_access::TenantAccessGuard,
        tenant_admin::TenantAdminUseCase,
    },
};

#[derive(Debug, Deserialize)]
pub struct TransactionListQuery {
    pub limit: Option<i64>,
}

type PostgresTenantAdmin = TenantAdminUseCase<
    TenantPostgres,
    OrderPostgres,
    BillingTransactionPostgres,
    NotificationOutboxPostgres,
>;

pub fn routes(db_pool: Arc<PgPoolSquad>) -> Router {
    router(postgres_usecase(db_pool))
}

/// Order-scoped admin calls, mounted outside the tenant slug namespace.
pub fn order_routes(db_pool: Arc<PgPoolSquad>) -> Router {
    order_router(postgres_usecase(db_pool))
}

fn postgres_usecase(db_pool: Arc<PgPoolSquad>) -> Arc<PostgresTenantAdmin> {
    let transaction_repo = Arc::new(BillingTransactionPostgres::new(Arc::clone(&db_pool)));
    let guard = TenantAccessGuard::new(Arc::new(TenantPostgres::new(Arc::clone(&db_pool))));
    let ledger = OrderLedger::new(
        Arc::new(OrderPostgres::new(Arc::clone(&db_pool))),
        Arc::clone(&transaction_repo),
        Arc::new(NotificationOutboxPostgres::new(Arc::clone(&db_pool))),
    );
    Arc::new(TenantAdminUseCase::new(
        Arc::new(guard),
        Arc::new(ledger),
        transaction_repo,
    ))
}

pub fn router<T, O, B, N>(usecase: Arc<TenantAdminUseCase<T, O, B, N>>) -> Router
where
    T: TenantRepository + Send + Sync + 'static,
    O: OrderRepository + Send + Sync + 'static,
    B: BillingTransactionRepository + Send + Sync + 'static,
    N: NotificationOutboxRepository + Send + Sync + 'static,
{
    Router::new()
        .route("/me", get(current_tenant))
        .route("/:slug/orders/:order_id/status", patch(update_order_status))
        .route("/:slug/billing-transactions", get(list_billing_transactions))
        .with_state(usecase)
}

pub fn order_router<T, O, B, N>(usecase: Arc<TenantAdminUseCase<T, O, B, N>>) -> Router
where
    T: TenantRepository + Send + Sync + 'static,
    O: OrderRepository + Send + Sync + 'static,
    B: BillingTransactionRepository + Send + Sync + 'static,
    N: NotificationOutboxRepository + Send + Sync + 'static,
{
    Router::new()
        .route("/:order_id/status", patch(update_order_status_by_id))
        .with_state(usecase)
}

pub async fn current_tenant<T, O, B, N>(
    State(usecase): State<Arc<TenantAdminUseCase<T, O, B, N>>>,
    auth: Option<AuthUser>,
) -> impl IntoResponse
where
    T: TenantRepository + Send + Sync + 'static,
    O: OrderRepository + Send + Sync + 'static,
    B: BillingTransactionRepository + Send + Sync + 'static,
    N: NotificationOutboxRepository + Send + Sync + 'static,
{
    let principal = auth.map(|AuthUser(principal)| principal);

    match usecase.current_tenant(principal.as_ref()).await {
        Ok(tenant) => (StatusCode::OK, Json(tenant)).into_response(),
        Err(err) => err.into_response(),
    }
}

pub async fn update_order_status<T, O, B, N>(
    State(usecase): State<Arc<TenantAdminUseCase<T, O, B, N>>>,
    auth: Option<AuthUser>,
    Path((slug, order_id)): Path<(String, Uuid)>,
    Json(model): Json<UpdateOrderStatusModel>,
) -> impl IntoResponse
where
    T: TenantRepository + Send + Sync + 'static,
    O: OrderRepository + Send + Sync + 'static,
    B: BillingTransactionRepository + Send + Sync + 'static,
    N: NotificationOutboxRepository + Send + Sync + 'static,
{
    let principal = auth.map(|AuthUser(principal)| principal);

    match usecase
        .update_order_status(principal.as_ref(), &slug, order_id, model)
        .await
    {
        Ok(order) => (StatusCode::OK, Json(order)).into_response(),
        Err(err) => err.into_response(),
    }
}

pub async fn update_order_status_by_id<T, O, B, N>(
    State(usecase): State<Arc<TenantAdminUseCase<T, O, B, N>>>,
    auth: Option<AuthUser>,
    Path(order_id): Path<Uuid>,
    Json(model): Json<UpdateOrderStatusModel>,
) -> impl IntoResponse
where
    T: TenantRepository + Send + Sync + 'static,
    O: OrderRepository + Send + Sync + 'static,
    B: BillingTransactionRepository + Send + Sync + 'static,
    N: NotificationOutboxRepository + Send + Sync + 'static,
{
    let principal = auth.map(|AuthUser(principal)| principal);

    match usecase
        .update_order_status_by_id(principal.as_ref(), order_id, model)
        .await
    {
        Ok(order) => (StatusCode::OK, Json(order)).into_response(),
        Err(err) => err.into_response(),
    }
}

pub async fn list_billing_transactions<T, O, B, N>(
    State(usecase): State<Arc<TenantAdminUseCase<T, O, B, N>>>,
    auth: Option<AuthUser>,
    Path(slug): Path<String>,
    Query(query): Query<TransactionListQuery>,
) -> impl IntoResponse
where
    T: TenantRepository + Send + Sync + 'static,
    O: OrderRepository + Send + Sync + 'static,
    B: BillingTransactionRepository + Send + Sync + 'static,
    N: NotificationOutboxRepository + Send + Sync + 'static,
{
    let principal = auth.map(|AuthUser(principal)| principal);

    match usecase
        .list_billing_transactions(principal.as_ref(), &slug, query.limit)
        .await
    {
        Ok(transactions) => (StatusCode::OK, Json(transactions)).into_response(),
        Err(err) => err.into_response(),
    }
}
