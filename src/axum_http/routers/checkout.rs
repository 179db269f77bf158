use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::post,
};

use crate::{
    config::config_model::Ecpay,
    domain::{
        repositories::{
            orders::OrderRepository, payment_credentials::PaymentCredentialRepository,
            tenants::TenantRepository,
        },
        value_objects::checkout::CreateCheckoutModel,
    },
    infra::db::{
        postgres::postgres_connection::PgPoolSquad,
        repositories::{
            orders::OrderPostgres, payment_credentials::PaymentCredentialPostgres,
            tenants::TenantPostgres,
        },
    },
    usecases::checkout::CheckoutUseCase,
};

pub fn routes(db_pool: Arc<PgPoolSquad>, ecpay: Ecpay) -> Router {
    let usecase = CheckoutUseCase::new(
        Arc::new(TenantPostgres::new(Arc::clone(&db_pool))),
        Arc::new(OrderPostgres::new(Arc::clone(&db_pool))),
        Arc::new(PaymentCredentialPostgres::new(Arc::clone(&db_pool))),
        ecpay,
    );

    router(Arc::new(usecase))
}

pub fn router<T, O, C>(usecase: Arc<CheckoutUseCase<T, O, C>>) -> Router
where
    T: TenantRepository + Send + Sync + 'static,
    O: OrderRepository + Send + Sync + 'static,
    C: PaymentCredentialRepository + Send + Sync + 'static,
{
    Router::new()
        .route("/:slug/orders/:order_number/checkout", post(create_checkout))
        .with_state(usecase)
}

pub async fn create_checkout<T, O, C>(
    State(usecase): State<Arc<CheckoutUseCase<T, O, C>>>,
    Path((slug, order_number)): Path<(String, String)>,
    body: Option<Json<CreateCheckoutModel>>,
) -> impl IntoResponse
where
    T: TenantRepository + Send + Sync + 'static,
    O: OrderRepository + Send + Sync + 'static,
    C: PaymentCredentialRepository + Send + Sync + 'static,
{
    let model = body.map(|Json(model)| model).unwrap_or_default();

    match usecase.create_checkout(&slug, &order_number, model).await {
        Ok(form) => (StatusCode::OK, Json(form)).into_response(),
        Err(err) => err.into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        domain::repositories::{
            orders::MockOrderRepository, payment_credentials::MockPaymentCredentialRepository,
            tenants::MockTenantRepository,
        },
        usecases::test_support::{sample_credentials, sample_order, sample_tenant},
    };
    use axum::{body::Body, http::Request};
    use tower::ServiceExt;

    fn settings() -> Ecpay {
        Ecpay {
            checkout_url: "https://gateway.test/checkout".to_string(),
            return_url: "https://api.test/api/v1/payments/ecpay/callback".to_string(),
            client_back_url: "https://shop.test/thanks".to_string(),
            choose_payment: "ALL".to_string(),
        }
    }

    fn app(known_order: bool) -> Router {
        let tenant = sample_tenant("acme");
        let tenant_id = tenant.id;
        let order = sample_order(tenant_id, "OMO20250101001");

        let mut tenant_repo = MockTenantRepository::new();
        tenant_repo.expect_find_by_slug().returning(move |_| {
            let tenant = tenant.clone();
            Box::pin(async move { Ok(Some(tenant)) })
        });
        let mut order_repo = MockOrderRepository::new();
        order_repo.expect_find_by_order_number().returning(move |_, _| {
            let order = known_order.then(|| order.clone());
            Box::pin(async move { Ok(order) })
        });
        let mut credential_repo = MockPaymentCredentialRepository::new();
        credential_repo.expect_find_for_tenant().returning(move |_| {
            Box::pin(async move { Ok(Some(sample_credentials(tenant_id))) })
        });

        router(Arc::new(CheckoutUseCase::new(
            Arc::new(tenant_repo),
            Arc::new(order_repo),
            Arc::new(credential_repo),
            settings(),
        )))
    }

    async fn call(app: Router, body: Body, json: bool) -> (StatusCode, serde_json::Value) {
        let mut request = Request::builder()
            .method("POST")
            .uri("/acme/orders/OMO20250101001/checkout");
        if json {
            request = request.header("content-type", "application/json");
        }
        let response = app.oneshot(request.body(body).unwrap()).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn returns_signed_form_without_a_body() {
        let (status, json) = call(app(true), Body::empty(), false).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["action_url"], "https://gateway.test/checkout");
        assert_eq!(json["fields"]["MerchantTradeNo"], "OMO20250101001");
        assert!(json["fields"]["CheckMacValue"].is_string());
    }

    #[tokio::test]
    async fn honours_client_back_url_override() {
        let body = Body::from(r#"{"client_back_url":"https://shop.test/orders/OMO20250101001"}"#);

        let (status, json) = call(app(true), body, true).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            json["fields"]["ClientBackURL"],
            "https://shop.test/orders/OMO20250101001"
        );
    }

    #[tokio::test]
    async fn unknown_order_is_not_found() {
        let (status, json) = call(app(false), Body::empty(), false).await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json["code"], "not_found");
    }
}
