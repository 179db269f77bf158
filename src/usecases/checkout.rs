use std::sync::Arc;

use chrono::{Duration, Utc};
use tracing::{error, info};
use url::Url;

use crate::{
    config::config_model::Ecpay,
    domain::{
        repositories::{
            orders::OrderRepository, payment_credentials::PaymentCredentialRepository,
            tenants::TenantRepository,
        },
        value_objects::{
            checkout::{CheckoutForm, CheckoutRequest, CreateCheckoutModel},
            enums::order_statuses::OrderStatus,
        },
    },
    payments::ecpay,
    usecases::errors::{UseCaseError, UseCaseResult},
};

/// ECPay expects MerchantTradeDate in Taiwan time.
const GATEWAY_UTC_OFFSET_HOURS: i64 = 8;

pub struct CheckoutUseCase<T, O, C>
where
    T: TenantRepository + Send + Sync + 'static,
    O: OrderRepository + Send + Sync + 'static,
    C: PaymentCredentialRepository + Send + Sync + 'static,
{
    tenant_repo: Arc<T>,
    order_repo: Arc<O>,
    credential_repo: Arc<C>,
    ecpay: Ecpay,
}

impl<T, O, C> CheckoutUseCase<T, O, C>
where
    T: TenantRepository + Send + Sync + 'static,
    O: OrderRepository + Send + Sync + 'static,
    C: PaymentCredentialRepository + Send + Sync + 'static,
{
    pub fn new(tenant_repo: Arc<T>, order_repo: Arc<O>, credential_repo: Arc<C>, ecpay: Ecpay) -> Self {
        Self {
            tenant_repo,
            order_repo,
            credential_repo,
            ecpay,
        }
    }

    pub async fn create_checkout(
        &self,
        slug: &str,
        order_number: &str,
        model: CreateCheckoutModel,
    ) -> UseCaseResult<CheckoutForm> {
        let tenant = self
            .tenant_repo
            .find_by_slug(slug)
            .await?
            .ok_or(UseCaseError::NotFound("tenant"))?;

        let order = self
            .order_repo
            .find_by_order_number(tenant.id, order_number)
            .await?
            .ok_or(UseCaseError::NotFound("order"))?;

        let status = order.order_status();
        if status != OrderStatus::Pending || order.paid_at.is_some() {
            return Err(UseCaseError::InvalidTransition {
                from: status,
                to: OrderStatus::Paid,
            });
        }

        let credentials = self
            .credential_repo
            .find_for_tenant(tenant.id)
            .await
            .map_err(|err| {
                error!(tenant_id = %tenant.id, db_error = ?err, "checkout: failed to load credentials");
                UseCaseError::Persistence(err)
            })?
            .ok_or(UseCaseError::NotFound("payment credentials"))?;

        let client_back_url = match model
            .client_back_url
            .as_deref()
            .map(str::trim)
            .filter(|v| !v.is_empty())
        {
            Some(url) => validate_redirect(url)?,
            None => self.ecpay.client_back_url.clone(),
        };

        let request = CheckoutRequest {
            merchant_trade_no: order.order_number.clone(),
            amount: i64::from(order.total_amount),
            item_description: format!("{} order {}", tenant.name, order.order_number),
            trade_description: tenant.name.clone(),
            return_url: self.ecpay.return_url.clone(),
            client_back_url,
            choose_payment: self.ecpay.choose_payment.clone(),
            trade_date: (Utc::now() + Duration::hours(GATEWAY_UTC_OFFSET_HOURS)).naive_utc(),
        };

        let fields = ecpay::build_checkout_request(&request, &credentials)?;

        info!(
            tenant_id = %tenant.id,
            order_id = %order.id,
            amount = order.total_amount,
            "checkout: signed checkout request built"
        );

        Ok(CheckoutForm {
            action_url: self.ecpay.checkout_url.clone(),
            fields,
        })
    }
}

fn validate_redirect(raw: &str) -> UseCaseResult<String> {
    let url = Url::parse(raw)
        .map_err(|_| UseCaseError::Validation("client_back_url must be an absolute URL".into()))?;

    match url.scheme() {
        "http" | "https" => Ok(url.to_string()),
        _ => Err(UseCaseError::Validation(
            "client_back_url must use http or https".into(),
        )),
    }
}
