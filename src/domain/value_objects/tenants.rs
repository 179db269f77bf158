use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::domain::entities::tenants::TenantEntity;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TenantSummaryDto {
    pub id: Uuid,
    pub slug: String,
    pub name: String,
    pub plan_id: String,
    pub subscription_status: String,
    pub next_billing_at: Option<DateTime<Utc>>,
}

impl From<TenantEntity> for TenantSummaryDto {
    fn from(value: TenantEntity) -> Self {
        Self {
            id: value.id,
            slug: value.slug,
            name: value.name,
            plan_id: value.plan_id,
            subscription_status: value.subscription_status,
            next_billing_at: value.next_billing_at,
        }
    }
}
