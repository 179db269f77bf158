use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::{
    domain::value_objects::{
        enums::subscription_statuses::SubscriptionStatus,
        plans::{FREE_PLAN_ID, SubscriptionPlan},
    },
    infra::db::postgres::schema::{tenant_members, tenants},
};

#[derive(Debug, Clone, Identifiable, Selectable, Queryable, PartialEq)]
#[diesel(table_name = tenants)]
pub struct TenantEntity {
    pub id: Uuid,
    pub slug: String,
    pub name: String,
    pub plan_id: String,
    pub subscription_status: String,
    pub next_billing_at: Option<DateTime<Utc>>,
    pub managed_by: Option<Uuid>,
    pub is_hq: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TenantEntity {
    pub fn plan(&self) -> Option<SubscriptionPlan> {
        SubscriptionPlan::from_str(&self.plan_id)
    }

    pub fn is_on_free_plan(&self) -> bool {
        self.plan_id == FREE_PLAN_ID
    }

    pub fn subscription_status(&self) -> SubscriptionStatus {
        SubscriptionStatus::from_str(&self.subscription_status)
    }
}

#[derive(Debug, Clone, Selectable, Queryable)]
#[diesel(table_name = tenant_members)]
pub struct TenantMemberEntity {
    pub tenant_id: Uuid,
    pub user_id: Uuid,
    pub role: String,
    pub created_at: DateTime<Utc>,
}
