use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::infra::db::postgres::schema::orders;

#[derive(Debug, Clone, Identifiable, Selectable, Queryable, PartialEq)]
#[diesel(table_name = orders)]
pub struct OrderEntity {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub order_number: String,
    pub status: String,
    pub payment_status: String,
    pub total_amount: i32,
    pub customer_line_user_id: Option<String>,
    pub payment_info: Option<serde_json::Value>,
    pub paid_at: Option<DateTime<Utc>>,
    pub shipped_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
