use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::Serialize;
use uuid::Uuid;

use crate::infra::db::postgres::schema::billing_transactions;

#[derive(Debug, Clone, Identifiable, Selectable, Queryable, Serialize)]
#[diesel(table_name = billing_transactions)]
pub struct BillingTransactionEntity {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub transaction_type: String,
    pub amount: i32,
    pub fee: i32,
    pub provider: String,
    pub provider_transaction_id: Option<String>,
    pub description: String,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable, PartialEq)]
#[diesel(table_name = billing_transactions)]
pub struct InsertBillingTransactionEntity {
    pub tenant_id: Uuid,
    pub transaction_type: String,
    pub amount: i32,
    pub fee: i32,
    pub provider: String,
    pub provider_transaction_id: Option<String>,
    pub description: String,
    pub occurred_at: DateTime<Utc>,
}
