use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{
    entities::orders::OrderEntity,
    value_objects::enums::{order_statuses::OrderStatus, payment_statuses::PaymentStatus},
};

/// Write set applied exactly once when a payment callback succeeds.
#[derive(Debug, Clone, PartialEq)]
pub struct PaidOrderUpdate {
    pub paid_at: DateTime<Utc>,
    pub payment_info: serde_json::Value,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateOrderStatusModel {
    pub status: OrderStatus,
}

/// Admin-facing view of an order. The raw provider payload stays server side.
#[derive(Debug, Clone, Serialize)]
pub struct OrderDto {
    pub id: Uuid,
    pub order_number: String,
    pub status: String,
    pub payment_status: String,
    pub total_amount: i32,
    pub paid_at: Option<DateTime<Utc>>,
    pub shipped_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

impl From<OrderEntity> for OrderDto {
    fn from(value: OrderEntity) -> Self {
        Self {
            id: value.id,
            order_number: value.order_number,
            status: value.status,
            payment_status: value.payment_status,
            total_amount: value.total_amount,
            paid_at: value.paid_at,
            shipped_at: value.shipped_at,
            completed_at: value.completed_at,
            cancelled_at: value.cancelled_at,
            updated_at: value.updated_at,
        }
    }
}

impl OrderEntity {
    /// Unknown status strings are treated as pending so they can still be paid or cancelled.
    pub fn order_status(&self) -> OrderStatus {
        OrderStatus::from_str(&self.status).unwrap_or(OrderStatus::Pending)
    }

    pub fn payment_status(&self) -> PaymentStatus {
        PaymentStatus::from_str(&self.payment_status).unwrap_or(PaymentStatus::Unpaid)
    }
}
