use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::value_objects::enums::order_statuses::OrderStatus;

/// Outbox payload for one downstream order message.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrderNotification {
    pub tenant_id: Uuid,
    pub order_id: Uuid,
    pub order_number: String,
    pub status: OrderStatus,
    pub recipient: String,
}

impl OrderNotification {
    pub fn event_name(&self) -> String {
        format!("order.{}", self.status)
    }

    pub fn message_text(&self) -> String {
        match self.status {
            OrderStatus::Paid => format!("Payment received for order {}.", self.order_number),
            OrderStatus::Processing => format!("Order {} is being prepared.", self.order_number),
            OrderStatus::Shipped => format!("Order {} has shipped.", self.order_number),
            OrderStatus::Completed => format!("Order {} is complete. Thank you!", self.order_number),
            OrderStatus::Cancelled => format!("Order {} was cancelled.", self.order_number),
            OrderStatus::Pending => format!("Order {} is awaiting payment.", self.order_number),
        }
    }
}
