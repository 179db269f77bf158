pub mod billing_transaction_types;
pub mod order_statuses;
pub mod payment_statuses;
pub mod subscription_statuses;
pub mod tenant_roles;
