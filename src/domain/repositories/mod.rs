pub mod billing_transactions;
pub mod notification_outbox;
pub mod orders;
pub mod payment_credentials;
pub mod tenants;
pub mod trusted_operations;
