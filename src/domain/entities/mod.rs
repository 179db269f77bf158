pub mod billing_transactions;
pub mod notification_jobs;
pub mod orders;
pub mod payment_credentials;
pub mod tenants;
