pub mod billing_reconciliation;
pub mod checkout;
pub mod payment_callback;
pub mod tenant_admin;
