pub mod checkout;
pub mod enums;
pub mod notifications;
pub mod orders;
pub mod plans;
pub mod principal;
pub mod reconciliation;
pub mod tenant_context;
pub mod tenants;
