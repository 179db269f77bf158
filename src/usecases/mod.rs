pub mod billing_reconciler;
pub mod checkout;
pub mod errors;
pub mod notification_dispatch;
pub mod order_ledger;
pub mod payment_callback;
pub mod tenant_access;
pub mod tenant_admin;

#[cfg(test)]
pub(crate) mod test_support;
