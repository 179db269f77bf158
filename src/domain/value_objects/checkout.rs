use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Inputs for one outbound checkout request.
#[derive(Debug, Clone)]
pub struct CheckoutRequest {
    pub merchant_trade_no: String,
    pub amount: i64,
    pub item_description: String,
    pub trade_description: String,
    pub return_url: String,
    pub client_back_url: String,
    pub choose_payment: String,
    /// Gateway local time (UTC+8).
    pub trade_date: NaiveDateTime,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateCheckoutModel {
    pub client_back_url: Option<String>,
}

/// Auto-submit form handed to the shopper's browser.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CheckoutForm {
    pub action_url: String,
    pub fields: BTreeMap<String, String>,
}
