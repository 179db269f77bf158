//! ECPay AIO checkout construction and callback authentication.
//!
//! This is the only place that computes or checks `CheckMacValue`. The algorithm
//! follows ECPay's published SHA-256 CheckMacValue rules: case-insensitive key sort,
//! `HashKey=..&k=v..&HashIV=..`, .NET-style form URL encoding, lowercase, SHA-256,
//! uppercase hex.
//!
//! Because the whole canonical string is lowercased before hashing, a change that
//! only flips the ASCII case of a field value verifies. ECPay signs this way, so
//! the digest cannot tell `Credit_CreditCard` from `credit_CreditCard`.

use std::collections::BTreeMap;

use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use thiserror::Error;
use url::form_urlencoded;

use crate::domain::{
    entities::payment_credentials::PaymentCredentialEntity,
    value_objects::checkout::CheckoutRequest,
};

pub const CHECK_MAC_FIELD: &str = "CheckMacValue";
pub const PROVIDER_NAME: &str = "ecpay";

const MAX_TRADE_NO_LEN: usize = 20;
const MAX_ITEM_NAME_CHARS: usize = 400;
const MAX_TRADE_DESC_CHARS: usize = 200;
const TRADE_DATE_FORMAT: &str = "%Y/%m/%d %H:%M:%S";
const SHA256_HEX_LEN: usize = 64;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CheckoutBuildError {
    #[error("amount must be greater than zero")]
    NonPositiveAmount,
    #[error("amount exceeds the gateway limit")]
    AmountTooLarge,
    #[error("merchant trade number is required")]
    MissingTradeNo,
    #[error("merchant trade number must be at most 20 alphanumeric characters")]
    InvalidTradeNo,
    #[error("{0} is required")]
    MissingField(&'static str),
}

/// Callback fields whose `CheckMacValue` has been checked against the tenant's keys.
/// Only [`verify_and_wrap`] produces one outside tests.
#[derive(Debug, Clone, PartialEq)]
pub struct VerifiedCallback {
    fields: BTreeMap<String, String>,
}

impl VerifiedCallback {
    #[cfg(test)]
    pub(crate) fn for_tests(fields: BTreeMap<String, String>) -> Self {
        Self { fields }
    }

    fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    pub fn merchant_trade_no(&self) -> Option<&str> {
        self.field("MerchantTradeNo")
    }

    pub fn is_success(&self) -> bool {
        self.field("RtnCode").map(str::trim) == Some("1")
    }

    pub fn rtn_msg(&self) -> Option<&str> {
        self.field("RtnMsg")
    }

    pub fn trade_no(&self) -> Option<&str> {
        self.field("TradeNo").filter(|v| !v.is_empty())
    }

    pub fn trade_amount(&self) -> Option<i32> {
        self.field("TradeAmt").and_then(|v| v.trim().parse().ok())
    }

    pub fn charge_fee(&self) -> i32 {
        self.field("PaymentTypeChargeFee")
            .and_then(|v| v.trim().parse::<f64>().ok())
            .map(|fee| fee.round() as i32)
            .unwrap_or(0)
    }

    pub fn payment_type(&self) -> Option<&str> {
        self.field("PaymentType")
    }

    /// Raw payload persisted for audit. Business logic never reads it back.
    pub fn to_audit_json(&self) -> serde_json::Value {
        serde_json::to_value(&self.fields).unwrap_or(serde_json::Value::Null)
    }
}

/// Canonical string before hashing, exposed for tests against provider vectors.
pub(crate) fn canonical_string<'a, I>(fields: I, hash_key: &str, hash_iv: &str) -> String
where
    I: IntoIterator<Item = (&'a String, &'a String)>,
{
    let mut pairs: Vec<(&String, &String)> = fields
        .into_iter()
        .filter(|(k, _)| k.as_str() != CHECK_MAC_FIELD)
        .collect();
    pairs.sort_by(|(a, _), (b, _)| {
        a.to_ascii_lowercase()
            .cmp(&b.to_ascii_lowercase())
            .then_with(|| a.cmp(b))
    });

    let mut raw = format!("HashKey={hash_key}");
    for (key, value) in pairs {
        raw.push('&');
        raw.push_str(key);
        raw.push('=');
        raw.push_str(value);
    }
    raw.push_str("&HashIV=");
    raw.push_str(hash_iv);

    let encoded: String = form_urlencoded::byte_serialize(raw.as_bytes()).collect();
    dotnet_url_encode_fixups(&encoded.to_ascii_lowercase())
}

// ECPay mirrors .NET's HttpUtility.UrlEncode, which leaves these characters literal.
fn dotnet_url_encode_fixups(encoded: &str) -> String {
    encoded
        .replace("%2d", "-")
        .replace("%5f", "_")
        .replace("%2e", ".")
        .replace("%21", "!")
        .replace("%2a", "*")
        .replace("%28", "(")
        .replace("%29", ")")
}

pub fn compute_check_mac_value(
    fields: &BTreeMap<String, String>,
    hash_key: &str,
    hash_iv: &str,
) -> String {
    let canonical = canonical_string(fields.iter(), hash_key, hash_iv);
    let digest = Sha256::digest(canonical.as_bytes());
    hex::encode_upper(digest)
}

/// Builds the signed AIO checkout field set. Pure: the trade date comes from the caller.
pub fn build_checkout_request(
    request: &CheckoutRequest,
    credentials: &PaymentCredentialEntity,
) -> Result<BTreeMap<String, String>, CheckoutBuildError> {
    if request.amount <= 0 {
        return Err(CheckoutBuildError::NonPositiveAmount);
    }
    if request.amount > i64::from(i32::MAX) {
        return Err(CheckoutBuildError::AmountTooLarge);
    }

    let trade_no = request.merchant_trade_no.trim();
    if trade_no.is_empty() {
        return Err(CheckoutBuildError::MissingTradeNo);
    }
    if trade_no.len() > MAX_TRADE_NO_LEN || !trade_no.chars().all(|c| c.is_ascii_alphanumeric())
    {
        return Err(CheckoutBuildError::InvalidTradeNo);
    }
    if request.return_url.trim().is_empty() {
        return Err(CheckoutBuildError::MissingField("ReturnURL"));
    }

    let item_name = truncate_chars(
        non_empty_or(&request.item_description, trade_no),
        MAX_ITEM_NAME_CHARS,
    );
    let trade_desc = truncate_chars(
        non_empty_or(&request.trade_description, &item_name),
        MAX_TRADE_DESC_CHARS,
    );
    let choose_payment = non_empty_or(&request.choose_payment, "ALL");

    let mut fields = BTreeMap::from([
        ("MerchantID".to_string(), credentials.merchant_id.clone()),
        ("MerchantTradeNo".to_string(), trade_no.to_string()),
        (
            "MerchantTradeDate".to_string(),
            request.trade_date.format(TRADE_DATE_FORMAT).to_string(),
        ),
        ("PaymentType".to_string(), "aio".to_string()),
        ("TotalAmount".to_string(), request.amount.to_string()),
        ("TradeDesc".to_string(), trade_desc),
        ("ItemName".to_string(), item_name),
        ("ReturnURL".to_string(), request.return_url.clone()),
        ("ClientBackURL".to_string(), request.client_back_url.clone()),
        ("ChoosePayment".to_string(), choose_payment.to_string()),
        ("EncryptType".to_string(), "1".to_string()),
    ]);

    let mac = compute_check_mac_value(&fields, &credentials.hash_key, &credentials.hash_iv);
    fields.insert(CHECK_MAC_FIELD.to_string(), mac);

    Ok(fields)
}

/// Recomputes the digest over every field but `CheckMacValue` and compares in constant time.
/// Any malformed input yields false. Letter case inside values is not covered (see module docs).
pub fn verify_callback(
    raw_fields: &BTreeMap<String, String>,
    credentials: &PaymentCredentialEntity,
) -> bool {
    let Some(supplied) = raw_fields.get(CHECK_MAC_FIELD) else {
        return false;
    };
    let supplied = supplied.trim().to_ascii_uppercase();
    if supplied.len() != SHA256_HEX_LEN || !supplied.bytes().all(|b| b.is_ascii_hexdigit()) {
        return false;
    }

    let expected =
        compute_check_mac_value(raw_fields, &credentials.hash_key, &credentials.hash_iv);

    expected.as_bytes().ct_eq(supplied.as_bytes()).into()
}

pub fn verify_and_wrap(
    raw_fields: BTreeMap<String, String>,
    credentials: &PaymentCredentialEntity,
) -> Option<VerifiedCallback> {
    if verify_callback(&raw_fields, credentials) {
        Some(VerifiedCallback { fields: raw_fields })
    } else {
        None
    }
}

fn non_empty_or<'a>(value: &'a str, fallback: &'a str) -> &'a str {
    let trimmed = value.trim();
    if trimmed.is_empty() { fallback } else { trimmed }
}

fn truncate_chars(value: &str, limit: usize) -> String {
    value.chars().take(limit).collect()
}
