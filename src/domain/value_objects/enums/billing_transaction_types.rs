use std::fmt::Display;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BillingTransactionType {
    PlanDowngrade,
    Payment,
}

impl BillingTransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            BillingTransactionType::PlanDowngrade => "plan_downgrade",
            BillingTransactionType::Payment => "payment",
        }
    }
}

impl Display for BillingTransactionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
