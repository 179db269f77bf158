use std::fmt::Display;

use serde::{Deserialize, Serialize};

/// Plan identifier stored on tenants that never bills.
pub const FREE_PLAN_ID: &str = "free";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionPlan {
    Free,
    Basic,
    Pro,
    Enterprise,
}

impl SubscriptionPlan {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionPlan::Free => FREE_PLAN_ID,
            SubscriptionPlan::Basic => "basic",
            SubscriptionPlan::Pro => "pro",
            SubscriptionPlan::Enterprise => "enterprise",
        }
    }

    pub fn from_str(value: &str) -> Option<Self> {
        match value {
            FREE_PLAN_ID => Some(SubscriptionPlan::Free),
            "basic" => Some(SubscriptionPlan::Basic),
            "pro" => Some(SubscriptionPlan::Pro),
            "enterprise" => Some(SubscriptionPlan::Enterprise),
            _ => None,
        }
    }

    pub fn is_free(&self) -> bool {
        matches!(self, SubscriptionPlan::Free)
    }
}

impl Display for SubscriptionPlan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
