use std::fmt::Display;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TenantRole {
    Owner,
    Admin,
    Staff,
}

impl TenantRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            TenantRole::Owner => "owner",
            TenantRole::Admin => "admin",
            TenantRole::Staff => "staff",
        }
    }

    pub fn from_str(value: &str) -> Option<Self> {
        match value {
            "owner" => Some(TenantRole::Owner),
            "admin" => Some(TenantRole::Admin),
            "staff" => Some(TenantRole::Staff),
            _ => None,
        }
    }

    /// Only owners and admins may run billing and order administration.
    pub fn can_administer(&self) -> bool {
        matches!(self, TenantRole::Owner | TenantRole::Admin)
    }

    /// Stored role strings that pass `can_administer`.
    pub fn administering_role_names() -> Vec<&'static str> {
        [TenantRole::Owner, TenantRole::Admin, TenantRole::Staff]
            .into_iter()
            .filter(TenantRole::can_administer)
            .map(|role| role.as_str())
            .collect()
    }
}

impl Display for TenantRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn staff_membership_does_not_count_as_administering() {
        let names = TenantRole::administering_role_names();

        assert_eq!(names, vec!["owner", "admin"]);
        assert!(!names.contains(&TenantRole::Staff.as_str()));
    }
}
