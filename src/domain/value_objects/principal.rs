use uuid::Uuid;

/// Verified caller identity handed over by the authentication layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub user_id: Uuid,
    pub email: Option<String>,
    pub is_platform_operator: bool,
}

impl Principal {
    pub fn new(user_id: Uuid) -> Self {
        Self {
            user_id,
            email: None,
            is_platform_operator: false,
        }
    }

    pub fn platform_operator(user_id: Uuid) -> Self {
        Self {
            user_id,
            email: None,
            is_platform_operator: true,
        }
    }
}
