use axum::http::StatusCode;
use thiserror::Error;

use crate::{
    domain::value_objects::enums::order_statuses::OrderStatus,
    payments::ecpay::CheckoutBuildError,
};

#[derive(Debug, Error)]
pub enum UseCaseError {
    #[error("authentication required")]
    Authentication,
    #[error("not allowed to act on this tenant")]
    Authorization,
    #[error("signature verification failed")]
    Signature,
    #[error("invalid request: {0}")]
    Validation(String),
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("order cannot move from {from} to {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },
    #[error(transparent)]
    Persistence(#[from] anyhow::Error),
}

impl UseCaseError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            UseCaseError::Authentication => StatusCode::UNAUTHORIZED,
            UseCaseError::Authorization => StatusCode::FORBIDDEN,
            UseCaseError::Signature | UseCaseError::Validation(_) => StatusCode::BAD_REQUEST,
            UseCaseError::NotFound(_) => StatusCode::NOT_FOUND,
            UseCaseError::InvalidTransition { .. } => StatusCode::CONFLICT,
            UseCaseError::Persistence(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            UseCaseError::Authentication => "authentication",
            UseCaseError::Authorization => "authorization",
            UseCaseError::Signature => "signature",
            UseCaseError::Validation(_) => "validation",
            UseCaseError::NotFound(_) => "not_found",
            UseCaseError::InvalidTransition { .. } => "invalid_transition",
            UseCaseError::Persistence(_) => "persistence",
        }
    }

    /// Message safe to hand to a client. Persistence details stay in the logs.
    pub fn public_message(&self) -> String {
        match self {
            UseCaseError::Persistence(_) => "internal error".to_string(),
            other => other.to_string(),
        }
    }
}

impl From<CheckoutBuildError> for UseCaseError {
    fn from(value: CheckoutBuildError) -> Self {
        UseCaseError::Validation(value.to_string())
    }
}

pub type UseCaseResult<T> = std::result::Result<T, UseCaseError>;

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    #[test]
    fn maps_each_variant_to_its_status() {
        assert_eq!(UseCaseError::Authentication.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(UseCaseError::Authorization.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(UseCaseError::Signature.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(
            UseCaseError::Validation("x".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(UseCaseError::NotFound("order").status_code(), StatusCode::NOT_FOUND);
        assert_eq!(
            UseCaseError::InvalidTransition {
                from: OrderStatus::Completed,
                to: OrderStatus::Pending
            }
            .status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            UseCaseError::Persistence(anyhow!("db down")).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn persistence_details_are_not_public() {
        let error = UseCaseError::Persistence(anyhow!("connection refused to 10.0.0.5"));

        assert_eq!(error.public_message(), "internal error");
    }

    #[test]
    fn checkout_errors_become_validation() {
        let error = UseCaseError::from(CheckoutBuildError::NonPositiveAmount);

        assert!(matches!(error, UseCaseError::Validation(_)));
        assert_eq!(error.code(), "validation");
    }
}
