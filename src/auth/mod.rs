//! Bearer JWT extraction. Authentication itself is done upstream; this only
//! checks the token signature and turns the claims into a [`Principal`].

use std::sync::Arc;

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{domain::value_objects::principal::Principal, usecases::errors::UseCaseError};

pub const PLATFORM_OPERATOR_ROLE: &str = "platform_operator";
const AUDIENCE: &str = "authenticated";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppMetadata {
    #[serde(default)]
    pub role: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AccessClaims {
    pub sub: String,
    pub aud: String,
    pub exp: usize,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub app_metadata: AppMetadata,
}

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("missing Authorization header")]
    MissingHeader,
    #[error("Authorization header is not a bearer token")]
    InvalidHeader,
    #[error("token rejected: {0}")]
    InvalidToken(String),
    #[error("token subject is not a user id")]
    InvalidSubject,
}

/// Signing secret shared with the identity provider. Installed as a request extension.
#[derive(Clone)]
pub struct JwtSettings {
    secret: String,
}

impl JwtSettings {
    pub fn new(secret: String) -> Self {
        Self { secret }
    }

    pub fn validate(&self, token: &str) -> Result<AccessClaims, AuthError> {
        let decoding_key = DecodingKey::from_secret(self.secret.as_bytes());
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_audience(&[AUDIENCE]);

        let token_data = decode::<AccessClaims>(token, &decoding_key, &validation)
            .map_err(|err| AuthError::InvalidToken(err.to_string()))?;

        Ok(token_data.claims)
    }

    pub fn principal_from_token(&self, token: &str) -> Result<Principal, AuthError> {
        let claims = self.validate(token)?;
        let user_id = Uuid::parse_str(&claims.sub).map_err(|_| AuthError::InvalidSubject)?;

        Ok(Principal {
            user_id,
            email: claims.email,
            is_platform_operator: claims.app_metadata.role.as_deref()
                == Some(PLATFORM_OPERATOR_ROLE),
        })
    }
}

pub fn bearer_token(parts: &Parts) -> Result<&str, AuthError> {
    let header = parts
        .headers
        .get(AUTHORIZATION)
        .ok_or(AuthError::MissingHeader)?
        .to_str()
        .map_err(|_| AuthError::InvalidHeader)?;

    header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or(AuthError::InvalidHeader)
}

/// Verified caller. Handlers take `Option<AuthUser>` and let the use case decide
/// whether anonymity is acceptable.
#[derive(Debug, Clone)]
pub struct AuthUser(pub Principal);

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = UseCaseError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let settings = parts
            .extensions
            .get::<Arc<JwtSettings>>()
            .cloned()
            .ok_or_else(|| {
                UseCaseError::Persistence(anyhow::anyhow!("JwtSettings extension missing"))
            })?;

        let token = bearer_token(parts).map_err(|err| {
            tracing::debug!(error = %err, "auth: rejected request");
            UseCaseError::Authentication
        })?;

        let principal = settings.principal_from_token(token).map_err(|err| {
            tracing::info!(error = %err, "auth: invalid bearer token");
            UseCaseError::Authentication
        })?;

        Ok(AuthUser(principal))
    }
}
