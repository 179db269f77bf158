use axum::{
    Json,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use tracing::error;

use crate::usecases::errors::UseCaseError;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub code: &'static str,
    pub message: String,
}

impl IntoResponse for UseCaseError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        if let UseCaseError::Persistence(err) = &self {
            error!(error = ?err, "api: request failed with internal error");
        }

        let body = Json(ErrorResponse {
            code: self.code(),
            message: self.public_message(),
        });

        (status, body).into_response()
    }
}
