use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

use clinic_types::validation::ValidationErrors;

/// Every failure a handler can return. Each variant maps to exactly one
/// status code and JSON body.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(#[from] ValidationErrors),

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    /// A listing matched nothing.
    #[error("Data not found")]
    EmptyResult,

    #[error("Username or Password is wrong")]
    InvalidCredentials,

    #[error("Not Unauthenticated")]
    Unauthenticated,

    #[error("API or route not found")]
    RouteNotFound,

    #[error("Method not allowed")]
    MethodNotAllowed,

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    pub fn patient_not_found(id: &str) -> Self {
        ApiError::NotFound(format!("Patient's data with id {} is not found", id))
    }

    fn body_error(field: &'static str, detail: String) -> Self {
        let mut errors = ValidationErrors::new();
        errors.add(field, detail);
        ApiError::Validation(errors)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::body_error("body", rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            ApiError::Validation(errors) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                json!({ "message": "Validation Error", "errors": errors.to_string() }),
            ),
            ApiError::BadRequest(message) => {
                (StatusCode::BAD_REQUEST, json!({ "message": message }))
            }
            ApiError::NotFound(message) => (StatusCode::NOT_FOUND, json!({ "message": message })),
            ApiError::EmptyResult => (
                StatusCode::NOT_FOUND,
                json!({ "message": self.to_string(), "data": [] }),
            ),
            ApiError::InvalidCredentials => (
                StatusCode::UNAUTHORIZED,
                json!({ "message": self.to_string() }),
            ),
            ApiError::Unauthenticated => (
                StatusCode::UNAUTHORIZED,
                json!({ "error": self.to_string() }),
            ),
            ApiError::RouteNotFound => (StatusCode::NOT_FOUND, json!({ "message": self.to_string() })),
            ApiError::MethodNotAllowed => (
                StatusCode::METHOD_NOT_ALLOWED,
                json!({ "message": self.to_string() }),
            ),
            ApiError::Internal(err) => {
                error!("Internal error: {:#}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "message": "Error occurred", "errors": err.to_string() }),
                )
            }
        };

        (status, Json(body)).into_response()
    }
}

pub async fn route_not_found() -> ApiError {
    ApiError::RouteNotFound
}

pub async fn method_not_allowed() -> ApiError {
    ApiError::MethodNotAllowed
}
