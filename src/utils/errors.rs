//! Sistema de manejo de errores
//!
//! Este módulo define todos los tipos de errores del sistema
//! y su conversión a respuestas HTTP apropiadas.
//!
//! Los errores de validación y de transición siempre se recuperan en el
//! boundary del endpoint como respuestas estructuradas; la autenticación
//! fallida corta la request antes de tocar ningún estado.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::models::trip::TripStatus;
use crate::storage::StorageError;

/// Errores principales de la aplicación
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Invalid token")]
    InvalidToken,

    #[error("Token expired")]
    TokenExpired,

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Invalid transition: {0}")]
    InvalidTransition(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

/// Respuesta de error para la API
#[derive(Debug, serde::Serialize)]
struct ErrorResponse {
    error: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    code: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_response) = match self {
            AppError::Database(msg) => {
                tracing::error!("Database error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorResponse {
                        error: "Database Error".to_string(),
                        message: "An error occurred while accessing the database".to_string(),
                        details: Some(json!({ "db_error": msg })),
                        code: Some("DB_ERROR".to_string()),
                    },
                )
            }

            AppError::Validation(e) => (
                StatusCode::BAD_REQUEST,
                ErrorResponse {
                    error: "Validation Error".to_string(),
                    message: "The provided data is invalid".to_string(),
                    details: Some(json!(e)),
                    code: Some("VALIDATION_ERROR".to_string()),
                },
            ),

            AppError::AuthenticationFailed(msg) => (
                StatusCode::UNAUTHORIZED,
                ErrorResponse {
                    error: "Authentication Failed".to_string(),
                    message: msg,
                    details: None,
                    code: Some("AUTHENTICATION_FAILED".to_string()),
                },
            ),

            AppError::InvalidToken => (
                StatusCode::UNAUTHORIZED,
                ErrorResponse {
                    error: "Authentication Failed".to_string(),
                    message: "Invalid token".to_string(),
                    details: None,
                    code: Some("INVALID_TOKEN".to_string()),
                },
            ),

            AppError::TokenExpired => (
                StatusCode::UNAUTHORIZED,
                ErrorResponse {
                    error: "Authentication Failed".to_string(),
                    message: "Token expired".to_string(),
                    details: None,
                    code: Some("TOKEN_EXPIRED".to_string()),
                },
            ),

            AppError::Forbidden(msg) => (
                StatusCode::FORBIDDEN,
                ErrorResponse {
                    error: "Forbidden".to_string(),
                    message: msg,
                    details: None,
                    code: Some("FORBIDDEN".to_string()),
                },
            ),

            AppError::NotFound(msg) => (
                StatusCode::NOT_FOUND,
                ErrorResponse {
                    error: "Not Found".to_string(),
                    message: msg,
                    details: None,
                    code: Some("NOT_FOUND".to_string()),
                },
            ),

            AppError::Conflict(msg) => (
                StatusCode::CONFLICT,
                ErrorResponse {
                    error: "Conflict".to_string(),
                    message: msg,
                    details: None,
                    code: Some("CONFLICT".to_string()),
                },
            ),

            AppError::InvalidTransition(msg) => (
                StatusCode::CONFLICT,
                ErrorResponse {
                    error: "Invalid Transition".to_string(),
                    message: msg,
                    details: None,
                    code: Some("INVALID_TRANSITION".to_string()),
                },
            ),

            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorResponse {
                        error: "Internal Server Error".to_string(),
                        message: "An unexpected error occurred".to_string(),
                        details: Some(json!({ "internal_error": msg })),
                        code: Some("INTERNAL_ERROR".to_string()),
                    },
                )
            }
        };

        (status, Json(error_response)).into_response()
    }
}

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound(msg) => AppError::NotFound(msg),
            StorageError::Conflict(msg) => AppError::Conflict(msg),
            StorageError::ActiveTripExists { .. } => {
                validation_error("operator", "Operator already has an active trip")
            }
            StorageError::StatusConflict { actual } => {
                AppError::InvalidTransition(format!("Trip is in status '{}'", actual))
            }
            StorageError::Database(msg) => AppError::Database(msg),
        }
    }
}

/// Resultado tipado para operaciones que pueden fallar
pub type AppResult<T> = Result<T, AppError>;

/// Función helper para crear errores de validación atribuidos a un campo
pub fn validation_error(field: &'static str, message: &'static str) -> AppError {
    use validator::ValidationError;

    let mut error = ValidationError::new("invalid");
    error.message = Some(message.into());

    let mut errors = validator::ValidationErrors::new();
    errors.add(field, error);

    AppError::Validation(errors)
}

/// Función helper para errores de transición ilegal
pub fn invalid_transition(action: &str, actual: TripStatus) -> AppError {
    AppError::InvalidTransition(format!(
        "Cannot {} a trip in status '{}'",
        action, actual
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_is_field_attributed() {
        let err = validation_error("vehicle_id", "Operator is not assigned to this vehicle");
        match err {
            AppError::Validation(errors) => {
                assert!(errors.field_errors().contains_key("vehicle_id"));
            }
            other => panic!("expected Validation, got {:?}", other),
        }
    }

    #[test]
    fn test_invalid_transition_message() {
        let err = invalid_transition("start", TripStatus::Completed);
        assert!(err.to_string().contains("completed"));
    }
}
