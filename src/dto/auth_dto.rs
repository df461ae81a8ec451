//! DTOs de autenticación

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::principal::Principal;
use crate::models::token::AccessToken;

// Request de login, común a las tres variantes
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1, message = "Username is required"))]
    pub username: String,

    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

// Resumen del principal autenticado (sin hash de password)
#[derive(Debug, Serialize)]
pub struct PrincipalSummary {
    pub id: String,
    pub role: String,
    pub username: String,
    pub email: String,
    pub phone_number: String,
}

impl From<&Principal> for PrincipalSummary {
    fn from(principal: &Principal) -> Self {
        Self {
            id: principal.id().to_string(),
            role: principal.kind().as_str().to_string(),
            username: principal.username().to_string(),
            email: principal.email().to_string(),
            phone_number: principal.phone_number().to_string(),
        }
    }
}

// Response de login
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub expires: String,
    pub principal: PrincipalSummary,
}

impl LoginResponse {
    pub fn new(token: &AccessToken, principal: &Principal) -> Self {
        Self {
            token: token.key.clone(),
            expires: token.expires.to_rfc3339(),
            principal: PrincipalSummary::from(principal),
        }
    }
}
