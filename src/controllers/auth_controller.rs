//! Controller de autenticación
//!
//! Login por variante de principal y logout. El hash de password se
//! verifica con bcrypt; el alta de cuentas y el cambio de password son
//! colaboradores externos y no pasan por aquí.

use std::sync::Arc;

use validator::Validate;

use crate::dto::auth_dto::{LoginRequest, LoginResponse};
use crate::dto::ApiResponse;
use crate::models::principal::{Principal, PrincipalKind};
use crate::services::{AuthContext, TokenService};
use crate::storage::FleetStore;
use crate::utils::errors::{validation_error, AppError, AppResult};

pub struct AuthController {
    store: Arc<dyn FleetStore>,
    tokens: TokenService,
}

impl AuthController {
    pub fn new(store: Arc<dyn FleetStore>, token_ttl_days: i64) -> Self {
        Self {
            tokens: TokenService::new(store.clone(), token_ttl_days),
            store,
        }
    }

    /// Login contra el namespace de una variante. Devuelve el token vivo
    /// del principal (el mismo si ya tenía uno sin expirar).
    pub async fn login(
        &self,
        kind: PrincipalKind,
        request: LoginRequest,
    ) -> AppResult<ApiResponse<LoginResponse>> {
        request.validate()?;

        let principal = self
            .find_by_username(kind, &request.username)
            .await?
            .ok_or_else(|| validation_error("username", "Invalid username"))?;

        let password_ok = bcrypt::verify(&request.password, principal.password_hash())
            .map_err(|e| AppError::Internal(format!("Error verificando password: {}", e)))?;
        if !password_ok {
            return Err(validation_error("password", "Invalid password"));
        }

        let token = self.tokens.issue(kind, principal.id()).await?;
        log::info!("Login de {} '{}'", kind, principal.username());

        Ok(ApiResponse::success_with_message(
            LoginResponse::new(&token, &principal),
            "Login successful".to_string(),
        ))
    }

    /// Revocar el token presentado. La revocación en el storage es
    /// idempotente, pero aquí una clave desconocida se reporta como fallo.
    pub async fn logout(&self, ctx: &AuthContext) -> AppResult<()> {
        let (principal, token) = ctx.require_authenticated()?;
        let removed = self.tokens.revoke(principal.kind(), &token.key).await?;
        if !removed {
            return Err(AppError::NotFound("Token not found".to_string()));
        }
        Ok(())
    }

    async fn find_by_username(
        &self,
        kind: PrincipalKind,
        username: &str,
    ) -> AppResult<Option<Principal>> {
        let principal = match kind {
            PrincipalKind::Operator => self
                .store
                .find_operator_by_username(username)
                .await?
                .map(Principal::Operator),
            PrincipalKind::Owner => self
                .store
                .find_owner_by_username(username)
                .await?
                .map(Principal::Owner),
            PrincipalKind::Technician => self
                .store
                .find_technician_by_username(username)
                .await?
                .map(Principal::Technician),
        };
        Ok(principal)
    }
}
