//! Servicio de tokens opacos
//!
//! Ciclo de vida de los bearer tokens: issue (get-or-create por
//! principal), validate (expiración lazy) y revoke.

use std::sync::Arc;

use crate::models::principal::PrincipalKind;
use crate::models::token::AccessToken;
use crate::storage::FleetStore;
use crate::utils::errors::{AppError, AppResult};

/// TokenService encapsula la tabla de tokens de cada variante
#[derive(Clone)]
pub struct TokenService {
    store: Arc<dyn FleetStore>,
    ttl_days: i64,
}

impl TokenService {
    pub fn new(store: Arc<dyn FleetStore>, ttl_days: i64) -> Self {
        Self { store, ttl_days }
    }

    /// Emitir un token para un principal. Si ya existe uno vivo se
    /// devuelve ese mismo; dos logins concurrentes no crean dos tokens
    /// vivos (el get-or-create es atómico en el storage).
    pub async fn issue(&self, kind: PrincipalKind, principal_id: uuid::Uuid) -> AppResult<AccessToken> {
        let candidate = AccessToken::issue_for(principal_id, self.ttl_days);
        let token = self.store.issue_token(kind, candidate).await?;
        log::info!("Token emitido para {} {}", kind, principal_id);
        Ok(token)
    }

    /// Validar una clave dentro del namespace de una variante.
    ///
    /// La expiración se comprueba aquí, de forma lazy; no hay barrido de
    /// fondo que borre filas expiradas (quedan inertes en la tabla).
    pub async fn validate(&self, kind: PrincipalKind, key: &str) -> AppResult<AccessToken> {
        match self.store.find_token(kind, key).await? {
            None => Err(AppError::InvalidToken),
            Some(token) if token.is_expired() => Err(AppError::TokenExpired),
            Some(token) => Ok(token),
        }
    }

    /// Revocar una clave. Devuelve `false` si no existía; borrar una clave
    /// inexistente no es un error en esta capa (el endpoint decide).
    pub async fn revoke(&self, kind: PrincipalKind, key: &str) -> AppResult<bool> {
        let removed = self.store.delete_token(kind, key).await?;
        if removed {
            log::info!("Token revocado en namespace {}", kind);
        }
        Ok(removed)
    }
}
