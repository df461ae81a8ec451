//! Resolución de identidad multi-principal
//!
//! Dada una clave bearer opaca, determinar a cuál de los tres namespaces
//! disjuntos pertenece (operador / propietario / técnico) y devolver el
//! principal tipado.
//!
//! El orden de resolución es fijo y es parte del contrato: un resolver que
//! buscara los namespaces sin orden podría devolver resultados distintos
//! en cada llamada ante una colisión de claves entre tablas (improbable
//! pero estructuralmente posible). Con orden fijo, la colisión se resuelve
//! siempre igual.

use std::sync::Arc;

use crate::models::principal::{Principal, PrincipalKind};
use crate::models::token::AccessToken;
use crate::storage::FleetStore;
use crate::utils::errors::{AppError, AppResult};

/// Orden de prioridad de los namespaces. Primero que produce un token
/// vivo gana.
pub const RESOLUTION_ORDER: [PrincipalKind; 3] = [
    PrincipalKind::Operator,
    PrincipalKind::Owner,
    PrincipalKind::Technician,
];

/// Contexto de autorización de una request, construido una sola vez por
/// el resolver e inmutable después. `Anonymous` significa "no se
/// presentaron credenciales", que no es lo mismo que "credenciales
/// inválidas" (eso es un error).
#[derive(Debug, Clone)]
pub enum AuthContext {
    Anonymous,
    Authenticated {
        principal: Principal,
        token: AccessToken,
    },
}

impl AuthContext {
    pub fn principal(&self) -> Option<&Principal> {
        match self {
            AuthContext::Anonymous => None,
            AuthContext::Authenticated { principal, .. } => Some(principal),
        }
    }

    /// Exigir un token de operador. La autorización es un pattern match
    /// sobre la variante del principal.
    pub fn require_operator(&self) -> AppResult<&crate::models::principal::Operator> {
        match self {
            AuthContext::Authenticated {
                principal: Principal::Operator(operator),
                ..
            } => Ok(operator),
            AuthContext::Authenticated { .. } => Err(AppError::Forbidden(
                "Se requiere un token de operador".to_string(),
            )),
            AuthContext::Anonymous => Err(AppError::AuthenticationFailed(
                "Token de autorización requerido".to_string(),
            )),
        }
    }

    /// Exigir cualquier principal autenticado (para logout)
    pub fn require_authenticated(&self) -> AppResult<(&Principal, &AccessToken)> {
        match self {
            AuthContext::Authenticated { principal, token } => Ok((principal, token)),
            AuthContext::Anonymous => Err(AppError::AuthenticationFailed(
                "Token de autorización requerido".to_string(),
            )),
        }
    }
}

/// Resolver de identidad sobre las tres tablas de tokens
#[derive(Clone)]
pub struct AuthService {
    store: Arc<dyn FleetStore>,
}

impl AuthService {
    pub fn new(store: Arc<dyn FleetStore>) -> Self {
        Self { store }
    }

    /// Resolver el header `Authorization` a un `AuthContext`.
    ///
    /// Header ausente, esquema distinto de `Bearer` o clave vacía →
    /// `Anonymous`. Clave presente pero sin token vivo en ningún
    /// namespace → error de autenticación (expirado si algún namespace
    /// tenía la clave caducada).
    pub async fn resolve(&self, authorization: Option<&str>) -> AppResult<AuthContext> {
        let key = match bearer_key(authorization) {
            Some(key) => key,
            None => return Ok(AuthContext::Anonymous),
        };

        let mut saw_expired = false;
        for kind in RESOLUTION_ORDER {
            match self.store.find_token(kind, key).await? {
                Some(token) if !token.is_expired() => {
                    let principal = self.load_principal(kind, token.principal_id).await?;
                    return Ok(AuthContext::Authenticated { principal, token });
                }
                Some(_) => saw_expired = true,
                None => {}
            }
        }

        if saw_expired {
            Err(AppError::TokenExpired)
        } else {
            Err(AppError::InvalidToken)
        }
    }

    async fn load_principal(&self, kind: PrincipalKind, id: uuid::Uuid) -> AppResult<Principal> {
        let principal = match kind {
            PrincipalKind::Operator => self
                .store
                .find_operator(id)
                .await?
                .map(Principal::Operator),
            PrincipalKind::Owner => self.store.find_owner(id).await?.map(Principal::Owner),
            PrincipalKind::Technician => self
                .store
                .find_technician(id)
                .await?
                .map(Principal::Technician),
        };
        // un token cuyo principal ya no existe equivale a un token inválido
        principal.ok_or(AppError::InvalidToken)
    }
}

/// Extraer la clave de un header `Authorization: Bearer <key>`.
/// Devuelve `None` para header ausente, esquema distinto o clave vacía.
fn bearer_key(authorization: Option<&str>) -> Option<&str> {
    let key = authorization?.strip_prefix("Bearer ")?.trim();
    if key.is_empty() {
        None
    } else {
        Some(key)
    }
}
