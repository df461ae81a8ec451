//! Middleware de autenticación por token opaco
//!
//! Construye el `AuthContext` una sola vez por request (resolviendo el
//! bearer token contra los tres namespaces en orden fijo) y lo inyecta
//! como extension. Header ausente o malformado produce un contexto
//! anónimo y la request sigue; una clave presente pero inválida corta la
//! request aquí, antes de tocar ningún estado.

use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};

use crate::services::AuthService;
use crate::state::AppState;
use crate::utils::errors::AppError;

/// Middleware que resuelve el header Authorization a un `AuthContext`
pub async fn auth_context_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let authorization = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.to_string());

    let resolver = AuthService::new(state.store.clone());
    let ctx = resolver.resolve(authorization.as_deref()).await?;

    request.extensions_mut().insert(ctx);
    Ok(next.run(request).await)
}
