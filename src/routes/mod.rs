//! Ensamblado del router de la aplicación

pub mod auth_routes;
pub mod trip_routes;

use axum::{response::Json, routing::get, Router};
use serde_json::json;
use tower_http::trace::TraceLayer;

use crate::middleware::auth::auth_context_middleware;
use crate::middleware::cors::{cors_middleware, cors_middleware_with_origins};
use crate::state::AppState;

/// Construir el router completo de la aplicación.
///
/// Todo lo que cuelga de `/api` pasa por el middleware de autenticación,
/// que construye el `AuthContext` (anónimo incluido); `/health` queda
/// fuera para que el probe no dependa de headers.
pub fn create_app_router(state: AppState) -> Router {
    let api = Router::new()
        .nest("/auth", auth_routes::create_auth_router())
        .nest("/trips", trip_routes::create_trip_router())
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            auth_context_middleware,
        ));

    let cors = if state.config.cors_origins.is_empty() {
        cors_middleware()
    } else {
        cors_middleware_with_origins(state.config.cors_origins.clone())
    };

    Router::new()
        .route("/health", get(health))
        .nest("/api", api)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check simple
async fn health() -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "service": "fleet-operations",
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}
