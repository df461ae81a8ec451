//! Rutas de autenticación

use axum::{extract::State, routing::post, Extension, Json, Router};
use serde_json::json;

use crate::controllers::auth_controller::AuthController;
use crate::dto::auth_dto::{LoginRequest, LoginResponse};
use crate::dto::ApiResponse;
use crate::models::principal::PrincipalKind;
use crate::services::AuthContext;
use crate::state::AppState;
use crate::utils::errors::AppError;

pub fn create_auth_router() -> Router<AppState> {
    Router::new()
        .route("/login/operator", post(login_operator))
        .route("/login/owner", post(login_owner))
        .route("/login/technician", post(login_technician))
        .route("/logout", post(logout))
}

async fn login_operator(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<ApiResponse<LoginResponse>>, AppError> {
    login(state, PrincipalKind::Operator, request).await
}

async fn login_owner(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<ApiResponse<LoginResponse>>, AppError> {
    login(state, PrincipalKind::Owner, request).await
}

async fn login_technician(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<ApiResponse<LoginResponse>>, AppError> {
    login(state, PrincipalKind::Technician, request).await
}

async fn login(
    state: AppState,
    kind: PrincipalKind,
    request: LoginRequest,
) -> Result<Json<ApiResponse<LoginResponse>>, AppError> {
    let controller = AuthController::new(state.store.clone(), state.config.token_ttl_days);
    let response = controller.login(kind, request).await?;
    Ok(Json(response))
}

async fn logout(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
) -> Result<Json<serde_json::Value>, AppError> {
    let controller = AuthController::new(state.store.clone(), state.config.token_ttl_days);
    controller.logout(&ctx).await?;
    Ok(Json(json!({
        "success": true,
        "message": "Logout successful"
    })))
}
