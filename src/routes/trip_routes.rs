//! Rutas de trips y del trail de ubicaciones
//!
//! Todas requieren un token de operador; el `AuthContext` lo inyecta el
//! middleware de autenticación y aquí se exige la variante con un
//! pattern match.

use axum::{
    extract::{Path, State},
    routing::{get, post},
    Extension, Json, Router,
};
use uuid::Uuid;

use crate::controllers::trip_controller::TripController;
use crate::dto::trip_dto::{
    CoordinatesRequest, CreateTripRequest, TripResponse, WaypointResponse,
};
use crate::dto::ApiResponse;
use crate::services::AuthContext;
use crate::state::AppState;
use crate::utils::errors::AppError;

pub fn create_trip_router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_trip).get(list_trips))
        .route("/:id", get(get_trip))
        .route("/:id/start", post(start_trip))
        .route("/:id/end", post(end_trip))
        .route("/:id/cancel", post(cancel_trip))
        .route("/:id/locations", post(append_location).get(list_locations))
}

async fn create_trip(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Json(request): Json<CreateTripRequest>,
) -> Result<Json<ApiResponse<TripResponse>>, AppError> {
    let operator = ctx.require_operator()?;
    let controller = TripController::new(state.store.clone());
    let response = controller.create(operator, request).await?;
    Ok(Json(response))
}

async fn list_trips(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
) -> Result<Json<Vec<TripResponse>>, AppError> {
    let operator = ctx.require_operator()?;
    let controller = TripController::new(state.store.clone());
    let response = controller.list(operator).await?;
    Ok(Json(response))
}

async fn get_trip(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> Result<Json<TripResponse>, AppError> {
    let operator = ctx.require_operator()?;
    let controller = TripController::new(state.store.clone());
    let response = controller.get(operator, id).await?;
    Ok(Json(response))
}

async fn start_trip(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    Json(request): Json<CoordinatesRequest>,
) -> Result<Json<ApiResponse<TripResponse>>, AppError> {
    let operator = ctx.require_operator()?;
    let controller = TripController::new(state.store.clone());
    let response = controller.start(operator, id, request).await?;
    Ok(Json(response))
}

async fn end_trip(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    Json(request): Json<CoordinatesRequest>,
) -> Result<Json<ApiResponse<TripResponse>>, AppError> {
    let operator = ctx.require_operator()?;
    let controller = TripController::new(state.store.clone());
    let response = controller.end(operator, id, request).await?;
    Ok(Json(response))
}

async fn cancel_trip(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<TripResponse>>, AppError> {
    let operator = ctx.require_operator()?;
    let controller = TripController::new(state.store.clone());
    let response = controller.cancel(operator, id).await?;
    Ok(Json(response))
}

async fn append_location(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    Json(request): Json<CoordinatesRequest>,
) -> Result<Json<ApiResponse<WaypointResponse>>, AppError> {
    let operator = ctx.require_operator()?;
    let controller = TripController::new(state.store.clone());
    let response = controller.append_location(operator, id, request).await?;
    Ok(Json(response))
}

async fn list_locations(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<WaypointResponse>>, AppError> {
    let operator = ctx.require_operator()?;
    let controller = TripController::new(state.store.clone());
    let response = controller.list_locations(operator, id).await?;
    Ok(Json(response))
}
