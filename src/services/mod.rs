//! Services module
//!
//! Este módulo contiene la lógica de negocio de la aplicación: tokens,
//! resolución de identidad, ciclo de vida de trips y trail de
//! ubicaciones.

pub mod auth_service;
pub mod location_service;
pub mod token_service;
pub mod trip_service;

pub use auth_service::{AuthContext, AuthService, RESOLUTION_ORDER};
pub use location_service::LocationService;
pub use token_service::TokenService;
pub use trip_service::TripService;

use uuid::Uuid;

use crate::models::trip::Trip;
use crate::storage::FleetStore;
use crate::utils::errors::{AppError, AppResult};

/// Buscar un trip y verificar que pertenece al operador que lo pide
pub(crate) async fn owned_trip(
    store: &dyn FleetStore,
    operator_id: Uuid,
    trip_id: Uuid,
) -> AppResult<Trip> {
    let trip = store
        .find_trip(trip_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Trip no encontrado".to_string()))?;

    if trip.operator_id != operator_id {
        return Err(AppError::Forbidden(
            "El trip no pertenece a este operador".to_string(),
        ));
    }
    Ok(trip)
}
