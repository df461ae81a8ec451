//! Trail de ubicaciones de un trip
//!
//! Log append-only de waypoints, ordenado por timestamp. Solo admite
//! escrituras mientras el trip está `ongoing`. El trail no participa en
//! el cálculo de `distance_km` (esa distancia es solo entre los extremos
//! del trip); usarlo para refinar la distancia es un punto de extensión
//! documentado, no comportamiento actual.

use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::models::waypoint::Waypoint;
use crate::storage::{FleetStore, StorageError};
use crate::utils::errors::{invalid_transition, AppResult};
use crate::utils::validation::validate_coordinates;

use super::owned_trip;

/// LocationService encapsula el trail de waypoints
#[derive(Clone)]
pub struct LocationService {
    store: Arc<dyn FleetStore>,
}

impl LocationService {
    pub fn new(store: Arc<dyn FleetStore>) -> Self {
        Self { store }
    }

    /// Registrar un waypoint para un trip en curso. El chequeo de status
    /// y el insert son atómicos en el storage.
    pub async fn append(
        &self,
        operator_id: Uuid,
        trip_id: Uuid,
        lat: f64,
        lng: f64,
    ) -> AppResult<Waypoint> {
        validate_coordinates(lat, lng)?;
        owned_trip(self.store.as_ref(), operator_id, trip_id).await?;

        let waypoint = Waypoint::new(trip_id, lat, lng, Utc::now());
        match self.store.insert_waypoint(waypoint).await {
            Ok(waypoint) => Ok(waypoint),
            Err(StorageError::StatusConflict { actual }) => {
                Err(invalid_transition("record locations for", actual))
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Waypoints del trip en orden ascendente de timestamp
    pub async fn sequence(&self, operator_id: Uuid, trip_id: Uuid) -> AppResult<Vec<Waypoint>> {
        owned_trip(self.store.as_ref(), operator_id, trip_id).await?;
        Ok(self.store.waypoints_for_trip(trip_id).await?)
    }
}
