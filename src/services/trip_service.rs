//! Máquina de estados de trips
//!
//! `pending → ongoing → {completed, cancelled}`. Cada transición es un
//! comando explícito que valida, calcula y persiste en un solo paso
//! atómico; no hay side effects escondidos en hooks de persistencia.

use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::models::principal::Operator;
use crate::models::trip::{Trip, TripPatch, TripStatus};
use crate::storage::{FleetStore, StorageError};
use crate::utils::errors::{invalid_transition, validation_error, AppError, AppResult};
use crate::utils::geo::haversine_km;
use crate::utils::validation::validate_coordinates;

use super::owned_trip;

/// TripService encapsula el ciclo de vida de los trips
#[derive(Clone)]
pub struct TripService {
    store: Arc<dyn FleetStore>,
}

impl TripService {
    pub fn new(store: Arc<dyn FleetStore>) -> Self {
        Self { store }
    }

    /// Crear un trip en `pending` para un operador y su vehículo asignado.
    ///
    /// Precondiciones: el operador está asignado a ese vehículo, está
    /// disponible y no tiene otro trip activo. Cada violación falla con
    /// un error de validación que nombra la precondición; el chequeo de
    /// trip activo y el insert son atómicos en el storage, así que de dos
    /// creates concurrentes solo uno puede tener éxito.
    pub async fn create(&self, operator: &Operator, vehicle_id: Uuid) -> AppResult<Trip> {
        let vehicle = self
            .store
            .find_vehicle(vehicle_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Vehículo no encontrado".to_string()))?;

        if operator.vehicle_id != Some(vehicle.id) {
            return Err(validation_error(
                "vehicle_id",
                "Operator is not assigned to this vehicle",
            ));
        }
        if !operator.is_available {
            return Err(validation_error("operator", "Operator is not available"));
        }

        let trip = Trip::new(operator.id, vehicle_id);
        match self.store.insert_trip(trip).await {
            Ok(trip) => {
                log::info!("Trip {} creado para operador {}", trip.id, operator.id);
                Ok(trip)
            }
            Err(StorageError::ActiveTripExists { .. }) => Err(validation_error(
                "operator",
                "Operator already has an active trip",
            )),
            Err(err) => Err(err.into()),
        }
    }

    /// Iniciar un trip: `pending → ongoing`, fijando coordenadas de
    /// salida y `started_at`.
    pub async fn start(
        &self,
        operator_id: Uuid,
        trip_id: Uuid,
        lat: f64,
        lng: f64,
    ) -> AppResult<Trip> {
        validate_coordinates(lat, lng)?;

        let trip = owned_trip(self.store.as_ref(), operator_id, trip_id).await?;
        if !trip.status.can_start() {
            return Err(invalid_transition("start", trip.status));
        }

        let patch = TripPatch::start(lat, lng, Utc::now());
        self.apply(trip_id, &[TripStatus::Pending], patch, "start")
            .await
    }

    /// Terminar un trip: `ongoing → completed`. Calcula `distance_km`
    /// con haversine entre las coordenadas de salida y llegada; si el
    /// trip no tiene coordenadas de salida la distancia queda en 0.0.
    pub async fn end(
        &self,
        operator_id: Uuid,
        trip_id: Uuid,
        lat: f64,
        lng: f64,
    ) -> AppResult<Trip> {
        validate_coordinates(lat, lng)?;

        let trip = owned_trip(self.store.as_ref(), operator_id, trip_id).await?;
        if !trip.status.can_end() {
            return Err(invalid_transition("end", trip.status));
        }

        // las coordenadas de salida quedaron fijadas al pasar a ongoing y
        // ya no cambian, así que leerlas antes del CAS es seguro
        let distance_km = match (trip.start_lat, trip.start_lng) {
            (Some(start_lat), Some(start_lng)) => haversine_km(start_lat, start_lng, lat, lng),
            _ => 0.0,
        };

        let patch = TripPatch::end(lat, lng, distance_km, Utc::now());
        self.apply(trip_id, &[TripStatus::Ongoing], patch, "end").await
    }

    /// Cancelar un trip activo. No calcula distancia.
    pub async fn cancel(&self, operator_id: Uuid, trip_id: Uuid) -> AppResult<Trip> {
        let trip = owned_trip(self.store.as_ref(), operator_id, trip_id).await?;
        if !trip.status.can_cancel() {
            return Err(invalid_transition("cancel", trip.status));
        }

        self.apply(
            trip_id,
            &[TripStatus::Pending, TripStatus::Ongoing],
            TripPatch::cancel(),
            "cancel",
        )
        .await
    }

    /// Trip de un operador, con chequeo de propiedad
    pub async fn get(&self, operator_id: Uuid, trip_id: Uuid) -> AppResult<Trip> {
        owned_trip(self.store.as_ref(), operator_id, trip_id).await
    }

    /// Trips del operador, más recientes primero
    pub async fn list(&self, operator_id: Uuid) -> AppResult<Vec<Trip>> {
        Ok(self.store.trips_for_operator(operator_id).await?)
    }

    /// Ejecutar el compare-and-swap de la transición. Si otro comando
    /// concurrente ganó la carrera, el status observado ya no está en
    /// `expected` y la transición se reporta como ilegal.
    async fn apply(
        &self,
        trip_id: Uuid,
        expected: &[TripStatus],
        patch: TripPatch,
        action: &str,
    ) -> AppResult<Trip> {
        match self.store.transition_trip(trip_id, expected, patch).await {
            Ok(trip) => {
                log::info!("Trip {} → {}", trip.id, trip.status);
                Ok(trip)
            }
            Err(StorageError::StatusConflict { actual }) => {
                Err(invalid_transition(action, actual))
            }
            Err(err) => Err(err.into()),
        }
    }
}
