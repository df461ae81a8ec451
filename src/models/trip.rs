//! Modelo de Trip y su máquina de estados
//!
//! El ciclo de vida es `pending → ongoing → {completed, cancelled}`.
//! `pending` es el estado inicial; `completed` y `cancelled` son terminales.
//! Un trip nunca se borra, solo transiciona a `cancelled`.
//!
//! La legalidad de las transiciones se decide aquí, de forma pura; la
//! atomicidad frente a operaciones concurrentes la aporta el storage
//! (compare-and-swap sobre el campo status).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use uuid::Uuid;

/// Estado del trip - mapea al ENUM trip_status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[sqlx(type_name = "trip_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TripStatus {
    Pending,
    Ongoing,
    Completed,
    Cancelled,
}

impl TripStatus {
    /// Un trip activo es el que todavía no alcanzó un estado terminal.
    /// Un operador puede tener como máximo un trip activo a la vez.
    pub fn is_active(self) -> bool {
        matches!(self, TripStatus::Pending | TripStatus::Ongoing)
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, TripStatus::Completed | TripStatus::Cancelled)
    }

    pub fn can_start(self) -> bool {
        self == TripStatus::Pending
    }

    pub fn can_end(self) -> bool {
        self == TripStatus::Ongoing
    }

    pub fn can_cancel(self) -> bool {
        self.is_active()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TripStatus::Pending => "pending",
            TripStatus::Ongoing => "ongoing",
            TripStatus::Completed => "completed",
            TripStatus::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for TripStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Trip principal - mapea a la tabla trips
#[derive(Debug, Clone, FromRow)]
pub struct Trip {
    pub id: Uuid,
    pub operator_id: Uuid,
    pub vehicle_id: Uuid,
    pub status: TripStatus,
    pub start_lat: Option<f64>,
    pub start_lng: Option<f64>,
    pub end_lat: Option<f64>,
    pub end_lng: Option<f64>,
    pub distance_km: f64,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Trip {
    /// Crear un trip nuevo en estado `pending`, sin coordenadas
    pub fn new(operator_id: Uuid, vehicle_id: Uuid) -> Self {
        Self {
            id: Uuid::new_v4(),
            operator_id,
            vehicle_id,
            status: TripStatus::Pending,
            start_lat: None,
            start_lng: None,
            end_lat: None,
            end_lng: None,
            distance_km: 0.0,
            started_at: None,
            ended_at: None,
            created_at: Utc::now(),
        }
    }

    /// Aplicar un patch de transición sobre la copia en memoria
    pub fn apply(&mut self, patch: &TripPatch) {
        self.status = patch.status;
        if let Some(v) = patch.start_lat {
            self.start_lat = Some(v);
        }
        if let Some(v) = patch.start_lng {
            self.start_lng = Some(v);
        }
        if let Some(v) = patch.end_lat {
            self.end_lat = Some(v);
        }
        if let Some(v) = patch.end_lng {
            self.end_lng = Some(v);
        }
        if let Some(v) = patch.distance_km {
            self.distance_km = v;
        }
        if let Some(v) = patch.started_at {
            self.started_at = Some(v);
        }
        if let Some(v) = patch.ended_at {
            self.ended_at = Some(v);
        }
    }
}

/// Escritura de una transición de estado. Los campos `None` no se tocan.
#[derive(Debug, Clone)]
pub struct TripPatch {
    pub status: TripStatus,
    pub start_lat: Option<f64>,
    pub start_lng: Option<f64>,
    pub end_lat: Option<f64>,
    pub end_lng: Option<f64>,
    pub distance_km: Option<f64>,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
}

impl TripPatch {
    /// Transición `pending → ongoing`
    pub fn start(lat: f64, lng: f64, at: DateTime<Utc>) -> Self {
        Self {
            status: TripStatus::Ongoing,
            start_lat: Some(lat),
            start_lng: Some(lng),
            end_lat: None,
            end_lng: None,
            distance_km: None,
            started_at: Some(at),
            ended_at: None,
        }
    }

    /// Transición `ongoing → completed` con la distancia ya calculada
    pub fn end(lat: f64, lng: f64, distance_km: f64, at: DateTime<Utc>) -> Self {
        Self {
            status: TripStatus::Completed,
            start_lat: None,
            start_lng: None,
            end_lat: Some(lat),
            end_lng: Some(lng),
            distance_km: Some(distance_km),
            started_at: None,
            ended_at: Some(at),
        }
    }

    /// Transición a `cancelled`, sin distancia
    pub fn cancel() -> Self {
        Self {
            status: TripStatus::Cancelled,
            start_lat: None,
            start_lng: None,
            end_lat: None,
            end_lng: None,
            distance_km: None,
            started_at: None,
            ended_at: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transition_legality() {
        assert!(TripStatus::Pending.can_start());
        assert!(!TripStatus::Ongoing.can_start());
        assert!(!TripStatus::Completed.can_start());
        assert!(!TripStatus::Cancelled.can_start());

        assert!(TripStatus::Ongoing.can_end());
        assert!(!TripStatus::Pending.can_end());
        assert!(!TripStatus::Completed.can_end());
        assert!(!TripStatus::Cancelled.can_end());

        assert!(TripStatus::Pending.can_cancel());
        assert!(TripStatus::Ongoing.can_cancel());
        assert!(!TripStatus::Completed.can_cancel());
        assert!(!TripStatus::Cancelled.can_cancel());
    }

    #[test]
    fn test_active_status() {
        assert!(TripStatus::Pending.is_active());
        assert!(TripStatus::Ongoing.is_active());
        assert!(!TripStatus::Completed.is_active());
        assert!(!TripStatus::Cancelled.is_active());
    }

    #[test]
    fn test_new_trip_defaults() {
        let trip = Trip::new(Uuid::new_v4(), Uuid::new_v4());
        assert_eq!(trip.status, TripStatus::Pending);
        assert_eq!(trip.distance_km, 0.0);
        assert!(trip.start_lat.is_none());
        assert!(trip.started_at.is_none());
    }

    #[test]
    fn test_apply_start_patch() {
        let mut trip = Trip::new(Uuid::new_v4(), Uuid::new_v4());
        let at = Utc::now();
        trip.apply(&TripPatch::start(10.0, 20.0, at));

        assert_eq!(trip.status, TripStatus::Ongoing);
        assert_eq!(trip.start_lat, Some(10.0));
        assert_eq!(trip.start_lng, Some(20.0));
        assert_eq!(trip.started_at, Some(at));
        // end no se toca
        assert!(trip.end_lat.is_none());
    }

    #[test]
    fn test_apply_end_patch_keeps_start() {
        let mut trip = Trip::new(Uuid::new_v4(), Uuid::new_v4());
        trip.apply(&TripPatch::start(10.0, 20.0, Utc::now()));
        trip.apply(&TripPatch::end(10.1, 20.1, 15.25, Utc::now()));

        assert_eq!(trip.status, TripStatus::Completed);
        assert_eq!(trip.start_lat, Some(10.0));
        assert_eq!(trip.end_lat, Some(10.1));
        assert_eq!(trip.distance_km, 15.25);
    }
}
