//! Waypoint de un trip
//!
//! Muestras de posición registradas durante un trip en curso. Append-only:
//! una vez escritas son inmutables, y se leen siempre ordenadas por
//! timestamp ascendente.

use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

/// Una fila de la tabla trip_locations
#[derive(Debug, Clone, FromRow)]
pub struct Waypoint {
    pub id: Uuid,
    pub trip_id: Uuid,
    pub latitude: f64,
    pub longitude: f64,
    pub timestamp: DateTime<Utc>,
}

impl Waypoint {
    pub fn new(trip_id: Uuid, latitude: f64, longitude: f64, timestamp: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            trip_id,
            latitude,
            longitude,
            timestamp,
        }
    }
}
