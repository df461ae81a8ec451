//! Modelo de Vehicle
//!
//! Un vehículo pertenece a un Owner; la asignación a un operador es una
//! back-reference débil (borrar el vehículo anula la asignación del
//! operador, nunca borra al operador).

use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

/// Vehicle principal - mapea a la tabla vehicles
#[derive(Debug, Clone, FromRow)]
pub struct Vehicle {
    pub id: Uuid,
    pub owner_id: Uuid,
    /// Matrícula, única en todo el sistema
    pub vehicle_number: String,
    pub model: String,
    pub manufacturer: String,
    pub vehicle_type: String,
    pub year_of_manufacture: i32,
    pub current_odometer: i32,
    pub created_at: DateTime<Utc>,
}

impl Vehicle {
    pub fn new(
        owner_id: Uuid,
        vehicle_number: String,
        model: String,
        manufacturer: String,
        vehicle_type: String,
        year_of_manufacture: i32,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            owner_id,
            vehicle_number,
            model,
            manufacturer,
            vehicle_type,
            year_of_manufacture,
            current_odometer: 0,
            created_at: Utc::now(),
        }
    }
}
