//! Abstracción de almacenamiento
//!
//! Este módulo define el trait `FleetStore` con los dos backends del
//! sistema: en memoria (default, desarrollo y tests) y PostgreSQL.
//!
//! El trait expone primitivas atómicas, no pares get/set: el chequeo de
//! "un solo trip activo por operador", el compare-and-swap sobre el status
//! de un trip y el get-or-create de tokens se ejecutan como una unidad
//! indivisible dentro del backend. Dos `create` concurrentes para el mismo
//! operador ven exactamente un éxito; dos transiciones concurrentes sobre
//! el mismo trip se serializan y la segunda observa el post-estado.

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PostgresStore;

use async_trait::async_trait;
use uuid::Uuid;

use crate::models::principal::{Operator, Owner, PrincipalKind, Technician};
use crate::models::token::AccessToken;
use crate::models::trip::{Trip, TripPatch, TripStatus};
use crate::models::vehicle::Vehicle;
use crate::models::waypoint::Waypoint;

/// Error del backend de almacenamiento
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    /// El operador ya tiene un trip en estado pending u ongoing
    #[error("Operator {operator_id} already has an active trip")]
    ActiveTripExists { operator_id: Uuid },

    /// El status actual del trip no coincide con ninguno de los esperados
    #[error("Trip status is '{actual}'")]
    StatusConflict { actual: TripStatus },

    #[error("Database error: {0}")]
    Database(String),
}

/// Backend de almacenamiento del sistema.
///
/// Las implementaciones deben ser thread-safe y soportar acceso concurrente.
#[async_trait]
pub trait FleetStore: Send + Sync {
    // =========================================================================
    // Principals (una tabla por variante, sin identidad compartida)
    // =========================================================================

    async fn insert_operator(&self, operator: Operator) -> Result<Operator, StorageError>;
    async fn find_operator(&self, id: Uuid) -> Result<Option<Operator>, StorageError>;
    async fn find_operator_by_username(
        &self,
        username: &str,
    ) -> Result<Option<Operator>, StorageError>;

    async fn insert_owner(&self, owner: Owner) -> Result<Owner, StorageError>;
    async fn find_owner(&self, id: Uuid) -> Result<Option<Owner>, StorageError>;
    async fn find_owner_by_username(&self, username: &str)
        -> Result<Option<Owner>, StorageError>;

    async fn insert_technician(&self, technician: Technician)
        -> Result<Technician, StorageError>;
    async fn find_technician(&self, id: Uuid) -> Result<Option<Technician>, StorageError>;
    async fn find_technician_by_username(
        &self,
        username: &str,
    ) -> Result<Option<Technician>, StorageError>;

    // =========================================================================
    // Vehicles
    // =========================================================================

    async fn insert_vehicle(&self, vehicle: Vehicle) -> Result<Vehicle, StorageError>;
    async fn find_vehicle(&self, id: Uuid) -> Result<Option<Vehicle>, StorageError>;

    /// Borrar un vehículo. La asignación de cualquier operador a este
    /// vehículo queda en NULL; el operador nunca se borra.
    async fn delete_vehicle(&self, id: Uuid) -> Result<bool, StorageError>;

    /// Asignar (o desasignar con `None`) un vehículo a un operador
    async fn assign_vehicle(
        &self,
        operator_id: Uuid,
        vehicle_id: Option<Uuid>,
    ) -> Result<Operator, StorageError>;

    // =========================================================================
    // Tokens (una tabla por variante; la clave solo vale en su namespace)
    // =========================================================================

    /// Get-or-create atómico por principal: si existe un token vivo para el
    /// principal de `candidate`, se devuelve ese; si no, se inserta
    /// `candidate`. Dos logins concurrentes no crean dos tokens vivos.
    async fn issue_token(
        &self,
        kind: PrincipalKind,
        candidate: AccessToken,
    ) -> Result<AccessToken, StorageError>;

    async fn find_token(
        &self,
        kind: PrincipalKind,
        key: &str,
    ) -> Result<Option<AccessToken>, StorageError>;

    /// Borrar un token. Devuelve `false` si la clave no existía
    /// (idempotente en esta capa).
    async fn delete_token(&self, kind: PrincipalKind, key: &str) -> Result<bool, StorageError>;

    // =========================================================================
    // Trips
    // =========================================================================

    /// Insertar un trip nuevo. Falla con `ActiveTripExists` si el operador
    /// ya tiene un trip en {pending, ongoing}; el chequeo y el insert son
    /// una sola unidad atómica.
    async fn insert_trip(&self, trip: Trip) -> Result<Trip, StorageError>;

    async fn find_trip(&self, id: Uuid) -> Result<Option<Trip>, StorageError>;

    async fn trips_for_operator(&self, operator_id: Uuid) -> Result<Vec<Trip>, StorageError>;

    /// Compare-and-swap sobre el status: aplica `patch` solo si el status
    /// actual está en `expected`; si no, falla con `StatusConflict`
    /// indicando el status observado.
    async fn transition_trip(
        &self,
        trip_id: Uuid,
        expected: &[TripStatus],
        patch: TripPatch,
    ) -> Result<Trip, StorageError>;

    // =========================================================================
    // Waypoints
    // =========================================================================

    /// Append de un waypoint. Solo se permite mientras el trip está
    /// `ongoing`; el chequeo de status y el insert son atómicos.
    async fn insert_waypoint(&self, waypoint: Waypoint) -> Result<Waypoint, StorageError>;

    /// Waypoints de un trip, ordenados por timestamp ascendente
    async fn waypoints_for_trip(&self, trip_id: Uuid) -> Result<Vec<Waypoint>, StorageError>;
}
