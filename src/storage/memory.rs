//! Backend de almacenamiento en memoria
//!
//! Implementación default sobre hashmaps, pensada para desarrollo y para
//! la suite de tests. Los datos se pierden al reiniciar.
//!
//! Todas las tablas viven bajo un único mutex: cada operación del trait es
//! una sección crítica completa, que es exactamente la atomicidad que piden
//! las transiciones de trips y el issue de tokens.

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::{FleetStore, StorageError};
use crate::models::principal::{Operator, Owner, PrincipalKind, Technician};
use crate::models::token::AccessToken;
use crate::models::trip::{Trip, TripPatch, TripStatus};
use crate::models::vehicle::Vehicle;
use crate::models::waypoint::Waypoint;

#[derive(Debug, Default)]
struct Tables {
    operators: HashMap<Uuid, Operator>,
    owners: HashMap<Uuid, Owner>,
    technicians: HashMap<Uuid, Technician>,
    vehicles: HashMap<Uuid, Vehicle>,
    operator_tokens: HashMap<String, AccessToken>,
    owner_tokens: HashMap<String, AccessToken>,
    technician_tokens: HashMap<String, AccessToken>,
    trips: HashMap<Uuid, Trip>,
    waypoints: Vec<Waypoint>,
}

impl Tables {
    fn token_table(&mut self, kind: PrincipalKind) -> &mut HashMap<String, AccessToken> {
        match kind {
            PrincipalKind::Operator => &mut self.operator_tokens,
            PrincipalKind::Owner => &mut self.owner_tokens,
            PrincipalKind::Technician => &mut self.technician_tokens,
        }
    }

    fn token_table_ref(&self, kind: PrincipalKind) -> &HashMap<String, AccessToken> {
        match kind {
            PrincipalKind::Operator => &self.operator_tokens,
            PrincipalKind::Owner => &self.owner_tokens,
            PrincipalKind::Technician => &self.technician_tokens,
        }
    }
}

/// Store en memoria
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn unique_violation(field: &str, value: &str) -> StorageError {
    StorageError::Conflict(format!("{} '{}' already exists", field, value))
}

#[async_trait]
impl FleetStore for MemoryStore {
    // =========================================================================
    // Principals
    // =========================================================================

    async fn insert_operator(&self, operator: Operator) -> Result<Operator, StorageError> {
        let mut tables = self.inner.lock().await;
        if tables.operators.values().any(|o| o.username == operator.username) {
            return Err(unique_violation("username", &operator.username));
        }
        if tables.operators.values().any(|o| o.email == operator.email) {
            return Err(unique_violation("email", &operator.email));
        }
        tables.operators.insert(operator.id, operator.clone());
        Ok(operator)
    }

    async fn find_operator(&self, id: Uuid) -> Result<Option<Operator>, StorageError> {
        let tables = self.inner.lock().await;
        Ok(tables.operators.get(&id).cloned())
    }

    async fn find_operator_by_username(
        &self,
        username: &str,
    ) -> Result<Option<Operator>, StorageError> {
        let tables = self.inner.lock().await;
        Ok(tables
            .operators
            .values()
            .find(|o| o.username == username)
            .cloned())
    }

    async fn insert_owner(&self, owner: Owner) -> Result<Owner, StorageError> {
        let mut tables = self.inner.lock().await;
        if tables.owners.values().any(|o| o.username == owner.username) {
            return Err(unique_violation("username", &owner.username));
        }
        if tables.owners.values().any(|o| o.email == owner.email) {
            return Err(unique_violation("email", &owner.email));
        }
        tables.owners.insert(owner.id, owner.clone());
        Ok(owner)
    }

    async fn find_owner(&self, id: Uuid) -> Result<Option<Owner>, StorageError> {
        let tables = self.inner.lock().await;
        Ok(tables.owners.get(&id).cloned())
    }

    async fn find_owner_by_username(
        &self,
        username: &str,
    ) -> Result<Option<Owner>, StorageError> {
        let tables = self.inner.lock().await;
        Ok(tables
            .owners
            .values()
            .find(|o| o.username == username)
            .cloned())
    }

    async fn insert_technician(
        &self,
        technician: Technician,
    ) -> Result<Technician, StorageError> {
        let mut tables = self.inner.lock().await;
        if tables
            .technicians
            .values()
            .any(|t| t.username == technician.username)
        {
            return Err(unique_violation("username", &technician.username));
        }
        if tables.technicians.values().any(|t| t.email == technician.email) {
            return Err(unique_violation("email", &technician.email));
        }
        tables.technicians.insert(technician.id, technician.clone());
        Ok(technician)
    }

    async fn find_technician(&self, id: Uuid) -> Result<Option<Technician>, StorageError> {
        let tables = self.inner.lock().await;
        Ok(tables.technicians.get(&id).cloned())
    }

    async fn find_technician_by_username(
        &self,
        username: &str,
    ) -> Result<Option<Technician>, StorageError> {
        let tables = self.inner.lock().await;
        Ok(tables
            .technicians
            .values()
            .find(|t| t.username == username)
            .cloned())
    }

    // =========================================================================
    // Vehicles
    // =========================================================================

    async fn insert_vehicle(&self, vehicle: Vehicle) -> Result<Vehicle, StorageError> {
        let mut tables = self.inner.lock().await;
        if tables
            .vehicles
            .values()
            .any(|v| v.vehicle_number == vehicle.vehicle_number)
        {
            return Err(unique_violation("vehicle_number", &vehicle.vehicle_number));
        }
        tables.vehicles.insert(vehicle.id, vehicle.clone());
        Ok(vehicle)
    }

    async fn find_vehicle(&self, id: Uuid) -> Result<Option<Vehicle>, StorageError> {
        let tables = self.inner.lock().await;
        Ok(tables.vehicles.get(&id).cloned())
    }

    async fn delete_vehicle(&self, id: Uuid) -> Result<bool, StorageError> {
        let mut tables = self.inner.lock().await;
        let removed = tables.vehicles.remove(&id).is_some();
        if removed {
            // la asignación es una back-reference débil: se anula, el
            // operador sobrevive
            for operator in tables.operators.values_mut() {
                if operator.vehicle_id == Some(id) {
                    operator.vehicle_id = None;
                }
            }
        }
        Ok(removed)
    }

    async fn assign_vehicle(
        &self,
        operator_id: Uuid,
        vehicle_id: Option<Uuid>,
    ) -> Result<Operator, StorageError> {
        let mut tables = self.inner.lock().await;
        if let Some(vid) = vehicle_id {
            if !tables.vehicles.contains_key(&vid) {
                return Err(StorageError::NotFound(format!("Vehicle {} not found", vid)));
            }
        }
        let operator = tables
            .operators
            .get_mut(&operator_id)
            .ok_or_else(|| StorageError::NotFound(format!("Operator {} not found", operator_id)))?;
        operator.vehicle_id = vehicle_id;
        Ok(operator.clone())
    }

    // =========================================================================
    // Tokens
    // =========================================================================

    async fn issue_token(
        &self,
        kind: PrincipalKind,
        candidate: AccessToken,
    ) -> Result<AccessToken, StorageError> {
        let mut tables = self.inner.lock().await;
        let table = tables.token_table(kind);

        if let Some(existing) = table
            .values()
            .find(|t| t.principal_id == candidate.principal_id && !t.is_expired())
        {
            return Ok(existing.clone());
        }

        table.insert(candidate.key.clone(), candidate.clone());
        Ok(candidate)
    }

    async fn find_token(
        &self,
        kind: PrincipalKind,
        key: &str,
    ) -> Result<Option<AccessToken>, StorageError> {
        let tables = self.inner.lock().await;
        Ok(tables.token_table_ref(kind).get(key).cloned())
    }

    async fn delete_token(&self, kind: PrincipalKind, key: &str) -> Result<bool, StorageError> {
        let mut tables = self.inner.lock().await;
        Ok(tables.token_table(kind).remove(key).is_some())
    }

    // =========================================================================
    // Trips
    // =========================================================================

    async fn insert_trip(&self, trip: Trip) -> Result<Trip, StorageError> {
        let mut tables = self.inner.lock().await;
        let has_active = tables
            .trips
            .values()
            .any(|t| t.operator_id == trip.operator_id && t.status.is_active());
        if has_active {
            return Err(StorageError::ActiveTripExists {
                operator_id: trip.operator_id,
            });
        }
        tables.trips.insert(trip.id, trip.clone());
        Ok(trip)
    }

    async fn find_trip(&self, id: Uuid) -> Result<Option<Trip>, StorageError> {
        let tables = self.inner.lock().await;
        Ok(tables.trips.get(&id).cloned())
    }

    async fn trips_for_operator(&self, operator_id: Uuid) -> Result<Vec<Trip>, StorageError> {
        let tables = self.inner.lock().await;
        let mut trips: Vec<Trip> = tables
            .trips
            .values()
            .filter(|t| t.operator_id == operator_id)
            .cloned()
            .collect();
        trips.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(trips)
    }

    async fn transition_trip(
        &self,
        trip_id: Uuid,
        expected: &[TripStatus],
        patch: TripPatch,
    ) -> Result<Trip, StorageError> {
        let mut tables = self.inner.lock().await;
        let trip = tables
            .trips
            .get_mut(&trip_id)
            .ok_or_else(|| StorageError::NotFound(format!("Trip {} not found", trip_id)))?;

        if !expected.contains(&trip.status) {
            return Err(StorageError::StatusConflict { actual: trip.status });
        }

        trip.apply(&patch);
        Ok(trip.clone())
    }

    // =========================================================================
    // Waypoints
    // =========================================================================

    async fn insert_waypoint(&self, waypoint: Waypoint) -> Result<Waypoint, StorageError> {
        let mut tables = self.inner.lock().await;
        let trip = tables
            .trips
            .get(&waypoint.trip_id)
            .ok_or_else(|| StorageError::NotFound(format!("Trip {} not found", waypoint.trip_id)))?;

        if trip.status != TripStatus::Ongoing {
            return Err(StorageError::StatusConflict { actual: trip.status });
        }

        tables.waypoints.push(waypoint.clone());
        Ok(waypoint)
    }

    async fn waypoints_for_trip(&self, trip_id: Uuid) -> Result<Vec<Waypoint>, StorageError> {
        let tables = self.inner.lock().await;
        let mut waypoints: Vec<Waypoint> = tables
            .waypoints
            .iter()
            .filter(|w| w.trip_id == trip_id)
            .cloned()
            .collect();
        waypoints.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
        Ok(waypoints)
    }
}
