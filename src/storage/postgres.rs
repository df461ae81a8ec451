//! Backend de almacenamiento PostgreSQL
//!
//! Implementación sobre sqlx. La atomicidad de las transiciones se
//! consigue con transacciones que releen el estado bajo `FOR UPDATE`
//! inmediatamente antes de escribir; el issue de tokens y el insert de
//! trips se serializan por principal bloqueando su fila.
//!
//! Schema en `migrations/0001_schema.sql`: una tabla de tokens por
//! variante de principal, una tabla de principals por variante, trips y
//! trip_locations.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

use super::{FleetStore, StorageError};
use crate::models::principal::{Operator, Owner, PrincipalKind, Technician};
use crate::models::token::AccessToken;
use crate::models::trip::{Trip, TripPatch, TripStatus};
use crate::models::vehicle::Vehicle;
use crate::models::waypoint::Waypoint;

/// Store sobre PostgreSQL
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn token_table(kind: PrincipalKind) -> &'static str {
        match kind {
            PrincipalKind::Operator => "operator_tokens",
            PrincipalKind::Owner => "owner_tokens",
            PrincipalKind::Technician => "technician_tokens",
        }
    }

    fn principal_table(kind: PrincipalKind) -> &'static str {
        match kind {
            PrincipalKind::Operator => "operators",
            PrincipalKind::Owner => "owners",
            PrincipalKind::Technician => "technicians",
        }
    }
}

fn db_err(err: sqlx::Error) -> StorageError {
    if let sqlx::Error::Database(ref db) = err {
        if matches!(db.kind(), sqlx::error::ErrorKind::UniqueViolation) {
            return StorageError::Conflict(db.message().to_string());
        }
    }
    StorageError::Database(err.to_string())
}

#[async_trait]
impl FleetStore for PostgresStore {
    // =========================================================================
    // Principals
    // =========================================================================

    async fn insert_operator(&self, operator: Operator) -> Result<Operator, StorageError> {
        sqlx::query_as::<_, Operator>(
            r#"
            INSERT INTO operators
                (id, username, email, phone_number, password_hash, licence_number,
                 vehicle_id, is_available, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING *
            "#,
        )
        .bind(operator.id)
        .bind(operator.username)
        .bind(operator.email)
        .bind(operator.phone_number)
        .bind(operator.password_hash)
        .bind(operator.licence_number)
        .bind(operator.vehicle_id)
        .bind(operator.is_available)
        .bind(operator.created_at)
        .bind(operator.updated_at)
        .fetch_one(&self.pool)
        .await
        .map_err(db_err)
    }

    async fn find_operator(&self, id: Uuid) -> Result<Option<Operator>, StorageError> {
        sqlx::query_as::<_, Operator>("SELECT * FROM operators WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)
    }

    async fn find_operator_by_username(
        &self,
        username: &str,
    ) -> Result<Option<Operator>, StorageError> {
        sqlx::query_as::<_, Operator>("SELECT * FROM operators WHERE username = $1")
            .bind(username)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)
    }

    async fn insert_owner(&self, owner: Owner) -> Result<Owner, StorageError> {
        sqlx::query_as::<_, Owner>(
            r#"
            INSERT INTO owners
                (id, username, email, phone_number, password_hash, address,
                 created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
            "#,
        )
        .bind(owner.id)
        .bind(owner.username)
        .bind(owner.email)
        .bind(owner.phone_number)
        .bind(owner.password_hash)
        .bind(owner.address)
        .bind(owner.created_at)
        .bind(owner.updated_at)
        .fetch_one(&self.pool)
        .await
        .map_err(db_err)
    }

    async fn find_owner(&self, id: Uuid) -> Result<Option<Owner>, StorageError> {
        sqlx::query_as::<_, Owner>("SELECT * FROM owners WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)
    }

    async fn find_owner_by_username(
        &self,
        username: &str,
    ) -> Result<Option<Owner>, StorageError> {
        sqlx::query_as::<_, Owner>("SELECT * FROM owners WHERE username = $1")
            .bind(username)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)
    }

    async fn insert_technician(
        &self,
        technician: Technician,
    ) -> Result<Technician, StorageError> {
        sqlx::query_as::<_, Technician>(
            r#"
            INSERT INTO technicians
                (id, username, email, phone_number, password_hash, speciality,
                 location, is_available, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING *
            "#,
        )
        .bind(technician.id)
        .bind(technician.username)
        .bind(technician.email)
        .bind(technician.phone_number)
        .bind(technician.password_hash)
        .bind(technician.speciality)
        .bind(technician.location)
        .bind(technician.is_available)
        .bind(technician.created_at)
        .bind(technician.updated_at)
        .fetch_one(&self.pool)
        .await
        .map_err(db_err)
    }

    async fn find_technician(&self, id: Uuid) -> Result<Option<Technician>, StorageError> {
        sqlx::query_as::<_, Technician>("SELECT * FROM technicians WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)
    }

    async fn find_technician_by_username(
        &self,
        username: &str,
    ) -> Result<Option<Technician>, StorageError> {
        sqlx::query_as::<_, Technician>("SELECT * FROM technicians WHERE username = $1")
            .bind(username)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)
    }

    // =========================================================================
    // Vehicles
    // =========================================================================

    async fn insert_vehicle(&self, vehicle: Vehicle) -> Result<Vehicle, StorageError> {
        sqlx::query_as::<_, Vehicle>(
            r#"
            INSERT INTO vehicles
                (id, owner_id, vehicle_number, model, manufacturer, vehicle_type,
                 year_of_manufacture, current_odometer, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING *
            "#,
        )
        .bind(vehicle.id)
        .bind(vehicle.owner_id)
        .bind(vehicle.vehicle_number)
        .bind(vehicle.model)
        .bind(vehicle.manufacturer)
        .bind(vehicle.vehicle_type)
        .bind(vehicle.year_of_manufacture)
        .bind(vehicle.current_odometer)
        .bind(vehicle.created_at)
        .fetch_one(&self.pool)
        .await
        .map_err(db_err)
    }

    async fn find_vehicle(&self, id: Uuid) -> Result<Option<Vehicle>, StorageError> {
        sqlx::query_as::<_, Vehicle>("SELECT * FROM vehicles WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)
    }

    async fn delete_vehicle(&self, id: Uuid) -> Result<bool, StorageError> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        // anular la asignación débil antes de borrar la fila
        sqlx::query("UPDATE operators SET vehicle_id = NULL WHERE vehicle_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;

        let result = sqlx::query("DELETE FROM vehicles WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;

        tx.commit().await.map_err(db_err)?;
        Ok(result.rows_affected() > 0)
    }

    async fn assign_vehicle(
        &self,
        operator_id: Uuid,
        vehicle_id: Option<Uuid>,
    ) -> Result<Operator, StorageError> {
        if let Some(vid) = vehicle_id {
            self.find_vehicle(vid)
                .await?
                .ok_or_else(|| StorageError::NotFound(format!("Vehicle {} not found", vid)))?;
        }

        sqlx::query_as::<_, Operator>(
            "UPDATE operators SET vehicle_id = $2, updated_at = $3 WHERE id = $1 RETURNING *",
        )
        .bind(operator_id)
        .bind(vehicle_id)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?
        .ok_or_else(|| StorageError::NotFound(format!("Operator {} not found", operator_id)))
    }

    // =========================================================================
    // Tokens
    // =========================================================================

    async fn issue_token(
        &self,
        kind: PrincipalKind,
        candidate: AccessToken,
    ) -> Result<AccessToken, StorageError> {
        let token_table = Self::token_table(kind);
        let principal_table = Self::principal_table(kind);

        let mut tx = self.pool.begin().await.map_err(db_err)?;

        // bloquear la fila del principal serializa los logins concurrentes
        // del mismo principal: solo uno puede crear el token nuevo
        let locked = format!("SELECT id FROM {} WHERE id = $1 FOR UPDATE", principal_table);
        let principal: Option<(Uuid,)> = sqlx::query_as(&locked)
            .bind(candidate.principal_id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(db_err)?;
        if principal.is_none() {
            return Err(StorageError::NotFound(format!(
                "{} {} not found",
                kind, candidate.principal_id
            )));
        }

        let live = format!(
            "SELECT * FROM {} WHERE principal_id = $1 AND expires > $2 \
             ORDER BY created DESC LIMIT 1",
            token_table
        );
        let existing: Option<AccessToken> = sqlx::query_as(&live)
            .bind(candidate.principal_id)
            .bind(Utc::now())
            .fetch_optional(&mut *tx)
            .await
            .map_err(db_err)?;

        if let Some(token) = existing {
            tx.commit().await.map_err(db_err)?;
            return Ok(token);
        }

        let insert = format!(
            "INSERT INTO {} (key, principal_id, created, expires) \
             VALUES ($1, $2, $3, $4) RETURNING *",
            token_table
        );
        let token: AccessToken = sqlx::query_as(&insert)
            .bind(candidate.key)
            .bind(candidate.principal_id)
            .bind(candidate.created)
            .bind(candidate.expires)
            .fetch_one(&mut *tx)
            .await
            .map_err(db_err)?;

        tx.commit().await.map_err(db_err)?;
        Ok(token)
    }

    async fn find_token(
        &self,
        kind: PrincipalKind,
        key: &str,
    ) -> Result<Option<AccessToken>, StorageError> {
        let sql = format!("SELECT * FROM {} WHERE key = $1", Self::token_table(kind));
        sqlx::query_as(&sql)
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)
    }

    async fn delete_token(&self, kind: PrincipalKind, key: &str) -> Result<bool, StorageError> {
        let sql = format!("DELETE FROM {} WHERE key = $1", Self::token_table(kind));
        let result = sqlx::query(&sql)
            .bind(key)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(result.rows_affected() > 0)
    }

    // =========================================================================
    // Trips
    // =========================================================================

    async fn insert_trip(&self, trip: Trip) -> Result<Trip, StorageError> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        // serializar los creates concurrentes del mismo operador: el
        // chequeo de trip activo y el insert forman una sola unidad
        sqlx::query("SELECT id FROM operators WHERE id = $1 FOR UPDATE")
            .bind(trip.operator_id)
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;

        let (has_active,): (bool,) = sqlx::query_as(
            "SELECT EXISTS(SELECT 1 FROM trips WHERE operator_id = $1 AND status IN ($2, $3))",
        )
        .bind(trip.operator_id)
        .bind(TripStatus::Pending)
        .bind(TripStatus::Ongoing)
        .fetch_one(&mut *tx)
        .await
        .map_err(db_err)?;

        if has_active {
            return Err(StorageError::ActiveTripExists {
                operator_id: trip.operator_id,
            });
        }

        let inserted = sqlx::query_as::<_, Trip>(
            r#"
            INSERT INTO trips
                (id, operator_id, vehicle_id, status, start_lat, start_lng,
                 end_lat, end_lng, distance_km, started_at, ended_at, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            RETURNING *
            "#,
        )
        .bind(trip.id)
        .bind(trip.operator_id)
        .bind(trip.vehicle_id)
        .bind(trip.status)
        .bind(trip.start_lat)
        .bind(trip.start_lng)
        .bind(trip.end_lat)
        .bind(trip.end_lng)
        .bind(trip.distance_km)
        .bind(trip.started_at)
        .bind(trip.ended_at)
        .bind(trip.created_at)
        .fetch_one(&mut *tx)
        .await
        .map_err(db_err)?;

        tx.commit().await.map_err(db_err)?;
        Ok(inserted)
    }

    async fn find_trip(&self, id: Uuid) -> Result<Option<Trip>, StorageError> {
        sqlx::query_as::<_, Trip>("SELECT * FROM trips WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)
    }

    async fn trips_for_operator(&self, operator_id: Uuid) -> Result<Vec<Trip>, StorageError> {
        sqlx::query_as::<_, Trip>(
            "SELECT * FROM trips WHERE operator_id = $1 ORDER BY created_at DESC",
        )
        .bind(operator_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)
    }

    async fn transition_trip(
        &self,
        trip_id: Uuid,
        expected: &[TripStatus],
        patch: TripPatch,
    ) -> Result<Trip, StorageError> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        // releer el status bajo lock justo antes de escribir: el CAS
        let current = sqlx::query_as::<_, Trip>("SELECT * FROM trips WHERE id = $1 FOR UPDATE")
            .bind(trip_id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(db_err)?
            .ok_or_else(|| StorageError::NotFound(format!("Trip {} not found", trip_id)))?;

        if !expected.contains(&current.status) {
            return Err(StorageError::StatusConflict {
                actual: current.status,
            });
        }

        let updated = sqlx::query_as::<_, Trip>(
            r#"
            UPDATE trips SET
                status = $2,
                start_lat = COALESCE($3, start_lat),
                start_lng = COALESCE($4, start_lng),
                end_lat = COALESCE($5, end_lat),
                end_lng = COALESCE($6, end_lng),
                distance_km = COALESCE($7, distance_km),
                started_at = COALESCE($8, started_at),
                ended_at = COALESCE($9, ended_at)
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(trip_id)
        .bind(patch.status)
        .bind(patch.start_lat)
        .bind(patch.start_lng)
        .bind(patch.end_lat)
        .bind(patch.end_lng)
        .bind(patch.distance_km)
        .bind(patch.started_at)
        .bind(patch.ended_at)
        .fetch_one(&mut *tx)
        .await
        .map_err(db_err)?;

        tx.commit().await.map_err(db_err)?;
        Ok(updated)
    }

    // =========================================================================
    // Waypoints
    // =========================================================================

    async fn insert_waypoint(&self, waypoint: Waypoint) -> Result<Waypoint, StorageError> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        let trip = sqlx::query_as::<_, Trip>("SELECT * FROM trips WHERE id = $1 FOR UPDATE")
            .bind(waypoint.trip_id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(db_err)?
            .ok_or_else(|| {
                StorageError::NotFound(format!("Trip {} not found", waypoint.trip_id))
            })?;

        if trip.status != TripStatus::Ongoing {
            return Err(StorageError::StatusConflict { actual: trip.status });
        }

        let inserted = sqlx::query_as::<_, Waypoint>(
            r#"
            INSERT INTO trip_locations (id, trip_id, latitude, longitude, "timestamp")
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(waypoint.id)
        .bind(waypoint.trip_id)
        .bind(waypoint.latitude)
        .bind(waypoint.longitude)
        .bind(waypoint.timestamp)
        .fetch_one(&mut *tx)
        .await
        .map_err(db_err)?;

        tx.commit().await.map_err(db_err)?;
        Ok(inserted)
    }

    async fn waypoints_for_trip(&self, trip_id: Uuid) -> Result<Vec<Waypoint>, StorageError> {
        sqlx::query_as::<_, Waypoint>(
            r#"SELECT * FROM trip_locations WHERE trip_id = $1 ORDER BY "timestamp" ASC"#,
        )
        .bind(trip_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)
    }
}
