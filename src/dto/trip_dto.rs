//! DTOs de trips y waypoints

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::trip::{Trip, TripStatus};
use crate::models::waypoint::Waypoint;

// Request para crear un trip
#[derive(Debug, Deserialize)]
pub struct CreateTripRequest {
    pub vehicle_id: Uuid,
}

// Coordenadas de start/end y de waypoints. El rango se valida en los
// servicios con utils::validation::validate_coordinates.
#[derive(Debug, Deserialize)]
pub struct CoordinatesRequest {
    pub lat: f64,
    pub lng: f64,
}

/// Response de trip para la API
#[derive(Debug, Serialize)]
pub struct TripResponse {
    pub id: String,
    pub operator_id: String,
    pub vehicle_id: String,
    pub status: TripStatus,
    pub start_lat: Option<f64>,
    pub start_lng: Option<f64>,
    pub end_lat: Option<f64>,
    pub end_lng: Option<f64>,
    pub distance_km: f64,
    pub started_at: Option<String>,
    pub ended_at: Option<String>,
    pub created_at: String,
}

impl From<Trip> for TripResponse {
    fn from(trip: Trip) -> Self {
        Self {
            id: trip.id.to_string(),
            operator_id: trip.operator_id.to_string(),
            vehicle_id: trip.vehicle_id.to_string(),
            status: trip.status,
            start_lat: trip.start_lat,
            start_lng: trip.start_lng,
            end_lat: trip.end_lat,
            end_lng: trip.end_lng,
            distance_km: trip.distance_km,
            started_at: trip.started_at.map(|t| t.to_rfc3339()),
            ended_at: trip.ended_at.map(|t| t.to_rfc3339()),
            created_at: trip.created_at.to_rfc3339(),
        }
    }
}

/// Response de waypoint para la API
#[derive(Debug, Serialize)]
pub struct WaypointResponse {
    pub id: String,
    pub trip_id: String,
    pub latitude: f64,
    pub longitude: f64,
    pub timestamp: String,
}

impl From<Waypoint> for WaypointResponse {
    fn from(waypoint: Waypoint) -> Self {
        Self {
            id: waypoint.id.to_string(),
            trip_id: waypoint.trip_id.to_string(),
            latitude: waypoint.latitude,
            longitude: waypoint.longitude,
            timestamp: waypoint.timestamp.to_rfc3339(),
        }
    }
}
