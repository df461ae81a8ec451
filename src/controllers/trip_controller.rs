//! Controller de trips
//!
//! Adapta los DTOs del boundary HTTP a los servicios de trips y del
//! trail de ubicaciones. El chequeo de propiedad (el trip pertenece al
//! operador autenticado) vive en los servicios.

use std::sync::Arc;

use uuid::Uuid;

use crate::dto::trip_dto::{
    CoordinatesRequest, CreateTripRequest, TripResponse, WaypointResponse,
};
use crate::dto::ApiResponse;
use crate::models::principal::Operator;
use crate::services::{LocationService, TripService};
use crate::storage::FleetStore;
use crate::utils::errors::AppResult;

pub struct TripController {
    trips: TripService,
    locations: LocationService,
}

impl TripController {
    pub fn new(store: Arc<dyn FleetStore>) -> Self {
        Self {
            trips: TripService::new(store.clone()),
            locations: LocationService::new(store),
        }
    }

    pub async fn create(
        &self,
        operator: &Operator,
        request: CreateTripRequest,
    ) -> AppResult<ApiResponse<TripResponse>> {
        let trip = self.trips.create(operator, request.vehicle_id).await?;
        Ok(ApiResponse::success_with_message(
            trip.into(),
            "Trip creado exitosamente".to_string(),
        ))
    }

    pub async fn list(&self, operator: &Operator) -> AppResult<Vec<TripResponse>> {
        let trips = self.trips.list(operator.id).await?;
        Ok(trips.into_iter().map(TripResponse::from).collect())
    }

    pub async fn get(&self, operator: &Operator, trip_id: Uuid) -> AppResult<TripResponse> {
        let trip = self.trips.get(operator.id, trip_id).await?;
        Ok(trip.into())
    }

    pub async fn start(
        &self,
        operator: &Operator,
        trip_id: Uuid,
        request: CoordinatesRequest,
    ) -> AppResult<ApiResponse<TripResponse>> {
        let trip = self
            .trips
            .start(operator.id, trip_id, request.lat, request.lng)
            .await?;
        Ok(ApiResponse::success_with_message(
            trip.into(),
            "Trip iniciado exitosamente".to_string(),
        ))
    }

    pub async fn end(
        &self,
        operator: &Operator,
        trip_id: Uuid,
        request: CoordinatesRequest,
    ) -> AppResult<ApiResponse<TripResponse>> {
        let trip = self
            .trips
            .end(operator.id, trip_id, request.lat, request.lng)
            .await?;
        let message = format!("Trip completado: {} km", trip.distance_km);
        Ok(ApiResponse::success_with_message(trip.into(), message))
    }

    pub async fn cancel(
        &self,
        operator: &Operator,
        trip_id: Uuid,
    ) -> AppResult<ApiResponse<TripResponse>> {
        let trip = self.trips.cancel(operator.id, trip_id).await?;
        Ok(ApiResponse::success_with_message(
            trip.into(),
            "Trip cancelado".to_string(),
        ))
    }

    pub async fn append_location(
        &self,
        operator: &Operator,
        trip_id: Uuid,
        request: CoordinatesRequest,
    ) -> AppResult<ApiResponse<WaypointResponse>> {
        let waypoint = self
            .locations
            .append(operator.id, trip_id, request.lat, request.lng)
            .await?;
        Ok(ApiResponse::success(waypoint.into()))
    }

    pub async fn list_locations(
        &self,
        operator: &Operator,
        trip_id: Uuid,
    ) -> AppResult<Vec<WaypointResponse>> {
        let waypoints = self.locations.sequence(operator.id, trip_id).await?;
        Ok(waypoints.into_iter().map(WaypointResponse::from).collect())
    }
}
