//! Trip lifecycle HTTP handlers.
//!
//! ```text
//! POST /api/v1/trips
//! GET  /api/v1/trips/{tripId}
//! PUT  /api/v1/trips/{tripId}/schedule
//! PUT  /api/v1/trips/{tripId}/capacity
//! POST /api/v1/trips/{tripId}/confirm
//! POST /api/v1/trips/{tripId}/start
//! POST /api/v1/trips/{tripId}/complete
//! POST /api/v1/trips/{tripId}/cancel
//! ```

use actix_web::{HttpResponse, get, post, put, web};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::ports::{
    CancelTripRequest, CancelTripResponse, CompleteTripResponse, CreateTripRequest,
    GetTripRequest, RescheduleTripRequest, ResizeTripRequest, TripChangeResponse, TripResponse,
    TripTransitionRequest,
};
use crate::domain::{Error, TripCategory, TripId};
use crate::inbound::http::ApiResult;
use crate::inbound::http::state::HttpState;
use crate::inbound::http::validation::{
    FieldName, invalid_choice_error, parse_date, parse_id, parse_optional_id, parse_time,
};

/// Request payload for scheduling a trip.
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateTripRequestBody {
    #[schema(example = "group")]
    pub category: String,
    #[schema(format = "date", example = "2026-03-02")]
    pub date: String,
    #[schema(example = "07:30")]
    pub departure: String,
    #[schema(format = "uuid")]
    pub vehicle_id: String,
    #[schema(format = "uuid")]
    pub driver_id: String,
    /// Defaults to the vehicle's capacity.
    pub capacity: Option<u32>,
}

/// Request payload for moving a trip.
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RescheduleTripRequestBody {
    #[schema(format = "date", example = "2026-03-03")]
    pub date: String,
    #[schema(example = "08:00")]
    pub departure: String,
    #[schema(format = "uuid")]
    pub vehicle_id: Option<String>,
    #[schema(format = "uuid")]
    pub driver_id: Option<String>,
}

/// Request payload for changing a trip's capacity.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ResizeTripRequestBody {
    pub capacity: u32,
}

/// Request payload for cancelling a trip.
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CancelTripRequestBody {
    #[schema(example = "vehicle breakdown")]
    pub reason: String,
}

pub(crate) fn parse_trip_id(raw: &str) -> Result<TripId, Error> {
    parse_id(raw, FieldName::new("tripId"))
}

fn parse_category(raw: &str) -> Result<TripCategory, Error> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "group" => Ok(TripCategory::Group),
        "individual" => Ok(TripCategory::Individual),
        _ => Err(invalid_choice_error(
            FieldName::new("category"),
            raw,
            "group, individual",
        )),
    }
}

fn parse_create_request(body: &CreateTripRequestBody) -> Result<CreateTripRequest, Error> {
    Ok(CreateTripRequest {
        category: parse_category(&body.category)?,
        date: parse_date(&body.date, FieldName::new("date"))?,
        departure: parse_time(&body.departure, FieldName::new("departure"))?,
        vehicle_id: parse_id(&body.vehicle_id, FieldName::new("vehicleId"))?,
        driver_id: parse_id(&body.driver_id, FieldName::new("driverId"))?,
        capacity: body.capacity,
    })
}

/// Schedule a trip after checking vehicle and driver availability.
#[utoipa::path(
    post,
    path = "/api/v1/trips",
    request_body = CreateTripRequestBody,
    responses(
        (status = 201, description = "Trip scheduled", body = TripResponse),
        (status = 400, description = "Invalid request", body = Error),
        (status = 404, description = "Vehicle or driver not found", body = Error),
        (status = 409, description = "Vehicle or driver already booked", body = Error),
        (status = 422, description = "Driver inactive", body = Error),
        (status = 503, description = "Service unavailable", body = Error)
    ),
    tags = ["trips"],
    operation_id = "createTrip"
)]
#[post("/trips")]
pub async fn create_trip(
    state: web::Data<HttpState>,
    payload: web::Json<CreateTripRequestBody>,
) -> ApiResult<HttpResponse> {
    let request = parse_create_request(&payload)?;
    let response = state.trips.create_trip(request).await?;
    Ok(HttpResponse::Created().json(response))
}

/// Fetch a trip with its roster, waitlist and seat counters.
#[utoipa::path(
    get,
    path = "/api/v1/trips/{trip_id}",
    params(("trip_id" = String, Path, description = "Trip identifier")),
    responses(
        (status = 200, description = "Trip", body = TripResponse),
        (status = 400, description = "Invalid trip id", body = Error),
        (status = 404, description = "Trip not found", body = Error)
    ),
    tags = ["trips"],
    operation_id = "getTrip"
)]
#[get("/trips/{trip_id}")]
pub async fn get_trip(
    state: web::Data<HttpState>,
    path: web::Path<String>,
) -> ApiResult<web::Json<TripResponse>> {
    let trip_id = parse_trip_id(&path)?;
    let response = state.trips_query.get_trip(GetTripRequest { trip_id }).await?;
    Ok(web::Json(response))
}

/// Move a trip to another date, time, vehicle or driver.
#[utoipa::path(
    put,
    path = "/api/v1/trips/{trip_id}/schedule",
    params(("trip_id" = String, Path, description = "Trip identifier")),
    request_body = RescheduleTripRequestBody,
    responses(
        (status = 200, description = "Trip rescheduled", body = TripChangeResponse),
        (status = 400, description = "Invalid request", body = Error),
        (status = 404, description = "Trip, vehicle or driver not found", body = Error),
        (status = 409, description = "Vehicle or driver already booked", body = Error),
        (status = 422, description = "Trip can no longer be rescheduled", body = Error)
    ),
    tags = ["trips"],
    operation_id = "rescheduleTrip"
)]
#[put("/trips/{trip_id}/schedule")]
pub async fn reschedule_trip(
    state: web::Data<HttpState>,
    path: web::Path<String>,
    payload: web::Json<RescheduleTripRequestBody>,
) -> ApiResult<web::Json<TripChangeResponse>> {
    let request = RescheduleTripRequest {
        trip_id: parse_trip_id(&path)?,
        date: parse_date(&payload.date, FieldName::new("date"))?,
        departure: parse_time(&payload.departure, FieldName::new("departure"))?,
        vehicle_id: parse_optional_id(payload.vehicle_id.as_deref(), FieldName::new("vehicleId"))?,
        driver_id: parse_optional_id(payload.driver_id.as_deref(), FieldName::new("driverId"))?,
    };
    let response = state.trips.reschedule_trip(request).await?;
    Ok(web::Json(response))
}

/// Change a scheduled trip's capacity.
#[utoipa::path(
    put,
    path = "/api/v1/trips/{trip_id}/capacity",
    params(("trip_id" = String, Path, description = "Trip identifier")),
    request_body = ResizeTripRequestBody,
    responses(
        (status = 200, description = "Capacity changed", body = TripChangeResponse),
        (status = 400, description = "Capacity out of range", body = Error),
        (status = 404, description = "Trip not found", body = Error),
        (status = 422, description = "Capacity below occupied seats or trip not scheduled", body = Error)
    ),
    tags = ["trips"],
    operation_id = "resizeTrip"
)]
#[put("/trips/{trip_id}/capacity")]
pub async fn resize_trip(
    state: web::Data<HttpState>,
    path: web::Path<String>,
    payload: web::Json<ResizeTripRequestBody>,
) -> ApiResult<web::Json<TripChangeResponse>> {
    let request = ResizeTripRequest {
        trip_id: parse_trip_id(&path)?,
        capacity: payload.capacity,
    };
    let response = state.trips.resize_trip(request).await?;
    Ok(web::Json(response))
}

/// Confirm a scheduled trip.
#[utoipa::path(
    post,
    path = "/api/v1/trips/{trip_id}/confirm",
    params(("trip_id" = String, Path, description = "Trip identifier")),
    responses(
        (status = 200, description = "Trip confirmed", body = TripResponse),
        (status = 404, description = "Trip not found", body = Error),
        (status = 422, description = "Trip is not scheduled", body = Error)
    ),
    tags = ["trips"],
    operation_id = "confirmTrip"
)]
#[post("/trips/{trip_id}/confirm")]
pub async fn confirm_trip(
    state: web::Data<HttpState>,
    path: web::Path<String>,
) -> ApiResult<web::Json<TripResponse>> {
    let trip_id = parse_trip_id(&path)?;
    let response = state
        .trips
        .confirm_trip(TripTransitionRequest { trip_id })
        .await?;
    Ok(web::Json(response))
}

/// Mark a confirmed trip as departed.
#[utoipa::path(
    post,
    path = "/api/v1/trips/{trip_id}/start",
    params(("trip_id" = String, Path, description = "Trip identifier")),
    responses(
        (status = 200, description = "Trip started", body = TripResponse),
        (status = 404, description = "Trip not found", body = Error),
        (status = 422, description = "Trip is not confirmed", body = Error)
    ),
    tags = ["trips"],
    operation_id = "startTrip"
)]
#[post("/trips/{trip_id}/start")]
pub async fn start_trip(
    state: web::Data<HttpState>,
    path: web::Path<String>,
) -> ApiResult<web::Json<TripResponse>> {
    let trip_id = parse_trip_id(&path)?;
    let response = state
        .trips
        .start_trip(TripTransitionRequest { trip_id })
        .await?;
    Ok(web::Json(response))
}

/// Complete a trip and mark unboarded passengers as no-shows.
#[utoipa::path(
    post,
    path = "/api/v1/trips/{trip_id}/complete",
    params(("trip_id" = String, Path, description = "Trip identifier")),
    responses(
        (status = 200, description = "Trip completed", body = CompleteTripResponse),
        (status = 404, description = "Trip not found", body = Error),
        (status = 422, description = "Trip cannot be completed", body = Error)
    ),
    tags = ["trips"],
    operation_id = "completeTrip"
)]
#[post("/trips/{trip_id}/complete")]
pub async fn complete_trip(
    state: web::Data<HttpState>,
    path: web::Path<String>,
) -> ApiResult<web::Json<CompleteTripResponse>> {
    let trip_id = parse_trip_id(&path)?;
    let response = state
        .trips
        .complete_trip(TripTransitionRequest { trip_id })
        .await?;
    Ok(web::Json(response))
}

/// Cancel a trip with every passenger and waitlist entry on it.
#[utoipa::path(
    post,
    path = "/api/v1/trips/{trip_id}/cancel",
    params(("trip_id" = String, Path, description = "Trip identifier")),
    request_body = CancelTripRequestBody,
    responses(
        (status = 200, description = "Trip cancelled", body = CancelTripResponse),
        (status = 400, description = "Reason missing", body = Error),
        (status = 404, description = "Trip not found", body = Error),
        (status = 422, description = "Trip already finished", body = Error)
    ),
    tags = ["trips"],
    operation_id = "cancelTrip"
)]
#[post("/trips/{trip_id}/cancel")]
pub async fn cancel_trip(
    state: web::Data<HttpState>,
    path: web::Path<String>,
    payload: web::Json<CancelTripRequestBody>,
) -> ApiResult<web::Json<CancelTripResponse>> {
    let request = CancelTripRequest {
        trip_id: parse_trip_id(&path)?,
        reason: payload.into_inner().reason,
    };
    let response = state.trips.cancel_trip(request).await?;
    Ok(web::Json(response))
}

#[cfg(test)]
#[path = "trips_tests.rs"]
mod tests;
