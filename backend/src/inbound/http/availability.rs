//! Availability HTTP handler.
//!
//! ```text
//! GET /api/v1/availability?date=&vehicleId=&driverId=&excludeTripId=
//! ```

use actix_web::{get, web};
use serde::{Deserialize, Serialize};
use utoipa::IntoParams;

use crate::domain::ports::CheckAvailabilityRequest;
use crate::domain::{Availability, Error};
use crate::inbound::http::ApiResult;
use crate::inbound::http::state::HttpState;
use crate::inbound::http::validation::{FieldName, parse_date, parse_id, parse_optional_id};

/// Query parameters for an availability check.
#[derive(Debug, Clone, Deserialize, Serialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct AvailabilityQuery {
    /// Calendar date, `YYYY-MM-DD`.
    pub date: String,
    pub vehicle_id: String,
    pub driver_id: String,
    /// Trip to ignore, used when checking a reschedule.
    pub exclude_trip_id: Option<String>,
}

/// Report whether a vehicle and driver are both free on a date.
///
/// An unavailable answer is a `200` with `available: false`; the conflict
/// only becomes an error when a booking is attempted.
#[utoipa::path(
    get,
    path = "/api/v1/availability",
    params(AvailabilityQuery),
    responses(
        (status = 200, description = "Availability answer", body = Availability),
        (status = 400, description = "Invalid query", body = Error)
    ),
    tags = ["availability"],
    operation_id = "checkAvailability"
)]
#[get("/availability")]
pub async fn check_availability(
    state: web::Data<HttpState>,
    query: web::Query<AvailabilityQuery>,
) -> ApiResult<web::Json<Availability>> {
    let request = CheckAvailabilityRequest {
        date: parse_date(&query.date, FieldName::new("date"))?,
        vehicle_id: parse_id(&query.vehicle_id, FieldName::new("vehicleId"))?,
        driver_id: parse_id(&query.driver_id, FieldName::new("driverId"))?,
        exclude_trip_id: parse_optional_id(
            query.exclude_trip_id.as_deref(),
            FieldName::new("excludeTripId"),
        )?,
    };
    let response = state.trips_query.check_availability(request).await?;
    Ok(web::Json(response))
}
