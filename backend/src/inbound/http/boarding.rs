//! Boarding HTTP handlers.
//!
//! ```text
//! POST /api/v1/passengers/{entryId}/check-in
//! POST /api/v1/passengers/{entryId}/check-out
//! ```

use actix_web::{post, web};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::ports::{BoardingResponse, RecordBoardingRequest};
use crate::domain::{Error, PassengerEntryId};
use crate::inbound::http::ApiResult;
use crate::inbound::http::state::HttpState;
use crate::inbound::http::validation::{FieldName, parse_id, parse_optional_rfc3339_timestamp};

/// Request payload for a boarding event. Both fields are optional.
#[derive(Debug, Clone, Default, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BoardingRequestBody {
    /// Defaults to the server clock.
    #[schema(format = "date-time")]
    pub at: Option<String>,
    #[schema(example = "Main entrance, Hospital São José")]
    pub location: Option<String>,
}

fn parse_boarding(
    raw_entry_id: &str,
    body: Option<web::Json<BoardingRequestBody>>,
) -> Result<RecordBoardingRequest, Error> {
    let entry_id: PassengerEntryId = parse_id(raw_entry_id, FieldName::new("entryId"))?;
    let body = body.map(web::Json::into_inner).unwrap_or_default();
    Ok(RecordBoardingRequest {
        entry_id,
        at: parse_optional_rfc3339_timestamp(body.at.as_deref(), FieldName::new("at"))?,
        location: body.location,
    })
}

/// Record that a passenger boarded.
#[utoipa::path(
    post,
    path = "/api/v1/passengers/{entry_id}/check-in",
    params(("entry_id" = String, Path, description = "Roster entry identifier")),
    request_body(content = BoardingRequestBody, description = "Optional time and place"),
    responses(
        (status = 200, description = "Check-in recorded", body = BoardingResponse),
        (status = 400, description = "Invalid request", body = Error),
        (status = 404, description = "Roster entry not found", body = Error),
        (status = 422, description = "Passenger cannot check in from this state", body = Error)
    ),
    tags = ["boarding"],
    operation_id = "checkIn"
)]
#[post("/passengers/{entry_id}/check-in")]
pub async fn check_in(
    state: web::Data<HttpState>,
    path: web::Path<String>,
    payload: Option<web::Json<BoardingRequestBody>>,
) -> ApiResult<web::Json<BoardingResponse>> {
    let request = parse_boarding(&path, payload)?;
    let response = state.trips.check_in(request).await?;
    Ok(web::Json(response))
}

/// Record that a passenger left the vehicle.
#[utoipa::path(
    post,
    path = "/api/v1/passengers/{entry_id}/check-out",
    params(("entry_id" = String, Path, description = "Roster entry identifier")),
    request_body(content = BoardingRequestBody, description = "Optional time and place"),
    responses(
        (status = 200, description = "Check-out recorded", body = BoardingResponse),
        (status = 400, description = "Invalid request", body = Error),
        (status = 404, description = "Roster entry not found", body = Error),
        (status = 422, description = "Passenger has not checked in", body = Error)
    ),
    tags = ["boarding"],
    operation_id = "checkOut"
)]
#[post("/passengers/{entry_id}/check-out")]
pub async fn check_out(
    state: web::Data<HttpState>,
    path: web::Path<String>,
    payload: Option<web::Json<BoardingRequestBody>>,
) -> ApiResult<web::Json<BoardingResponse>> {
    let request = parse_boarding(&path, payload)?;
    let response = state.trips.check_out(request).await?;
    Ok(web::Json(response))
}
