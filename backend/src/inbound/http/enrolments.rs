//! Enrolment and waitlist HTTP handlers.
//!
//! ```text
//! POST   /api/v1/trips/{tripId}/enrolments
//! DELETE /api/v1/trips/{tripId}/patients/{patientId}
//! GET    /api/v1/trips/{tripId}/waitlist
//! POST   /api/v1/waitlist/{entryId}/response
//! ```

use std::str::FromStr;

use actix_web::{HttpResponse, delete, get, post, web};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::domain::ports::{
    EnrollPatientRequest, EnrollPatientResponse, EnrollmentStatus, ListWaitlistRequest,
    ListWaitlistResponse, RemovePatientRequest, RemovePatientResponse, RespondToCallRequest,
    RespondToCallResponse,
};
use crate::domain::{Error, PriorityTier};
use crate::inbound::http::ApiResult;
use crate::inbound::http::state::HttpState;
use crate::inbound::http::trips::parse_trip_id;
use crate::inbound::http::validation::{
    FieldName, invalid_choice_error, parse_id, parse_optional_id,
};

/// Request payload for enrolling a patient.
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EnrollPatientRequestBody {
    #[schema(format = "uuid")]
    pub patient_id: String,
    #[serde(default)]
    pub has_companion: bool,
    #[schema(format = "uuid")]
    pub companion_id: Option<String>,
    /// Waitlist tier applied when the trip is full.
    #[schema(example = "high")]
    pub priority: Option<String>,
    #[schema(example = "dialysis session")]
    pub motive: Option<String>,
}

/// Query parameters for removing a patient.
#[derive(Debug, Clone, Deserialize, Serialize, IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct RemovePatientQuery {
    /// Recorded on the cancelled entry.
    pub reason: Option<String>,
}

/// Request payload for answering a waitlist call.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RespondToCallRequestBody {
    pub accept: bool,
}

fn parse_priority(raw: Option<&str>) -> Result<Option<PriorityTier>, Error> {
    raw.map(|value| {
        PriorityTier::from_str(value).map_err(|_| {
            invalid_choice_error(FieldName::new("priority"), value, "high, medium, normal")
        })
    })
    .transpose()
}

/// Seat a patient or add them to the waitlist when the trip is full.
///
/// Responds `201 Created` when a seat was reserved and `202 Accepted` when
/// the patient was waitlisted.
#[utoipa::path(
    post,
    path = "/api/v1/trips/{trip_id}/enrolments",
    params(("trip_id" = String, Path, description = "Trip identifier")),
    request_body = EnrollPatientRequestBody,
    responses(
        (status = 201, description = "Patient seated", body = EnrollPatientResponse),
        (status = 202, description = "Patient waitlisted", body = EnrollPatientResponse),
        (status = 400, description = "Invalid request", body = Error),
        (status = 404, description = "Trip, patient or companion not found", body = Error),
        (status = 409, description = "Patient already enrolled or waitlisted", body = Error),
        (status = 422, description = "Trip closed for enrolment or patient inactive", body = Error)
    ),
    tags = ["enrolments"],
    operation_id = "enrollPatient"
)]
#[post("/trips/{trip_id}/enrolments")]
pub async fn enroll_patient(
    state: web::Data<HttpState>,
    path: web::Path<String>,
    payload: web::Json<EnrollPatientRequestBody>,
) -> ApiResult<HttpResponse> {
    let body = payload.into_inner();
    let request = EnrollPatientRequest {
        trip_id: parse_trip_id(&path)?,
        patient_id: parse_id(&body.patient_id, FieldName::new("patientId"))?,
        has_companion: body.has_companion,
        companion_id: parse_optional_id(body.companion_id.as_deref(), FieldName::new("companionId"))?,
        priority: parse_priority(body.priority.as_deref())?,
        motive: body.motive,
    };
    let response = state.trips.enroll_patient(request).await?;
    let mut builder = match response.outcome {
        EnrollmentStatus::Enrolled => HttpResponse::Created(),
        EnrollmentStatus::Waitlisted => HttpResponse::Accepted(),
    };
    Ok(builder.json(response))
}

/// Take a patient off a trip's roster or waitlist.
#[utoipa::path(
    delete,
    path = "/api/v1/trips/{trip_id}/patients/{patient_id}",
    params(
        ("trip_id" = String, Path, description = "Trip identifier"),
        ("patient_id" = String, Path, description = "Patient identifier"),
        RemovePatientQuery
    ),
    responses(
        (status = 200, description = "Patient removed", body = RemovePatientResponse),
        (status = 400, description = "Invalid identifier", body = Error),
        (status = 404, description = "Trip not found or patient not on it", body = Error),
        (status = 422, description = "Patient already boarded", body = Error)
    ),
    tags = ["enrolments"],
    operation_id = "removePatient"
)]
#[delete("/trips/{trip_id}/patients/{patient_id}")]
pub async fn remove_patient(
    state: web::Data<HttpState>,
    path: web::Path<(String, String)>,
    query: web::Query<RemovePatientQuery>,
) -> ApiResult<web::Json<RemovePatientResponse>> {
    let (trip_id, patient_id) = path.into_inner();
    let request = RemovePatientRequest {
        trip_id: parse_trip_id(&trip_id)?,
        patient_id: parse_id(&patient_id, FieldName::new("patientId"))?,
        reason: query.into_inner().reason,
    };
    let response = state.trips.remove_patient(request).await?;
    Ok(web::Json(response))
}

/// List a trip's waitlist in promotion order.
#[utoipa::path(
    get,
    path = "/api/v1/trips/{trip_id}/waitlist",
    params(("trip_id" = String, Path, description = "Trip identifier")),
    responses(
        (status = 200, description = "Waitlist", body = ListWaitlistResponse),
        (status = 404, description = "Trip not found", body = Error)
    ),
    tags = ["waitlist"],
    operation_id = "listWaitlist"
)]
#[get("/trips/{trip_id}/waitlist")]
pub async fn list_waitlist(
    state: web::Data<HttpState>,
    path: web::Path<String>,
) -> ApiResult<web::Json<ListWaitlistResponse>> {
    let trip_id = parse_trip_id(&path)?;
    let response = state
        .trips_query
        .list_waitlist(ListWaitlistRequest { trip_id })
        .await?;
    Ok(web::Json(response))
}

/// Accept or decline a waitlist call.
///
/// A response after the deadline is not an error: the outcome is `expired`.
#[utoipa::path(
    post,
    path = "/api/v1/waitlist/{entry_id}/response",
    params(("entry_id" = String, Path, description = "Waitlist entry identifier")),
    request_body = RespondToCallRequestBody,
    responses(
        (status = 200, description = "Response recorded", body = RespondToCallResponse),
        (status = 404, description = "Waitlist entry not found", body = Error),
        (status = 422, description = "Entry was not called", body = Error)
    ),
    tags = ["waitlist"],
    operation_id = "respondToCall"
)]
#[post("/waitlist/{entry_id}/response")]
pub async fn respond_to_call(
    state: web::Data<HttpState>,
    path: web::Path<String>,
    payload: web::Json<RespondToCallRequestBody>,
) -> ApiResult<web::Json<RespondToCallResponse>> {
    let request = RespondToCallRequest {
        entry_id: parse_id(&path, FieldName::new("entryId"))?,
        accept: payload.accept,
    };
    let response = state.trips.respond_to_call(request).await?;
    Ok(web::Json(response))
}

#[cfg(test)]
#[path = "enrolments_tests.rs"]
mod tests;
