//! Tests for enrolment and waitlist HTTP handlers.

use std::sync::Arc;

use actix_web::http::StatusCode;
use actix_web::{App, test as actix_test, web};
use chrono::{TimeZone, Utc};
use rstest::rstest;
use serde_json::{Value, json};

use super::*;
use crate::domain::ports::{
    CallOutcome, MockTripCommand, MockTripQuery, PromotionPayload, RemovalStatus,
};
use crate::domain::{PassengerEntryId, PatientId, TripId, WaitlistEntryId};

const TRIP_ID: &str = "3fa85f64-5717-4562-b3fc-2c963f66afa6";
const PATIENT_ID: &str = "9b2d7f0e-3c41-4a6e-8f55-6d0c1a7e0b01";
const ENTRY_ID: &str = "9b2d7f0e-3c41-4a6e-8f55-6d0c1a7e0b99";

fn trip_id() -> TripId {
    TRIP_ID.parse().expect("valid trip id")
}

fn test_app(
    command: MockTripCommand,
    query: MockTripQuery,
) -> App<
    impl actix_web::dev::ServiceFactory<
        actix_web::dev::ServiceRequest,
        Config = (),
        Response = actix_web::dev::ServiceResponse,
        Error = actix_web::Error,
        InitError = (),
    >,
> {
    let state = HttpState::new(Arc::new(command), Arc::new(query));
    App::new()
        .app_data(web::Data::new(state))
        .service(web::scope("/api/v1").configure(crate::inbound::http::configure_api))
}

fn enrolled() -> EnrollPatientResponse {
    EnrollPatientResponse {
        trip_id: trip_id(),
        outcome: EnrollmentStatus::Enrolled,
        passenger_entry_id: Some(PassengerEntryId::random()),
        waitlist_entry_id: None,
        tier: None,
        sequence: None,
        seats_available: 2,
    }
}

fn waitlisted() -> EnrollPatientResponse {
    EnrollPatientResponse {
        trip_id: trip_id(),
        outcome: EnrollmentStatus::Waitlisted,
        passenger_entry_id: None,
        waitlist_entry_id: Some(WaitlistEntryId::random()),
        tier: Some(PriorityTier::High),
        sequence: Some(3),
        seats_available: 0,
    }
}

#[rstest]
#[case(enrolled(), StatusCode::CREATED)]
#[case(waitlisted(), StatusCode::ACCEPTED)]
#[actix_web::test]
async fn enrolment_status_reflects_outcome(
    #[case] outcome: EnrollPatientResponse,
    #[case] expected: StatusCode,
) {
    let mut command = MockTripCommand::new();
    command
        .expect_enroll_patient()
        .withf(|request| {
            request.patient_id.to_string() == PATIENT_ID
                && request.has_companion
                && request.priority == Some(PriorityTier::High)
        })
        .times(1)
        .return_once(move |_| Ok(outcome));

    let app = actix_test::init_service(test_app(command, MockTripQuery::new())).await;
    let res = actix_test::call_service(
        &app,
        actix_test::TestRequest::post()
            .uri(&format!("/api/v1/trips/{TRIP_ID}/enrolments"))
            .set_json(json!({
                "patientId": PATIENT_ID,
                "hasCompanion": true,
                "priority": "high",
                "motive": "chemotherapy",
            }))
            .to_request(),
    )
    .await;

    assert_eq!(res.status(), expected);
}

#[actix_web::test]
async fn enrolment_rejects_unknown_priority() {
    let mut command = MockTripCommand::new();
    command.expect_enroll_patient().times(0);

    let app = actix_test::init_service(test_app(command, MockTripQuery::new())).await;
    let res = actix_test::call_service(
        &app,
        actix_test::TestRequest::post()
            .uri(&format!("/api/v1/trips/{TRIP_ID}/enrolments"))
            .set_json(json!({"patientId": PATIENT_ID, "priority": "urgent"}))
            .to_request(),
    )
    .await;

    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = actix_test::read_body_json(res).await;
    assert_eq!(body["details"]["field"], "priority");
}

#[actix_web::test]
async fn remove_patient_forwards_reason_query() {
    let mut command = MockTripCommand::new();
    command
        .expect_remove_patient()
        .withf(|request| {
            request.patient_id.to_string() == PATIENT_ID
                && request.reason.as_deref() == Some("hospitalised")
        })
        .times(1)
        .return_once(|request| {
            Ok(RemovePatientResponse {
                trip_id: request.trip_id,
                outcome: RemovalStatus::PassengerCancelled,
                passenger_entry_id: Some(PassengerEntryId::random()),
                waitlist_entry_id: None,
                seats_released: 2,
                seats_available: 2,
                promotion: Some(PromotionPayload {
                    waitlist_entry_id: WaitlistEntryId::random(),
                    patient_id: PatientId::random(),
                    response_deadline: Utc
                        .with_ymd_and_hms(2026, 3, 1, 10, 0, 0)
                        .single()
                        .expect("valid timestamp"),
                }),
            })
        });

    let app = actix_test::init_service(test_app(command, MockTripQuery::new())).await;
    let res = actix_test::call_service(
        &app,
        actix_test::TestRequest::delete()
            .uri(&format!(
                "/api/v1/trips/{TRIP_ID}/patients/{PATIENT_ID}?reason=hospitalised"
            ))
            .to_request(),
    )
    .await;

    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = actix_test::read_body_json(res).await;
    assert_eq!(body["outcome"], "passenger_cancelled");
    assert_eq!(body["seatsReleased"], 2);
    assert!(body["promotion"]["responseDeadline"].is_string());
}

#[actix_web::test]
async fn late_call_response_is_ok_with_expired_outcome() {
    let mut command = MockTripCommand::new();
    command
        .expect_respond_to_call()
        .withf(|request| request.accept && request.entry_id.to_string() == ENTRY_ID)
        .times(1)
        .return_once(|request| {
            Ok(RespondToCallResponse {
                trip_id: trip_id(),
                waitlist_entry_id: request.entry_id,
                outcome: CallOutcome::Expired,
                passenger_entry_id: None,
                seats_available: 1,
                promotion: None,
            })
        });

    let app = actix_test::init_service(test_app(command, MockTripQuery::new())).await;
    let res = actix_test::call_service(
        &app,
        actix_test::TestRequest::post()
            .uri(&format!("/api/v1/waitlist/{ENTRY_ID}/response"))
            .set_json(json!({"accept": true}))
            .to_request(),
    )
    .await;

    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = actix_test::read_body_json(res).await;
    assert_eq!(body["outcome"], "expired");
}

#[actix_web::test]
async fn waitlist_listing_uses_query_port() {
    let mut query = MockTripQuery::new();
    query
        .expect_list_waitlist()
        .times(1)
        .return_once(|request| {
            Ok(ListWaitlistResponse {
                trip_id: request.trip_id,
                seats_available: 0,
                entries: Vec::new(),
            })
        });

    let app = actix_test::init_service(test_app(MockTripCommand::new(), query)).await;
    let res = actix_test::call_service(
        &app,
        actix_test::TestRequest::get()
            .uri(&format!("/api/v1/trips/{TRIP_ID}/waitlist"))
            .to_request(),
    )
    .await;

    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = actix_test::read_body_json(res).await;
    assert_eq!(body["tripId"], TRIP_ID);
}

#[actix_web::test]
async fn availability_answers_without_error_when_booked() {
    let mut query = MockTripQuery::new();
    query
        .expect_check_availability()
        .withf(|request| request.exclude_trip_id.is_none())
        .times(1)
        .return_once(|_| {
            Ok(crate::domain::Availability {
                available: false,
                conflicting_resource: Some(crate::domain::ConflictingResource::Vehicle),
                conflicting_trip_ids: vec![trip_id()],
                reason: "vehicle is already booked".to_owned(),
            })
        });

    let app = actix_test::init_service(test_app(MockTripCommand::new(), query)).await;
    let res = actix_test::call_service(
        &app,
        actix_test::TestRequest::get()
            .uri(&format!(
                "/api/v1/availability?date=2026-03-02&vehicleId={TRIP_ID}&driverId={PATIENT_ID}"
            ))
            .to_request(),
    )
    .await;

    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = actix_test::read_body_json(res).await;
    assert_eq!(body["available"], false);
    assert_eq!(body["conflictingResource"], "vehicle");
}

#[actix_web::test]
async fn check_in_accepts_empty_body() {
    let mut command = MockTripCommand::new();
    command
        .expect_check_in()
        .withf(|request| request.at.is_none() && request.location.is_none())
        .times(1)
        .return_once(|_| Err(Error::invalid_state("passenger is cancelled")));

    let app = actix_test::init_service(test_app(command, MockTripQuery::new())).await;
    let res = actix_test::call_service(
        &app,
        actix_test::TestRequest::post()
            .uri(&format!("/api/v1/passengers/{ENTRY_ID}/check-in"))
            .to_request(),
    )
    .await;

    assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
}
