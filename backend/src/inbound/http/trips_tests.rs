//! Tests for trip lifecycle HTTP handlers.

use std::sync::Arc;

use actix_web::http::StatusCode;
use actix_web::{App, test as actix_test, web};
use chrono::{NaiveDate, NaiveTime, TimeZone, Utc};
use rstest::rstest;
use serde_json::{Value, json};

use super::*;
use crate::domain::ports::{MockTripCommand, MockTripQuery, TripPayload};
use crate::domain::{DriverId, ErrorCode, Trip, TripDraft, VehicleId};

const TRIP_ID: &str = "3fa85f64-5717-4562-b3fc-2c963f66afa6";
const VEHICLE_ID: &str = "6f1c9b9e-0f5e-4c59-9d56-1c2f61f0a001";
const DRIVER_ID: &str = "6f1c9b9e-0f5e-4c59-9d56-1c2f61f0a002";

fn sample_trip() -> TripPayload {
    let trip = Trip::new(TripDraft {
        id: TRIP_ID.parse().expect("valid trip id"),
        category: TripCategory::Group,
        date: NaiveDate::from_ymd_opt(2026, 3, 2).expect("valid date"),
        departure: NaiveTime::from_hms_opt(7, 30, 0).expect("valid time"),
        vehicle_id: VEHICLE_ID.parse::<VehicleId>().expect("valid vehicle id"),
        driver_id: DRIVER_ID.parse::<DriverId>().expect("valid driver id"),
        capacity: 4,
        created_at: Utc
            .with_ymd_and_hms(2026, 3, 1, 8, 0, 0)
            .single()
            .expect("valid timestamp"),
    })
    .expect("valid trip");
    TripPayload::from(&trip)
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

fn create_payload() -> Value {
    json!({
        "category": "group",
        "date": "2026-03-02",
        "departure": "07:30",
        "vehicleId": VEHICLE_ID,
        "driverId": DRIVER_ID,
    })
}

#[actix_web::test]
async fn create_trip_returns_created_trip() {
    let mut command = MockTripCommand::new();
    command
        .expect_create_trip()
        .withf(|request| {
            request.category == TripCategory::Group
                && request.vehicle_id.to_string() == VEHICLE_ID
                && request.capacity.is_none()
        })
        .times(1)
        .return_once(|_| Ok(TripResponse { trip: sample_trip() }));

    let app = actix_test::init_service(test_app(command, MockTripQuery::new())).await;
    let res = actix_test::call_service(
        &app,
        actix_test::TestRequest::post()
            .uri("/api/v1/trips")
            .set_json(create_payload())
            .to_request(),
    )
    .await;

    assert_eq!(res.status(), StatusCode::CREATED);
    let body: Value = actix_test::read_body_json(res).await;
    assert_eq!(body["trip"]["id"], TRIP_ID);
    assert_eq!(body["trip"]["seatsAvailable"], 4);
    assert_eq!(body["trip"]["status"], "scheduled");
}

#[rstest]
#[case("category", json!("shuttle"), "invalid_value")]
#[case("date", json!("02/03/2026"), "invalid_date")]
#[case("departure", json!("7.30"), "invalid_time")]
#[case("vehicleId", json!("not-a-uuid"), "invalid_uuid")]
#[actix_web::test]
async fn create_trip_rejects_malformed_fields(
    #[case] field: &str,
    #[case] value: Value,
    #[case] code: &str,
) {
    let mut command = MockTripCommand::new();
    command.expect_create_trip().times(0);
    let mut payload = create_payload();
    payload[field] = value;

    let app = actix_test::init_service(test_app(command, MockTripQuery::new())).await;
    let res = actix_test::call_service(
        &app,
        actix_test::TestRequest::post()
            .uri("/api/v1/trips")
            .set_json(payload)
            .to_request(),
    )
    .await;

    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = actix_test::read_body_json(res).await;
    assert_eq!(body["code"], "invalid_request");
    assert_eq!(body["details"]["field"], field);
    assert_eq!(body["details"]["code"], code);
}

#[actix_web::test]
async fn booking_conflict_maps_to_409_with_details() {
    let mut command = MockTripCommand::new();
    command.expect_create_trip().times(1).return_once(|_| {
        Err(Error::conflict("driver is already booked on 2026-03-02")
            .with_details(json!({"resource": "driver", "conflictingTripIds": [TRIP_ID]})))
    });

    let app = actix_test::init_service(test_app(command, MockTripQuery::new())).await;
    let res = actix_test::call_service(
        &app,
        actix_test::TestRequest::post()
            .uri("/api/v1/trips")
            .set_json(create_payload())
            .to_request(),
    )
    .await;

    assert_eq!(res.status(), StatusCode::CONFLICT);
    let body: Value = actix_test::read_body_json(res).await;
    assert_eq!(body["details"]["resource"], "driver");
}

#[actix_web::test]
async fn get_trip_rejects_invalid_path_id() {
    let mut query = MockTripQuery::new();
    query.expect_get_trip().times(0);

    let app = actix_test::init_service(test_app(MockTripCommand::new(), query)).await;
    let res = actix_test::call_service(
        &app,
        actix_test::TestRequest::get()
            .uri("/api/v1/trips/not-a-uuid")
            .to_request(),
    )
    .await;

    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn get_trip_maps_not_found() {
    let mut query = MockTripQuery::new();
    query
        .expect_get_trip()
        .withf(|request| request.trip_id.to_string() == TRIP_ID)
        .times(1)
        .return_once(|_| Err(Error::not_found("trip not found")));

    let app = actix_test::init_service(test_app(MockTripCommand::new(), query)).await;
    let res = actix_test::call_service(
        &app,
        actix_test::TestRequest::get()
            .uri(&format!("/api/v1/trips/{TRIP_ID}"))
            .to_request(),
    )
    .await;

    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn start_on_unconfirmed_trip_is_unprocessable() {
    let mut command = MockTripCommand::new();
    command
        .expect_start_trip()
        .times(1)
        .return_once(|_| Err(Error::invalid_state("trip is scheduled; cannot start")));

    let app = actix_test::init_service(test_app(command, MockTripQuery::new())).await;
    let res = actix_test::call_service(
        &app,
        actix_test::TestRequest::post()
            .uri(&format!("/api/v1/trips/{TRIP_ID}/start"))
            .to_request(),
    )
    .await;

    assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body: Value = actix_test::read_body_json(res).await;
    assert_eq!(body["code"], "invalid_state");
}

#[actix_web::test]
async fn reschedule_passes_optional_resources() {
    let mut command = MockTripCommand::new();
    command
        .expect_reschedule_trip()
        .withf(|request| {
            request.vehicle_id.is_none()
                && request.driver_id.map(|id| id.to_string()) == Some(DRIVER_ID.to_owned())
                && request.departure == NaiveTime::from_hms_opt(8, 15, 0).expect("valid time")
        })
        .times(1)
        .return_once(|_| {
            Ok(TripChangeResponse {
                trip: sample_trip(),
                promotion: None,
            })
        });

    let app = actix_test::init_service(test_app(command, MockTripQuery::new())).await;
    let res = actix_test::call_service(
        &app,
        actix_test::TestRequest::put()
            .uri(&format!("/api/v1/trips/{TRIP_ID}/schedule"))
            .set_json(json!({
                "date": "2026-03-03",
                "departure": "08:15",
                "driverId": DRIVER_ID,
            }))
            .to_request(),
    )
    .await;

    assert_eq!(res.status(), StatusCode::OK);
}

#[actix_web::test]
async fn cancel_forwards_reason() {
    let mut command = MockTripCommand::new();
    command
        .expect_cancel_trip()
        .withf(|request| request.reason == "vehicle breakdown")
        .times(1)
        .return_once(|_| {
            Ok(CancelTripResponse {
                trip: sample_trip(),
                passengers_cancelled: 2,
                waitlist_cancelled: 1,
            })
        });

    let app = actix_test::init_service(test_app(command, MockTripQuery::new())).await;
    let res = actix_test::call_service(
        &app,
        actix_test::TestRequest::post()
            .uri(&format!("/api/v1/trips/{TRIP_ID}/cancel"))
            .set_json(json!({"reason": "vehicle breakdown"}))
            .to_request(),
    )
    .await;

    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = actix_test::read_body_json(res).await;
    assert_eq!(body["passengersCancelled"], 2);
    assert_eq!(body["waitlistCancelled"], 1);
}

#[rstest]
fn error_code_for_unknown_category_is_invalid_request() {
    let error = parse_category("shuttle").expect_err("unknown category");
    assert_eq!(error.code(), ErrorCode::InvalidRequest);
}
