//! Tests for the trip service.

use std::sync::{Arc, Mutex};

use chrono::{DateTime, NaiveDate, NaiveTime, TimeDelta, TimeZone, Utc};
use mockable::MockClock;
use rstest::{fixture, rstest};

use super::*;
use crate::domain::ports::{
    DriverRecord, FixtureDirectory, MockDriverDirectory, MockPatientDirectory, MockTripRepository,
    MockVehicleDirectory, PatientRecord, TripRepositoryError,
};
use crate::domain::{
    ErrorCode, PatientId, PriorityTier, TripBooking, TripCategory, TripStatus, WaitlistState,
};
use crate::test_support::clock::MutableClock;

const WINDOW_HOURS: i64 = 2;

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 1, 8, 0, 0)
        .single()
        .expect("valid timestamp")
}

fn trip_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 3, 2).expect("valid date")
}

fn departure() -> NaiveTime {
    NaiveTime::from_hms_opt(7, 30, 0).expect("valid time")
}

fn ports_with<R>(repo: R) -> TripServicePorts<R> {
    TripServicePorts {
        trips: Arc::new(repo),
        patients: Arc::new(FixtureDirectory),
        vehicles: Arc::new(FixtureDirectory),
        drivers: Arc::new(FixtureDirectory),
        companions: Arc::new(FixtureDirectory),
    }
}

fn service_with<R>(ports: TripServicePorts<R>, clock: Arc<MutableClock>) -> TripService<R> {
    TripService::new(ports, clock, TimeDelta::hours(WINDOW_HOURS))
}

fn scheduled_trip(capacity: u32) -> Trip {
    Trip::new(TripDraft {
        id: TripId::random(),
        category: TripCategory::Group,
        date: trip_date(),
        departure: departure(),
        vehicle_id: VehicleId::random(),
        driver_id: DriverId::random(),
        capacity,
        created_at: now(),
    })
    .expect("valid trip")
}

fn enrol(trip_id: TripId, patient_id: PatientId) -> EnrollPatientRequest {
    EnrollPatientRequest {
        trip_id,
        patient_id,
        has_companion: false,
        companion_id: None,
        priority: None,
        motive: None,
    }
}

/// Mock repository backed by a single shared trip.
fn stored(trip: Trip) -> (MockTripRepository, Arc<Mutex<Trip>>) {
    let store = Arc::new(Mutex::new(trip));
    let mut repo = MockTripRepository::new();

    let reader = Arc::clone(&store);
    repo.expect_find_by_id().returning(move |_| {
        Ok(Some(reader.lock().expect("store lock").clone()))
    });
    let writer = Arc::clone(&store);
    repo.expect_save().returning(move |trip| {
        *writer.lock().expect("store lock") = trip.clone();
        Ok(())
    });
    let lookup = Arc::clone(&store);
    repo.expect_find_trip_id_for_passenger().returning(move |_| {
        Ok(Some(lookup.lock().expect("store lock").id()))
    });
    let lookup = Arc::clone(&store);
    repo.expect_find_trip_id_for_waitlist_entry()
        .returning(move |_| Ok(Some(lookup.lock().expect("store lock").id())));
    let lookup = Arc::clone(&store);
    repo.expect_list_trip_ids_with_pending_calls()
        .returning(move || {
            let trip = lookup.lock().expect("store lock");
            Ok(if trip.waitlist().has_pending_calls() {
                vec![trip.id()]
            } else {
                Vec::new()
            })
        });
    repo.expect_list_bookings_on().returning(|_| Ok(Vec::new()));
    (repo, store)
}

#[fixture]
fn clock() -> Arc<MutableClock> {
    Arc::new(MutableClock::new(now()))
}

fn create_request(capacity: Option<u32>) -> CreateTripRequest {
    CreateTripRequest {
        category: TripCategory::Individual,
        date: trip_date(),
        departure: departure(),
        vehicle_id: VehicleId::random(),
        driver_id: DriverId::random(),
        capacity,
    }
}

#[rstest]
#[tokio::test]
async fn create_trip_defaults_capacity_to_vehicle_seats(clock: Arc<MutableClock>) {
    let mut repo = MockTripRepository::new();
    repo.expect_list_bookings_on()
        .times(1)
        .return_once(|_| Ok(Vec::new()));
    repo.expect_save().times(1).return_once(|_| Ok(()));

    let service = service_with(ports_with(repo), clock);
    let response = service
        .create_trip(create_request(None))
        .await
        .expect("trip created");

    assert_eq!(response.trip.capacity, FixtureDirectory::VEHICLE_CAPACITY);
    assert_eq!(response.trip.seats_available, FixtureDirectory::VEHICLE_CAPACITY);
    assert_eq!(response.trip.status, TripStatus::Scheduled);
}

#[tokio::test]
async fn create_trip_stamps_creation_time_from_clock() {
    let mut clock = MockClock::new();
    clock.expect_utc().return_const(now());

    let mut repo = MockTripRepository::new();
    repo.expect_list_bookings_on().return_once(|_| Ok(Vec::new()));
    repo.expect_save().return_once(|_| Ok(()));

    let service = TripService::new(
        ports_with(repo),
        Arc::new(clock),
        TimeDelta::hours(WINDOW_HOURS),
    );
    let response = service
        .create_trip(create_request(Some(2)))
        .await
        .expect("trip created");

    assert_eq!(response.trip.created_at, now());
}

#[rstest]
#[tokio::test]
async fn create_trip_rejects_double_booked_vehicle(clock: Arc<MutableClock>) {
    let request = create_request(None);
    let existing = TripBooking {
        trip_id: TripId::random(),
        category: TripCategory::Group,
        date: request.date,
        vehicle_id: request.vehicle_id,
        driver_id: DriverId::random(),
        status: TripStatus::Confirmed,
    };

    let mut repo = MockTripRepository::new();
    repo.expect_list_bookings_on()
        .times(1)
        .return_once(move |_| Ok(vec![existing]));
    repo.expect_save().times(0);

    let service = service_with(ports_with(repo), clock);
    let error = service
        .create_trip(request)
        .await
        .expect_err("vehicle already booked");

    assert_eq!(error.code(), ErrorCode::Conflict);
    let details = error.details().expect("conflict details");
    assert_eq!(details["resource"], "vehicle");
    assert_eq!(details["conflictingTripIds"][0], existing.trip_id.to_string());
}

#[rstest]
#[tokio::test]
async fn create_trip_rejects_capacity_above_vehicle(clock: Arc<MutableClock>) {
    let mut repo = MockTripRepository::new();
    repo.expect_save().times(0);

    let service = service_with(ports_with(repo), clock);
    let error = service
        .create_trip(create_request(Some(FixtureDirectory::VEHICLE_CAPACITY + 1)))
        .await
        .expect_err("capacity too large");

    assert_eq!(error.code(), ErrorCode::InvalidRequest);
}

#[rstest]
#[tokio::test]
async fn create_trip_rejects_unknown_vehicle(clock: Arc<MutableClock>) {
    let mut vehicles = MockVehicleDirectory::new();
    vehicles.expect_get_vehicle().return_once(|_| Ok(None));
    let mut ports = ports_with(MockTripRepository::new());
    ports.vehicles = Arc::new(vehicles);

    let error = service_with(ports, clock)
        .create_trip(create_request(None))
        .await
        .expect_err("unknown vehicle");

    assert_eq!(error.code(), ErrorCode::NotFound);
}

#[rstest]
#[tokio::test]
async fn create_trip_rejects_inactive_driver(clock: Arc<MutableClock>) {
    let mut drivers = MockDriverDirectory::new();
    drivers.expect_get_driver().return_once(|id| {
        Ok(Some(DriverRecord {
            id: *id,
            active: false,
        }))
    });
    let mut ports = ports_with(MockTripRepository::new());
    ports.drivers = Arc::new(drivers);

    let error = service_with(ports, clock)
        .create_trip(create_request(None))
        .await
        .expect_err("inactive driver");

    assert_eq!(error.code(), ErrorCode::InvalidState);
}

#[rstest]
#[case(TripRepositoryError::connection("pool unavailable"), ErrorCode::ServiceUnavailable)]
#[case(TripRepositoryError::query("bad statement"), ErrorCode::InternalError)]
#[tokio::test]
async fn repository_failures_map_to_error_codes(
    clock: Arc<MutableClock>,
    #[case] failure: TripRepositoryError,
    #[case] expected: ErrorCode,
) {
    let mut repo = MockTripRepository::new();
    repo.expect_find_by_id()
        .times(1)
        .return_once(move |_| Err(failure));

    let error = service_with(ports_with(repo), clock)
        .get_trip(GetTripRequest {
            trip_id: TripId::random(),
        })
        .await
        .expect_err("repository failure");

    assert_eq!(error.code(), expected);
}

#[rstest]
#[tokio::test]
async fn get_trip_returns_not_found_when_missing(clock: Arc<MutableClock>) {
    let mut repo = MockTripRepository::new();
    repo.expect_find_by_id().times(1).return_once(|_| Ok(None));

    let error = service_with(ports_with(repo), clock)
        .get_trip(GetTripRequest {
            trip_id: TripId::random(),
        })
        .await
        .expect_err("not found");

    assert_eq!(error.code(), ErrorCode::NotFound);
}

#[rstest]
#[tokio::test]
async fn enrolment_rejects_unknown_patient(clock: Arc<MutableClock>) {
    let mut patients = MockPatientDirectory::new();
    patients.expect_get_patient().return_once(|_| Ok(None));
    let mut repo = MockTripRepository::new();
    repo.expect_find_by_id().times(0);
    let mut ports = ports_with(repo);
    ports.patients = Arc::new(patients);

    let error = service_with(ports, clock)
        .enroll_patient(enrol(TripId::random(), PatientId::random()))
        .await
        .expect_err("unknown patient");

    assert_eq!(error.code(), ErrorCode::NotFound);
}

#[rstest]
#[tokio::test]
async fn enrolment_rejects_inactive_patient(clock: Arc<MutableClock>) {
    let mut patients = MockPatientDirectory::new();
    patients.expect_get_patient().return_once(|id| {
        Ok(Some(PatientRecord {
            id: *id,
            active: false,
        }))
    });
    let mut ports = ports_with(MockTripRepository::new());
    ports.patients = Arc::new(patients);

    let error = service_with(ports, clock)
        .enroll_patient(enrol(TripId::random(), PatientId::random()))
        .await
        .expect_err("inactive patient");

    assert_eq!(error.code(), ErrorCode::InvalidState);
}

#[rstest]
#[tokio::test]
async fn companion_id_requires_companion_flag(clock: Arc<MutableClock>) {
    let request = EnrollPatientRequest {
        companion_id: Some(crate::domain::CompanionId::random()),
        ..enrol(TripId::random(), PatientId::random())
    };

    let error = service_with(ports_with(MockTripRepository::new()), clock)
        .enroll_patient(request)
        .await
        .expect_err("companion without flag");

    assert_eq!(error.code(), ErrorCode::InvalidRequest);
}

#[rstest]
#[tokio::test]
async fn full_trip_waitlists_with_requested_tier(clock: Arc<MutableClock>) {
    let trip = scheduled_trip(1);
    let trip_id = trip.id();
    let (repo, store) = stored(trip);
    let service = service_with(ports_with(repo), clock);

    let first = service
        .enroll_patient(enrol(trip_id, PatientId::random()))
        .await
        .expect("first enrolment");
    assert_eq!(first.outcome, EnrollmentStatus::Enrolled);
    assert_eq!(first.seats_available, 0);

    let second = service
        .enroll_patient(EnrollPatientRequest {
            priority: Some(PriorityTier::High),
            ..enrol(trip_id, PatientId::random())
        })
        .await
        .expect("second enrolment");
    assert_eq!(second.outcome, EnrollmentStatus::Waitlisted);
    assert_eq!(second.tier, Some(PriorityTier::High));
    assert_eq!(second.sequence, Some(1));

    let saved = store.lock().expect("store lock");
    assert_eq!(saved.roster().occupied_seats(), 1);
    assert_eq!(saved.waitlist().active_in_order().len(), 1);
}

#[rstest]
#[tokio::test]
async fn removal_calls_next_waitlisted_patient(clock: Arc<MutableClock>) {
    let trip = scheduled_trip(1);
    let trip_id = trip.id();
    let (repo, _store) = stored(trip);
    let service = service_with(ports_with(repo), Arc::clone(&clock));
    let seated = PatientId::random();
    let queued = PatientId::random();

    service
        .enroll_patient(enrol(trip_id, seated))
        .await
        .expect("seated");
    service
        .enroll_patient(enrol(trip_id, queued))
        .await
        .expect("queued");

    let removal = service
        .remove_patient(RemovePatientRequest {
            trip_id,
            patient_id: seated,
            reason: None,
        })
        .await
        .expect("removed");

    assert_eq!(removal.outcome, RemovalStatus::PassengerCancelled);
    assert_eq!(removal.seats_released, 1);
    let promotion = removal.promotion.expect("queued patient called");
    assert_eq!(promotion.patient_id, queued);
    assert_eq!(
        promotion.response_deadline,
        now() + TimeDelta::hours(WINDOW_HOURS)
    );
}

#[rstest]
#[tokio::test]
async fn accepted_call_seats_the_patient(clock: Arc<MutableClock>) {
    let trip = scheduled_trip(1);
    let trip_id = trip.id();
    let (repo, store) = stored(trip);
    let service = service_with(ports_with(repo), Arc::clone(&clock));
    let seated = PatientId::random();
    let queued = PatientId::random();

    service.enroll_patient(enrol(trip_id, seated)).await.expect("seated");
    service.enroll_patient(enrol(trip_id, queued)).await.expect("queued");
    let promotion = service
        .remove_patient(RemovePatientRequest {
            trip_id,
            patient_id: seated,
            reason: Some("hospitalised".to_owned()),
        })
        .await
        .expect("removed")
        .promotion
        .expect("called");

    clock.advance(TimeDelta::minutes(30));
    let response = service
        .respond_to_call(RespondToCallRequest {
            entry_id: promotion.waitlist_entry_id,
            accept: true,
        })
        .await
        .expect("response recorded");

    assert_eq!(response.outcome, CallOutcome::Confirmed);
    assert_eq!(response.seats_available, 0);
    let passenger_entry_id = response.passenger_entry_id.expect("seated from waitlist");
    let saved = store.lock().expect("store lock");
    let entry = saved
        .roster()
        .get(passenger_entry_id)
        .expect("roster entry");
    assert_eq!(entry.patient_id(), queued);
    assert_eq!(entry.waitlist_entry_id(), Some(promotion.waitlist_entry_id));
}

#[rstest]
#[tokio::test]
async fn late_acceptance_reports_expired(clock: Arc<MutableClock>) {
    let trip = scheduled_trip(1);
    let trip_id = trip.id();
    let (repo, _store) = stored(trip);
    let service = service_with(ports_with(repo), Arc::clone(&clock));
    let seated = PatientId::random();

    service.enroll_patient(enrol(trip_id, seated)).await.expect("seated");
    service
        .enroll_patient(enrol(trip_id, PatientId::random()))
        .await
        .expect("queued");
    let promotion = service
        .remove_patient(RemovePatientRequest {
            trip_id,
            patient_id: seated,
            reason: None,
        })
        .await
        .expect("removed")
        .promotion
        .expect("called");

    clock.advance_hours(WINDOW_HOURS + 1);
    let response = service
        .respond_to_call(RespondToCallRequest {
            entry_id: promotion.waitlist_entry_id,
            accept: true,
        })
        .await
        .expect("late response is not an error");

    assert_eq!(response.outcome, CallOutcome::Expired);
    assert!(response.passenger_entry_id.is_none());
    assert_eq!(response.seats_available, 1);
}

#[rstest]
#[tokio::test]
async fn reads_expire_overdue_calls(clock: Arc<MutableClock>) {
    let trip = scheduled_trip(1);
    let trip_id = trip.id();
    let (repo, _store) = stored(trip);
    let service = service_with(ports_with(repo), Arc::clone(&clock));
    let seated = PatientId::random();

    service.enroll_patient(enrol(trip_id, seated)).await.expect("seated");
    service
        .enroll_patient(enrol(trip_id, PatientId::random()))
        .await
        .expect("queued");
    service
        .remove_patient(RemovePatientRequest {
            trip_id,
            patient_id: seated,
            reason: None,
        })
        .await
        .expect("removed");

    clock.advance_hours(WINDOW_HOURS + 1);
    let listing = service
        .list_waitlist(ListWaitlistRequest { trip_id })
        .await
        .expect("waitlist listed");

    let states: Vec<_> = listing.entries.iter().map(|entry| entry.state).collect();
    assert_eq!(states, vec![WaitlistState::Expired]);
}

#[rstest]
#[tokio::test]
async fn sweep_expires_calls_and_promotes_replacements(clock: Arc<MutableClock>) {
    let trip = scheduled_trip(1);
    let trip_id = trip.id();
    let (repo, _store) = stored(trip);
    let service = service_with(ports_with(repo), Arc::clone(&clock));
    let seated = PatientId::random();
    let second = PatientId::random();

    service.enroll_patient(enrol(trip_id, seated)).await.expect("seated");
    service
        .enroll_patient(enrol(trip_id, PatientId::random()))
        .await
        .expect("first queued");
    service.enroll_patient(enrol(trip_id, second)).await.expect("second queued");
    service
        .remove_patient(RemovePatientRequest {
            trip_id,
            patient_id: seated,
            reason: None,
        })
        .await
        .expect("removed");

    clock.advance_hours(WINDOW_HOURS + 1);
    let sweep = service.sweep_expired_calls().await.expect("sweep runs");

    assert_eq!(sweep.expired.len(), 1);
    assert_eq!(sweep.promotions.len(), 1);
    assert_eq!(sweep.promotions[0].patient_id, second);
}

#[rstest]
#[tokio::test]
async fn cancel_trip_requires_reason(clock: Arc<MutableClock>) {
    let mut repo = MockTripRepository::new();
    repo.expect_find_by_id().times(0);

    let error = service_with(ports_with(repo), clock)
        .cancel_trip(CancelTripRequest {
            trip_id: TripId::random(),
            reason: "   ".to_owned(),
        })
        .await
        .expect_err("blank reason");

    assert_eq!(error.code(), ErrorCode::InvalidRequest);
}

#[rstest]
#[tokio::test]
async fn check_in_defaults_to_clock_time(clock: Arc<MutableClock>) {
    let trip = scheduled_trip(2);
    let trip_id = trip.id();
    let (repo, _store) = stored(trip);
    let service = service_with(ports_with(repo), Arc::clone(&clock));

    let entry_id = service
        .enroll_patient(enrol(trip_id, PatientId::random()))
        .await
        .expect("enrolled")
        .passenger_entry_id
        .expect("seated");
    service
        .confirm_trip(TripTransitionRequest { trip_id })
        .await
        .expect("confirmed");

    let boarding = service
        .check_in(RecordBoardingRequest {
            entry_id,
            at: None,
            location: Some("Clinic entrance".to_owned()),
        })
        .await
        .expect("checked in");

    let checkpoint = boarding.passenger.check_in.expect("check-in recorded");
    assert_eq!(checkpoint.at, now());
    assert_eq!(checkpoint.location.as_deref(), Some("Clinic entrance"));
}

#[rstest]
#[tokio::test]
async fn resize_above_vehicle_capacity_is_rejected(clock: Arc<MutableClock>) {
    let trip = scheduled_trip(2);
    let trip_id = trip.id();
    let (repo, store) = stored(trip);

    let error = service_with(ports_with(repo), clock)
        .resize_trip(ResizeTripRequest {
            trip_id,
            capacity: FixtureDirectory::VEHICLE_CAPACITY + 1,
        })
        .await
        .expect_err("too many seats");

    assert_eq!(error.code(), ErrorCode::InvalidRequest);
    assert_eq!(store.lock().expect("store lock").ledger().capacity(), 2);
}

#[rstest]
#[tokio::test]
async fn reschedule_to_smaller_vehicle_shrinks_capacity(clock: Arc<MutableClock>) {
    let trip = scheduled_trip(4);
    let trip_id = trip.id();
    let (repo, _store) = stored(trip);
    let small = VehicleId::random();
    let mut vehicles = MockVehicleDirectory::new();
    vehicles
        .expect_get_vehicle()
        .returning(|id| Ok(Some(crate::domain::ports::VehicleRecord { id: *id, capacity: 2 })));
    let mut ports = ports_with(repo);
    ports.vehicles = Arc::new(vehicles);

    let response = service_with(ports, clock)
        .reschedule_trip(RescheduleTripRequest {
            trip_id,
            date: trip_date(),
            departure: departure(),
            vehicle_id: Some(small),
            driver_id: None,
        })
        .await
        .expect("rescheduled");

    assert_eq!(response.trip.vehicle_id, small);
    assert_eq!(response.trip.capacity, 2);
}
