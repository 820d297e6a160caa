//! Trip domain service.
//!
//! Implements the trip driving ports on top of the repository and directory
//! ports. Each mutation runs load, mutate, save while holding the trip's
//! lock. Creating or moving a trip also holds the `(date, vehicle)` and
//! `(date, driver)` locks across the availability check and the write.
//! Lock order is always trip first, then resources.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Duration;
use mockable::Clock;
use serde_json::json;
use tracing::{info, warn};

use crate::domain::ports::{
    BoardingResponse, CallOutcome, CancelTripRequest, CancelTripResponse, CheckAvailabilityRequest,
    CompanionDirectory, CompleteTripResponse, CreateTripRequest, DriverDirectory,
    EnrollPatientRequest, EnrollPatientResponse, EnrollmentStatus, GetTripRequest,
    ListWaitlistRequest, ListWaitlistResponse, PassengerPayload, PatientDirectory,
    PromotionPayload, RecordBoardingRequest, RemovalStatus, RemovePatientRequest,
    RemovePatientResponse, RescheduleTripRequest, ResizeTripRequest, RespondToCallRequest,
    RespondToCallResponse, SweepExpiredCallsResponse, TripChangeResponse, TripCommand,
    TripPayload, TripQuery, TripRepository, TripResponse,
    TripTransitionRequest, VehicleDirectory, VehicleRecord, WaitlistEntryPayload,
};
use crate::domain::trip_locks::TripLocks;
use crate::domain::{
    Availability, AvailabilityRequest, CallResponseOutcome, DriverId, EnrollmentOutcome,
    EnrollmentRequest, Error, PassengerEntryId, RemovalOutcome, ScheduleChange, Trip, TripDraft,
    TripId, VehicleId, WaitlistEntryId, check_availability,
};

const DEFAULT_REMOVAL_REASON: &str = "removed on request";

/// Parameter object bundling the driven ports used by [`TripService`].
pub struct TripServicePorts<R> {
    pub trips: Arc<R>,
    pub patients: Arc<dyn PatientDirectory>,
    pub vehicles: Arc<dyn VehicleDirectory>,
    pub drivers: Arc<dyn DriverDirectory>,
    pub companions: Arc<dyn CompanionDirectory>,
}

impl<R> Clone for TripServicePorts<R> {
    fn clone(&self) -> Self {
        Self {
            trips: Arc::clone(&self.trips),
            patients: Arc::clone(&self.patients),
            vehicles: Arc::clone(&self.vehicles),
            drivers: Arc::clone(&self.drivers),
            companions: Arc::clone(&self.companions),
        }
    }
}

/// Trip service implementing [`TripCommand`] and [`TripQuery`].
pub struct TripService<R> {
    ports: TripServicePorts<R>,
    clock: Arc<dyn Clock>,
    response_window: Duration,
    locks: Arc<TripLocks>,
}

impl<R> Clone for TripService<R> {
    fn clone(&self) -> Self {
        Self {
            ports: self.ports.clone(),
            clock: Arc::clone(&self.clock),
            response_window: self.response_window,
            locks: Arc::clone(&self.locks),
        }
    }
}

impl<R> TripService<R> {
    /// Create a service. `response_window` is how long a called waitlist
    /// entry has to answer.
    pub fn new(ports: TripServicePorts<R>, clock: Arc<dyn Clock>, response_window: Duration) -> Self {
        Self {
            ports,
            clock,
            response_window,
            locks: Arc::new(TripLocks::default()),
        }
    }
}

impl<R> TripService<R>
where
    R: TripRepository,
{
    async fn load(&self, trip_id: TripId) -> Result<Trip, Error> {
        self.ports
            .trips
            .find_by_id(&trip_id)
            .await
            .map_err(Error::from)?
            .ok_or_else(|| {
                Error::not_found(format!("trip {trip_id} not found"))
                    .with_details(json!({ "tripId": trip_id }))
            })
    }

    async fn save(&self, trip: &Trip) -> Result<(), Error> {
        self.ports
            .trips
            .save(trip)
            .await
            .map_err(Error::from)
    }

    async fn trip_for_passenger(&self, entry_id: PassengerEntryId) -> Result<TripId, Error> {
        self.ports
            .trips
            .find_trip_id_for_passenger(&entry_id)
            .await
            .map_err(Error::from)?
            .ok_or_else(|| {
                Error::not_found(format!("passenger entry {entry_id} not found"))
                    .with_details(json!({ "entryId": entry_id }))
            })
    }

    async fn trip_for_waitlist_entry(&self, entry_id: WaitlistEntryId) -> Result<TripId, Error> {
        self.ports
            .trips
            .find_trip_id_for_waitlist_entry(&entry_id)
            .await
            .map_err(Error::from)?
            .ok_or_else(|| {
                Error::not_found(format!("waitlist entry {entry_id} not found"))
                    .with_details(json!({ "waitlistEntryId": entry_id }))
            })
    }

    async fn require_vehicle(&self, vehicle_id: VehicleId) -> Result<VehicleRecord, Error> {
        self.ports
            .vehicles
            .get_vehicle(&vehicle_id)
            .await
            .map_err(Error::from)?
            .ok_or_else(|| {
                Error::not_found(format!("vehicle {vehicle_id} not found"))
                    .with_details(json!({ "vehicleId": vehicle_id }))
            })
    }

    async fn require_active_driver(&self, driver_id: DriverId) -> Result<(), Error> {
        let driver = self
            .ports
            .drivers
            .get_driver(&driver_id)
            .await
            .map_err(Error::from)?
            .ok_or_else(|| {
                Error::not_found(format!("driver {driver_id} not found"))
                    .with_details(json!({ "driverId": driver_id }))
            })?;
        if !driver.active {
            return Err(Error::invalid_state(format!("driver {driver_id} is not active"))
                .with_details(json!({ "driverId": driver_id })));
        }
        Ok(())
    }

    async fn validate_enrolment(&self, request: &EnrollPatientRequest) -> Result<(), Error> {
        let patient_id = request.patient_id;
        let patient = self
            .ports
            .patients
            .get_patient(&patient_id)
            .await
            .map_err(Error::from)?
            .ok_or_else(|| {
                Error::not_found(format!("patient {patient_id} not found"))
                    .with_details(json!({ "patientId": patient_id }))
            })?;
        if !patient.active {
            return Err(Error::invalid_state(format!("patient {patient_id} is not active"))
                .with_details(json!({ "patientId": patient_id })));
        }

        let Some(companion_id) = request.companion_id else {
            return Ok(());
        };
        if !request.has_companion {
            return Err(
                Error::invalid_request("companionId requires hasCompanion to be true")
                    .with_details(json!({ "field": "companionId", "code": "companion_without_flag" })),
            );
        }
        self.ports
            .companions
            .get_companion(&companion_id)
            .await
            .map_err(Error::from)?
            .ok_or_else(|| {
                Error::not_found(format!("companion {companion_id} not found"))
                    .with_details(json!({ "companionId": companion_id }))
            })?;
        Ok(())
    }

    async fn ensure_available(&self, request: AvailabilityRequest) -> Result<(), Error> {
        let bookings = self
            .ports
            .trips
            .list_bookings_on(request.date)
            .await
            .map_err(Error::from)?;
        let answer = check_availability(&bookings, &request);
        if !answer.available {
            warn!(
                date = %request.date,
                vehicle_id = %request.vehicle_id,
                driver_id = %request.driver_id,
                reason = %answer.reason,
                "booking rejected: resource unavailable"
            );
        }
        answer.into_result(request.date)
    }

    /// Lock, load, mutate and save one trip.
    async fn mutate<T, F>(&self, trip_id: TripId, apply: F) -> Result<(Trip, T), Error>
    where
        F: FnOnce(&mut Trip) -> Result<T, Error> + Send,
        T: Send,
    {
        let _guard = self.locks.trip(trip_id).await;
        let mut trip = self.load(trip_id).await?;
        let outcome = apply(&mut trip)?;
        self.save(&trip).await?;
        Ok((trip, outcome))
    }

    /// Load a trip for reading, persisting any calls that lazily expired.
    async fn read_fresh(&self, trip_id: TripId) -> Result<Trip, Error> {
        let _guard = self.locks.trip(trip_id).await;
        let mut trip = self.load(trip_id).await?;
        let sweep = trip.expire_overdue_calls(self.clock.utc(), self.response_window);
        if !sweep.expired.is_empty() {
            self.save(&trip).await?;
        }
        Ok(trip)
    }
}

fn trip_response(trip: &Trip) -> TripResponse {
    TripResponse {
        trip: TripPayload::from(trip),
    }
}

fn require_reason(reason: String) -> Result<String, Error> {
    let trimmed = reason.trim();
    if trimmed.is_empty() {
        return Err(Error::invalid_request("reason must not be blank")
            .with_details(json!({ "field": "reason", "code": "missing_field" })));
    }
    Ok(trimmed.to_owned())
}

#[async_trait]
impl<R> TripCommand for TripService<R>
where
    R: TripRepository,
{
    async fn create_trip(&self, request: CreateTripRequest) -> Result<TripResponse, Error> {
        let vehicle = self.require_vehicle(request.vehicle_id).await?;
        self.require_active_driver(request.driver_id).await?;
        let capacity = request.capacity.unwrap_or(vehicle.capacity);
        if capacity > vehicle.capacity {
            return Err(Error::invalid_request(format!(
                "capacity {capacity} exceeds vehicle capacity {}",
                vehicle.capacity
            ))
            .with_details(json!({
                "field": "capacity",
                "requested": capacity,
                "vehicleCapacity": vehicle.capacity,
            })));
        }

        let _resources = self
            .locks
            .resources([(request.date, request.vehicle_id, request.driver_id)])
            .await;
        self.ensure_available(AvailabilityRequest {
            date: request.date,
            vehicle_id: request.vehicle_id,
            driver_id: request.driver_id,
            exclude_trip_id: None,
        })
        .await?;

        let trip = Trip::new(TripDraft {
            id: TripId::random(),
            category: request.category,
            date: request.date,
            departure: request.departure,
            vehicle_id: request.vehicle_id,
            driver_id: request.driver_id,
            capacity,
            created_at: self.clock.utc(),
        })?;
        self.save(&trip).await?;
        info!(
            trip_id = %trip.id(),
            category = %trip.category(),
            date = %trip.date(),
            vehicle_id = %trip.vehicle_id(),
            driver_id = %trip.driver_id(),
            capacity,
            "trip created"
        );
        Ok(trip_response(&trip))
    }

    async fn reschedule_trip(
        &self,
        request: RescheduleTripRequest,
    ) -> Result<TripChangeResponse, Error> {
        let _guard = self.locks.trip(request.trip_id).await;
        let mut trip = self.load(request.trip_id).await?;
        let vehicle_id = request.vehicle_id.unwrap_or_else(|| trip.vehicle_id());
        let driver_id = request.driver_id.unwrap_or_else(|| trip.driver_id());

        let capacity = if vehicle_id == trip.vehicle_id() {
            None
        } else {
            let vehicle = self.require_vehicle(vehicle_id).await?;
            (vehicle.capacity < trip.ledger().capacity()).then_some(vehicle.capacity)
        };
        if driver_id != trip.driver_id() {
            self.require_active_driver(driver_id).await?;
        }

        let _resources = self
            .locks
            .resources([(request.date, vehicle_id, driver_id)])
            .await;
        self.ensure_available(AvailabilityRequest {
            date: request.date,
            vehicle_id,
            driver_id,
            exclude_trip_id: Some(trip.id()),
        })
        .await?;

        let promotion = trip.reschedule(
            ScheduleChange {
                date: request.date,
                departure: request.departure,
                vehicle_id,
                driver_id,
                capacity,
            },
            self.clock.utc(),
            self.response_window,
        )?;
        self.save(&trip).await?;
        Ok(TripChangeResponse {
            trip: TripPayload::from(&trip),
            promotion: promotion.map(PromotionPayload::from),
        })
    }

    async fn resize_trip(&self, request: ResizeTripRequest) -> Result<TripChangeResponse, Error> {
        let _guard = self.locks.trip(request.trip_id).await;
        let mut trip = self.load(request.trip_id).await?;
        let vehicle = self.require_vehicle(trip.vehicle_id()).await?;
        if request.capacity > vehicle.capacity {
            return Err(Error::invalid_request(format!(
                "capacity {} exceeds vehicle capacity {}",
                request.capacity, vehicle.capacity
            ))
            .with_details(json!({
                "field": "capacity",
                "requested": request.capacity,
                "vehicleCapacity": vehicle.capacity,
            })));
        }
        let outcome = trip.resize(request.capacity, self.clock.utc(), self.response_window)?;
        self.save(&trip).await?;
        info!(
            trip_id = %trip.id(),
            capacity = outcome.capacity,
            seats_available = outcome.seats_available,
            "trip resized"
        );
        Ok(TripChangeResponse {
            trip: TripPayload::from(&trip),
            promotion: outcome.promotion.map(PromotionPayload::from),
        })
    }

    async fn confirm_trip(&self, request: TripTransitionRequest) -> Result<TripResponse, Error> {
        let (trip, ()) = self
            .mutate(request.trip_id, |trip| trip.confirm().map_err(Error::from))
            .await?;
        info!(trip_id = %trip.id(), "trip confirmed");
        Ok(trip_response(&trip))
    }

    async fn start_trip(&self, request: TripTransitionRequest) -> Result<TripResponse, Error> {
        let (trip, ()) = self
            .mutate(request.trip_id, |trip| trip.start().map_err(Error::from))
            .await?;
        info!(trip_id = %trip.id(), "trip started");
        Ok(trip_response(&trip))
    }

    async fn complete_trip(
        &self,
        request: TripTransitionRequest,
    ) -> Result<CompleteTripResponse, Error> {
        let now = self.clock.utc();
        let (trip, outcome) = self
            .mutate(request.trip_id, |trip| trip.complete(now).map_err(Error::from))
            .await?;
        Ok(CompleteTripResponse {
            trip: TripPayload::from(&trip),
            no_shows: outcome.no_shows,
            already_completed: outcome.already_completed,
        })
    }

    async fn cancel_trip(&self, request: CancelTripRequest) -> Result<CancelTripResponse, Error> {
        let reason = require_reason(request.reason)?;
        let now = self.clock.utc();
        let (trip, outcome) = self
            .mutate(request.trip_id, |trip| {
                trip.cancel(&reason, now).map_err(Error::from)
            })
            .await?;
        Ok(CancelTripResponse {
            trip: TripPayload::from(&trip),
            passengers_cancelled: outcome.passengers_cancelled,
            waitlist_cancelled: outcome.waitlist_cancelled,
        })
    }

    async fn enroll_patient(
        &self,
        request: EnrollPatientRequest,
    ) -> Result<EnrollPatientResponse, Error> {
        self.validate_enrolment(&request).await?;
        let now = self.clock.utc();
        let trip_id = request.trip_id;
        let enrolment = EnrollmentRequest {
            patient_id: request.patient_id,
            has_companion: request.has_companion,
            companion_id: request.companion_id,
            tier: request.priority.unwrap_or_default(),
            motive: request.motive,
        };
        let (trip, outcome) = self
            .mutate(trip_id, |trip| trip.enroll(enrolment, now).map_err(Error::from))
            .await?;

        let seats_available = trip.ledger().seats_available();
        Ok(match outcome {
            EnrollmentOutcome::Enrolled {
                entry_id,
                from_waitlist,
                ..
            } => EnrollPatientResponse {
                trip_id,
                outcome: EnrollmentStatus::Enrolled,
                passenger_entry_id: Some(entry_id),
                waitlist_entry_id: from_waitlist,
                tier: None,
                sequence: None,
                seats_available,
            },
            EnrollmentOutcome::Waitlisted {
                entry_id,
                tier,
                sequence,
            } => EnrollPatientResponse {
                trip_id,
                outcome: EnrollmentStatus::Waitlisted,
                passenger_entry_id: None,
                waitlist_entry_id: Some(entry_id),
                tier: Some(tier),
                sequence: Some(sequence),
                seats_available,
            },
        })
    }

    async fn remove_patient(
        &self,
        request: RemovePatientRequest,
    ) -> Result<RemovePatientResponse, Error> {
        let reason = match request.reason {
            Some(reason) if !reason.trim().is_empty() => reason.trim().to_owned(),
            _ => DEFAULT_REMOVAL_REASON.to_owned(),
        };
        let now = self.clock.utc();
        let window = self.response_window;
        let trip_id = request.trip_id;
        let (trip, outcome) = self
            .mutate(trip_id, |trip| {
                trip.remove_patient(request.patient_id, &reason, now, window)
                    .map_err(Error::from)
            })
            .await?;

        let seats_available = trip.ledger().seats_available();
        Ok(match outcome {
            RemovalOutcome::PassengerCancelled {
                entry_id,
                seats_released,
                promotion,
            } => RemovePatientResponse {
                trip_id,
                outcome: RemovalStatus::PassengerCancelled,
                passenger_entry_id: Some(entry_id),
                waitlist_entry_id: None,
                seats_released,
                seats_available,
                promotion: promotion.map(PromotionPayload::from),
            },
            RemovalOutcome::WaitlistCancelled { entry_id } => RemovePatientResponse {
                trip_id,
                outcome: RemovalStatus::WaitlistCancelled,
                passenger_entry_id: None,
                waitlist_entry_id: Some(entry_id),
                seats_released: 0,
                seats_available,
                promotion: None,
            },
        })
    }

    async fn check_in(&self, request: RecordBoardingRequest) -> Result<BoardingResponse, Error> {
        let trip_id = self.trip_for_passenger(request.entry_id).await?;
        let at = request.at.unwrap_or_else(|| self.clock.utc());
        let entry_id = request.entry_id;
        let (trip, ()) = self
            .mutate(trip_id, |trip| {
                trip.check_in(entry_id, at, request.location)
                    .map_err(Error::from)
            })
            .await?;
        boarding_response(&trip, entry_id)
    }

    async fn check_out(&self, request: RecordBoardingRequest) -> Result<BoardingResponse, Error> {
        let trip_id = self.trip_for_passenger(request.entry_id).await?;
        let at = request.at.unwrap_or_else(|| self.clock.utc());
        let entry_id = request.entry_id;
        let (trip, ()) = self
            .mutate(trip_id, |trip| {
                trip.check_out(entry_id, at, request.location)
                    .map_err(Error::from)
            })
            .await?;
        boarding_response(&trip, entry_id)
    }

    async fn respond_to_call(
        &self,
        request: RespondToCallRequest,
    ) -> Result<RespondToCallResponse, Error> {
        let trip_id = self.trip_for_waitlist_entry(request.entry_id).await?;
        let now = self.clock.utc();
        let window = self.response_window;
        let (trip, response) = self
            .mutate(trip_id, |trip| {
                trip.respond_to_call(request.entry_id, request.accept, now, window)
                    .map_err(Error::from)
            })
            .await?;

        let (outcome, passenger_entry_id) = match response.outcome {
            CallResponseOutcome::Confirmed { passenger_entry_id } => {
                (CallOutcome::Confirmed, Some(passenger_entry_id))
            }
            CallResponseOutcome::Declined => (CallOutcome::Declined, None),
            CallResponseOutcome::Expired => (CallOutcome::Expired, None),
            CallResponseOutcome::Requeued => (CallOutcome::Requeued, None),
        };
        Ok(RespondToCallResponse {
            trip_id,
            waitlist_entry_id: response.waitlist_entry_id,
            outcome,
            passenger_entry_id,
            seats_available: trip.ledger().seats_available(),
            promotion: response.promotion.map(PromotionPayload::from),
        })
    }

    async fn sweep_expired_calls(&self) -> Result<SweepExpiredCallsResponse, Error> {
        let trip_ids = self
            .ports
            .trips
            .list_trip_ids_with_pending_calls()
            .await
            .map_err(Error::from)?;

        let mut expired = Vec::new();
        let mut promotions = Vec::new();
        for trip_id in trip_ids {
            let _guard = self.locks.trip(trip_id).await;
            let Some(mut trip) = self
                .ports
                .trips
                .find_by_id(&trip_id)
                .await
                .map_err(Error::from)?
            else {
                continue;
            };
            let sweep = trip.expire_overdue_calls(self.clock.utc(), self.response_window);
            if sweep.expired.is_empty() {
                continue;
            }
            self.save(&trip).await?;
            expired.extend(sweep.expired);
            promotions.extend(sweep.promotions.into_iter().map(PromotionPayload::from));
        }
        if !expired.is_empty() {
            info!(
                expired = expired.len(),
                promotions = promotions.len(),
                "expired overdue waitlist calls"
            );
        }
        Ok(SweepExpiredCallsResponse {
            expired,
            promotions,
        })
    }
}

fn boarding_response(trip: &Trip, entry_id: PassengerEntryId) -> Result<BoardingResponse, Error> {
    let passenger = trip.roster().get(entry_id).ok_or_else(|| {
        Error::internal(format!("passenger entry {entry_id} vanished after update"))
    })?;
    Ok(BoardingResponse {
        trip_id: trip.id(),
        passenger: PassengerPayload::from(passenger),
    })
}

#[async_trait]
impl<R> TripQuery for TripService<R>
where
    R: TripRepository,
{
    async fn get_trip(&self, request: GetTripRequest) -> Result<TripResponse, Error> {
        let trip = self.read_fresh(request.trip_id).await?;
        Ok(trip_response(&trip))
    }

    async fn check_availability(
        &self,
        request: CheckAvailabilityRequest,
    ) -> Result<Availability, Error> {
        let bookings = self
            .ports
            .trips
            .list_bookings_on(request.date)
            .await
            .map_err(Error::from)?;
        Ok(check_availability(
            &bookings,
            &AvailabilityRequest {
                date: request.date,
                vehicle_id: request.vehicle_id,
                driver_id: request.driver_id,
                exclude_trip_id: request.exclude_trip_id,
            },
        ))
    }

    async fn list_waitlist(
        &self,
        request: ListWaitlistRequest,
    ) -> Result<ListWaitlistResponse, Error> {
        let trip = self.read_fresh(request.trip_id).await?;
        Ok(ListWaitlistResponse {
            trip_id: trip.id(),
            seats_available: trip.ledger().seats_available(),
            entries: trip
                .waitlist()
                .in_promotion_order()
                .into_iter()
                .map(WaitlistEntryPayload::from)
                .collect(),
        })
    }
}

#[cfg(test)]
#[path = "trip_service_tests.rs"]
mod tests;
