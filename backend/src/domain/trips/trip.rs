//! The trip aggregate.
//!
//! A [`Trip`] owns its seat ledger, roster and waitlist. Every mutation goes
//! through a method on the aggregate so the three stay consistent; the seat
//! invariant is re-checked after each one.

use std::fmt;

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, error, info, warn};
use utoipa::ToSchema;

use crate::domain::{
    CompanionId, DriverId, Error, PassengerEntryId, PatientId, TripBooking, TripId, VehicleId,
    WaitlistEntryId,
};

use super::{
    LedgerError, Occupancy, PassengerEntry, PassengerEntryDraft, PassengerStateError,
    PriorityTier, Roster, SeatLedger, Waitlist, WaitlistEntryDraft, WaitlistError, WaitlistState,
};

/// The two trip categories competing for one vehicle and driver pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum TripCategory {
    /// Shared run with several unrelated patients.
    Group,
    /// Dedicated run for a single patient booking.
    Individual,
}

impl TripCategory {
    /// Wire label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Group => "group",
            Self::Individual => "individual",
        }
    }
}

impl fmt::Display for TripCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Trip lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum TripStatus {
    /// Created and open for enrolment.
    Scheduled,
    /// Confirmed with the driver; still open for enrolment.
    Confirmed,
    /// Vehicle has departed; boarding only.
    InProgress,
    /// Finished; unboarded passengers were marked as no-shows.
    Completed,
    /// Called off; every passenger and waitlist entry was cancelled.
    Cancelled,
}

impl TripStatus {
    /// Wire label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Scheduled => "scheduled",
            Self::Confirmed => "confirmed",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }

    /// Whether a trip in this status still commits its vehicle and driver.
    #[must_use]
    pub const fn holds_resources(self) -> bool {
        !matches!(self, Self::Completed | Self::Cancelled)
    }
}

impl fmt::Display for TripStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

const ENROLLABLE: &[TripStatus] = &[TripStatus::Scheduled, TripStatus::Confirmed];
const BOARDING: &[TripStatus] = &[
    TripStatus::Scheduled,
    TripStatus::Confirmed,
    TripStatus::InProgress,
];

/// Errors raised by the trip aggregate.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TripError {
    /// Seat ledger rejected the change.
    #[error(transparent)]
    Ledger(#[from] LedgerError),
    /// Passenger state machine rejected the transition.
    #[error(transparent)]
    Passenger(#[from] PassengerStateError),
    /// Waitlist rejected the operation.
    #[error(transparent)]
    Waitlist(#[from] WaitlistError),
    /// Operation not allowed in the trip's status.
    #[error("trip {trip_id} is {status}; cannot {operation}")]
    InvalidTripState {
        trip_id: TripId,
        status: TripStatus,
        operation: &'static str,
    },
    /// The patient already holds a seat.
    #[error("patient {patient_id} is already enrolled on trip {trip_id} as {entry_id}")]
    DuplicatePassenger {
        trip_id: TripId,
        patient_id: PatientId,
        entry_id: PassengerEntryId,
    },
    /// No roster entry with this id.
    #[error("passenger entry {entry_id} not found on trip {trip_id}")]
    PassengerNotFound {
        trip_id: TripId,
        entry_id: PassengerEntryId,
    },
    /// The patient is neither seated nor waitlisted.
    #[error("patient {patient_id} is not on trip {trip_id}")]
    PatientNotOnTrip {
        trip_id: TripId,
        patient_id: PatientId,
    },
}

impl From<TripError> for Error {
    fn from(err: TripError) -> Self {
        let message = err.to_string();
        match err {
            TripError::Ledger(LedgerError::InvalidCapacity { capacity }) => {
                Error::invalid_request(message).with_details(json!({ "capacity": capacity }))
            }
            TripError::Ledger(LedgerError::InsufficientSeats {
                requested,
                available,
            }) => Error::conflict(message).with_details(json!({
                "reason": "insufficient_seats",
                "requested": requested,
                "available": available,
            })),
            TripError::Ledger(LedgerError::ResizeBelowOccupied {
                requested,
                occupied,
            }) => Error::invalid_state(message).with_details(json!({
                "requested": requested,
                "occupied": occupied,
            })),
            TripError::Passenger(inner) => Error::invalid_state(message)
                .with_details(json!({ "entryId": inner.entry_id() })),
            TripError::Waitlist(WaitlistError::DuplicateActiveEntry {
                patient_id,
                entry_id,
            }) => Error::conflict(message).with_details(json!({
                "reason": "duplicate_waitlist_entry",
                "patientId": patient_id,
                "waitlistEntryId": entry_id,
            })),
            TripError::Waitlist(WaitlistError::EntryNotFound { entry_id }) => {
                Error::not_found(message).with_details(json!({ "waitlistEntryId": entry_id }))
            }
            TripError::Waitlist(WaitlistError::NotCalled { entry_id, state }) => {
                Error::invalid_state(message).with_details(json!({
                    "waitlistEntryId": entry_id,
                    "state": state,
                }))
            }
            TripError::Waitlist(WaitlistError::DeadlineOutOfRange { entry_id, .. }) => {
                Error::internal(message).with_details(json!({ "waitlistEntryId": entry_id }))
            }
            TripError::InvalidTripState {
                trip_id,
                status,
                operation,
            } => Error::invalid_state(message).with_details(json!({
                "tripId": trip_id,
                "status": status,
                "operation": operation,
            })),
            TripError::DuplicatePassenger {
                trip_id,
                patient_id,
                entry_id,
            } => Error::conflict(message).with_details(json!({
                "reason": "duplicate_passenger",
                "tripId": trip_id,
                "patientId": patient_id,
                "entryId": entry_id,
            })),
            TripError::PassengerNotFound { trip_id, entry_id } => Error::not_found(message)
                .with_details(json!({ "tripId": trip_id, "entryId": entry_id })),
            TripError::PatientNotOnTrip {
                trip_id,
                patient_id,
            } => Error::not_found(message)
                .with_details(json!({ "tripId": trip_id, "patientId": patient_id })),
        }
    }
}

/// Input payload for [`Trip::new`].
#[derive(Debug, Clone)]
pub struct TripDraft {
    /// Identifier for the new trip.
    pub id: TripId,
    /// Group or individual run.
    pub category: TripCategory,
    /// Calendar date of the trip.
    pub date: NaiveDate,
    /// Scheduled departure time.
    pub departure: NaiveTime,
    /// Assigned vehicle.
    pub vehicle_id: VehicleId,
    /// Assigned driver.
    pub driver_id: DriverId,
    /// Seats offered, at least one.
    pub capacity: u32,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

/// A patient asking for a seat.
#[derive(Debug, Clone)]
pub struct EnrollmentRequest {
    /// Patient asking for a seat.
    pub patient_id: PatientId,
    /// Whether a companion takes a second seat.
    pub has_companion: bool,
    /// The companion, when one is named.
    pub companion_id: Option<CompanionId>,
    /// Waitlist tier used when no seat is free.
    pub tier: PriorityTier,
    /// Free-text reason for the trip.
    pub motive: Option<String>,
}

/// Result of [`Trip::enroll`]. Running out of seats is not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnrollmentOutcome {
    /// Seated on the trip.
    Enrolled {
        entry_id: PassengerEntryId,
        seats_available: u32,
        from_waitlist: Option<WaitlistEntryId>,
    },
    /// Queued on the waitlist.
    Waitlisted {
        entry_id: WaitlistEntryId,
        tier: PriorityTier,
        sequence: u64,
    },
}

/// A waitlist entry that was just called.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Promotion {
    /// Called waitlist entry.
    pub entry_id: WaitlistEntryId,
    /// Patient offered the seat.
    pub patient_id: PatientId,
    /// Deadline for the patient's answer.
    pub response_deadline: DateTime<Utc>,
}

/// Result of removing a patient from a trip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemovalOutcome {
    /// A seated passenger was cancelled.
    PassengerCancelled {
        entry_id: PassengerEntryId,
        seats_released: u32,
        promotion: Option<Promotion>,
    },
    /// A waitlist entry was withdrawn.
    WaitlistCancelled {
        entry_id: WaitlistEntryId,
    },
}

/// How a waitlist call was resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallResponseOutcome {
    /// Accepted and seated.
    Confirmed { passenger_entry_id: PassengerEntryId },
    /// Declined by the patient.
    Declined,
    /// Answered after the deadline.
    Expired,
    /// Seats ran out before the acceptance landed; the entry waits again.
    Requeued,
}

/// Result of [`Trip::respond_to_call`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallResponse {
    /// Entry the answer applies to.
    pub waitlist_entry_id: WaitlistEntryId,
    /// How the call was resolved.
    pub outcome: CallResponseOutcome,
    /// Next entry called, if a seat is still free.
    pub promotion: Option<Promotion>,
}

/// Result of [`Trip::complete`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionOutcome {
    /// Entries marked as no-shows by this call.
    pub no_shows: Vec<PassengerEntryId>,
    /// Whether the trip was completed before.
    pub already_completed: bool,
}

/// Result of [`Trip::cancel`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CancellationOutcome {
    /// Roster entries cancelled.
    pub passengers_cancelled: usize,
    /// Waitlist entries cancelled.
    pub waitlist_cancelled: usize,
}

/// Result of [`Trip::resize`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResizeOutcome {
    /// New capacity.
    pub capacity: u32,
    /// Free seats after the resize.
    pub seats_available: u32,
    /// Entry called into newly freed seats.
    pub promotion: Option<Promotion>,
}

/// New date, time and resources for [`Trip::reschedule`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduleChange {
    /// New calendar date.
    pub date: NaiveDate,
    /// New departure time.
    pub departure: NaiveTime,
    /// New vehicle.
    pub vehicle_id: VehicleId,
    /// New driver.
    pub driver_id: DriverId,
    /// Replacement capacity when the vehicle changes.
    pub capacity: Option<u32>,
}

/// Result of [`Trip::expire_overdue_calls`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExpirySweep {
    /// Calls that passed their deadline.
    pub expired: Vec<WaitlistEntryId>,
    /// Entries called into the freed places.
    pub promotions: Vec<Promotion>,
}

/// One scheduled shared-vehicle movement.
///
/// ## Invariants
/// - `seats_available = capacity - occupied seats of the roster`
/// - at most one active roster entry and one active waitlist entry per
///   patient, never both at once
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Trip {
    id: TripId,
    category: TripCategory,
    date: NaiveDate,
    departure: NaiveTime,
    vehicle_id: VehicleId,
    driver_id: DriverId,
    status: TripStatus,
    ledger: SeatLedger,
    roster: Roster,
    waitlist: Waitlist,
    cancellation_reason: Option<String>,
    created_at: DateTime<Utc>,
}

impl Trip {
    /// Create a scheduled trip with every seat free.
    pub fn new(draft: TripDraft) -> Result<Self, TripError> {
        let ledger = SeatLedger::new(draft.capacity)?;
        Ok(Self {
            id: draft.id,
            category: draft.category,
            date: draft.date,
            departure: draft.departure,
            vehicle_id: draft.vehicle_id,
            driver_id: draft.driver_id,
            status: TripStatus::Scheduled,
            ledger,
            roster: Roster::default(),
            waitlist: Waitlist::default(),
            cancellation_reason: None,
            created_at: draft.created_at,
        })
    }

    /// Trip identifier.
    pub fn id(&self) -> TripId {
        self.id
    }

    /// Trip category.
    pub fn category(&self) -> TripCategory {
        self.category
    }

    /// Calendar date.
    pub fn date(&self) -> NaiveDate {
        self.date
    }

    /// Scheduled departure time.
    pub fn departure(&self) -> NaiveTime {
        self.departure
    }

    /// Assigned vehicle.
    pub fn vehicle_id(&self) -> VehicleId {
        self.vehicle_id
    }

    /// Assigned driver.
    pub fn driver_id(&self) -> DriverId {
        self.driver_id
    }

    /// Lifecycle status.
    pub fn status(&self) -> TripStatus {
        self.status
    }

    /// Seat counters.
    pub fn ledger(&self) -> &SeatLedger {
        &self.ledger
    }

    /// Passenger roster.
    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    /// Waitlist.
    pub fn waitlist(&self) -> &Waitlist {
        &self.waitlist
    }

    /// Reason given when the trip was cancelled.
    pub fn cancellation_reason(&self) -> Option<&str> {
        self.cancellation_reason.as_deref()
    }

    /// Creation timestamp.
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Resource commitment consulted by the availability checker.
    pub fn booking(&self) -> TripBooking {
        TripBooking {
            trip_id: self.id,
            category: self.category,
            date: self.date,
            vehicle_id: self.vehicle_id,
            driver_id: self.driver_id,
            status: self.status,
        }
    }

    fn ensure_status(
        &self,
        allowed: &[TripStatus],
        operation: &'static str,
    ) -> Result<(), TripError> {
        if allowed.contains(&self.status) {
            return Ok(());
        }
        Err(TripError::InvalidTripState {
            trip_id: self.id,
            status: self.status,
            operation,
        })
    }

    /// Seat a patient, or queue them when the trip is full.
    pub fn enroll(
        &mut self,
        request: EnrollmentRequest,
        now: DateTime<Utc>,
    ) -> Result<EnrollmentOutcome, TripError> {
        self.ensure_status(ENROLLABLE, "enroll")?;
        if let Some(existing) = self.roster.active_for(request.patient_id) {
            return Err(TripError::DuplicatePassenger {
                trip_id: self.id,
                patient_id: request.patient_id,
                entry_id: existing.id(),
            });
        }

        let occupancy = Occupancy::for_companion(request.has_companion);
        let waitlisted = self
            .waitlist
            .active_for(request.patient_id)
            .map(|entry| entry.id());

        if self.ledger.can_fit(occupancy) {
            self.ledger.reserve(occupancy)?;
            let from_waitlist = waitlisted
                .and_then(|_| self.waitlist.cancel_for_patient(request.patient_id, now));
            let entry = PassengerEntry::new(PassengerEntryDraft {
                patient_id: request.patient_id,
                has_companion: request.has_companion,
                companion_id: request.companion_id,
                enrolled_at: now,
                waitlist_entry_id: from_waitlist,
            });
            let entry_id = entry.id();
            self.roster.push(entry);
            self.verify_seat_invariant("enroll");
            info!(
                trip_id = %self.id,
                patient_id = %request.patient_id,
                entry_id = %entry_id,
                seats_available = self.ledger.seats_available(),
                "patient enrolled"
            );
            return Ok(EnrollmentOutcome::Enrolled {
                entry_id,
                seats_available: self.ledger.seats_available(),
                from_waitlist,
            });
        }

        if let Some(entry_id) = waitlisted {
            return Err(WaitlistError::DuplicateActiveEntry {
                patient_id: request.patient_id,
                entry_id,
            }
            .into());
        }

        let entry_id = self.waitlist.enqueue(WaitlistEntryDraft {
            patient_id: request.patient_id,
            has_companion: request.has_companion,
            companion_id: request.companion_id,
            tier: request.tier,
            motive: request.motive,
            enqueued_at: now,
        })?;
        let sequence = self
            .waitlist
            .get(entry_id)
            .map_or(0, |entry| entry.sequence());
        info!(
            trip_id = %self.id,
            patient_id = %request.patient_id,
            entry_id = %entry_id,
            tier = %request.tier,
            sequence,
            "insufficient seats; patient waitlisted"
        );
        Ok(EnrollmentOutcome::Waitlisted {
            entry_id,
            tier: request.tier,
            sequence,
        })
    }

    /// Cancel the patient's roster entry, or their waitlist entry when they
    /// are only queued.
    pub fn remove_patient(
        &mut self,
        patient_id: PatientId,
        reason: &str,
        now: DateTime<Utc>,
        response_window: Duration,
    ) -> Result<RemovalOutcome, TripError> {
        self.ensure_status(BOARDING, "remove a patient")?;
        if let Some(entry_id) = self.roster.active_for(patient_id).map(PassengerEntry::id) {
            return self.cancel_entry(entry_id, reason, now, response_window);
        }
        if let Some(entry_id) = self.waitlist.cancel_for_patient(patient_id, now) {
            info!(trip_id = %self.id, %patient_id, entry_id = %entry_id, "waitlist entry cancelled");
            return Ok(RemovalOutcome::WaitlistCancelled { entry_id });
        }
        Err(TripError::PatientNotOnTrip {
            trip_id: self.id,
            patient_id,
        })
    }

    /// Cancel one roster entry before boarding.
    pub fn cancel_passenger(
        &mut self,
        entry_id: PassengerEntryId,
        reason: &str,
        now: DateTime<Utc>,
        response_window: Duration,
    ) -> Result<RemovalOutcome, TripError> {
        self.ensure_status(BOARDING, "cancel a passenger")?;
        self.cancel_entry(entry_id, reason, now, response_window)
    }

    fn cancel_entry(
        &mut self,
        entry_id: PassengerEntryId,
        reason: &str,
        now: DateTime<Utc>,
        response_window: Duration,
    ) -> Result<RemovalOutcome, TripError> {
        let trip_id = self.id;
        let entry = self
            .roster
            .get_mut(entry_id)
            .ok_or(TripError::PassengerNotFound { trip_id, entry_id })?;
        let occupancy = entry.cancel(reason)?;
        let seats_released = self.ledger.release(occupancy);
        self.verify_seat_invariant("cancel passenger");
        info!(
            trip_id = %trip_id,
            entry_id = %entry_id,
            seats_released,
            seats_available = self.ledger.seats_available(),
            "passenger cancelled"
        );
        let promotion = self.promote_next(now, response_window);
        Ok(RemovalOutcome::PassengerCancelled {
            entry_id,
            seats_released,
            promotion,
        })
    }

    /// Record boarding for a roster entry.
    pub fn check_in(
        &mut self,
        entry_id: PassengerEntryId,
        at: DateTime<Utc>,
        location: Option<String>,
    ) -> Result<(), TripError> {
        self.ensure_status(BOARDING, "check in")?;
        let trip_id = self.id;
        self.roster
            .get_mut(entry_id)
            .ok_or(TripError::PassengerNotFound { trip_id, entry_id })?
            .record_check_in(at, location)?;
        debug!(trip_id = %trip_id, entry_id = %entry_id, "passenger checked in");
        Ok(())
    }

    /// Record alighting for a roster entry.
    pub fn check_out(
        &mut self,
        entry_id: PassengerEntryId,
        at: DateTime<Utc>,
        location: Option<String>,
    ) -> Result<(), TripError> {
        self.ensure_status(BOARDING, "check out")?;
        let trip_id = self.id;
        self.roster
            .get_mut(entry_id)
            .ok_or(TripError::PassengerNotFound { trip_id, entry_id })?
            .record_check_out(at, location)?;
        debug!(trip_id = %trip_id, entry_id = %entry_id, "passenger checked out");
        Ok(())
    }

    /// Call the best-ranked waiting entry that fits the free seats.
    ///
    /// Seats are not held for the called patient; they are reserved only when
    /// the call is accepted. Overdue calls are expired first. No-op once the
    /// trip no longer takes enrolments.
    pub fn promote_next(
        &mut self,
        now: DateTime<Utc>,
        response_window: Duration,
    ) -> Option<Promotion> {
        if !ENROLLABLE.contains(&self.status) {
            return None;
        }
        for expired in self.waitlist.expire_overdue(now) {
            info!(trip_id = %self.id, entry_id = %expired, "waitlist call expired");
        }
        let entry_id = self.waitlist.next_fitting(self.ledger.seats_available())?;
        let response_deadline = match self.waitlist.call(entry_id, now, response_window) {
            Ok(deadline) => deadline,
            Err(err) => {
                error!(trip_id = %self.id, entry_id = %entry_id, error = %err, "failed to call waitlist entry");
                return None;
            }
        };
        let patient_id = self.waitlist.get(entry_id)?.patient_id();
        info!(
            trip_id = %self.id,
            entry_id = %entry_id,
            %patient_id,
            %response_deadline,
            seats_available = self.ledger.seats_available(),
            "waitlist entry called"
        );
        Some(Promotion {
            entry_id,
            patient_id,
            response_deadline,
        })
    }

    /// Resolve a waitlist call.
    ///
    /// A response to a call that is already past its deadline reports
    /// [`CallResponseOutcome::Expired`] rather than failing.
    pub fn respond_to_call(
        &mut self,
        entry_id: WaitlistEntryId,
        accepted: bool,
        now: DateTime<Utc>,
        response_window: Duration,
    ) -> Result<CallResponse, TripError> {
        self.ensure_status(ENROLLABLE, "respond to a waitlist call")?;
        let entry = self
            .waitlist
            .get(entry_id)
            .ok_or(WaitlistError::EntryNotFound { entry_id })?;

        if entry.state() == WaitlistState::Expired {
            return Ok(CallResponse {
                waitlist_entry_id: entry_id,
                outcome: CallResponseOutcome::Expired,
                promotion: None,
            });
        }
        if entry.is_overdue(now) {
            self.waitlist.expire(entry_id, now)?;
            info!(trip_id = %self.id, entry_id = %entry_id, "late response; waitlist call expired");
            let promotion = self.promote_next(now, response_window);
            return Ok(CallResponse {
                waitlist_entry_id: entry_id,
                outcome: CallResponseOutcome::Expired,
                promotion,
            });
        }

        let entry = self.waitlist.called_entry(entry_id)?;
        let patient_id = entry.patient_id();
        let has_companion = entry.has_companion();
        let companion_id = entry.companion_id();
        let occupancy = entry.occupancy();

        if !accepted {
            self.waitlist.decline(entry_id, now)?;
            info!(trip_id = %self.id, entry_id = %entry_id, "waitlist call declined");
            let promotion = self.promote_next(now, response_window);
            return Ok(CallResponse {
                waitlist_entry_id: entry_id,
                outcome: CallResponseOutcome::Declined,
                promotion,
            });
        }

        if let Some(existing) = self.roster.active_for(patient_id) {
            return Err(TripError::DuplicatePassenger {
                trip_id: self.id,
                patient_id,
                entry_id: existing.id(),
            });
        }

        if let Err(err) = self.ledger.reserve(occupancy) {
            self.waitlist.requeue(entry_id)?;
            warn!(
                trip_id = %self.id,
                entry_id = %entry_id,
                error = %err,
                "seats taken before acceptance; entry requeued"
            );
            let promotion = self.promote_next(now, response_window);
            return Ok(CallResponse {
                waitlist_entry_id: entry_id,
                outcome: CallResponseOutcome::Requeued,
                promotion,
            });
        }

        self.waitlist.confirm(entry_id, now)?;
        let passenger = PassengerEntry::new(PassengerEntryDraft {
            patient_id,
            has_companion,
            companion_id,
            enrolled_at: now,
            waitlist_entry_id: Some(entry_id),
        });
        let passenger_entry_id = passenger.id();
        self.roster.push(passenger);
        self.verify_seat_invariant("accept waitlist call");
        info!(
            trip_id = %self.id,
            entry_id = %entry_id,
            passenger_entry_id = %passenger_entry_id,
            seats_available = self.ledger.seats_available(),
            "waitlist call accepted"
        );
        Ok(CallResponse {
            waitlist_entry_id: entry_id,
            outcome: CallResponseOutcome::Confirmed { passenger_entry_id },
            promotion: None,
        })
    }

    /// Expire every overdue call and retry promotion once per expiry.
    pub fn expire_overdue_calls(
        &mut self,
        now: DateTime<Utc>,
        response_window: Duration,
    ) -> ExpirySweep {
        let expired = self.waitlist.expire_overdue(now);
        let mut promotions = Vec::new();
        for entry_id in &expired {
            info!(trip_id = %self.id, entry_id = %entry_id, "waitlist call expired");
            if let Some(promotion) = self.promote_next(now, response_window) {
                promotions.push(promotion);
            }
        }
        ExpirySweep {
            expired,
            promotions,
        }
    }

    /// `scheduled -> confirmed`.
    pub fn confirm(&mut self) -> Result<(), TripError> {
        self.ensure_status(&[TripStatus::Scheduled], "confirm")?;
        self.status = TripStatus::Confirmed;
        Ok(())
    }

    /// `confirmed -> in_progress`.
    pub fn start(&mut self) -> Result<(), TripError> {
        self.ensure_status(&[TripStatus::Confirmed], "start")?;
        self.status = TripStatus::InProgress;
        Ok(())
    }

    /// Finish the trip and mark confirmed passengers that never boarded as
    /// no-shows. Seats are not released. Completing twice is a no-op.
    pub fn complete(&mut self, now: DateTime<Utc>) -> Result<CompletionOutcome, TripError> {
        if self.status == TripStatus::Completed {
            return Ok(CompletionOutcome {
                no_shows: Vec::new(),
                already_completed: true,
            });
        }
        self.ensure_status(&[TripStatus::Confirmed, TripStatus::InProgress], "complete")?;
        let no_shows: Vec<PassengerEntryId> = self
            .roster
            .iter_mut()
            .filter_map(|entry| entry.mark_no_show().then(|| entry.id()))
            .collect();
        let waitlist_cancelled = self.waitlist.cancel_all_active(now);
        self.status = TripStatus::Completed;
        self.verify_seat_invariant("complete");
        info!(
            trip_id = %self.id,
            no_shows = no_shows.len(),
            waitlist_cancelled,
            "trip completed"
        );
        Ok(CompletionOutcome {
            no_shows,
            already_completed: false,
        })
    }

    /// Cancel the whole trip, cascading to the roster and the waitlist.
    ///
    /// Released seats are not offered to the waitlist.
    pub fn cancel(
        &mut self,
        reason: &str,
        now: DateTime<Utc>,
    ) -> Result<CancellationOutcome, TripError> {
        self.ensure_status(BOARDING, "cancel")?;
        let released: Vec<Occupancy> = self
            .roster
            .iter_mut()
            .filter_map(|entry| entry.cancel_with_trip(reason).then(|| entry.occupancy()))
            .collect();
        for occupancy in &released {
            self.ledger.release(*occupancy);
        }
        let waitlist_cancelled = self.waitlist.cancel_all_active(now);
        self.status = TripStatus::Cancelled;
        self.cancellation_reason = Some(reason.to_owned());
        self.verify_seat_invariant("cancel trip");
        info!(
            trip_id = %self.id,
            passengers_cancelled = released.len(),
            waitlist_cancelled,
            "trip cancelled"
        );
        Ok(CancellationOutcome {
            passengers_cancelled: released.len(),
            waitlist_cancelled,
        })
    }

    /// Change capacity while scheduled. Growth triggers one promotion.
    pub fn resize(
        &mut self,
        new_capacity: u32,
        now: DateTime<Utc>,
        response_window: Duration,
    ) -> Result<ResizeOutcome, TripError> {
        self.ensure_status(&[TripStatus::Scheduled], "resize")?;
        let grew = self.apply_capacity(new_capacity)?;
        let promotion = if grew {
            self.promote_next(now, response_window)
        } else {
            None
        };
        Ok(ResizeOutcome {
            capacity: self.ledger.capacity(),
            seats_available: self.ledger.seats_available(),
            promotion,
        })
    }

    /// Move the trip to a new date, time or resource pairing.
    ///
    /// The caller has already checked availability. A capacity change follows
    /// the resize rules and is applied before anything else so a rejected
    /// shrink leaves the trip untouched.
    pub fn reschedule(
        &mut self,
        change: ScheduleChange,
        now: DateTime<Utc>,
        response_window: Duration,
    ) -> Result<Option<Promotion>, TripError> {
        self.ensure_status(ENROLLABLE, "reschedule")?;
        let grew = match change.capacity {
            Some(capacity) => self.apply_capacity(capacity)?,
            None => false,
        };
        self.date = change.date;
        self.departure = change.departure;
        self.vehicle_id = change.vehicle_id;
        self.driver_id = change.driver_id;
        info!(
            trip_id = %self.id,
            date = %self.date,
            vehicle_id = %self.vehicle_id,
            driver_id = %self.driver_id,
            capacity = self.ledger.capacity(),
            "trip rescheduled"
        );
        Ok(if grew {
            self.promote_next(now, response_window)
        } else {
            None
        })
    }

    fn apply_capacity(&mut self, new_capacity: u32) -> Result<bool, TripError> {
        let previous = self.ledger.capacity();
        self.ledger.resize(new_capacity)?;
        self.verify_seat_invariant("resize");
        Ok(new_capacity > previous)
    }

    /// Check the ledger against the roster and repair it if they disagree.
    ///
    /// Drift means seat mutations escaped the per-trip lock: debug builds
    /// panic, release builds clamp and raise an alert.
    fn verify_seat_invariant(&mut self, operation: &'static str) {
        let occupied = self.roster.occupied_seats();
        let consistent =
            occupied <= self.ledger.capacity() && self.ledger.occupied() == occupied;
        debug_assert!(
            consistent,
            "seat ledger drifted during {operation}: capacity {}, available {}, roster occupies {occupied}",
            self.ledger.capacity(),
            self.ledger.seats_available(),
        );
        if !consistent {
            error!(
                alert = true,
                trip_id = %self.id,
                operation,
                capacity = self.ledger.capacity(),
                seats_available = self.ledger.seats_available(),
                occupied,
                "seat ledger out of sync with roster; reconciling"
            );
            self.ledger.reconcile(occupied);
        }
    }
}
