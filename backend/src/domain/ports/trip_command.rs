//! Driving port for trip mutations.
//!
//! Inbound adapters call this port for every write: trip lifecycle,
//! enrolment, boarding and waitlist responses. Payload types here are shared
//! with [`super::TripQuery`].

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::{
    Checkpoint, CompanionId, DriverId, Error, PassengerEntry, PassengerEntryId, PassengerState,
    PatientId, PriorityTier, Promotion, Trip, TripCategory, TripId, TripStatus, VehicleId,
    WaitlistEntry, WaitlistEntryId, WaitlistState,
};

/// Serializable roster entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PassengerPayload {
    pub id: PassengerEntryId,
    pub patient_id: PatientId,
    pub has_companion: bool,
    pub companion_id: Option<CompanionId>,
    pub state: PassengerState,
    pub enrolled_at: DateTime<Utc>,
    pub waitlist_entry_id: Option<WaitlistEntryId>,
    pub check_in: Option<Checkpoint>,
    pub check_out: Option<Checkpoint>,
    pub cancellation_reason: Option<String>,
}

impl From<&PassengerEntry> for PassengerPayload {
    fn from(value: &PassengerEntry) -> Self {
        Self {
            id: value.id(),
            patient_id: value.patient_id(),
            has_companion: value.has_companion(),
            companion_id: value.companion_id(),
            state: value.state(),
            enrolled_at: value.enrolled_at(),
            waitlist_entry_id: value.waitlist_entry_id(),
            check_in: value.check_in().cloned(),
            check_out: value.check_out().cloned(),
            cancellation_reason: value.cancellation_reason().map(str::to_owned),
        }
    }
}

/// Serializable waitlist entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct WaitlistEntryPayload {
    pub id: WaitlistEntryId,
    pub patient_id: PatientId,
    pub has_companion: bool,
    pub companion_id: Option<CompanionId>,
    pub tier: PriorityTier,
    pub sequence: u64,
    pub state: WaitlistState,
    pub motive: Option<String>,
    pub enqueued_at: DateTime<Utc>,
    pub called_at: Option<DateTime<Utc>>,
    pub response_deadline: Option<DateTime<Utc>>,
    pub resolved_at: Option<DateTime<Utc>>,
}

impl From<&WaitlistEntry> for WaitlistEntryPayload {
    fn from(value: &WaitlistEntry) -> Self {
        Self {
            id: value.id(),
            patient_id: value.patient_id(),
            has_companion: value.has_companion(),
            companion_id: value.companion_id(),
            tier: value.tier(),
            sequence: value.sequence(),
            state: value.state(),
            motive: value.motive().map(str::to_owned),
            enqueued_at: value.enqueued_at(),
            called_at: value.called_at(),
            response_deadline: value.response_deadline(),
            resolved_at: value.resolved_at(),
        }
    }
}

/// Serializable trip with its roster, waitlist and seat counters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TripPayload {
    pub id: TripId,
    pub category: TripCategory,
    pub date: NaiveDate,
    pub departure: NaiveTime,
    pub vehicle_id: VehicleId,
    pub driver_id: DriverId,
    pub status: TripStatus,
    pub capacity: u32,
    pub seats_available: u32,
    pub cancellation_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub passengers: Vec<PassengerPayload>,
    /// Every waitlist entry in promotion order.
    pub waitlist: Vec<WaitlistEntryPayload>,
}

impl From<&Trip> for TripPayload {
    fn from(value: &Trip) -> Self {
        Self {
            id: value.id(),
            category: value.category(),
            date: value.date(),
            departure: value.departure(),
            vehicle_id: value.vehicle_id(),
            driver_id: value.driver_id(),
            status: value.status(),
            capacity: value.ledger().capacity(),
            seats_available: value.ledger().seats_available(),
            cancellation_reason: value.cancellation_reason().map(str::to_owned),
            created_at: value.created_at(),
            passengers: value
                .roster()
                .entries()
                .iter()
                .map(PassengerPayload::from)
                .collect(),
            waitlist: value
                .waitlist()
                .in_promotion_order()
                .into_iter()
                .map(WaitlistEntryPayload::from)
                .collect(),
        }
    }
}

/// A waitlist entry that was just called.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PromotionPayload {
    pub waitlist_entry_id: WaitlistEntryId,
    pub patient_id: PatientId,
    pub response_deadline: DateTime<Utc>,
}

impl From<Promotion> for PromotionPayload {
    fn from(value: Promotion) -> Self {
        Self {
            waitlist_entry_id: value.entry_id,
            patient_id: value.patient_id,
            response_deadline: value.response_deadline,
        }
    }
}

/// Request to schedule a new trip.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTripRequest {
    pub category: TripCategory,
    pub date: NaiveDate,
    pub departure: NaiveTime,
    pub vehicle_id: VehicleId,
    pub driver_id: DriverId,
    /// Defaults to the vehicle's capacity; may not exceed it.
    pub capacity: Option<u32>,
}

/// Request to move a trip to another date, time or resource pairing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RescheduleTripRequest {
    pub trip_id: TripId,
    pub date: NaiveDate,
    pub departure: NaiveTime,
    /// Replacement vehicle; the current one is kept when absent.
    pub vehicle_id: Option<VehicleId>,
    /// Replacement driver; the current one is kept when absent.
    pub driver_id: Option<DriverId>,
}

/// Request to change a scheduled trip's capacity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResizeTripRequest {
    pub trip_id: TripId,
    pub capacity: u32,
}

/// Request naming a trip for a lifecycle transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TripTransitionRequest {
    pub trip_id: TripId,
}

/// Request to cancel a whole trip.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelTripRequest {
    pub trip_id: TripId,
    pub reason: String,
}

/// Request to put a patient on a trip.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrollPatientRequest {
    pub trip_id: TripId,
    pub patient_id: PatientId,
    pub has_companion: bool,
    /// Requires `has_companion`.
    pub companion_id: Option<CompanionId>,
    /// Waitlist tier used when the trip is full. Defaults to normal.
    pub priority: Option<PriorityTier>,
    pub motive: Option<String>,
}

/// Request to take a patient off a trip.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemovePatientRequest {
    pub trip_id: TripId,
    pub patient_id: PatientId,
    pub reason: Option<String>,
}

/// Request to record a check-in or check-out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordBoardingRequest {
    pub entry_id: PassengerEntryId,
    /// Defaults to the service clock.
    pub at: Option<DateTime<Utc>>,
    pub location: Option<String>,
}

/// Request to answer a waitlist call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RespondToCallRequest {
    pub entry_id: WaitlistEntryId,
    pub accept: bool,
}

/// Response carrying the trip after a mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TripResponse {
    pub trip: TripPayload,
}

/// Response for mutations that may call a waitlist entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TripChangeResponse {
    pub trip: TripPayload,
    pub promotion: Option<PromotionPayload>,
}

/// Response from completing a trip.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CompleteTripResponse {
    pub trip: TripPayload,
    /// Entries marked no-show by this call.
    pub no_shows: Vec<PassengerEntryId>,
    pub already_completed: bool,
}

/// Response from cancelling a trip.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CancelTripResponse {
    pub trip: TripPayload,
    pub passengers_cancelled: usize,
    pub waitlist_cancelled: usize,
}

/// Where an enrolment request landed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum EnrollmentStatus {
    Enrolled,
    Waitlisted,
}

/// Response from enrolling a patient.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EnrollPatientResponse {
    pub trip_id: TripId,
    pub outcome: EnrollmentStatus,
    pub passenger_entry_id: Option<PassengerEntryId>,
    pub waitlist_entry_id: Option<WaitlistEntryId>,
    /// Set for waitlisted requests.
    pub tier: Option<PriorityTier>,
    /// Set for waitlisted requests.
    pub sequence: Option<u64>,
    pub seats_available: u32,
}

/// What a removal cancelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum RemovalStatus {
    PassengerCancelled,
    WaitlistCancelled,
}

/// Response from removing a patient.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RemovePatientResponse {
    pub trip_id: TripId,
    pub outcome: RemovalStatus,
    pub passenger_entry_id: Option<PassengerEntryId>,
    pub waitlist_entry_id: Option<WaitlistEntryId>,
    pub seats_released: u32,
    pub seats_available: u32,
    pub promotion: Option<PromotionPayload>,
}

/// Response from a check-in or check-out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BoardingResponse {
    pub trip_id: TripId,
    pub passenger: PassengerPayload,
}

/// How a waitlist call was resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum CallOutcome {
    Confirmed,
    Declined,
    Expired,
    Requeued,
}

/// Response from answering a waitlist call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RespondToCallResponse {
    pub trip_id: TripId,
    pub waitlist_entry_id: WaitlistEntryId,
    pub outcome: CallOutcome,
    /// Set when the call was confirmed.
    pub passenger_entry_id: Option<PassengerEntryId>,
    pub seats_available: u32,
    pub promotion: Option<PromotionPayload>,
}

/// Response from sweeping overdue waitlist calls.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SweepExpiredCallsResponse {
    pub expired: Vec<WaitlistEntryId>,
    pub promotions: Vec<PromotionPayload>,
}

/// Driving port for trip write operations.
///
/// Every method serialises on the affected trip. Trip creation and
/// rescheduling additionally serialise on the `(date, vehicle)` and
/// `(date, driver)` pairs they touch.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TripCommand: Send + Sync {
    /// Check availability and persist a scheduled trip.
    async fn create_trip(&self, request: CreateTripRequest) -> Result<TripResponse, Error>;

    /// Re-run availability excluding the trip itself, then move it.
    async fn reschedule_trip(
        &self,
        request: RescheduleTripRequest,
    ) -> Result<TripChangeResponse, Error>;

    /// Change capacity, bounded by the vehicle's seats.
    async fn resize_trip(&self, request: ResizeTripRequest) -> Result<TripChangeResponse, Error>;

    async fn confirm_trip(&self, request: TripTransitionRequest) -> Result<TripResponse, Error>;

    async fn start_trip(&self, request: TripTransitionRequest) -> Result<TripResponse, Error>;

    /// Complete the trip and sweep unboarded passengers to no-show.
    async fn complete_trip(
        &self,
        request: TripTransitionRequest,
    ) -> Result<CompleteTripResponse, Error>;

    /// Cancel the trip and everything attached to it.
    async fn cancel_trip(&self, request: CancelTripRequest) -> Result<CancelTripResponse, Error>;

    /// Seat the patient or, when the trip is full, add them to the waitlist.
    async fn enroll_patient(
        &self,
        request: EnrollPatientRequest,
    ) -> Result<EnrollPatientResponse, Error>;

    /// Cancel the patient's roster or waitlist entry.
    async fn remove_patient(
        &self,
        request: RemovePatientRequest,
    ) -> Result<RemovePatientResponse, Error>;

    async fn check_in(&self, request: RecordBoardingRequest) -> Result<BoardingResponse, Error>;

    async fn check_out(&self, request: RecordBoardingRequest) -> Result<BoardingResponse, Error>;

    /// Accept or decline a waitlist call.
    async fn respond_to_call(
        &self,
        request: RespondToCallRequest,
    ) -> Result<RespondToCallResponse, Error>;

    /// Expire overdue calls on every trip and promote replacements.
    async fn sweep_expired_calls(&self) -> Result<SweepExpiredCallsResponse, Error>;
}
