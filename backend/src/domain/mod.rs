//! Domain primitives, aggregates and services.
//!
//! Purpose: model trips on shared vehicles, their seat ledger, roster and
//! waitlist, and the service that serialises changes to them. Adapters
//! reach the domain only through [`ports`].
//!
//! Public surface:
//! - Error (alias to `error::Error`): API error response payload.
//! - ErrorCode (alias to `error::ErrorCode`): stable error identifier.
//! - Trip (alias to `trips::Trip`): the trip aggregate.
//! - TripService (alias to `trip_service::TripService`): port implementation.

pub mod availability;
pub mod error;
pub mod ids;
pub mod ports;
pub mod trace_id;
pub mod trip_locks;
pub mod trip_service;
pub mod trips;

pub use self::availability::{
    Availability, AvailabilityRequest, ConflictingResource, TripBooking, check_availability,
};
pub use self::error::{Error, ErrorCode, ErrorValidationError};
pub use self::ids::{
    CompanionId, DriverId, PassengerEntryId, PatientId, TripId, VehicleId, WaitlistEntryId,
};
pub use self::trace_id::{TRACE_ID_HEADER, TraceId};
pub use self::trip_locks::TripLocks;
pub use self::trip_service::{TripService, TripServicePorts};
pub use self::trips::{
    CallResponse, CallResponseOutcome, CancellationOutcome, Checkpoint, CompletionOutcome,
    EnrollmentOutcome, EnrollmentRequest, ExpirySweep, LedgerError, Occupancy,
    ParsePriorityTierError, PassengerEntry, PassengerEntryDraft, PassengerState,
    PassengerStateError, PriorityTier, Promotion, RemovalOutcome, ResizeOutcome, Roster,
    ScheduleChange, SeatLedger, Trip, TripCategory, TripDraft, TripError, TripStatus, Waitlist,
    WaitlistEntry, WaitlistEntryDraft, WaitlistError, WaitlistState,
};

/// Convenient API result alias.
///
/// # Examples
/// ```
/// use actix_web::HttpResponse;
/// use ridepool::domain::{ApiResult, Error};
///
/// fn handler() -> ApiResult<HttpResponse> {
///     Err(Error::invalid_state("trip already departed"))
/// }
/// ```
pub type ApiResult<T> = Result<T, Error>;
