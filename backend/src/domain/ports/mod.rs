//! Domain ports and supporting types for the hexagonal boundary.
//!
//! Driven ports (`TripRepository` and the directories) are implemented by
//! outbound adapters. Driving ports (`TripCommand`, `TripQuery`) are
//! implemented by the trip service and consumed by inbound adapters.

mod macros;
pub(crate) use macros::define_port_error;

mod directories;
mod trip_command;
mod trip_query;
mod trip_repository;

#[cfg(test)]
pub use directories::{
    MockCompanionDirectory, MockDriverDirectory, MockPatientDirectory, MockVehicleDirectory,
};
pub use directories::{
    CompanionDirectory, CompanionRecord, DirectoryError, DriverDirectory, DriverRecord,
    FixtureDirectory, PatientDirectory, PatientRecord, VehicleDirectory, VehicleRecord,
};
#[cfg(test)]
pub use trip_command::MockTripCommand;
pub use trip_command::{
    BoardingResponse, CallOutcome, CancelTripRequest, CancelTripResponse, CompleteTripResponse,
    CreateTripRequest, EnrollPatientRequest, EnrollPatientResponse, EnrollmentStatus,
    PassengerPayload, PromotionPayload, RecordBoardingRequest, RemovalStatus,
    RemovePatientRequest, RemovePatientResponse, RescheduleTripRequest, ResizeTripRequest,
    RespondToCallRequest, RespondToCallResponse, SweepExpiredCallsResponse, TripChangeResponse,
    TripCommand, TripPayload, TripResponse, TripTransitionRequest, WaitlistEntryPayload,
};
#[cfg(test)]
pub use trip_query::MockTripQuery;
pub use trip_query::{
    CheckAvailabilityRequest, GetTripRequest, ListWaitlistRequest, ListWaitlistResponse,
    TripQuery,
};
#[cfg(test)]
pub use trip_repository::MockTripRepository;
pub use trip_repository::{FixtureTripRepository, TripRepository, TripRepositoryError};
