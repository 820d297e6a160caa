//! Port for trip persistence and booking lookups.

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::domain::{PassengerEntryId, Trip, TripBooking, TripId, WaitlistEntryId};

use super::define_port_error;

define_port_error! {
    /// Errors raised by trip repository adapters.
    pub enum TripRepositoryError {
        /// Repository connection could not be established.
        Connection { message: String } as ServiceUnavailable =>
            "trip repository connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } as InternalError =>
            "trip repository query failed: {message}",
    }
}

/// Port for storing whole trip aggregates.
///
/// Callers hold the trip's lock between `find_by_id` and `save`; adapters
/// only need last-write-wins semantics per trip.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TripRepository: Send + Sync {
    /// Insert or replace a trip.
    async fn save(&self, trip: &Trip) -> Result<(), TripRepositoryError>;

    /// Find a trip by id.
    async fn find_by_id(&self, trip_id: &TripId) -> Result<Option<Trip>, TripRepositoryError>;

    /// Resource commitments of every trip scheduled on `date`, any status.
    async fn list_bookings_on(
        &self,
        date: NaiveDate,
    ) -> Result<Vec<TripBooking>, TripRepositoryError>;

    /// Trip owning a roster entry.
    async fn find_trip_id_for_passenger(
        &self,
        entry_id: &PassengerEntryId,
    ) -> Result<Option<TripId>, TripRepositoryError>;

    /// Trip owning a waitlist entry.
    async fn find_trip_id_for_waitlist_entry(
        &self,
        entry_id: &WaitlistEntryId,
    ) -> Result<Option<TripId>, TripRepositoryError>;

    /// Trips with at least one waitlist entry awaiting a response.
    async fn list_trip_ids_with_pending_calls(&self) -> Result<Vec<TripId>, TripRepositoryError>;
}

/// Fixture implementation for tests that do not exercise persistence.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixtureTripRepository;

#[async_trait]
impl TripRepository for FixtureTripRepository {
    async fn save(&self, _trip: &Trip) -> Result<(), TripRepositoryError> {
        Ok(())
    }

    async fn find_by_id(&self, _trip_id: &TripId) -> Result<Option<Trip>, TripRepositoryError> {
        Ok(None)
    }

    async fn list_bookings_on(
        &self,
        _date: NaiveDate,
    ) -> Result<Vec<TripBooking>, TripRepositoryError> {
        Ok(Vec::new())
    }

    async fn find_trip_id_for_passenger(
        &self,
        _entry_id: &PassengerEntryId,
    ) -> Result<Option<TripId>, TripRepositoryError> {
        Ok(None)
    }

    async fn find_trip_id_for_waitlist_entry(
        &self,
        _entry_id: &WaitlistEntryId,
    ) -> Result<Option<TripId>, TripRepositoryError> {
        Ok(None)
    }

    async fn list_trip_ids_with_pending_calls(&self) -> Result<Vec<TripId>, TripRepositoryError> {
        Ok(Vec::new())
    }
}
