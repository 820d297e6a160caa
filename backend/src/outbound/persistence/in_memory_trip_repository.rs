//! In-process `TripRepository` implementation.
//!
//! Trips are stored as whole aggregates keyed by id. The service holds the
//! trip lock across load and save, so the store only guards its own maps.
//! Roster and waitlist entries are never dropped from a trip, so the entry
//! indexes only grow.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::NaiveDate;
use tokio::sync::RwLock;

use crate::domain::ports::{TripRepository, TripRepositoryError};
use crate::domain::{PassengerEntryId, Trip, TripBooking, TripId, WaitlistEntryId};

#[derive(Debug, Default)]
struct Store {
    trips: HashMap<TripId, Trip>,
    passengers: HashMap<PassengerEntryId, TripId>,
    waitlist_entries: HashMap<WaitlistEntryId, TripId>,
}

impl Store {
    fn insert(&mut self, trip: &Trip) {
        let trip_id = trip.id();
        for entry in trip.roster().entries() {
            self.passengers.insert(entry.id(), trip_id);
        }
        for entry in trip.waitlist().entries() {
            self.waitlist_entries.insert(entry.id(), trip_id);
        }
        self.trips.insert(trip_id, trip.clone());
    }
}

/// In-memory implementation of the trip repository port.
#[derive(Debug, Default)]
pub struct InMemoryTripRepository {
    store: RwLock<Store>,
}

impl InMemoryTripRepository {
    /// Create an empty repository.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored trips.
    pub async fn len(&self) -> usize {
        self.store.read().await.trips.len()
    }

    /// True when no trip has been saved yet.
    pub async fn is_empty(&self) -> bool {
        self.store.read().await.trips.is_empty()
    }
}

#[async_trait]
impl TripRepository for InMemoryTripRepository {
    async fn save(&self, trip: &Trip) -> Result<(), TripRepositoryError> {
        self.store.write().await.insert(trip);
        Ok(())
    }

    async fn find_by_id(&self, trip_id: &TripId) -> Result<Option<Trip>, TripRepositoryError> {
        Ok(self.store.read().await.trips.get(trip_id).cloned())
    }

    async fn list_bookings_on(
        &self,
        date: NaiveDate,
    ) -> Result<Vec<TripBooking>, TripRepositoryError> {
        let store = self.store.read().await;
        let mut bookings: Vec<TripBooking> = store
            .trips
            .values()
            .filter(|trip| trip.date() == date)
            .map(Trip::booking)
            .collect();
        bookings.sort_by_key(|booking| booking.trip_id);
        Ok(bookings)
    }

    async fn find_trip_id_for_passenger(
        &self,
        entry_id: &PassengerEntryId,
    ) -> Result<Option<TripId>, TripRepositoryError> {
        Ok(self.store.read().await.passengers.get(entry_id).copied())
    }

    async fn find_trip_id_for_waitlist_entry(
        &self,
        entry_id: &WaitlistEntryId,
    ) -> Result<Option<TripId>, TripRepositoryError> {
        Ok(self.store.read().await.waitlist_entries.get(entry_id).copied())
    }

    async fn list_trip_ids_with_pending_calls(&self) -> Result<Vec<TripId>, TripRepositoryError> {
        let store = self.store.read().await;
        let mut ids: Vec<TripId> = store
            .trips
            .values()
            .filter(|trip| trip.waitlist().has_pending_calls())
            .map(Trip::id)
            .collect();
        ids.sort();
        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.

    use chrono::{NaiveTime, TimeZone, Utc};
    use rstest::{fixture, rstest};

    use super::*;
    use crate::domain::{
        DriverId, EnrollmentOutcome, EnrollmentRequest, PatientId, PriorityTier, TripCategory,
        TripDraft, VehicleId,
    };

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 2).expect("valid date")
    }

    fn trip_on(date: NaiveDate, capacity: u32) -> Trip {
        Trip::new(TripDraft {
            id: TripId::random(),
            category: TripCategory::Group,
            date,
            departure: NaiveTime::from_hms_opt(9, 0, 0).expect("valid time"),
            vehicle_id: VehicleId::random(),
            driver_id: DriverId::random(),
            capacity,
            created_at: Utc
                .with_ymd_and_hms(2026, 3, 1, 8, 0, 0)
                .single()
                .expect("valid timestamp"),
        })
        .expect("valid trip")
    }

    #[fixture]
    fn repo() -> InMemoryTripRepository {
        InMemoryTripRepository::new()
    }

    #[rstest]
    #[tokio::test]
    async fn save_then_find_returns_stored_trip(repo: InMemoryTripRepository) {
        let trip = trip_on(date(), 3);
        repo.save(&trip).await.expect("save succeeds");

        let found = repo.find_by_id(&trip.id()).await.expect("lookup succeeds");
        assert_eq!(found, Some(trip));
        assert_eq!(repo.len().await, 1);
    }

    #[rstest]
    #[tokio::test]
    async fn bookings_are_filtered_by_date(repo: InMemoryTripRepository) {
        let today = trip_on(date(), 3);
        let tomorrow = trip_on(date().succ_opt().expect("next day"), 3);
        repo.save(&today).await.expect("save today");
        repo.save(&tomorrow).await.expect("save tomorrow");

        let bookings = repo.list_bookings_on(date()).await.expect("list succeeds");
        let ids: Vec<TripId> = bookings.iter().map(|booking| booking.trip_id).collect();
        assert_eq!(ids, vec![today.id()]);
    }

    #[rstest]
    #[tokio::test]
    async fn entries_resolve_to_their_trip(repo: InMemoryTripRepository) {
        let mut trip = trip_on(date(), 1);
        let now = trip.created_at();
        let request = |patient_id| EnrollmentRequest {
            patient_id,
            has_companion: false,
            companion_id: None,
            tier: PriorityTier::Normal,
            motive: None,
        };
        let EnrollmentOutcome::Enrolled { entry_id, .. } = trip
            .enroll(request(PatientId::random()), now)
            .expect("seated")
        else {
            panic!("expected a seat");
        };
        let EnrollmentOutcome::Waitlisted {
            entry_id: waitlist_id,
            ..
        } = trip
            .enroll(request(PatientId::random()), now)
            .expect("queued")
        else {
            panic!("expected a waitlist entry");
        };
        repo.save(&trip).await.expect("save succeeds");

        assert_eq!(
            repo.find_trip_id_for_passenger(&entry_id).await.expect("lookup"),
            Some(trip.id())
        );
        assert_eq!(
            repo.find_trip_id_for_waitlist_entry(&waitlist_id)
                .await
                .expect("lookup"),
            Some(trip.id())
        );
        assert!(
            repo.list_trip_ids_with_pending_calls()
                .await
                .expect("list")
                .is_empty()
        );
    }

    #[rstest]
    #[tokio::test]
    async fn entries_added_after_the_first_save_are_indexed(repo: InMemoryTripRepository) {
        let mut trip = trip_on(date(), 2);
        repo.save(&trip).await.expect("first save");
        let other = trip_on(date(), 2);
        repo.save(&other).await.expect("other trip");

        let outcome = trip
            .enroll(
                EnrollmentRequest {
                    patient_id: PatientId::random(),
                    has_companion: true,
                    companion_id: None,
                    tier: PriorityTier::Normal,
                    motive: None,
                },
                trip.created_at(),
            )
            .expect("seated");
        let EnrollmentOutcome::Enrolled { entry_id, .. } = outcome else {
            panic!("expected a seat, got {outcome:?}");
        };
        assert_eq!(
            repo.find_trip_id_for_passenger(&entry_id).await.expect("lookup"),
            None
        );

        repo.save(&trip).await.expect("second save");
        assert_eq!(
            repo.find_trip_id_for_passenger(&entry_id).await.expect("lookup"),
            Some(trip.id())
        );
        assert_eq!(
            repo.find_trip_id_for_passenger(&PassengerEntryId::random())
                .await
                .expect("lookup"),
            None
        );
        assert_eq!(repo.len().await, 2);
    }
}
