//! Passenger roster attached to a trip.

use crate::domain::{PassengerEntryId, PatientId};

use super::PassengerEntry;

/// Ordered set of roster entries with one active entry per patient.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Roster {
    entries: Vec<PassengerEntry>,
}

impl Roster {
    /// All entries in enrolment order, including cancelled ones.
    pub fn entries(&self) -> &[PassengerEntry] {
        self.entries.as_slice()
    }

    /// Look up an entry by id.
    pub fn get(&self, entry_id: PassengerEntryId) -> Option<&PassengerEntry> {
        self.entries.iter().find(|entry| entry.id() == entry_id)
    }

    pub(crate) fn get_mut(&mut self, entry_id: PassengerEntryId) -> Option<&mut PassengerEntry> {
        self.entries.iter_mut().find(|entry| entry.id() == entry_id)
    }

    /// The patient's non-cancelled entry, if any.
    pub fn active_for(&self, patient_id: PatientId) -> Option<&PassengerEntry> {
        self.entries
            .iter()
            .find(|entry| entry.patient_id() == patient_id && entry.occupies_seat())
    }

    pub(crate) fn active_for_mut(&mut self, patient_id: PatientId) -> Option<&mut PassengerEntry> {
        self.entries
            .iter_mut()
            .find(|entry| entry.patient_id() == patient_id && entry.occupies_seat())
    }

    /// Seats consumed by every entry that still occupies the trip.
    pub fn occupied_seats(&self) -> u32 {
        self.entries
            .iter()
            .filter(|entry| entry.occupies_seat())
            .map(|entry| entry.occupancy().seats())
            .sum()
    }

    /// Append an entry; the caller has already checked uniqueness and seats.
    pub(crate) fn push(&mut self, entry: PassengerEntry) {
        debug_assert!(
            self.active_for(entry.patient_id()).is_none(),
            "roster already holds an active entry for patient {}",
            entry.patient_id()
        );
        self.entries.push(entry);
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut PassengerEntry> {
        self.entries.iter_mut()
    }
}
