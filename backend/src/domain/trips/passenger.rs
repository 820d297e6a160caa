//! Roster entries and the check-in/check-out state machine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::{CompanionId, PassengerEntryId, PatientId, WaitlistEntryId};

use super::Occupancy;

/// Lifecycle of one patient's participation in a trip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum PassengerState {
    /// Holds a seat and has not boarded yet.
    Confirmed,
    /// Boarded the vehicle.
    CheckedIn,
    /// Left the vehicle at the destination.
    CheckedOut,
    /// Removed from the trip before boarding.
    Cancelled,
    /// Never boarded before the trip completed.
    NoShow,
}

impl PassengerState {
    /// Stable lowercase label used in logs and payloads.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Confirmed => "confirmed",
            Self::CheckedIn => "checked_in",
            Self::CheckedOut => "checked_out",
            Self::Cancelled => "cancelled",
            Self::NoShow => "no_show",
        }
    }
}

impl std::fmt::Display for PassengerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Illegal transitions of the passenger state machine.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PassengerStateError {
    /// Check-in was already recorded.
    #[error("passenger {entry_id} is already checked in")]
    AlreadyCheckedIn {
        /// Roster entry that rejected the transition.
        entry_id: PassengerEntryId,
    },
    /// Check-out was already recorded.
    #[error("passenger {entry_id} is already checked out")]
    AlreadyCheckedOut {
        /// Roster entry that rejected the transition.
        entry_id: PassengerEntryId,
    },
    /// Check-out requires a prior check-in.
    #[error("passenger {entry_id} has not checked in")]
    NotCheckedIn {
        /// Roster entry that rejected the transition.
        entry_id: PassengerEntryId,
    },
    /// Check-out time precedes the recorded check-in.
    #[error("passenger {entry_id} cannot check out at {requested} before check-in at {checked_in_at}")]
    CheckOutBeforeCheckIn {
        /// Roster entry that rejected the transition.
        entry_id: PassengerEntryId,
        /// Recorded check-in time.
        checked_in_at: DateTime<Utc>,
        /// Check-out time that was asked for.
        requested: DateTime<Utc>,
    },
    /// Boarded passengers cannot be cancelled.
    #[error("passenger {entry_id} already boarded and cannot be cancelled")]
    CancelAfterCheckIn {
        /// Roster entry that rejected the transition.
        entry_id: PassengerEntryId,
    },
    /// The entry is cancelled or a no-show.
    #[error("passenger {entry_id} is {state} and no longer active")]
    NotActive {
        /// Roster entry that rejected the transition.
        entry_id: PassengerEntryId,
        /// Final state the entry is in.
        state: PassengerState,
    },
}

impl PassengerStateError {
    /// The roster entry that rejected the transition.
    #[must_use]
    pub fn entry_id(&self) -> PassengerEntryId {
        match self {
            Self::AlreadyCheckedIn { entry_id }
            | Self::AlreadyCheckedOut { entry_id }
            | Self::NotCheckedIn { entry_id }
            | Self::CheckOutBeforeCheckIn { entry_id, .. }
            | Self::CancelAfterCheckIn { entry_id }
            | Self::NotActive { entry_id, .. } => *entry_id,
        }
    }
}

/// Timestamp and optional location of a boarding event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Checkpoint {
    /// When the event was recorded.
    pub at: DateTime<Utc>,
    /// Where it happened, when reported.
    pub location: Option<String>,
}

impl Checkpoint {
    fn new(at: DateTime<Utc>, location: Option<String>) -> Self {
        let location = location
            .map(|value| value.trim().to_owned())
            .filter(|value| !value.is_empty());
        Self { at, location }
    }
}

/// Input payload for [`PassengerEntry::new`].
#[derive(Debug, Clone)]
pub struct PassengerEntryDraft {
    /// Patient taking the seat.
    pub patient_id: PatientId,
    /// Whether a companion takes a second seat.
    pub has_companion: bool,
    /// The companion, when one is named.
    pub companion_id: Option<CompanionId>,
    /// When the seat was granted.
    pub enrolled_at: DateTime<Utc>,
    /// Waitlist entry the seat was granted from.
    pub waitlist_entry_id: Option<WaitlistEntryId>,
}

/// One patient on a trip roster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PassengerEntry {
    id: PassengerEntryId,
    patient_id: PatientId,
    has_companion: bool,
    companion_id: Option<CompanionId>,
    state: PassengerState,
    enrolled_at: DateTime<Utc>,
    waitlist_entry_id: Option<WaitlistEntryId>,
    check_in: Option<Checkpoint>,
    check_out: Option<Checkpoint>,
    cancellation_reason: Option<String>,
}

impl PassengerEntry {
    /// Create a confirmed roster entry.
    #[must_use]
    pub fn new(draft: PassengerEntryDraft) -> Self {
        Self {
            id: PassengerEntryId::random(),
            patient_id: draft.patient_id,
            has_companion: draft.has_companion,
            companion_id: draft.companion_id,
            state: PassengerState::Confirmed,
            enrolled_at: draft.enrolled_at,
            waitlist_entry_id: draft.waitlist_entry_id,
            check_in: None,
            check_out: None,
            cancellation_reason: None,
        }
    }

    /// Roster entry identifier.
    pub fn id(&self) -> PassengerEntryId {
        self.id
    }

    /// Seated patient.
    pub fn patient_id(&self) -> PatientId {
        self.patient_id
    }

    /// Whether a companion travels with the patient.
    pub fn has_companion(&self) -> bool {
        self.has_companion
    }

    /// The named companion, if any.
    pub fn companion_id(&self) -> Option<CompanionId> {
        self.companion_id
    }

    /// Current boarding state.
    pub fn state(&self) -> PassengerState {
        self.state
    }

    /// When the seat was granted.
    pub fn enrolled_at(&self) -> DateTime<Utc> {
        self.enrolled_at
    }

    /// Waitlist entry this passenger was promoted from, if any.
    pub fn waitlist_entry_id(&self) -> Option<WaitlistEntryId> {
        self.waitlist_entry_id
    }

    /// Recorded check-in, if any.
    pub fn check_in(&self) -> Option<&Checkpoint> {
        self.check_in.as_ref()
    }

    /// Recorded check-out, if any.
    pub fn check_out(&self) -> Option<&Checkpoint> {
        self.check_out.as_ref()
    }

    /// Why the entry was cancelled.
    pub fn cancellation_reason(&self) -> Option<&str> {
        self.cancellation_reason.as_deref()
    }

    /// Seats this entry consumes while it occupies the trip.
    pub fn occupancy(&self) -> Occupancy {
        Occupancy::for_companion(self.has_companion)
    }

    /// Whether the entry still counts against the ledger.
    ///
    /// No-shows keep their seat: the trip already ran with it reserved.
    pub fn occupies_seat(&self) -> bool {
        !matches!(self.state, PassengerState::Cancelled)
    }

    /// Record boarding. Legal only from `confirmed`.
    pub fn record_check_in(
        &mut self,
        at: DateTime<Utc>,
        location: Option<String>,
    ) -> Result<(), PassengerStateError> {
        match self.state {
            PassengerState::Confirmed => {
                self.check_in = Some(Checkpoint::new(at, location));
                self.state = PassengerState::CheckedIn;
                Ok(())
            }
            PassengerState::CheckedIn => Err(PassengerStateError::AlreadyCheckedIn {
                entry_id: self.id,
            }),
            PassengerState::CheckedOut => Err(PassengerStateError::AlreadyCheckedOut {
                entry_id: self.id,
            }),
            state => Err(PassengerStateError::NotActive {
                entry_id: self.id,
                state,
            }),
        }
    }

    /// Record alighting. Legal only from `checked_in`, never before check-in time.
    pub fn record_check_out(
        &mut self,
        at: DateTime<Utc>,
        location: Option<String>,
    ) -> Result<(), PassengerStateError> {
        match (self.state, self.check_in.as_ref()) {
            (PassengerState::CheckedIn, Some(check_in)) => {
                if at < check_in.at {
                    return Err(PassengerStateError::CheckOutBeforeCheckIn {
                        entry_id: self.id,
                        checked_in_at: check_in.at,
                        requested: at,
                    });
                }
                self.check_out = Some(Checkpoint::new(at, location));
                self.state = PassengerState::CheckedOut;
                Ok(())
            }
            (PassengerState::CheckedIn, None) | (PassengerState::Confirmed, _) => {
                Err(PassengerStateError::NotCheckedIn { entry_id: self.id })
            }
            (PassengerState::CheckedOut, _) => Err(PassengerStateError::AlreadyCheckedOut {
                entry_id: self.id,
            }),
            (state, _) => Err(PassengerStateError::NotActive {
                entry_id: self.id,
                state,
            }),
        }
    }

    /// Manual cancellation before boarding.
    ///
    /// Returns the occupancy the caller must release.
    pub fn cancel(&mut self, reason: impl Into<String>) -> Result<Occupancy, PassengerStateError> {
        match self.state {
            PassengerState::Confirmed => {
                self.state = PassengerState::Cancelled;
                self.cancellation_reason = Some(reason.into());
                Ok(self.occupancy())
            }
            PassengerState::CheckedIn | PassengerState::CheckedOut => {
                Err(PassengerStateError::CancelAfterCheckIn { entry_id: self.id })
            }
            state => Err(PassengerStateError::NotActive {
                entry_id: self.id,
                state,
            }),
        }
    }

    /// Cancellation cascaded from the whole trip being cancelled.
    ///
    /// Boarded passengers are included. Returns `true` when the state changed.
    pub(crate) fn cancel_with_trip(&mut self, reason: &str) -> bool {
        if !matches!(
            self.state,
            PassengerState::Confirmed | PassengerState::CheckedIn
        ) {
            return false;
        }
        self.state = PassengerState::Cancelled;
        self.cancellation_reason = Some(reason.to_owned());
        true
    }

    /// Completion sweep: a confirmed entry that never boarded becomes a no-show.
    ///
    /// Returns `true` only when this call changed the state.
    pub(crate) fn mark_no_show(&mut self) -> bool {
        if self.state == PassengerState::Confirmed && self.check_in.is_none() {
            self.state = PassengerState::NoShow;
            return true;
        }
        false
    }
}
