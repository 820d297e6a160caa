//! Priority waitlist for patients that could not be seated at enrolment.
//!
//! Entries are ranked by `(tier, sequence)`. Sequence numbers are assigned
//! per tier, start at 1, and are never reused; a requeued entry keeps the
//! sequence it was first given.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::{CompanionId, PatientId, WaitlistEntryId};

use super::Occupancy;

/// Waitlist priority. Declaration order is promotion order.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    ToSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum PriorityTier {
    /// Clinically urgent; served before every other tier.
    High,
    /// Served after `high`.
    Medium,
    /// Default tier for routine requests.
    #[default]
    Normal,
}

impl PriorityTier {
    /// Numeric rank; lower is served first.
    #[must_use]
    pub const fn rank(self) -> u8 {
        match self {
            Self::High => 1,
            Self::Medium => 2,
            Self::Normal => 3,
        }
    }

    /// Wire label for the tier.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Medium => "medium",
            Self::Normal => "normal",
        }
    }
}

impl fmt::Display for PriorityTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown priority tier label.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown priority tier: {value}")]
pub struct ParsePriorityTierError {
    /// The rejected label.
    pub value: String,
}

impl FromStr for PriorityTier {
    type Err = ParsePriorityTierError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "high" => Ok(Self::High),
            "medium" => Ok(Self::Medium),
            "normal" => Ok(Self::Normal),
            other => Err(ParsePriorityTierError {
                value: other.to_owned(),
            }),
        }
    }
}

/// Lifecycle of a waitlist entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum WaitlistState {
    /// Queued and eligible for promotion.
    Waiting,
    /// Offered a seat; awaiting the patient's answer.
    Called,
    /// Accepted the call and now holds a seat.
    Confirmed,
    /// Declined the call.
    Declined,
    /// Did not answer before the response deadline.
    Expired,
    /// Withdrawn by the patient or cancelled with the trip.
    Cancelled,
}

impl WaitlistState {
    /// Wire label for the state.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Waiting => "waiting",
            Self::Called => "called",
            Self::Confirmed => "confirmed",
            Self::Declined => "declined",
            Self::Expired => "expired",
            Self::Cancelled => "cancelled",
        }
    }

    /// `waiting` and `called` entries still hold a place in the queue.
    #[must_use]
    pub const fn is_active(self) -> bool {
        matches!(self, Self::Waiting | Self::Called)
    }
}

impl fmt::Display for WaitlistState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors raised by waitlist operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WaitlistError {
    /// The patient already waits for this trip.
    #[error("patient {patient_id} already holds active waitlist entry {entry_id}")]
    DuplicateActiveEntry {
        patient_id: PatientId,
        entry_id: WaitlistEntryId,
    },
    /// No entry with this id on the trip.
    #[error("waitlist entry {entry_id} not found")]
    EntryNotFound { entry_id: WaitlistEntryId },
    /// The entry is not awaiting an answer.
    #[error("waitlist entry {entry_id} is {state}, expected called")]
    NotCalled {
        entry_id: WaitlistEntryId,
        state: WaitlistState,
    },
    /// The response deadline cannot be represented.
    #[error("response window of {window} from {called_at} overflows the calendar")]
    DeadlineOutOfRange {
        entry_id: WaitlistEntryId,
        called_at: DateTime<Utc>,
        window: Duration,
    },
}

/// Input payload for [`Waitlist::enqueue`].
#[derive(Debug, Clone)]
pub struct WaitlistEntryDraft {
    /// Patient asking for a seat.
    pub patient_id: PatientId,
    /// Whether a companion travels too, taking a second seat.
    pub has_companion: bool,
    /// The companion, when one is named.
    pub companion_id: Option<CompanionId>,
    /// Priority tier the entry is queued under.
    pub tier: PriorityTier,
    /// Free-text reason for the trip.
    pub motive: Option<String>,
    /// When the request was received.
    pub enqueued_at: DateTime<Utc>,
}

/// One pending request for a seat.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WaitlistEntry {
    id: WaitlistEntryId,
    patient_id: PatientId,
    has_companion: bool,
    companion_id: Option<CompanionId>,
    tier: PriorityTier,
    sequence: u64,
    state: WaitlistState,
    motive: Option<String>,
    enqueued_at: DateTime<Utc>,
    called_at: Option<DateTime<Utc>>,
    response_deadline: Option<DateTime<Utc>>,
    resolved_at: Option<DateTime<Utc>>,
}

impl WaitlistEntry {
    /// Entry identifier.
    pub fn id(&self) -> WaitlistEntryId {
        self.id
    }

    /// Patient waiting for a seat.
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

    /// Priority tier.
    pub fn tier(&self) -> PriorityTier {
        self.tier
    }

    /// Position within the tier, starting at 1.
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Current lifecycle state.
    pub fn state(&self) -> WaitlistState {
        self.state
    }

    /// Reason for the trip, when given.
    pub fn motive(&self) -> Option<&str> {
        self.motive.as_deref()
    }

    /// When the entry joined the queue.
    pub fn enqueued_at(&self) -> DateTime<Utc> {
        self.enqueued_at
    }

    /// When the latest call was made.
    pub fn called_at(&self) -> Option<DateTime<Utc>> {
        self.called_at
    }

    /// Deadline of the latest call.
    pub fn response_deadline(&self) -> Option<DateTime<Utc>> {
        self.response_deadline
    }

    /// When the entry reached a final state.
    pub fn resolved_at(&self) -> Option<DateTime<Utc>> {
        self.resolved_at
    }

    /// Seats the entry needs once seated.
    pub fn occupancy(&self) -> Occupancy {
        Occupancy::for_companion(self.has_companion)
    }

    /// Whether the entry still holds a place in the queue.
    pub fn is_active(&self) -> bool {
        self.state.is_active()
    }

    /// Promotion key: tier first, then insertion order within the tier.
    pub fn rank(&self) -> (PriorityTier, u64) {
        (self.tier, self.sequence)
    }

    /// A called entry whose deadline has passed.
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        self.state == WaitlistState::Called
            && self.response_deadline.is_some_and(|deadline| now > deadline)
    }

    fn resolve(&mut self, state: WaitlistState, now: DateTime<Utc>) {
        self.state = state;
        self.resolved_at = Some(now);
    }
}

/// Ordered waitlist for one trip.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Waitlist {
    entries: Vec<WaitlistEntry>,
    last_sequence: BTreeMap<PriorityTier, u64>,
}

impl Waitlist {
    /// Add a waiting entry, assigning the next sequence for its tier.
    ///
    /// # Examples
    /// ```
    /// use chrono::Utc;
    /// use ridepool::domain::{PatientId, PriorityTier, Waitlist, WaitlistEntryDraft};
    ///
    /// let mut waitlist = Waitlist::default();
    /// let entry_id = waitlist
    ///     .enqueue(WaitlistEntryDraft {
    ///         patient_id: PatientId::random(),
    ///         has_companion: true,
    ///         companion_id: None,
    ///         tier: PriorityTier::Normal,
    ///         motive: None,
    ///         enqueued_at: Utc::now(),
    ///     })
    ///     .expect("first entry");
    /// assert_eq!(waitlist.get(entry_id).map(|e| e.sequence()), Some(1));
    /// ```
    pub fn enqueue(&mut self, draft: WaitlistEntryDraft) -> Result<WaitlistEntryId, WaitlistError> {
        if let Some(existing) = self.active_for(draft.patient_id) {
            return Err(WaitlistError::DuplicateActiveEntry {
                patient_id: draft.patient_id,
                entry_id: existing.id,
            });
        }
        let counter = self.last_sequence.entry(draft.tier).or_insert(0);
        *counter += 1;
        let entry = WaitlistEntry {
            id: WaitlistEntryId::random(),
            patient_id: draft.patient_id,
            has_companion: draft.has_companion,
            companion_id: draft.companion_id,
            tier: draft.tier,
            sequence: *counter,
            state: WaitlistState::Waiting,
            motive: draft
                .motive
                .map(|motive| motive.trim().to_owned())
                .filter(|motive| !motive.is_empty()),
            enqueued_at: draft.enqueued_at,
            called_at: None,
            response_deadline: None,
            resolved_at: None,
        };
        let id = entry.id;
        self.entries.push(entry);
        Ok(id)
    }

    /// All entries in enqueue order, including resolved ones.
    pub fn entries(&self) -> &[WaitlistEntry] {
        self.entries.as_slice()
    }

    /// Look up an entry by id.
    pub fn get(&self, entry_id: WaitlistEntryId) -> Option<&WaitlistEntry> {
        self.entries.iter().find(|entry| entry.id == entry_id)
    }

    fn get_mut(&mut self, entry_id: WaitlistEntryId) -> Result<&mut WaitlistEntry, WaitlistError> {
        self.entries
            .iter_mut()
            .find(|entry| entry.id == entry_id)
            .ok_or(WaitlistError::EntryNotFound { entry_id })
    }

    /// The patient's `waiting` or `called` entry, if any.
    pub fn active_for(&self, patient_id: PatientId) -> Option<&WaitlistEntry> {
        self.entries
            .iter()
            .find(|entry| entry.patient_id == patient_id && entry.is_active())
    }

    /// Every entry ever enqueued, sorted by promotion rank.
    pub fn in_promotion_order(&self) -> Vec<&WaitlistEntry> {
        let mut ordered: Vec<&WaitlistEntry> = self.entries.iter().collect();
        ordered.sort_by_key(|entry| entry.rank());
        ordered
    }

    /// Entries currently holding a place in the queue, in promotion order.
    pub fn active_in_order(&self) -> Vec<&WaitlistEntry> {
        let mut ordered: Vec<&WaitlistEntry> =
            self.entries.iter().filter(|entry| entry.is_active()).collect();
        ordered.sort_by_key(|entry| entry.rank());
        ordered
    }

    /// Best-ranked `waiting` entry whose occupancy fits in `seats_available`.
    pub fn next_fitting(&self, seats_available: u32) -> Option<WaitlistEntryId> {
        self.entries
            .iter()
            .filter(|entry| entry.state == WaitlistState::Waiting)
            .filter(|entry| entry.occupancy().seats() <= seats_available)
            .min_by_key(|entry| entry.rank())
            .map(|entry| entry.id)
    }

    /// Transition a waiting entry to `called` with a response deadline.
    pub(crate) fn call(
        &mut self,
        entry_id: WaitlistEntryId,
        now: DateTime<Utc>,
        response_window: Duration,
    ) -> Result<DateTime<Utc>, WaitlistError> {
        let entry = self.get_mut(entry_id)?;
        let deadline = now.checked_add_signed(response_window).ok_or(
            WaitlistError::DeadlineOutOfRange {
                entry_id,
                called_at: now,
                window: response_window,
            },
        )?;
        entry.state = WaitlistState::Called;
        entry.called_at = Some(now);
        entry.response_deadline = Some(deadline);
        Ok(deadline)
    }

    /// Borrow an entry that must currently be `called`.
    pub(crate) fn called_entry(
        &self,
        entry_id: WaitlistEntryId,
    ) -> Result<&WaitlistEntry, WaitlistError> {
        let entry = self
            .get(entry_id)
            .ok_or(WaitlistError::EntryNotFound { entry_id })?;
        if entry.state != WaitlistState::Called {
            return Err(WaitlistError::NotCalled {
                entry_id,
                state: entry.state,
            });
        }
        Ok(entry)
    }

    pub(crate) fn confirm(
        &mut self,
        entry_id: WaitlistEntryId,
        now: DateTime<Utc>,
    ) -> Result<(), WaitlistError> {
        self.get_mut(entry_id)?.resolve(WaitlistState::Confirmed, now);
        Ok(())
    }

    pub(crate) fn decline(
        &mut self,
        entry_id: WaitlistEntryId,
        now: DateTime<Utc>,
    ) -> Result<(), WaitlistError> {
        self.get_mut(entry_id)?.resolve(WaitlistState::Declined, now);
        Ok(())
    }

    pub(crate) fn expire(
        &mut self,
        entry_id: WaitlistEntryId,
        now: DateTime<Utc>,
    ) -> Result<(), WaitlistError> {
        self.get_mut(entry_id)?.resolve(WaitlistState::Expired, now);
        Ok(())
    }

    /// Return a called entry to `waiting`, keeping its original sequence.
    pub(crate) fn requeue(&mut self, entry_id: WaitlistEntryId) -> Result<(), WaitlistError> {
        let entry = self.get_mut(entry_id)?;
        entry.state = WaitlistState::Waiting;
        entry.called_at = None;
        entry.response_deadline = None;
        Ok(())
    }

    /// Cancel the patient's active entry. Returns the cancelled entry id.
    pub(crate) fn cancel_for_patient(
        &mut self,
        patient_id: PatientId,
        now: DateTime<Utc>,
    ) -> Option<WaitlistEntryId> {
        let entry = self
            .entries
            .iter_mut()
            .find(|entry| entry.patient_id == patient_id && entry.is_active())?;
        entry.resolve(WaitlistState::Cancelled, now);
        Some(entry.id)
    }

    /// Expire every overdue called entry. Returns the expired ids.
    pub(crate) fn expire_overdue(&mut self, now: DateTime<Utc>) -> Vec<WaitlistEntryId> {
        self.entries
            .iter_mut()
            .filter(|entry| entry.is_overdue(now))
            .map(|entry| {
                entry.resolve(WaitlistState::Expired, now);
                entry.id
            })
            .collect()
    }

    /// Cancel every active entry. Returns how many changed.
    pub(crate) fn cancel_all_active(&mut self, now: DateTime<Utc>) -> usize {
        let mut cancelled = 0;
        for entry in self.entries.iter_mut().filter(|entry| entry.is_active()) {
            entry.resolve(WaitlistState::Cancelled, now);
            cancelled += 1;
        }
        cancelled
    }

    /// Whether any entry is waiting on a response.
    pub fn has_pending_calls(&self) -> bool {
        self.entries
            .iter()
            .any(|entry| entry.state == WaitlistState::Called)
    }
}
