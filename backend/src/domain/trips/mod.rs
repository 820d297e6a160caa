//! Trip aggregate, seat ledger, passenger roster and waitlist.
//!
//! The four pieces are only mutated through [`Trip`], which keeps the ledger
//! in step with the roster and consults the waitlist whenever seats free up.

mod ledger;
mod passenger;
mod roster;
mod trip;
mod waitlist;

pub use ledger::{LedgerError, Occupancy, SeatLedger};
pub use passenger::{
    Checkpoint, PassengerEntry, PassengerEntryDraft, PassengerState, PassengerStateError,
};
pub use roster::Roster;
pub use trip::{
    CallResponse, CallResponseOutcome, CancellationOutcome, CompletionOutcome, EnrollmentOutcome,
    EnrollmentRequest, ExpirySweep, Promotion, RemovalOutcome, ResizeOutcome, ScheduleChange, Trip,
    TripCategory, TripDraft, TripError, TripStatus,
};
pub use waitlist::{
    ParsePriorityTierError, PriorityTier, Waitlist, WaitlistEntry, WaitlistEntryDraft,
    WaitlistError, WaitlistState,
};
