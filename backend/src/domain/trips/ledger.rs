//! Seat ledger tracking capacity and seats consumed by the active roster.
//!
//! The ledger is the only place that changes occupancy. It never goes below
//! zero and never exceeds capacity; callers that need the waitlist side
//! effect of a release go through [`super::Trip`].

use serde::{Deserialize, Serialize};
use tracing::error;

/// Seats consumed by one roster entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Occupancy {
    /// The patient travels alone.
    Single,
    /// The patient brings one companion.
    WithCompanion,
}

impl Occupancy {
    /// Derive the occupancy from a has-companion flag.
    #[must_use]
    pub const fn for_companion(has_companion: bool) -> Self {
        if has_companion {
            Self::WithCompanion
        } else {
            Self::Single
        }
    }

    /// Number of seats this occupancy consumes.
    #[must_use]
    pub const fn seats(self) -> u32 {
        match self {
            Self::Single => 1,
            Self::WithCompanion => 2,
        }
    }
}

/// Errors raised by ledger operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    /// Capacity must be at least one seat.
    #[error("capacity must be at least 1 (got {capacity})")]
    InvalidCapacity {
        /// Rejected capacity.
        capacity: u32,
    },
    /// Not enough free seats for the requested occupancy.
    #[error("insufficient seats: requested {requested}, available {available}")]
    InsufficientSeats {
        /// Seats the occupancy needs.
        requested: u32,
        /// Seats currently free.
        available: u32,
    },
    /// The new capacity would not hold the seats already occupied.
    #[error("cannot resize to {requested} seats while {occupied} are occupied")]
    ResizeBelowOccupied {
        /// Capacity asked for.
        requested: u32,
        /// Seats held by the active roster.
        occupied: u32,
    },
}

/// Capacity and free-seat counters for one trip.
///
/// ## Invariants
/// - `capacity >= 1`
/// - `seats_available <= capacity`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeatLedger {
    capacity: u32,
    seats_available: u32,
}

impl SeatLedger {
    /// Create an empty ledger with every seat available.
    ///
    /// # Examples
    /// ```
    /// use ridepool::domain::{Occupancy, SeatLedger};
    ///
    /// let mut ledger = SeatLedger::new(4).expect("valid capacity");
    /// ledger.reserve(Occupancy::WithCompanion).expect("seats free");
    /// assert_eq!(ledger.seats_available(), 2);
    /// ```
    pub fn new(capacity: u32) -> Result<Self, LedgerError> {
        if capacity == 0 {
            return Err(LedgerError::InvalidCapacity { capacity });
        }
        Ok(Self {
            capacity,
            seats_available: capacity,
        })
    }

    /// Total seats on the trip.
    #[must_use]
    pub const fn capacity(&self) -> u32 {
        self.capacity
    }

    /// Seats not consumed by the active roster.
    #[must_use]
    pub const fn seats_available(&self) -> u32 {
        self.seats_available
    }

    /// Seats consumed by the active roster.
    #[must_use]
    pub const fn occupied(&self) -> u32 {
        self.capacity - self.seats_available
    }

    /// Whether `occupancy` would currently fit.
    #[must_use]
    pub const fn can_fit(&self, occupancy: Occupancy) -> bool {
        self.seats_available >= occupancy.seats()
    }

    /// Consume seats for `occupancy`, leaving the ledger untouched on failure.
    pub fn reserve(&mut self, occupancy: Occupancy) -> Result<(), LedgerError> {
        let requested = occupancy.seats();
        if self.seats_available < requested {
            return Err(LedgerError::InsufficientSeats {
                requested,
                available: self.seats_available,
            });
        }
        self.seats_available -= requested;
        Ok(())
    }

    /// Return seats for `occupancy`, clamped to capacity.
    ///
    /// Returns the number of seats actually credited.
    pub fn release(&mut self, occupancy: Occupancy) -> u32 {
        let requested = occupancy.seats();
        let headroom = self.occupied();
        if requested > headroom {
            error!(
                alert = true,
                requested,
                seats_available = self.seats_available,
                capacity = self.capacity,
                "seat release exceeds occupied seats; clamping to capacity"
            );
        }
        let credited = requested.min(headroom);
        self.seats_available += credited;
        credited
    }

    /// Change capacity while keeping the occupied seat count.
    pub fn resize(&mut self, new_capacity: u32) -> Result<(), LedgerError> {
        if new_capacity == 0 {
            return Err(LedgerError::InvalidCapacity {
                capacity: new_capacity,
            });
        }
        let occupied = self.occupied();
        if new_capacity < occupied {
            return Err(LedgerError::ResizeBelowOccupied {
                requested: new_capacity,
                occupied,
            });
        }
        self.capacity = new_capacity;
        self.seats_available = new_capacity - occupied;
        Ok(())
    }

    /// Force the counters to match `occupied` seats.
    ///
    /// Returns `true` when the ledger had drifted and was repaired.
    pub(crate) fn reconcile(&mut self, occupied: u32) -> bool {
        let expected = self.capacity.saturating_sub(occupied);
        if expected == self.seats_available {
            return false;
        }
        self.seats_available = expected;
        true
    }
}
