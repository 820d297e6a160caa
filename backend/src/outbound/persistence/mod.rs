//! Trip persistence adapters.
//!
//! Adapters are thin translators between the storage representation and
//! the [`Trip`](crate::domain::Trip) aggregate. They hold no business
//! logic: per-trip serialisation and seat accounting live in the domain.
//!
//! # Example
//!
//! ```
//! use ridepool::outbound::persistence::InMemoryTripRepository;
//!
//! let repo = InMemoryTripRepository::new();
//! # let _ = repo;
//! ```

mod in_memory_trip_repository;

pub use in_memory_trip_repository::InMemoryTripRepository;
