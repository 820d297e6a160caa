//! Outbound adapters implementing domain ports for external infrastructure.
//!
//! - **persistence**: trip storage behind `TripRepository`
//! - **directory**: patient, fleet, driver and companion lookups
//!
//! Adapters convert between domain types and their storage representation.
//! They contain no business logic.

pub mod directory;
pub mod persistence;
