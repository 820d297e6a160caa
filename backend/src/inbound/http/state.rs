//! Shared HTTP adapter state.
//!
//! HTTP handlers accept this state via `actix_web::web::Data` so they only
//! depend on domain ports (use-cases) and remain testable without I/O.

use std::sync::Arc;

use crate::domain::ports::{TripCommand, TripQuery};

/// Dependency bundle for HTTP handlers.
#[derive(Clone)]
pub struct HttpState {
    pub trips: Arc<dyn TripCommand>,
    pub trips_query: Arc<dyn TripQuery>,
}

impl HttpState {
    /// Construct state from explicit port implementations.
    ///
    /// # Examples
    /// ```ignore
    /// use std::sync::Arc;
    ///
    /// use ridepool::inbound::http::state::HttpState;
    ///
    /// let state = HttpState::new(Arc::clone(&service), service);
    /// ```
    pub fn new(trips: Arc<dyn TripCommand>, trips_query: Arc<dyn TripQuery>) -> Self {
        Self { trips, trips_query }
    }
}
