//! HTTP server configuration object and helpers.

use std::net::SocketAddr;
use std::time::Duration as StdDuration;

use chrono::Duration;
use ridepool::outbound::directory::InMemoryDirectory;

/// Builder-style configuration for creating the HTTP server.
pub struct ServerConfig {
    pub(crate) bind_addr: SocketAddr,
    pub(crate) response_window: Duration,
    pub(crate) sweep_interval: Option<StdDuration>,
    pub(crate) directory: Option<InMemoryDirectory>,
}

impl ServerConfig {
    /// Construct a server configuration with an empty directory and no
    /// background expiry sweep.
    #[must_use]
    pub fn new(bind_addr: SocketAddr, response_window: Duration) -> Self {
        Self {
            bind_addr,
            response_window,
            sweep_interval: None,
            directory: None,
        }
    }

    /// Serve patients, vehicles, drivers and companions from `directory`.
    #[must_use]
    pub fn with_directory(mut self, directory: InMemoryDirectory) -> Self {
        self.directory = Some(directory);
        self
    }

    /// Expire overdue waitlist calls every `interval`.
    #[must_use]
    pub fn with_sweep_interval(mut self, interval: Option<StdDuration>) -> Self {
        self.sweep_interval = interval;
        self
    }

    /// Return the socket address the server will bind to.
    #[must_use]
    pub fn bind_addr(&self) -> SocketAddr {
        self.bind_addr
    }
}
