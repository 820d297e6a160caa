//! Service settings loaded via OrthoConfig.
//!
//! Values come from `RIDEPOOL_*` environment variables, command-line flags
//! or a configuration file. Unset values fall back to the defaults below.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration as StdDuration;

use chrono::Duration;
use ortho_config::OrthoConfig;
use serde::Deserialize;
use thiserror::Error;

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
const DEFAULT_RESPONSE_WINDOW_HOURS: u32 = 24;
const MAX_RESPONSE_WINDOW_HOURS: u32 = 8_760;

/// Invalid setting values detected after loading.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SettingsError {
    /// The bind address does not parse.
    #[error("bind address `{value}` is not a socket address")]
    InvalidBindAddr {
        /// Configured value.
        value: String,
    },
    /// A zero-hour window would expire every call immediately.
    #[error("response window must be at least one hour, got {hours}")]
    ResponseWindowTooShort {
        /// Configured hours.
        hours: u32,
    },
    /// Windows longer than a year are rejected.
    #[error("response window must be at most {max} hours, got {hours}")]
    ResponseWindowTooLong {
        /// Configured hours.
        hours: u32,
        /// Largest accepted value.
        max: u32,
    },
}

/// Runtime settings for the trip service.
#[derive(Debug, Clone, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "RIDEPOOL")]
pub struct ServiceSettings {
    /// Socket address the HTTP server binds to.
    pub bind_addr: Option<String>,
    /// Hours a called waitlist entry has to answer.
    #[ortho_config(default = DEFAULT_RESPONSE_WINDOW_HOURS)]
    pub response_window_hours: u32,
    /// Period of the background expiry sweep. Unset or zero disables it.
    pub expiry_sweep_seconds: Option<u64>,
    /// JSON file seeding the patient, vehicle, driver and companion
    /// directories.
    pub directory_seed_path: Option<PathBuf>,
}

impl ServiceSettings {
    /// Return the parsed bind address, falling back to the default.
    pub fn bind_addr(&self) -> Result<SocketAddr, SettingsError> {
        let value = self.bind_addr.as_deref().unwrap_or(DEFAULT_BIND_ADDR);
        value
            .parse()
            .map_err(|_| SettingsError::InvalidBindAddr {
                value: value.to_owned(),
            })
    }

    /// Return the waitlist response window, between one hour and a year.
    pub fn response_window(&self) -> Result<Duration, SettingsError> {
        let hours = self.response_window_hours;
        if hours == 0 {
            return Err(SettingsError::ResponseWindowTooShort { hours });
        }
        if hours > MAX_RESPONSE_WINDOW_HOURS {
            return Err(SettingsError::ResponseWindowTooLong {
                hours,
                max: MAX_RESPONSE_WINDOW_HOURS,
            });
        }
        Ok(Duration::hours(i64::from(hours)))
    }

    /// Return the sweep period, or `None` when the sweep is disabled.
    pub fn expiry_sweep_interval(&self) -> Option<StdDuration> {
        self.expiry_sweep_seconds
            .filter(|seconds| *seconds > 0)
            .map(StdDuration::from_secs)
    }

    /// Return the directory seed file, if configured.
    pub fn directory_seed_path(&self) -> Option<&Path> {
        self.directory_seed_path.as_deref()
    }
}
