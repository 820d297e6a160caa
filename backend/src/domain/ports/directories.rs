//! Ports for the external patient, fleet, driver and companion directories.
//!
//! These collaborators are owned elsewhere. The trip service only reads the
//! handful of fields it needs to validate an enrolment or a booking.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::{CompanionId, DriverId, PatientId, VehicleId};

use super::define_port_error;

define_port_error! {
    /// Errors raised by directory adapters.
    pub enum DirectoryError {
        /// Directory backend could not be reached.
        Connection { message: String } as ServiceUnavailable =>
            "directory connection failed: {message}",
        /// Lookup failed during execution.
        Query { message: String } as InternalError =>
            "directory query failed: {message}",
    }
}

/// Patient as seen by the trip service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientRecord {
    pub id: PatientId,
    pub active: bool,
}

/// Vehicle as seen by the trip service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VehicleRecord {
    pub id: VehicleId,
    pub capacity: u32,
}

/// Driver as seen by the trip service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriverRecord {
    pub id: DriverId,
    pub active: bool,
}

/// Companion as seen by the trip service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompanionRecord {
    pub id: CompanionId,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PatientDirectory: Send + Sync {
    async fn get_patient(&self, id: &PatientId) -> Result<Option<PatientRecord>, DirectoryError>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait VehicleDirectory: Send + Sync {
    async fn get_vehicle(&self, id: &VehicleId) -> Result<Option<VehicleRecord>, DirectoryError>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DriverDirectory: Send + Sync {
    async fn get_driver(&self, id: &DriverId) -> Result<Option<DriverRecord>, DirectoryError>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CompanionDirectory: Send + Sync {
    async fn get_companion(
        &self,
        id: &CompanionId,
    ) -> Result<Option<CompanionRecord>, DirectoryError>;
}

/// Fixture directory that knows every id: patients and drivers are active
/// and every vehicle seats [`FixtureDirectory::VEHICLE_CAPACITY`].
#[derive(Debug, Default, Clone, Copy)]
pub struct FixtureDirectory;

impl FixtureDirectory {
    pub const VEHICLE_CAPACITY: u32 = 4;
}

#[async_trait]
impl PatientDirectory for FixtureDirectory {
    async fn get_patient(&self, id: &PatientId) -> Result<Option<PatientRecord>, DirectoryError> {
        Ok(Some(PatientRecord {
            id: *id,
            active: true,
        }))
    }
}

#[async_trait]
impl VehicleDirectory for FixtureDirectory {
    async fn get_vehicle(&self, id: &VehicleId) -> Result<Option<VehicleRecord>, DirectoryError> {
        Ok(Some(VehicleRecord {
            id: *id,
            capacity: Self::VEHICLE_CAPACITY,
        }))
    }
}

#[async_trait]
impl DriverDirectory for FixtureDirectory {
    async fn get_driver(&self, id: &DriverId) -> Result<Option<DriverRecord>, DirectoryError> {
        Ok(Some(DriverRecord {
            id: *id,
            active: true,
        }))
    }
}

#[async_trait]
impl CompanionDirectory for FixtureDirectory {
    async fn get_companion(
        &self,
        id: &CompanionId,
    ) -> Result<Option<CompanionRecord>, DirectoryError> {
        Ok(Some(CompanionRecord { id: *id }))
    }
}
