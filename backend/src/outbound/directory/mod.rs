//! Directory adapters for patients, vehicles, drivers and companions.
//!
//! The real directories live in other systems. This adapter serves them
//! from an in-process snapshot, optionally seeded from a JSON file at
//! startup.

mod seed;

use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::info;

use crate::domain::ports::{
    CompanionDirectory, CompanionRecord, DirectoryError, DriverDirectory, DriverRecord,
    PatientDirectory, PatientRecord, VehicleDirectory, VehicleRecord,
};
use crate::domain::{CompanionId, DriverId, PatientId, VehicleId};

pub use seed::{DirectorySeed, DirectorySeedError};

/// In-memory directory implementing every directory port.
#[derive(Debug, Default)]
pub struct InMemoryDirectory {
    patients: RwLock<HashMap<PatientId, PatientRecord>>,
    vehicles: RwLock<HashMap<VehicleId, VehicleRecord>>,
    drivers: RwLock<HashMap<DriverId, DriverRecord>>,
    companions: RwLock<HashMap<CompanionId, CompanionRecord>>,
}

impl InMemoryDirectory {
    /// Build a directory holding the records of `seed`.
    pub fn from_seed(seed: DirectorySeed) -> Self {
        Self {
            patients: RwLock::new(seed.patients.into_iter().map(|r| (r.id, r)).collect()),
            vehicles: RwLock::new(seed.vehicles.into_iter().map(|r| (r.id, r)).collect()),
            drivers: RwLock::new(seed.drivers.into_iter().map(|r| (r.id, r)).collect()),
            companions: RwLock::new(seed.companions.into_iter().map(|r| (r.id, r)).collect()),
        }
    }

    /// Load a seed file and build a directory from it.
    pub fn load(path: &Path) -> Result<Self, DirectorySeedError> {
        let seed = DirectorySeed::load(path)?;
        info!(
            path = %path.display(),
            patients = seed.patients.len(),
            vehicles = seed.vehicles.len(),
            drivers = seed.drivers.len(),
            companions = seed.companions.len(),
            "directory seed loaded"
        );
        Ok(Self::from_seed(seed))
    }

    pub async fn upsert_patient(&self, record: PatientRecord) {
        self.patients.write().await.insert(record.id, record);
    }

    pub async fn upsert_vehicle(&self, record: VehicleRecord) {
        self.vehicles.write().await.insert(record.id, record);
    }

    pub async fn upsert_driver(&self, record: DriverRecord) {
        self.drivers.write().await.insert(record.id, record);
    }

    pub async fn upsert_companion(&self, record: CompanionRecord) {
        self.companions.write().await.insert(record.id, record);
    }
}

#[async_trait]
impl PatientDirectory for InMemoryDirectory {
    async fn get_patient(&self, id: &PatientId) -> Result<Option<PatientRecord>, DirectoryError> {
        Ok(self.patients.read().await.get(id).copied())
    }
}

#[async_trait]
impl VehicleDirectory for InMemoryDirectory {
    async fn get_vehicle(&self, id: &VehicleId) -> Result<Option<VehicleRecord>, DirectoryError> {
        Ok(self.vehicles.read().await.get(id).copied())
    }
}

#[async_trait]
impl DriverDirectory for InMemoryDirectory {
    async fn get_driver(&self, id: &DriverId) -> Result<Option<DriverRecord>, DirectoryError> {
        Ok(self.drivers.read().await.get(id).copied())
    }
}

#[async_trait]
impl CompanionDirectory for InMemoryDirectory {
    async fn get_companion(
        &self,
        id: &CompanionId,
    ) -> Result<Option<CompanionRecord>, DirectoryError> {
        Ok(self.companions.read().await.get(id).copied())
    }
}
