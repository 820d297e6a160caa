//! JSON seed file for [`super::InMemoryDirectory`].

use std::path::{Path, PathBuf};

use cap_std::{ambient_authority, fs::Dir};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::ports::{CompanionRecord, DriverRecord, PatientRecord, VehicleRecord};

/// Errors returned while loading a directory seed.
#[derive(Debug, Error)]
pub enum DirectorySeedError {
    /// Seed file could not be read.
    #[error("failed to read directory seed at {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// Seed file is not valid JSON for [`DirectorySeed`].
    #[error("failed to parse directory seed at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Records served by the in-memory directory.
///
/// # Examples
///
/// ```
/// use ridepool::outbound::directory::DirectorySeed;
///
/// let seed: DirectorySeed = serde_json::from_str(
///     r#"{"vehicles": [{"id": "6f1c9b9e-0f5e-4c59-9d56-1c2f61f0a001", "capacity": 8}]}"#,
/// )?;
/// assert_eq!(seed.vehicles[0].capacity, 8);
/// assert!(seed.patients.is_empty());
/// # Ok::<(), serde_json::Error>(())
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DirectorySeed {
    pub patients: Vec<PatientRecord>,
    pub vehicles: Vec<VehicleRecord>,
    pub drivers: Vec<DriverRecord>,
    pub companions: Vec<CompanionRecord>,
}

impl DirectorySeed {
    /// Read and parse a seed file through a capability-scoped directory.
    pub fn load(path: &Path) -> Result<Self, DirectorySeedError> {
        let read_error = |source| DirectorySeedError::Read {
            path: path.to_path_buf(),
            source,
        };
        let parent = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let file_name = path.file_name().ok_or_else(|| {
            read_error(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "seed path must be a file",
            ))
        })?;
        let dir = Dir::open_ambient_dir(parent, ambient_authority()).map_err(read_error)?;
        let contents = dir.read_to_string(Path::new(file_name)).map_err(read_error)?;
        serde_json::from_str(&contents).map_err(|source| DirectorySeedError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}
