//! Strongly typed identifiers for trips, entries, and external resources.
//!
//! Every identifier wraps a UUID. Distinct types keep a driver id from being
//! passed where a vehicle id is expected.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ToSchema,
        )]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Generate a new random identifier.
            #[must_use]
            pub fn random() -> Self {
                Self(Uuid::new_v4())
            }

            /// Wrap an existing UUID.
            #[must_use]
            pub const fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Access the underlying UUID.
            #[must_use]
            pub const fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                fmt::Display::fmt(&self.0, f)
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(s).map(Self)
            }
        }

        impl From<Uuid> for $name {
            fn from(value: Uuid) -> Self {
                Self(value)
            }
        }
    };
}

define_id! {
    /// Identifier of a scheduled trip.
    TripId
}

define_id! {
    /// Identifier of a patient in the external patient directory.
    PatientId
}

define_id! {
    /// Identifier of a vehicle in the external fleet directory.
    VehicleId
}

define_id! {
    /// Identifier of a driver in the external driver directory.
    DriverId
}

define_id! {
    /// Identifier of a companion in the external companion directory.
    CompanionId
}

define_id! {
    /// Identifier of a roster entry.
    PassengerEntryId
}

define_id! {
    /// Identifier of a waitlist entry.
    WaitlistEntryId
}
