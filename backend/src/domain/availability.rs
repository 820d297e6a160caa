//! Vehicle and driver availability checks.
//!
//! The checker is a pure function over [`TripBooking`] snapshots. It has no
//! view of seats or rosters; it only answers whether a vehicle or driver is
//! already committed on a calendar date, across every trip category.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::ToSchema;

use super::trips::{TripCategory, TripStatus};
use super::{DriverId, Error, TripId, VehicleId};

/// Resource commitment implied by one trip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TripBooking {
    /// Trip holding the commitment.
    pub trip_id: TripId,
    /// Category of that trip.
    pub category: TripCategory,
    /// Calendar date the resources are committed on.
    pub date: NaiveDate,
    /// Committed vehicle.
    pub vehicle_id: VehicleId,
    /// Committed driver.
    pub driver_id: DriverId,
    /// Lifecycle status; only live trips commit resources.
    pub status: TripStatus,
}

/// Question put to [`check_availability`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AvailabilityRequest {
    /// Date to check.
    pub date: NaiveDate,
    /// Vehicle to check.
    pub vehicle_id: VehicleId,
    /// Driver to check.
    pub driver_id: DriverId,
    /// Trip being edited, ignored during the scan.
    pub exclude_trip_id: Option<TripId>,
}

/// Which resource is already committed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ConflictingResource {
    /// The vehicle is already committed.
    Vehicle,
    /// The driver is already committed.
    Driver,
    /// Vehicle and driver are both committed.
    Both,
}

impl ConflictingResource {
    /// Wire label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Vehicle => "vehicle",
            Self::Driver => "driver",
            Self::Both => "both",
        }
    }

    const fn from_flags(vehicle: bool, driver: bool) -> Option<Self> {
        match (vehicle, driver) {
            (true, true) => Some(Self::Both),
            (true, false) => Some(Self::Vehicle),
            (false, true) => Some(Self::Driver),
            (false, false) => None,
        }
    }
}

impl fmt::Display for ConflictingResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Answer from [`check_availability`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Availability {
    /// Whether both resources are free.
    pub available: bool,
    /// Which resource blocks the booking.
    pub conflicting_resource: Option<ConflictingResource>,
    /// Trips holding the conflicting commitments.
    pub conflicting_trip_ids: Vec<TripId>,
    /// Human-readable explanation.
    pub reason: String,
}

impl Availability {
    /// Convert an unavailable answer into a conflict error.
    pub fn into_result(self, date: NaiveDate) -> Result<(), Error> {
        match self.conflicting_resource {
            None => Ok(()),
            Some(resource) => Err(Error::conflict(self.reason).with_details(json!({
                "reason": "resource_unavailable",
                "resource": resource,
                "date": date,
                "conflictingTripIds": self.conflicting_trip_ids,
            }))),
        }
    }
}

/// Check whether the vehicle and driver are free on `request.date`.
///
/// Cancelled and completed trips never conflict. A vehicle clash and a driver
/// clash on different trips still report [`ConflictingResource::Both`].
///
/// # Examples
/// ```
/// use chrono::NaiveDate;
/// use ridepool::domain::{
///     AvailabilityRequest, ConflictingResource, DriverId, TripBooking, TripCategory, TripId,
///     TripStatus, VehicleId, check_availability,
/// };
///
/// let date = NaiveDate::from_ymd_opt(2026, 3, 2).expect("valid date");
/// let driver_id = DriverId::random();
/// let existing = TripBooking {
///     trip_id: TripId::random(),
///     category: TripCategory::Individual,
///     date,
///     vehicle_id: VehicleId::random(),
///     driver_id,
///     status: TripStatus::Scheduled,
/// };
/// let answer = check_availability(
///     &[existing],
///     &AvailabilityRequest {
///         date,
///         vehicle_id: VehicleId::random(),
///         driver_id,
///         exclude_trip_id: None,
///     },
/// );
/// assert!(!answer.available);
/// assert_eq!(answer.conflicting_resource, Some(ConflictingResource::Driver));
/// ```
pub fn check_availability(bookings: &[TripBooking], request: &AvailabilityRequest) -> Availability {
    let mut vehicle_taken = false;
    let mut driver_taken = false;
    let mut conflicting_trip_ids = Vec::new();

    let committed = bookings.iter().filter(|booking| {
        booking.date == request.date
            && booking.status.holds_resources()
            && Some(booking.trip_id) != request.exclude_trip_id
    });
    for booking in committed {
        let vehicle = booking.vehicle_id == request.vehicle_id;
        let driver = booking.driver_id == request.driver_id;
        if vehicle || driver {
            vehicle_taken |= vehicle;
            driver_taken |= driver;
            conflicting_trip_ids.push(booking.trip_id);
        }
    }

    let conflicting_resource = ConflictingResource::from_flags(vehicle_taken, driver_taken);
    let reason = match conflicting_resource {
        None => "vehicle and driver are available".to_owned(),
        Some(ConflictingResource::Vehicle) => format!(
            "vehicle {} is already booked on {}",
            request.vehicle_id, request.date
        ),
        Some(ConflictingResource::Driver) => format!(
            "driver {} is already booked on {}",
            request.driver_id, request.date
        ),
        Some(ConflictingResource::Both) => format!(
            "vehicle {} and driver {} are already booked on {}",
            request.vehicle_id, request.driver_id, request.date
        ),
    };

    Availability {
        available: conflicting_resource.is_none(),
        conflicting_resource,
        conflicting_trip_ids,
        reason,
    }
}
