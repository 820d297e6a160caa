//! Driving port for trip reads and availability checks.

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::{Availability, DriverId, Error, TripId, VehicleId};

use super::trip_command::{TripResponse, WaitlistEntryPayload};

/// Request to fetch one trip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetTripRequest {
    pub trip_id: TripId,
}

/// Request to check whether a vehicle and driver are free on a date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckAvailabilityRequest {
    pub date: NaiveDate,
    pub vehicle_id: VehicleId,
    pub driver_id: DriverId,
    pub exclude_trip_id: Option<TripId>,
}

/// Request to list a trip's waitlist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListWaitlistRequest {
    pub trip_id: TripId,
}

/// Waitlist in promotion order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ListWaitlistResponse {
    pub trip_id: TripId,
    pub seats_available: u32,
    pub entries: Vec<WaitlistEntryPayload>,
}

/// Driving port for trip read operations.
///
/// Reads expire overdue waitlist calls before answering, so a response
/// deadline is never reported as pending after it passed.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TripQuery: Send + Sync {
    async fn get_trip(&self, request: GetTripRequest) -> Result<TripResponse, Error>;

    /// Pure availability check; takes no locks and writes nothing.
    async fn check_availability(
        &self,
        request: CheckAvailabilityRequest,
    ) -> Result<Availability, Error>;

    async fn list_waitlist(
        &self,
        request: ListWaitlistRequest,
    ) -> Result<ListWaitlistResponse, Error>;
}
