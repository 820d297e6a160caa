//! Background expiry sweep for waitlist calls.
//!
//! Expiry also happens lazily whenever a trip is read or mutated. The sweep
//! makes sure an unread trip still passes its seat to the next entry.

use std::sync::Arc;
use std::time::Duration;

use ridepool::domain::TraceId;
use ridepool::domain::ports::TripCommand;
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, info, warn};

/// Spawn a task that calls [`TripCommand::sweep_expired_calls`] every
/// `period` until the runtime shuts down.
pub(crate) fn spawn_expiry_sweep(trips: Arc<dyn TripCommand>, period: Duration) -> JoinHandle<()> {
    actix_web::rt::spawn(async move {
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let trace_id = TraceId::generate();
            match TraceId::scope(trace_id, trips.sweep_expired_calls()).await {
                Ok(swept) if swept.expired.is_empty() => debug!(%trace_id, "no expired calls"),
                Ok(swept) => info!(
                    %trace_id,
                    expired = swept.expired.len(),
                    promotions = swept.promotions.len(),
                    "expired waitlist calls swept"
                ),
                Err(error) => warn!(%trace_id, %error, "expiry sweep failed"),
            }
        }
    })
}
