//! Keyed async locks serialising trip mutations.
//!
//! Each key maps to its own `tokio::sync::Mutex`. The registry only keeps
//! weak handles, so a key's mutex is dropped once no task holds or waits on
//! it.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, Mutex, PoisonError, Weak};

use chrono::NaiveDate;
use tokio::sync::OwnedMutexGuard;

use super::{DriverId, TripId, VehicleId};

/// A vehicle or driver committed on one calendar date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ResourceKey {
    Vehicle(NaiveDate, VehicleId),
    Driver(NaiveDate, DriverId),
}

/// Held lock; released on drop.
#[must_use = "the lock is released as soon as the guard is dropped"]
pub struct KeyedGuard {
    _guard: OwnedMutexGuard<()>,
}

/// Registry of one async mutex per key.
pub struct KeyedLocks<K> {
    slots: Mutex<HashMap<K, Weak<tokio::sync::Mutex<()>>>>,
}

impl<K> Default for KeyedLocks<K> {
    fn default() -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
        }
    }
}

impl<K> KeyedLocks<K>
where
    K: Eq + Hash + Clone,
{
    fn slot(&self, key: &K) -> Arc<tokio::sync::Mutex<()>> {
        // The map only holds weak handles, so a poisoned guard leaves it valid.
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(existing) = slots.get(key).and_then(Weak::upgrade) {
            return existing;
        }
        slots.retain(|_, slot| slot.strong_count() > 0);
        let fresh = Arc::new(tokio::sync::Mutex::new(()));
        slots.insert(key.clone(), Arc::downgrade(&fresh));
        fresh
    }

    /// Wait for exclusive access to `key`.
    pub async fn acquire(&self, key: &K) -> KeyedGuard {
        let slot = self.slot(key);
        KeyedGuard {
            _guard: slot.lock_owned().await,
        }
    }

    /// Number of keys with a live mutex.
    pub fn live_keys(&self) -> usize {
        let slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        slots.values().filter(|slot| slot.strong_count() > 0).count()
    }
}

impl<K> KeyedLocks<K>
where
    K: Eq + Hash + Clone + Ord,
{
    /// Acquire several keys in sorted order so two callers with overlapping
    /// sets cannot deadlock.
    pub async fn acquire_many(&self, keys: impl IntoIterator<Item = K>) -> Vec<KeyedGuard> {
        let mut keys: Vec<K> = keys.into_iter().collect();
        keys.sort();
        keys.dedup();
        let mut guards = Vec::with_capacity(keys.len());
        for key in &keys {
            guards.push(self.acquire(key).await);
        }
        guards
    }
}

/// Per-trip locks plus per-resource locks for booking writes.
#[derive(Default)]
pub struct TripLocks {
    trips: KeyedLocks<TripId>,
    resources: KeyedLocks<ResourceKey>,
}

impl TripLocks {
    pub async fn trip(&self, trip_id: TripId) -> KeyedGuard {
        self.trips.acquire(&trip_id).await
    }

    /// Lock the `(date, vehicle)` and `(date, driver)` pairs of every booking
    /// a create or reschedule touches.
    pub async fn resources(
        &self,
        bookings: impl IntoIterator<Item = (NaiveDate, VehicleId, DriverId)>,
    ) -> Vec<KeyedGuard> {
        let keys = bookings.into_iter().flat_map(|(date, vehicle_id, driver_id)| {
            [
                ResourceKey::Vehicle(date, vehicle_id),
                ResourceKey::Driver(date, driver_id),
            ]
        });
        self.resources.acquire_many(keys).await
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.

    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use super::*;

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn same_key_is_mutually_exclusive() {
        let locks = Arc::new(KeyedLocks::<u8>::default());
        let inside = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let locks = Arc::clone(&locks);
                let inside = Arc::clone(&inside);
                let peak = Arc::clone(&peak);
                tokio::spawn(async move {
                    let _guard = locks.acquire(&1).await;
                    let now = inside.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(2)).await;
                    inside.fetch_sub(1, Ordering::SeqCst);
                })
            })
            .collect();
        for task in tasks {
            task.await.expect("task join");
        }

        assert_eq!(peak.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn distinct_keys_do_not_block_each_other() {
        let locks = KeyedLocks::<u8>::default();
        let _first = locks.acquire(&1).await;
        let second = tokio::time::timeout(Duration::from_millis(50), locks.acquire(&2)).await;
        assert!(second.is_ok());
    }

    #[tokio::test]
    async fn released_keys_are_pruned() {
        let locks = KeyedLocks::<u8>::default();
        {
            let _guard = locks.acquire(&1).await;
            assert_eq!(locks.live_keys(), 1);
        }
        assert_eq!(locks.live_keys(), 0);
    }

    #[tokio::test]
    async fn acquire_many_deduplicates_keys() {
        let locks = KeyedLocks::<u8>::default();
        let guards = locks.acquire_many([3, 1, 3, 2]).await;
        assert_eq!(guards.len(), 3);
    }

    #[tokio::test]
    async fn resource_locks_cover_vehicle_and_driver() {
        let locks = TripLocks::default();
        let date = NaiveDate::from_ymd_opt(2026, 3, 2).expect("valid date");
        let guards = locks
            .resources([(date, VehicleId::random(), DriverId::random())])
            .await;
        assert_eq!(guards.len(), 2);
    }
}
