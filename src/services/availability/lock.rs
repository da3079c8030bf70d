use std::sync::Arc;

use dashmap::DashMap;
use mongodb::bson::oid::ObjectId;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::source::OccupancyScope;

/// Serialises check-then-write for occupancy changes within this process.
///
/// Apartment writes hold the global lock shared plus that apartment's mutex.
/// Global writes hold the global lock exclusively, so they wait for every
/// in-flight apartment write and block new ones. Locks are always taken
/// global first, then apartment.
#[derive(Default)]
pub struct AvailabilityLocks {
    global: RwLock<()>,
    apartments: DashMap<ObjectId, Arc<Mutex<()>>>,
}

pub enum WriteGuard<'a> {
    Apartment {
        _global: RwLockReadGuard<'a, ()>,
        _apartment: OwnedMutexGuard<()>,
    },
    Global(RwLockWriteGuard<'a, ()>),
}

impl AvailabilityLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn lock(&self, scope: &OccupancyScope) -> WriteGuard<'_> {
        match scope {
            OccupancyScope::Apartment(id) => {
                let global = self.global.read().await;
                // Clone the Arc out so the shard lock is released before awaiting.
                let apartment = self.apartments.entry(*id).or_default().value().clone();
                WriteGuard::Apartment {
                    _global: global,
                    _apartment: apartment.lock_owned().await,
                }
            }
            OccupancyScope::Global => WriteGuard::Global(self.global.write().await),
        }
    }

    /// Drops the mutex of an apartment that no longer exists. An entry that
    /// is held or awaited stays until its holders finish.
    pub fn forget(&self, apartment: &ObjectId) {
        self.apartments
            .remove_if(apartment, |_, mutex| Arc::strong_count(mutex) == 1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[actix_rt::test]
    async fn same_apartment_waits() {
        let locks = AvailabilityLocks::new();
        let scope = OccupancyScope::Apartment(ObjectId::new());

        let _held = locks.lock(&scope).await;
        let second = tokio::time::timeout(Duration::from_millis(50), locks.lock(&scope)).await;
        assert!(second.is_err());
    }

    #[actix_rt::test]
    async fn different_apartments_do_not_wait() {
        let locks = AvailabilityLocks::new();

        let _held = locks.lock(&OccupancyScope::Apartment(ObjectId::new())).await;
        let other = tokio::time::timeout(
            Duration::from_millis(50),
            locks.lock(&OccupancyScope::Apartment(ObjectId::new())),
        )
        .await;
        assert!(other.is_ok());
    }

    #[actix_rt::test]
    async fn global_write_waits_for_apartment_writes() {
        let locks = AvailabilityLocks::new();

        let _held = locks.lock(&OccupancyScope::Apartment(ObjectId::new())).await;
        let global = tokio::time::timeout(Duration::from_millis(50), locks.lock(&OccupancyScope::Global)).await;
        assert!(global.is_err());
    }

    #[actix_rt::test]
    async fn forget_removes_idle_apartments_only() {
        let locks = AvailabilityLocks::new();
        let apartment = ObjectId::new();
        let scope = OccupancyScope::Apartment(apartment);

        let held = locks.lock(&scope).await;
        locks.forget(&apartment);
        assert!(locks.apartments.contains_key(&apartment));

        drop(held);
        locks.forget(&apartment);
        assert!(!locks.apartments.contains_key(&apartment));

        let again = tokio::time::timeout(Duration::from_millis(50), locks.lock(&scope)).await;
        assert!(again.is_ok());
    }
}
