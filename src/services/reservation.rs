use std::future::Future;

use log::error;
use mongodb::bson::oid::ObjectId;

use crate::services::availability::{
    AvailabilityEngine, AvailabilityError, AvailabilityLocks, DateRange, OccupancyScope, SourceError, SourceKind,
};

/// Write path for anything that occupies calendar days: re-checks the engine
/// and persists under the scope's lock, so two overlapping requests cannot
/// both pass the check.
pub struct Reservations {
    engine: AvailabilityEngine,
    locks: AvailabilityLocks,
}

impl Reservations {
    pub fn new(engine: AvailabilityEngine) -> Self {
        Self {
            engine,
            locks: AvailabilityLocks::new(),
        }
    }

    pub fn engine(&self) -> &AvailabilityEngine {
        &self.engine
    }

    /// Releases the write lock kept for a deleted apartment.
    pub fn forget_apartment(&self, apartment: &ObjectId) {
        self.locks.forget(apartment);
    }

    /// Runs `write` only if `range` is free in `scope`. `exclude` names the
    /// record being edited, which must not conflict with itself.
    pub async fn reserve<T, F, Fut>(
        &self,
        scope: OccupancyScope,
        range: &DateRange,
        exclude: Option<ObjectId>,
        write: F,
    ) -> Result<T, AvailabilityError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, SourceError>>,
    {
        let _guard = self.locks.lock(&scope).await;
        self.engine.ensure_available(&scope, range, exclude).await?;
        Ok(write().await?)
    }
}

pub fn persist_failed(kind: SourceKind, err: mongodb::error::Error) -> SourceError {
    error!("Failed to persist {}: {:?}", kind, err);
    SourceError::new(kind, err.to_string())
}
