use async_trait::async_trait;
use futures::TryStreamExt;
use log::error;
use mongodb::{
    bson::{doc, Bson, Document},
    Collection,
};
use serde::de::DeserializeOwned;

use super::source::{Occupancy, OccupancyRecord, OccupancyScope, OccupancySource, SourceError, SourceKind};
use crate::models::{availability::AvailabilityBlock, blocked_date::BlockedDate, booking::{Booking, BookingStatus}};

/// Records whose occupancy can be pre-filtered by a MongoDB query.
pub trait MongoRecord: OccupancyRecord {
    fn scope_filter(scope: &OccupancyScope) -> Document;
}

impl MongoRecord for Booking {
    fn scope_filter(scope: &OccupancyScope) -> Document {
        let statuses: Vec<Bson> = BookingStatus::OCCUPYING
            .iter()
            .map(|status| Bson::String(status.as_str().to_string()))
            .collect();
        match scope {
            OccupancyScope::Apartment(id) => doc! { "apartment": *id, "status": { "$in": statuses } },
            OccupancyScope::Global => doc! { "status": { "$in": statuses } },
        }
    }
}

impl MongoRecord for AvailabilityBlock {
    fn scope_filter(scope: &OccupancyScope) -> Document {
        match scope {
            OccupancyScope::Apartment(id) => doc! { "apartment": *id, "isAvailable": false },
            OccupancyScope::Global => doc! { "isAvailable": false },
        }
    }
}

impl MongoRecord for BlockedDate {
    fn scope_filter(scope: &OccupancyScope) -> Document {
        match scope {
            OccupancyScope::Apartment(id) => doc! {
                "$or": [
                    { "apartment": *id },
                    { "apartment": Bson::Null },
                ]
            },
            OccupancyScope::Global => doc! {},
        }
    }
}

/// Adapter reading one collection. Status and scope filtering happen in the
/// query; the record's own `occupies` re-checks each row.
pub struct MongoSource<T: Send + Sync> {
    collection: Collection<T>,
}

impl<T: Send + Sync> MongoSource<T> {
    pub fn new(collection: Collection<T>) -> Self {
        Self { collection }
    }
}

#[async_trait]
impl<T> OccupancySource for MongoSource<T>
where
    T: MongoRecord + DeserializeOwned + Send + Sync + Unpin,
{
    fn kind(&self) -> SourceKind {
        T::KIND
    }

    async fn occupied_intervals(&self, scope: &OccupancyScope) -> Result<Vec<Occupancy>, SourceError> {
        let cursor = self
            .collection
            .find(T::scope_filter(scope))
            .sort(doc! { "startDate": 1 })
            .await
            .map_err(|err| read_failed(T::KIND, err))?;

        let records: Vec<T> = cursor
            .try_collect()
            .await
            .map_err(|err| read_failed(T::KIND, err))?;

        Ok(records.iter().filter_map(|record| record.occupancy(scope)).collect())
    }
}

fn read_failed(kind: SourceKind, err: mongodb::error::Error) -> SourceError {
    error!("Failed to read {} records: {:?}", kind, err);
    SourceError::new(kind, err.to_string())
}
