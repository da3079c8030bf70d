use std::sync::RwLock;

use async_trait::async_trait;

use super::source::{Occupancy, OccupancyRecord, OccupancyScope, OccupancySource, SourceError, SourceKind};

/// Snapshot-backed adapter over records already held in memory.
pub struct MemorySource<T> {
    records: RwLock<Vec<T>>,
}

impl<T> MemorySource<T> {
    pub fn new(records: Vec<T>) -> Self {
        Self {
            records: RwLock::new(records),
        }
    }

    pub fn push(&self, record: T) {
        let mut records = self.records.write().unwrap_or_else(|poisoned| poisoned.into_inner());
        records.push(record);
    }

    pub fn len(&self) -> usize {
        self.records.read().map(|records| records.len()).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T> Default for MemorySource<T> {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

#[async_trait]
impl<T> OccupancySource for MemorySource<T>
where
    T: OccupancyRecord + Send + Sync,
{
    fn kind(&self) -> SourceKind {
        T::KIND
    }

    async fn occupied_intervals(&self, scope: &OccupancyScope) -> Result<Vec<Occupancy>, SourceError> {
        let records = self
            .records
            .read()
            .map_err(|_| SourceError::new(T::KIND, "in-memory records poisoned"))?;
        Ok(records.iter().filter_map(|record| record.occupancy(scope)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::blocked_date::BlockedDate;
    use crate::services::availability::DateRange;
    use chrono::NaiveDate;
    use mongodb::bson::oid::ObjectId;

    fn blocked(apartment: Option<ObjectId>) -> BlockedDate {
        let range = DateRange::new(
            NaiveDate::from_ymd_opt(2024, 12, 24).unwrap(),
            NaiveDate::from_ymd_opt(2024, 12, 26).unwrap(),
        )
        .unwrap();
        BlockedDate {
            id: Some(ObjectId::new()),
            start_date: range.start_bson(),
            end_date: range.end_bson(),
            reason: "Holidays".to_string(),
            apartment,
            created_by: ObjectId::new(),
            created_at: bson::DateTime::now(),
        }
    }

    #[test]
    fn global_blocks_apply_to_every_apartment() {
        let here = ObjectId::new();
        let elsewhere = ObjectId::new();
        let source = MemorySource::new(vec![blocked(None), blocked(Some(elsewhere))]);

        let occupied = tokio_test::block_on(source.occupied_intervals(&OccupancyScope::Apartment(here))).unwrap();
        assert_eq!(occupied.len(), 1);
        assert_eq!(occupied[0].kind, SourceKind::BlockedDate);

        let everything = tokio_test::block_on(source.occupied_intervals(&OccupancyScope::Global)).unwrap();
        assert_eq!(everything.len(), 2);
    }
}
