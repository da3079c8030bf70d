use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::NaiveDate;
use log::{debug, info};
use mongodb::bson::oid::ObjectId;
use thiserror::Error;

use super::interval::{DateRange, InvalidRange};
use super::source::{Occupancy, OccupancyScope, OccupancySource, SourceError, SourceKind};

#[derive(Debug, Error)]
pub enum AvailabilityError {
    #[error(transparent)]
    InvalidRange(#[from] InvalidRange),

    #[error("dates conflict with {} {:?} {}", .0.kind, .0.record_id, .0.range)]
    Conflict(Occupancy),

    #[error(transparent)]
    Source(#[from] SourceError),
}

/// Merges bookings, availability blocks and blocked dates into one view of an
/// apartment's calendar. Reads a fresh snapshot on every call and keeps no state.
#[derive(Clone)]
pub struct AvailabilityEngine {
    sources: [Arc<dyn OccupancySource>; 3],
}

impl AvailabilityEngine {
    pub fn new(
        bookings: Arc<dyn OccupancySource>,
        blocks: Arc<dyn OccupancySource>,
        blocked_dates: Arc<dyn OccupancySource>,
    ) -> Self {
        debug_assert_eq!(bookings.kind(), SourceKind::Booking);
        debug_assert_eq!(blocks.kind(), SourceKind::AvailabilityBlock);
        debug_assert_eq!(blocked_dates.kind(), SourceKind::BlockedDate);
        Self {
            sources: [bookings, blocks, blocked_dates],
        }
    }

    /// All occupied ranges for `scope`, in scan order.
    pub async fn occupancy(&self, scope: &OccupancyScope) -> Result<Vec<Occupancy>, AvailabilityError> {
        let mut occupied = Vec::new();
        for source in &self.sources {
            occupied.extend(source.occupied_intervals(scope).await?);
        }
        Ok(occupied)
    }

    pub async fn is_available(
        &self,
        apartment_id: ObjectId,
        candidate: &DateRange,
    ) -> Result<bool, AvailabilityError> {
        let conflict = self
            .find_conflict(&OccupancyScope::Apartment(apartment_id), candidate, None)
            .await?;
        Ok(conflict.is_none())
    }

    /// Validates raw bounds before checking; fails with `InvalidRange` when `start >= end`.
    pub async fn check(
        &self,
        apartment_id: ObjectId,
        start: &str,
        end: &str,
    ) -> Result<bool, AvailabilityError> {
        let candidate = DateRange::parse(start, end)?;
        self.is_available(apartment_id, &candidate).await
    }

    pub async fn unavailable_days(&self, apartment_id: ObjectId) -> Result<BTreeSet<NaiveDate>, AvailabilityError> {
        let occupied = self.occupancy(&OccupancyScope::Apartment(apartment_id)).await?;
        Ok(occupied_days(&occupied))
    }

    pub async fn unavailable_days_within(
        &self,
        apartment_id: ObjectId,
        window: &DateRange,
    ) -> Result<BTreeSet<NaiveDate>, AvailabilityError> {
        let occupied = self.occupancy(&OccupancyScope::Apartment(apartment_id)).await?;
        let clipped: Vec<Occupancy> = occupied
            .into_iter()
            .filter_map(|occupancy| {
                occupancy.range.intersect(window).map(|range| Occupancy { range, ..occupancy })
            })
            .collect();
        Ok(occupied_days(&clipped))
    }

    /// First record overlapping `candidate`, scanning bookings, then availability
    /// blocks, then blocked dates. `exclude` skips the record being edited.
    pub async fn find_conflict(
        &self,
        scope: &OccupancyScope,
        candidate: &DateRange,
        exclude: Option<ObjectId>,
    ) -> Result<Option<Occupancy>, AvailabilityError> {
        for source in &self.sources {
            let occupied = source.occupied_intervals(scope).await?;
            if let Some(conflict) = first_conflict(&occupied, candidate, exclude) {
                debug!("{} overlaps {} {:?}", candidate, conflict.kind, conflict.record_id);
                return Ok(Some(conflict.clone()));
            }
        }
        Ok(None)
    }

    pub async fn ensure_available(
        &self,
        scope: &OccupancyScope,
        candidate: &DateRange,
        exclude: Option<ObjectId>,
    ) -> Result<(), AvailabilityError> {
        match self.find_conflict(scope, candidate, exclude).await? {
            Some(conflict) => {
                info!(
                    "Rejecting {:?} {}: conflicts with {} {:?}",
                    scope, candidate, conflict.kind, conflict.record_id
                );
                Err(AvailabilityError::Conflict(conflict))
            }
            None => Ok(()),
        }
    }
}

pub fn first_conflict<'a>(
    occupied: &'a [Occupancy],
    candidate: &DateRange,
    exclude: Option<ObjectId>,
) -> Option<&'a Occupancy> {
    occupied.iter().find(|occupancy| {
        let excluded = exclude.is_some() && occupancy.record_id == exclude;
        !excluded && occupancy.range.overlaps(candidate)
    })
}

/// Union of every day covered by `occupied`, sorted and de-duplicated.
pub fn occupied_days(occupied: &[Occupancy]) -> BTreeSet<NaiveDate> {
    occupied.iter().flat_map(|occupancy| occupancy.range.days()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        availability::{AvailabilityBlock, BlockReason},
        blocked_date::BlockedDate,
        booking::{Booking, BookingStatus, PaymentMethod, PaymentStatus},
    };
    use crate::services::availability::memory::MemorySource;
    use chrono::Days;

    fn day(value: &str) -> NaiveDate {
        NaiveDate::parse_from_str(value, "%Y-%m-%d").unwrap()
    }

    fn range(start: &str, end: &str) -> DateRange {
        DateRange::new(day(start), day(end)).unwrap()
    }

    fn booking(apartment: ObjectId, start: &str, end: &str, status: BookingStatus) -> Booking {
        let stay = range(start, end);
        Booking {
            id: Some(ObjectId::new()),
            apartment,
            user: ObjectId::new(),
            start_date: stay.start_bson(),
            end_date: stay.end_bson(),
            total_price: 0.0,
            status,
            payment_method: PaymentMethod::CreditCard,
            payment_status: PaymentStatus::Pending,
            payment_id: None,
            payment_date: None,
            confirmed_at: None,
            cancelled_at: None,
            cancellation_reason: None,
            notes: None,
            created_at: bson::DateTime::now(),
            updated_at: bson::DateTime::now(),
        }
    }

    fn block(apartment: ObjectId, start: &str, end: &str) -> AvailabilityBlock {
        let period = range(start, end);
        AvailabilityBlock {
            id: Some(ObjectId::new()),
            apartment,
            start_date: period.start_bson(),
            end_date: period.end_bson(),
            is_available: false,
            reason: BlockReason::Maintenance,
            notes: None,
            created_by: ObjectId::new(),
            created_at: bson::DateTime::now(),
            updated_at: bson::DateTime::now(),
        }
    }

    fn blocked(apartment: Option<ObjectId>, start: &str, end: &str) -> BlockedDate {
        let period = range(start, end);
        BlockedDate {
            id: Some(ObjectId::new()),
            start_date: period.start_bson(),
            end_date: period.end_bson(),
            reason: "Holidays".to_string(),
            apartment,
            created_by: ObjectId::new(),
            created_at: bson::DateTime::now(),
        }
    }

    fn engine(bookings: Vec<Booking>, blocks: Vec<AvailabilityBlock>, blocked_dates: Vec<BlockedDate>) -> AvailabilityEngine {
        AvailabilityEngine::new(
            Arc::new(MemorySource::new(bookings)),
            Arc::new(MemorySource::new(blocks)),
            Arc::new(MemorySource::new(blocked_dates)),
        )
    }

    #[actix_rt::test]
    async fn back_to_back_booking_is_available() {
        let apartment = ObjectId::new();
        let engine = engine(
            vec![booking(apartment, "2024-06-01", "2024-06-05", BookingStatus::Confirmed)],
            vec![],
            vec![],
        );

        assert!(engine.is_available(apartment, &range("2024-06-05", "2024-06-08")).await.unwrap());
        assert!(!engine.is_available(apartment, &range("2024-06-04", "2024-06-06")).await.unwrap());
    }

    #[actix_rt::test]
    async fn check_rejects_inverted_range_before_reading() {
        let engine = engine(vec![], vec![], vec![]);
        let result = engine.check(ObjectId::new(), "2024-06-05", "2024-06-05").await;
        assert!(matches!(result, Err(AvailabilityError::InvalidRange(_))));
    }

    #[actix_rt::test]
    async fn cancelled_and_foreign_bookings_do_not_occupy() {
        let apartment = ObjectId::new();
        let engine = engine(
            vec![
                booking(apartment, "2024-06-01", "2024-06-05", BookingStatus::Cancelled),
                booking(ObjectId::new(), "2024-06-01", "2024-06-05", BookingStatus::Confirmed),
            ],
            vec![],
            vec![],
        );

        assert!(engine.is_available(apartment, &range("2024-06-01", "2024-06-05")).await.unwrap());
        assert!(engine.unavailable_days(apartment).await.unwrap().is_empty());
    }

    #[actix_rt::test]
    async fn availability_block_days_exclude_end() {
        let apartment = ObjectId::new();
        let engine = engine(vec![], vec![block(apartment, "2024-07-10", "2024-07-15")], vec![]);

        let days: Vec<NaiveDate> = engine.unavailable_days(apartment).await.unwrap().into_iter().collect();
        let expected: Vec<NaiveDate> = ["2024-07-10", "2024-07-11", "2024-07-12", "2024-07-13", "2024-07-14"]
            .iter()
            .map(|d| day(d))
            .collect();
        assert_eq!(days, expected);
    }

    #[actix_rt::test]
    async fn global_block_applies_to_every_apartment() {
        let engine = engine(vec![], vec![], vec![blocked(None, "2024-12-24", "2024-12-26")]);

        for apartment in [ObjectId::new(), ObjectId::new()] {
            assert!(!engine.is_available(apartment, &range("2024-12-24", "2024-12-25")).await.unwrap());
            let days = engine.unavailable_days(apartment).await.unwrap();
            assert!(days.contains(&day("2024-12-24")));
            assert!(days.contains(&day("2024-12-25")));
            assert!(!days.contains(&day("2024-12-26")));
        }
    }

    #[actix_rt::test]
    async fn apartment_scoped_block_stays_on_its_apartment() {
        let target = ObjectId::new();
        let other = ObjectId::new();
        let engine = engine(vec![], vec![], vec![blocked(Some(target), "2024-08-01", "2024-08-03")]);

        assert!(!engine.is_available(target, &range("2024-08-02", "2024-08-04")).await.unwrap());
        assert!(engine.is_available(other, &range("2024-08-02", "2024-08-04")).await.unwrap());
    }

    #[actix_rt::test]
    async fn overlapping_sources_are_deduplicated() {
        let apartment = ObjectId::new();
        let engine = engine(
            vec![booking(apartment, "2024-06-01", "2024-06-04", BookingStatus::Pending)],
            vec![block(apartment, "2024-06-03", "2024-06-06")],
            vec![blocked(None, "2024-06-05", "2024-06-07")],
        );

        let days = engine.unavailable_days(apartment).await.unwrap();
        assert_eq!(days.len(), 6);
        assert_eq!(days.first(), Some(&day("2024-06-01")));
        assert_eq!(days.last(), Some(&day("2024-06-06")));
    }

    #[actix_rt::test]
    async fn unavailable_days_agree_with_single_night_checks() {
        let apartment = ObjectId::new();
        let engine = engine(
            vec![
                booking(apartment, "2024-06-01", "2024-06-05", BookingStatus::Confirmed),
                booking(apartment, "2024-06-09", "2024-06-10", BookingStatus::PaymentCompleted),
            ],
            vec![block(apartment, "2024-06-12", "2024-06-14")],
            vec![blocked(None, "2024-06-20", "2024-06-22")],
        );

        let unavailable = engine.unavailable_days(apartment).await.unwrap();
        let mut current = day("2024-05-28");
        while current < day("2024-06-25") {
            let night = DateRange::single_day(current).unwrap();
            let available = engine.is_available(apartment, &night).await.unwrap();
            assert_eq!(unavailable.contains(&current), !available, "day {current}");
            current = current.checked_add_days(Days::new(1)).unwrap();
        }
    }

    #[actix_rt::test]
    async fn window_clips_unavailable_days() {
        let apartment = ObjectId::new();
        let engine = engine(vec![], vec![block(apartment, "2024-07-10", "2024-07-15")], vec![]);

        let days = engine
            .unavailable_days_within(apartment, &range("2024-07-13", "2024-07-31"))
            .await
            .unwrap();
        assert_eq!(days.into_iter().collect::<Vec<_>>(), vec![day("2024-07-13"), day("2024-07-14")]);
    }

    #[actix_rt::test]
    async fn conflicts_report_bookings_then_blocks_then_blocked_dates() {
        let apartment = ObjectId::new();
        let existing = booking(apartment, "2024-06-01", "2024-06-05", BookingStatus::Confirmed);
        let maintenance = block(apartment, "2024-06-02", "2024-06-04");
        let holiday = blocked(None, "2024-06-03", "2024-06-04");
        let candidate = range("2024-06-03", "2024-06-04");
        let scope = OccupancyScope::Apartment(apartment);

        let all = engine(vec![existing.clone()], vec![maintenance.clone()], vec![holiday.clone()]);
        let conflict = all.find_conflict(&scope, &candidate, None).await.unwrap().unwrap();
        assert_eq!(conflict.kind, SourceKind::Booking);
        assert_eq!(conflict.record_id, existing.id);

        let no_bookings = engine(vec![], vec![maintenance.clone()], vec![holiday.clone()]);
        let conflict = no_bookings.find_conflict(&scope, &candidate, None).await.unwrap().unwrap();
        assert_eq!(conflict.kind, SourceKind::AvailabilityBlock);
        assert_eq!(conflict.record_id, maintenance.id);

        let only_holiday = engine(vec![], vec![], vec![holiday.clone()]);
        let conflict = only_holiday.find_conflict(&scope, &candidate, None).await.unwrap().unwrap();
        assert_eq!(conflict.kind, SourceKind::BlockedDate);
        assert_eq!(conflict.record_id, holiday.id);
    }

    #[actix_rt::test]
    async fn excluded_record_does_not_conflict_with_itself() {
        let apartment = ObjectId::new();
        let maintenance = block(apartment, "2024-06-02", "2024-06-04");
        let engine = engine(vec![], vec![maintenance.clone()], vec![]);
        let scope = OccupancyScope::Apartment(apartment);
        let widened = range("2024-06-01", "2024-06-05");

        assert!(engine.ensure_available(&scope, &widened, maintenance.id).await.is_ok());
        assert!(matches!(
            engine.ensure_available(&scope, &widened, None).await,
            Err(AvailabilityError::Conflict(_))
        ));
    }

    #[actix_rt::test]
    async fn global_scope_sees_every_apartment() {
        let engine = engine(
            vec![booking(ObjectId::new(), "2024-12-20", "2024-12-27", BookingStatus::Confirmed)],
            vec![],
            vec![],
        );

        let conflict = engine
            .find_conflict(&OccupancyScope::Global, &range("2024-12-24", "2024-12-26"), None)
            .await
            .unwrap();
        assert_eq!(conflict.map(|c| c.kind), Some(SourceKind::Booking));
    }

    #[actix_rt::test]
    async fn booking_within_one_day_blocks_that_night() {
        let apartment = ObjectId::new();
        let mut short = booking(apartment, "2024-06-01", "2024-06-02", BookingStatus::Confirmed);
        short.start_date = bson::DateTime::parse_rfc3339_str("2024-06-01T10:00:00Z").unwrap();
        short.end_date = bson::DateTime::parse_rfc3339_str("2024-06-01T20:00:00Z").unwrap();
        let engine = engine(vec![short], vec![], vec![]);

        assert!(!engine.is_available(apartment, &range("2024-06-01", "2024-06-02")).await.unwrap());
        let days: Vec<NaiveDate> = engine.unavailable_days(apartment).await.unwrap().into_iter().collect();
        assert_eq!(days, vec![range("2024-06-01", "2024-06-02").start()]);
    }

    #[test]
    fn first_conflict_ignores_adjacent_ranges() {
        let occupied = vec![Occupancy {
            kind: SourceKind::Booking,
            record_id: Some(ObjectId::new()),
            range: range("2024-06-01", "2024-06-05"),
        }];
        assert!(first_conflict(&occupied, &range("2024-05-28", "2024-06-01"), None).is_none());
        assert!(first_conflict(&occupied, &range("2024-06-05", "2024-06-06"), None).is_none());
        assert!(first_conflict(&occupied, &range("2024-06-04", "2024-06-05"), None).is_some());
    }
}
