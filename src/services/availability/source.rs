use std::fmt;

use async_trait::async_trait;
use log::warn;
use mongodb::bson::oid::ObjectId;
use serde::Serialize;
use thiserror::Error;

use super::interval::DateRange;
use crate::models::{availability::AvailabilityBlock, blocked_date::BlockedDate, booking::Booking};

/// Which records an adapter should return.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OccupancyScope {
    /// Records that occupy this apartment, global blocks included.
    Apartment(ObjectId),
    /// Every occupying record of every apartment.
    Global,
}

impl OccupancyScope {
    pub fn for_apartment(apartment: Option<ObjectId>) -> Self {
        match apartment {
            Some(id) => OccupancyScope::Apartment(id),
            None => OccupancyScope::Global,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SourceKind {
    Booking,
    AvailabilityBlock,
    BlockedDate,
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceKind::Booking => write!(f, "booking"),
            SourceKind::AvailabilityBlock => write!(f, "availability block"),
            SourceKind::BlockedDate => write!(f, "blocked date"),
        }
    }
}

/// One occupied range, tagged with the record that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Occupancy {
    pub kind: SourceKind,
    pub record_id: Option<ObjectId>,
    pub range: DateRange,
}

impl Occupancy {
    pub fn record_hex(&self) -> Option<String> {
        self.record_id.map(|id| id.to_hex())
    }
}

#[derive(Debug, Clone, Error)]
#[error("{kind} store unavailable: {message}")]
pub struct SourceError {
    pub kind: SourceKind,
    pub message: String,
}

impl SourceError {
    pub fn new(kind: SourceKind, message: impl Into<String>) -> Self {
        SourceError {
            kind,
            message: message.into(),
        }
    }
}

/// Capability shared by bookings, availability blocks and blocked dates:
/// list the ranges that occupy an apartment.
#[async_trait]
pub trait OccupancySource: Send + Sync {
    fn kind(&self) -> SourceKind;

    async fn occupied_intervals(&self, scope: &OccupancyScope) -> Result<Vec<Occupancy>, SourceError>;
}

/// A persisted record that may occupy calendar days.
pub trait OccupancyRecord {
    const KIND: SourceKind;

    fn record_id(&self) -> Option<ObjectId>;

    fn bounds(&self) -> (bson::DateTime, bson::DateTime);

    /// Whether this record occupies days within `scope`, ignoring its dates.
    fn occupies(&self, scope: &OccupancyScope) -> bool;

    fn occupancy(&self, scope: &OccupancyScope) -> Option<Occupancy> {
        if !self.occupies(scope) {
            return None;
        }
        let (start, end) = self.bounds();
        match DateRange::from_bson(start, end) {
            Ok(range) => Some(Occupancy {
                kind: Self::KIND,
                record_id: self.record_id(),
                range,
            }),
            Err(err) => {
                // Records whose end is not after their start cannot occupy anything.
                warn!("Skipping {} {:?}: {}", Self::KIND, self.record_id(), err);
                None
            }
        }
    }
}

impl OccupancyRecord for Booking {
    const KIND: SourceKind = SourceKind::Booking;

    fn record_id(&self) -> Option<ObjectId> {
        self.id
    }

    fn bounds(&self) -> (bson::DateTime, bson::DateTime) {
        (self.start_date, self.end_date)
    }

    fn occupies(&self, scope: &OccupancyScope) -> bool {
        let in_scope = match scope {
            OccupancyScope::Apartment(id) => &self.apartment == id,
            OccupancyScope::Global => true,
        };
        in_scope && self.status.occupies()
    }
}

impl OccupancyRecord for AvailabilityBlock {
    const KIND: SourceKind = SourceKind::AvailabilityBlock;

    fn record_id(&self) -> Option<ObjectId> {
        self.id
    }

    fn bounds(&self) -> (bson::DateTime, bson::DateTime) {
        (self.start_date, self.end_date)
    }

    fn occupies(&self, scope: &OccupancyScope) -> bool {
        let in_scope = match scope {
            OccupancyScope::Apartment(id) => &self.apartment == id,
            OccupancyScope::Global => true,
        };
        in_scope && !self.is_available
    }
}

impl OccupancyRecord for BlockedDate {
    const KIND: SourceKind = SourceKind::BlockedDate;

    fn record_id(&self) -> Option<ObjectId> {
        self.id
    }

    fn bounds(&self) -> (bson::DateTime, bson::DateTime) {
        (self.start_date, self.end_date)
    }

    fn occupies(&self, scope: &OccupancyScope) -> bool {
        match scope {
            OccupancyScope::Global => true,
            OccupancyScope::Apartment(id) => self.is_global() || self.apartment.as_ref() == Some(id),
        }
    }
}
