use std::fmt;

use chrono::{DateTime, Days, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidRange {
    #[error("Invalid date format for {field}: {value}")]
    Unparseable { field: &'static str, value: String },

    #[error("End date must be after start date")]
    NotIncreasing { start: NaiveDate, end: NaiveDate },
}

/// Half-open range of calendar days `[start, end)`.
///
/// Bounds are UTC calendar days. A booking from the 1st to the 5th occupies
/// the nights of the 1st through the 4th; the 5th is free for the next guest.
/// `start < end` always holds for a constructed value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawRange", into = "RawRange")]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawRange {
    start_date: NaiveDate,
    end_date: NaiveDate,
}

impl TryFrom<RawRange> for DateRange {
    type Error = InvalidRange;

    fn try_from(raw: RawRange) -> Result<Self, Self::Error> {
        DateRange::new(raw.start_date, raw.end_date)
    }
}

impl From<DateRange> for RawRange {
    fn from(range: DateRange) -> Self {
        RawRange {
            start_date: range.start,
            end_date: range.end,
        }
    }
}

pub fn validate(start: NaiveDate, end: NaiveDate) -> Result<(), InvalidRange> {
    if start >= end {
        return Err(InvalidRange::NotIncreasing { start, end });
    }
    Ok(())
}

pub fn overlaps(a: &DateRange, b: &DateRange) -> bool {
    a.start < b.end && b.start < a.end
}

/// Every calendar day in `[start, end)`; empty when `start >= end`.
pub fn days_between(start: NaiveDate, end: NaiveDate) -> impl Iterator<Item = NaiveDate> {
    start.iter_days().take_while(move |day| *day < end)
}

/// Parses `YYYY-MM-DD` or an RFC 3339 timestamp into its UTC calendar day.
pub fn parse_day(field: &'static str, value: &str) -> Result<NaiveDate, InvalidRange> {
    let value = value.trim();
    if let Ok(day) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return Ok(day);
    }
    DateTime::parse_from_rfc3339(value)
        .map(|timestamp| timestamp.with_timezone(&Utc).date_naive())
        .map_err(|_| InvalidRange::Unparseable {
            field,
            value: value.to_string(),
        })
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, InvalidRange> {
        validate(start, end)?;
        Ok(Self { start, end })
    }

    pub fn parse(start: &str, end: &str) -> Result<Self, InvalidRange> {
        Self::new(parse_day("startDate", start)?, parse_day("endDate", end)?)
    }

    /// Range covering every UTC day touched by `[start, end)`. An end with a
    /// time of day rounds up to the next day, so a stored record from 10:00
    /// to 20:00 still occupies its day.
    pub fn from_datetimes(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self, InvalidRange> {
        let first = start.date_naive();
        if start >= end {
            return Err(InvalidRange::NotIncreasing {
                start: first,
                end: end.date_naive(),
            });
        }
        let last = match end.time() {
            time if time == NaiveTime::MIN => end.date_naive(),
            _ => end
                .date_naive()
                .checked_add_days(Days::new(1))
                .ok_or(InvalidRange::NotIncreasing { start: first, end: end.date_naive() })?,
        };
        Self::new(first, last)
    }

    pub fn from_bson(start: bson::DateTime, end: bson::DateTime) -> Result<Self, InvalidRange> {
        Self::from_datetimes(start.to_chrono(), end.to_chrono())
    }

    /// A single night starting on `day`.
    pub fn single_day(day: NaiveDate) -> Result<Self, InvalidRange> {
        let end = day
            .checked_add_days(Days::new(1))
            .ok_or(InvalidRange::NotIncreasing { start: day, end: day })?;
        Self::new(day, end)
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    pub fn overlaps(&self, other: &DateRange) -> bool {
        overlaps(self, other)
    }

    pub fn nights(&self) -> i64 {
        (self.end - self.start).num_days()
    }

    pub fn days(&self) -> impl Iterator<Item = NaiveDate> {
        days_between(self.start, self.end)
    }

    /// The part of `self` that falls inside `window`, if any.
    pub fn intersect(&self, window: &DateRange) -> Option<DateRange> {
        let start = self.start.max(window.start);
        let end = self.end.min(window.end);
        DateRange::new(start, end).ok()
    }

    pub fn start_bson(&self) -> bson::DateTime {
        midnight(self.start)
    }

    pub fn end_bson(&self) -> bson::DateTime {
        midnight(self.end)
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}

fn midnight(day: NaiveDate) -> bson::DateTime {
    bson::DateTime::from_chrono(day.and_time(NaiveTime::MIN).and_utc())
}
