pub mod engine;
pub mod interval;
pub mod lock;
pub mod memory;
pub mod mongo;
pub mod source;

pub use engine::{AvailabilityEngine, AvailabilityError};
pub use interval::{DateRange, InvalidRange};
pub use lock::AvailabilityLocks;
pub use source::{Occupancy, OccupancyScope, OccupancySource, SourceError, SourceKind};
