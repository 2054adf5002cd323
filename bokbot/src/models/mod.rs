//! Domain records produced by the extractors.

mod timeslot;

pub use timeslot::{Status, Time, TimeRange, TimeSlot, Week};
