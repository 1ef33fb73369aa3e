//! Read-side analysis over stored artifacts.

pub mod timeline;

pub use timeline::{daily_counts, find_gaps, group_by_day, TimelineGap};
