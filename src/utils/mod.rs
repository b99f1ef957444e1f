pub mod calendar;
pub mod stats_cache;
