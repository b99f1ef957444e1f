use chrono::NaiveDate;
use moka::future::Cache;
use once_cell::sync::Lazy;
use std::time::Duration;

use crate::payroll::month::Month;
use crate::payroll::stats::AttendanceStats;

/// Stats of closed months, keyed by (employee id, month, employment start).
/// A closed month's records and absences no longer change with the date, and a
/// corrected hire date lands on a different key.
type StatsKey = (u64, Month, Option<NaiveDate>);

static STATS_CACHE: Lazy<Cache<StatsKey, AttendanceStats>> = Lazy::new(|| {
    Cache::builder()
        .max_capacity(100_000)
        .time_to_live(Duration::from_secs(86400)) // 24h TTL
        .build()
});

/// True when `month` ended before `today`.
pub fn is_closed(month: Month, today: NaiveDate) -> bool {
    month < Month::of(today)
}

/// Cached stats for a closed month, if any
pub async fn get(employee_id: u64, month: Month, start: Option<NaiveDate>) -> Option<AttendanceStats> {
    STATS_CACHE.get(&(employee_id, month, start)).await
}

/// Remember stats, but only for months that can no longer change
pub async fn store(
    employee_id: u64,
    month: Month,
    start: Option<NaiveDate>,
    today: NaiveDate,
    stats: AttendanceStats,
) {
    if !is_closed(month, today) {
        return;
    }

    STATS_CACHE.insert((employee_id, month, start), stats).await;
    log::debug!("Cached stats for employee {} in {}", employee_id, month);
}
