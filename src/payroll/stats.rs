use std::collections::HashSet;

use chrono::{NaiveDate, NaiveTime};
use serde::Serialize;
use utoipa::ToSchema;

use crate::model::attendance::AttendanceRecord;
use crate::payroll::clock::Clock;
use crate::payroll::month::Month;

pub const DAILY_RATE: f64 = 435.0;
pub const LATE_PENALTY_PER_HOUR: f64 = 54.0;
pub const STANDARD_CHECKIN: NaiveTime = match NaiveTime::from_hms_opt(8, 0, 0) {
    Some(time) => time,
    None => panic!("invalid standard check-in time"),
};

/// Rates and cut-off used to turn attendance into pay.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PayrollPolicy {
    pub daily_rate: f64,
    pub late_penalty_per_hour: f64,
    pub standard_check_in: NaiveTime,
}

impl Default for PayrollPolicy {
    fn default() -> Self {
        Self {
            daily_rate: DAILY_RATE,
            late_penalty_per_hour: LATE_PENALTY_PER_HOUR,
            standard_check_in: STANDARD_CHECKIN,
        }
    }
}

/// Monthly attendance and salary figures for one employee.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
#[schema(example = json!({
    "present": 1,
    "absent": 0,
    "lateHours": 1,
    "hoursWorked": 7,
    "grossSalary": 435.0,
    "netSalary": 381.0,
    "lateDeduction": 54.0
}))]
pub struct AttendanceStats {
    pub present: u32,
    pub absent: u32,
    pub late_hours: u32,
    pub hours_worked: u32,
    pub gross_salary: f64,
    pub net_salary: f64,
    pub late_deduction: f64,
}

/// Aggregates `records` for `month` with the standard pay rates.
///
/// Only records dated inside `month` are looked at. Days after `clock.today()`
/// and days before `employment_start` are never counted as absent.
pub fn compute_stats(
    records: &[AttendanceRecord],
    month: Month,
    employment_start: Option<NaiveDate>,
    clock: &dyn Clock,
) -> AttendanceStats {
    compute_stats_with(&PayrollPolicy::default(), records, month, employment_start, clock)
}

pub fn compute_stats_with(
    policy: &PayrollPolicy,
    records: &[AttendanceRecord],
    month: Month,
    employment_start: Option<NaiveDate>,
    clock: &dyn Clock,
) -> AttendanceStats {
    if records.is_empty() {
        return AttendanceStats::default();
    }

    let month_records: Vec<&AttendanceRecord> =
        records.iter().filter(|r| month.contains(r.date)).collect();

    let present = month_records.iter().filter(|r| r.check_in.is_some()).count() as u32;

    let today = clock.today();
    let recorded_days: HashSet<NaiveDate> = month_records.iter().map(|r| r.date).collect();
    let absent = month
        .days()
        .filter(|day| *day <= today)
        .filter(|day| employment_start.is_none_or(|start| *day >= start))
        .filter(|day| !recorded_days.contains(day))
        .count() as u32;

    let late_hours = month_records
        .iter()
        .filter_map(|r| r.check_in)
        .map(|check_in| whole_hours(policy.standard_check_in, check_in))
        .sum::<u32>();

    let hours_worked = month_records
        .iter()
        .filter_map(|r| r.shift())
        .map(|(check_in, check_out)| whole_hours(check_in, check_out))
        .sum::<u32>();

    let gross_salary = f64::from(present) * policy.daily_rate;
    let late_deduction = f64::from(late_hours) * policy.late_penalty_per_hour;
    let net_salary = (gross_salary - late_deduction).max(0.0);

    AttendanceStats {
        present,
        absent,
        late_hours,
        hours_worked,
        gross_salary: round2(gross_salary),
        net_salary: round2(net_salary),
        late_deduction: round2(late_deduction),
    }
}

/// Whole hours from `from` to `to`, truncated. Zero when `to` is not after `from`.
fn whole_hours(from: NaiveTime, to: NaiveTime) -> u32 {
    let hours = to.signed_duration_since(from).num_hours();
    u32::try_from(hours).unwrap_or(0)
}

pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
