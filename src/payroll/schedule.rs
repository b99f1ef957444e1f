use chrono::{Days, NaiveDate, NaiveDateTime, NaiveTime};
use serde::Serialize;
use utoipa::ToSchema;

use crate::model::attendance::AttendanceRecord;
use crate::payroll::month::Month;

/// Salaries are paid on this day of every month.
pub const PAY_DAY: u32 = 25;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct MonthOption {
    #[schema(example = "2024-03")]
    pub value: String,
    #[schema(example = "March 2024")]
    pub label: String,
}

impl From<Month> for MonthOption {
    fn from(month: Month) -> Self {
        Self {
            value: month.to_string(),
            label: month.label(),
        }
    }
}

/// The first day the employee shows up in the attendance log.
pub fn employment_start(records: &[AttendanceRecord]) -> Option<NaiveDate> {
    records.iter().map(|r| r.date).min()
}

/// Where absence counting starts: the hire date, or failing that the first
/// recorded day.
pub fn resolve_start(hire_date: Option<NaiveDate>, first_record: Option<NaiveDate>) -> Option<NaiveDate> {
    hire_date.or(first_record)
}

/// Months that can be picked on a salary page, most recent first.
///
/// Runs from the month of `start` through the month of `today`. Without a
/// start date, or with one in the future, only the current month is offered.
pub fn month_options(start: Option<NaiveDate>, today: NaiveDate) -> Vec<MonthOption> {
    let current = Month::of(today);

    let mut months = Vec::new();
    if let Some(start) = start {
        let mut cursor = Month::of(start);
        while cursor <= current {
            months.push(MonthOption::from(cursor));
            match cursor.succ() {
                Some(next) => cursor = next,
                None => break,
            }
        }
    }

    if months.is_empty() {
        months.push(MonthOption::from(current));
    }

    months.reverse();
    months
}

/// Next salary date. Pay day starts at midnight on the 25th; from then on the
/// next one is a month away.
pub fn next_pay_date(now: NaiveDateTime) -> NaiveDate {
    let this_month = Month::of(now.date());
    let pay_day = pay_day_of(this_month);

    if now > pay_day.and_time(NaiveTime::MIN) {
        this_month.succ().map(pay_day_of).unwrap_or(pay_day)
    } else {
        pay_day
    }
}

fn pay_day_of(month: Month) -> NaiveDate {
    month.first_day() + Days::new(u64::from(PAY_DAY - 1))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn on(day: NaiveDate) -> AttendanceRecord {
        AttendanceRecord {
            id: 0,
            employee_id: 1,
            date: day,
            check_in: None,
            check_out: None,
        }
    }

    #[test]
    fn employment_start_is_the_earliest_record() {
        let records = [on(date(2024, 3, 5)), on(date(2023, 11, 20)), on(date(2024, 1, 2))];
        assert_eq!(employment_start(&records), Some(date(2023, 11, 20)));
        assert_eq!(employment_start(&[]), None);
    }

    #[test]
    fn month_options_run_from_start_to_today_newest_first() {
        let options = month_options(Some(date(2023, 11, 20)), date(2024, 2, 3));

        let values: Vec<_> = options.iter().map(|o| o.value.as_str()).collect();
        assert_eq!(values, ["2024-02", "2024-01", "2023-12", "2023-11"]);
        assert_eq!(options[0].label, "February 2024");
    }

    #[test]
    fn month_options_without_start_offer_the_current_month() {
        let options = month_options(None, date(2024, 2, 3));
        assert_eq!(
            options,
            vec![MonthOption {
                value: "2024-02".into(),
                label: "February 2024".into(),
            }]
        );
    }

    #[test]
    fn month_options_with_future_start_offer_the_current_month() {
        let options = month_options(Some(date(2024, 6, 1)), date(2024, 2, 3));
        assert_eq!(options.len(), 1);
        assert_eq!(options[0].value, "2024-02");
    }

    #[test]
    fn resolved_start_prefers_the_hire_date() {
        assert_eq!(resolve_start(Some(date(2024, 3, 1)), Some(date(2024, 2, 27))), Some(date(2024, 3, 1)));
        assert_eq!(resolve_start(None, Some(date(2024, 2, 27))), Some(date(2024, 2, 27)));
        assert_eq!(resolve_start(None, None), None);
    }

    fn at(day: NaiveDate, h: u32, m: u32, s: u32) -> NaiveDateTime {
        day.and_hms_opt(h, m, s).unwrap()
    }

    #[test]
    fn pay_date_is_this_months_25th_until_it_starts() {
        assert_eq!(next_pay_date(at(date(2024, 5, 2), 12, 0, 0)), date(2024, 5, 25));
        assert_eq!(next_pay_date(at(date(2024, 5, 24), 23, 59, 59)), date(2024, 5, 25));
        assert_eq!(next_pay_date(at(date(2024, 5, 25), 0, 0, 0)), date(2024, 5, 25));
    }

    #[test]
    fn pay_date_rolls_over_once_pay_day_has_begun() {
        assert_eq!(next_pay_date(at(date(2024, 5, 25), 0, 0, 1)), date(2024, 6, 25));
        assert_eq!(next_pay_date(at(date(2024, 5, 25), 9, 30, 0)), date(2024, 6, 25));
        assert_eq!(next_pay_date(at(date(2024, 5, 26), 8, 0, 0)), date(2024, 6, 25));
        assert_eq!(next_pay_date(at(date(2024, 12, 31), 8, 0, 0)), date(2025, 1, 25));
    }
}
