use std::collections::HashMap;

use chrono::{NaiveDate, NaiveTime};
use serde::Serialize;
use utoipa::ToSchema;

use crate::model::attendance::AttendanceRecord;
use crate::model::employee::Employee;
use crate::payroll::clock::Clock;
use crate::payroll::month::Month;
use crate::payroll::schedule::{employment_start, resolve_start};
use crate::payroll::stats::{AttendanceStats, compute_stats, round2};

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StaffPayrollRow {
    #[schema(example = 1)]
    pub id: u64,
    #[schema(example = "John Doe")]
    pub name: String,
    #[schema(example = "john.doe@company.com")]
    pub email: String,
    #[serde(flatten)]
    pub stats: AttendanceStats,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StaffPayroll {
    #[schema(example = "2024-05")]
    pub month: String,
    #[schema(example = 12)]
    pub total_staff: usize,
    #[schema(example = 48060.0)]
    pub total_payroll: f64,
    pub employees: Vec<StaffPayrollRow>,
}

/// One employee's figures for `month`, from their full attendance history.
///
/// Absences are counted from the hire date, or from the first recorded day
/// when no hire date is on file.
pub fn employee_month_stats(
    employee: &Employee,
    records: &[AttendanceRecord],
    month: Month,
    clock: &dyn Clock,
) -> AttendanceStats {
    let start = resolve_start(employee.hire_date, employment_start(records));
    compute_stats(records, month, start, clock)
}

/// Payroll table for every employee in `month`.
///
/// `records` is everyone's attendance history; each employee gets the same
/// figures as [`employee_month_stats`]. Employees without records get a zero row.
pub fn staff_payroll(
    employees: &[Employee],
    records: &[AttendanceRecord],
    month: Month,
    clock: &dyn Clock,
) -> StaffPayroll {
    let mut by_employee: HashMap<u64, Vec<AttendanceRecord>> = HashMap::new();
    for record in records {
        by_employee.entry(record.employee_id).or_default().push(*record);
    }

    let rows: Vec<StaffPayrollRow> = employees
        .iter()
        .map(|employee| {
            let own = by_employee
                .get(&employee.id)
                .map(Vec::as_slice)
                .unwrap_or_default();

            StaffPayrollRow {
                id: employee.id,
                name: employee.full_name(),
                email: employee.email.clone(),
                stats: employee_month_stats(employee, own, month, clock),
            }
        })
        .collect();

    let total_payroll = rows.iter().map(|row| row.stats.net_salary).sum::<f64>();

    StaffPayroll {
        month: month.to_string(),
        total_staff: employees.len(),
        total_payroll: round2(total_payroll),
        employees: rows,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DailyOverview {
    #[schema(value_type = String, format = "date", example = "2024-05-02")]
    pub date: NaiveDate,
    #[schema(example = 12)]
    pub total_staff: usize,
    #[schema(example = 10)]
    pub present: usize,
    #[schema(example = 2)]
    pub absent: usize,
    #[schema(example = 3)]
    pub late: usize,
}

/// Headcount for a single day: who showed up and who was late.
pub fn daily_overview(
    date: NaiveDate,
    total_staff: usize,
    records: &[AttendanceRecord],
    standard_check_in: NaiveTime,
) -> DailyOverview {
    let day_records: Vec<&AttendanceRecord> = records.iter().filter(|r| r.date == date).collect();

    let present = day_records.len();
    let late = day_records
        .iter()
        .filter(|r| r.check_in.is_some_and(|check_in| check_in > standard_check_in))
        .count();

    DailyOverview {
        date,
        total_staff,
        present,
        absent: total_staff.saturating_sub(present),
        late,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payroll::clock::FixedClock;
    use crate::payroll::stats::STANDARD_CHECKIN;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn time(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn employee(id: u64, first: &str, hire_date: Option<NaiveDate>) -> Employee {
        Employee {
            id,
            first_name: first.into(),
            last_name: String::new(),
            email: format!("{}@brewbreak.test", first.to_lowercase()),
            hire_date,
            status: "active".into(),
        }
    }

    fn record(employee_id: u64, day: NaiveDate, check_in: NaiveTime, check_out: NaiveTime) -> AttendanceRecord {
        AttendanceRecord {
            id: 0,
            employee_id,
            date: day,
            check_in: Some(check_in),
            check_out: Some(check_out),
        }
    }

    #[test]
    fn staff_payroll_aggregates_each_employee_separately() {
        let employees = [
            employee(1, "Ana", Some(date(2024, 5, 1))),
            employee(2, "Ben", Some(date(2024, 5, 1))),
            employee(3, "Cy", None),
        ];
        let records = [
            record(1, date(2024, 5, 2), time(9, 15), time(17, 0)),
            record(1, date(2024, 5, 3), time(8, 0), time(17, 0)),
            record(2, date(2024, 5, 2), time(8, 0), time(16, 0)),
            record(9, date(2024, 5, 2), time(8, 0), time(16, 0)),
        ];
        let clock = FixedClock::on(date(2024, 6, 1));

        let payroll = staff_payroll(&employees, &records, "2024-05".parse().unwrap(), &clock);

        assert_eq!(payroll.month, "2024-05");
        assert_eq!(payroll.total_staff, 3);

        let ana = &payroll.employees[0];
        assert_eq!(ana.name, "Ana");
        assert_eq!(ana.stats.present, 2);
        assert_eq!(ana.stats.late_hours, 1);
        assert_eq!(ana.stats.net_salary, 816.0);

        let ben = &payroll.employees[1];
        assert_eq!(ben.stats.present, 1);
        assert_eq!(ben.stats.net_salary, 435.0);

        let cy = &payroll.employees[2];
        assert_eq!(cy.stats, AttendanceStats::default());

        assert_eq!(payroll.total_payroll, 1251.0);
    }

    #[test]
    fn staff_table_matches_the_employee_page() {
        let employees = [employee(1, "Ana", None), employee(2, "Ben", Some(date(2024, 4, 1)))];
        let records = [
            record(1, date(2024, 4, 30), time(8, 0), time(16, 0)),
            record(1, date(2024, 5, 20), time(8, 0), time(16, 0)),
            record(2, date(2024, 5, 20), time(9, 0), time(16, 0)),
        ];
        let may: Month = "2024-05".parse().unwrap();
        let clock = FixedClock::on(date(2024, 6, 1));

        let payroll = staff_payroll(&employees, &records, may, &clock);

        for (row, employee) in payroll.employees.iter().zip(&employees) {
            let own: Vec<_> = records.iter().filter(|r| r.employee_id == employee.id).copied().collect();
            assert_eq!(row.stats, employee_month_stats(employee, &own, may, &clock));
        }
        // Ana has no hire date, so April 30 is her start: every unrecorded May day is absent.
        assert_eq!(payroll.employees[0].stats.absent, 30);
    }

    #[test]
    fn start_falls_back_to_the_first_record() {
        let ana = employee(1, "Ana", None);
        let records = [record(1, date(2024, 5, 20), time(8, 0), time(16, 0))];
        let clock = FixedClock::on(date(2024, 6, 1));

        let stats = employee_month_stats(&ana, &records, "2024-05".parse().unwrap(), &clock);
        let table = staff_payroll(&[ana], &records, "2024-05".parse().unwrap(), &clock);

        assert_eq!(stats.absent, 11);
        assert_eq!(table.employees[0].stats.absent, 11);
    }

    #[test]
    fn staff_payroll_row_flattens_stats() {
        let employees = [employee(1, "Ana", None)];
        let clock = FixedClock::on(date(2024, 6, 1));

        let payroll = staff_payroll(&employees, &[], "2024-05".parse().unwrap(), &clock);
        let value = serde_json::to_value(&payroll).unwrap();

        assert_eq!(value["totalStaff"], 1);
        assert_eq!(value["employees"][0]["name"], "Ana");
        assert_eq!(value["employees"][0]["netSalary"], 0.0);
    }

    #[test]
    fn daily_overview_counts_present_absent_and_late() {
        let day = date(2024, 5, 2);
        let records = [
            record(1, day, time(7, 55), time(17, 0)),
            record(2, day, time(8, 0), time(17, 0)),
            record(3, day, time(8, 1), time(17, 0)),
            record(4, date(2024, 5, 1), time(10, 0), time(17, 0)),
        ];

        let overview = daily_overview(day, 5, &records, STANDARD_CHECKIN);

        assert_eq!(
            overview,
            DailyOverview {
                date: day,
                total_staff: 5,
                present: 3,
                absent: 2,
                late: 1,
            }
        );
    }

    #[test]
    fn daily_overview_absent_never_underflows() {
        let day = date(2024, 5, 2);
        let records = [record(1, day, time(8, 0), time(17, 0)), record(2, day, time(8, 0), time(17, 0))];

        let overview = daily_overview(day, 1, &records, STANDARD_CHECKIN);

        assert_eq!(overview.present, 2);
        assert_eq!(overview.absent, 0);
    }
}
