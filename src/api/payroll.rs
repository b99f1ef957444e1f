use crate::api::attendance::{fetch_all_records, fetch_employee_records, fetch_first_record_date};
use crate::api::employee::{fetch_all_employees, fetch_employee};
use crate::auth::auth::AuthUser;
use crate::error::ApiError;
use crate::model::employee::Employee;
use crate::payroll::clock::Clock;
use crate::payroll::month::Month;
use crate::payroll::schedule::{MonthOption, month_options, next_pay_date, resolve_start};
use crate::payroll::stats::AttendanceStats;
use crate::payroll::summary::{StaffPayroll, employee_month_stats, staff_payroll};
use crate::utils::stats_cache;
use actix_web::{HttpResponse, web};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::MySqlPool;
use tracing::debug;
use utoipa::{IntoParams, ToSchema};

#[derive(Deserialize, IntoParams)]
pub struct MonthQuery {
    /// Month as YYYY-MM, defaults to the current month
    pub month: Option<String>,
}

impl MonthQuery {
    fn resolve(&self, today: NaiveDate) -> Result<Month, ApiError> {
        match self.month.as_deref() {
            Some(raw) => Ok(raw.parse()?),
            None => Ok(Month::of(today)),
        }
    }
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EmployeeStatsResponse {
    #[schema(example = 1)]
    pub employee_id: u64,
    #[schema(example = "2024-05")]
    pub month: String,
    #[serde(flatten)]
    pub stats: AttendanceStats,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PayDateResponse {
    #[schema(value_type = String, format = "date", example = "2024-05-25")]
    pub pay_date: NaiveDate,
}

/// Employment start without loading the whole attendance history.
async fn employment_start_of(pool: &MySqlPool, employee: &Employee) -> Result<Option<NaiveDate>, ApiError> {
    let first_record = match employee.hire_date {
        Some(_) => None,
        None => fetch_first_record_date(pool, employee.id).await?,
    };
    Ok(resolve_start(employee.hire_date, first_record))
}

async fn require_employee_row(pool: &MySqlPool, employee_id: u64) -> Result<Employee, ApiError> {
    fetch_employee(pool, employee_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Employee not found".into()))
}

#[utoipa::path(
    get,
    path = "/api/payroll/employee/{employee_id}/stats",
    params(
        ("employee_id" = u64, Path, description = "Employee ID"),
        MonthQuery
    ),
    responses(
        (status = 200, description = "Attendance and salary for the month", body = EmployeeStatsResponse),
        (status = 400, description = "Malformed month"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Employee not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Payroll"
)]
pub async fn employee_stats(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    clock: web::Data<dyn Clock>,
    path: web::Path<u64>,
    query: web::Query<MonthQuery>,
) -> Result<HttpResponse, ApiError> {
    let employee_id = path.into_inner();
    auth.require_self_or_hr(employee_id)?;

    let today = clock.today();
    let month = query.resolve(today)?;

    let employee = require_employee_row(pool.get_ref(), employee_id).await?;
    let start = employment_start_of(pool.get_ref(), &employee).await?;

    let stats = match stats_cache::get(employee_id, month, start).await {
        Some(stats) => {
            debug!(employee_id, %month, "Stats served from cache");
            stats
        }
        None => {
            let records = fetch_employee_records(pool.get_ref(), employee_id).await?;

            let stats = employee_month_stats(&employee, &records, month, clock.get_ref());
            stats_cache::store(employee_id, month, start, today, stats).await;
            stats
        }
    };

    Ok(HttpResponse::Ok().json(EmployeeStatsResponse {
        employee_id,
        month: month.to_string(),
        stats,
    }))
}

#[utoipa::path(
    get,
    path = "/api/payroll/employee/{employee_id}/months",
    params(
        ("employee_id" = u64, Path, description = "Employee ID")
    ),
    responses(
        (status = 200, description = "Selectable months, most recent first", body = [MonthOption]),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Employee not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Payroll"
)]
pub async fn employee_months(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    clock: web::Data<dyn Clock>,
    path: web::Path<u64>,
) -> Result<HttpResponse, ApiError> {
    let employee_id = path.into_inner();
    auth.require_self_or_hr(employee_id)?;

    let employee = require_employee_row(pool.get_ref(), employee_id).await?;
    let start = employment_start_of(pool.get_ref(), &employee).await?;

    Ok(HttpResponse::Ok().json(month_options(start, clock.today())))
}

#[utoipa::path(
    get,
    path = "/api/payroll/pay-date",
    responses(
        (status = 200, description = "Next salary date", body = PayDateResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Payroll"
)]
pub async fn pay_date(_auth: AuthUser, clock: web::Data<dyn Clock>) -> HttpResponse {
    HttpResponse::Ok().json(PayDateResponse {
        pay_date: next_pay_date(clock.now()),
    })
}

#[utoipa::path(
    get,
    path = "/api/payroll/staff",
    params(MonthQuery),
    responses(
        (status = 200, description = "Payroll for every employee", body = StaffPayroll),
        (status = 400, description = "Malformed month"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Payroll"
)]
pub async fn staff(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    clock: web::Data<dyn Clock>,
    query: web::Query<MonthQuery>,
) -> Result<HttpResponse, ApiError> {
    auth.require_hr_or_admin()?;

    let month = query.resolve(clock.today())?;

    let employees = fetch_all_employees(pool.get_ref()).await?;
    // Whole history: absences depend on when each employee started
    let records = fetch_all_records(pool.get_ref()).await?;
    debug!(%month, employees = employees.len(), records = records.len(), "Building staff payroll");

    Ok(HttpResponse::Ok().json(staff_payroll(&employees, &records, month, clock.get_ref())))
}
