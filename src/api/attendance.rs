use crate::api::employee::count_employees;
use crate::api::notification::notify_user;
use crate::auth::auth::AuthUser;
use crate::error::{ApiError, ER_DUP_ENTRY, ER_NO_REFERENCED_ROW, mysql_error_number};
use crate::model::attendance::AttendanceRecord;
use crate::model::notification::NotificationKind;
use crate::payroll::clock::Clock;
use crate::payroll::month::Month;
use crate::payroll::stats::STANDARD_CHECKIN;
use crate::payroll::summary::{DailyOverview, daily_overview};
use crate::utils::calendar::{CalendarEvent, calendar_events};
use actix_web::{HttpResponse, web};
use chrono::{NaiveDate, Timelike};
use serde::{Deserialize, Serialize};
use sqlx::MySqlPool;
use utoipa::{IntoParams, ToSchema};

const RECORD_COLUMNS: &str = "id, employee_id, date, check_in, check_out";

pub(crate) async fn fetch_employee_records(
    pool: &MySqlPool,
    employee_id: u64,
) -> Result<Vec<AttendanceRecord>, sqlx::Error> {
    sqlx::query_as::<_, AttendanceRecord>(&format!(
        "SELECT {} FROM attendance WHERE employee_id = ? ORDER BY date",
        RECORD_COLUMNS
    ))
    .bind(employee_id)
    .fetch_all(pool)
    .await
}

pub(crate) async fn fetch_records_between(
    pool: &MySqlPool,
    from: NaiveDate,
    to: NaiveDate,
) -> Result<Vec<AttendanceRecord>, sqlx::Error> {
    sqlx::query_as::<_, AttendanceRecord>(&format!(
        "SELECT {} FROM attendance WHERE date BETWEEN ? AND ? ORDER BY employee_id, date",
        RECORD_COLUMNS
    ))
    .bind(from)
    .bind(to)
    .fetch_all(pool)
    .await
}

pub(crate) async fn fetch_all_records(pool: &MySqlPool) -> Result<Vec<AttendanceRecord>, sqlx::Error> {
    sqlx::query_as::<_, AttendanceRecord>(&format!(
        "SELECT {} FROM attendance ORDER BY employee_id, date",
        RECORD_COLUMNS
    ))
    .fetch_all(pool)
    .await
}

/// The first day an employee shows up in the attendance log.
pub(crate) async fn fetch_first_record_date(
    pool: &MySqlPool,
    employee_id: u64,
) -> Result<Option<NaiveDate>, sqlx::Error> {
    sqlx::query_scalar::<_, Option<NaiveDate>>("SELECT MIN(date) FROM attendance WHERE employee_id = ?")
        .bind(employee_id)
        .fetch_one(pool)
        .await
}

async fn fetch_record_for_day(
    pool: &MySqlPool,
    employee_id: u64,
    date: NaiveDate,
) -> Result<Option<AttendanceRecord>, sqlx::Error> {
    sqlx::query_as::<_, AttendanceRecord>(&format!(
        "SELECT {} FROM attendance WHERE employee_id = ? AND date = ?",
        RECORD_COLUMNS
    ))
    .bind(employee_id)
    .bind(date)
    .fetch_optional(pool)
    .await
}

/// Check-in endpoint
#[utoipa::path(
    post,
    path = "/api/attendance",
    responses(
        (status = 200, description = "Checked in successfully", body = AttendanceRecord),
        (status = 400, description = "Already checked in today", body = Object, example = json!({
            "error": "Already checked in today"
        })),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "No employee profile"),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn check_in(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    clock: web::Data<dyn Clock>,
) -> Result<HttpResponse, ApiError> {
    let employee_id = auth.require_employee()?;

    let now = clock.now();
    let now = now.with_nanosecond(0).unwrap_or(now);

    let result = sqlx::query("INSERT INTO attendance (employee_id, date, check_in) VALUES (?, ?, ?)")
        .bind(employee_id)
        .bind(now.date())
        .bind(now.time())
        .execute(pool.get_ref())
        .await;

    match result {
        Ok(done) => {
            tracing::info!(employee_id, date = %now.date(), "Checked in");
            notify_user(pool.get_ref(), auth.user_id, NotificationKind::Attendance, "check_in", None).await;
            Ok(HttpResponse::Ok().json(AttendanceRecord {
                id: done.last_insert_id(),
                employee_id,
                date: now.date(),
                check_in: Some(now.time()),
                check_out: None,
            }))
        }
        Err(e) => match mysql_error_number(&e) {
            // Duplicate check-in for same day
            Some(ER_DUP_ENTRY) => Err(ApiError::BadRequest("Already checked in today".into())),
            // Token points at an employee row that no longer exists
            Some(ER_NO_REFERENCED_ROW) => Err(ApiError::NotFound("Employee not found".into())),
            _ => {
                tracing::error!(error = %e, employee_id, "Check-in failed");
                Err(e.into())
            }
        },
    }
}

/// Check-out endpoint
#[utoipa::path(
    put,
    path = "/api/attendance",
    responses(
        (status = 200, description = "Checked out successfully", body = AttendanceRecord),
        (status = 400, description = "No active check-in found for today", body = Object, example = json!({
            "error": "No active check-in found for today"
        })),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "No employee profile"),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn check_out(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    clock: web::Data<dyn Clock>,
) -> Result<HttpResponse, ApiError> {
    let employee_id = auth.require_employee()?;

    let now = clock.now();
    let now = now.with_nanosecond(0).unwrap_or(now);

    let result = sqlx::query(
        r#"
        UPDATE attendance
        SET check_out = ?
        WHERE employee_id = ?
        AND date = ?
        AND check_in IS NOT NULL
        AND check_out IS NULL
        "#,
    )
    .bind(now.time())
    .bind(employee_id)
    .bind(now.date())
    .execute(pool.get_ref())
    .await
    .map_err(|e| {
        tracing::error!(error = %e, employee_id, "Check-out failed");
        ApiError::from(e)
    })?;

    if result.rows_affected() == 0 {
        return Err(ApiError::BadRequest("No active check-in found for today".into()));
    }

    tracing::info!(employee_id, date = %now.date(), "Checked out");
    notify_user(pool.get_ref(), auth.user_id, NotificationKind::Attendance, "check_out", None).await;

    let record = fetch_record_for_day(pool.get_ref(), employee_id, now.date())
        .await?
        .ok_or_else(|| ApiError::NotFound("Attendance record not found".into()))?;

    Ok(HttpResponse::Ok().json(record))
}

#[utoipa::path(
    get,
    path = "/api/attendance/me",
    responses(
        (status = 200, description = "Own attendance records, oldest first", body = [AttendanceRecord]),
        (status = 403, description = "No employee profile")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn my_attendance(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
) -> Result<HttpResponse, ApiError> {
    let employee_id = auth.require_employee()?;
    let records = fetch_employee_records(pool.get_ref(), employee_id).await?;
    Ok(HttpResponse::Ok().json(records))
}

#[utoipa::path(
    get,
    path = "/api/attendance/employee/{employee_id}",
    params(
        ("employee_id" = u64, Path, description = "Employee ID")
    ),
    responses(
        (status = 200, description = "Attendance records, oldest first", body = [AttendanceRecord]),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn employee_attendance(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> Result<HttpResponse, ApiError> {
    let employee_id = path.into_inner();
    auth.require_self_or_hr(employee_id)?;

    let records = fetch_employee_records(pool.get_ref(), employee_id).await?;
    Ok(HttpResponse::Ok().json(records))
}

#[utoipa::path(
    get,
    path = "/api/attendance/employee/{employee_id}/calendar",
    params(
        ("employee_id" = u64, Path, description = "Employee ID")
    ),
    responses(
        (status = 200, description = "Check-in and check-out events", body = [CalendarEvent]),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn employee_calendar(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> Result<HttpResponse, ApiError> {
    let employee_id = path.into_inner();
    auth.require_self_or_hr(employee_id)?;

    let records = fetch_employee_records(pool.get_ref(), employee_id).await?;
    Ok(HttpResponse::Ok().json(calendar_events(&records)))
}

#[utoipa::path(
    get,
    path = "/api/attendance/month/{month}",
    params(
        ("month" = String, Path, description = "Month as YYYY-MM", example = "2024-05")
    ),
    responses(
        (status = 200, description = "Every employee's records for the month", body = [AttendanceRecord]),
        (status = 400, description = "Malformed month"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn monthly_attendance(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    auth.require_hr_or_admin()?;

    let month: Month = path.parse()?;
    let records = fetch_records_between(pool.get_ref(), month.first_day(), month.last_day()).await?;
    Ok(HttpResponse::Ok().json(records))
}

#[derive(Deserialize, IntoParams)]
pub struct DayQuery {
    /// Day as YYYY-MM-DD, defaults to today
    pub date: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct DayAttendanceResponse {
    #[serde(flatten)]
    pub overview: DailyOverview,
    pub records: Vec<AttendanceRecord>,
}

#[utoipa::path(
    get,
    path = "/api/attendance/day",
    params(DayQuery),
    responses(
        (status = 200, description = "Headcount and records for the day", body = DayAttendanceResponse),
        (status = 400, description = "Malformed date"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn daily_attendance(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    clock: web::Data<dyn Clock>,
    query: web::Query<DayQuery>,
) -> Result<HttpResponse, ApiError> {
    auth.require_hr_or_admin()?;

    let date = match query.date.as_deref() {
        Some(raw) => NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
            .map_err(|_| ApiError::BadRequest(format!("date must be formatted as YYYY-MM-DD, got `{}`", raw)))?,
        None => clock.today(),
    };

    let total_staff = count_employees(pool.get_ref()).await?;
    let records = fetch_records_between(pool.get_ref(), date, date).await?;

    let overview = daily_overview(
        date,
        usize::try_from(total_staff).unwrap_or(0),
        &records,
        STANDARD_CHECKIN,
    );

    Ok(HttpResponse::Ok().json(DayAttendanceResponse { overview, records }))
}
