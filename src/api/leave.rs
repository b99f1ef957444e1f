use crate::api::notification::notify_employee;
use crate::auth::auth::AuthUser;
use crate::error::{ApiError, ER_NO_REFERENCED_ROW, mysql_error_number};
use crate::model::leave::{LeaveRequest, LeaveRow, LeaveStatus, NewLeave};
use crate::model::notification::NotificationKind;
use actix_web::{HttpResponse, web};
use serde::{Deserialize, Serialize};
use sqlx::MySqlPool;
use tracing::debug;
use utoipa::{IntoParams, ToSchema};

const LEAVE_COLUMNS: &str = "id, employee_id, leave_type, start_date, end_date, reason, status, created_at";

#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct LeaveFilter {
    /// Filter by employee ID
    #[schema(example = 1000)]
    pub employee_id: Option<u64>,
    /// Filter by status: Pending, Approved or Rejected
    #[schema(example = "Pending")]
    pub status: Option<String>,
    /// Pagination page number (start with 1)
    #[schema(example = 1)]
    pub page: Option<u32>,
    #[schema(example = 20)]
    pub per_page: Option<u32>,
}

#[derive(Serialize, ToSchema)]
pub struct LeaveListResponse {
    pub data: Vec<LeaveRequest>,
    #[schema(example = 1)]
    pub page: u32,
    #[schema(example = 20)]
    pub per_page: u32,
    #[schema(example = 1)]
    pub total: i64,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct LeaveDecision {
    #[schema(example = "Approved")]
    pub status: LeaveStatus,
}

// Typed bindings for the dynamic WHERE clause
#[derive(Debug, PartialEq)]
enum FilterValue<'a> {
    U64(u64),
    Str(&'a str),
}

fn filter_clause(filter: &LeaveFilter) -> Result<(String, Vec<FilterValue<'static>>), ApiError> {
    let mut conditions = Vec::new();
    let mut values = Vec::new();

    if let Some(employee_id) = filter.employee_id {
        conditions.push("employee_id = ?");
        values.push(FilterValue::U64(employee_id));
    }

    if let Some(status) = filter.status.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        let status: LeaveStatus = status.parse()?;
        conditions.push("status = ?");
        values.push(FilterValue::Str(status.as_str()));
    }

    let clause = if conditions.is_empty() {
        String::new()
    } else {
        format!("WHERE {}", conditions.join(" AND "))
    };
    Ok((clause, values))
}

fn into_requests(rows: Vec<LeaveRow>) -> Result<Vec<LeaveRequest>, ApiError> {
    rows.into_iter()
        .map(|row| LeaveRequest::try_from(row).map_err(|e| ApiError::Internal(e.into())))
        .collect()
}

async fn fetch_leave(pool: &MySqlPool, leave_id: u64) -> Result<Option<LeaveRequest>, ApiError> {
    let row = sqlx::query_as::<_, LeaveRow>(&format!(
        "SELECT {} FROM leave_requests WHERE id = ?",
        LEAVE_COLUMNS
    ))
    .bind(leave_id)
    .fetch_optional(pool)
    .await?;

    row.map(|row| LeaveRequest::try_from(row).map_err(|e| ApiError::Internal(e.into())))
        .transpose()
}

async fn require_leave(pool: &MySqlPool, leave_id: u64) -> Result<LeaveRequest, ApiError> {
    fetch_leave(pool, leave_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Leave request not found".into()))
}

/// Feed text sent to the employee once HR decides.
fn decision_text(leave: &LeaveRequest, status: LeaveStatus) -> String {
    format!(
        "Your {} from {} to {} was {}",
        leave.leave_type.as_str(),
        leave.start_date,
        leave.end_date,
        status.as_str().to_lowercase()
    )
}

async fn decide(pool: &MySqlPool, leave_id: u64, decision: LeaveStatus) -> Result<LeaveRequest, ApiError> {
    let leave = require_leave(pool, leave_id).await?;
    let status = leave.status.decide(decision)?;

    let result = sqlx::query("UPDATE leave_requests SET status = ? WHERE id = ? AND status = 'Pending'")
        .bind(status.as_str())
        .bind(leave_id)
        .execute(pool)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, leave_id, "Leave decision failed");
            ApiError::from(e)
        })?;

    // Someone else decided between our read and the update
    if result.rows_affected() == 0 {
        return Err(ApiError::Conflict("Leave request was already processed".into()));
    }

    tracing::info!(leave_id, employee_id = leave.employee_id, %status, "Leave decided");

    let text = decision_text(&leave, status);
    notify_employee(
        pool,
        leave.employee_id,
        NotificationKind::Leave,
        &status.as_str().to_lowercase(),
        Some(&text),
    )
    .await;

    Ok(LeaveRequest { status, ..leave })
}

#[utoipa::path(
    post,
    path = "/api/leave",
    request_body = NewLeave,
    responses(
        (status = 201, description = "Leave request submitted", body = LeaveRequest),
        (status = 400, description = "Invalid dates or leave type", body = Object, example = json!({
            "error": "start_date cannot be after end_date"
        })),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "No employee profile")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn submit_leave(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    body: web::Json<NewLeave>,
) -> Result<HttpResponse, ApiError> {
    let employee_id = auth.require_employee()?;
    body.validate()?;

    let done = sqlx::query(
        r#"
        INSERT INTO leave_requests (employee_id, leave_type, start_date, end_date, reason, status)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(employee_id)
    .bind(body.leave_type.as_str())
    .bind(body.start_date)
    .bind(body.end_date)
    .bind(body.reason.trim())
    .bind(LeaveStatus::Pending.as_str())
    .execute(pool.get_ref())
    .await
    .map_err(|e| match mysql_error_number(&e) {
        Some(ER_NO_REFERENCED_ROW) => ApiError::NotFound("Employee not found".into()),
        _ => {
            tracing::error!(error = %e, employee_id, "Failed to create leave request");
            ApiError::from(e)
        }
    })?;

    tracing::info!(employee_id, leave_id = done.last_insert_id(), "Leave requested");

    let leave = require_leave(pool.get_ref(), done.last_insert_id()).await?;
    Ok(HttpResponse::Created().json(leave))
}

#[utoipa::path(
    get,
    path = "/api/leave",
    params(LeaveFilter),
    responses(
        (status = 200, description = "Paginated leave list, newest first", body = LeaveListResponse),
        (status = 400, description = "Unknown status filter"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn list_leave(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<LeaveFilter>,
) -> Result<HttpResponse, ApiError> {
    auth.require_hr_or_admin()?;

    let page = query.page.unwrap_or(1).max(1);
    let per_page = query.per_page.unwrap_or(20).clamp(1, 100);
    let offset = (page - 1) * per_page;

    let (where_clause, values) = filter_clause(&query)?;

    let count_sql = format!("SELECT COUNT(*) FROM leave_requests {}", where_clause);
    let mut count_query = sqlx::query_scalar::<_, i64>(&count_sql);
    for value in &values {
        count_query = match value {
            FilterValue::U64(v) => count_query.bind(*v),
            FilterValue::Str(v) => count_query.bind(*v),
        };
    }
    let total = count_query.fetch_one(pool.get_ref()).await?;

    let data_sql = format!(
        "SELECT {} FROM leave_requests {} ORDER BY created_at DESC, id DESC LIMIT ? OFFSET ?",
        LEAVE_COLUMNS, where_clause
    );
    debug!(sql = %data_sql, ?values, page, per_page, "Fetching leave requests");

    let mut data_query = sqlx::query_as::<_, LeaveRow>(&data_sql);
    for value in &values {
        data_query = match value {
            FilterValue::U64(v) => data_query.bind(*v),
            FilterValue::Str(v) => data_query.bind(*v),
        };
    }
    let rows = data_query
        .bind(per_page as i64)
        .bind(offset as i64)
        .fetch_all(pool.get_ref())
        .await?;

    Ok(HttpResponse::Ok().json(LeaveListResponse {
        data: into_requests(rows)?,
        page,
        per_page,
        total,
    }))
}

#[utoipa::path(
    get,
    path = "/api/leave/pending",
    responses(
        (status = 200, description = "Requests awaiting a decision, oldest first", body = [LeaveRequest]),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn pending_leave(auth: AuthUser, pool: web::Data<MySqlPool>) -> Result<HttpResponse, ApiError> {
    auth.require_hr_or_admin()?;

    let rows = sqlx::query_as::<_, LeaveRow>(&format!(
        "SELECT {} FROM leave_requests WHERE status = ? ORDER BY created_at, id",
        LEAVE_COLUMNS
    ))
    .bind(LeaveStatus::Pending.as_str())
    .fetch_all(pool.get_ref())
    .await?;

    Ok(HttpResponse::Ok().json(into_requests(rows)?))
}

#[utoipa::path(
    get,
    path = "/api/leave/employee/{employee_id}",
    params(
        ("employee_id" = u64, Path, description = "Employee ID")
    ),
    responses(
        (status = 200, description = "The employee's leave requests, newest first", body = [LeaveRequest]),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn employee_leave(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> Result<HttpResponse, ApiError> {
    let employee_id = path.into_inner();
    auth.require_self_or_hr(employee_id)?;

    let rows = sqlx::query_as::<_, LeaveRow>(&format!(
        "SELECT {} FROM leave_requests WHERE employee_id = ? ORDER BY created_at DESC, id DESC",
        LEAVE_COLUMNS
    ))
    .bind(employee_id)
    .fetch_all(pool.get_ref())
    .await?;

    Ok(HttpResponse::Ok().json(into_requests(rows)?))
}

#[utoipa::path(
    get,
    path = "/api/leave/{leave_id}",
    params(
        ("leave_id" = u64, Path, description = "Leave request ID")
    ),
    responses(
        (status = 200, description = "Leave request found", body = LeaveRequest),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Leave request not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn get_leave(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> Result<HttpResponse, ApiError> {
    let leave = require_leave(pool.get_ref(), path.into_inner()).await?;
    auth.require_self_or_hr(leave.employee_id)?;

    Ok(HttpResponse::Ok().json(leave))
}

#[utoipa::path(
    patch,
    path = "/api/leave/{leave_id}",
    params(
        ("leave_id" = u64, Path, description = "Leave request ID")
    ),
    request_body = LeaveDecision,
    responses(
        (status = 200, description = "Leave request decided", body = LeaveRequest),
        (status = 400, description = "Pending is not a decision"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Leave request not found"),
        (status = 409, description = "Leave request already decided", body = Object, example = json!({
            "error": "leave request is already Approved"
        }))
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn update_leave(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    body: web::Json<LeaveDecision>,
) -> Result<HttpResponse, ApiError> {
    auth.require_hr_or_admin()?;

    let leave = decide(pool.get_ref(), path.into_inner(), body.status).await?;
    Ok(HttpResponse::Ok().json(leave))
}

#[utoipa::path(
    put,
    path = "/api/leave/{leave_id}/approve",
    params(
        ("leave_id" = u64, Path, description = "Leave request ID")
    ),
    responses(
        (status = 200, description = "Leave approved", body = LeaveRequest),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Leave request not found"),
        (status = 409, description = "Leave request already decided")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn approve_leave(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> Result<HttpResponse, ApiError> {
    auth.require_hr_or_admin()?;

    let leave = decide(pool.get_ref(), path.into_inner(), LeaveStatus::Approved).await?;
    Ok(HttpResponse::Ok().json(leave))
}

#[utoipa::path(
    put,
    path = "/api/leave/{leave_id}/reject",
    params(
        ("leave_id" = u64, Path, description = "Leave request ID")
    ),
    responses(
        (status = 200, description = "Leave rejected", body = LeaveRequest),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Leave request not found"),
        (status = 409, description = "Leave request already decided")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn reject_leave(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> Result<HttpResponse, ApiError> {
    auth.require_hr_or_admin()?;

    let leave = decide(pool.get_ref(), path.into_inner(), LeaveStatus::Rejected).await?;
    Ok(HttpResponse::Ok().json(leave))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::leave::LeaveType;
    use chrono::NaiveDate;

    fn filter(employee_id: Option<u64>, status: Option<&str>) -> LeaveFilter {
        LeaveFilter {
            employee_id,
            status: status.map(String::from),
            page: None,
            per_page: None,
        }
    }

    #[test]
    fn no_filter_means_no_where_clause() {
        let (clause, values) = filter_clause(&filter(None, None)).unwrap();
        assert_eq!(clause, "");
        assert!(values.is_empty());

        let (clause, _) = filter_clause(&filter(None, Some("  "))).unwrap();
        assert_eq!(clause, "");
    }

    #[test]
    fn filters_bind_in_clause_order() {
        let (clause, values) = filter_clause(&filter(Some(7), Some("Approved"))).unwrap();
        assert_eq!(clause, "WHERE employee_id = ? AND status = ?");
        assert_eq!(values, vec![FilterValue::U64(7), FilterValue::Str("Approved")]);
    }

    #[test]
    fn unknown_status_filter_is_a_bad_request() {
        let err = filter_clause(&filter(None, Some("approved"))).unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(_)));
    }

    #[test]
    fn decision_text_names_the_leave() {
        let leave = LeaveRequest {
            id: 1,
            employee_id: 7,
            leave_type: LeaveType::Sick,
            start_date: NaiveDate::from_ymd_opt(2024, 5, 2).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2024, 5, 3).unwrap(),
            reason: "Flu".into(),
            status: LeaveStatus::Pending,
            created_at: None,
        };

        assert_eq!(
            decision_text(&leave, LeaveStatus::Rejected),
            "Your Sick Leave from 2024-05-02 to 2024-05-03 was rejected"
        );
    }

    #[test]
    fn decisions_are_read_from_json() {
        let body: LeaveDecision = serde_json::from_str(r#"{"status":"Approved"}"#).unwrap();
        assert_eq!(body.status, LeaveStatus::Approved);
        assert!(serde_json::from_str::<LeaveDecision>(r#"{"status":"maybe"}"#).is_err());
    }
}
