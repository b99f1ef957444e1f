use crate::auth::auth::AuthUser;
use crate::error::{ApiError, ER_NO_REFERENCED_ROW, mysql_error_number};
use crate::model::notification::{NewNotification, Notification, NotificationKind, NotificationRow};
use actix_web::{HttpResponse, web};
use serde::Deserialize;
use sqlx::MySqlPool;
use utoipa::IntoParams;

const NOTIFICATION_SELECT: &str = r#"
    SELECT n.id, n.user_id, u.username, n.notification_type, n.status, n.text, n.created_at
    FROM notifications n
    JOIN users u ON u.id = n.user_id
"#;

const MAX_STATUS_LEN: usize = 50;
const MAX_TEXT_LEN: usize = 500;

#[derive(Debug, Deserialize, IntoParams)]
pub struct FeedQuery {
    /// Most recent entries to return, 50 by default
    pub limit: Option<u32>,
}

impl FeedQuery {
    fn limit(&self) -> i64 {
        self.limit.unwrap_or(50).clamp(1, 200) as i64
    }
}

async fn insert_notification(
    pool: &MySqlPool,
    user_id: u64,
    kind: NotificationKind,
    status: &str,
    text: Option<&str>,
) -> Result<u64, sqlx::Error> {
    let done = sqlx::query(
        "INSERT INTO notifications (user_id, notification_type, status, text) VALUES (?, ?, ?, ?)",
    )
    .bind(user_id)
    .bind(kind.as_str())
    .bind(status)
    .bind(text)
    .execute(pool)
    .await?;
    Ok(done.last_insert_id())
}

async fn fetch_notification(pool: &MySqlPool, id: u64) -> Result<Option<Notification>, sqlx::Error> {
    let row = sqlx::query_as::<_, NotificationRow>(&format!("{} WHERE n.id = ?", NOTIFICATION_SELECT))
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(row.map(Notification::from))
}

/// Adds an entry to a user's feed. A failed write is logged and ignored.
pub(crate) async fn notify_user(
    pool: &MySqlPool,
    user_id: u64,
    kind: NotificationKind,
    status: &str,
    text: Option<&str>,
) {
    if let Err(e) = insert_notification(pool, user_id, kind, status, text).await {
        tracing::warn!(error = %e, user_id, status, "Notification not recorded");
    }
}

/// Adds an entry to the feed of every account linked to the employee.
pub(crate) async fn notify_employee(
    pool: &MySqlPool,
    employee_id: u64,
    kind: NotificationKind,
    status: &str,
    text: Option<&str>,
) {
    let result = sqlx::query(
        r#"
        INSERT INTO notifications (user_id, notification_type, status, text)
        SELECT id, ?, ?, ? FROM users WHERE employee_id = ?
        "#,
    )
    .bind(kind.as_str())
    .bind(status)
    .bind(text)
    .bind(employee_id)
    .execute(pool)
    .await;

    if let Err(e) = result {
        tracing::warn!(error = %e, employee_id, status, "Notification not recorded");
    }
}

/// Whose feed a post lands on. Only HR and admins may post to someone else's.
fn recipient(auth: &AuthUser, body: &NewNotification) -> Result<u64, ApiError> {
    let user_id = body.user_id.unwrap_or(auth.user_id);
    auth.require_user_or_hr(user_id)?;

    let status = body.status.trim();
    if status.is_empty() {
        return Err(ApiError::BadRequest("status is required".into()));
    }
    if status.chars().count() > MAX_STATUS_LEN {
        return Err(ApiError::BadRequest(format!("status is limited to {} characters", MAX_STATUS_LEN)));
    }
    if body.text.as_deref().is_some_and(|t| t.chars().count() > MAX_TEXT_LEN) {
        return Err(ApiError::BadRequest(format!("text is limited to {} characters", MAX_TEXT_LEN)));
    }

    Ok(user_id)
}

#[utoipa::path(
    get,
    path = "/api/notification",
    params(FeedQuery),
    responses(
        (status = 200, description = "Latest notifications of every user", body = [Notification]),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Notification"
)]
pub async fn list_notifications(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<FeedQuery>,
) -> Result<HttpResponse, ApiError> {
    auth.require_hr_or_admin()?;

    let rows = sqlx::query_as::<_, NotificationRow>(&format!(
        "{} ORDER BY n.created_at DESC, n.id DESC LIMIT ?",
        NOTIFICATION_SELECT
    ))
    .bind(query.limit())
    .fetch_all(pool.get_ref())
    .await?;

    let feed: Vec<Notification> = rows.into_iter().map(Notification::from).collect();
    Ok(HttpResponse::Ok().json(feed))
}

#[utoipa::path(
    get,
    path = "/api/notification/{user_id}",
    params(
        ("user_id" = u64, Path, description = "User account ID"),
        FeedQuery
    ),
    responses(
        (status = 200, description = "Latest notifications of the user", body = [Notification]),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Notification"
)]
pub async fn user_notifications(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    query: web::Query<FeedQuery>,
) -> Result<HttpResponse, ApiError> {
    let user_id = path.into_inner();
    auth.require_user_or_hr(user_id)?;

    let rows = sqlx::query_as::<_, NotificationRow>(&format!(
        "{} WHERE n.user_id = ? ORDER BY n.created_at DESC, n.id DESC LIMIT ?",
        NOTIFICATION_SELECT
    ))
    .bind(user_id)
    .bind(query.limit())
    .fetch_all(pool.get_ref())
    .await?;

    let feed: Vec<Notification> = rows.into_iter().map(Notification::from).collect();
    Ok(HttpResponse::Ok().json(feed))
}

#[utoipa::path(
    post,
    path = "/api/notification",
    request_body = NewNotification,
    responses(
        (status = 201, description = "Notification recorded", body = Notification),
        (status = 400, description = "Invalid notification"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "User not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Notification"
)]
pub async fn create_notification(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    body: web::Json<NewNotification>,
) -> Result<HttpResponse, ApiError> {
    let user_id = recipient(&auth, &body)?;
    let text = body.text.as_deref().map(str::trim).filter(|t| !t.is_empty());

    let id = insert_notification(pool.get_ref(), user_id, body.notification_type, body.status.trim(), text)
        .await
        .map_err(|e| match mysql_error_number(&e) {
            Some(ER_NO_REFERENCED_ROW) => ApiError::NotFound("User not found".into()),
            _ => ApiError::from(e),
        })?;

    let notification = fetch_notification(pool.get_ref(), id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Notification not found".into()))?;

    Ok(HttpResponse::Created().json(notification))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::role::Role;

    fn caller(role: Role) -> AuthUser {
        AuthUser {
            user_id: 5,
            username: "ada@example.com".into(),
            role,
            employee_id: Some(50),
        }
    }

    fn post(user_id: Option<u64>, status: &str) -> NewNotification {
        NewNotification {
            user_id,
            notification_type: NotificationKind::Attendance,
            status: status.into(),
            text: None,
        }
    }

    #[test]
    fn posts_default_to_the_caller() {
        assert_eq!(recipient(&caller(Role::Employee), &post(None, "check_in")).unwrap(), 5);
        assert_eq!(recipient(&caller(Role::Employee), &post(Some(5), "check_in")).unwrap(), 5);
    }

    #[test]
    fn only_hr_posts_to_other_users() {
        let err = recipient(&caller(Role::Employee), &post(Some(6), "check_in")).unwrap_err();
        assert!(matches!(err, ApiError::Forbidden(_)));

        assert_eq!(recipient(&caller(Role::Hr), &post(Some(6), "check_in")).unwrap(), 6);
        assert_eq!(recipient(&caller(Role::Admin), &post(Some(6), "check_in")).unwrap(), 6);
    }

    #[test]
    fn status_is_required_and_bounded() {
        let employee = caller(Role::Employee);
        assert!(matches!(recipient(&employee, &post(None, "  ")), Err(ApiError::BadRequest(_))));
        assert!(matches!(
            recipient(&employee, &post(None, &"x".repeat(MAX_STATUS_LEN + 1))),
            Err(ApiError::BadRequest(_))
        ));

        let mut long_text = post(None, "check_out");
        long_text.text = Some("y".repeat(MAX_TEXT_LEN + 1));
        assert!(matches!(recipient(&employee, &long_text), Err(ApiError::BadRequest(_))));
    }

    #[test]
    fn feed_limit_is_clamped() {
        assert_eq!(FeedQuery { limit: None }.limit(), 50);
        assert_eq!(FeedQuery { limit: Some(0) }.limit(), 1);
        assert_eq!(FeedQuery { limit: Some(10_000) }.limit(), 200);
    }
}
