use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Attendance,
    Leave,
    General,
}

impl NotificationKind {
    pub fn as_str(self) -> &'static str {
        match self {
            NotificationKind::Attendance => "attendance",
            NotificationKind::Leave => "leave",
            NotificationKind::General => "general",
        }
    }
}

/// An activity entry shown on a user's feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[schema(example = json!({
    "id": 3,
    "user_id": 5,
    "username": "john.doe@company.com",
    "notification_type": "attendance",
    "status": "check_in",
    "text": null,
    "message": "attendance check_in",
    "created_at": "2024-05-02T09:15:00"
}))]
pub struct Notification {
    pub id: u64,
    pub user_id: u64,
    pub username: String,
    pub notification_type: String,
    pub status: String,
    pub text: Option<String>,
    /// `text` when present, otherwise `<type> <status>`
    pub message: String,
    #[schema(value_type = String, format = "date-time")]
    pub created_at: NaiveDateTime,
}

#[derive(sqlx::FromRow)]
pub struct NotificationRow {
    pub id: u64,
    pub user_id: u64,
    pub username: String,
    pub notification_type: String,
    pub status: String,
    pub text: Option<String>,
    pub created_at: NaiveDateTime,
}

impl From<NotificationRow> for Notification {
    fn from(row: NotificationRow) -> Self {
        let message = match row.text.as_deref().map(str::trim) {
            Some(text) if !text.is_empty() => text.to_string(),
            _ => format!("{} {}", row.notification_type, row.status),
        };

        Notification {
            id: row.id,
            user_id: row.user_id,
            username: row.username,
            notification_type: row.notification_type,
            status: row.status,
            text: row.text,
            message,
            created_at: row.created_at,
        }
    }
}

/// Body of a notification post.
#[derive(Debug, Deserialize, ToSchema)]
pub struct NewNotification {
    /// Recipient; defaults to the caller. Only HR and admins may notify others.
    #[schema(example = 5)]
    pub user_id: Option<u64>,
    #[schema(example = "attendance")]
    pub notification_type: NotificationKind,
    #[schema(example = "check_in")]
    pub status: String,
    #[schema(example = "Checked in from the front desk")]
    pub text: Option<String>,
}
