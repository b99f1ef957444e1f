use std::fmt;
use std::str::FromStr;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LeaveError {
    #[error("unknown leave type `{0}`")]
    UnknownType(String),

    #[error("unknown leave status `{0}`")]
    UnknownStatus(String),

    #[error("start_date cannot be after end_date")]
    DatesReversed,

    #[error("a leave request can only be Approved or Rejected")]
    NotADecision,

    #[error("leave request is already {0}")]
    AlreadyDecided(LeaveStatus),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum LeaveType {
    #[serde(rename = "Vacation Leave")]
    Vacation,
    #[serde(rename = "Sick Leave")]
    Sick,
    #[serde(rename = "Family Leave")]
    Family,
    #[serde(rename = "Maternity Leave")]
    Maternity,
    #[serde(rename = "Personal Leave")]
    Personal,
}

impl LeaveType {
    pub fn as_str(self) -> &'static str {
        match self {
            LeaveType::Vacation => "Vacation Leave",
            LeaveType::Sick => "Sick Leave",
            LeaveType::Family => "Family Leave",
            LeaveType::Maternity => "Maternity Leave",
            LeaveType::Personal => "Personal Leave",
        }
    }
}

impl FromStr for LeaveType {
    type Err = LeaveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        [
            LeaveType::Vacation,
            LeaveType::Sick,
            LeaveType::Family,
            LeaveType::Maternity,
            LeaveType::Personal,
        ]
        .into_iter()
        .find(|t| t.as_str() == s)
        .ok_or_else(|| LeaveError::UnknownType(s.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum LeaveStatus {
    Pending,
    Approved,
    Rejected,
}

impl LeaveStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            LeaveStatus::Pending => "Pending",
            LeaveStatus::Approved => "Approved",
            LeaveStatus::Rejected => "Rejected",
        }
    }

    /// Status after HR decides on a request in this status.
    ///
    /// Only pending requests can be decided, and only to Approved or Rejected.
    pub fn decide(self, decision: LeaveStatus) -> Result<LeaveStatus, LeaveError> {
        if decision == LeaveStatus::Pending {
            return Err(LeaveError::NotADecision);
        }
        match self {
            LeaveStatus::Pending => Ok(decision),
            decided => Err(LeaveError::AlreadyDecided(decided)),
        }
    }
}

impl fmt::Display for LeaveStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LeaveStatus {
    type Err = LeaveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pending" => Ok(LeaveStatus::Pending),
            "Approved" => Ok(LeaveStatus::Approved),
            "Rejected" => Ok(LeaveStatus::Rejected),
            other => Err(LeaveError::UnknownStatus(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[schema(example = json!({
    "id": 1,
    "employee_id": 1000,
    "leave_type": "Sick Leave",
    "start_date": "2024-05-02",
    "end_date": "2024-05-03",
    "reason": "Flu",
    "status": "Pending",
    "created_at": "2024-05-01T09:30:00"
}))]
pub struct LeaveRequest {
    pub id: u64,
    pub employee_id: u64,
    pub leave_type: LeaveType,
    #[schema(value_type = String, format = "date")]
    pub start_date: NaiveDate,
    #[schema(value_type = String, format = "date")]
    pub end_date: NaiveDate,
    pub reason: String,
    pub status: LeaveStatus,
    #[schema(value_type = Option<String>, format = "date-time")]
    pub created_at: Option<NaiveDateTime>,
}

impl LeaveRequest {
    /// Calendar days covered, both ends included.
    pub fn days(&self) -> i64 {
        (self.end_date - self.start_date).num_days() + 1
    }
}

/// `leave_requests` row as stored; type and status are plain strings.
#[derive(sqlx::FromRow)]
pub struct LeaveRow {
    pub id: u64,
    pub employee_id: u64,
    pub leave_type: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub reason: String,
    pub status: String,
    pub created_at: Option<NaiveDateTime>,
}

impl TryFrom<LeaveRow> for LeaveRequest {
    type Error = LeaveError;

    fn try_from(row: LeaveRow) -> Result<Self, Self::Error> {
        Ok(LeaveRequest {
            id: row.id,
            employee_id: row.employee_id,
            leave_type: row.leave_type.parse()?,
            start_date: row.start_date,
            end_date: row.end_date,
            reason: row.reason,
            status: row.status.parse()?,
            created_at: row.created_at,
        })
    }
}

/// Body of a leave submission.
#[derive(Debug, Deserialize, ToSchema)]
pub struct NewLeave {
    #[schema(example = "Sick Leave")]
    pub leave_type: LeaveType,
    #[schema(example = "2024-05-02", format = "date", value_type = String)]
    pub start_date: NaiveDate,
    #[schema(example = "2024-05-03", format = "date", value_type = String)]
    pub end_date: NaiveDate,
    #[serde(default)]
    #[schema(example = "Flu")]
    pub reason: String,
}

impl NewLeave {
    pub fn validate(&self) -> Result<(), LeaveError> {
        if self.start_date > self.end_date {
            return Err(LeaveError::DatesReversed);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn pending_requests_can_be_approved_or_rejected() {
        assert_eq!(LeaveStatus::Pending.decide(LeaveStatus::Approved), Ok(LeaveStatus::Approved));
        assert_eq!(LeaveStatus::Pending.decide(LeaveStatus::Rejected), Ok(LeaveStatus::Rejected));
    }

    #[test]
    fn decided_requests_stay_decided() {
        assert_eq!(
            LeaveStatus::Approved.decide(LeaveStatus::Rejected),
            Err(LeaveError::AlreadyDecided(LeaveStatus::Approved))
        );
        assert_eq!(
            LeaveStatus::Rejected.decide(LeaveStatus::Approved),
            Err(LeaveError::AlreadyDecided(LeaveStatus::Rejected))
        );
    }

    #[test]
    fn pending_is_not_a_decision() {
        assert_eq!(LeaveStatus::Pending.decide(LeaveStatus::Pending), Err(LeaveError::NotADecision));
        assert_eq!(LeaveStatus::Approved.decide(LeaveStatus::Pending), Err(LeaveError::NotADecision));
    }

    #[test]
    fn leave_types_use_their_display_names() {
        let leave: NewLeave = serde_json::from_value(json!({
            "leave_type": "Vacation Leave",
            "start_date": "2024-05-02",
            "end_date": "2024-05-03"
        }))
        .unwrap();

        assert_eq!(leave.leave_type, LeaveType::Vacation);
        assert_eq!(leave.reason, "");
        assert_eq!("Maternity Leave".parse::<LeaveType>(), Ok(LeaveType::Maternity));
        assert!("Holiday".parse::<LeaveType>().is_err());
    }

    #[test]
    fn reversed_dates_are_rejected() {
        let leave = NewLeave {
            leave_type: LeaveType::Sick,
            start_date: date(2024, 5, 3),
            end_date: date(2024, 5, 2),
            reason: String::new(),
        };
        assert_eq!(leave.validate(), Err(LeaveError::DatesReversed));

        let one_day = NewLeave {
            end_date: date(2024, 5, 3),
            ..leave
        };
        assert!(one_day.validate().is_ok());
    }

    #[test]
    fn stored_rows_convert_and_count_days() {
        let row = LeaveRow {
            id: 1,
            employee_id: 7,
            leave_type: "Family Leave".into(),
            start_date: date(2024, 2, 28),
            end_date: date(2024, 3, 1),
            reason: "Wedding".into(),
            status: "Approved".into(),
            created_at: None,
        };

        let leave = LeaveRequest::try_from(row).unwrap();
        assert_eq!(leave.leave_type, LeaveType::Family);
        assert_eq!(leave.status, LeaveStatus::Approved);
        assert_eq!(leave.days(), 3);

        let value = serde_json::to_value(&leave).unwrap();
        assert_eq!(value["leave_type"], "Family Leave");
        assert_eq!(value["status"], "Approved");
    }

    #[test]
    fn unknown_stored_status_is_an_error() {
        let row = LeaveRow {
            id: 1,
            employee_id: 7,
            leave_type: "Sick Leave".into(),
            start_date: date(2024, 5, 2),
            end_date: date(2024, 5, 2),
            reason: String::new(),
            status: "on hold".into(),
            created_at: None,
        };
        assert_eq!(
            LeaveRequest::try_from(row),
            Err(LeaveError::UnknownStatus("on hold".into()))
        );
    }
}
