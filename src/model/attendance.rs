use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Deserializer, Serialize};
use utoipa::ToSchema;

/// One employee's attendance for one calendar day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
#[schema(example = json!({
    "id": 1,
    "employee_id": 1000,
    "date": "2024-05-02",
    "check_in": "09:15:00",
    "check_out": "17:00:00"
}))]
pub struct AttendanceRecord {
    #[serde(default)]
    pub id: u64,

    #[serde(default)]
    pub employee_id: u64,

    #[schema(value_type = String, format = "date")]
    pub date: NaiveDate,

    /// Missing, empty or unreadable values mean the employee did not clock in.
    #[serde(default, deserialize_with = "lenient_time")]
    #[schema(value_type = Option<String>, example = "09:15:00")]
    pub check_in: Option<NaiveTime>,

    #[serde(default, deserialize_with = "lenient_time")]
    #[schema(value_type = Option<String>, example = "17:00:00")]
    pub check_out: Option<NaiveTime>,
}

impl AttendanceRecord {
    /// Check-in and check-out, only when both were recorded.
    pub fn shift(&self) -> Option<(NaiveTime, NaiveTime)> {
        Some((self.check_in?, self.check_out?))
    }
}

/// Anything that is not a readable time string (numbers, booleans, garbage)
/// reads as no time at all.
fn lenient_time<'de, D>(deserializer: D) -> Result<Option<NaiveTime>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<serde_json::Value>::deserialize(deserializer)?;

    Ok(raw
        .as_ref()
        .and_then(serde_json::Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .and_then(|s| {
            NaiveTime::parse_from_str(s, "%H:%M:%S")
                .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M"))
                .ok()
        }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn reads_times_from_json() {
        let record: AttendanceRecord = serde_json::from_value(json!({
            "id": 7,
            "employee_id": 3,
            "date": "2024-05-02",
            "check_in": "09:15:00",
            "check_out": "17:00"
        }))
        .unwrap();

        assert_eq!(record.check_in, NaiveTime::from_hms_opt(9, 15, 0));
        assert_eq!(record.check_out, NaiveTime::from_hms_opt(17, 0, 0));
        assert!(record.shift().is_some());
    }

    #[test]
    fn empty_or_garbage_times_read_as_missing() {
        let record: AttendanceRecord = serde_json::from_value(json!({
            "date": "2024-05-02",
            "check_in": "",
            "check_out": "late"
        }))
        .unwrap();

        assert_eq!(record.check_in, None);
        assert_eq!(record.check_out, None);
        assert_eq!(record.shift(), None);
    }

    #[test]
    fn non_string_times_read_as_missing() {
        let record: AttendanceRecord = serde_json::from_value(json!({
            "date": "2024-05-02",
            "check_in": 930,
            "check_out": true
        }))
        .unwrap();

        assert_eq!(record.date, NaiveDate::from_ymd_opt(2024, 5, 2).unwrap());
        assert_eq!(record.check_in, None);
        assert_eq!(record.check_out, None);
    }

    #[test]
    fn omitted_and_null_times_read_as_missing() {
        let record: AttendanceRecord = serde_json::from_value(json!({
            "date": "2024-05-02",
            "check_in": null
        }))
        .unwrap();

        assert_eq!(record.id, 0);
        assert_eq!(record.check_in, None);
        assert_eq!(record.check_out, None);
    }

    #[test]
    fn serializes_times_as_clock_strings() {
        let record = AttendanceRecord {
            id: 1,
            employee_id: 2,
            date: NaiveDate::from_ymd_opt(2024, 5, 2).unwrap(),
            check_in: NaiveTime::from_hms_opt(8, 5, 0),
            check_out: None,
        };

        let value = serde_json::to_value(record).unwrap();
        assert_eq!(value["date"], "2024-05-02");
        assert_eq!(value["check_in"], "08:05:00");
        assert_eq!(value["check_out"], serde_json::Value::Null);
    }
}
