use chrono::{NaiveDateTime, NaiveTime};
use serde::Serialize;
use utoipa::ToSchema;

use crate::model::attendance::AttendanceRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    In,
    Out,
}

/// A point-in-time entry on an attendance calendar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct CalendarEvent {
    #[schema(example = "in-42")]
    pub id: String,
    #[schema(example = "09:15 AM (In)")]
    pub title: String,
    #[schema(value_type = String, format = "date-time", example = "2024-05-02T09:15:00")]
    pub start: NaiveDateTime,
    #[schema(value_type = String, format = "date-time", example = "2024-05-02T09:15:00")]
    pub end: NaiveDateTime,
    #[serde(rename = "type")]
    pub kind: EventKind,
}

impl CalendarEvent {
    fn new(record: &AttendanceRecord, time: NaiveTime, kind: EventKind) -> Self {
        let (prefix, suffix) = match kind {
            EventKind::In => ("in", "In"),
            EventKind::Out => ("out", "Out"),
        };
        let at = record.date.and_time(time);

        Self {
            id: format!("{}-{}", prefix, record.id),
            title: format!("{} ({})", time.format("%I:%M %p"), suffix),
            start: at,
            end: at,
            kind,
        }
    }
}

/// Check-in and check-out events for every record, in record order.
pub fn calendar_events(records: &[AttendanceRecord]) -> Vec<CalendarEvent> {
    records
        .iter()
        .flat_map(|record| {
            let check_in = record
                .check_in
                .map(|time| CalendarEvent::new(record, time, EventKind::In));
            let check_out = record
                .check_out
                .map(|time| CalendarEvent::new(record, time, EventKind::Out));
            check_in.into_iter().chain(check_out)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn record(id: u64, check_in: Option<(u32, u32)>, check_out: Option<(u32, u32)>) -> AttendanceRecord {
        let at = |(h, m): (u32, u32)| NaiveTime::from_hms_opt(h, m, 0).unwrap();
        AttendanceRecord {
            id,
            employee_id: 1,
            date: NaiveDate::from_ymd_opt(2024, 5, 2).unwrap(),
            check_in: check_in.map(at),
            check_out: check_out.map(at),
        }
    }

    #[test]
    fn full_day_yields_in_and_out_events() {
        let events = calendar_events(&[record(42, Some((9, 15)), Some((17, 30)))]);

        assert_eq!(events.len(), 2);
        assert_eq!(events[0].id, "in-42");
        assert_eq!(events[0].title, "09:15 AM (In)");
        assert_eq!(events[0].kind, EventKind::In);
        assert_eq!(events[0].start, events[0].end);
        assert_eq!(events[1].id, "out-42");
        assert_eq!(events[1].title, "05:30 PM (Out)");
        assert_eq!(events[1].start.to_string(), "2024-05-02 17:30:00");
    }

    #[test]
    fn open_day_yields_only_check_in() {
        let events = calendar_events(&[record(1, Some((8, 0)), None)]);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, EventKind::In);
    }

    #[test]
    fn missing_check_in_yields_no_in_event() {
        let events = calendar_events(&[record(1, None, Some((17, 0))), record(2, None, None)]);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].id, "out-1");
    }

    #[test]
    fn event_type_serializes_lowercase() {
        let events = calendar_events(&[record(3, Some((8, 0)), None)]);
        let value = serde_json::to_value(&events[0]).unwrap();
        assert_eq!(value["type"], "in");
    }
}
