use crate::api::attendance::DayAttendanceResponse;
use crate::api::employee::{EmployeeListResponse, EmployeeQuery};
use crate::api::leave::{LeaveDecision, LeaveFilter, LeaveListResponse};
use crate::api::payroll::{EmployeeStatsResponse, PayDateResponse};
use crate::auth::auth::AuthUser;
use crate::auth::handlers::TokenPair;
use crate::model::attendance::AttendanceRecord;
use crate::model::employee::Employee;
use crate::model::leave::{LeaveRequest, LeaveStatus, LeaveType, NewLeave};
use crate::model::notification::{NewNotification, Notification, NotificationKind};
use crate::model::role::Role;
use crate::models::{LoginReqDto, RegisterReq};
use crate::payroll::schedule::MonthOption;
use crate::payroll::stats::AttendanceStats;
use crate::payroll::summary::{DailyOverview, StaffPayroll, StaffPayrollRow};
use crate::utils::calendar::{CalendarEvent, EventKind};
use utoipa::Modify;
use utoipa::OpenApi;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "BrewBreak API",
        version = "0.1.0",
        description = r#"
## BrewBreak attendance and payroll

Employees check in and out once a day. Each month of attendance turns into a salary:

- every attended day pays the daily rate
- every whole hour of lateness after 08:00 is deducted
- days without a record are counted as absent, from the start of employment up to today

Salaries are paid on the 25th. Leave requests go to HR for approval, and
attendance events and leave decisions land on each user's notification feed.

### 🔐 Security
Every `/api` endpoint needs a **JWT Bearer** access token from `/auth/login`.
Employees only see their own records; **HR** and **Admin** see everyone.
"#,
    ),
    paths(
        crate::auth::handlers::register,
        crate::auth::handlers::login,
        crate::auth::handlers::refresh_token,
        crate::auth::handlers::logout,
        crate::auth::handlers::me,

        crate::api::employee::list_employees,
        crate::api::employee::get_employee,

        crate::api::attendance::check_in,
        crate::api::attendance::check_out,
        crate::api::attendance::my_attendance,
        crate::api::attendance::employee_attendance,
        crate::api::attendance::employee_calendar,
        crate::api::attendance::monthly_attendance,
        crate::api::attendance::daily_attendance,

        crate::api::payroll::employee_stats,
        crate::api::payroll::employee_months,
        crate::api::payroll::pay_date,
        crate::api::payroll::staff,

        crate::api::leave::submit_leave,
        crate::api::leave::list_leave,
        crate::api::leave::pending_leave,
        crate::api::leave::employee_leave,
        crate::api::leave::get_leave,
        crate::api::leave::update_leave,
        crate::api::leave::approve_leave,
        crate::api::leave::reject_leave,

        crate::api::notification::list_notifications,
        crate::api::notification::user_notifications,
        crate::api::notification::create_notification
    ),
    components(
        schemas(
            RegisterReq,
            LoginReqDto,
            TokenPair,
            AuthUser,
            Role,
            Employee,
            EmployeeQuery,
            EmployeeListResponse,
            AttendanceRecord,
            CalendarEvent,
            EventKind,
            DailyOverview,
            DayAttendanceResponse,
            AttendanceStats,
            EmployeeStatsResponse,
            MonthOption,
            PayDateResponse,
            StaffPayrollRow,
            StaffPayroll,
            LeaveType,
            LeaveStatus,
            LeaveRequest,
            NewLeave,
            LeaveDecision,
            LeaveFilter,
            LeaveListResponse,
            NotificationKind,
            Notification,
            NewNotification
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Auth", description = "Registration, login and token rotation"),
        (name = "Employee", description = "Employee directory"),
        (name = "Attendance", description = "Daily check-in and check-out"),
        (name = "Payroll", description = "Monthly salary from attendance"),
        (name = "Leave", description = "Leave requests and HR decisions"),
        (name = "Notification", description = "Per-user activity feed"),
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_route_is_documented() {
        let doc = ApiDoc::openapi();
        for path in [
            "/auth/login",
            "/api/me",
            "/api/attendance",
            "/api/attendance/day",
            "/api/payroll/employee/{employee_id}/stats",
            "/api/payroll/pay-date",
            "/api/payroll/staff",
            "/api/leave",
            "/api/leave/pending",
            "/api/leave/employee/{employee_id}",
            "/api/leave/{leave_id}",
            "/api/leave/{leave_id}/approve",
            "/api/notification",
            "/api/notification/{user_id}",
        ] {
            assert!(doc.paths.paths.contains_key(path), "{} missing", path);
        }
    }

    #[test]
    fn bearer_scheme_is_registered() {
        let doc = ApiDoc::openapi();
        let components = doc.components.expect("components");
        assert!(components.security_schemes.contains_key("bearer_auth"));
    }
}
