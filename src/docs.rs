use utoipa::OpenApi;

use crate::model::appointment::{ServiceSummary, VehicleSummary};
use crate::model::assignment::{Assignment, AssignmentStatus};
use crate::model::employee::Employee;
use crate::model::time_log::TimeLog;
use crate::model::work_hours::WorkHoursResponse;
use crate::models::{AppointmentSummary, AutoAssignRequest, EnrichedAssignment};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Workforce API",
        version = "1.0.0",
        description = r#"
## Work assignment and time tracking

Decides which employee handles which service appointment, tracks the
assignment lifecycle, records work intervals and keeps daily work-hour totals.

### Key Features
- **Assignment**
  - Least-busy placement by job title, with fallback to the whole roster
  - Manual placement and status transitions
    (ASSIGNED → IN_PROGRESS → COMPLETED, or CANCELLED while active)
- **Time logs**
  - Start/stop work intervals, one open interval per assignment
- **Work hours**
  - Daily totals rebuilt from time logs, with repair endpoints

### Response Format
Every response is `{ "success": bool, "data": ..., "message": string }`.
`503` responses carrying `Retry-After` mean a directory service was unreachable.
"#,
    ),
    paths(
        crate::api::assignment::auto_assign_by_request,
        crate::api::assignment::auto_assign,
        crate::api::assignment::assign,
        crate::api::assignment::list_for_employee,
        crate::api::assignment::employee_for_appointment,
        crate::api::assignment::update_status,

        crate::api::time_log::start,
        crate::api::time_log::stop,
        crate::api::time_log::list_for_assignment,

        crate::api::work_hours::all_hours,
        crate::api::work_hours::hours_in_range,
        crate::api::work_hours::recompute,
        crate::api::work_hours::recompute_range
    ),
    components(
        schemas(
            Assignment,
            AssignmentStatus,
            AutoAssignRequest,
            EnrichedAssignment,
            AppointmentSummary,
            ServiceSummary,
            VehicleSummary,
            Employee,
            TimeLog,
            WorkHoursResponse
        )
    ),
    tags(
        (name = "Assignment", description = "Employee placement and assignment lifecycle"),
        (name = "TimeLog", description = "Work interval tracking"),
        (name = "WorkHours", description = "Daily work-hour totals"),
    )
)]
pub struct ApiDoc;
