use actix_web::{HttpResponse, Responder, web};

use crate::error::AppError;
use crate::model::assignment::AssignmentStatus;
use crate::models::{ApiResponse, AssignQuery, AutoAssignQuery, AutoAssignRequest, StatusQuery};
use crate::service::assignment_manager::AssignmentManager;

pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/auto-assign-by-request").route(web::post().to(auto_assign_by_request)))
        .service(web::resource("/auto-assign").route(web::post().to(auto_assign)))
        .service(web::resource("/assign").route(web::post().to(assign)))
        .service(web::resource("/employee/{employee_id}").route(web::get().to(list_for_employee)))
        .service(
            web::resource("/by-appointment/{appointment_id}/employee")
                .route(web::get().to(employee_for_appointment)),
        )
        .service(web::resource("/{assignment_id}/status").route(web::put().to(update_status)));
}

/// Auto-assign from a booking
#[utoipa::path(
    post,
    path = "/api/assignments/auto-assign-by-request",
    request_body = AutoAssignRequest,
    responses(
        (status = 200, description = "Employee assigned", body = Object, example = json!({
            "success": true,
            "data": {
                "id": 12,
                "appointmentId": 4031,
                "employeeId": 7,
                "status": "ASSIGNED",
                "createdAt": "2024-05-01T08:55:00",
                "updatedAt": "2024-05-01T08:55:00"
            },
            "message": "Employee auto-assigned successfully"
        })),
        (status = 409, description = "Appointment already assigned"),
        (status = 503, description = "No employees available, or the employee directory is down")
    ),
    tag = "Assignment"
)]
pub async fn auto_assign_by_request(
    manager: web::Data<AssignmentManager>,
    body: web::Json<AutoAssignRequest>,
) -> actix_web::Result<impl Responder> {
    let req = body.into_inner();
    let assignment = manager
        .auto_assign(req.appointment_id, &req.service_type, req.appointment_date)
        .await?;

    Ok(HttpResponse::Ok().json(ApiResponse::ok(assignment, "Employee auto-assigned successfully")))
}

/// Auto-assign with an explicit job title
#[utoipa::path(
    post,
    path = "/api/assignments/auto-assign",
    params(AutoAssignQuery),
    responses(
        (status = 200, description = "Employee assigned", body = Object),
        (status = 409, description = "Appointment already assigned"),
        (status = 503, description = "No employees available, or the employee directory is down")
    ),
    tag = "Assignment"
)]
pub async fn auto_assign(
    manager: web::Data<AssignmentManager>,
    query: web::Query<AutoAssignQuery>,
) -> actix_web::Result<impl Responder> {
    let q = query.into_inner();
    let assignment = manager
        .auto_assign_for_specialization(q.appointment_id, &q.required_job_title, q.appointment_date)
        .await?;

    Ok(HttpResponse::Ok().json(ApiResponse::ok(assignment, "Employee auto-assigned successfully")))
}

/// Assign a specific employee
#[utoipa::path(
    post,
    path = "/api/assignments/assign",
    params(AssignQuery),
    responses(
        (status = 200, description = "Employee assigned", body = Object),
        (status = 404, description = "Unknown employee or appointment"),
        (status = 409, description = "Appointment already assigned"),
        (status = 503, description = "A directory could not be reached")
    ),
    tag = "Assignment"
)]
pub async fn assign(
    manager: web::Data<AssignmentManager>,
    query: web::Query<AssignQuery>,
) -> actix_web::Result<impl Responder> {
    let assignment = manager.assign(query.employee_id, query.appointment_id).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(assignment, "Employee assigned successfully")))
}

/// Assignments of an employee with appointment details
#[utoipa::path(
    get,
    path = "/api/assignments/employee/{employee_id}",
    params(
        ("employee_id", Path, description = "Employee ID")
    ),
    responses(
        (status = 200, description = "Assignments, oldest first", body = Object, example = json!({
            "success": true,
            "data": [{
                "id": 12,
                "appointmentId": 4031,
                "employeeId": 7,
                "status": "IN_PROGRESS",
                "createdAt": "2024-05-01T08:55:00",
                "updatedAt": "2024-05-01T10:02:00",
                "appointment": {
                    "customerId": 55,
                    "customerName": "Nimal Perera",
                    "appointmentDate": "2024-05-01",
                    "appointmentTime": "10:30",
                    "service": { "id": 1, "name": "Brake service", "category": "MECHANICAL" },
                    "vehicle": null
                }
            }],
            "message": "Assignments retrieved successfully"
        }))
    ),
    tag = "Assignment"
)]
pub async fn list_for_employee(
    manager: web::Data<AssignmentManager>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    let assignments = manager.list_assignments(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(assignments, "Assignments retrieved successfully")))
}

/// Employee currently holding an appointment
#[utoipa::path(
    get,
    path = "/api/assignments/by-appointment/{appointment_id}/employee",
    params(
        ("appointment_id", Path, description = "Appointment ID")
    ),
    responses(
        (status = 200, description = "Assigned employee, or null data when unassigned", body = Object),
        (status = 503, description = "Employee directory is down")
    ),
    tag = "Assignment"
)]
pub async fn employee_for_appointment(
    manager: web::Data<AssignmentManager>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    let response = match manager.employee_for_appointment(path.into_inner()).await? {
        Some(employee) => ApiResponse::ok(employee, "Assigned employee found"),
        None => ApiResponse::empty("No employee assigned to this appointment"),
    };
    Ok(HttpResponse::Ok().json(response))
}

/// Move an assignment to a new status
#[utoipa::path(
    put,
    path = "/api/assignments/{assignment_id}/status",
    params(
        ("assignment_id", Path, description = "Assignment ID"),
        StatusQuery
    ),
    responses(
        (status = 200, description = "Status updated", body = Object),
        (status = 400, description = "Unknown status or transition not allowed", body = Object, example = json!({
            "success": false,
            "data": null,
            "message": "Cannot change assignment 12 from COMPLETED to IN_PROGRESS"
        })),
        (status = 404, description = "Assignment not found"),
        (status = 409, description = "Status changed concurrently")
    ),
    tag = "Assignment"
)]
pub async fn update_status(
    manager: web::Data<AssignmentManager>,
    path: web::Path<u64>,
    query: web::Query<StatusQuery>,
) -> actix_web::Result<impl Responder> {
    let status: AssignmentStatus = query
        .status
        .trim()
        .parse()
        .map_err(|_| AppError::Validation(format!("Unknown status '{}'", query.status)))?;

    let assignment = manager.update_status(path.into_inner(), status).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(assignment, "Status updated successfully")))
}
