use actix_web::{HttpResponse, Responder, web};

use crate::models::{ApiResponse, StartTimeLogQuery};
use crate::service::time_tracker::TimeTracker;

pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/start").route(web::post().to(start)))
        .service(web::resource("/{log_id}/stop").route(web::post().to(stop)))
        .service(web::resource("/assignment/{assignment_id}").route(web::get().to(list_for_assignment)));
}

/// Start a work interval
#[utoipa::path(
    post,
    path = "/api/timelogs/start",
    params(StartTimeLogQuery),
    responses(
        (status = 200, description = "Time log opened", body = Object, example = json!({
            "success": true,
            "data": {
                "id": 301,
                "assignmentId": 12,
                "startTime": "2024-05-01T09:00:00",
                "endTime": null,
                "note": "Replaced brake pads"
            },
            "message": "Time log started"
        })),
        (status = 404, description = "Assignment not found"),
        (status = 409, description = "Assignment already has an open time log", body = Object, example = json!({
            "success": false,
            "data": null,
            "message": "Active TimeLog already exists for assignment 12"
        }))
    ),
    tag = "TimeLog"
)]
pub async fn start(
    tracker: web::Data<TimeTracker>,
    query: web::Query<StartTimeLogQuery>,
) -> actix_web::Result<impl Responder> {
    let log = tracker.start(query.assignment_id, query.note.as_deref()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(log, "Time log started")))
}

/// Stop a work interval
#[utoipa::path(
    post,
    path = "/api/timelogs/{log_id}/stop",
    params(
        ("log_id", Path, description = "Time log ID")
    ),
    responses(
        (status = 200, description = "Time log closed and daily hours refreshed", body = Object),
        (status = 404, description = "Time log not found")
    ),
    tag = "TimeLog"
)]
pub async fn stop(
    tracker: web::Data<TimeTracker>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    let log = tracker.stop(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(log, "Time log stopped")))
}

/// Time logs of an assignment
#[utoipa::path(
    get,
    path = "/api/timelogs/assignment/{assignment_id}",
    params(
        ("assignment_id", Path, description = "Assignment ID")
    ),
    responses(
        (status = 200, description = "Time logs in the order they were started", body = Object)
    ),
    tag = "TimeLog"
)]
pub async fn list_for_assignment(
    tracker: web::Data<TimeTracker>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    let logs = tracker.list_for_assignment(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(logs, "Time logs retrieved successfully")))
}
