use actix_web::{HttpResponse, Responder, web};

use crate::model::work_hours::{DailyWorkHours, WorkHoursResponse};
use crate::models::{ApiResponse, DateQuery, DateRangeQuery};
use crate::service::aggregator::DailyHoursAggregator;

pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/employee/{employee_id}/hours").route(web::get().to(all_hours)))
        .service(web::resource("/employee/{employee_id}/hours/range").route(web::get().to(hours_in_range)))
        .service(web::resource("/employee/{employee_id}/hours/recompute").route(web::post().to(recompute)))
        .service(
            web::resource("/employee/{employee_id}/hours/recompute-range")
                .route(web::post().to(recompute_range)),
        );
}

fn to_response(rows: Vec<DailyWorkHours>) -> Vec<WorkHoursResponse> {
    rows.into_iter().map(WorkHoursResponse::from).collect()
}

/// All recorded days of an employee
#[utoipa::path(
    get,
    path = "/api/timelogs/employee/{employee_id}/hours",
    params(
        ("employee_id", Path, description = "Employee ID")
    ),
    responses(
        (status = 200, description = "Days with logged work, oldest first", body = [WorkHoursResponse])
    ),
    tag = "WorkHours"
)]
pub async fn all_hours(
    aggregator: web::Data<DailyHoursAggregator>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    let rows = aggregator.get_all(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(to_response(rows), "Work hours retrieved successfully")))
}

/// Recorded days in a date range
#[utoipa::path(
    get,
    path = "/api/timelogs/employee/{employee_id}/hours/range",
    params(
        ("employee_id", Path, description = "Employee ID"),
        DateRangeQuery
    ),
    responses(
        (status = 200, description = "Days with logged work in the range", body = [WorkHoursResponse]),
        (status = 400, description = "startDate after endDate")
    ),
    tag = "WorkHours"
)]
pub async fn hours_in_range(
    aggregator: web::Data<DailyHoursAggregator>,
    path: web::Path<u64>,
    query: web::Query<DateRangeQuery>,
) -> actix_web::Result<impl Responder> {
    let rows = aggregator
        .get_range(path.into_inner(), query.start_date, query.end_date)
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(to_response(rows), "Work hours retrieved successfully")))
}

/// Rebuild one day from its time logs
#[utoipa::path(
    post,
    path = "/api/timelogs/employee/{employee_id}/hours/recompute",
    params(
        ("employee_id", Path, description = "Employee ID"),
        DateQuery
    ),
    responses(
        (status = 200, description = "Recomputed day", body = WorkHoursResponse)
    ),
    tag = "WorkHours"
)]
pub async fn recompute(
    aggregator: web::Data<DailyHoursAggregator>,
    path: web::Path<u64>,
    query: web::Query<DateQuery>,
) -> actix_web::Result<impl Responder> {
    let row = aggregator.recompute(path.into_inner(), query.date).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(WorkHoursResponse::from(row), "Work hours recomputed")))
}

/// Rebuild every day in a range
#[utoipa::path(
    post,
    path = "/api/timelogs/employee/{employee_id}/hours/recompute-range",
    params(
        ("employee_id", Path, description = "Employee ID"),
        DateRangeQuery
    ),
    responses(
        (status = 200, description = "Recomputed days that have data", body = [WorkHoursResponse]),
        (status = 400, description = "Range reversed or longer than 366 days")
    ),
    tag = "WorkHours"
)]
pub async fn recompute_range(
    aggregator: web::Data<DailyHoursAggregator>,
    path: web::Path<u64>,
    query: web::Query<DateRangeQuery>,
) -> actix_web::Result<impl Responder> {
    let rows = aggregator
        .recompute_range(path.into_inner(), query.start_date, query.end_date)
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(to_response(rows), "Work hours recomputed")))
}
