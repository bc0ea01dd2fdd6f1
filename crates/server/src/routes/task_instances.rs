use axum::{
    Router,
    extract::{Path, Query, State},
    response::Json as ResponseJson,
    routing::{get, post},
};
use chrono::{NaiveDate, Utc};
use db::models::task_instance::{TaskInstance, TaskInstanceStatus};
use serde::Deserialize;
use services::services::{period::Month, task_scheduler::ScheduleSummary};
use utils::response::ApiResponse;
use uuid::Uuid;

use crate::{AppState, error::ApiError};

#[derive(Debug, Deserialize)]
pub struct GenerateQuery {
    /// `YYYY-MM`; defaults to the current month
    pub month: Option<Month>,
}

#[derive(Debug, Deserialize)]
pub struct DueBetweenQuery {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: TaskInstanceStatus,
}

/// POST /api/task-instances/generate?month=YYYY-MM
pub async fn generate_task_instances(
    State(state): State<AppState>,
    Query(query): Query<GenerateQuery>,
) -> Result<ResponseJson<ApiResponse<ScheduleSummary>>, ApiError> {
    let month = query
        .month
        .unwrap_or_else(|| Month::from_date(Utc::now().date_naive()));
    let summary = state.scheduler().generate_instances(month).await?;
    Ok(ResponseJson(ApiResponse::success(summary)))
}

/// GET /api/task-instances?start=YYYY-MM-DD&end=YYYY-MM-DD
pub async fn list_task_instances(
    State(state): State<AppState>,
    Query(query): Query<DueBetweenQuery>,
) -> Result<ResponseJson<ApiResponse<Vec<TaskInstance>>>, ApiError> {
    if query.start > query.end {
        return Err(ApiError::BadRequest(format!(
            "start {} is after end {}",
            query.start, query.end
        )));
    }
    let instances = TaskInstance::find_due_between(&state.db().pool, query.start, query.end).await?;
    Ok(ResponseJson(ApiResponse::success(instances)))
}

/// POST /api/task-instances/{instance_id}/status
pub async fn update_task_instance_status(
    State(state): State<AppState>,
    Path(instance_id): Path<Uuid>,
    axum::Json(payload): axum::Json<UpdateStatusRequest>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    if TaskInstance::update_status(&state.db().pool, instance_id, payload.status).await? == 0 {
        return Err(ApiError::NotFound(format!(
            "task instance {instance_id} not found"
        )));
    }
    Ok(ResponseJson(ApiResponse::success(())))
}

pub fn router() -> Router<AppState> {
    Router::new().nest(
        "/task-instances",
        Router::new()
            .route("/", get(list_task_instances))
            .route("/generate", post(generate_task_instances))
            .route("/{instance_id}/status", post(update_task_instance_status)),
    )
}
