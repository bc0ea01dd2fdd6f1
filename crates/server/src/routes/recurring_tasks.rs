use axum::{
    Router,
    extract::{Path, State},
    response::Json as ResponseJson,
    routing::{get, post},
};
use db::models::{
    client::Client,
    recurring_task::{CreateRecurringTask, RecurringTask, UpdateRecurringTask},
    staff::Staff,
};
use serde::Serialize;
use services::services::skill_validator::SkillValidationReport;
use sqlx::SqlitePool;
use tracing::{info, warn};
use ts_rs::TS;
use utils::response::ApiResponse;
use uuid::Uuid;

use crate::{AppState, error::ApiError};

/// A recurring task with its skill references resolved for display
#[derive(Debug, Clone, Serialize, TS)]
pub struct RecurringTaskView {
    #[serde(flatten)]
    pub task: RecurringTask,
    pub skill_names: Vec<String>,
}

async fn view(state: &AppState, task: RecurringTask) -> RecurringTaskView {
    let references = task.skill_references().references;
    let skill_names = state.resolver().get_skill_names(&references).await;
    RecurringTaskView { task, skill_names }
}

/// Unresolvable references are rejected; names missing from the skills
/// table are accepted and logged.
async fn check_skills(state: &AppState, references: &[String]) -> Result<(), ApiError> {
    let report: SkillValidationReport = state
        .validator()
        .validate_skill_references(references)
        .await;
    if !report.invalid.is_empty() {
        return Err(ApiError::BadRequest(format!(
            "unknown skill references: {}",
            report.invalid.join(", ")
        )));
    }
    if !report.flagged.is_empty() {
        warn!(flagged = ?report.flagged, "Skill names not in the skills table");
    }
    Ok(())
}

async fn check_preferred_staff(pool: &SqlitePool, staff_id: Option<Uuid>) -> Result<(), ApiError> {
    let Some(staff_id) = staff_id else {
        return Ok(());
    };
    if Staff::find_by_id(pool, staff_id).await?.is_none() {
        return Err(ApiError::BadRequest(format!(
            "staff member {staff_id} does not exist"
        )));
    }
    Ok(())
}

fn check_hours(hours: f64) -> Result<(), ApiError> {
    if hours.is_finite() && hours > 0.0 {
        Ok(())
    } else {
        Err(ApiError::BadRequest(format!(
            "estimated_hours must be a positive number, got {hours}"
        )))
    }
}

/// GET /api/recurring-tasks
pub async fn list_recurring_tasks(
    State(state): State<AppState>,
) -> Result<ResponseJson<ApiResponse<Vec<RecurringTaskView>>>, ApiError> {
    let tasks = RecurringTask::find_all(&state.db().pool).await?;
    let mut views = Vec::with_capacity(tasks.len());
    for task in tasks {
        views.push(view(&state, task).await);
    }
    Ok(ResponseJson(ApiResponse::success(views)))
}

/// GET /api/recurring-tasks/{task_id}
pub async fn get_recurring_task(
    State(state): State<AppState>,
    Path(task_id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<RecurringTaskView>>, ApiError> {
    let task = RecurringTask::find_by_id(&state.db().pool, task_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("recurring task {task_id} not found")))?;
    Ok(ResponseJson(ApiResponse::success(view(&state, task).await)))
}

/// POST /api/recurring-tasks
pub async fn create_recurring_task(
    State(state): State<AppState>,
    axum::Json(payload): axum::Json<CreateRecurringTask>,
) -> Result<ResponseJson<ApiResponse<RecurringTaskView>>, ApiError> {
    check_hours(payload.estimated_hours)?;
    check_skills(&state, &payload.required_skills).await?;
    if Client::find_by_id(&state.db().pool, payload.client_id)
        .await?
        .is_none()
    {
        return Err(ApiError::BadRequest(format!(
            "client {} does not exist",
            payload.client_id
        )));
    }
    check_preferred_staff(&state.db().pool, payload.preferred_staff_id).await?;

    let task = RecurringTask::create(&state.db().pool, &payload, Uuid::new_v4()).await?;
    info!(task_id = %task.id, client_id = %task.client_id, "Created recurring task");
    Ok(ResponseJson(ApiResponse::success(view(&state, task).await)))
}

/// PUT /api/recurring-tasks/{task_id}
pub async fn update_recurring_task(
    State(state): State<AppState>,
    Path(task_id): Path<Uuid>,
    axum::Json(payload): axum::Json<UpdateRecurringTask>,
) -> Result<ResponseJson<ApiResponse<RecurringTaskView>>, ApiError> {
    if let Some(hours) = payload.estimated_hours {
        check_hours(hours)?;
    }
    if let Some(skills) = &payload.required_skills {
        check_skills(&state, skills).await?;
    }
    check_preferred_staff(&state.db().pool, payload.preferred_staff_id.flatten()).await?;
    let task = RecurringTask::update(&state.db().pool, task_id, &payload)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("recurring task {task_id} not found")))?;
    Ok(ResponseJson(ApiResponse::success(view(&state, task).await)))
}

/// POST /api/recurring-tasks/{task_id}/deactivate
pub async fn deactivate_recurring_task(
    State(state): State<AppState>,
    Path(task_id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    set_active(&state, task_id, false).await
}

/// POST /api/recurring-tasks/{task_id}/activate
pub async fn activate_recurring_task(
    State(state): State<AppState>,
    Path(task_id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    set_active(&state, task_id, true).await
}

async fn set_active(
    state: &AppState,
    task_id: Uuid,
    is_active: bool,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    if RecurringTask::set_active(&state.db().pool, task_id, is_active).await? == 0 {
        return Err(ApiError::NotFound(format!("recurring task {task_id} not found")));
    }
    info!(%task_id, is_active, "Recurring task activation changed");
    Ok(ResponseJson(ApiResponse::success(())))
}

pub fn router() -> Router<AppState> {
    Router::new().nest(
        "/recurring-tasks",
        Router::new()
            .route("/", get(list_recurring_tasks).post(create_recurring_task))
            .route(
                "/{task_id}",
                get(get_recurring_task).put(update_recurring_task),
            )
            .route("/{task_id}/deactivate", post(deactivate_recurring_task))
            .route("/{task_id}/activate", post(activate_recurring_task)),
    )
}
