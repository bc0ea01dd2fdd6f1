//! Client and staff records the forecast is built from.

use std::collections::HashMap;

use axum::{
    Router,
    extract::{Path, State},
    response::Json as ResponseJson,
    routing::{get, post},
};
use db::models::{
    client::{Client, CreateClient},
    recurring_task::RecurringTask,
    staff::{CreateStaff, Staff, StaffStatus},
};
use serde::Deserialize;
use tracing::info;
use ts_rs::TS;
use utils::response::ApiResponse;
use uuid::Uuid;

use crate::{AppState, error::ApiError};

#[derive(Debug, Clone, Deserialize, TS)]
pub struct ClientIdsRequest {
    pub client_ids: Vec<Uuid>,
}

#[derive(Debug, Clone, Deserialize, TS)]
pub struct UpdateStaffStatusRequest {
    pub status: StaffStatus,
}

/// GET /api/clients
pub async fn list_clients(
    State(state): State<AppState>,
) -> Result<ResponseJson<ApiResponse<Vec<Client>>>, ApiError> {
    let clients = Client::find_all(&state.db().pool).await?;
    Ok(ResponseJson(ApiResponse::success(clients)))
}

/// POST /api/clients
pub async fn create_client(
    State(state): State<AppState>,
    axum::Json(payload): axum::Json<CreateClient>,
) -> Result<ResponseJson<ApiResponse<Client>>, ApiError> {
    if payload.legal_name.trim().is_empty() {
        return Err(ApiError::BadRequest("legal_name must not be blank".to_string()));
    }
    let client = Client::create(&state.db().pool, &payload, Uuid::new_v4()).await?;
    Ok(ResponseJson(ApiResponse::success(client)))
}

/// GET /api/clients/{client_id}/recurring-tasks
pub async fn list_client_recurring_tasks(
    State(state): State<AppState>,
    Path(client_id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<Vec<RecurringTask>>>, ApiError> {
    if Client::find_by_id(&state.db().pool, client_id).await?.is_none() {
        return Err(ApiError::NotFound(format!("client {client_id} not found")));
    }
    let tasks = RecurringTask::find_by_client_id(&state.db().pool, client_id).await?;
    Ok(ResponseJson(ApiResponse::success(tasks)))
}

/// POST /api/clients/resolve
///
/// Display names for the given ids through the client cache. Unknown ids are
/// left out of the map.
pub async fn resolve_client_names(
    State(state): State<AppState>,
    axum::Json(payload): axum::Json<ClientIdsRequest>,
) -> Result<ResponseJson<ApiResponse<HashMap<Uuid, String>>>, ApiError> {
    let names = state.clients().resolve_names(&payload.client_ids).await?;
    Ok(ResponseJson(ApiResponse::success(names)))
}

/// GET /api/staff
pub async fn list_staff(
    State(state): State<AppState>,
) -> Result<ResponseJson<ApiResponse<Vec<Staff>>>, ApiError> {
    let staff = Staff::find_all(&state.db().pool).await?;
    Ok(ResponseJson(ApiResponse::success(staff)))
}

/// POST /api/staff
pub async fn create_staff(
    State(state): State<AppState>,
    axum::Json(payload): axum::Json<CreateStaff>,
) -> Result<ResponseJson<ApiResponse<Staff>>, ApiError> {
    let report = state
        .validator()
        .validate_skill_references(&payload.assigned_skills)
        .await;
    if !report.invalid.is_empty() {
        return Err(ApiError::BadRequest(format!(
            "unknown skill references: {}",
            report.invalid.join(", ")
        )));
    }
    let staff = Staff::create(&state.db().pool, &payload, Uuid::new_v4()).await?;
    Ok(ResponseJson(ApiResponse::success(staff)))
}

/// GET /api/staff/{staff_id}
pub async fn get_staff(
    State(state): State<AppState>,
    Path(staff_id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<Staff>>, ApiError> {
    let staff = Staff::find_by_id(&state.db().pool, staff_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("staff member {staff_id} not found")))?;
    Ok(ResponseJson(ApiResponse::success(staff)))
}

/// POST /api/staff/{staff_id}/status
///
/// Inactive staff contribute no capacity.
pub async fn update_staff_status(
    State(state): State<AppState>,
    Path(staff_id): Path<Uuid>,
    axum::Json(payload): axum::Json<UpdateStaffStatusRequest>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    if Staff::update_status(&state.db().pool, staff_id, payload.status.clone()).await? == 0 {
        return Err(ApiError::NotFound(format!("staff member {staff_id} not found")));
    }
    info!(%staff_id, status = %payload.status, "Staff status changed");
    Ok(ResponseJson(ApiResponse::success(())))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/clients", get(list_clients).post(create_client))
        .route("/clients/resolve", post(resolve_client_names))
        .route(
            "/clients/{client_id}/recurring-tasks",
            get(list_client_recurring_tasks),
        )
        .route("/staff", get(list_staff).post(create_staff))
        .route("/staff/{staff_id}", get(get_staff))
        .route("/staff/{staff_id}/status", post(update_staff_status))
}
