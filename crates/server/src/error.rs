use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use services::services::{
    capacity::CapacityError, client_resolution::ClientResolutionError,
    demand::DemandForecastError, export::ExportError, period::PeriodError,
    skill_cache::SkillCacheError, staff_filter::StaffFilterError,
    task_scheduler::SchedulerError,
};
use thiserror::Error;
use tracing::error;
use utils::response::ApiResponse;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    NotFound(String),
    #[error(transparent)]
    Database(#[from] sqlx::Error),
    #[error(transparent)]
    Period(#[from] PeriodError),
    #[error(transparent)]
    StaffFilter(#[from] StaffFilterError),
    #[error(transparent)]
    DemandForecast(#[from] DemandForecastError),
    #[error(transparent)]
    Capacity(#[from] CapacityError),
    #[error(transparent)]
    SkillCache(#[from] SkillCacheError),
    #[error(transparent)]
    ClientResolution(#[from] ClientResolutionError),
    #[error(transparent)]
    Scheduler(#[from] SchedulerError),
    #[error(transparent)]
    Export(#[from] ExportError),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) | ApiError::Period(_) | ApiError::StaffFilter(_) => {
                StatusCode::BAD_REQUEST
            }
            ApiError::NotFound(_) | ApiError::Database(sqlx::Error::RowNotFound) => {
                StatusCode::NOT_FOUND
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!(error = %self, "Request failed");
        }
        (status, Json(ApiResponse::<()>::error(self.to_string()))).into_response()
    }
}
