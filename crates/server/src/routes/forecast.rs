//! Demand and capacity forecast routes.

use std::collections::{BTreeSet, HashSet};

use axum::{
    Router,
    extract::{Query, State},
    http::header,
    response::{IntoResponse, Json as ResponseJson, Response},
    routing::get,
};
use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use services::services::{
    capacity::{ForecastMatrix, build_forecast_matrix},
    demand::{DemandFilters, DemandMatrix},
    export::{ExportFormat, export, export_client_totals_csv},
    period::{MAX_HORIZON_MONTHS, Month, TimeHorizon},
    staff_filter::{StaffFilterMode, parse_staff_ids},
};
use tracing::info;
use utils::response::ApiResponse;
use uuid::Uuid;

use crate::{AppState, error::ApiError};

/// Shared query string for every forecast route. Months are `YYYY-MM`;
/// list parameters are comma-separated.
#[derive(Debug, Default, Deserialize)]
pub struct ForecastQuery {
    pub start: Option<Month>,
    pub end: Option<Month>,
    pub mode: Option<String>,
    pub staff: Option<String>,
    pub skills: Option<String>,
    pub clients: Option<String>,
    pub include_inactive: Option<bool>,
    pub format: Option<String>,
}

impl ForecastQuery {
    /// Without `end` the horizon runs `default_months` from `start`, which
    /// itself defaults to the month containing `today`. Spans longer than
    /// [`MAX_HORIZON_MONTHS`] are rejected.
    pub fn horizon(&self, today: NaiveDate, default_months: u32) -> Result<TimeHorizon, ApiError> {
        let start = self.start.unwrap_or_else(|| Month::from_date(today));
        let span = match self.end {
            Some(end) => end.ordinal() - start.ordinal() + 1,
            None => i64::from(default_months),
        };
        if span > i64::from(MAX_HORIZON_MONTHS) {
            return Err(ApiError::BadRequest(format!(
                "forecast horizon of {span} months exceeds the {MAX_HORIZON_MONTHS} month limit"
            )));
        }
        let horizon = match self.end {
            Some(end) => TimeHorizon::from_months(start, end)?,
            None => TimeHorizon::rolling(start.first_day(), default_months)?,
        };
        Ok(horizon)
    }

    pub fn staff_mode(&self) -> Result<StaffFilterMode, ApiError> {
        let staff_ids = parse_staff_ids(self.staff.as_deref().unwrap_or_default())?;
        Ok(StaffFilterMode::parse(self.mode.as_deref(), &staff_ids)?)
    }

    pub fn filters(&self, include_inactive_default: bool) -> Result<DemandFilters, ApiError> {
        let skills = self.skills.as_deref().map(|raw| {
            split_list(raw)
                .map(str::to_string)
                .collect::<BTreeSet<_>>()
        });
        let client_ids = self
            .clients
            .as_deref()
            .map(|raw| {
                split_list(raw)
                    .map(|id| {
                        Uuid::parse_str(id)
                            .map_err(|_| ApiError::BadRequest(format!("invalid client id: {id}")))
                    })
                    .collect::<Result<HashSet<_>, _>>()
            })
            .transpose()?;

        Ok(DemandFilters {
            include_inactive: self.include_inactive.unwrap_or(include_inactive_default),
            skills,
            client_ids,
            staff: self.staff_mode()?,
        })
    }

    pub fn export_format(&self) -> Result<ExportFormat, ApiError> {
        match self.format.as_deref() {
            None => Ok(ExportFormat::default()),
            Some(raw) => raw
                .parse()
                .map_err(|_| ApiError::BadRequest(format!("unsupported export format: {raw}"))),
        }
    }
}

fn split_list(raw: &str) -> impl Iterator<Item = &str> {
    raw.split(',').map(str::trim).filter(|item| !item.is_empty())
}

async fn load_demand(state: &AppState, query: &ForecastQuery) -> Result<DemandMatrix, ApiError> {
    let config = state.config();
    let horizon = query.horizon(Utc::now().date_naive(), config.horizon_months)?;
    let filters = query.filters(config.include_inactive_tasks)?;
    Ok(state
        .demand()
        .generate_demand_forecast(&horizon, &filters)
        .await?)
}

/// GET /api/demand-forecast
pub async fn get_demand_forecast(
    State(state): State<AppState>,
    Query(query): Query<ForecastQuery>,
) -> Result<ResponseJson<ApiResponse<DemandMatrix>>, ApiError> {
    let matrix = load_demand(&state, &query).await?;
    Ok(ResponseJson(ApiResponse::success(matrix)))
}

/// GET /api/demand-forecast/export?format=csv|json
pub async fn export_demand_forecast(
    State(state): State<AppState>,
    Query(query): Query<ForecastQuery>,
) -> Result<Response, ApiError> {
    let format = query.export_format()?;
    let matrix = load_demand(&state, &query).await?;
    let body = export(&matrix, format)?;
    info!(%format, rows = matrix.data_points.len(), "Exported demand forecast");
    Ok(attachment(format, "demand-forecast", body))
}

/// GET /api/demand-forecast/clients/export
pub async fn export_client_totals(
    State(state): State<AppState>,
    Query(query): Query<ForecastQuery>,
) -> Result<Response, ApiError> {
    let matrix = load_demand(&state, &query).await?;
    Ok(attachment(
        ExportFormat::Csv,
        "client-demand",
        export_client_totals_csv(&matrix.client_totals),
    ))
}

/// GET /api/capacity-forecast
pub async fn get_capacity_forecast(
    State(state): State<AppState>,
    Query(query): Query<ForecastQuery>,
) -> Result<ResponseJson<ApiResponse<ForecastMatrix>>, ApiError> {
    let demand = load_demand(&state, &query).await?;
    let horizon = query.horizon(Utc::now().date_naive(), state.config().horizon_months)?;
    let capacity = state
        .capacity()
        .generate_capacity(&horizon, &query.staff_mode()?)
        .await?;
    Ok(ResponseJson(ApiResponse::success(build_forecast_matrix(
        &demand, &capacity,
    ))))
}

fn attachment(format: ExportFormat, stem: &str, body: String) -> Response {
    let disposition = format!(
        "attachment; filename=\"{stem}.{}\"",
        format.file_extension()
    );
    (
        [
            (header::CONTENT_TYPE, format.content_type().to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        body,
    )
        .into_response()
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/demand-forecast", get(get_demand_forecast))
        .route("/demand-forecast/export", get(export_demand_forecast))
        .route("/demand-forecast/clients/export", get(export_client_totals))
        .route("/capacity-forecast", get(get_capacity_forecast))
}
