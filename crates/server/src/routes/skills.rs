use axum::{
    Router,
    extract::{Path, State},
    response::Json as ResponseJson,
    routing::{delete, get, post},
};
use db::models::skill::{CreateSkill, Skill};
use serde::{Deserialize, Serialize};
use services::services::{
    skill_mapping::{get_mapping, normalize_skill_name},
    skill_resolver::SkillResolution,
    skill_validator::SkillValidationReport,
};
use sqlx::SqlitePool;
use ts_rs::TS;
use utils::response::ApiResponse;
use uuid::Uuid;

use crate::{AppState, error::ApiError};

#[derive(Debug, Clone, Deserialize, TS)]
pub struct SkillReferencesRequest {
    pub references: Vec<String>,
}

#[derive(Debug, Clone, Serialize, TS)]
pub struct CacheRefreshResponse {
    pub entries: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, TS)]
pub struct NormalizedSkill {
    pub input: String,
    pub canonical: String,
    /// Whether a mapping rule matched, as opposed to a whitespace-only cleanup
    pub mapped: bool,
}

pub fn normalize_all(names: &[String]) -> Vec<NormalizedSkill> {
    names
        .iter()
        .map(|input| NormalizedSkill {
            input: input.clone(),
            canonical: normalize_skill_name(input),
            mapped: get_mapping(input).is_some(),
        })
        .collect()
}

/// Skill names are unique ignoring case
async fn check_name_available(pool: &SqlitePool, name: &str) -> Result<(), ApiError> {
    if let Some(existing) = Skill::find_by_name(pool, name).await? {
        return Err(ApiError::BadRequest(format!(
            "skill {:?} already exists as {}",
            existing.name, existing.id
        )));
    }
    Ok(())
}

/// GET /api/skills
pub async fn list_skills(
    State(state): State<AppState>,
) -> Result<ResponseJson<ApiResponse<Vec<Skill>>>, ApiError> {
    let skills = Skill::find_all(&state.db().pool).await?;
    Ok(ResponseJson(ApiResponse::success(skills)))
}

/// POST /api/skills
pub async fn create_skill(
    State(state): State<AppState>,
    axum::Json(payload): axum::Json<CreateSkill>,
) -> Result<ResponseJson<ApiResponse<Skill>>, ApiError> {
    if payload.name.trim().is_empty() {
        return Err(ApiError::BadRequest("skill name must not be blank".to_string()));
    }
    check_name_available(&state.db().pool, &payload.name).await?;
    let skill = Skill::create(&state.db().pool, &payload, Uuid::new_v4()).await?;
    state
        .skill_cache()
        .insert(skill.id, skill.name.clone())
        .await;
    Ok(ResponseJson(ApiResponse::success(skill)))
}

/// DELETE /api/skills/{skill_id}
pub async fn delete_skill(
    State(state): State<AppState>,
    Path(skill_id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    if Skill::delete(&state.db().pool, skill_id).await? == 0 {
        return Err(ApiError::NotFound(format!("skill {skill_id} not found")));
    }
    // Removal is rare; drop the whole snapshot so the next read reloads it
    state.skill_cache().clear().await;
    Ok(ResponseJson(ApiResponse::success(())))
}

/// POST /api/skills/resolve
pub async fn resolve_skills(
    State(state): State<AppState>,
    axum::Json(payload): axum::Json<SkillReferencesRequest>,
) -> Result<ResponseJson<ApiResponse<Vec<SkillResolution>>>, ApiError> {
    let resolutions = state.resolver().resolve(&payload.references).await;
    Ok(ResponseJson(ApiResponse::success(resolutions)))
}

/// POST /api/skills/validate
pub async fn validate_skills(
    State(state): State<AppState>,
    axum::Json(payload): axum::Json<SkillReferencesRequest>,
) -> Result<ResponseJson<ApiResponse<SkillValidationReport>>, ApiError> {
    let report = state
        .validator()
        .validate_skill_references(&payload.references)
        .await;
    Ok(ResponseJson(ApiResponse::success(report)))
}

/// POST /api/skills/normalize
pub async fn normalize_skills(
    axum::Json(payload): axum::Json<SkillReferencesRequest>,
) -> ResponseJson<ApiResponse<Vec<NormalizedSkill>>> {
    ResponseJson(ApiResponse::success(normalize_all(&payload.references)))
}

/// POST /api/skills/cache/refresh
pub async fn refresh_skill_cache(
    State(state): State<AppState>,
) -> Result<ResponseJson<ApiResponse<CacheRefreshResponse>>, ApiError> {
    let entries = state.skill_cache().refresh().await?;
    state.clients().invalidate_all();
    Ok(ResponseJson(ApiResponse::success(CacheRefreshResponse { entries })))
}

pub fn router() -> Router<AppState> {
    Router::new().nest(
        "/skills",
        Router::new()
            .route("/", get(list_skills).post(create_skill))
            .route("/{skill_id}", delete(delete_skill))
            .route("/resolve", post(resolve_skills))
            .route("/validate", post(validate_skills))
            .route("/normalize", post(normalize_skills))
            .route("/cache/refresh", post(refresh_skill_cache)),
    )
}

#[cfg(test)]
mod tests {
    use db::DBService;

    use super::*;

    #[tokio::test]
    async fn test_duplicate_skill_names_are_rejected() {
        let db = DBService::new_in_memory().await.unwrap();
        Skill::create(&db.pool, &CreateSkill::named("CPA"), Uuid::new_v4())
            .await
            .unwrap();

        let err = check_name_available(&db.pool, " cpa ").await.unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(_)));
        assert!(check_name_available(&db.pool, "Payroll").await.is_ok());
    }

    #[test]
    fn test_normalize_all_reports_mapping_hits() {
        let normalized = normalize_all(&["senior staff ".to_string(), "Forensics".to_string()]);
        assert_eq!(
            normalized[0],
            NormalizedSkill {
                input: "senior staff ".to_string(),
                canonical: "Senior".to_string(),
                mapped: true,
            }
        );
        assert_eq!(normalized[1].canonical, "Forensics");
        assert!(!normalized[1].mapped);
    }
}
