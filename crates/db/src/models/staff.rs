use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool, Type};
use strum_macros::{Display, EnumString};
use ts_rs::TS;
use uuid::Uuid;

use super::skill_refs::{ParsedSkillRefs, encode_skill_refs, parse_skill_refs};

#[derive(
    Debug, Clone, Type, Serialize, Deserialize, PartialEq, TS, EnumString, Display, Default,
)]
#[sqlx(type_name = "staff_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum StaffStatus {
    #[default]
    Active,
    Inactive,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct Staff {
    pub id: Uuid,
    pub full_name: String,
    pub assigned_skills: String, // JSON array of skill UUIDs or names
    pub cost_per_hour: f64,
    pub weekly_capacity_hours: f64,
    pub status: StaffStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct CreateStaff {
    pub full_name: String,
    pub assigned_skills: Vec<String>,
    pub cost_per_hour: Option<f64>,
    pub weekly_capacity_hours: Option<f64>,
}

const STAFF_COLUMNS: &str = "id, full_name, assigned_skills, cost_per_hour, weekly_capacity_hours, status, created_at, updated_at";

impl Staff {
    pub fn skill_references(&self) -> ParsedSkillRefs {
        parse_skill_refs(&self.assigned_skills)
    }

    pub async fn find_all(pool: &SqlitePool) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Staff>(&format!(
            "SELECT {STAFF_COLUMNS} FROM staff ORDER BY full_name ASC"
        ))
        .fetch_all(pool)
        .await
    }

    pub async fn find_active(pool: &SqlitePool) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Staff>(&format!(
            "SELECT {STAFF_COLUMNS} FROM staff WHERE status = 'active' ORDER BY full_name ASC"
        ))
        .fetch_all(pool)
        .await
    }

    pub async fn find_by_id(pool: &SqlitePool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Staff>(&format!("SELECT {STAFF_COLUMNS} FROM staff WHERE id = $1"))
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn create(
        pool: &SqlitePool,
        data: &CreateStaff,
        staff_id: Uuid,
    ) -> Result<Self, sqlx::Error> {
        let assigned_skills = encode_skill_refs(&data.assigned_skills)?;
        sqlx::query_as::<_, Staff>(&format!(
            "INSERT INTO staff (id, full_name, assigned_skills, cost_per_hour, weekly_capacity_hours)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {STAFF_COLUMNS}"
        ))
        .bind(staff_id)
        .bind(data.full_name.trim())
        .bind(assigned_skills)
        .bind(data.cost_per_hour.unwrap_or(0.0))
        .bind(data.weekly_capacity_hours.unwrap_or(40.0))
        .fetch_one(pool)
        .await
    }

    pub async fn update_status(
        pool: &SqlitePool,
        id: Uuid,
        status: StaffStatus,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE staff SET status = $2, updated_at = datetime('now', 'subsec') WHERE id = $1",
        )
        .bind(id)
        .bind(status)
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }
}
