use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};
use ts_rs::TS;
use uuid::Uuid;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct Skill {
    pub id: Uuid,
    pub name: String,
    pub category: Option<String>,
    pub proficiency_level: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct CreateSkill {
    pub name: String,
    pub category: Option<String>,
    pub proficiency_level: Option<String>,
}

impl CreateSkill {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            category: None,
            proficiency_level: None,
        }
    }
}

const SKILL_COLUMNS: &str = "id, name, category, proficiency_level, created_at, updated_at";

impl Skill {
    pub async fn find_all(pool: &SqlitePool) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Skill>(&format!(
            "SELECT {SKILL_COLUMNS} FROM skills ORDER BY name ASC"
        ))
        .fetch_all(pool)
        .await
    }

    pub async fn find_by_id(pool: &SqlitePool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Skill>(&format!("SELECT {SKILL_COLUMNS} FROM skills WHERE id = $1"))
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Case-insensitive lookup by display name
    pub async fn find_by_name(pool: &SqlitePool, name: &str) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Skill>(&format!(
            "SELECT {SKILL_COLUMNS} FROM skills WHERE name = $1 COLLATE NOCASE LIMIT 1"
        ))
        .bind(name.trim())
        .fetch_optional(pool)
        .await
    }

    pub async fn create(
        pool: &SqlitePool,
        data: &CreateSkill,
        skill_id: Uuid,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Skill>(&format!(
            "INSERT INTO skills (id, name, category, proficiency_level)
             VALUES ($1, $2, $3, $4)
             RETURNING {SKILL_COLUMNS}"
        ))
        .bind(skill_id)
        .bind(data.name.trim())
        .bind(&data.category)
        .bind(&data.proficiency_level)
        .fetch_one(pool)
        .await
    }

    pub async fn delete(pool: &SqlitePool, id: Uuid) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM skills WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }
}
