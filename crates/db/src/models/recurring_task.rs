use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool, Type};
use strum_macros::{Display, EnumString};
use ts_rs::TS;
use uuid::Uuid;

use super::skill_refs::{ParsedSkillRefs, encode_skill_refs, parse_skill_refs};

#[derive(
    Debug, Clone, Copy, Type, Serialize, Deserialize, PartialEq, Eq, TS, EnumString, Display,
    Default,
)]
#[sqlx(type_name = "recurrence_type", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum RecurrenceType {
    Daily,
    Weekly,
    #[default]
    Monthly,
    Quarterly,
    Annually,
    /// A single occurrence in the anchor month
    Once,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct RecurringTask {
    pub id: Uuid,
    pub client_id: Uuid,
    pub name: String,
    pub required_skills: String, // JSON array of skill UUIDs or names
    pub estimated_hours: f64,
    pub recurrence_type: RecurrenceType,
    pub recurrence_anchor: Option<NaiveDate>, // First due date; drives quarter/year alignment
    pub preferred_staff_id: Option<Uuid>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct CreateRecurringTask {
    pub client_id: Uuid,
    pub name: String,
    pub required_skills: Vec<String>,
    pub estimated_hours: f64,
    pub recurrence_type: Option<RecurrenceType>,
    pub recurrence_anchor: Option<NaiveDate>,
    pub preferred_staff_id: Option<Uuid>,
}

impl CreateRecurringTask {
    pub fn monthly(
        client_id: Uuid,
        name: impl Into<String>,
        required_skills: Vec<String>,
        estimated_hours: f64,
    ) -> Self {
        Self {
            client_id,
            name: name.into(),
            required_skills,
            estimated_hours,
            recurrence_type: Some(RecurrenceType::Monthly),
            recurrence_anchor: None,
            preferred_staff_id: None,
        }
    }
}

/// Nullable fields are tri-state: absent keeps the stored value, `null` clears it.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
pub struct UpdateRecurringTask {
    pub name: Option<String>,
    pub required_skills: Option<Vec<String>>,
    pub estimated_hours: Option<f64>,
    pub recurrence_type: Option<RecurrenceType>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "serde_with::rust::double_option"
    )]
    #[ts(optional)]
    pub recurrence_anchor: Option<Option<NaiveDate>>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "serde_with::rust::double_option"
    )]
    #[ts(optional)]
    pub preferred_staff_id: Option<Option<Uuid>>,
}

const RECURRING_TASK_COLUMNS: &str = "id, client_id, name, required_skills, estimated_hours, recurrence_type, recurrence_anchor, preferred_staff_id, is_active, created_at, updated_at";

impl RecurringTask {
    pub fn skill_references(&self) -> ParsedSkillRefs {
        parse_skill_refs(&self.required_skills)
    }

    pub async fn find_all(pool: &SqlitePool) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, RecurringTask>(&format!(
            "SELECT {RECURRING_TASK_COLUMNS} FROM recurring_tasks ORDER BY created_at ASC"
        ))
        .fetch_all(pool)
        .await
    }

    pub async fn find_active(pool: &SqlitePool) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, RecurringTask>(&format!(
            "SELECT {RECURRING_TASK_COLUMNS} FROM recurring_tasks
             WHERE is_active = 1
             ORDER BY created_at ASC"
        ))
        .fetch_all(pool)
        .await
    }

    pub async fn find_by_id(pool: &SqlitePool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, RecurringTask>(&format!(
            "SELECT {RECURRING_TASK_COLUMNS} FROM recurring_tasks WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    pub async fn find_by_client_id(
        pool: &SqlitePool,
        client_id: Uuid,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, RecurringTask>(&format!(
            "SELECT {RECURRING_TASK_COLUMNS} FROM recurring_tasks
             WHERE client_id = $1
             ORDER BY created_at ASC"
        ))
        .bind(client_id)
        .fetch_all(pool)
        .await
    }

    pub async fn create(
        pool: &SqlitePool,
        data: &CreateRecurringTask,
        task_id: Uuid,
    ) -> Result<Self, sqlx::Error> {
        let required_skills = encode_skill_refs(&data.required_skills)?;
        let recurrence_type = data.recurrence_type.unwrap_or_default();
        sqlx::query_as::<_, RecurringTask>(&format!(
            "INSERT INTO recurring_tasks (id, client_id, name, required_skills, estimated_hours, recurrence_type, recurrence_anchor, preferred_staff_id)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
             RETURNING {RECURRING_TASK_COLUMNS}"
        ))
        .bind(task_id)
        .bind(data.client_id)
        .bind(data.name.trim())
        .bind(required_skills)
        .bind(data.estimated_hours)
        .bind(recurrence_type)
        .bind(data.recurrence_anchor)
        .bind(data.preferred_staff_id)
        .fetch_one(pool)
        .await
    }

    /// Apply the fields present in `data`; absent fields keep their stored value.
    pub async fn update(
        pool: &SqlitePool,
        id: Uuid,
        data: &UpdateRecurringTask,
    ) -> Result<Option<Self>, sqlx::Error> {
        let Some(existing) = Self::find_by_id(pool, id).await? else {
            return Ok(None);
        };

        let required_skills = match &data.required_skills {
            Some(skills) => encode_skill_refs(skills)?,
            None => existing.required_skills,
        };
        let name = data
            .name
            .as_deref()
            .map(str::trim)
            .unwrap_or(existing.name.as_str())
            .to_string();

        sqlx::query_as::<_, RecurringTask>(&format!(
            "UPDATE recurring_tasks
             SET name = $2, required_skills = $3, estimated_hours = $4, recurrence_type = $5,
                 recurrence_anchor = $6, preferred_staff_id = $7,
                 updated_at = datetime('now', 'subsec')
             WHERE id = $1
             RETURNING {RECURRING_TASK_COLUMNS}"
        ))
        .bind(id)
        .bind(name)
        .bind(required_skills)
        .bind(data.estimated_hours.unwrap_or(existing.estimated_hours))
        .bind(data.recurrence_type.unwrap_or(existing.recurrence_type))
        .bind(data.recurrence_anchor.unwrap_or(existing.recurrence_anchor))
        .bind(data.preferred_staff_id.unwrap_or(existing.preferred_staff_id))
        .fetch_optional(pool)
        .await
    }

    /// Soft-disable; recurring tasks are never hard-deleted
    pub async fn set_active(pool: &SqlitePool, id: Uuid, is_active: bool) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE recurring_tasks SET is_active = $2, updated_at = datetime('now', 'subsec') WHERE id = $1",
        )
        .bind(id)
        .bind(is_active)
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }
}
