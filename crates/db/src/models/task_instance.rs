use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool, Type};
use strum_macros::{Display, EnumString};
use ts_rs::TS;
use uuid::Uuid;

#[derive(
    Debug, Clone, Type, Serialize, Deserialize, PartialEq, TS, EnumString, Display, Default,
)]
#[sqlx(type_name = "task_instance_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum TaskInstanceStatus {
    #[default]
    NotStarted,
    InProgress,
    Completed,
    Cancelled,
}

/// A dated, schedulable occurrence of a recurring task
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct TaskInstance {
    pub id: Uuid,
    pub recurring_task_id: Option<Uuid>,
    pub client_id: Uuid,
    pub name: String,
    pub required_skills: String,
    pub estimated_hours: f64,
    pub due_date: NaiveDate,
    pub status: TaskInstanceStatus,
    pub assigned_staff_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CreateTaskInstance {
    pub recurring_task_id: Option<Uuid>,
    pub client_id: Uuid,
    pub name: String,
    pub required_skills: String,
    pub estimated_hours: f64,
    pub due_date: NaiveDate,
    pub assigned_staff_id: Option<Uuid>,
}

const TASK_INSTANCE_COLUMNS: &str = "id, recurring_task_id, client_id, name, required_skills, estimated_hours, due_date, status, assigned_staff_id, created_at, updated_at";

impl TaskInstance {
    /// Insert unless an instance for the same recurring task and due date exists.
    /// Returns `None` when the row was already there.
    pub async fn create_if_absent(
        pool: &SqlitePool,
        data: &CreateTaskInstance,
        instance_id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, TaskInstance>(&format!(
            "INSERT INTO task_instances (id, recurring_task_id, client_id, name, required_skills, estimated_hours, due_date, assigned_staff_id)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
             ON CONFLICT (recurring_task_id, due_date) DO NOTHING
             RETURNING {TASK_INSTANCE_COLUMNS}"
        ))
        .bind(instance_id)
        .bind(data.recurring_task_id)
        .bind(data.client_id)
        .bind(&data.name)
        .bind(&data.required_skills)
        .bind(data.estimated_hours)
        .bind(data.due_date)
        .bind(data.assigned_staff_id)
        .fetch_optional(pool)
        .await
    }

    pub async fn find_due_between(
        pool: &SqlitePool,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, TaskInstance>(&format!(
            "SELECT {TASK_INSTANCE_COLUMNS} FROM task_instances
             WHERE due_date >= $1 AND due_date <= $2
             ORDER BY due_date ASC, name ASC"
        ))
        .bind(start)
        .bind(end)
        .fetch_all(pool)
        .await
    }

    pub async fn find_by_recurring_task_id(
        pool: &SqlitePool,
        recurring_task_id: Uuid,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, TaskInstance>(&format!(
            "SELECT {TASK_INSTANCE_COLUMNS} FROM task_instances
             WHERE recurring_task_id = $1
             ORDER BY due_date ASC"
        ))
        .bind(recurring_task_id)
        .fetch_all(pool)
        .await
    }

    pub async fn update_status(
        pool: &SqlitePool,
        id: Uuid,
        status: TaskInstanceStatus,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE task_instances SET status = $2, updated_at = datetime('now', 'subsec') WHERE id = $1",
        )
        .bind(id)
        .bind(status)
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }
}
