use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, QueryBuilder, Sqlite, SqlitePool, Type};
use strum_macros::{Display, EnumString};
use ts_rs::TS;
use uuid::Uuid;

#[derive(
    Debug, Clone, Type, Serialize, Deserialize, PartialEq, TS, EnumString, Display, Default,
)]
#[sqlx(type_name = "client_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ClientStatus {
    #[default]
    Active,
    Inactive,
    Archived,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct Client {
    pub id: Uuid,
    pub legal_name: String,
    pub expected_monthly_revenue: f64,
    pub status: ClientStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The slice of a client the forecast needs for naming and revenue totals
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize, TS)]
pub struct ClientRevenueRecord {
    pub id: Uuid,
    pub legal_name: String,
    pub expected_monthly_revenue: f64,
}

impl From<Client> for ClientRevenueRecord {
    fn from(client: Client) -> Self {
        Self {
            id: client.id,
            legal_name: client.legal_name,
            expected_monthly_revenue: client.expected_monthly_revenue,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct CreateClient {
    pub legal_name: String,
    pub expected_monthly_revenue: Option<f64>,
    pub status: Option<ClientStatus>,
}

impl CreateClient {
    pub fn named(legal_name: impl Into<String>) -> Self {
        Self {
            legal_name: legal_name.into(),
            expected_monthly_revenue: None,
            status: None,
        }
    }
}

const CLIENT_COLUMNS: &str =
    "id, legal_name, expected_monthly_revenue, status, created_at, updated_at";

impl Client {
    pub async fn find_all(pool: &SqlitePool) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Client>(&format!(
            "SELECT {CLIENT_COLUMNS} FROM clients ORDER BY legal_name ASC"
        ))
        .fetch_all(pool)
        .await
    }

    pub async fn find_by_id(pool: &SqlitePool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Client>(&format!("SELECT {CLIENT_COLUMNS} FROM clients WHERE id = $1"))
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn create(
        pool: &SqlitePool,
        data: &CreateClient,
        client_id: Uuid,
    ) -> Result<Self, sqlx::Error> {
        let status = data.status.clone().unwrap_or_default();
        let revenue = data.expected_monthly_revenue.unwrap_or(0.0);
        sqlx::query_as::<_, Client>(&format!(
            "INSERT INTO clients (id, legal_name, expected_monthly_revenue, status)
             VALUES ($1, $2, $3, $4)
             RETURNING {CLIENT_COLUMNS}"
        ))
        .bind(client_id)
        .bind(data.legal_name.trim())
        .bind(revenue)
        .bind(status)
        .fetch_one(pool)
        .await
    }
}

impl ClientRevenueRecord {
    /// Batch lookup in a single `IN (...)` query. Unknown ids are simply absent.
    pub async fn find_by_ids(pool: &SqlitePool, ids: &[Uuid]) -> Result<Vec<Self>, sqlx::Error> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(
            "SELECT id, legal_name, expected_monthly_revenue FROM clients WHERE id IN (",
        );
        let mut separated = builder.separated(", ");
        for id in ids {
            separated.push_bind(*id);
        }
        separated.push_unseparated(")");

        builder.build_query_as::<ClientRevenueRecord>().fetch_all(pool).await
    }
}
