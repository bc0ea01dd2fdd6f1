//! Batch client-id -> client record resolution with a per-entry TTL cache.

use std::{collections::HashMap, sync::Arc, time::Duration};

use db::{DBService, models::client::ClientRevenueRecord};
use moka::future::Cache;
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

pub const DEFAULT_CLIENT_CACHE_TTL: Duration = Duration::from_secs(5 * 60);
pub const DEFAULT_CLIENT_CACHE_CAPACITY: u64 = 10_000;
pub const UNKNOWN_CLIENT_PREFIX: &str = "Unknown Client";

#[derive(Debug, Error)]
pub enum ClientResolutionError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

pub fn unknown_client_placeholder(client_id: Uuid) -> String {
    let id = client_id.to_string();
    format!("{UNKNOWN_CLIENT_PREFIX} ({})", &id[..8])
}

#[derive(Clone)]
pub struct ClientResolutionService {
    db: DBService,
    cache: Cache<Uuid, Arc<ClientRevenueRecord>>,
}

impl ClientResolutionService {
    pub fn new(db: DBService) -> Self {
        Self::with_cache_settings(db, DEFAULT_CLIENT_CACHE_CAPACITY, DEFAULT_CLIENT_CACHE_TTL)
    }

    pub fn with_cache_settings(db: DBService, max_capacity: u64, ttl: Duration) -> Self {
        Self {
            db,
            cache: Cache::builder()
                .max_capacity(max_capacity)
                .time_to_live(ttl)
                .build(),
        }
    }

    /// Records for every id that exists. Cached ids skip the database; the
    /// rest are fetched in one query.
    pub async fn resolve(
        &self,
        client_ids: &[Uuid],
    ) -> Result<HashMap<Uuid, ClientRevenueRecord>, ClientResolutionError> {
        let mut resolved = HashMap::with_capacity(client_ids.len());
        let mut misses = Vec::new();

        for id in client_ids {
            if resolved.contains_key(id) || misses.contains(id) {
                continue;
            }
            match self.cache.get(id).await {
                Some(record) => {
                    resolved.insert(*id, record.as_ref().clone());
                }
                None => misses.push(*id),
            }
        }

        if !misses.is_empty() {
            debug!(
                cached = resolved.len(),
                fetching = misses.len(),
                "Resolving clients"
            );
            let records = ClientRevenueRecord::find_by_ids(&self.db.pool, &misses).await?;
            for record in records {
                self.cache.insert(record.id, Arc::new(record.clone())).await;
                resolved.insert(record.id, record);
            }
        }

        Ok(resolved)
    }

    pub async fn resolve_names(
        &self,
        client_ids: &[Uuid],
    ) -> Result<HashMap<Uuid, String>, ClientResolutionError> {
        Ok(self
            .resolve(client_ids)
            .await?
            .into_iter()
            .map(|(id, record)| (id, record.legal_name))
            .collect())
    }

    pub fn invalidate_all(&self) {
        self.cache.invalidate_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::test_support::seed_client;

    #[tokio::test]
    async fn test_resolves_known_clients_only() {
        let db = DBService::new_in_memory().await.unwrap();
        let acme = seed_client(&db, "Acme LLC").await;
        let missing = Uuid::new_v4();
        let service = ClientResolutionService::new(db);

        let names = service.resolve_names(&[acme, missing, acme]).await.unwrap();
        assert_eq!(names.len(), 1);
        assert_eq!(names[&acme], "Acme LLC");
    }

    #[tokio::test]
    async fn test_cached_records_survive_row_changes_until_invalidated() {
        let db = DBService::new_in_memory().await.unwrap();
        let acme = seed_client(&db, "Acme LLC").await;
        let service = ClientResolutionService::new(db.clone());
        service.resolve(&[acme]).await.unwrap();

        sqlx::query("UPDATE clients SET legal_name = 'Acme Holdings' WHERE id = $1")
            .bind(acme)
            .execute(&db.pool)
            .await
            .unwrap();
        assert_eq!(service.resolve_names(&[acme]).await.unwrap()[&acme], "Acme LLC");

        service.invalidate_all();
        assert_eq!(service.resolve_names(&[acme]).await.unwrap()[&acme], "Acme Holdings");
    }

    #[test]
    fn test_placeholder_uses_id_prefix() {
        let id = Uuid::parse_str("7f8c2a64-1d2b-4c4e-9f57-2a9d3c1b0e11").unwrap();
        assert_eq!(unknown_client_placeholder(id), "Unknown Client (7f8c2a64)");
    }
}
