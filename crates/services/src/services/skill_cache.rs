//! In-memory id <-> name projection of the `skills` table.
//!
//! The whole projection is reloaded once per TTL window and replaced
//! wholesale; there is no per-entry expiry. Losing it only costs a reload.

use std::{collections::HashMap, sync::Arc, time::Duration};

use async_trait::async_trait;
use db::{DBService, models::skill::Skill};
use thiserror::Error;
use tokio::{sync::RwLock, time::Instant};
use uuid::Uuid;

use super::{
    events::{PipelineEvent, PipelineObserver, TracingObserver},
    skill_mapping::normalize_key,
};

pub const DEFAULT_SKILL_CACHE_TTL: Duration = Duration::from_secs(5 * 60);

#[derive(Debug, Error)]
pub enum SkillCacheError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Where skill rows come from
#[async_trait]
pub trait SkillStore: Send + Sync {
    async fn load_skills(&self) -> Result<Vec<Skill>, sqlx::Error>;

    async fn find_skill(&self, id: Uuid) -> Result<Option<Skill>, sqlx::Error>;
}

#[async_trait]
impl SkillStore for DBService {
    async fn load_skills(&self) -> Result<Vec<Skill>, sqlx::Error> {
        Skill::find_all(&self.pool).await
    }

    async fn find_skill(&self, id: Uuid) -> Result<Option<Skill>, sqlx::Error> {
        Skill::find_by_id(&self.pool, id).await
    }
}

#[derive(Default)]
struct SkillCacheState {
    by_id: HashMap<Uuid, String>,
    by_name: HashMap<String, Uuid>, // keyed by normalize_key(name)
    loaded_at: Option<Instant>,
}

pub struct SkillCacheManager {
    store: Arc<dyn SkillStore>,
    ttl: Duration,
    state: RwLock<SkillCacheState>,
    observer: Arc<dyn PipelineObserver>,
}

impl SkillCacheManager {
    pub fn new(store: Arc<dyn SkillStore>) -> Self {
        Self::with_ttl(store, DEFAULT_SKILL_CACHE_TTL)
    }

    pub fn with_ttl(store: Arc<dyn SkillStore>, ttl: Duration) -> Self {
        Self {
            store,
            ttl,
            state: RwLock::new(SkillCacheState::default()),
            observer: Arc::new(TracingObserver),
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn PipelineObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn store(&self) -> &Arc<dyn SkillStore> {
        &self.store
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Load the skills table unless the cache is still fresh. Returns the entry count.
    pub async fn initialize(&self) -> Result<usize, SkillCacheError> {
        if self.is_cache_valid().await {
            return Ok(self.len().await);
        }
        self.refresh().await
    }

    /// Reload unconditionally. On failure the previous entries stay in place.
    pub async fn refresh(&self) -> Result<usize, SkillCacheError> {
        let skills = match self.store.load_skills().await {
            Ok(skills) => skills,
            Err(e) => {
                self.observer.record(&PipelineEvent::SkillCacheRefreshFailed {
                    error: e.to_string(),
                });
                return Err(e.into());
            }
        };

        let mut by_id = HashMap::with_capacity(skills.len());
        let mut by_name = HashMap::with_capacity(skills.len());
        for skill in skills {
            by_name.insert(normalize_key(&skill.name), skill.id);
            by_id.insert(skill.id, skill.name);
        }
        let entries = by_id.len();

        {
            let mut state = self.state.write().await;
            state.by_id = by_id;
            state.by_name = by_name;
            state.loaded_at = Some(Instant::now());
        }

        self.observer
            .record(&PipelineEvent::SkillCacheRefreshed { entries });
        Ok(entries)
    }

    pub async fn is_cache_valid(&self) -> bool {
        let state = self.state.read().await;
        state
            .loaded_at
            .is_some_and(|loaded_at| loaded_at.elapsed() < self.ttl)
    }

    pub async fn get_name_by_id(&self, id: Uuid) -> Option<String> {
        self.state.read().await.by_id.get(&id).cloned()
    }

    /// Case- and whitespace-insensitive name lookup
    pub async fn get_id_by_name(&self, name: &str) -> Option<Uuid> {
        self.state
            .read()
            .await
            .by_name
            .get(&normalize_key(name))
            .copied()
    }

    /// Write-through for rows found by a point query. Does not extend the TTL.
    pub async fn insert(&self, id: Uuid, name: String) {
        let mut state = self.state.write().await;
        state.by_name.insert(normalize_key(&name), id);
        state.by_id.insert(id, name);
    }

    pub async fn clear(&self) {
        *self.state.write().await = SkillCacheState::default();
    }

    pub async fn len(&self) -> usize {
        self.state.read().await.by_id.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
