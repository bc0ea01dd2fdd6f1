use std::sync::Arc;

use db::DBService;
use services::services::{
    capacity::CapacityService,
    client_resolution::ClientResolutionService,
    config::ForecastConfig,
    demand::DemandDataService,
    events::{PipelineObserver, TracingObserver},
    skill_cache::SkillCacheManager,
    skill_resolver::SkillResolver,
    skill_validator::SkillValidator,
    task_scheduler::TaskSchedulerService,
};

/// Shared services handed to every route. One skill cache and one client
/// cache back the whole process.
#[derive(Clone)]
pub struct AppState {
    db: DBService,
    config: Arc<ForecastConfig>,
    skill_cache: Arc<SkillCacheManager>,
    resolver: Arc<SkillResolver>,
    validator: Arc<SkillValidator>,
    clients: ClientResolutionService,
    demand: Arc<DemandDataService>,
    capacity: Arc<CapacityService>,
    scheduler: TaskSchedulerService,
}

impl AppState {
    pub fn new(db: DBService, config: ForecastConfig) -> Self {
        Self::with_observer(db, config, Arc::new(TracingObserver))
    }

    pub fn with_observer(
        db: DBService,
        config: ForecastConfig,
        observer: Arc<dyn PipelineObserver>,
    ) -> Self {
        let skill_cache = Arc::new(
            SkillCacheManager::with_ttl(Arc::new(db.clone()), config.skill_cache_ttl())
                .with_observer(observer.clone()),
        );
        let resolver =
            Arc::new(SkillResolver::new(skill_cache.clone()).with_observer(observer.clone()));
        let validator = Arc::new(SkillValidator::new(skill_cache.clone()));
        let clients = ClientResolutionService::with_cache_settings(
            db.clone(),
            config.client_cache_capacity,
            config.client_cache_ttl(),
        );
        let demand = Arc::new(
            DemandDataService::new(db.clone(), resolver.clone(), clients.clone())
                .with_observer(observer),
        );
        let capacity = Arc::new(CapacityService::new(db.clone(), resolver.clone()));
        let scheduler = TaskSchedulerService::new(db.clone());

        Self {
            db,
            config: Arc::new(config),
            skill_cache,
            resolver,
            validator,
            clients,
            demand,
            capacity,
            scheduler,
        }
    }

    pub fn db(&self) -> &DBService {
        &self.db
    }

    pub fn config(&self) -> &ForecastConfig {
        &self.config
    }

    pub fn skill_cache(&self) -> &Arc<SkillCacheManager> {
        &self.skill_cache
    }

    pub fn resolver(&self) -> &Arc<SkillResolver> {
        &self.resolver
    }

    pub fn validator(&self) -> &Arc<SkillValidator> {
        &self.validator
    }

    pub fn clients(&self) -> &ClientResolutionService {
        &self.clients
    }

    pub fn demand(&self) -> &Arc<DemandDataService> {
        &self.demand
    }

    pub fn capacity(&self) -> &Arc<CapacityService> {
        &self.capacity
    }

    pub fn scheduler(&self) -> &TaskSchedulerService {
        &self.scheduler
    }
}
