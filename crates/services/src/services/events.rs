//! Structured pipeline events.
//!
//! The forecasting pipeline reports what it did (cache refreshes, point
//! queries, unresolved references) to an injected [`PipelineObserver`]
//! instead of writing ad-hoc log lines.

use std::sync::Mutex;

use serde::Serialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PipelineEvent {
    SkillCacheRefreshed { entries: usize },
    SkillCacheRefreshFailed { error: String },
    SkillPointQuery { skill_id: Uuid, found: bool },
    SkillUnresolved { reference: String },
    /// A plain skill name that is not in the skills table
    SkillNameNotInCatalog { reference: String },
    MalformedSkillReference { task_id: Uuid, value: String },
    ClientUnresolved { client_id: Uuid },
    ClientResolutionFailed { error: String },
    DemandForecastGenerated {
        months: usize,
        skills: usize,
        data_points: usize,
        tasks: usize,
        elapsed_ms: u64,
    },
}

pub trait PipelineObserver: Send + Sync {
    fn record(&self, event: &PipelineEvent);
}

/// Default observer: forwards every event to `tracing`
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl PipelineObserver for TracingObserver {
    fn record(&self, event: &PipelineEvent) {
        match event {
            PipelineEvent::SkillCacheRefreshed { entries } => {
                info!(entries, "Skill cache refreshed");
            }
            PipelineEvent::SkillCacheRefreshFailed { error } => {
                warn!(error = %error, "Skill cache refresh failed, keeping previous entries");
            }
            PipelineEvent::SkillPointQuery { skill_id, found } => {
                debug!(skill_id = %skill_id, found, "Skill cache miss resolved by point query");
            }
            PipelineEvent::SkillUnresolved { reference } => {
                warn!(reference = %reference, "Skill reference could not be resolved");
            }
            PipelineEvent::SkillNameNotInCatalog { reference } => {
                warn!(reference = %reference, "Skill name is not in the skills table");
            }
            PipelineEvent::MalformedSkillReference { task_id, value } => {
                warn!(task_id = %task_id, value = %value, "Dropping malformed skill reference");
            }
            PipelineEvent::ClientUnresolved { client_id } => {
                warn!(client_id = %client_id, "Client could not be resolved");
            }
            PipelineEvent::ClientResolutionFailed { error } => {
                warn!(error = %error, "Client resolution failed");
            }
            PipelineEvent::DemandForecastGenerated {
                months,
                skills,
                data_points,
                tasks,
                elapsed_ms,
            } => {
                info!(
                    months,
                    skills, data_points, tasks, elapsed_ms, "Demand forecast generated"
                );
            }
        }
    }
}

/// Keeps every event in memory; used by tests and diagnostics endpoints
#[derive(Debug, Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<PipelineEvent>>,
}

impl RecordingObserver {
    pub fn events(&self) -> Vec<PipelineEvent> {
        match self.events.lock() {
            Ok(events) => events.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn count(&self, predicate: impl Fn(&PipelineEvent) -> bool) -> usize {
        self.events().iter().filter(|event| predicate(event)).count()
    }
}

impl PipelineObserver for RecordingObserver {
    fn record(&self, event: &PipelineEvent) {
        match self.events.lock() {
            Ok(mut events) => events.push(event.clone()),
            Err(poisoned) => poisoned.into_inner().push(event.clone()),
        }
    }
}
