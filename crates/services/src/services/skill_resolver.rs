//! Resolves skill references (UUIDs or names) to display names.
//!
//! Order of attempts for a UUID: cache, then a point query against the store
//! (written through to the cache), then an `Unknown Skill (...)` placeholder.
//! Plain names pass through unchanged. Resolution never fails and always
//! yields exactly one outcome per input, in input order.

use std::{collections::HashMap, sync::Arc};

use serde::Serialize;
use tracing::warn;
use uuid::Uuid;

use super::{
    events::{PipelineEvent, PipelineObserver, TracingObserver},
    skill_cache::SkillCacheManager,
    skill_validator::is_uuid,
};

pub const UNKNOWN_SKILL_PREFIX: &str = "Unknown Skill";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionSource {
    Cache,
    Database,
    /// Plain name that matches a row in the skills table
    PassThrough,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceKind {
    Uuid,
    Name,
    Blank,
}

/// Outcome of looking up one skill reference
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SkillResolution {
    Resolved {
        reference: String,
        name: String,
        source: ResolutionSource,
    },
    Unresolved {
        reference: String,
        kind: ReferenceKind,
    },
}

impl SkillResolution {
    pub fn reference(&self) -> &str {
        match self {
            Self::Resolved { reference, .. } | Self::Unresolved { reference, .. } => reference,
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, Self::Resolved { .. })
    }

    /// Name to show for this reference. Unresolved names pass through as typed.
    pub fn display_name(&self) -> String {
        match self {
            Self::Resolved { name, .. } => name.clone(),
            Self::Unresolved {
                reference,
                kind: ReferenceKind::Name,
            } => reference.clone(),
            Self::Unresolved { reference, .. } => unknown_skill_placeholder(reference),
        }
    }
}

pub fn unknown_skill_placeholder(reference: &str) -> String {
    let prefix: String = reference.trim().chars().take(8).collect();
    format!("{UNKNOWN_SKILL_PREFIX} ({prefix})")
}

pub fn classify_reference(reference: &str) -> ReferenceKind {
    let trimmed = reference.trim();
    if trimmed.is_empty() {
        ReferenceKind::Blank
    } else if is_uuid(trimmed) {
        ReferenceKind::Uuid
    } else {
        ReferenceKind::Name
    }
}

/// Cache-only resolution; never touches the store
pub(crate) async fn resolve_from_cache(
    cache: &SkillCacheManager,
    reference: &str,
) -> SkillResolution {
    let unresolved = |kind| SkillResolution::Unresolved {
        reference: reference.to_string(),
        kind,
    };

    match classify_reference(reference) {
        ReferenceKind::Blank => unresolved(ReferenceKind::Blank),
        ReferenceKind::Uuid => {
            let Ok(id) = Uuid::parse_str(reference.trim()) else {
                return unresolved(ReferenceKind::Uuid);
            };
            match cache.get_name_by_id(id).await {
                Some(name) => SkillResolution::Resolved {
                    reference: reference.to_string(),
                    name,
                    source: ResolutionSource::Cache,
                },
                None => unresolved(ReferenceKind::Uuid),
            }
        }
        ReferenceKind::Name => match cache.get_id_by_name(reference).await {
            Some(_) => SkillResolution::Resolved {
                reference: reference.to_string(),
                name: reference.to_string(),
                source: ResolutionSource::PassThrough,
            },
            None => unresolved(ReferenceKind::Name),
        },
    }
}

pub struct SkillResolver {
    cache: Arc<SkillCacheManager>,
    observer: Arc<dyn PipelineObserver>,
}

impl SkillResolver {
    pub fn new(cache: Arc<SkillCacheManager>) -> Self {
        Self {
            cache,
            observer: Arc::new(TracingObserver),
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn PipelineObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn cache(&self) -> &Arc<SkillCacheManager> {
        &self.cache
    }

    pub async fn resolve(&self, references: &[String]) -> Vec<SkillResolution> {
        // A failed load leaves stale entries behind; resolution carries on with them.
        if let Err(e) = self.cache.initialize().await {
            warn!(error = %e, "Resolving skills against a stale cache");
        }

        let mut attempted: HashMap<Uuid, Option<String>> = HashMap::new();
        let mut resolutions = Vec::with_capacity(references.len());

        for reference in references {
            let resolution = match resolve_from_cache(&self.cache, reference).await {
                SkillResolution::Unresolved {
                    kind: ReferenceKind::Uuid,
                    ..
                } => self.resolve_miss(reference, &mut attempted).await,
                other => other,
            };

            match &resolution {
                SkillResolution::Unresolved {
                    kind: ReferenceKind::Name,
                    reference,
                } => self.observer.record(&PipelineEvent::SkillNameNotInCatalog {
                    reference: reference.clone(),
                }),
                SkillResolution::Unresolved { reference, .. } => {
                    self.observer.record(&PipelineEvent::SkillUnresolved {
                        reference: reference.clone(),
                    })
                }
                SkillResolution::Resolved { .. } => {}
            }

            resolutions.push(resolution);
        }

        resolutions
    }

    /// One display name per input, same order
    pub async fn get_skill_names(&self, references: &[String]) -> Vec<String> {
        self.resolve(references)
            .await
            .iter()
            .map(SkillResolution::display_name)
            .collect()
    }

    async fn resolve_miss(
        &self,
        reference: &str,
        attempted: &mut HashMap<Uuid, Option<String>>,
    ) -> SkillResolution {
        let Ok(id) = Uuid::parse_str(reference.trim()) else {
            return SkillResolution::Unresolved {
                reference: reference.to_string(),
                kind: ReferenceKind::Uuid,
            };
        };

        let name = match attempted.get(&id) {
            Some(name) => name.clone(),
            None => {
                let name = self.point_query(id).await;
                attempted.insert(id, name.clone());
                name
            }
        };

        match name {
            Some(name) => SkillResolution::Resolved {
                reference: reference.to_string(),
                name,
                source: ResolutionSource::Database,
            },
            None => SkillResolution::Unresolved {
                reference: reference.to_string(),
                kind: ReferenceKind::Uuid,
            },
        }
    }

    async fn point_query(&self, id: Uuid) -> Option<String> {
        match self.cache.store().find_skill(id).await {
            Ok(Some(skill)) => {
                self.cache.insert(id, skill.name.clone()).await;
                self.observer.record(&PipelineEvent::SkillPointQuery {
                    skill_id: id,
                    found: true,
                });
                Some(skill.name)
            }
            Ok(None) => {
                self.observer.record(&PipelineEvent::SkillPointQuery {
                    skill_id: id,
                    found: false,
                });
                None
            }
            Err(e) => {
                warn!(skill_id = %id, error = %e, "Skill point query failed");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::{
        events::RecordingObserver,
        test_support::{FakeSkillStore, skill},
    };

    fn refs(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    fn resolver_for(store: Arc<FakeSkillStore>) -> SkillResolver {
        SkillResolver::new(Arc::new(SkillCacheManager::new(store)))
    }

    #[tokio::test]
    async fn test_output_matches_input_order_and_count() {
        let senior = Uuid::new_v4();
        let store = Arc::new(FakeSkillStore::with_skills(vec![skill(senior, "Senior")]));
        let resolver = resolver_for(store);
        let missing = Uuid::new_v4();

        let input = refs(&[
            &senior.to_string(),
            "CPA",
            "",
            &missing.to_string(),
            &senior.to_string(),
        ]);
        let names = resolver.get_skill_names(&input).await;

        assert_eq!(names.len(), input.len());
        assert_eq!(names[0], "Senior");
        assert_eq!(names[1], "CPA");
        assert!(names[2].starts_with(UNKNOWN_SKILL_PREFIX));
        assert!(names[3].starts_with(UNKNOWN_SKILL_PREFIX));
        assert_eq!(names[4], "Senior");
        assert!(resolver.get_skill_names(&[]).await.is_empty());
    }

    #[tokio::test]
    async fn test_cache_hit_and_miss_agree_with_table() {
        let listed = Uuid::new_v4();
        let added_later = Uuid::new_v4();
        let store = Arc::new(
            FakeSkillStore::with_skills(vec![skill(listed, "Audit")])
                .with_unlisted(vec![skill(added_later, "Advisory")]),
        );
        let resolver = resolver_for(store);

        let resolutions = resolver
            .resolve(&refs(&[&listed.to_string(), &added_later.to_string()]))
            .await;
        assert_eq!(
            resolutions[0],
            SkillResolution::Resolved {
                reference: listed.to_string(),
                name: "Audit".to_string(),
                source: ResolutionSource::Cache,
            }
        );
        assert_eq!(
            resolutions[1],
            SkillResolution::Resolved {
                reference: added_later.to_string(),
                name: "Advisory".to_string(),
                source: ResolutionSource::Database,
            }
        );
    }

    #[tokio::test]
    async fn test_miss_queries_once_then_serves_from_cache() {
        let id = Uuid::new_v4();
        let store = Arc::new(FakeSkillStore::default().with_unlisted(vec![skill(id, "Payroll")]));
        let resolver = resolver_for(store.clone());
        let input = refs(&[&id.to_string()]);

        assert_eq!(resolver.get_skill_names(&input).await, vec!["Payroll".to_string()]);
        assert_eq!(store.find_calls(), 1);

        assert_eq!(resolver.get_skill_names(&input).await, vec!["Payroll".to_string()]);
        assert_eq!(store.find_calls(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_unknown_uuid_is_queried_once_per_call() {
        let store = Arc::new(FakeSkillStore::default());
        let resolver = resolver_for(store.clone());
        let id = Uuid::new_v4().to_string();

        let names = resolver.get_skill_names(&refs(&[&id, &id, &id])).await;
        assert_eq!(names.len(), 3);
        assert_eq!(names[0], unknown_skill_placeholder(&id));
        assert_eq!(store.find_calls(), 1);
    }

    #[tokio::test]
    async fn test_store_failures_degrade_to_placeholders() {
        let store = Arc::new(FakeSkillStore::default());
        store.fail_loads(true);
        store.fail_finds(true);
        let resolver = resolver_for(store);
        let id = Uuid::new_v4().to_string();

        let names = resolver.get_skill_names(&refs(&[&id, "Bookkeeping"])).await;
        assert_eq!(names, vec![unknown_skill_placeholder(&id), "Bookkeeping".to_string()]);
    }

    #[tokio::test]
    async fn test_unknown_names_pass_through_and_are_reported() {
        let store = Arc::new(FakeSkillStore::with_skills(vec![skill(Uuid::new_v4(), "CPA")]));
        let observer = Arc::new(RecordingObserver::default());
        let resolver = resolver_for(store).with_observer(observer.clone());

        let resolutions = resolver.resolve(&refs(&["cpa ", "Forensics"])).await;
        assert_eq!(
            resolutions[0],
            SkillResolution::Resolved {
                reference: "cpa ".to_string(),
                name: "cpa ".to_string(),
                source: ResolutionSource::PassThrough,
            }
        );
        assert_eq!(resolutions[0].display_name(), "cpa ");
        assert_eq!(
            resolutions[1],
            SkillResolution::Unresolved {
                reference: "Forensics".to_string(),
                kind: ReferenceKind::Name,
            }
        );
        assert_eq!(resolutions[1].display_name(), "Forensics");
        assert_eq!(
            observer.count(|e| matches!(e, PipelineEvent::SkillNameNotInCatalog { .. })),
            1
        );
    }

    #[test]
    fn test_placeholder_uses_reference_prefix() {
        assert_eq!(
            unknown_skill_placeholder("7f8c2a64-1d2b-4c4e-9f57-2a9d3c1b0e11"),
            "Unknown Skill (7f8c2a64)"
        );
    }
}
