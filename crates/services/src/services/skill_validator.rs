use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use tracing::warn;

use super::{
    skill_cache::SkillCacheManager,
    skill_resolver::{ReferenceKind, SkillResolution, resolve_from_cache},
};

static UUID_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^[0-9a-f]{8}-[0-9a-f]{4}-[1-5][0-9a-f]{3}-[89ab][0-9a-f]{3}-[0-9a-f]{12}$")
        .expect("UUID pattern is a valid regex")
});

/// RFC 4122 version 1-5 UUID shape
pub fn is_uuid(value: &str) -> bool {
    UUID_PATTERN.is_match(value)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedReference {
    pub reference: String,
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SkillValidationReport {
    pub valid: Vec<String>,
    pub invalid: Vec<String>,
    pub resolved: Vec<ResolvedReference>,
    /// Valid names that are missing from the skills table
    pub flagged: Vec<String>,
}

impl SkillValidationReport {
    pub fn is_clean(&self) -> bool {
        self.invalid.is_empty() && self.flagged.is_empty()
    }

    fn push(&mut self, resolution: SkillResolution) {
        match resolution {
            SkillResolution::Resolved {
                reference, name, ..
            } => {
                self.valid.push(reference.clone());
                self.resolved.push(ResolvedReference { reference, name });
            }
            SkillResolution::Unresolved {
                reference,
                kind: ReferenceKind::Name,
            } => {
                self.valid.push(reference.clone());
                self.flagged.push(reference);
            }
            SkillResolution::Unresolved { reference, .. } => self.invalid.push(reference),
        }
    }
}

/// Checks skill references against the cached skills table without point queries
pub struct SkillValidator {
    cache: Arc<SkillCacheManager>,
}

impl SkillValidator {
    pub fn new(cache: Arc<SkillCacheManager>) -> Self {
        Self { cache }
    }

    pub async fn validate_skill_references(&self, references: &[String]) -> SkillValidationReport {
        if let Err(e) = self.cache.initialize().await {
            warn!(error = %e, "Validating skills against a stale cache");
        }

        let mut report = SkillValidationReport::default();
        for reference in references {
            report.push(resolve_from_cache(&self.cache, reference).await);
        }
        report
    }
}
