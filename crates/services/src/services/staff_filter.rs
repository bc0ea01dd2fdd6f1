//! Preferred-staff filtering for demand matrices.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use super::demand::DemandMatrix;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum StaffFilterError {
    #[error("unknown staff filter mode: {0} (expected all, specific or none)")]
    UnknownMode(String),
    #[error("invalid staff id: {0}")]
    InvalidStaffId(String),
}

/// Which tasks survive, judged by each task's preferred staff member
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "mode", content = "staff_ids", rename_all = "lowercase")]
pub enum StaffFilterMode {
    #[default]
    All,
    /// Tasks preferring one of these staff members
    Specific(BTreeSet<Uuid>),
    /// Tasks with no preferred staff
    #[serde(rename = "none")]
    Unassigned,
}

impl StaffFilterMode {
    /// `mode` is `all`, `specific` or `none`; absent means `all`. Staff ids only
    /// matter for `specific`, where an empty set matches nothing.
    pub fn parse(mode: Option<&str>, staff_ids: &[Uuid]) -> Result<Self, StaffFilterError> {
        match mode.map(|m| m.trim().to_ascii_lowercase()).as_deref() {
            None | Some("") | Some("all") => Ok(Self::All),
            Some("specific") => Ok(Self::Specific(staff_ids.iter().copied().collect())),
            Some("none") | Some("unassigned") => Ok(Self::Unassigned),
            Some(other) => Err(StaffFilterError::UnknownMode(other.to_string())),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Specific(_) => "specific",
            Self::Unassigned => "none",
        }
    }

    pub fn matches(&self, preferred_staff_id: Option<Uuid>) -> bool {
        match self {
            Self::All => true,
            Self::Specific(ids) => preferred_staff_id.is_some_and(|id| ids.contains(&id)),
            Self::Unassigned => preferred_staff_id.is_none(),
        }
    }

    pub fn apply(&self, matrix: &mut DemandMatrix) {
        if *self == Self::All {
            return;
        }
        matrix.retain_tasks(|task| self.matches(task.preferred_staff_id));
    }
}

/// Comma-separated staff ids, blanks ignored
pub fn parse_staff_ids(raw: &str) -> Result<Vec<Uuid>, StaffFilterError> {
    raw.split(',')
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(|id| Uuid::parse_str(id).map_err(|_| StaffFilterError::InvalidStaffId(id.to_string())))
        .collect()
}
