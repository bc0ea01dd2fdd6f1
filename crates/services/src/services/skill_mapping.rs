//! Skill-name normalization rules.
//!
//! Skill references arrive as free text typed by staff over several years
//! ("jr", "senior staff", "CPA "). Every spelling is folded onto one canonical
//! vocabulary before aggregation so the forecast grid has exactly one row per
//! skill.

use std::collections::HashMap;

use once_cell::sync::Lazy;

pub const JUNIOR: &str = "Junior";
pub const SENIOR: &str = "Senior";
pub const CPA: &str = "CPA";
pub const MANAGER: &str = "Manager";
pub const PARTNER: &str = "Partner";
pub const BOOKKEEPING: &str = "Bookkeeping";
pub const TAX_PREPARATION: &str = "Tax Preparation";
pub const AUDIT: &str = "Audit";
pub const ADVISORY: &str = "Advisory";
pub const PAYROLL: &str = "Payroll";

/// The canonical skill vocabulary, in staffing-tier order followed by service lines
pub const CANONICAL_SKILLS: &[&str] = &[
    JUNIOR,
    SENIOR,
    CPA,
    MANAGER,
    PARTNER,
    BOOKKEEPING,
    TAX_PREPARATION,
    AUDIT,
    ADVISORY,
    PAYROLL,
];

/// Synonym table keyed by normalized spelling (see [`normalize_key`]).
const SKILL_SYNONYMS: &[(&str, &str)] = &[
    ("junior", JUNIOR),
    ("jr", JUNIOR),
    ("jr.", JUNIOR),
    ("junior accountant", JUNIOR),
    ("associate", JUNIOR),
    ("staff accountant", JUNIOR),
    ("entry level", JUNIOR),
    ("senior", SENIOR),
    ("sr", SENIOR),
    ("sr.", SENIOR),
    ("senior accountant", SENIOR),
    ("senior associate", SENIOR),
    ("cpa", CPA),
    ("certified public accountant", CPA),
    ("manager", MANAGER),
    ("mgr", MANAGER),
    ("engagement manager", MANAGER),
    ("partner", PARTNER),
    ("principal", PARTNER),
    ("bookkeeping", BOOKKEEPING),
    ("bookkeeper", BOOKKEEPING),
    ("book keeping", BOOKKEEPING),
    ("tax", TAX_PREPARATION),
    ("tax prep", TAX_PREPARATION),
    ("tax preparation", TAX_PREPARATION),
    ("tax return", TAX_PREPARATION),
    ("tax returns", TAX_PREPARATION),
    ("audit", AUDIT),
    ("auditing", AUDIT),
    ("assurance", AUDIT),
    ("advisory", ADVISORY),
    ("consulting", ADVISORY),
    ("cfo services", ADVISORY),
    ("payroll", PAYROLL),
    ("payroll processing", PAYROLL),
    // Labels from the earlier staff-tier vocabularies
    ("junior staff", JUNIOR),
    ("senior staff", SENIOR),
    ("cpa staff", CPA),
    ("manager staff", MANAGER),
];

static SYNONYM_TABLE: Lazy<HashMap<&'static str, &'static str>> =
    Lazy::new(|| SKILL_SYNONYMS.iter().copied().collect());

/// Lowercase, trim and collapse inner whitespace
pub fn normalize_key(raw: &str) -> String {
    raw.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Canonical label for `raw`, if the synonym table knows it
pub fn get_mapping(raw: &str) -> Option<&'static str> {
    SYNONYM_TABLE.get(normalize_key(raw).as_str()).copied()
}

/// Canonical label for `raw`, or the input with its whitespace cleaned up
pub fn normalize_skill_name(raw: &str) -> String {
    match get_mapping(raw) {
        Some(canonical) => canonical.to_string(),
        None => raw.split_whitespace().collect::<Vec<_>>().join(" "),
    }
}

pub fn is_canonical(name: &str) -> bool {
    CANONICAL_SKILLS.contains(&name)
}
