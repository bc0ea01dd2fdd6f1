//! JSON skill-reference columns (`required_skills`, `assigned_skills`).
//!
//! Entries are either skill UUIDs or free-text skill names; nothing in the
//! schema tells them apart. Rows written by older clients also carry numbers,
//! nulls or nested values, so decoding is lenient and reports what it dropped.

use serde_json::Value;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedSkillRefs {
    pub references: Vec<String>,
    /// Raw JSON of every entry that was not a non-empty string
    pub rejected: Vec<String>,
}

pub fn parse_skill_refs(raw: &str) -> ParsedSkillRefs {
    let mut parsed = ParsedSkillRefs::default();
    if raw.trim().is_empty() {
        return parsed;
    }

    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Array(items)) => {
            for item in items {
                match item {
                    Value::String(s) if !s.trim().is_empty() => parsed.references.push(s),
                    other => parsed.rejected.push(other.to_string()),
                }
            }
        }
        Ok(other) => parsed.rejected.push(other.to_string()),
        Err(_) => parsed.rejected.push(raw.to_string()),
    }

    parsed
}

pub fn encode_skill_refs(references: &[String]) -> Result<String, sqlx::Error> {
    serde_json::to_string(references).map_err(|e| sqlx::Error::Protocol(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_string_array() {
        let parsed = parse_skill_refs(r#"["Senior", "7f8c2a64-1d2b-4c4e-9f57-2a9d3c1b0e11"]"#);
        assert_eq!(parsed.references.len(), 2);
        assert!(parsed.rejected.is_empty());
    }

    #[test]
    fn test_parse_drops_non_string_entries() {
        let parsed = parse_skill_refs(r#"["CPA", 42, null, "", {"name": "Audit"}]"#);
        assert_eq!(parsed.references, vec!["CPA".to_string()]);
        assert_eq!(parsed.rejected.len(), 4);
    }

    #[test]
    fn test_parse_non_array_is_rejected() {
        let parsed = parse_skill_refs(r#""Senior""#);
        assert!(parsed.references.is_empty());
        assert_eq!(parsed.rejected, vec![r#""Senior""#.to_string()]);

        let parsed = parse_skill_refs("not json");
        assert!(parsed.references.is_empty());
        assert_eq!(parsed.rejected, vec!["not json".to_string()]);
    }

    #[test]
    fn test_parse_blank_column() {
        assert_eq!(parse_skill_refs("  "), ParsedSkillRefs::default());
    }
}
