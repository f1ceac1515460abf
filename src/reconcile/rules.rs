use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::Path;

use crate::error::{Error, Result};
use crate::normalize::normalize_key;
use crate::schema::EntityTable;

/// Known misspellings, keyed by the misspelled name rather than a row id so
/// they keep working when a dataset is renumbered.
const BUILTIN_CORRECTIONS: &[(EntityTable, &str, &str)] = &[
    (EntityTable::Pokemon, "Pikuchu", "Pikachu"),
    (EntityTable::Types, "gras", "Grass"),
];

/// Rename every row of `table` whose normalized name equals
/// `normalize_key(from)` to exactly `to`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Correction {
    pub table: EntityTable,
    pub from: String,
    pub to: String,
}

/// A corrupt row to delete outright. References to it are repointed to
/// `replacement` first; without one, the row must be unreferenced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Removal {
    pub table: EntityTable,
    pub id: i64,
    #[serde(default)]
    pub replacement: Option<i64>,
}

/// Dataset-specific repair rules, loadable from JSON:
///
/// ```json
/// {
///   "corrections": [{"table": "types", "from": "wtaer", "to": "Water"}],
///   "removals": [{"table": "abilities", "id": 14, "replacement": 1}]
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconcileRules {
    #[serde(default)]
    pub corrections: Vec<Correction>,
    #[serde(default)]
    pub removals: Vec<Removal>,
    /// Title-case every entity name
    #[serde(default = "default_true")]
    pub standardize_case: bool,
}

fn default_true() -> bool {
    true
}

impl Default for ReconcileRules {
    /// Built-in corrections, no removals
    fn default() -> Self {
        Self {
            corrections: BUILTIN_CORRECTIONS
                .iter()
                .map(|(table, from, to)| Correction {
                    table: *table,
                    from: from.to_string(),
                    to: to.to_string(),
                })
                .collect(),
            removals: Vec::new(),
            standardize_case: true,
        }
    }
}

impl ReconcileRules {
    /// No corrections, no removals; only case standardisation and dedup
    pub fn empty() -> Self {
        Self {
            corrections: Vec::new(),
            removals: Vec::new(),
            standardize_case: true,
        }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let rules: Self = serde_json::from_str(json)?;
        rules.validate()?;
        Ok(rules)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Append another rule set; later corrections win on the same key
    pub fn extend(mut self, other: ReconcileRules) -> Self {
        self.corrections.extend(other.corrections);
        self.removals.extend(other.removals);
        self.standardize_case = self.standardize_case && other.standardize_case;
        self
    }

    pub fn validate(&self) -> Result<()> {
        for c in &self.corrections {
            if normalize_key(&c.from).is_empty() || c.to.trim().is_empty() {
                return Err(Error::Integrity(format!(
                    "correction for {} has an empty name: {:?} -> {:?}",
                    c.table, c.from, c.to
                )));
            }
        }

        let removed: HashSet<(EntityTable, i64)> =
            self.removals.iter().map(|r| (r.table, r.id)).collect();
        for r in &self.removals {
            if let Some(replacement) = r.replacement {
                if removed.contains(&(r.table, replacement)) {
                    return Err(Error::Integrity(format!(
                        "{} row {} is replaced by {}, which is also removed",
                        r.table, r.id, replacement
                    )));
                }
            }
        }

        Ok(())
    }

    /// Corrections for one table, keyed by normalized misspelling
    pub fn correction_map(&self, table: EntityTable) -> HashMap<String, &str> {
        self.corrections
            .iter()
            .filter(|c| c.table == table)
            .map(|c| (normalize_key(&c.from), c.to.as_str()))
            .collect()
    }

    pub fn removals_for(&self, table: EntityTable) -> impl Iterator<Item = &Removal> {
        self.removals.iter().filter(move |r| r.table == table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_rules_fix_known_typos() {
        let rules = ReconcileRules::default();
        assert_eq!(rules.correction_map(EntityTable::Pokemon).get("pikuchu"), Some(&"Pikachu"));
        assert_eq!(rules.correction_map(EntityTable::Types).get("gras"), Some(&"Grass"));
        assert!(rules.correction_map(EntityTable::Trainers).is_empty());
    }

    #[test]
    fn test_parse_rules_file() {
        let rules = ReconcileRules::from_json(
            r#"{
                "corrections": [{"table": "abilities", "from": "Statik", "to": "Static"}],
                "removals": [
                    {"table": "abilities", "id": 14, "replacement": 1},
                    {"table": "types", "id": 17}
                ]
            }"#,
        )
        .unwrap();

        assert!(rules.standardize_case);
        assert_eq!(rules.correction_map(EntityTable::Abilities).get("statik"), Some(&"Static"));
        assert_eq!(rules.removals_for(EntityTable::Types).next().unwrap().replacement, None);
        assert_eq!(rules.removals_for(EntityTable::Abilities).count(), 1);
    }

    #[test]
    fn test_replacement_cannot_be_removed() {
        let err = ReconcileRules::from_json(
            r#"{"removals": [
                {"table": "types", "id": 20, "replacement": 21},
                {"table": "types", "id": 21, "replacement": 1}
            ]}"#,
        )
        .unwrap_err();
        assert!(matches!(err, Error::Integrity(_)));
    }

    #[test]
    fn test_empty_correction_rejected() {
        let err = ReconcileRules::from_json(
            r#"{"corrections": [{"table": "types", "from": " ", "to": "Fire"}]}"#,
        )
        .unwrap_err();
        assert!(matches!(err, Error::Integrity(_)));
    }

    #[test]
    fn test_extend_keeps_builtin() {
        let file = ReconcileRules::from_json(
            r#"{"corrections": [{"table": "trainers", "from": "Misti", "to": "Misty"}]}"#,
        )
        .unwrap();
        let rules = ReconcileRules::default().extend(file);
        assert_eq!(rules.corrections.len(), BUILTIN_CORRECTIONS.len() + 1);
    }
}
