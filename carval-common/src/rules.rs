//! Static business-rules tables for the cost estimator
//!
//! The tables are derived offline from historical claims and shipped as a
//! JSON file (`business_rules.json`). They are loaded once per process
//! lifetime and treated as immutable configuration; the estimator receives
//! them explicitly rather than reading ambient global state.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use tracing::info;

/// Severity-to-value ratios, collision multipliers, and regional
/// multipliers used by the cost estimator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BusinessRules {
    /// Claim cost as a fraction of vehicle value, keyed by severity label
    pub severity_ratios: HashMap<String, f64>,

    /// Cost multiplier keyed by collision type label
    pub collision_type_multipliers: HashMap<String, f64>,

    /// Cost multiplier keyed by two-letter state code
    pub regional_multipliers: HashMap<String, f64>,

    /// Fixed increment added per reported injury, in dollars
    #[serde(default = "default_injury_increment")]
    pub injury_increment: f64,
}

fn default_injury_increment() -> f64 {
    7_500.0
}

impl Default for BusinessRules {
    fn default() -> Self {
        let severity_ratios = HashMap::from([
            ("Total Loss".to_string(), 0.88),
            ("Major Damage".to_string(), 0.45),
            ("Minor Damage".to_string(), 0.18),
            ("Trivial Damage".to_string(), 0.05),
        ]);

        let collision_type_multipliers = HashMap::from([
            ("Front Collision".to_string(), 1.10),
            ("Rear Collision".to_string(), 0.90),
            ("Side Collision".to_string(), 0.95),
        ]);

        let regional_multipliers = HashMap::from([
            ("CA".to_string(), 1.25),
            ("NY".to_string(), 1.20),
            ("HI".to_string(), 1.30),
            ("MA".to_string(), 1.15),
            ("WA".to_string(), 1.12),
            ("IL".to_string(), 1.08),
            ("FL".to_string(), 1.05),
            ("TX".to_string(), 1.00),
            ("OH".to_string(), 0.95),
            ("IN".to_string(), 0.92),
            ("SC".to_string(), 0.90),
            ("AL".to_string(), 0.88),
            ("MS".to_string(), 0.85),
        ]);

        Self {
            severity_ratios,
            collision_type_multipliers,
            regional_multipliers,
            injury_increment: default_injury_increment(),
        }
    }
}

impl BusinessRules {
    /// Load rules from a JSON file, falling back to the compiled-in
    /// defaults when the file does not exist.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            info!("No rules file at {}, using built-in tables", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        let rules: BusinessRules = serde_json::from_str(&content)
            .map_err(|e| Error::Config(format!("Failed to parse {}: {}", path.display(), e)))?;

        if rules.severity_ratios.is_empty() {
            return Err(Error::Config(format!(
                "{}: severity_ratios table is empty",
                path.display()
            )));
        }

        info!(
            "Loaded business rules from {} ({} severities, {} states)",
            path.display(),
            rules.severity_ratios.len(),
            rules.regional_multipliers.len()
        );
        Ok(rules)
    }

    /// Ratio of claim cost to vehicle value for a severity label
    pub fn severity_ratio(&self, severity: &str) -> Option<f64> {
        self.severity_ratios.get(severity).copied()
    }

    /// Multiplier for a collision type label
    pub fn collision_multiplier(&self, collision_type: &str) -> Option<f64> {
        self.collision_type_multipliers.get(collision_type).copied()
    }

    /// Regional multiplier for a state code; unknown states are neutral
    pub fn regional_multiplier(&self, state: &str) -> f64 {
        self.regional_multipliers.get(state).copied().unwrap_or(1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_tables_cover_known_labels() {
        let rules = BusinessRules::default();
        assert_eq!(rules.severity_ratio("Major Damage"), Some(0.45));
        assert_eq!(rules.severity_ratio("Total Loss"), Some(0.88));
        assert_eq!(rules.severity_ratio("Catastrophic"), None);
    }

    #[test]
    fn unknown_state_is_neutral() {
        let rules = BusinessRules::default();
        assert_eq!(rules.regional_multiplier("OH"), 0.95);
        assert_eq!(rules.regional_multiplier("ZZ"), 1.0);
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let rules = BusinessRules::load(Path::new("/nonexistent/business_rules.json")).unwrap();
        assert_eq!(rules.severity_ratio("Minor Damage"), Some(0.18));
    }

    #[test]
    fn parses_rules_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("business_rules.json");
        std::fs::write(
            &path,
            r#"{
                "severity_ratios": {"Major Damage": 0.5},
                "collision_type_multipliers": {"Front Collision": 1.2},
                "regional_multipliers": {"OH": 0.9}
            }"#,
        )
        .unwrap();

        let rules = BusinessRules::load(&path).unwrap();
        assert_eq!(rules.severity_ratio("Major Damage"), Some(0.5));
        // injury_increment omitted from the file takes the serde default
        assert_eq!(rules.injury_increment, 7_500.0);
    }
}
