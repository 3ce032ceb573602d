use serde::Deserialize;

use crate::error::EngineError;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    #[serde(default = "default_name")]
    pub name: String,
    /// Confidence at or above which a match needs no human review.
    #[serde(default = "default_auto_approve")]
    pub auto_approve_threshold: f64,
    /// Confidence at or above which a match is emitted for review.
    #[serde(default = "default_review")]
    pub review_threshold: f64,
    /// Symmetric window around the transaction date, in days.
    #[serde(default = "default_date_range")]
    pub date_range_days: u32,
    /// Name similarity (0–100) required for the fuzzy-name strategy to fire.
    #[serde(default = "default_fuzzy")]
    pub fuzzy_threshold: f64,
    /// Absolute amount slack in minor units. Covers wire fees and rounding.
    #[serde(default = "default_tolerance")]
    pub amount_tolerance_cents: i64,
    /// Largest invoice subset a single transaction may cover.
    #[serde(default = "default_subset_size")]
    pub max_subset_size: usize,
    /// Node cap for the subset-sum search, per company group.
    #[serde(default = "default_subset_nodes")]
    pub subset_max_nodes: usize,
    #[serde(default)]
    pub semantic: SemanticConfig,
}

fn default_name() -> String {
    "reconciliation".into()
}
fn default_auto_approve() -> f64 {
    95.0
}
fn default_review() -> f64 {
    70.0
}
fn default_date_range() -> u32 {
    7
}
fn default_fuzzy() -> f64 {
    80.0
}
fn default_tolerance() -> i64 {
    100
}
fn default_subset_size() -> usize {
    4
}
fn default_subset_nodes() -> usize {
    50_000
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            auto_approve_threshold: default_auto_approve(),
            review_threshold: default_review(),
            date_range_days: default_date_range(),
            fuzzy_threshold: default_fuzzy(),
            amount_tolerance_cents: default_tolerance(),
            max_subset_size: default_subset_size(),
            subset_max_nodes: default_subset_nodes(),
            semantic: SemanticConfig::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// Semantic disambiguation
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct SemanticConfig {
    #[serde(default)]
    pub enabled: bool,
    /// Base URL of the judgment service. Required when enabled.
    #[serde(default)]
    pub api_base: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_retries")]
    pub retries: u32,
    /// Invoice summaries sent per request.
    #[serde(default = "default_max_candidates")]
    pub max_candidates: usize,
    /// Confidence assigned to a candidate the service confirms.
    #[serde(default = "default_ai_confirmed")]
    pub ai_confirmed_confidence: f64,
}

fn default_timeout_secs() -> u64 {
    30
}
fn default_retries() -> u32 {
    2
}
fn default_max_candidates() -> usize {
    5
}
fn default_ai_confirmed() -> f64 {
    90.0
}

impl Default for SemanticConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            api_base: None,
            timeout_secs: default_timeout_secs(),
            retries: default_retries(),
            max_candidates: default_max_candidates(),
            ai_confirmed_confidence: default_ai_confirmed(),
        }
    }
}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

impl EngineConfig {
    pub fn from_toml(input: &str) -> Result<Self, EngineError> {
        let config: EngineConfig =
            toml::from_str(input).map_err(|e| EngineError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// A misconfigured run must fail before any record is processed.
    pub fn validate(&self) -> Result<(), EngineError> {
        let pct = |label: &str, v: f64| -> Result<(), EngineError> {
            if !(0.0..=100.0).contains(&v) {
                return Err(EngineError::ConfigValidation(format!(
                    "{label} must be in 0..=100, got {v}"
                )));
            }
            Ok(())
        };
        pct("auto_approve_threshold", self.auto_approve_threshold)?;
        pct("review_threshold", self.review_threshold)?;
        pct("fuzzy_threshold", self.fuzzy_threshold)?;
        pct(
            "semantic.ai_confirmed_confidence",
            self.semantic.ai_confirmed_confidence,
        )?;

        if self.review_threshold >= self.auto_approve_threshold {
            return Err(EngineError::ConfigValidation(format!(
                "review_threshold ({}) must be below auto_approve_threshold ({})",
                self.review_threshold, self.auto_approve_threshold
            )));
        }
        if self.amount_tolerance_cents < 0 {
            return Err(EngineError::ConfigValidation(format!(
                "amount_tolerance_cents must be >= 0, got {}",
                self.amount_tolerance_cents
            )));
        }
        if self.max_subset_size < 1 {
            return Err(EngineError::ConfigValidation(
                "max_subset_size must be >= 1".into(),
            ));
        }
        if self.subset_max_nodes == 0 {
            return Err(EngineError::ConfigValidation(
                "subset_max_nodes must be > 0".into(),
            ));
        }
        if self.semantic.enabled && self.semantic.max_candidates == 0 {
            return Err(EngineError::ConfigValidation(
                "semantic.max_candidates must be >= 1 when semantic is enabled".into(),
            ));
        }
        if self.semantic.enabled && self.semantic.ai_confirmed_confidence < self.review_threshold {
            return Err(EngineError::ConfigValidation(format!(
                "semantic.ai_confirmed_confidence ({}) must not fall below review_threshold ({})",
                self.semantic.ai_confirmed_confidence, self.review_threshold
            )));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = EngineConfig::default();
        config.validate().unwrap();
        assert_eq!(config.auto_approve_threshold, 95.0);
        assert_eq!(config.review_threshold, 70.0);
        assert_eq!(config.date_range_days, 7);
        assert_eq!(config.max_subset_size, 4);
        assert!(!config.semantic.enabled);
    }

    #[test]
    fn parse_minimal_toml() {
        let config = EngineConfig::from_toml(
            r#"
name = "month-end"
auto_approve_threshold = 97.0
amount_tolerance_cents = 50
"#,
        )
        .unwrap();
        assert_eq!(config.name, "month-end");
        assert_eq!(config.auto_approve_threshold, 97.0);
        assert_eq!(config.amount_tolerance_cents, 50);
        // untouched fields keep defaults
        assert_eq!(config.review_threshold, 70.0);
    }

    #[test]
    fn parse_semantic_section() {
        let config = EngineConfig::from_toml(
            r#"
[semantic]
enabled = true
api_base = "https://judge.internal"
timeout_secs = 10
retries = 1
"#,
        )
        .unwrap();
        assert!(config.semantic.enabled);
        assert_eq!(config.semantic.api_base.as_deref(), Some("https://judge.internal"));
        assert_eq!(config.semantic.timeout_secs, 10);
        assert_eq!(config.semantic.retries, 1);
        assert_eq!(config.semantic.max_candidates, 5);
    }

    #[test]
    fn reject_inverted_thresholds() {
        let err = EngineConfig::from_toml(
            r#"
auto_approve_threshold = 70.0
review_threshold = 90.0
"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("review_threshold"));
    }

    #[test]
    fn reject_equal_thresholds() {
        let mut config = EngineConfig::default();
        config.review_threshold = config.auto_approve_threshold;
        assert!(config.validate().is_err());
    }

    #[test]
    fn reject_out_of_range_threshold() {
        let err = EngineConfig::from_toml("auto_approve_threshold = 120.0").unwrap_err();
        assert!(err.to_string().contains("0..=100"));
    }

    #[test]
    fn reject_negative_tolerance() {
        let err = EngineConfig::from_toml("amount_tolerance_cents = -1").unwrap_err();
        assert!(err.to_string().contains("amount_tolerance_cents"));
    }

    #[test]
    fn reject_zero_subset_size() {
        let err = EngineConfig::from_toml("max_subset_size = 0").unwrap_err();
        assert!(err.to_string().contains("max_subset_size"));
    }
}
