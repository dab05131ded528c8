//! Risk tagging and verification scoring strategies.

use crate::planner::VerifyOutcome;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// How likely a fix is to change behavior beyond resolving its diagnostic.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "lowercase")]
pub enum Risk {
    Low,
    Medium,
    High,
}

impl Risk {
    /// Pre-verification priority: low-risk candidates are tried first.
    pub fn prune_order(self) -> f64 {
        match self {
            Risk::Low => 2.0,
            Risk::Medium => 1.0,
            Risk::High => 0.0,
        }
    }
}

/// Closed fix-name-to-risk table.
///
/// Import insertion, async/await insertion, and unused-code removal are
/// lexical and cheap to undo; member synthesis, spelling, and inference from
/// usage are plausible but can pick the wrong target; everything else is
/// assumed structural.
pub fn risk_for(fix_name: &str) -> Risk {
    const LOW: &[&str] = &["import", "addasync", "addawait", "removeunused"];
    const MEDIUM: &[&str] = &["addmissingmember", "spelling", "inferfromusage"];

    let normalized: String = fix_name
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect::<String>()
        .to_ascii_lowercase();

    if LOW.iter().any(|fragment| normalized.contains(fragment)) {
        Risk::Low
    } else if MEDIUM.iter().any(|fragment| normalized.contains(fragment)) {
        Risk::Medium
    } else {
        Risk::High
    }
}

/// Penalty subtracted from a weighted score per risk level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct RiskPenalty {
    pub low: f64,
    pub medium: f64,
    pub high: f64,
}

impl Default for RiskPenalty {
    fn default() -> Self {
        Self {
            low: 0.0,
            medium: 0.75,
            high: 2.0,
        }
    }
}

impl RiskPenalty {
    pub fn for_risk(&self, risk: Risk) -> f64 {
        match risk {
            Risk::Low => self.low,
            Risk::Medium => self.medium,
            Risk::High => self.high,
        }
    }
}

/// Tunables for the weighted strategy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct WeightedParams {
    /// Multiplier on the weight of introduced diagnostics.
    pub regression_factor: f64,
    /// Cost per edited byte.
    pub edit_size_factor: f64,
    pub risk_penalty: RiskPenalty,
}

impl Default for WeightedParams {
    fn default() -> Self {
        Self {
            regression_factor: 4.0,
            edit_size_factor: 0.0015,
            risk_penalty: RiskPenalty::default(),
        }
    }
}

/// How a verified candidate is scored.
///
/// `Delta` is the raw error-count improvement; `Weighted` prices resolved and
/// introduced diagnostics by severity and discounts edit size and risk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "strategy", content = "weights", rename_all = "lowercase")]
pub enum ScoringStrategy {
    Delta,
    Weighted(WeightedParams),
}

impl Default for ScoringStrategy {
    fn default() -> Self {
        ScoringStrategy::Delta
    }
}

impl ScoringStrategy {
    pub fn weighted() -> Self {
        ScoringStrategy::Weighted(WeightedParams::default())
    }

    pub fn score(&self, outcome: &VerifyOutcome, risk: Risk) -> f64 {
        match self {
            ScoringStrategy::Delta => outcome.delta as f64,
            ScoringStrategy::Weighted(params) => {
                outcome.resolved_weight
                    - params.regression_factor * outcome.introduced_weight
                    - params.edit_size_factor * outcome.edit_size as f64
                    - params.risk_penalty.for_risk(risk)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcome(delta: i64, resolved: f64, introduced: f64, edit_size: usize) -> VerifyOutcome {
        VerifyOutcome {
            target_fixed: true,
            errors_before: 1,
            errors_after: 0,
            delta,
            resolved: Vec::new(),
            introduced: Vec::new(),
            resolved_weight: resolved,
            introduced_weight: introduced,
            edit_size,
        }
    }

    #[test]
    fn test_risk_table_low() {
        assert_eq!(risk_for("fixMissingImport"), Risk::Low);
        assert_eq!(risk_for("removeUnusedIdentifier"), Risk::Low);
        assert_eq!(risk_for("addMissingAwait"), Risk::Low);
        assert_eq!(risk_for("addMissingAsync"), Risk::Low);
    }

    #[test]
    fn test_risk_table_medium() {
        assert_eq!(risk_for("fixSpelling"), Risk::Medium);
        assert_eq!(risk_for("addMissingMember"), Risk::Medium);
        assert_eq!(risk_for("inferFromUsage"), Risk::Medium);
    }

    #[test]
    fn test_risk_table_default_high() {
        assert_eq!(risk_for("addCatchAllOverload"), Risk::High);
        assert_eq!(risk_for("addMissingDeclaration"), Risk::High);
        assert_eq!(risk_for(""), Risk::High);
    }

    #[test]
    fn test_delta_score() {
        let strategy = ScoringStrategy::Delta;
        assert_eq!(strategy.score(&outcome(3, 3.0, 0.0, 10), Risk::High), 3.0);
        assert_eq!(strategy.score(&outcome(-1, 0.0, 1.0, 10), Risk::Low), -1.0);
    }

    #[test]
    fn test_weighted_score_defaults() {
        let strategy = ScoringStrategy::weighted();
        // resolved 1.0, no regressions, 100 bytes, medium risk:
        // 1.0 - 0 - 0.15 - 0.75 = 0.10
        let score = strategy.score(&outcome(1, 1.0, 0.0, 100), Risk::Medium);
        assert!((score - 0.10).abs() < 1e-9);
    }

    #[test]
    fn test_weighted_score_punishes_regressions() {
        let strategy = ScoringStrategy::weighted();
        let score = strategy.score(&outcome(1, 1.0, 1.0, 0), Risk::Low);
        // 1.0 - 4.0*1.0 = -3.0
        assert!((score - (-3.0)).abs() < 1e-9);
    }

    #[test]
    fn test_prune_order_prefers_low_risk() {
        assert!(Risk::Low.prune_order() > Risk::Medium.prune_order());
        assert!(Risk::Medium.prune_order() > Risk::High.prune_order());
    }
}
