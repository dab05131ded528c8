//! The verified repair plan: committed fixes, residual diagnostics, batches.
//!
//! This is the wire surface for out-of-process consumers: the JSON shape is
//! stable and camelCased, and [`generate_plan_schema`] exports its JSON
//! schema. Byte positions in `changes` index the unmodified source text at
//! plan time; consumers apply `steps` in order, or any one batch in any
//! internal order.

use crate::candidate::{FileChange, changes_conflict};
use crate::diagnostics::Diagnostic;
use crate::scoring::Risk;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Error-count effect of one committed fix, measured inside its cone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct FixEffect {
    pub before: usize,
    pub after: usize,
    pub delta: i64,
}

/// Relations between committed fixes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct FixDependencies {
    pub conflicts_with: Vec<String>,
    pub requires: Vec<String>,
    pub exclusive_group: Option<String>,
}

/// A committed, verified fix. IDs are `fix-N` in commit order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct VerifiedFix {
    pub id: String,
    pub fix_name: String,
    #[serde(rename = "fixDescription")]
    pub description: String,
    pub risk: Risk,
    pub diagnostic: Diagnostic,
    pub changes: Vec<FileChange>,
    pub effect: FixEffect,
    pub dependencies: FixDependencies,
}

/// The classifier's verdict on a diagnostic the planner did not fix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum Disposition {
    /// Exactly one verified candidate, low or medium risk.
    AutoFixable,
    /// Exactly one verified candidate, high risk.
    AutoFixableHighRisk,
    /// Several verified candidates, or no budget left to tell.
    NeedsJudgment,
    /// Neither the checker nor any builder produced a candidate.
    NoGeneratedCandidate,
    /// Candidates existed but none verified.
    NoVerifiedCandidate,
}

/// A residual diagnostic with its disposition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ClassifiedDiagnostic {
    #[serde(flatten)]
    pub diagnostic: Diagnostic,
    pub disposition: Disposition,
    /// Number of candidates that verified for this diagnostic.
    pub candidate_count: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct BudgetStats {
    pub candidates_generated: usize,
    pub candidates_verified: usize,
    pub verification_budget: usize,
    pub budget_exhausted: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct PlanSummary {
    pub initial_errors: usize,
    pub final_errors: usize,
    pub fixed_count: usize,
    pub remaining_count: usize,
    pub budget: BudgetStats,
}

/// The full output of one `plan` invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RepairPlan {
    pub summary: PlanSummary,
    pub steps: Vec<VerifiedFix>,
    pub remaining: Vec<ClassifiedDiagnostic>,
    /// Groups of mutually non-conflicting fix ids; each batch may be applied
    /// in any order among itself, batches in order.
    pub batches: Vec<Vec<String>>,
}

impl RepairPlan {
    /// True when nothing is left to fix.
    pub fn is_clean(&self) -> bool {
        self.remaining.is_empty()
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// Fill `conflictsWith` from pairwise change conflicts among committed fixes.
/// `requires` stays empty and `exclusiveGroup` is left to builder metadata.
pub fn populate_dependencies(steps: &mut [VerifiedFix]) {
    let mut conflicts: Vec<Vec<String>> = vec![Vec::new(); steps.len()];
    for i in 0..steps.len() {
        for j in (i + 1)..steps.len() {
            if changes_conflict(&steps[i].changes, &steps[j].changes) {
                conflicts[i].push(steps[j].id.clone());
                conflicts[j].push(steps[i].id.clone());
            }
        }
    }
    for (step, conflict_ids) in steps.iter_mut().zip(conflicts) {
        step.dependencies.conflicts_with = conflict_ids;
    }
}

/// Greedy first-fit batching in commit order: each fix joins the earliest
/// batch it conflicts with no member of.
pub fn compute_batches(steps: &[VerifiedFix]) -> Vec<Vec<String>> {
    let mut batches: Vec<Vec<usize>> = Vec::new();
    for (index, step) in steps.iter().enumerate() {
        let slot = batches.iter_mut().find(|batch| {
            batch
                .iter()
                .all(|&member| !changes_conflict(&steps[member].changes, &step.changes))
        });
        match slot {
            Some(batch) => batch.push(index),
            None => batches.push(vec![index]),
        }
    }
    batches
        .into_iter()
        .map(|batch| batch.into_iter().map(|index| steps[index].id.clone()).collect())
        .collect()
}

/// JSON schema of the persisted plan, for out-of-process consumers.
pub fn generate_plan_schema() -> String {
    let schema = schemars::schema_for!(RepairPlan);
    serde_json::to_string_pretty(&schema).unwrap_or_default()
}
