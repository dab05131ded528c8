//! The repair planner: best-first candidate verification under a budget.
//!
//! Each iteration enumerates the current diagnostics, generates native and
//! synthetic candidates, prunes them on cheap priors, verifies survivors by
//! speculative apply under a VFS snapshot, and commits the single
//! highest-scoring improving candidate. The loop ends when no candidate
//! improves, the project is clean, or the verification budget runs out;
//! whatever remains is classified.
//!
//! Verify results are memoized across iterations keyed by diagnostic and
//! candidate identity plus a fingerprint of the cone files' contents. A
//! memoized winner is always re-verified fresh before committing, so every
//! committed fix was observed against the exact workspace it lands in.

use crate::builders::BuilderContext;
use crate::candidate::{CandidateFix, CandidateKind, apply_changes};
use crate::classify;
use crate::cone::{Cone, ConeContext, DiagnosticCache, build_cone};
use crate::diagnostics::{Diagnostic, DiagnosticKey, RepairResult};
use crate::guard::{DEFAULT_RESET_INTERVAL, MemoryGuard};
use crate::host::TypeCheckHost;
use crate::plan::{
    BudgetStats, ClassifiedDiagnostic, Disposition, FixDependencies, FixEffect, PlanSummary,
    RepairPlan, VerifiedFix, compute_batches, populate_dependencies,
};
use crate::policy::{CacheKeyStrategy, HostInvalidation, VerificationPolicy};
use crate::registry::BuilderRegistry;
use crate::scoring::{Risk, ScoringStrategy, risk_for};
use crate::telemetry::{BudgetEvent, BudgetLogger, NoopLogger};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

pub const DEFAULT_MAX_CANDIDATES: usize = 10;
pub const DEFAULT_MAX_CANDIDATES_PER_ITERATION: usize = 100;
pub const DEFAULT_MAX_VERIFICATIONS: usize = 500;
pub const DEFAULT_MAX_ITERATIONS: usize = 50;

const DIAGNOSTIC_CACHE_CAPACITY: usize = 256;

/// Knobs for one `plan` invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct PlanOptions {
    /// Candidates verified per diagnostic.
    pub max_candidates: usize,
    /// Candidates considered across one iteration.
    pub max_candidates_per_iteration: usize,
    /// Global verification budget for the whole plan, classifier included.
    pub max_verifications: usize,
    pub allow_regressions: bool,
    /// Verify and commit high-risk candidates in the main loop. Off by
    /// default; the classifier still verifies them to label diagnostics.
    pub include_high_risk: bool,
    pub max_iterations: usize,
    pub scoring: ScoringStrategy,
    pub policy: VerificationPolicy,
    /// Memory-guard reload interval in verifications; 0 disables.
    pub reset_interval: usize,
}

impl Default for PlanOptions {
    fn default() -> Self {
        Self {
            max_candidates: DEFAULT_MAX_CANDIDATES,
            max_candidates_per_iteration: DEFAULT_MAX_CANDIDATES_PER_ITERATION,
            max_verifications: DEFAULT_MAX_VERIFICATIONS,
            allow_regressions: false,
            include_high_risk: false,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            scoring: ScoringStrategy::default(),
            policy: VerificationPolicy::default(),
            reset_interval: DEFAULT_RESET_INTERVAL,
        }
    }
}

/// What one verification cycle observed, measured inside the cone.
#[derive(Debug, Clone, PartialEq)]
pub struct VerifyOutcome {
    /// The target diagnostic is absent from the after-set (by identity key).
    pub target_fixed: bool,
    pub errors_before: usize,
    pub errors_after: usize,
    pub delta: i64,
    /// Present before, gone after.
    pub resolved: Vec<Diagnostic>,
    /// Present after, new with respect to before.
    pub introduced: Vec<Diagnostic>,
    pub resolved_weight: f64,
    pub introduced_weight: f64,
    pub edit_size: usize,
}

/// Candidate counts without any verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetPreview {
    pub diagnostics: usize,
    pub candidates_generated: usize,
    pub candidates_after_prune: usize,
    pub high_risk_suppressed: usize,
    pub verification_budget: usize,
}

struct MemoEntry {
    fingerprint: u64,
    outcome: VerifyOutcome,
}

struct BestCandidate {
    diagnostic: Diagnostic,
    fix: CandidateFix,
    outcome: VerifyOutcome,
    risk: Risk,
    score: f64,
    /// The outcome came from the memo rather than a fresh verification.
    cached: bool,
}

/// The planner owns the host, registry, caches, logger, and guard for the
/// duration of one plan.
pub struct Planner {
    host: Box<dyn TypeCheckHost>,
    registry: BuilderRegistry,
    logger: Box<dyn BudgetLogger>,
    options: PlanOptions,
    cache: DiagnosticCache,
    guard: MemoryGuard,
    cancel: Option<Arc<AtomicBool>>,
    memo: HashMap<(DiagnosticKey, String), MemoEntry>,
    candidates_generated: usize,
    candidates_verified: usize,
    memo_hits: usize,
    memo_misses: usize,
    exhausted_logged: bool,
}

impl Planner {
    pub fn new(host: Box<dyn TypeCheckHost>, mut options: PlanOptions) -> RepairResult<Self> {
        options.policy.validate()?;
        options.allow_regressions = options.allow_regressions || options.policy.allow_regressions;
        let guard = MemoryGuard::new(options.reset_interval);
        Ok(Self {
            host,
            registry: BuilderRegistry::with_defaults(),
            logger: Box::new(NoopLogger),
            options,
            cache: DiagnosticCache::new(DIAGNOSTIC_CACHE_CAPACITY),
            guard,
            cancel: None,
            memo: HashMap::new(),
            candidates_generated: 0,
            candidates_verified: 0,
            memo_hits: 0,
            memo_misses: 0,
            exhausted_logged: false,
        })
    }

    /// Replace the default registry (builders are otherwise
    /// [`BuilderRegistry::with_defaults`]).
    pub fn with_registry(mut self, registry: BuilderRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn with_logger(mut self, logger: Box<dyn BudgetLogger>) -> Self {
        self.logger = logger;
        self
    }

    /// Cooperative cancellation, checked between iterations and between
    /// verifications. Cancellation classifies like budget exhaustion.
    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    pub fn host(&self) -> &dyn TypeCheckHost {
        self.host.as_ref()
    }

    fn cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::Relaxed))
    }

    fn budget_spent(&self) -> bool {
        self.candidates_verified >= self.options.max_verifications
    }

    fn note_exhausted(&mut self, flag: &mut bool) {
        *flag = true;
        if !self.exhausted_logged {
            self.exhausted_logged = true;
            self.logger.log(BudgetEvent::BudgetExhausted {
                verified: self.candidates_verified,
            });
        }
    }

    /// Run the main loop and produce the plan.
    pub fn plan(&mut self) -> RepairResult<RepairPlan> {
        let initial_errors = self.host.diagnostics()?.len();
        let mut steps: Vec<VerifiedFix> = Vec::new();
        let mut exhausted = false;
        let mut iteration = 0usize;

        while iteration < self.options.max_iterations {
            iteration += 1;
            if exhausted {
                break;
            }
            if self.cancelled() {
                exhausted = true;
                break;
            }
            let iteration_started = Instant::now();
            let verified_at_start = self.candidates_verified;
            let hits_at_start = self.memo_hits;
            let misses_at_start = self.memo_misses;

            let current = self.host.diagnostics()?;
            if current.is_empty() {
                break;
            }
            let error_files = files_with_errors(&current);
            let error_counts = error_counts(&current);

            let mut best: Option<BestCandidate> = None;
            let mut iteration_candidates = 0usize;

            'diagnostics: for diagnostic in &current {
                if self.budget_spent() {
                    self.note_exhausted(&mut exhausted);
                    break 'diagnostics;
                }
                if self.cancelled() {
                    exhausted = true;
                    break 'diagnostics;
                }
                if iteration_candidates >= self.options.max_candidates_per_iteration {
                    break 'diagnostics;
                }

                let raw = self.collect_candidates(diagnostic, &current, &error_files);
                self.candidates_generated += raw.len();
                self.logger.log(BudgetEvent::CandidatesGenerated {
                    diagnostic: format!("{}:{}", diagnostic.file.display(), diagnostic.code),
                    count: raw.len(),
                });

                let limit = self
                    .options
                    .max_candidates
                    .min(self.options.max_candidates_per_iteration - iteration_candidates);
                let pruned = prune_candidates(raw, limit, self.logger.as_mut());
                iteration_candidates += pruned.len();

                for fix in pruned {
                    if self.budget_spent() {
                        self.note_exhausted(&mut exhausted);
                        break 'diagnostics;
                    }
                    if self.cancelled() {
                        exhausted = true;
                        break 'diagnostics;
                    }

                    let risk = candidate_risk(&fix);
                    if risk == Risk::High && !self.options.include_high_risk {
                        self.logger.log(BudgetEvent::CandidatePruned {
                            fix_name: fix.fix_name.clone(),
                            reason: "high risk suppressed".to_string(),
                        });
                        continue;
                    }

                    let cone_ctx = ConeContext {
                        files_with_errors: &error_files,
                        error_count_by_file: &error_counts,
                        reverse_deps: None,
                        target_file: Some(&diagnostic.file),
                        iteration,
                    };
                    let (outcome, cached) = match self.verify(diagnostic, &fix, &cone_ctx, false)
                    {
                        Ok(result) => result,
                        Err(err) if err.is_candidate_local() => {
                            self.logger.log(BudgetEvent::CandidatePruned {
                                fix_name: fix.fix_name.clone(),
                                reason: err.to_string(),
                            });
                            continue;
                        }
                        Err(err) => return Err(err),
                    };

                    if !qualifies(&outcome, self.options.allow_regressions) {
                        continue;
                    }
                    let score = self.options.scoring.score(&outcome, risk);
                    if score <= 0.0 {
                        continue;
                    }

                    // Ties break by risk ascending, then edit size ascending,
                    // then first-seen.
                    let replace = match &best {
                        None => true,
                        Some(current_best) => {
                            score > current_best.score
                                || (score == current_best.score
                                    && (risk as u8, outcome.edit_size)
                                        < (current_best.risk as u8, current_best.outcome.edit_size))
                        }
                    };
                    if replace {
                        best = Some(BestCandidate {
                            diagnostic: diagnostic.clone(),
                            fix,
                            outcome,
                            risk,
                            score,
                            cached,
                        });
                    }
                }
            }

            let Some(mut chosen) = best else {
                self.log_iteration(
                    iteration,
                    verified_at_start,
                    hits_at_start,
                    misses_at_start,
                    iteration_started,
                );
                break;
            };

            if chosen.cached {
                // A memoized winner is re-verified against the live workspace
                // before it may commit.
                if self.budget_spent() {
                    self.note_exhausted(&mut exhausted);
                    self.log_iteration(
                        iteration,
                        verified_at_start,
                        hits_at_start,
                        misses_at_start,
                        iteration_started,
                    );
                    continue;
                }
                let cone_ctx = ConeContext {
                    files_with_errors: &error_files,
                    error_count_by_file: &error_counts,
                    reverse_deps: None,
                    target_file: Some(&chosen.diagnostic.file),
                    iteration,
                };
                let fresh = match self.verify(&chosen.diagnostic, &chosen.fix, &cone_ctx, true) {
                    Ok((outcome, _)) => outcome,
                    Err(err) if err.is_candidate_local() => {
                        self.log_iteration(
                            iteration,
                            verified_at_start,
                            hits_at_start,
                            misses_at_start,
                            iteration_started,
                        );
                        continue;
                    }
                    Err(err) => return Err(err),
                };
                let score = self.options.scoring.score(&fresh, chosen.risk);
                if !qualifies(&fresh, self.options.allow_regressions) || score <= 0.0 {
                    self.logger.log(BudgetEvent::CandidatePruned {
                        fix_name: chosen.fix.fix_name.clone(),
                        reason: "memoized result did not replay".to_string(),
                    });
                    self.log_iteration(
                        iteration,
                        verified_at_start,
                        hits_at_start,
                        misses_at_start,
                        iteration_started,
                    );
                    continue;
                }
                chosen.outcome = fresh;
                chosen.score = score;
                chosen.cached = false;
            }

            self.commit(&chosen)?;
            self.guard.after_commit();
            let id = format!("fix-{}", steps.len() + 1);
            self.logger.log(BudgetEvent::FixCommitted {
                id: id.clone(),
                fix_name: chosen.fix.fix_name.clone(),
                score: chosen.score,
            });
            steps.push(VerifiedFix {
                id,
                fix_name: chosen.fix.fix_name.clone(),
                description: chosen.fix.description.clone(),
                risk: chosen.risk,
                diagnostic: chosen.diagnostic.clone(),
                changes: chosen.fix.changes().to_vec(),
                effect: FixEffect {
                    before: chosen.outcome.errors_before,
                    after: chosen.outcome.errors_after,
                    delta: chosen.outcome.delta,
                },
                dependencies: FixDependencies {
                    exclusive_group: exclusive_group_of(&chosen.fix),
                    ..FixDependencies::default()
                },
            });

            // Committed edits invalidate cached before-lists.
            match self.options.policy.cache_key_strategy {
                CacheKeyStrategy::ConeAndIteration => self.cache.clear_iteration(iteration),
                CacheKeyStrategy::Cone => self.cache.clear(),
            }

            self.log_iteration(
                iteration,
                verified_at_start,
                hits_at_start,
                misses_at_start,
                iteration_started,
            );
        }

        let remaining_raw = self.host.diagnostics()?;
        let final_errors = remaining_raw.len();
        let remaining = self.classify_remaining(&remaining_raw, &mut exhausted)?;

        populate_dependencies(&mut steps);
        let batches = compute_batches(&steps);
        let summary = PlanSummary {
            initial_errors,
            final_errors,
            fixed_count: steps.len(),
            remaining_count: remaining.len(),
            budget: BudgetStats {
                candidates_generated: self.candidates_generated,
                candidates_verified: self.candidates_verified,
                verification_budget: self.options.max_verifications,
                budget_exhausted: exhausted,
            },
        };
        Ok(RepairPlan {
            summary,
            steps,
            remaining,
            batches,
        })
    }

    /// Count candidates without verifying anything.
    pub fn preview(&mut self) -> RepairResult<BudgetPreview> {
        let current = self.host.diagnostics()?;
        let error_files = files_with_errors(&current);
        let mut generated = 0usize;
        let mut after_prune = 0usize;
        let mut suppressed = 0usize;
        for diagnostic in &current {
            let raw = self.collect_candidates(diagnostic, &current, &error_files);
            generated += raw.len();
            let pruned = prune_candidates(raw, self.options.max_candidates, self.logger.as_mut());
            if !self.options.include_high_risk {
                suppressed += pruned
                    .iter()
                    .filter(|fix| candidate_risk(fix) == Risk::High)
                    .count();
            }
            after_prune += pruned.len();
        }
        Ok(BudgetPreview {
            diagnostics: current.len(),
            candidates_generated: generated,
            candidates_after_prune: after_prune,
            high_risk_suppressed: suppressed,
            verification_budget: self.options.max_verifications,
        })
    }

    /// Native fixes first, then builder candidates, deduplicated by key in
    /// that order.
    fn collect_candidates(
        &mut self,
        diagnostic: &Diagnostic,
        current: &[Diagnostic],
        error_files: &[PathBuf],
    ) -> Vec<CandidateFix> {
        let mut out: Vec<CandidateFix> = Vec::new();
        for action in self.host.code_fixes(diagnostic) {
            let changes = self.host.action_changes(&action);
            if changes.is_empty() {
                continue;
            }
            out.push(CandidateFix::native(action, changes));
        }
        let ctx = BuilderContext {
            diagnostic,
            vfs: self.host.vfs(),
            options: self.host.options(),
            files_with_errors: error_files,
            current_diagnostics: current,
        };
        out.extend(self.registry.generate_candidates(&ctx, self.logger.as_mut()));

        let mut seen: HashSet<String> = HashSet::new();
        out.retain(|fix| seen.insert(fix.key()));
        out
    }

    /// One verification cycle: snapshot, apply, re-check, restore. The
    /// snapshot is restored on every exit path, including checker errors.
    fn verify(
        &mut self,
        diagnostic: &Diagnostic,
        fix: &CandidateFix,
        cone_ctx: &ConeContext<'_>,
        force: bool,
    ) -> RepairResult<(VerifyOutcome, bool)> {
        let cone = build_cone(fix, cone_ctx, &self.options.policy);
        let memo_key = (diagnostic.key(), fix.key());
        let fingerprint = self.cone_fingerprint(&cone);

        if !force {
            if let Some(entry) = self.memo.get(&memo_key) {
                if entry.fingerprint == fingerprint {
                    self.memo_hits += 1;
                    self.logger.log(BudgetEvent::VerificationEnd {
                        fix_name: fix.fix_name.clone(),
                        target_fixed: entry.outcome.target_fixed,
                        delta: entry.outcome.delta,
                        cached: true,
                    });
                    return Ok((entry.outcome.clone(), true));
                }
            }
        }
        self.memo_misses += 1;
        self.logger.log(BudgetEvent::VerificationStart {
            fix_name: fix.fix_name.clone(),
            cone_files: cone.files.len(),
        });

        let token = self.host.vfs_mut().snapshot()?;
        let result = self.measure(diagnostic, fix, &cone);
        self.host.vfs_mut().restore(token);
        self.host.notify_all_files_changed();
        let outcome = result?;

        self.candidates_verified += 1;
        self.guard.after_verification(self.host.as_mut());
        self.logger.log(BudgetEvent::VerificationEnd {
            fix_name: fix.fix_name.clone(),
            target_fixed: outcome.target_fixed,
            delta: outcome.delta,
            cached: false,
        });
        self.memo.insert(
            memo_key,
            MemoEntry {
                fingerprint,
                outcome: outcome.clone(),
            },
        );
        Ok((outcome, false))
    }

    /// Runs under an installed snapshot; never restores itself.
    fn measure(
        &mut self,
        diagnostic: &Diagnostic,
        fix: &CandidateFix,
        cone: &Cone,
    ) -> RepairResult<VerifyOutcome> {
        let before = self.before_diagnostics(cone)?;
        self.apply_speculative(fix, cone)?;
        let after: Vec<Diagnostic> = self
            .host
            .diagnostics()?
            .into_iter()
            .filter(|d| cone.contains(&d.file))
            .collect();
        Ok(compute_outcome(diagnostic, &before, &after, fix.edit_size()))
    }

    fn before_diagnostics(&mut self, cone: &Cone) -> RepairResult<Vec<Diagnostic>> {
        if self.options.policy.cache_before_diagnostics {
            if let Some(cached) = self.cache.get(&cone.signature) {
                return Ok(cached);
            }
        }
        let filtered: Vec<Diagnostic> = self
            .host
            .diagnostics()?
            .into_iter()
            .filter(|d| cone.contains(&d.file))
            .collect();
        if self.options.policy.cache_before_diagnostics {
            self.cache.insert(cone.signature.clone(), filtered.clone());
        }
        Ok(filtered)
    }

    fn apply_speculative(&mut self, fix: &CandidateFix, cone: &Cone) -> RepairResult<()> {
        match &fix.kind {
            CandidateKind::Native(action) => self.host.apply_fix(action)?,
            CandidateKind::Synthetic => {
                let touched = apply_changes(self.host.vfs_mut(), fix.changes())?;
                for path in &touched {
                    self.host.notify_file_changed(path);
                }
            }
        }
        match self.options.policy.host_invalidation {
            HostInvalidation::Modified => {}
            HostInvalidation::Cone => {
                for path in &cone.files {
                    self.host.notify_file_changed(path);
                }
            }
            HostInvalidation::Full => self.host.notify_all_files_changed(),
        }
        Ok(())
    }

    /// Apply the winning candidate for real (no snapshot).
    fn commit(&mut self, chosen: &BestCandidate) -> RepairResult<()> {
        match &chosen.fix.kind {
            CandidateKind::Native(action) => self.host.apply_fix(action)?,
            CandidateKind::Synthetic => {
                let touched = apply_changes(self.host.vfs_mut(), chosen.fix.changes())?;
                for path in &touched {
                    self.host.notify_file_changed(path);
                }
            }
        }
        Ok(())
    }

    fn cone_fingerprint(&self, cone: &Cone) -> u64 {
        use std::collections::hash_map::DefaultHasher;
        use std::hash::{Hash, Hasher};
        let mut hasher = DefaultHasher::new();
        for file in &cone.files {
            file.hash(&mut hasher);
            self.host.vfs().get_content(file).hash(&mut hasher);
        }
        hasher.finish()
    }

    fn classify_remaining(
        &mut self,
        diagnostics: &[Diagnostic],
        exhausted: &mut bool,
    ) -> RepairResult<Vec<ClassifiedDiagnostic>> {
        let error_files = files_with_errors(diagnostics);
        let error_counts = error_counts(diagnostics);
        // A cone iteration key past every loop iteration.
        let classification_iteration = self.options.max_iterations + 1;
        let mut out = Vec::with_capacity(diagnostics.len());

        for diagnostic in diagnostics {
            if *exhausted || self.cancelled() {
                out.push(ClassifiedDiagnostic {
                    diagnostic: diagnostic.clone(),
                    disposition: Disposition::NeedsJudgment,
                    candidate_count: 0,
                });
                continue;
            }

            let raw = self.collect_candidates(diagnostic, diagnostics, &error_files);
            let generated = raw.len();
            if generated == 0 {
                out.push(ClassifiedDiagnostic {
                    diagnostic: diagnostic.clone(),
                    disposition: Disposition::NoGeneratedCandidate,
                    candidate_count: 0,
                });
                continue;
            }

            let pruned =
                prune_candidates(raw, self.options.max_candidates, self.logger.as_mut());
            let mut qualifying: Vec<Risk> = Vec::new();
            let mut interrupted = false;
            for fix in pruned {
                if self.budget_spent() {
                    self.note_exhausted(exhausted);
                    interrupted = true;
                    break;
                }
                if self.cancelled() {
                    *exhausted = true;
                    interrupted = true;
                    break;
                }
                let risk = candidate_risk(&fix);
                let cone_ctx = ConeContext {
                    files_with_errors: &error_files,
                    error_count_by_file: &error_counts,
                    reverse_deps: None,
                    target_file: Some(&diagnostic.file),
                    iteration: classification_iteration,
                };
                match self.verify(diagnostic, &fix, &cone_ctx, false) {
                    Ok((outcome, _cached)) => {
                        let score = self.options.scoring.score(&outcome, risk);
                        if outcome.target_fixed && score > 0.0 && outcome.resolved_weight > 0.0 {
                            qualifying.push(risk);
                        }
                    }
                    Err(err) if err.is_candidate_local() => continue,
                    Err(err) => return Err(err),
                }
            }

            if interrupted {
                out.push(ClassifiedDiagnostic {
                    diagnostic: diagnostic.clone(),
                    disposition: Disposition::NeedsJudgment,
                    candidate_count: 0,
                });
                continue;
            }
            let (disposition, candidate_count) = classify::decide(generated, &qualifying);
            out.push(ClassifiedDiagnostic {
                diagnostic: diagnostic.clone(),
                disposition,
                candidate_count,
            });
        }
        Ok(out)
    }

    fn log_iteration(
        &mut self,
        iteration: usize,
        verified_at_start: usize,
        hits_at_start: usize,
        misses_at_start: usize,
        started: Instant,
    ) {
        self.logger.log(BudgetEvent::IterationCompleted {
            iteration,
            verifications: self.candidates_verified - verified_at_start,
            cache_hits: self.memo_hits - hits_at_start,
            cache_misses: self.memo_misses - misses_at_start,
            duration_ms: started.elapsed().as_millis() as u64,
        });
    }
}

/// Commit-blocking gate: the target must be fixed, nothing new introduced
/// (unless regressions are allowed), and the cone strictly improved.
fn qualifies(outcome: &VerifyOutcome, allow_regressions: bool) -> bool {
    outcome.target_fixed
        && (allow_regressions || outcome.introduced.is_empty())
        && outcome.delta > 0
        && outcome.resolved_weight > 0.0
}

fn compute_outcome(
    target: &Diagnostic,
    before: &[Diagnostic],
    after: &[Diagnostic],
    edit_size: usize,
) -> VerifyOutcome {
    let target_key = target.key();
    let before_keys: HashSet<DiagnosticKey> = before.iter().map(Diagnostic::key).collect();
    let after_keys: HashSet<DiagnosticKey> = after.iter().map(Diagnostic::key).collect();

    let target_fixed = !after_keys.contains(&target_key);
    let introduced: Vec<Diagnostic> = after
        .iter()
        .filter(|d| !before_keys.contains(&d.key()))
        .cloned()
        .collect();
    let resolved: Vec<Diagnostic> = before
        .iter()
        .filter(|d| !after_keys.contains(&d.key()))
        .cloned()
        .collect();
    let resolved_weight = resolved.iter().map(|d| d.severity.weight()).sum();
    let introduced_weight = introduced.iter().map(|d| d.severity.weight()).sum();

    VerifyOutcome {
        target_fixed,
        errors_before: before.len(),
        errors_after: after.len(),
        delta: before.len() as i64 - after.len() as i64,
        resolved,
        introduced,
        resolved_weight,
        introduced_weight,
        edit_size,
    }
}

/// The risk the planner acts on: the producer's hint, else the name table.
pub(crate) fn candidate_risk(fix: &CandidateFix) -> Risk {
    fix.risk_hint.unwrap_or_else(|| risk_for(&fix.fix_name))
}

/// Cheap pre-verification ranking: risk order dominates, large edits are
/// discounted, ties keep insertion order. Everything past `limit` is pruned.
fn prune_candidates(
    raw: Vec<CandidateFix>,
    limit: usize,
    logger: &mut dyn BudgetLogger,
) -> Vec<CandidateFix> {
    let mut indexed: Vec<(usize, CandidateFix)> = raw.into_iter().enumerate().collect();
    indexed.sort_by(|(index_a, a), (index_b, b)| {
        prune_score(b)
            .partial_cmp(&prune_score(a))
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| index_a.cmp(index_b))
    });
    let mut kept = Vec::new();
    for (_, fix) in indexed {
        if kept.len() < limit {
            kept.push(fix);
        } else {
            logger.log(BudgetEvent::CandidatePruned {
                fix_name: fix.fix_name.clone(),
                reason: "over candidate limit".to_string(),
            });
        }
    }
    kept
}

fn prune_score(fix: &CandidateFix) -> f64 {
    candidate_risk(fix).prune_order() * 10.0 - (fix.edit_size() as f64 / 100.0).clamp(0.0, 5.0)
}

fn exclusive_group_of(fix: &CandidateFix) -> Option<String> {
    fix.metadata
        .as_ref()?
        .get("exclusiveGroup")?
        .as_str()
        .map(str::to_string)
}

/// Distinct files carrying errors, in diagnostic order (already sorted by
/// file).
fn files_with_errors(diagnostics: &[Diagnostic]) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = diagnostics.iter().map(|d| d.file.clone()).collect();
    files.dedup();
    files
}

fn error_counts(diagnostics: &[Diagnostic]) -> BTreeMap<PathBuf, usize> {
    let mut counts: BTreeMap<PathBuf, usize> = BTreeMap::new();
    for diagnostic in diagnostics {
        *counts.entry(diagnostic.file.clone()).or_insert(0) += 1;
    }
    counts
}

/// Convenience request with aliases over [`PlanOptions`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RepairRequest {
    pub project: PathBuf,
    pub options: PlanOptions,
    pub include_high_risk: Option<bool>,
    pub allow_regressions: Option<bool>,
    pub max_verifications: Option<usize>,
    pub preset: Option<PolicyPreset>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum PolicyPreset {
    Default,
    Structural,
    Wide,
}

impl PolicyPreset {
    pub fn policy(self) -> VerificationPolicy {
        match self {
            PolicyPreset::Default => VerificationPolicy::default(),
            PolicyPreset::Structural => VerificationPolicy::structural(),
            PolicyPreset::Wide => VerificationPolicy::wide(),
        }
    }
}

impl RepairRequest {
    pub fn new(project: impl Into<PathBuf>) -> Self {
        Self {
            project: project.into(),
            ..Self::default()
        }
    }

    /// `PlanOptions` with every alias folded in.
    pub fn resolved_options(&self) -> PlanOptions {
        let mut options = self.options.clone();
        if let Some(include_high_risk) = self.include_high_risk {
            options.include_high_risk = include_high_risk;
        }
        if let Some(allow_regressions) = self.allow_regressions {
            options.allow_regressions = allow_regressions;
        }
        if let Some(max_verifications) = self.max_verifications {
            options.max_verifications = max_verifications;
        }
        if let Some(preset) = self.preset {
            options.policy = preset.policy();
        }
        options
    }
}

/// Plan repairs for the project at `project_path` using the reference
/// checker. Embedders with their own language backend construct a
/// [`Planner`] over their own [`TypeCheckHost`] instead.
#[cfg(feature = "filesystem")]
pub fn plan(
    project_path: &std::path::Path,
    options: PlanOptions,
) -> RepairResult<RepairPlan> {
    let host = crate::host::CheckHost::from_project(
        Box::new(crate::symcheck::SymbolChecker),
        project_path,
    )?;
    Planner::new(Box::new(host), options)?.plan()
}

/// [`plan`] driven by a [`RepairRequest`], with an optional event logger.
#[cfg(feature = "filesystem")]
pub fn repair(
    request: &RepairRequest,
    logger: Option<Box<dyn BudgetLogger>>,
) -> RepairResult<RepairPlan> {
    let host = crate::host::CheckHost::from_project(
        Box::new(crate::symcheck::SymbolChecker),
        &request.project,
    )?;
    let mut planner = Planner::new(Box::new(host), request.resolved_options())?;
    if let Some(logger) = logger {
        planner = planner.with_logger(logger);
    }
    planner.plan()
}

/// Count candidates for the project without verifying any.
#[cfg(feature = "filesystem")]
pub fn preview(
    project_path: &std::path::Path,
    options: PlanOptions,
) -> RepairResult<BudgetPreview> {
    let host = crate::host::CheckHost::from_project(
        Box::new(crate::symcheck::SymbolChecker),
        project_path,
    )?;
    Planner::new(Box::new(host), options)?.preview()
}
