//! # typemend-core
//!
//! Oracle-guided repair planning for type-checked projects.
//!
//! Given a project that fails type-checking, the planner produces a verified
//! repair plan: an ordered list of concrete text edits, each empirically
//! shown - by re-running the checker on a speculatively modified workspace -
//! to reduce the diagnostic set without introducing new errors, plus a
//! classification of whatever remains.
//!
//! The engine is language-agnostic: parsing and semantic analysis live
//! behind the [`Checker`] trait, and the planner only talks to a
//! [`TypeCheckHost`]. A reference checker for a miniature symbol language
//! ships in [`symcheck`] and backs the test suite and the CLI demo path.
//!
//! ## Stability Tiers
//!
//! Public modules are classified into stability tiers:
//!
//! - **Stable** -- `vfs`, `diagnostics`, `candidate`, `plan`, `host`.
//!   These modules follow semver: breaking changes require a major version
//!   bump.
//! - **Unstable** -- `builders`, `cone`, `policy`, `scoring`, `telemetry`,
//!   `checker`, `symcheck`, `manifest`. Interfaces may change on minor
//!   releases. Use with care in downstream crates.

/// Solution builders and the builder context.
///
/// **Stability: unstable** -- interface may change on minor releases.
pub mod builders;
/// Candidate fixes, file changes, normalization, and conflict detection.
///
/// **Stability: stable** -- breaking changes require a major version bump.
pub mod candidate;
/// The checker backend seam and native actions.
///
/// **Stability: unstable** -- interface may change on minor releases.
pub mod checker;
mod classify;
/// Verification cones and the before-diagnostics cache.
///
/// **Stability: unstable** -- interface may change on minor releases.
pub mod cone;
/// Diagnostic, severity, key, and error types.
///
/// **Stability: stable** -- breaking changes require a major version bump.
pub mod diagnostics;
mod guard;
/// The type-check host contract and its incremental implementation.
///
/// **Stability: stable** -- breaking changes require a major version bump.
pub mod host;
/// Project manifest loading.
///
/// **Stability: unstable** -- interface may change on minor releases.
#[cfg(feature = "filesystem")]
pub mod manifest;
/// The verified plan object and its persisted JSON shape.
///
/// **Stability: stable** -- breaking changes require a major version bump.
pub mod plan;
mod planner;
/// Verification policy, presets, and validation.
///
/// **Stability: unstable** -- interface may change on minor releases.
pub mod policy;
mod registry;
/// Risk tagging and scoring strategies.
///
/// **Stability: unstable** -- interface may change on minor releases.
pub mod scoring;
pub(crate) mod span_utils;
/// Reference checker for the miniature symbol language.
///
/// **Stability: unstable** -- interface may change on minor releases.
pub mod symcheck;
/// Budget events and loggers.
///
/// **Stability: unstable** -- interface may change on minor releases.
pub mod telemetry;
/// The virtual file system with copy-on-write snapshots.
///
/// **Stability: stable** -- breaking changes require a major version bump.
pub mod vfs;

pub use builders::{BuilderContext, MAX_CANDIDATES_PER_BUILDER, SolutionBuilder};
pub use candidate::{
    CandidateFix, CandidateKind, FileChange, Scope, apply_changes, changes_conflict, normalize,
};
pub use checker::{Checker, CheckerOptions, NativeAction};
pub use cone::{Cone, ConeContext, DiagnosticCache, build_cone};
pub use diagnostics::{Diagnostic, DiagnosticKey, RepairError, RepairResult, Severity};
pub use guard::MemoryGuard;
pub use host::{CheckHost, HostStats, TypeCheckHost};
#[cfg(feature = "filesystem")]
pub use manifest::ProjectManifest;
pub use plan::{
    BudgetStats, ClassifiedDiagnostic, Disposition, FixDependencies, FixEffect, PlanSummary,
    RepairPlan, VerifiedFix, generate_plan_schema,
};
#[cfg(feature = "filesystem")]
pub use planner::{plan, preview, repair};
pub use planner::{
    BudgetPreview, PlanOptions, Planner, PolicyPreset, RepairRequest, VerifyOutcome,
};
pub use policy::{
    CacheKeyStrategy, ConeExpansion, HostInvalidation, PolicyError, VerificationPolicy,
};
pub use registry::BuilderRegistry;
pub use scoring::{Risk, RiskPenalty, ScoringStrategy, WeightedParams, risk_for};
pub use symcheck::SymbolChecker;
pub use telemetry::{
    BudgetEvent, BudgetLogger, EventRecord, MemoryLogger, NoopLogger, TraceLogger,
};
pub use vfs::{SnapshotToken, Vfs};
