//! Verification policy: scope, cone caps, caching, and host invalidation.

use crate::candidate::Scope;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// How before-diagnostic cache entries are keyed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum CacheKeyStrategy {
    /// Key on the cone's file set only.
    #[serde(rename = "cone")]
    Cone,
    /// Prefix the key with the iteration number, invalidating across
    /// iterations.
    #[serde(rename = "cone+iteration")]
    ConeAndIteration,
}

/// How much checker state is invalidated after a speculative apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum HostInvalidation {
    /// Only the files the candidate modified.
    Modified,
    /// Every file in the verification cone.
    Cone,
    /// The whole project.
    Full,
}

/// Cone growth beyond the candidate's modified files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct ConeExpansion {
    /// Pull files that currently have errors into the cone.
    pub include_errors: bool,
    /// Pull reverse dependencies of modified files into the cone (needs a
    /// reverse-dependency map in the cone context).
    pub include_reverse_deps: bool,
    /// At most this many error files, picked by descending error count.
    pub top_k_error_files: usize,
    /// Reverse-dependency traversal depth.
    pub reverse_dep_depth: usize,
}

impl Default for ConeExpansion {
    fn default() -> Self {
        Self {
            include_errors: false,
            include_reverse_deps: false,
            top_k_error_files: 10,
            reverse_dep_depth: 1,
        }
    }
}

/// Defaults and hard caps for the verification machinery.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct VerificationPolicy {
    /// Scope used when a candidate carries no hint (or hints `modified`).
    pub default_scope: Scope,
    pub allow_regressions: bool,
    /// Hard cap on cone size; modified files are always retained.
    pub max_cone_files: usize,
    /// Budget of error diagnostics pulled in through error-file expansion.
    pub max_cone_errors: usize,
    pub cone_expansion: ConeExpansion,
    pub cache_before_diagnostics: bool,
    pub cache_key_strategy: CacheKeyStrategy,
    pub host_invalidation: HostInvalidation,
}

impl Default for VerificationPolicy {
    fn default() -> Self {
        Self {
            default_scope: Scope::Modified,
            allow_regressions: false,
            max_cone_files: 50,
            max_cone_errors: 100,
            cone_expansion: ConeExpansion::default(),
            cache_before_diagnostics: true,
            cache_key_strategy: CacheKeyStrategy::ConeAndIteration,
            host_invalidation: HostInvalidation::Modified,
        }
    }
}

impl VerificationPolicy {
    /// Preset for fixes that reshape declarations: re-check error files too
    /// and invalidate the whole cone after an apply.
    pub fn structural() -> Self {
        Self {
            default_scope: Scope::Errors,
            cone_expansion: ConeExpansion {
                include_errors: true,
                ..ConeExpansion::default()
            },
            host_invalidation: HostInvalidation::Cone,
            ..Self::default()
        }
    }

    /// Structural plus reverse-dependency expansion and larger caps.
    pub fn wide() -> Self {
        Self {
            default_scope: Scope::Wide,
            max_cone_files: 200,
            max_cone_errors: 400,
            cone_expansion: ConeExpansion {
                include_errors: true,
                include_reverse_deps: true,
                ..ConeExpansion::default()
            },
            host_invalidation: HostInvalidation::Cone,
            ..Self::default()
        }
    }

    /// Reject configurations the cone construction cannot honor.
    pub fn validate(&self) -> Result<(), PolicyError> {
        if self.max_cone_files == 0 {
            return Err(PolicyError::NonPositiveLimit {
                field: "maxConeFiles",
            });
        }
        if self.max_cone_errors == 0 {
            return Err(PolicyError::NonPositiveLimit {
                field: "maxConeErrors",
            });
        }
        if self.cone_expansion.top_k_error_files == 0 {
            return Err(PolicyError::NonPositiveLimit {
                field: "coneExpansion.topKErrorFiles",
            });
        }
        if self.cone_expansion.reverse_dep_depth == 0 {
            return Err(PolicyError::NonPositiveLimit {
                field: "coneExpansion.reverseDepDepth",
            });
        }
        if self.cone_expansion.top_k_error_files > self.max_cone_files {
            return Err(PolicyError::TopKExceedsConeCap {
                top_k: self.cone_expansion.top_k_error_files,
                max_cone_files: self.max_cone_files,
            });
        }
        Ok(())
    }
}

/// Hard errors that make a policy unusable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PolicyError {
    NonPositiveLimit {
        field: &'static str,
    },
    TopKExceedsConeCap {
        top_k: usize,
        max_cone_files: usize,
    },
}

impl std::fmt::Display for PolicyError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PolicyError::NonPositiveLimit { field } => {
                write!(f, "policy option '{field}' must be positive")
            }
            PolicyError::TopKExceedsConeCap {
                top_k,
                max_cone_files,
            } => write!(
                f,
                "topKErrorFiles ({top_k}) exceeds maxConeFiles ({max_cone_files})"
            ),
        }
    }
}

impl std::error::Error for PolicyError {}
