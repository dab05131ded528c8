//! Verification cones and the before-diagnostics cache.
//!
//! A cone is the set of files whose diagnostics are measured to judge a
//! candidate. It starts from the candidate's modified files and grows per
//! policy; its deterministic signature keys the cache of "before"
//! diagnostics so repeated verifications against the same state skip one
//! oracle call.

use crate::candidate::{CandidateFix, Scope};
use crate::diagnostics::Diagnostic;
use crate::policy::{CacheKeyStrategy, VerificationPolicy};
use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};
use std::path::{Path, PathBuf};

/// Per-iteration context the cone is computed against.
pub struct ConeContext<'a> {
    pub files_with_errors: &'a [PathBuf],
    pub error_count_by_file: &'a BTreeMap<PathBuf, usize>,
    /// Optional reverse-dependency map (file -> files depending on it).
    pub reverse_deps: Option<&'a BTreeMap<PathBuf, Vec<PathBuf>>>,
    /// The diagnostic under repair; its file always joins the cone.
    pub target_file: Option<&'a Path>,
    pub iteration: usize,
}

/// The files to re-check for one candidate, with a cache signature.
#[derive(Debug, Clone, PartialEq)]
pub struct Cone {
    pub scope: Scope,
    pub files: BTreeSet<PathBuf>,
    pub signature: String,
    pub capped: bool,
}

impl Cone {
    pub fn contains(&self, path: &Path) -> bool {
        self.files.contains(path)
    }
}

/// Compute the cone for one candidate.
///
/// The effective scope is the candidate's hint unless it is `modified`, in
/// which case the policy default applies. Modified files (and the target
/// file) are always retained when the cap trims the cone; expansion files are
/// kept in descending error-count order.
pub fn build_cone(
    candidate: &CandidateFix,
    ctx: &ConeContext<'_>,
    policy: &VerificationPolicy,
) -> Cone {
    let mut always: BTreeSet<PathBuf> = candidate.modified_files();
    if let Some(target) = ctx.target_file {
        always.insert(target.to_path_buf());
    }

    let scope = match candidate.scope_hint {
        Some(hint) if hint != Scope::Modified => hint,
        _ => policy.default_scope,
    };

    let mut files = always.clone();
    if matches!(scope, Scope::Errors | Scope::Wide) && policy.cone_expansion.include_errors {
        files.extend(top_error_files(ctx, policy));
    }
    if scope == Scope::Wide && policy.cone_expansion.include_reverse_deps {
        if let Some(reverse_deps) = ctx.reverse_deps {
            files.extend(reverse_dependencies(
                &always,
                reverse_deps,
                policy.cone_expansion.reverse_dep_depth,
            ));
        }
    }

    let mut capped = false;
    if files.len() > policy.max_cone_files {
        capped = true;
        let mut kept = always.clone();
        let mut extras: Vec<&PathBuf> = files.difference(&always).collect();
        extras.sort_by(|a, b| {
            let count_a = ctx.error_count_by_file.get(*a).copied().unwrap_or(0);
            let count_b = ctx.error_count_by_file.get(*b).copied().unwrap_or(0);
            count_b.cmp(&count_a).then_with(|| a.cmp(b))
        });
        for extra in extras {
            if kept.len() >= policy.max_cone_files {
                break;
            }
            kept.insert(extra.clone());
        }
        files = kept;
    }

    let signature = signature_for(&files, policy.cache_key_strategy, ctx.iteration);
    Cone {
        scope,
        files,
        signature,
        capped,
    }
}

/// Error files by descending error count, bounded by `topKErrorFiles` and the
/// `maxConeErrors` diagnostic budget.
fn top_error_files(ctx: &ConeContext<'_>, policy: &VerificationPolicy) -> Vec<PathBuf> {
    let mut error_files: Vec<&PathBuf> = ctx.files_with_errors.iter().collect();
    error_files.sort_by(|a, b| {
        let count_a = ctx.error_count_by_file.get(*a).copied().unwrap_or(0);
        let count_b = ctx.error_count_by_file.get(*b).copied().unwrap_or(0);
        count_b.cmp(&count_a).then_with(|| a.cmp(b))
    });

    let mut picked = Vec::new();
    let mut error_budget = policy.max_cone_errors;
    for file in error_files
        .into_iter()
        .take(policy.cone_expansion.top_k_error_files)
    {
        let count = ctx.error_count_by_file.get(file).copied().unwrap_or(0);
        if count > error_budget {
            break;
        }
        error_budget -= count;
        picked.push(file.clone());
    }
    picked
}

fn reverse_dependencies(
    roots: &BTreeSet<PathBuf>,
    reverse_deps: &BTreeMap<PathBuf, Vec<PathBuf>>,
    depth: usize,
) -> BTreeSet<PathBuf> {
    let mut seen: BTreeSet<PathBuf> = BTreeSet::new();
    let mut frontier: Vec<&PathBuf> = roots.iter().collect();
    for _ in 0..depth {
        let mut next: Vec<&PathBuf> = Vec::new();
        for file in frontier {
            if let Some(dependents) = reverse_deps.get(file) {
                for dependent in dependents {
                    if seen.insert(dependent.clone()) {
                        next.push(dependent);
                    }
                }
            }
        }
        if next.is_empty() {
            break;
        }
        frontier = next;
    }
    seen
}

/// Deterministic signature over the sorted file list, optionally prefixed
/// with the iteration number.
pub fn signature_for(
    files: &BTreeSet<PathBuf>,
    strategy: CacheKeyStrategy,
    iteration: usize,
) -> String {
    let joined = files
        .iter()
        .map(|file| file.display().to_string())
        .collect::<Vec<_>>()
        .join("\u{0}");
    match strategy {
        CacheKeyStrategy::Cone => joined,
        CacheKeyStrategy::ConeAndIteration => format!("{iteration}:{joined}"),
    }
}

/// LRU-bounded cache of "before" diagnostic lists keyed by cone signature.
#[derive(Debug)]
pub struct DiagnosticCache {
    capacity: usize,
    entries: HashMap<String, Vec<Diagnostic>>,
    order: VecDeque<String>,
    hits: usize,
    misses: usize,
}

impl DiagnosticCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: HashMap::new(),
            order: VecDeque::new(),
            hits: 0,
            misses: 0,
        }
    }

    pub fn get(&mut self, signature: &str) -> Option<Vec<Diagnostic>> {
        if let Some(diagnostics) = self.entries.get(signature) {
            let diagnostics = diagnostics.clone();
            self.touch(signature);
            self.hits += 1;
            Some(diagnostics)
        } else {
            self.misses += 1;
            None
        }
    }

    pub fn insert(&mut self, signature: String, diagnostics: Vec<Diagnostic>) {
        if self.capacity == 0 {
            return;
        }
        if self.entries.insert(signature.clone(), diagnostics).is_some() {
            self.touch(&signature);
        } else {
            self.order.push_back(signature);
        }
        while self.entries.len() > self.capacity {
            let Some(oldest) = self.order.pop_front() else {
                break;
            };
            self.entries.remove(&oldest);
        }
    }

    /// Drop every entry keyed to one iteration (only meaningful under the
    /// `cone+iteration` strategy).
    pub fn clear_iteration(&mut self, iteration: usize) {
        let prefix = format!("{iteration}:");
        self.entries.retain(|key, _| !key.starts_with(&prefix));
        self.order.retain(|key| !key.starts_with(&prefix));
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn hits(&self) -> usize {
        self.hits
    }

    pub fn misses(&self) -> usize {
        self.misses
    }

    fn touch(&mut self, signature: &str) {
        if let Some(position) = self.order.iter().position(|key| key == signature) {
            self.order.remove(position);
            self.order.push_back(signature.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::candidate::FileChange;

    fn candidate(files: &[&str], scope: Option<Scope>) -> CandidateFix {
        let changes = files
            .iter()
            .map(|file| FileChange::insert(*file, 0, "x"))
            .collect();
        let mut fix = CandidateFix::synthetic("fix", "", changes);
        if let Some(scope) = scope {
            fix = fix.with_scope_hint(scope);
        }
        fix
    }

    fn context<'a>(
        files_with_errors: &'a [PathBuf],
        error_count_by_file: &'a BTreeMap<PathBuf, usize>,
    ) -> ConeContext<'a> {
        ConeContext {
            files_with_errors,
            error_count_by_file,
            reverse_deps: None,
            target_file: None,
            iteration: 1,
        }
    }

    #[test]
    fn test_modified_scope_is_just_modified_files() {
        let errors = vec![PathBuf::from("/p/e.sym")];
        let counts = BTreeMap::from([(PathBuf::from("/p/e.sym"), 3)]);
        let cone = build_cone(
            &candidate(&["/p/a.sym"], None),
            &context(&errors, &counts),
            &VerificationPolicy::default(),
        );
        assert_eq!(cone.scope, Scope::Modified);
        assert_eq!(cone.files.len(), 1);
        assert!(!cone.capped);
    }

    #[test]
    fn test_errors_scope_pulls_in_error_files() {
        let errors = vec![PathBuf::from("/p/e.sym")];
        let counts = BTreeMap::from([(PathBuf::from("/p/e.sym"), 3)]);
        let cone = build_cone(
            &candidate(&["/p/a.sym"], Some(Scope::Errors)),
            &context(&errors, &counts),
            &VerificationPolicy::structural(),
        );
        assert!(cone.contains(Path::new("/p/a.sym")));
        assert!(cone.contains(Path::new("/p/e.sym")));
    }

    #[test]
    fn test_scope_hint_modified_defers_to_policy() {
        let errors = vec![PathBuf::from("/p/e.sym")];
        let counts = BTreeMap::from([(PathBuf::from("/p/e.sym"), 1)]);
        let cone = build_cone(
            &candidate(&["/p/a.sym"], Some(Scope::Modified)),
            &context(&errors, &counts),
            &VerificationPolicy::structural(),
        );
        assert_eq!(cone.scope, Scope::Errors);
    }

    #[test]
    fn test_target_file_always_in_cone() {
        let errors: Vec<PathBuf> = Vec::new();
        let counts = BTreeMap::new();
        let mut ctx = context(&errors, &counts);
        let target = PathBuf::from("/p/target.sym");
        ctx.target_file = Some(&target);
        let cone = build_cone(
            &candidate(&["/p/other.sym"], None),
            &ctx,
            &VerificationPolicy::default(),
        );
        assert!(cone.contains(&target));
    }

    #[test]
    fn test_cap_retains_modified_files() {
        let errors: Vec<PathBuf> = (0..20).map(|i| PathBuf::from(format!("/p/e{i:02}.sym"))).collect();
        let counts: BTreeMap<PathBuf, usize> = errors
            .iter()
            .enumerate()
            .map(|(i, f)| (f.clone(), i + 1))
            .collect();
        let mut policy = VerificationPolicy::structural();
        policy.max_cone_files = 5;
        policy.cone_expansion.top_k_error_files = 5;

        let cone = build_cone(
            &candidate(&["/p/a.sym", "/p/b.sym"], Some(Scope::Errors)),
            &context(&errors, &counts),
            &policy,
        );
        assert!(cone.capped);
        assert_eq!(cone.files.len(), 5);
        assert!(cone.contains(Path::new("/p/a.sym")));
        assert!(cone.contains(Path::new("/p/b.sym")));
        // Highest-error-count expansion files win the remaining slots.
        assert!(cone.contains(Path::new("/p/e19.sym")));
    }

    #[test]
    fn test_reverse_deps_bounded_by_depth() {
        let errors: Vec<PathBuf> = Vec::new();
        let counts = BTreeMap::new();
        let reverse: BTreeMap<PathBuf, Vec<PathBuf>> = BTreeMap::from([
            (
                PathBuf::from("/p/a.sym"),
                vec![PathBuf::from("/p/dep1.sym")],
            ),
            (
                PathBuf::from("/p/dep1.sym"),
                vec![PathBuf::from("/p/dep2.sym")],
            ),
        ]);
        let mut ctx = context(&errors, &counts);
        ctx.reverse_deps = Some(&reverse);

        let policy = VerificationPolicy::wide();
        let cone = build_cone(&candidate(&["/p/a.sym"], Some(Scope::Wide)), &ctx, &policy);
        assert!(cone.contains(Path::new("/p/dep1.sym")));
        assert!(
            !cone.contains(Path::new("/p/dep2.sym")),
            "default depth is one hop"
        );
    }

    #[test]
    fn test_signature_deterministic_and_iteration_keyed() {
        let files: BTreeSet<PathBuf> =
            [PathBuf::from("/p/b.sym"), PathBuf::from("/p/a.sym")].into();
        let plain = signature_for(&files, CacheKeyStrategy::Cone, 7);
        assert_eq!(plain, "/p/a.sym\u{0}/p/b.sym");
        let keyed = signature_for(&files, CacheKeyStrategy::ConeAndIteration, 7);
        assert_eq!(keyed, "7:/p/a.sym\u{0}/p/b.sym");
    }

    #[test]
    fn test_cache_lru_eviction() {
        let mut cache = DiagnosticCache::new(2);
        cache.insert("a".to_string(), Vec::new());
        cache.insert("b".to_string(), Vec::new());
        // Touch "a" so "b" is the least recently used.
        assert!(cache.get("a").is_some());
        cache.insert("c".to_string(), Vec::new());
        assert_eq!(cache.len(), 2);
        assert!(cache.get("b").is_none());
        assert!(cache.get("a").is_some());
        assert!(cache.get("c").is_some());
    }

    #[test]
    fn test_cache_clear_iteration() {
        let mut cache = DiagnosticCache::new(8);
        cache.insert("1:x".to_string(), Vec::new());
        cache.insert("1:y".to_string(), Vec::new());
        cache.insert("2:x".to_string(), Vec::new());
        cache.clear_iteration(1);
        assert_eq!(cache.len(), 1);
        assert!(cache.get("2:x").is_some());
    }

    #[test]
    fn test_cache_hit_and_miss_counters() {
        let mut cache = DiagnosticCache::new(4);
        assert!(cache.get("a").is_none());
        cache.insert("a".to_string(), Vec::new());
        assert!(cache.get("a").is_some());
        assert_eq!(cache.hits(), 1);
        assert_eq!(cache.misses(), 1);
    }
}
