//! The type-check host: a language-agnostic facade over a checker backend.
//!
//! [`CheckHost`] owns the VFS and a [`Checker`], tracks per-file versions,
//! and re-checks only files affected by a version bump. The observable
//! diagnostic list is always equal to a full non-incremental check: sorted by
//! `(file, start, code)` and filtered to error level.

use crate::candidate::{self, FileChange};
use crate::checker::{Checker, CheckerOptions, NativeAction};
use crate::diagnostics::{Diagnostic, RepairResult, Severity};
use crate::vfs::Vfs;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::{Path, PathBuf};

/// Counters for host activity during one plan.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HostStats {
    pub diagnostics_queries: usize,
    pub code_fix_queries: usize,
    pub apply_calls: usize,
}

/// The stable contract the planner relies on.
///
/// `reset` discards edits and checker state alike; `reload` rebuilds checker
/// state over the *current* VFS and is what the memory guard calls, so
/// committed fixes survive it.
pub trait TypeCheckHost {
    fn diagnostics(&mut self) -> RepairResult<Vec<Diagnostic>>;
    fn code_fixes(&mut self, diagnostic: &Diagnostic) -> Vec<NativeAction>;
    fn apply_fix(&mut self, action: &NativeAction) -> RepairResult<()>;
    fn action_changes(&self, action: &NativeAction) -> Vec<FileChange>;
    fn notify_file_changed(&mut self, path: &Path);
    fn notify_all_files_changed(&mut self);
    fn reset(&mut self);
    fn reload(&mut self);
    fn vfs(&self) -> &Vfs;
    fn vfs_mut(&mut self) -> &mut Vfs;
    fn file_names(&self) -> Vec<PathBuf>;
    fn options(&self) -> &CheckerOptions;
    fn stats(&self) -> HostStats;
    fn reset_stats(&mut self);
}

#[derive(Debug)]
struct CachedFile {
    version: u64,
    diagnostics: Vec<Diagnostic>,
}

/// Incremental [`TypeCheckHost`] over any [`Checker`].
#[derive(Debug)]
pub struct CheckHost {
    checker: Box<dyn Checker>,
    vfs: Vfs,
    options: CheckerOptions,
    versions: HashMap<PathBuf, u64>,
    cache: BTreeMap<PathBuf, CachedFile>,
    checked_once: bool,
    stats: HostStats,
}

impl CheckHost {
    pub fn new(checker: Box<dyn Checker>, vfs: Vfs, options: CheckerOptions) -> Self {
        Self {
            checker,
            vfs,
            options,
            versions: HashMap::new(),
            cache: BTreeMap::new(),
            checked_once: false,
            stats: HostStats::default(),
        }
    }

    /// Load the project manifest at `config_path` and stand the host up over
    /// its file set.
    #[cfg(feature = "filesystem")]
    pub fn from_project(checker: Box<dyn Checker>, config_path: &Path) -> RepairResult<Self> {
        let manifest = crate::manifest::ProjectManifest::load(config_path)?;
        let vfs = Vfs::from_manifest(&manifest)?;
        Ok(Self::new(checker, vfs, manifest.options))
    }

    fn version_of(&self, path: &Path) -> u64 {
        self.versions.get(path).copied().unwrap_or(0)
    }

    /// Files whose cache entry is missing or stale, expanded through the
    /// checker's dependency knowledge.
    fn stale_set(&self, names: &[PathBuf]) -> BTreeSet<PathBuf> {
        let mut changed: Vec<&PathBuf> = Vec::new();
        for name in names {
            let fresh = self
                .cache
                .get(name)
                .is_some_and(|cached| cached.version == self.version_of(name));
            if !fresh {
                changed.push(name);
            }
        }
        let mut affected: BTreeSet<PathBuf> = changed.iter().map(|p| (*p).clone()).collect();
        for path in changed {
            affected.extend(self.checker.affected_by(&self.vfs, path, &self.options));
        }
        affected.retain(|path| self.vfs.get_content(path).is_some());
        affected
    }
}

impl TypeCheckHost for CheckHost {
    fn diagnostics(&mut self) -> RepairResult<Vec<Diagnostic>> {
        self.stats.diagnostics_queries += 1;
        let names = self.vfs.file_names();

        let to_check: BTreeSet<PathBuf> = if self.checked_once {
            self.stale_set(&names)
        } else {
            names.iter().cloned().collect()
        };

        // Files that left the VFS take their cached diagnostics with them.
        self.cache
            .retain(|path, _| self.vfs.get_content(path).is_some());

        for path in &to_check {
            let version = self.version_of(path);
            match self.checker.check_file(&self.vfs, path, &self.options) {
                Ok(diagnostics) => {
                    self.cache.insert(
                        path.clone(),
                        CachedFile {
                            version,
                            diagnostics,
                        },
                    );
                }
                Err(err) => {
                    tracing::warn!(
                        file = %path.display(),
                        error = %err,
                        "checker failed; dropping this file's diagnostics"
                    );
                    self.cache.remove(path);
                }
            }
        }
        self.checked_once = true;

        let mut merged: Vec<Diagnostic> = self
            .cache
            .values()
            .flat_map(|cached| cached.diagnostics.iter())
            .filter(|d| d.severity == Severity::Error)
            .cloned()
            .collect();
        merged.sort_by(|a, b| {
            a.file
                .cmp(&b.file)
                .then_with(|| a.start.cmp(&b.start))
                .then_with(|| a.code.cmp(&b.code))
        });
        Ok(merged)
    }

    fn code_fixes(&mut self, diagnostic: &Diagnostic) -> Vec<NativeAction> {
        self.stats.code_fix_queries += 1;
        self.checker.code_fixes(&self.vfs, diagnostic, &self.options)
    }

    fn apply_fix(&mut self, action: &NativeAction) -> RepairResult<()> {
        self.stats.apply_calls += 1;
        let changes = candidate::normalize(self.checker.action_changes(action));
        let mut touched: BTreeSet<PathBuf> = BTreeSet::new();
        for change in &changes {
            if self.vfs.get_content(&change.file).is_none() {
                // Edits to files outside the VFS (e.g. external declarations)
                // are skipped silently.
                tracing::debug!(file = %change.file.display(), "skipping edit outside the VFS");
                continue;
            }
            self.vfs
                .apply_change(&change.file, change.start, change.end, &change.new_text)?;
            touched.insert(change.file.clone());
        }
        for path in touched {
            self.notify_file_changed(&path);
        }
        Ok(())
    }

    fn action_changes(&self, action: &NativeAction) -> Vec<FileChange> {
        self.checker.action_changes(action)
    }

    fn notify_file_changed(&mut self, path: &Path) {
        let path = crate::vfs::normalize_path(path);
        *self.versions.entry(path).or_insert(0) += 1;
    }

    fn notify_all_files_changed(&mut self) {
        for name in self.vfs.file_names() {
            *self.versions.entry(name).or_insert(0) += 1;
        }
    }

    fn reset(&mut self) {
        self.vfs.reset();
        self.checker.reset();
        self.cache.clear();
        self.checked_once = false;
    }

    fn reload(&mut self) {
        self.checker.reset();
        self.cache.clear();
        self.checked_once = false;
    }

    fn vfs(&self) -> &Vfs {
        &self.vfs
    }

    fn vfs_mut(&mut self) -> &mut Vfs {
        &mut self.vfs
    }

    fn file_names(&self) -> Vec<PathBuf> {
        self.vfs.file_names()
    }

    fn options(&self) -> &CheckerOptions {
        &self.options
    }

    fn stats(&self) -> HostStats {
        self.stats
    }

    fn reset_stats(&mut self) {
        self.stats = HostStats::default();
    }
}
