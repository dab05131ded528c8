//! Candidate fixes: checker-native and builder-synthesized edits.
//!
//! A candidate is a named bundle of byte-range edits. Native candidates wrap
//! an opaque checker action (with its changes materialized up front);
//! synthetic candidates come from solution builders. Everything downstream —
//! pruning, verification, conflict detection, deduplication — works on the
//! normalized change list.

use crate::checker::NativeAction;
use crate::diagnostics::RepairResult;
use crate::scoring::Risk;
use crate::vfs::Vfs;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::PathBuf;

/// Replace the half-open byte range `[start, end)` of `file` with `new_text`.
///
/// Offsets index the file's canonical text at the moment the plan was
/// produced; consumers apply steps in order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct FileChange {
    pub file: PathBuf,
    pub start: usize,
    pub end: usize,
    pub new_text: String,
}

impl FileChange {
    pub fn new(
        file: impl Into<PathBuf>,
        start: usize,
        end: usize,
        new_text: impl Into<String>,
    ) -> Self {
        Self {
            file: file.into(),
            start,
            end,
            new_text: new_text.into(),
        }
    }

    /// Insertion at `position` (zero-length range).
    pub fn insert(file: impl Into<PathBuf>, position: usize, text: impl Into<String>) -> Self {
        Self::new(file, position, position, text)
    }

    /// Deletion of `[start, end)` (empty replacement).
    pub fn delete(file: impl Into<PathBuf>, start: usize, end: usize) -> Self {
        Self::new(file, start, end, "")
    }

    pub fn is_insertion(&self) -> bool {
        self.start == self.end
    }
}

/// Advisory re-check scope attached to a candidate by its producer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    Modified,
    Errors,
    Wide,
}

/// Where a candidate came from.
#[derive(Debug, Clone)]
pub enum CandidateKind {
    /// A checker-provided fix; the action is replayed through the host so the
    /// checker can keep whatever bookkeeping it wants.
    Native(NativeAction),
    /// A builder-synthesized fix applied directly to the VFS.
    Synthetic,
}

/// A candidate repair: a named, normalized list of edits plus advisory hints.
#[derive(Debug, Clone)]
pub struct CandidateFix {
    pub kind: CandidateKind,
    pub fix_name: String,
    pub description: String,
    changes: Vec<FileChange>,
    pub scope_hint: Option<Scope>,
    pub risk_hint: Option<Risk>,
    pub tags: Vec<String>,
    pub metadata: Option<serde_json::Value>,
}

impl CandidateFix {
    /// Wrap a checker action together with its materialized changes.
    pub fn native(action: NativeAction, changes: Vec<FileChange>) -> Self {
        let fix_name = action.fix_name().to_string();
        let description = action.description().to_string();
        Self {
            kind: CandidateKind::Native(action),
            fix_name,
            description,
            changes: normalize(changes),
            scope_hint: None,
            risk_hint: None,
            tags: Vec::new(),
            metadata: None,
        }
    }

    pub fn synthetic(
        fix_name: impl Into<String>,
        description: impl Into<String>,
        changes: Vec<FileChange>,
    ) -> Self {
        Self {
            kind: CandidateKind::Synthetic,
            fix_name: fix_name.into(),
            description: description.into(),
            changes: normalize(changes),
            scope_hint: None,
            risk_hint: None,
            tags: Vec::new(),
            metadata: None,
        }
    }

    pub fn with_scope_hint(mut self, scope: Scope) -> Self {
        self.scope_hint = Some(scope);
        self
    }

    pub fn with_risk_hint(mut self, risk: Risk) -> Self {
        self.risk_hint = Some(risk);
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = Some(metadata);
        self
    }

    pub fn is_native(&self) -> bool {
        matches!(self.kind, CandidateKind::Native(_))
    }

    /// The normalized change list.
    pub fn changes(&self) -> &[FileChange] {
        &self.changes
    }

    /// Every file this candidate edits.
    pub fn modified_files(&self) -> BTreeSet<PathBuf> {
        self.changes.iter().map(|c| c.file.clone()).collect()
    }

    /// Deduplication key: the fix name plus the sorted edit list.
    pub fn key(&self) -> String {
        let mut quads: Vec<String> = self
            .changes
            .iter()
            .map(|c| format!("{}\u{1}{}\u{1}{}\u{1}{}", c.file.display(), c.start, c.end, c.new_text))
            .collect();
        quads.sort();
        format!("{}\u{0}{}", self.fix_name, quads.join("\u{0}"))
    }

    /// Total bytes removed plus bytes inserted.
    pub fn edit_size(&self) -> usize {
        self.changes
            .iter()
            .map(|c| (c.end - c.start) + c.new_text.len())
            .sum()
    }

    /// True if any pair of edits from `self` and `other` touches overlapping
    /// ranges in the same file.
    pub fn conflicts_with(&self, other: &CandidateFix) -> bool {
        changes_conflict(&self.changes, &other.changes)
    }
}

/// Normalize a change list: drop invalid ranges, sort by file ascending then
/// start descending, and drop edits that overlap an already-kept edit.
///
/// The descending start order within a file means later-position edits apply
/// first, so earlier offsets stay valid during application. Same-position
/// insertions are all kept; their relative order is the (stable) input order.
pub fn normalize(mut changes: Vec<FileChange>) -> Vec<FileChange> {
    changes.retain(|c| c.start <= c.end);
    changes.sort_by(|a, b| a.file.cmp(&b.file).then_with(|| b.start.cmp(&a.start)));

    let mut kept: Vec<FileChange> = Vec::with_capacity(changes.len());
    let mut last_start = usize::MAX;
    for change in changes {
        let same_file = kept
            .last()
            .is_some_and(|previous: &FileChange| previous.file == change.file);
        if !same_file {
            last_start = usize::MAX;
        }
        if change.end > last_start {
            continue;
        }
        last_start = change.start;
        kept.push(change);
    }
    kept
}

/// Apply a change list to the VFS in normalized order and return the set of
/// touched files. A failing edit aborts the application; the caller is
/// expected to hold a snapshot.
pub fn apply_changes(vfs: &mut Vfs, changes: &[FileChange]) -> RepairResult<Vec<PathBuf>> {
    let normalized = normalize(changes.to_vec());
    let mut touched: BTreeSet<PathBuf> = BTreeSet::new();
    for change in &normalized {
        vfs.apply_change(&change.file, change.start, change.end, &change.new_text)?;
        touched.insert(change.file.clone());
    }
    Ok(touched.into_iter().collect())
}

/// Pairwise conflict between two change lists.
pub fn changes_conflict(a: &[FileChange], b: &[FileChange]) -> bool {
    a.iter()
        .any(|ca| b.iter().any(|cb| ranges_conflict(ca, cb)))
}

/// Two edits conflict when their ranges overlap in the same file. Zero-length
/// insertions at the same offset conflict; an insertion strictly inside
/// another edit's range conflicts; an insertion at an edit's boundary does
/// not.
fn ranges_conflict(a: &FileChange, b: &FileChange) -> bool {
    if a.file != b.file {
        return false;
    }
    match (a.is_insertion(), b.is_insertion()) {
        (true, true) => a.start == b.start,
        (true, false) => b.start < a.start && a.start < b.end,
        (false, true) => a.start < b.start && b.start < a.end,
        (false, false) => a.start < b.end && b.start < a.end,
    }
}
