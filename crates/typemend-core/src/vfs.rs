//! Virtual file system: an in-memory project text store with copy-on-write
//! snapshots.
//!
//! The VFS is the single mutable surface of the engine. The planner applies
//! candidate fixes to it speculatively under a snapshot, measures the effect
//! through the host, and restores. Only a committed fix survives a
//! verification cycle.
//!
//! ## Usage
//!
//! ```ignore
//! let mut vfs = Vfs::new();
//! vfs.add_file("/p/a.sym", "def foo\n");
//! let token = vfs.snapshot()?;
//! vfs.apply_change(Path::new("/p/a.sym"), 0, 0, "import bar\n")?;
//! vfs.restore(token); // back to "def foo\n"
//! ```

use crate::diagnostics::{RepairError, RepairResult};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

/// Proof that a snapshot was taken; spent by [`Vfs::restore`].
#[derive(Debug)]
#[must_use = "an unrestored snapshot leaves speculative edits in place"]
pub struct SnapshotToken {
    generation: u64,
}

#[derive(Debug, Default)]
struct Snapshot {
    generation: u64,
    /// Pre-edit text of every path written since the snapshot was taken.
    modified: HashMap<PathBuf, String>,
    /// Paths that did not exist when the snapshot was taken.
    added: HashSet<PathBuf>,
}

/// In-memory text store keyed by normalized path.
///
/// `original` is captured at construction and never mutated; `files` is the
/// current, editable view. At most one snapshot may be active at a time.
#[derive(Debug, Default)]
pub struct Vfs {
    files: HashMap<PathBuf, String>,
    original: HashMap<PathBuf, String>,
    active_snapshot: Option<Snapshot>,
    generation: u64,
}

impl Vfs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a file at construction time. The text becomes part of both the
    /// current view and the pristine `original` set used by [`Vfs::reset`].
    pub fn add_file(&mut self, path: impl AsRef<Path>, text: impl Into<String>) {
        let path = normalize_path(path.as_ref());
        let text = text.into();
        self.original.insert(path.clone(), text.clone());
        self.files.insert(path, text);
    }

    /// Build the store from a loaded project manifest, reading every file it
    /// enumerates. Reads are parallelized; the resulting store is identical
    /// to a sequential load.
    #[cfg(feature = "filesystem")]
    pub fn from_manifest(manifest: &crate::manifest::ProjectManifest) -> RepairResult<Self> {
        use rayon::prelude::*;

        let loaded: Vec<(PathBuf, RepairResult<String>)> = manifest
            .files
            .par_iter()
            .map(|path| {
                let text = std::fs::read_to_string(path).map_err(|source| {
                    RepairError::FileRead {
                        path: path.clone(),
                        source,
                    }
                });
                (path.clone(), text)
            })
            .collect();

        let mut vfs = Vfs::new();
        for (path, text) in loaded {
            vfs.add_file(path, text?);
        }
        Ok(vfs)
    }

    /// Read the project manifest at `config_path` and load every file it
    /// enumerates.
    #[cfg(feature = "filesystem")]
    pub fn from_project(config_path: impl AsRef<Path>) -> RepairResult<Self> {
        let manifest = crate::manifest::ProjectManifest::load(config_path.as_ref())?;
        Self::from_manifest(&manifest)
    }

    /// VFS text if present, with a real-filesystem fallback.
    ///
    /// The fallback path exists for external declarations (standard library
    /// files and the like) that are consulted but never edited.
    pub fn read(&self, path: impl AsRef<Path>) -> Option<String> {
        let normalized = normalize_path(path.as_ref());
        if let Some(text) = self.files.get(&normalized) {
            return Some(text.clone());
        }
        std::fs::read_to_string(path.as_ref()).ok()
    }

    /// VFS-only read, no disk fallback.
    pub fn get_content(&self, path: impl AsRef<Path>) -> Option<&str> {
        self.files
            .get(&normalize_path(path.as_ref()))
            .map(String::as_str)
    }

    /// True if the path is tracked by the VFS or exists on disk.
    pub fn file_exists(&self, path: impl AsRef<Path>) -> bool {
        self.files.contains_key(&normalize_path(path.as_ref())) || path.as_ref().exists()
    }

    /// Replace (or create) the full text of a file.
    pub fn write(&mut self, path: impl AsRef<Path>, text: impl Into<String>) {
        let path = normalize_path(path.as_ref());
        self.record_pre_state(&path);
        self.files.insert(path, text.into());
    }

    /// Splice edit: replace the half-open byte range `[start, end)` with
    /// `new_text`. `start == end` is an insertion; `start == end == len` is an
    /// append. Fails with `FileNotInVfs` for untracked paths and rejects
    /// ranges that are out of bounds or split a UTF-8 character.
    pub fn apply_change(
        &mut self,
        path: &Path,
        start: usize,
        end: usize,
        new_text: &str,
    ) -> RepairResult<()> {
        let normalized = normalize_path(path);
        let Some(current) = self.files.get(&normalized) else {
            return Err(RepairError::FileNotInVfs {
                path: path.to_path_buf(),
            });
        };
        let len = current.len();
        if start > end || end > len {
            return Err(RepairError::EditOutOfBounds {
                path: path.to_path_buf(),
                start,
                end,
                len,
            });
        }
        if !current.is_char_boundary(start) || !current.is_char_boundary(end) {
            return Err(RepairError::EditSplitsChar {
                path: path.to_path_buf(),
                start,
                end,
            });
        }
        self.record_pre_state(&normalized);
        let text = self
            .files
            .get_mut(&normalized)
            .expect("presence checked above");
        text.replace_range(start..end, new_text);
        Ok(())
    }

    /// Install a new copy-on-write snapshot. O(1): no file is copied until it
    /// is actually written.
    pub fn snapshot(&mut self) -> RepairResult<SnapshotToken> {
        if self.active_snapshot.is_some() {
            return Err(RepairError::SnapshotAlreadyActive);
        }
        self.generation += 1;
        self.active_snapshot = Some(Snapshot {
            generation: self.generation,
            ..Snapshot::default()
        });
        Ok(SnapshotToken {
            generation: self.generation,
        })
    }

    /// Roll back every write made since the snapshot was taken and clear it.
    /// Cost is proportional to the number of files touched, not project size.
    pub fn restore(&mut self, token: SnapshotToken) {
        let Some(snapshot) = self.active_snapshot.take() else {
            return;
        };
        if snapshot.generation != token.generation {
            tracing::warn!(
                active = snapshot.generation,
                token = token.generation,
                "restore called with a stale snapshot token"
            );
        }
        for (path, text) in snapshot.modified {
            self.files.insert(path, text);
        }
        for path in snapshot.added {
            self.files.remove(&path);
        }
    }

    /// True while a snapshot is installed.
    pub fn has_active_snapshot(&self) -> bool {
        self.active_snapshot.is_some()
    }

    /// Discard all edits and return to the original file set.
    pub fn reset(&mut self) {
        self.files = self.original.clone();
        self.active_snapshot = None;
    }

    /// Current key set, sorted for deterministic iteration.
    pub fn file_names(&self) -> Vec<PathBuf> {
        let mut names: Vec<PathBuf> = self.files.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Record the pre-state of `path` in the active snapshot, once per path.
    fn record_pre_state(&mut self, path: &Path) {
        let Some(snapshot) = self.active_snapshot.as_mut() else {
            return;
        };
        if snapshot.modified.contains_key(path) || snapshot.added.contains(path) {
            return;
        }
        match self.files.get(path) {
            Some(text) => {
                snapshot.modified.insert(path.to_path_buf(), text.clone());
            }
            None => {
                snapshot.added.insert(path.to_path_buf());
            }
        }
    }
}

/// Normalize a path for use as a VFS key.
///
/// Folds the components onto a stack: `.` segments disappear, and `..`
/// consumes the nearest normal segment (a `..` with nothing left to consume
/// is dropped rather than escaping past the root). Purely lexical; nothing
/// touches the disk.
pub fn normalize_path(path: &Path) -> PathBuf {
    use std::path::Component;

    let mut stack: Vec<Component<'_>> = Vec::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if matches!(stack.last(), Some(Component::Normal(_))) {
                    stack.pop();
                }
            }
            other => stack.push(other),
        }
    }
    stack.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded() -> Vfs {
        let mut vfs = Vfs::new();
        vfs.add_file("/p/a.sym", "def foo\n");
        vfs.add_file("/p/b.sym", "use foo\n");
        vfs
    }

    #[test]
    fn test_read_and_get_content() {
        let vfs = seeded();
        assert_eq!(vfs.get_content("/p/a.sym"), Some("def foo\n"));
        assert_eq!(vfs.read("/p/a.sym"), Some("def foo\n".to_string()));
        assert_eq!(vfs.get_content("/p/missing.sym"), None);
    }

    #[test]
    fn test_normalized_keys() {
        let vfs = seeded();
        assert_eq!(vfs.get_content("/p/./a.sym"), Some("def foo\n"));
        assert_eq!(vfs.get_content("/p/x/../a.sym"), Some("def foo\n"));
    }

    #[test]
    fn test_normalize_path_never_escapes_root() {
        assert_eq!(normalize_path(Path::new("/../p/a.sym")), PathBuf::from("/p/a.sym"));
        assert_eq!(normalize_path(Path::new("/p/x/../../../a.sym")), PathBuf::from("/a.sym"));
        assert_eq!(normalize_path(Path::new("a/./b/../c")), PathBuf::from("a/c"));
    }

    #[test]
    fn test_apply_change_replace_insert_append() {
        let mut vfs = seeded();
        vfs.apply_change(Path::new("/p/a.sym"), 4, 7, "bar").unwrap();
        assert_eq!(vfs.get_content("/p/a.sym"), Some("def bar\n"));

        vfs.apply_change(Path::new("/p/a.sym"), 0, 0, "# header\n").unwrap();
        assert_eq!(vfs.get_content("/p/a.sym"), Some("# header\ndef bar\n"));

        let len = vfs.get_content("/p/a.sym").unwrap().len();
        vfs.apply_change(Path::new("/p/a.sym"), len, len, "def baz\n").unwrap();
        assert_eq!(vfs.get_content("/p/a.sym"), Some("# header\ndef bar\ndef baz\n"));
    }

    #[test]
    fn test_apply_change_unknown_path_fails() {
        let mut vfs = seeded();
        let err = vfs
            .apply_change(Path::new("/p/nope.sym"), 0, 0, "x")
            .unwrap_err();
        assert!(matches!(err, RepairError::FileNotInVfs { .. }));
    }

    #[test]
    fn test_apply_change_out_of_bounds_fails() {
        let mut vfs = seeded();
        let err = vfs
            .apply_change(Path::new("/p/a.sym"), 0, 999, "x")
            .unwrap_err();
        assert!(matches!(err, RepairError::EditOutOfBounds { .. }));
    }

    #[test]
    fn test_apply_change_mid_codepoint_fails() {
        let mut vfs = Vfs::new();
        vfs.add_file("/p/u.sym", "caf\u{00e9}");
        let err = vfs
            .apply_change(Path::new("/p/u.sym"), 4, 5, "x")
            .unwrap_err();
        assert!(matches!(err, RepairError::EditSplitsChar { .. }));
    }

    #[test]
    fn test_snapshot_restore_roundtrip() {
        let mut vfs = seeded();
        let token = vfs.snapshot().unwrap();

        vfs.apply_change(Path::new("/p/b.sym"), 0, 0, "import foo\n").unwrap();
        vfs.write("/p/new.sym", "def extra\n");
        assert_eq!(vfs.get_content("/p/b.sym"), Some("import foo\nuse foo\n"));
        assert!(vfs.get_content("/p/new.sym").is_some());

        vfs.restore(token);
        assert_eq!(vfs.get_content("/p/b.sym"), Some("use foo\n"));
        assert_eq!(vfs.get_content("/p/new.sym"), None, "added file removed");
        assert!(!vfs.has_active_snapshot());
    }

    #[test]
    fn test_snapshot_records_first_pre_state_only() {
        let mut vfs = seeded();
        let token = vfs.snapshot().unwrap();
        vfs.write("/p/a.sym", "first write\n");
        vfs.write("/p/a.sym", "second write\n");
        vfs.restore(token);
        assert_eq!(vfs.get_content("/p/a.sym"), Some("def foo\n"));
    }

    #[test]
    fn test_nested_snapshot_rejected() {
        let mut vfs = seeded();
        let token = vfs.snapshot().unwrap();
        assert!(matches!(
            vfs.snapshot(),
            Err(RepairError::SnapshotAlreadyActive)
        ));
        vfs.restore(token);
        // After restore a fresh snapshot is allowed again.
        let token = vfs.snapshot().unwrap();
        vfs.restore(token);
    }

    #[test]
    fn test_restore_without_writes_is_noop() {
        let mut vfs = seeded();
        let names_before = vfs.file_names();
        let token = vfs.snapshot().unwrap();
        vfs.restore(token);
        assert_eq!(vfs.file_names(), names_before);
    }

    #[test]
    fn test_reset_discards_everything() {
        let mut vfs = seeded();
        vfs.write("/p/a.sym", "mutated\n");
        vfs.write("/p/c.sym", "added\n");
        vfs.reset();
        assert_eq!(vfs.get_content("/p/a.sym"), Some("def foo\n"));
        assert_eq!(vfs.get_content("/p/c.sym"), None);
    }

    #[test]
    fn test_file_names_sorted() {
        let mut vfs = Vfs::new();
        vfs.add_file("/p/z.sym", "");
        vfs.add_file("/p/a.sym", "");
        vfs.add_file("/p/m.sym", "");
        let names = vfs.file_names();
        assert_eq!(
            names,
            vec![
                PathBuf::from("/p/a.sym"),
                PathBuf::from("/p/m.sym"),
                PathBuf::from("/p/z.sym")
            ]
        );
    }

    #[test]
    fn test_disk_fallback_read() {
        let temp = tempfile::TempDir::new().unwrap();
        let on_disk = temp.path().join("lib.sym");
        std::fs::write(&on_disk, "def stdlib\n").unwrap();

        let vfs = Vfs::new();
        assert_eq!(vfs.read(&on_disk), Some("def stdlib\n".to_string()));
        assert!(vfs.file_exists(&on_disk));
        // VFS-only read still misses.
        assert_eq!(vfs.get_content(&on_disk), None);
    }

    // ===== CoW soundness (property 1 of the suite) =====

    mod properties {
        use super::*;
        use proptest::prelude::*;

        /// A scripted write against one of three well-known paths.
        #[derive(Debug, Clone)]
        struct ScriptedWrite {
            path: &'static str,
            text: String,
        }

        fn write_strategy() -> impl Strategy<Value = ScriptedWrite> {
            (
                prop_oneof![
                    Just("/p/a.sym"),
                    Just("/p/b.sym"),
                    Just("/p/added.sym")
                ],
                "[a-z\n]{0,16}",
            )
                .prop_map(|(path, text)| ScriptedWrite { path, text })
        }

        proptest! {
            /// For any write sequence and split point m: snapshot after the
            /// first m writes, apply the rest, restore - contents equal the
            /// state after the first m writes for every path, including paths
            /// added after the snapshot.
            #[test]
            fn cow_restore_recovers_prefix_state(
                writes in proptest::collection::vec(write_strategy(), 0..12),
                split in 0usize..13,
            ) {
                let m = split.min(writes.len());

                let mut expected = Vfs::new();
                expected.add_file("/p/a.sym", "def foo\n");
                expected.add_file("/p/b.sym", "use foo\n");
                for w in &writes[..m] {
                    expected.write(w.path, w.text.clone());
                }

                let mut vfs = Vfs::new();
                vfs.add_file("/p/a.sym", "def foo\n");
                vfs.add_file("/p/b.sym", "use foo\n");
                for w in &writes[..m] {
                    vfs.write(w.path, w.text.clone());
                }
                let token = vfs.snapshot().unwrap();
                for w in &writes[m..] {
                    vfs.write(w.path, w.text.clone());
                }
                vfs.restore(token);

                prop_assert_eq!(vfs.file_names(), expected.file_names());
                for name in vfs.file_names() {
                    prop_assert_eq!(vfs.get_content(&name), expected.get_content(&name));
                }
            }
        }
    }
}
