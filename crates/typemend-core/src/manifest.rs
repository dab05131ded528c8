//! Project manifest loading.
//!
//! The manifest is a small JSON file enumerating the project's source files,
//! optionally through `include`/`exclude` glob patterns, plus the options
//! handed to the checker backend:
//!
//! ```json
//! {
//!   "files": ["src/a.sym"],
//!   "include": ["src/**/*.sym"],
//!   "exclude": ["src/generated/**"],
//!   "options": { "strict": true, "declarationFile": "src/lib.sym" }
//! }
//! ```
//!
//! Priority: `exclude` > `include` > `files`. Paths are resolved against the
//! manifest's directory and normalized to absolute keys.

use crate::checker::CheckerOptions;
use crate::diagnostics::{RepairError, RepairResult};
use crate::vfs::normalize_path;
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct ManifestFile {
    files: Vec<String>,
    include: Vec<String>,
    exclude: Vec<String>,
    options: CheckerOptions,
}

/// A loaded project manifest: the resolved file set plus checker options.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectManifest {
    /// Directory the manifest lives in; all relative paths resolve here.
    pub root: PathBuf,
    /// Absolute, normalized, sorted, deduplicated file set.
    pub files: Vec<PathBuf>,
    pub options: CheckerOptions,
}

/// Glob match options: `*` stays within one path component, `**` recurses.
const MANIFEST_MATCH_OPTIONS: glob::MatchOptions = glob::MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

impl ProjectManifest {
    /// Read and resolve the manifest at `path`. A missing or unparsable
    /// manifest is fatal; so is a syntactically invalid glob pattern.
    pub fn load(path: &Path) -> RepairResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| RepairError::Config {
            path: path.to_path_buf(),
            source,
        })?;
        let parsed: ManifestFile =
            serde_json::from_str(&text).map_err(|source| RepairError::ConfigParse {
                path: path.to_path_buf(),
                source,
            })?;

        let root = absolute_root(path);
        let mut files: Vec<PathBuf> = Vec::new();
        for file in &parsed.files {
            files.push(normalize_path(&root.join(file)));
        }

        let include = compile_patterns(&parsed.include)?;
        let exclude = compile_patterns(&parsed.exclude)?;

        if !include.is_empty() {
            files.extend(walk_includes(&root, &include));
        }
        if !exclude.is_empty() {
            files.retain(|file| {
                let rel = relative_display(file, &root);
                !exclude
                    .iter()
                    .any(|p| p.matches_with(&rel, MANIFEST_MATCH_OPTIONS))
            });
        }

        files.sort();
        files.dedup();

        let mut options = parsed.options;
        if let Some(decl) = options.declaration_file.take() {
            options.declaration_file = Some(normalize_path(&root.join(decl)));
        }

        Ok(Self {
            root,
            files,
            options,
        })
    }
}

fn compile_patterns(patterns: &[String]) -> RepairResult<Vec<glob::Pattern>> {
    patterns
        .iter()
        .map(|pattern| {
            let normalized = pattern.replace('\\', "/");
            glob::Pattern::new(&normalized).map_err(|err| RepairError::ConfigPattern {
                pattern: pattern.clone(),
                message: err.to_string(),
            })
        })
        .collect()
}

fn walk_includes(root: &Path, include: &[glob::Pattern]) -> Vec<PathBuf> {
    let mut matched = Vec::new();
    for entry in ignore::WalkBuilder::new(root).build().flatten() {
        if !entry.file_type().is_some_and(|t| t.is_file()) {
            continue;
        }
        let path = normalize_path(entry.path());
        let rel = relative_display(&path, root);
        if include
            .iter()
            .any(|p| p.matches_with(&rel, MANIFEST_MATCH_OPTIONS))
        {
            matched.push(path);
        }
    }
    matched
}

fn absolute_root(manifest_path: &Path) -> PathBuf {
    let parent = manifest_path.parent().unwrap_or(Path::new("."));
    let absolute = std::path::absolute(parent).unwrap_or_else(|_| parent.to_path_buf());
    normalize_path(&absolute)
}

/// Path relative to the project root, with forward slashes, for glob matching.
fn relative_display(path: &Path, root: &Path) -> String {
    let rel = path.strip_prefix(root).unwrap_or(path);
    let display = rel.to_string_lossy();
    if cfg!(windows) {
        display.replace('\\', "/")
    } else {
        display.into_owned()
    }
}
