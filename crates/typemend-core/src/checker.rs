//! The analysis seam: the narrow interface a language backend implements.
//!
//! The engine never parses or type-checks anything itself. A [`Checker`]
//! produces per-file diagnostics and native fix actions over the VFS; the
//! host (`crate::host`) layers incremental re-checking, ordering, and stats
//! on top. [`crate::symcheck::SymbolChecker`] is the in-tree reference
//! implementation.

use crate::candidate::FileChange;
use crate::diagnostics::{Diagnostic, RepairResult};
use crate::vfs::Vfs;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::path::{Path, PathBuf};

/// Options forwarded verbatim from the project manifest to the checker.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct CheckerOptions {
    /// Treat duplicate definitions as errors rather than warnings.
    pub strict: bool,
    /// Preferred target file for synthesized declarations.
    pub declaration_file: Option<PathBuf>,
}

/// A checker-proposed repair action.
///
/// The payload is private to the checker that produced the action; the core
/// only ever turns it back into [`FileChange`]s through
/// [`Checker::action_changes`].
#[derive(Debug, Clone, PartialEq)]
pub struct NativeAction {
    fix_name: String,
    description: String,
    payload: Value,
}

impl NativeAction {
    pub fn new(
        fix_name: impl Into<String>,
        description: impl Into<String>,
        payload: Value,
    ) -> Self {
        Self {
            fix_name: fix_name.into(),
            description: description.into(),
            payload,
        }
    }

    pub fn fix_name(&self) -> &str {
        &self.fix_name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    /// The checker-private encoding. Opaque to everything but the checker
    /// that created the action.
    pub fn payload(&self) -> &Value {
        &self.payload
    }
}

/// A language analysis backend.
///
/// Implementations must be deterministic over the VFS contents: the same
/// file set and options always produce the same diagnostics in the same
/// order.
pub trait Checker: fmt::Debug {
    fn name(&self) -> &'static str;

    /// Analyze one file in the context of the whole project.
    ///
    /// An `Err` is a per-file analysis failure; the host logs it and drops
    /// that file's contribution while other files proceed.
    fn check_file(
        &mut self,
        vfs: &Vfs,
        path: &Path,
        options: &CheckerOptions,
    ) -> RepairResult<Vec<Diagnostic>>;

    /// Files whose diagnostics may change when `changed` changes.
    ///
    /// The default is maximally conservative: everything. Backends with a
    /// real dependency graph should narrow this; the host uses it to bound
    /// incremental re-checks.
    fn affected_by(&self, vfs: &Vfs, changed: &Path, options: &CheckerOptions) -> Vec<PathBuf> {
        let _ = (changed, options);
        vfs.file_names()
    }

    /// Native fix actions for one diagnostic. An empty list is fine.
    fn code_fixes(
        &mut self,
        vfs: &Vfs,
        diagnostic: &Diagnostic,
        options: &CheckerOptions,
    ) -> Vec<NativeAction>;

    /// Materialize an action produced by this checker into concrete edits.
    fn action_changes(&self, action: &NativeAction) -> Vec<FileChange>;

    /// Drop all internal state; the next check starts from scratch.
    fn reset(&mut self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_native_action_accessors() {
        let action = NativeAction::new(
            "fixMissingImport",
            "add import for 'foo'",
            serde_json::json!({ "changes": [] }),
        );
        assert_eq!(action.fix_name(), "fixMissingImport");
        assert_eq!(action.description(), "add import for 'foo'");
        assert!(action.payload().get("changes").is_some());
    }

    #[test]
    fn test_checker_options_deserialize_camel_case() {
        let options: CheckerOptions = serde_json::from_str(
            r#"{ "strict": true, "declarationFile": "lib.sym" }"#,
        )
        .unwrap();
        assert!(options.strict);
        assert_eq!(
            options.declaration_file,
            Some(PathBuf::from("lib.sym"))
        );
    }
}
