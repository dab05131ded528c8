//! Reference checker for a miniature declarative symbol language.
//!
//! One statement per line, `#` starts a comment:
//!
//! - `def NAME` defines a project-global symbol;
//! - `import NAME` makes a symbol defined elsewhere visible in this file;
//! - `use NAME` references a symbol, which must be defined in-file or
//!   imported.
//!
//! The checker is deliberately tiny but exercises every seam of the engine:
//! cross-file resolution, native fixes for some diagnostics and none for
//! others, and an options flag (`strict`) that changes severities. The test
//! suite, the CLI demo path, and embedders wanting a deterministic backend
//! all use it.

use crate::candidate::FileChange;
use crate::checker::{Checker, CheckerOptions, NativeAction};
use crate::diagnostics::{Diagnostic, RepairError, RepairResult, Severity};
use crate::span_utils::line_byte_range;
use crate::vfs::{Vfs, normalize_path};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::path::{Path, PathBuf};

/// `use NAME` where `NAME` is neither defined in-file nor imported.
pub const CODE_UNRESOLVED_USE: u32 = 2304;
/// `import NAME` where nothing in the project defines `NAME`.
pub const CODE_UNRESOLVED_IMPORT: u32 = 2306;
/// A `def NAME` that is not the globally-first definition of `NAME`.
pub const CODE_DUPLICATE_DEFINITION: u32 = 2300;

/// The reference [`Checker`]. Stateless: every check re-reads the VFS, and
/// the default (maximally conservative) `affected_by` is kept because any
/// definition change can affect any file.
#[derive(Debug, Default, Clone)]
pub struct SymbolChecker;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Keyword {
    Def,
    Import,
    Use,
}

#[derive(Debug)]
struct Statement<'a> {
    keyword: Keyword,
    name: &'a str,
    /// 1-based line number.
    line: usize,
    /// 1-based column of the name.
    column: usize,
    /// Byte offset of the name in the file.
    start: usize,
}

fn parse_line(line: &str) -> Option<(Keyword, &str, usize)> {
    let trimmed = line.trim_start();
    let indent = line.len() - trimmed.len();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return None;
    }
    let (word, rest) = trimmed.split_once(char::is_whitespace)?;
    let keyword = match word {
        "def" => Keyword::Def,
        "import" => Keyword::Import,
        "use" => Keyword::Use,
        _ => return None,
    };
    let after_gap = rest.trim_start();
    let name = after_gap.split_whitespace().next()?;
    if name.starts_with('#') {
        return None;
    }
    let name_offset = indent + word.len() + 1 + (rest.len() - after_gap.len());
    Some((keyword, name, name_offset))
}

fn parse_file(content: &str) -> Vec<Statement<'_>> {
    let mut statements = Vec::new();
    let mut offset = 0usize;
    for (idx, line) in content.split('\n').enumerate() {
        if let Some((keyword, name, name_offset)) = parse_line(line) {
            statements.push(Statement {
                keyword,
                name,
                line: idx + 1,
                column: name_offset + 1,
                start: offset + name_offset,
            });
        }
        offset += line.len() + 1;
    }
    statements
}

/// Globally-first definition site per symbol, in sorted-file then line order.
fn definition_index(vfs: &Vfs) -> BTreeMap<String, (PathBuf, usize)> {
    let mut index: BTreeMap<String, (PathBuf, usize)> = BTreeMap::new();
    for file in vfs.file_names() {
        let Some(content) = vfs.get_content(&file) else {
            continue;
        };
        for statement in parse_file(content) {
            if statement.keyword == Keyword::Def {
                index
                    .entry(statement.name.to_string())
                    .or_insert_with(|| (file.clone(), statement.line));
            }
        }
    }
    index
}

/// Every symbol the project defines. Used by solution builders.
pub fn defined_symbols(vfs: &Vfs) -> BTreeSet<String> {
    definition_index(vfs).into_keys().collect()
}

fn encode_changes(changes: &[FileChange]) -> Value {
    serde_json::to_value(changes).unwrap_or(Value::Null)
}

impl Checker for SymbolChecker {
    fn name(&self) -> &'static str {
        "symcheck"
    }

    fn check_file(
        &mut self,
        vfs: &Vfs,
        path: &Path,
        options: &CheckerOptions,
    ) -> RepairResult<Vec<Diagnostic>> {
        let normalized = normalize_path(path);
        let Some(content) = vfs.get_content(&normalized) else {
            return Err(RepairError::Checker {
                file: path.to_path_buf(),
                reason: "file is not tracked by the virtual file system".to_string(),
            });
        };

        let index = definition_index(vfs);
        let statements = parse_file(content);
        let imports: HashSet<&str> = statements
            .iter()
            .filter(|s| s.keyword == Keyword::Import)
            .map(|s| s.name)
            .collect();
        let local_defs: HashSet<&str> = statements
            .iter()
            .filter(|s| s.keyword == Keyword::Def)
            .map(|s| s.name)
            .collect();

        let mut diagnostics = Vec::new();
        for statement in &statements {
            match statement.keyword {
                Keyword::Def => {
                    let is_first = index
                        .get(statement.name)
                        .is_some_and(|(file, line)| *file == normalized && *line == statement.line);
                    if !is_first {
                        let severity = if options.strict {
                            Severity::Error
                        } else {
                            Severity::Warning
                        };
                        diagnostics.push(
                            Diagnostic::new(
                                severity,
                                &normalized,
                                CODE_DUPLICATE_DEFINITION,
                                format!("duplicate definition of '{}'", statement.name),
                            )
                            .with_span(
                                statement.line,
                                statement.column,
                                statement.start,
                                statement.name.len(),
                            ),
                        );
                    }
                }
                Keyword::Import => {
                    if !index.contains_key(statement.name) {
                        diagnostics.push(
                            Diagnostic::error(
                                &normalized,
                                CODE_UNRESOLVED_IMPORT,
                                format!(
                                    "no definition for imported symbol '{}'",
                                    statement.name
                                ),
                            )
                            .with_span(
                                statement.line,
                                statement.column,
                                statement.start,
                                statement.name.len(),
                            ),
                        );
                    }
                }
                Keyword::Use => {
                    if !local_defs.contains(statement.name) && !imports.contains(statement.name) {
                        diagnostics.push(
                            Diagnostic::error(
                                &normalized,
                                CODE_UNRESOLVED_USE,
                                format!("cannot find symbol '{}'", statement.name),
                            )
                            .with_span(
                                statement.line,
                                statement.column,
                                statement.start,
                                statement.name.len(),
                            ),
                        );
                    }
                }
            }
        }
        Ok(diagnostics)
    }

    fn code_fixes(
        &mut self,
        vfs: &Vfs,
        diagnostic: &Diagnostic,
        _options: &CheckerOptions,
    ) -> Vec<NativeAction> {
        let Some(content) = vfs.get_content(&diagnostic.file) else {
            return Vec::new();
        };
        match diagnostic.code {
            CODE_UNRESOLVED_USE => {
                let Some(name) =
                    content.get(diagnostic.start..diagnostic.start + diagnostic.length)
                else {
                    return Vec::new();
                };
                if name.is_empty() || !definition_index(vfs).contains_key(name) {
                    // Nothing to import from; synthesis builders may still apply.
                    return Vec::new();
                }
                let changes = vec![FileChange::insert(
                    &diagnostic.file,
                    0,
                    format!("import {name}\n"),
                )];
                vec![NativeAction::new(
                    "fixMissingImport",
                    format!("add import for '{name}'"),
                    encode_changes(&changes),
                )]
            }
            CODE_UNRESOLVED_IMPORT => {
                let Some((start, end)) = line_byte_range(content, diagnostic.line) else {
                    return Vec::new();
                };
                let changes = vec![FileChange::delete(&diagnostic.file, start, end)];
                vec![NativeAction::new(
                    "removeUnusedImport",
                    "remove the unresolved import",
                    encode_changes(&changes),
                )]
            }
            _ => Vec::new(),
        }
    }

    fn action_changes(&self, action: &NativeAction) -> Vec<FileChange> {
        serde_json::from_value(action.payload().clone()).unwrap_or_default()
    }
}
