//! Synthesize a declaration for a symbol nothing in the project defines.

use super::{BuilderContext, SolutionBuilder};
use crate::candidate::{CandidateFix, FileChange, Scope};
use crate::diagnostics::RepairResult;
use crate::scoring::Risk;
use crate::symcheck::{self, CODE_UNRESOLVED_USE};
use std::path::PathBuf;

/// For `use NAME` with no definition anywhere, proposes `def NAME` in the
/// manifest's declaration file (plus the import making it visible), or a
/// local definition when no declaration file is configured.
///
/// Synthesizing a declaration silences the checker without any evidence the
/// symbol should exist, so the candidate is tagged high-risk and stays
/// suppressed unless the planner opts in.
pub struct MissingDeclarationBuilder;

impl SolutionBuilder for MissingDeclarationBuilder {
    fn name(&self) -> &'static str {
        "missing-declaration"
    }

    fn description(&self) -> &'static str {
        "declare symbols that are used but never defined"
    }

    fn diagnostic_codes(&self) -> &'static [u32] {
        &[CODE_UNRESOLVED_USE]
    }

    fn matches(&self, ctx: &BuilderContext<'_>) -> bool {
        ctx.token_at_position().is_some()
    }

    fn generate(&self, ctx: &BuilderContext<'_>) -> RepairResult<Vec<CandidateFix>> {
        let Some(name) = ctx.token_at_position() else {
            return Ok(Vec::new());
        };
        if symcheck::defined_symbols(ctx.vfs).contains(name) {
            // The native import fix covers defined symbols.
            return Ok(Vec::new());
        }

        let declaration_target: Option<&PathBuf> = ctx
            .options
            .declaration_file
            .as_ref()
            .filter(|path| ctx.vfs.get_content(path).is_some());

        let changes = match declaration_target {
            Some(target) => {
                let mut changes = vec![append_line(ctx, target, &format!("def {name}\n"))];
                changes.push(FileChange::insert(
                    &ctx.diagnostic.file,
                    0,
                    format!("import {name}\n"),
                ));
                changes
            }
            None => vec![append_line(
                ctx,
                &ctx.diagnostic.file,
                &format!("def {name}\n"),
            )],
        };

        let candidate = CandidateFix::synthetic(
            "addMissingDeclaration",
            format!("declare missing symbol '{name}'"),
            changes,
        )
        .with_scope_hint(Scope::Wide)
        .with_risk_hint(Risk::High)
        .with_tag("synthesis");
        Ok(vec![candidate])
    }
}

/// Append `text` at the end of `path`, inserting a separating newline when
/// the file does not end with one.
fn append_line(ctx: &BuilderContext<'_>, path: &PathBuf, text: &str) -> FileChange {
    let content = ctx.source_file(path).unwrap_or("");
    let at = content.len();
    if content.is_empty() || content.ends_with('\n') {
        FileChange::insert(path, at, text)
    } else {
        FileChange::insert(path, at, format!("\n{text}"))
    }
}
