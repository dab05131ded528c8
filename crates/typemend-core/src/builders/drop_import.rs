//! Delete an import that resolves to nothing.

use super::{BuilderContext, SolutionBuilder};
use crate::candidate::{CandidateFix, FileChange, Scope};
use crate::diagnostics::RepairResult;
use crate::scoring::Risk;
use crate::span_utils::line_byte_range;
use crate::symcheck::CODE_UNRESOLVED_IMPORT;

/// Matched by message pattern rather than code, as a broken-import diagnostic
/// may come from checkers using different numbering.
pub struct DropBrokenImportBuilder;

impl SolutionBuilder for DropBrokenImportBuilder {
    fn name(&self) -> &'static str {
        "drop-broken-import"
    }

    fn description(&self) -> &'static str {
        "delete imports of symbols nothing defines"
    }

    fn message_patterns(&self) -> &'static [&'static str] {
        &["no definition for imported symbol"]
    }

    fn matches(&self, ctx: &BuilderContext<'_>) -> bool {
        ctx.diagnostic.code == CODE_UNRESOLVED_IMPORT
    }

    fn generate(&self, ctx: &BuilderContext<'_>) -> RepairResult<Vec<CandidateFix>> {
        let Some(content) = ctx.source_text() else {
            return Ok(Vec::new());
        };
        let Some((start, end)) = line_byte_range(content, ctx.diagnostic.line) else {
            return Ok(Vec::new());
        };
        let candidate = CandidateFix::synthetic(
            "removeUnusedImport",
            "remove the unresolved import",
            vec![FileChange::delete(&ctx.diagnostic.file, start, end)],
        )
        .with_scope_hint(Scope::Modified)
        .with_risk_hint(Risk::Low);
        Ok(vec![candidate])
    }
}
