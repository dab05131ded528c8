//! Propose the closest defined symbol for a name that resolves to nothing.

use super::{BuilderContext, SolutionBuilder};
use crate::candidate::{CandidateFix, FileChange, Scope};
use crate::diagnostics::RepairResult;
use crate::scoring::Risk;
use crate::symcheck::{self, CODE_UNRESOLVED_USE};
use std::collections::BTreeSet;

/// For `use NAME` where `NAME` is undefined but within editing distance of a
/// defined symbol, proposes rewriting the reference. A case-insensitive
/// exact match wins outright; otherwise the candidate with the smallest
/// Levenshtein distance is suggested, provided the distance fits within
/// half the longer name's length.
pub struct SymbolSpellingBuilder;

impl SolutionBuilder for SymbolSpellingBuilder {
    fn name(&self) -> &'static str {
        "symbol-spelling"
    }

    fn description(&self) -> &'static str {
        "rewrite near-miss symbol references to a defined name"
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
        let defined = symcheck::defined_symbols(ctx.vfs);
        if defined.contains(name) {
            return Ok(Vec::new());
        }
        let Some(closest) = closest_symbol(name, &defined) else {
            return Ok(Vec::new());
        };

        let diagnostic = ctx.diagnostic;
        let change = FileChange::new(
            &diagnostic.file,
            diagnostic.start,
            diagnostic.start + diagnostic.length,
            closest,
        );
        let candidate = CandidateFix::synthetic(
            "fixSpelling",
            format!("change '{name}' to '{closest}'"),
            vec![change],
        )
        .with_scope_hint(Scope::Modified)
        .with_risk_hint(Risk::Medium);
        Ok(vec![candidate])
    }
}

/// The defined symbol most plausibly meant by `name`.
///
/// Distances are measured case-insensitively. A symbol qualifies when its
/// Levenshtein distance to `name` is at most half the longer of the two
/// lengths, which admits one-or-two-character typos and short truncations
/// while rejecting unrelated names. Ties keep the lexicographically first
/// symbol, so suggestions are deterministic.
fn closest_symbol<'a>(name: &str, defined: &'a BTreeSet<String>) -> Option<&'a str> {
    if name.is_empty() {
        return None;
    }
    let lowered = name.to_ascii_lowercase();
    let mut best: Option<(usize, &str)> = None;
    for symbol in defined {
        if symbol.eq_ignore_ascii_case(name) {
            return Some(symbol);
        }
        let budget = symbol.len().max(name.len()) / 2;
        let distance = edit_distance(&lowered, &symbol.to_ascii_lowercase());
        if distance <= budget && best.is_none_or(|(best_distance, _)| distance < best_distance) {
            best = Some((distance, symbol));
        }
    }
    best.map(|(_, symbol)| symbol)
}

/// Levenshtein distance with the rolling two-row table. Symbol names are
/// ASCII identifiers, so the comparison works on bytes.
fn edit_distance(a: &str, b: &str) -> usize {
    let a = a.as_bytes();
    let b = b.as_bytes();
    let mut previous: Vec<usize> = (0..=b.len()).collect();
    let mut current = vec![0usize; b.len() + 1];
    for (i, &byte_a) in a.iter().enumerate() {
        current[0] = i + 1;
        for (j, &byte_b) in b.iter().enumerate() {
            let substitute = previous[j] + usize::from(byte_a != byte_b);
            let delete = previous[j + 1] + 1;
            let insert = current[j] + 1;
            current[j + 1] = substitute.min(delete).min(insert);
        }
        std::mem::swap(&mut previous, &mut current);
    }
    previous[b.len()]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checker::CheckerOptions;
    use crate::diagnostics::Diagnostic;
    use crate::vfs::Vfs;

    fn defined(symbols: &[&str]) -> BTreeSet<String> {
        symbols.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_edit_distance_basics() {
        assert_eq!(edit_distance("", ""), 0);
        assert_eq!(edit_distance("color", "color"), 0);
        assert_eq!(edit_distance("colr", "color"), 1);
        assert_eq!(edit_distance("colour", "color"), 1);
        assert_eq!(edit_distance("", "abc"), 3);
        assert_eq!(edit_distance("kitten", "sitting"), 3);
    }

    #[test]
    fn test_closest_symbol_exact_case_insensitive() {
        assert_eq!(
            closest_symbol("Color", &defined(&["color", "shade"])),
            Some("color")
        );
    }

    #[test]
    fn test_closest_symbol_accepts_typos_and_truncations() {
        assert_eq!(closest_symbol("colr", &defined(&["color"])), Some("color"));
        assert_eq!(closest_symbol("colour", &defined(&["color"])), Some("color"));
        // "col" is two edits from "color"; budget is 5 / 2 = 2.
        assert_eq!(closest_symbol("col", &defined(&["color"])), Some("color"));
    }

    #[test]
    fn test_closest_symbol_rejects_distant_names() {
        assert_eq!(closest_symbol("ghost", &defined(&["color", "shade"])), None);
        // Three edits against a budget of two.
        assert_eq!(closest_symbol("co", &defined(&["color"])), None);
        assert_eq!(closest_symbol("", &defined(&["color"])), None);
    }

    #[test]
    fn test_closest_symbol_ties_break_lexicographically() {
        assert_eq!(
            closest_symbol("colc", &defined(&["colb", "cola"])),
            Some("cola")
        );
    }

    #[test]
    fn test_closest_symbol_prefers_smaller_distance() {
        // "abzz" sorts first but is two edits away; "acbd" is only one.
        assert_eq!(
            closest_symbol("acbz", &defined(&["abzz", "acbd"])),
            Some("acbd")
        );
    }

    #[test]
    fn test_generates_rewrite_for_near_miss() {
        let mut vfs = Vfs::new();
        vfs.add_file("/p/a.sym", "def color\nuse col\n");
        let diagnostic =
            Diagnostic::error("/p/a.sym", CODE_UNRESOLVED_USE, "cannot find symbol 'col'")
                .with_span(2, 5, 14, 3);
        let options = CheckerOptions::default();
        let ctx = BuilderContext {
            diagnostic: &diagnostic,
            vfs: &vfs,
            options: &options,
            files_with_errors: &[],
            current_diagnostics: &[],
        };

        let candidates = SymbolSpellingBuilder.generate(&ctx).unwrap();
        assert_eq!(candidates.len(), 1);
        let candidate = &candidates[0];
        assert_eq!(candidate.fix_name, "fixSpelling");
        assert_eq!(candidate.risk_hint, Some(Risk::Medium));
        assert_eq!(candidate.changes()[0].new_text, "color");
        assert_eq!(
            (candidate.changes()[0].start, candidate.changes()[0].end),
            (14, 17)
        );
    }

    #[test]
    fn test_no_candidate_when_nothing_is_close() {
        let mut vfs = Vfs::new();
        vfs.add_file("/p/a.sym", "def color\nuse zzz\n");
        let diagnostic =
            Diagnostic::error("/p/a.sym", CODE_UNRESOLVED_USE, "cannot find symbol 'zzz'")
                .with_span(2, 5, 14, 3);
        let options = CheckerOptions::default();
        let ctx = BuilderContext {
            diagnostic: &diagnostic,
            vfs: &vfs,
            options: &options,
            files_with_errors: &[],
            current_diagnostics: &[],
        };
        assert!(SymbolSpellingBuilder.generate(&ctx).unwrap().is_empty());
    }
}
