//! Builder registry: routes diagnostics to solution builders.

use regex::Regex;
use std::collections::HashMap;

use crate::builders::drop_import::DropBrokenImportBuilder;
use crate::builders::missing_decl::MissingDeclarationBuilder;
use crate::builders::spelling::SymbolSpellingBuilder;
use crate::builders::{BuilderContext, MAX_CANDIDATES_PER_BUILDER, SolutionBuilder};
use crate::candidate::CandidateFix;
use crate::diagnostics::Diagnostic;
use crate::telemetry::{BudgetEvent, BudgetLogger};

/// Routes a diagnostic to the builders that might cover it.
///
/// Builders are indexed by exact diagnostic code and by message regex
/// (compiled once at registration); a builder advertising neither is a
/// catch-all consulted for every diagnostic. Routing order is stable by
/// registration order.
pub struct BuilderRegistry {
    builders: Vec<Box<dyn SolutionBuilder>>,
    by_code: HashMap<u32, Vec<usize>>,
    by_pattern: Vec<(usize, Regex)>,
    catch_all: Vec<usize>,
}

impl BuilderRegistry {
    /// Create an empty registry with no registered builders.
    pub fn new() -> Self {
        Self {
            builders: Vec::new(),
            by_code: HashMap::new(),
            by_pattern: Vec::new(),
            catch_all: Vec::new(),
        }
    }

    /// Create a registry pre-populated with the built-in builders.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(MissingDeclarationBuilder));
        registry.register(Box::new(SymbolSpellingBuilder));
        registry.register(Box::new(DropBrokenImportBuilder));
        registry
    }

    /// Register a builder and index its codes and patterns. A pattern that
    /// fails to compile is dropped with a warning; the builder keeps its
    /// other routes.
    pub fn register(&mut self, builder: Box<dyn SolutionBuilder>) {
        let index = self.builders.len();
        let codes = builder.diagnostic_codes();
        let patterns = builder.message_patterns();
        if codes.is_empty() && patterns.is_empty() {
            self.catch_all.push(index);
        }
        for &code in codes {
            self.by_code.entry(code).or_default().push(index);
        }
        for pattern in patterns {
            match Regex::new(pattern) {
                Ok(regex) => self.by_pattern.push((index, regex)),
                Err(err) => tracing::warn!(
                    builder = builder.name(),
                    pattern,
                    error = %err,
                    "ignoring invalid message pattern"
                ),
            }
        }
        self.builders.push(builder);
    }

    pub fn len(&self) -> usize {
        self.builders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.builders.is_empty()
    }

    /// Union of code-indexed, pattern-indexed, and catch-all builders for a
    /// diagnostic, deduplicated, in registration order.
    pub fn candidate_builders(&self, diagnostic: &Diagnostic) -> Vec<&dyn SolutionBuilder> {
        let flattened = diagnostic.flattened_message();
        let mut indices: Vec<usize> = Vec::new();
        if let Some(by_code) = self.by_code.get(&diagnostic.code) {
            indices.extend(by_code);
        }
        for (index, regex) in &self.by_pattern {
            if regex.is_match(&flattened) {
                indices.push(*index);
            }
        }
        indices.extend(&self.catch_all);
        indices.sort_unstable();
        indices.dedup();
        indices
            .into_iter()
            .map(|index| self.builders[index].as_ref())
            .collect()
    }

    /// The candidate builders whose `matches` accepts the context.
    pub fn matching_builders(&self, ctx: &BuilderContext<'_>) -> Vec<&dyn SolutionBuilder> {
        self.candidate_builders(ctx.diagnostic)
            .into_iter()
            .filter(|builder| builder.matches(ctx))
            .collect()
    }

    /// Concatenated, per-builder-bounded candidates from every matching
    /// builder. A failing builder is logged and skipped; the rest still
    /// contribute.
    pub fn generate_candidates(
        &self,
        ctx: &BuilderContext<'_>,
        logger: &mut dyn BudgetLogger,
    ) -> Vec<CandidateFix> {
        let mut out = Vec::new();
        for builder in self.matching_builders(ctx) {
            match builder.generate(ctx) {
                Ok(mut fixes) => {
                    fixes.truncate(MAX_CANDIDATES_PER_BUILDER);
                    out.extend(fixes);
                }
                Err(err) => {
                    tracing::warn!(builder = builder.name(), error = %err, "builder failed");
                    logger.log(BudgetEvent::CandidatePruned {
                        fix_name: builder.name().to_string(),
                        reason: format!("builder failed: {err}"),
                    });
                }
            }
        }
        out
    }
}

impl Default for BuilderRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}
