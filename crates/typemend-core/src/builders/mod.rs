//! Solution builders: synthetic candidate generation.
//!
//! A builder covers diagnostics the checker has no native fix for (or a
//! better fix than the native one). Builders advertise the diagnostic codes
//! and message patterns they care about, answer a cheap `matches`, and
//! `generate` a bounded list of synthetic candidates. Routing lives in
//! [`crate::registry::BuilderRegistry`].

pub mod drop_import;
pub mod missing_decl;
pub mod spelling;

use crate::candidate::CandidateFix;
use crate::checker::CheckerOptions;
use crate::diagnostics::{Diagnostic, RepairResult};
use crate::vfs::Vfs;
use std::path::{Path, PathBuf};

/// Upper bound on candidates a single builder may return per diagnostic.
pub const MAX_CANDIDATES_PER_BUILDER: usize = 6;

/// Everything a builder may look at while matching and generating.
pub struct BuilderContext<'a> {
    pub diagnostic: &'a Diagnostic,
    pub vfs: &'a Vfs,
    pub options: &'a CheckerOptions,
    pub files_with_errors: &'a [PathBuf],
    pub current_diagnostics: &'a [Diagnostic],
}

impl<'a> BuilderContext<'a> {
    /// Current text of any project file.
    pub fn source_file(&self, path: &Path) -> Option<&'a str> {
        self.vfs.get_content(path)
    }

    /// Current text of the diagnostic's file.
    pub fn source_text(&self) -> Option<&'a str> {
        self.vfs.get_content(&self.diagnostic.file)
    }

    /// The source slice the diagnostic points at, when its span is non-empty
    /// and lands on character boundaries.
    pub fn token_at_position(&self) -> Option<&'a str> {
        let diagnostic = self.diagnostic;
        let text = self.source_text()?;
        let token = text.get(diagnostic.start..diagnostic.start + diagnostic.length)?;
        if token.is_empty() { None } else { Some(token) }
    }
}

/// A synthesizer of candidate fixes for a family of diagnostics.
///
/// `matches` must be cheap (code and string checks, no project scans); any
/// heavier analysis belongs in `generate`, which is bounded to
/// [`MAX_CANDIDATES_PER_BUILDER`] results. A builder advertising neither
/// codes nor patterns is consulted for every diagnostic.
pub trait SolutionBuilder: 'static {
    fn name(&self) -> &'static str;

    fn description(&self) -> &'static str;

    /// Diagnostic codes this builder is indexed under (exact match).
    fn diagnostic_codes(&self) -> &'static [u32] {
        &[]
    }

    /// Regexes matched against the flattened diagnostic message.
    fn message_patterns(&self) -> &'static [&'static str] {
        &[]
    }

    fn matches(&self, ctx: &BuilderContext<'_>) -> bool;

    /// Produce candidates. An `Err` skips this builder for the current
    /// diagnostic; other builders still contribute.
    fn generate(&self, ctx: &BuilderContext<'_>) -> RepairResult<Vec<CandidateFix>>;
}
