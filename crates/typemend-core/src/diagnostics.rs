//! Diagnostic types, identity keys, and error reporting

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

pub type RepairResult<T> = Result<T, RepairError>;

/// Severity of a checker-reported problem.
///
/// The host surfaces error-level diagnostics only; the other levels exist so
/// the weighted scoring strategy can price resolved and introduced
/// diagnostics uniformly.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
pub enum Severity {
    Error,
    Warning,
    Suggestion,
    Message,
}

impl Severity {
    /// Weight used by the weighted scoring strategy.
    pub fn weight(self) -> f64 {
        match self {
            Severity::Error => 1.0,
            Severity::Warning => 0.5,
            Severity::Suggestion => 0.25,
            Severity::Message => 0.1,
        }
    }
}

/// A type-checker-reported problem with a numeric code, message, and range.
///
/// `start`/`length` are byte positions into the file's current text; `line`
/// and `column` are 1-based and only used for display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Diagnostic {
    pub code: u32,
    pub message: String,
    pub file: PathBuf,
    pub line: usize,
    pub column: usize,
    pub start: usize,
    pub length: usize,
    pub severity: Severity,
}

impl Diagnostic {
    pub fn new(
        severity: Severity,
        file: impl Into<PathBuf>,
        code: u32,
        message: impl Into<String>,
    ) -> Self {
        Self {
            code,
            message: message.into(),
            file: file.into(),
            line: 1,
            column: 1,
            start: 0,
            length: 0,
            severity,
        }
    }

    pub fn error(file: impl Into<PathBuf>, code: u32, message: impl Into<String>) -> Self {
        Self::new(Severity::Error, file, code, message)
    }

    pub fn warning(file: impl Into<PathBuf>, code: u32, message: impl Into<String>) -> Self {
        Self::new(Severity::Warning, file, code, message)
    }

    /// Set the source range (builder pattern).
    pub fn with_span(mut self, line: usize, column: usize, start: usize, length: usize) -> Self {
        self.line = line;
        self.column = column;
        self.start = start;
        self.length = length;
        self
    }

    /// The message with all whitespace runs collapsed to single spaces.
    ///
    /// Checker messages may span several lines; identity matching and message
    /// patterns always operate on the flattened form.
    pub fn flattened_message(&self) -> String {
        self.message.split_whitespace().collect::<Vec<_>>().join(" ")
    }

    /// Position-independent identity used for cross-apply matching.
    ///
    /// Positions shift when edits are applied, so a diagnostic is identified
    /// by `(file, code, flattened message)` when comparing the before and
    /// after sets of a verification.
    pub fn key(&self) -> DiagnosticKey {
        DiagnosticKey {
            file: self.file.clone(),
            code: self.code,
            message: self.flattened_message(),
        }
    }
}

/// Identity of a diagnostic across speculative applies.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DiagnosticKey {
    pub file: PathBuf,
    pub code: u32,
    pub message: String,
}

/// Repair engine errors
#[derive(Error, Debug)]
pub enum RepairError {
    #[error("failed to read project manifest: {path}")]
    Config {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse project manifest: {path}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid pattern '{pattern}' in project manifest: {message}")]
    ConfigPattern { pattern: String, message: String },

    #[error("failed to read project file: {path}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("file not tracked by the virtual file system: {path}")]
    FileNotInVfs { path: PathBuf },

    #[error("edit {start}..{end} out of bounds for {path} (len {len})")]
    EditOutOfBounds {
        path: PathBuf,
        start: usize,
        end: usize,
        len: usize,
    },

    #[error("edit {start}..{end} splits a UTF-8 character in {path}")]
    EditSplitsChar {
        path: PathBuf,
        start: usize,
        end: usize,
    },

    #[error("a snapshot is already active")]
    SnapshotAlreadyActive,

    #[error("checker failed on {file}: {reason}")]
    Checker { file: PathBuf, reason: String },

    #[error("solution builder '{builder}' failed: {reason}")]
    Builder { builder: String, reason: String },

    #[error(transparent)]
    Policy(#[from] crate::policy::PolicyError),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl RepairError {
    /// True for errors that mean the project configuration itself is unusable
    /// (the CLI maps these to exit code 2).
    pub fn is_config(&self) -> bool {
        matches!(
            self,
            RepairError::Config { .. }
                | RepairError::ConfigParse { .. }
                | RepairError::ConfigPattern { .. }
                | RepairError::Policy(_)
        )
    }

    /// True for errors contained to a single candidate: the planner skips the
    /// candidate and keeps going.
    pub fn is_candidate_local(&self) -> bool {
        matches!(
            self,
            RepairError::FileNotInVfs { .. }
                | RepairError::EditOutOfBounds { .. }
                | RepairError::EditSplitsChar { .. }
        )
    }
}
