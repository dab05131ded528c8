//! Budget event stream and iteration statistics.
//!
//! The planner narrates its work as a stream of [`BudgetEvent`]s. Production
//! runs use [`NoopLogger`]; tooling collects with [`MemoryLogger`] or pipes
//! into `tracing` with [`TraceLogger`]. Events are observational only - the
//! produced plan is identical whatever the logger.

use serde::Serialize;
use std::time::Instant;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum BudgetEvent {
    CandidatesGenerated {
        diagnostic: String,
        count: usize,
    },
    CandidatePruned {
        fix_name: String,
        reason: String,
    },
    VerificationStart {
        fix_name: String,
        cone_files: usize,
    },
    VerificationEnd {
        fix_name: String,
        target_fixed: bool,
        delta: i64,
        cached: bool,
    },
    FixCommitted {
        id: String,
        fix_name: String,
        score: f64,
    },
    BudgetExhausted {
        verified: usize,
    },
    IterationCompleted {
        iteration: usize,
        verifications: usize,
        cache_hits: usize,
        cache_misses: usize,
        duration_ms: u64,
    },
}

/// An event stamped with a monotonic offset from logger creation.
#[derive(Debug, Clone, Serialize)]
pub struct EventRecord {
    pub elapsed_ms: u64,
    #[serde(flatten)]
    pub event: BudgetEvent,
}

/// Sink for planner events. Single-producer, append-only.
pub trait BudgetLogger {
    fn log(&mut self, event: BudgetEvent);
}

/// Discards every event; the production default.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopLogger;

impl BudgetLogger for NoopLogger {
    fn log(&mut self, _event: BudgetEvent) {}
}

/// Collects timestamped events in memory.
#[derive(Debug)]
pub struct MemoryLogger {
    started: Instant,
    records: Vec<EventRecord>,
}

impl MemoryLogger {
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
            records: Vec::new(),
        }
    }

    pub fn records(&self) -> &[EventRecord] {
        &self.records
    }

    pub fn events(&self) -> impl Iterator<Item = &BudgetEvent> {
        self.records.iter().map(|record| &record.event)
    }

    pub fn into_records(self) -> Vec<EventRecord> {
        self.records
    }
}

impl Default for MemoryLogger {
    fn default() -> Self {
        Self::new()
    }
}

impl BudgetLogger for MemoryLogger {
    fn log(&mut self, event: BudgetEvent) {
        self.records.push(EventRecord {
            elapsed_ms: self.started.elapsed().as_millis() as u64,
            event,
        });
    }
}

/// Forwards every event to `tracing` at debug level.
#[derive(Debug, Default, Clone, Copy)]
pub struct TraceLogger;

impl BudgetLogger for TraceLogger {
    fn log(&mut self, event: BudgetEvent) {
        tracing::debug!(event = ?event, "budget");
    }
}
