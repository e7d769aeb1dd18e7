//! Collect-and-continue execution of several steps.
//!
//! Fail-fast callers use `?` on each [`Session`](crate::Session) call. Batch
//! callers feed every result into a [`BatchReport`] instead, keep going after
//! a failure and inspect the summary at the end.

use std::fmt;

use tracing::{error, info, warn};

use crate::error::{Error, Result};

/// How a step ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    Succeeded,
    Failed(String),
    /// Not attempted because an earlier step of the same job failed.
    Skipped(String),
}

/// One line of a [`BatchReport`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepRecord {
    pub label: String,
    pub outcome: StepOutcome,
}

impl StepRecord {
    pub fn is_failure(&self) -> bool {
        matches!(self.outcome, StepOutcome::Failed(_))
    }
}

impl fmt::Display for StepRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.outcome {
            StepOutcome::Succeeded => write!(f, "Ok01{}: completed", self.label),
            StepOutcome::Failed(msg) => write!(f, "Err01{}: {msg}", self.label),
            StepOutcome::Skipped(reason) => write!(f, "Skip01{}: {reason}", self.label),
        }
    }
}

/// Status lines of every step run so far.
#[derive(Debug, Clone, Default)]
pub struct BatchReport {
    steps: Vec<StepRecord>,
}

impl BatchReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `result` under `label` and hands back the value on success.
    pub fn record<T, E: fmt::Display>(&mut self, label: &str, result: Result<T, E>) -> Option<T> {
        let (value, outcome) = match result {
            Ok(value) => (Some(value), StepOutcome::Succeeded),
            Err(e) => (None, StepOutcome::Failed(e.to_string())),
        };
        let record = StepRecord {
            label: label.to_string(),
            outcome,
        };
        if record.is_failure() {
            error!(step = label, "{record}");
        } else {
            info!(step = label, "{record}");
        }
        self.steps.push(record);
        value
    }

    pub fn skip(&mut self, label: &str, reason: impl Into<String>) {
        let record = StepRecord {
            label: label.to_string(),
            outcome: StepOutcome::Skipped(reason.into()),
        };
        warn!(step = label, "{record}");
        self.steps.push(record);
    }

    pub fn steps(&self) -> &[StepRecord] {
        &self.steps
    }

    pub fn failed(&self) -> usize {
        self.steps.iter().filter(|s| s.is_failure()).count()
    }

    pub fn is_success(&self) -> bool {
        self.failed() == 0
    }

    /// One status line per step.
    pub fn summary(&self) -> String {
        self.steps
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// `Err(BatchFailed)` if any step failed.
    pub fn into_result(self) -> Result<Self> {
        let failed = self.failed();
        if failed > 0 {
            return Err(Error::BatchFailed {
                failed,
                total: self.steps.len(),
            });
        }
        Ok(self)
    }
}

/// Logs the outcome of a single step and returns its status line.
pub fn log_outcome<T, E: fmt::Display>(label: &str, result: Result<T, E>) -> String {
    let mut report = BatchReport::new();
    report.record(label, result);
    report.summary()
}
