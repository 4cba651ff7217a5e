use std::fmt;

/// One tile or upload that did not succeed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileFailure {
    pub date: String,
    pub name: String,
    pub error: String,
}

/// Aggregated outcome of a generation or upload run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    /// Work items known at dispatch time.
    pub planned: usize,
    /// Items a worker actually started.
    pub attempted: usize,
    pub succeeded: usize,
    pub failures: Vec<TileFailure>,
    pub cancelled: bool,
}

impl BatchReport {
    pub fn failed(&self) -> usize {
        self.failures.len()
    }

    pub fn is_complete(&self) -> bool {
        !self.cancelled && self.failures.is_empty() && self.succeeded == self.planned
    }

    pub(crate) fn merge(&mut self, outcome: JobOutcome) {
        self.attempted += outcome.attempted;
        self.failures.extend(outcome.failures);
    }
}

impl fmt::Display for BatchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} succeeded, {} failed, {} attempted of {} planned",
            self.succeeded,
            self.failed(),
            self.attempted,
            self.planned
        )?;
        if self.cancelled {
            write!(f, " (cancelled)")?;
        }
        Ok(())
    }
}

/// What a single worker job hands back after the barrier.
#[derive(Debug, Default)]
pub(crate) struct JobOutcome {
    pub attempted: usize,
    pub failures: Vec<TileFailure>,
}
