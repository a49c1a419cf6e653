use std::time::{Duration, Instant};

use crate::error::{Fault, FaultKind};

/// Resource ceilings applied to every execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Limits {
    /// Wall-clock budget for one run.
    pub time_budget: Duration,
    /// Statements, loop iterations and calls allowed in one run.
    pub max_steps: u64,
    /// Nested function calls.
    pub max_call_depth: usize,
    /// Nested expression evaluation, summed across active calls.
    pub max_eval_depth: usize,
    pub max_output_bytes: usize,
    /// Elements in a single list, tuple, dict, set or string.
    pub max_collection_len: usize,
    /// Container elements produced by bulk operations over one run.
    pub max_allocated: u64,
    pub max_source_bytes: usize,
    /// Stack reserved for the interpreter thread.
    pub stack_size: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            time_budget: Duration::from_secs(5),
            max_steps: 50_000_000,
            max_call_depth: 200,
            max_eval_depth: 2_000,
            max_output_bytes: 1 << 20,
            max_collection_len: 1_000_000,
            max_allocated: 25_000_000,
            max_source_bytes: 100_000,
            stack_size: 64 << 20,
        }
    }
}

impl Limits {
    #[must_use]
    pub fn with_time_budget(mut self, budget: Duration) -> Self {
        self.time_budget = budget;
        self
    }

    #[must_use]
    pub fn with_max_steps(mut self, steps: u64) -> Self {
        self.max_steps = steps;
        self
    }

    #[must_use]
    pub fn with_max_allocated(mut self, elements: u64) -> Self {
        self.max_allocated = elements;
        self
    }

    #[must_use]
    pub fn with_max_output_bytes(mut self, bytes: usize) -> Self {
        self.max_output_bytes = bytes;
        self
    }
}

const CLOCK_CHECK_INTERVAL: u64 = 1024;

/// Step, allocation and deadline accounting for one run.
#[derive(Debug)]
pub(crate) struct Budget {
    steps: u64,
    max_steps: u64,
    allocated: u64,
    max_allocated: u64,
    time_budget: Duration,
    deadline: Option<Instant>,
}

impl Budget {
    pub(crate) fn start(limits: &Limits) -> Self {
        Self {
            steps: 0,
            max_steps: limits.max_steps,
            allocated: 0,
            max_allocated: limits.max_allocated,
            time_budget: limits.time_budget,
            deadline: Instant::now().checked_add(limits.time_budget),
        }
    }

    pub(crate) fn tick(&mut self) -> Result<(), Fault> {
        self.charge(1)
    }

    /// Charges `units` steps. The clock is read whenever the running total
    /// crosses a multiple of the check interval, so bulk charges cannot
    /// skip it.
    pub(crate) fn charge(&mut self, units: u64) -> Result<(), Fault> {
        let before = self.steps;
        self.steps = self.steps.saturating_add(units);
        if self.steps > self.max_steps {
            return Err(Fault::new(
                FaultKind::TimeoutError,
                format!("execution exceeded the step budget of {}", self.max_steps),
            ));
        }
        if before / CLOCK_CHECK_INTERVAL != self.steps / CLOCK_CHECK_INTERVAL {
            self.check_clock()?;
        }
        Ok(())
    }

    /// Records `elements` container slots produced in bulk and bills them as
    /// steps.
    pub(crate) fn allocate(&mut self, elements: u64) -> Result<(), Fault> {
        self.allocated = self.allocated.saturating_add(elements);
        if self.allocated > self.max_allocated {
            return Err(Fault::new(
                FaultKind::MemoryError,
                format!(
                    "program allocated more than {} collection elements",
                    self.max_allocated
                ),
            ));
        }
        self.charge(elements)
    }

    fn check_clock(&self) -> Result<(), Fault> {
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Err(Fault::new(
                FaultKind::TimeoutError,
                format!(
                    "execution exceeded the time budget of {} ms",
                    self.time_budget.as_millis()
                ),
            )),
            _ => Ok(()),
        }
    }

    pub(crate) fn steps(&self) -> u64 {
        self.steps
    }
}
