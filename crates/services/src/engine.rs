use std::time::Duration;

use codify_core::{Catalog, LessonId};
use sandbox::{ExecutionResult, Limits, Sandbox};
use tracing::debug;

use crate::error::EngineError;

/// Runs learner code in the sandbox and checks output against the catalog.
#[derive(Debug, Clone)]
pub struct ExecutionEngine {
    sandbox: Sandbox,
    catalog: &'static Catalog,
}

impl Default for ExecutionEngine {
    fn default() -> Self {
        Self::new(Limits::default(), Catalog::builtin())
    }
}

impl ExecutionEngine {
    #[must_use]
    pub fn new(limits: Limits, catalog: &'static Catalog) -> Self {
        Self {
            sandbox: Sandbox::new(limits),
            catalog,
        }
    }

    /// Default limits with a different wall-clock budget.
    #[must_use]
    pub fn with_time_budget(budget: Duration) -> Self {
        Self::new(Limits::default().with_time_budget(budget), Catalog::builtin())
    }

    #[must_use]
    pub fn catalog(&self) -> &'static Catalog {
        self.catalog
    }

    #[must_use]
    pub fn limits(&self) -> &Limits {
        self.sandbox.limits()
    }

    /// Runs `source` on the calling thread until the sandbox returns.
    #[must_use]
    pub fn execute_blocking(&self, source: &str, simulated_input: &str) -> ExecutionResult {
        self.sandbox.run(source, simulated_input)
    }

    /// Runs `source` without blocking the async runtime.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::Task` if the blocking task could not complete.
    pub async fn execute(
        &self,
        source: &str,
        simulated_input: &str,
    ) -> Result<ExecutionResult, EngineError> {
        let sandbox = self.sandbox.clone();
        let source = source.to_owned();
        let input = simulated_input.to_owned();
        let result = tokio::task::spawn_blocking(move || sandbox.run(&source, &input))
            .await
            .map_err(|err| EngineError::Task(err.to_string()))?;
        if let Some(fault) = result.fault() {
            debug!(kind = fault.kind().as_str(), line = fault.line(), "execution faulted");
        }
        Ok(result)
    }

    /// Applies the predicate of `lesson_id` to captured output.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::Catalog` for lesson ids outside the catalog.
    pub fn validate(
        &self,
        lesson_id: &LessonId,
        captured_output: &str,
        simulated_input: &str,
    ) -> Result<bool, EngineError> {
        Ok(self
            .catalog
            .validate(lesson_id, captured_output, simulated_input)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sandbox::RUNTIME_ERROR_MARKER;

    #[tokio::test]
    async fn execute_returns_captured_output() {
        let engine = ExecutionEngine::default();
        let result = engine.execute("print(6 * 7)", "").await.unwrap();
        assert_eq!(result.captured_output(), "42\n");
        assert!(!result.is_faulted());
    }

    #[tokio::test]
    async fn disallowed_names_fault() {
        let engine = ExecutionEngine::default();
        let result = engine.execute("open('secrets.txt')", "").await.unwrap();
        assert!(result.captured_output().starts_with(RUNTIME_ERROR_MARKER));
    }

    #[test]
    fn validate_rejects_unknown_lessons() {
        let engine = ExecutionEngine::default();
        let err = engine
            .validate(&LessonId::new("missing"), "hello", "")
            .unwrap_err();
        assert!(matches!(err, EngineError::Catalog(_)));
    }

    #[test]
    fn time_budget_is_applied() {
        let engine = ExecutionEngine::with_time_budget(Duration::from_millis(250));
        assert_eq!(engine.limits().time_budget, Duration::from_millis(250));
    }
}
