//! Restricted interpreter for the Python subset used by the lessons.
//!
//! Learner code runs against a fixed allow-list of builtins and per-type
//! method tables. Output goes to a buffer owned by the run, never to a
//! process stream, and every run starts from an empty namespace.

pub mod ast;
mod builtins;
pub mod dedent;
pub mod error;
mod format;
mod interp;
pub mod lexer;
pub mod limits;
mod methods;
mod ops;
pub mod parser;
mod subscript;
pub mod value;

use std::thread;
use std::time::Instant;

use tracing::{debug, warn};

pub use builtins::Builtin;
pub use dedent::dedent;
pub use error::{Fault, FaultKind};
pub use limits::Limits;

use interp::Interpreter;

/// First line of the captured output whenever a run faults.
pub const RUNTIME_ERROR_MARKER: &str = "Runtime Error:";

/// Outcome of one run.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionResult {
    output: String,
    fault: Option<Fault>,
}

impl ExecutionResult {
    /// Everything printed before the run ended, including any partial output
    /// preceding a fault.
    #[must_use]
    pub fn output(&self) -> &str {
        &self.output
    }

    #[must_use]
    pub fn fault(&self) -> Option<&Fault> {
        self.fault.as_ref()
    }

    #[must_use]
    pub fn is_faulted(&self) -> bool {
        self.fault.is_some()
    }

    /// The text shown to the learner and handed to lesson validators.
    ///
    /// A faulted run yields only the error marker and the fault; partial
    /// output is left out.
    #[must_use]
    pub fn captured_output(&self) -> String {
        match &self.fault {
            Some(fault) => format!("{RUNTIME_ERROR_MARKER}\n{fault}"),
            None => self.output.clone(),
        }
    }
}

/// Runs learner programs under a fixed set of [`Limits`].
#[derive(Debug, Clone, Default)]
pub struct Sandbox {
    limits: Limits,
}

impl Sandbox {
    #[must_use]
    pub fn new(limits: Limits) -> Self {
        Self { limits }
    }

    #[must_use]
    pub fn limits(&self) -> &Limits {
        &self.limits
    }

    /// Executes `source` with every `input()` call answered by
    /// `simulated_input`.
    ///
    /// Never fails: syntax errors, runtime errors, exhausted limits and
    /// interpreter panics all come back as a faulted result.
    #[must_use]
    pub fn run(&self, source: &str, simulated_input: &str) -> ExecutionResult {
        let started = Instant::now();
        let source = dedent(source);
        if source.len() > self.limits.max_source_bytes {
            return ExecutionResult {
                output: String::new(),
                fault: Some(Fault::new(
                    FaultKind::MemoryError,
                    format!(
                        "program exceeds the limit of {} bytes",
                        self.limits.max_source_bytes
                    ),
                )),
            };
        }

        let limits = self.limits.clone();
        let input = simulated_input.to_owned();
        let spawned = thread::Builder::new()
            .name("codify-sandbox".into())
            .stack_size(self.limits.stack_size)
            .spawn(move || run_program(&source, &input, &limits));

        let (result, steps) = match spawned.map(thread::JoinHandle::join) {
            Ok(Ok(finished)) => finished,
            Ok(Err(_)) => {
                warn!("sandbox interpreter panicked");
                (crashed("the interpreter stopped unexpectedly"), 0)
            }
            Err(err) => {
                warn!(error = %err, "could not start sandbox thread");
                (crashed("could not start the interpreter"), 0)
            }
        };

        debug!(
            steps,
            elapsed_ms = started.elapsed().as_millis(),
            faulted = result.is_faulted(),
            fault = result.fault().map(|fault| fault.kind().as_str()),
            "sandbox run finished"
        );
        result
    }
}

fn crashed(message: &str) -> ExecutionResult {
    ExecutionResult {
        output: String::new(),
        fault: Some(Fault::new(FaultKind::InternalError, message)),
    }
}

fn run_program(source: &str, simulated_input: &str, limits: &Limits) -> (ExecutionResult, u64) {
    let program = match parser::parse(source) {
        Ok(program) => program,
        Err(fault) => {
            return (
                ExecutionResult {
                    output: String::new(),
                    fault: Some(fault),
                },
                0,
            );
        }
    };
    let mut interp = Interpreter::new(limits, simulated_input);
    let outcome = interp.run(&program);
    let steps = interp.steps();
    let output = interp.into_output();
    (
        ExecutionResult {
            output,
            fault: outcome.err(),
        },
        steps,
    )
}

/// Runs `source` with default limits and returns what the learner sees.
#[must_use]
pub fn execute(source: &str, simulated_input: &str) -> String {
    Sandbox::default().run(source, simulated_input).captured_output()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prints_are_captured() {
        assert_eq!(execute("print('Hello, World!')", ""), "Hello, World!\n");
    }

    #[test]
    fn input_echoes_prompt_and_returns_simulated_value() {
        let out = execute("name = input('Name? ')\nprint('Hi', name)", "Sam");
        assert_eq!(out, "Name? Hi Sam\n");
    }

    #[test]
    fn fault_replaces_partial_output() {
        let result = Sandbox::default().run("print('before')\nprint(missing)", "");
        assert_eq!(result.output(), "before\n");
        assert_eq!(
            result.captured_output(),
            "Runtime Error:\nNameError: name 'missing' is not defined (line 2)"
        );
    }

    #[test]
    fn syntax_errors_are_faults() {
        let out = execute("if True\n    print(1)", "");
        assert!(out.starts_with(RUNTIME_ERROR_MARKER), "{out}");
        assert!(out.contains("SyntaxError"), "{out}");
    }

    #[test]
    fn oversized_programs_are_rejected() {
        let sandbox = Sandbox::new(Limits {
            max_source_bytes: 8,
            ..Limits::default()
        });
        let result = sandbox.run("print('too long')", "");
        assert_eq!(result.fault().map(Fault::kind), Some(FaultKind::MemoryError));
    }
}
