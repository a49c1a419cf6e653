use std::fmt;

use thiserror::Error;

/// Category of a fault raised while parsing or running learner code.
///
/// Names follow the exception classes a Python learner would recognise.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum FaultKind {
    SyntaxError,
    IndentationError,
    NameError,
    TypeError,
    ValueError,
    ZeroDivisionError,
    IndexError,
    KeyError,
    AttributeError,
    ImportError,
    OverflowError,
    RecursionError,
    TimeoutError,
    MemoryError,
    AssertionError,
    InternalError,
}

impl FaultKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::SyntaxError => "SyntaxError",
            Self::IndentationError => "IndentationError",
            Self::NameError => "NameError",
            Self::TypeError => "TypeError",
            Self::ValueError => "ValueError",
            Self::ZeroDivisionError => "ZeroDivisionError",
            Self::IndexError => "IndexError",
            Self::KeyError => "KeyError",
            Self::AttributeError => "AttributeError",
            Self::ImportError => "ImportError",
            Self::OverflowError => "OverflowError",
            Self::RecursionError => "RecursionError",
            Self::TimeoutError => "TimeoutError",
            Self::MemoryError => "MemoryError",
            Self::AssertionError => "AssertionError",
            Self::InternalError => "InternalError",
        }
    }

    /// Faults raised by the budget rather than by the program's own logic.
    #[must_use]
    pub fn is_limit(self) -> bool {
        matches!(
            self,
            Self::TimeoutError | Self::MemoryError | Self::RecursionError
        )
    }
}

impl fmt::Display for FaultKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Source line a fault is attributed to, rendered as ` (line N)`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Location(Option<usize>);

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(line) => write!(f, " (line {line})"),
            None => Ok(()),
        }
    }
}

/// A contained failure of learner code.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {message}{location}")]
pub struct Fault {
    kind: FaultKind,
    message: String,
    location: Location,
}

impl Fault {
    #[must_use]
    pub fn new(kind: FaultKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            location: Location::default(),
        }
    }

    /// Attributes the fault to `line` unless it already carries a line.
    #[must_use]
    pub fn at_line(mut self, line: usize) -> Self {
        if self.location.0.is_none() && line > 0 {
            self.location = Location(Some(line));
        }
        self
    }

    #[must_use]
    pub fn kind(&self) -> FaultKind {
        self.kind
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    #[must_use]
    pub fn line(&self) -> Option<usize> {
        self.location.0
    }

    pub(crate) fn syntax(message: impl Into<String>, line: usize) -> Self {
        Self::new(FaultKind::SyntaxError, message).at_line(line)
    }

    pub(crate) fn type_error(message: impl Into<String>) -> Self {
        Self::new(FaultKind::TypeError, message)
    }

    pub(crate) fn value_error(message: impl Into<String>) -> Self {
        Self::new(FaultKind::ValueError, message)
    }

    pub(crate) fn overflow() -> Self {
        Self::new(FaultKind::OverflowError, "integer overflow")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_kind_message_and_line() {
        let fault = Fault::new(FaultKind::NameError, "name 'open' is not defined").at_line(3);
        assert_eq!(
            fault.to_string(),
            "NameError: name 'open' is not defined (line 3)"
        );
    }

    #[test]
    fn first_line_wins() {
        let fault = Fault::new(FaultKind::TypeError, "bad").at_line(2).at_line(9);
        assert_eq!(fault.line(), Some(2));
    }

    #[test]
    fn display_without_line() {
        let fault = Fault::new(FaultKind::TimeoutError, "too slow");
        assert_eq!(fault.to_string(), "TimeoutError: too slow");
    }
}
