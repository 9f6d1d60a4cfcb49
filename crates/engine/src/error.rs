use std::fmt;

use thiserror::Error;

/// Position of an expression in the original source text, carried on every
/// arena node and attached to errors when they are raised.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SourceLocation {
    pub line: u32,
    pub column: u32,
}

impl SourceLocation {
    pub fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }

    pub fn is_unknown(&self) -> bool {
        self.line == 0 && self.column == 0
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ErrorKind {
    #[error("wrong number of arguments to {function}: expected {expected}, got {actual}")]
    Arity {
        function: String,
        expected: String,
        actual: usize,
    },

    #[error("type error: expected {expected}, got {actual}")]
    TypeMismatch { expected: String, actual: String },

    #[error("argument {position} of {function}: expected {expected}, got {actual}")]
    InvalidArgument {
        function: String,
        position: usize,
        expected: String,
        actual: String,
    },

    #[error("a single item is required, but the sequence is empty")]
    EmptySequence,

    #[error("a single item is required, but the sequence has {count} items")]
    MultipleItems { count: usize },

    #[error("index must be a single integer, got {actual}")]
    InvalidIndex { actual: String },

    #[error("array index {index} out of bounds (size {size})")]
    IndexOutOfBounds { index: i64, size: usize },

    #[error("duplicate key rejected: {key}")]
    DuplicateKey { key: String },

    #[error("malformed numeric literal: '{literal}'")]
    MalformedNumber { literal: String },

    #[error("function item expects {expected} arguments, got {actual}")]
    FunctionArity { expected: usize, actual: usize },

    #[error("cannot convert {from} to {to}")]
    UnsupportedConversion { from: String, to: String },

    #[error("inconsistent timezones: {left} vs {right}")]
    InconsistentTimezone { left: String, right: String },

    #[error("integer division by zero")]
    DivisionByZero,

    #[error("context item is required but not set")]
    NoContextItem,

    #[error("variable ${name} was not resolved before evaluation")]
    UnresolvedVariable { name: String },

    #[error("unknown variable ${name}")]
    UnknownVariable { name: String },

    #[error("unknown function {name}#{arity}")]
    UnknownFunction { name: String, arity: usize },

    #[error("[{code}] {message}")]
    Raised { code: String, message: String },
}

/// How serious a reported error is. Listeners may let evaluation continue
/// past warnings; errors and fatals abort unless a listener overrides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Warning,
    Error,
    Fatal,
}

/// A typed evaluation error with the source location it originated from.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineError {
    pub kind: ErrorKind,
    pub location: Option<SourceLocation>,
    pub severity: Severity,
}

impl EngineError {
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            location: None,
            severity: Severity::Error,
        }
    }

    pub fn fatal(kind: ErrorKind) -> Self {
        Self {
            kind,
            location: None,
            severity: Severity::Fatal,
        }
    }

    /// Attaches a source location unless one was already recorded closer to
    /// the raise site.
    pub fn at(mut self, location: SourceLocation) -> Self {
        if self.location.is_none() && !location.is_unknown() {
            self.location = Some(location);
        }
        self
    }

    pub fn type_error(expected: impl Into<String>, actual: impl Into<String>) -> Self {
        Self::new(ErrorKind::TypeMismatch {
            expected: expected.into(),
            actual: actual.into(),
        })
    }

    pub fn arity(function: impl Into<String>, expected: impl Into<String>, actual: usize) -> Self {
        Self::new(ErrorKind::Arity {
            function: function.into(),
            expected: expected.into(),
            actual,
        })
    }

    pub fn argument(
        function: impl Into<String>,
        position: usize,
        expected: impl Into<String>,
        actual: impl Into<String>,
    ) -> Self {
        Self::new(ErrorKind::InvalidArgument {
            function: function.into(),
            position,
            expected: expected.into(),
            actual: actual.into(),
        })
    }

    pub fn raised(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::fatal(ErrorKind::Raised {
            code: code.into(),
            message: message.into(),
        })
    }
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.location {
            Some(loc) => write!(f, "{} at {}", self.kind, loc),
            None => write!(f, "{}", self.kind),
        }
    }
}

impl std::error::Error for EngineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.kind)
    }
}

impl From<ErrorKind> for EngineError {
    fn from(kind: ErrorKind) -> Self {
        Self::new(kind)
    }
}

/// What a listener wants the engine to do with a reported error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reaction {
    Continue,
    Abort,
}

/// Receives errors before they abort evaluation. Fatal errors are reported
/// but never continuable; without a listener installed every error aborts.
pub trait ErrorListener {
    fn report(&self, error: &EngineError) -> Reaction;
}

/// A listener that aborts on everything except warnings. Useful as a test
/// double and as the documented default behaviour made explicit.
#[derive(Debug, Default)]
pub struct StrictListener;

impl ErrorListener for StrictListener {
    fn report(&self, error: &EngineError) -> Reaction {
        match error.severity {
            Severity::Warning => Reaction::Continue,
            Severity::Error | Severity::Fatal => Reaction::Abort,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn location_attached_once() {
        let err = EngineError::new(ErrorKind::EmptySequence)
            .at(SourceLocation::new(3, 14))
            .at(SourceLocation::new(9, 9));
        assert_eq!(err.location, Some(SourceLocation::new(3, 14)));
        assert_eq!(err.to_string(), format!("{} at 3:14", ErrorKind::EmptySequence));
    }

    #[test]
    fn unknown_location_ignored() {
        let err = EngineError::new(ErrorKind::DivisionByZero).at(SourceLocation::default());
        assert_eq!(err.location, None);
    }

    #[test]
    fn strict_listener_reactions() {
        let listener = StrictListener;
        let mut warning = EngineError::new(ErrorKind::EmptySequence);
        warning.severity = Severity::Warning;
        assert_eq!(listener.report(&warning), Reaction::Continue);

        let error = EngineError::new(ErrorKind::EmptySequence);
        assert_eq!(listener.report(&error), Reaction::Abort);
    }
}
