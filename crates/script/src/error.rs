//! Script errors
//!
//! Every failure a script can produce funnels into [`ScriptError`]. The
//! sandbox only ever looks at [`ScriptError::message`], which mirrors what a
//! JavaScript `error.message` would hold.

use crate::value::Value;

/// The built-in error classes a script can observe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Error,
    TypeError,
    RangeError,
    ReferenceError,
    SyntaxError,
}

impl ErrorKind {
    /// Constructor name as seen by scripts
    pub fn name(self) -> &'static str {
        match self {
            Self::Error => "Error",
            Self::TypeError => "TypeError",
            Self::RangeError => "RangeError",
            Self::ReferenceError => "ReferenceError",
            Self::SyntaxError => "SyntaxError",
        }
    }

    /// Look up an error class by constructor name
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "Error" => Some(Self::Error),
            "TypeError" => Some(Self::TypeError),
            "RangeError" => Some(Self::RangeError),
            "ReferenceError" => Some(Self::ReferenceError),
            "SyntaxError" => Some(Self::SyntaxError),
            _ => None,
        }
    }
}

/// Anything that stops a script early.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ScriptError {
    /// Source text could not be tokenized or parsed
    #[error("SyntaxError: {message} (line {line}, column {column})")]
    Syntax {
        message: String,
        line: usize,
        column: usize,
    },

    /// An error raised by the interpreter itself (bad call, unknown name...)
    #[error("{}: {message}", .kind.name())]
    Runtime { kind: ErrorKind, message: String },

    /// A value thrown by the script with `throw`
    #[error("Uncaught {0}")]
    Thrown(Value),

    /// The step budget ran out before the script finished
    #[error("Execution step limit exceeded ({limit} steps)")]
    StepLimit { limit: u64 },
}

impl ScriptError {
    pub(crate) fn syntax(message: impl Into<String>, line: usize, column: usize) -> Self {
        Self::Syntax {
            message: message.into(),
            line,
            column,
        }
    }

    pub(crate) fn type_error(message: impl Into<String>) -> Self {
        Self::Runtime {
            kind: ErrorKind::TypeError,
            message: message.into(),
        }
    }

    pub(crate) fn reference_error(message: impl Into<String>) -> Self {
        Self::Runtime {
            kind: ErrorKind::ReferenceError,
            message: message.into(),
        }
    }

    pub(crate) fn range_error(message: impl Into<String>) -> Self {
        Self::Runtime {
            kind: ErrorKind::RangeError,
            message: message.into(),
        }
    }

    /// The message a script would read from `error.message`.
    ///
    /// Thrown error objects report their `message` property; any other
    /// thrown value reports its string form.
    pub fn message(&self) -> String {
        match self {
            Self::Syntax { message, .. } => message.clone(),
            Self::Runtime { message, .. } => message.clone(),
            Self::Thrown(value) => match value.error_parts() {
                Some((_, message)) => message,
                None => value.to_js_string(),
            },
            Self::StepLimit { limit } => {
                format!("Execution step limit exceeded ({} steps)", limit)
            }
        }
    }

    /// Source position for syntax errors
    pub fn position(&self) -> Option<(usize, usize)> {
        match self {
            Self::Syntax { line, column, .. } => Some((*line, *column)),
            _ => None,
        }
    }

    /// Whether a `try`/`catch` in the script may intercept this error.
    ///
    /// Step-limit aborts are not catchable so runaway loops always stop.
    pub fn is_catchable(&self) -> bool {
        !matches!(self, Self::StepLimit { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_runtime_message_has_no_class_prefix() {
        let err = ScriptError::type_error("x is not a function");
        assert_eq!(err.message(), "x is not a function");
        assert_eq!(err.to_string(), "TypeError: x is not a function");
    }

    #[test]
    fn test_syntax_position() {
        let err = ScriptError::syntax("Unexpected token ')'", 3, 7);
        assert_eq!(err.position(), Some((3, 7)));
        assert_eq!(err.message(), "Unexpected token ')'");
    }

    #[test]
    fn test_thrown_plain_value_uses_string_form() {
        let err = ScriptError::Thrown(Value::from("oops"));
        assert_eq!(err.message(), "oops");
    }

    #[test]
    fn test_step_limit_not_catchable() {
        assert!(!ScriptError::StepLimit { limit: 10 }.is_catchable());
        assert!(ScriptError::range_error("too deep").is_catchable());
    }

    #[test]
    fn test_error_kind_names_round_trip() {
        for kind in [
            ErrorKind::Error,
            ErrorKind::TypeError,
            ErrorKind::RangeError,
            ErrorKind::ReferenceError,
            ErrorKind::SyntaxError,
        ] {
            assert_eq!(ErrorKind::from_name(kind.name()), Some(kind));
        }
        assert_eq!(ErrorKind::from_name("Nope"), None);
    }
}
