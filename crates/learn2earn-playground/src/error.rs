//! Error types for the lesson playground.
//!
//! Only malformed literals and failed lookups surface as errors. Arithmetic
//! and condition failures are absorbed by the interpreter and never reach
//! this type.

/// A specialized `Result` type for playground operations.
pub type Result<T> = std::result::Result<T, ExecutionError>;

/// An error raised while executing a learner's program.
///
/// The rendered message always starts with `Execution error:` so it can be
/// shown verbatim in the console panel.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Execution error: {message}")]
pub struct ExecutionError {
    /// 1-based source line that raised the error, when known.
    pub line: Option<usize>,
    /// Human-readable description of the failure.
    pub message: String,
}

impl ExecutionError {
    /// Creates a new `ExecutionError` without line information.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            line: None,
            message: message.into(),
        }
    }

    /// Attaches a source line number if none is recorded yet.
    #[must_use]
    pub const fn at_line(mut self, line: usize) -> Self {
        if self.line.is_none() {
            self.line = Some(line);
        }
        self
    }
}

/// Failures of the expression evaluator.
///
/// These stay internal to the interpreter: depending on where an expression
/// appears they are either defaulted (`0` / `false`) or converted into an
/// [`ExecutionError`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EvalError {
    /// The expression text could not be tokenized or parsed.
    #[error("SyntaxError: {0}")]
    Syntax(String),

    /// A name was referenced before assignment.
    #[error("NameError: name '{0}' is not defined")]
    Name(String),

    /// An operator was applied to values of the wrong kind.
    #[error("TypeError: {0}")]
    Type(String),

    /// Division or modulo by zero.
    #[error("ZeroDivisionError: division by zero")]
    ZeroDivision,

    /// A list or string index was out of range.
    #[error("IndexError: {0} index out of range")]
    Index(&'static str),

    /// A mapping lookup used a missing key.
    #[error("KeyError: '{0}'")]
    Key(String),
}

impl From<EvalError> for ExecutionError {
    fn from(err: EvalError) -> Self {
        Self::new(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_execution_error_display_has_prefix() {
        let err = ExecutionError::new("invalid list literal");
        assert_eq!(err.to_string(), "Execution error: invalid list literal");
    }

    #[test]
    fn test_at_line_keeps_first_line() {
        let err = ExecutionError::new("boom").at_line(3).at_line(7);
        assert_eq!(err.line, Some(3));
    }

    #[test]
    fn test_eval_error_converts_with_python_style_name() {
        let err: ExecutionError = EvalError::Name("colours".to_string()).into();
        assert_eq!(
            err.to_string(),
            "Execution error: NameError: name 'colours' is not defined"
        );
    }
}
