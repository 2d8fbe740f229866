//! Output verification.
//!
//! Verification is an exact, case-sensitive comparison of the printed lines
//! joined with `\n` against the module's expected text. Only the outer
//! whitespace of both sides is trimmed.

use serde::Serialize;

/// Shown in place of the learner's output when nothing was printed.
const EMPTY_OUTPUT: &str = "(empty)";

/// Returns `true` if `actual` matches `expected` exactly after an outer trim.
///
/// # Examples
///
/// ```
/// use learn2earn_playground::verify;
///
/// assert!(verify(&["Hello, Python!".to_string()], "Hello, Python!"));
/// assert!(!verify(&["hello, python!".to_string()], "Hello, Python!"));
/// ```
pub fn verify(actual: &[String], expected: &str) -> bool {
    actual.join("\n").trim() == expected.trim()
}

/// Result of checking a run against the expected output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Verdict {
    /// Output matched.
    Passed,
    /// Output differed.
    Mismatch {
        /// Expected text as authored.
        expected: String,
        /// Printed lines joined with `\n`.
        actual: String,
    },
}

impl Verdict {
    /// Returns `true` for [`Verdict::Passed`].
    #[must_use]
    pub const fn is_pass(&self) -> bool {
        matches!(self, Self::Passed)
    }

    /// Learner-facing message, `None` when the run passed.
    pub fn message(&self) -> Option<String> {
        match self {
            Self::Passed => None,
            Self::Mismatch { expected, actual } => {
                let actual = if actual.is_empty() {
                    EMPTY_OUTPUT
                } else {
                    actual
                };
                Some(format!("Expected output: {expected}\nYour output: {actual}"))
            }
        }
    }
}

/// Compares `actual` with `expected` and keeps both sides for reporting.
pub fn check(actual: &[String], expected: &str) -> Verdict {
    if verify(actual, expected) {
        Verdict::Passed
    } else {
        Verdict::Mismatch {
            expected: expected.to_string(),
            actual: actual.join("\n"),
        }
    }
}
