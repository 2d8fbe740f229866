//! Line classification.

use crate::lexer::is_identifier;

/// Operators that stop a line from being read as an assignment.
const COMPARISON_OPERATORS: [&str; 4] = ["==", "!=", "<=", ">="];

/// The kind of a single source line.
///
/// Classification is purely textual and never fails; anything that does not
/// match a supported form is [`Statement::Unrecognized`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Statement<'a> {
    /// `print(<arg>)`
    Print(&'a str),
    /// `<target> = <value>`
    Assign {
        /// Variable name.
        target: &'a str,
        /// Right-hand side text.
        value: &'a str,
    },
    /// `if <condition>:`
    If(&'a str),
    /// `else:`
    Else,
    /// `for <var> in <iterable>:`
    For {
        /// Loop variable name.
        var: &'a str,
        /// Iterable expression text.
        iterable: &'a str,
    },
    /// Any other line. Executes as a no-op.
    Unrecognized,
}

impl<'a> Statement<'a> {
    /// Classifies a trimmed source line.
    ///
    /// # Examples
    ///
    /// ```
    /// use learn2earn_playground::Statement;
    ///
    /// assert_eq!(Statement::classify("print(x)"), Statement::Print("x"));
    /// assert_eq!(Statement::classify("else:"), Statement::Else);
    /// assert_eq!(Statement::classify("while True:"), Statement::Unrecognized);
    /// ```
    pub fn classify(text: &'a str) -> Self {
        let text = text.trim();

        if let Some(condition) = header(text, "if") {
            return Self::If(condition);
        }
        if text.strip_suffix(':').map(str::trim) == Some("else") {
            return Self::Else;
        }
        if let Some(statement) = for_header(text) {
            return statement;
        }
        if let Some(arg) = text
            .strip_prefix("print(")
            .and_then(|rest| rest.strip_suffix(')'))
        {
            return Self::Print(arg.trim());
        }
        assignment(text).unwrap_or(Self::Unrecognized)
    }
}

/// Matches `<keyword> <body>:` and returns the trimmed body.
fn header<'a>(text: &'a str, keyword: &str) -> Option<&'a str> {
    let rest = text.strip_prefix(keyword)?;
    if !rest.starts_with(|c: char| c.is_whitespace() || c == '(') {
        return None;
    }
    let body = rest.strip_suffix(':')?.trim();
    (!body.is_empty()).then_some(body)
}

fn for_header(text: &str) -> Option<Statement<'_>> {
    let body = header(text, "for")?;
    let (var, iterable) = body.split_once(" in ")?;
    let var = var.trim();
    let iterable = iterable.trim();
    (is_identifier(var) && !iterable.is_empty()).then_some(Statement::For { var, iterable })
}

fn assignment(text: &str) -> Option<Statement<'_>> {
    if COMPARISON_OPERATORS.iter().any(|op| text.contains(op)) {
        return None;
    }
    let (target, value) = text.split_once('=')?;
    let target = target.trim();
    let value = value.trim();
    (is_identifier(target) && !value.is_empty()).then_some(Statement::Assign { target, value })
}
