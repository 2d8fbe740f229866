//! Line-oriented interpreter for the lesson mini-language.
//!
//! The interpreter walks the indentation tree built by [`Program`] and keeps
//! a single flat [`VariableTable`] for the whole run. Supported statements
//! are assignment, `print`, `if`/`else` and `for`; every other line is a
//! silent no-op.
//!
//! Evaluation is deliberately forgiving: a failing arithmetic right-hand side
//! stores `0` and a failing condition counts as `false`. Both cases are
//! logged at debug level.

use indexmap::IndexMap;
use tracing::{debug, trace};

use crate::block::{Line, Program};
use crate::error::{EvalError, ExecutionError, Result};
use crate::expr;
use crate::lexer::{is_identifier, Lexer, Token};
use crate::statement::Statement;
use crate::value::{is_integral, Value};

/// Characters that make an assignment right-hand side arithmetic.
const ARITHMETIC_CHARS: [char; 5] = ['+', '-', '*', '/', '%'];

/// Longest `range(...)` a loop may iterate.
pub const MAX_RANGE_LEN: i64 = 100_000;

/// Executes a program and returns the printed lines.
///
/// # Examples
///
/// ```
/// use learn2earn_playground::execute;
///
/// let output = execute("width = 12\nheight = 8\narea = width * height\nprint(area)").unwrap();
/// assert_eq!(output, vec!["96"]);
/// ```
pub fn execute(source: &str) -> Result<Vec<String>> {
    run_program(&Program::parse(source))
}

/// Executes a program given as individual source lines.
pub fn execute_lines<S: AsRef<str>>(lines: &[S]) -> Result<Vec<String>> {
    run_program(&Program::from_lines(lines))
}

fn run_program(program: &Program) -> Result<Vec<String>> {
    let mut interpreter = Interpreter::new();
    interpreter.run(program)?;
    debug!(
        lines = interpreter.output.len(),
        variables = interpreter.variables.len(),
        "Program executed"
    );
    Ok(interpreter.into_output())
}

/// Global variable storage for one run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VariableTable {
    values: IndexMap<String, Value>,
}

impl VariableTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Looks up a variable.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    /// Binds or rebinds a variable.
    pub fn set(&mut self, name: impl Into<String>, value: Value) {
        self.values.insert(name.into(), value);
    }

    /// Returns `true` if the name is bound.
    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// Number of bound names.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns `true` if nothing is bound.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterates bindings in first-assignment order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(name, value)| (name.as_str(), value))
    }
}

/// Executes programs against a variable table and collects printed output.
#[derive(Debug, Default)]
pub struct Interpreter {
    variables: VariableTable,
    output: Vec<String>,
}

impl Interpreter {
    /// Creates an interpreter with an empty variable table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs every line of `program`.
    ///
    /// Output printed before an error is kept and stays available through
    /// [`Interpreter::output`].
    pub fn run(&mut self, program: &Program) -> Result<()> {
        self.exec_block(&program.lines)
    }

    /// Variables bound so far.
    pub const fn variables(&self) -> &VariableTable {
        &self.variables
    }

    /// Lines printed so far.
    pub fn output(&self) -> &[String] {
        &self.output
    }

    /// Consumes the interpreter and returns the printed lines.
    pub fn into_output(self) -> Vec<String> {
        self.output
    }

    fn exec_block(&mut self, lines: &[Line]) -> Result<()> {
        let mut i = 0;
        while i < lines.len() {
            let line = &lines[i];
            i += 1;
            match Statement::classify(&line.text) {
                Statement::If(condition) => {
                    let else_branch = lines
                        .get(i)
                        .filter(|next| Statement::classify(&next.text) == Statement::Else);
                    if else_branch.is_some() {
                        i += 1;
                    }
                    let taken = if self.condition(condition, line.number) {
                        Some(line)
                    } else {
                        else_branch
                    };
                    if let Some(branch) = taken {
                        self.exec_prints(branch)?;
                    }
                }
                Statement::For { var, iterable } => {
                    let items = self
                        .iterate(iterable)
                        .map_err(|e| e.at_line(line.number))?;
                    for item in items {
                        self.variables.set(var, item);
                        self.exec_prints(line)?;
                    }
                }
                Statement::Print(arg) => {
                    self.print(arg).map_err(|e| e.at_line(line.number))?;
                    self.exec_block(&line.children)?;
                }
                Statement::Assign { target, value } => {
                    let value = self.assign_value(value).map_err(|e| e.at_line(line.number))?;
                    self.variables.set(target, value);
                    self.exec_block(&line.children)?;
                }
                Statement::Else | Statement::Unrecognized => {
                    trace!(line = line.number, text = %line.text, "Skipping unrecognized line");
                    self.exec_block(&line.children)?;
                }
            }
        }
        Ok(())
    }

    /// Runs the `print` lines nested anywhere under `header`.
    fn exec_prints(&mut self, header: &Line) -> Result<()> {
        for line in header.descendants() {
            if let Statement::Print(arg) = Statement::classify(&line.text) {
                self.print(arg).map_err(|e| e.at_line(line.number))?;
            } else {
                trace!(line = line.number, text = %line.text, "Skipping non-print line in block");
            }
        }
        Ok(())
    }

    fn print(&mut self, arg: &str) -> Result<()> {
        let text = self.render(arg)?;
        self.output.push(text);
        Ok(())
    }

    /// Resolves a `print` argument: quoted literal, variable, f-string,
    /// indexed access, then the raw text.
    fn render(&self, arg: &str) -> Result<String> {
        if let Some(text) = string_literal(arg) {
            return Ok(text);
        }
        if let Some(value) = self.variables.get(arg) {
            return Ok(value.to_string());
        }
        if let Some(template) = fstring_body(arg) {
            return Ok(self.interpolate(template));
        }
        if let Some(open) = arg.find('[') {
            let name = arg[..open].trim();
            if is_identifier(name) && arg.ends_with(']') {
                if !self.variables.contains(name) {
                    return Err(EvalError::Name(name.to_string()).into());
                }
                return Ok(expr::evaluate(arg, &self.variables)?.to_string());
            }
        }
        Ok(arg.to_string())
    }

    /// Replaces `{...}` placeholders. Unresolvable placeholders stay verbatim.
    fn interpolate(&self, template: &str) -> String {
        let mut out = String::with_capacity(template.len());
        let mut rest = template;
        while let Some(pos) = rest.find(['{', '}']) {
            out.push_str(&rest[..pos]);
            let tail = &rest[pos..];
            if tail.starts_with("{{") || tail.starts_with("}}") {
                out.push_str(&tail[..1]);
                rest = &tail[2..];
                continue;
            }
            if tail.starts_with('}') {
                out.push('}');
                rest = &tail[1..];
                continue;
            }
            let Some(close) = tail.find('}') else {
                out.push_str(tail);
                return out;
            };
            let placeholder = &tail[1..close];
            let key = placeholder.trim();
            match self.variables.get(key) {
                Some(value) => out.push_str(&value.to_string()),
                None => match expr::evaluate(key, &self.variables) {
                    Ok(value) => out.push_str(&value.to_string()),
                    Err(e) => {
                        debug!(placeholder = key, error = %e, "Leaving f-string placeholder unresolved");
                        out.push_str(&tail[..=close]);
                    }
                },
            }
            rest = &tail[close + 1..];
        }
        out.push_str(rest);
        out
    }

    /// Classifies an assignment right-hand side in priority order.
    fn assign_value(&self, rhs: &str) -> Result<Value> {
        if let Some(text) = string_literal(rhs) {
            return Ok(Value::Str(text));
        }
        if let Some(n) = numeric_literal(rhs) {
            return Ok(Value::Num(n));
        }
        if rhs.starts_with('[') || rhs.starts_with('{') {
            return self.collection_literal(rhs);
        }
        match rhs {
            "True" => return Ok(Value::Bool(true)),
            "False" => return Ok(Value::Bool(false)),
            _ => {}
        }
        if rhs.contains(ARITHMETIC_CHARS) {
            return Ok(self.arithmetic(rhs));
        }
        if let Some(value) = self.variables.get(rhs) {
            return Ok(value.clone());
        }
        match expr::evaluate(rhs, &self.variables) {
            Ok(value) => Ok(value),
            Err(e) => {
                trace!(expression = rhs, error = %e, "Storing right-hand side as text");
                Ok(Value::Str(rhs.to_string()))
            }
        }
    }

    fn arithmetic(&self, rhs: &str) -> Value {
        match expr::evaluate(rhs, &self.variables) {
            Ok(value) => value,
            Err(e) => {
                debug!(expression = rhs, error = %e, "Arithmetic failed, storing 0");
                Value::Num(0.0)
            }
        }
    }

    fn condition(&self, condition: &str, line: usize) -> bool {
        match expr::evaluate(condition, &self.variables) {
            Ok(value) => value.truthy(),
            Err(e) => {
                debug!(line, condition, error = %e, "Condition failed, treating as false");
                false
            }
        }
    }

    /// Parses a list or object literal.
    ///
    /// Python-style literals go through the expression evaluator; JSON text
    /// written with single quotes is accepted as a fallback.
    fn collection_literal(&self, text: &str) -> Result<Value> {
        let eval_error = match expr::evaluate(text, &self.variables) {
            Ok(value) => return Ok(value),
            Err(e) => e,
        };
        let normalized = text.replace('\'', "\"");
        serde_json::from_str::<serde_json::Value>(&normalized)
            .map_err(|_| ExecutionError::new(format!("invalid literal {text}: {eval_error}")))
            .and_then(|json| {
                Value::from_json(json)
                    .map_err(|e| ExecutionError::new(format!("invalid literal {text}: {e}")))
            })
    }

    /// Resolves the iterable of a `for` header.
    fn iterate(&self, iterable: &str) -> Result<Vec<Value>> {
        if let Some(args) = iterable
            .strip_prefix("range(")
            .and_then(|rest| rest.strip_suffix(')'))
        {
            return self.range(args);
        }

        let value = if iterable.starts_with('[') {
            self.collection_literal(iterable)?
        } else {
            expr::evaluate(iterable, &self.variables)?
        };
        match value {
            Value::List(items) => Ok(items),
            Value::Str(s) => Ok(s.chars().map(|c| Value::Str(c.to_string())).collect()),
            other => Err(ExecutionError::new(format!(
                "TypeError: '{}' object is not iterable",
                other.type_name()
            ))),
        }
    }

    fn range(&self, args: &str) -> Result<Vec<Value>> {
        let bounds = args
            .split(',')
            .map(|arg| self.range_bound(arg.trim()))
            .collect::<Result<Vec<_>>>()?;
        let (start, stop) = match bounds.as_slice() {
            [stop] => (0, *stop),
            [start, stop] => (*start, *stop),
            _ => {
                return Err(ExecutionError::new(format!(
                    "TypeError: range expected 1 or 2 arguments, got {}",
                    bounds.len()
                )));
            }
        };
        if stop.saturating_sub(start) > MAX_RANGE_LEN {
            return Err(ExecutionError::new(format!(
                "range({start}, {stop}) exceeds {MAX_RANGE_LEN} iterations"
            )));
        }
        #[allow(clippy::cast_precision_loss)]
        let items = (start..stop).map(|n| Value::Num(n as f64)).collect();
        Ok(items)
    }

    fn range_bound(&self, arg: &str) -> Result<i64> {
        match expr::evaluate(arg, &self.variables)? {
            Value::Num(n) if is_integral(n) => {
                // is_integral bounds n to the exactly representable range.
                #[allow(clippy::cast_possible_truncation)]
                let bound = n as i64;
                Ok(bound)
            }
            other => Err(ExecutionError::new(format!(
                "TypeError: '{}' object cannot be interpreted as an integer",
                other.type_name()
            ))),
        }
    }
}

/// Returns the text of a lone quoted string literal.
fn string_literal(text: &str) -> Option<String> {
    if !text.starts_with(['"', '\'']) {
        return None;
    }
    match Lexer::new(text).tokenize() {
        Ok(tokens) => match <[Token; 1]>::try_from(tokens) {
            Ok([Token::Str(s)]) => Some(s),
            _ => None,
        },
        Err(_) => None,
    }
}

/// Parses a plain numeric literal such as `12`, `-3.5` or `1e3`.
fn numeric_literal(text: &str) -> Option<f64> {
    let plausible = text.bytes().any(|b| b.is_ascii_digit())
        && text
            .bytes()
            .all(|b| b.is_ascii_digit() || matches!(b, b'.' | b'-' | b'+' | b'e' | b'E'));
    if plausible {
        text.parse().ok()
    } else {
        None
    }
}

/// Returns the body of `f"..."` / `f'...'`.
fn fstring_body(text: &str) -> Option<&str> {
    let rest = text.strip_prefix(['f', 'F'])?;
    let quote = rest.chars().next().filter(|c| *c == '"' || *c == '\'')?;
    let body = rest.strip_prefix(quote)?.strip_suffix(quote)?;
    Some(body)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn run(source: &str) -> Vec<String> {
        execute(source).unwrap()
    }

    // ------------------------------------------------------------------------
    // Assignment and print
    // ------------------------------------------------------------------------

    #[test]
    fn test_print_string_literal() {
        assert_eq!(run("print(\"Hello, Python!\")"), vec!["Hello, Python!"]);
        assert_eq!(run("print('single')"), vec!["single"]);
    }

    #[test]
    fn test_area_example() {
        let source = "width = 12\nheight = 8\narea = width * height\nprint(area)";
        assert_eq!(run(source), vec!["96"]);
    }

    #[test]
    fn test_list_index_example() {
        let source = "colors = [\"red\", \"green\", \"blue\"]\nprint(colors[1])";
        assert_eq!(run(source), vec!["green"]);
    }

    #[test]
    fn test_single_quoted_list_and_dict() {
        let source = "colors = ['red', 'green']\nperson = {'name': 'Bob'}\nprint(colors)\nprint(person['name'])";
        assert_eq!(run(source), vec!["['red', 'green']", "Bob"]);
    }

    #[test]
    fn test_assignment_priority_chain() {
        let source = "a = 'text'\nb = 42\nc = -2.5\nd = True\ne = b\nf = hello world\ng = b % 5\nprint(a)\nprint(b)\nprint(c)\nprint(d)\nprint(e)\nprint(f)\nprint(g)";
        assert_eq!(
            run(source),
            vec!["text", "42", "-2.5", "true", "42", "hello world", "2"]
        );
    }

    #[test]
    fn test_builtin_call_without_operator() {
        let source = "xs = [1, 2, 3]\nn = len(xs)\nlabel = str(n)\nwhole = int(\"7\")\nprint(n)\nprint(label)\nprint(whole)";
        assert_eq!(run(source), vec!["3", "3", "7"]);
        assert_eq!(run("m = shout(1)\nprint(m)"), vec!["shout(1)"]);
    }

    #[test]
    fn test_arithmetic_failure_defaults_to_zero() {
        let source = "x = missing * 2\ny = 1 / 0\nprint(x)\nprint(y)";
        assert_eq!(run(source), vec!["0", "0"]);
    }

    #[test]
    fn test_deeply_nested_right_hand_side_does_not_crash() {
        let source = format!("x = {}1\nprint(x)", "-".repeat(100_000));
        assert_eq!(run(&source), vec!["0"]);

        let parens = "(".repeat(100_000);
        let source = format!("y = {parens}\nprint(len(y))");
        assert_eq!(run(&source), vec!["100000"]);
    }

    #[test]
    fn test_string_concatenation_and_power() {
        let source = "first = 'Ada'\nfull = first + ' Lovelace'\nsq = 3 ** 2\nprint(full)\nprint(sq)";
        assert_eq!(run(source), vec!["Ada Lovelace", "9"]);
    }

    #[test]
    fn test_fstring_substitution() {
        let source = "name = 'Ada'\nage = 36\nprint(f\"{name} is {age}\")\nprint(f'{age + 1} next year, {unknown} stays')";
        assert_eq!(
            run(source),
            vec!["Ada is 36", "37 next year, {unknown} stays"]
        );
    }

    #[test]
    fn test_fstring_escaped_braces() {
        assert_eq!(run("x = 1\nprint(f'{{x}} = {x}')"), vec!["{x} = 1"]);
    }

    #[test]
    fn test_print_raw_fallback() {
        assert_eq!(run("print(undefined_name)"), vec!["undefined_name"]);
        assert_eq!(run("x = 2\nprint(x * 3)"), vec!["x * 3"]);
    }

    #[test]
    fn test_print_index_errors() {
        let err = execute("colors = ['a']\nprint(colors[5])").unwrap_err();
        assert_eq!(err.line, Some(2));
        assert!(err.to_string().contains("IndexError"));

        let err = execute("print(nothing[0])").unwrap_err();
        assert!(err.to_string().contains("NameError"));
    }

    #[test]
    fn test_negative_index() {
        assert_eq!(run("nums = [1, 2, 3]\nprint(nums[-1])"), vec!["3"]);
    }

    #[test]
    fn test_malformed_literal_is_execution_error() {
        let err = execute("items = [1, 2").unwrap_err();
        assert!(err.to_string().starts_with("Execution error:"));
        assert_eq!(err.line, Some(1));
    }

    #[test]
    fn test_json_fallback_literal() {
        assert_eq!(run("flags = [true, false]\nprint(flags)"), vec!["[true, false]"]);
    }

    #[test]
    fn test_reassignment_changes_kind() {
        assert_eq!(run("x = 1\nx = 'one'\nprint(x)"), vec!["one"]);
    }

    #[test]
    fn test_unrecognized_lines_are_skipped() {
        let source = "import math\nx += 1\nwhile False:\n    print('looped')\nprint('ok')";
        assert_eq!(run(source), vec!["looped", "ok"]);
    }

    // ------------------------------------------------------------------------
    // Conditionals
    // ------------------------------------------------------------------------

    #[test]
    fn test_if_else_branches() {
        let source = "temperature = 75\nif temperature > 70:\n    print(\"Hot\")\nelse:\n    print(\"Cold\")";
        assert_eq!(run(source), vec!["Hot"]);

        let source = "temperature = 50\nif temperature > 70:\n    print(\"Hot\")\nelse:\n    print(\"Cold\")";
        assert_eq!(run(source), vec!["Cold"]);
    }

    #[test]
    fn test_if_with_string_variable() {
        let source = "status = 'on'\nif status == 'on':\n    print('running')";
        assert_eq!(run(source), vec!["running"]);
    }

    #[test]
    fn test_failed_condition_is_false() {
        let source = "if missing > 3:\n    print('yes')\nelse:\n    print('no')";
        assert_eq!(run(source), vec!["no"]);
    }

    #[test]
    fn test_only_prints_run_inside_branch() {
        let source = "x = 1\nif True:\n    x = 5\n    print(x)";
        assert_eq!(run(source), vec!["1"]);
    }

    #[test]
    fn test_if_without_else_and_false_condition() {
        assert_eq!(run("if False:\n    print('x')\nprint('y')"), vec!["y"]);
    }

    #[test]
    fn test_trailing_comments_keep_branches_apart() {
        let source = "x = 5\nif x > 10:  # check\n    print(\"big\")\nelse:  # otherwise\n    print(\"small\")";
        assert_eq!(run(source), vec!["small"]);
    }

    #[test]
    fn test_trailing_comments_on_loops_and_prints() {
        assert_eq!(run("for i in range(3):  # loop\n    print(i)"), vec!["0", "1", "2"]);
        assert_eq!(run("print(\"Hi\")  # greet"), vec!["Hi"]);
        assert_eq!(run("tag = \"#1\"  # label\nprint(tag)"), vec!["#1"]);
    }

    // ------------------------------------------------------------------------
    // Loops
    // ------------------------------------------------------------------------

    #[test]
    fn test_range_loop() {
        assert_eq!(
            run("for i in range(1, 6):\n    print(i)"),
            vec!["1", "2", "3", "4", "5"]
        );
        assert_eq!(run("for i in range(3):\n    print(i)"), vec!["0", "1", "2"]);
    }

    #[test]
    fn test_range_with_variable_and_reversed_bounds() {
        assert_eq!(run("n = 2\nfor i in range(n):\n    print(i)"), vec!["0", "1"]);
        assert!(run("for i in range(5, 1):\n    print(i)").is_empty());
    }

    #[test]
    fn test_loop_over_list_variable_and_literal() {
        let source = "fruits = ['apple', 'kiwi']\nfor fruit in fruits:\n    print(fruit)\nfor n in [1, 2]:\n    print(f'n={n}')";
        assert_eq!(run(source), vec!["apple", "kiwi", "n=1", "n=2"]);
    }

    #[test]
    fn test_loop_over_string() {
        assert_eq!(run("for c in 'ab':\n    print(c)"), vec!["a", "b"]);
    }

    #[test]
    fn test_loop_over_number_is_error() {
        let err = execute("n = 3\nfor i in n:\n    print(i)").unwrap_err();
        assert!(err.to_string().contains("not iterable"));
        assert_eq!(err.line, Some(2));
    }

    #[test]
    fn test_loop_over_unknown_name_is_error() {
        assert!(execute("for i in nowhere:\n    print(i)").is_err());
    }

    #[test]
    fn test_oversized_range_is_error() {
        assert!(execute("for i in range(1000000):\n    print(i)").is_err());
    }

    #[test]
    fn test_nested_prints_in_loop_are_flattened() {
        let source = "for i in range(2):\n    if i == 5:\n        print('inner')\n    print(i)";
        assert_eq!(run(source), vec!["inner", "0", "inner", "1"]);
    }

    #[test]
    fn test_loop_variable_survives_loop() {
        assert_eq!(run("for i in range(3):\n    print(i)\nprint(i)"), vec!["0", "1", "2", "2"]);
    }

    // ------------------------------------------------------------------------
    // Whole-run properties
    // ------------------------------------------------------------------------

    #[test]
    fn test_execution_is_deterministic() {
        let source = "total = 0\nitems = [3, 4]\nfor x in items:\n    print(x)\ntotal = 3 + 4\nprint(total)";
        assert_eq!(execute(source).unwrap(), execute(source).unwrap());
    }

    #[test]
    fn test_execute_lines_matches_execute() {
        let lines = ["x = 2", "print(x)"];
        assert_eq!(execute_lines(&lines).unwrap(), vec!["2"]);
    }

    #[test]
    fn test_output_before_error_is_kept_on_interpreter() {
        let program = Program::parse("print('first')\nprint(missing[0])");
        let mut interpreter = Interpreter::new();
        assert!(interpreter.run(&program).is_err());
        assert_eq!(interpreter.output(), ["first".to_string()]);
    }

    #[test]
    fn test_empty_program_prints_nothing() {
        assert!(run("").is_empty());
        assert!(run("# just a comment").is_empty());
    }

    #[test]
    fn test_variables_are_visible_after_run() {
        let mut interpreter = Interpreter::new();
        interpreter.run(&Program::parse("a = 1\nb = 'x'")).unwrap();
        let names: Vec<&str> = interpreter.variables().iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["a", "b"]);
    }
}
