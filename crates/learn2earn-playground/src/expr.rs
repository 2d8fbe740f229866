//! Expression parsing and evaluation.
//!
//! Expressions are parsed by recursive descent into a small tree and then
//! evaluated against the variable table. Operator precedence follows Python:
//!
//! ```text
//! or < and < not < comparisons, in < + - < * / // % < unary - < ** < x[i], f(x)
//! ```

use indexmap::IndexMap;

use crate::error::EvalError;
use crate::interpreter::VariableTable;
use crate::lexer::{Lexer, Token};
use crate::value::{is_integral, Value};

/// Longest string or list an operator may build.
const MAX_SEQUENCE_LEN: usize = 1_000_000;

/// A parsed expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// A literal value.
    Literal(Value),
    /// A variable reference.
    Name(String),
    /// `[a, b, ...]`
    List(Vec<Expr>),
    /// `{k: v, ...}`
    Dict(Vec<(Expr, Expr)>),
    /// `-x` or `+x`
    Unary(UnaryOp, Box<Expr>),
    /// `not x`
    Not(Box<Expr>),
    /// Arithmetic.
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
    /// Chained comparison, `a < b <= c`.
    Compare(Box<Expr>, Vec<(CompareOp, Expr)>),
    /// `a and b`
    And(Box<Expr>, Box<Expr>),
    /// `a or b`
    Or(Box<Expr>, Box<Expr>),
    /// `target[index]`
    Index(Box<Expr>, Box<Expr>),
    /// Call of a builtin function.
    Call(String, Vec<Expr>),
}

/// Prefix operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    /// `-x`
    Neg,
    /// `+x`
    Pos,
}

/// Arithmetic operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    /// `+`
    Add,
    /// `-`
    Sub,
    /// `*`
    Mul,
    /// `/`
    Div,
    /// `//`
    FloorDiv,
    /// `%`
    Mod,
    /// `**`
    Pow,
}

impl BinaryOp {
    const fn symbol(self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::FloorDiv => "//",
            Self::Mod => "%",
            Self::Pow => "**",
        }
    }
}

/// Comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    /// `==`
    Eq,
    /// `!=`
    NotEq,
    /// `<`
    Lt,
    /// `<=`
    LtEq,
    /// `>`
    Gt,
    /// `>=`
    GtEq,
    /// `in`
    In,
    /// `not in`
    NotIn,
}

/// Parses expression text.
pub fn parse(text: &str) -> Result<Expr, EvalError> {
    let tokens = Lexer::new(text).tokenize()?;
    let mut parser = Parser {
        tokens,
        pos: 0,
        depth: 0,
    };
    let expr = parser.expression()?;
    if let Some(token) = parser.peek() {
        return Err(EvalError::Syntax(format!("unexpected token {token:?}")));
    }
    Ok(expr)
}

/// Parses and evaluates `text` in one step.
pub fn evaluate(text: &str, vars: &VariableTable) -> Result<Value, EvalError> {
    parse(text)?.eval(vars)
}

/// Deepest nesting of parentheses, brackets and unary operators accepted.
pub const MAX_NESTING_DEPTH: usize = 100;

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn peek_at(&self, offset: usize) -> Option<&Token> {
        self.tokens.get(self.pos + offset)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn eat(&mut self, expected: &Token) -> bool {
        if self.peek() == Some(expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn eat_keyword(&mut self, keyword: &str) -> bool {
        if matches!(self.peek(), Some(Token::Ident(word)) if word == keyword) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, expected: &Token) -> Result<(), EvalError> {
        if self.eat(expected) {
            Ok(())
        } else {
            Err(EvalError::Syntax(format!(
                "expected {expected:?}, found {:?}",
                self.peek()
            )))
        }
    }

    /// Runs `rule` one nesting level deeper.
    fn nested(
        &mut self,
        rule: impl FnOnce(&mut Self) -> Result<Expr, EvalError>,
    ) -> Result<Expr, EvalError> {
        if self.depth >= MAX_NESTING_DEPTH {
            return Err(EvalError::Syntax(format!(
                "expression nested deeper than {MAX_NESTING_DEPTH} levels"
            )));
        }
        self.depth += 1;
        let result = rule(self);
        self.depth -= 1;
        result
    }

    fn expression(&mut self) -> Result<Expr, EvalError> {
        self.nested(Self::or_expr)
    }

    fn or_expr(&mut self) -> Result<Expr, EvalError> {
        let mut left = self.and_expr()?;
        while self.eat_keyword("or") {
            let right = self.and_expr()?;
            left = Expr::Or(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn and_expr(&mut self) -> Result<Expr, EvalError> {
        let mut left = self.not_expr()?;
        while self.eat_keyword("and") {
            let right = self.not_expr()?;
            left = Expr::And(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn not_expr(&mut self) -> Result<Expr, EvalError> {
        if self.eat_keyword("not") {
            let operand = self.nested(Self::not_expr)?;
            return Ok(Expr::Not(Box::new(operand)));
        }
        self.comparison()
    }

    fn comparison(&mut self) -> Result<Expr, EvalError> {
        let first = self.sum()?;
        let mut rest = Vec::new();
        while let Some(op) = self.compare_op() {
            rest.push((op, self.sum()?));
        }
        if rest.is_empty() {
            Ok(first)
        } else {
            Ok(Expr::Compare(Box::new(first), rest))
        }
    }

    fn compare_op(&mut self) -> Option<CompareOp> {
        let (op, width) = match self.peek()? {
            Token::EqEq => (CompareOp::Eq, 1),
            Token::NotEq => (CompareOp::NotEq, 1),
            Token::Lt => (CompareOp::Lt, 1),
            Token::LtEq => (CompareOp::LtEq, 1),
            Token::Gt => (CompareOp::Gt, 1),
            Token::GtEq => (CompareOp::GtEq, 1),
            Token::Ident(word) if word == "in" => (CompareOp::In, 1),
            Token::Ident(word)
                if word == "not"
                    && matches!(self.peek_at(1), Some(Token::Ident(next)) if next == "in") =>
            {
                (CompareOp::NotIn, 2)
            }
            _ => return None,
        };
        self.pos += width;
        Some(op)
    }

    fn sum(&mut self) -> Result<Expr, EvalError> {
        let mut left = self.term()?;
        loop {
            let op = match self.peek() {
                Some(Token::Plus) => BinaryOp::Add,
                Some(Token::Minus) => BinaryOp::Sub,
                _ => return Ok(left),
            };
            self.pos += 1;
            let right = self.term()?;
            left = Expr::Binary(op, Box::new(left), Box::new(right));
        }
    }

    fn term(&mut self) -> Result<Expr, EvalError> {
        let mut left = self.factor()?;
        loop {
            let op = match self.peek() {
                Some(Token::Star) => BinaryOp::Mul,
                Some(Token::Slash) => BinaryOp::Div,
                Some(Token::DoubleSlash) => BinaryOp::FloorDiv,
                Some(Token::Percent) => BinaryOp::Mod,
                _ => return Ok(left),
            };
            self.pos += 1;
            let right = self.factor()?;
            left = Expr::Binary(op, Box::new(left), Box::new(right));
        }
    }

    fn factor(&mut self) -> Result<Expr, EvalError> {
        if self.eat(&Token::Minus) {
            let operand = self.nested(Self::factor)?;
            return Ok(Expr::Unary(UnaryOp::Neg, Box::new(operand)));
        }
        if self.eat(&Token::Plus) {
            let operand = self.nested(Self::factor)?;
            return Ok(Expr::Unary(UnaryOp::Pos, Box::new(operand)));
        }
        self.power()
    }

    fn power(&mut self) -> Result<Expr, EvalError> {
        let base = self.postfix()?;
        if self.eat(&Token::DoubleStar) {
            // Right-associative and binds tighter than a unary minus on its left.
            let exponent = self.nested(Self::factor)?;
            return Ok(Expr::Binary(BinaryOp::Pow, Box::new(base), Box::new(exponent)));
        }
        Ok(base)
    }

    fn postfix(&mut self) -> Result<Expr, EvalError> {
        let mut expr = self.atom()?;
        loop {
            if self.eat(&Token::LBracket) {
                let index = self.expression()?;
                self.expect(&Token::RBracket)?;
                expr = Expr::Index(Box::new(expr), Box::new(index));
            } else if self.peek() == Some(&Token::LParen) {
                let Expr::Name(name) = expr else {
                    return Err(EvalError::Syntax("only named functions can be called".to_string()));
                };
                self.pos += 1;
                let args = self.sequence(&Token::RParen)?;
                expr = Expr::Call(name, args);
            } else {
                return Ok(expr);
            }
        }
    }

    fn sequence(&mut self, close: &Token) -> Result<Vec<Expr>, EvalError> {
        let mut items = Vec::new();
        while !self.eat(close) {
            items.push(self.expression()?);
            if !self.eat(&Token::Comma) {
                self.expect(close)?;
                break;
            }
        }
        Ok(items)
    }

    fn atom(&mut self) -> Result<Expr, EvalError> {
        match self.advance() {
            Some(Token::Number(n)) => Ok(Expr::Literal(Value::Num(n))),
            Some(Token::Str(s)) => Ok(Expr::Literal(Value::Str(s))),
            Some(Token::Ident(word)) => Ok(if word == "True" {
                Expr::Literal(Value::Bool(true))
            } else if word == "False" {
                Expr::Literal(Value::Bool(false))
            } else {
                Expr::Name(word)
            }),
            Some(Token::LParen) => {
                let inner = self.expression()?;
                self.expect(&Token::RParen)?;
                Ok(inner)
            }
            Some(Token::LBracket) => Ok(Expr::List(self.sequence(&Token::RBracket)?)),
            Some(Token::LBrace) => {
                let mut entries = Vec::new();
                while !self.eat(&Token::RBrace) {
                    let key = self.expression()?;
                    self.expect(&Token::Colon)?;
                    let value = self.expression()?;
                    entries.push((key, value));
                    if !self.eat(&Token::Comma) {
                        self.expect(&Token::RBrace)?;
                        break;
                    }
                }
                Ok(Expr::Dict(entries))
            }
            Some(token) => Err(EvalError::Syntax(format!("unexpected token {token:?}"))),
            None => Err(EvalError::Syntax("unexpected end of expression".to_string())),
        }
    }
}

impl Expr {
    /// Evaluates the expression against the variable table.
    pub fn eval(&self, vars: &VariableTable) -> Result<Value, EvalError> {
        match self {
            Self::Literal(value) => Ok(value.clone()),
            Self::Name(name) => vars
                .get(name)
                .cloned()
                .ok_or_else(|| EvalError::Name(name.clone())),
            Self::List(items) => items
                .iter()
                .map(|item| item.eval(vars))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::List),
            Self::Dict(entries) => {
                let mut map = IndexMap::new();
                for (key, value) in entries {
                    map.insert(map_key(&key.eval(vars)?)?, value.eval(vars)?);
                }
                Ok(Value::Map(map))
            }
            Self::Unary(op, operand) => {
                let value = operand.eval(vars)?;
                let n = value.as_number().ok_or_else(|| {
                    EvalError::Type(format!(
                        "bad operand type for unary {}: '{}'",
                        if *op == UnaryOp::Neg { "-" } else { "+" },
                        value.type_name()
                    ))
                })?;
                Ok(Value::Num(if *op == UnaryOp::Neg { -n } else { n }))
            }
            Self::Not(operand) => Ok(Value::Bool(!operand.eval(vars)?.truthy())),
            Self::Binary(op, left, right) => binary(*op, &left.eval(vars)?, &right.eval(vars)?),
            Self::Compare(first, rest) => {
                let mut left = first.eval(vars)?;
                for (op, right) in rest {
                    let right = right.eval(vars)?;
                    if !compare(*op, &left, &right)? {
                        return Ok(Value::Bool(false));
                    }
                    left = right;
                }
                Ok(Value::Bool(true))
            }
            Self::And(left, right) => {
                let left = left.eval(vars)?;
                if left.truthy() {
                    right.eval(vars)
                } else {
                    Ok(left)
                }
            }
            Self::Or(left, right) => {
                let left = left.eval(vars)?;
                if left.truthy() {
                    Ok(left)
                } else {
                    right.eval(vars)
                }
            }
            Self::Index(target, index) => index_value(&target.eval(vars)?, &index.eval(vars)?),
            Self::Call(name, args) => {
                let args = args
                    .iter()
                    .map(|arg| arg.eval(vars))
                    .collect::<Result<Vec<_>, _>>()?;
                call_builtin(name, &args)
            }
        }
    }
}

fn type_error(op: BinaryOp, left: &Value, right: &Value) -> EvalError {
    EvalError::Type(format!(
        "unsupported operand type(s) for {}: '{}' and '{}'",
        op.symbol(),
        left.type_name(),
        right.type_name()
    ))
}

fn binary(op: BinaryOp, left: &Value, right: &Value) -> Result<Value, EvalError> {
    match (op, left, right) {
        (BinaryOp::Add, Value::Str(a), Value::Str(b)) => {
            check_len(a.len() + b.len())?;
            Ok(Value::Str(format!("{a}{b}")))
        }
        (BinaryOp::Add, Value::List(a), Value::List(b)) => {
            check_len(a.len() + b.len())?;
            Ok(Value::List(a.iter().chain(b).cloned().collect()))
        }
        (BinaryOp::Mul, Value::Str(s), Value::Num(n)) | (BinaryOp::Mul, Value::Num(n), Value::Str(s)) => {
            let count = repeat_count(*n)?;
            check_len(s.len().saturating_mul(count))?;
            Ok(Value::Str(s.repeat(count)))
        }
        (BinaryOp::Mul, Value::List(items), Value::Num(n))
        | (BinaryOp::Mul, Value::Num(n), Value::List(items)) => {
            let count = repeat_count(*n)?;
            check_len(items.len().saturating_mul(count))?;
            Ok(Value::List(
                std::iter::repeat(items.iter().cloned())
                    .take(count)
                    .flatten()
                    .collect(),
            ))
        }
        _ => {
            let (Some(a), Some(b)) = (left.as_number(), right.as_number()) else {
                return Err(type_error(op, left, right));
            };
            arithmetic(op, a, b).map(Value::Num)
        }
    }
}

fn arithmetic(op: BinaryOp, a: f64, b: f64) -> Result<f64, EvalError> {
    match op {
        BinaryOp::Add => Ok(a + b),
        BinaryOp::Sub => Ok(a - b),
        BinaryOp::Mul => Ok(a * b),
        BinaryOp::Div if b == 0.0 => Err(EvalError::ZeroDivision),
        BinaryOp::Div => Ok(a / b),
        BinaryOp::FloorDiv if b == 0.0 => Err(EvalError::ZeroDivision),
        BinaryOp::FloorDiv => Ok((a / b).floor()),
        BinaryOp::Mod if b == 0.0 => Err(EvalError::ZeroDivision),
        BinaryOp::Mod => Ok(a - b * (a / b).floor()),
        BinaryOp::Pow if a == 0.0 && b < 0.0 => Err(EvalError::ZeroDivision),
        BinaryOp::Pow => Ok(a.powf(b)),
    }
}

fn check_len(len: usize) -> Result<(), EvalError> {
    if len > MAX_SEQUENCE_LEN {
        return Err(EvalError::Type(format!(
            "result longer than {MAX_SEQUENCE_LEN} items"
        )));
    }
    Ok(())
}

fn repeat_count(n: f64) -> Result<usize, EvalError> {
    if !is_integral(n) {
        return Err(EvalError::Type(
            "can't multiply sequence by non-int of type 'float'".to_string(),
        ));
    }
    if n <= 0.0 {
        return Ok(0);
    }
    // Integral and positive; anything past MAX_SEQUENCE_LEN is rejected by the caller.
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    Ok(n.min(MAX_SEQUENCE_LEN as f64 + 1.0) as usize)
}

fn values_equal(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Num(_) | Value::Bool(_), Value::Num(_) | Value::Bool(_)) => {
            left.as_number() == right.as_number()
        }
        _ => left == right,
    }
}

fn compare(op: CompareOp, left: &Value, right: &Value) -> Result<bool, EvalError> {
    match op {
        CompareOp::Eq => Ok(values_equal(left, right)),
        CompareOp::NotEq => Ok(!values_equal(left, right)),
        CompareOp::In => contains(right, left),
        CompareOp::NotIn => contains(right, left).map(|found| !found),
        CompareOp::Lt | CompareOp::LtEq | CompareOp::Gt | CompareOp::GtEq => {
            let ordering = match (left, right) {
                (Value::Str(a), Value::Str(b)) => a.partial_cmp(b),
                _ => match (left.as_number(), right.as_number()) {
                    (Some(a), Some(b)) => a.partial_cmp(&b),
                    _ => {
                        return Err(EvalError::Type(format!(
                            "'<' not supported between instances of '{}' and '{}'",
                            left.type_name(),
                            right.type_name()
                        )));
                    }
                },
            };
            let Some(ordering) = ordering else {
                return Ok(false);
            };
            Ok(match op {
                CompareOp::Lt => ordering.is_lt(),
                CompareOp::LtEq => ordering.is_le(),
                CompareOp::Gt => ordering.is_gt(),
                _ => ordering.is_ge(),
            })
        }
    }
}

fn contains(container: &Value, item: &Value) -> Result<bool, EvalError> {
    match (container, item) {
        (Value::Str(haystack), Value::Str(needle)) => Ok(haystack.contains(needle.as_str())),
        (Value::List(items), _) => Ok(items.iter().any(|candidate| values_equal(candidate, item))),
        (Value::Map(map), key) => Ok(map.contains_key(&map_key(key)?)),
        _ => Err(EvalError::Type(format!(
            "argument of type '{}' is not iterable",
            container.type_name()
        ))),
    }
}

/// Converts a value into a mapping key. Numbers are keyed by their printed form.
pub(crate) fn map_key(key: &Value) -> Result<String, EvalError> {
    match key {
        Value::Str(s) => Ok(s.clone()),
        Value::Num(_) | Value::Bool(_) => Ok(key.to_string()),
        other => Err(EvalError::Type(format!(
            "unhashable type: '{}'",
            other.type_name()
        ))),
    }
}

/// Resolves a possibly negative index against a sequence length.
fn sequence_index(index: &Value, len: usize, kind: &'static str) -> Result<usize, EvalError> {
    let Value::Num(n) = index else {
        return Err(EvalError::Type(format!(
            "{kind} indices must be integers, not {}",
            index.type_name()
        )));
    };
    if !is_integral(*n) {
        return Err(EvalError::Type(format!(
            "{kind} indices must be integers, not float"
        )));
    }
    #[allow(clippy::cast_precision_loss)]
    let len_f = len as f64;
    let resolved = if *n < 0.0 { *n + len_f } else { *n };
    if resolved < 0.0 || resolved >= len_f {
        return Err(EvalError::Index(kind));
    }
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    Ok(resolved as usize)
}

/// Looks up `target[index]`.
pub(crate) fn index_value(target: &Value, index: &Value) -> Result<Value, EvalError> {
    match target {
        Value::List(items) => {
            let i = sequence_index(index, items.len(), "list")?;
            Ok(items[i].clone())
        }
        Value::Str(s) => {
            let len = s.chars().count();
            let i = sequence_index(index, len, "string")?;
            Ok(Value::Str(s.chars().nth(i).map(String::from).unwrap_or_default()))
        }
        Value::Map(map) => {
            let key = map_key(index)?;
            map.get(&key).cloned().ok_or(EvalError::Key(key))
        }
        other => Err(EvalError::Type(format!(
            "'{}' object is not subscriptable",
            other.type_name()
        ))),
    }
}

fn call_builtin(name: &str, args: &[Value]) -> Result<Value, EvalError> {
    let [arg] = args else {
        return Err(EvalError::Type(format!(
            "{name}() takes exactly one argument ({} given)",
            args.len()
        )));
    };
    match name {
        "len" => {
            let len = match arg {
                Value::Str(s) => s.chars().count(),
                Value::List(items) => items.len(),
                Value::Map(map) => map.len(),
                other => {
                    return Err(EvalError::Type(format!(
                        "object of type '{}' has no len()",
                        other.type_name()
                    )));
                }
            };
            #[allow(clippy::cast_precision_loss)]
            Ok(Value::Num(len as f64))
        }
        "str" => Ok(Value::Str(arg.to_string())),
        "int" => to_number(arg, "int").map(|n| Value::Num(n.trunc())),
        "float" => to_number(arg, "float").map(Value::Num),
        "abs" => arg
            .as_number()
            .map(|n| Value::Num(n.abs()))
            .ok_or_else(|| {
                EvalError::Type(format!("bad operand type for abs(): '{}'", arg.type_name()))
            }),
        _ => Err(EvalError::Name(name.to_string())),
    }
}

fn to_number(value: &Value, target: &str) -> Result<f64, EvalError> {
    match value {
        Value::Str(s) => s.trim().parse::<f64>().map_err(|_| {
            EvalError::Type(format!("invalid literal for {target}(): '{s}'"))
        }),
        other => other.as_number().ok_or_else(|| {
            EvalError::Type(format!(
                "{target}() argument must be a string or a number, not '{}'",
                other.type_name()
            ))
        }),
    }
}
