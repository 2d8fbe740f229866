//! Tokenizer for expression text.
//!
//! Statements are recognised line by line in [`crate::statement`]; this lexer
//! only ever sees the expression parts (right-hand sides, conditions,
//! f-string placeholders and index expressions).

use std::iter::Peekable;
use std::str::CharIndices;

use crate::error::EvalError;

/// A single lexical token.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// Numeric literal.
    Number(f64),
    /// Quoted string literal with escapes resolved.
    Str(String),
    /// Identifier or keyword (`and`, `or`, `not`, `in`, `True`, `False`).
    Ident(String),
    /// `+`
    Plus,
    /// `-`
    Minus,
    /// `*`
    Star,
    /// `**`
    DoubleStar,
    /// `/`
    Slash,
    /// `//`
    DoubleSlash,
    /// `%`
    Percent,
    /// `==`
    EqEq,
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
    /// `(`
    LParen,
    /// `)`
    RParen,
    /// `[`
    LBracket,
    /// `]`
    RBracket,
    /// `{`
    LBrace,
    /// `}`
    RBrace,
    /// `,`
    Comma,
    /// `:`
    Colon,
}

/// Converts expression text into tokens.
pub struct Lexer<'a> {
    input: &'a str,
    chars: Peekable<CharIndices<'a>>,
}

impl<'a> Lexer<'a> {
    /// Creates a lexer over `input`.
    pub fn new(input: &'a str) -> Self {
        Self {
            input,
            chars: input.char_indices().peekable(),
        }
    }

    /// Tokenizes the whole input.
    pub fn tokenize(mut self) -> Result<Vec<Token>, EvalError> {
        let mut tokens = Vec::new();
        while let Some(token) = self.next_token()? {
            tokens.push(token);
        }
        Ok(tokens)
    }

    fn next_token(&mut self) -> Result<Option<Token>, EvalError> {
        while self.chars.next_if(|(_, c)| c.is_whitespace()).is_some() {}

        let Some((start, c)) = self.chars.next() else {
            return Ok(None);
        };

        let token = match c {
            '0'..='9' | '.' => self.number(start)?,
            '"' | '\'' => Token::Str(self.string(c)?),
            c if c.is_alphabetic() || c == '_' => self.ident(start),
            '+' => Token::Plus,
            '-' => Token::Minus,
            '*' => self.pair('*', Token::DoubleStar, Token::Star),
            '/' => self.pair('/', Token::DoubleSlash, Token::Slash),
            '%' => Token::Percent,
            '=' => {
                if self.chars.next_if(|(_, c)| *c == '=').is_some() {
                    Token::EqEq
                } else {
                    return Err(EvalError::Syntax(
                        "assignment is not an expression".to_string(),
                    ));
                }
            }
            '!' => {
                if self.chars.next_if(|(_, c)| *c == '=').is_some() {
                    Token::NotEq
                } else {
                    return Err(EvalError::Syntax("unexpected '!'".to_string()));
                }
            }
            '<' => self.pair('=', Token::LtEq, Token::Lt),
            '>' => self.pair('=', Token::GtEq, Token::Gt),
            '(' => Token::LParen,
            ')' => Token::RParen,
            '[' => Token::LBracket,
            ']' => Token::RBracket,
            '{' => Token::LBrace,
            '}' => Token::RBrace,
            ',' => Token::Comma,
            ':' => Token::Colon,
            other => {
                return Err(EvalError::Syntax(format!("unexpected character '{other}'")));
            }
        };
        Ok(Some(token))
    }

    fn pair(&mut self, second: char, double: Token, single: Token) -> Token {
        if self.chars.next_if(|(_, c)| *c == second).is_some() {
            double
        } else {
            single
        }
    }

    fn number(&mut self, start: usize) -> Result<Token, EvalError> {
        let mut end = start + 1;
        let mut seen_exponent = false;
        while let Some(&(i, c)) = self.chars.peek() {
            let accept = c.is_ascii_digit()
                || c == '.'
                || c == '_'
                || (!seen_exponent && (c == 'e' || c == 'E'));
            if !accept {
                break;
            }
            if c == 'e' || c == 'E' {
                seen_exponent = true;
                self.chars.next();
                end = i + 1;
                if let Some((j, _)) = self.chars.next_if(|(_, c)| *c == '+' || *c == '-') {
                    end = j + 1;
                }
                continue;
            }
            self.chars.next();
            end = i + c.len_utf8();
        }

        let text: String = self.input[start..end].chars().filter(|c| *c != '_').collect();
        text.parse::<f64>()
            .map(Token::Number)
            .map_err(|_| EvalError::Syntax(format!("invalid number '{text}'")))
    }

    fn string(&mut self, quote: char) -> Result<String, EvalError> {
        let mut out = String::new();
        while let Some((_, c)) = self.chars.next() {
            match c {
                c if c == quote => return Ok(out),
                '\\' => match self.chars.next() {
                    Some((_, 'n')) => out.push('\n'),
                    Some((_, 't')) => out.push('\t'),
                    Some((_, other)) => out.push(other),
                    None => break,
                },
                c => out.push(c),
            }
        }
        Err(EvalError::Syntax("unterminated string literal".to_string()))
    }

    fn ident(&mut self, start: usize) -> Token {
        let mut end = self.input.len();
        while let Some(&(i, c)) = self.chars.peek() {
            if c.is_alphanumeric() || c == '_' {
                self.chars.next();
            } else {
                end = i;
                break;
            }
        }
        Token::Ident(self.input[start..end].to_string())
    }
}

/// Returns `true` if `text` is a valid identifier.
pub fn is_identifier(text: &str) -> bool {
    let mut chars = text.chars();
    chars
        .next()
        .is_some_and(|c| c.is_alphabetic() || c == '_')
        && chars.all(|c| c.is_alphanumeric() || c == '_')
}

/// Removes a trailing `#` comment that sits outside string literals.
///
/// ```
/// use learn2earn_playground::lexer::strip_comment;
///
/// assert_eq!(strip_comment("if x > 10:  # check"), "if x > 10:");
/// assert_eq!(strip_comment("print(\"#1\")"), "print(\"#1\")");
/// ```
pub fn strip_comment(line: &str) -> &str {
    let mut quote: Option<char> = None;
    let mut escaped = false;
    for (i, c) in line.char_indices() {
        match quote {
            Some(_) if escaped => escaped = false,
            Some(_) if c == '\\' => escaped = true,
            Some(q) if c == q => quote = None,
            Some(_) => {}
            None if c == '"' || c == '\'' => quote = Some(c),
            None if c == '#' => return line[..i].trim_end(),
            None => {}
        }
    }
    line
}
