//! Learn2Earn playground.
//!
//! A small interpreter for the Python-like teaching language used in lesson
//! exercises, and the verifier that decides whether a run produced the
//! expected output.
//!
//! # Example
//!
//! ```
//! use learn2earn_playground::{check, execute};
//!
//! let output = execute("for i in range(1, 4):\n    print(i)").unwrap();
//! assert!(check(&output, "1\n2\n3").is_pass());
//! ```

pub mod block;
pub mod error;
pub mod expr;
pub mod interpreter;
pub mod lexer;
pub mod statement;
pub mod value;
pub mod verifier;

pub use block::{Line, Program};
pub use error::{EvalError, ExecutionError, Result};
pub use interpreter::{execute, execute_lines, Interpreter, VariableTable};
pub use statement::Statement;
pub use value::Value;
pub use verifier::{check, verify, Verdict};
