pub mod ast;
#[cfg(feature = "cli")]
pub mod cli;
pub mod convert;
pub mod evaluator;
pub mod expected;
pub mod fixture;
pub mod language;
pub mod lexer;
pub mod methods;
pub mod output;
pub mod parser;
pub mod resolve;
pub mod runner;
pub mod validate;
pub mod value;

pub use ast::{BinOp, Expr, Token, UnaryOp};
pub use evaluator::{ErrorKind, EvalContext, Evaluator, ReqlError};
pub use expected::{Expected, Mismatch, Pattern};
pub use fixture::{Case, Fixture, FixtureError};
pub use language::Language;
pub use lexer::{LexError, Lexer, Position};
pub use output::{to_json, to_json_pretty};
pub use parser::{ParseError, Parser, parse_expression};
pub use resolve::{ResolvedCase, Step, resolve};
pub use runner::{Report, RunConfig, Runner};
pub use validate::{Issue, validate};
pub use value::Value;
