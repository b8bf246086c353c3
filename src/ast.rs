//! # Driver expression syntax tree
//!
//! Fixture cases are written as ReQL driver expressions in three dialects:
//! Python, JavaScript and Ruby. They share most of their surface:
//!
//! ```text
//! arr.append(4)
//! r.expr([1, 2, 3]).slice(1, 2)
//! objArr.pluck('a')
//! ```
//!
//! and differ in the places where each driver leans on its host language:
//!
//! | Construct | Python | JavaScript | Ruby |
//! |---|---|---|---|
//! | function | `lambda x: x * 2` | `function(x) { return x.mul(2); }` | `{\|x\| x * 2}` |
//! | range | `arr[1:2]` | `arr.slice(1, 2)` | `arr[1..2]`, `arr[1...2]` |
//! | field | `x['a']` | `x('a')` | `x['a']` |
//! | operators | `+ - * / % == & \| ~` | method form only | same as Python |
//!
//! The parser folds the dialect sugar into one [`Expr`] tree so the
//! evaluator never sees the dialect again, except for the arity rules of
//! [`crate::methods`].
//!
//! - **[tokens]** - Lexical tokens produced by the lexer
//! - **[expressions]** - Expression nodes
//! - **[operators]** - Infix and prefix operators
pub mod expressions;
pub mod operators;
pub mod tokens;

pub use expressions::Expr;
pub use operators::{BinOp, UnaryOp};
pub use tokens::Token;
