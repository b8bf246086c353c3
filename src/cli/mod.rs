//! CLI support for rql-fixtures
//!
//! Each subcommand is a plain function over an options struct so the
//! binary stays a thin clap wrapper and the commands can be driven from
//! tests.

mod cases;
mod eval;
pub mod logging;
mod run;

pub use cases::{CasesOptions, list_cases};
pub use eval::{EvalOptions, EvalResult, execute_eval};
pub use run::{RunOptions, execute_run, execute_validate};

use std::io;

use crate::{
    evaluator::ReqlError,
    fixture::FixtureError,
    language::UnknownLanguage,
    parser::ParseError,
    runner::ConfigError,
};

/// Errors that can occur during CLI operations
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("{0}")]
    Eval(#[from] ReqlError),

    #[error("{0}")]
    Fixture(#[from] FixtureError),

    #[error("{0}")]
    Config(#[from] ConfigError),

    #[error("{0}")]
    Language(#[from] UnknownLanguage),

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Invalid binding '{0}': expected NAME=JSON")]
    Binding(String),

    #[error("No expression provided. Pass one as an argument or pipe it to stdin.")]
    NoInput,

    /// Fixtures ran but some cases failed or did not validate
    #[error("{0} problem(s) found")]
    Failed(usize),
}
