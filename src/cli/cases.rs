//! `cases`: print what a fixture asks of one language

use std::path::PathBuf;

use super::CliError;
use crate::{
    fixture::Fixture,
    language::Language,
    resolve::{Step, resolve},
};

#[derive(Debug, Clone)]
pub struct CasesOptions {
    pub file: PathBuf,
    pub language: Language,
}

/// One line per resolved case, e.g. `3  check  arr.append(4)  =>  [1,2,3,4]`.
pub fn list_cases(options: &CasesOptions) -> Result<Vec<String>, CliError> {
    let fixture = Fixture::load(&options.file)?;
    let cases = resolve(&fixture, options.language)?;
    Ok(cases
        .into_iter()
        .map(|case| match case.step {
            Step::Define { name, source } => format!("{:<4} def    {} = {}", case.index, name, source),
            Step::Check { sources, expected } => format!(
                "{:<4} check  {}  =>  {}",
                case.index,
                sources.join(" | "),
                expected
            ),
            Step::Skip => format!("{:<4} skip", case.index),
        })
        .collect())
}
