//! `run` and `validate`

use std::path::PathBuf;

use tracing::info;

use super::CliError;
use crate::{
    fixture::Fixture,
    runner::{Report, RunConfig, Runner},
    validate::{Issue, validate},
};

/// Options for the run command
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub files: Vec<PathBuf>,
    pub config: RunConfig,
}

/// Runs every file and returns one report per fixture.
///
/// A fixture that cannot be loaded aborts the whole run; failing cases do
/// not, the caller decides what to do with unsuccessful reports.
pub fn execute_run(options: &RunOptions) -> Result<Vec<Report>, CliError> {
    let runner = Runner::new(options.config.clone());
    let mut reports = Vec::with_capacity(options.files.len());
    for path in &options.files {
        let fixture = Fixture::load(path)?;
        info!(path = %path.display(), desc = %fixture.desc, "running fixture");
        let report = runner.run(&fixture);
        let stop = runner.config().fail_fast && !report.is_success();
        reports.push(report);
        if stop {
            break;
        }
    }
    Ok(reports)
}

/// Validates every file, pairing each fixture name with its issues.
pub fn execute_validate(files: &[PathBuf]) -> Result<Vec<(String, Vec<Issue>)>, CliError> {
    files
        .iter()
        .map(|path| {
            let fixture = Fixture::load(path)?;
            Ok((fixture.name(), validate(&fixture)))
        })
        .collect()
}
