//! Running fixtures against the reference evaluator.

use std::{env, fmt, fs, path::Path};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::{
    evaluator::Evaluator,
    expected::Expected,
    fixture::Fixture,
    language::{self, Language, UnknownLanguage},
    parser::parse_expression,
    resolve::{Step, resolve},
};

/// Environment variable holding the default language list (`py,js,rb`).
pub const LANGS_ENV: &str = "RQL_FIXTURES_LANGS";

/// Which cases to run and how.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunConfig {
    pub languages: Vec<Language>,
    /// Stop at the first failure
    pub fail_fast: bool,
    /// Only run checks whose source contains this text
    pub filter: Option<String>,
}

impl Default for RunConfig {
    fn default() -> Self {
        RunConfig {
            languages: Language::ALL.to_vec(),
            fail_fast: false,
            filter: None,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config {path}: {source}")]
    Yaml {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("RQL_FIXTURES_LANGS: {0}")]
    Language(#[from] UnknownLanguage),
}

impl RunConfig {
    /// Defaults, with the language list taken from `RQL_FIXTURES_LANGS`
    /// when it is set and not empty.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = RunConfig::default();
        if let Ok(value) = env::var(LANGS_ENV)
            && !value.trim().is_empty()
        {
            config.languages = language::parse_list(&value)?;
        }
        Ok(config)
    }

    pub fn from_yaml_str(text: &str, path: &str) -> Result<Self, ConfigError> {
        serde_yaml::from_str(text).map_err(|source| ConfigError::Yaml {
            path: path.to_string(),
            source,
        })
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let shown = path.display().to_string();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: shown.clone(),
            source,
        })?;
        Self::from_yaml_str(&text, &shown)
    }

    fn selects(&self, sources: &[String]) -> bool {
        match &self.filter {
            Some(needle) => sources.iter().any(|s| s.contains(needle.as_str())),
            None => true,
        }
    }
}

/// A case that did not behave as expected.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Failure {
    pub language: Language,
    /// `None` when the fixture as a whole failed to resolve
    pub index: Option<usize>,
    pub source: Option<String>,
    pub reason: String,
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.index {
            Some(index) => write!(f, "[{}] case {}", self.language, index)?,
            None => write!(f, "[{}]", self.language)?,
        }
        if let Some(source) = &self.source {
            write!(f, " `{}`", source)?;
        }
        write!(f, ": {}", self.reason)
    }
}

/// Outcome of running one fixture.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Report {
    pub fixture: String,
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
    pub failures: Vec<Failure>,
}

impl Report {
    pub fn is_success(&self) -> bool {
        self.failed == 0
    }

    fn fail(&mut self, failure: Failure) {
        warn!("{}", failure);
        self.failed += 1;
        self.failures.push(failure);
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for failure in &self.failures {
            writeln!(f, "  FAIL {}", failure)?;
        }
        write!(
            f,
            "{}: {} passed, {} failed, {} skipped",
            self.fixture, self.passed, self.failed, self.skipped
        )
    }
}

pub struct Runner {
    config: RunConfig,
}

impl Runner {
    pub fn new(config: RunConfig) -> Self {
        Runner { config }
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Runs every selected language over `fixture`.
    pub fn run(&self, fixture: &Fixture) -> Report {
        let mut report = Report {
            fixture: fixture.name(),
            ..Report::default()
        };
        for &language in &self.config.languages {
            let before = (report.passed, report.failed, report.skipped);
            let stopped = self.run_language(fixture, language, &mut report);
            info!(
                fixture = %report.fixture,
                %language,
                passed = report.passed - before.0,
                failed = report.failed - before.1,
                skipped = report.skipped - before.2,
                "language finished"
            );
            if stopped {
                break;
            }
        }
        report
    }

    /// Returns true when fail-fast stopped the run.
    fn run_language(&self, fixture: &Fixture, language: Language, report: &mut Report) -> bool {
        let cases = match resolve(fixture, language) {
            Ok(cases) => cases,
            Err(e) => {
                report.fail(Failure {
                    language,
                    index: None,
                    source: None,
                    reason: e.to_string(),
                });
                return self.config.fail_fast;
            }
        };

        let mut evaluator = Evaluator::new(language);
        for case in cases {
            let failures_before = report.failed;
            match case.step {
                Step::Define { name, source } => {
                    debug!(index = case.index, %language, %name, "define");
                    let result = parse_expression(&source, language)
                        .map_err(|e| e.to_string())
                        .and_then(|expr| evaluator.define(&name, &expr).map_err(|e| e.to_string()));
                    if let Err(reason) = result {
                        report.fail(Failure {
                            language,
                            index: Some(case.index),
                            source: Some(source),
                            reason: format!("definition of `{}` failed: {}", name, reason),
                        });
                    }
                }
                Step::Check { sources, expected } => {
                    if !self.config.selects(&sources) {
                        continue;
                    }
                    for source in sources {
                        debug!(index = case.index, %language, %source, "check");
                        match check_one(&evaluator, &source, &expected) {
                            Ok(()) => report.passed += 1,
                            Err(reason) => report.fail(Failure {
                                language,
                                index: Some(case.index),
                                source: Some(source),
                                reason,
                            }),
                        }
                    }
                }
                Step::Skip => {
                    debug!(index = case.index, %language, "skip");
                    report.skipped += 1;
                }
            }
            if self.config.fail_fast && report.failed > failures_before {
                return true;
            }
        }
        false
    }
}

fn check_one(evaluator: &Evaluator, source: &str, expected: &Expected) -> Result<(), String> {
    let expr = parse_expression(source, evaluator.language()).map_err(|e| format!("parse error: {}", e))?;
    let outcome = evaluator.eval(&expr);
    expected.check(&outcome).map_err(|m| m.to_string())
}
