//! Fixture documents: the YAML schema and its loader.
//!
//! ```yaml
//! desc: Tests array manipulation operations
//! tests:
//!   - def: arr = r.expr([1, 2, 3])
//!   - cd: arr.append(4)
//!     ot: [1, 2, 3, 4]
//!   - cd: arr.slice(-2, -1)
//!     py: arr[-2:]
//!     ot: [2, 3]
//!   - cd: arr.append()
//!     js:
//!       ot: err('RqlDriverError', 'Expected 1 argument but found 0.', [])
//!     ot: err('RqlCompileError', 'Expected 2 arguments but found 1.', [])
//! ```

use std::{
    fs,
    path::{Path, PathBuf},
};

use serde::Deserialize;
use tracing::debug;

use crate::{expected::ExpectedError, language::Language};

/// A whole fixture file.
#[derive(Debug, Clone, Deserialize)]
pub struct Fixture {
    #[serde(default)]
    pub desc: String,
    pub tests: Vec<Case>,
    /// Where the fixture was read from, for error messages
    #[serde(skip)]
    pub path: Option<PathBuf>,
}

/// One row of `tests`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Case {
    pub def: Option<DefEntry>,
    pub cd: Option<Exprs>,
    pub py: Option<LangEntry>,
    pub js: Option<LangEntry>,
    pub rb: Option<LangEntry>,
    pub ot: Option<serde_yaml::Value>,
}

/// One expression or a list of equivalent alternates.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Exprs {
    One(String),
    Many(Vec<String>),
}

impl Exprs {
    pub fn to_vec(&self) -> Vec<String> {
        match self {
            Exprs::One(s) => vec![s.clone()],
            Exprs::Many(v) => v.clone(),
        }
    }
}

/// What a `py`/`js`/`rb` key may hold.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum LangEntry {
    Exprs(Exprs),
    Override(Override),
}

/// A language variant that replaces the expression, the expected output,
/// or both.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Override {
    pub cd: Option<Exprs>,
    pub ot: Option<serde_yaml::Value>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum DefEntry {
    /// `arr = r.expr([1, 2, 3])`
    Source(String),
    PerLanguage(DefOverrides),
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DefOverrides {
    pub cd: Option<String>,
    pub py: Option<String>,
    pub js: Option<String>,
    pub rb: Option<String>,
}

impl DefEntry {
    /// The definition source for `language`, falling back to `cd`.
    pub fn source_for(&self, language: Language) -> Option<&str> {
        match self {
            DefEntry::Source(s) => Some(s),
            DefEntry::PerLanguage(d) => {
                let specific = match language {
                    Language::Python => &d.py,
                    Language::JavaScript => &d.js,
                    Language::Ruby => &d.rb,
                };
                specific.as_deref().or(d.cd.as_deref())
            }
        }
    }
}

impl Case {
    pub fn lang_entry(&self, language: Language) -> Option<&LangEntry> {
        match language {
            Language::Python => self.py.as_ref(),
            Language::JavaScript => self.js.as_ref(),
            Language::Ruby => self.rb.as_ref(),
        }
    }

    /// Whether the row names any expression at all.
    pub fn has_expression(&self) -> bool {
        self.cd.is_some() || self.py.is_some() || self.js.is_some() || self.rb.is_some()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum FixtureError {
    #[error("{path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{path}: invalid fixture: {source}")]
    Yaml {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("{path}: case {index}: no expression in cd, py, js or rb")]
    MissingExpression { path: String, index: usize },

    #[error("{path}: case {index}: no expected output (ot) for {language}")]
    MissingExpected {
        path: String,
        index: usize,
        language: Language,
    },

    #[error("{path}: case {index}: definition must look like `name = expression`, got `{source_text}`")]
    BadDefinition {
        path: String,
        index: usize,
        source_text: String,
    },

    #[error("{path}: case {index} ({language}): {source}")]
    Expected {
        path: String,
        index: usize,
        language: Language,
        #[source]
        source: ExpectedError,
    },
}

impl Fixture {
    /// Parses a fixture held in memory.
    pub fn from_yaml_str(text: &str) -> Result<Self, FixtureError> {
        let fixture: Fixture = serde_yaml::from_str(text).map_err(|source| FixtureError::Yaml {
            path: "<inline>".to_string(),
            source,
        })?;
        debug!(cases = fixture.tests.len(), desc = %fixture.desc, "parsed fixture");
        Ok(fixture)
    }

    /// Reads and parses a fixture file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, FixtureError> {
        let path = path.as_ref();
        let shown = path.display().to_string();
        let text = fs::read_to_string(path).map_err(|source| FixtureError::Io {
            path: shown.clone(),
            source,
        })?;
        let mut fixture: Fixture =
            serde_yaml::from_str(&text).map_err(|source| FixtureError::Yaml {
                path: shown.clone(),
                source,
            })?;
        fixture.path = Some(path.to_path_buf());
        debug!(path = %shown, cases = fixture.tests.len(), "loaded fixture");
        Ok(fixture)
    }

    /// Name used in error messages and reports.
    pub fn name(&self) -> String {
        match &self.path {
            Some(p) => p.display().to_string(),
            None => "<inline>".to_string(),
        }
    }
}
