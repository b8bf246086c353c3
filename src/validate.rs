//! Static checks over a fixture, without evaluating anything.

use std::{collections::HashSet, fmt};

use serde::Serialize;

use crate::{
    fixture::Fixture,
    language::Language,
    parser::parse_expression,
    resolve::{Step, resolve_case},
};

/// A problem found in a fixture.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Issue {
    pub index: usize,
    /// `None` when the problem does not depend on the target language
    pub language: Option<Language>,
    pub message: String,
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.language {
            Some(lang) => write!(f, "case {} ({}): {}", self.index, lang, self.message),
            None => write!(f, "case {}: {}", self.index, self.message),
        }
    }
}

/// Checks `fixture` in every language. An empty result means it is valid.
///
/// Reports cases that do not resolve, expressions that do not parse in
/// their dialect, names used before a `def` binds them, and `def` rows that
/// also carry an expected output.
pub fn validate(fixture: &Fixture) -> Vec<Issue> {
    let mut issues = Vec::new();

    for (index, case) in fixture.tests.iter().enumerate() {
        if case.def.is_some() && case.ot.is_some() {
            issues.push(Issue {
                index,
                language: None,
                message: "a definition row cannot have an expected output".to_string(),
            });
        }
    }

    for language in Language::ALL {
        validate_language(fixture, language, &mut issues);
    }
    issues
}

fn validate_language(fixture: &Fixture, language: Language, issues: &mut Vec<Issue>) {
    let mut bound: HashSet<String> = HashSet::new();
    let mut report = |index: usize, message: String| {
        issues.push(Issue {
            index,
            language: Some(language),
            message,
        })
    };

    for (index, case) in fixture.tests.iter().enumerate() {
        let step = match resolve_case(fixture, index, case, language) {
            Ok(step) => step,
            Err(e) => {
                report(index, e.to_string());
                continue;
            }
        };

        let sources = match &step {
            Step::Define { source, .. } => std::slice::from_ref(source),
            Step::Check { sources, .. } => sources.as_slice(),
            Step::Skip => continue,
        };

        for source in sources {
            match parse_expression(source, language) {
                Ok(expr) => {
                    for name in expr.free_names() {
                        if !bound.contains(&name) {
                            report(index, format!("`{}` is used before it is defined", name));
                        }
                    }
                }
                Err(e) => report(index, format!("cannot parse `{}`: {}", source, e)),
            }
        }

        if let Step::Define { name, .. } = step {
            bound.insert(name);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_fixture() {
        let fixture = Fixture::from_yaml_str(
            r#"
tests:
  - def: arr = r.expr([1, 2, 3])
  - cd: arr.count()
    ot: 3
"#,
        )
        .unwrap();
        assert!(validate(&fixture).is_empty());
    }

    #[test]
    fn test_use_before_definition() {
        let fixture = Fixture::from_yaml_str(
            r#"
tests:
  - cd: arr.count()
    ot: 3
  - def: arr = r.expr([1, 2, 3])
"#,
        )
        .unwrap();
        let issues = validate(&fixture);
        assert_eq!(issues.len(), 3);
        assert!(issues.iter().all(|i| i.index == 0 && i.message.contains("`arr`")));
    }

    #[test]
    fn test_def_with_expected_output() {
        let fixture = Fixture::from_yaml_str("tests:\n  - def: a = 1\n    ot: 1\n").unwrap();
        let issues = validate(&fixture);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].language, None);
    }

    #[test]
    fn test_dialect_parse_error() {
        let fixture = Fixture::from_yaml_str("tests:\n  - cd: r.expr(1) + 2\n    ot: 3\n").unwrap();
        let issues = validate(&fixture);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].language, Some(Language::JavaScript));
    }
}
