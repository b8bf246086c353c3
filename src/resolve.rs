//! Narrowing a fixture to one target language.

use std::sync::OnceLock;

use regex::Regex;
use tracing::{debug, trace};

use crate::{
    expected::Expected,
    fixture::{Case, Exprs, Fixture, FixtureError, LangEntry},
    language::Language,
};

/// What a case asks of one language.
#[derive(Debug, Clone)]
pub enum Step {
    /// Evaluate `source` and bind it to `name`
    Define { name: String, source: String },
    /// Every source must produce `expected`
    Check {
        sources: Vec<String>,
        expected: Expected,
    },
    /// No equivalent in this language
    Skip,
}

#[derive(Debug, Clone)]
pub struct ResolvedCase {
    /// Position in `tests`, starting at 0
    pub index: usize,
    pub step: Step,
}

const LANGUAGE_KEYS: [&str; 4] = ["cd", "py", "js", "rb"];

fn definition_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^\s*([A-Za-z_][A-Za-z0-9_]*)\s*=\s*([^=\s].*?)\s*$")
            .expect("definition pattern is valid")
    })
}

/// Splits `name = expression`.
pub fn split_definition(source: &str) -> Option<(String, String)> {
    let caps = definition_regex().captures(source)?;
    Some((caps[1].to_string(), caps[2].to_string()))
}

/// Whether an `ot` mapping is keyed by language rather than being an
/// expected object literal.
pub fn is_per_language(ot: &serde_yaml::Value) -> bool {
    match ot {
        serde_yaml::Value::Mapping(map) => {
            !map.is_empty()
                && map
                    .keys()
                    .all(|k| k.as_str().is_some_and(|k| LANGUAGE_KEYS.contains(&k)))
        }
        _ => false,
    }
}

/// Picks the `ot` value that applies to `language`.
fn narrow_expected(ot: &serde_yaml::Value, language: Language) -> Option<&serde_yaml::Value> {
    if is_per_language(ot) {
        ot.get(language.key()).or_else(|| ot.get("cd"))
    } else {
        Some(ot)
    }
}

/// Resolves every case of `fixture` for `language`, stopping at the first
/// malformed case.
pub fn resolve(fixture: &Fixture, language: Language) -> Result<Vec<ResolvedCase>, FixtureError> {
    let resolved = fixture
        .tests
        .iter()
        .enumerate()
        .map(|(index, case)| {
            resolve_case(fixture, index, case, language).map(|step| ResolvedCase { index, step })
        })
        .collect::<Result<Vec<_>, _>>()?;
    debug!(
        fixture = %fixture.name(),
        %language,
        cases = resolved.len(),
        "resolved fixture"
    );
    Ok(resolved)
}

/// Resolves a single case.
pub fn resolve_case(
    fixture: &Fixture,
    index: usize,
    case: &Case,
    language: Language,
) -> Result<Step, FixtureError> {
    if let Some(def) = &case.def {
        let Some(source) = def.source_for(language) else {
            return Ok(Step::Skip);
        };
        let (name, source) =
            split_definition(source).ok_or_else(|| FixtureError::BadDefinition {
                path: fixture.name(),
                index,
                source_text: source.to_string(),
            })?;
        trace!(index, %language, %name, "definition");
        return Ok(Step::Define { name, source });
    }

    if !case.has_expression() {
        return Err(FixtureError::MissingExpression {
            path: fixture.name(),
            index,
        });
    }

    let (sources, ot) = match case.lang_entry(language) {
        Some(LangEntry::Exprs(exprs)) => (Some(exprs.clone()), case.ot.as_ref()),
        Some(LangEntry::Override(o)) => (
            o.cd.clone().or_else(|| case.cd.clone()),
            o.ot.as_ref().or(case.ot.as_ref()),
        ),
        None => (case.cd.clone(), case.ot.as_ref()),
    };

    // Only other languages have an expression.
    let Some(sources) = sources else {
        return Ok(Step::Skip);
    };
    let sources = match sources {
        Exprs::Many(v) if v.is_empty() => return Ok(Step::Skip),
        other => other.to_vec(),
    };

    let missing = || FixtureError::MissingExpected {
        path: fixture.name(),
        index,
        language,
    };
    let ot = ot.ok_or_else(missing)?;
    let ot = narrow_expected(ot, language).ok_or_else(missing)?;
    let expected =
        Expected::parse_yaml(ot, language).map_err(|source| FixtureError::Expected {
            path: fixture.name(),
            index,
            language,
            source,
        })?;

    Ok(Step::Check { sources, expected })
}
