//! Expected outputs and the comparator.
//!
//! An `ot` entry is either a YAML literal or a string in driver syntax.
//! Strings may use the helpers a fixture author needs beyond plain
//! literals:
//!
//! ```text
//! err('RqlRuntimeError', 'Expected type ARRAY but found NUMBER.', [])
//! err_regex('RqlRuntimeError', 'Index .* out of bounds.*', [])
//! bag([3, 1, 2])            # any order
//! partial({'a': 1})         # object with at least these fields
//! partial([1, 2])           # array containing these, any order
//! ```

use std::{collections::BTreeMap, fmt};

use regex::Regex;

use crate::{
    ast::Expr,
    convert::yaml_to_value,
    evaluator::{ErrorKind, ReqlError},
    language::Language,
    output::to_json,
    parser::{ParseError, parse_expression},
    value::Value,
};

#[derive(Debug, Clone, thiserror::Error)]
pub enum ExpectedError {
    #[error("invalid expected output: {0}")]
    Parse(#[from] ParseError),

    #[error("expected output must be a literal, err(...), bag(...) or partial(...): {0}")]
    NotLiteral(String),

    #[error("{helper}(...) {problem}")]
    BadHelper { helper: String, problem: String },

    #[error("invalid regex in err_regex: {0}")]
    Regex(#[from] regex::Error),
}

/// The shape a successful result must have.
#[derive(Debug, Clone)]
pub enum Pattern {
    /// Scalar compared with ReQL equality
    Scalar(Value),
    /// Ordered array
    Array(Vec<Pattern>),
    /// Object with exactly these fields
    Object(BTreeMap<String, Pattern>),
    /// Array with these elements in any order
    Bag(Vec<Pattern>),
    /// Object with at least these fields
    PartialObject(BTreeMap<String, Pattern>),
    /// Array containing at least these elements, in any order
    PartialArray(Vec<Pattern>),
}

#[derive(Debug, Clone)]
pub enum Expected {
    Value(Pattern),
    Error { kind: ErrorKind, message: String },
    ErrorMatching { kind: ErrorKind, pattern: Regex },
}

/// Why an outcome did not match.
#[derive(Debug, Clone, PartialEq)]
pub struct Mismatch {
    pub expected: String,
    pub actual: String,
}

impl fmt::Display for Mismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "expected {}, got {}", self.expected, self.actual)
    }
}

impl Pattern {
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Array(items) => Pattern::Array(items.into_iter().map(Pattern::from_value).collect()),
            Value::Object(map) => Pattern::Object(
                map.into_iter()
                    .map(|(k, v)| (k, Pattern::from_value(v)))
                    .collect(),
            ),
            scalar => Pattern::Scalar(scalar),
        }
    }

    pub fn matches(&self, value: &Value) -> bool {
        match (self, value) {
            (Pattern::Scalar(expected), actual) => expected.reql_eq(actual),
            (Pattern::Array(expected), Value::Array(actual)) => {
                expected.len() == actual.len()
                    && expected.iter().zip(actual).all(|(p, v)| p.matches(v))
            }
            (Pattern::Object(expected), Value::Object(actual)) => {
                expected.len() == actual.len()
                    && expected
                        .iter()
                        .all(|(k, p)| actual.get(k).is_some_and(|v| p.matches(v)))
            }
            (Pattern::PartialObject(expected), Value::Object(actual)) => expected
                .iter()
                .all(|(k, p)| actual.get(k).is_some_and(|v| p.matches(v))),
            (Pattern::Bag(expected), Value::Array(actual)) => {
                expected.len() == actual.len() && match_unordered(expected, actual)
            }
            (Pattern::PartialArray(expected), Value::Array(actual)) => {
                match_unordered(expected, actual)
            }
            _ => false,
        }
    }
}

/// Every pattern claims a distinct element of `actual`.
/// Bipartite matching by augmenting paths.
fn match_unordered(expected: &[Pattern], actual: &[Value]) -> bool {
    if expected.len() > actual.len() {
        return false;
    }
    let mut owner: Vec<Option<usize>> = vec![None; actual.len()];
    (0..expected.len()).all(|p| {
        let mut seen = vec![false; actual.len()];
        augment(p, expected, actual, &mut seen, &mut owner)
    })
}

fn augment(
    p: usize,
    expected: &[Pattern],
    actual: &[Value],
    seen: &mut [bool],
    owner: &mut [Option<usize>],
) -> bool {
    for (i, value) in actual.iter().enumerate() {
        if seen[i] || !expected[p].matches(value) {
            continue;
        }
        seen[i] = true;
        let free = match owner[i] {
            None => true,
            Some(other) => augment(other, expected, actual, seen, owner),
        };
        if free {
            owner[i] = Some(p);
            return true;
        }
    }
    false
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn list(f: &mut fmt::Formatter<'_>, items: &[Pattern]) -> fmt::Result {
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    f.write_str(",")?;
                }
                write!(f, "{}", item)?;
            }
            Ok(())
        }
        fn fields(f: &mut fmt::Formatter<'_>, map: &BTreeMap<String, Pattern>) -> fmt::Result {
            for (i, (k, v)) in map.iter().enumerate() {
                if i > 0 {
                    f.write_str(",")?;
                }
                write!(f, "{}:{}", to_json(&Value::String(k.clone())), v)?;
            }
            Ok(())
        }

        match self {
            Pattern::Scalar(v) => f.write_str(&to_json(v)),
            Pattern::Array(items) => {
                f.write_str("[")?;
                list(f, items)?;
                f.write_str("]")
            }
            Pattern::Object(map) => {
                f.write_str("{")?;
                fields(f, map)?;
                f.write_str("}")
            }
            Pattern::Bag(items) => {
                f.write_str("bag([")?;
                list(f, items)?;
                f.write_str("])")
            }
            Pattern::PartialObject(map) => {
                f.write_str("partial({")?;
                fields(f, map)?;
                f.write_str("})")
            }
            Pattern::PartialArray(items) => {
                f.write_str("partial([")?;
                list(f, items)?;
                f.write_str("])")
            }
        }
    }
}

impl fmt::Display for Expected {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expected::Value(pattern) => write!(f, "{}", pattern),
            Expected::Error { kind, message } => write!(f, "{}: {}", kind, message),
            Expected::ErrorMatching { kind, pattern } => write!(f, "{}: /{}/", kind, pattern.as_str()),
        }
    }
}

fn describe_outcome(outcome: &Result<Value, ReqlError>) -> String {
    match outcome {
        Ok(value) => to_json(value),
        Err(e) => e.to_string(),
    }
}

impl Expected {
    /// Reads an `ot` value already narrowed to one language.
    pub fn parse_yaml(value: &serde_yaml::Value, language: Language) -> Result<Self, ExpectedError> {
        match value {
            serde_yaml::Value::String(source) => Self::parse_str(source, language),
            other => Ok(Expected::Value(Pattern::from_value(yaml_to_value(other.clone())))),
        }
    }

    /// Reads an `ot` string written in `language`'s syntax.
    pub fn parse_str(source: &str, language: Language) -> Result<Self, ExpectedError> {
        let expr = parse_expression(source, language)?;
        match &expr {
            Expr::Call { callee, args } => match &**callee {
                Expr::Name(name) if name == "err" || name == "err_regex" => {
                    let (kind, message) = error_args(name, args)?;
                    if name == "err" {
                        Ok(Expected::Error { kind, message })
                    } else {
                        Ok(Expected::ErrorMatching {
                            kind,
                            pattern: Regex::new(&format!("^(?:{})$", message))?,
                        })
                    }
                }
                _ => Ok(Expected::Value(to_pattern(&expr)?)),
            },
            _ => Ok(Expected::Value(to_pattern(&expr)?)),
        }
    }

    pub fn check(&self, outcome: &Result<Value, ReqlError>) -> Result<(), Mismatch> {
        let ok = match (self, outcome) {
            (Expected::Value(pattern), Ok(value)) => pattern.matches(value),
            (Expected::Error { kind, message }, Err(e)) => e.kind == *kind && e.message == *message,
            (Expected::ErrorMatching { kind, pattern }, Err(e)) => {
                e.kind == *kind && pattern.is_match(&e.message)
            }
            _ => false,
        };
        if ok {
            Ok(())
        } else {
            Err(Mismatch {
                expected: self.to_string(),
                actual: describe_outcome(outcome),
            })
        }
    }
}

fn error_args(helper: &str, args: &[Expr]) -> Result<(ErrorKind, String), ExpectedError> {
    let bad = |problem: &str| ExpectedError::BadHelper {
        helper: helper.to_string(),
        problem: problem.to_string(),
    };
    match args {
        [Expr::String(kind), Expr::String(message)] | [Expr::String(kind), Expr::String(message), _] => {
            let kind = kind.parse::<ErrorKind>().map_err(|e| bad(e.as_str()))?;
            Ok((kind, message.clone()))
        }
        _ => Err(bad("takes an error kind string, a message string and optional frames")),
    }
}

/// Converts a literal expression into a pattern.
fn to_pattern(expr: &Expr) -> Result<Pattern, ExpectedError> {
    match expr {
        Expr::Integer(n) => Ok(Pattern::Scalar(Value::Integer(*n))),
        Expr::Float(n) => Ok(Pattern::Scalar(Value::Float(*n))),
        Expr::String(s) => Ok(Pattern::Scalar(Value::String(s.clone()))),
        Expr::Boolean(b) => Ok(Pattern::Scalar(Value::Boolean(*b))),
        Expr::Null => Ok(Pattern::Scalar(Value::Null)),
        Expr::Array(items) => items
            .iter()
            .map(to_pattern)
            .collect::<Result<Vec<_>, _>>()
            .map(Pattern::Array),
        Expr::Object(pairs) => pairs
            .iter()
            .map(|(k, e)| Ok((k.clone(), to_pattern(e)?)))
            .collect::<Result<BTreeMap<_, _>, ExpectedError>>()
            .map(Pattern::Object),
        Expr::Call { callee, args } => {
            let name = match &**callee {
                Expr::Name(name) => name.as_str(),
                _ => return Err(ExpectedError::NotLiteral(format!("{:?}", expr))),
            };
            let inner = match args.as_slice() {
                [single] => to_pattern(single)?,
                _ => {
                    return Err(ExpectedError::BadHelper {
                        helper: name.to_string(),
                        problem: "takes exactly one argument".to_string(),
                    });
                }
            };
            match (name, inner) {
                ("bag", Pattern::Array(items)) => Ok(Pattern::Bag(items)),
                ("partial", Pattern::Array(items)) => Ok(Pattern::PartialArray(items)),
                ("partial", Pattern::Object(fields)) => Ok(Pattern::PartialObject(fields)),
                ("bag" | "partial", _) => Err(ExpectedError::BadHelper {
                    helper: name.to_string(),
                    problem: "needs an array or object literal".to_string(),
                }),
                _ => Err(ExpectedError::NotLiteral(format!("unknown helper '{}'", name))),
            }
        }
        other => Err(ExpectedError::NotLiteral(format!("{:?}", other))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_err_sentinel() {
        let expected = Expected::parse_str(
            "err('RqlRuntimeError', 'Cannot reduce over an empty stream.', [])",
            Language::Python,
        )
        .unwrap();
        let outcome = Err(ReqlError::runtime("Cannot reduce over an empty stream."));
        assert!(expected.check(&outcome).is_ok());
        assert!(expected.check(&Ok(Value::Null)).is_err());
    }

    #[test]
    fn test_bag_ignores_order() {
        let expected = Expected::parse_str("bag([3, 1, 2])", Language::Ruby).unwrap();
        let outcome = Ok(Value::Array(vec![Value::Integer(1), Value::Integer(2), Value::Integer(3)]));
        assert!(expected.check(&outcome).is_ok());
    }

    #[test]
    fn test_integer_matches_float() {
        let expected = Expected::parse_str("[1, 2]", Language::JavaScript).unwrap();
        let outcome = Ok(Value::Array(vec![Value::Float(1.0), Value::Float(2.0)]));
        assert!(expected.check(&outcome).is_ok());
    }

    #[test]
    fn test_mismatch_message() {
        let expected = Expected::parse_str("[1]", Language::Python).unwrap();
        let mismatch = expected.check(&Ok(Value::Array(vec![]))).unwrap_err();
        assert_eq!(mismatch.to_string(), "expected [1], got []");
    }

    #[test]
    fn test_rejects_non_literals() {
        assert!(Expected::parse_str("arr.count()", Language::Python).is_err());
    }
}
