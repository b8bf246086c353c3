use std::{cmp::Ordering, collections::BTreeMap, fmt};

use crate::output::to_json;

/// A ReQL datum.
///
/// ReQL has a single `NUMBER` type; the integer/float split is kept so that
/// results render the way fixture authors write them (`[1,2,3]` rather than
/// `[1.0,2.0,3.0]`). The two variants compare equal whenever they are
/// numerically equal.
///
/// # Examples
///
/// ```
/// use rql_fixtures::Value;
///
/// let int = Value::Integer(3);
/// let float = Value::Float(3.0);
/// assert!(int.reql_eq(&float));
/// assert_eq!(int.type_name(), "NUMBER");
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// ReQL `null`
    Null,

    /// ReQL `BOOL`
    Boolean(bool),

    /// Integral `NUMBER`
    Integer(i64),

    /// Non-integral (or explicitly floating) `NUMBER`
    Float(f64),

    /// ReQL `STRING`
    String(String),

    /// ReQL `ARRAY`
    Array(Vec<Value>),

    /// ReQL `OBJECT`, keys kept sorted
    Object(BTreeMap<String, Value>),
}

impl Value {
    /// The ReQL type name, as it appears in error messages and `type_of()`.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "NULL",
            Value::Boolean(_) => "BOOL",
            Value::Integer(_) | Value::Float(_) => "NUMBER",
            Value::String(_) => "STRING",
            Value::Array(_) => "ARRAY",
            Value::Object(_) => "OBJECT",
        }
    }

    /// Predicate truthiness: everything except `false` and `null` passes.
    pub fn is_truthy(&self) -> bool {
        !matches!(self, Value::Null | Value::Boolean(false))
    }

    /// Get as float
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Integer(n) => Some(*n as f64),
            Value::Float(n) => Some(*n),
            _ => None,
        }
    }

    /// Integral number as an index. `2.0` qualifies, `2.5` does not.
    pub fn as_index(&self) -> Option<i64> {
        match self {
            Value::Integer(n) => Some(*n),
            Value::Float(n) if n.fract() == 0.0 && n.is_finite() => Some(*n as i64),
            _ => None,
        }
    }

    /// Structural equality with integers and floats unified.
    pub fn reql_eq(&self, other: &Value) -> bool {
        self.reql_cmp(other) == Ordering::Equal
    }

    /// The ReQL total order.
    ///
    /// Values of different types order by type name (`ARRAY < BOOL < NULL <
    /// NUMBER < OBJECT < STRING`). Objects compare by their sorted key/value
    /// pairs.
    pub fn reql_cmp(&self, other: &Value) -> Ordering {
        match (self, other) {
            (Value::Array(a), Value::Array(b)) => {
                for (x, y) in a.iter().zip(b) {
                    let ord = x.reql_cmp(y);
                    if ord != Ordering::Equal {
                        return ord;
                    }
                }
                a.len().cmp(&b.len())
            }
            (Value::Boolean(a), Value::Boolean(b)) => a.cmp(b),
            (Value::Null, Value::Null) => Ordering::Equal,
            (Value::Integer(a), Value::Integer(b)) => a.cmp(b),
            (a, b) if a.type_name() == "NUMBER" && b.type_name() == "NUMBER" => {
                let (x, y) = (a.as_float().unwrap_or(0.0), b.as_float().unwrap_or(0.0));
                x.partial_cmp(&y).unwrap_or(Ordering::Equal)
            }
            (Value::Object(a), Value::Object(b)) => {
                for ((ka, va), (kb, vb)) in a.iter().zip(b) {
                    let ord = ka.cmp(kb).then_with(|| va.reql_cmp(vb));
                    if ord != Ordering::Equal {
                        return ord;
                    }
                }
                a.len().cmp(&b.len())
            }
            (Value::String(a), Value::String(b)) => a.as_bytes().cmp(b.as_bytes()),
            (a, b) => a.type_name().cmp(b.type_name()),
        }
    }

    /// Whether `needle` occurs in `items` under ReQL equality.
    pub fn contained_in(&self, items: &[Value]) -> bool {
        items.iter().any(|item| item.reql_eq(self))
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&to_json(self))
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Integer(n)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Float(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::Array(items)
    }
}
