//! JSON rendering of datum values.
//!
//! Used for `Display`, mismatch messages and the `eval` command. Output is
//! deterministic: object keys come out sorted, integers print without a
//! fractional part and whole floats keep one (`2.0`).
//!
//! # Examples
//!
//! ```
//! use rql_fixtures::Value;
//! use rql_fixtures::output::{to_json, to_json_pretty};
//!
//! let value = Value::Array(vec![Value::Integer(1), Value::Float(2.5)]);
//! assert_eq!(to_json(&value), "[1,2.5]");
//! assert_eq!(to_json_pretty(&Value::Integer(42)), "42");
//! ```

use std::collections::BTreeMap;

use crate::value::Value;

pub struct JsonPrinter {
    pretty: bool,
}

impl JsonPrinter {
    pub fn new(pretty: bool) -> Self {
        JsonPrinter { pretty }
    }

    pub fn print(&self, value: &Value) -> String {
        self.print_value(value, 0)
    }

    fn print_value(&self, value: &Value, indent: usize) -> String {
        match value {
            Value::Null => "null".to_string(),
            Value::Boolean(b) => b.to_string(),
            Value::Integer(n) => n.to_string(),
            Value::Float(n) => self.print_float(*n),
            Value::String(s) => format!("\"{}\"", self.escape_string(s)),
            Value::Array(arr) => self.print_array(arr, indent),
            Value::Object(obj) => self.print_object(obj, indent),
        }
    }

    fn print_float(&self, n: f64) -> String {
        if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e16 {
            format!("{:.1}", n)
        } else {
            n.to_string()
        }
    }

    fn print_array(&self, arr: &[Value], indent: usize) -> String {
        if arr.is_empty() {
            return "[]".to_string();
        }

        if self.pretty {
            let items: Vec<String> = arr
                .iter()
                .map(|v| {
                    format!(
                        "{}{}",
                        self.indent(indent + 1),
                        self.print_value(v, indent + 1)
                    )
                })
                .collect();
            format!("[\n{}\n{}]", items.join(",\n"), self.indent(indent))
        } else {
            let items: Vec<String> = arr.iter().map(|v| self.print_value(v, indent)).collect();
            format!("[{}]", items.join(","))
        }
    }

    fn print_object(&self, obj: &BTreeMap<String, Value>, indent: usize) -> String {
        if obj.is_empty() {
            return "{}".to_string();
        }

        if self.pretty {
            let items: Vec<String> = obj
                .iter()
                .map(|(k, v)| {
                    format!(
                        "{}\"{}\": {}",
                        self.indent(indent + 1),
                        self.escape_string(k),
                        self.print_value(v, indent + 1)
                    )
                })
                .collect();
            format!("{{\n{}\n{}}}", items.join(",\n"), self.indent(indent))
        } else {
            let items: Vec<String> = obj
                .iter()
                .map(|(k, v)| format!("\"{}\":{}", self.escape_string(k), self.print_value(v, indent)))
                .collect();
            format!("{{{}}}", items.join(","))
        }
    }

    fn indent(&self, level: usize) -> String {
        "  ".repeat(level)
    }

    fn escape_string(&self, s: &str) -> String {
        let mut out = String::with_capacity(s.len());
        for c in s.chars() {
            match c {
                '"' => out.push_str("\\\""),
                '\\' => out.push_str("\\\\"),
                '\n' => out.push_str("\\n"),
                '\r' => out.push_str("\\r"),
                '\t' => out.push_str("\\t"),
                c if c.is_control() => out.push_str(&format!("\\u{:04x}", c as u32)),
                c => out.push(c),
            }
        }
        out
    }
}

/// Compact JSON, no whitespace.
pub fn to_json(value: &Value) -> String {
    JsonPrinter::new(false).print(value)
}

/// Pretty JSON with 2-space indentation, one element per line.
pub fn to_json_pretty(value: &Value) -> String {
    JsonPrinter::new(true).print(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_keys_sorted() {
        let mut obj = BTreeMap::new();
        obj.insert("b".to_string(), Value::Integer(2));
        obj.insert("a".to_string(), Value::String("x\n".into()));
        assert_eq!(to_json(&Value::Object(obj)), r#"{"a":"x\n","b":2}"#);
    }

    #[test]
    fn test_whole_float_keeps_fraction() {
        assert_eq!(to_json(&Value::Float(3.0)), "3.0");
        assert_eq!(to_json(&Value::Float(0.5)), "0.5");
    }

    #[test]
    fn test_pretty_nested() {
        let value = Value::Array(vec![Value::Integer(1), Value::Array(vec![])]);
        assert_eq!(to_json_pretty(&value), "[\n  1,\n  []\n]");
    }
}
