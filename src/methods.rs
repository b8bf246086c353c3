//! The ReQL term table: which method names exist and how many arguments
//! each accepts.
//!
//! Names are matched after dropping underscores and lowercasing, so the
//! Python `set_insert`, the JavaScript `setInsert` and the Ruby
//! `set_insert` all name [`Method::SetInsert`].

use crate::{
    evaluator::{ErrorKind, ReqlError},
    language::Language,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    // r.*
    Expr,

    // Array construction
    Append,
    Prepend,
    Union,
    Difference,
    SetInsert,
    SetUnion,
    SetIntersection,
    SetDifference,

    // Positional
    Slice,
    Skip,
    Limit,
    Nth,
    InsertAt,
    SpliceAt,
    DeleteAt,
    ChangeAt,
    IndexesOf,

    // Documents
    GetField,
    Pluck,
    Without,
    HasFields,
    Merge,

    // Transformations
    Map,
    ConcatMap,
    Filter,
    Reduce,
    Distinct,

    // Aggregation and inspection
    Count,
    IsEmpty,
    Contains,
    TypeOf,

    // Math and logic
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
    Not,
}

/// Accepted argument counts, receiver included.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    Exactly(usize),
    Between(usize, usize),
    AtLeast(usize),
}

impl Arity {
    pub fn accepts(self, n: usize) -> bool {
        match self {
            Arity::Exactly(e) => n == e,
            Arity::Between(lo, hi) => (lo..=hi).contains(&n),
            Arity::AtLeast(lo) => n >= lo,
        }
    }

    /// Shifts every bound down by `by`; used to report counts without the
    /// receiver.
    fn without_receiver(self, by: usize) -> Self {
        match self {
            Arity::Exactly(e) => Arity::Exactly(e.saturating_sub(by)),
            Arity::Between(lo, hi) => Arity::Between(lo.saturating_sub(by), hi.saturating_sub(by)),
            Arity::AtLeast(lo) => Arity::AtLeast(lo.saturating_sub(by)),
        }
    }

    fn describe(self) -> String {
        match self {
            Arity::Exactly(e) => format!("{}", e),
            Arity::Between(lo, hi) => format!("between {} and {}", lo, hi),
            Arity::AtLeast(lo) => format!("{} or more", lo),
        }
    }
}

impl Method {
    pub fn from_name(name: &str) -> Option<Self> {
        let normalized: String = name
            .chars()
            .filter(|c| *c != '_')
            .flat_map(char::to_lowercase)
            .collect();

        Some(match normalized.as_str() {
            "expr" => Method::Expr,
            "append" => Method::Append,
            "prepend" => Method::Prepend,
            "union" => Method::Union,
            "difference" => Method::Difference,
            "setinsert" => Method::SetInsert,
            "setunion" => Method::SetUnion,
            "setintersection" => Method::SetIntersection,
            "setdifference" => Method::SetDifference,
            "slice" => Method::Slice,
            "skip" => Method::Skip,
            "limit" => Method::Limit,
            "nth" => Method::Nth,
            "insertat" => Method::InsertAt,
            "spliceat" => Method::SpliceAt,
            "deleteat" => Method::DeleteAt,
            "changeat" => Method::ChangeAt,
            "indexesof" => Method::IndexesOf,
            "getfield" => Method::GetField,
            "pluck" => Method::Pluck,
            "without" => Method::Without,
            "hasfields" => Method::HasFields,
            "merge" => Method::Merge,
            "map" => Method::Map,
            "concatmap" => Method::ConcatMap,
            "filter" => Method::Filter,
            "reduce" => Method::Reduce,
            "distinct" => Method::Distinct,
            "count" => Method::Count,
            "isempty" => Method::IsEmpty,
            "contains" => Method::Contains,
            "typeof" => Method::TypeOf,
            "add" => Method::Add,
            "sub" => Method::Sub,
            "mul" => Method::Mul,
            "div" => Method::Div,
            "mod" => Method::Mod,
            "eq" => Method::Eq,
            "ne" => Method::Ne,
            "lt" => Method::Lt,
            "le" => Method::Le,
            "gt" => Method::Gt,
            "ge" => Method::Ge,
            "and" => Method::And,
            "or" => Method::Or,
            "not" => Method::Not,
            _ => return None,
        })
    }

    /// Argument counts including the receiver (`r` for `r.expr`).
    pub fn arity(self) -> Arity {
        use Method::*;
        match self {
            Distinct | IsEmpty | TypeOf | Not => Arity::Exactly(1),
            Expr | Append | Prepend | Difference | SetInsert | SetUnion | SetIntersection
            | SetDifference | Skip | Limit | Nth | IndexesOf | GetField | Map | ConcatMap
            | Filter => Arity::Exactly(2),
            InsertAt | SpliceAt | ChangeAt => Arity::Exactly(3),
            Slice | DeleteAt | Reduce => Arity::Between(2, 3),
            Count => Arity::Between(1, 2),
            Pluck | Without | HasFields => Arity::AtLeast(1),
            Union | Merge | Contains | Add | Sub | Mul | Div | Mod | And | Or => Arity::AtLeast(2),
            Eq | Ne | Lt | Le | Gt | Ge => Arity::AtLeast(2),
        }
    }

    /// Checks `args` (receiver excluded) against the arity.
    ///
    /// The JavaScript driver checks arity itself before sending a query and
    /// reports counts without the receiver; the server's compile-time check,
    /// which the other drivers rely on, counts the receiver.
    pub fn check_arity(self, args: usize, language: Language) -> Result<(), ReqlError> {
        let arity = self.arity();
        let found = args + 1;
        if arity.accepts(found) {
            return Ok(());
        }

        let (kind, arity, found) = match language {
            Language::JavaScript => (ErrorKind::RqlDriverError, arity.without_receiver(1), args),
            _ => (ErrorKind::RqlCompileError, arity, found),
        };
        Err(ReqlError::new(
            kind,
            format!(
                "Expected {} argument{} but found {}.",
                arity.describe(),
                if arity == Arity::Exactly(1) { "" } else { "s" },
                found
            ),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_normalisation() {
        assert_eq!(Method::from_name("set_insert"), Some(Method::SetInsert));
        assert_eq!(Method::from_name("setInsert"), Some(Method::SetInsert));
        assert_eq!(Method::from_name("concat_map"), Some(Method::ConcatMap));
        assert_eq!(Method::from_name("typeOf"), Some(Method::TypeOf));
        assert_eq!(Method::from_name("explode"), None);
    }

    #[test]
    fn test_compile_arity_counts_receiver() {
        let err = Method::Append.check_arity(0, Language::Python).unwrap_err();
        assert_eq!(err.kind, ErrorKind::RqlCompileError);
        assert_eq!(err.message, "Expected 2 arguments but found 1.");
    }

    #[test]
    fn test_driver_arity_excludes_receiver() {
        let err = Method::Append.check_arity(0, Language::JavaScript).unwrap_err();
        assert_eq!(err.kind, ErrorKind::RqlDriverError);
        assert_eq!(err.message, "Expected 1 argument but found 0.");
    }

    #[test]
    fn test_range_arity_message() {
        let err = Method::Slice.check_arity(3, Language::Ruby).unwrap_err();
        assert_eq!(err.message, "Expected between 2 and 3 arguments but found 4.");
        assert!(Method::Slice.check_arity(1, Language::Ruby).is_ok());
    }
}
