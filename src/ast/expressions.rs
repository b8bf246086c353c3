use crate::ast::{BinOp, UnaryOp};

/// Parsed driver expression.
///
/// All three dialects parse into this one tree; dialect sugar (`x[1:2]`,
/// `x[1..2]`, `x('a')`, Ruby blocks) is already desugared into the shared
/// node kinds by the parser.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    // Literals
    /// Floating point literal
    Float(f64),

    /// Integer literal
    Integer(i64),

    /// String literal
    String(String),

    /// Boolean literal
    Boolean(bool),

    /// `null` / `None` / `nil`
    Null,

    /// Array literal
    ///
    /// # Example
    /// ```text
    /// [1, 2, 3]
    /// ```
    Array(Vec<Expr>),

    /// Object literal, pairs kept in source order
    ///
    /// # Example
    /// ```text
    /// {'a': 1, 'b': 'x'}
    /// {'a' => 1}
    /// ```
    Object(Vec<(String, Expr)>),

    // References
    /// A `def` binding or a lambda parameter
    Name(String),

    /// The driver namespace `r`
    Driver,

    /// `r.row`, the argument of the innermost implicit function
    ImplicitVar,

    /// Anonymous function
    ///
    /// # Examples
    /// ```text
    /// lambda x: x * 2
    /// function(x) { return x.mul(2); }
    /// {|x| x * 2}
    /// ```
    Lambda { params: Vec<String>, body: Box<Expr> },

    // Operations
    /// Method call, including `r.expr(...)`
    ///
    /// # Examples
    /// ```text
    /// arr.append(4)
    /// r.expr([1, 2])
    /// ```
    MethodCall {
        object: Box<Expr>,
        method: String,
        args: Vec<Expr>,
    },

    /// Call of a non-method callee
    ///
    /// JavaScript `x('a')` and `r(1)`, and the helpers (`err(...)`, `bag(...)`)
    /// of expected-output strings.
    Call { callee: Box<Expr>, args: Vec<Expr> },

    /// Bracket access: `x[0]`, `x['a']`
    Index { object: Box<Expr>, index: Box<Expr> },

    /// Range access: `x[1:2]` (open), `x[1..2]` (closed), `x[1...2]` (open)
    Slice {
        object: Box<Expr>,
        start: Option<Box<Expr>>,
        end: Option<Box<Expr>>,
        closed: bool,
    },

    /// Infix operator
    BinaryOp {
        op: BinOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },

    /// Prefix operator
    UnaryOp { op: UnaryOp, operand: Box<Expr> },
}

impl Expr {
    /// Names referenced but not bound by an enclosing lambda, in order of
    /// first appearance.
    pub fn free_names(&self) -> Vec<String> {
        let mut names = Vec::new();
        self.collect_free(&mut Vec::new(), &mut names);
        names
    }

    fn collect_free(&self, bound: &mut Vec<String>, out: &mut Vec<String>) {
        match self {
            Expr::Name(name) => {
                if !bound.contains(name) && !out.contains(name) {
                    out.push(name.clone());
                }
            }
            Expr::Lambda { params, body } => {
                let depth = bound.len();
                bound.extend(params.iter().cloned());
                body.collect_free(bound, out);
                bound.truncate(depth);
            }
            Expr::Array(items) => items.iter().for_each(|e| e.collect_free(bound, out)),
            Expr::Object(pairs) => pairs.iter().for_each(|(_, e)| e.collect_free(bound, out)),
            Expr::MethodCall { object, args, .. } => {
                object.collect_free(bound, out);
                args.iter().for_each(|e| e.collect_free(bound, out));
            }
            Expr::Call { callee, args } => {
                callee.collect_free(bound, out);
                args.iter().for_each(|e| e.collect_free(bound, out));
            }
            Expr::Index { object, index } => {
                object.collect_free(bound, out);
                index.collect_free(bound, out);
            }
            Expr::Slice {
                object, start, end, ..
            } => {
                object.collect_free(bound, out);
                if let Some(start) = start {
                    start.collect_free(bound, out);
                }
                if let Some(end) = end {
                    end.collect_free(bound, out);
                }
            }
            Expr::BinaryOp { left, right, .. } => {
                left.collect_free(bound, out);
                right.collect_free(bound, out);
            }
            Expr::UnaryOp { operand, .. } => operand.collect_free(bound, out),
            Expr::Float(_)
            | Expr::Integer(_)
            | Expr::String(_)
            | Expr::Boolean(_)
            | Expr::Null
            | Expr::Driver
            | Expr::ImplicitVar => {}
        }
    }

    /// Whether `r.row` occurs outside any explicit lambda.
    pub fn uses_implicit_var(&self) -> bool {
        match self {
            Expr::ImplicitVar => true,
            Expr::Lambda { .. } => false,
            Expr::Array(items) => items.iter().any(Expr::uses_implicit_var),
            Expr::Object(pairs) => pairs.iter().any(|(_, e)| e.uses_implicit_var()),
            Expr::MethodCall { object, args, .. } => {
                object.uses_implicit_var() || args.iter().any(Expr::uses_implicit_var)
            }
            Expr::Call { callee, args } => {
                callee.uses_implicit_var() || args.iter().any(Expr::uses_implicit_var)
            }
            Expr::Index { object, index } => object.uses_implicit_var() || index.uses_implicit_var(),
            Expr::Slice {
                object, start, end, ..
            } => {
                object.uses_implicit_var()
                    || start.as_ref().is_some_and(|e| e.uses_implicit_var())
                    || end.as_ref().is_some_and(|e| e.uses_implicit_var())
            }
            Expr::BinaryOp { left, right, .. } => left.uses_implicit_var() || right.uses_implicit_var(),
            Expr::UnaryOp { operand, .. } => operand.uses_implicit_var(),
            _ => false,
        }
    }
}
