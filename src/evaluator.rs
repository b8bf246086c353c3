use std::{
    collections::{BTreeMap, HashMap},
    fmt,
    str::FromStr,
};

use rust_decimal::{
    Decimal,
    prelude::{FromPrimitive, ToPrimitive},
};
use serde::Serialize;
use tracing::{debug, trace};

use crate::{
    ast::{BinOp, Expr, UnaryOp},
    language::Language,
    methods::Method,
    value::Value,
};

/// Largest array a term may build.
pub const ARRAY_LIMIT: usize = 100_000;

/// The error classes a driver reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ErrorKind {
    /// Rejected by the server before evaluation (bad arity, unknown term)
    RqlCompileError,
    /// Raised while evaluating (type mismatch, bad index, missing field)
    RqlRuntimeError,
    /// Raised by the driver without contacting the server
    RqlDriverError,
}

impl ErrorKind {
    pub fn name(self) -> &'static str {
        match self {
            ErrorKind::RqlCompileError => "RqlCompileError",
            ErrorKind::RqlRuntimeError => "RqlRuntimeError",
            ErrorKind::RqlDriverError => "RqlDriverError",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ErrorKind {
    type Err = String;

    /// Accepts both the `Rql` and the later `Reql` spellings.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "RqlCompileError" | "ReqlCompileError" => Ok(ErrorKind::RqlCompileError),
            "RqlRuntimeError" | "ReqlRuntimeError" => Ok(ErrorKind::RqlRuntimeError),
            "RqlDriverError" | "ReqlDriverError" => Ok(ErrorKind::RqlDriverError),
            other => Err(format!("unknown error kind '{}'", other)),
        }
    }
}

/// An error as a driver would surface it.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct ReqlError {
    pub kind: ErrorKind,
    pub message: String,
    /// Raised by a missing field or index; `filter` treats these as `false`.
    pub non_existence: bool,
}

impl ReqlError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        ReqlError {
            kind,
            message: message.into(),
            non_existence: false,
        }
    }

    pub fn runtime(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::RqlRuntimeError, message)
    }

    pub fn compile(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::RqlCompileError, message)
    }

    pub fn driver(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::RqlDriverError, message)
    }

    fn missing(message: impl Into<String>) -> Self {
        ReqlError {
            non_existence: true,
            ..Self::runtime(message)
        }
    }

    fn expected_type(expected: &str, found: &Value) -> Self {
        Self::runtime(format!(
            "Expected type {} but found {}.",
            expected,
            found.type_name()
        ))
    }
}

/// Variables visible while evaluating a function body.
#[derive(Debug, Clone, Default)]
pub struct EvalContext {
    /// What `r.row` refers to, if inside an implicit function
    pub row: Option<Value>,
    /// Lambda parameters in scope
    pub locals: HashMap<String, Value>,
}

impl EvalContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new context with `r.row` bound
    pub fn with_row(&self, row: Value) -> Self {
        EvalContext {
            row: Some(row),
            locals: self.locals.clone(),
        }
    }

    /// Create a new context with lambda parameters bound
    pub fn with_params(&self, params: &[String], args: &[Value]) -> Self {
        let mut locals = self.locals.clone();
        for (name, value) in params.iter().zip(args) {
            locals.insert(name.clone(), value.clone());
        }
        EvalContext {
            row: self.row.clone(),
            locals,
        }
    }
}

/// A function argument after inspection.
enum Func<'a> {
    Lambda { params: &'a [String], body: &'a Expr },
    /// An expression mentioning `r.row`
    Implicit(&'a Expr),
    /// Any other expression; called, it returns itself
    Constant(Value),
    /// `filter({'a': 1})`: field-equality predicate
    Match(BTreeMap<String, Value>),
}

/// How the right bound of a slice is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RightBound {
    Open,
    Closed,
    /// `.slice()`: non-negative ends are exclusive, negative ends inclusive
    Legacy,
}

/// Reference evaluator for datum terms.
///
/// Holds the `def` bindings of a fixture and the dialect whose arity rules
/// apply.
///
/// # Examples
///
/// ```
/// use rql_fixtures::{Evaluator, Language, Value, parse_expression};
///
/// let mut evaluator = Evaluator::new(Language::Python);
/// let def = parse_expression("r.expr([1, 2, 3])", Language::Python).unwrap();
/// evaluator.define("arr", &def).unwrap();
///
/// let expr = parse_expression("arr.append(4)", Language::Python).unwrap();
/// let result = evaluator.eval(&expr).unwrap();
/// assert_eq!(result.to_string(), "[1,2,3,4]");
/// ```
pub struct Evaluator {
    language: Language,
    /// Named bindings introduced by `def` rows
    globals: HashMap<String, Value>,
}

impl Evaluator {
    pub fn new(language: Language) -> Self {
        Evaluator {
            language,
            globals: HashMap::new(),
        }
    }

    pub fn language(&self) -> Language {
        self.language
    }

    pub fn bind(&mut self, name: impl Into<String>, value: Value) {
        self.globals.insert(name.into(), value);
    }

    /// Evaluates `expr` and binds the result to `name`.
    pub fn define(&mut self, name: &str, expr: &Expr) -> Result<Value, ReqlError> {
        let value = self.eval(expr)?;
        debug!(name, value = %value, "bound definition");
        self.globals.insert(name.to_string(), value.clone());
        Ok(value)
    }

    /// Compiles then evaluates a complete expression.
    pub fn eval(&self, expr: &Expr) -> Result<Value, ReqlError> {
        self.compile(expr)?;
        self.eval_expr(expr, &EvalContext::new())
    }

    /// Checks every method call for a known name and a valid argument count.
    pub fn compile(&self, expr: &Expr) -> Result<(), ReqlError> {
        match expr {
            Expr::MethodCall {
                object,
                method,
                args,
            } => {
                let resolved = Method::from_name(method);
                let on_driver = **object == Expr::Driver;
                match resolved {
                    Some(Method::Expr) if on_driver => {}
                    Some(m) if !on_driver && m != Method::Expr => {}
                    _ if on_driver => {
                        return Err(ReqlError::driver(format!("Unknown method `r.{}`.", method)));
                    }
                    _ => return Err(ReqlError::driver(format!("Unknown method `{}`.", method))),
                }
                if let Some(m) = resolved {
                    m.check_arity(args.len(), self.language)?;
                }
                self.compile(object)?;
                args.iter().try_for_each(|a| self.compile(a))
            }
            Expr::Array(items) => items.iter().try_for_each(|e| self.compile(e)),
            Expr::Object(pairs) => pairs.iter().try_for_each(|(_, e)| self.compile(e)),
            Expr::Lambda { body, .. } => self.compile(body),
            Expr::Call { callee, args } => {
                self.compile(callee)?;
                args.iter().try_for_each(|a| self.compile(a))
            }
            Expr::Index { object, index } => {
                self.compile(object)?;
                self.compile(index)
            }
            Expr::Slice {
                object, start, end, ..
            } => {
                self.compile(object)?;
                if let Some(start) = start {
                    self.compile(start)?;
                }
                if let Some(end) = end {
                    self.compile(end)?;
                }
                Ok(())
            }
            Expr::BinaryOp { left, right, .. } => {
                self.compile(left)?;
                self.compile(right)
            }
            Expr::UnaryOp { operand, .. } => self.compile(operand),
            _ => Ok(()),
        }
    }

    fn eval_expr(&self, expr: &Expr, ctx: &EvalContext) -> Result<Value, ReqlError> {
        match expr {
            Expr::Float(n) => Ok(Value::Float(*n)),
            Expr::Integer(n) => Ok(Value::Integer(*n)),
            Expr::String(s) => Ok(Value::String(s.clone())),
            Expr::Boolean(b) => Ok(Value::Boolean(*b)),
            Expr::Null => Ok(Value::Null),
            Expr::Array(items) => items
                .iter()
                .map(|e| self.eval_expr(e, ctx))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array),
            Expr::Object(pairs) => {
                let mut map = BTreeMap::new();
                for (key, e) in pairs {
                    map.insert(key.clone(), self.eval_expr(e, ctx)?);
                }
                Ok(Value::Object(map))
            }
            Expr::Name(name) => self.lookup(name, ctx),
            Expr::Driver => Err(ReqlError::compile("Cannot use `r` as a value.")),
            Expr::ImplicitVar => ctx
                .row
                .clone()
                .ok_or_else(|| ReqlError::compile("r.row is not defined outside of a function.")),
            Expr::Lambda { .. } => Err(ReqlError::compile("Cannot use a function as a value.")),
            Expr::MethodCall {
                object,
                method,
                args,
            } => {
                let method = Method::from_name(method)
                    .ok_or_else(|| ReqlError::driver(format!("Unknown method `{}`.", method)))?;
                if **object == Expr::Driver {
                    return match args.first() {
                        Some(arg) => self.eval_expr(arg, ctx),
                        None => Err(ReqlError::compile("Expected 2 arguments but found 1.")),
                    };
                }
                let receiver = self.eval_expr(object, ctx)?;
                trace!(?method, receiver = %receiver, "apply");
                self.apply_method(method, receiver, args, ctx)
            }
            Expr::Call { callee, args } => {
                if let Expr::Name(name) = &**callee
                    && !ctx.locals.contains_key(name)
                    && !self.globals.contains_key(name)
                {
                    return Err(ReqlError::driver(format!("Unknown function `{}`.", name)));
                }
                let target = self.eval_expr(callee, ctx)?;
                match args.as_slice() {
                    [key] => {
                        let key = self.eval_expr(key, ctx)?;
                        self.bracket(&target, &key)
                    }
                    _ => Err(ReqlError::compile(format!(
                        "Expected 2 arguments but found {}.",
                        args.len() + 1
                    ))),
                }
            }
            Expr::Index { object, index } => {
                let target = self.eval_expr(object, ctx)?;
                let key = self.eval_expr(index, ctx)?;
                self.bracket(&target, &key)
            }
            Expr::Slice {
                object,
                start,
                end,
                closed,
            } => {
                let items = self.expect_array(self.eval_expr(object, ctx)?)?;
                let start = match start {
                    Some(e) => self.index_arg(&self.eval_expr(e, ctx)?)?,
                    None => 0,
                };
                let end = match end {
                    Some(e) => Some(self.index_arg(&self.eval_expr(e, ctx)?)?),
                    None => None,
                };
                let bound = if *closed {
                    RightBound::Closed
                } else {
                    RightBound::Open
                };
                Ok(Value::Array(slice(items, start, end, bound)))
            }
            Expr::BinaryOp { op, left, right } => {
                let left = self.eval_expr(left, ctx)?;
                match op {
                    BinOp::And if !left.is_truthy() => Ok(left),
                    BinOp::Or if left.is_truthy() => Ok(left),
                    BinOp::And | BinOp::Or => self.eval_expr(right, ctx),
                    _ => {
                        let right = self.eval_expr(right, ctx)?;
                        self.apply_binop(*op, &left, &right)
                    }
                }
            }
            Expr::UnaryOp { op, operand } => {
                let value = self.eval_expr(operand, ctx)?;
                match op {
                    UnaryOp::Not => Ok(Value::Boolean(!value.is_truthy())),
                    UnaryOp::Neg => self.apply_binop(BinOp::Sub, &Value::Integer(0), &value),
                }
            }
        }
    }

    fn lookup(&self, name: &str, ctx: &EvalContext) -> Result<Value, ReqlError> {
        ctx.locals
            .get(name)
            .or_else(|| self.globals.get(name))
            .cloned()
            .ok_or_else(|| ReqlError::driver(format!("Unbound name `{}`.", name)))
    }

    fn eval_args(&self, args: &[Expr], ctx: &EvalContext) -> Result<Vec<Value>, ReqlError> {
        args.iter().map(|a| self.eval_expr(a, ctx)).collect()
    }

    /// Evaluates the single argument of a one-argument method.
    fn single_arg(&self, args: &[Expr], ctx: &EvalContext) -> Result<Value, ReqlError> {
        match args.first() {
            Some(arg) => self.eval_expr(arg, ctx),
            None => Err(ReqlError::compile("Expected 2 arguments but found 1.")),
        }
    }

    fn expect_array(&self, value: Value) -> Result<Vec<Value>, ReqlError> {
        match value {
            Value::Array(items) => Ok(items),
            other => Err(ReqlError::expected_type("ARRAY", &other)),
        }
    }

    fn expect_object(&self, value: Value) -> Result<BTreeMap<String, Value>, ReqlError> {
        match value {
            Value::Object(map) => Ok(map),
            other => Err(ReqlError::expected_type("OBJECT", &other)),
        }
    }

    fn index_arg(&self, value: &Value) -> Result<i64, ReqlError> {
        match value {
            Value::Integer(_) | Value::Float(_) => value
                .as_index()
                .ok_or_else(|| ReqlError::runtime(format!("Expected an integer but found {}.", value))),
            other => Err(ReqlError::expected_type("NUMBER", other)),
        }
    }

    /// Resolves an index for `insert_at` and friends.
    fn position(&self, index: i64, len: usize, allow_end: bool) -> Result<usize, ReqlError> {
        let len_i = len as i64;
        let resolved = if index < 0 { len_i + index } else { index };
        let upper = if allow_end { len_i } else { len_i - 1 };
        if resolved < 0 || resolved > upper {
            return Err(ReqlError::runtime(format!(
                "Index `{}` out of bounds for array of size: `{}`.",
                index, len
            )));
        }
        Ok(resolved as usize)
    }

    fn nth(&self, items: Vec<Value>, index: i64) -> Result<Value, ReqlError> {
        let len = items.len() as i64;
        let resolved = if index < 0 { len + index } else { index };
        if resolved < 0 || resolved >= len {
            return Err(ReqlError {
                non_existence: true,
                ..ReqlError::runtime(format!("Index out of bounds: {}", index))
            });
        }
        Ok(items.into_iter().nth(resolved as usize).unwrap_or(Value::Null))
    }

    /// `x[key]`, `x(key)` and `get_field`.
    fn bracket(&self, target: &Value, key: &Value) -> Result<Value, ReqlError> {
        match (target, key) {
            (Value::Array(items), Value::Integer(_) | Value::Float(_)) => {
                let index = self.index_arg(key)?;
                self.nth(items.clone(), index)
            }
            (Value::Object(map), Value::String(field)) => map
                .get(field)
                .cloned()
                .ok_or_else(|| ReqlError::missing(format!("No attribute `{}` in object.", field))),
            (Value::Array(items), Value::String(field)) => {
                let mut out = Vec::new();
                for item in items {
                    match item {
                        Value::Object(map) => {
                            if let Some(v) = map.get(field) {
                                out.push(v.clone());
                            }
                        }
                        other => return Err(ReqlError::expected_type("OBJECT", other)),
                    }
                }
                Ok(Value::Array(out))
            }
            (_, Value::String(_)) => Err(ReqlError::expected_type("OBJECT", target)),
            (_, Value::Integer(_) | Value::Float(_)) => Err(ReqlError::expected_type("ARRAY", target)),
            (_, other) => Err(ReqlError::runtime(format!(
                "Expected NUMBER or STRING as second argument to `bracket` but found {}.",
                other.type_name()
            ))),
        }
    }

    /// Inspects a function argument of `arity` parameters.
    fn func<'a>(
        &self,
        expr: &'a Expr,
        arity: usize,
        allow_match: bool,
        ctx: &EvalContext,
    ) -> Result<Func<'a>, ReqlError> {
        match expr {
            Expr::Lambda { params, body } => {
                if params.len() != arity {
                    return Err(ReqlError::runtime(format!(
                        "Expected function with {} argument{} but found function with {} argument{}.",
                        arity,
                        if arity == 1 { "" } else { "s" },
                        params.len(),
                        if params.len() == 1 { "" } else { "s" },
                    )));
                }
                Ok(Func::Lambda {
                    params: params.as_slice(),
                    body: body.as_ref(),
                })
            }
            e if e.uses_implicit_var() => Ok(Func::Implicit(e)),
            e => match self.eval_expr(e, ctx)? {
                Value::Object(fields) if allow_match => Ok(Func::Match(fields)),
                value => Ok(Func::Constant(value)),
            },
        }
    }

    fn call(&self, func: &Func, args: &[Value], ctx: &EvalContext) -> Result<Value, ReqlError> {
        match func {
            Func::Lambda { params, body } => self.eval_expr(body, &ctx.with_params(params, args)),
            Func::Implicit(expr) => {
                let row = args.first().cloned().unwrap_or(Value::Null);
                self.eval_expr(expr, &ctx.with_row(row))
            }
            Func::Constant(value) => Ok(value.clone()),
            Func::Match(fields) => match args.first() {
                Some(Value::Object(map)) => Ok(Value::Boolean(
                    fields
                        .iter()
                        .all(|(k, v)| map.get(k).is_some_and(|actual| actual.reql_eq(v))),
                )),
                Some(other) => Err(ReqlError::expected_type("OBJECT", other)),
                None => Ok(Value::Boolean(false)),
            },
        }
    }

    /// `count`, `contains` and `indexes_of` take either a predicate or a
    /// value to compare against.
    fn matcher<'a>(&self, expr: &'a Expr, ctx: &EvalContext) -> Result<Func<'a>, ReqlError> {
        if matches!(expr, Expr::Lambda { .. }) || expr.uses_implicit_var() {
            self.func(expr, 1, false, ctx)
        } else {
            let value = self.eval_expr(expr, ctx)?;
            Ok(Func::Constant(value))
        }
    }

    fn test(&self, matcher: &Func, item: &Value, ctx: &EvalContext) -> Result<bool, ReqlError> {
        match matcher {
            Func::Constant(value) => Ok(item.reql_eq(value)),
            f => Ok(self.call(f, std::slice::from_ref(item), ctx)?.is_truthy()),
        }
    }

    fn field_names(&self, args: Vec<Value>) -> Result<Vec<String>, ReqlError> {
        let mut names = Vec::new();
        for arg in args {
            match arg {
                Value::String(s) => names.push(s),
                Value::Array(items) => names.extend(self.field_names(items)?),
                other => return Err(ReqlError::expected_type("STRING", &other)),
            }
        }
        Ok(names)
    }

    /// Applies `f` to an object, or to every element of an array of objects.
    fn per_object(
        &self,
        receiver: Value,
        f: impl Fn(BTreeMap<String, Value>) -> Result<Value, ReqlError>,
    ) -> Result<Value, ReqlError> {
        match receiver {
            Value::Object(map) => f(map),
            Value::Array(items) => items
                .into_iter()
                .map(|item| f(self.expect_object(item)?))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array),
            other => Err(ReqlError::expected_type("ARRAY", &other)),
        }
    }

    fn apply_method(
        &self,
        method: Method,
        receiver: Value,
        args: &[Expr],
        ctx: &EvalContext,
    ) -> Result<Value, ReqlError> {
        match method {
            Method::Expr => self.single_arg(args, ctx),
            Method::Append => {
                let mut items = self.expect_array(receiver)?;
                items.push(self.single_arg(args, ctx)?);
                Ok(Value::Array(items))
            }
            Method::Prepend => {
                let mut items = self.expect_array(receiver)?;
                items.insert(0, self.single_arg(args, ctx)?);
                Ok(Value::Array(items))
            }
            Method::Union => {
                let mut items = self.expect_array(receiver)?;
                for other in self.eval_args(args, ctx)? {
                    items.extend(self.expect_array(other)?);
                }
                Ok(Value::Array(items))
            }
            Method::Difference => {
                let items = self.expect_array(receiver)?;
                let remove = self.expect_array(self.single_arg(args, ctx)?)?;
                Ok(Value::Array(
                    items.into_iter().filter(|v| !v.contained_in(&remove)).collect(),
                ))
            }
            Method::SetInsert => {
                let mut items = self.expect_array(receiver)?;
                items.push(self.single_arg(args, ctx)?);
                Ok(Value::Array(dedupe(items)))
            }
            Method::SetUnion => {
                let mut items = self.expect_array(receiver)?;
                items.extend(self.expect_array(self.single_arg(args, ctx)?)?);
                Ok(Value::Array(dedupe(items)))
            }
            Method::SetIntersection | Method::SetDifference => {
                let items = self.expect_array(receiver)?;
                let other = self.expect_array(self.single_arg(args, ctx)?)?;
                let keep_common = method == Method::SetIntersection;
                Ok(Value::Array(dedupe(
                    items
                        .into_iter()
                        .filter(|v| v.contained_in(&other) == keep_common)
                        .collect(),
                )))
            }
            Method::Slice => {
                let items = self.expect_array(receiver)?;
                let bounds = self.eval_args(args, ctx)?;
                let start = match bounds.first() {
                    Some(v) => self.index_arg(v)?,
                    None => 0,
                };
                let end = match bounds.get(1) {
                    Some(v) => Some(self.index_arg(v)?),
                    None => None,
                };
                Ok(Value::Array(slice(items, start, end, RightBound::Legacy)))
            }
            Method::Skip | Method::Limit => {
                let items = self.expect_array(receiver)?;
                let n = self.index_arg(&self.single_arg(args, ctx)?)?;
                if n < 0 {
                    let term = if method == Method::Skip { "SKIP" } else { "LIMIT" };
                    return Err(ReqlError::runtime(format!(
                        "{} takes a non-negative argument.",
                        term
                    )));
                }
                let n = (n as usize).min(items.len());
                Ok(Value::Array(if method == Method::Skip {
                    items[n..].to_vec()
                } else {
                    items[..n].to_vec()
                }))
            }
            Method::Nth => {
                let items = self.expect_array(receiver)?;
                let index = self.index_arg(&self.single_arg(args, ctx)?)?;
                self.nth(items, index)
            }
            Method::InsertAt | Method::ChangeAt | Method::SpliceAt => {
                let mut items = self.expect_array(receiver)?;
                let values = self.eval_args(args, ctx)?;
                let index = self.index_arg(&values[0])?;
                let value = values[1].clone();
                match method {
                    Method::InsertAt => {
                        let at = self.position(index, items.len(), true)?;
                        items.insert(at, value);
                    }
                    Method::ChangeAt => {
                        let at = self.position(index, items.len(), false)?;
                        items[at] = value;
                    }
                    _ => {
                        let at = self.position(index, items.len(), true)?;
                        let spliced = self.expect_array(value)?;
                        items.splice(at..at, spliced);
                    }
                }
                Ok(Value::Array(items))
            }
            Method::DeleteAt => {
                let mut items = self.expect_array(receiver)?;
                let values = self.eval_args(args, ctx)?;
                let start_index = self.index_arg(&values[0])?;
                let start = self.position(start_index, items.len(), false)?;
                let end = match values.get(1) {
                    Some(v) => {
                        let end_index = self.index_arg(v)?;
                        let end = self.position(end_index, items.len(), true)?;
                        if end < start {
                            return Err(ReqlError::runtime(format!(
                                "Start index `{}` is greater than end index `{}`.",
                                start_index, end_index
                            )));
                        }
                        end
                    }
                    None => start + 1,
                };
                items.drain(start..end);
                Ok(Value::Array(items))
            }
            Method::IndexesOf => {
                let items = self.expect_array(receiver)?;
                let matcher = self.matcher(&args[0], ctx)?;
                let mut found = Vec::new();
                for (i, item) in items.iter().enumerate() {
                    if self.test(&matcher, item, ctx)? {
                        found.push(Value::Integer(i as i64));
                    }
                }
                Ok(Value::Array(found))
            }
            Method::GetField => {
                let key = self.single_arg(args, ctx)?;
                match key {
                    Value::String(_) => self.bracket(&receiver, &key),
                    other => Err(ReqlError::expected_type("STRING", &other)),
                }
            }
            Method::Pluck | Method::Without => {
                let names = self.field_names(self.eval_args(args, ctx)?)?;
                let keep = method == Method::Pluck;
                self.per_object(receiver, |map| {
                    Ok(Value::Object(
                        map.into_iter()
                            .filter(|(k, _)| names.contains(k) == keep)
                            .collect(),
                    ))
                })
            }
            Method::HasFields => {
                let names = self.field_names(self.eval_args(args, ctx)?)?;
                let has_all = |map: &BTreeMap<String, Value>| {
                    names
                        .iter()
                        .all(|n| map.get(n).is_some_and(|v| *v != Value::Null))
                };
                match receiver {
                    Value::Object(map) => Ok(Value::Boolean(has_all(&map))),
                    Value::Array(items) => {
                        let mut out = Vec::new();
                        for item in items {
                            let map = self.expect_object(item)?;
                            if has_all(&map) {
                                out.push(Value::Object(map));
                            }
                        }
                        Ok(Value::Array(out))
                    }
                    other => Err(ReqlError::expected_type("ARRAY", &other)),
                }
            }
            Method::Merge => {
                let funcs = args
                    .iter()
                    .map(|a| self.func(a, 1, false, ctx))
                    .collect::<Result<Vec<_>, _>>()?;
                self.per_object(receiver, |map| {
                    let mut merged = Value::Object(map);
                    for f in &funcs {
                        let patch = self.call(f, std::slice::from_ref(&merged), ctx)?;
                        let patch = self.expect_object(patch)?;
                        merged = merge(merged, Value::Object(patch));
                    }
                    Ok(merged)
                })
            }
            Method::Map => {
                let items = self.expect_array(receiver)?;
                let f = self.func(&args[0], 1, false, ctx)?;
                items
                    .into_iter()
                    .map(|item| self.call(&f, &[item], ctx))
                    .collect::<Result<Vec<_>, _>>()
                    .map(Value::Array)
            }
            Method::ConcatMap => {
                let items = self.expect_array(receiver)?;
                let f = self.func(&args[0], 1, false, ctx)?;
                let mut out = Vec::new();
                for item in items {
                    out.extend(self.expect_array(self.call(&f, &[item], ctx)?)?);
                }
                Ok(Value::Array(out))
            }
            Method::Filter => {
                let items = self.expect_array(receiver)?;
                let predicate = self.func(&args[0], 1, true, ctx)?;
                let mut out = Vec::new();
                for item in items {
                    match self.call(&predicate, std::slice::from_ref(&item), ctx) {
                        Ok(result) if result.is_truthy() => out.push(item),
                        Ok(_) => {}
                        Err(e) if e.non_existence => {}
                        Err(e) => return Err(e),
                    }
                }
                Ok(Value::Array(out))
            }
            Method::Reduce => {
                let items = self.expect_array(receiver)?;
                let f = self.func(&args[0], 2, false, ctx)?;
                let mut iter = items.into_iter();
                let mut acc = match args.get(1) {
                    Some(base) => self.eval_expr(base, ctx)?,
                    None => iter
                        .next()
                        .ok_or_else(|| ReqlError::runtime("Cannot reduce over an empty stream."))?,
                };
                for item in iter {
                    acc = self.call(&f, &[acc, item], ctx)?;
                }
                Ok(acc)
            }
            Method::Distinct => {
                let mut items = self.expect_array(receiver)?;
                items.sort_by(|a, b| a.reql_cmp(b));
                items.dedup_by(|a, b| a.reql_eq(b));
                Ok(Value::Array(items))
            }
            Method::Count => {
                let items = self.expect_array(receiver)?;
                match args.first() {
                    None => Ok(Value::Integer(items.len() as i64)),
                    Some(arg) => {
                        let matcher = self.matcher(arg, ctx)?;
                        let mut n = 0;
                        for item in &items {
                            if self.test(&matcher, item, ctx)? {
                                n += 1;
                            }
                        }
                        Ok(Value::Integer(n))
                    }
                }
            }
            Method::IsEmpty => Ok(Value::Boolean(self.expect_array(receiver)?.is_empty())),
            Method::Contains => {
                let items = self.expect_array(receiver)?;
                for arg in args {
                    let matcher = self.matcher(arg, ctx)?;
                    let mut found = false;
                    for item in &items {
                        if self.test(&matcher, item, ctx)? {
                            found = true;
                            break;
                        }
                    }
                    if !found {
                        return Ok(Value::Boolean(false));
                    }
                }
                Ok(Value::Boolean(true))
            }
            Method::TypeOf => Ok(Value::String(receiver.type_name().to_string())),
            Method::Not => Ok(Value::Boolean(!receiver.is_truthy())),
            Method::And | Method::Or => {
                let mut acc = receiver;
                for arg in args {
                    let done = if method == Method::And {
                        !acc.is_truthy()
                    } else {
                        acc.is_truthy()
                    };
                    if done {
                        break;
                    }
                    acc = self.eval_expr(arg, ctx)?;
                }
                Ok(acc)
            }
            Method::Eq | Method::Ne | Method::Lt | Method::Le | Method::Gt | Method::Ge => {
                let mut values = vec![receiver];
                values.extend(self.eval_args(args, ctx)?);
                if method == Method::Ne {
                    let all_eq = values.windows(2).all(|w| w[0].reql_eq(&w[1]));
                    return Ok(Value::Boolean(!all_eq));
                }
                let op = match method {
                    Method::Eq => BinOp::Eq,
                    Method::Lt => BinOp::Lt,
                    Method::Le => BinOp::Le,
                    Method::Gt => BinOp::Gt,
                    _ => BinOp::Ge,
                };
                for w in values.windows(2) {
                    if self.apply_binop(op, &w[0], &w[1])? != Value::Boolean(true) {
                        return Ok(Value::Boolean(false));
                    }
                }
                Ok(Value::Boolean(true))
            }
            Method::Add | Method::Sub | Method::Mul | Method::Div | Method::Mod => {
                let op = match method {
                    Method::Add => BinOp::Add,
                    Method::Sub => BinOp::Sub,
                    Method::Mul => BinOp::Mul,
                    Method::Div => BinOp::Div,
                    _ => BinOp::Mod,
                };
                let mut acc = receiver;
                for value in self.eval_args(args, ctx)? {
                    acc = self.apply_binop(op, &acc, &value)?;
                }
                Ok(acc)
            }
        }
    }

    fn repeat_array(&self, items: &[Value], n: &Value) -> Result<Value, ReqlError> {
        let times = usize::try_from(self.index_arg(n)?.max(0)).unwrap_or(usize::MAX);
        match items.len().checked_mul(times) {
            Some(total) if total <= ARRAY_LIMIT => Ok(Value::Array(
                std::iter::repeat_n(items, times).flatten().cloned().collect(),
            )),
            _ => Err(ReqlError::runtime(format!(
                "Array over size limit `{}`.",
                ARRAY_LIMIT
            ))),
        }
    }

    fn apply_binop(&self, op: BinOp, left: &Value, right: &Value) -> Result<Value, ReqlError> {
        match op {
            BinOp::Eq => Ok(Value::Boolean(left.reql_eq(right))),
            BinOp::Ne => Ok(Value::Boolean(!left.reql_eq(right))),
            BinOp::Lt => Ok(Value::Boolean(left.reql_cmp(right).is_lt())),
            BinOp::Le => Ok(Value::Boolean(left.reql_cmp(right).is_le())),
            BinOp::Gt => Ok(Value::Boolean(left.reql_cmp(right).is_gt())),
            BinOp::Ge => Ok(Value::Boolean(left.reql_cmp(right).is_ge())),
            BinOp::And => Ok(if left.is_truthy() { right.clone() } else { left.clone() }),
            BinOp::Or => Ok(if left.is_truthy() { left.clone() } else { right.clone() }),
            BinOp::Add => match (left, right) {
                (Value::String(a), Value::String(b)) => Ok(Value::String(format!("{}{}", a, b))),
                (Value::Array(a), Value::Array(b)) => {
                    Ok(Value::Array(a.iter().chain(b).cloned().collect()))
                }
                (Value::String(_), other) => Err(ReqlError::expected_type("STRING", other)),
                (Value::Array(_), other) => Err(ReqlError::expected_type("ARRAY", other)),
                _ => arithmetic(op, left, right),
            },
            BinOp::Mul => match (left, right) {
                (Value::Array(items), n @ (Value::Integer(_) | Value::Float(_)))
                | (n @ (Value::Integer(_) | Value::Float(_)), Value::Array(items)) => {
                    self.repeat_array(items, n)
                }
                _ => arithmetic(op, left, right),
            },
            BinOp::Mod => {
                let (a, b) = (self.index_arg(left)?, self.index_arg(right)?);
                if b == 0 {
                    return Err(ReqlError::runtime("Cannot take a number modulo 0."));
                }
                // only i64::MIN % -1 overflows, and its remainder is 0
                Ok(Value::Integer(a.checked_rem(b).unwrap_or(0)))
            }
            BinOp::Sub | BinOp::Div => arithmetic(op, left, right),
        }
    }
}

fn to_decimal(value: &Value) -> Option<Decimal> {
    match value {
        Value::Integer(n) => Decimal::from_i64(*n),
        Value::Float(n) => Decimal::from_f64(*n),
        _ => None,
    }
}

/// Whole decimal results come back as integers.
fn from_decimal(d: Decimal) -> Option<Value> {
    if d.is_integer()
        && let Some(n) = d.to_i64()
    {
        return Some(Value::Integer(n));
    }
    d.to_f64().map(Value::Float)
}

/// Numeric `+ - * /`, exact where rust_decimal can represent the operands.
fn arithmetic(op: BinOp, left: &Value, right: &Value) -> Result<Value, ReqlError> {
    let (a, b) = match (left.as_float(), right.as_float()) {
        (Some(a), Some(b)) => (a, b),
        (None, _) => return Err(ReqlError::expected_type("NUMBER", left)),
        (_, None) => return Err(ReqlError::expected_type("NUMBER", right)),
    };
    if op == BinOp::Div && b == 0.0 {
        return Err(ReqlError::runtime("Cannot divide by zero."));
    }

    if let (Value::Integer(x), Value::Integer(y)) = (left, right) {
        let exact = match op {
            BinOp::Add => x.checked_add(*y),
            BinOp::Sub => x.checked_sub(*y),
            BinOp::Mul => x.checked_mul(*y),
            _ if x.checked_rem(*y) == Some(0) => x.checked_div(*y),
            _ => None,
        };
        if let Some(n) = exact {
            return Ok(Value::Integer(n));
        }
    }

    if let (Some(x), Some(y)) = (to_decimal(left), to_decimal(right)) {
        let result = match op {
            BinOp::Add => x.checked_add(y),
            BinOp::Sub => x.checked_sub(y),
            BinOp::Mul => x.checked_mul(y),
            _ => x.checked_div(y),
        };
        if let Some(value) = result.and_then(from_decimal) {
            return Ok(value);
        }
    }

    Ok(Value::Float(match op {
        BinOp::Add => a + b,
        BinOp::Sub => a - b,
        BinOp::Mul => a * b,
        _ => a / b,
    }))
}

/// Keeps the first occurrence of each value.
fn dedupe(items: Vec<Value>) -> Vec<Value> {
    let mut out: Vec<Value> = Vec::with_capacity(items.len());
    for item in items {
        if !item.contained_in(&out) {
            out.push(item);
        }
    }
    out
}

fn slice(items: Vec<Value>, start: i64, end: Option<i64>, bound: RightBound) -> Vec<Value> {
    let len = items.len() as i64;
    let start = if start < 0 { len + start } else { start };
    let end = match (end, bound) {
        (None, _) => len,
        (Some(e), RightBound::Open) if e < 0 => len + e,
        (Some(e), _) if e < 0 => len + e + 1,
        (Some(e), RightBound::Closed) => e.saturating_add(1),
        (Some(e), _) => e,
    };
    let (start, end) = (start.clamp(0, len) as usize, end.clamp(0, len) as usize);
    if end <= start {
        return Vec::new();
    }
    items[start..end].to_vec()
}

/// Deep merge: nested objects combine, anything else in `patch` wins.
fn merge(base: Value, patch: Value) -> Value {
    match (base, patch) {
        (Value::Object(mut base), Value::Object(patch)) => {
            for (k, v) in patch {
                let merged = match base.remove(&k) {
                    Some(existing) => merge(existing, v),
                    None => v,
                };
                base.insert(k, merged);
            }
            Value::Object(base)
        }
        (_, patch) => patch,
    }
}
