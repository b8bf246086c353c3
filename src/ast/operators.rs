/// Binary operators.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BinOp {
    // Arithmetic
    /// Addition, string and array concatenation (`+`, `.add()`)
    Add,
    /// Subtraction (`-`, `.sub()`)
    Sub,
    /// Multiplication (`*`, `.mul()`)
    Mul,
    /// Division (`/`, `.div()`)
    Div,
    /// Modulo (`%`, `.mod()`)
    Mod,

    // Comparison
    /// `==`, `.eq()`
    Eq,
    /// `!=`, `.ne()`
    Ne,
    /// `<`, `.lt()`
    Lt,
    /// `<=`, `.le()`
    Le,
    /// `>`, `.gt()`
    Gt,
    /// `>=`, `.ge()`
    Ge,

    // Logical
    /// `&`, `.and()`
    And,
    /// `|`, `.or()`
    Or,
}

impl BinOp {
    /// The ReQL method name this operator is sugar for.
    pub fn method_name(self) -> &'static str {
        match self {
            BinOp::Add => "add",
            BinOp::Sub => "sub",
            BinOp::Mul => "mul",
            BinOp::Div => "div",
            BinOp::Mod => "mod",
            BinOp::Eq => "eq",
            BinOp::Ne => "ne",
            BinOp::Lt => "lt",
            BinOp::Le => "le",
            BinOp::Gt => "gt",
            BinOp::Ge => "ge",
            BinOp::And => "and",
            BinOp::Or => "or",
        }
    }
}

/// Prefix operators.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UnaryOp {
    /// `-x`
    Neg,
    /// `~x`, `.not()`
    Not,
}
