#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    // Literals
    /// Floating-point number
    ///
    /// # Examples
    /// ```text
    /// 1.5
    /// 0.25
    /// ```
    Float(f64),

    /// Integer
    ///
    /// # Examples
    /// ```text
    /// 42
    /// 0
    /// ```
    Integer(i64),

    /// String literal in single or double quotes
    ///
    /// # Examples
    /// ```text
    /// 'a'
    /// "RqlRuntimeError"
    /// ```
    String(String),

    /// `true`/`True` or `false`/`False`
    Boolean(bool),

    /// `null`, `None` or `nil`
    Null,

    // Identifiers and keywords
    /// Binding, parameter or method name
    ///
    /// # Examples
    /// ```text
    /// arr
    /// objArr
    /// set_insert
    /// ```
    Identifier(String),

    /// Python `lambda`
    Lambda,

    /// JavaScript `function`
    Function,

    /// JavaScript `return`
    Return,

    // Operators
    /// `+`
    Plus,
    /// `-`
    Minus,
    /// `*`
    Star,
    /// `/`
    Slash,
    /// `%`
    Percent,
    /// `==`
    EqEq,
    /// `!=`
    NotEq,
    /// `<`
    Lt,
    /// `<=`
    LtEq,
    /// `>`
    Gt,
    /// `>=`
    GtEq,
    /// `&` (ReQL `and` in Python and Ruby)
    Ampersand,
    /// `|` (ReQL `or`, also Ruby block parameter delimiters)
    Pipe,
    /// `~` (ReQL `not` in Python and Ruby)
    Tilde,
    /// `=>` (Ruby hash pairs)
    FatArrow,

    // Delimiters
    /// `.`
    Dot,
    /// `..` (closed Ruby range)
    DotDot,
    /// `...` (open Ruby range)
    DotDotDot,
    /// `,`
    Comma,
    /// `:`
    Colon,
    /// `;`
    Semicolon,
    /// `(`
    LParen,
    /// `)`
    RParen,
    /// `[`
    LBracket,
    /// `]`
    RBracket,
    /// `{`
    LBrace,
    /// `}`
    RBrace,

    /// End of input
    Eof,
}

impl Token {
    /// Source spelling for operators and delimiters, used in error messages.
    pub fn symbol(&self) -> Option<&'static str> {
        Some(match self {
            Token::Plus => "+",
            Token::Minus => "-",
            Token::Star => "*",
            Token::Slash => "/",
            Token::Percent => "%",
            Token::EqEq => "==",
            Token::NotEq => "!=",
            Token::Lt => "<",
            Token::LtEq => "<=",
            Token::Gt => ">",
            Token::GtEq => ">=",
            Token::Ampersand => "&",
            Token::Pipe => "|",
            Token::Tilde => "~",
            Token::FatArrow => "=>",
            Token::Dot => ".",
            Token::DotDot => "..",
            Token::DotDotDot => "...",
            Token::Comma => ",",
            Token::Colon => ":",
            Token::Semicolon => ";",
            Token::LParen => "(",
            Token::RParen => ")",
            Token::LBracket => "[",
            Token::RBracket => "]",
            Token::LBrace => "{",
            Token::RBrace => "}",
            _ => return None,
        })
    }
}
