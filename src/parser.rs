use crate::{
    ast::{BinOp, Expr, Token, UnaryOp},
    language::Language,
    lexer::{LexError, Lexer, Position},
};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ParseError {
    #[error(transparent)]
    Lex(#[from] LexError),

    #[error("expected {expected}, found {found} at {position}")]
    Unexpected {
        expected: String,
        found: String,
        position: Position,
    },

    #[error("{message} at {position}")]
    Unsupported { message: String, position: Position },
}

/// Recursive-descent parser for one driver dialect.
///
/// # Examples
///
/// ```
/// use rql_fixtures::{Expr, Language, Parser};
///
/// let expr = Parser::new("arr.append(4)", Language::Python)
///     .and_then(|mut p| p.parse())
///     .unwrap();
/// assert!(matches!(expr, Expr::MethodCall { ref method, .. } if method == "append"));
/// ```
pub struct Parser {
    tokens: Vec<(Token, Position)>,
    index: usize,
    language: Language,
}

fn describe(token: &Token) -> String {
    match token {
        Token::Eof => "end of input".to_string(),
        Token::Identifier(name) => format!("identifier '{}'", name),
        Token::String(s) => format!("string '{}'", s),
        Token::Integer(n) => format!("number {}", n),
        Token::Float(n) => format!("number {}", n),
        Token::Boolean(b) => format!("'{}'", b),
        Token::Null => "null".to_string(),
        Token::Lambda => "'lambda'".to_string(),
        Token::Function => "'function'".to_string(),
        Token::Return => "'return'".to_string(),
        other => format!("'{}'", other.symbol().unwrap_or("?")),
    }
}

impl Parser {
    pub fn new(source: &str, language: Language) -> Result<Self, ParseError> {
        let tokens = Lexer::new(source).tokenize()?;
        Ok(Parser {
            tokens,
            index: 0,
            language,
        })
    }

    pub fn language(&self) -> Language {
        self.language
    }

    fn current(&self) -> &Token {
        self.peek(0)
    }

    fn peek(&self, offset: usize) -> &Token {
        self.tokens
            .get(self.index + offset)
            .or_else(|| self.tokens.last())
            .map(|(token, _)| token)
            .unwrap_or(&Token::Eof)
    }

    fn position(&self) -> Position {
        self.tokens
            .get(self.index)
            .or_else(|| self.tokens.last())
            .map(|(_, position)| *position)
            .unwrap_or_default()
    }

    fn advance(&mut self) -> Token {
        let token = self.current().clone();
        if self.index < self.tokens.len() {
            self.index += 1;
        }
        token
    }

    fn check(&self, token: &Token) -> bool {
        std::mem::discriminant(self.current()) == std::mem::discriminant(token)
    }

    fn expect(&mut self, expected: Token) -> Result<(), ParseError> {
        if !self.check(&expected) {
            return Err(self.unexpected(describe(&expected)));
        }
        self.advance();
        Ok(())
    }

    fn unexpected(&self, expected: impl Into<String>) -> ParseError {
        ParseError::Unexpected {
            expected: expected.into(),
            found: describe(self.current()),
            position: self.position(),
        }
    }

    fn unsupported(&self, message: impl Into<String>) -> ParseError {
        ParseError::Unsupported {
            message: message.into(),
            position: self.position(),
        }
    }

    fn expect_identifier(&mut self) -> Result<String, ParseError> {
        match self.current() {
            Token::Identifier(name) => {
                let name = name.clone();
                self.advance();
                Ok(name)
            }
            _ => Err(self.unexpected("identifier")),
        }
    }

    /// The JavaScript driver has no operator overloading.
    fn allow_operator(&self) -> Result<(), ParseError> {
        if self.language == Language::JavaScript {
            let symbol = self.current().symbol().unwrap_or("?");
            return Err(self.unsupported(format!(
                "operator '{}' is not available in javascript; use the method form",
                symbol
            )));
        }
        Ok(())
    }

    /// Parses a complete expression; trailing input is an error.
    pub fn parse(&mut self) -> Result<Expr, ParseError> {
        let expr = self.parse_expression()?;
        self.expect(Token::Eof)?;
        Ok(expr)
    }

    pub fn parse_expression(&mut self) -> Result<Expr, ParseError> {
        self.parse_or()
    }

    fn parse_or(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_and()?;

        while self.check(&Token::Pipe) {
            self.allow_operator()?;
            self.advance();
            let right = self.parse_and()?;
            left = Expr::BinaryOp {
                op: BinOp::Or,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_comparison()?;

        while self.check(&Token::Ampersand) {
            self.allow_operator()?;
            self.advance();
            let right = self.parse_comparison()?;
            left = Expr::BinaryOp {
                op: BinOp::And,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_comparison(&mut self) -> Result<Expr, ParseError> {
        let left = self.parse_additive()?;

        let op = match self.current() {
            Token::EqEq => BinOp::Eq,
            Token::NotEq => BinOp::Ne,
            Token::Lt => BinOp::Lt,
            Token::LtEq => BinOp::Le,
            Token::Gt => BinOp::Gt,
            Token::GtEq => BinOp::Ge,
            _ => return Ok(left),
        };
        self.allow_operator()?;
        self.advance();
        let right = self.parse_additive()?;

        Ok(Expr::BinaryOp {
            op,
            left: Box::new(left),
            right: Box::new(right),
        })
    }

    fn parse_additive(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_multiplicative()?;

        loop {
            let op = match self.current() {
                Token::Plus => BinOp::Add,
                Token::Minus => BinOp::Sub,
                _ => break,
            };
            self.allow_operator()?;
            self.advance();
            let right = self.parse_multiplicative()?;

            left = Expr::BinaryOp {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_multiplicative(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_unary()?;

        loop {
            let op = match self.current() {
                Token::Star => BinOp::Mul,
                Token::Slash => BinOp::Div,
                Token::Percent => BinOp::Mod,
                _ => break,
            };
            self.allow_operator()?;
            self.advance();
            let right = self.parse_unary()?;

            left = Expr::BinaryOp {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expr, ParseError> {
        match self.current() {
            Token::Minus => {
                // Negative literals are plain numbers in every dialect
                match self.peek(1).clone() {
                    Token::Integer(n) => {
                        self.advance();
                        self.advance();
                        self.parse_postfix(Expr::Integer(-n))
                    }
                    Token::Float(n) => {
                        self.advance();
                        self.advance();
                        self.parse_postfix(Expr::Float(-n))
                    }
                    _ => {
                        self.allow_operator()?;
                        self.advance();
                        let operand = self.parse_unary()?;
                        Ok(Expr::UnaryOp {
                            op: UnaryOp::Neg,
                            operand: Box::new(operand),
                        })
                    }
                }
            }
            Token::Tilde => {
                self.allow_operator()?;
                self.advance();
                let operand = self.parse_unary()?;
                Ok(Expr::UnaryOp {
                    op: UnaryOp::Not,
                    operand: Box::new(operand),
                })
            }
            _ => {
                let primary = self.parse_primary()?;
                self.parse_postfix(primary)
            }
        }
    }

    /// Method calls, bracket access and calls, applied left to right.
    fn parse_postfix(&mut self, mut expr: Expr) -> Result<Expr, ParseError> {
        loop {
            match self.current() {
                Token::Dot => {
                    self.advance();
                    let method = self.expect_identifier()?;

                    if expr == Expr::Driver && method == "row" {
                        expr = Expr::ImplicitVar;
                        continue;
                    }

                    let mut args = if self.check(&Token::LParen) {
                        self.advance();
                        self.parse_list(Token::RParen)?
                    } else if self.language == Language::Ruby {
                        Vec::new()
                    } else {
                        return Err(self.unexpected(format!("'(' after method name '{}'", method)));
                    };

                    if self.at_ruby_block() {
                        args.push(self.parse_ruby_block()?);
                    }

                    expr = Expr::MethodCall {
                        object: Box::new(expr),
                        method,
                        args,
                    };
                }
                Token::LBracket => {
                    if self.language == Language::JavaScript {
                        return Err(self.unsupported(
                            "bracket access is not available in javascript; use x(...)",
                        ));
                    }
                    self.advance();
                    expr = self.parse_bracket(expr)?;
                }
                Token::LParen => {
                    if self.language != Language::JavaScript && !matches!(expr, Expr::Name(_)) {
                        return Err(self.unsupported(format!(
                            "calling a value is only available in javascript, not {}",
                            self.language.name()
                        )));
                    }
                    self.advance();
                    let args = self.parse_list(Token::RParen)?;
                    expr = match expr {
                        Expr::Driver => Expr::MethodCall {
                            object: Box::new(Expr::Driver),
                            method: "expr".to_string(),
                            args,
                        },
                        callee => Expr::Call {
                            callee: Box::new(callee),
                            args,
                        },
                    };
                }
                _ => return Ok(expr),
            }
        }
    }

    /// Body of `x[...]` after the opening bracket.
    fn parse_bracket(&mut self, object: Expr) -> Result<Expr, ParseError> {
        let object = Box::new(object);

        let result = match self.language {
            Language::Python => {
                let start = if self.check(&Token::Colon) {
                    None
                } else {
                    Some(Box::new(self.parse_expression()?))
                };
                if self.check(&Token::Colon) {
                    self.advance();
                    let end = if self.check(&Token::RBracket) {
                        None
                    } else {
                        Some(Box::new(self.parse_expression()?))
                    };
                    Expr::Slice {
                        object,
                        start,
                        end,
                        closed: false,
                    }
                } else {
                    match start {
                        Some(index) => Expr::Index { object, index },
                        None => return Err(self.unexpected("index or slice")),
                    }
                }
            }
            _ => {
                let parenthesized = self.check(&Token::LParen) && self.range_in_parens();
                if parenthesized {
                    self.advance();
                }
                let first = self.parse_expression()?;
                let closed = match self.current() {
                    Token::DotDot => Some(true),
                    Token::DotDotDot => Some(false),
                    _ => None,
                };
                let result = match closed {
                    Some(closed) => {
                        self.advance();
                        let end = if self.check(&Token::RBracket) || self.check(&Token::RParen) {
                            None
                        } else {
                            Some(Box::new(self.parse_expression()?))
                        };
                        Expr::Slice {
                            object,
                            start: Some(Box::new(first)),
                            end,
                            closed,
                        }
                    }
                    None => Expr::Index {
                        object,
                        index: Box::new(first),
                    },
                };
                if parenthesized {
                    self.expect(Token::RParen)?;
                }
                result
            }
        };

        self.expect(Token::RBracket)?;
        Ok(result)
    }

    /// Whether the parenthesised group starting here holds a Ruby range,
    /// as in `arr[(1..-1)]`.
    fn range_in_parens(&self) -> bool {
        let mut depth = 0usize;
        for (token, _) in &self.tokens[self.index..] {
            match token {
                Token::LParen | Token::LBracket | Token::LBrace => depth += 1,
                Token::RParen | Token::RBracket | Token::RBrace => {
                    depth = depth.saturating_sub(1);
                    if depth == 0 {
                        return false;
                    }
                }
                Token::DotDot | Token::DotDotDot if depth == 1 => return true,
                Token::Eof => return false,
                _ => {}
            }
        }
        false
    }

    fn at_ruby_block(&self) -> bool {
        self.language == Language::Ruby
            && self.check(&Token::LBrace)
            && self.peek(1) == &Token::Pipe
    }

    /// `{|a, b| body}`
    fn parse_ruby_block(&mut self) -> Result<Expr, ParseError> {
        self.expect(Token::LBrace)?;
        self.expect(Token::Pipe)?;
        let mut params = Vec::new();
        while !self.check(&Token::Pipe) {
            params.push(self.expect_identifier()?);
            if !self.check(&Token::Pipe) {
                self.expect(Token::Comma)?;
            }
        }
        self.advance();
        let body = self.parse_expression()?;
        self.expect(Token::RBrace)?;
        Ok(Expr::Lambda {
            params,
            body: Box::new(body),
        })
    }

    /// Comma separated expressions up to `close`; a trailing comma is allowed.
    fn parse_list(&mut self, close: Token) -> Result<Vec<Expr>, ParseError> {
        let mut items = Vec::new();
        while !self.check(&close) {
            items.push(self.parse_expression()?);
            if !self.check(&close) {
                self.expect(Token::Comma)?;
            }
        }
        self.advance();
        Ok(items)
    }

    fn parse_primary(&mut self) -> Result<Expr, ParseError> {
        match self.current().clone() {
            Token::Integer(n) => {
                self.advance();
                Ok(Expr::Integer(n))
            }
            Token::Float(n) => {
                self.advance();
                Ok(Expr::Float(n))
            }
            Token::String(s) => {
                self.advance();
                Ok(Expr::String(s))
            }
            Token::Boolean(b) => {
                self.advance();
                Ok(Expr::Boolean(b))
            }
            Token::Null => {
                self.advance();
                Ok(Expr::Null)
            }
            Token::Identifier(name) => {
                self.advance();
                Ok(if name == "r" { Expr::Driver } else { Expr::Name(name) })
            }
            Token::LBracket => {
                self.advance();
                Ok(Expr::Array(self.parse_list(Token::RBracket)?))
            }
            Token::LBrace if self.at_ruby_block() => self.parse_ruby_block(),
            Token::LBrace => {
                self.advance();
                self.parse_object_literal()
            }
            Token::LParen => {
                self.advance();
                let expr = self.parse_expression()?;
                self.expect(Token::RParen)?;
                Ok(expr)
            }
            Token::Lambda => self.parse_python_lambda(),
            Token::Function => self.parse_js_function(),
            _ => Err(self.unexpected("expression")),
        }
    }

    fn parse_object_literal(&mut self) -> Result<Expr, ParseError> {
        let mut pairs = vec![];

        while !self.check(&Token::RBrace) {
            let key = match self.current().clone() {
                Token::String(s) => s,
                Token::Identifier(s) => s,
                _ => return Err(self.unexpected("string or identifier as object key")),
            };
            self.advance();

            match self.current() {
                Token::Colon => {
                    self.advance();
                }
                Token::FatArrow if self.language == Language::Ruby => {
                    self.advance();
                }
                _ => return Err(self.unexpected("':' after object key")),
            }

            let value = self.parse_expression()?;
            pairs.push((key, value));

            if !self.check(&Token::RBrace) {
                self.expect(Token::Comma)?;
            }
        }

        self.advance();
        Ok(Expr::Object(pairs))
    }

    /// `lambda a, b: body`
    fn parse_python_lambda(&mut self) -> Result<Expr, ParseError> {
        if self.language != Language::Python {
            return Err(self.unsupported(format!(
                "'lambda' is python syntax, not {}",
                self.language.name()
            )));
        }
        self.advance();

        let mut params = Vec::new();
        while !self.check(&Token::Colon) {
            params.push(self.expect_identifier()?);
            if !self.check(&Token::Colon) {
                self.expect(Token::Comma)?;
            }
        }
        self.advance();

        let body = self.parse_expression()?;
        Ok(Expr::Lambda {
            params,
            body: Box::new(body),
        })
    }

    /// `function(a, b) { return body; }`
    fn parse_js_function(&mut self) -> Result<Expr, ParseError> {
        if self.language != Language::JavaScript {
            return Err(self.unsupported(format!(
                "'function' is javascript syntax, not {}",
                self.language.name()
            )));
        }
        self.advance();
        self.expect(Token::LParen)?;

        let mut params = Vec::new();
        while !self.check(&Token::RParen) {
            params.push(self.expect_identifier()?);
            if !self.check(&Token::RParen) {
                self.expect(Token::Comma)?;
            }
        }
        self.advance();

        self.expect(Token::LBrace)?;
        if self.check(&Token::Return) {
            self.advance();
        }
        let body = self.parse_expression()?;
        if self.check(&Token::Semicolon) {
            self.advance();
        }
        self.expect(Token::RBrace)?;

        Ok(Expr::Lambda {
            params,
            body: Box::new(body),
        })
    }
}

/// Parses `source` as one complete expression in `language`.
pub fn parse_expression(source: &str, language: Language) -> Result<Expr, ParseError> {
    Parser::new(source, language)?.parse()
}
