use std::fmt;

use crate::ast::Token;

/// Offset into the source expression, counted in characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Position {
    pub offset: usize,
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "position {}", self.offset)
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{message} at {position}")]
pub struct LexError {
    pub message: String,
    pub position: Position,
}

pub struct Lexer {
    input: Vec<char>,
    position: usize,
}

impl Lexer {
    pub fn new(input: &str) -> Self {
        Lexer {
            input: input.chars().collect(),
            position: 0,
        }
    }

    /// Offset of the next unread character.
    pub fn position(&self) -> Position {
        Position {
            offset: self.position,
        }
    }

    fn current_char(&self) -> Option<char> {
        self.input.get(self.position).copied()
    }

    fn peek_char(&self, offset: usize) -> Option<char> {
        self.input.get(self.position + offset).copied()
    }

    fn advance(&mut self) {
        self.position += 1;
    }

    fn error(&self, message: impl Into<String>) -> LexError {
        LexError {
            message: message.into(),
            position: self.position(),
        }
    }

    fn skip_whitespace(&mut self) {
        while let Some(ch) = self.current_char() {
            if ch.is_whitespace() {
                self.advance();
            } else {
                break;
            }
        }
    }

    fn read_identifier(&mut self) -> String {
        let mut result = String::new();
        while let Some(ch) = self.current_char() {
            if ch.is_alphanumeric() || ch == '_' {
                result.push(ch);
                self.advance();
            } else {
                break;
            }
        }
        result
    }

    fn read_string(&mut self, quote: char) -> Result<String, LexError> {
        let start = self.position();
        let mut result = String::new();
        self.advance(); // opening quote

        while let Some(ch) = self.current_char() {
            match ch {
                c if c == quote => {
                    self.advance();
                    return Ok(result);
                }
                '\\' => {
                    self.advance();
                    match self.current_char() {
                        Some('n') => result.push('\n'),
                        Some('t') => result.push('\t'),
                        Some('r') => result.push('\r'),
                        Some('"') => result.push('"'),
                        Some('\'') => result.push('\''),
                        Some('\\') => result.push('\\'),
                        Some(ch) => return Err(self.error(format!("invalid escape sequence '\\{}'", ch))),
                        None => break,
                    }
                    self.advance();
                }
                _ => {
                    result.push(ch);
                    self.advance();
                }
            }
        }

        Err(LexError {
            message: "unterminated string".to_string(),
            position: start,
        })
    }

    fn read_number(&mut self) -> Result<Token, LexError> {
        let start = self.position();
        let mut number = String::new();
        let mut is_float = false;

        while let Some(ch) = self.current_char() {
            if ch.is_ascii_digit() {
                number.push(ch);
                self.advance();
            } else if ch == '.'
                && !is_float
                && self.peek_char(1).is_some_and(|c| c.is_ascii_digit())
            {
                is_float = true;
                number.push(ch);
                self.advance();
            } else if (ch == 'e' || ch == 'E')
                && self
                    .peek_char(1)
                    .is_some_and(|c| c.is_ascii_digit() || c == '-' || c == '+')
            {
                is_float = true;
                number.push(ch);
                self.advance();
                if let Some(sign) = self.current_char().filter(|c| *c == '-' || *c == '+') {
                    number.push(sign);
                    self.advance();
                }
            } else {
                break;
            }
        }

        let invalid = || LexError {
            message: format!("invalid number '{}'", number),
            position: start,
        };
        if is_float {
            number.parse::<f64>().map(Token::Float).map_err(|_| invalid())
        } else {
            number.parse::<i64>().map(Token::Integer).map_err(|_| invalid())
        }
    }

    /// Consumes the current character and returns `token`.
    fn single(&mut self, token: Token) -> Result<Token, LexError> {
        self.advance();
        Ok(token)
    }

    /// Picks `double` when the next character is `second`, else `single`.
    fn either(&mut self, second: char, double: Token, single: Token) -> Result<Token, LexError> {
        if self.peek_char(1) == Some(second) {
            self.advance();
            self.advance();
            Ok(double)
        } else {
            self.single(single)
        }
    }

    pub fn next_token(&mut self) -> Result<Token, LexError> {
        self.skip_whitespace();

        match self.current_char() {
            None => Ok(Token::Eof),
            Some('.') => {
                if self.peek_char(1) == Some('.') {
                    if self.peek_char(2) == Some('.') {
                        self.position += 3;
                        Ok(Token::DotDotDot)
                    } else {
                        self.position += 2;
                        Ok(Token::DotDot)
                    }
                } else {
                    self.single(Token::Dot)
                }
            }
            Some(',') => self.single(Token::Comma),
            Some(':') => self.single(Token::Colon),
            Some(';') => self.single(Token::Semicolon),
            Some('+') => self.single(Token::Plus),
            Some('-') => self.single(Token::Minus),
            Some('*') => self.single(Token::Star),
            Some('/') => self.single(Token::Slash),
            Some('%') => self.single(Token::Percent),
            Some('~') => self.single(Token::Tilde),
            Some('&') => self.either('&', Token::Ampersand, Token::Ampersand),
            Some('|') => self.either('|', Token::Pipe, Token::Pipe),
            Some('=') => match self.peek_char(1) {
                Some('=') => self.either('=', Token::EqEq, Token::EqEq),
                Some('>') => self.either('>', Token::FatArrow, Token::FatArrow),
                _ => Err(self.error("unexpected '=' (did you mean '=='?)")),
            },
            Some('!') => {
                if self.peek_char(1) == Some('=') {
                    self.either('=', Token::NotEq, Token::NotEq)
                } else {
                    Err(self.error("unexpected '!' (did you mean '!=' or '.not()'?)"))
                }
            }
            Some('<') => self.either('=', Token::LtEq, Token::Lt),
            Some('>') => self.either('=', Token::GtEq, Token::Gt),
            Some('(') => self.single(Token::LParen),
            Some(')') => self.single(Token::RParen),
            Some('[') => self.single(Token::LBracket),
            Some(']') => self.single(Token::RBracket),
            Some('{') => self.single(Token::LBrace),
            Some('}') => self.single(Token::RBrace),
            Some('"') => self.read_string('"').map(Token::String),
            Some('\'') => self.read_string('\'').map(Token::String),
            Some(ch) if ch.is_alphabetic() || ch == '_' => {
                let ident = self.read_identifier();

                Ok(match ident.as_str() {
                    "true" | "True" => Token::Boolean(true),
                    "false" | "False" => Token::Boolean(false),
                    "null" | "None" | "nil" => Token::Null,
                    "lambda" => Token::Lambda,
                    "function" => Token::Function,
                    "return" => Token::Return,
                    _ => Token::Identifier(ident),
                })
            }
            Some(ch) if ch.is_ascii_digit() => self.read_number(),
            Some(ch) => Err(self.error(format!("unexpected character '{}'", ch))),
        }
    }

    /// Lexes the whole input, `Eof` included, pairing each token with
    /// the offset it starts at.
    pub fn tokenize(mut self) -> Result<Vec<(Token, Position)>, LexError> {
        let mut tokens = Vec::new();
        loop {
            self.skip_whitespace();
            let position = self.position();
            let token = self.next_token()?;
            let done = token == Token::Eof;
            tokens.push((token, position));
            if done {
                return Ok(tokens);
            }
        }
    }
}

#[test]
fn test_keywords() {
    let mut lexer = Lexer::new("true False None nil lambda function return");
    assert_eq!(lexer.next_token(), Ok(Token::Boolean(true)));
    assert_eq!(lexer.next_token(), Ok(Token::Boolean(false)));
    assert_eq!(lexer.next_token(), Ok(Token::Null));
    assert_eq!(lexer.next_token(), Ok(Token::Null));
    assert_eq!(lexer.next_token(), Ok(Token::Lambda));
    assert_eq!(lexer.next_token(), Ok(Token::Function));
    assert_eq!(lexer.next_token(), Ok(Token::Return));
    assert_eq!(lexer.next_token(), Ok(Token::Eof));
}

#[test]
fn test_ruby_range() {
    let tokens: Vec<Token> = Lexer::new("arr[1..-1]")
        .tokenize()
        .unwrap()
        .into_iter()
        .map(|(token, _)| token)
        .collect();
    assert_eq!(
        tokens,
        vec![
            Token::Identifier("arr".to_string()),
            Token::LBracket,
            Token::Integer(1),
            Token::DotDot,
            Token::Minus,
            Token::Integer(1),
            Token::RBracket,
            Token::Eof,
        ]
    );
}
