//! Lexer for rule expressions.
//!
//! Converts an expression string into a stream of tokens. Word operators and
//! literals (`and`, `or`, `not`, `in`, `contains`, `true`, `false`, `null`) are
//! case-insensitive.

use std::iter::Peekable;
use std::str::Chars;

/// A token in the expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Identifier(String),
    StringLiteral(String),
    IntegerLiteral(i64),

    // Keywords
    And,
    Or,
    Not,
    In,
    Contains,
    True,
    False,
    Null,

    // Operators
    Equal,
    NotEqual,
    LessThan,
    LessThanOrEqual,
    GreaterThan,
    GreaterThanOrEqual,
    Plus,
    Minus,

    // Delimiters
    LeftParen,
    RightParen,
    LeftBracket,
    RightBracket,
    Comma,

    Eof,
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Token::Identifier(s) => write!(f, "identifier '{s}'"),
            Token::StringLiteral(s) => write!(f, "string '{s}'"),
            Token::IntegerLiteral(i) => write!(f, "integer {i}"),
            Token::And => write!(f, "&&"),
            Token::Or => write!(f, "||"),
            Token::Not => write!(f, "!"),
            Token::In => write!(f, "in"),
            Token::Contains => write!(f, "contains"),
            Token::True => write!(f, "true"),
            Token::False => write!(f, "false"),
            Token::Null => write!(f, "null"),
            Token::Equal => write!(f, "=="),
            Token::NotEqual => write!(f, "!="),
            Token::LessThan => write!(f, "<"),
            Token::LessThanOrEqual => write!(f, "<="),
            Token::GreaterThan => write!(f, ">"),
            Token::GreaterThanOrEqual => write!(f, ">="),
            Token::Plus => write!(f, "+"),
            Token::Minus => write!(f, "-"),
            Token::LeftParen => write!(f, "("),
            Token::RightParen => write!(f, ")"),
            Token::LeftBracket => write!(f, "["),
            Token::RightBracket => write!(f, "]"),
            Token::Comma => write!(f, ","),
            Token::Eof => write!(f, "end of input"),
        }
    }
}

/// Error during lexical analysis.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{message} at position {position}")]
pub struct LexerError {
    pub message: String,
    /// Character offset in the input.
    pub position: usize,
}

/// A token together with the offset it starts at.
#[derive(Debug, Clone, PartialEq)]
pub struct Spanned {
    pub token: Token,
    pub position: usize,
}

pub struct Lexer<'a> {
    input: Peekable<Chars<'a>>,
    position: usize,
}

impl<'a> Lexer<'a> {
    #[must_use]
    pub fn new(input: &'a str) -> Self {
        Self {
            input: input.chars().peekable(),
            position: 0,
        }
    }

    /// Get all tokens from the input. The last token is always `Eof`.
    pub fn tokenize(mut self) -> Result<Vec<Spanned>, LexerError> {
        let mut tokens = Vec::new();
        loop {
            self.skip_whitespace();
            let position = self.position;
            let token = self.next_token()?;
            let done = token == Token::Eof;
            tokens.push(Spanned { token, position });
            if done {
                break;
            }
        }
        Ok(tokens)
    }

    fn next_token(&mut self) -> Result<Token, LexerError> {
        let Some(&ch) = self.input.peek() else {
            return Ok(Token::Eof);
        };

        match ch {
            '(' => self.single(Token::LeftParen),
            ')' => self.single(Token::RightParen),
            '[' => self.single(Token::LeftBracket),
            ']' => self.single(Token::RightBracket),
            ',' => self.single(Token::Comma),
            '+' => self.single(Token::Plus),
            '-' => self.single(Token::Minus),
            '=' => {
                self.advance();
                if self.eat('=') {
                    Ok(Token::Equal)
                } else {
                    Err(self.error("Expected '==', found single '='"))
                }
            }
            '!' => {
                self.advance();
                if self.eat('=') {
                    Ok(Token::NotEqual)
                } else {
                    Ok(Token::Not)
                }
            }
            '<' => {
                self.advance();
                if self.eat('=') {
                    Ok(Token::LessThanOrEqual)
                } else {
                    Ok(Token::LessThan)
                }
            }
            '>' => {
                self.advance();
                if self.eat('=') {
                    Ok(Token::GreaterThanOrEqual)
                } else {
                    Ok(Token::GreaterThan)
                }
            }
            '&' => {
                self.advance();
                if self.eat('&') {
                    Ok(Token::And)
                } else {
                    Err(self.error("Expected '&&'"))
                }
            }
            '|' => {
                self.advance();
                if self.eat('|') {
                    Ok(Token::Or)
                } else {
                    Err(self.error("Expected '||'"))
                }
            }
            '\'' | '"' => self.read_string(),
            c if c.is_ascii_digit() => self.read_number(),
            c if c.is_ascii_alphabetic() || c == '_' => Ok(self.read_identifier()),
            _ => Err(self.error(&format!("Unexpected character '{ch}'"))),
        }
    }

    fn single(&mut self, token: Token) -> Result<Token, LexerError> {
        self.advance();
        Ok(token)
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.input.next();
        if ch.is_some() {
            self.position += 1;
        }
        ch
    }

    fn eat(&mut self, expected: char) -> bool {
        if self.input.peek() == Some(&expected) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn error(&self, message: &str) -> LexerError {
        LexerError {
            message: message.to_string(),
            position: self.position,
        }
    }

    fn skip_whitespace(&mut self) {
        while let Some(&ch) = self.input.peek() {
            if ch.is_whitespace() {
                self.advance();
            } else {
                break;
            }
        }
    }

    fn read_string(&mut self) -> Result<Token, LexerError> {
        let start_pos = self.position;
        let Some(quote) = self.advance() else {
            return Err(self.error("Expected string literal"));
        };
        let mut value = String::new();

        loop {
            match self.advance() {
                Some(ch) if ch == quote => break,
                Some('\\') => match self.advance() {
                    Some('n') => value.push('\n'),
                    Some('t') => value.push('\t'),
                    Some('r') => value.push('\r'),
                    Some('\\') => value.push('\\'),
                    Some('\'') => value.push('\''),
                    Some('"') => value.push('"'),
                    Some(c) => {
                        value.push('\\');
                        value.push(c);
                    }
                    None => {
                        return Err(LexerError {
                            message: "Unterminated string literal".to_string(),
                            position: start_pos,
                        });
                    }
                },
                Some(ch) => value.push(ch),
                None => {
                    return Err(LexerError {
                        message: "Unterminated string literal".to_string(),
                        position: start_pos,
                    });
                }
            }
        }

        Ok(Token::StringLiteral(value))
    }

    fn read_number(&mut self) -> Result<Token, LexerError> {
        let start_pos = self.position;
        let mut value = String::new();

        while let Some(&ch) = self.input.peek() {
            if ch.is_ascii_digit() {
                value.push(ch);
                self.advance();
            } else {
                break;
            }
        }

        if matches!(self.input.peek(), Some(c) if c.is_ascii_alphabetic() || *c == '_' || *c == '.')
        {
            return Err(self.error("Invalid number literal"));
        }

        value
            .parse::<i64>()
            .map(Token::IntegerLiteral)
            .map_err(|_| LexerError {
                message: "Integer literal out of range".to_string(),
                position: start_pos,
            })
    }

    fn read_identifier(&mut self) -> Token {
        let mut value = String::new();

        while let Some(&ch) = self.input.peek() {
            if ch.is_ascii_alphanumeric() || ch == '_' {
                value.push(ch);
                self.advance();
            } else {
                break;
            }
        }

        match value.to_ascii_lowercase().as_str() {
            "and" => Token::And,
            "or" => Token::Or,
            "not" => Token::Not,
            "in" => Token::In,
            "contains" => Token::Contains,
            "true" => Token::True,
            "false" => Token::False,
            "null" => Token::Null,
            _ => Token::Identifier(value),
        }
    }
}
