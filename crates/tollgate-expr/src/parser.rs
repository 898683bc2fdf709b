//! Recursive descent parser for rule expressions.
//!
//! Precedence, lowest first: `||`, `&&`, `==` `!=`, `<` `<=` `>` `>=` `in` `contains`,
//! `+`, unary `!` `-`, postfix indexing.
//!
//! Nesting is bounded by [`MAX_NESTING`]: every parenthesis, list, call argument,
//! unary operator and chained binary or index operator counts one level.

use regex::Regex;

use crate::ast::{BinaryOp, Expr, Function, Pattern, UnaryOp, Variable};
use crate::lexer::{Lexer, LexerError, Spanned, Token};
use crate::value::Value;

/// Error while compiling an expression.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{message} at position {position}")]
pub struct ParseError {
    pub message: String,
    pub position: usize,
}

impl From<LexerError> for ParseError {
    fn from(err: LexerError) -> Self {
        ParseError {
            message: err.message,
            position: err.position,
        }
    }
}

/// Deepest sub-expression nesting accepted by the parser.
pub const MAX_NESTING: usize = 128;

pub struct Parser {
    tokens: Vec<Spanned>,
    position: usize,
    depth: usize,
}

impl Parser {
    /// Parse an expression string, resolving variables and functions.
    pub fn parse(input: &str) -> Result<Expr, ParseError> {
        let tokens = Lexer::new(input).tokenize()?;
        let mut parser = Parser {
            tokens,
            position: 0,
            depth: 0,
        };

        if parser.is_at_end() {
            return Err(parser.error("Empty expression"));
        }

        let expr = parser.parse_or()?;

        if !parser.is_at_end() {
            return Err(parser.error(&format!(
                "Unexpected token after expression: {}",
                parser.current_token()
            )));
        }

        Ok(expr)
    }

    fn parse_or(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_and()?;
        let mut chained = 0;
        while self.match_token(&Token::Or) {
            self.chain(&mut chained)?;
            let right = self.parse_and()?;
            left = Expr::Binary(BinaryOp::Or, Box::new(left), Box::new(right));
        }
        self.depth -= chained;
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_equality()?;
        let mut chained = 0;
        while self.match_token(&Token::And) {
            self.chain(&mut chained)?;
            let right = self.parse_equality()?;
            left = Expr::Binary(BinaryOp::And, Box::new(left), Box::new(right));
        }
        self.depth -= chained;
        Ok(left)
    }

    fn parse_equality(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_relational()?;
        let mut chained = 0;
        loop {
            let op = match self.current_token() {
                Token::Equal => BinaryOp::Equal,
                Token::NotEqual => BinaryOp::NotEqual,
                _ => break,
            };
            self.advance();
            self.chain(&mut chained)?;
            let right = self.parse_relational()?;
            left = Expr::Binary(op, Box::new(left), Box::new(right));
        }
        self.depth -= chained;
        Ok(left)
    }

    fn parse_relational(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_additive()?;
        let mut chained = 0;
        loop {
            let op = match self.current_token() {
                Token::LessThan => BinaryOp::LessThan,
                Token::LessThanOrEqual => BinaryOp::LessThanOrEqual,
                Token::GreaterThan => BinaryOp::GreaterThan,
                Token::GreaterThanOrEqual => BinaryOp::GreaterThanOrEqual,
                Token::In => BinaryOp::In,
                Token::Contains => BinaryOp::Contains,
                _ => break,
            };
            self.advance();
            self.chain(&mut chained)?;
            let right = self.parse_additive()?;
            left = Expr::Binary(op, Box::new(left), Box::new(right));
        }
        self.depth -= chained;
        Ok(left)
    }

    fn parse_additive(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_unary()?;
        let mut chained = 0;
        while self.match_token(&Token::Plus) {
            self.chain(&mut chained)?;
            let right = self.parse_unary()?;
            left = Expr::Binary(BinaryOp::Add, Box::new(left), Box::new(right));
        }
        self.depth -= chained;
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expr, ParseError> {
        self.enter()?;
        let expr = self.parse_unary_operand();
        self.depth -= 1;
        expr
    }

    fn parse_unary_operand(&mut self) -> Result<Expr, ParseError> {
        if self.match_token(&Token::Not) {
            let inner = self.parse_unary()?;
            return Ok(Expr::Unary(UnaryOp::Not, Box::new(inner)));
        }
        if self.match_token(&Token::Minus) {
            let inner = self.parse_unary()?;
            return Ok(match inner {
                Expr::Literal(Value::Int(i)) => Expr::Literal(Value::Int(-i)),
                other => Expr::Unary(UnaryOp::Negate, Box::new(other)),
            });
        }
        self.parse_postfix()
    }

    fn parse_postfix(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.parse_primary()?;
        let mut chained = 0;
        while self.match_token(&Token::LeftBracket) {
            self.chain(&mut chained)?;
            let index = self.parse_or()?;
            self.expect_token(&Token::RightBracket)?;
            expr = Expr::Index(Box::new(expr), Box::new(index));
        }
        self.depth -= chained;
        Ok(expr)
    }

    fn parse_primary(&mut self) -> Result<Expr, ParseError> {
        let token = self.current_token().clone();
        match token {
            Token::True => {
                self.advance();
                Ok(Expr::Literal(Value::Bool(true)))
            }
            Token::False => {
                self.advance();
                Ok(Expr::Literal(Value::Bool(false)))
            }
            Token::Null => {
                self.advance();
                Ok(Expr::Literal(Value::Null))
            }
            Token::StringLiteral(s) => {
                self.advance();
                Ok(Expr::Literal(Value::Str(s)))
            }
            Token::IntegerLiteral(i) => {
                self.advance();
                Ok(Expr::Literal(Value::Int(i)))
            }
            Token::LeftParen => {
                self.advance();
                let expr = self.parse_or()?;
                self.expect_token(&Token::RightParen)?;
                Ok(expr)
            }
            Token::LeftBracket => {
                self.advance();
                let items = self.parse_list(&Token::RightBracket)?;
                Ok(Expr::List(items))
            }
            Token::Contains if self.peek_token() == &Token::LeftParen => {
                self.advance();
                self.parse_call(Function::Contains)
            }
            Token::Identifier(name) => {
                let start = self.current_position();
                self.advance();
                if self.check(&Token::LeftParen) {
                    let function = Function::from_name(&name).ok_or_else(|| ParseError {
                        message: format!("Unknown function '{name}'"),
                        position: start,
                    })?;
                    self.parse_call(function)
                } else {
                    let variable = Variable::from_name(&name).ok_or_else(|| ParseError {
                        message: format!("Unknown variable '{name}'"),
                        position: start,
                    })?;
                    Ok(Expr::Variable(variable))
                }
            }
            other => Err(self.error(&format!("Unexpected {other}"))),
        }
    }

    /// Parses `( args )` for a function whose name was already consumed.
    fn parse_call(&mut self, function: Function) -> Result<Expr, ParseError> {
        let start = self.current_position();
        self.expect_token(&Token::LeftParen)?;
        let mut args = self.parse_list(&Token::RightParen)?;

        if args.len() != function.arity() {
            return Err(ParseError {
                message: format!(
                    "Function '{}' expects {} argument(s), got {}",
                    function.name(),
                    function.arity(),
                    args.len()
                ),
                position: start,
            });
        }

        if function == Function::Matches {
            let pattern = match args.pop() {
                Some(Expr::Literal(Value::Str(p))) => p,
                _ => {
                    return Err(ParseError {
                        message: "Second argument of 'matches' must be a string literal"
                            .to_string(),
                        position: start,
                    });
                }
            };
            let regex = Regex::new(&pattern).map_err(|e| ParseError {
                message: format!("Invalid pattern '{pattern}': {e}"),
                position: start,
            })?;
            let subject = args.pop().ok_or_else(|| self.error("Missing subject"))?;
            return Ok(Expr::Matches(Box::new(subject), Pattern(regex)));
        }

        Ok(Expr::Call(function, args))
    }

    /// Comma-separated expressions up to and including `close`.
    fn parse_list(&mut self, close: &Token) -> Result<Vec<Expr>, ParseError> {
        let mut items = Vec::new();
        if self.match_token(close) {
            return Ok(items);
        }
        loop {
            items.push(self.parse_or()?);
            if !self.match_token(&Token::Comma) {
                break;
            }
        }
        self.expect_token(close)?;
        Ok(items)
    }

    fn enter(&mut self) -> Result<(), ParseError> {
        if self.depth >= MAX_NESTING {
            return Err(self.error(&format!(
                "Expression nested deeper than {MAX_NESTING} levels"
            )));
        }
        self.depth += 1;
        Ok(())
    }

    /// One more operator in a left-associative chain; undone by the caller.
    fn chain(&mut self, chained: &mut usize) -> Result<(), ParseError> {
        self.enter()?;
        *chained += 1;
        Ok(())
    }

    fn current_token(&self) -> &Token {
        self.tokens
            .get(self.position)
            .map(|s| &s.token)
            .unwrap_or(&Token::Eof)
    }

    fn peek_token(&self) -> &Token {
        self.tokens
            .get(self.position + 1)
            .map(|s| &s.token)
            .unwrap_or(&Token::Eof)
    }

    fn current_position(&self) -> usize {
        self.tokens
            .get(self.position)
            .or_else(|| self.tokens.last())
            .map(|s| s.position)
            .unwrap_or(0)
    }

    fn is_at_end(&self) -> bool {
        matches!(self.current_token(), Token::Eof)
    }

    fn advance(&mut self) {
        if !self.is_at_end() {
            self.position += 1;
        }
    }

    fn check(&self, token: &Token) -> bool {
        self.current_token() == token
    }

    fn match_token(&mut self, token: &Token) -> bool {
        if self.check(token) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect_token(&mut self, token: &Token) -> Result<(), ParseError> {
        if self.match_token(token) {
            Ok(())
        } else {
            Err(self.error(&format!(
                "Expected {}, found {}",
                token,
                self.current_token()
            )))
        }
    }

    fn error(&self, message: &str) -> ParseError {
        ParseError {
            message: message.to_string(),
            position: self.current_position(),
        }
    }
}
