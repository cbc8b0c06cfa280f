//! Rule expression parser.
//!
//! Recursive descent over the infix grammar:
//!
//! ```text
//! expr        := or_expr
//! or_expr     := and_expr ( "OR" and_expr )*
//! and_expr    := not_expr ( "AND" not_expr )*
//! not_expr    := "NOT" not_expr | compare_expr
//! compare_expr:= add_expr ( ("<"|">"|"<="|">="|"=="|"!=") add_expr )?
//! add_expr    := mul_expr ( ("+"|"-") mul_expr )*
//! mul_expr    := primary ( ("*"|"/") primary )*
//! primary     := "(" expr ")" | NAME "(" args ")" | NAME | number
//! ```
//!
//! Any name and any argument list is accepted here; vocabulary is checked by
//! [`crate::domain::rule_validate::validate`]. Errors carry the byte offset.
//!
//! Nesting is limited to [`MAX_NESTING`] levels and the tree to [`MAX_OPERATORS`]
//! operator and call nodes, which bounds the recursion of every later pass.

use crate::domain::error::ParseError;
use crate::domain::expr::{BinaryOp, Expr};

/// Deepest nesting of parentheses, calls and `NOT`.
pub const MAX_NESTING: usize = 256;
/// Most operator and call nodes in one expression.
pub const MAX_OPERATORS: usize = 1024;

struct Parser<'a> {
    input: &'a str,
    pos: usize,
    depth: usize,
    operators: usize,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            input,
            pos: 0,
            depth: 0,
            operators: 0,
        }
    }

    fn enter(&mut self) -> Result<(), ParseError> {
        self.depth += 1;
        if self.depth > MAX_NESTING {
            return Err(self.error(format!(
                "expression nested deeper than {} levels",
                MAX_NESTING
            )));
        }
        Ok(())
    }

    fn leave(&mut self) {
        self.depth -= 1;
    }

    /// Count one operator or call node.
    fn add_operator(&mut self) -> Result<(), ParseError> {
        self.operators += 1;
        if self.operators > MAX_OPERATORS {
            return Err(self.error(format!(
                "expression has more than {} operators",
                MAX_OPERATORS
            )));
        }
        Ok(())
    }

    fn remaining(&self) -> &'a str {
        &self.input[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.remaining().chars().next()
    }

    fn peek_second(&self) -> Option<char> {
        self.remaining().chars().nth(1)
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += ch.len_utf8();
        Some(ch)
    }

    fn skip_whitespace(&mut self) {
        while let Some(ch) = self.peek() {
            if ch.is_whitespace() {
                self.advance();
            } else {
                break;
            }
        }
    }

    fn error(&self, message: impl Into<String>) -> ParseError {
        ParseError {
            message: message.into(),
            position: self.pos,
        }
    }

    fn expect_char(&mut self, expected: char) -> Result<(), ParseError> {
        self.skip_whitespace();
        match self.peek() {
            Some(ch) if ch == expected => {
                self.advance();
                Ok(())
            }
            Some(_) => Err(self.error(format!(
                "expected '{}', found '{}'",
                expected,
                self.peek_word()
            ))),
            None => Err(self.error(format!("expected '{}', found end of input", expected))),
        }
    }

    fn peek_keyword(&self, keyword: &str) -> bool {
        let remaining = self.remaining();
        remaining.starts_with(keyword)
            && !remaining[keyword.len()..]
                .chars()
                .next()
                .is_some_and(is_name_char)
    }

    fn consume_keyword(&mut self, keyword: &str) -> bool {
        self.skip_whitespace();
        if self.peek_keyword(keyword) {
            self.pos += keyword.len();
            true
        } else {
            false
        }
    }

    fn consume_exact(&mut self, s: &str) -> bool {
        if self.remaining().starts_with(s) {
            self.pos += s.len();
            true
        } else {
            false
        }
    }

    /// The next name-like word, or the next character, for error messages.
    fn peek_word(&self) -> String {
        let word: String = self
            .remaining()
            .chars()
            .take_while(|&c| is_name_char(c))
            .collect();
        if word.is_empty() {
            self.peek()
                .map(|c| c.to_string())
                .unwrap_or_else(|| "end of input".to_string())
        } else {
            word
        }
    }

    fn parse_number(&mut self) -> Result<f64, ParseError> {
        let start = self.pos;
        let mut has_dot = false;
        let mut digits = 0;

        if matches!(self.peek(), Some('-') | Some('+')) {
            self.advance();
        }

        while let Some(ch) = self.peek() {
            if ch.is_ascii_digit() {
                digits += 1;
                self.advance();
            } else if ch == '.' && !has_dot {
                has_dot = true;
                self.advance();
            } else {
                break;
            }
        }

        if digits == 0 {
            return Err(ParseError {
                message: "expected number".to_string(),
                position: start,
            });
        }

        let num_str = &self.input[start..self.pos];
        let value = num_str.parse::<f64>().map_err(|_| ParseError {
            message: format!("invalid number: {}", num_str),
            position: start,
        })?;
        if !value.is_finite() {
            return Err(ParseError {
                message: format!("number out of range: {}", num_str),
                position: start,
            });
        }
        Ok(value)
    }

    fn parse_name(&mut self) -> String {
        let start = self.pos;
        while self.peek().is_some_and(is_name_char) {
            self.advance();
        }
        self.input[start..self.pos].to_string()
    }

    fn parse_args(&mut self) -> Result<Vec<Expr>, ParseError> {
        self.expect_char('(')?;
        let mut args = Vec::new();

        self.skip_whitespace();
        if self.peek() == Some(')') {
            self.advance();
            return Ok(args);
        }

        self.enter()?;

        args.push(self.parse_or()?);
        loop {
            self.skip_whitespace();
            if self.peek() == Some(')') {
                self.advance();
                break;
            }
            self.expect_char(',')?;
            args.push(self.parse_or()?);
        }
        self.leave();
        Ok(args)
    }

    fn parse_primary(&mut self) -> Result<Expr, ParseError> {
        self.skip_whitespace();

        match self.peek() {
            Some('(') => {
                self.advance();
                self.enter()?;
                let inner = self.parse_or()?;
                self.expect_char(')')?;
                self.leave();
                Ok(inner)
            }
            Some(ch) if ch.is_ascii_digit() || ch == '.' => Ok(Expr::Literal(self.parse_number()?)),
            Some('-') | Some('+')
                if self
                    .peek_second()
                    .is_some_and(|c| c.is_ascii_digit() || c == '.') =>
            {
                Ok(Expr::Literal(self.parse_number()?))
            }
            Some(ch) if is_name_start(ch) => {
                if ["AND", "OR", "NOT"].iter().any(|k| self.peek_keyword(k)) {
                    return Err(self.error(format!(
                        "expected operand, found keyword '{}'",
                        self.peek_word()
                    )));
                }
                let name = self.parse_name();
                self.skip_whitespace();
                if self.peek() == Some('(') {
                    self.add_operator()?;
                    let args = self.parse_args()?;
                    Ok(Expr::Call {
                        function: name,
                        args,
                    })
                } else {
                    Ok(Expr::Identifier(name))
                }
            }
            Some(ch) => Err(self.error(format!("expected operand, found '{}'", ch))),
            None => Err(self.error("expected operand, found end of input")),
        }
    }

    fn parse_mul(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_primary()?;
        loop {
            self.skip_whitespace();
            let op = if self.consume_exact("*") {
                BinaryOp::Mul
            } else if self.consume_exact("/") {
                BinaryOp::Div
            } else {
                return Ok(left);
            };
            self.add_operator()?;
            let right = self.parse_primary()?;
            left = Expr::binary(op, left, right);
        }
    }

    fn parse_add(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_mul()?;
        loop {
            self.skip_whitespace();
            let op = if self.consume_exact("+") {
                BinaryOp::Add
            } else if self.consume_exact("-") {
                BinaryOp::Sub
            } else {
                return Ok(left);
            };
            self.add_operator()?;
            let right = self.parse_mul()?;
            left = Expr::binary(op, left, right);
        }
    }

    fn parse_comparison_op(&mut self) -> Result<Option<BinaryOp>, ParseError> {
        self.skip_whitespace();
        let ops = [
            ("<=", BinaryOp::Le),
            (">=", BinaryOp::Ge),
            ("==", BinaryOp::Eq),
            ("!=", BinaryOp::Ne),
            ("<", BinaryOp::Lt),
            (">", BinaryOp::Gt),
        ];
        for (symbol, op) in ops {
            if self.consume_exact(symbol) {
                return Ok(Some(op));
            }
        }
        match self.peek() {
            Some('=') => Err(self.error("unexpected '=', use '==' for equality")),
            Some('!') => Err(self.error("unexpected '!', use '!=' or NOT")),
            _ => Ok(None),
        }
    }

    fn parse_compare(&mut self) -> Result<Expr, ParseError> {
        let left = self.parse_add()?;
        let Some(op) = self.parse_comparison_op()? else {
            return Ok(left);
        };
        self.add_operator()?;
        let right = self.parse_add()?;
        if self.parse_comparison_op()?.is_some() {
            return Err(self.error("comparisons cannot be chained; use AND or parentheses"));
        }
        Ok(Expr::binary(op, left, right))
    }

    fn parse_not(&mut self) -> Result<Expr, ParseError> {
        if self.consume_keyword("NOT") {
            self.add_operator()?;
            self.enter()?;
            let operand = self.parse_not()?;
            self.leave();
            return Ok(Expr::not(operand));
        }
        self.parse_compare()
    }

    fn parse_and(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_not()?;
        while self.consume_keyword("AND") {
            self.add_operator()?;
            let right = self.parse_not()?;
            left = Expr::binary(BinaryOp::And, left, right);
        }
        Ok(left)
    }

    fn parse_or(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_and()?;
        while self.consume_keyword("OR") {
            self.add_operator()?;
            let right = self.parse_and()?;
            left = Expr::binary(BinaryOp::Or, left, right);
        }
        Ok(left)
    }

    fn parse(&mut self) -> Result<Expr, ParseError> {
        self.skip_whitespace();
        if self.peek().is_none() {
            return Err(self.error("empty expression"));
        }
        let expr = self.parse_or()?;
        self.skip_whitespace();
        if self.pos < self.input.len() {
            return Err(self.error(format!(
                "unexpected input after expression: '{}'",
                self.remaining()
            )));
        }
        Ok(expr)
    }
}

fn is_name_start(ch: char) -> bool {
    ch.is_ascii_alphabetic() || ch == '_'
}

fn is_name_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || ch == '_'
}

pub fn parse(input: &str) -> Result<Expr, ParseError> {
    let mut parser = Parser::new(input);
    parser.parse()
}
