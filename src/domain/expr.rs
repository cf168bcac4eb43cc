//! Expression micro-language.
//!
//! Recursive descent parser producing an [`Expr`] AST, evaluated against a
//! [`Scope`]. Identifiers only ever read the scope; the few callable names
//! are pure math helpers, so an expression cannot cause side effects.
//!
//! Precedence, lowest first:
//!
//! ```text
//! ||
//! &&
//! == != === !==
//! < <= > >=
//! + -
//! * / %
//! ! - (unary)
//! literal | identifier | call(args) | ( expr )
//! ```

use crate::domain::error::{ExprError, ParseError};
use crate::domain::scope::Scope;
use crate::domain::value::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Or,
    And,
    Eq,
    Ne,
    StrictEq,
    StrictNe,
    Lt,
    Le,
    Gt,
    Ge,
    Add,
    Sub,
    Mul,
    Div,
    Rem,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    Neg,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Value),
    Ident(String),
    Unary(UnaryOp, Box<Expr>),
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
    Call(String, Vec<Expr>),
}

/// Deepest nesting of parentheses, unary operators and calls.
const MAX_DEPTH: usize = 128;

/// Most binary operators one expression may hold.
const MAX_OPERATORS: usize = 1024;

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

    fn remaining(&self) -> &'a str {
        &self.input[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.remaining().chars().next()
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

    fn error(&self, message: String) -> ParseError {
        ParseError {
            message,
            position: self.pos,
        }
    }

    fn found(&self) -> String {
        self.peek()
            .map(|c| format!("'{}'", c))
            .unwrap_or_else(|| "end of input".to_string())
    }

    fn expect_char(&mut self, expected: char) -> Result<(), ParseError> {
        self.skip_whitespace();
        match self.peek() {
            Some(ch) if ch == expected => {
                self.advance();
                Ok(())
            }
            _ => Err(self.error(format!("expected '{}', found {}", expected, self.found()))),
        }
    }

    /// Consume the first operator in `ops` that matches, longest spelled first.
    fn consume_op(&mut self, ops: &[(&'static str, BinaryOp)]) -> Option<BinaryOp> {
        self.skip_whitespace();
        for (text, op) in ops {
            if self.remaining().starts_with(text) {
                self.pos += text.len();
                return Some(*op);
            }
        }
        None
    }

    fn binary(&mut self, op: BinaryOp, left: Expr, right: Expr) -> Result<Expr, ParseError> {
        self.operators += 1;
        if self.operators > MAX_OPERATORS {
            return Err(self.error("expression has too many operators".to_string()));
        }
        Ok(Expr::Binary(op, Box::new(left), Box::new(right)))
    }

    fn parse_or(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_and()?;
        while let Some(op) = self.consume_op(&[("||", BinaryOp::Or)]) {
            let right = self.parse_and()?;
            left = self.binary(op, left, right)?;
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_equality()?;
        while let Some(op) = self.consume_op(&[("&&", BinaryOp::And)]) {
            let right = self.parse_equality()?;
            left = self.binary(op, left, right)?;
        }
        Ok(left)
    }

    fn parse_equality(&mut self) -> Result<Expr, ParseError> {
        const OPS: &[(&str, BinaryOp)] = &[
            ("===", BinaryOp::StrictEq),
            ("!==", BinaryOp::StrictNe),
            ("==", BinaryOp::Eq),
            ("!=", BinaryOp::Ne),
        ];
        let mut left = self.parse_relational()?;
        while let Some(op) = self.consume_op(OPS) {
            let right = self.parse_relational()?;
            left = self.binary(op, left, right)?;
        }
        Ok(left)
    }

    fn parse_relational(&mut self) -> Result<Expr, ParseError> {
        const OPS: &[(&str, BinaryOp)] = &[
            ("<=", BinaryOp::Le),
            (">=", BinaryOp::Ge),
            ("<", BinaryOp::Lt),
            (">", BinaryOp::Gt),
        ];
        let mut left = self.parse_additive()?;
        while let Some(op) = self.consume_op(OPS) {
            let right = self.parse_additive()?;
            left = self.binary(op, left, right)?;
        }
        Ok(left)
    }

    fn parse_additive(&mut self) -> Result<Expr, ParseError> {
        const OPS: &[(&str, BinaryOp)] = &[("+", BinaryOp::Add), ("-", BinaryOp::Sub)];
        let mut left = self.parse_multiplicative()?;
        while let Some(op) = self.consume_op(OPS) {
            let right = self.parse_multiplicative()?;
            left = self.binary(op, left, right)?;
        }
        Ok(left)
    }

    fn parse_multiplicative(&mut self) -> Result<Expr, ParseError> {
        const OPS: &[(&str, BinaryOp)] = &[
            ("*", BinaryOp::Mul),
            ("/", BinaryOp::Div),
            ("%", BinaryOp::Rem),
        ];
        let mut left = self.parse_unary()?;
        while let Some(op) = self.consume_op(OPS) {
            let right = self.parse_unary()?;
            left = self.binary(op, left, right)?;
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expr, ParseError> {
        if self.depth >= MAX_DEPTH {
            return Err(self.error("expression nested too deeply".to_string()));
        }
        self.depth += 1;
        let result = self.parse_unary_operand();
        self.depth -= 1;
        result
    }

    fn parse_unary_operand(&mut self) -> Result<Expr, ParseError> {
        self.skip_whitespace();
        match self.peek() {
            // `!=` never starts an operand, so a leading `!` is always negation
            Some('!') => {
                self.advance();
                let operand = self.parse_unary()?;
                Ok(Expr::Unary(UnaryOp::Not, Box::new(operand)))
            }
            Some('-') => {
                self.advance();
                let operand = self.parse_unary()?;
                Ok(Expr::Unary(UnaryOp::Neg, Box::new(operand)))
            }
            Some('+') => {
                self.advance();
                let operand = self.parse_unary()?;
                // unary plus is numeric coercion
                Ok(Expr::Binary(
                    BinaryOp::Sub,
                    Box::new(operand),
                    Box::new(Expr::Literal(Value::Number(0.0))),
                ))
            }
            _ => self.parse_primary(),
        }
    }

    fn parse_primary(&mut self) -> Result<Expr, ParseError> {
        self.skip_whitespace();
        match self.peek() {
            Some('(') => {
                self.advance();
                let inner = self.parse_or()?;
                self.expect_char(')')?;
                Ok(inner)
            }
            Some(ch) if ch.is_ascii_digit() || ch == '.' => self.parse_number(),
            Some(quote @ ('"' | '\'')) => self.parse_string(quote),
            Some(ch) if ch.is_alphabetic() || ch == '_' || ch == '$' => self.parse_word(),
            _ => Err(self.error(format!("expected operand, found {}", self.found()))),
        }
    }

    fn parse_number(&mut self) -> Result<Expr, ParseError> {
        let start = self.pos;
        let mut has_dot = false;
        let mut digits = 0;

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

        if matches!(self.peek(), Some('e' | 'E')) {
            let mark = self.pos;
            self.advance();
            if matches!(self.peek(), Some('+' | '-')) {
                self.advance();
            }
            if !matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
                self.pos = mark;
            }
            while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
                self.advance();
            }
        }

        let num_str = &self.input[start..self.pos];
        num_str
            .parse::<f64>()
            .map(|n| Expr::Literal(Value::Number(n)))
            .map_err(|_| ParseError {
                message: format!("invalid number: {}", num_str),
                position: start,
            })
    }

    fn parse_string(&mut self, quote: char) -> Result<Expr, ParseError> {
        let start = self.pos;
        self.advance();
        let mut text = String::new();
        loop {
            match self.advance() {
                Some(ch) if ch == quote => return Ok(Expr::Literal(Value::Str(text))),
                Some('\\') => match self.advance() {
                    Some('n') => text.push('\n'),
                    Some('t') => text.push('\t'),
                    Some(other) => text.push(other),
                    None => break,
                },
                Some(ch) => text.push(ch),
                None => break,
            }
        }
        Err(ParseError {
            message: "unterminated string literal".to_string(),
            position: start,
        })
    }

    fn parse_word(&mut self) -> Result<Expr, ParseError> {
        let start = self.pos;
        while let Some(ch) = self.peek() {
            if ch.is_alphanumeric() || ch == '_' || ch == '$' {
                self.advance();
            } else {
                break;
            }
        }
        let word = &self.input[start..self.pos];

        match word {
            "true" => return Ok(Expr::Literal(Value::Bool(true))),
            "false" => return Ok(Expr::Literal(Value::Bool(false))),
            "null" => return Ok(Expr::Literal(Value::Null)),
            "undefined" => return Ok(Expr::Literal(Value::Undefined)),
            _ => {}
        }

        self.skip_whitespace();
        if self.peek() != Some('(') {
            return Ok(Expr::Ident(word.to_string()));
        }

        self.advance();
        let mut args = Vec::new();
        self.skip_whitespace();
        if self.peek() == Some(')') {
            self.advance();
            return Ok(Expr::Call(word.to_string(), args));
        }
        loop {
            args.push(self.parse_or()?);
            self.skip_whitespace();
            match self.peek() {
                Some(',') => {
                    self.advance();
                }
                Some(')') => {
                    self.advance();
                    break;
                }
                _ => {
                    return Err(self.error(format!(
                        "expected ',' or ')' in call to {}, found {}",
                        word,
                        self.found()
                    )));
                }
            }
        }
        Ok(Expr::Call(word.to_string(), args))
    }

    fn parse(&mut self) -> Result<Expr, ParseError> {
        self.skip_whitespace();
        if self.pos >= self.input.len() {
            return Err(self.error("empty expression".to_string()));
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

pub fn parse(input: &str) -> Result<Expr, ParseError> {
    Parser::new(input).parse()
}

impl Expr {
    pub fn eval(&self, scope: &Scope) -> Result<Value, ExprError> {
        match self {
            Expr::Literal(v) => Ok(v.clone()),
            Expr::Ident(name) => scope
                .get(name)
                .cloned()
                .ok_or_else(|| ExprError::UnknownIdentifier(name.clone())),
            Expr::Unary(UnaryOp::Not, operand) => Ok(Value::Bool(!operand.eval(scope)?.truthy())),
            Expr::Unary(UnaryOp::Neg, operand) => {
                Ok(Value::Number(-operand.eval(scope)?.to_number()))
            }
            Expr::Binary(BinaryOp::And, left, right) => {
                let l = left.eval(scope)?;
                if l.truthy() { right.eval(scope) } else { Ok(l) }
            }
            Expr::Binary(BinaryOp::Or, left, right) => {
                let l = left.eval(scope)?;
                if l.truthy() { Ok(l) } else { right.eval(scope) }
            }
            Expr::Binary(op, left, right) => {
                let l = left.eval(scope)?;
                let r = right.eval(scope)?;
                Ok(apply_binary(*op, &l, &r))
            }
            Expr::Call(name, args) => {
                let values = args
                    .iter()
                    .map(|a| a.eval(scope).map(|v| v.to_number()))
                    .collect::<Result<Vec<f64>, _>>()?;
                call_math(name, &values).map(Value::Number)
            }
        }
    }
}

fn apply_binary(op: BinaryOp, l: &Value, r: &Value) -> Value {
    use std::cmp::Ordering::{Equal, Greater, Less};

    match op {
        BinaryOp::Add => match (l, r) {
            (Value::Str(_), _) | (_, Value::Str(_)) => Value::Str(format!("{}{}", l, r)),
            _ => Value::Number(l.to_number() + r.to_number()),
        },
        BinaryOp::Sub => Value::Number(l.to_number() - r.to_number()),
        BinaryOp::Mul => Value::Number(l.to_number() * r.to_number()),
        BinaryOp::Div => Value::Number(l.to_number() / r.to_number()),
        BinaryOp::Rem => Value::Number(l.to_number() % r.to_number()),
        BinaryOp::Eq => Value::Bool(l.loose_eq(r)),
        BinaryOp::Ne => Value::Bool(!l.loose_eq(r)),
        BinaryOp::StrictEq => Value::Bool(l.strict_eq(r)),
        BinaryOp::StrictNe => Value::Bool(!l.strict_eq(r)),
        BinaryOp::Lt => Value::Bool(l.loose_cmp(r) == Some(Less)),
        BinaryOp::Le => Value::Bool(matches!(l.loose_cmp(r), Some(Less | Equal))),
        BinaryOp::Gt => Value::Bool(l.loose_cmp(r) == Some(Greater)),
        BinaryOp::Ge => Value::Bool(matches!(l.loose_cmp(r), Some(Greater | Equal))),
        BinaryOp::And | BinaryOp::Or => unreachable!("logical operators short-circuit in eval"),
    }
}

fn call_math(name: &str, args: &[f64]) -> Result<f64, ExprError> {
    let unary = |f: fn(f64) -> f64| -> Result<f64, ExprError> {
        match args {
            [x] => Ok(f(*x)),
            _ => Err(ExprError::Arity {
                name: name.to_string(),
                expected: "1",
                got: args.len(),
            }),
        }
    };

    match name {
        "abs" => unary(f64::abs),
        "floor" => unary(f64::floor),
        "ceil" => unary(f64::ceil),
        "round" => unary(f64::round),
        "sqrt" => unary(f64::sqrt),
        "min" | "max" if args.is_empty() => Err(ExprError::Arity {
            name: name.to_string(),
            expected: "at least 1",
            got: 0,
        }),
        "min" => Ok(args.iter().copied().fold(f64::INFINITY, f64::min)),
        "max" => Ok(args.iter().copied().fold(f64::NEG_INFINITY, f64::max)),
        _ => Err(ExprError::UnknownFunction(name.to_string())),
    }
}

/// Parse and evaluate `expr`, reporting the failure.
pub fn try_evaluate(expr: &str, scope: &Scope) -> Result<Value, ExprError> {
    parse(expr)?.eval(scope)
}

/// Evaluate a value expression. Errors are logged and yield `None`.
pub fn evaluate_expression(expr: &str, scope: &Scope) -> Option<Value> {
    match try_evaluate(expr, scope) {
        Ok(value) => Some(value),
        Err(ExprError::Parse(e)) => {
            log::warn!("failed to parse expression:\n{}", e.display_with_context(expr));
            None
        }
        Err(e) => {
            log::warn!("failed to evaluate expression '{}': {}", expr, e);
            None
        }
    }
}

/// Evaluate a condition expression. Errors are logged and yield `false`.
pub fn evaluate_boolean_expression(expr: &str, scope: &Scope) -> bool {
    evaluate_expression(expr, scope).is_some_and(|v| v.truthy())
}
