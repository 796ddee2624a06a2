//! The sandboxed expression language (component F).
//!
//! A hand-written recursive-descent parser and tree walker over the grammar
//! in the spec, deliberately not built on any general-purpose expression
//! crate: the safety property this needs (every variable and function name
//! checked against a fixed, enumerated set *before* any trace is read) only
//! holds if the parser itself refuses anything outside that set, rather
//! than deferring the check to evaluation time.
use std::collections::HashSet;

use segy_batch_core::{field_table, SegyError};

/// Functions the evaluator is allowed to call. Nothing else parses.
const ALLOWED_FUNCTIONS: &[&str] = &["abs", "int", "float", "round", "min", "max"];

/// The fixed set of names an expression may reference: every trace-header
/// field name, plus `trace_index`.
#[derive(Clone)]
pub struct Environment {
    names: HashSet<&'static str>,
}

impl Environment {
    /// The standard trace-header environment (§4.6): every canonical trace field
    /// name plus `trace_index`.
    pub fn trace() -> Self {
        let mut names: HashSet<&'static str> =
            field_table::TRACE_HEADER_FIELDS.iter().map(|f| f.name).collect();
        names.insert("trace_index");
        Self { names }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }
}

/// A value produced during evaluation: integer arithmetic is used whenever both
/// operands are integral, falling back to double precision otherwise (§4.6).
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value {
    Int(i64),
    Float(f64),
}

impl Value {
    fn as_f64(self) -> f64 {
        match self {
            Value::Int(i) => i as f64,
            Value::Float(f) => f,
        }
    }

    pub fn truthy(self) -> bool {
        match self {
            Value::Int(i) => i != 0,
            Value::Float(f) => f != 0.0,
        }
    }

    fn bool_value(b: bool) -> Value {
        Value::Int(if b { 1 } else { 0 })
    }

    /// Coerce to the 64-bit integer written to a header field; floats round
    /// to nearest (ties away from zero, matching `f64::round`).
    pub fn to_field_i64(self) -> i64 {
        match self {
            Value::Int(i) => i,
            Value::Float(f) => f.round() as i64,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(Value),
    Ident(String),
    Op(&'static str),
    LParen,
    RParen,
    Comma,
    Eof,
}

fn lex(src: &str) -> Result<Vec<Token>, SegyError> {
    let chars: Vec<char> = src.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if c.is_whitespace() {
            i += 1;
            continue;
        }
        if c.is_ascii_digit() {
            let start = i;
            let mut is_float = false;
            while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                if chars[i] == '.' {
                    is_float = true;
                }
                i += 1;
            }
            let text: String = chars[start..i].iter().collect();
            let value = if is_float {
                Value::Float(text.parse::<f64>().map_err(|_| SegyError::ExpressionParseError {
                    msg: format!("invalid number literal '{}'", text),
                })?)
            } else {
                Value::Int(text.parse::<i64>().map_err(|_| SegyError::ExpressionParseError {
                    msg: format!("invalid number literal '{}'", text),
                })?)
            };
            tokens.push(Token::Number(value));
            continue;
        }
        if c.is_alphabetic() || c == '_' {
            let start = i;
            while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_') {
                i += 1;
            }
            tokens.push(Token::Ident(chars[start..i].iter().collect()));
            continue;
        }
        match c {
            '(' => {
                tokens.push(Token::LParen);
                i += 1;
            }
            ')' => {
                tokens.push(Token::RParen);
                i += 1;
            }
            ',' => {
                tokens.push(Token::Comma);
                i += 1;
            }
            '+' => {
                tokens.push(Token::Op("+"));
                i += 1;
            }
            '-' => {
                tokens.push(Token::Op("-"));
                i += 1;
            }
            '*' => {
                tokens.push(Token::Op("*"));
                i += 1;
            }
            '/' => {
                if i + 1 < chars.len() && chars[i + 1] == '/' {
                    tokens.push(Token::Op("//"));
                    i += 2;
                } else {
                    tokens.push(Token::Op("/"));
                    i += 1;
                }
            }
            '%' => {
                tokens.push(Token::Op("%"));
                i += 1;
            }
            '<' => {
                if i + 1 < chars.len() && chars[i + 1] == '=' {
                    tokens.push(Token::Op("<="));
                    i += 2;
                } else {
                    tokens.push(Token::Op("<"));
                    i += 1;
                }
            }
            '>' => {
                if i + 1 < chars.len() && chars[i + 1] == '=' {
                    tokens.push(Token::Op(">="));
                    i += 2;
                } else {
                    tokens.push(Token::Op(">"));
                    i += 1;
                }
            }
            '=' => {
                if i + 1 < chars.len() && chars[i + 1] == '=' {
                    tokens.push(Token::Op("=="));
                    i += 2;
                } else {
                    return Err(SegyError::ExpressionParseError { msg: "expected '=='".to_string() });
                }
            }
            '!' => {
                if i + 1 < chars.len() && chars[i + 1] == '=' {
                    tokens.push(Token::Op("!="));
                    i += 2;
                } else {
                    return Err(SegyError::ExpressionParseError { msg: "expected '!='".to_string() });
                }
            }
            other => {
                return Err(SegyError::ExpressionParseError { msg: format!("unexpected character '{}'", other) });
            }
        }
    }
    tokens.push(Token::Eof);
    Ok(tokens)
}

/// Parsed expression tree. Holds no unresolved names: every variable and
/// function was checked against the environment at parse time.
#[derive(Debug, Clone)]
pub enum Expr {
    Number(Value),
    Var(String),
    Call(&'static str, Vec<Expr>),
    Neg(Box<Expr>),
    Not(Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
    And(Box<Expr>, Box<Expr>),
    Cmp(&'static str, Box<Expr>, Box<Expr>),
    Arith(&'static str, Box<Expr>, Box<Expr>),
}

struct Parser<'a> {
    tokens: Vec<Token>,
    pos: usize,
    env: &'a Environment,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> &Token {
        &self.tokens[self.pos]
    }

    fn advance(&mut self) -> Token {
        let t = self.tokens[self.pos].clone();
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
        t
    }

    fn expect_op(&mut self, op: &str) -> Result<(), SegyError> {
        match self.advance() {
            Token::Op(o) if o == op => Ok(()),
            other => Err(SegyError::ExpressionParseError { msg: format!("expected '{}', found {:?}", op, other) }),
        }
    }

    fn parse_expr(&mut self) -> Result<Expr, SegyError> {
        self.parse_or()
    }

    fn parse_or(&mut self) -> Result<Expr, SegyError> {
        let mut left = self.parse_and()?;
        while matches!(self.peek(), Token::Ident(s) if s == "or") {
            self.advance();
            let right = self.parse_and()?;
            left = Expr::Or(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expr, SegyError> {
        let mut left = self.parse_not()?;
        while matches!(self.peek(), Token::Ident(s) if s == "and") {
            self.advance();
            let right = self.parse_not()?;
            left = Expr::And(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_not(&mut self) -> Result<Expr, SegyError> {
        if matches!(self.peek(), Token::Ident(s) if s == "not") {
            self.advance();
            return Ok(Expr::Not(Box::new(self.parse_not()?)));
        }
        self.parse_cmp()
    }

    fn parse_cmp(&mut self) -> Result<Expr, SegyError> {
        let left = self.parse_add()?;
        if let Token::Op(op) = self.peek() {
            if matches!(*op, "<" | "<=" | ">" | ">=" | "==" | "!=") {
                let op = *op;
                self.advance();
                let right = self.parse_add()?;
                return Ok(Expr::Cmp(op, Box::new(left), Box::new(right)));
            }
        }
        Ok(left)
    }

    fn parse_add(&mut self) -> Result<Expr, SegyError> {
        let mut left = self.parse_mul()?;
        loop {
            match self.peek() {
                Token::Op(op @ ("+" | "-")) => {
                    let op = *op;
                    self.advance();
                    let right = self.parse_mul()?;
                    left = Expr::Arith(op, Box::new(left), Box::new(right));
                }
                _ => break,
            }
        }
        Ok(left)
    }

    fn parse_mul(&mut self) -> Result<Expr, SegyError> {
        let mut left = self.parse_unary()?;
        loop {
            match self.peek() {
                Token::Op(op @ ("*" | "/" | "%" | "//")) => {
                    let op = *op;
                    self.advance();
                    let right = self.parse_unary()?;
                    left = Expr::Arith(op, Box::new(left), Box::new(right));
                }
                _ => break,
            }
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expr, SegyError> {
        match self.peek() {
            Token::Op("-") => {
                self.advance();
                Ok(Expr::Neg(Box::new(self.parse_unary()?)))
            }
            Token::Op("+") => {
                self.advance();
                self.parse_unary()
            }
            _ => self.parse_atom(),
        }
    }

    fn parse_atom(&mut self) -> Result<Expr, SegyError> {
        match self.advance() {
            Token::Number(v) => Ok(Expr::Number(v)),
            Token::LParen => {
                let inner = self.parse_expr()?;
                self.expect_rparen()?;
                Ok(inner)
            }
            Token::Ident(name) => {
                if name == "or" || name == "and" || name == "not" {
                    return Err(SegyError::ExpressionParseError { msg: format!("unexpected keyword '{}'", name) });
                }
                if matches!(self.peek(), Token::LParen) {
                    self.advance();
                    let func: &'static str = ALLOWED_FUNCTIONS
                        .iter()
                        .find(|f| **f == name)
                        .ok_or_else(|| SegyError::UnknownFunction { name: name.clone() })?;
                    let mut args = Vec::new();
                    if !matches!(self.peek(), Token::RParen) {
                        args.push(self.parse_expr()?);
                        while matches!(self.peek(), Token::Comma) {
                            self.advance();
                            args.push(self.parse_expr()?);
                        }
                    }
                    self.expect_rparen()?;
                    check_arity(func, args.len())?;
                    Ok(Expr::Call(func, args))
                } else {
                    if !self.env.contains(&name) {
                        return Err(SegyError::UnknownVariable { name });
                    }
                    Ok(Expr::Var(name))
                }
            }
            other => Err(SegyError::ExpressionParseError { msg: format!("unexpected token {:?}", other) }),
        }
    }

    fn expect_rparen(&mut self) -> Result<(), SegyError> {
        match self.advance() {
            Token::RParen => Ok(()),
            other => Err(SegyError::ExpressionParseError { msg: format!("expected ')', found {:?}", other) }),
        }
    }
}

fn check_arity(func: &str, count: usize) -> Result<(), SegyError> {
    let ok = match func {
        "abs" | "int" | "float" | "round" => count == 1,
        "min" | "max" => count == 2,
        _ => false,
    };
    if ok {
        Ok(())
    } else {
        Err(SegyError::ExpressionParseError { msg: format!("'{}' called with {} argument(s)", func, count) })
    }
}

/// Parse `src` against `env`. Fails before any trace is read if `src` references
/// a name outside `env` or calls a function outside [`ALLOWED_FUNCTIONS`].
pub fn parse(src: &str, env: &Environment) -> Result<Expr, SegyError> {
    let tokens = lex(src)?;
    let mut parser = Parser { tokens, pos: 0, env };
    let expr = parser.parse_expr()?;
    match parser.peek() {
        Token::Eof => Ok(expr),
        other => Err(SegyError::ExpressionParseError { msg: format!("unexpected trailing token {:?}", other) }),
    }
}

/// Evaluation-time bindings for the environment's variables.
pub trait VarLookup {
    fn lookup(&self, name: &str) -> Result<Value, SegyError>;
}

impl Expr {
    pub fn eval(&self, vars: &dyn VarLookup) -> Result<Value, SegyError> {
        match self {
            Expr::Number(v) => Ok(*v),
            Expr::Var(name) => vars.lookup(name),
            Expr::Neg(inner) => match inner.eval(vars)? {
                Value::Int(i) => Ok(Value::Int(-i)),
                Value::Float(f) => Ok(Value::Float(-f)),
            },
            Expr::Not(inner) => Ok(Value::bool_value(!inner.eval(vars)?.truthy())),
            Expr::Or(l, r) => {
                if l.eval(vars)?.truthy() {
                    Ok(Value::Int(1))
                } else {
                    Ok(Value::bool_value(r.eval(vars)?.truthy()))
                }
            }
            Expr::And(l, r) => {
                if !l.eval(vars)?.truthy() {
                    Ok(Value::Int(0))
                } else {
                    Ok(Value::bool_value(r.eval(vars)?.truthy()))
                }
            }
            Expr::Cmp(op, l, r) => {
                let (a, b) = (l.eval(vars)?, r.eval(vars)?);
                let (af, bf) = (a.as_f64(), b.as_f64());
                let result = match *op {
                    "<" => af < bf,
                    "<=" => af <= bf,
                    ">" => af > bf,
                    ">=" => af >= bf,
                    "==" => af == bf,
                    "!=" => af != bf,
                    _ => unreachable!(),
                };
                Ok(Value::bool_value(result))
            }
            Expr::Arith(op, l, r) => eval_arith(*op, l.eval(vars)?, r.eval(vars)?),
            Expr::Call(name, args) => eval_call(name, args, vars),
        }
    }
}

fn eval_arith(op: &str, a: Value, b: Value) -> Result<Value, SegyError> {
    use Value::*;
    match (op, a, b) {
        ("+", Int(x), Int(y)) => Ok(x.checked_add(y).map(Int).unwrap_or(Float(x as f64 + y as f64))),
        ("+", x, y) => Ok(Float(x.as_f64() + y.as_f64())),
        ("-", Int(x), Int(y)) => Ok(x.checked_sub(y).map(Int).unwrap_or(Float(x as f64 - y as f64))),
        ("-", x, y) => Ok(Float(x.as_f64() - y.as_f64())),
        ("*", Int(x), Int(y)) => Ok(x.checked_mul(y).map(Int).unwrap_or(Float(x as f64 * y as f64))),
        ("*", x, y) => Ok(Float(x.as_f64() * y.as_f64())),
        ("/", Int(x), Int(y)) => {
            if y == 0 {
                Err(SegyError::DivisionByZero)
            } else if x % y == 0 {
                Ok(Int(x / y))
            } else {
                Ok(Float(x as f64 / y as f64))
            }
        }
        ("/", x, y) => {
            let yf = y.as_f64();
            if yf == 0.0 {
                Err(SegyError::DivisionByZero)
            } else {
                Ok(Float(x.as_f64() / yf))
            }
        }
        ("//", Int(x), Int(y)) => {
            if y == 0 {
                Err(SegyError::DivisionByZero)
            } else {
                Ok(Int(x.div_euclid(y)))
            }
        }
        ("//", x, y) => {
            let yf = y.as_f64();
            if yf == 0.0 {
                Err(SegyError::DivisionByZero)
            } else {
                Ok(Float((x.as_f64() / yf).floor()))
            }
        }
        ("%", Int(x), Int(y)) => {
            if y == 0 {
                Err(SegyError::DivisionByZero)
            } else {
                Ok(Int(x % y))
            }
        }
        ("%", x, y) => {
            let yf = y.as_f64();
            if yf == 0.0 {
                Err(SegyError::DivisionByZero)
            } else {
                Ok(Float(x.as_f64() % yf))
            }
        }
        _ => unreachable!("unhandled arithmetic operator {}", op),
    }
}

fn eval_call(name: &str, args: &[Expr], vars: &dyn VarLookup) -> Result<Value, SegyError> {
    let evaluated: Result<Vec<Value>, SegyError> = args.iter().map(|a| a.eval(vars)).collect();
    let evaluated = evaluated?;
    match name {
        "abs" => Ok(match evaluated[0] {
            Value::Int(i) => Value::Int(i.abs()),
            Value::Float(f) => Value::Float(f.abs()),
        }),
        "int" => Ok(Value::Int(evaluated[0].to_field_i64())),
        "float" => Ok(Value::Float(evaluated[0].as_f64())),
        "round" => Ok(Value::Int(evaluated[0].as_f64().round() as i64)),
        "min" => Ok(if evaluated[0].as_f64() <= evaluated[1].as_f64() { evaluated[0] } else { evaluated[1] }),
        "max" => Ok(if evaluated[0].as_f64() >= evaluated[1].as_f64() { evaluated[0] } else { evaluated[1] }),
        _ => unreachable!("unknown function reached evaluation: {}", name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FakeVars;
    impl VarLookup for FakeVars {
        fn lookup(&self, name: &str) -> Result<Value, SegyError> {
            match name {
                "source_x" => Ok(Value::Int(100)),
                "trace_index" => Ok(Value::Int(5)),
                _ => Err(SegyError::UnknownVariable { name: name.to_string() }),
            }
        }
    }

    #[test]
    fn evaluates_arithmetic() {
        let env = Environment::trace();
        let expr = parse("source_x * 10", &env).unwrap();
        assert_eq!(expr.eval(&FakeVars).unwrap(), Value::Int(1000));
    }

    #[test]
    fn rejects_unknown_variable_at_parse_time() {
        let env = Environment::trace();
        let err = parse("not_a_field + 1", &env).unwrap_err();
        assert!(matches!(err, SegyError::UnknownVariable { .. }));
    }

    #[test]
    fn rejects_unknown_function_at_parse_time() {
        let env = Environment::trace();
        let err = parse("eval(source_x)", &env).unwrap_err();
        assert!(matches!(err, SegyError::UnknownFunction { .. }));
    }

    #[test]
    fn comparison_yields_boolean_int() {
        let env = Environment::trace();
        let expr = parse("trace_sequence_line > 100", &env).unwrap();
        struct V;
        impl VarLookup for V {
            fn lookup(&self, name: &str) -> Result<Value, SegyError> {
                assert_eq!(name, "trace_sequence_line");
                Ok(Value::Int(150))
            }
        }
        assert_eq!(expr.eval(&V).unwrap(), Value::Int(1));
    }

    #[test]
    fn division_by_zero_is_reported() {
        let env = Environment::trace();
        let expr = parse("source_x / 0", &env).unwrap();
        assert!(matches!(expr.eval(&FakeVars), Err(SegyError::DivisionByZero)));
    }

    #[test]
    fn min_max_and_abs() {
        let env = Environment::trace();
        assert_eq!(parse("min(3, 7)", &env).unwrap().eval(&FakeVars).unwrap(), Value::Int(3));
        assert_eq!(parse("max(3, 7)", &env).unwrap().eval(&FakeVars).unwrap(), Value::Int(7));
        assert_eq!(parse("abs(0 - 5)", &env).unwrap().eval(&FakeVars).unwrap(), Value::Int(5));
    }

    #[test]
    fn wrong_arity_is_a_parse_error() {
        let env = Environment::trace();
        assert!(parse("abs(1, 2)", &env).is_err());
        assert!(parse("min(1)", &env).is_err());
    }
}
