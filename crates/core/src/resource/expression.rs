// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Requirement expressions evaluated against resource records.
//!
//! A job's `requires` field is a [`ResourceProgram`]: one
//! [`ResourceExpression`] per non-empty line, all of which must hold.
//!
//! ### Grammar (informal)
//! - **Attributes**: `package.name`, `device.category` (resource id, then
//!   attribute)
//! - **Literals**: `'text'`, `"text"`, `42`, `1.5`, `True`, `False`,
//!   tuples `('a', 'b')` and lists `['a', 'b']`
//! - **Comparisons**: `==`, `!=`, `<`, `<=`, `>`, `>=`, `in`, `not in`
//! - **Boolean operators**: `and`, `or`, `not`
//! - **Functions**: `int(x)`, `float(x)`, `str(x)`, `len(x)`, `bool(x)`
//!
//! ### Semantics
//! An expression referencing resources `r1..rn` holds when at least one
//! combination of one record from each `ri` satisfies it. Within a
//! combination a missing attribute, a type mismatch or a failed conversion
//! makes the whole expression false for that combination.
//!
//! A resource id with no entry in the resource map means the expression
//! cannot be evaluated yet, which is distinct from it evaluating to false.

use super::{Resource, ResourceMap};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Maximum nesting depth of parenthesised or negated sub-expressions.
const MAX_NESTING: usize = 64;

// ============================================================================
// Errors
// ============================================================================

/// Errors raised while compiling a requirement expression.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResourceProgramError {
    #[error("expression is empty")]
    EmptyInput,

    #[error("unexpected {found} at offset {position}, expected {expected}")]
    UnexpectedToken {
        expected: &'static str,
        found: String,
        position: usize,
    },

    #[error("unterminated string literal starting at offset {position}")]
    UnterminatedString { position: usize },

    #[error("invalid number '{raw}' at offset {position}")]
    InvalidNumber { raw: String, position: usize },

    #[error("unknown function '{name}' at offset {position}")]
    UnknownFunction { name: String, position: usize },

    #[error("bare name '{name}' at offset {position}, expected resource.attribute")]
    BareName { name: String, position: usize },

    #[error("expression nests deeper than {max_depth} levels")]
    NestingTooDeep { max_depth: usize },

    #[error("expression `{text}` does not reference any resource")]
    NoResourceReferenced { text: String },

    #[error("line {line}: {source}")]
    Line {
        line: usize,
        #[source]
        source: Box<ResourceProgramError>,
    },
}

/// Why a program did not evaluate to true.
#[derive(Debug, Clone, Error)]
pub enum EvaluationError {
    /// Some referenced resource has no data yet.
    #[error("cannot evaluate `{expression}`: no data for resource '{resource_id}'")]
    CannotEvaluate {
        expression: ResourceExpression,
        resource_id: String,
    },

    /// All data is present but the condition does not hold.
    #[error("requirement `{expression}` is not met")]
    Failed { expression: ResourceExpression },
}

impl EvaluationError {
    /// The expression responsible for the failure.
    pub fn expression(&self) -> &ResourceExpression {
        match self {
            EvaluationError::CannotEvaluate { expression, .. } => expression,
            EvaluationError::Failed { expression } => expression,
        }
    }
}

// ============================================================================
// Program
// ============================================================================

/// A compiled `requires` field.
#[derive(Debug, Clone)]
pub struct ResourceProgram {
    expressions: Vec<ResourceExpression>,
}

impl ResourceProgram {
    /// Compile a program, one expression per non-empty, non-comment line.
    pub fn parse(text: &str) -> Result<Self, ResourceProgramError> {
        let mut expressions = Vec::new();
        for (index, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let expression =
                ResourceExpression::parse(line).map_err(|e| ResourceProgramError::Line {
                    line: index + 1,
                    source: Box::new(e),
                })?;
            expressions.push(expression);
        }
        if expressions.is_empty() {
            return Err(ResourceProgramError::EmptyInput);
        }
        Ok(Self { expressions })
    }

    pub fn expressions(&self) -> &[ResourceExpression] {
        &self.expressions
    }

    /// Every resource id referenced by any expression, first use first.
    pub fn resource_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = Vec::new();
        for id in self.expressions.iter().flat_map(|e| e.resource_ids()) {
            if !ids.contains(&id.as_str()) {
                ids.push(id.as_str());
            }
        }
        ids
    }

    /// Evaluate the program line by line, stopping at the first expression
    /// that either lacks data or does not hold.
    pub fn evaluate_or_raise(&self, resource_map: &ResourceMap) -> Result<(), EvaluationError> {
        for expression in &self.expressions {
            if let Some(missing) = expression
                .resource_ids()
                .iter()
                .find(|id| !resource_map.contains_key(id.as_str()))
            {
                return Err(EvaluationError::CannotEvaluate {
                    expression: expression.clone(),
                    resource_id: missing.clone(),
                });
            }
            if !expression.evaluate(resource_map).unwrap_or(false) {
                return Err(EvaluationError::Failed {
                    expression: expression.clone(),
                });
            }
        }
        Ok(())
    }
}

// ============================================================================
// Expression
// ============================================================================

/// A single compiled requirement line.
#[derive(Debug, Clone)]
pub struct ResourceExpression {
    text: String,
    root: Arc<Expr>,
    resource_ids: Vec<String>,
}

impl ResourceExpression {
    pub fn parse(text: &str) -> Result<Self, ResourceProgramError> {
        let tokens = Lexer::new(text).lex()?;
        let mut parser = Parser::new(tokens);
        let root = parser.parse_expression()?;
        parser.expect_eof()?;

        let mut resource_ids = Vec::new();
        root.collect_resource_ids(&mut resource_ids);
        if resource_ids.is_empty() {
            return Err(ResourceProgramError::NoResourceReferenced {
                text: text.to_string(),
            });
        }
        Ok(Self {
            text: text.trim().to_string(),
            root: Arc::new(root),
            resource_ids,
        })
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Resource ids in order of first use.
    pub fn resource_ids(&self) -> &[String] {
        &self.resource_ids
    }

    /// Evaluate against the map.
    ///
    /// Returns `None` when a referenced resource id has no entry.
    pub fn evaluate(&self, resource_map: &ResourceMap) -> Option<bool> {
        let mut lists = Vec::with_capacity(self.resource_ids.len());
        for id in &self.resource_ids {
            lists.push(resource_map.get(id)?.as_slice());
        }
        let mut binding = HashMap::with_capacity(lists.len());
        Some(self.any_combination(&lists, 0, &mut binding))
    }

    /// Check a single record bound to the expression's only resource id.
    pub fn matches(&self, resource: &Resource) -> bool {
        let mut binding = HashMap::new();
        for id in &self.resource_ids {
            binding.insert(id.as_str(), resource);
        }
        self.root.truthy_in(&binding)
    }

    fn any_combination<'a>(
        &'a self,
        lists: &[&'a [Resource]],
        index: usize,
        binding: &mut HashMap<&'a str, &'a Resource>,
    ) -> bool {
        let Some(&records) = lists.get(index) else {
            return self.root.truthy_in(binding);
        };
        let id = self.resource_ids[index].as_str();
        for record in records.iter() {
            binding.insert(id, record);
            if self.any_combination(lists, index + 1, binding) {
                return true;
            }
        }
        binding.remove(id);
        false
    }
}

impl fmt::Display for ResourceExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

impl PartialEq for ResourceExpression {
    fn eq(&self, other: &Self) -> bool {
        self.text == other.text
    }
}

impl Eq for ResourceExpression {}

// ============================================================================
// Syntax tree and evaluation
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CmpOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    In,
    NotIn,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Func {
    Int,
    Float,
    Str,
    Len,
    Bool,
}

impl Func {
    fn from_name(name: &str) -> Option<Self> {
        match name {
            "int" => Some(Func::Int),
            "float" => Some(Func::Float),
            "str" => Some(Func::Str),
            "len" => Some(Func::Len),
            "bool" => Some(Func::Bool),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Expr {
    Literal(Value),
    Attr { resource: String, attribute: String },
    Sequence(Vec<Expr>),
    Call { func: Func, arg: Box<Expr> },
    Not(Box<Expr>),
    And(Vec<Expr>),
    Or(Vec<Expr>),
    Compare {
        op: CmpOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
}

#[derive(Debug, Clone, PartialEq)]
enum Value {
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    Sequence(Vec<Value>),
}

type Binding<'a> = HashMap<&'a str, &'a Resource>;

impl Expr {
    fn collect_resource_ids(&self, out: &mut Vec<String>) {
        match self {
            Expr::Literal(_) => {}
            Expr::Attr { resource, .. } => {
                if !out.contains(resource) {
                    out.push(resource.clone());
                }
            }
            Expr::Sequence(items) | Expr::And(items) | Expr::Or(items) => {
                for item in items {
                    item.collect_resource_ids(out);
                }
            }
            Expr::Call { arg, .. } | Expr::Not(arg) => arg.collect_resource_ids(out),
            Expr::Compare { lhs, rhs, .. } => {
                lhs.collect_resource_ids(out);
                rhs.collect_resource_ids(out);
            }
        }
    }

    fn truthy_in(&self, binding: &Binding<'_>) -> bool {
        self.eval(binding).is_some_and(|v| v.truthy())
    }

    /// `None` means the evaluation faulted (missing attribute, type error).
    fn eval(&self, binding: &Binding<'_>) -> Option<Value> {
        match self {
            Expr::Literal(value) => Some(value.clone()),
            Expr::Attr {
                resource,
                attribute,
            } => binding
                .get(resource.as_str())
                .and_then(|record| record.get(attribute))
                .map(|v| Value::Str(v.to_string())),
            Expr::Sequence(items) => items
                .iter()
                .map(|item| item.eval(binding))
                .collect::<Option<Vec<_>>>()
                .map(Value::Sequence),
            Expr::Call { func, arg } => arg.eval(binding)?.apply(*func),
            Expr::Not(inner) => Some(Value::Bool(!inner.eval(binding)?.truthy())),
            Expr::And(items) => {
                for item in items {
                    if !item.eval(binding)?.truthy() {
                        return Some(Value::Bool(false));
                    }
                }
                Some(Value::Bool(true))
            }
            Expr::Or(items) => {
                for item in items {
                    if item.eval(binding)?.truthy() {
                        return Some(Value::Bool(true));
                    }
                }
                Some(Value::Bool(false))
            }
            Expr::Compare { op, lhs, rhs } => {
                let lhs = lhs.eval(binding)?;
                let rhs = rhs.eval(binding)?;
                lhs.compare(*op, &rhs).map(Value::Bool)
            }
        }
    }
}

impl Value {
    fn truthy(&self) -> bool {
        match self {
            Value::Str(s) => !s.is_empty(),
            Value::Int(n) => *n != 0,
            Value::Float(f) => *f != 0.0,
            Value::Bool(b) => *b,
            Value::Sequence(items) => !items.is_empty(),
        }
    }

    fn as_number(&self) -> Option<f64> {
        match self {
            Value::Int(n) => Some(*n as f64),
            Value::Float(f) => Some(*f),
            Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            _ => None,
        }
    }

    fn apply(self, func: Func) -> Option<Value> {
        match func {
            Func::Int => match self {
                Value::Str(s) => s.trim().parse().ok().map(Value::Int),
                Value::Int(n) => Some(Value::Int(n)),
                Value::Float(f) if f.is_finite() => Some(Value::Int(f.trunc() as i64)),
                Value::Bool(b) => Some(Value::Int(i64::from(b))),
                _ => None,
            },
            Func::Float => match self {
                Value::Str(s) => s.trim().parse().ok().map(Value::Float),
                other => other.as_number().map(Value::Float),
            },
            Func::Str => Some(Value::Str(self.to_string())),
            Func::Len => match self {
                Value::Str(s) => Some(Value::Int(s.chars().count() as i64)),
                Value::Sequence(items) => Some(Value::Int(items.len() as i64)),
                _ => None,
            },
            Func::Bool => Some(Value::Bool(self.truthy())),
        }
    }

    fn equals(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Sequence(a), Value::Sequence(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.equals(y))
            }
            (a, b) => match (a.as_number(), b.as_number()) {
                (Some(x), Some(y)) => x == y,
                _ => false,
            },
        }
    }

    fn compare(&self, op: CmpOp, other: &Value) -> Option<bool> {
        use std::cmp::Ordering;

        let ordering = || -> Option<Ordering> {
            match (self, other) {
                (Value::Str(a), Value::Str(b)) => Some(a.cmp(b)),
                (a, b) => a.as_number()?.partial_cmp(&b.as_number()?),
            }
        };
        match op {
            CmpOp::Eq => Some(self.equals(other)),
            CmpOp::Ne => Some(!self.equals(other)),
            CmpOp::Lt => Some(ordering()? == Ordering::Less),
            CmpOp::Le => Some(ordering()? != Ordering::Greater),
            CmpOp::Gt => Some(ordering()? == Ordering::Greater),
            CmpOp::Ge => Some(ordering()? != Ordering::Less),
            CmpOp::In => self.contained_in(other),
            CmpOp::NotIn => self.contained_in(other).map(|found| !found),
        }
    }

    fn contained_in(&self, container: &Value) -> Option<bool> {
        match (self, container) {
            (Value::Str(needle), Value::Str(haystack)) => Some(haystack.contains(needle.as_str())),
            (needle, Value::Sequence(items)) => Some(items.iter().any(|item| needle.equals(item))),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Str(s) => f.write_str(s),
            Value::Int(n) => write!(f, "{}", n),
            Value::Float(x) => write!(f, "{}", x),
            Value::Bool(true) => f.write_str("True"),
            Value::Bool(false) => f.write_str("False"),
            Value::Sequence(items) => {
                f.write_str("(")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                f.write_str(")")
            }
        }
    }
}

// ============================================================================
// Lexer
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
enum Token<'a> {
    Ident(&'a str),
    Str(String),
    Int(i64),
    Float(f64),
    Dot,
    LParen,
    RParen,
    LBracket,
    RBracket,
    Comma,
    EqEq,
    NotEq,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
    Not,
    In,
    True,
    False,
    Eof,
}

impl Token<'_> {
    fn describe(&self) -> String {
        match self {
            Token::Ident(name) => format!("identifier '{}'", name),
            Token::Str(s) => format!("string {:?}", s),
            Token::Int(n) => format!("number {}", n),
            Token::Float(x) => format!("number {}", x),
            Token::Eof => "end of input".to_string(),
            other => format!("{:?}", other),
        }
    }
}

#[derive(Debug, Clone)]
struct SpannedToken<'a> {
    token: Token<'a>,
    position: usize,
}

struct Lexer<'a> {
    input: &'a str,
    offset: usize,
}

impl<'a> Lexer<'a> {
    fn new(input: &'a str) -> Self {
        Self { input, offset: 0 }
    }

    fn lex(mut self) -> Result<Vec<SpannedToken<'a>>, ResourceProgramError> {
        let mut tokens = Vec::new();
        let bytes = self.input.as_bytes();

        while self.offset < bytes.len() {
            let start = self.offset;
            let ch = bytes[start];
            let token = match ch {
                b' ' | b'\t' | b'\r' | b'\n' => {
                    self.offset += 1;
                    continue;
                }
                b'(' => self.single(Token::LParen),
                b')' => self.single(Token::RParen),
                b'[' => self.single(Token::LBracket),
                b']' => self.single(Token::RBracket),
                b',' => self.single(Token::Comma),
                b'.' if !bytes.get(start + 1).is_some_and(u8::is_ascii_digit) => {
                    self.single(Token::Dot)
                }
                b'=' | b'!' | b'<' | b'>' => self.operator(bytes)?,
                b'\'' | b'"' => self.string(ch)?,
                b'0'..=b'9' | b'.' | b'-' => self.number(bytes)?,
                b'a'..=b'z' | b'A'..=b'Z' | b'_' => {
                    self.consume_while(bytes, |b| b.is_ascii_alphanumeric() || b == b'_');
                    keyword_or_ident(&self.input[start..self.offset])
                }
                _ => {
                    let found = self.input[start..].chars().next().unwrap_or('?');
                    return Err(ResourceProgramError::UnexpectedToken {
                        expected: "identifier, literal or operator",
                        found: format!("'{}'", found),
                        position: start,
                    });
                }
            };
            tokens.push(SpannedToken {
                token,
                position: start,
            });
        }

        if tokens.is_empty() {
            return Err(ResourceProgramError::EmptyInput);
        }
        tokens.push(SpannedToken {
            token: Token::Eof,
            position: self.offset,
        });
        Ok(tokens)
    }

    fn consume_while(&mut self, bytes: &[u8], condition: impl Fn(u8) -> bool) {
        while let Some(&b) = bytes.get(self.offset) {
            if !condition(b) {
                break;
            }
            self.offset += 1;
        }
    }

    fn single(&mut self, token: Token<'a>) -> Token<'a> {
        self.offset += 1;
        token
    }

    fn operator(&mut self, bytes: &[u8]) -> Result<Token<'a>, ResourceProgramError> {
        let start = self.offset;
        let followed_by_eq = bytes.get(start + 1) == Some(&b'=');
        let (token, width) = match (bytes[start], followed_by_eq) {
            (b'=', true) => (Token::EqEq, 2),
            (b'!', true) => (Token::NotEq, 2),
            (b'<', true) => (Token::Le, 2),
            (b'>', true) => (Token::Ge, 2),
            (b'<', false) => (Token::Lt, 1),
            (b'>', false) => (Token::Gt, 1),
            (other, _) => {
                return Err(ResourceProgramError::UnexpectedToken {
                    expected: "comparison operator",
                    found: format!("'{}'", char::from(other)),
                    position: start,
                })
            }
        };
        self.offset += width;
        Ok(token)
    }

    fn string(&mut self, quote: u8) -> Result<Token<'a>, ResourceProgramError> {
        let start = self.offset;
        let mut value = String::new();
        let mut chars = self.input[start + 1..].char_indices();
        while let Some((i, c)) = chars.next() {
            match c {
                '\\' => match chars.next() {
                    Some((_, 'n')) => value.push('\n'),
                    Some((_, 't')) => value.push('\t'),
                    Some((_, escaped)) => value.push(escaped),
                    None => break,
                },
                c if c == char::from(quote) => {
                    self.offset = start + 1 + i + 1;
                    return Ok(Token::Str(value));
                }
                c => value.push(c),
            }
        }
        Err(ResourceProgramError::UnterminatedString { position: start })
    }

    fn number(&mut self, bytes: &[u8]) -> Result<Token<'a>, ResourceProgramError> {
        let start = self.offset;
        if bytes[start] == b'-' {
            self.offset += 1;
        }
        self.consume_while(bytes, |b| b.is_ascii_digit() || b == b'.');
        let raw = &self.input[start..self.offset];
        let invalid = || ResourceProgramError::InvalidNumber {
            raw: raw.to_string(),
            position: start,
        };
        if raw.contains('.') {
            raw.parse().map(Token::Float).map_err(|_| invalid())
        } else {
            raw.parse().map(Token::Int).map_err(|_| invalid())
        }
    }
}

fn keyword_or_ident(slice: &str) -> Token<'_> {
    match slice {
        "and" => Token::And,
        "or" => Token::Or,
        "not" => Token::Not,
        "in" => Token::In,
        "True" => Token::True,
        "False" => Token::False,
        _ => Token::Ident(slice),
    }
}

// ============================================================================
// Parser
// ============================================================================

/// Recursive-descent parser over the token stream.
struct Parser<'a> {
    tokens: Vec<SpannedToken<'a>>,
    index: usize,
    nesting: usize,
}

impl<'a> Parser<'a> {
    fn new(tokens: Vec<SpannedToken<'a>>) -> Self {
        Self {
            tokens,
            index: 0,
            nesting: 0,
        }
    }

    fn peek(&self) -> &Token<'a> {
        self.tokens
            .get(self.index)
            .map(|t| &t.token)
            .unwrap_or(&Token::Eof)
    }

    fn peek_at(&self, offset: usize) -> &Token<'a> {
        self.tokens
            .get(self.index + offset)
            .map(|t| &t.token)
            .unwrap_or(&Token::Eof)
    }

    fn position(&self) -> usize {
        self.tokens
            .get(self.index)
            .or_else(|| self.tokens.last())
            .map(|t| t.position)
            .unwrap_or(0)
    }

    fn advance(&mut self) -> Token<'a> {
        let token = self.peek().clone();
        if self.index < self.tokens.len() {
            self.index += 1;
        }
        token
    }

    fn unexpected(&self, expected: &'static str) -> ResourceProgramError {
        ResourceProgramError::UnexpectedToken {
            expected,
            found: self.peek().describe(),
            position: self.position(),
        }
    }

    fn expect(
        &mut self,
        token: Token<'a>,
        expected: &'static str,
    ) -> Result<(), ResourceProgramError> {
        if *self.peek() == token {
            self.advance();
            Ok(())
        } else {
            Err(self.unexpected(expected))
        }
    }

    fn expect_eof(&self) -> Result<(), ResourceProgramError> {
        if *self.peek() == Token::Eof {
            Ok(())
        } else {
            Err(self.unexpected("end of input"))
        }
    }

    fn enter(&mut self) -> Result<(), ResourceProgramError> {
        self.nesting += 1;
        if self.nesting > MAX_NESTING {
            return Err(ResourceProgramError::NestingTooDeep {
                max_depth: MAX_NESTING,
            });
        }
        Ok(())
    }

    fn leave(&mut self) {
        self.nesting = self.nesting.saturating_sub(1);
    }

    fn parse_expression(&mut self) -> Result<Expr, ResourceProgramError> {
        self.parse_or()
    }

    fn parse_or(&mut self) -> Result<Expr, ResourceProgramError> {
        let mut parts = vec![self.parse_and()?];
        while *self.peek() == Token::Or {
            self.advance();
            parts.push(self.parse_and()?);
        }
        Ok(if parts.len() == 1 {
            parts.remove(0)
        } else {
            Expr::Or(parts)
        })
    }

    fn parse_and(&mut self) -> Result<Expr, ResourceProgramError> {
        let mut parts = vec![self.parse_not()?];
        while *self.peek() == Token::And {
            self.advance();
            parts.push(self.parse_not()?);
        }
        Ok(if parts.len() == 1 {
            parts.remove(0)
        } else {
            Expr::And(parts)
        })
    }

    fn parse_not(&mut self) -> Result<Expr, ResourceProgramError> {
        if *self.peek() == Token::Not {
            self.advance();
            self.enter()?;
            let inner = self.parse_not()?;
            self.leave();
            return Ok(Expr::Not(Box::new(inner)));
        }
        self.parse_comparison()
    }

    fn comparison_op(&self) -> Option<(CmpOp, usize)> {
        let op = match self.peek() {
            Token::EqEq => CmpOp::Eq,
            Token::NotEq => CmpOp::Ne,
            Token::Lt => CmpOp::Lt,
            Token::Le => CmpOp::Le,
            Token::Gt => CmpOp::Gt,
            Token::Ge => CmpOp::Ge,
            Token::In => CmpOp::In,
            Token::Not if *self.peek_at(1) == Token::In => return Some((CmpOp::NotIn, 2)),
            _ => return None,
        };
        Some((op, 1))
    }

    /// Chained comparisons (`a < b < c`) expand to a conjunction.
    fn parse_comparison(&mut self) -> Result<Expr, ResourceProgramError> {
        let first = self.parse_primary()?;
        let mut operands = vec![first];
        let mut ops = Vec::new();
        while let Some((op, width)) = self.comparison_op() {
            for _ in 0..width {
                self.advance();
            }
            ops.push(op);
            operands.push(self.parse_primary()?);
        }
        if ops.is_empty() {
            return Ok(operands.remove(0));
        }
        let mut pairs: Vec<Expr> = ops
            .iter()
            .enumerate()
            .map(|(i, op)| Expr::Compare {
                op: *op,
                lhs: Box::new(operands[i].clone()),
                rhs: Box::new(operands[i + 1].clone()),
            })
            .collect();
        Ok(if pairs.len() == 1 {
            pairs.remove(0)
        } else {
            Expr::And(pairs)
        })
    }

    fn parse_primary(&mut self) -> Result<Expr, ResourceProgramError> {
        let position = self.position();
        match self.advance() {
            Token::Str(s) => Ok(Expr::Literal(Value::Str(s))),
            Token::Int(n) => Ok(Expr::Literal(Value::Int(n))),
            Token::Float(x) => Ok(Expr::Literal(Value::Float(x))),
            Token::True => Ok(Expr::Literal(Value::Bool(true))),
            Token::False => Ok(Expr::Literal(Value::Bool(false))),
            Token::LParen => {
                self.enter()?;
                let items = self.parse_sequence(Token::RParen)?;
                self.leave();
                Ok(match items {
                    Sequence::Single(inner) => inner,
                    Sequence::Many(items) => Expr::Sequence(items),
                })
            }
            Token::LBracket => {
                self.enter()?;
                let items = self.parse_sequence(Token::RBracket)?;
                self.leave();
                Ok(Expr::Sequence(match items {
                    Sequence::Single(inner) => vec![inner],
                    Sequence::Many(items) => items,
                }))
            }
            Token::Ident(name) => self.parse_name(name, position),
            _ => {
                self.index = self.index.saturating_sub(1);
                Err(self.unexpected("operand"))
            }
        }
    }

    fn parse_name(&mut self, name: &'a str, position: usize) -> Result<Expr, ResourceProgramError> {
        match self.peek() {
            Token::Dot => {
                self.advance();
                match self.advance() {
                    Token::Ident(attribute) => Ok(Expr::Attr {
                        resource: name.to_string(),
                        attribute: attribute.to_string(),
                    }),
                    _ => {
                        self.index = self.index.saturating_sub(1);
                        Err(self.unexpected("attribute name"))
                    }
                }
            }
            Token::LParen => {
                let func = Func::from_name(name).ok_or_else(|| {
                    ResourceProgramError::UnknownFunction {
                        name: name.to_string(),
                        position,
                    }
                })?;
                self.advance();
                self.enter()?;
                let arg = self.parse_expression()?;
                self.leave();
                self.expect(Token::RParen, "')'")?;
                Ok(Expr::Call {
                    func,
                    arg: Box::new(arg),
                })
            }
            _ => Err(ResourceProgramError::BareName {
                name: name.to_string(),
                position,
            }),
        }
    }

    /// Parse comma separated expressions up to `close`.
    ///
    /// A single item without a trailing comma is a parenthesised expression.
    fn parse_sequence(&mut self, close: Token<'a>) -> Result<Sequence, ResourceProgramError> {
        let mut items = Vec::new();
        let mut trailing_comma = false;
        while *self.peek() != close {
            items.push(self.parse_expression()?);
            trailing_comma = false;
            if *self.peek() == Token::Comma {
                self.advance();
                trailing_comma = true;
            } else {
                break;
            }
        }
        self.expect(close, "closing bracket")?;
        if items.len() == 1 && !trailing_comma {
            return Ok(Sequence::Single(items.remove(0)));
        }
        Ok(Sequence::Many(items))
    }
}

enum Sequence {
    Single(Expr),
    Many(Vec<Expr>),
}

#[cfg(test)]
#[path = "expression_tests.rs"]
mod tests;
