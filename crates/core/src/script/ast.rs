//! Procedural plan tree
//!
//! Just enough structure to express "loop, call, accumulate, stop" plans.
//! Dialects turn it into text.

use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Lt,
    Gt,
    And,
}

impl BinOp {
    pub fn symbol(self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Lt => "<",
            Self::Gt => ">",
            Self::And => "&&",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Constant data, including arrays and objects of request data.
    Literal(Value),
    Var(String),
    Field(Box<Expr>, String),
    /// `target.shift()`: remove and yield the first element.
    Shift(Box<Expr>),
    /// Remote sub-call with named arguments.
    Api { method: String, args: Vec<(String, Expr)> },
    Object(Vec<(String, Expr)>),
    Binary { op: BinOp, lhs: Box<Expr>, rhs: Box<Expr> },
    Not(Box<Expr>),
}

impl Expr {
    pub fn var(name: impl Into<String>) -> Self {
        Self::Var(name.into())
    }

    pub fn int(value: i64) -> Self {
        Self::Literal(Value::from(value))
    }

    pub fn literal(value: impl Into<Value>) -> Self {
        Self::Literal(value.into())
    }

    pub fn empty_array() -> Self {
        Self::Literal(Value::Array(Vec::new()))
    }

    pub fn field(self, name: impl Into<String>) -> Self {
        Self::Field(Box::new(self), name.into())
    }

    pub fn shift(self) -> Self {
        Self::Shift(Box::new(self))
    }

    pub fn api(method: impl Into<String>, args: Vec<(String, Expr)>) -> Self {
        Self::Api { method: method.into(), args }
    }

    pub fn binary(self, op: BinOp, rhs: Expr) -> Self {
        Self::Binary { op, lhs: Box::new(self), rhs: Box::new(rhs) }
    }

    pub fn plus(self, rhs: Expr) -> Self {
        self.binary(BinOp::Add, rhs)
    }

    pub fn minus(self, rhs: Expr) -> Self {
        self.binary(BinOp::Sub, rhs)
    }

    pub fn less_than(self, rhs: Expr) -> Self {
        self.binary(BinOp::Lt, rhs)
    }

    pub fn greater_than(self, rhs: Expr) -> Self {
        self.binary(BinOp::Gt, rhs)
    }

    pub fn and(self, rhs: Expr) -> Self {
        self.binary(BinOp::And, rhs)
    }

    pub fn negate(self) -> Self {
        Self::Not(Box::new(self))
    }

    /// Number of remote sub-calls this expression issues each time it runs.
    pub fn subcalls(&self) -> usize {
        match self {
            Self::Literal(_) | Self::Var(_) => 0,
            Self::Field(inner, _) | Self::Shift(inner) | Self::Not(inner) => inner.subcalls(),
            Self::Api { args, .. } => 1 + args.iter().map(|(_, arg)| arg.subcalls()).sum::<usize>(),
            Self::Object(fields) => fields.iter().map(|(_, value)| value.subcalls()).sum(),
            Self::Binary { lhs, rhs, .. } => lhs.subcalls() + rhs.subcalls(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    /// `var name = value;`
    Let(String, Expr),
    /// `target = value;` where target is a variable or a field.
    Assign(Expr, Expr),
    /// `target.push(value);`
    Push(Expr, Expr),
    While { cond: Expr, body: Vec<Stmt> },
    If { cond: Expr, then: Vec<Stmt>, otherwise: Vec<Stmt> },
    Return(Expr),
}

impl Stmt {
    pub fn let_(name: impl Into<String>, value: Expr) -> Self {
        Self::Let(name.into(), value)
    }

    pub fn assign(target: Expr, value: Expr) -> Self {
        Self::Assign(target, value)
    }

    pub fn push(target: Expr, value: Expr) -> Self {
        Self::Push(target, value)
    }
}

/// Top-level statement list. Must end in a `return`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Script {
    pub body: Vec<Stmt>,
}

impl Script {
    pub fn new(body: Vec<Stmt>) -> Self {
        Self { body }
    }
}
