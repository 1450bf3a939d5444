use std::cell::Cell;
use std::cmp::Ordering;
use std::fmt::{Display, Formatter};

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};

use crate::internal::classad::ad::JobAd;
use crate::internal::classad::value::Value;

/// Deepest expression tree the parser and the wire decoder accept.
pub(crate) const MAX_EXPR_DEPTH: u32 = 256;

/// Recursion budget of a single evaluation, counted over expression nodes
/// and attribute references. Exhausting it yields `Error`.
const MAX_EVAL_DEPTH: u32 = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnaryOp {
    Not,
    Minus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinaryOp {
    Mul,
    Div,
    Mod,
    Add,
    Sub,
    Less,
    LessEq,
    Greater,
    GreaterEq,
    Equal,
    NotEqual,
    Is,
    IsNot,
    And,
    Or,
}

impl BinaryOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Mod => "%",
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Less => "<",
            BinaryOp::LessEq => "<=",
            BinaryOp::Greater => ">",
            BinaryOp::GreaterEq => ">=",
            BinaryOp::Equal => "==",
            BinaryOp::NotEqual => "!=",
            BinaryOp::Is => "=?=",
            BinaryOp::IsNot => "=!=",
            BinaryOp::And => "&&",
            BinaryOp::Or => "||",
        }
    }

    fn precedence(&self) -> u8 {
        match self {
            BinaryOp::Or => 1,
            BinaryOp::And => 2,
            BinaryOp::Equal | BinaryOp::NotEqual | BinaryOp::Is | BinaryOp::IsNot => 3,
            BinaryOp::Less | BinaryOp::LessEq | BinaryOp::Greater | BinaryOp::GreaterEq => 4,
            BinaryOp::Add | BinaryOp::Sub => 5,
            BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod => 6,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Expr {
    Literal(Value),
    Attr(String),
    Unary(UnaryOp, Box<Expr>),
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
    Call(String, Vec<Expr>),
}

/// Decoded shape of `Expr`. Children decode through `Expr` again, so every
/// level passes the depth check in `Expr::deserialize`.
#[derive(Deserialize)]
#[serde(rename = "Expr")]
enum ExprRepr {
    Literal(Value),
    Attr(String),
    Unary(UnaryOp, Box<Expr>),
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
    Call(String, Vec<Expr>),
}

impl From<ExprRepr> for Expr {
    fn from(repr: ExprRepr) -> Self {
        match repr {
            ExprRepr::Literal(v) => Expr::Literal(v),
            ExprRepr::Attr(name) => Expr::Attr(name),
            ExprRepr::Unary(op, operand) => Expr::Unary(op, operand),
            ExprRepr::Binary(op, lhs, rhs) => Expr::Binary(op, lhs, rhs),
            ExprRepr::Call(name, args) => Expr::Call(name, args),
        }
    }
}

thread_local! {
    static DECODE_DEPTH: Cell<u32> = const { Cell::new(0) };
}

/// Holds one level of `DECODE_DEPTH` while an expression node is decoded.
struct DecodeLevel;

impl DecodeLevel {
    fn enter() -> Option<Self> {
        DECODE_DEPTH.with(|depth| {
            if depth.get() >= MAX_EXPR_DEPTH {
                return None;
            }
            depth.set(depth.get() + 1);
            Some(DecodeLevel)
        })
    }
}

impl Drop for DecodeLevel {
    fn drop(&mut self) {
        DECODE_DEPTH.with(|depth| depth.set(depth.get().saturating_sub(1)));
    }
}

impl<'de> Deserialize<'de> for Expr {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let _level = DecodeLevel::enter().ok_or_else(|| {
            D::Error::custom(format!(
                "expression tree deeper than {MAX_EXPR_DEPTH} levels"
            ))
        })?;
        ExprRepr::deserialize(deserializer).map(Expr::from)
    }
}

/// Everything an expression may look at while it is evaluated.
#[derive(Clone, Copy)]
pub struct EvalContext<'a> {
    pub ad: &'a JobAd,
    /// Value returned by `time()`, seconds since the Unix epoch.
    pub now: i64,
}

impl<'a> EvalContext<'a> {
    pub fn new(ad: &'a JobAd, now: i64) -> Self {
        EvalContext { ad, now }
    }
}

impl Expr {
    pub fn literal(value: impl Into<Value>) -> Self {
        Expr::Literal(value.into())
    }

    pub fn attr(name: &str) -> Self {
        Expr::Attr(name.to_string())
    }

    pub fn binary(op: BinaryOp, lhs: Expr, rhs: Expr) -> Self {
        Expr::Binary(op, Box::new(lhs), Box::new(rhs))
    }

    pub fn as_literal(&self) -> Option<&Value> {
        match self {
            Expr::Literal(v) => Some(v),
            _ => None,
        }
    }

    pub fn evaluate(&self, ctx: &EvalContext) -> Value {
        Evaluator {
            ctx,
            active: Vec::new(),
        }
        .eval(self, 0)
    }

    fn precedence(&self) -> u8 {
        match self {
            Expr::Binary(op, _, _) => op.precedence(),
            Expr::Unary(_, _) => 7,
            _ => 8,
        }
    }
}

fn eval_unary(op: UnaryOp, value: Value) -> Value {
    match (op, value) {
        (_, Value::Undefined) => Value::Undefined,
        (UnaryOp::Not, v) => match v.as_bool() {
            Some(b) => Value::Bool(!b),
            None => Value::Error,
        },
        (UnaryOp::Minus, Value::Integer(v)) => {
            v.checked_neg().map(Value::Integer).unwrap_or(Value::Error)
        }
        (UnaryOp::Minus, Value::Real(v)) => Value::Real(-v),
        (UnaryOp::Minus, _) => Value::Error,
    }
}

/// Truth value of an operand of `&&`/`||`: `Ok(Some(b))` for a boolean-like value,
/// `Ok(None)` for undefined, `Err(())` for anything that is not a boolean.
fn logical_operand(value: &Value) -> Result<Option<bool>, ()> {
    match value {
        Value::Undefined => Ok(None),
        v => v.as_bool().map(Some).ok_or(()),
    }
}

/// State of one `Expr::evaluate` call.
struct Evaluator<'c, 'a> {
    ctx: &'c EvalContext<'a>,
    /// Lowercased names of the attributes currently being evaluated.
    active: Vec<String>,
}

impl Evaluator<'_, '_> {
    fn eval(&mut self, expr: &Expr, depth: u32) -> Value {
        if depth > MAX_EVAL_DEPTH {
            return Value::Error;
        }
        match expr {
            Expr::Literal(v) => v.clone(),
            Expr::Attr(name) => self.eval_reference(name, depth + 1),
            Expr::Unary(op, operand) => eval_unary(*op, self.eval(operand, depth + 1)),
            Expr::Binary(BinaryOp::And, lhs, rhs) => self.eval_and(lhs, rhs, depth + 1),
            Expr::Binary(BinaryOp::Or, lhs, rhs) => self.eval_or(lhs, rhs, depth + 1),
            Expr::Binary(op, lhs, rhs) => {
                let lhs = self.eval(lhs, depth + 1);
                let rhs = self.eval(rhs, depth + 1);
                eval_binary(*op, lhs, rhs)
            }
            Expr::Call(name, args) => {
                let args: Vec<Value> = args.iter().map(|arg| self.eval(arg, depth + 1)).collect();
                eval_call(self.ctx, name, args)
            }
        }
    }

    fn eval_reference(&mut self, name: &str, depth: u32) -> Value {
        let key = name.to_ascii_lowercase();
        // Reaching an attribute that is still being evaluated is a cycle
        if self.active.contains(&key) {
            return Value::Error;
        }
        let Some(expr) = self.ctx.ad.lookup(name) else {
            return Value::Undefined;
        };
        self.active.push(key);
        let value = self.eval(expr, depth);
        self.active.pop();
        value
    }

    fn eval_and(&mut self, lhs: &Expr, rhs: &Expr, depth: u32) -> Value {
        let left = match logical_operand(&self.eval(lhs, depth)) {
            Ok(Some(false)) => return Value::Bool(false),
            Ok(v) => v,
            Err(()) => return Value::Error,
        };
        match (left, logical_operand(&self.eval(rhs, depth))) {
            (_, Err(())) => Value::Error,
            (_, Ok(Some(false))) => Value::Bool(false),
            (Some(true), Ok(Some(true))) => Value::Bool(true),
            _ => Value::Undefined,
        }
    }

    fn eval_or(&mut self, lhs: &Expr, rhs: &Expr, depth: u32) -> Value {
        let left = match logical_operand(&self.eval(lhs, depth)) {
            Ok(Some(true)) => return Value::Bool(true),
            Ok(v) => v,
            Err(()) => return Value::Error,
        };
        match (left, logical_operand(&self.eval(rhs, depth))) {
            (_, Err(())) => Value::Error,
            (_, Ok(Some(true))) => Value::Bool(true),
            (Some(false), Ok(Some(false))) => Value::Bool(false),
            _ => Value::Undefined,
        }
    }
}

fn eval_binary(op: BinaryOp, lhs: Value, rhs: Value) -> Value {
    match op {
        BinaryOp::Is => return Value::Bool(lhs.is_identical(&rhs)),
        BinaryOp::IsNot => return Value::Bool(!lhs.is_identical(&rhs)),
        _ => {}
    }
    if lhs.is_error() || rhs.is_error() {
        return Value::Error;
    }
    if lhs.is_undefined() || rhs.is_undefined() {
        return Value::Undefined;
    }
    match op {
        BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod => {
            eval_arithmetic(op, &lhs, &rhs)
        }
        _ => match compare(&lhs, &rhs) {
            Some(ordering) => Value::Bool(match op {
                BinaryOp::Less => ordering == Ordering::Less,
                BinaryOp::LessEq => ordering != Ordering::Greater,
                BinaryOp::Greater => ordering == Ordering::Greater,
                BinaryOp::GreaterEq => ordering != Ordering::Less,
                BinaryOp::Equal => ordering == Ordering::Equal,
                BinaryOp::NotEqual => ordering != Ordering::Equal,
                _ => unreachable!(),
            }),
            None => Value::Error,
        },
    }
}

fn eval_arithmetic(op: BinaryOp, lhs: &Value, rhs: &Value) -> Value {
    match (lhs, rhs) {
        (Value::Integer(a), Value::Integer(b)) => {
            let result = match op {
                BinaryOp::Add => a.checked_add(*b),
                BinaryOp::Sub => a.checked_sub(*b),
                BinaryOp::Mul => a.checked_mul(*b),
                BinaryOp::Div => a.checked_div(*b),
                BinaryOp::Mod => a.checked_rem(*b),
                _ => None,
            };
            result.map(Value::Integer).unwrap_or(Value::Error)
        }
        (a, b) if a.is_number() && b.is_number() => {
            // Both are numbers here, so the conversions cannot fail
            let (a, b) = (a.as_number().unwrap_or(0.0), b.as_number().unwrap_or(0.0));
            match op {
                BinaryOp::Add => Value::Real(a + b),
                BinaryOp::Sub => Value::Real(a - b),
                BinaryOp::Mul => Value::Real(a * b),
                BinaryOp::Div if b == 0.0 => Value::Error,
                BinaryOp::Div => Value::Real(a / b),
                BinaryOp::Mod if b == 0.0 => Value::Error,
                BinaryOp::Mod => Value::Real(a % b),
                _ => Value::Error,
            }
        }
        _ => Value::Error,
    }
}

/// Orders two defined values. Strings compare case-insensitively, numbers and
/// booleans compare numerically. Mixed kinds are incomparable.
fn compare(lhs: &Value, rhs: &Value) -> Option<Ordering> {
    match (lhs, rhs) {
        (Value::String(a), Value::String(b)) => Some(a.to_lowercase().cmp(&b.to_lowercase())),
        (Value::Integer(a), Value::Integer(b)) => Some(a.cmp(b)),
        (Value::String(_), _) | (_, Value::String(_)) => None,
        (a, b) => a.as_number()?.partial_cmp(&b.as_number()?),
    }
}

fn eval_call(ctx: &EvalContext, name: &str, args: Vec<Value>) -> Value {
    match (name.to_ascii_lowercase().as_str(), args.as_slice()) {
        ("time", []) => Value::Integer(ctx.now),
        ("isundefined", [v]) => Value::Bool(v.is_undefined()),
        ("iserror", [v]) => Value::Bool(v.is_error()),
        ("ifthenelse", [cond, a, b]) => match cond {
            Value::Undefined => Value::Undefined,
            c => match c.as_bool() {
                Some(true) => a.clone(),
                Some(false) => b.clone(),
                None => Value::Error,
            },
        },
        ("int", [v]) => match v {
            Value::Undefined => Value::Undefined,
            Value::String(s) => s
                .trim()
                .parse::<i64>()
                .map(Value::Integer)
                .unwrap_or(Value::Error),
            v => v.as_integer().map(Value::Integer).unwrap_or(Value::Error),
        },
        ("strcat", args) => {
            let mut output = String::new();
            for arg in args {
                match arg {
                    Value::Undefined => return Value::Undefined,
                    Value::Error => return Value::Error,
                    Value::String(s) => output.push_str(s),
                    v => output.push_str(&v.to_string()),
                }
            }
            Value::String(output)
        }
        _ => Value::Error,
    }
}

impl Display for UnaryOp {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            UnaryOp::Not => "!",
            UnaryOp::Minus => "-",
        })
    }
}

impl Display for Expr {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Expr::Literal(v) => v.fmt(f),
            Expr::Attr(name) => f.write_str(name),
            Expr::Unary(op, operand) => {
                if operand.precedence() < self.precedence() {
                    write!(f, "{op}({operand})")
                } else {
                    write!(f, "{op}{operand}")
                }
            }
            Expr::Binary(op, lhs, rhs) => {
                let prec = op.precedence();
                if lhs.precedence() < prec {
                    write!(f, "({lhs})")?;
                } else {
                    write!(f, "{lhs}")?;
                }
                write!(f, " {} ", op.symbol())?;
                if rhs.precedence() <= prec {
                    write!(f, "({rhs})")
                } else {
                    write!(f, "{rhs}")
                }
            }
            Expr::Call(name, args) => {
                write!(f, "{name}(")?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{arg}")?;
                }
                f.write_str(")")
            }
        }
    }
}
