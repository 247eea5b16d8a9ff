// src/vm/interpreter.rs

//! Tree-walking interpreter for strategy scripts.

use super::guard::ExecutionGuard;
use super::program::{BinaryOp, DeclKind, Expr, LogicalOp, Program, Stmt, UnaryOp};
use super::value::Value;
use crate::core::ChshError;
use log::trace;
use rand::Rng;
use std::collections::HashMap;
use std::sync::Arc;

/// Functions supplied by the embedding game (e.g. `turn` and `measure`).
///
/// `call` returns `None` for names the host does not provide, letting the
/// interpreter fall back to its builtins.
pub trait Host {
    fn call(&mut self, name: &str, args: &[Value]) -> Option<Result<Value, ChshError>>;
}

/// No extra functions.
impl Host for () {
    fn call(&mut self, _name: &str, _args: &[Value]) -> Option<Result<Value, ChshError>> {
        None
    }
}

#[derive(Debug, Clone)]
struct Binding {
    value: Value,
    constant: bool,
}

/// The variables visible to one script run.
///
/// Each player gets an environment of its own, so nothing one strategy
/// defines is visible to the other.
#[derive(Debug, Clone, Default)]
pub struct Environment {
    vars: HashMap<String, Binding>,
}

impl Environment {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates or overwrites a mutable variable.
    pub fn define(&mut self, name: impl Into<String>, value: Value) {
        self.vars.insert(name.into(), Binding { value, constant: false });
    }

    fn define_const(&mut self, name: impl Into<String>, value: Value) {
        self.vars.insert(name.into(), Binding { value, constant: true });
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.vars.get(name).map(|b| &b.value)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.vars.contains_key(name)
    }

    /// Assigns to a variable, creating it when it does not exist yet.
    pub fn assign(&mut self, name: &str, value: Value) -> Result<(), ChshError> {
        match self.vars.get_mut(name) {
            Some(binding) if binding.constant => Err(ChshError::evaluation(format!(
                "TypeError: Assignment to constant variable '{}'",
                name
            ))),
            Some(binding) => {
                binding.value = value;
                Ok(())
            }
            None => {
                self.define(name, value);
                Ok(())
            }
        }
    }
}

enum Flow {
    Normal,
    Break,
    Continue,
}

/// Executes parsed programs against an [`Environment`] and a [`Host`].
pub struct Interpreter<'a> {
    env: &'a mut Environment,
    host: &'a mut dyn Host,
    guard: &'a ExecutionGuard,
}

impl<'a> Interpreter<'a> {
    pub fn new(env: &'a mut Environment, host: &'a mut dyn Host, guard: &'a ExecutionGuard) -> Self {
        Self { env, host, guard }
    }

    /// Runs every statement of `program` in order.
    ///
    /// # Returns
    /// * `Err(ChshError::Evaluation)` for runtime errors and uncaught `throw`s.
    /// * `Err(ChshError::Timeout)` / `Err(ChshError::Cancelled)` when the guard trips.
    pub fn run(&mut self, program: &Program) -> Result<(), ChshError> {
        for stmt in program.statements() {
            // Stray break/continue are rejected by the parser.
            self.exec(stmt)?;
        }
        Ok(())
    }

    fn exec(&mut self, stmt: &Stmt) -> Result<Flow, ChshError> {
        self.guard.check()?;
        match stmt {
            Stmt::Empty => {}
            Stmt::Expr(expr) => {
                self.eval(expr)?;
            }
            Stmt::Block(body) => {
                for inner in body {
                    match self.exec(inner)? {
                        Flow::Normal => {}
                        flow => return Ok(flow),
                    }
                }
            }
            Stmt::Declare { kind, declarators } => {
                for decl in declarators {
                    let value = match &decl.init {
                        Some(init) => Some(self.eval(init)?),
                        None => None,
                    };
                    match (kind, value) {
                        (DeclKind::Const, Some(v)) => self.env.define_const(decl.name.as_str(), v),
                        // Redeclaring with `var` keeps the old value.
                        (DeclKind::Var, None) if self.env.contains(&decl.name) => {}
                        (_, v) => self.env.define(decl.name.as_str(), v.unwrap_or(Value::Undefined)),
                    }
                }
            }
            Stmt::If { test, then, otherwise } => {
                if self.eval(test)?.is_truthy() {
                    return self.exec(then);
                } else if let Some(otherwise) = otherwise {
                    return self.exec(otherwise);
                }
            }
            Stmt::While { test, body } => {
                while self.eval(test)?.is_truthy() {
                    if let Flow::Break = self.exec(body)? {
                        break;
                    }
                }
            }
            Stmt::For { init, test, update, body } => {
                if let Some(init) = init {
                    self.exec(init)?;
                }
                loop {
                    if let Some(test) = test {
                        if !self.eval(test)?.is_truthy() {
                            break;
                        }
                    }
                    if let Flow::Break = self.exec(body)? {
                        break;
                    }
                    if let Some(update) = update {
                        self.eval(update)?;
                    }
                    self.guard.check()?;
                }
            }
            Stmt::Break { .. } => return Ok(Flow::Break),
            Stmt::Continue { .. } => return Ok(Flow::Continue),
            Stmt::Throw { value, span } => {
                let thrown = self.eval(value)?;
                return Err(ChshError::evaluation(format!("Uncaught {} (thrown at {})", thrown, span)));
            }
        }
        Ok(Flow::Normal)
    }

    fn lookup(&self, name: &str) -> Result<Value, ChshError> {
        self.env
            .get(name)
            .cloned()
            .ok_or_else(|| ChshError::evaluation(format!("ReferenceError: {} is not defined", name)))
    }

    fn eval(&mut self, expr: &Expr) -> Result<Value, ChshError> {
        Ok(match expr {
            Expr::Number(n) => Value::Number(*n),
            Expr::Str(s) => Value::Str(Arc::clone(s)),
            Expr::Bool(b) => Value::Bool(*b),
            Expr::Undefined => Value::Undefined,
            Expr::Ident { name, .. } => self.lookup(name)?,
            Expr::Array(items) => {
                let mut values = Vec::with_capacity(items.len());
                for item in items {
                    values.push(self.eval(item)?);
                }
                Value::array(values)
            }
            Expr::Index { target, index, .. } => {
                let target = self.eval(target)?;
                let index = self.eval(index)?;
                index_value(&target, &index)?
            }
            Expr::Member { target, name, .. } => {
                let target = self.eval(target)?;
                member_value(&target, name)?
            }
            Expr::Call { callee, args, .. } => {
                let mut values = Vec::with_capacity(args.len());
                for arg in args {
                    values.push(self.eval(arg)?);
                }
                self.call(callee, &values)?
            }
            Expr::Unary { op, operand } => {
                let v = self.eval(operand)?;
                match op {
                    UnaryOp::Not => Value::Bool(!v.is_truthy()),
                    UnaryOp::Neg => Value::Number(-v.to_number()),
                    UnaryOp::Plus => Value::Number(v.to_number()),
                    UnaryOp::BitNot => Value::Number(f64::from(!v.to_int32())),
                }
            }
            Expr::Binary { op, lhs, rhs } => {
                let l = self.eval(lhs)?;
                let r = self.eval(rhs)?;
                binary(*op, &l, &r)
            }
            Expr::Logical { op, lhs, rhs } => {
                // Operands are returned as-is, not converted to booleans.
                let l = self.eval(lhs)?;
                match (op, l.is_truthy()) {
                    (LogicalOp::And, true) | (LogicalOp::Or, false) => self.eval(rhs)?,
                    _ => l,
                }
            }
            Expr::Conditional { test, then, otherwise } => {
                if self.eval(test)?.is_truthy() {
                    self.eval(then)?
                } else {
                    self.eval(otherwise)?
                }
            }
            Expr::Assign { name, value, .. } => {
                let v = self.eval(value)?;
                self.env.assign(name, v.clone())?;
                v
            }
            Expr::Update { name, delta, prefix, .. } => {
                let old = self.lookup(name)?.to_number();
                let new = old + delta;
                self.env.assign(name, Value::Number(new))?;
                Value::Number(if *prefix { new } else { old })
            }
        })
    }

    fn call(&mut self, name: &str, args: &[Value]) -> Result<Value, ChshError> {
        self.guard.check()?;
        trace!("call {}({} args)", name, args.len());
        if let Some(result) = self.host.call(name, args) {
            return result;
        }
        let arg = |i: usize| args.get(i).map_or(f64::NAN, Value::to_number);
        let value = match name {
            "random" | "Math.random" => rand::rng().random::<f64>(),
            "Math.floor" => arg(0).floor(),
            "Math.abs" => arg(0).abs(),
            "Math.sqrt" => arg(0).sqrt(),
            _ => {
                return Err(ChshError::evaluation(format!("TypeError: {} is not a function", name)));
            }
        };
        Ok(Value::Number(value))
    }
}

fn index_value(target: &Value, index: &Value) -> Result<Value, ChshError> {
    let position = index.to_number();
    let slot = (position >= 0.0 && position.fract() == 0.0).then_some(position as usize);
    Ok(match target {
        Value::Undefined => {
            return Err(ChshError::evaluation(format!(
                "TypeError: Cannot read properties of undefined (reading '{}')",
                index
            )));
        }
        Value::Array(items) => slot.and_then(|i| items.get(i)).cloned().unwrap_or(Value::Undefined),
        Value::Str(s) => slot
            .and_then(|i| s.chars().nth(i))
            .map_or(Value::Undefined, |c| Value::from(c.to_string().as_str())),
        _ => Value::Undefined,
    })
}

fn member_value(target: &Value, name: &str) -> Result<Value, ChshError> {
    Ok(match (target, name) {
        (Value::Undefined, _) => {
            return Err(ChshError::evaluation(format!(
                "TypeError: Cannot read properties of undefined (reading '{}')",
                name
            )));
        }
        (Value::Array(items), "length") => Value::Number(items.len() as f64),
        (Value::Str(s), "length") => Value::Number(s.chars().count() as f64),
        _ => Value::Undefined,
    })
}

fn binary(op: BinaryOp, l: &Value, r: &Value) -> Value {
    let num = |f: fn(f64, f64) -> f64| Value::Number(f(l.to_number(), r.to_number()));
    let int = |f: fn(i32, i32) -> i32| Value::Number(f64::from(f(l.to_int32(), r.to_int32())));
    let cmp = |f: fn(f64, f64) -> bool| Value::Bool(f(l.to_number(), r.to_number()));
    match op {
        BinaryOp::Add => match (l, r) {
            (Value::Str(_), _) | (_, Value::Str(_)) => Value::from(format!("{}{}", l, r).as_str()),
            _ => num(|a, b| a + b),
        },
        BinaryOp::Sub => num(|a, b| a - b),
        BinaryOp::Mul => num(|a, b| a * b),
        BinaryOp::Div => num(|a, b| a / b),
        BinaryOp::Rem => num(|a, b| a % b),
        BinaryOp::Lt => cmp(|a, b| a < b),
        BinaryOp::Le => cmp(|a, b| a <= b),
        BinaryOp::Gt => cmp(|a, b| a > b),
        BinaryOp::Ge => cmp(|a, b| a >= b),
        BinaryOp::LooseEq => Value::Bool(l.loose_eq(r)),
        BinaryOp::LooseNe => Value::Bool(!l.loose_eq(r)),
        BinaryOp::StrictEq => Value::Bool(l.strict_eq(r)),
        BinaryOp::StrictNe => Value::Bool(!l.strict_eq(r)),
        BinaryOp::BitAnd => int(|a, b| a & b),
        BinaryOp::BitXor => int(|a, b| a ^ b),
        BinaryOp::BitOr => int(|a, b| a | b),
    }
}

/// Runs `program` once. Shorthand for [`Interpreter::run`].
pub fn run(
    program: &Program,
    env: &mut Environment,
    host: &mut dyn Host,
    guard: &ExecutionGuard,
) -> Result<(), ChshError> {
    Interpreter::new(env, host, guard).run(program)
}

/// Reads the `move` variable a strategy must set.
///
/// Anything loosely equal to `true` or `false` is accepted, so `a ^ b`
/// (which yields 0 or 1) works as a move.
pub fn read_move(env: &Environment) -> Result<bool, ChshError> {
    let value = env.get("move").cloned().unwrap_or(Value::Undefined);
    if value.loose_eq(&Value::Bool(true)) {
        Ok(true)
    } else if value.loose_eq(&Value::Bool(false)) {
        Ok(false)
    } else {
        Err(ChshError::evaluation(format!(
            "'move' variable ended up {} instead of true or false",
            value
        )))
    }
}
