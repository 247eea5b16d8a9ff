// src/vm/mod.rs

//! The strategy scripting language: players' strategies are short scripts
//! that read `refChoice` (and `sharedBits` or their qubit) and set `move`.
//!
//! Scripts are parsed once per batch into a [`Program`] and run once per
//! round by the [`Interpreter`], inside an [`Environment`] that belongs to a
//! single player. An [`ExecutionGuard`] bounds how long a run may take.

mod guard;
mod interpreter;
mod lexer;
pub mod program;
mod value;

pub use guard::{ExecutionGuard, GuardHandle};
pub use interpreter::{Environment, Host, Interpreter, read_move, run};
pub use lexer::Span;
pub use program::Program;
pub use value::Value;
