//! Backend module - reference evaluator standing in for code generation

pub mod eval;
pub mod value;

pub use eval::{Interpreter, DEFAULT_CALL_DEPTH, STACK_PER_CALL};
pub use value::Value;
