//! Standard library: native functions, built-in traits and the prelude

pub mod builtins;

pub use builtins::{register_builtin_traits, Builtin, BuiltinFunc, BuiltinRegistry, EQ_TRAIT, NUM_TRAIT};

/// Source compiled ahead of every program
pub const PRELUDE: &str = "enum Option<T> { Some(T), None }\n";

/// Name the prelude is reported under in diagnostics
pub const PRELUDE_NAME: &str = "<prelude>";
