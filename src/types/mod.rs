//! Type terms and unification

mod type_system;
mod unify;

pub use type_system::*;
pub use unify::{InferCtx, Obligation, Snapshot};
