//! Traits: definitions, the coherence-checked impl table, and the
//! obligation solver

pub mod coherence;
pub mod registry;
pub mod solver;

pub use registry::{match_type, ImplDef, ImplId, ImplOrigin, TraitDef, TraitMethod, TraitTable};
pub use solver::{GenericEnv, Selection, Solver};
