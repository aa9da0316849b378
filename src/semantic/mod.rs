//! Semantic analysis: scopes, inference, method resolution, match
//! coverage and monomorphization

mod analyzer;
pub mod decls;
mod exhaustive;
mod infer;
mod methods;
pub mod mono;
pub mod scope;
pub mod targets;

pub use analyzer::{analyze, Analysis};
pub use decls::{AdtDef, AdtKind, CtorDef, Decls, FnDef};
pub use exhaustive::MatchCoverage;
pub use infer::BodyChecker;
pub use mono::{InstanceRecord, MonoPlan};
pub use scope::{Member, MemberTable, MethodDef, Symbol, SymbolKind, SymbolTable};
pub use targets::{BodyKey, CallTarget, CheckedBody, LiteralUse, Site};
