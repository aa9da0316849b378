//! Utility module

mod diagnostic;
mod error;
mod span;

pub use diagnostic::{Diagnostic, Location, PreviousImpl};
pub use error::{Error, ErrorKind, Result};
pub use span::{SourceMap, Span};
