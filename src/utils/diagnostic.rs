//! Rendering of errors into the user-facing diagnostic format

use crate::utils::{Error, ErrorKind, SourceMap, Span};
use serde::Serialize;
use std::fmt;

/// A resolved source position
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Location {
    pub file: String,
    pub line: u32,
    pub column: u32,
}

impl Location {
    fn from_span(span: Span, sources: &SourceMap) -> Self {
        Self {
            file: sources.name(span.file_id).to_string(),
            line: span.line,
            column: span.column,
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.line, self.column)
    }
}

/// Second location attached to coherence errors
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PreviousImpl {
    pub head: String,
    pub location: Location,
}

/// An error paired with resolved locations, ready to print
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub kind: ErrorKind,
    pub message: String,
    pub location: Option<Location>,
    pub previous: Option<PreviousImpl>,
}

impl Diagnostic {
    pub fn new(error: &Error, sources: &SourceMap) -> Self {
        let previous = match error {
            Error::OverlappingInstance { previous_ty, previous, .. } => Some(PreviousImpl {
                head: previous_ty.clone(),
                location: Location::from_span(*previous, sources),
            }),
            _ => None,
        };
        Self {
            kind: error.kind(),
            message: error.to_string(),
            location: error.span().map(|span| Location::from_span(span, sources)),
            previous,
        }
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| self.to_string())
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.kind == ErrorKind::Runtime {
            return write!(f, "*** Exception: {}", self.message);
        }
        match &self.location {
            Some(loc) => write!(f, "Error: {}: {}", loc, self.message)?,
            None => write!(f, "Error: {}", self.message)?,
        }
        if let Some(prev) = &self.previous {
            write!(f, "\nPrevious impl for type `{}` at {}", prev.head, prev.location)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sources() -> SourceMap {
        let mut map = SourceMap::new();
        map.add("test.spl");
        map
    }

    #[test]
    fn renders_position_and_message() {
        let err = Error::UndefinedSymbol {
            name: "y".into(),
            span: Span::new(20, 21, 3, 9, 0),
        };
        let diag = Diagnostic::new(&err, &sources());
        assert_eq!(
            diag.to_string(),
            "Error: test.spl:3:9: symbol \"y\" is not defined in this scope"
        );
    }

    #[test]
    fn overlap_adds_previous_impl_line() {
        let err = Error::OverlappingInstance {
            trait_name: "Show".into(),
            ty: "Option<Int>".into(),
            previous_ty: "Option<T>".into(),
            span: Span::new(50, 60, 7, 1, 0),
            previous: Span::new(10, 20, 2, 1, 0),
        };
        let diag = Diagnostic::new(&err, &sources());
        assert_eq!(
            diag.to_string(),
            "Error: test.spl:7:1: overlapping impl of trait Show for type Option<Int>\n\
             Previous impl for type `Option<T>` at test.spl:2:1"
        );
    }

    #[test]
    fn runtime_errors_render_as_exceptions() {
        let diag = Diagnostic::new(&Error::runtime("division by zero"), &sources());
        assert_eq!(diag.to_string(), "*** Exception: division by zero");
    }

    #[test]
    fn json_carries_kind() {
        let diag = Diagnostic::new(&Error::RepeatedConstructor { span: Span::new(0, 1, 1, 1, 0) }, &sources());
        let json = diag.to_json();
        assert!(json.contains("\"kind\":\"RepeatedConstructor\""));
        assert!(json.contains("\"line\":1"));
    }
}
