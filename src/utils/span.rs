//! Source location tracking

use serde::Serialize;

/// A span represents a range in the source code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Span {
    /// Start byte offset
    pub start: usize,
    /// End byte offset (exclusive)
    pub end: usize,
    /// 1-based line of `start`
    pub line: u32,
    /// 1-based column of `start`
    pub column: u32,
    /// File ID
    pub file_id: usize,
}

impl Span {
    /// Create a new span
    pub fn new(start: usize, end: usize, line: u32, column: u32, file_id: usize) -> Self {
        Self { start, end, line, column, file_id }
    }

    /// Create a dummy span (for built-in declarations and tests)
    pub fn dummy() -> Self {
        Self { start: 0, end: 0, line: 0, column: 0, file_id: 0 }
    }

    /// Merge two spans; the position is taken from whichever starts first
    pub fn merge(&self, other: &Span) -> Span {
        let (line, column) = if other.start < self.start {
            (other.line, other.column)
        } else {
            (self.line, self.column)
        };
        Span {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
            line,
            column,
            file_id: self.file_id,
        }
    }
}

impl Default for Span {
    fn default() -> Self {
        Self::dummy()
    }
}

/// Names of the files spans point into, indexed by `Span::file_id`
#[derive(Debug, Clone, Default)]
pub struct SourceMap {
    files: Vec<String>,
}

impl SourceMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a file and return its id
    pub fn add(&mut self, name: impl Into<String>) -> usize {
        self.files.push(name.into());
        self.files.len() - 1
    }

    pub fn name(&self, file_id: usize) -> &str {
        self.files.get(file_id).map(String::as_str).unwrap_or("<unknown>")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_keeps_earliest_position() {
        let a = Span::new(10, 12, 2, 3, 0);
        let b = Span::new(4, 6, 1, 5, 0);
        let m = a.merge(&b);
        assert_eq!((m.start, m.end), (4, 12));
        assert_eq!((m.line, m.column), (1, 5));
    }

    #[test]
    fn source_map_names() {
        let mut map = SourceMap::new();
        let id = map.add("main.spl");
        assert_eq!(map.name(id), "main.spl");
        assert_eq!(map.name(7), "<unknown>");
    }
}
