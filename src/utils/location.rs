//! Source locations for diagnostics on parsed index notation.
//!
//! Statements are usually written on one line (`A(i,j) = B(i,k) * C(k,j)`),
//! but spans keep line information so multi-line input reports correctly.

use std::fmt;
use serde::{Serialize, Deserialize};

/// A position in source text. Line and column are 1-indexed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceLocation {
    pub line: usize,
    pub column: usize,
    /// Byte offset into the input
    pub offset: usize,
}

impl SourceLocation {
    pub fn new(line: usize, column: usize, offset: usize) -> Self {
        Self { line, column, offset }
    }

    /// Location of the first character.
    pub fn start() -> Self {
        Self::new(1, 1, 0)
    }
}

impl Default for SourceLocation {
    fn default() -> Self {
        Self::start()
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// Half-open range `[start, end)` of source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Span {
    pub start: SourceLocation,
    pub end: SourceLocation,
}

impl Span {
    pub fn new(start: SourceLocation, end: SourceLocation) -> Self {
        Self { start, end }
    }

    /// Byte range of the span, for slicing the input.
    pub fn range(&self) -> std::ops::Range<usize> {
        self.start.offset..self.end.offset
    }

    /// Smallest span covering both.
    pub fn merge(&self, other: &Span) -> Span {
        let start = if self.start.offset <= other.start.offset { self.start } else { other.start };
        let end = if self.end.offset >= other.end.offset { self.end } else { other.end };
        Span { start, end }
    }

    /// Carets under this span, to print beneath a one-line statement.
    pub fn caret_line(&self) -> String {
        let width = self.end.column.saturating_sub(self.start.column).max(1);
        format!("{}{}", " ".repeat(self.start.column.saturating_sub(1)), "^".repeat(width))
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.start.line == self.end.line {
            write!(f, "{}-{}", self.start, self.end.column)
        } else {
            write!(f, "{}-{}", self.start, self.end)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn span(start: (usize, usize), end: (usize, usize)) -> Span {
        Span::new(
            SourceLocation::new(start.0, start.1, start.1 - 1),
            SourceLocation::new(end.0, end.1, end.1 - 1),
        )
    }

    #[test]
    fn test_span_display() {
        assert_eq!(span((1, 5), (1, 10)).to_string(), "1:5-10");
        assert_eq!(span((1, 5), (3, 10)).to_string(), "1:5-3:10");
    }

    #[test]
    fn test_span_merge() {
        let merged = span((1, 1), (1, 5)).merge(&span((1, 10), (1, 15)));
        assert_eq!(merged.start.column, 1);
        assert_eq!(merged.end.column, 15);
        assert_eq!(merged.range(), 0..14);
    }

    #[test]
    fn test_caret_line() {
        assert_eq!(span((1, 3), (1, 6)).caret_line(), "  ^^^");
    }
}
