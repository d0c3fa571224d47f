use std::fmt;

use serde::Serialize;

use crate::span::Span;

/// A tokenizer, parser or classification error.
///
/// Parsing halts at the first error; no partial tree is exposed. The error
/// carries enough structure for a renderer (1-based line and column, the byte
/// span, the offending source line) and `Display` produces a self-contained
/// caret diagnostic.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParserError {
    /// Human-readable description of what went wrong.
    pub message: String,
    /// 1-based line of the error location.
    pub line: u32,
    /// 1-based column (in characters) of the error location.
    pub column: u32,
    /// Byte span of the offending character(s).
    pub span: Span,
    /// The full text of the offending source line, without its line feed.
    pub source_line: String,
}

impl ParserError {
    /// Create a new parser error.
    pub fn new(
        message: impl Into<String>,
        line: u32,
        column: u32,
        span: Span,
        source_line: impl Into<String>,
    ) -> Self {
        Self {
            message: message.into(),
            line,
            column,
            span,
            source_line: source_line.into(),
        }
    }

    /// The two-line caret diagnostic pointing at the error column:
    /// the source line, then a `^` marker, then a `|` marker.
    pub fn pointer(&self) -> String {
        let indent = " ".repeat(self.column.saturating_sub(1) as usize);
        format!("{}\n{}^\n{}|", self.source_line, indent, indent)
    }
}

impl fmt::Display for ParserError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "line {}, col {}: {}\n\n{}",
            self.line,
            self.column,
            self.message,
            self.pointer()
        )
    }
}

impl std::error::Error for ParserError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_location_and_pointer() {
        let err = ParserError::new(
            "invalid text string",
            2,
            5,
            Span::new(12, 13),
            "a = \"oops",
        );
        assert_eq!(
            err.to_string(),
            "line 2, col 5: invalid text string\n\na = \"oops\n    ^\n    |"
        );
    }

    #[test]
    fn pointer_clamps_column_one() {
        let err = ParserError::new("boom", 1, 1, Span::new(0, 1), "x");
        assert_eq!(err.pointer(), "x\n^\n|");
    }
}
