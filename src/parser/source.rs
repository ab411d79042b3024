//! Source units and positions
//!
//! A [`SourceUnit`] is one file's identifier plus its full text. Positions
//! inside it are reported as a 1-based [`SourceLocation`] (line and column,
//! columns counted in code points) and a byte-offset [`Span`].

use std::fmt;

use super::lexer::LexError;

/// Source location information for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SourceLocation {
    pub line: usize,
    pub column: usize,
}

impl SourceLocation {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }

    /// The location `n` columns further along the same line.
    pub fn shifted(self, n: usize) -> Self {
        Self {
            line: self.line,
            column: self.column + n,
        }
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// Half-open byte range `start..end` into the source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        debug_assert!(start <= end);
        Self { start, end }
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// One file (or in-memory snippet) to be checked.
///
/// Immutable once created. The identifier is used verbatim as the prefix of
/// every diagnostic produced for this unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceUnit {
    id: String,
    text: String,
}

impl SourceUnit {
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
        }
    }

    /// Decode raw file bytes as UTF-8.
    ///
    /// Invalid input is a lexical error located at the first offending byte.
    pub fn from_bytes(id: impl Into<String>, bytes: Vec<u8>) -> Result<Self, LexError> {
        match String::from_utf8(bytes) {
            Ok(text) => Ok(Self::new(id, text)),
            Err(err) => {
                let valid_up_to = err.utf8_error().valid_up_to();
                let bytes = err.into_bytes();
                // The prefix is valid by construction.
                let prefix = String::from_utf8_lossy(&bytes[..valid_up_to]);
                Err(LexError {
                    message: format!(
                        "Invalid UTF-8 byte 0x{:02x}",
                        bytes[valid_up_to]
                    ),
                    location: location_after(&prefix),
                })
            }
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn text(&self) -> &str {
        &self.text
    }
}

/// The location of the character following `text`, using the lexer's line
/// terminator rules (`\n`, `\r\n` and a lone `\r`).
pub(crate) fn location_after(text: &str) -> SourceLocation {
    let mut line = 1;
    let mut column = 1;
    let mut chars = text.chars().peekable();
    while let Some(ch) = chars.next() {
        match ch {
            '\n' => {
                line += 1;
                column = 1;
            }
            '\r' if chars.peek() != Some(&'\n') => {
                line += 1;
                column = 1;
            }
            _ => column += 1,
        }
    }
    SourceLocation::new(line, column)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_location_after_counts_code_points() {
        assert_eq!(location_after(""), SourceLocation::new(1, 1));
        assert_eq!(location_after("héllo"), SourceLocation::new(1, 6));
        assert_eq!(location_after("a\nbc"), SourceLocation::new(2, 3));
        assert_eq!(location_after("a\r\nb"), SourceLocation::new(2, 2));
        assert_eq!(location_after("a\rb"), SourceLocation::new(2, 2));
    }

    #[test]
    fn test_from_bytes_reports_invalid_utf8() {
        let err = SourceUnit::from_bytes("bad.dart", b"var x;\n  \xff".to_vec())
            .unwrap_err();
        assert_eq!(err.location, SourceLocation::new(2, 3));
        assert!(err.message.contains("0xff"));
    }

    #[test]
    fn test_from_bytes_accepts_valid_text() {
        let unit = SourceUnit::from_bytes("ok.dart", b"var x;".to_vec()).unwrap();
        assert_eq!(unit.id(), "ok.dart");
        assert_eq!(unit.text(), "var x;");
    }
}
