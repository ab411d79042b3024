//! Conformance checking
//!
//! The entry points here turn a [`SourceUnit`] into a [`Verdict`]: either
//! accepted, or rejected with the first [`Diagnostic`] found.

use std::fmt;

use tracing::{debug, debug_span};

use crate::parser::parse::{recognize, ParseOptions, RecognitionError};
use crate::parser::source::{SourceLocation, SourceUnit};

/// Which stage found the problem.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticKind {
    Lexical,
    Syntax,
}

/// The single error reported for a rejected unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub source_id: String,
    pub location: SourceLocation,
    pub kind: DiagnosticKind,
    pub message: String,
}

impl Diagnostic {
    fn from_error(source_id: &str, err: &RecognitionError) -> Self {
        let kind = match err {
            RecognitionError::Lex(_) => DiagnosticKind::Lexical,
            RecognitionError::Parse(_) => DiagnosticKind::Syntax,
        };
        Self {
            source_id: source_id.to_owned(),
            location: err.location(),
            kind,
            message: err.message().to_owned(),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}: {}", self.source_id, self.location, self.message)
    }
}

impl std::error::Error for Diagnostic {}

/// Outcome of checking one unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Accepted,
    Rejected(Diagnostic),
}

impl Verdict {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Verdict::Accepted)
    }

    pub fn diagnostic(&self) -> Option<&Diagnostic> {
        match self {
            Verdict::Accepted => None,
            Verdict::Rejected(diagnostic) => Some(diagnostic),
        }
    }
}

/// Check one unit with default options.
pub fn check(unit: &SourceUnit) -> Verdict {
    check_with_options(unit, &ParseOptions::default())
}

pub fn check_with_options(unit: &SourceUnit, options: &ParseOptions) -> Verdict {
    let _span = debug_span!("check", source = unit.id()).entered();
    match recognize(unit.text(), options) {
        Ok(()) => {
            debug!("accepted");
            Verdict::Accepted
        }
        Err(err) => reject(unit.id(), &err),
    }
}

/// Check raw file contents; bytes that are not UTF-8 are a lexical error.
pub fn check_bytes(id: &str, bytes: Vec<u8>, options: &ParseOptions) -> Verdict {
    match SourceUnit::from_bytes(id, bytes) {
        Ok(unit) => check_with_options(&unit, options),
        Err(err) => reject(id, &RecognitionError::Lex(err)),
    }
}

/// Check every unit independently, returning verdicts in input order.
pub fn check_all<'a>(
    units: impl IntoIterator<Item = &'a SourceUnit>,
    options: &ParseOptions,
) -> Vec<Verdict> {
    units
        .into_iter()
        .map(|unit| check_with_options(unit, options))
        .collect()
}

fn reject(id: &str, err: &RecognitionError) -> Verdict {
    let diagnostic = Diagnostic::from_error(id, err);
    debug!(kind = ?diagnostic.kind, %diagnostic, "rejected");
    Verdict::Rejected(diagnostic)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_valid_unit() {
        let unit = SourceUnit::new("ok.dart", "void main() => print('hi');");
        assert_eq!(check(&unit), Verdict::Accepted);
    }

    #[test]
    fn test_diagnostic_format() {
        let unit = SourceUnit::new("bad.dart", "void main() {\n  print('hi')\n}");
        let verdict = check(&unit);
        let diagnostic = verdict.diagnostic().unwrap();
        assert_eq!(diagnostic.kind, DiagnosticKind::Syntax);
        assert_eq!(
            diagnostic.to_string(),
            "bad.dart:3:1: Expected ';' after expression, found '}'"
        );
    }

    #[test]
    fn test_lexical_diagnostic() {
        let unit = SourceUnit::new("lex.dart", "var a;\nvar § = 1;");
        let diagnostic = check(&unit).diagnostic().cloned().unwrap();
        assert_eq!(diagnostic.kind, DiagnosticKind::Lexical);
        assert_eq!(diagnostic.location, SourceLocation::new(2, 5));
    }

    #[test]
    fn test_check_bytes_rejects_invalid_utf8() {
        let verdict = check_bytes("raw.dart", vec![b'v', 0xc3], &ParseOptions::default());
        let diagnostic = verdict.diagnostic().unwrap();
        assert_eq!(diagnostic.kind, DiagnosticKind::Lexical);
        assert_eq!(diagnostic.location, SourceLocation::new(1, 2));
    }

    #[test]
    fn test_check_all_preserves_order() {
        let units = [
            SourceUnit::new("a.dart", "class A {}"),
            SourceUnit::new("b.dart", "class {}"),
            SourceUnit::new("c.dart", "class C {}"),
        ];
        let verdicts = check_all(&units, &ParseOptions::default());
        let accepted: Vec<bool> = verdicts.iter().map(Verdict::is_accepted).collect();
        assert_eq!(accepted, [true, false, true]);
        assert_eq!(verdicts[1].diagnostic().unwrap().source_id, "b.dart");
    }
}
