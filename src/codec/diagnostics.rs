//! # Diagnostics
//!
//! Per-field problems collected during an encode. Nothing here stops the
//! encode: a field with an error is left out of the message, a composite
//! with a consistency warning is left out, and everything else still goes
//! through. The caller decides whether a partial message is worth sending.

use std::fmt;

use serde::Serialize;

use crate::error::EncodeError;

/// A composite has bits set but was not included
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConsistencyWarning {
    /// Composite field name
    pub field: String,

    /// Names of the flags that were set
    pub set_flags: Vec<String>,
}

impl fmt::Display for ConsistencyWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: bits set but not included ({})",
            self.field,
            self.set_flags.join(", ")
        )
    }
}

/// Severity of a diagnostic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

/// One problem found during an encode
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    /// Parse, range or unknown-field error; the field was dropped
    Error(EncodeError),
    /// Composite bits set without the include flag; the composite was dropped
    Warning(ConsistencyWarning),
}

impl Diagnostic {
    pub fn severity(&self) -> Severity {
        match self {
            Diagnostic::Error(_) => Severity::Error,
            Diagnostic::Warning(_) => Severity::Warning,
        }
    }

    /// Name of the field the diagnostic is about
    pub fn field(&self) -> &str {
        match self {
            Diagnostic::Error(err) => err.field(),
            Diagnostic::Warning(warning) => &warning.field,
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::Error(err) => write!(f, "Error: {}", err),
            Diagnostic::Warning(warning) => write!(f, "Warning: {}", warning),
        }
    }
}

impl Serialize for Diagnostic {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeStruct;

        let mut state = serializer.serialize_struct("Diagnostic", 3)?;
        state.serialize_field("severity", &self.severity())?;
        state.serialize_field("field", self.field())?;
        state.serialize_field("message", &self.to_string())?;
        state.end()
    }
}

/// Ordered list of diagnostics from one encode
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_error(&mut self, error: EncodeError) {
        self.entries.push(Diagnostic::Error(error));
    }

    pub fn push_warning(&mut self, warning: ConsistencyWarning) {
        self.entries.push(Diagnostic::Warning(warning));
    }

    /// Whether any field was dropped because of a parse, range or name error
    pub fn has_errors(&self) -> bool {
        self.entries.iter().any(|d| d.severity() == Severity::Error)
    }

    pub fn error_count(&self) -> usize {
        self.entries.iter().filter(|d| d.severity() == Severity::Error).count()
    }

    pub fn warning_count(&self) -> usize {
        self.entries.iter().filter(|d| d.severity() == Severity::Warning).count()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Human-readable lines, one per problem, in the order found
    pub fn messages(&self) -> Vec<String> {
        self.entries.iter().map(ToString::to_string).collect()
    }
}

impl<'a> IntoIterator for &'a Diagnostics {
    type Item = &'a Diagnostic;
    type IntoIter = std::slice::Iter<'a, Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn range_error() -> EncodeError {
        EncodeError::Range {
            field: "HIPRESS".to_string(),
            value: "2000".to_string(),
            allowed: "[0, 1084]".to_string(),
        }
    }

    fn warning() -> ConsistencyWarning {
        ConsistencyWarning {
            field: "FLAGS1".to_string(),
            set_flags: vec!["BINARY".to_string(), "DEST".to_string()],
        }
    }

    #[test]
    fn test_empty() {
        let diagnostics = Diagnostics::new();
        assert!(diagnostics.is_empty());
        assert!(!diagnostics.has_errors());
        assert!(diagnostics.messages().is_empty());
    }

    #[test]
    fn test_warnings_are_not_errors() {
        let mut diagnostics = Diagnostics::new();
        diagnostics.push_warning(warning());
        assert!(!diagnostics.has_errors());
        assert_eq!(diagnostics.warning_count(), 1);
        assert_eq!(diagnostics.error_count(), 0);
    }

    #[test]
    fn test_order_and_messages() {
        let mut diagnostics = Diagnostics::new();
        diagnostics.push_warning(warning());
        diagnostics.push_error(range_error());

        assert!(diagnostics.has_errors());
        assert_eq!(
            diagnostics.messages(),
            vec![
                "Warning: FLAGS1: bits set but not included (BINARY, DEST)".to_string(),
                "Error: HIPRESS: value 2000 is out of range [0, 1084]".to_string(),
            ]
        );
        let fields: Vec<&str> = diagnostics.iter().map(Diagnostic::field).collect();
        assert_eq!(fields, vec!["FLAGS1", "HIPRESS"]);
    }

    #[test]
    fn test_serialize_json() {
        let mut diagnostics = Diagnostics::new();
        diagnostics.push_error(range_error());

        let json = serde_json::to_value(&diagnostics).unwrap();
        assert_eq!(json[0]["severity"], "error");
        assert_eq!(json[0]["field"], "HIPRESS");
        assert_eq!(json[0]["message"], "Error: HIPRESS: value 2000 is out of range [0, 1084]");
    }
}
