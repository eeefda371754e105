//! # Diagnostics
//!
//! Non-fatal findings recorded during generation. A diagnostic never
//! blocks output; it is reported alongside the generated documents.

use std::fmt;

use serde::Serialize;

/// Category of a non-fatal finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    /// Two constraints of the same kind on one property; the tighter bound was kept.
    ConstraintConflict,
    /// A constraint kind without a schema mapping; ignored.
    UnknownConstraint,
    /// A known constraint on a value it cannot apply to; ignored.
    InapplicableConstraint,
    /// A property filter names a property the type does not have.
    UnresolvedFilter,
}

impl DiagnosticKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ConstraintConflict => "constraint-conflict",
            Self::UnknownConstraint => "unknown-constraint",
            Self::InapplicableConstraint => "inapplicable-constraint",
            Self::UnresolvedFilter => "unresolved-filter",
        }
    }
}

/// A recorded finding.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    /// Property path the finding is about (`com.example.Salamander.age`).
    pub location: String,
    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.kind.as_str(), self.location, self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_format() {
        let d = Diagnostic {
            kind: DiagnosticKind::UnknownConstraint,
            location: "com.example.Salamander.age".to_string(),
            message: "constraint 'future' has no schema mapping".to_string(),
        };
        assert_eq!(
            d.to_string(),
            "[unknown-constraint] com.example.Salamander.age: constraint 'future' has no schema mapping"
        );
    }
}
