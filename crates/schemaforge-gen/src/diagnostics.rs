//! # Diagnostic Sink
//!
//! Collects non-fatal findings from every root generated in one run.
//! Roots run on separate threads, so the sink is shared by reference and
//! synchronized internally.

use parking_lot::Mutex;
use schemaforge_core::{Diagnostic, DiagnosticKind};

/// Thread-safe collector of [`Diagnostic`]s.
#[derive(Debug, Default)]
pub struct DiagnosticSink {
    entries: Mutex<Vec<Diagnostic>>,
}

impl DiagnosticSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a finding and log it at `warn` level.
    pub fn record(&self, kind: DiagnosticKind, location: impl Into<String>, message: impl Into<String>) {
        let diagnostic = Diagnostic {
            kind,
            location: location.into(),
            message: message.into(),
        };
        tracing::warn!(kind = diagnostic.kind.as_str(), location = %diagnostic.location, "{}", diagnostic.message);
        self.entries.lock().push(diagnostic);
    }

    /// Recorded findings, sorted and deduplicated.
    ///
    /// A type reachable from several roots is described once per root, so
    /// the same finding can be recorded more than once and in an order
    /// that depends on thread scheduling.
    pub fn snapshot(&self) -> Vec<Diagnostic> {
        let mut entries = self.entries.lock().clone();
        entries.sort();
        entries.dedup();
        entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_sorted_and_deduplicated() {
        let sink = DiagnosticSink::new();
        sink.record(DiagnosticKind::UnknownConstraint, "B.x", "constraint 'future' has no schema mapping");
        sink.record(DiagnosticKind::ConstraintConflict, "A.y", "min declared twice");
        sink.record(DiagnosticKind::UnknownConstraint, "B.x", "constraint 'future' has no schema mapping");

        let snapshot = sink.snapshot();
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot[0].kind, DiagnosticKind::ConstraintConflict);
        assert_eq!(snapshot[1].location, "B.x");
    }

    #[test]
    fn test_shared_across_threads() {
        let sink = DiagnosticSink::new();
        std::thread::scope(|scope| {
            for i in 0..4 {
                let sink = &sink;
                scope.spawn(move || {
                    sink.record(DiagnosticKind::UnresolvedFilter, format!("T{i}"), "no such property");
                });
            }
        });
        assert_eq!(sink.snapshot().len(), 4);
        assert!(!sink.is_empty());
    }
}
