use std::fmt::{self, Display, Formatter};

use serde::Serialize;

/// Category of a non-fatal problem found during ingestion or lowering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    /// A recognized object was unusable or unsupported and was dropped.
    Structural,
    /// A name reference did not resolve; a default was used or it was omitted.
    Referential,
    /// A present field failed to parse and was treated as absent.
    Value,
}

impl Display for DiagnosticKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Structural => "structural",
            Self::Referential => "referential",
            Self::Value => "value",
        };
        f.write_str(label)
    }
}

/// One recorded problem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub message: String,
}

/// Append-only diagnostics sink.
///
/// Stages only push into it. Every entry is mirrored to `tracing` at warn
/// level so it shows up live when logging is enabled.
#[derive(Debug, Default, Clone, Serialize)]
#[serde(transparent)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, kind: DiagnosticKind, message: impl Into<String>) {
        let message = message.into();
        tracing::warn!(%kind, "{message}");
        self.entries.push(Diagnostic { kind, message });
    }

    pub fn structural(&mut self, message: impl Into<String>) {
        self.push(DiagnosticKind::Structural, message);
    }

    pub fn referential(&mut self, message: impl Into<String>) {
        self.push(DiagnosticKind::Referential, message);
    }

    pub fn value(&mut self, message: impl Into<String>) {
        self.push(DiagnosticKind::Value, message);
    }

    /// Move every entry of `other` onto the end of this sink.
    ///
    /// Entries were already logged when first pushed, so they are not
    /// re-emitted here.
    pub fn absorb(&mut self, other: Diagnostics) {
        self.entries.extend(other.entries);
    }

    pub fn entries(&self) -> &[Diagnostic] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn messages(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|d| d.message.as_str())
    }

    /// True when some message contains `needle`. Test helper.
    pub fn contains(&self, needle: &str) -> bool {
        self.messages().any(|m| m.contains(needle))
    }
}

#[cfg(test)]
mod tests {
    use super::{DiagnosticKind, Diagnostics};

    #[test]
    fn absorb_keeps_order() {
        let mut run = Diagnostics::new();
        run.structural("first");
        let mut task = Diagnostics::new();
        task.value("second");
        task.referential("third");
        run.absorb(task);

        let kinds: Vec<_> = run.entries().iter().map(|d| d.kind).collect();
        assert_eq!(
            kinds,
            vec![
                DiagnosticKind::Structural,
                DiagnosticKind::Value,
                DiagnosticKind::Referential
            ]
        );
        assert!(run.contains("third"));
    }
}
