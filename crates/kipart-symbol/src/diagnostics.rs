use std::collections::HashSet;
use std::fmt::{self, Display};

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Error,
}

/// A non-fatal problem noticed while turning rows into symbols.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    /// Part or file the message is about.
    pub origin: String,
    pub body: String,
}

impl Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let level = match self.severity {
            Severity::Warning => "warning",
            Severity::Error => "error",
        };
        write!(f, "{level}: {}: {}", self.origin, self.body)
    }
}

/// Collects diagnostics for a run.
///
/// Repeated warnings with identical text are only recorded once. In strict
/// mode every warning is escalated to an error, which callers use to turn a
/// recoverable row problem into a failure.
#[derive(Debug, Default)]
pub struct Diagnostics {
    strict: bool,
    seen: HashSet<String>,
    items: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn strict() -> Self {
        Self {
            strict: true,
            ..Self::default()
        }
    }

    pub fn is_strict(&self) -> bool {
        self.strict
    }

    /// Record a warning unless the same text was already reported.
    pub fn warn_once(&mut self, origin: &str, body: impl Into<String>) {
        let body = body.into();
        let key = format!("{origin}\u{0}{body}");
        if !self.seen.insert(key) {
            return;
        }
        let severity = if self.strict {
            Severity::Error
        } else {
            Severity::Warning
        };
        log::warn!("{origin}: {body}");
        self.items.push(Diagnostic {
            severity,
            origin: origin.to_string(),
            body,
        });
    }

    pub fn error(&mut self, origin: &str, body: impl Into<String>) {
        let body = body.into();
        log::error!("{origin}: {body}");
        self.items.push(Diagnostic {
            severity: Severity::Error,
            origin: origin.to_string(),
            body,
        });
    }

    pub fn has_errors(&self) -> bool {
        self.items.iter().any(|d| d.severity == Severity::Error)
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.items.iter()
    }
}
