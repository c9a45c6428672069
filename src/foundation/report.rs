use std::collections::HashSet;

/// Severity of a user-visible failure.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Severity {
    /// Informational note.
    Info,
    /// Something degraded but rendering continues.
    Warning,
    /// A component failed; its output is missing from the frame.
    Error,
}

/// One user-visible failure: where it came from, how bad it is, and what happened.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Report {
    /// Severity.
    pub severity: Severity,
    /// Component that produced the report (a frame job name, an effect id, ...).
    pub source: String,
    /// Human-readable message.
    pub message: String,
}

/// Collects reports and surfaces each distinct one exactly once.
///
/// The frame loop calls into this instead of propagating job errors, so a broken effect does not
/// abort an export that takes hours.
#[derive(Debug, Default)]
pub struct Reporter {
    seen: HashSet<Report>,
    reports: Vec<Report>,
}

impl Reporter {
    /// Create an empty reporter.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a report. Returns `true` the first time a given report is seen.
    pub fn report(
        &mut self,
        severity: Severity,
        source: impl Into<String>,
        message: impl Into<String>,
    ) -> bool {
        let report = Report {
            severity,
            source: source.into(),
            message: message.into(),
        };
        if self.seen.contains(&report) {
            return false;
        }
        match severity {
            Severity::Info => tracing::info!(source = %report.source, "{}", report.message),
            Severity::Warning => tracing::warn!(source = %report.source, "{}", report.message),
            Severity::Error => tracing::error!(source = %report.source, "{}", report.message),
        }
        self.seen.insert(report.clone());
        self.reports.push(report);
        true
    }

    /// All distinct reports, in first-seen order.
    pub fn reports(&self) -> &[Report] {
        &self.reports
    }

    /// Highest severity seen so far.
    pub fn worst(&self) -> Option<Severity> {
        self.reports.iter().map(|r| r.severity).max()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/report.rs"]
mod tests;
