//! Report emission: structured JSON and a human-readable summary.
//!
//! A [`Report`] is an immutable value. Writing it anywhere is left to the
//! caller.

use std::collections::BTreeMap;
use std::sync::{Arc, PoisonError, RwLock};

use docset_core::{Finding, Severity};
use serde::{Deserialize, Serialize};

/// Output shape for a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFormat {
    Json,
    Text,
}

/// Lowest severity that makes a run fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailOn {
    #[default]
    Error,
    Warning,
}

impl FailOn {
    fn threshold(self) -> Severity {
        match self {
            Self::Error => Severity::Error,
            Self::Warning => Severity::Warning,
        }
    }
}

/// Finding counts by severity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeverityCounts {
    pub error: usize,
    pub warning: usize,
    pub info: usize,
}

/// The result of one validation run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Report {
    pub documents_scanned: usize,
    pub counts: SeverityCounts,
    pub findings: Vec<Finding>,
}

impl Report {
    /// Sort findings by path, severity, code, line, and message, and count them.
    #[must_use]
    pub fn new(documents_scanned: usize, mut findings: Vec<Finding>) -> Self {
        findings.sort_by(|a, b| {
            (&a.document_path, a.severity, a.code, a.line, &a.message).cmp(&(
                &b.document_path,
                b.severity,
                b.code,
                b.line,
                &b.message,
            ))
        });

        let mut counts = SeverityCounts::default();
        for finding in &findings {
            match finding.severity {
                Severity::Error => counts.error += 1,
                Severity::Warning => counts.warning += 1,
                Severity::Info => counts.info += 1,
            }
        }

        Self {
            documents_scanned,
            counts,
            findings,
        }
    }

    /// True when some finding is at least as severe as `fail_on`.
    #[must_use]
    pub fn has_failures(&self, fail_on: FailOn) -> bool {
        let threshold = fail_on.threshold();
        self.findings
            .iter()
            .any(|f| f.severity.is_at_least(threshold))
    }

    /// Process exit code: 0 on success, 1 when findings meet `fail_on`.
    #[must_use]
    pub fn exit_code(&self, fail_on: FailOn) -> i32 {
        i32::from(self.has_failures(fail_on))
    }

    #[must_use]
    pub fn render(&self, format: ReportFormat) -> String {
        match format {
            ReportFormat::Json => render_json(self),
            ReportFormat::Text => render_text(self),
        }
    }
}

/// Pretty-printed JSON, newline terminated.
#[must_use]
pub fn render_json(report: &Report) -> String {
    let mut out = serde_json::to_string_pretty(report).unwrap_or_else(|_| "{}".to_string());
    out.push('\n');
    out
}

/// Findings grouped by document path, then a summary line.
#[must_use]
pub fn render_text(report: &Report) -> String {
    let mut output = String::new();

    let mut groups: BTreeMap<&str, Vec<&Finding>> = BTreeMap::new();
    for finding in &report.findings {
        groups
            .entry(finding.document_path.as_str())
            .or_default()
            .push(finding);
    }

    if groups.is_empty() {
        output.push_str("No findings.\n");
    }

    let code_width = report
        .findings
        .iter()
        .map(|f| f.code.as_str().len())
        .max()
        .unwrap_or(0);

    for (path, findings) in &groups {
        output.push_str(path);
        output.push('\n');
        for finding in findings {
            let location = finding
                .line
                .map(|l| format!("line {l}: "))
                .unwrap_or_default();
            output.push_str(&format!(
                "  {:<7}  {:<width$}  {}{}\n",
                finding.severity.as_str(),
                finding.code.as_str(),
                location,
                finding.message,
                width = code_width
            ));
        }
        output.push('\n');
    }

    if report.findings.is_empty() {
        output.push('\n');
    }

    output.push_str(&format!(
        "{} scanned: {}, {}, {}\n",
        plural(report.documents_scanned, "document"),
        plural(report.counts.error, "error"),
        plural(report.counts.warning, "warning"),
        plural(report.counts.info, "info"),
    ));

    output
}

fn plural(n: usize, word: &str) -> String {
    if n == 1 || word == "info" {
        format!("{n} {word}")
    } else {
        format!("{n} {word}s")
    }
}

/// Holds the latest completed report for long-running scans.
///
/// Reports are published whole and tagged with a scan generation; a report
/// from an older generation than the current one is discarded.
#[derive(Debug, Default)]
pub struct ReportCell {
    current: RwLock<Option<(u64, Arc<Report>)>>,
}

impl ReportCell {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Swap in `report` unless a newer generation is already published.
    pub fn publish(&self, generation: u64, report: Report) -> Option<Arc<Report>> {
        let mut current = self.current.write().unwrap_or_else(PoisonError::into_inner);
        if current.as_ref().is_some_and(|(g, _)| *g > generation) {
            return None;
        }
        let report = Arc::new(report);
        *current = Some((generation, Arc::clone(&report)));
        Some(report)
    }

    #[must_use]
    pub fn current(&self) -> Option<Arc<Report>> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|(_, r)| Arc::clone(r))
    }
}
