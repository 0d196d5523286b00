//! # docset-graph
//!
//! Cross-document stages of docset. Takes per-document results from
//! docset-core and turns them into a report.
//!
//! Includes:
//! - Document graph with orphan and cycle detection ([`graph`])
//! - The two-phase check pipeline ([`check`])
//! - Report emission in JSON and text ([`report`])

pub mod check;
pub mod graph;
pub mod report;

pub use check::{analyze, check, check_cancellable, Analysis, CancelToken, CheckOptions};
pub use graph::{Cycle, DocumentGraph, GraphNode};
pub use report::{FailOn, Report, ReportCell, ReportFormat, SeverityCounts};
