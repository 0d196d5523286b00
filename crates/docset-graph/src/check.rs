//! The validation pipeline: documents and a schema in, a report out.
//!
//! Runs in two phases. Every document is parsed and its front-matter
//! validated first, optionally spread over worker threads. Only once all
//! per-document results are in, and so the set of known paths is complete,
//! are links resolved and the graph built.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use docset_core::fingerprint::body_fingerprint;
use docset_core::link::resolve_links;
use docset_core::{
    validate_front_matter, Document, Edge, Finding, FindingCode, Schema, SourceFile,
};
use tracing::{debug, info, warn};

use crate::graph::{DocumentGraph, GraphNode};
use crate::report::Report;

/// Tuning for a check run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckOptions {
    /// Worker threads for the per-document phase. `1` runs it inline.
    pub jobs: usize,
}

impl Default for CheckOptions {
    fn default() -> Self {
        Self { jobs: 1 }
    }
}

/// Cooperative cancellation for an in-flight scan.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Everything a completed scan produced.
#[derive(Debug, Clone)]
pub struct Analysis {
    pub documents: Vec<Document>,
    pub graph: DocumentGraph,
    pub report: Report,
}

/// Validate a document set.
#[must_use]
pub fn check(inputs: &[SourceFile], schema: &Schema, options: &CheckOptions) -> Report {
    analyze(inputs, schema, options).report
}

/// Validate a document set, giving up early if `cancel` is set.
///
/// Returns `None` when cancelled; nothing partial is ever returned.
#[must_use]
pub fn check_cancellable(
    inputs: &[SourceFile],
    schema: &Schema,
    options: &CheckOptions,
    cancel: &CancelToken,
) -> Option<Report> {
    analyze_cancellable(inputs, schema, options, cancel).map(|a| a.report)
}

/// Run the full pipeline and keep the parsed documents and graph.
#[must_use]
pub fn analyze(inputs: &[SourceFile], schema: &Schema, options: &CheckOptions) -> Analysis {
    let cancel = CancelToken::new();
    match analyze_cancellable(inputs, schema, options, &cancel) {
        Some(analysis) => analysis,
        // The token above is never cancelled.
        None => Analysis {
            documents: Vec::new(),
            graph: DocumentGraph::default(),
            report: Report::new(0, Vec::new()),
        },
    }
}

/// [`analyze`] with cancellation checks between documents and phases.
#[must_use]
pub fn analyze_cancellable(
    inputs: &[SourceFile],
    schema: &Schema,
    options: &CheckOptions,
    cancel: &CancelToken,
) -> Option<Analysis> {
    let inputs = unique_inputs(inputs);
    info!(documents = inputs.len(), jobs = options.jobs, "scan started");

    // Phase 1: per-document parse and validation.
    let outcomes = process_all(&inputs, schema, options.jobs.max(1), cancel)?;

    // Barrier: every path is known before any link is resolved.
    let known: HashSet<String> = inputs.iter().map(|s| s.path.clone()).collect();
    let mut findings: Vec<Finding> = Vec::new();
    let mut edges: Vec<Edge> = Vec::new();
    let mut documents: Vec<Document> = Vec::with_capacity(outcomes.len());
    let mut nodes: Vec<GraphNode> = Vec::with_capacity(outcomes.len());

    // Phase 2: links, graph, and cross-document checks.
    for outcome in outcomes {
        if cancel.is_cancelled() {
            return None;
        }
        findings.extend(outcome.findings);
        match outcome.document {
            Some(doc) => {
                let resolution =
                    resolve_links(&doc.path, &doc.links, &known, schema.link_options());
                for link in &resolution.unresolved {
                    findings.push(
                        Finding::new(
                            &doc.path,
                            FindingCode::BrokenLink,
                            format!(
                                "link target '{}' does not resolve to a scanned document",
                                link.target
                            ),
                        )
                        .with_line(link.line),
                    );
                }
                edges.extend(resolution.edges);
                nodes.push(GraphNode::new(&doc.path).with_title(doc.title()));
                documents.push(doc);
            }
            None => nodes.push(GraphNode::new(outcome.path)),
        }
    }

    let graph = DocumentGraph::build(nodes, &edges);
    findings.extend(graph.orphan_findings(schema.entry_points()));
    findings.extend(graph.cycle_findings());

    if schema.detect_duplicates() {
        findings.extend(duplicate_findings(&documents));
    }

    if cancel.is_cancelled() {
        return None;
    }

    let report = Report::new(inputs.len(), findings);
    info!(
        documents = report.documents_scanned,
        errors = report.counts.error,
        warnings = report.counts.warning,
        edges = graph.edge_count(),
        "scan finished"
    );

    Some(Analysis {
        documents,
        graph,
        report,
    })
}

/// Per-document phase result.
struct Outcome {
    path: String,
    document: Option<Document>,
    findings: Vec<Finding>,
}

fn process(source: &SourceFile, schema: &Schema) -> Outcome {
    match source.parse(schema.link_options()) {
        Ok(document) => {
            let findings = validate_front_matter(&document.path, &document.front_matter, schema);
            debug!(
                path = %document.path,
                links = document.links.len(),
                findings = findings.len(),
                "document parsed"
            );
            Outcome {
                path: source.path.clone(),
                document: Some(document),
                findings,
            }
        }
        Err(err) => {
            debug!(path = %source.path, error = %err, "document unparseable");
            Outcome {
                path: source.path.clone(),
                document: None,
                findings: vec![Finding::new(
                    &source.path,
                    FindingCode::UnparseableDocument,
                    err.reason(),
                )
                .with_line(err.line())],
            }
        }
    }
}

/// Results come back in input order whatever the number of workers.
fn process_all(
    inputs: &[&SourceFile],
    schema: &Schema,
    jobs: usize,
    cancel: &CancelToken,
) -> Option<Vec<Outcome>> {
    let run = |part: &[&SourceFile]| -> Option<Vec<Outcome>> {
        part.iter()
            .map(|source| (!cancel.is_cancelled()).then(|| process(source, schema)))
            .collect()
    };

    if jobs <= 1 || inputs.len() < 2 {
        return run(inputs);
    }

    let chunk = inputs.len().div_ceil(jobs);
    std::thread::scope(|scope| {
        let handles: Vec<_> = inputs
            .chunks(chunk)
            .map(|part| scope.spawn(move || run(part)))
            .collect();

        let mut outcomes = Vec::with_capacity(inputs.len());
        for handle in handles {
            match handle.join() {
                Ok(Some(part)) => outcomes.extend(part),
                Ok(None) => return None,
                Err(panic) => std::panic::resume_unwind(panic),
            }
        }
        Some(outcomes)
    })
}

fn unique_inputs(inputs: &[SourceFile]) -> Vec<&SourceFile> {
    let mut seen: HashSet<&str> = HashSet::new();
    inputs
        .iter()
        .filter(|source| {
            let fresh = seen.insert(source.path.as_str());
            if !fresh {
                warn!(path = %source.path, "duplicate input path ignored");
            }
            fresh
        })
        .collect()
}

/// Warn on every document whose body matches an earlier one, in path order.
fn duplicate_findings(documents: &[Document]) -> Vec<Finding> {
    let mut ordered: Vec<&Document> = documents.iter().collect();
    ordered.sort_by(|a, b| a.path.cmp(&b.path));

    let mut first_seen: HashMap<String, &str> = HashMap::new();
    let mut findings = Vec::new();
    for doc in ordered {
        let Some(fingerprint) = body_fingerprint(&doc.body) else {
            continue;
        };
        match first_seen.get(&fingerprint) {
            Some(original) => findings.push(Finding::new(
                &doc.path,
                FindingCode::DuplicateDocument,
                format!("body is identical to '{original}'"),
            )),
            None => {
                first_seen.insert(fingerprint, doc.path.as_str());
            }
        }
    }
    findings
}

#[cfg(test)]
mod tests {
    use super::*;
    use docset_core::{FieldType, SchemaConfig, SchemaRule, Severity};

    fn agent_schema() -> Schema {
        Schema::from_rules(vec![
            SchemaRule::new("name", FieldType::String)
                .required()
                .with_max_length(64),
            SchemaRule::new("description", FieldType::String).required(),
            SchemaRule::new("tools", FieldType::StringArray),
        ])
        .unwrap()
    }

    fn codes_for(report: &Report, path: &str) -> Vec<FindingCode> {
        report
            .findings
            .iter()
            .filter(|f| f.document_path == path)
            .map(|f| f.code)
            .collect()
    }

    fn count(report: &Report, code: FindingCode) -> usize {
        report.findings.iter().filter(|f| f.code == code).count()
    }

    #[test]
    fn scenario_missing_description() {
        let inputs = vec![SourceFile::new(
            "README.md",
            "---\nname: \"code-writer\"\ntools: [Read, Write]\n---\n# Writer\n",
        )];
        let report = check(&inputs, &agent_schema(), &CheckOptions::default());
        assert_eq!(codes_for(&report, "README.md"), vec![FindingCode::MissingRequiredField]);
        assert!(report.findings[0].message.contains("description"));
    }

    #[test]
    fn scenario_existing_link_creates_edge() {
        let inputs = vec![
            SourceFile::new("README.md", "[see guide](./GUIDE.md)\n"),
            SourceFile::new("GUIDE.md", "# Guide\n"),
        ];
        let analysis = analyze(&inputs, &Schema::default(), &CheckOptions::default());
        assert_eq!(analysis.graph.edge_count(), 1);
        assert_eq!(analysis.graph.outbound("README.md"), vec!["GUIDE.md"]);
        assert_eq!(count(&analysis.report, FindingCode::BrokenLink), 0);
    }

    #[test]
    fn scenario_missing_link_target_is_broken() {
        let inputs = vec![SourceFile::new("README.md", "[see missing](./NOPE.md)\n")];
        let analysis = analyze(&inputs, &Schema::default(), &CheckOptions::default());
        assert_eq!(analysis.graph.edge_count(), 0);
        let broken: Vec<&Finding> = analysis
            .report
            .findings
            .iter()
            .filter(|f| f.code == FindingCode::BrokenLink)
            .collect();
        assert_eq!(broken.len(), 1);
        assert_eq!(broken[0].severity, Severity::Warning);
        assert_eq!(broken[0].line, Some(1));
    }

    #[test]
    fn scenario_mutual_references() {
        let inputs = vec![
            SourceFile::new("a.md", "Body of A, see [B](b.md)\n"),
            SourceFile::new("b.md", "Body of B, see [A](a.md)\n"),
        ];
        let report = check(&inputs, &Schema::default(), &CheckOptions::default());
        assert_eq!(count(&report, FindingCode::ReferenceCycle), 1);
        assert_eq!(count(&report, FindingCode::OrphanDocument), 0);
    }

    #[test]
    fn scenario_unterminated_front_matter() {
        let inputs = vec![
            SourceFile::new("README.md", "[bad](bad.md) [good](good.md)\n"),
            SourceFile::new("bad.md", "---\nname: x\n[link](good.md)\n"),
            SourceFile::new("good.md", "---\nname: good\n---\nfine\n"),
        ];
        let schema = Schema::from_rules(vec![SchemaRule::new("name", FieldType::String).required()])
            .unwrap();
        let report = check(&inputs, &schema, &CheckOptions::default());

        let unparseable: Vec<&Finding> = report
            .findings
            .iter()
            .filter(|f| f.code == FindingCode::UnparseableDocument)
            .collect();
        assert_eq!(unparseable.len(), 1);
        assert_eq!(unparseable[0].document_path, "bad.md");
        assert_eq!(unparseable[0].line, Some(1));
        assert_eq!(report.exit_code(crate::report::FailOn::Error), 1);

        // README has no front-matter at all; it is still validated normally.
        assert_eq!(codes_for(&report, "README.md"), vec![FindingCode::MissingRequiredField]);
        assert!(codes_for(&report, "good.md").is_empty());
        assert_eq!(count(&report, FindingCode::BrokenLink), 0);
    }

    #[test]
    fn broken_link_reported_once_per_distinct_target() {
        let inputs = vec![SourceFile::new("README.md", "[a](x.md)\n[b](x.md)\n[c](./y.md)\n")];
        let report = check(&inputs, &Schema::default(), &CheckOptions::default());
        assert_eq!(count(&report, FindingCode::BrokenLink), 2);
    }

    #[test]
    fn links_inside_code_fences_are_not_followed() {
        let inputs = vec![SourceFile::new("README.md", "```md\n[example](./missing.md)\n```\n")];
        let report = check(&inputs, &Schema::default(), &CheckOptions::default());
        assert!(report.findings.is_empty());
    }

    #[test]
    fn orphans_are_informational() {
        let inputs = vec![
            SourceFile::new("README.md", "[a](a.md)\n"),
            SourceFile::new("a.md", "A\n"),
            SourceFile::new("standalone.md", "S\n"),
        ];
        let report = check(&inputs, &Schema::default(), &CheckOptions::default());
        assert_eq!(codes_for(&report, "standalone.md"), vec![FindingCode::OrphanDocument]);
        assert_eq!(report.counts.info, 1);
        assert_eq!(report.exit_code(crate::report::FailOn::Warning), 0);
    }

    #[test]
    fn identical_bodies_are_flagged_after_the_first() {
        let inputs = vec![
            SourceFile::new("README.md", "[a](a.md) [b](b.md)\n"),
            SourceFile::new("b.md", "---\nname: b\n---\nSame text.\n"),
            SourceFile::new("a.md", "---\nname: a\n---\n  Same text.\n\n"),
        ];
        let report = check(&inputs, &Schema::default(), &CheckOptions::default());
        assert_eq!(codes_for(&report, "b.md"), vec![FindingCode::DuplicateDocument]);
        assert!(codes_for(&report, "a.md").is_empty());

        let config = SchemaConfig {
            detect_duplicates: false,
            ..SchemaConfig::default()
        };
        let report = check(&inputs, &config.compile().unwrap(), &CheckOptions::default());
        assert_eq!(count(&report, FindingCode::DuplicateDocument), 0);
    }

    #[test]
    fn parallel_run_matches_sequential_run() {
        let mut inputs = vec![SourceFile::new("README.md", "[d0](docs/d0.md)\n")];
        for i in 0..25 {
            inputs.push(SourceFile::new(
                format!("docs/d{i}.md"),
                format!("---\nname: d{i}\n---\n[next](d{}.md) [gone](gone{i}.md)\n", i + 1),
            ));
        }
        let schema = agent_schema();
        let sequential = check(&inputs, &schema, &CheckOptions { jobs: 1 });
        let parallel = check(&inputs, &schema, &CheckOptions { jobs: 4 });
        assert_eq!(sequential, parallel);
        assert_eq!(
            sequential.render(crate::report::ReportFormat::Json),
            check(&inputs, &schema, &CheckOptions { jobs: 1 })
                .render(crate::report::ReportFormat::Json)
        );
    }

    #[test]
    fn duplicate_input_paths_are_ignored() {
        let inputs = vec![
            SourceFile::new("README.md", "first\n"),
            SourceFile::new("README.md", "second\n"),
        ];
        let analysis = analyze(&inputs, &Schema::default(), &CheckOptions::default());
        assert_eq!(analysis.report.documents_scanned, 1);
        assert_eq!(analysis.documents[0].body, "first\n");
    }

    #[test]
    fn cancelled_scan_returns_nothing() {
        let inputs = vec![SourceFile::new("README.md", "# Home\n")];
        let token = CancelToken::new();
        token.cancel();
        let options = CheckOptions::default();
        assert!(check_cancellable(&inputs, &Schema::default(), &options, &token).is_none());

        let fresh = CancelToken::new();
        let options = CheckOptions { jobs: 2 };
        assert!(check_cancellable(&inputs, &Schema::default(), &options, &fresh).is_some());
    }

    #[test]
    fn every_finding_names_a_scanned_document() {
        let inputs = vec![
            SourceFile::new("README.md", "[x](nope.md)\n"),
            SourceFile::new("a.md", "---\nbroken\n"),
            SourceFile::new("b.md", "[a](a.md)\n"),
        ];
        let report = check(&inputs, &agent_schema(), &CheckOptions { jobs: 3 });
        let paths: HashSet<&str> = inputs.iter().map(|s| s.path.as_str()).collect();
        assert!(report
            .findings
            .iter()
            .all(|f| paths.contains(f.document_path.as_str())));
    }
}
