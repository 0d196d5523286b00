//! Document graph: nodes are documents, edges are resolved links.
//!
//! Nodes live in an arena indexed by position, sorted by path, so index order
//! is path order. Supports orphan and cycle detection plus DOT, Mermaid, and
//! JSON output.

use std::collections::{HashMap, HashSet};

use docset_core::{Edge, Finding, FindingCode};
use serde::Serialize;

/// A node in the document graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GraphNode {
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

impl GraphNode {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            title: None,
        }
    }

    #[must_use]
    pub fn with_title(mut self, title: Option<&str>) -> Self {
        self.title = title.map(str::to_string);
        self
    }
}

/// A cycle of documents, rotated to start at its smallest path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cycle {
    pub paths: Vec<String>,
}

impl Cycle {
    /// `a.md -> b.md -> a.md`
    #[must_use]
    pub fn describe(&self) -> String {
        let mut out = self.paths.join(" -> ");
        if let Some(first) = self.paths.first() {
            out.push_str(" -> ");
            out.push_str(first);
        }
        out
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Visit {
    Unvisited,
    InProgress,
    Done,
}

/// A directed graph over the documents of one scan.
#[derive(Debug, Clone, Default)]
pub struct DocumentGraph {
    nodes: Vec<GraphNode>,
    index: HashMap<String, usize>,
    outbound: Vec<Vec<usize>>,
    inbound: Vec<Vec<usize>>,
}

#[derive(Serialize)]
struct GraphExport<'a> {
    nodes: &'a [GraphNode],
    edges: Vec<Edge>,
}

impl DocumentGraph {
    /// Build a graph from nodes and resolved edges.
    ///
    /// Duplicate edges and self-loops are dropped. Edges naming a path with
    /// no node are skipped.
    #[must_use]
    pub fn build(mut nodes: Vec<GraphNode>, edges: &[Edge]) -> Self {
        nodes.sort_by(|a, b| a.path.cmp(&b.path));
        nodes.dedup_by(|a, b| a.path == b.path);

        let index: HashMap<String, usize> = nodes
            .iter()
            .enumerate()
            .map(|(i, n)| (n.path.clone(), i))
            .collect();

        let mut outbound = vec![Vec::new(); nodes.len()];
        let mut inbound = vec![Vec::new(); nodes.len()];
        let mut seen: HashSet<(usize, usize)> = HashSet::new();

        for edge in edges {
            let (Some(&from), Some(&to)) = (index.get(&edge.source), index.get(&edge.target))
            else {
                tracing::debug!(
                    source = %edge.source,
                    target = %edge.target,
                    "edge without node skipped"
                );
                continue;
            };
            if from == to || !seen.insert((from, to)) {
                continue;
            }
            outbound[from].push(to);
            inbound[to].push(from);
        }

        for list in outbound.iter_mut().chain(inbound.iter_mut()) {
            list.sort_unstable();
        }

        Self {
            nodes,
            index,
            outbound,
            inbound,
        }
    }

    #[must_use]
    pub fn nodes(&self) -> &[GraphNode] {
        &self.nodes
    }

    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.outbound.iter().map(Vec::len).sum()
    }

    #[must_use]
    pub fn contains(&self, path: &str) -> bool {
        self.index.contains_key(path)
    }

    /// All edges in (source, target) path order.
    #[must_use]
    pub fn edges(&self) -> Vec<Edge> {
        self.outbound
            .iter()
            .enumerate()
            .flat_map(|(from, targets)| {
                targets.iter().map(move |&to| Edge {
                    source: self.nodes[from].path.clone(),
                    target: self.nodes[to].path.clone(),
                })
            })
            .collect()
    }

    /// Paths that `path` links to.
    #[must_use]
    pub fn outbound(&self, path: &str) -> Vec<&str> {
        self.neighbours(path, &self.outbound)
    }

    /// Paths that link to `path`.
    #[must_use]
    pub fn inbound(&self, path: &str) -> Vec<&str> {
        self.neighbours(path, &self.inbound)
    }

    fn neighbours<'a>(&'a self, path: &str, lists: &'a [Vec<usize>]) -> Vec<&'a str> {
        self.index
            .get(path)
            .map(|&i| lists[i].iter().map(|&j| self.nodes[j].path.as_str()).collect())
            .unwrap_or_default()
    }

    /// Documents with no inbound edge that are not entry points.
    #[must_use]
    pub fn orphans(&self, entry_points: &[String]) -> Vec<&str> {
        self.nodes
            .iter()
            .enumerate()
            .filter(|(i, node)| self.inbound[*i].is_empty() && !entry_points.contains(&node.path))
            .map(|(_, node)| node.path.as_str())
            .collect()
    }

    /// Cycles found by depth-first traversal, one per back edge.
    ///
    /// An edge to a node still on the traversal stack closes a cycle. The
    /// cycle is rotated to start at its smallest path so that the same cycle
    /// reached from different starting nodes is recognised.
    #[must_use]
    pub fn cycles(&self) -> Vec<Cycle> {
        let mut state = vec![Visit::Unvisited; self.nodes.len()];
        let mut seen: HashSet<Vec<usize>> = HashSet::new();
        let mut cycles = Vec::new();

        for start in 0..self.nodes.len() {
            if state[start] != Visit::Unvisited {
                continue;
            }

            // (node, next outbound edge to follow)
            let mut frames: Vec<(usize, usize)> = vec![(start, 0)];
            state[start] = Visit::InProgress;

            while let Some(frame) = frames.last_mut() {
                let (node, cursor) = *frame;
                let Some(&next) = self.outbound[node].get(cursor) else {
                    state[node] = Visit::Done;
                    frames.pop();
                    continue;
                };
                frame.1 += 1;

                match state[next] {
                    Visit::Unvisited => {
                        state[next] = Visit::InProgress;
                        frames.push((next, 0));
                    }
                    Visit::InProgress => {
                        if let Some(pos) = frames.iter().rposition(|f| f.0 == next) {
                            let members = canonical(frames[pos..].iter().map(|f| f.0).collect());
                            if seen.insert(members.clone()) {
                                cycles.push(Cycle {
                                    paths: members
                                        .iter()
                                        .map(|&i| self.nodes[i].path.clone())
                                        .collect(),
                                });
                            }
                        }
                    }
                    Visit::Done => {}
                }
            }
        }

        cycles.sort_by(|a, b| a.paths.cmp(&b.paths));
        cycles
    }

    /// `ORPHAN_DOCUMENT` findings for [`Self::orphans`].
    #[must_use]
    pub fn orphan_findings(&self, entry_points: &[String]) -> Vec<Finding> {
        self.orphans(entry_points)
            .into_iter()
            .map(|path| {
                Finding::new(
                    path,
                    FindingCode::OrphanDocument,
                    "no other document links here",
                )
            })
            .collect()
    }

    /// `REFERENCE_CYCLE` findings for [`Self::cycles`], on each cycle's smallest path.
    #[must_use]
    pub fn cycle_findings(&self) -> Vec<Finding> {
        self.cycles()
            .into_iter()
            .filter_map(|cycle| {
                let first = cycle.paths.first()?.clone();
                Some(Finding::new(
                    first,
                    FindingCode::ReferenceCycle,
                    format!("reference cycle: {}", cycle.describe()),
                ))
            })
            .collect()
    }

    /// Format the graph as DOT (Graphviz) output.
    #[must_use]
    pub fn format_dot(&self) -> String {
        let mut out = String::from("digraph docset {\n  rankdir=LR;\n  node [shape=box];\n\n");

        for node in &self.nodes {
            let label = match &node.title {
                Some(title) => format!("{}\\n({})", escape_dot(title), escape_dot(&node.path)),
                None => escape_dot(&node.path),
            };
            out.push_str(&format!(
                "  \"{}\" [label=\"{}\"];\n",
                escape_dot(&node.path),
                label
            ));
        }

        out.push('\n');

        for edge in self.edges() {
            out.push_str(&format!(
                "  \"{}\" -> \"{}\";\n",
                escape_dot(&edge.source),
                escape_dot(&edge.target)
            ));
        }

        out.push_str("}\n");
        out
    }

    /// Format the graph as a Mermaid diagram.
    #[must_use]
    pub fn format_mermaid(&self) -> String {
        let mut out = String::from("graph LR\n");

        for (i, node) in self.nodes.iter().enumerate() {
            let label = node.title.as_deref().unwrap_or(&node.path).replace('"', "'");
            out.push_str(&format!("  n{i}[\"{label}\"]\n"));
        }

        out.push('\n');

        for (from, targets) in self.outbound.iter().enumerate() {
            for to in targets {
                out.push_str(&format!("  n{from} --> n{to}\n"));
            }
        }

        out
    }

    /// Format the graph as JSON.
    #[must_use]
    pub fn format_json(&self) -> String {
        let export = GraphExport {
            nodes: &self.nodes,
            edges: self.edges(),
        };
        serde_json::to_string_pretty(&export).unwrap_or_else(|_| "{}".to_string())
    }
}

fn canonical(mut members: Vec<usize>) -> Vec<usize> {
    if let Some(min_pos) = members
        .iter()
        .enumerate()
        .min_by_key(|&(_, n)| *n)
        .map(|(i, _)| i)
    {
        members.rotate_left(min_pos);
    }
    members
}

fn escape_dot(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}
