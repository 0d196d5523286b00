//! Relative link extraction and resolution.
//!
//! Links are markdown inline references `[text](target)` found outside
//! fenced code blocks and inline code spans. Only relative targets that look
//! like documents (a document extension) or directories (trailing `/` or no
//! extension) are kept; URLs with a scheme, pure fragments, images, and
//! root-absolute paths are ignored.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{HashSet, VecDeque};
use std::sync::LazyLock;

static INLINE_LINK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(!?)\[[^\]]*\]\(\s*(<[^>]*>|[^)\s]+)(?:\s+(?:"[^"]*"|'[^']*'|\([^)]*\)))?\s*\)"#)
        .expect("inline link regex is valid")
});

static SCHEME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z][A-Za-z0-9+.\-]*:").expect("scheme regex is valid"));

/// Which targets count as documents and which files stand in for directories.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkOptions {
    extensions: Vec<String>,
    index_names: Vec<String>,
}

impl Default for LinkOptions {
    fn default() -> Self {
        Self::new(
            vec!["md".to_string(), "markdown".to_string(), "mdx".to_string()],
            vec!["README.md".to_string(), "index.md".to_string()],
        )
    }
}

impl LinkOptions {
    /// Extensions are matched case-insensitively and may carry a leading dot.
    #[must_use]
    pub fn new(extensions: Vec<String>, index_names: Vec<String>) -> Self {
        let extensions = extensions
            .into_iter()
            .map(|e| e.trim().trim_start_matches('.').to_ascii_lowercase())
            .filter(|e| !e.is_empty())
            .collect();
        Self {
            extensions,
            index_names,
        }
    }

    #[must_use]
    pub fn extensions(&self) -> &[String] {
        &self.extensions
    }

    #[must_use]
    pub fn index_names(&self) -> &[String] {
        &self.index_names
    }

    /// True when `path` ends in one of the document extensions.
    #[must_use]
    pub fn is_document_path(&self, path: &str) -> bool {
        extension(path)
            .is_some_and(|ext| self.extensions.iter().any(|e| e.eq_ignore_ascii_case(ext)))
    }
}

/// A relative reference extracted from a document body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawLink {
    /// Decoded target path, fragment and query removed.
    pub target: String,
    /// 1-based line the link was found on.
    pub line: usize,
}

/// A resolved reference between two documents.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Edge {
    pub source: String,
    pub target: String,
}

/// Outcome of resolving one document's links.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Resolution {
    pub edges: Vec<Edge>,
    /// One entry per distinct unresolved target, first occurrence kept.
    pub unresolved: Vec<RawLink>,
}

/// Extract relative document references from a markdown body, in order.
///
/// Line numbers are counted from 1 at the start of `body`.
#[must_use]
pub fn extract_links(body: &str, options: &LinkOptions) -> Vec<RawLink> {
    let mut links = Vec::new();
    let mut fence: Option<(char, usize)> = None;

    for (idx, line) in body.lines().enumerate() {
        if let Some(marker) = fence_marker(line) {
            match fence {
                None => {
                    fence = Some(marker);
                    continue;
                }
                Some((ch, len)) if marker.0 == ch && marker.1 >= len && is_bare_fence(line) => {
                    fence = None;
                    continue;
                }
                Some(_) => {}
            }
        }
        if fence.is_some() {
            continue;
        }

        let text = blank_code_spans(line);
        for caps in INLINE_LINK.captures_iter(&text) {
            if &caps[1] == "!" {
                continue;
            }
            if let Some(target) = clean_target(&caps[2], options) {
                links.push(RawLink {
                    target,
                    line: idx + 1,
                });
            }
        }
    }

    links
}

/// Resolve a document's links against the complete set of known paths.
///
/// Targets are resolved relative to the directory of `source`. A target that
/// names a directory resolves to its first existing index document.
#[must_use]
pub fn resolve_links(
    source: &str,
    links: &[RawLink],
    known: &HashSet<String>,
    options: &LinkOptions,
) -> Resolution {
    let mut resolution = Resolution::default();
    let mut seen_unresolved: HashSet<String> = HashSet::new();
    let base = parent_dir(source);

    for link in links {
        let is_dir = link.target.ends_with('/') || extension(&link.target).is_none();
        let normalized = normalize(base, &link.target);

        let found = normalized.as_deref().and_then(|path| {
            candidates(path, is_dir, options)
                .into_iter()
                .find(|c| known.contains(c))
        });

        match found {
            Some(target) if target == source => {}
            Some(target) => resolution.edges.push(Edge {
                source: source.to_string(),
                target,
            }),
            None => {
                let doc_like = link.target.ends_with('/') || options.is_document_path(&link.target);
                // Spellings of one path share a finding; escapes fall back to the raw target.
                let key = normalized.unwrap_or_else(|| link.target.clone());
                if doc_like && seen_unresolved.insert(key) {
                    resolution.unresolved.push(link.clone());
                }
            }
        }
    }

    resolution
}

fn candidates(path: &str, is_dir: bool, options: &LinkOptions) -> Vec<String> {
    if !is_dir {
        return vec![path.to_string()];
    }
    let mut out = Vec::with_capacity(options.index_names.len() + 1);
    if !path.is_empty() {
        out.push(path.to_string());
    }
    for name in &options.index_names {
        if path.is_empty() {
            out.push(name.clone());
        } else {
            out.push(format!("{path}/{name}"));
        }
    }
    out
}

/// Join `target` onto `base` and fold `.` and `..` segments.
///
/// Returns `None` when the path climbs above the scan root.
fn normalize(base: &str, target: &str) -> Option<String> {
    let mut parts: VecDeque<&str> = base.split('/').filter(|s| !s.is_empty()).collect();
    for segment in target.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                parts.pop_back()?;
            }
            other => parts.push_back(other),
        }
    }
    Some(parts.into_iter().collect::<Vec<_>>().join("/"))
}

fn parent_dir(path: &str) -> &str {
    path.rsplit_once('/').map_or("", |(dir, _)| dir)
}

fn extension(path: &str) -> Option<&str> {
    let name = path.rsplit('/').next().unwrap_or(path);
    match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && !ext.is_empty() => Some(ext),
        _ => None,
    }
}

/// Turn a raw link destination into a relative document target, or drop it.
fn clean_target(raw: &str, options: &LinkOptions) -> Option<String> {
    let raw = raw
        .strip_prefix('<')
        .and_then(|s| s.strip_suffix('>'))
        .unwrap_or(raw)
        .trim();

    if raw.is_empty() || raw.starts_with('#') || raw.starts_with('/') || SCHEME.is_match(raw) {
        return None;
    }

    let path = raw.split(['#', '?']).next().unwrap_or(raw);
    if path.is_empty() {
        return None;
    }
    let path = urlencoding::decode(path).map_or_else(|_| path.to_string(), |p| p.into_owned());

    if path.ends_with('/') || extension(&path).is_none() || options.is_document_path(&path) {
        Some(path)
    } else {
        None
    }
}

/// Opening or closing fence: up to three spaces, then three or more ` or ~.
fn fence_marker(line: &str) -> Option<(char, usize)> {
    let indent = line.len() - line.trim_start_matches(' ').len();
    if indent > 3 {
        return None;
    }
    let rest = &line[indent..];
    let ch = rest.chars().next().filter(|c| *c == '`' || *c == '~')?;
    let len = rest.chars().take_while(|c| *c == ch).count();
    (len >= 3).then_some((ch, len))
}

/// A closing fence carries no info string.
fn is_bare_fence(line: &str) -> bool {
    line.trim().chars().all(|c| c == '`' || c == '~')
}

/// Replace inline code spans with spaces so links inside them are not seen.
fn blank_code_spans(line: &str) -> String {
    let bytes = line.as_bytes();
    let mut out = String::with_capacity(line.len());
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] != b'`' {
            let ch_len = line[i..].chars().next().map_or(1, char::len_utf8);
            out.push_str(&line[i..i + ch_len]);
            i += ch_len;
            continue;
        }

        let run = bytes[i..].iter().take_while(|b| **b == b'`').count();
        let ticks = &line[i..i + run];
        let after = i + run;
        match find_closing_run(&line[after..], run) {
            Some(close) => {
                let end = after + close + run;
                out.extend(std::iter::repeat(' ').take(end - i));
                i = end;
            }
            None => {
                out.push_str(ticks);
                i = after;
            }
        }
    }

    out
}

/// Offset of a backtick run of exactly `run` characters in `s`.
fn find_closing_run(s: &str, run: usize) -> Option<usize> {
    let bytes = s.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'`' {
            let len = bytes[i..].iter().take_while(|b| **b == b'`').count();
            if len == run {
                return Some(i);
            }
            i += len;
        } else {
            i += 1;
        }
    }
    None
}
