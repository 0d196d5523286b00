//! YAML front-matter parsing and writing.
//!
//! Handles the `---` delimited YAML header of markdown files:
//! ```markdown
//! ---
//! name: code-writer
//! description: "Writes code"
//! tools: [Read, Write]
//! ---
//!
//! ## Body content here
//! ```
//!
//! A file without an opening delimiter on its first line has no front-matter
//! and its body is the whole input. The closing delimiter is located with a
//! small line-oriented state machine rather than a substring search, so a
//! `---` line inside a quoted scalar that spans several lines is treated as
//! content.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{DocsetError, ParseError};

/// Ordered mapping of front-matter keys to values. Keys keep file order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FrontMatter(Map<String, Value>);

impl FrontMatter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// String value of `key`, if present and a string.
    #[must_use]
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Value) -> Option<Value> {
        self.0.insert(key.into(), value)
    }

    /// Parse the YAML text of a front-matter block.
    ///
    /// `open_line` is the document line of the opening `---`, used to report
    /// YAML errors against document lines.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError::InvalidYaml`] if the block is not valid YAML and
    /// [`ParseError::NotAMapping`] if it is valid YAML but not a mapping.
    pub fn from_yaml(path: &str, yaml: &str, open_line: usize) -> Result<Self, ParseError> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }

        let value: Value = serde_yaml::from_str(yaml).map_err(|e| {
            let line = open_line + e.location().map_or(1, |loc| loc.line());
            let message = e.to_string();
            let message = message
                .split_once(" at line ")
                .map_or(message.as_str(), |(m, _)| m)
                .to_string();
            ParseError::InvalidYaml {
                path: path.to_string(),
                line,
                message,
            }
        })?;

        match value {
            // A block holding only comments
            Value::Null => Ok(Self::default()),
            Value::Object(map) => Ok(Self(map)),
            other => Err(ParseError::NotAMapping {
                path: path.to_string(),
                line: open_line,
                found: value_kind(&other).to_string(),
            }),
        }
    }

    /// Serialize the mapping back to YAML, without delimiters.
    ///
    /// # Errors
    ///
    /// Returns [`DocsetError::Serialization`] if a value cannot be written as YAML.
    pub fn to_yaml(&self) -> Result<String, DocsetError> {
        serde_yaml::to_string(&self.0).map_err(|e| DocsetError::Serialization(e.to_string()))
    }
}

impl From<Map<String, Value>> for FrontMatter {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

/// Human name of a value's type, as used in findings.
#[must_use]
pub fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_i64() || n.is_u64() => "integer",
        Value::Number(_) => "float",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "mapping",
    }
}

/// Split a markdown file into parsed front-matter and body.
///
/// The body is always a suffix of `text`; without front-matter it is `text`
/// itself.
///
/// # Errors
///
/// Returns [`ParseError::Unterminated`] when the opening delimiter has no
/// matching closing delimiter, or the errors of [`FrontMatter::from_yaml`].
pub fn split_front_matter<'a>(
    path: &str,
    text: &'a str,
) -> Result<(FrontMatter, &'a str), ParseError> {
    match locate_block(text) {
        Located::Absent => Ok((FrontMatter::default(), text)),
        Located::Block {
            yaml,
            body,
            open_line,
        } => Ok((FrontMatter::from_yaml(path, yaml, open_line)?, body)),
        Located::Unterminated { open_line } => Err(ParseError::Unterminated {
            path: path.to_string(),
            line: open_line,
        }),
    }
}

/// Write front-matter and body as a markdown file.
///
/// An empty mapping writes the body alone.
///
/// # Errors
///
/// Returns [`DocsetError::Serialization`] if the front-matter cannot be serialized.
pub fn write_document(front_matter: &FrontMatter, body: &str) -> Result<String, DocsetError> {
    if front_matter.is_empty() {
        return Ok(body.to_string());
    }

    let yaml = front_matter.to_yaml()?;
    let mut output = String::with_capacity(yaml.len() + body.len() + 8);
    output.push_str("---\n");
    output.push_str(&yaml);
    output.push_str("---\n");
    output.push_str(body);
    Ok(output)
}

enum Located<'a> {
    Absent,
    Block {
        yaml: &'a str,
        body: &'a str,
        open_line: usize,
    },
    Unterminated {
        open_line: usize,
    },
}

enum Scan {
    SeenOpen,
    ParsingKeys {
        open_quote: Option<char>,
        /// Indentation of the key that opened a `|` or `>` block scalar.
        block_indent: Option<usize>,
    },
    SeenClose,
}

fn locate_block(text: &str) -> Located<'_> {
    let content = text.strip_prefix('\u{feff}').unwrap_or(text);
    let bom_len = text.len() - content.len();

    let mut lines = content.split_inclusive('\n');
    let Some(first) = lines.next() else {
        return Located::Absent;
    };
    if !is_delimiter(first) {
        return Located::Absent;
    }

    let yaml_start = bom_len + first.len();
    let mut pos = yaml_start;
    let mut state = Scan::SeenOpen;

    for line in lines {
        state = match state {
            Scan::SeenOpen | Scan::ParsingKeys { open_quote: None, .. } if is_delimiter(line) => {
                Scan::SeenClose
            }
            Scan::SeenOpen => scan_line(line, None, None),
            Scan::ParsingKeys {
                open_quote,
                block_indent,
            } => scan_line(line, open_quote, block_indent),
            Scan::SeenClose => break,
        };

        if matches!(state, Scan::SeenClose) {
            return Located::Block {
                yaml: &text[yaml_start..pos],
                body: &text[pos + line.len()..],
                open_line: 1,
            };
        }
        pos += line.len();
    }

    Located::Unterminated { open_line: 1 }
}

/// State after `line`, given the quote and block scalar open before it.
fn scan_line(line: &str, open_quote: Option<char>, block_indent: Option<usize>) -> Scan {
    if open_quote.is_some() {
        return Scan::ParsingKeys {
            open_quote: scan_quotes(line, open_quote),
            block_indent: None,
        };
    }

    // Block scalar content is literal text; quotes in it open nothing.
    if let Some(indent) = block_indent {
        if line.trim().is_empty() || indentation(line) > indent {
            return Scan::ParsingKeys {
                open_quote: None,
                block_indent,
            };
        }
    }

    if opens_block_scalar(line) {
        return Scan::ParsingKeys {
            open_quote: None,
            block_indent: Some(indentation(line)),
        };
    }

    Scan::ParsingKeys {
        open_quote: scan_quotes(line, None),
        block_indent: None,
    }
}

fn indentation(line: &str) -> usize {
    line.len() - line.trim_start_matches(' ').len()
}

/// True for a key whose value is a block indicator such as `|`, `>-` or `|2+`.
fn opens_block_scalar(line: &str) -> bool {
    let Some(value) = scalar_start(line) else {
        return false;
    };
    let value = value.split(" #").next().unwrap_or(value).trim_end();
    let mut chars = value.chars();
    matches!(chars.next(), Some('|' | '>'))
        && chars.all(|c| c == '+' || c == '-' || c.is_ascii_digit())
}

fn is_delimiter(line: &str) -> bool {
    line.trim_end_matches(['\n', '\r', ' ', '\t']) == "---"
}

/// Track whether a quoted scalar is still open at the end of `line`.
fn scan_quotes(line: &str, open: Option<char>) -> Option<char> {
    if let Some(quote) = open {
        return match close_quote(line, quote) {
            Some(_) => None,
            None => Some(quote),
        };
    }

    let value = scalar_start(line)?;
    let quote = value.chars().next().filter(|c| *c == '"' || *c == '\'')?;
    match close_quote(&value[1..], quote) {
        Some(_) => None,
        None => Some(quote),
    }
}

/// The text where a value begins on a key or sequence line.
fn scalar_start(line: &str) -> Option<&str> {
    let mut s = line.trim_start();
    if s.starts_with('#') {
        return None;
    }
    while let Some(rest) = s.strip_prefix("- ") {
        s = rest.trim_start();
    }
    if s.starts_with('"') || s.starts_with('\'') {
        return Some(s);
    }
    let idx = s.find(": ")?;
    Some(s[idx + 2..].trim_start())
}

/// Remainder after the closing `quote`, or `None` if it stays open.
fn close_quote(s: &str, quote: char) -> Option<&str> {
    let mut chars = s.char_indices().peekable();
    while let Some((i, c)) = chars.next() {
        if quote == '"' && c == '\\' {
            chars.next();
            continue;
        }
        if c == quote {
            // '' is an escaped quote inside a single-quoted scalar
            if quote == '\'' && chars.peek().map(|&(_, n)| n) == Some('\'') {
                chars.next();
                continue;
            }
            return Some(&s[i + c.len_utf8()..]);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    #[test]
    fn split_extracts_mapping_and_body() {
        let content = "---\nname: code-writer\ntools: [Read, Write]\n---\n\n## Hello\n";
        let (fm, body) = split_front_matter("a.md", content).unwrap();
        assert_eq!(fm.get_str("name"), Some("code-writer"));
        assert_eq!(fm.get("tools"), Some(&json!(["Read", "Write"])));
        assert_eq!(body, "\n## Hello\n");
    }

    #[test]
    fn plain_markdown_passes_through() {
        let content = "# Title\n\nNo header here.\n---\nstill body\n";
        let (fm, body) = split_front_matter("a.md", content).unwrap();
        assert!(fm.is_empty());
        assert_eq!(body, content);
    }

    #[test]
    fn delimiter_must_be_on_first_line() {
        let content = "\n---\nname: x\n---\n";
        let (fm, body) = split_front_matter("a.md", content).unwrap();
        assert!(fm.is_empty());
        assert_eq!(body, content);
    }

    #[test]
    fn unterminated_block_reports_opening_line() {
        let content = "---\nname: x\ndescription: y\n";
        let err = split_front_matter("docs/x.md", content).unwrap_err();
        assert_eq!(
            err,
            ParseError::Unterminated {
                path: "docs/x.md".to_string(),
                line: 1
            }
        );
    }

    fn located_yaml_and_body(content: &str) -> (&str, &str) {
        match locate_block(content) {
            Located::Block { yaml, body, .. } => (yaml, body),
            Located::Absent => panic!("expected a block, found none"),
            Located::Unterminated { .. } => panic!("expected a block, found unterminated"),
        }
    }

    #[test]
    fn delimiter_inside_quoted_scalar_is_content() {
        let content = "---\ndescription: \"first\n---\nsecond\"\nname: x\n---\nbody\n";
        let (yaml, body) = located_yaml_and_body(content);
        assert!(yaml.contains("second"));
        assert!(yaml.ends_with("name: x\n"));
        assert_eq!(body, "body\n");
    }

    #[test]
    fn single_quoted_scalar_with_escaped_quote() {
        let content = "---\nnote: 'it''s\n---\nfine'\n---\nbody";
        let (yaml, body) = located_yaml_and_body(content);
        assert!(yaml.contains("fine'"));
        assert_eq!(body, "body");
    }

    #[test]
    fn quoted_scalar_closed_on_same_line_does_not_leak() {
        let content = "---\ntitle: \"a: b\"\n---\nbody";
        let (fm, body) = split_front_matter("a.md", content).unwrap();
        assert_eq!(fm.get_str("title"), Some("a: b"));
        assert_eq!(body, "body");
    }

    #[test]
    fn apostrophe_in_plain_scalar_does_not_open_quote() {
        let content = "---\ntitle: Bob's notes\n---\nbody\n";
        let (fm, body) = split_front_matter("a.md", content).unwrap();
        assert_eq!(fm.get_str("title"), Some("Bob's notes"));
        assert_eq!(body, "body\n");
    }

    #[test]
    fn indented_dashes_in_block_scalar_are_content() {
        let content = "---\nexample: |\n  ---\n  inner\nname: x\n---\nbody\n";
        let (fm, body) = split_front_matter("a.md", content).unwrap();
        assert_eq!(fm.get_str("example"), Some("---\ninner\n"));
        assert_eq!(body, "body\n");
    }

    #[test]
    fn quote_inside_block_scalar_does_not_hide_closing_delimiter() {
        let content =
            "---\nname: reviewer\n\
             description: |\n  \"Review my code\n  is a typical trigger.\n---\nbody\n";
        let (fm, body) = split_front_matter("a.md", content).unwrap();
        assert_eq!(
            fm.get_str("description"),
            Some("\"Review my code\nis a typical trigger.\n")
        );
        assert_eq!(fm.get_str("name"), Some("reviewer"));
        assert_eq!(body, "body\n");
    }

    #[test]
    fn keys_after_folded_block_scalar_are_scanned_again() {
        let content =
            "---\nnote: >-\n  it's 'open\n\n  still text\ntitle: \"a\n---\nb\"\n---\nbody";
        let (yaml, body) = located_yaml_and_body(content);
        assert!(yaml.ends_with("b\"\n"));
        assert_eq!(body, "body");
    }

    #[test]
    fn block_indicators_are_recognised() {
        assert!(opens_block_scalar("description: |\n"));
        assert!(opens_block_scalar("  - run: >+2 # comment\n"));
        assert!(!opens_block_scalar("title: |pipe|\n"));
        assert!(!opens_block_scalar("title: plain\n"));
    }

    #[test]
    fn empty_block_is_empty_mapping() {
        let (fm, body) = split_front_matter("a.md", "---\n---\nbody").unwrap();
        assert!(fm.is_empty());
        assert_eq!(body, "body");

        let (fm, _) = split_front_matter("a.md", "---\n# just a comment\n---\n").unwrap();
        assert!(fm.is_empty());
    }

    #[test]
    fn invalid_yaml_is_parse_error() {
        let err = split_front_matter("a.md", "---\nname: [unclosed\n---\nbody").unwrap_err();
        assert!(matches!(err, ParseError::InvalidYaml { .. }));
        assert_eq!(err.path(), "a.md");
        assert!(err.line() >= 2);
    }

    #[test]
    fn sequence_block_is_not_a_mapping() {
        let err = split_front_matter("a.md", "---\n- a\n- b\n---\n").unwrap_err();
        assert_eq!(
            err,
            ParseError::NotAMapping {
                path: "a.md".to_string(),
                line: 1,
                found: "array".to_string()
            }
        );
    }

    #[test]
    fn keys_keep_file_order() {
        let content = "---\nzeta: 1\nalpha: 2\nmid: 3\n---\n";
        let (fm, _) = split_front_matter("a.md", content).unwrap();
        let keys: Vec<&str> = fm.keys().collect();
        assert_eq!(keys, vec!["zeta", "alpha", "mid"]);
    }

    #[test]
    fn crlf_and_bom_are_tolerated() {
        let content = "\u{feff}---\r\nname: x\r\n---\r\nbody\r\n";
        let (fm, body) = split_front_matter("a.md", content).unwrap();
        assert_eq!(fm.get_str("name"), Some("x"));
        assert_eq!(body, "body\r\n");
    }

    #[test]
    fn closing_delimiter_at_eof_without_newline() {
        let (fm, body) = split_front_matter("a.md", "---\nname: x\n---").unwrap();
        assert_eq!(fm.get_str("name"), Some("x"));
        assert_eq!(body, "");
    }

    #[test]
    fn write_then_split_roundtrips() {
        let mut fm = FrontMatter::new();
        fm.insert("name", json!("code-writer"));
        fm.insert("tools", json!(["Read", "Write"]));
        fm.insert("version", json!(3));
        fm.insert("draft", json!(false));
        let written = write_document(&fm, "## Body\n").unwrap();
        assert!(written.starts_with("---\n"));

        let (parsed, body) = split_front_matter("a.md", &written).unwrap();
        assert_eq!(parsed, fm);
        assert_eq!(body, "## Body\n");
    }

    #[test]
    fn write_without_front_matter_is_body_only() {
        let written = write_document(&FrontMatter::new(), "# Plain\n").unwrap();
        assert_eq!(written, "# Plain\n");
    }

    #[test]
    fn value_kinds() {
        assert_eq!(value_kind(&json!(1)), "integer");
        assert_eq!(value_kind(&json!(1.5)), "float");
        assert_eq!(value_kind(&json!("x")), "string");
        assert_eq!(value_kind(&json!({"a": 1})), "mapping");
    }

    proptest! {
        #[test]
        fn text_without_opening_delimiter_is_untouched(text in "\\PC*") {
            let first = text.strip_prefix('\u{feff}').unwrap_or(&text);
            let first = first.split_inclusive('\n').next().unwrap_or("");
            prop_assume!(!is_delimiter(first));

            let (fm, body) = split_front_matter("p.md", &text).unwrap();
            prop_assert!(fm.is_empty());
            prop_assert_eq!(body, text.as_str());
        }

        #[test]
        fn serialized_mapping_reparses_equal(
            entries in prop::collection::btree_map(
                "[a-z_]{1,10}",
                prop_oneof![
                    "[a-z]{1,12}( [a-z]{1,12}){0,3}".prop_map(Value::from),
                    any::<i32>().prop_map(Value::from),
                    any::<bool>().prop_map(Value::from),
                    prop::collection::vec("[a-z]{1,8}", 0..4).prop_map(Value::from),
                ],
                0..8,
            ),
            body in "[a-zA-Z #\n]{0,40}",
        ) {
            let mut fm = FrontMatter::new();
            for (k, v) in entries {
                fm.insert(k, v);
            }
            let written = write_document(&fm, &body).unwrap();
            let (parsed, parsed_body) = split_front_matter("p.md", &written).unwrap();
            prop_assert_eq!(parsed, fm.clone());
            if !fm.is_empty() {
                prop_assert_eq!(parsed_body, body.as_str());
            }
        }
    }
}
