//! A parsed input file.

use serde::{Deserialize, Serialize};

use crate::error::ParseError;
use crate::frontmatter::{split_front_matter, FrontMatter};
use crate::link::{extract_links, LinkOptions, RawLink};

/// A raw input: path relative to the scan root, and the file's text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceFile {
    pub path: String,
    pub text: String,
}

impl SourceFile {
    pub fn new(path: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            text: text.into(),
        }
    }
}

/// A parsed document. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// `/`-separated path relative to the scan root, unique within a scan.
    pub path: String,
    pub front_matter: FrontMatter,
    /// Text after the front-matter block.
    pub body: String,
    /// Relative references in body order, with document line numbers.
    pub links: Vec<RawLink>,
}

impl Document {
    /// Parse a file's text into front-matter, body, and links.
    ///
    /// # Errors
    ///
    /// Returns a [`ParseError`] if the front-matter block is malformed.
    pub fn parse(path: &str, text: &str, options: &LinkOptions) -> Result<Self, ParseError> {
        let (front_matter, body) = split_front_matter(path, text)?;

        // Body lines are offset by the lines the front-matter block took up.
        let offset = text[..text.len() - body.len()].matches('\n').count();
        let links = extract_links(body, options)
            .into_iter()
            .map(|link| RawLink {
                line: link.line + offset,
                ..link
            })
            .collect();

        Ok(Self {
            path: path.to_string(),
            front_matter,
            body: body.to_string(),
            links,
        })
    }

    /// Title for display: `title`, then `name` from the front-matter.
    #[must_use]
    pub fn title(&self) -> Option<&str> {
        self.front_matter
            .get_str("title")
            .or_else(|| self.front_matter.get_str("name"))
    }
}

impl SourceFile {
    /// Parse this file into a [`Document`].
    ///
    /// # Errors
    ///
    /// Returns a [`ParseError`] if the front-matter block is malformed.
    pub fn parse(&self, options: &LinkOptions) -> Result<Document, ParseError> {
        Document::parse(&self.path, &self.text, options)
    }
}
