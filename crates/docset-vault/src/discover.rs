//! Document discovery: walk a root directory and load document files.

use std::fs;
use std::path::{Path, PathBuf};

use docset_core::{DocsetError, Result, SourceFile};
use tracing::{debug, warn};

/// Load every document under `root` whose extension is in `extensions`.
///
/// Hidden files and directories (names starting with `.`) are skipped, as are
/// symlinked directories. Paths are `/`-separated, relative to `root`, and
/// the result is sorted by path.
///
/// # Errors
///
/// Returns [`DocsetError::Vault`] if `root` is not a directory and
/// [`DocsetError::Io`] if a directory or file cannot be read.
pub fn discover(root: &Path, extensions: &[String]) -> Result<Vec<SourceFile>> {
    if !root.is_dir() {
        return Err(DocsetError::Vault(format!(
            "{} is not a directory",
            root.display()
        )));
    }

    let mut files = Vec::new();
    collect_files(root, extensions, &mut files)?;

    let mut sources = Vec::with_capacity(files.len());
    for path in files {
        let Some(rel) = relative_path(root, &path) else {
            continue;
        };
        let bytes = fs::read(&path)?;
        let text = match String::from_utf8(bytes) {
            Ok(text) => text,
            Err(e) => {
                warn!(path = %rel, "file is not valid UTF-8, invalid bytes replaced");
                String::from_utf8_lossy(e.as_bytes()).into_owned()
            }
        };
        sources.push(SourceFile::new(rel, text));
    }

    sources.sort_by(|a, b| a.path.cmp(&b.path));
    debug!(root = %root.display(), documents = sources.len(), "discovery finished");
    Ok(sources)
}

/// `path` relative to `root`, with `/` separators.
#[must_use]
pub fn relative_path(root: &Path, path: &Path) -> Option<String> {
    let rel = path.strip_prefix(root).ok()?;
    let parts: Vec<String> = rel
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    (!parts.is_empty()).then(|| parts.join("/"))
}

/// True when `path` has one of `extensions`, compared case-insensitively.
#[must_use]
pub fn has_document_extension(path: &Path, extensions: &[String]) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| {
            extensions
                .iter()
                .any(|e| e.trim_start_matches('.').eq_ignore_ascii_case(ext))
        })
}

fn collect_files(dir: &Path, extensions: &[String], out: &mut Vec<PathBuf>) -> std::io::Result<()> {
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name();
        if name.to_string_lossy().starts_with('.') {
            continue;
        }

        let path = entry.path();
        let file_type = entry.file_type()?;
        if file_type.is_dir() {
            collect_files(&path, extensions, out)?;
            continue;
        }

        let is_file = file_type.is_file() || (file_type.is_symlink() && path.is_file());
        if is_file && has_document_extension(&path, extensions) {
            out.push(path);
        }
    }
    Ok(())
}
