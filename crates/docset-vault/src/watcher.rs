//! File system watcher that drives re-scans in watch mode.
//!
//! Uses the `notify` crate for cross-platform file system events.

use std::path::{Component, Path, PathBuf};
use std::sync::mpsc;
use std::time::Duration;

use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tracing::{trace, warn};

use docset_core::{DocsetError, Result};

use crate::discover::has_document_extension;

/// Events emitted by the watcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VaultEvent {
    /// A document was created or modified.
    Changed(PathBuf),
    /// A document was deleted.
    Removed(PathBuf),
}

impl VaultEvent {
    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            Self::Changed(path) | Self::Removed(path) => path,
        }
    }
}

/// Watches a document root and emits events for document files.
pub struct VaultWatcher {
    _watcher: RecommendedWatcher,
    receiver: mpsc::Receiver<VaultEvent>,
}

impl VaultWatcher {
    /// Start watching `root` for changes to files with one of `extensions`.
    ///
    /// Hidden files and anything under a hidden directory are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`DocsetError::Io`] if the watcher cannot be created.
    pub fn start(root: &Path, extensions: &[String]) -> Result<Self> {
        let (tx, rx) = mpsc::channel();

        let root_owned = root.to_path_buf();
        let extensions = extensions.to_vec();

        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            let event = match res {
                Ok(event) => event,
                Err(e) => {
                    warn!(error = %e, "watch error");
                    return;
                }
            };
            for path in &event.paths {
                if !has_document_extension(path, &extensions) || is_hidden(&root_owned, path) {
                    continue;
                }

                let vault_event = match event.kind {
                    EventKind::Create(_) | EventKind::Modify(_) => {
                        VaultEvent::Changed(path.clone())
                    }
                    EventKind::Remove(_) => VaultEvent::Removed(path.clone()),
                    _ => continue,
                };
                trace!(?vault_event, "file event");
                let _ = tx.send(vault_event);
            }
        })
        .map_err(|e| DocsetError::Io(std::io::Error::other(e)))?;

        watcher
            .watch(root, RecursiveMode::Recursive)
            .map_err(|e| DocsetError::Io(std::io::Error::other(e)))?;

        Ok(Self {
            _watcher: watcher,
            receiver: rx,
        })
    }

    /// Receive the next event, waiting at most `timeout`.
    pub fn recv_timeout(&self, timeout: Duration) -> Option<VaultEvent> {
        self.receiver.recv_timeout(timeout).ok()
    }

    /// Drain events until none arrive for `quiet`, returning everything seen.
    pub fn drain(&self, quiet: Duration) -> Vec<VaultEvent> {
        let mut events = Vec::new();
        while let Some(event) = self.recv_timeout(quiet) {
            events.push(event);
        }
        events
    }
}

fn is_hidden(root: &Path, path: &Path) -> bool {
    path.strip_prefix(root).ok().is_some_and(|rel| {
        rel.components().any(|c| match c {
            Component::Normal(name) => name.to_string_lossy().starts_with('.'),
            _ => false,
        })
    })
}
