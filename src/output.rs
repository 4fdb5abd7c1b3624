//! Output directory handling.
//!
//! Badge files are named from the ticket identifier, a timestamp and a
//! process-wide sequence number, and land under their final name only once
//! fully written: the bytes go to a temporary file in the same directory
//! which is then persisted without clobbering.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Local;
use tempfile::NamedTempFile;

use crate::error::{BadgeError, BadgeResult};
use crate::render::RenderedDocument;

static SEQUENCE: AtomicU64 = AtomicU64::new(1);

const MAX_NAME_ATTEMPTS: usize = 16;

/// Replace everything except ASCII alphanumerics, `-` and `_`.
pub fn sanitize_component(raw: &str) -> String {
    let cleaned: String = raw
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if cleaned.is_empty() {
        "unnamed".to_string()
    } else {
        cleaned
    }
}

/// A fresh file name for `ticket_id`; never repeats within a process.
pub fn document_file_name(prefix: &str, ticket_id: &str) -> String {
    let seq = SEQUENCE.fetch_add(1, Ordering::Relaxed);
    format!(
        "{prefix}-{}-{}-{seq:04}.pdf",
        sanitize_component(ticket_id),
        Local::now().format("%Y%m%d-%H%M%S"),
    )
}

/// The configured directory rendered documents are written to.
#[derive(Debug, Clone)]
pub struct OutputDir {
    root: PathBuf,
}

impl OutputDir {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create the directory if it does not exist yet.
    pub fn ensure(&self) -> BadgeResult<()> {
        std::fs::create_dir_all(&self.root).map_err(|e| BadgeError::filesystem(&self.root, e))
    }

    /// Write `doc` under a new name and record the path on it.
    pub fn write(&self, prefix: &str, doc: &mut RenderedDocument) -> BadgeResult<PathBuf> {
        self.ensure()?;

        let mut tmp =
            NamedTempFile::new_in(&self.root).map_err(|e| BadgeError::filesystem(&self.root, e))?;
        tmp.write_all(&doc.bytes)
            .and_then(|_| tmp.as_file().sync_all())
            .map_err(|e| BadgeError::filesystem(tmp.path(), e))?;

        for _ in 0..MAX_NAME_ATTEMPTS {
            let path = self.root.join(document_file_name(prefix, &doc.ticket_id));
            match tmp.persist_noclobber(&path) {
                Ok(_) => {
                    log::info!("Wrote '{}' ({} bytes)", path.display(), doc.bytes.len());
                    doc.path = Some(path.clone());
                    return Ok(path);
                }
                Err(e) if e.error.kind() == std::io::ErrorKind::AlreadyExists => {
                    log::debug!("'{}' already exists, picking another name", path.display());
                    tmp = e.file;
                }
                Err(e) => return Err(BadgeError::filesystem(path, e.error)),
            }
        }

        Err(BadgeError::filesystem(
            &self.root,
            std::io::Error::new(
                std::io::ErrorKind::AlreadyExists,
                "could not find a free file name",
            ),
        ))
    }
}
