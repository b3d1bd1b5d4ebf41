use crate::core::acquisition::{FileSourceOperations, ReadError, Result};
use crate::core::models::CandidateFile;
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};
use walkdir::WalkDir;

/*
 * This module provides the on-disk file source used by the command line front
 * end. It enumerates every regular file below a selected root directory and
 * reports paths the way the exclusion filter expects them: relative to the
 * root's parent, so the first segment is the root directory's own name, and
 * joined with '/' on every platform.
 */

const UTF8_BOM: &str = "\u{FEFF}";

pub struct DirectoryFileSource {
    root: PathBuf,
    root_name: String,
}

impl DirectoryFileSource {
    /*
     * Creates a file source for `root`. The root must be an existing directory.
     * Its display name is taken from the last path component, canonicalizing
     * first so that `.` resolves to the real folder name.
     */
    pub fn new(root: &Path) -> Result<Self> {
        if !root.is_dir() {
            return Err(ReadError::Listing {
                root: root.display().to_string(),
                source: io::Error::new(io::ErrorKind::NotFound, "not a directory"),
            });
        }
        let canonical = fs::canonicalize(root).map_err(|e| ReadError::Listing {
            root: root.display().to_string(),
            source: e,
        })?;
        let root_name = canonical
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        log::debug!("DirectoryFileSource: Root {canonical:?} has project name '{root_name}'.");
        Ok(DirectoryFileSource {
            root: canonical,
            root_name,
        })
    }

    pub fn root_name(&self) -> &str {
        &self.root_name
    }

    fn relative_display_path(&self, path: &Path) -> Option<String> {
        let relative = path.strip_prefix(&self.root).ok()?;
        let mut segments = Vec::new();
        if !self.root_name.is_empty() {
            segments.push(self.root_name.clone());
        }
        for component in relative.components() {
            if let Component::Normal(part) = component {
                segments.push(part.to_string_lossy().into_owned());
            }
        }
        Some(segments.join("/"))
    }
}

impl FileSourceOperations for DirectoryFileSource {
    fn list_candidates(&self) -> Result<Vec<CandidateFile>> {
        log::debug!("DirectoryFileSource: Enumerating files under {:?}.", self.root);
        let mut candidates = Vec::new();

        for entry_result in WalkDir::new(&self.root).follow_links(false) {
            let entry = entry_result.map_err(|e| ReadError::Listing {
                root: self.root.display().to_string(),
                source: io::Error::from(e),
            })?;
            if !entry.file_type().is_file() {
                continue;
            }
            match self.relative_display_path(entry.path()) {
                Some(display) => {
                    candidates.push(CandidateFile::new(display, entry.path().to_path_buf()))
                }
                None => log::warn!(
                    "DirectoryFileSource: Skipping {:?}, not below root {:?}.",
                    entry.path(),
                    self.root
                ),
            }
        }

        log::debug!(
            "DirectoryFileSource: Found {} file(s) under {:?}.",
            candidates.len(),
            self.root
        );
        Ok(candidates)
    }

    /*
     * Reads the whole file and decodes it as UTF-8. Invalid sequences become
     * U+FFFD rather than failing the read, and a leading byte-order mark is
     * dropped so it does not end up in the middle of a packaged document.
     */
    fn read_text(&self, candidate: &CandidateFile) -> Result<String> {
        let bytes = fs::read(&candidate.handle).map_err(|e| ReadError::Io {
            path: candidate.path.clone(),
            source: e,
        })?;
        let text = String::from_utf8_lossy(&bytes);
        let text = text.strip_prefix(UTF8_BOM).unwrap_or(&*text).to_string();
        log::trace!(
            "DirectoryFileSource: Read {} byte(s) from '{}'.",
            bytes.len(),
            candidate.path
        );
        Ok(text)
    }
}
