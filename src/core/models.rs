/*
 * Core data structures shared by the acquisition pipeline and both packagers.
 * `CandidateFile` is what a file source discovers, `ProjectFile` is a decoded
 * survivor of the exclusion filter, and `ProjectFileSet` is the sorted batch
 * that both packagers consume. `OutputBlob` is the terminal artifact handed back
 * to the caller.
 */
use crate::core::collation::locale_compare;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

pub const TEXT_MIME_TYPE: &str = "text/plain;charset=utf-8";
pub const PDF_MIME_TYPE: &str = "application/pdf";

/*
 * A file discovered under the selected root before exclusion filtering.
 * `path` is relative, '/'-separated, and starts with the root directory's name.
 * `handle` is whatever the file source needs to read the content later; for the
 * directory source it is the absolute location on disk.
 */
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateFile {
    pub path: String,
    pub handle: PathBuf,
}

impl CandidateFile {
    pub fn new(path: impl Into<String>, handle: impl Into<PathBuf>) -> Self {
        CandidateFile {
            path: path.into(),
            handle: handle.into(),
        }
    }

    /*
     * Returns the first '/'-delimited segment of the path, which is the name of
     * the selected root directory.
     */
    pub fn root_segment(&self) -> &str {
        self.path.split('/').next().unwrap_or("")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectFile {
    pub path: String,
    pub content: String,
}

impl ProjectFile {
    pub fn new(path: impl Into<String>, content: impl Into<String>) -> Self {
        ProjectFile {
            path: path.into(),
            content: content.into(),
        }
    }
}

/*
 * The decoded files to be packaged, sorted by path with `locale_compare`.
 * The only way to build one is through `from_files`, so every instance is sorted
 * and both packagers see the exact same order.
 */
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProjectFileSet {
    files: Vec<ProjectFile>,
}

impl ProjectFileSet {
    pub fn from_files(mut files: Vec<ProjectFile>) -> Self {
        // Stable sort keeps duplicate paths in acquisition order.
        files.sort_by(|a, b| locale_compare(&a.path, &b.path));
        ProjectFileSet { files }
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ProjectFile> {
        self.files.iter()
    }
}

#[cfg(test)]
impl ProjectFileSet {
    pub fn as_slice(&self) -> &[ProjectFile] {
        &self.files
    }

    pub fn paths(&self) -> Vec<&str> {
        self.files.iter().map(|f| f.path.as_str()).collect()
    }

    pub fn into_files(self) -> Vec<ProjectFile> {
        self.files
    }
}

impl<'a> IntoIterator for &'a ProjectFileSet {
    type Item = &'a ProjectFile;
    type IntoIter = std::slice::Iter<'a, ProjectFile>;

    fn into_iter(self) -> Self::IntoIter {
        self.files.iter()
    }
}

/*
 * Selects which packager(s) a packaging run drives. Serialized in lowercase so it
 * reads naturally in the JSON configuration file.
 */
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Text,
    Pdf,
    Both,
}

impl OutputFormat {
    pub fn includes_text(self) -> bool {
        matches!(self, OutputFormat::Text | OutputFormat::Both)
    }

    pub fn includes_pdf(self) -> bool {
        matches!(self, OutputFormat::Pdf | OutputFormat::Both)
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Pdf => write!(f, "pdf"),
            OutputFormat::Both => write!(f, "both"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputBlob {
    pub bytes: Vec<u8>,
    pub mime_type: &'static str,
    pub suggested_filename: String,
}

impl OutputBlob {
    pub fn text(bytes: Vec<u8>, project_name: &str) -> Self {
        OutputBlob {
            bytes,
            mime_type: TEXT_MIME_TYPE,
            suggested_filename: suggested_filename(project_name, "txt"),
        }
    }

    pub fn pdf(bytes: Vec<u8>, project_name: &str) -> Self {
        OutputBlob {
            bytes,
            mime_type: PDF_MIME_TYPE,
            suggested_filename: suggested_filename(project_name, "pdf"),
        }
    }
}

pub fn suggested_filename(project_name: &str, extension: &str) -> String {
    let trimmed = project_name.trim();
    if trimmed.is_empty() {
        format!("source_code.{extension}")
    } else {
        format!("{trimmed}_source_code.{extension}")
    }
}
