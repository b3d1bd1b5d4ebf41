/*
 * Drives one packaging run end to end: list the candidates, drop excluded
 * paths, read and sort the survivors, then hand the sorted set to the text
 * and/or paginated packager. `PackagerOperations` is the seam the command line
 * front end talks to; `CorePackager` is the implementation, configured once with
 * the exclusion rules and the reading and layout limits.
 */
use crate::core::acquisition::{
    AcquisitionOptions, FileSourceOperations, ReadError, acquire_project_files,
};
use crate::core::checksum_utils;
use crate::core::document_packager::{
    DocumentError, LayoutLimits, LayoutOverflowWarning, package_as_document_with,
};
use crate::core::exclusion::ExclusionRuleSet;
use crate::core::models::{CandidateFile, OutputBlob, OutputFormat, ProjectFileSet};
use crate::core::text_packager::package_as_text_at;
use crate::core::timestamp::GenerationStamp;
use std::sync::Arc;

#[derive(Debug)]
pub enum PackageError {
    Read(ReadError),
    EmptySet { candidate_count: usize },
    Document(DocumentError),
}

impl From<ReadError> for PackageError {
    fn from(err: ReadError) -> Self {
        PackageError::Read(err)
    }
}

impl From<DocumentError> for PackageError {
    fn from(err: DocumentError) -> Self {
        PackageError::Document(err)
    }
}

impl std::fmt::Display for PackageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PackageError::Read(e) => write!(f, "{e}"),
            PackageError::EmptySet { candidate_count } => write!(
                f,
                "No files to process ({candidate_count} candidate(s), all excluded or none found)"
            ),
            PackageError::Document(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for PackageError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PackageError::Read(e) => Some(e),
            PackageError::Document(e) => Some(e),
            PackageError::EmptySet { .. } => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, PackageError>;

/// One produced artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageOutcome {
    pub blob: OutputBlob,
    pub file_count: usize,
    pub sha256: String,
    pub warnings: Vec<LayoutOverflowWarning>,
}

impl PackageOutcome {
    fn new(blob: OutputBlob, file_count: usize, warnings: Vec<LayoutOverflowWarning>) -> Self {
        let sha256 = checksum_utils::sha256_hex(&blob.bytes);
        PackageOutcome {
            blob,
            file_count,
            sha256,
            warnings,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageReport {
    pub project_name: String,
    pub candidate_count: usize,
    pub file_count: usize,
    pub outcomes: Vec<PackageOutcome>,
}

pub trait PackagerOperations: Send + Sync {
    /// Candidates that survive the exclusion rules, in their original order.
    fn filter_candidates(&self, candidates: Vec<CandidateFile>) -> Vec<CandidateFile>;

    /// Lists, filters, reads and packages everything `source` offers.
    fn package_source(
        &self,
        source: Arc<dyn FileSourceOperations>,
        format: OutputFormat,
    ) -> Result<PackageReport>;

    /// Packages an already assembled file set.
    fn package_file_set(
        &self,
        files: &ProjectFileSet,
        project_name: &str,
        format: OutputFormat,
    ) -> Result<Vec<PackageOutcome>>;
}

pub struct CorePackager {
    rules: ExclusionRuleSet,
    acquisition: AcquisitionOptions,
    limits: LayoutLimits,
}

impl CorePackager {
    pub fn new(
        rules: ExclusionRuleSet,
        acquisition: AcquisitionOptions,
        limits: LayoutLimits,
    ) -> Self {
        CorePackager {
            rules,
            acquisition,
            limits,
        }
    }
}

/*
 * The selected root's name: the first segment of the first candidate. Every
 * candidate shares that segment, so which one is inspected does not matter.
 */
pub fn derive_project_name(candidates: &[CandidateFile]) -> String {
    candidates
        .first()
        .map(|c| c.root_segment().to_string())
        .unwrap_or_default()
}

impl PackagerOperations for CorePackager {
    fn filter_candidates(&self, candidates: Vec<CandidateFile>) -> Vec<CandidateFile> {
        let total = candidates.len();
        let kept: Vec<CandidateFile> = candidates
            .into_iter()
            .filter(|candidate| !self.rules.is_excluded(&candidate.path))
            .collect();
        log::debug!(
            "CorePackager: {} of {total} candidate(s) kept after {} exclusion rule(s).",
            kept.len(),
            self.rules.rules().len()
        );
        kept
    }

    fn package_source(
        &self,
        source: Arc<dyn FileSourceOperations>,
        format: OutputFormat,
    ) -> Result<PackageReport> {
        let candidates = source.list_candidates()?;
        let candidate_count = candidates.len();
        let project_name = derive_project_name(&candidates);
        log::info!(
            "CorePackager: {candidate_count} file(s) detected in '{project_name}', packaging as {format}."
        );

        let kept = self.filter_candidates(candidates);
        if kept.is_empty() {
            log::info!("CorePackager: No files to process for '{project_name}'.");
            return Err(PackageError::EmptySet { candidate_count });
        }

        let files = acquire_project_files(source, kept, self.acquisition)?;
        let outcomes = self.package_file_set(&files, &project_name, format)?;
        Ok(PackageReport {
            project_name,
            candidate_count,
            file_count: files.len(),
            outcomes,
        })
    }

    fn package_file_set(
        &self,
        files: &ProjectFileSet,
        project_name: &str,
        format: OutputFormat,
    ) -> Result<Vec<PackageOutcome>> {
        // One stamp per run so both artifacts carry the same generation time.
        let stamp = GenerationStamp::now();
        let mut outcomes = Vec::new();

        if format.includes_text() {
            let blob = package_as_text_at(files, project_name, &stamp)?;
            outcomes.push(PackageOutcome::new(blob, files.len(), Vec::new()));
        }
        if format.includes_pdf() {
            let package = package_as_document_with(files, project_name, &stamp, self.limits)?;
            outcomes.push(PackageOutcome::new(
                package.blob,
                files.len(),
                package.layout.warnings,
            ));
        }

        for outcome in &outcomes {
            log::info!(
                "CorePackager: Created {} ({} byte(s), sha256 {}).",
                outcome.blob.suggested_filename,
                outcome.blob.bytes.len(),
                outcome.sha256
            );
        }
        Ok(outcomes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::acquisition;
    use crate::core::models::{PDF_MIME_TYPE, ProjectFile, TEXT_MIME_TYPE};
    use std::collections::BTreeMap;
    use std::sync::Mutex;

    struct MockFileSource {
        files: BTreeMap<String, String>,
        unreadable: Option<String>,
        reads: Mutex<Vec<String>>,
    }

    impl MockFileSource {
        fn new(entries: &[(&str, &str)]) -> Self {
            MockFileSource {
                files: entries
                    .iter()
                    .map(|(p, c)| (p.to_string(), c.to_string()))
                    .collect(),
                unreadable: None,
                reads: Mutex::new(Vec::new()),
            }
        }

        fn read_paths(&self) -> Vec<String> {
            let mut paths = self.reads.lock().unwrap().clone();
            paths.sort();
            paths
        }
    }

    impl FileSourceOperations for MockFileSource {
        fn list_candidates(&self) -> acquisition::Result<Vec<CandidateFile>> {
            Ok(self
                .files
                .keys()
                .map(|p| CandidateFile::new(p.clone(), p.clone()))
                .collect())
        }

        fn read_text(&self, candidate: &CandidateFile) -> acquisition::Result<String> {
            self.reads.lock().unwrap().push(candidate.path.clone());
            if self.unreadable.as_deref() == Some(candidate.path.as_str()) {
                return Err(ReadError::Unreadable {
                    path: candidate.path.clone(),
                    reason: "removed mid-read".to_string(),
                });
            }
            Ok(self.files[&candidate.path].clone())
        }
    }

    fn packager(custom: &[&str]) -> CorePackager {
        CorePackager::new(
            ExclusionRuleSet::with_defaults(custom),
            AcquisitionOptions::default(),
            LayoutLimits::default(),
        )
    }

    #[test]
    fn test_filter_candidates_applies_rules() {
        let packager = CorePackager::new(
            ExclusionRuleSet::custom_only(&["*.log", "dist/"]),
            AcquisitionOptions::default(),
            LayoutLimits::default(),
        );
        let kept = packager.filter_candidates(vec![
            CandidateFile::new("src/a.ts", "src/a.ts"),
            CandidateFile::new("dist/x.js", "dist/x.js"),
            CandidateFile::new("e.log", "e.log"),
        ]);
        let paths: Vec<&str> = kept.iter().map(|c| c.path.as_str()).collect();
        assert_eq!(paths, vec!["src/a.ts"]);
    }

    #[test]
    fn test_package_source_reads_only_survivors() {
        let source = Arc::new(MockFileSource::new(&[
            ("proj/src/main.rs", "fn main() {}\n"),
            ("proj/node_modules/dep/index.js", "module.exports = 1;\n"),
            ("proj/debug.log", "noise\n"),
            ("proj/README.md", "# proj\n"),
        ]));
        let report = packager(&[])
            .package_source(source.clone(), OutputFormat::Text)
            .unwrap();

        assert_eq!(report.project_name, "proj");
        assert_eq!(report.candidate_count, 4);
        assert_eq!(report.file_count, 2);
        assert_eq!(
            source.read_paths(),
            vec!["proj/README.md".to_string(), "proj/src/main.rs".to_string()]
        );

        assert_eq!(report.outcomes.len(), 1);
        let outcome = &report.outcomes[0];
        assert_eq!(outcome.blob.mime_type, TEXT_MIME_TYPE);
        assert_eq!(outcome.blob.suggested_filename, "proj_source_code.txt");
        assert_eq!(outcome.sha256, checksum_utils::sha256_hex(&outcome.blob.bytes));
        let text = String::from_utf8_lossy(&outcome.blob.bytes);
        assert!(text.contains(" Total Files: 2"));
        assert!(!text.contains("node_modules"));
    }

    #[test]
    fn test_package_source_reports_empty_set() {
        let source = Arc::new(MockFileSource::new(&[
            ("proj/app.log", "x"),
            ("proj/.env", "SECRET=1"),
        ]));
        let result = packager(&[]).package_source(source.clone(), OutputFormat::Both);
        assert!(matches!(
            result,
            Err(PackageError::EmptySet { candidate_count: 2 })
        ));
        assert!(source.read_paths().is_empty());
    }

    #[test]
    fn test_package_source_fails_without_partial_output() {
        let mut source = MockFileSource::new(&[("proj/a.rs", "a"), ("proj/b.rs", "b")]);
        source.unreadable = Some("proj/b.rs".to_string());
        let result = packager(&[]).package_source(Arc::new(source), OutputFormat::Both);
        assert!(matches!(
            result,
            Err(PackageError::Read(ReadError::Unreadable { .. }))
        ));
    }

    #[test]
    fn test_package_file_set_both_formats_share_order() {
        let files = ProjectFileSet::from_files(vec![
            ProjectFile::new("b.txt", "B"),
            ProjectFile::new("a.txt", "A"),
        ]);
        let outcomes = packager(&[])
            .package_file_set(&files, "demo", OutputFormat::Both)
            .unwrap();

        assert_eq!(outcomes.len(), 2);
        assert_eq!(outcomes[0].blob.mime_type, TEXT_MIME_TYPE);
        assert_eq!(outcomes[1].blob.mime_type, PDF_MIME_TYPE);
        assert!(outcomes.iter().all(|o| o.file_count == 2));

        let text = String::from_utf8_lossy(&outcomes[0].blob.bytes);
        let a = text.find("START OF FILE: a.txt").unwrap();
        let b = text.find("START OF FILE: b.txt").unwrap();
        assert!(a < b);
    }

    #[test]
    fn test_package_file_set_rejects_empty_set() {
        let result =
            packager(&[]).package_file_set(&ProjectFileSet::default(), "demo", OutputFormat::Text);
        assert!(matches!(result, Err(PackageError::EmptySet { .. })));
    }

    #[test]
    fn test_derive_project_name() {
        assert_eq!(
            derive_project_name(&[CandidateFile::new("root/a.txt", "/x/root/a.txt")]),
            "root"
        );
        assert_eq!(derive_project_name(&[]), "");
    }
}
