/*
 * This module consolidates the platform-agnostic packaging logic. It re-exports
 * the data model, the exclusion filter, file acquisition (including the
 * `FileSourceOperations` abstraction and the on-disk `DirectoryFileSource`),
 * the text and paginated packagers, configuration management, and the
 * `PackagerOperations` orchestrator the command line front end drives.
 */
pub mod acquisition;
pub mod checksum_utils;
pub mod collation;
pub mod config;
pub mod document_packager;
pub mod exclusion;
pub mod file_system;
pub mod models;
pub mod packager;
pub mod page_surface;
pub mod path_utils;
pub mod pdf_surface;
pub mod text_packager;
pub mod timestamp;

// Re-export the data model
pub use models::{
    CandidateFile, OutputBlob, OutputFormat, PDF_MIME_TYPE, ProjectFile, ProjectFileSet,
    TEXT_MIME_TYPE,
};

// Re-export exclusion items
pub use exclusion::{DEFAULT_EXCLUSIONS, ExclusionRule, ExclusionRuleSet, is_excluded};

// Re-export acquisition and file source items
pub use acquisition::{
    AcquisitionOptions, FileSourceOperations, ReadError, acquire_project_files,
};
pub use file_system::DirectoryFileSource;

// Re-export the packagers
pub use document_packager::{
    DocumentError, DocumentLayout, DocumentPackage, LayoutLimits, LayoutOverflowWarning,
    package_as_document,
};
pub use text_packager::package_as_text;

pub use config::{ConfigError, ConfigManagerOperations, CoreConfigManager, PackagerConfig};

pub use packager::{CorePackager, PackageError, PackageOutcome, PackageReport, PackagerOperations};
