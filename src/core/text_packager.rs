// src/core/text_packager.rs

use super::models::{OutputBlob, ProjectFileSet};
use super::packager::{PackageError, Result};
use super::timestamp::GenerationStamp;

const HEADER_RULE: &str = "============================================================";
const BYTE_ORDER_MARK: char = '\u{FEFF}';

pub fn start_marker(path: &str) -> String {
    format!("---------- START OF FILE: {path} ----------")
}

pub fn end_marker(path: &str) -> String {
    format!("---------- END OF FILE: {path} ----------")
}

/// Packages the file set as a single text document stamped with the current time.
pub fn package_as_text(files: &ProjectFileSet, project_name: &str) -> Result<OutputBlob> {
    package_as_text_at(files, project_name, &GenerationStamp::now())
}

/// Creates the text package for `files` with an explicit generation stamp.
///
/// An empty set is rejected with `PackageError::EmptySet` rather than producing
/// a header-only document.
///
/// The document starts with a header block naming the project, the stamp and the
/// file count. Each file follows in set order, framed by `START OF FILE` and
/// `END OF FILE` marker lines with a blank line on either side of the content;
/// blocks are separated by two blank lines. Line endings are normalized to CRLF
/// and the UTF-8 result is prefixed with a byte-order mark.
pub fn package_as_text_at(
    files: &ProjectFileSet,
    project_name: &str,
    stamp: &GenerationStamp,
) -> Result<OutputBlob> {
    if files.is_empty() {
        return Err(PackageError::EmptySet { candidate_count: 0 });
    }
    let mut document = format!(
        "\n{HEADER_RULE}\n Project: {project_name}\n{HEADER_RULE}\n Generated: {}\n Total Files: {}\n{HEADER_RULE}\n\n",
        stamp.as_str(),
        files.len()
    );

    let blocks: Vec<String> = files
        .iter()
        .map(|file| {
            format!(
                "{}\n\n{}\n\n{}",
                start_marker(&file.path),
                file.content,
                end_marker(&file.path)
            )
        })
        .collect();
    document.push_str(&blocks.join("\n\n\n"));

    let normalized = normalize_line_endings(&document);
    let mut bytes = Vec::with_capacity(normalized.len() + BYTE_ORDER_MARK.len_utf8());
    let mut bom = [0u8; 4];
    bytes.extend_from_slice(BYTE_ORDER_MARK.encode_utf8(&mut bom).as_bytes());
    bytes.extend_from_slice(normalized.as_bytes());

    log::debug!(
        "TextPackager: Packaged {} file(s) for '{project_name}' into {} byte(s).",
        files.len(),
        bytes.len()
    );
    Ok(OutputBlob::text(bytes, project_name))
}

/// Collapses CRLF and lone CR to LF, then expands every LF to CRLF.
pub fn normalize_line_endings(text: &str) -> String {
    text.replace("\r\n", "\n")
        .replace('\r', "\n")
        .replace('\n', "\r\n")
}
