//! Filename parsing for the `PREFIX_NNNN` camera naming convention.
//!
//! Cameras name their files with a short prefix, an underscore and a
//! counter: `IMG_0001.CR3`, `DSC_0412.NEF`. The counter is the sequence
//! number that orders the manifest. Anything else in the source folder
//! (sidecars, notes, `.DS_Store`) fails to parse and is skipped.
//!
//! A source file needs an extension and must not be hidden: `IMG_0007` and
//! `.IMG_0007.CR2` are rejected before the counter is looked at.
//!
//! - `IMG_0007` → `7`
//! - `DSC_1200` → `1200`
//! - `IMG_0007-edit` → error (suffix must be digits only)
//! - `notes` → error (no underscore)

use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FormatError {
    #[error("expected a PREFIX_DIGITS.EXT file name: {0}")]
    FileName(String),
    #[error("name does not match required pattern PREFIX_DIGITS: {0}")]
    Pattern(String),
    #[error("sequence number out of range: {0}")]
    Number(String),
}

/// Derive the base name used for parsing and output naming.
///
/// Drops any directory and the last extension: `/raw/IMG_0001.CR3` → `IMG_0001`.
/// Names without an extension, hidden names and non-UTF-8 names are
/// `FormatError::FileName`.
pub fn base_name(path: &Path) -> Result<&str, FormatError> {
    let file_name_error = || {
        let name = path.file_name().unwrap_or(path.as_os_str());
        FormatError::FileName(name.to_string_lossy().into_owned())
    };

    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .ok_or_else(file_name_error)?;
    let has_extension = path.extension().is_some_and(|e| !e.is_empty());
    if !has_extension || stem.starts_with('.') {
        return Err(file_name_error());
    }
    Ok(stem)
}

/// Parse the sequence number out of a base name.
///
/// Splits on the first `_`. The prefix must be non-empty and the remainder
/// must be one or more ASCII digits. Leading zeros are ignored.
pub fn parse_sequence_number(base_name: &str) -> Result<u32, FormatError> {
    let pattern_error = || FormatError::Pattern(base_name.to_string());

    let (prefix, digits) = base_name.split_once('_').ok_or_else(pattern_error)?;
    if prefix.is_empty() || digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(pattern_error());
    }

    digits
        .parse::<u32>()
        .map_err(|_| FormatError::Number(base_name.to_string()))
}
