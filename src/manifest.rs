//! `manifest.json` serialization.
//!
//! The manifest is the contract with the downstream gallery viewer:
//!
//! ```json
//! {"full":[{"fileName":"IMG_0001-full.jpeg","width":6024,"height":4022}],
//!  "gallery":[{"fileName":"IMG_0001-gallery.jpeg","width":6000,"height":4000}],
//!  "thumbnail":[{"fileName":"IMG_0001-thumbnail.jpeg","width":6000,"height":4000}]}
//! ```
//!
//! Keys are always `full`, `gallery`, `thumbnail` in that order, and the three
//! arrays are index-aligned: position `i` in each describes the same source
//! image. Sequence numbers are not written.

use crate::types::FileRecord;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ManifestError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Output formatting for the manifest file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ManifestStyle {
    /// Single line, no whitespace.
    #[default]
    Compact,
    /// Indented, for humans.
    Pretty,
}

#[derive(Debug, Serialize)]
struct ManifestRef<'a> {
    full: &'a [FileRecord],
    gallery: &'a [FileRecord],
    thumbnail: &'a [FileRecord],
}

/// A manifest read back from disk.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Manifest {
    pub full: Vec<FileRecord>,
    pub gallery: Vec<FileRecord>,
    pub thumbnail: Vec<FileRecord>,
}

impl Manifest {
    pub fn len(&self) -> usize {
        self.full.len()
    }

    pub fn is_empty(&self) -> bool {
        self.full.is_empty()
    }
}

/// Render the manifest JSON.
pub fn render_manifest(
    full: &[FileRecord],
    gallery: &[FileRecord],
    thumbnail: &[FileRecord],
    style: ManifestStyle,
) -> Result<String, ManifestError> {
    debug_assert_eq!(full.len(), gallery.len(), "full/gallery length mismatch");
    debug_assert_eq!(full.len(), thumbnail.len(), "full/thumbnail length mismatch");

    let doc = ManifestRef {
        full,
        gallery,
        thumbnail,
    };
    let json = match style {
        ManifestStyle::Compact => serde_json::to_string(&doc)?,
        ManifestStyle::Pretty => serde_json::to_string_pretty(&doc)?,
    };
    Ok(json)
}

/// Write the manifest to `path`, replacing any existing file.
pub fn write_manifest(
    path: &Path,
    full: &[FileRecord],
    gallery: &[FileRecord],
    thumbnail: &[FileRecord],
    style: ManifestStyle,
) -> Result<(), ManifestError> {
    let json = render_manifest(full, gallery, thumbnail, style)?;
    std::fs::write(path, json)?;
    Ok(())
}

/// Read a manifest written by [`write_manifest`].
pub fn read_manifest(path: &Path) -> Result<Manifest, ManifestError> {
    let content = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}
