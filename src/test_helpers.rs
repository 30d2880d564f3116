//! Shared test utilities for the raw-thumbs test suite.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let fx = setup_source(&["IMG_0002.raw", "IMG_0001.raw", "notes.txt"]);
//! let summary = pipeline.run(&fx.source, &fx.output_root).unwrap();
//!
//! let manifest = read_manifest(&fx.manifest_path()).unwrap();
//! assert_eq!(file_names(&manifest.full), vec!["IMG_0001-full.jpeg", "IMG_0002-full.jpeg"]);
//! ```

use std::path::{Path, PathBuf};
use tempfile::TempDir;

use crate::types::{FileRecord, OutputLayout, Tier};

/// Name of the source folder every fixture creates.
pub const SOURCE_FOLDER: &str = "shoot-2024";

/// Bytes written into every fixture source file.
pub const PLACEHOLDER_RAW: &[u8] = b"not really a raw file";

// =========================================================================
// Fixture setup
// =========================================================================

/// A temp source folder plus an output root next to it.
pub struct SourceFixture {
    /// Keeps the directory alive for the test's duration.
    pub tmp: TempDir,
    pub source: PathBuf,
    pub output_root: PathBuf,
}

impl SourceFixture {
    /// `{output_root}/{SOURCE_FOLDER}`.
    pub fn output_dir(&self) -> PathBuf {
        self.output_root.join(SOURCE_FOLDER)
    }

    pub fn layout(&self) -> OutputLayout {
        OutputLayout::new(self.output_dir())
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.layout().manifest_path("manifest.json")
    }

    pub fn tier_file(&self, tier: Tier, base_name: &str) -> PathBuf {
        self.layout().tier_path(tier, base_name)
    }
}

/// Create `{tmp}/shoot-2024/` holding one placeholder file per name.
pub fn setup_source(file_names: &[&str]) -> SourceFixture {
    let tmp = TempDir::new().unwrap();
    let source = tmp.path().join(SOURCE_FOLDER);
    std::fs::create_dir_all(&source).unwrap();
    for name in file_names {
        write_placeholder(&source, name);
    }
    let output_root = tmp.path().join("out");
    SourceFixture {
        tmp,
        source,
        output_root,
    }
}

/// Write a placeholder source file into `dir`.
pub fn write_placeholder(dir: &Path, file_name: &str) {
    std::fs::write(dir.join(file_name), PLACEHOLDER_RAW).unwrap();
}

// =========================================================================
// Record lookups
// =========================================================================

/// File names of a record list, in order.
pub fn file_names(records: &[FileRecord]) -> Vec<&str> {
    records.iter().map(|r| r.name.as_str()).collect()
}
