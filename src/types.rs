//! Shared types passed between the job, pipeline, and manifest stages.
//!
//! A [`FileRecord`] is what ends up in `manifest.json`. A [`TierRecords`]
//! triple is the unit the pipeline commits: one record per [`Tier`], produced
//! together or not at all.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// One of the three renderings extracted from every source image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tier {
    Thumbnail,
    Gallery,
    Full,
}

impl Tier {
    /// Extraction order used by jobs.
    pub const ALL: [Tier; 3] = [Tier::Thumbnail, Tier::Gallery, Tier::Full];

    /// Index of the embedded preview the engine is asked for.
    ///
    /// Previews are ordered smallest first, so the thumbnail is always the
    /// smallest one the file carries.
    pub fn extraction_index(self) -> usize {
        match self {
            Tier::Thumbnail => 0,
            Tier::Gallery => 1,
            Tier::Full => 2,
        }
    }

    /// Output sub-folder, relative to the run's output directory.
    pub fn folder(self) -> &'static str {
        match self {
            Tier::Thumbnail => "thumbnail",
            Tier::Gallery => "gallery",
            Tier::Full => "full",
        }
    }

    /// Filename suffix appended to the source base name.
    pub fn suffix(self) -> &'static str {
        match self {
            Tier::Thumbnail => "-thumbnail.jpeg",
            Tier::Gallery => "-gallery.jpeg",
            Tier::Full => "-full.jpeg",
        }
    }

    /// Output filename for a source base name: `IMG_0001` → `IMG_0001-full.jpeg`.
    pub fn file_name(self, base_name: &str) -> String {
        format!("{}{}", base_name, self.suffix())
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.folder())
    }
}

/// Manifest entry for a single written tier file.
///
/// Serializes as `{"fileName": ..., "width": ..., "height": ...}`. The
/// sequence number only drives ordering and is never written out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    #[serde(rename = "fileName")]
    pub name: String,
    pub width: u32,
    pub height: u32,
    #[serde(skip)]
    pub sequence_number: u32,
}

impl FileRecord {
    pub fn new(name: impl Into<String>, width: u32, height: u32, sequence_number: u32) -> Self {
        Self {
            name: name.into(),
            width,
            height,
            sequence_number,
        }
    }
}

/// The three records a successful job produces for one source image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TierRecords {
    pub full: FileRecord,
    pub gallery: FileRecord,
    pub thumbnail: FileRecord,
}

impl TierRecords {
    /// Sequence number shared by all three records.
    pub fn sequence_number(&self) -> u32 {
        self.full.sequence_number
    }
}

/// Directory tree a run writes into: `{output root}/{source folder}`.
///
/// ```text
/// out/shoot-2024/
/// ├── manifest.json
/// ├── full/IMG_0001-full.jpeg
/// ├── gallery/IMG_0001-gallery.jpeg
/// └── thumbnail/IMG_0001-thumbnail.jpeg
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputLayout {
    root: PathBuf,
}

impl OutputLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn tier_dir(&self, tier: Tier) -> PathBuf {
        self.root.join(tier.folder())
    }

    pub fn tier_path(&self, tier: Tier, base_name: &str) -> PathBuf {
        self.tier_dir(tier).join(tier.file_name(base_name))
    }

    pub fn manifest_path(&self, file_name: &str) -> PathBuf {
        self.root.join(file_name)
    }

    /// Create the root and the three tier folders.
    pub fn create_dirs(&self) -> std::io::Result<()> {
        for tier in Tier::ALL {
            std::fs::create_dir_all(self.tier_dir(tier))?;
        }
        Ok(())
    }
}
