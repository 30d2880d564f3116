//! One source file through all three tiers.
//!
//! ```text
//! open → decode → thumbnail → gallery → full → TierRecords
//!   ↘       ↘          ↘          ↘        ↘
//!                  JobError (nothing committed)
//! ```
//!
//! A job either produces all three [`FileRecord`](crate::types::FileRecord)s
//! or none. When a later tier fails, the tier files this job wrote are
//! removed so the output folders only ever hold complete sets. Files the job
//! did not write are never touched.
//!
//! The decoder session is borrowed through [`OpenImage`], which frees the
//! session's image buffers when it goes out of scope on every exit path.

use crate::engine::{DecoderSession, EngineError};
use crate::extract::extract_tier;
use crate::types::{OutputLayout, Tier, TierRecords};
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// A source file that passed name validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceImage {
    pub path: PathBuf,
    /// File stem, used for output names (`IMG_0001`).
    pub base_name: String,
    pub sequence_number: u32,
}

impl SourceImage {
    pub fn new(path: impl Into<PathBuf>, base_name: impl Into<String>, sequence_number: u32) -> Self {
        Self {
            path: path.into(),
            base_name: base_name.into(),
            sequence_number,
        }
    }

    /// File name for display (`IMG_0001.CR3`).
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.base_name.clone())
    }
}

#[derive(Error, Debug)]
pub enum JobError {
    #[error("failed to open {}: {source}", .path.display())]
    OpenFailed { path: PathBuf, source: EngineError },
    #[error("failed to decode {}: {source}", .path.display())]
    DecodeFailed { path: PathBuf, source: EngineError },
    #[error("failed to extract {tier} from {}: {source}", .path.display())]
    ExtractFailed {
        path: PathBuf,
        tier: Tier,
        source: EngineError,
    },
    #[error("failed to write {tier} for {}: {source}", .path.display())]
    WriteFailed {
        path: PathBuf,
        tier: Tier,
        source: EngineError,
    },
}

/// Where in the job a failure happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStage {
    Open,
    Decode,
    Extract(Tier),
    Write(Tier),
}

impl fmt::Display for JobStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobStage::Open => f.write_str("open"),
            JobStage::Decode => f.write_str("decode"),
            JobStage::Extract(tier) => write!(f, "extract {tier}"),
            JobStage::Write(tier) => write!(f, "write {tier}"),
        }
    }
}

impl JobError {
    pub fn stage(&self) -> JobStage {
        match self {
            JobError::OpenFailed { .. } => JobStage::Open,
            JobError::DecodeFailed { .. } => JobStage::Decode,
            JobError::ExtractFailed { tier, .. } => JobStage::Extract(*tier),
            JobError::WriteFailed { tier, .. } => JobStage::Write(*tier),
        }
    }

    pub fn path(&self) -> &Path {
        match self {
            JobError::OpenFailed { path, .. }
            | JobError::DecodeFailed { path, .. }
            | JobError::ExtractFailed { path, .. }
            | JobError::WriteFailed { path, .. } => path,
        }
    }

    /// The engine's own error, without the job context.
    pub fn engine_error(&self) -> &EngineError {
        match self {
            JobError::OpenFailed { source, .. }
            | JobError::DecodeFailed { source, .. }
            | JobError::ExtractFailed { source, .. }
            | JobError::WriteFailed { source, .. } => source,
        }
    }
}

/// Scoped hold on a session with a file open.
///
/// Dropping it calls [`DecoderSession::free_image`], also when opening
/// failed half-way.
pub struct OpenImage<'a, S: DecoderSession + ?Sized> {
    session: &'a mut S,
}

impl<'a, S: DecoderSession + ?Sized> OpenImage<'a, S> {
    pub fn open(session: &'a mut S, path: &Path) -> Result<Self, EngineError> {
        let mut image = Self { session };
        image.session.open(path)?;
        Ok(image)
    }

    pub fn session(&mut self) -> &mut S {
        self.session
    }
}

impl<S: DecoderSession + ?Sized> Drop for OpenImage<'_, S> {
    fn drop(&mut self) {
        self.session.free_image();
    }
}

/// Run all three tiers for `source`.
pub fn run_job<S: DecoderSession + ?Sized>(
    session: &mut S,
    source: &SourceImage,
    layout: &OutputLayout,
) -> Result<TierRecords, JobError> {
    let mut image =
        OpenImage::open(session, &source.path).map_err(|e| JobError::OpenFailed {
            path: source.path.clone(),
            source: e,
        })?;

    image
        .session()
        .decode()
        .map_err(|e| JobError::DecodeFailed {
            path: source.path.clone(),
            source: e,
        })?;

    let mut written = Vec::new();
    let result = extract_all(image.session(), source, layout, &mut written);
    if result.is_err() {
        remove_written(&written);
    }
    result
}

/// Run the three tiers, recording every path a write was attempted on.
fn extract_all<S: DecoderSession + ?Sized>(
    session: &mut S,
    source: &SourceImage,
    layout: &OutputLayout,
    written: &mut Vec<PathBuf>,
) -> Result<TierRecords, JobError> {
    let mut run = |tier: Tier| match extract_tier(session, tier, source, layout) {
        Ok(record) => {
            written.push(layout.tier_path(tier, &source.base_name));
            Ok(record)
        }
        // A failed write may have left a truncated file behind
        Err(e @ JobError::WriteFailed { .. }) => {
            written.push(layout.tier_path(tier, &source.base_name));
            Err(e)
        }
        Err(e) => Err(e),
    };
    let thumbnail = run(Tier::Thumbnail)?;
    let gallery = run(Tier::Gallery)?;
    let full = run(Tier::Full)?;
    Ok(TierRecords {
        full,
        gallery,
        thumbnail,
    })
}

fn remove_written(paths: &[PathBuf]) {
    for path in paths {
        match std::fs::remove_file(path) {
            Ok(()) => tracing::debug!(path = %path.display(), "removed partial output"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!(path = %path.display(), error = %e, "could not remove partial output"),
        }
    }
}
