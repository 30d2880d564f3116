//! Per-tier extraction on an already decoded session.
//!
//! Selects the tier's embedded preview, writes it to the tier folder and
//! builds the [`FileRecord`] describing it. Reported sizes are deliberately
//! asymmetric: thumbnail and gallery records carry the display size of the
//! decoded image, the full record carries the raw sensor size.

use crate::engine::{DecoderSession, Dimensions};
use crate::job::{JobError, SourceImage};
use crate::types::{FileRecord, OutputLayout, Tier};

/// Size recorded in the manifest for `tier`.
pub fn reported_size<S: DecoderSession + ?Sized>(session: &S, tier: Tier) -> Dimensions {
    match tier {
        Tier::Full => session.raw_size(),
        Tier::Thumbnail | Tier::Gallery => session.display_size(),
    }
}

/// Extract and write one tier for `source`.
///
/// The session must have opened and decoded `source.path`.
pub fn extract_tier<S: DecoderSession + ?Sized>(
    session: &mut S,
    tier: Tier,
    source: &SourceImage,
    layout: &OutputLayout,
) -> Result<FileRecord, JobError> {
    session
        .extract_thumbnail(tier.extraction_index())
        .map_err(|e| JobError::ExtractFailed {
            path: source.path.clone(),
            tier,
            source: e,
        })?;

    let output = layout.tier_path(tier, &source.base_name);
    session
        .write_thumbnail(&output)
        .map_err(|e| JobError::WriteFailed {
            path: source.path.clone(),
            tier,
            source: e,
        })?;

    let size = reported_size(session, tier);
    Ok(FileRecord::new(
        tier.file_name(&source.base_name),
        size.width,
        size.height,
        source.sequence_number,
    ))
}
