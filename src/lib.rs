//! # raw-thumbs
//!
//! Turns a folder of camera RAW files into three JPEG renditions per photo
//! and a `manifest.json` a gallery viewer can load directly.
//!
//! # Architecture: One Pass, Three Tiers
//!
//! ```text
//! shoot-2024/IMG_0001.CR2 ──► out/shoot-2024/thumbnail/IMG_0001-thumbnail.jpeg
//!                         ├─► out/shoot-2024/gallery/IMG_0001-gallery.jpeg
//!                         └─► out/shoot-2024/full/IMG_0001-full.jpeg
//!                                          │
//!                         out/shoot-2024/manifest.json
//! ```
//!
//! Files are ordered in the manifest by the number after the first `_` in
//! their name, not by file name, so `IMG_2` sorts before `IMG_10`.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`pipeline`] | Enumerates the source folder, runs jobs with retry passes, sorts, writes the manifest |
//! | [`job`] | One source file through open, decode and all three tiers; all-or-nothing |
//! | [`extract`] | One tier: select the preview, write it, build its record |
//! | [`engine`] | The `DecoderSession` seam and the production `PreviewEngine` |
//! | [`manifest`] | `manifest.json` serialization |
//! | [`naming`] | `PREFIX_DIGITS` sequence number parser |
//! | [`types`] | Shared types: `Tier`, `FileRecord`, `TierRecords`, `OutputLayout` |
//! | [`config`] | TOML config loading, merging and validation |
//! | [`output`] | CLI output formatting for run events |
//!
//! # Design Decisions
//!
//! ## Embedded Previews, Not Demosaicing
//!
//! Cameras already store finished JPEG renditions inside every RAW file. The
//! [`engine::PreviewEngine`] copies those byte-for-byte instead of developing
//! the sensor data, so output looks exactly like the camera's own preview and
//! a folder converts in seconds.
//!
//! ## All-or-Nothing Per File
//!
//! The three collections in the manifest are index-aligned. A file contributes
//! one record to each or none at all, and a failed file leaves no tier files
//! behind.
//!
//! ## Retry After Everything Else
//!
//! Failed files are not retried immediately. They are queued and retried once
//! every other file has been tried, which gets past transient I/O trouble
//! without stalling the run.

pub mod config;
pub mod engine;
pub mod extract;
pub mod job;
pub mod manifest;
pub mod naming;
pub mod output;
pub mod pipeline;
pub mod types;

#[cfg(test)]
pub(crate) mod test_helpers;
