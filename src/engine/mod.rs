//! RAW engine seam.
//!
//! - **Session**: [`DecoderSession`] trait, the only way the rest of the
//!   crate touches RAW files
//! - **Preview**: [`PreviewEngine`], the production session that copies the
//!   camera's embedded JPEG previews

pub mod preview;
pub mod session;

pub use preview::PreviewEngine;
pub use session::{DecoderSession, Dimensions, EngineError};
