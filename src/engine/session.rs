//! Decoder session trait and shared types.
//!
//! A [`DecoderSession`] is a stateful handle onto a RAW engine: one file is
//! open at a time, it must be decoded before previews can be extracted, and
//! its buffers are freed before the next file is opened. The pipeline owns
//! exactly one session and lends it to one job at a time.
//!
//! The production implementation is
//! [`PreviewEngine`](super::preview::PreviewEngine). Tests use the scripted
//! `MockSession` defined below.

use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("no file is open")]
    NotOpen,
    #[error("file has not been decoded")]
    NotDecoded,
    #[error("no thumbnail has been extracted")]
    NothingExtracted,
    #[error("unsupported or corrupt RAW data: {0}")]
    Unsupported(String),
    #[error("no embedded JPEG previews found")]
    NoPreviews,
    #[error("thumbnail index {index} out of range ({available} available)")]
    ThumbnailOutOfRange { index: usize, available: usize },
    #[error("Processing failed: {0}")]
    ProcessingFailed(String),
}

/// Pixel dimensions reported by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

/// Open → decode → extract/write → free, repeated per file.
///
/// Implementations may assume calls arrive in that order; out-of-order calls
/// return [`EngineError::NotOpen`] / [`EngineError::NotDecoded`] rather than
/// panicking.
pub trait DecoderSession {
    /// Load a RAW file into the session.
    fn open(&mut self, path: &Path) -> Result<(), EngineError>;

    /// Decode the open file and index its embedded previews.
    fn decode(&mut self) -> Result<(), EngineError>;

    /// Select the embedded preview at `index` for writing.
    fn extract_thumbnail(&mut self, index: usize) -> Result<(), EngineError>;

    /// Write the selected preview as a JPEG file.
    fn write_thumbnail(&mut self, path: &Path) -> Result<(), EngineError>;

    /// Size of the decoded, display-oriented image.
    fn display_size(&self) -> Dimensions;

    /// Size of the full sensor area.
    fn raw_size(&self) -> Dimensions;

    /// Release per-file buffers. Safe to call when nothing is open.
    fn free_image(&mut self);

    /// Tear the whole session down at the end of a run.
    fn teardown(&mut self);
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use std::collections::HashMap;

    /// Placeholder content written for every tier file.
    pub const MOCK_JPEG: &[u8] = &[0xFF, 0xD8, 0xFF, 0xD9];

    /// Stage at which a scripted file fails.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum FailAt {
        Open,
        Decode,
        Extract(usize),
        Write(usize),
    }

    #[derive(Debug, Clone, Copy)]
    struct Plan {
        stage: FailAt,
        /// Number of leading attempts that fail; later attempts succeed.
        failing_attempts: u32,
    }

    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum RecordedOp {
        Open(String),
        Decode,
        Extract(usize),
        Write(String),
        Free,
        Teardown,
    }

    /// Scripted session: every file succeeds unless a failure is planned
    /// for it, and real placeholder files are written so callers can check
    /// the output tree.
    pub struct MockSession {
        plans: HashMap<String, Plan>,
        attempts: HashMap<String, u32>,
        current: Option<(String, u32)>,
        decoded: bool,
        extracted: Option<usize>,
        display: Dimensions,
        raw: Dimensions,
        operations: Vec<RecordedOp>,
    }

    impl Default for MockSession {
        fn default() -> Self {
            Self {
                plans: HashMap::new(),
                attempts: HashMap::new(),
                current: None,
                decoded: false,
                extracted: None,
                display: Dimensions {
                    width: 5472,
                    height: 3648,
                },
                raw: Dimensions {
                    width: 5568,
                    height: 3708,
                },
                operations: Vec::new(),
            }
        }
    }

    impl MockSession {
        pub fn new() -> Self {
            Self::default()
        }

        /// Fail `file_name` at `stage` on its first `attempts` attempts.
        pub fn failing(mut self, file_name: &str, stage: FailAt, attempts: u32) -> Self {
            self.plans.insert(
                file_name.to_string(),
                Plan {
                    stage,
                    failing_attempts: attempts,
                },
            );
            self
        }

        /// Fail `file_name` at `stage` on every attempt.
        pub fn always_failing(self, file_name: &str, stage: FailAt) -> Self {
            self.failing(file_name, stage, u32::MAX)
        }

        pub fn with_sizes(mut self, display: Dimensions, raw: Dimensions) -> Self {
            self.display = display;
            self.raw = raw;
            self
        }

        pub fn attempts(&self, file_name: &str) -> u32 {
            self.attempts.get(file_name).copied().unwrap_or(0)
        }

        pub fn operations(&self) -> &[RecordedOp] {
            &self.operations
        }

        pub fn is_open(&self) -> bool {
            self.current.is_some()
        }

        fn should_fail(&self, stage: FailAt) -> bool {
            let Some((name, attempt)) = &self.current else {
                return false;
            };
            self.plans
                .get(name)
                .is_some_and(|plan| plan.stage == stage && *attempt <= plan.failing_attempts)
        }
    }

    impl DecoderSession for MockSession {
        fn open(&mut self, path: &Path) -> Result<(), EngineError> {
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            self.operations.push(RecordedOp::Open(name.clone()));
            let attempt = self.attempts.entry(name.clone()).or_insert(0);
            *attempt += 1;
            self.current = Some((name, *attempt));
            if self.should_fail(FailAt::Open) {
                return Err(EngineError::ProcessingFailed("mock open failure".into()));
            }
            Ok(())
        }

        fn decode(&mut self) -> Result<(), EngineError> {
            self.operations.push(RecordedOp::Decode);
            if self.current.is_none() {
                return Err(EngineError::NotOpen);
            }
            if self.should_fail(FailAt::Decode) {
                return Err(EngineError::ProcessingFailed("mock decode failure".into()));
            }
            self.decoded = true;
            Ok(())
        }

        fn extract_thumbnail(&mut self, index: usize) -> Result<(), EngineError> {
            self.operations.push(RecordedOp::Extract(index));
            if !self.decoded {
                return Err(EngineError::NotDecoded);
            }
            if self.should_fail(FailAt::Extract(index)) {
                return Err(EngineError::ThumbnailOutOfRange {
                    index,
                    available: index,
                });
            }
            self.extracted = Some(index);
            Ok(())
        }

        fn write_thumbnail(&mut self, path: &Path) -> Result<(), EngineError> {
            self.operations
                .push(RecordedOp::Write(path.to_string_lossy().into_owned()));
            let index = self.extracted.ok_or(EngineError::NothingExtracted)?;
            if self.should_fail(FailAt::Write(index)) {
                return Err(EngineError::ProcessingFailed("mock write failure".into()));
            }
            std::fs::write(path, MOCK_JPEG)?;
            Ok(())
        }

        fn display_size(&self) -> Dimensions {
            self.display
        }

        fn raw_size(&self) -> Dimensions {
            self.raw
        }

        fn free_image(&mut self) {
            self.operations.push(RecordedOp::Free);
            self.current = None;
            self.decoded = false;
            self.extracted = None;
        }

        fn teardown(&mut self) {
            self.operations.push(RecordedOp::Teardown);
            self.current = None;
        }
    }

    #[test]
    fn mock_fails_only_planned_attempts() {
        let mut session = MockSession::new().failing("IMG_0001.raw", FailAt::Open, 1);
        let path = Path::new("/src/IMG_0001.raw");

        assert!(session.open(path).is_err());
        session.free_image();
        assert!(session.open(path).is_ok());
        assert_eq!(session.attempts("IMG_0001.raw"), 2);
    }

    #[test]
    fn mock_requires_decode_before_extract() {
        let mut session = MockSession::new();
        session.open(Path::new("IMG_0001.raw")).unwrap();
        assert!(matches!(
            session.extract_thumbnail(0),
            Err(EngineError::NotDecoded)
        ));
    }

    #[test]
    fn mock_records_operations_in_order() {
        let tmp = tempfile::TempDir::new().unwrap();
        let out = tmp.path().join("a-thumbnail.jpeg");
        let mut session = MockSession::new();

        session.open(Path::new("IMG_0001.raw")).unwrap();
        session.decode().unwrap();
        session.extract_thumbnail(0).unwrap();
        session.write_thumbnail(&out).unwrap();
        session.free_image();

        assert_eq!(
            session.operations(),
            &[
                RecordedOp::Open("IMG_0001.raw".into()),
                RecordedOp::Decode,
                RecordedOp::Extract(0),
                RecordedOp::Write(out.to_string_lossy().into_owned()),
                RecordedOp::Free,
            ]
        );
        assert_eq!(std::fs::read(&out).unwrap(), MOCK_JPEG);
    }
}
