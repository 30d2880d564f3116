//! Folder-level orchestration: one run turns a folder of RAW files into the
//! three tier folders plus `manifest.json`.
//!
//! ## Run Order
//!
//! ```text
//! source folder ──enumerate──► candidates (regular files, by file name)
//!        │
//!        ├─ name does not match PREFIX_DIGITS ──► skipped
//!        ├─ base name already used by an earlier file ──► skipped
//!        │
//!        ▼
//!   first pass ── run_job ──► commit triple        (processed)
//!        │ failure
//!        ▼
//!   retry pass(es) ── run_job ──► commit triple    (processed)
//!        │ still failing
//!        ▼
//!     errored
//!
//! collections ──stable sort by sequence number──► manifest.json ──► teardown
//! ```
//!
//! ## Output Layout
//!
//! ```text
//! {output root}/{source folder name}/
//! ├── manifest.json
//! ├── full/
//! ├── gallery/
//! └── thumbnail/
//! ```
//!
//! Per-file failures never abort a run; they end up in the `skipped` or
//! `errored` counters. Only problems with the run as a whole (missing source,
//! unwritable output, manifest write) surface as [`PipelineError`].

use crate::config::ConverterConfig;
use crate::engine::DecoderSession;
use crate::job::{JobError, JobStage, SourceImage, run_job};
use crate::manifest::{ManifestError, ManifestStyle, write_manifest};
use crate::naming::{base_name, parse_sequence_number};
use crate::types::{FileRecord, OutputLayout, TierRecords};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;
use std::time::{Duration, Instant};
use thiserror::Error;
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Source folder not found: {}", .0.display())]
    SourceNotFound(PathBuf),
    #[error("Source folder has no name: {}", .0.display())]
    InvalidSource(PathBuf),
    #[error("Failed to create output folder {}: {source}", .path.display())]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to read source folder: {0}")]
    Walk(#[from] walkdir::Error),
    #[error("Failed to write manifest: {0}")]
    Manifest(#[from] ManifestError),
}

/// Run settings, usually built from [`ConverterConfig`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineOptions {
    /// Retry passes over files that failed; 0 disables retries.
    pub retries: u32,
    pub manifest_file_name: String,
    pub manifest_style: ManifestStyle,
}

impl PipelineOptions {
    pub fn from_config(config: &ConverterConfig) -> Self {
        Self {
            retries: config.pipeline.retries,
            manifest_file_name: config.manifest.file_name.clone(),
            manifest_style: if config.manifest.pretty {
                ManifestStyle::Pretty
            } else {
                ManifestStyle::Compact
            },
        }
    }
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self::from_config(&ConverterConfig::default())
    }
}

/// Progress reported while a run is in flight.
///
/// Sent through the optional channel given to [`Pipeline::with_events`] and
/// rendered by [`crate::output::format_run_event`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunEvent {
    Started {
        source: PathBuf,
        output: PathBuf,
        /// Regular files found in the source folder.
        total: usize,
    },
    Skipped {
        file_name: String,
        reason: String,
    },
    Committed {
        /// Running count of committed files, 1-based.
        position: usize,
        /// Files queued for conversion, after skips.
        total: usize,
        file_name: String,
        sequence_number: u32,
    },
    Failed {
        file_name: String,
        stage: JobStage,
        message: String,
        /// True when another pass will try the file again.
        will_retry: bool,
    },
    RetryPassStarted {
        pass: u32,
        count: usize,
    },
    ManifestWritten {
        path: PathBuf,
        entries: usize,
    },
}

/// Counters for a finished run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Summary {
    pub processed: usize,
    pub skipped: usize,
    pub errored: usize,
    pub elapsed: Duration,
    /// `{output root}/{source folder name}`.
    pub output: PathBuf,
}

/// The three per-tier record lists, index-aligned by construction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Collections {
    pub full: Vec<FileRecord>,
    pub gallery: Vec<FileRecord>,
    pub thumbnail: Vec<FileRecord>,
}

impl Collections {
    /// Append a job's records to all three lists at once.
    pub fn commit(&mut self, records: TierRecords) {
        self.full.push(records.full);
        self.gallery.push(records.gallery);
        self.thumbnail.push(records.thumbnail);
    }

    pub fn len(&self) -> usize {
        self.full.len()
    }

    pub fn is_empty(&self) -> bool {
        self.full.is_empty()
    }

    /// Equal lengths and equal sequence numbers at every position.
    pub fn is_aligned(&self) -> bool {
        self.full.len() == self.gallery.len()
            && self.full.len() == self.thumbnail.len()
            && self
                .full
                .iter()
                .zip(&self.gallery)
                .zip(&self.thumbnail)
                .all(|((f, g), t)| {
                    f.sequence_number == g.sequence_number
                        && f.sequence_number == t.sequence_number
                })
    }

    /// Stable-sort each list by sequence number. Ties keep commit order.
    pub fn sort(&mut self) {
        for list in [&mut self.full, &mut self.gallery, &mut self.thumbnail] {
            list.sort_by_key(|record| record.sequence_number);
        }
    }
}

/// Owns the decoder session for the length of a run.
pub struct Pipeline<S: DecoderSession> {
    session: S,
    options: PipelineOptions,
    events: Option<Sender<RunEvent>>,
}

impl<S: DecoderSession> Pipeline<S> {
    pub fn new(session: S, options: PipelineOptions) -> Self {
        Self {
            session,
            options,
            events: None,
        }
    }

    /// Report progress on `tx`. The channel closes when the pipeline drops.
    pub fn with_events(mut self, tx: Sender<RunEvent>) -> Self {
        self.events = Some(tx);
        self
    }

    pub fn session(&self) -> &S {
        &self.session
    }

    pub fn options(&self) -> &PipelineOptions {
        &self.options
    }

    /// Convert every RAW file in `source_dir` and write the manifest under
    /// `output_root/{source folder name}`.
    ///
    /// The session is torn down before returning, on success and on error.
    pub fn run(&mut self, source_dir: &Path, output_root: &Path) -> Result<Summary, PipelineError> {
        let started = Instant::now();
        let result = self.run_inner(source_dir, output_root, started);
        self.session.teardown();
        result
    }

    fn run_inner(
        &mut self,
        source_dir: &Path,
        output_root: &Path,
        started: Instant,
    ) -> Result<Summary, PipelineError> {
        if !source_dir.is_dir() {
            return Err(PipelineError::SourceNotFound(source_dir.to_path_buf()));
        }
        let layout = OutputLayout::new(output_root.join(source_folder_name(source_dir)?));
        layout
            .create_dirs()
            .map_err(|source| PipelineError::CreateDir {
                path: layout.root().to_path_buf(),
                source,
            })?;

        let candidates = enumerate_candidates(source_dir)?;
        self.emit(RunEvent::Started {
            source: source_dir.to_path_buf(),
            output: layout.root().to_path_buf(),
            total: candidates.len(),
        });

        let mut skipped = 0;
        let mut pending = Vec::new();
        // Base name -> file that claimed it. Outputs are named by base name,
        // so a second file with the same stem would overwrite the first.
        let mut claimed: HashMap<String, String> = HashMap::new();
        for path in candidates {
            let identified = identify(path).and_then(|source| {
                match claimed.get(&source.base_name) {
                    Some(owner) => Err((
                        source.file_name(),
                        format!("base name {} already used by {owner}", source.base_name),
                    )),
                    None => {
                        claimed.insert(source.base_name.clone(), source.file_name());
                        Ok(source)
                    }
                }
            });
            match identified {
                Ok(source) => pending.push(source),
                Err((file_name, reason)) => {
                    tracing::debug!(file = %file_name, %reason, "skipping");
                    skipped += 1;
                    self.emit(RunEvent::Skipped { file_name, reason });
                }
            }
        }

        let total = pending.len();
        let mut collections = Collections::default();
        let mut failed = self.run_pass(pending, 0, total, &layout, &mut collections);
        for pass in 1..=self.options.retries {
            if failed.is_empty() {
                break;
            }
            self.emit(RunEvent::RetryPassStarted {
                pass,
                count: failed.len(),
            });
            failed = self.run_pass(failed, pass, total, &layout, &mut collections);
        }
        let errored = failed.len();
        debug_assert!(collections.is_aligned());

        collections.sort();
        let manifest_path = layout.manifest_path(&self.options.manifest_file_name);
        write_manifest(
            &manifest_path,
            &collections.full,
            &collections.gallery,
            &collections.thumbnail,
            self.options.manifest_style,
        )?;
        self.emit(RunEvent::ManifestWritten {
            path: manifest_path,
            entries: collections.len(),
        });

        Ok(Summary {
            processed: collections.len(),
            skipped,
            errored,
            elapsed: started.elapsed(),
            output: layout.root().to_path_buf(),
        })
    }

    /// Run one pass over `sources`, committing successes. Returns the
    /// sources that failed.
    fn run_pass(
        &mut self,
        sources: Vec<SourceImage>,
        pass: u32,
        total: usize,
        layout: &OutputLayout,
        collections: &mut Collections,
    ) -> Vec<SourceImage> {
        let will_retry = pass < self.options.retries;
        let mut failed = Vec::new();
        for source in sources {
            tracing::debug!(file = %source.path.display(), pass, "running job");
            match run_job(&mut self.session, &source, layout) {
                Ok(records) => {
                    collections.commit(records);
                    self.emit(RunEvent::Committed {
                        position: collections.len(),
                        total,
                        file_name: source.file_name(),
                        sequence_number: source.sequence_number,
                    });
                }
                Err(e) => {
                    self.report_failure(&source, &e, will_retry);
                    failed.push(source);
                }
            }
        }
        failed
    }

    fn report_failure(&self, source: &SourceImage, error: &JobError, will_retry: bool) {
        if will_retry {
            tracing::debug!(file = %source.path.display(), error = %error, "job failed, will retry");
        } else {
            tracing::warn!(file = %source.path.display(), stage = %error.stage(), error = %error, "giving up");
        }
        self.emit(RunEvent::Failed {
            file_name: source.file_name(),
            stage: error.stage(),
            message: error.engine_error().to_string(),
            will_retry,
        });
    }

    fn emit(&self, event: RunEvent) {
        if let Some(tx) = &self.events {
            tx.send(event).ok();
        }
    }
}

/// Last component of the source folder, after resolving `.` and symlinks.
fn source_folder_name(source_dir: &Path) -> Result<PathBuf, PipelineError> {
    let resolved = source_dir.canonicalize()?;
    resolved
        .file_name()
        .map(PathBuf::from)
        .ok_or_else(|| PipelineError::InvalidSource(source_dir.to_path_buf()))
}

/// Regular files directly inside `dir`, sorted by file name.
///
/// Unreadable entries inside the folder are logged and left out; failing to
/// read the folder itself is fatal.
fn enumerate_candidates(dir: &Path) -> Result<Vec<PathBuf>, PipelineError> {
    let mut files = Vec::new();
    let walker = WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .follow_links(true)
        .sort_by_file_name();
    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) if e.depth() > 0 => {
                tracing::warn!(error = %e, "ignoring unreadable entry");
                continue;
            }
            Err(e) => return Err(e.into()),
        };
        if entry.file_type().is_file() {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

/// Turn a candidate path into a job input, or a skip reason.
fn identify(path: PathBuf) -> Result<SourceImage, (String, String)> {
    let display_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let stem = match base_name(&path) {
        Ok(stem) => stem,
        Err(e) => return Err((display_name, e.to_string())),
    };
    match parse_sequence_number(stem) {
        Ok(number) => {
            let stem = stem.to_string();
            Ok(SourceImage::new(path, stem, number))
        }
        Err(e) => Err((display_name, e.to_string())),
    }
}
