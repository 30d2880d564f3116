//! CLI output formatting for a conversion run.
//!
//! # Output Format
//!
//! ```text
//! Converting shoot-2024 → out/shoot-2024 (4 files)
//! skip notes.txt: name does not match required pattern PREFIX_DIGITS: notes
//! 001/003 IMG_0001.CR2
//! fail IMG_0002.CR2 at decode: no embedded JPEG previews found (will retry)
//! 002/003 IMG_0003.CR2
//! Retry pass 1 (1 file)
//! 003/003 IMG_0002.CR2
//! Manifest: out/shoot-2024/manifest.json (3 entries)
//! Processed 3, skipped 1, errored 0 in 1.42s
//! ```
//!
//! # Architecture
//!
//! Each output has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format functions
//! are pure: no I/O, no side effects.

use crate::pipeline::{RunEvent, Summary};
use std::path::Path;

/// Width of the running counter, from the total.
fn counter_width(total: usize) -> usize {
    total.to_string().len().max(3)
}

/// `003/120` style counter.
fn format_counter(position: usize, total: usize) -> String {
    let width = counter_width(total);
    format!("{position:0>width$}/{total:0>width$}")
}

fn folder_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn count(n: usize, singular: &str, plural: &str) -> String {
    if n == 1 {
        format!("{n} {singular}")
    } else {
        format!("{n} {plural}")
    }
}

/// Format a single run event as display lines.
pub fn format_run_event(event: &RunEvent) -> Vec<String> {
    match event {
        RunEvent::Started {
            source,
            output,
            total,
        } => vec![format!(
            "Converting {} \u{2192} {} ({})",
            folder_name(source),
            output.display(),
            count(*total, "file", "files")
        )],
        RunEvent::Skipped { file_name, reason } => {
            vec![format!("skip {file_name}: {reason}")]
        }
        RunEvent::Committed {
            position,
            total,
            file_name,
            ..
        } => vec![format!("{} {}", format_counter(*position, *total), file_name)],
        RunEvent::Failed {
            file_name,
            stage,
            message,
            will_retry,
        } => {
            let suffix = if *will_retry { " (will retry)" } else { "" };
            vec![format!("fail {file_name} at {stage}: {message}{suffix}")]
        }
        RunEvent::RetryPassStarted { pass, count: files } => {
            vec![format!("Retry pass {pass} ({})", count(*files, "file", "files"))]
        }
        RunEvent::ManifestWritten { path, entries } => vec![format!(
            "Manifest: {} ({})",
            path.display(),
            count(*entries, "entry", "entries")
        )],
    }
}

/// Print a run event to stdout.
pub fn print_run_event(event: &RunEvent) {
    for line in format_run_event(event) {
        println!("{}", line);
    }
}

/// One-line summary of a finished run.
pub fn format_summary(summary: &Summary) -> Vec<String> {
    vec![format!(
        "Processed {}, skipped {}, errored {} in {:.2}s",
        summary.processed,
        summary.skipped,
        summary.errored,
        summary.elapsed.as_secs_f64()
    )]
}

/// Print the run summary to stdout.
pub fn print_summary(summary: &Summary) {
    for line in format_summary(summary) {
        println!("{}", line);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::JobStage;
    use crate::types::Tier;
    use std::path::PathBuf;
    use std::time::Duration;

    #[test]
    fn counter_pads_to_three_digits() {
        assert_eq!(format_counter(1, 4), "001/004");
        assert_eq!(format_counter(12, 120), "012/120");
    }

    #[test]
    fn counter_grows_for_large_totals() {
        assert_eq!(format_counter(7, 1500), "0007/1500");
    }

    #[test]
    fn format_started() {
        let event = RunEvent::Started {
            source: PathBuf::from("/photos/shoot-2024"),
            output: PathBuf::from("out/shoot-2024"),
            total: 4,
        };
        assert_eq!(
            format_run_event(&event),
            vec!["Converting shoot-2024 \u{2192} out/shoot-2024 (4 files)"]
        );
    }

    #[test]
    fn format_started_single_file() {
        let event = RunEvent::Started {
            source: PathBuf::from("a"),
            output: PathBuf::from("out/a"),
            total: 1,
        };
        assert!(format_run_event(&event)[0].ends_with("(1 file)"));
    }

    #[test]
    fn format_skipped() {
        let event = RunEvent::Skipped {
            file_name: "notes.txt".into(),
            reason: "no sequence number".into(),
        };
        assert_eq!(
            format_run_event(&event),
            vec!["skip notes.txt: no sequence number"]
        );
    }

    #[test]
    fn format_committed() {
        let event = RunEvent::Committed {
            position: 2,
            total: 10,
            file_name: "IMG_0002.CR2".into(),
            sequence_number: 2,
        };
        assert_eq!(format_run_event(&event), vec!["002/010 IMG_0002.CR2"]);
    }

    #[test]
    fn format_failed_with_retry() {
        let event = RunEvent::Failed {
            file_name: "IMG_0002.CR2".into(),
            stage: JobStage::Extract(Tier::Gallery),
            message: "thumbnail 1 out of range".into(),
            will_retry: true,
        };
        assert_eq!(
            format_run_event(&event),
            vec!["fail IMG_0002.CR2 at extract gallery: thumbnail 1 out of range (will retry)"]
        );
    }

    #[test]
    fn format_failed_final() {
        let event = RunEvent::Failed {
            file_name: "IMG_0002.CR2".into(),
            stage: JobStage::Open,
            message: "boom".into(),
            will_retry: false,
        };
        assert_eq!(
            format_run_event(&event),
            vec!["fail IMG_0002.CR2 at open: boom"]
        );
    }

    #[test]
    fn format_retry_pass() {
        let event = RunEvent::RetryPassStarted { pass: 1, count: 3 };
        assert_eq!(format_run_event(&event), vec!["Retry pass 1 (3 files)"]);
    }

    #[test]
    fn format_manifest_written() {
        let event = RunEvent::ManifestWritten {
            path: PathBuf::from("out/a/manifest.json"),
            entries: 3,
        };
        assert_eq!(
            format_run_event(&event),
            vec!["Manifest: out/a/manifest.json (3 entries)"]
        );
        let event = RunEvent::ManifestWritten {
            path: PathBuf::from("out/a/manifest.json"),
            entries: 1,
        };
        assert_eq!(
            format_run_event(&event),
            vec!["Manifest: out/a/manifest.json (1 entry)"]
        );
    }

    #[test]
    fn format_summary_line() {
        let summary = Summary {
            processed: 3,
            skipped: 1,
            errored: 0,
            elapsed: Duration::from_millis(1420),
            output: PathBuf::from("out/a"),
        };
        assert_eq!(
            format_summary(&summary),
            vec!["Processed 3, skipped 1, errored 0 in 1.42s"]
        );
    }
}
