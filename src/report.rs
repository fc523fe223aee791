//! Output for the measured roots
//!
//! Result lines go to stdout, diagnostics and the summary to stderr.

use crate::error::ProbeError;
use crate::walker::{RootReport, RunSummary};
use console::style;
use humansize::{format_size, BINARY};
use std::path::Path;

/// Format a size in bytes, optionally with binary units
pub fn format_bytes(bytes: u64, human: bool) -> String {
    if human {
        format_size(bytes, BINARY)
    } else {
        bytes.to_string()
    }
}

/// Result line for one root: `"<size> <path>"`
///
/// Returns `None` for roots that could not be measured.
pub fn format_report(report: &RootReport, human: bool) -> Option<String> {
    report
        .size()
        .map(|size| format!("{} {}", format_bytes(size, human), report.path.display()))
}

/// Print the result line for one root to stdout
pub fn print_report(report: &RootReport, human: bool) {
    if let Some(line) = format_report(report, human) {
        println!("{}", line);
    }
}

/// Diagnostic for a directory the scan may not list
pub fn unreadable_message(path: &Path) -> String {
    format!("Cannot read directory '{}': Permission denied", path.display())
}

pub fn print_unreadable(path: &Path) {
    eprintln!("{}", unreadable_message(path));
}

pub fn inaccessible_message(path: &Path, error: &ProbeError) -> String {
    format!("mdu: cannot access '{}': {}", path.display(), error.reason())
}

pub fn print_inaccessible(path: &Path, error: &ProbeError) {
    eprintln!("{}", inaccessible_message(path, error));
}

/// Format a number with thousands separators
fn format_number(n: u64) -> String {
    let s = n.to_string();
    let bytes: Vec<_> = s.bytes().rev().collect();

    let chunks: Vec<String> = bytes
        .chunks(3)
        .map(|chunk| chunk.iter().rev().map(|&b| b as char).collect::<String>())
        .collect();

    chunks.into_iter().rev().collect::<Vec<_>>().join(",")
}

/// Print a summary of the run to stderr
pub fn print_summary(summary: &RunSummary, workers: usize) {
    let duration_secs = summary.duration.as_secs_f64();

    eprintln!();
    let title = if summary.had_error() {
        style("Completed with errors").yellow().bold()
    } else {
        style("Complete").green().bold()
    };
    eprintln!("{}", title);
    eprintln!("{}", style("─".repeat(50)).dim());
    eprintln!("  {} {}", style("Roots:").bold(), summary.reports.len());
    eprintln!("  {} {}", style("Workers:").bold(), workers);
    eprintln!(
        "  {} {}",
        style("Directories:").bold(),
        format_number(summary.dirs())
    );
    eprintln!("  {} {}", style("Files:").bold(), format_number(summary.files()));
    eprintln!(
        "  {} {}",
        style("Total Size:").bold(),
        format_size(summary.total_bytes(), BINARY)
    );
    if summary.errors() > 0 {
        eprintln!(
            "  {} {}",
            style("Errors:").yellow().bold(),
            format_number(summary.errors())
        );
    }
    eprintln!(
        "  {} {:.3} seconds",
        style("Time elapsed:").bold(),
        duration_secs
    );
    eprintln!();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::walker::{JobResult, RootOutcome};
    use std::path::PathBuf;

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(0), "0");
        assert_eq!(format_number(999), "999");
        assert_eq!(format_number(1000), "1,000");
        assert_eq!(format_number(1234567), "1,234,567");
    }

    #[test]
    fn test_format_report() {
        let file = RootReport {
            path: PathBuf::from("notes.txt"),
            outcome: RootOutcome::File { size: 2048 },
        };
        assert_eq!(format_report(&file, false).unwrap(), "2048 notes.txt");
        assert_eq!(format_report(&file, true).unwrap(), "2 KiB notes.txt");

        let dir = RootReport {
            path: PathBuf::from("/srv"),
            outcome: RootOutcome::Directory(JobResult {
                root: PathBuf::from("/srv"),
                total: 12,
                had_error: true,
                dirs: 1,
                files: 2,
                soft_errors: 1,
            }),
        };
        assert_eq!(format_report(&dir, false).unwrap(), "12 /srv");

        let missing = RootReport {
            path: PathBuf::from("/nope"),
            outcome: RootOutcome::Inaccessible {
                error: ProbeError::NotFound {
                    path: PathBuf::from("/nope"),
                },
            },
        };
        assert!(format_report(&missing, false).is_none());
    }

    #[test]
    fn test_diagnostics() {
        assert_eq!(
            unreadable_message(Path::new("/root/secret")),
            "Cannot read directory '/root/secret': Permission denied"
        );
        let err = ProbeError::NotFound {
            path: PathBuf::from("x"),
        };
        assert_eq!(
            inaccessible_message(Path::new("x"), &err),
            "mdu: cannot access 'x': No such file or directory"
        );
    }
}
