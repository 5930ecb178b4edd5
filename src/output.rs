//! CLI output formatting.
//!
//! One entry per source, in the order given on the command line. The
//! derivative is the primary line; failures show the error as an indented
//! context line and the reference that is served instead.
//!
//! ```text
//! 001 photo.jpg → photo-100x50-c-center.jpg (generated)
//! 002 other.jpg → other-100x50-c-center.jpg (cached)
//! 003 logo.svg → logo.svg (failed)
//!     Error: Unsupported format: logo.svg
//!
//! 3 sources: 1 generated, 1 cached, 1 failed
//! ```
//!
//! `--json` prints the same reports as a JSON array instead.
//!
//! Format functions return `Vec<String>` and do no I/O; `print_*` wrappers
//! write to stdout.

use crate::derive::{DeriveError, Derivative};
use serde::Serialize;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Generated,
    Cached,
    Failed,
}

impl Status {
    fn label(self) -> &'static str {
        match self {
            Status::Generated => "generated",
            Status::Cached => "cached",
            Status::Failed => "failed",
        }
    }
}

/// What happened to one source.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    pub source: String,
    /// Reference to serve: the derivative, or `source` itself on failure.
    pub derivative: String,
    pub status: Status,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Report {
    pub fn new(source: &str, result: Result<Derivative, DeriveError>) -> Self {
        match result {
            Ok(derivative) => Self {
                source: source.to_string(),
                derivative: derivative.reference,
                status: if derivative.generated {
                    Status::Generated
                } else {
                    Status::Cached
                },
                error: None,
            },
            Err(e) => {
                warn!(source, "{e}; serving the original");
                Self {
                    source: source.to_string(),
                    derivative: source.to_string(),
                    status: Status::Failed,
                    error: Some(e.to_string()),
                }
            }
        }
    }
}

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

fn count(reports: &[Report], status: Status) -> usize {
    reports.iter().filter(|r| r.status == status).count()
}

pub fn format_reports(reports: &[Report]) -> Vec<String> {
    let mut lines = Vec::new();
    for (i, report) in reports.iter().enumerate() {
        lines.push(format!(
            "{} {} → {} ({})",
            format_index(i + 1),
            report.source,
            report.derivative,
            report.status.label()
        ));
        if let Some(error) = &report.error {
            lines.push(format!("    Error: {error}"));
        }
    }

    if !reports.is_empty() {
        lines.push(String::new());
    }
    lines.push(format!(
        "{} source{}: {} generated, {} cached, {} failed",
        reports.len(),
        if reports.len() == 1 { "" } else { "s" },
        count(reports, Status::Generated),
        count(reports, Status::Cached),
        count(reports, Status::Failed),
    ));
    lines
}

pub fn print_reports(reports: &[Report]) {
    for line in format_reports(reports) {
        println!("{}", line);
    }
}

pub fn reports_json(reports: &[Report]) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(reports)
}
