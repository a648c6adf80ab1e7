//! Messages flowing from background work into the controller loop
//!
//! Every mutation of controller state is driven by exactly one of these
//! variants; background tasks never share state with the controller directly.

use std::time::Duration;

/// One matched target directory reported by the scanner.
#[derive(Debug, Clone)]
pub struct TargetHit {
    /// Relative path under the confined root; unique key within a scan
    /// generation.
    pub rel_path: String,
    pub target: String,
    pub category: String,
    pub size_bytes: u64,
}

/// Terminal summary of one scan generation. Always the last event the
/// generation produces.
#[derive(Debug)]
pub struct ScanSummary {
    pub scan_id: u64,
    pub warnings: Vec<String>,
    /// Fatal walk error, if any. Cancellation is not an error.
    pub error: Option<String>,
    pub elapsed: Duration,
    pub visited: u64,
    pub found: u64,
}

#[derive(Debug)]
pub enum ScanEvent {
    Hit {
        scan_id: u64,
        hit: TargetHit,
    },
    Progress {
        scan_id: u64,
        visited: u64,
        found: u64,
    },
    Finished(ScanSummary),
}

impl ScanEvent {
    pub fn scan_id(&self) -> u64 {
        match self {
            ScanEvent::Hit { scan_id, .. } => *scan_id,
            ScanEvent::Progress { scan_id, .. } => *scan_id,
            ScanEvent::Finished(summary) => summary.scan_id,
        }
    }
}

/// Outcome of one dispatched deletion. `rel_path` is the path as submitted,
/// so the controller can find the matching row verbatim.
#[derive(Debug)]
pub struct DeleteResult {
    pub rel_path: String,
    pub error: Option<String>,
}

/// Outcome of an out-of-band size recalculation for one row.
#[derive(Debug)]
pub struct RecalcResult {
    pub rel_path: String,
    pub size: Result<u64, String>,
}

/// The controller's single inbox. Scan events, delete results and recalc
/// results all arrive here and are applied one at a time.
#[derive(Debug)]
pub enum AppEvent {
    Scan(ScanEvent),
    Delete(DeleteResult),
    Recalc(RecalcResult),
}
