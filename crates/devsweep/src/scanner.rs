//! Streaming filesystem walk that discovers heavy artifact directories
//!
//! The walk runs on a blocking thread and reports through a bounded channel
//! with `blocking_send`, so a consumer that is busy applying an event
//! naturally throttles the producer. Events for a scan carry its generation
//! id; the controller drops anything from a superseded generation.

use crate::events::{AppEvent, ScanEvent, ScanSummary, TargetHit};
use crate::paths::ConfinedRoot;
use crate::targets::TargetDef;
use std::collections::{HashMap, HashSet};
use std::io;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::mpsc;
use walkdir::WalkDir;

const PROGRESS_INTERVAL: Duration = Duration::from_millis(200);

/// Immutable inputs for one scan invocation; copied into each generation.
#[derive(Debug, Clone)]
pub struct ScanOptions {
    pub root: Arc<ConfinedRoot>,
    /// Directory base name -> target definition.
    pub targets: HashMap<String, TargetDef>,
    /// Directory names whose subtrees are never entered.
    pub skip_dirs: HashSet<String>,
    /// Maximum depth from the root; 0 means unlimited.
    pub max_depth: u32,
}

pub fn default_skip_dirs() -> HashSet<String> {
    [".git", ".hg", ".svn"].iter().map(|s| s.to_string()).collect()
}

/// Walk failures, classified so callers can decide what is fatal.
#[derive(Debug, Error)]
pub enum WalkError {
    #[error("scan cancelled")]
    Cancelled,
    #[error("permission denied: {0}")]
    PermissionDenied(String),
    #[error(transparent)]
    Io(#[from] io::Error),
}

fn classify(err: walkdir::Error) -> WalkError {
    let path = err
        .path()
        .map(|p| p.display().to_string())
        .unwrap_or_default();
    match err.io_error() {
        Some(io_err) if io_err.kind() == io::ErrorKind::PermissionDenied => {
            WalkError::PermissionDenied(path)
        }
        _ => WalkError::Io(err.into()),
    }
}

/// Total size of regular files transitively under `path`. Symlinked
/// directories are never descended, which also rules out cycles. Checked
/// for cancellation at every entry.
pub fn dir_size(path: &Path, cancel: &AtomicBool) -> Result<u64, WalkError> {
    let mut size = 0u64;
    for entry in WalkDir::new(path).follow_links(false) {
        if cancel.load(Ordering::Relaxed) {
            return Err(WalkError::Cancelled);
        }
        let entry = entry.map_err(classify)?;
        if entry.file_type().is_file() {
            size += entry.metadata().map_err(classify)?.len();
        }
    }
    Ok(size)
}

/// One depth-first pass over the confined root, emitting `Hit`, throttled
/// `Progress`, and exactly one final `Finished` event for this generation.
///
/// Permission failures degrade to warnings and prune the affected subtree;
/// any other I/O failure aborts the walk and rides out in the summary.
/// Cancellation finishes cleanly without an error.
pub fn run_scan(
    opts: ScanOptions,
    scan_id: u64,
    cancel: &AtomicBool,
    tx: &mpsc::Sender<AppEvent>,
) {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();
    let mut visited = 0u64;
    let mut found = 0u64;
    let mut error: Option<String> = None;
    let mut last_progress = Instant::now();

    let send = |event: ScanEvent| {
        // A closed channel just means the controller is gone.
        let _ = tx.blocking_send(AppEvent::Scan(event));
    };

    let mut walker = WalkDir::new(opts.root.path()).follow_links(false);
    if opts.max_depth > 0 {
        // walkdir counts the root as depth 0; our depth option counts the
        // root's children as depth 0.
        walker = walker.max_depth(opts.max_depth as usize + 1);
    }
    let mut it = walker.into_iter();

    loop {
        if cancel.load(Ordering::Relaxed) {
            break;
        }
        let entry = match it.next() {
            None => break,
            Some(Ok(entry)) => entry,
            Some(Err(err)) => match classify(err) {
                WalkError::PermissionDenied(path) => {
                    // Unreadable listing: warn and move on, walkdir already
                    // refuses to descend.
                    warnings.push(format!("permission denied: {}", path));
                    continue;
                }
                other => {
                    error = Some(other.to_string());
                    break;
                }
            },
        };

        // Symlinked directories report as symlinks here and are never
        // descended.
        if !entry.file_type().is_dir() {
            continue;
        }
        visited += 1;
        if last_progress.elapsed() > PROGRESS_INTERVAL {
            send(ScanEvent::Progress {
                scan_id,
                visited,
                found,
            });
            last_progress = Instant::now();
        }
        if entry.depth() == 0 {
            // The root itself is counted but never matched.
            continue;
        }

        let name = entry.file_name().to_string_lossy().to_string();
        if opts.skip_dirs.contains(&name) {
            it.skip_current_dir();
            continue;
        }

        let Some(def) = opts.targets.get(&name) else {
            continue;
        };

        let rel_path = entry
            .path()
            .strip_prefix(opts.root.path())
            .unwrap_or_else(|_| entry.path())
            .to_string_lossy()
            .to_string();

        match dir_size(entry.path(), cancel) {
            Ok(size) => {
                found += 1;
                send(ScanEvent::Hit {
                    scan_id,
                    hit: TargetHit {
                        rel_path,
                        target: def.name.clone(),
                        category: def.category.clone(),
                        size_bytes: size,
                    },
                });
                send(ScanEvent::Progress {
                    scan_id,
                    visited,
                    found,
                });
                last_progress = Instant::now();
                // A matched directory is one leaf row; nested matches inside
                // it are never reported.
                it.skip_current_dir();
            }
            Err(WalkError::Cancelled) => break,
            Err(WalkError::PermissionDenied(path)) => {
                warnings.push(format!("permission denied: {}", path));
                it.skip_current_dir();
            }
            Err(err) => {
                error = Some(err.to_string());
                break;
            }
        }
    }

    send(ScanEvent::Progress {
        scan_id,
        visited,
        found,
    });
    send(ScanEvent::Finished(ScanSummary {
        scan_id,
        warnings,
        error,
        elapsed: start.elapsed(),
        visited,
        found,
    }));
}
