//! One-at-a-time deletion of discovered rows
//!
//! There is deliberately no queue or loop here. The controller dispatches a
//! single path, consumes the result event, and only then dispatches the
//! next, which keeps exactly one delete in flight and lets progress updates
//! interleave deterministically between items.

use crate::events::{AppEvent, DeleteResult};
use crate::paths::ConfinedRoot;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Validate and delete one path under the confined root. Returns error text
/// on failure; validation failures never touch the filesystem.
pub fn delete_one(root: &ConfinedRoot, rel_path: &str) -> Option<String> {
    let abs = match root.resolve(rel_path) {
        Ok(path) => path,
        Err(err) => return Some(err.to_string()),
    };
    let meta = match std::fs::symlink_metadata(&abs) {
        Ok(meta) => meta,
        Err(err) => return Some(err.to_string()),
    };
    let result = if meta.is_dir() {
        std::fs::remove_dir_all(&abs)
    } else {
        std::fs::remove_file(&abs)
    };
    result.err().map(|err| err.to_string())
}

/// Run one deletion on a blocking thread and report back on the controller's
/// inbox. The result carries `rel_path` exactly as submitted so the matching
/// row can be found verbatim.
pub fn spawn_delete(root: Arc<ConfinedRoot>, rel_path: String, tx: mpsc::Sender<AppEvent>) {
    tokio::spawn(async move {
        let path_for_task = rel_path.clone();
        let error = tokio::task::spawn_blocking(move || delete_one(&root, &path_for_task))
            .await
            .unwrap_or_else(|join_err| Some(join_err.to_string()));
        let _ = tx
            .send(AppEvent::Delete(DeleteResult { rel_path, error }))
            .await;
    });
}
