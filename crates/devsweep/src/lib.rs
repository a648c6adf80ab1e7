//! devsweep: find and reclaim space from heavy build-artifact directories
//!
//! The engine streams scan results over a bounded channel from a blocking
//! walker into a single-consumer TUI controller. Deletions run strictly one
//! at a time, confined to the scan root.

pub mod app;
pub mod deleter;
pub mod events;
pub mod paths;
pub mod scanner;
pub mod settings;
pub mod targets;
