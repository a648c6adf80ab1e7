//! Confined root handle and the path validation that guards every deletion

use anyhow::{Context, Result};
use std::path::{Component, Path, PathBuf};
use thiserror::Error;

/// Why a candidate relative path was rejected by [`validate_rel_path`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum InvalidPath {
    #[error("empty path")]
    Empty,
    #[error("refusing to touch the scan root")]
    Root,
    #[error("absolute paths are not allowed")]
    Absolute,
    #[error("path escapes the scan root")]
    Escapes,
}

/// Normalize a relative path and reject anything that could resolve to, or
/// outside of, a confined root. Purely lexical; never touches the filesystem.
pub fn validate_rel_path(rel: &str) -> Result<PathBuf, InvalidPath> {
    if rel.is_empty() {
        return Err(InvalidPath::Empty);
    }

    let mut normalized = PathBuf::new();
    for component in Path::new(rel).components() {
        match component {
            Component::Prefix(_) | Component::RootDir => return Err(InvalidPath::Absolute),
            Component::CurDir => {}
            Component::ParentDir => {
                if !normalized.pop() {
                    return Err(InvalidPath::Escapes);
                }
            }
            Component::Normal(part) => normalized.push(part),
        }
    }

    if normalized.as_os_str().is_empty() {
        return Err(InvalidPath::Root);
    }
    Ok(normalized)
}

/// A filesystem handle restricting path resolution to within one directory.
///
/// Shared read-only between the scanner, the size accumulator and the
/// deleter; all destructive calls go through [`ConfinedRoot::resolve`].
#[derive(Debug)]
pub struct ConfinedRoot {
    root: PathBuf,
}

impl ConfinedRoot {
    /// Open a directory as the confinement boundary. The path is
    /// canonicalized so later prefix checks cannot be fooled by `..` or
    /// symlinked parents in the root argument itself.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let root = path
            .canonicalize()
            .with_context(|| format!("failed to open root {}", path.display()))?;
        let meta = std::fs::metadata(&root)
            .with_context(|| format!("failed to stat root {}", root.display()))?;
        if !meta.is_dir() {
            anyhow::bail!("root is not a directory: {}", root.display());
        }
        Ok(Self { root })
    }

    pub fn path(&self) -> &Path {
        &self.root
    }

    /// Validate `rel` and join it under the root. This is the only way the
    /// rest of the crate turns a row's relative path into an absolute one.
    pub fn resolve(&self, rel: &str) -> Result<PathBuf, InvalidPath> {
        let normalized = validate_rel_path(rel)?;
        Ok(self.root.join(normalized))
    }
}
