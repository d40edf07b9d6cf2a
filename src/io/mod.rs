//! Storage-facing I/O: URI resolution, delimited text, Parquet, object stores.

pub mod cloud;
pub mod csv;
pub mod parquet;
pub mod storage;

use crate::error::StorageError;
use anyhow::{Context, Result};
use std::fs::{self, File, create_dir_all};
use std::path::{Path, PathBuf};

/// What a writer does when its destination already exists.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SaveMode {
    /// Fail with an `AlreadyExists` error.
    #[default]
    ErrorIfExists,
    /// Discard the existing contents unconditionally.
    Overwrite,
    /// Add new shards next to the existing ones.
    Append,
    /// Leave the destination untouched and write nothing.
    Ignore,
}

/// Empty marker dropped into an output directory once every shard is written.
pub const SUCCESS_MARKER: &str = "_SUCCESS";

/// Highest existing `part-NNNNN.*` index inside `dir`, if any.
pub(crate) fn last_shard_index(dir: &Path) -> Result<Option<usize>> {
    let mut last = None;
    for entry in fs::read_dir(dir).with_context(|| format!("list {}", dir.display()))? {
        let name = entry?.file_name();
        let idx = name
            .to_str()
            .and_then(|n| n.strip_prefix("part-"))
            .and_then(|n| n.split('.').next())
            .and_then(|n| n.parse::<usize>().ok());
        last = last.max(idx);
    }
    Ok(last)
}

/// Sorted `part-*` files inside `dir` with the given extension.
pub(crate) fn shard_files(dir: &Path, extension: &str) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir).with_context(|| format!("list {}", dir.display()))? {
        let path = entry?.path();
        let is_shard = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.starts_with("part-"))
            && path.extension().and_then(|e| e.to_str()) == Some(extension);
        if is_shard {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Prepare `dir` for a write under `mode`.
///
/// Returns `None` when the write must be skipped ([`SaveMode::Ignore`] on an
/// existing destination), otherwise the first shard index to use.
pub(crate) fn prepare_output_dir(dir: &Path, mode: SaveMode) -> Result<Option<usize>> {
    let exists = dir.exists();
    let start = match (mode, exists) {
        (SaveMode::ErrorIfExists, true) => {
            return Err(StorageError::AlreadyExists(dir.display().to_string()).into());
        }
        (SaveMode::Ignore, true) => return Ok(None),
        (SaveMode::Overwrite, true) => {
            if dir.is_dir() {
                fs::remove_dir_all(dir).with_context(|| format!("rm -r {}", dir.display()))?;
            } else {
                fs::remove_file(dir).with_context(|| format!("rm {}", dir.display()))?;
            }
            0
        }
        (SaveMode::Append, true) => last_shard_index(dir)?.map_or(0, |i| i + 1),
        (_, false) => 0,
    };
    create_dir_all(dir).with_context(|| format!("mkdir -p {}", dir.display()))?;
    Ok(Some(start))
}

pub(crate) fn write_success_marker(dir: &Path) -> Result<()> {
    let marker = dir.join(SUCCESS_MARKER);
    File::create(&marker).with_context(|| format!("create {}", marker.display()))?;
    Ok(())
}
